//! # Document
//!
//! The imperative entry point. A [`Document`] owns the object store, the
//! current drawing state, the font registry and the graphics caches. Every
//! call runs to completion: content is appended to the active page (or to
//! the template being recorded) and new objects are appended to the store
//! immediately. Nothing is shared between documents.
//!
//! Coordinates are in the configured unit with the origin at the top-left
//! corner of the page. They are converted to points, and flipped into PDF
//! space, at the moment operators are emitted.
//!
//! The first error returned by a drawing or text operation is remembered;
//! [`Document::write_to`] refuses to produce a file afterwards.

mod draw;
mod nav;
mod templates;
mod text;

use std::collections::HashMap;
use std::io::Write;

use chrono::{DateTime, FixedOffset, Local};
use tracing::{debug, warn};

pub use draw::{ImageOptions, MaskOptions};
pub use text::{Border, CellOption, Float, VAlign};

use crate::cache::GraphicsCaches;
use crate::config::Config;
use crate::crypto::SecurityHandler;
use crate::error::{FolioError, Result};
use crate::font::{FontOptions, FontProgram, FontStyle, KernOverride, SubsetFont, TrueTypeFont};
use crate::pdf::{
    Anchor, CidFont, Content, ContentStream, Encryption, FontFile, ObjectStore, Page, PdfInfo,
    PdfObject, PdfWriter, ResourceDict, SubfontDescriptor, SubsetFontObject, UnicodeMap,
    WriteInput,
};
use crate::style::{Color, LineCap, LineType, Transparency};
use crate::template::TemplateBuilder;
use crate::text::TextLayout;
use crate::units::{PageBox, Rect, UnitConfig};

/// Per-page overrides for [`Document::add_page_with_options`].
#[derive(Debug, Clone, Default)]
pub struct PageOptions {
    pub size: Option<Rect>,
    pub trim_box: Option<PageBox>,
    /// Unit of `size` and `trim_box`; points when unset.
    pub unit: Option<UnitConfig>,
}

/// The mutable cursor and style of a document.
#[derive(Debug, Clone)]
pub struct DrawingState {
    pub x: f64,
    pub y: f64,
    pub font: Option<usize>,
    /// Font size in points.
    pub font_size: f64,
    pub font_style: FontStyle,
    pub char_spacing: f64,
    pub text_color: Color,
    pub fill_color: Color,
    pub stroke_color: Color,
    pub line_width: f64,
    pub line_type: LineType,
    pub line_cap: LineCap,
    pub transparency: Option<Transparency>,
}

impl Default for DrawingState {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            font: None,
            font_size: 12.0,
            font_style: FontStyle::REGULAR,
            char_spacing: 0.0,
            text_color: Color::BLACK,
            fill_color: Color::BLACK,
            stroke_color: Color::BLACK,
            line_width: 1.0,
            line_type: LineType::Solid,
            line_cap: LineCap::Butt,
            transparency: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PageRecord {
    /// Store index of the page object.
    index: usize,
    /// Size in points.
    size: Rect,
    /// Store index of the page's content object, once something was drawn.
    content: Option<usize>,
    /// Rotations opened on this page and not yet reset.
    rotations: usize,
}

#[derive(Debug, Clone, Copy)]
struct EmbeddedImage {
    index: usize,
    width_px: u32,
    height_px: u32,
}

pub struct Document {
    config: Config,
    units: UnitConfig,
    layout: TextLayout,
    store: ObjectStore,
    info: PdfInfo,
    security: Option<SecurityHandler>,
    fonts: Vec<SubsetFont>,
    font_ids: HashMap<(String, FontStyle), usize>,
    resources: ResourceDict,
    caches: GraphicsCaches,
    images: HashMap<String, EmbeddedImage>,
    anchors: HashMap<String, Anchor>,
    pages: Vec<PageRecord>,
    current_page: Option<usize>,
    state: DrawingState,
    template: Option<TemplateBuilder>,
    imported: usize,
    first_error: Option<String>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Document {
    /// Start a document. The catalog, page tree root, shared resource
    /// dictionary, outline root and Info dictionary are objects 1 to 5;
    /// a protected document gets its `/Encrypt` dictionary as object 6.
    pub fn new(config: Config) -> Self {
        let now: DateTime<FixedOffset> = Local::now().into();
        let mut store = ObjectStore::new();
        store.append(PdfObject::Catalog);
        store.append(PdfObject::Pages);
        store.append(PdfObject::ProcSet);
        store.append(PdfObject::Outlines);
        store.append(PdfObject::Info);

        let security = config.protection.as_ref().map(|protection| {
            let seed = format!("{}|{:?}", now.to_rfc3339(), now.timestamp_subsec_nanos());
            let handler = SecurityHandler::new(protection, md5::compute(seed).0);
            store.append(PdfObject::Encryption(Encryption {
                owner_hash: handler.owner_hash.clone(),
                user_hash: handler.user_hash.clone(),
                permissions: handler.permissions,
            }));
            handler
        });

        debug!(protected = security.is_some(), "document created");
        Self {
            units: config.unit_config(),
            layout: TextLayout::new(config.text),
            config,
            store,
            info: PdfInfo {
                producer: "folio".to_string(),
                creation_date: Some(now),
                ..Default::default()
            },
            security,
            fonts: Vec::new(),
            font_ids: HashMap::new(),
            resources: ResourceDict::default(),
            caches: GraphicsCaches::new(),
            images: HashMap::new(),
            anchors: HashMap::new(),
            pages: Vec::new(),
            current_page: None,
            state: DrawingState::default(),
            template: None,
            imported: 0,
            first_error: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &DrawingState {
        &self.state
    }

    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    /// Object number the next appended object will receive.
    pub fn next_object_number(&self) -> usize {
        self.store.next_object_number()
    }

    /// The first error any drawing or text operation returned.
    pub fn first_error(&self) -> Option<&str> {
        self.first_error.as_deref()
    }

    fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if self.first_error.is_none() {
                warn!(error = %e, "operation failed; document can no longer be written");
                self.first_error = Some(e.to_string());
            }
        }
        result
    }

    pub fn set_info(&mut self, info: PdfInfo) {
        self.info = info;
    }

    pub fn info(&self) -> &PdfInfo {
        &self.info
    }

    // --- pages ---

    pub fn add_page(&mut self) -> Result<()> {
        self.add_page_with_options(PageOptions::default())
    }

    pub fn add_page_with_options(&mut self, options: PageOptions) -> Result<()> {
        if self.template.is_some() {
            return Err(FolioError::TemplateAlreadyOpen);
        }
        let size = match (options.size, options.unit) {
            (Some(size), Some(unit)) => unit.rect_to_points(size),
            (Some(size), None) => size,
            (None, _) => self.config.page_size,
        };
        if !size.is_valid() || size.w == 0.0 || size.h == 0.0 {
            return Err(FolioError::InvalidRect(format!("page size {} x {}", size.w, size.h)));
        }
        let trim_box = match (options.trim_box, options.unit) {
            (Some(tb), Some(unit)) => Some(unit.box_to_points(tb)),
            (Some(tb), None) => Some(tb),
            (None, _) => self.config.trim_box,
        };

        let index = self.store.append(PdfObject::Page(Page::new(size, trim_box)));
        self.pages.push(PageRecord {
            index,
            size,
            content: None,
            rotations: 0,
        });
        self.current_page = Some(self.pages.len() - 1);
        self.state.x = 0.0;
        self.state.y = 0.0;
        debug!(page = self.pages.len(), width = size.w, height = size.h, "page added");
        Ok(())
    }

    /// Make page `page_no` (1-based) the target of subsequent drawing.
    pub fn set_page(&mut self, page_no: usize) -> Result<()> {
        if page_no == 0 || page_no > self.pages.len() {
            return Err(FolioError::InvalidPageNumber(page_no));
        }
        self.current_page = Some(page_no - 1);
        Ok(())
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// 1-based number of the current page.
    pub fn current_page(&self) -> Option<usize> {
        self.current_page.map(|p| p + 1)
    }

    // --- position ---

    pub fn set_x(&mut self, x: f64) {
        self.state.x = x;
    }

    pub fn set_y(&mut self, y: f64) {
        self.state.y = y;
    }

    pub fn set_xy(&mut self, x: f64, y: f64) {
        self.state.x = x;
        self.state.y = y;
    }

    pub fn x(&self) -> f64 {
        self.state.x
    }

    pub fn y(&self) -> f64 {
        self.state.y
    }

    /// Move down by `h` and back to the left edge.
    pub fn br(&mut self, h: f64) {
        self.state.y += h;
        self.state.x = 0.0;
    }

    // --- fonts ---

    pub fn add_ttf_font(&mut self, family: &str, data: Vec<u8>) -> Result<()> {
        self.add_ttf_font_with_options(family, data, FontOptions::default())
    }

    pub fn add_ttf_font_with_options(
        &mut self,
        family: &str,
        data: Vec<u8>,
        options: FontOptions,
    ) -> Result<()> {
        let program = TrueTypeFont::parse(data)?;
        self.add_font_program(family, Box::new(program), options)
    }

    /// Register a font program under `family` and the style in `options`.
    ///
    /// The embedded-font object chain is created once per family and style;
    /// registering the same pair again is a no-op. The underline bit does
    /// not count as a style.
    pub fn add_font_program(
        &mut self,
        family: &str,
        program: Box<dyn FontProgram>,
        options: FontOptions,
    ) -> Result<()> {
        let key = (family.to_string(), options.style.without_underline());
        if self.font_ids.contains_key(&key) {
            debug!(family, "font already registered");
            return Ok(());
        }

        let id = self.fonts.len();
        let unicode_map = self.store.append(PdfObject::UnicodeMap(UnicodeMap { font: id }));
        let font_file = self.store.append(PdfObject::FontFile(FontFile { font: id }));
        let descriptor = self
            .store
            .append(PdfObject::SubfontDescriptor(SubfontDescriptor { font: id, font_file }));
        let cid_font = self.store.append(PdfObject::CidFont(CidFont { font: id, descriptor }));
        let subset = self.store.append(PdfObject::SubsetFont(SubsetFontObject {
            font: id,
            cid_font,
            unicode_map,
        }));

        let mut font = SubsetFont::new(family, program, options);
        font.resource_number = id + 1;
        font.object_index = subset;
        debug!(
            family,
            resource = %font.resource_name(),
            object = subset + 1,
            "font registered"
        );
        self.fonts.push(font);
        self.font_ids.insert(key, id);
        Ok(())
    }

    /// Select the font used by text operations. Size is in points.
    pub fn set_font(&mut self, family: &str, style: FontStyle, size: f64) -> Result<()> {
        let id = self
            .font_ids
            .get(&(family.to_string(), style.without_underline()))
            .copied()
            .ok_or_else(|| FolioError::MissingFontFamily(family.to_string()))?;
        self.state.font = Some(id);
        self.state.font_style = style;
        self.state.font_size = size;
        Ok(())
    }

    pub fn set_font_size(&mut self, size: f64) {
        self.state.font_size = size;
    }

    /// Extra space after every character, in document units.
    pub fn set_char_spacing(&mut self, spacing: f64) {
        self.state.char_spacing = spacing;
    }

    /// Install a kerning adjustment for every style of `family`.
    pub fn set_kern_override<F>(&mut self, family: &str, f: F) -> Result<()>
    where
        F: Fn(char, char, i16) -> i16 + Send + Sync + Clone + 'static,
    {
        let mut found = false;
        for font in self.fonts.iter_mut().filter(|font| font.family == family) {
            let boxed: KernOverride = Box::new(f.clone());
            font.set_kern_override(boxed);
            found = true;
        }
        if found {
            Ok(())
        } else {
            Err(FolioError::MissingFontFamily(family.to_string()))
        }
    }

    /// Whether the current font has a glyph for `ch`.
    pub fn contains_glyph(&self, ch: char) -> Result<bool> {
        let id = self.state.font.ok_or(FolioError::NoFont)?;
        Ok(self.fonts[id].contains_glyph(ch))
    }

    pub(crate) fn current_font(&self) -> Result<usize> {
        self.state.font.ok_or(FolioError::NoFont)
    }

    // --- coordinate helpers ---

    pub(crate) fn to_pt(&self, v: f64) -> f64 {
        self.units.to_points(v)
    }

    pub(crate) fn from_pt(&self, v: f64) -> f64 {
        self.units.from_points(v)
    }

    /// Size in points of what is being drawn on: the open template or the
    /// current page.
    pub(crate) fn canvas_size(&self) -> Result<Rect> {
        if let Some(template) = &self.template {
            return Ok(template.size);
        }
        let page = self.current_page.ok_or(FolioError::NoPage)?;
        Ok(self.pages[page].size)
    }

    /// PDF-space y of the document-space `y`.
    pub(crate) fn pdf_y(&self, y: f64) -> Result<f64> {
        Ok(self.canvas_size()?.h - self.to_pt(y))
    }

    /// Content stream drawing goes to, creating the page's content object
    /// on first use.
    pub(crate) fn content_mut(&mut self) -> Result<&mut ContentStream> {
        if let Some(template) = self.template.as_mut() {
            return Ok(template.content_mut());
        }
        let page = self.current_page.ok_or(FolioError::NoPage)?;
        let record = &mut self.pages[page];
        let index = match record.content {
            Some(index) => index,
            None => {
                let index = self.store.append(PdfObject::Content(Content::new(record.index)));
                record.content = Some(index);
                index
            }
        };
        let len = self.store.len();
        match self.store.get_mut(index)? {
            PdfObject::Content(content) => Ok(&mut content.stream),
            _ => Err(FolioError::OutOfRange { index, len }),
        }
    }

    /// Graphics state for the active transparency, if any.
    pub(crate) fn transparency_gs(&mut self, override_: Option<Transparency>) -> Option<String> {
        let t = override_.or(self.state.transparency)?;
        self.caches
            .transparency(&mut self.store, &mut self.resources, t)
            .map(|r| r.name)
    }

    // --- output ---

    /// Serialize the document into `sink`. Returns the number of bytes
    /// written.
    pub fn write_to<W: Write>(&self, sink: &mut W) -> Result<usize> {
        if let Some(message) = &self.first_error {
            return Err(FolioError::PreviousFailure(message.clone()));
        }
        if self.template.is_some() {
            warn!("template still open at write time; its content is not part of the document");
        }
        let input = WriteInput {
            fonts: &self.fonts,
            resources: &self.resources,
            anchors: &self.anchors,
            info: &self.info,
            compress_level: self.config.effective_compress_level(),
            security: self.security.as_ref(),
        };
        PdfWriter::new(&self.store, input).write(sink)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }
}
