//! # PDF Object Graph
//!
//! Every structural PDF object of a document lives in one [`ObjectStore`].
//! An object's number is its position in the store plus one and is fixed the
//! moment it is appended, so cross references can be taken as plain indices
//! while the document is being built. Nothing is ever removed or reordered.
//!
//! ## PDF Structure (simplified)
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- Catalog, always object 1
//! 2 0 obj ... endobj  <- Pages root
//! ...
//! xref                <- cross-reference table (byte offsets of each object)
//! trailer             <- /Size, /Root, /Info, optional /Encrypt + /ID
//! %%EOF
//! ```
//!
//! The variants of [`PdfObject`] carry only what they need; anything that
//! depends on other objects (page kids, outline siblings, glyph widths) is
//! resolved by the serializer's preparation pass and handed to each write
//! through [`writer::WriteContext`].

pub mod content;
pub mod fonts;
pub mod resources;
pub mod structure;
pub mod writer;

use crate::error::{FolioError, Result};

pub use content::{Content, ContentStream};
pub use fonts::{CidFont, FontFile, SubfontDescriptor, SubsetFontObject, UnicodeMap};
pub use resources::{
    ColorSpace, ExtGState, FormXObject, ImageFilter, ImageXObject, SMask, SMaskType,
};
pub use structure::{pdf_date, Anchor, Annotation, Encryption, LinkTarget, OutlineItem, Page, PdfInfo};
pub use writer::{ObjectWriter, PdfWriter, Prepared, ResourceDict, WriteContext, WriteInput, WriterState};

/// Type tag of a stored object, used by the preparation pass to find the
/// objects it links together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Catalog,
    Pages,
    Page,
    Content,
    ProcSet,
    Outlines,
    OutlineItem,
    Info,
    Encryption,
    FontFile,
    SubfontDescriptor,
    CidFont,
    UnicodeMap,
    SubsetFont,
    ExtGState,
    SMask,
    Image,
    Form,
    Annotation,
    Imported,
}

/// One indirect object of the document.
#[derive(Debug)]
pub enum PdfObject {
    Catalog,
    Pages,
    Page(Page),
    Content(Content),
    /// The shared resource dictionary every page and form points at.
    ProcSet,
    Outlines,
    OutlineItem(OutlineItem),
    Info,
    Encryption(Encryption),
    FontFile(FontFile),
    SubfontDescriptor(SubfontDescriptor),
    CidFont(CidFont),
    UnicodeMap(UnicodeMap),
    SubsetFont(SubsetFontObject),
    ExtGState(ExtGState),
    SMask(SMask),
    Image(ImageXObject),
    Form(FormXObject),
    Annotation(Annotation),
    /// A pre-rendered object body from an importer, written unmodified.
    Imported(Vec<u8>),
}

impl PdfObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            PdfObject::Catalog => ObjectKind::Catalog,
            PdfObject::Pages => ObjectKind::Pages,
            PdfObject::Page(_) => ObjectKind::Page,
            PdfObject::Content(_) => ObjectKind::Content,
            PdfObject::ProcSet => ObjectKind::ProcSet,
            PdfObject::Outlines => ObjectKind::Outlines,
            PdfObject::OutlineItem(_) => ObjectKind::OutlineItem,
            PdfObject::Info => ObjectKind::Info,
            PdfObject::Encryption(_) => ObjectKind::Encryption,
            PdfObject::FontFile(_) => ObjectKind::FontFile,
            PdfObject::SubfontDescriptor(_) => ObjectKind::SubfontDescriptor,
            PdfObject::CidFont(_) => ObjectKind::CidFont,
            PdfObject::UnicodeMap(_) => ObjectKind::UnicodeMap,
            PdfObject::SubsetFont(_) => ObjectKind::SubsetFont,
            PdfObject::ExtGState(_) => ObjectKind::ExtGState,
            PdfObject::SMask(_) => ObjectKind::SMask,
            PdfObject::Image(_) => ObjectKind::Image,
            PdfObject::Form(_) => ObjectKind::Form,
            PdfObject::Annotation(_) => ObjectKind::Annotation,
            PdfObject::Imported(_) => ObjectKind::Imported,
        }
    }

    /// Render the object body. `w` already carries this object's number.
    pub(crate) fn write(&self, w: &mut ObjectWriter, ctx: &WriteContext) -> Result<()> {
        match self {
            PdfObject::Catalog => structure::write_catalog(w, ctx),
            PdfObject::Pages => structure::write_pages(w, ctx),
            PdfObject::Page(page) => page.write(w.number() - 1, w, ctx)?,
            PdfObject::Content(content) => content.write(w, ctx)?,
            PdfObject::ProcSet => structure::write_procset(w, ctx),
            PdfObject::Outlines => structure::write_outlines(w, ctx),
            PdfObject::OutlineItem(item) => item.write(w, ctx)?,
            PdfObject::Info => ctx.input.info.write(w),
            PdfObject::Encryption(encryption) => encryption.write(w),
            PdfObject::FontFile(o) => o.write(w, ctx)?,
            PdfObject::SubfontDescriptor(o) => o.write(w, ctx)?,
            PdfObject::CidFont(o) => o.write(w, ctx)?,
            PdfObject::UnicodeMap(o) => o.write(w, ctx)?,
            PdfObject::SubsetFont(o) => o.write(w, ctx)?,
            PdfObject::ExtGState(o) => o.write(w, ctx)?,
            PdfObject::SMask(o) => o.write(w, ctx)?,
            PdfObject::Image(o) => o.write(w, ctx)?,
            PdfObject::Form(o) => o.write(w, ctx)?,
            PdfObject::Annotation(o) => o.write(w, ctx)?,
            PdfObject::Imported(body) => w.raw_bytes(body),
        }
        Ok(())
    }
}

/// Append-only, index-addressed collection of a document's objects.
#[derive(Debug, Default)]
pub struct ObjectStore {
    objects: Vec<PdfObject>,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `object` and return its index. The object number is
    /// `index + 1`.
    pub fn append(&mut self, object: PdfObject) -> usize {
        self.objects.push(object);
        self.objects.len() - 1
    }

    pub fn get(&self, index: usize) -> Result<&PdfObject> {
        let len = self.objects.len();
        self.objects
            .get(index)
            .ok_or(FolioError::OutOfRange { index, len })
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut PdfObject> {
        let len = self.objects.len();
        self.objects
            .get_mut(index)
            .ok_or(FolioError::OutOfRange { index, len })
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Object number the next appended object will receive.
    pub fn next_object_number(&self) -> usize {
        self.objects.len() + 1
    }

    pub fn iter(&self) -> impl Iterator<Item = &PdfObject> {
        self.objects.iter()
    }

    /// Indices of every object of `kind`, in store order.
    pub fn indices_of(&self, kind: ObjectKind) -> impl Iterator<Item = usize> + '_ {
        self.objects
            .iter()
            .enumerate()
            .filter(move |(_, o)| o.kind() == kind)
            .map(|(i, _)| i)
    }
}

/// Object number of the object at store index `index`.
pub fn object_number(index: usize) -> usize {
    index + 1
}

/// Escape special characters in a PDF literal string.
pub fn escape_pdf_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
        .replace('\r', "\\r")
}

/// Encode a text string: plain bytes for ASCII, UTF-16BE with BOM otherwise.
pub fn text_string_bytes(s: &str) -> Vec<u8> {
    if s.is_ascii() {
        return s.as_bytes().to_vec();
    }
    let mut out = vec![0xFE, 0xFF];
    for unit in s.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

/// Format a number for content streams and dictionaries: at most `places`
/// decimals, trailing zeros trimmed.
pub fn fmt_num(v: f64, places: usize) -> String {
    let s = format!("{:.*}", places, v);
    let s = if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    };
    if s == "-0" {
        "0".to_string()
    } else {
        s
    }
}
