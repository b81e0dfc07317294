//! Recording and placing templates, and placing pages imported from other
//! PDF files.

use std::sync::Arc;

use tracing::debug;

use super::Document;
use crate::error::{FolioError, Result};
use crate::import::{check_contiguous, ImportBox, ImportedTemplate, PageImporter};
use crate::pdf::{ContentStream, FormXObject, PdfObject};
use crate::template::{Template, TemplateBuilder};
use crate::units::{Point, Rect};

impl Document {
    /// Start recording a template of `size` document units. Until
    /// [`Document::end_template`] every drawing call writes into the
    /// template instead of the current page.
    pub fn begin_template(&mut self, size: Rect) -> Result<()> {
        self.begin_template_at(Point::new(0.0, 0.0), size)
    }

    /// Like [`Document::begin_template`], with the template's bounding box
    /// starting at `corner`.
    pub fn begin_template_at(&mut self, corner: Point, size: Rect) -> Result<()> {
        if self.template.is_some() {
            return Err(FolioError::TemplateAlreadyOpen);
        }
        let size = self.units.rect_to_points(size);
        if !size.is_valid() || size.w == 0.0 || size.h == 0.0 {
            return Err(FolioError::InvalidRect(format!("template {} x {}", size.w, size.h)));
        }
        let corner = self.units.point_to_points(corner);
        self.template = Some(TemplateBuilder::new(corner, size));
        Ok(())
    }

    /// Start a new page in the template being recorded.
    pub fn template_add_page(&mut self) -> Result<()> {
        let template = self.template.as_mut().ok_or(FolioError::TemplateNotOpen)?;
        template.add_page();
        Ok(())
    }

    pub fn end_template(&mut self) -> Result<Arc<Template>> {
        let builder = self.template.take().ok_or(FolioError::TemplateNotOpen)?;
        let template = builder.finish();
        debug!(id = template.id(), pages = template.pages().len(), "template recorded");
        Ok(template)
    }

    /// Draw `template` with its top-left corner at (x, y). A zero `size`
    /// side keeps the template's own size on that axis.
    pub fn use_template(&mut self, template: &Arc<Template>, x: f64, y: f64, size: Rect) -> Result<()> {
        let result = self.place_template(template, x, y, size);
        self.record(result)
    }

    fn place_template(&mut self, template: &Arc<Template>, x: f64, y: f64, size: Rect) -> Result<()> {
        let top = self.pdf_y(y)?;
        for child in template.descendants() {
            self.register_template(&child)?;
        }
        let name = self.register_template(template)?;
        if let Some(builder) = self.template.as_mut() {
            builder.add_child(template);
        }

        let natural = template.size();
        let w = if size.w > 0.0 { self.to_pt(size.w) } else { natural.w };
        let h = if size.h > 0.0 { self.to_pt(size.h) } else { natural.h };
        let (sx, sy) = (w / natural.w, h / natural.h);
        let corner = template.corner();

        let mut ops = ContentStream::new();
        ops.save();
        ops.concat(
            sx,
            0.0,
            0.0,
            sy,
            self.to_pt(x) - corner.x * sx,
            top - h - corner.y * sy,
        );
        ops.draw_xobject(&name);
        ops.restore();
        self.content_mut()?.extend(&ops);
        Ok(())
    }

    /// Make `template` available as a form XObject, once per document.
    fn register_template(&mut self, template: &Arc<Template>) -> Result<String> {
        let name = template.resource_name();
        if self.resources.xobjects.contains_key(&name) {
            return Ok(name);
        }
        for image in template.images() {
            self.embed_image(&image.data)?;
        }
        let corner = template.corner();
        let size = template.size();
        let index = self.store.append(PdfObject::Form(FormXObject {
            bbox: [corner.x, corner.y, corner.x + size.w, corner.y + size.h],
            content: template.bytes().to_vec(),
            transparency_group: false,
        }));
        self.resources.xobjects.insert(name.clone(), index);
        debug!(%name, object = index + 1, "template registered");
        Ok(name)
    }

    /// Import page `page_no` of another PDF through `importer`.
    ///
    /// The importer numbers its objects from [`Document::next_object_number`]
    /// on; they are appended unchanged. Imported objects cannot be
    /// encrypted, so protected documents refuse imports.
    pub fn import_page(
        &mut self,
        importer: &mut dyn PageImporter,
        page_no: usize,
        page_box: ImportBox,
    ) -> Result<ImportedTemplate> {
        if self.security.is_some() {
            return Err(FolioError::InvalidConfig(
                "pages cannot be imported into a protected document".to_string(),
            ));
        }
        if page_no == 0 {
            return Err(FolioError::InvalidPageNumber(page_no));
        }

        let start = self.next_object_number();
        importer.reserve_object_range(start);
        let page = importer.import_page(page_no, page_box)?;
        let objects = importer.exported_objects()?;
        check_contiguous(start, &objects)?;
        let end = start + objects.len();
        if page.object_number < start || page.object_number >= end {
            return Err(FolioError::OutOfRange {
                index: page.object_number,
                len: end,
            });
        }

        for (_, body) in objects {
            self.store.append(PdfObject::Imported(body));
        }
        self.imported += 1;
        let name = format!("IMP{}", self.imported);
        self.resources.xobjects.insert(name.clone(), page.object_number - 1);
        debug!(
            %name,
            page_no,
            template_id = page.template_id,
            objects = end - start,
            "page imported"
        );
        Ok(ImportedTemplate {
            name,
            width: page.width,
            height: page.height,
        })
    }

    /// Draw an imported page with its top-left corner at (x, y). A zero
    /// `size` side keeps the page's own size on that axis.
    pub fn use_imported_template(
        &mut self,
        imported: &ImportedTemplate,
        x: f64,
        y: f64,
        size: Rect,
    ) -> Result<()> {
        let result = self.place_imported(imported, x, y, size);
        self.record(result)
    }

    fn place_imported(&mut self, imported: &ImportedTemplate, x: f64, y: f64, size: Rect) -> Result<()> {
        if !self.resources.xobjects.contains_key(&imported.name) {
            return Err(FolioError::InvalidConfig(format!(
                "{} was not imported into this document",
                imported.name
            )));
        }
        if imported.width <= 0.0 || imported.height <= 0.0 {
            return Err(FolioError::InvalidRect(format!(
                "imported page {} x {}",
                imported.width, imported.height
            )));
        }
        let top = self.pdf_y(y)?;
        let w = if size.w > 0.0 { self.to_pt(size.w) } else { imported.width };
        let h = if size.h > 0.0 { self.to_pt(size.h) } else { imported.height };

        let mut ops = ContentStream::new();
        ops.save();
        ops.concat(w / imported.width, 0.0, 0.0, h / imported.height, self.to_pt(x), top - h);
        ops.draw_xobject(&imported.name);
        ops.restore();
        self.content_mut()?.extend(&ops);
        Ok(())
    }
}
