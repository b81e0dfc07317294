//! # Page Import
//!
//! The boundary to an external PDF importer. The importer is told where the
//! document's free object numbers start, renders the requested page as a
//! form XObject plus whatever objects it depends on, and hands those over as
//! raw object bodies keyed by number. The document appends them unchanged,
//! so their numbers must continue the store exactly.

use std::collections::BTreeMap;

use crate::error::{FolioError, Result};

/// Which page box of the source page bounds the imported form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportBox {
    #[default]
    MediaBox,
    CropBox,
    BleedBox,
    TrimBox,
    ArtBox,
}

impl ImportBox {
    pub fn pdf_name(self) -> &'static str {
        match self {
            ImportBox::MediaBox => "/MediaBox",
            ImportBox::CropBox => "/CropBox",
            ImportBox::BleedBox => "/BleedBox",
            ImportBox::TrimBox => "/TrimBox",
            ImportBox::ArtBox => "/ArtBox",
        }
    }
}

/// What an importer reports about an imported page.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedPage {
    /// Importer-assigned template id.
    pub template_id: usize,
    /// Object number of the page's form XObject among the exported objects.
    pub object_number: usize,
    /// Page size in points.
    pub width: f64,
    pub height: f64,
}

pub trait PageImporter {
    /// Object numbers from `start` on are free for the importer to use.
    fn reserve_object_range(&mut self, start: usize);

    fn import_page(&mut self, page_no: usize, page_box: ImportBox) -> Result<ImportedPage>;

    /// Bodies of every object the imported pages need, without the
    /// `n 0 obj` / `endobj` framing.
    fn exported_objects(&mut self) -> Result<BTreeMap<usize, Vec<u8>>>;
}

/// An imported page registered with a document, ready to be placed.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedTemplate {
    /// XObject resource name.
    pub name: String,
    pub width: f64,
    pub height: f64,
}

/// Check that `objects` numbers exactly `start, start + 1, ...`.
pub(crate) fn check_contiguous(start: usize, objects: &BTreeMap<usize, Vec<u8>>) -> Result<()> {
    for (offset, &number) in objects.keys().enumerate() {
        if number != start + offset {
            return Err(FolioError::OutOfRange {
                index: number,
                len: start + offset,
            });
        }
    }
    Ok(())
}
