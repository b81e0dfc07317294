//! Anchors, link annotations and outline entries.

use tracing::debug;

use super::Document;
use crate::error::{FolioError, Result};
use crate::pdf::{Anchor, Annotation, LinkTarget, OutlineItem, PdfObject};

impl Document {
    /// Name the cursor's vertical position on the current page. Links may
    /// refer to the anchor before it exists; names are resolved when the
    /// document is written.
    pub fn set_anchor(&mut self, name: &str) -> Result<()> {
        let anchor = self.cursor_anchor()?;
        self.anchors.insert(name.to_string(), anchor);
        Ok(())
    }

    /// Link the area at (x, y) of size w x h on the current page to an
    /// anchor.
    pub fn add_internal_link(&mut self, anchor: &str, x: f64, y: f64, w: f64, h: f64) -> Result<()> {
        self.add_link(LinkTarget::Anchor(anchor.to_string()), x, y, w, h)
    }

    pub fn add_external_link(&mut self, url: &str, x: f64, y: f64, w: f64, h: f64) -> Result<()> {
        self.add_link(LinkTarget::Uri(url.to_string()), x, y, w, h)
    }

    /// Add a top-level bookmark pointing at the cursor on the current page.
    pub fn add_outline(&mut self, title: &str) -> Result<()> {
        let anchor = self.cursor_anchor()?;
        self.store.append(PdfObject::OutlineItem(OutlineItem {
            title: title.to_string(),
            page: anchor.page,
            y: anchor.y,
        }));
        debug!(title, page = anchor.page + 1, "outline added");
        Ok(())
    }

    fn cursor_anchor(&self) -> Result<Anchor> {
        let page = self.current_page.ok_or(FolioError::NoPage)?;
        Ok(Anchor {
            page,
            y: self.pages[page].size.h - self.to_pt(self.state.y),
        })
    }

    fn add_link(&mut self, target: LinkTarget, x: f64, y: f64, w: f64, h: f64) -> Result<()> {
        let page = self.current_page.ok_or(FolioError::NoPage)?;
        let record = self.pages[page];
        let (x1, x2) = (self.to_pt(x), self.to_pt(x + w));
        let top = record.size.h - self.to_pt(y);
        let bottom = record.size.h - self.to_pt(y + h);

        let index = self.store.append(PdfObject::Annotation(Annotation {
            rect: [x1, bottom, x2, top],
            target,
        }));
        if let PdfObject::Page(p) = self.store.get_mut(record.index)? {
            p.annotations.push(index);
        }
        Ok(())
    }
}
