//! # Document Structure Objects
//!
//! Catalog, page tree, shared resource dictionary, outline, link
//! annotations, the Info dictionary and the `/Encrypt` dictionary.

use std::fmt::Write;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::writer::{ObjectWriter, WriteContext};
use super::{fmt_num, object_number};
use crate::crypto::hex;
use crate::error::{FolioError, Result};
use crate::units::{PageBox, Rect};

/// A page of the document. Sizes are in points.
#[derive(Debug, Clone)]
pub struct Page {
    pub size: Rect,
    /// Edges measured from the top-left corner, in points.
    pub trim_box: Option<PageBox>,
    /// Store indices of link annotations placed on this page.
    pub annotations: Vec<usize>,
}

impl Page {
    pub fn new(size: Rect, trim_box: Option<PageBox>) -> Self {
        Self {
            size,
            trim_box,
            annotations: Vec::new(),
        }
    }

    pub(crate) fn write(&self, index: usize, w: &mut ObjectWriter, ctx: &WriteContext) -> Result<()> {
        let p = ctx.prepared;
        let mut dict = format!(
            "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}]",
            p.pages,
            fmt_num(self.size.w, 2),
            fmt_num(self.size.h, 2)
        );
        if let Some(tb) = self.trim_box {
            let _ = write!(
                dict,
                " /TrimBox [{} {} {} {}]",
                fmt_num(tb.left, 2),
                fmt_num(self.size.h - tb.bottom, 2),
                fmt_num(tb.right, 2),
                fmt_num(self.size.h - tb.top, 2)
            );
        }
        let _ = write!(dict, " /Resources {} 0 R", p.procset);
        if let Some(content) = p.page_contents.get(&index) {
            let _ = write!(dict, " /Contents {} 0 R", content);
        }
        if !self.annotations.is_empty() {
            let refs: Vec<String> = self
                .annotations
                .iter()
                .map(|&a| format!("{} 0 R", object_number(a)))
                .collect();
            let _ = write!(dict, " /Annots [{}]", refs.join(" "));
        }
        dict.push_str(" >>");
        w.raw(&dict);
        Ok(())
    }
}

pub(crate) fn write_catalog(w: &mut ObjectWriter, ctx: &WriteContext) {
    let p = ctx.prepared;
    let mut dict = format!("<< /Type /Catalog /Pages {} 0 R", p.pages);
    if !p.outline_items.is_empty() {
        let _ = write!(dict, " /Outlines {} 0 R /PageMode /UseOutlines", p.outlines);
    }
    dict.push_str(" >>");
    w.raw(&dict);
}

pub(crate) fn write_pages(w: &mut ObjectWriter, ctx: &WriteContext) {
    let kids: Vec<String> = ctx
        .prepared
        .kids
        .iter()
        .map(|k| format!("{} 0 R", k))
        .collect();
    w.raw(&format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        kids.len()
    ));
}

/// The resource dictionary shared by every page and form.
pub(crate) fn write_procset(w: &mut ObjectWriter, ctx: &WriteContext) {
    let mut dict = String::from("<< /ProcSet [/PDF /Text /ImageB /ImageC /ImageI]");

    if !ctx.input.fonts.is_empty() {
        dict.push_str(" /Font <<");
        for font in ctx.input.fonts {
            let _ = write!(
                dict,
                " /{} {} 0 R",
                font.resource_name(),
                object_number(font.object_index)
            );
        }
        dict.push_str(" >>");
    }

    let resources = ctx.input.resources;
    if !resources.xobjects.is_empty() {
        dict.push_str(" /XObject <<");
        for (name, &index) in &resources.xobjects {
            let _ = write!(dict, " /{} {} 0 R", name, object_number(index));
        }
        dict.push_str(" >>");
    }
    if !resources.ext_gstates.is_empty() {
        dict.push_str(" /ExtGState <<");
        for (name, &index) in &resources.ext_gstates {
            let _ = write!(dict, " /{} {} 0 R", name, object_number(index));
        }
        dict.push_str(" >>");
    }

    dict.push_str(" >>");
    w.raw(&dict);
}

pub(crate) fn write_outlines(w: &mut ObjectWriter, ctx: &WriteContext) {
    let items = &ctx.prepared.outline_items;
    match (items.first(), items.last()) {
        (Some(first), Some(last)) => w.raw(&format!(
            "<< /Type /Outlines /First {} 0 R /Last {} 0 R /Count {} >>",
            first,
            last,
            items.len()
        )),
        _ => w.raw("<< /Type /Outlines /Count 0 >>"),
    }
}

/// A named position: zero-based page and vertical offset in PDF space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub page: usize,
    pub y: f64,
}

/// One flat outline entry.
#[derive(Debug, Clone)]
pub struct OutlineItem {
    pub title: String,
    pub page: usize,
    /// Target y in PDF space.
    pub y: f64,
}

impl OutlineItem {
    pub(crate) fn write(&self, w: &mut ObjectWriter, ctx: &WriteContext) -> Result<()> {
        let p = ctx.prepared;
        let (prev, next) = p.outline_siblings(w.number());
        w.raw("<< /Title ");
        w.text(&self.title);
        let mut dict = format!(" /Parent {} 0 R", p.outlines);
        if let Some(prev) = prev {
            let _ = write!(dict, " /Prev {} 0 R", prev);
        }
        if let Some(next) = next {
            let _ = write!(dict, " /Next {} 0 R", next);
        }
        let _ = write!(
            dict,
            " /Dest [{} 0 R /XYZ 0 {} null] >>",
            p.page_object(self.page)?,
            fmt_num(self.y, 2)
        );
        w.raw(&dict);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LinkTarget {
    Uri(String),
    /// Name of an anchor; resolved at write time.
    Anchor(String),
}

/// A link annotation. `rect` is `[x1 y1 x2 y2]` in PDF space.
#[derive(Debug, Clone)]
pub struct Annotation {
    pub rect: [f64; 4],
    pub target: LinkTarget,
}

impl Annotation {
    pub(crate) fn write(&self, w: &mut ObjectWriter, ctx: &WriteContext) -> Result<()> {
        w.raw(&format!(
            "<< /Type /Annot /Subtype /Link /Rect [{} {} {} {}] /Border [0 0 0]",
            fmt_num(self.rect[0], 2),
            fmt_num(self.rect[1], 2),
            fmt_num(self.rect[2], 2),
            fmt_num(self.rect[3], 2)
        ));
        match &self.target {
            LinkTarget::Uri(uri) => {
                w.raw(" /A << /S /URI /URI ");
                w.string(uri.as_bytes());
                w.raw(" >>");
            }
            LinkTarget::Anchor(name) => {
                let anchor = ctx
                    .input
                    .anchors
                    .get(name)
                    .ok_or_else(|| FolioError::UnknownAnchor(name.clone()))?;
                w.raw(&format!(
                    " /Dest [{} 0 R /XYZ 0 {} null]",
                    ctx.prepared.page_object(anchor.page)?,
                    fmt_num(anchor.y, 2)
                ));
            }
        }
        w.raw(" >>");
        Ok(())
    }
}

/// Document metadata. Empty fields are left out of the Info dictionary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfInfo {
    pub title: String,
    pub author: String,
    pub subject: String,
    pub keywords: String,
    pub creator: String,
    pub producer: String,
    pub creation_date: Option<DateTime<FixedOffset>>,
    pub mod_date: Option<DateTime<FixedOffset>>,
}

/// Format a date as `D:YYYYMMDDHHmmSS+HH'mm'`.
pub fn pdf_date(date: &DateTime<FixedOffset>) -> String {
    let offset = date.offset().local_minus_utc();
    let sign = if offset < 0 { '-' } else { '+' };
    let offset = offset.abs();
    format!(
        "D:{}{}{:02}'{:02}'",
        date.format("%Y%m%d%H%M%S"),
        sign,
        offset / 3600,
        (offset % 3600) / 60
    )
}

impl PdfInfo {
    pub(crate) fn write(&self, w: &mut ObjectWriter) {
        w.raw("<<");
        let fields = [
            ("Title", &self.title),
            ("Author", &self.author),
            ("Subject", &self.subject),
            ("Keywords", &self.keywords),
            ("Creator", &self.creator),
            ("Producer", &self.producer),
        ];
        for (key, value) in fields {
            if !value.is_empty() {
                w.raw(&format!(" /{} ", key));
                w.text(value);
            }
        }
        if let Some(date) = &self.creation_date {
            w.raw(" /CreationDate ");
            w.string(pdf_date(date).as_bytes());
        }
        if let Some(date) = &self.mod_date {
            w.raw(" /ModDate ");
            w.string(pdf_date(date).as_bytes());
        }
        w.raw(" >>");
    }
}

/// The `/Encrypt` dictionary. Its own strings are never encrypted.
#[derive(Debug, Clone)]
pub struct Encryption {
    pub owner_hash: Vec<u8>,
    pub user_hash: Vec<u8>,
    pub permissions: i32,
}

impl Encryption {
    pub(crate) fn write(&self, w: &mut ObjectWriter) {
        w.raw(&format!(
            "<< /Filter /Standard /V 1 /R 2 /O <{}> /U <{}> /P {} >>",
            hex(&self.owner_hash),
            hex(&self.user_hash),
            self.permissions
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_pdf_date_positive_offset() {
        let tz = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();
        let date = tz.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(pdf_date(&date), "D:20240309140507+05'30'");
    }

    #[test]
    fn test_pdf_date_negative_offset() {
        let tz = FixedOffset::west_opt(8 * 3600).unwrap();
        let date = tz.with_ymd_and_hms(2023, 12, 31, 23, 59, 0).unwrap();
        assert_eq!(pdf_date(&date), "D:20231231235900-08'00'");
    }

    #[test]
    fn test_info_omits_empty_fields() {
        let info = PdfInfo {
            title: "Report".to_string(),
            ..Default::default()
        };
        let mut w = ObjectWriter::new(5, None, 0);
        info.write(&mut w);
        assert_eq!(w.into_bytes(), b"<< /Title (Report) >>".to_vec());
    }

    #[test]
    fn test_encryption_dict() {
        let enc = Encryption {
            owner_hash: vec![0xAB; 2],
            user_hash: vec![0x01; 2],
            permissions: -60,
        };
        let mut w = ObjectWriter::new(6, None, 0);
        enc.write(&mut w);
        assert_eq!(
            String::from_utf8(w.into_bytes()).unwrap(),
            "<< /Filter /Standard /V 1 /R 2 /O <ABAB> /U <0101> /P -60 >>"
        );
    }
}
