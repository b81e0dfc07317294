//! # Embedded Font Chain
//!
//! Each registered font family/style is embedded as a Type0 composite font
//! with Identity-H encoding, spread over five objects appended in this
//! order:
//!
//! ```text
//! UnicodeMap         ToUnicode CMap (glyph id -> UTF-16)
//! FontFile           /FontFile2 stream with the font program
//! SubfontDescriptor  /FontDescriptor, points at FontFile
//! CidFont            /CIDFontType2 with /W widths, points at the descriptor
//! SubsetFont         /Type0 root, points at CidFont and UnicodeMap
//! ```
//!
//! Objects only hold the font registry id and the store indices of the
//! objects they reference. Widths and the CMap come from the registry's
//! glyph map at write time, so they cover exactly the glyphs that were laid
//! out. `/CIDToGIDMap /Identity` means CIDs are the program's own glyph ids.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::Write as _;

use super::writer::{ObjectWriter, WriteContext};
use super::{fmt_num, object_number};
use crate::error::Result;
use crate::font::SubsetFont;

#[derive(Debug, Clone, Copy)]
pub struct UnicodeMap {
    pub font: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct FontFile {
    pub font: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct SubfontDescriptor {
    pub font: usize,
    pub font_file: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct CidFont {
    pub font: usize,
    pub descriptor: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct SubsetFontObject {
    pub font: usize,
    pub cid_font: usize,
    pub unicode_map: usize,
}

/// Name written as `/BaseFont` and `/FontName`.
fn base_font(font: &SubsetFont) -> String {
    font.program().postscript_name().to_string()
}

impl UnicodeMap {
    pub(crate) fn write(&self, w: &mut ObjectWriter, ctx: &WriteContext) -> Result<()> {
        let font = ctx.font(self.font)?;
        let cmap = build_tounicode_cmap(font, &base_font(font));
        w.stream("", cmap.as_bytes(), true);
        Ok(())
    }
}

impl FontFile {
    pub(crate) fn write(&self, w: &mut ObjectWriter, ctx: &WriteContext) -> Result<()> {
        let program = ctx.font(self.font)?.program().program();
        w.stream(&format!("/Length1 {}", program.len()), program, true);
        Ok(())
    }
}

impl SubfontDescriptor {
    pub(crate) fn write(&self, w: &mut ObjectWriter, ctx: &WriteContext) -> Result<()> {
        let font = ctx.font(self.font)?;
        let m = font.metrics();
        let _ = write!(
            w,
            "<< /Type /FontDescriptor /FontName /{} /Flags {} \
             /FontBBox [{} {} {} {}] /ItalicAngle {} \
             /Ascent {} /Descent {} /CapHeight {} /StemV {} \
             /MissingWidth {} /FontFile2 {} 0 R >>",
            base_font(font),
            m.flags,
            m.bbox[0] as i32,
            m.bbox[1] as i32,
            m.bbox[2] as i32,
            m.bbox[3] as i32,
            fmt_num(m.italic_angle, 2),
            m.ascent as i32,
            m.descent as i32,
            m.cap_height as i32,
            m.stem_v as i32,
            m.missing_width as i32,
            object_number(self.font_file),
        );
        Ok(())
    }
}

impl CidFont {
    pub(crate) fn write(&self, w: &mut ObjectWriter, ctx: &WriteContext) -> Result<()> {
        let font = ctx.font(self.font)?;
        let _ = write!(
            w,
            "<< /Type /Font /Subtype /CIDFontType2 /BaseFont /{} \
             /CIDSystemInfo << /Registry ",
            base_font(font)
        );
        w.string(b"Adobe");
        let _ = write!(w, " /Ordering ");
        w.string(b"Identity");
        let _ = write!(
            w,
            " /Supplement 0 >> /FontDescriptor {} 0 R /DW {} /W {} /CIDToGIDMap /Identity >>",
            object_number(self.descriptor),
            font.metrics().missing_width as i32,
            build_w_array(font),
        );
        Ok(())
    }
}

impl SubsetFontObject {
    pub(crate) fn write(&self, w: &mut ObjectWriter, ctx: &WriteContext) -> Result<()> {
        let font = ctx.font(self.font)?;
        let _ = write!(
            w,
            "<< /Type /Font /Subtype /Type0 /BaseFont /{} /Encoding /Identity-H \
             /DescendantFonts [{} 0 R] /ToUnicode {} 0 R >>",
            base_font(font),
            object_number(self.cid_font),
            object_number(self.unicode_map),
        );
        Ok(())
    }
}

/// Glyph id -> first character mapped to it, for every registered glyph.
fn glyph_chars(font: &SubsetFont) -> BTreeMap<u16, char> {
    let mut map = BTreeMap::new();
    for (ch, gid) in font.glyphs() {
        map.entry(gid).or_insert(ch);
    }
    map
}

/// Build the /W array: consecutive glyph ids share one bracketed run.
/// Format: `[gid [w1 w2 ...] gid [w] ...]`
pub fn build_w_array(font: &SubsetFont) -> String {
    let mut entries: Vec<(u16, i64)> = Vec::new();
    for (gid, ch) in glyph_chars(font) {
        entries.push((gid, font.char_width(ch).round() as i64));
    }

    let mut result = String::from("[");
    let mut i = 0;
    while i < entries.len() {
        let start = entries[i].0;
        let _ = write!(result, " {} [", start);
        let mut j = i;
        while j < entries.len() && entries[j].0 as usize == start as usize + (j - i) {
            if j > i {
                result.push(' ');
            }
            let _ = write!(result, "{}", entries[j].1);
            j += 1;
        }
        result.push(']');
        i = j;
    }
    result.push_str(" ]");
    result
}

/// Build a ToUnicode CMap for text extraction and copy-paste.
pub fn build_tounicode_cmap(font: &SubsetFont, font_name: &str) -> String {
    let entries: Vec<(u16, char)> = glyph_chars(font).into_iter().collect();

    let mut cmap = String::new();
    cmap.push_str("/CIDInit /ProcSet findresource begin\n");
    cmap.push_str("12 dict begin\n");
    cmap.push_str("begincmap\n");
    cmap.push_str("/CIDSystemInfo\n");
    cmap.push_str("<< /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
    let _ = writeln!(cmap, "/CMapName /{}-UTF16 def", font_name);
    cmap.push_str("/CMapType 2 def\n");
    cmap.push_str("1 begincodespacerange\n");
    cmap.push_str("<0000> <FFFF>\n");
    cmap.push_str("endcodespacerange\n");

    // beginbfchar blocks hold at most 100 entries
    for chunk in entries.chunks(100) {
        let _ = writeln!(cmap, "{} beginbfchar", chunk.len());
        for &(gid, ch) in chunk {
            let mut units = [0u16; 2];
            let utf16: String = ch
                .encode_utf16(&mut units)
                .iter()
                .map(|u| format!("{:04X}", u))
                .collect();
            let _ = writeln!(cmap, "<{:04X}> <{}>", gid, utf16);
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str("endcmap\n");
    cmap.push_str("CMapName currentdict /CMap defineresource pop\n");
    cmap.push_str("end\n");
    cmap.push_str("end\n");
    cmap
}
