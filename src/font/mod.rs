//! # Font Programs
//!
//! The boundary between the document engine and font parsing. The engine only
//! needs three capabilities from a font: "does this character have a glyph",
//! "what is its advance", and "give me the bytes to embed". [`FontProgram`]
//! captures exactly that; [`TrueTypeFont`] implements it with ttf-parser.
//!
//! Tests and hosts with their own font stack can implement the trait
//! directly.

pub mod subset;

use std::collections::HashMap;

use crate::error::{FolioError, Result};

pub use subset::{FontOptions, KernOverride, SubsetFont};

/// Style bits of a registered font. Underline is a rendering decoration and
/// never selects a different embedded program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FontStyle(u8);

impl FontStyle {
    pub const REGULAR: FontStyle = FontStyle(0);
    pub const ITALIC: FontStyle = FontStyle(1);
    pub const BOLD: FontStyle = FontStyle(2);
    pub const UNDERLINE: FontStyle = FontStyle(4);

    /// Parse a style string made of `B`, `I` and `U` (case-insensitive).
    /// Unknown letters are ignored.
    pub fn parse(s: &str) -> Self {
        let mut style = FontStyle::REGULAR;
        for ch in s.chars() {
            match ch.to_ascii_uppercase() {
                'B' => style = style | FontStyle::BOLD,
                'I' => style = style | FontStyle::ITALIC,
                'U' => style = style | FontStyle::UNDERLINE,
                _ => {}
            }
        }
        style
    }

    pub fn contains(self, other: FontStyle) -> bool {
        self.0 & other.0 == other.0
    }

    /// The style with the underline bit masked out; this is the style that
    /// identifies an embedded font.
    pub fn without_underline(self) -> Self {
        FontStyle(self.0 & !FontStyle::UNDERLINE.0)
    }

    pub fn is_underline(self) -> bool {
        self.contains(FontStyle::UNDERLINE)
    }
}

impl std::ops::BitOr for FontStyle {
    type Output = FontStyle;

    fn bitor(self, rhs: FontStyle) -> FontStyle {
        FontStyle(self.0 | rhs.0)
    }
}

/// Advance of a single codepoint as reported by the font program.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GlyphAdvance {
    /// Advance in text-space units (1/1000 em).
    Width(f64),
    /// The glyph has no metrics entry; the font's missing width applies.
    Missing,
    /// Intentionally zero-width (line feed, zero-width space, soft hyphen...).
    ZeroWidth,
}

/// Font-wide metrics in text-space units (1/1000 em).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    pub ascent: f64,
    pub descent: f64,
    pub cap_height: f64,
    pub bbox: [f64; 4],
    pub italic_angle: f64,
    /// FontDescriptor `/Flags`.
    pub flags: u32,
    pub stem_v: f64,
    pub underline_position: f64,
    pub underline_thickness: f64,
    /// Width used for glyphs without metrics (`/DW`).
    pub missing_width: f64,
}

/// Characters that occupy no horizontal space and never need a glyph.
pub fn is_zero_width(ch: char) -> bool {
    matches!(
        ch,
        '\n' | '\r' | '\u{00AD}' | '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}'
    )
}

/// A parsed font the engine can measure with and embed.
pub trait FontProgram: Send + Sync {
    /// PostScript name used for `/BaseFont`.
    fn postscript_name(&self) -> &str;

    fn units_per_em(&self) -> u16;

    /// Glyph index for `ch`, `None` when the font has no mapping.
    fn glyph_index(&self, ch: char) -> Option<u16>;

    /// Horizontal advance of a glyph in font units.
    fn glyph_advance(&self, gid: u16) -> Option<u16>;

    fn metrics(&self) -> FontMetrics;

    /// The raw font program for `/FontFile2`.
    fn program(&self) -> &[u8];

    /// Pair kerning in font units. Fonts without a kern table report 0.
    fn kerning(&self, _left: u16, _right: u16) -> i16 {
        0
    }

    /// Advance of `ch` in 1/1000 em.
    fn advance_width(&self, ch: char) -> GlyphAdvance {
        if is_zero_width(ch) {
            return GlyphAdvance::ZeroWidth;
        }
        let Some(gid) = self.glyph_index(ch) else {
            return GlyphAdvance::Missing;
        };
        self.glyph_width(gid)
    }

    /// Advance of a glyph in 1/1000 em.
    fn glyph_width(&self, gid: u16) -> GlyphAdvance {
        match self.glyph_advance(gid) {
            Some(adv) => GlyphAdvance::Width(adv as f64 * 1000.0 / self.units_per_em() as f64),
            None => GlyphAdvance::Missing,
        }
    }
}

/// A TrueType/OpenType font parsed with ttf-parser.
///
/// The cmap and horizontal metrics are extracted once at load time; the raw
/// bytes are kept for embedding and for kerning lookups.
pub struct TrueTypeFont {
    data: Vec<u8>,
    postscript_name: String,
    units_per_em: u16,
    cmap: HashMap<char, u16>,
    advances: Vec<u16>,
    metrics: FontMetrics,
    has_kerning: bool,
}

impl TrueTypeFont {
    /// Parse font bytes. Fails with `InvalidFontData` when ttf-parser rejects
    /// them.
    pub fn parse(data: Vec<u8>) -> Result<Self> {
        let face = ttf_parser::Face::parse(&data, 0)
            .map_err(|e| FolioError::InvalidFontData(format!("Failed to parse TTF data: {}", e)))?;

        let units_per_em = face.units_per_em();
        let scale = 1000.0 / units_per_em as f64;

        let mut cmap = HashMap::new();
        if let Some(table) = face.tables().cmap {
            for subtable in table.subtables {
                if !subtable.is_unicode() {
                    continue;
                }
                subtable.codepoints(|cp| {
                    if let Some(ch) = char::from_u32(cp) {
                        if let Some(gid) = subtable.glyph_index(cp) {
                            cmap.entry(ch).or_insert(gid.0);
                        }
                    }
                });
            }
        }

        let advances: Vec<u16> = (0..face.number_of_glyphs())
            .map(|gid| face.glyph_hor_advance(ttf_parser::GlyphId(gid)).unwrap_or(0))
            .collect();

        let postscript_name = face
            .names()
            .into_iter()
            .find(|n| n.name_id == ttf_parser::name_id::POST_SCRIPT_NAME && n.is_unicode())
            .and_then(|n| n.to_string())
            .unwrap_or_else(|| "EmbeddedFont".to_string());

        let bbox = face.global_bounding_box();
        let ascender = face.ascender();
        let underline = face.underline_metrics();

        let mut flags = 4u32; // symbolic: glyphs outside the standard Latin set
        if face.is_monospaced() {
            flags |= 1;
        }
        if face.is_italic() {
            flags |= 1 << 6;
        }

        let metrics = FontMetrics {
            ascent: ascender as f64 * scale,
            descent: face.descender() as f64 * scale,
            cap_height: face.capital_height().unwrap_or(ascender) as f64 * scale,
            bbox: [
                bbox.x_min as f64 * scale,
                bbox.y_min as f64 * scale,
                bbox.x_max as f64 * scale,
                bbox.y_max as f64 * scale,
            ],
            italic_angle: if face.is_italic() { -12.0 } else { 0.0 },
            flags,
            stem_v: if face.is_bold() { 120.0 } else { 80.0 },
            underline_position: underline.map(|u| u.position as f64 * scale).unwrap_or(-100.0),
            underline_thickness: underline.map(|u| u.thickness as f64 * scale).unwrap_or(50.0),
            missing_width: advances.first().copied().unwrap_or(0) as f64 * scale,
        };

        let has_kerning = face.tables().kern.is_some();

        Ok(Self {
            data,
            postscript_name: sanitize_font_name(&postscript_name),
            units_per_em,
            cmap,
            advances,
            metrics,
            has_kerning,
        })
    }
}

impl FontProgram for TrueTypeFont {
    fn postscript_name(&self) -> &str {
        &self.postscript_name
    }

    fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    fn glyph_index(&self, ch: char) -> Option<u16> {
        self.cmap.get(&ch).copied()
    }

    fn glyph_advance(&self, gid: u16) -> Option<u16> {
        self.advances.get(gid as usize).copied()
    }

    fn metrics(&self) -> FontMetrics {
        self.metrics
    }

    fn program(&self) -> &[u8] {
        &self.data
    }

    fn kerning(&self, left: u16, right: u16) -> i16 {
        if !self.has_kerning {
            return 0;
        }
        let Ok(face) = ttf_parser::Face::parse(&self.data, 0) else {
            return 0;
        };
        let Some(kern) = face.tables().kern else {
            return 0;
        };
        kern.subtables
            .into_iter()
            .filter(|st| st.horizontal && !st.variable)
            .find_map(|st| {
                st.glyphs_kerning(ttf_parser::GlyphId(left), ttf_parser::GlyphId(right))
            })
            .unwrap_or(0)
    }
}

/// Strip characters that are not allowed in a PDF name.
pub fn sanitize_font_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if cleaned.is_empty() {
        "EmbeddedFont".to_string()
    } else {
        cleaned
    }
}
