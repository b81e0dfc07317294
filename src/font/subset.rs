//! # Subset Glyph Registry
//!
//! Tracks, per registered font, which characters the document actually uses
//! and the glyph each one maps to. Every string that is measured or drawn is
//! first passed through [`SubsetFont::add_chars`], so by the time the
//! serializer runs the registry holds exactly the glyphs the `/W` array and
//! the ToUnicode CMap must describe.

use std::collections::BTreeMap;
use std::fmt;

use super::{is_zero_width, FontMetrics, FontProgram, FontStyle, GlyphAdvance};
use crate::error::{FolioError, Result};

/// Adjusts the kerning value of a character pair: `(left, right, kern) -> kern`.
/// Values are in font units.
pub type KernOverride = Box<dyn Fn(char, char, i16) -> i16 + Send + Sync>;

/// Registration options for a font family.
#[derive(Debug, Clone, Copy, Default)]
pub struct FontOptions {
    pub style: FontStyle,
    /// Character whose glyph stands in for characters the font lacks.
    pub fallback: Option<char>,
    pub use_kerning: bool,
}

pub struct SubsetFont {
    pub family: String,
    pub style: FontStyle,
    program: Box<dyn FontProgram>,
    options: FontOptions,
    glyphs: BTreeMap<char, u16>,
    kern_override: Option<KernOverride>,
    /// Resource name number: this font is `/F{n}` in the procset.
    pub(crate) resource_number: usize,
    /// Store index of the `SubsetFont` object of this font's chain.
    pub(crate) object_index: usize,
}

impl fmt::Debug for SubsetFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubsetFont")
            .field("family", &self.family)
            .field("style", &self.style)
            .field("glyphs", &self.glyphs.len())
            .field("resource_number", &self.resource_number)
            .finish()
    }
}

impl SubsetFont {
    pub fn new(family: &str, program: Box<dyn FontProgram>, options: FontOptions) -> Self {
        Self {
            family: family.to_string(),
            style: options.style.without_underline(),
            program,
            options,
            glyphs: BTreeMap::new(),
            kern_override: None,
            resource_number: 0,
            object_index: 0,
        }
    }

    pub fn program(&self) -> &dyn FontProgram {
        self.program.as_ref()
    }

    pub fn metrics(&self) -> FontMetrics {
        self.program.metrics()
    }

    pub fn resource_name(&self) -> String {
        format!("F{}", self.resource_number)
    }

    pub fn set_kern_override(&mut self, f: KernOverride) {
        self.kern_override = Some(f);
    }

    pub fn uses_kerning(&self) -> bool {
        self.options.use_kerning
    }

    /// Register every character of `text`, guaranteeing each has a glyph
    /// entry. Fails with `UnsupportedGlyph` for a character the font lacks
    /// when no usable fallback is configured.
    pub fn add_chars(&mut self, text: &str) -> Result<()> {
        for ch in text.chars() {
            if is_zero_width(ch) || self.glyphs.contains_key(&ch) {
                continue;
            }
            let gid = match self.program.glyph_index(ch) {
                Some(gid) => gid,
                None => self
                    .options
                    .fallback
                    .and_then(|fb| self.program.glyph_index(fb))
                    .ok_or(FolioError::UnsupportedGlyph(ch))?,
            };
            self.glyphs.insert(ch, gid);
        }
        Ok(())
    }

    /// Whether the font can render `ch` without a fallback.
    pub fn contains_glyph(&self, ch: char) -> bool {
        is_zero_width(ch) || self.program.glyph_index(ch).is_some()
    }

    /// Glyph registered for `ch`.
    pub fn glyph(&self, ch: char) -> Option<u16> {
        self.glyphs.get(&ch).copied()
    }

    /// Registered characters and their glyphs, in character order.
    pub fn glyphs(&self) -> impl Iterator<Item = (char, u16)> + '_ {
        self.glyphs.iter().map(|(&ch, &gid)| (ch, gid))
    }

    /// Advance of a registered character in 1/1000 em.
    pub fn char_width(&self, ch: char) -> f64 {
        if is_zero_width(ch) {
            return 0.0;
        }
        let advance = match self.glyph(ch) {
            Some(gid) => self.program.glyph_width(gid),
            None => self.program.advance_width(ch),
        };
        match advance {
            GlyphAdvance::Width(w) => w,
            GlyphAdvance::ZeroWidth => 0.0,
            GlyphAdvance::Missing => self.program.metrics().missing_width,
        }
    }

    /// Pair kerning in 1/1000 em, zero unless kerning is enabled.
    pub fn kern(&self, left: char, right: char) -> f64 {
        if !self.options.use_kerning {
            return 0.0;
        }
        let (Some(l), Some(r)) = (self.glyph(left), self.glyph(right)) else {
            return 0.0;
        };
        let mut value = self.program.kerning(l, r);
        if let Some(f) = &self.kern_override {
            value = f(left, right, value);
        }
        value as f64 * 1000.0 / self.program.units_per_em() as f64
    }

    /// Width of `text` in 1/1000 em, registering its characters first.
    pub fn text_width(&mut self, text: &str, punctuation_padding: f64) -> Result<f64> {
        self.add_chars(text)?;
        let mut width = 0.0;
        let mut prev: Option<char> = None;
        for ch in text.chars() {
            width += self.char_width(ch);
            if ch.is_ascii_punctuation() {
                width += punctuation_padding;
            }
            if let Some(p) = prev {
                width += self.kern(p, ch);
            }
            prev = Some(ch);
        }
        Ok(width)
    }

    /// Hex string of 2-byte glyph ids for an Identity-H `Tj`.
    pub fn encode_hex(&self, text: &str) -> String {
        text.chars()
            .filter(|ch| !is_zero_width(*ch))
            .map(|ch| format!("{:04X}", self.glyph(ch).unwrap_or(0)))
            .collect()
    }

    /// Glyph runs split at kerned pairs, with the `TJ` adjustment that
    /// follows each run (1/1000 em, positive moves the next glyph left).
    pub fn encode_kerned(&self, text: &str) -> Vec<(String, f64)> {
        let mut runs = Vec::new();
        let mut current = String::new();
        let mut prev: Option<char> = None;
        for ch in text.chars().filter(|ch| !is_zero_width(*ch)) {
            if let Some(p) = prev {
                let kern = self.kern(p, ch);
                if kern != 0.0 {
                    runs.push((std::mem::take(&mut current), -kern));
                }
            }
            current.push_str(&format!("{:04X}", self.glyph(ch).unwrap_or(0)));
            prev = Some(ch);
        }
        runs.push((current, 0.0));
        runs
    }
}
