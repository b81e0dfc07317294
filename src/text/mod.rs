//! # Text Layout
//!
//! Width measurement and line segmentation.
//!
//! Widths come from the font registry through the [`Measure`] trait, which
//! also registers every character it sees with the subset font. That
//! side effect is what keeps layout and the embedded font in agreement: any
//! glyph whose width influenced a line break is guaranteed to be in the
//! `/W` array written later.

pub mod justify;

use crate::config::TextSettings;
use crate::error::{FolioError, Result};
use crate::font::{is_zero_width, SubsetFont};

pub use justify::{Align, Direction, Justified, ParagraphLine, ParsedLine, PlacedWord, Word};

/// Source of per-character advances, in points.
pub trait Measure {
    /// Advances of `chars` in points, without pair kerning. Implementations
    /// register the characters with their font first and fail if one cannot
    /// be rendered.
    fn char_widths(&mut self, chars: &[char]) -> Result<Vec<f64>>;

    /// Kerning in points between `chars[i - 1]` and `chars[i]`, at index `i`.
    /// Index 0 is always zero.
    fn pair_kerns(&mut self, chars: &[char]) -> Result<Vec<f64>> {
        Ok(vec![0.0; chars.len()])
    }

    fn text_width(&mut self, text: &str) -> Result<f64> {
        let chars: Vec<char> = text.chars().collect();
        let advances: f64 = self.char_widths(&chars)?.iter().sum();
        let kerning: f64 = self.pair_kerns(&chars)?.iter().sum();
        Ok(advances + kerning)
    }
}

/// Measures with a registered subset font at a given size.
pub struct FontMeasure<'a> {
    font: &'a mut SubsetFont,
    font_size: f64,
    char_spacing: f64,
    punctuation_padding: f64,
}

impl<'a> FontMeasure<'a> {
    pub fn new(font: &'a mut SubsetFont, font_size: f64) -> Self {
        Self {
            font,
            font_size,
            char_spacing: 0.0,
            punctuation_padding: 0.0,
        }
    }

    pub fn with_char_spacing(mut self, spacing: f64) -> Self {
        self.char_spacing = spacing;
        self
    }

    pub fn with_punctuation_padding(mut self, padding: f64) -> Self {
        self.punctuation_padding = padding;
        self
    }
}

impl Measure for FontMeasure<'_> {
    fn char_widths(&mut self, chars: &[char]) -> Result<Vec<f64>> {
        let text: String = chars.iter().collect();
        self.font.add_chars(&text)?;

        let scale = self.font_size / 1000.0;
        let mut widths = Vec::with_capacity(chars.len());
        for &ch in chars {
            if is_zero_width(ch) {
                widths.push(0.0);
                continue;
            }
            let mut w = self.font.char_width(ch);
            if ch.is_ascii_punctuation() {
                w += self.punctuation_padding;
            }
            widths.push(w * scale + self.char_spacing);
        }
        Ok(widths)
    }

    fn pair_kerns(&mut self, chars: &[char]) -> Result<Vec<f64>> {
        let scale = self.font_size / 1000.0;
        let mut kerns = Vec::with_capacity(chars.len());
        let mut prev: Option<char> = None;
        for &ch in chars {
            if is_zero_width(ch) {
                kerns.push(0.0);
                continue;
            }
            let kern = prev.map_or(0.0, |p| self.font.kern(p, ch));
            kerns.push(kern * scale);
            prev = Some(ch);
        }
        Ok(kerns)
    }
}

/// How `split` picks the break position when a line overflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BreakMode {
    /// Break right before the character that overflows.
    #[default]
    Strict,
    /// Break at the last break indicator on the line, falling back to strict.
    IndicatorSensitive,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BreakOption {
    pub mode: BreakMode,
    /// Rune preferred as break position in indicator-sensitive mode.
    pub break_indicator: char,
    /// Appended to lines broken in strict mode (e.g. "-"); empty disables it.
    pub separator: String,
}

impl Default for BreakOption {
    fn default() -> Self {
        Self {
            mode: BreakMode::Strict,
            break_indicator: ' ',
            separator: String::new(),
        }
    }
}

impl BreakOption {
    pub fn word_safe() -> Self {
        Self {
            mode: BreakMode::IndicatorSensitive,
            ..Default::default()
        }
    }
}

/// Lines produced by [`TextLayout::split`], computed one at a time.
///
/// Every line holds at least one character unless it comes from an explicit
/// newline, so iteration always terminates.
#[derive(Debug)]
pub struct Lines {
    chars: Vec<char>,
    widths: Vec<f64>,
    kerns: Vec<f64>,
    pos: usize,
    max_width: f64,
    option: BreakOption,
    separator_width: f64,
}

impl Lines {
    fn line(&self, start: usize, end: usize) -> String {
        self.chars[start..end].iter().collect()
    }
}

impl Iterator for Lines {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let len = self.chars.len();
        if self.pos >= len {
            return None;
        }

        let start = self.pos;
        let use_separator = !self.option.separator.is_empty();
        let mut width = 0.0;
        let mut separator_point: Option<usize> = None;

        for i in start..len {
            let ch = self.chars[i];
            if ch == '\n' {
                self.pos = i + 1;
                return Some(self.line(start, i));
            }

            // kerning against the previous line's last character does not apply
            let kern = if i > start { self.kerns[i] } else { 0.0 };
            let w = self.widths[i] + kern;
            if width + w > self.max_width && i > start {
                if self.option.mode == BreakMode::IndicatorSensitive {
                    let indicator = self.option.break_indicator;
                    // the overflowing character itself may be the indicator
                    if let Some(k) = (start + 1..=i).rev().find(|&k| self.chars[k] == indicator) {
                        self.pos = k + 1;
                        return Some(self.line(start, k));
                    }
                }
                if let Some(p) = separator_point.filter(|&p| p > start) {
                    self.pos = p;
                    let mut line = self.line(start, p);
                    line.push_str(&self.option.separator);
                    return Some(line);
                }
                self.pos = i;
                return Some(self.line(start, i));
            }

            width += w;
            if use_separator && width + self.separator_width <= self.max_width {
                separator_point = Some(i + 1);
            }
        }

        self.pos = len;
        Some(self.line(start, len))
    }
}

/// Line breaking, measurement, and justification entry point.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextLayout {
    pub settings: TextSettings,
}

impl TextLayout {
    pub fn new(settings: TextSettings) -> Self {
        Self { settings }
    }

    /// Split `text` into lines no wider than `max_width` points.
    ///
    /// All characters are measured (and registered with the font) up front;
    /// segmentation then happens lazily as the returned iterator is consumed.
    pub fn split<M: Measure + ?Sized>(
        &self,
        measure: &mut M,
        text: &str,
        max_width: f64,
        option: &BreakOption,
    ) -> Result<Lines> {
        if text.is_empty() {
            return Err(FolioError::EmptyInput);
        }
        let chars: Vec<char> = text.chars().collect();
        let widths = measure.char_widths(&chars)?;
        let kerns = measure.pair_kerns(&chars)?;
        let separator_width = if option.separator.is_empty() {
            0.0
        } else {
            measure.text_width(&option.separator)?
        };
        Ok(Lines {
            chars,
            widths,
            kerns,
            pos: 0,
            max_width,
            option: option.clone(),
            separator_width,
        })
    }
}
