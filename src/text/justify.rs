//! # Justification and Paragraph Layout
//!
//! A line is parsed into words separated by runs of spaces. Justifying it
//! adds the same extra amount to every gap so the end of the last word lands
//! exactly on the target width.
//!
//! Paragraph layout decides, line by line, whether justification applies:
//! never on the final line, never on a line without a space, and never on a
//! line whose natural width is below `justify_threshold` of the target.

use super::{BreakOption, Measure, TextLayout};
use crate::error::Result;

/// Horizontal alignment of laid-out lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub width: f64,
}

/// A line split into words and the natural width of the gaps between them.
/// `gaps.len() == words.len() - 1` whenever there is at least one word.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    pub words: Vec<Word>,
    pub gaps: Vec<f64>,
}

impl ParsedLine {
    pub fn natural_width(&self) -> f64 {
        self.words.iter().map(|w| w.width).sum::<f64>() + self.gaps.iter().sum::<f64>()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedWord {
    pub text: String,
    /// Offset from the line start, in points.
    pub x: f64,
    pub width: f64,
}

/// Word positions after justification.
#[derive(Debug, Clone, PartialEq)]
pub struct Justified {
    pub words: Vec<PlacedWord>,
    /// Space added to every gap, in points.
    pub extra: f64,
    pub natural_width: f64,
}

impl Justified {
    /// Distance from the line start to the end of the last word.
    pub fn width(&self) -> f64 {
        self.words.last().map(|w| w.x + w.width).unwrap_or(0.0)
    }
}

/// One rendered line of a paragraph.
#[derive(Debug, Clone, PartialEq)]
pub struct ParagraphLine {
    pub text: String,
    /// Natural width in points.
    pub width: f64,
    /// Alignment this line is drawn with.
    pub align: Align,
    /// Word placement when the line is justified.
    pub justified: Option<Justified>,
    pub last: bool,
}

impl TextLayout {
    /// Parse `line` into words and inter-word gaps. Leading and trailing
    /// spaces are not part of any gap.
    pub fn parse_words<M: Measure + ?Sized>(&self, measure: &mut M, line: &str) -> Result<ParsedLine> {
        let mut words = Vec::new();
        let mut gaps = Vec::new();
        let mut pending_gap = String::new();

        for (i, token) in line.split(' ').enumerate() {
            if i > 0 {
                pending_gap.push(' ');
            }
            if token.is_empty() {
                continue;
            }
            if !words.is_empty() {
                gaps.push(measure.text_width(&pending_gap)?);
            }
            pending_gap.clear();
            words.push(Word {
                text: token.to_string(),
                width: measure.text_width(token)?,
            });
        }

        Ok(ParsedLine { words, gaps })
    }

    /// Spread `line` across `target_width` points.
    ///
    /// With fewer than two words there is no gap to stretch and the natural
    /// spacing is kept.
    pub fn justify<M: Measure + ?Sized>(
        &self,
        measure: &mut M,
        line: &str,
        target_width: f64,
    ) -> Result<Justified> {
        let parsed = self.parse_words(measure, line)?;
        let natural_width = parsed.natural_width();
        let extra = if parsed.words.len() >= 2 {
            (target_width - natural_width) / (parsed.words.len() - 1) as f64
        } else {
            0.0
        };

        let mut x = 0.0;
        let mut words = Vec::with_capacity(parsed.words.len());
        for (i, word) in parsed.words.into_iter().enumerate() {
            let width = word.width;
            words.push(PlacedWord {
                text: word.text,
                x,
                width,
            });
            x += width;
            if let Some(gap) = parsed.gaps.get(i) {
                x += gap + extra;
            }
        }

        Ok(Justified {
            words,
            extra,
            natural_width,
        })
    }

    /// Break `text` into lines of at most `max_width` points and decide how
    /// each is aligned.
    pub fn layout_paragraph<M: Measure + ?Sized>(
        &self,
        measure: &mut M,
        text: &str,
        max_width: f64,
        option: &BreakOption,
        align: Align,
        direction: Direction,
    ) -> Result<Vec<ParagraphLine>> {
        let lines: Vec<String> = self.split(measure, text, max_width, option)?.collect();
        let count = lines.len();
        let fallback = match direction {
            Direction::Ltr => Align::Left,
            Direction::Rtl => Align::Right,
        };

        let mut out = Vec::with_capacity(count);
        for (i, line) in lines.into_iter().enumerate() {
            let last = i + 1 == count;
            let width = measure.text_width(line.trim_end_matches(' '))?;

            let mut line_align = align;
            let mut justified = None;
            if align == Align::Justify {
                let eligible = !last
                    && line.trim().contains(' ')
                    && width >= self.settings.justify_threshold * max_width;
                if eligible {
                    justified = Some(self.justify(measure, &line, max_width)?);
                } else {
                    line_align = fallback;
                }
            }

            out.push(ParagraphLine {
                text: line,
                width,
                align: line_align,
                justified,
                last,
            });
        }
        Ok(out)
    }
}
