//! Font measurement, line splitting and text placement.

use super::Document;
use crate::error::{FolioError, Result};
use crate::pdf::ContentStream;
use crate::style::PaintStyle;
use crate::text::{Align, BreakOption, Direction, FontMeasure, Measure};
use crate::units::Rect;

/// Which edges of a cell get a border.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Border(u8);

impl Border {
    pub const NONE: Border = Border(0);
    pub const LEFT: Border = Border(1);
    pub const TOP: Border = Border(2);
    pub const RIGHT: Border = Border(4);
    pub const BOTTOM: Border = Border(8);
    pub const ALL: Border = Border(15);

    pub fn contains(self, other: Border) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for Border {
    type Output = Border;

    fn bitor(self, rhs: Border) -> Border {
        Border(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VAlign {
    #[default]
    Top,
    Middle,
    Bottom,
}

/// Where the cursor moves after a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Float {
    /// To the right edge of the cell, same line.
    #[default]
    Right,
    /// Below the cell, same x.
    Bottom,
}

#[derive(Debug, Clone)]
pub struct CellOption {
    pub align: Align,
    pub valign: VAlign,
    pub border: Border,
    pub float: Float,
    /// Used by multi-line cells only.
    pub break_option: BreakOption,
    pub direction: Direction,
}

impl Default for CellOption {
    fn default() -> Self {
        Self {
            align: Align::Left,
            valign: VAlign::Top,
            border: Border::NONE,
            float: Float::Right,
            break_option: BreakOption::word_safe(),
            direction: Direction::Ltr,
        }
    }
}

impl Document {
    fn font_measure(&mut self, font: usize) -> FontMeasure<'_> {
        let size = self.state.font_size;
        let spacing = self.to_pt(self.state.char_spacing);
        let padding = self.layout.settings.punctuation_padding;
        FontMeasure::new(&mut self.fonts[font], size)
            .with_char_spacing(spacing)
            .with_punctuation_padding(padding)
    }

    /// Width of `text` in points with the current font, registering its
    /// characters.
    fn text_width_pt(&mut self, font: usize, text: &str) -> Result<f64> {
        self.font_measure(font).text_width(text)
    }

    /// Width of `text` in document units with the current font and size.
    pub fn measure_text_width(&mut self, text: &str) -> Result<f64> {
        let font = self.current_font()?;
        let width = self.text_width_pt(font, text)?;
        Ok(self.from_pt(width))
    }

    /// Split `text` into lines no wider than `width` document units,
    /// preferring breaks at spaces.
    pub fn split_text(&mut self, text: &str, width: f64) -> Result<Vec<String>> {
        self.split_text_with_option(text, width, &BreakOption::word_safe())
    }

    pub fn split_text_with_option(
        &mut self,
        text: &str,
        width: f64,
        option: &BreakOption,
    ) -> Result<Vec<String>> {
        let font = self.current_font()?;
        let max_width = self.to_pt(width);
        let layout = self.layout;
        let mut measure = self.font_measure(font);
        Ok(layout.split(&mut measure, text, max_width, option)?.collect())
    }

    /// Emit `text` with its baseline at (x, baseline), both in PDF space.
    /// Returns the drawn width in points.
    fn show_text(&mut self, text: &str, x: f64, baseline: f64) -> Result<f64> {
        let id = self.current_font()?;
        let width = self.text_width_pt(id, text)?;
        let size = self.state.font_size;
        let spacing = self.to_pt(self.state.char_spacing);

        let font = &self.fonts[id];
        let resource = font.resource_name();
        let runs = if font.uses_kerning() {
            font.encode_kerned(text)
        } else {
            vec![(font.encode_hex(text), 0.0)]
        };
        let metrics = font.metrics();

        let mut ops = ContentStream::new();
        ops.save();
        if let Some(gs) = self.transparency_gs(None) {
            ops.graphics_state(&gs);
        }
        ops.fill_color(&self.state.text_color);
        ops.begin_text();
        ops.font(&resource, size);
        if spacing != 0.0 {
            ops.char_spacing(spacing);
        }
        ops.text_position(x, baseline);
        match runs.as_slice() {
            [(hex, _)] => ops.show_hex(hex),
            _ => ops.show_positioned(&runs),
        }
        ops.end_text();
        if self.state.font_style.is_underline() {
            let position = baseline + metrics.underline_position * size / 1000.0;
            let thickness = metrics.underline_thickness * size / 1000.0;
            ops.rect(x, position - thickness / 2.0, width, thickness);
            ops.paint(PaintStyle::Fill);
        }
        ops.restore();
        self.content_mut()?.extend(&ops);
        Ok(width)
    }

    /// Baseline for a line of text in a box whose top edge is at `top`
    /// (PDF space) and which is `h` points tall.
    fn baseline(&self, font: usize, top: f64, h: f64, valign: VAlign) -> f64 {
        let metrics = self.fonts[font].metrics();
        let size = self.state.font_size;
        let ascent = metrics.ascent * size / 1000.0;
        let descent = metrics.descent * size / 1000.0;
        match valign {
            VAlign::Top => top - ascent,
            VAlign::Middle => top - h / 2.0 - (ascent + descent) / 2.0,
            VAlign::Bottom => top - h - descent,
        }
    }

    fn draw_border(&mut self, x: f64, top: f64, w: f64, h: f64, border: Border) -> Result<()> {
        let mut ops = ContentStream::new();
        ops.save();
        self.path_state(&mut ops);
        if border == Border::ALL {
            ops.rect(x, top - h, w, h);
        } else {
            let edges = [
                (Border::LEFT, (x, top), (x, top - h)),
                (Border::TOP, (x, top), (x + w, top)),
                (Border::RIGHT, (x + w, top), (x + w, top - h)),
                (Border::BOTTOM, (x, top - h), (x + w, top - h)),
            ];
            for (edge, from, to) in edges {
                if border.contains(edge) {
                    ops.move_to(from.0, from.1);
                    ops.line_to(to.0, to.1);
                }
            }
        }
        ops.paint(PaintStyle::Draw);
        ops.restore();
        self.content_mut()?.extend(&ops);
        Ok(())
    }

    /// Draw `text` with its baseline at the cursor and advance the cursor
    /// past it.
    pub fn text(&mut self, text: &str) -> Result<()> {
        let result = self.draw_text(text);
        self.record(result)
    }

    fn draw_text(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        let x = self.to_pt(self.state.x);
        let baseline = self.pdf_y(self.state.y)?;
        let width = self.show_text(text, x, baseline)?;
        self.state.x += self.from_pt(width);
        Ok(())
    }

    /// Single-line cell of size `rect` at the cursor.
    pub fn cell(&mut self, rect: Rect, text: &str) -> Result<()> {
        self.cell_with_option(rect, text, &CellOption::default())
    }

    pub fn cell_with_option(&mut self, rect: Rect, text: &str, option: &CellOption) -> Result<()> {
        let result = self.draw_cell(rect, text, option);
        self.record(result)
    }

    fn draw_cell(&mut self, rect: Rect, text: &str, option: &CellOption) -> Result<()> {
        if !rect.is_valid() {
            return Err(FolioError::InvalidRect(format!("cell {} x {}", rect.w, rect.h)));
        }
        let x = self.to_pt(self.state.x);
        let top = self.pdf_y(self.state.y)?;
        let (w, h) = (self.to_pt(rect.w), self.to_pt(rect.h));

        if !option.border.is_empty() {
            self.draw_border(x, top, w, h, option.border)?;
        }
        if !text.is_empty() {
            let font = self.current_font()?;
            let text_width = self.text_width_pt(font, text)?;
            let align = match (option.align, option.direction) {
                (Align::Justify, Direction::Rtl) => Align::Right,
                (Align::Justify, Direction::Ltr) => Align::Left,
                (align, _) => align,
            };
            let tx = x + align_offset(align, w, text_width);
            let baseline = self.baseline(font, top, h, option.valign);
            self.show_text(text, tx, baseline)?;
        }

        match option.float {
            Float::Right => self.state.x += rect.w,
            Float::Bottom => self.state.y += rect.h,
        }
        Ok(())
    }

    /// Paragraph at the cursor, `rect.w` wide, one line every `rect.h`.
    /// The cursor ends below the last line at the starting x.
    pub fn multi_cell(&mut self, rect: Rect, text: &str) -> Result<()> {
        self.multi_cell_with_option(rect, text, &CellOption::default())
    }

    pub fn multi_cell_with_option(
        &mut self,
        rect: Rect,
        text: &str,
        option: &CellOption,
    ) -> Result<()> {
        let result = self.draw_multi_cell(rect, text, option);
        self.record(result)
    }

    fn draw_multi_cell(&mut self, rect: Rect, text: &str, option: &CellOption) -> Result<()> {
        if !rect.is_valid() {
            return Err(FolioError::InvalidRect(format!("cell {} x {}", rect.w, rect.h)));
        }
        let font = self.current_font()?;
        self.canvas_size()?;
        let max_width = self.to_pt(rect.w);
        let line_height = self.to_pt(rect.h);
        let layout = self.layout;
        let lines = {
            let mut measure = self.font_measure(font);
            layout.layout_paragraph(
                &mut measure,
                text,
                max_width,
                &option.break_option,
                option.align,
                option.direction,
            )?
        };

        let start_x = self.state.x;
        for line in lines {
            let x = self.to_pt(start_x);
            let top = self.pdf_y(self.state.y)?;
            if !option.border.is_empty() {
                self.draw_border(x, top, max_width, line_height, option.border)?;
            }
            let baseline = self.baseline(font, top, line_height, option.valign);
            match &line.justified {
                Some(justified) => {
                    for word in &justified.words {
                        self.show_text(&word.text, x + word.x, baseline)?;
                    }
                }
                None => {
                    let visible = line.text.trim_end_matches(' ');
                    if !visible.is_empty() {
                        let tx = x + align_offset(line.align, max_width, line.width);
                        self.show_text(visible, tx, baseline)?;
                    }
                }
            }
            self.state.y += rect.h;
        }
        self.state.x = start_x;
        Ok(())
    }
}

fn align_offset(align: Align, box_width: f64, text_width: f64) -> f64 {
    match align {
        Align::Left | Align::Justify => 0.0,
        Align::Center => (box_width - text_width) / 2.0,
        Align::Right => box_width - text_width,
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{doc_with_font, page_content};
    use super::*;
    use crate::font::FontStyle;
    use crate::style::Color;

    #[test]
    fn test_measure_requires_font() {
        let mut doc = Document::default();
        assert!(matches!(doc.measure_text_width("a"), Err(FolioError::NoFont)));
    }

    #[test]
    fn test_measure_text_width() {
        let mut doc = doc_with_font();
        assert!((doc.measure_text_width("abcd").unwrap() - 20.0).abs() < 1e-9);
        doc.set_char_spacing(1.0);
        assert!((doc.measure_text_width("abcd").unwrap() - 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_unsupported_glyph() {
        let mut doc = doc_with_font();
        let err = doc.measure_text_width("é").unwrap_err();
        assert!(matches!(err, FolioError::UnsupportedGlyph('é')));
    }

    #[test]
    fn test_split_text_word_safe() {
        let mut doc = doc_with_font();
        assert_eq!(doc.split_text("aaaa bbbb", 27.0).unwrap(), vec!["aaaa", "bbbb"]);
        assert!(matches!(doc.split_text("", 27.0), Err(FolioError::EmptyInput)));
    }

    #[test]
    fn test_text_advances_cursor() {
        let mut doc = doc_with_font();
        doc.set_xy(10.0, 20.0);
        doc.text("Hi").unwrap();
        assert!((doc.x() - 20.0).abs() < 1e-9);
        let content = page_content(&doc, 0);
        assert!(content.contains("BT\n/F1 10 Tf\n10 821.89 Td\n<00480069> Tj\nET\n"));
    }

    #[test]
    fn test_text_color_and_size() {
        let mut doc = doc_with_font();
        doc.set_text_color(Color::Rgb(0, 0, 255));
        doc.set_font_size(20.0);
        doc.text("Hi").unwrap();
        // 2 glyphs at 500/1000 em and 20pt
        assert!((doc.x() - 20.0).abs() < 1e-9);
        let content = page_content(&doc, 0);
        assert!(content.contains("0.000 0.000 1.000 rg\nBT\n/F1 20 Tf\n"));
    }

    #[test]
    fn test_underline_rule() {
        let mut doc = doc_with_font();
        doc.set_font("half", FontStyle::UNDERLINE, 10.0).unwrap();
        doc.text("ab").unwrap();
        assert!(page_content(&doc, 0).contains("0 840.64 10 0.5 re\nf\n"));
    }

    #[test]
    fn test_cell_center_and_float() {
        let mut doc = doc_with_font();
        let option = CellOption {
            align: Align::Center,
            ..Default::default()
        };
        doc.cell_with_option(Rect::new(100.0, 20.0), "ab", &option).unwrap();
        assert!(page_content(&doc, 0).contains("45 833.89 Td"));
        assert!((doc.x() - 100.0).abs() < 1e-9);

        let option = CellOption {
            float: Float::Bottom,
            ..Default::default()
        };
        doc.cell_with_option(Rect::new(50.0, 20.0), "ab", &option).unwrap();
        assert!((doc.x() - 100.0).abs() < 1e-9);
        assert!((doc.y() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_cell_border_all() {
        let mut doc = doc_with_font();
        let option = CellOption {
            border: Border::ALL,
            ..Default::default()
        };
        doc.cell_with_option(Rect::new(40.0, 10.0), "", &option).unwrap();
        assert!(page_content(&doc, 0).contains("0 831.89 40 10 re\nS\n"));
    }

    #[test]
    fn test_multi_cell_justifies_all_but_last_line() {
        let mut doc = doc_with_font();
        let option = CellOption {
            align: Align::Justify,
            break_option: BreakOption::word_safe(),
            ..Default::default()
        };
        doc.multi_cell_with_option(Rect::new(32.0, 10.0), "aa bb cc dd", &option)
            .unwrap();
        let content = page_content(&doc, 0);
        // second word pushed so the line ends at 32
        assert!(content.contains("22 833.89 Td\n<00620062> Tj"));
        // last line keeps natural spacing
        assert!(content.contains("0 823.89 Td\n<00630063002000640064> Tj"));
        assert!((doc.y() - 20.0).abs() < 1e-9);
        assert_eq!(doc.x(), 0.0);
    }

    #[test]
    fn test_multi_cell_empty_is_error() {
        let mut doc = doc_with_font();
        let err = doc.multi_cell(Rect::new(30.0, 10.0), "").unwrap_err();
        assert!(matches!(err, FolioError::EmptyInput));
    }

    #[test]
    fn test_kerned_text_uses_tj_array() {
        let mut doc = doc_with_font();
        doc.add_font_program(
            "kerned",
            Box::new(super::super::tests::HalfEm),
            crate::font::FontOptions {
                use_kerning: true,
                ..Default::default()
            },
        )
        .unwrap();
        doc.set_kern_override("kerned", |l, r, k| if (l, r) == ('A', 'V') { -100 } else { k })
            .unwrap();
        doc.set_font("kerned", FontStyle::REGULAR, 10.0).unwrap();
        doc.text("AVA").unwrap();
        assert!(page_content(&doc, 0).contains("[<0041> 100 <00560041>] TJ"));
        // kerning shortens the advance: 3 * 5pt - 1pt
        assert!((doc.x() - 14.0).abs() < 1e-9);
    }
}
