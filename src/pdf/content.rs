//! # Content Streams
//!
//! [`ContentStream`] appends PDF operators as text to a byte buffer. It works
//! in PDF user space (points, bottom-left origin); callers convert document
//! coordinates before emitting. The same builder backs page contents,
//! template pages and form XObjects.

use std::fmt::Write;

use super::fmt_num;
use super::writer::{ObjectWriter, WriteContext};
use crate::error::Result;
use crate::style::{Color, LineCap, LineType, PaintStyle};

/// Bézier magic number for approximating a quarter circle.
const KAPPA: f64 = 0.5523;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentStream {
    buf: String,
}

fn n(v: f64) -> String {
    fmt_num(v, 2)
}

impl ContentStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buf.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn extend(&mut self, other: &ContentStream) {
        self.buf.push_str(&other.buf);
    }

    /// Append pre-built operator text.
    pub fn raw(&mut self, ops: &str) {
        self.buf.push_str(ops);
        if !ops.ends_with('\n') {
            self.buf.push('\n');
        }
    }

    pub fn save(&mut self) {
        self.buf.push_str("q\n");
    }

    pub fn restore(&mut self) {
        self.buf.push_str("Q\n");
    }

    pub fn concat(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) {
        let _ = writeln!(
            self.buf,
            "{} {} {} {} {} {} cm",
            fmt_num(a, 5),
            fmt_num(b, 5),
            fmt_num(c, 5),
            fmt_num(d, 5),
            n(e),
            n(f)
        );
    }

    /// Rotate by `degrees` counter-clockwise around (x, y).
    pub fn rotate_around(&mut self, degrees: f64, x: f64, y: f64) {
        let rad = degrees.to_radians();
        let (sin, cos) = rad.sin_cos();
        let e = x - x * cos + y * sin;
        let f = y - x * sin - y * cos;
        self.concat(cos, sin, -sin, cos, e, f);
    }

    pub fn line_width(&mut self, width: f64) {
        let _ = writeln!(self.buf, "{} w", n(width));
    }

    pub fn line_cap(&mut self, cap: LineCap) {
        let _ = writeln!(self.buf, "{} J", cap.code());
    }

    pub fn dash(&mut self, line_type: &LineType, line_width: f64) {
        let w = line_width.max(0.1);
        match line_type {
            LineType::Solid => self.buf.push_str("[] 0 d\n"),
            LineType::Dashed => {
                let _ = writeln!(self.buf, "[{} {}] 0 d", n(w * 3.0), n(w * 3.0));
            }
            LineType::Dotted => {
                let _ = writeln!(self.buf, "[{} {}] 0 d", n(w), n(w * 2.0));
            }
            LineType::Custom(pattern, phase) => {
                let items: Vec<String> = pattern.iter().map(|v| n(*v)).collect();
                let _ = writeln!(self.buf, "[{}] {} d", items.join(" "), n(*phase));
            }
        }
    }

    pub fn fill_color(&mut self, color: &Color) {
        let _ = writeln!(self.buf, "{}", color.fill_operator());
    }

    pub fn stroke_color(&mut self, color: &Color) {
        let _ = writeln!(self.buf, "{}", color.stroke_operator());
    }

    /// Select the graphics state resource `name`.
    pub fn graphics_state(&mut self, name: &str) {
        let _ = writeln!(self.buf, "/{} gs", name);
    }

    pub fn move_to(&mut self, x: f64, y: f64) {
        let _ = writeln!(self.buf, "{} {} m", n(x), n(y));
    }

    pub fn line_to(&mut self, x: f64, y: f64) {
        let _ = writeln!(self.buf, "{} {} l", n(x), n(y));
    }

    pub fn curve_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64) {
        let _ = writeln!(
            self.buf,
            "{} {} {} {} {} {} c",
            n(x1),
            n(y1),
            n(x2),
            n(y2),
            n(x3),
            n(y3)
        );
    }

    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        let _ = writeln!(self.buf, "{} {} {} {} re", n(x), n(y), n(w), n(h));
    }

    /// Rectangle with rounded corners; (x, y) is the bottom-left corner.
    pub fn rounded_rect(&mut self, x: f64, y: f64, w: f64, h: f64, r: f64) {
        let r = r.min(w / 2.0).min(h / 2.0);
        let k = r * KAPPA;
        self.move_to(x + r, y);
        self.line_to(x + w - r, y);
        self.curve_to(x + w - r + k, y, x + w, y + r - k, x + w, y + r);
        self.line_to(x + w, y + h - r);
        self.curve_to(x + w, y + h - r + k, x + w - r + k, y + h, x + w - r, y + h);
        self.line_to(x + r, y + h);
        self.curve_to(x + r - k, y + h, x, y + h - r + k, x, y + h - r);
        self.line_to(x, y + r);
        self.curve_to(x, y + r - k, x + r - k, y, x + r, y);
    }

    /// Ellipse centred on (cx, cy) built from four Bézier segments.
    pub fn ellipse(&mut self, cx: f64, cy: f64, rx: f64, ry: f64) {
        let kx = rx * KAPPA;
        let ky = ry * KAPPA;
        self.move_to(cx + rx, cy);
        self.curve_to(cx + rx, cy + ky, cx + kx, cy + ry, cx, cy + ry);
        self.curve_to(cx - kx, cy + ry, cx - rx, cy + ky, cx - rx, cy);
        self.curve_to(cx - rx, cy - ky, cx - kx, cy - ry, cx, cy - ry);
        self.curve_to(cx + kx, cy - ry, cx + rx, cy - ky, cx + rx, cy);
    }

    pub fn paint(&mut self, style: PaintStyle) {
        let _ = writeln!(self.buf, "{}", style.operator());
    }

    pub fn close_and_paint(&mut self, style: PaintStyle) {
        let _ = writeln!(self.buf, "{}", style.closing_operator());
    }

    pub fn begin_text(&mut self) {
        self.buf.push_str("BT\n");
    }

    pub fn end_text(&mut self) {
        self.buf.push_str("ET\n");
    }

    pub fn font(&mut self, resource: &str, size: f64) {
        let _ = writeln!(self.buf, "/{} {} Tf", resource, n(size));
    }

    pub fn char_spacing(&mut self, spacing: f64) {
        let _ = writeln!(self.buf, "{} Tc", n(spacing));
    }

    pub fn text_position(&mut self, x: f64, y: f64) {
        let _ = writeln!(self.buf, "{} {} Td", n(x), n(y));
    }

    /// Show a run of 2-byte glyph ids given as hex.
    pub fn show_hex(&mut self, hex: &str) {
        let _ = writeln!(self.buf, "<{}> Tj", hex);
    }

    /// Show glyph runs with positioning adjustments, in 1/1000 em, between
    /// them: positive values move the next glyph left.
    pub fn show_positioned(&mut self, runs: &[(String, f64)]) {
        self.buf.push('[');
        for (hex, adjust) in runs {
            let _ = write!(self.buf, "<{}>", hex);
            if *adjust != 0.0 {
                let _ = write!(self.buf, " {} ", fmt_num(*adjust, 3));
            }
        }
        self.buf.push_str("] TJ\n");
    }

    pub fn draw_xobject(&mut self, name: &str) {
        let _ = writeln!(self.buf, "/{} Do", name);
    }
}

/// The content stream of one page.
#[derive(Debug, Clone)]
pub struct Content {
    /// Store index of the owning page.
    pub page: usize,
    pub stream: ContentStream,
}

impl Content {
    pub fn new(page: usize) -> Self {
        Self {
            page,
            stream: ContentStream::new(),
        }
    }

    pub(crate) fn write(&self, w: &mut ObjectWriter, _ctx: &WriteContext) -> Result<()> {
        w.stream("", self.stream.as_bytes(), true);
        Ok(())
    }
}
