//! # Drawing Style Values
//!
//! Plain values the drawing state carries and the content accumulator turns
//! into operators.

use serde::{Deserialize, Serialize};

/// A color in exactly one of the three device color spaces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Color {
    Rgb(u8, u8, u8),
    Cmyk(u8, u8, u8, u8),
    /// 0.0 = black, 1.0 = white.
    Gray(f64),
}

impl Color {
    pub const BLACK: Color = Color::Rgb(0, 0, 0);
    pub const WHITE: Color = Color::Rgb(255, 255, 255);

    /// Operator selecting this color for fills (and text).
    pub fn fill_operator(&self) -> String {
        match *self {
            Color::Rgb(r, g, b) => format!(
                "{:.3} {:.3} {:.3} rg",
                r as f64 / 255.0,
                g as f64 / 255.0,
                b as f64 / 255.0
            ),
            Color::Cmyk(c, m, y, k) => format!(
                "{:.3} {:.3} {:.3} {:.3} k",
                c as f64 / 100.0,
                m as f64 / 100.0,
                y as f64 / 100.0,
                k as f64 / 100.0
            ),
            Color::Gray(g) => format!("{:.3} g", g.clamp(0.0, 1.0)),
        }
    }

    /// Operator selecting this color for strokes.
    pub fn stroke_operator(&self) -> String {
        match *self {
            Color::Rgb(r, g, b) => format!(
                "{:.3} {:.3} {:.3} RG",
                r as f64 / 255.0,
                g as f64 / 255.0,
                b as f64 / 255.0
            ),
            Color::Cmyk(c, m, y, k) => format!(
                "{:.3} {:.3} {:.3} {:.3} K",
                c as f64 / 100.0,
                m as f64 / 100.0,
                y as f64 / 100.0,
                k as f64 / 100.0
            ),
            Color::Gray(g) => format!("{:.3} G", g.clamp(0.0, 1.0)),
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

/// How a closed path is painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaintStyle {
    #[default]
    Draw,
    Fill,
    DrawFill,
}

impl PaintStyle {
    pub fn operator(self) -> &'static str {
        match self {
            PaintStyle::Draw => "S",
            PaintStyle::Fill => "f",
            PaintStyle::DrawFill => "B",
        }
    }

    /// Closing variant used for polygons.
    pub fn closing_operator(self) -> &'static str {
        match self {
            PaintStyle::Draw => "s",
            PaintStyle::Fill => "f",
            PaintStyle::DrawFill => "b",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum LineType {
    #[default]
    Solid,
    Dashed,
    Dotted,
    /// Dash array and phase, in document units.
    Custom(Vec<f64>, f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

impl LineCap {
    pub fn code(self) -> u8 {
        match self {
            LineCap::Butt => 0,
            LineCap::Round => 1,
            LineCap::Square => 2,
        }
    }
}

/// PDF separable and non-separable blend modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

impl BlendMode {
    pub fn pdf_name(self) -> &'static str {
        match self {
            BlendMode::Normal => "Normal",
            BlendMode::Multiply => "Multiply",
            BlendMode::Screen => "Screen",
            BlendMode::Overlay => "Overlay",
            BlendMode::Darken => "Darken",
            BlendMode::Lighten => "Lighten",
            BlendMode::ColorDodge => "ColorDodge",
            BlendMode::ColorBurn => "ColorBurn",
            BlendMode::HardLight => "HardLight",
            BlendMode::SoftLight => "SoftLight",
            BlendMode::Difference => "Difference",
            BlendMode::Exclusion => "Exclusion",
            BlendMode::Hue => "Hue",
            BlendMode::Saturation => "Saturation",
            BlendMode::Color => "Color",
            BlendMode::Luminosity => "Luminosity",
        }
    }
}

/// Constant alpha plus blend mode applied to subsequent painting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transparency {
    pub alpha: f64,
    pub blend_mode: BlendMode,
}

impl Transparency {
    pub fn new(alpha: f64, blend_mode: BlendMode) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            blend_mode,
        }
    }

    /// Fully opaque with normal blending: needs no graphics state at all.
    pub fn is_noop(&self) -> bool {
        self.alpha >= 1.0 && self.blend_mode == BlendMode::Normal
    }
}

impl Default for Transparency {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            blend_mode: BlendMode::Normal,
        }
    }
}
