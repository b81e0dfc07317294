//! # Units and Geometry
//!
//! PDF user space is measured in points (1/72 inch). Callers work in whatever
//! unit the document is configured with; every geometry argument is converted
//! to points before an operator is emitted.

use serde::{Deserialize, Serialize};

/// A physical unit the document API accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Pt,
    Mm,
    Cm,
    In,
    /// CSS pixel at 96 dpi.
    Px,
}

impl Unit {
    /// Points per one of this unit.
    pub fn points_per_unit(self) -> f64 {
        match self {
            Unit::Pt => 1.0,
            Unit::Mm => 72.0 / 25.4,
            Unit::Cm => 72.0 / 2.54,
            Unit::In => 72.0,
            Unit::Px => 0.75,
        }
    }
}

/// Unit selection plus an optional explicit conversion factor.
///
/// When `conversion_for_unit` is set it wins over `unit`: one document unit
/// equals that many points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct UnitConfig {
    pub unit: Unit,
    pub conversion_for_unit: Option<f64>,
}

impl UnitConfig {
    pub fn new(unit: Unit) -> Self {
        Self {
            unit,
            conversion_for_unit: None,
        }
    }

    pub fn factor(&self) -> f64 {
        match self.conversion_for_unit {
            Some(f) if f > 0.0 => f,
            _ => self.unit.points_per_unit(),
        }
    }

    pub fn to_points(&self, v: f64) -> f64 {
        v * self.factor()
    }

    pub fn from_points(&self, v: f64) -> f64 {
        v / self.factor()
    }

    pub fn point_to_points(&self, p: Point) -> Point {
        Point {
            x: self.to_points(p.x),
            y: self.to_points(p.y),
        }
    }

    pub fn rect_to_points(&self, r: Rect) -> Rect {
        Rect {
            w: self.to_points(r.w),
            h: self.to_points(r.h),
        }
    }

    pub fn box_to_points(&self, b: PageBox) -> PageBox {
        PageBox {
            left: self.to_points(b.left),
            top: self.to_points(b.top),
            right: self.to_points(b.right),
            bottom: self.to_points(b.bottom),
        }
    }
}

/// Convert a value in `unit` to points.
pub fn to_points(v: f64, unit: Unit) -> f64 {
    v * unit.points_per_unit()
}

/// Convert a value in points to `unit`.
pub fn from_points(v: f64, unit: Unit) -> f64 {
    v / unit.points_per_unit()
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(w: f64, h: f64) -> Self {
        Self { w, h }
    }

    pub fn is_valid(&self) -> bool {
        self.w.is_finite() && self.h.is_finite() && self.w >= 0.0 && self.h >= 0.0
    }
}

/// A box given by its four edges, measured from the page's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PageBox {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

pub mod page_sizes {
    //! Standard page sizes in points, portrait.
    use super::Rect;

    pub const A3: Rect = Rect { w: 841.89, h: 1190.55 };
    pub const A4: Rect = Rect { w: 595.28, h: 841.89 };
    pub const A5: Rect = Rect { w: 419.53, h: 595.28 };
    pub const LETTER: Rect = Rect { w: 612.0, h: 792.0 };
    pub const LEGAL: Rect = Rect { w: 612.0, h: 1008.0 };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inch_is_72_points() {
        assert!((to_points(1.0, Unit::In) - 72.0).abs() < 1e-9);
        assert!((to_points(25.4, Unit::Mm) - 72.0).abs() < 1e-9);
        assert!((to_points(2.54, Unit::Cm) - 72.0).abs() < 1e-9);
        assert!((to_points(96.0, Unit::Px) - 72.0).abs() < 1e-9);
    }

    #[test]
    fn test_conversion_override_wins() {
        let cfg = UnitConfig {
            unit: Unit::Mm,
            conversion_for_unit: Some(2.0),
        };
        assert!((cfg.to_points(10.0) - 20.0).abs() < 1e-9);
        assert!((cfg.from_points(20.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_positive_override_ignored() {
        let cfg = UnitConfig {
            unit: Unit::In,
            conversion_for_unit: Some(0.0),
        };
        assert!((cfg.to_points(1.0) - 72.0).abs() < 1e-9);
    }

    #[test]
    fn test_unit_deserializes_lowercase() {
        let u: Unit = serde_json::from_str("\"mm\"").unwrap();
        assert_eq!(u, Unit::Mm);
    }
}
