//! # Document Configuration
//!
//! Everything fixed at document start: default page geometry, the unit
//! system, compression, protection, and the tunable text heuristics.
//! Deserializable from JSON so hosts can keep it next to their own config.

use serde::{Deserialize, Serialize};

use crate::error::{FolioError, Result};
use crate::units::{page_sizes, PageBox, Rect, Unit, UnitConfig};

/// Highest zlib level accepted; larger values are clamped.
pub const MAX_COMPRESS_LEVEL: i32 = 9;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default page size in points.
    pub page_size: Rect,
    pub trim_box: Option<PageBox>,
    pub unit: Unit,
    /// Points per document unit, overriding `unit` when set.
    pub conversion_for_unit: Option<f64>,
    /// zlib level for content streams. Out-of-range values are clamped into
    /// `0..=9`; `0` stores streams without a filter.
    pub compress_level: i32,
    pub protection: Option<Protection>,
    pub text: TextSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: page_sizes::A4,
            trim_box: None,
            unit: Unit::Pt,
            conversion_for_unit: None,
            compress_level: 6,
            protection: None,
            text: TextSettings::default(),
        }
    }
}

impl Config {
    /// Parse a config from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| FolioError::InvalidConfig(e.to_string()))
    }

    pub fn unit_config(&self) -> UnitConfig {
        UnitConfig {
            unit: self.unit,
            conversion_for_unit: self.conversion_for_unit,
        }
    }

    /// The compression level actually used.
    pub fn effective_compress_level(&self) -> u8 {
        clamp_compress_level(self.compress_level)
    }
}

pub fn clamp_compress_level(level: i32) -> u8 {
    level.clamp(0, MAX_COMPRESS_LEVEL) as u8
}

/// Tunable heuristics of the paragraph layout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TextSettings {
    /// A non-final line is only justified when its natural width is at least
    /// this fraction of the target width.
    pub justify_threshold: f64,
    /// Extra width, in 1/1000 em, added per punctuation glyph when measuring.
    pub punctuation_padding: f64,
}

impl Default for TextSettings {
    fn default() -> Self {
        Self {
            justify_threshold: 0.7,
            punctuation_padding: 0.0,
        }
    }
}

/// Standard security handler settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Protection {
    pub permissions: Permissions,
    pub user_password: String,
    pub owner_password: String,
}

/// Operations a viewer may allow when the document is opened with the user
/// password.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Permissions {
    pub print: bool,
    pub modify: bool,
    pub copy: bool,
    pub annotate: bool,
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            print: true,
            modify: false,
            copy: true,
            annotate: false,
        }
    }
}

impl Permissions {
    /// The `/P` value: bits 1-2 clear, bits 7-8 and 13-32 set (revision 2).
    pub fn p_value(&self) -> i32 {
        let mut p: u32 = 0xFFFF_FFC0;
        if self.print {
            p |= 1 << 2;
        }
        if self.modify {
            p |= 1 << 3;
        }
        if self.copy {
            p |= 1 << 4;
        }
        if self.annotate {
            p |= 1 << 5;
        }
        p as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_level_clamped() {
        assert_eq!(clamp_compress_level(-5), 0);
        assert_eq!(clamp_compress_level(4), 4);
        assert_eq!(clamp_compress_level(42), 9);
    }

    #[test]
    fn test_config_from_partial_json() {
        let cfg = Config::from_json(r#"{ "unit": "mm", "compress_level": 12 }"#).unwrap();
        assert_eq!(cfg.unit, Unit::Mm);
        assert_eq!(cfg.effective_compress_level(), 9);
        assert!((cfg.text.justify_threshold - 0.7).abs() < 1e-9);
        assert_eq!(cfg.page_size, page_sizes::A4);
    }

    #[test]
    fn test_config_rejects_garbage() {
        let err = Config::from_json("{ unit: ").unwrap_err();
        assert!(matches!(err, FolioError::InvalidConfig(_)));
    }

    #[test]
    fn test_permission_bits() {
        let none = Permissions {
            print: false,
            modify: false,
            copy: false,
            annotate: false,
        };
        assert_eq!(none.p_value(), 0xFFFF_FFC0u32 as i32);
        let print_only = Permissions {
            print: true,
            ..none
        };
        assert_eq!(print_only.p_value() & 0b111100, 0b000100);
    }
}
