//! # Graphics Resources
//!
//! Objects referenced from content streams by name: graphics states
//! (`/GSn`), soft masks, image XObjects and form XObjects.

use std::fmt::Write;

use super::writer::{ObjectWriter, WriteContext};
use super::{fmt_num, object_number};
use crate::error::Result;
use crate::style::BlendMode;

/// Extended graphics state. Unset fields are omitted from the dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExtGState {
    /// `/ca`: non-stroking alpha.
    pub fill_alpha: Option<f64>,
    /// `/CA`: stroking alpha.
    pub stroke_alpha: Option<f64>,
    pub blend_mode: Option<BlendMode>,
    /// Store index of a soft mask object.
    pub smask: Option<usize>,
}

impl ExtGState {
    /// True when the state changes nothing and need not be materialized.
    pub fn is_noop(&self) -> bool {
        self.fill_alpha.map_or(true, |a| a >= 1.0)
            && self.stroke_alpha.map_or(true, |a| a >= 1.0)
            && self.blend_mode.map_or(true, |b| b == BlendMode::Normal)
            && self.smask.is_none()
    }

    pub(crate) fn write(&self, w: &mut ObjectWriter, _ctx: &WriteContext) -> Result<()> {
        let mut dict = String::from("<< /Type /ExtGState");
        if let Some(a) = self.fill_alpha {
            let _ = write!(dict, " /ca {}", fmt_num(a, 3));
        }
        if let Some(a) = self.stroke_alpha {
            let _ = write!(dict, " /CA {}", fmt_num(a, 3));
        }
        if let Some(bm) = self.blend_mode {
            let _ = write!(dict, " /BM /{}", bm.pdf_name());
        }
        if let Some(smask) = self.smask {
            let _ = write!(dict, " /SMask {} 0 R", object_number(smask));
        }
        dict.push_str(" >>");
        w.raw(&dict);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SMaskType {
    Alpha,
    #[default]
    Luminosity,
}

impl SMaskType {
    pub fn pdf_name(self) -> &'static str {
        match self {
            SMaskType::Alpha => "Alpha",
            SMaskType::Luminosity => "Luminosity",
        }
    }
}

/// Soft mask dictionary whose `/G` is a transparency group form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SMask {
    pub subtype: SMaskType,
    /// Store index of the group form.
    pub group: usize,
}

impl SMask {
    pub(crate) fn write(&self, w: &mut ObjectWriter, _ctx: &WriteContext) -> Result<()> {
        w.raw(&format!(
            "<< /Type /Mask /S /{} /G {} 0 R >>",
            self.subtype.pdf_name(),
            object_number(self.group)
        ));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    DeviceRgb,
    DeviceGray,
    DeviceCmyk,
}

impl ColorSpace {
    pub fn pdf_name(self) -> &'static str {
        match self {
            ColorSpace::DeviceRgb => "DeviceRGB",
            ColorSpace::DeviceGray => "DeviceGray",
            ColorSpace::DeviceCmyk => "DeviceCMYK",
        }
    }

    pub fn components(self) -> usize {
        match self {
            ColorSpace::DeviceRgb => 3,
            ColorSpace::DeviceGray => 1,
            ColorSpace::DeviceCmyk => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFilter {
    /// JPEG bytes embedded as they are.
    Dct,
    /// Raw samples, deflated at write time.
    Flate,
}

#[derive(Debug, Clone)]
pub struct ImageXObject {
    pub width: u32,
    pub height: u32,
    pub color_space: ColorSpace,
    pub filter: ImageFilter,
    pub data: Vec<u8>,
    /// Store index of the alpha channel image.
    pub smask: Option<usize>,
}

impl ImageXObject {
    pub(crate) fn write(&self, w: &mut ObjectWriter, _ctx: &WriteContext) -> Result<()> {
        let mut dict = format!(
            "/Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /{} /BitsPerComponent 8",
            self.width,
            self.height,
            self.color_space.pdf_name()
        );
        if self.color_space == ColorSpace::DeviceCmyk && self.filter == ImageFilter::Dct {
            // Adobe JPEGs store CMYK inverted
            dict.push_str(" /Decode [1 0 1 0 1 0 1 0]");
        }
        if let Some(smask) = self.smask {
            let _ = write!(dict, " /SMask {} 0 R", object_number(smask));
        }
        match self.filter {
            ImageFilter::Dct => {
                dict.push_str(" /Filter /DCTDecode");
                w.stream(&dict, &self.data, false);
            }
            ImageFilter::Flate => w.stream(&dict, &self.data, true),
        }
        Ok(())
    }
}

/// A form XObject drawing with the shared resource dictionary.
#[derive(Debug, Clone)]
pub struct FormXObject {
    pub bbox: [f64; 4],
    pub content: Vec<u8>,
    /// Mark the form as a grayscale transparency group (soft mask source).
    pub transparency_group: bool,
}

impl FormXObject {
    pub(crate) fn write(&self, w: &mut ObjectWriter, ctx: &WriteContext) -> Result<()> {
        let mut dict = format!(
            "/Type /XObject /Subtype /Form /BBox [{} {} {} {}] /Resources {} 0 R",
            fmt_num(self.bbox[0], 2),
            fmt_num(self.bbox[1], 2),
            fmt_num(self.bbox[2], 2),
            fmt_num(self.bbox[3], 2),
            ctx.prepared.procset
        );
        if self.transparency_group {
            dict.push_str(" /Group << /Type /Group /S /Transparency /CS /DeviceGray >>");
        }
        w.stream(&dict, &self.content, true);
        Ok(())
    }
}
