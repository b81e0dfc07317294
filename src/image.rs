//! # Image Decoding
//!
//! The boundary to raster image decoding. JPEG images pass through without
//! re-encoding (DCTDecode); only their header is read for dimensions and
//! component count. PNG images are decoded with the `image` crate into raw
//! samples plus a separate alpha channel that becomes the image's `/SMask`.

use std::io::Cursor;

use crate::error::{FolioError, Result};
use crate::pdf::ColorSpace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Detect the format from magic bytes.
    pub fn detect(data: &[u8]) -> Option<Self> {
        if data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8 {
            Some(ImageFormat::Jpeg)
        } else if data.len() >= 4 && data[..4] == [0x89, 0x50, 0x4E, 0x47] {
            Some(ImageFormat::Png)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub enum ImagePayload {
    /// Original JPEG bytes.
    Jpeg(Vec<u8>),
    /// Uncompressed samples in the image's color space, plus an alpha
    /// channel when any pixel is not fully opaque.
    Raw {
        samples: Vec<u8>,
        alpha: Option<Vec<u8>>,
    },
}

#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width_px: u32,
    pub height_px: u32,
    pub color_space: ColorSpace,
    pub payload: ImagePayload,
}

/// Decode image bytes, detecting the format from their header.
pub fn decode(data: &[u8]) -> Result<DecodedImage> {
    let format = ImageFormat::detect(data).ok_or(FolioError::UnsupportedImageFormat)?;
    decode_as(data, format)
}

/// Decode image bytes of a known format.
pub fn decode_as(data: &[u8], format: ImageFormat) -> Result<DecodedImage> {
    match format {
        ImageFormat::Jpeg => decode_jpeg(data),
        ImageFormat::Png => decode_png(data),
    }
}

/// Resource name for an image: stable for identical bytes, so template
/// content referencing it stays valid in any document.
pub fn resource_name(data: &[u8]) -> String {
    let digest = md5::compute(data);
    let hex: String = digest[..8].iter().map(|b| format!("{:02x}", b)).collect();
    format!("I{}", hex)
}

fn decode_jpeg(data: &[u8]) -> Result<DecodedImage> {
    let reader = image::io::Reader::with_format(Cursor::new(data), image::ImageFormat::Jpeg);
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| FolioError::CorruptImageData(format!("Failed to read JPEG dimensions: {}", e)))?;

    Ok(DecodedImage {
        width_px: width,
        height_px: height,
        color_space: jpeg_color_space(data),
        payload: ImagePayload::Jpeg(data.to_vec()),
    })
}

/// Scan the JPEG markers for the start-of-frame segment and map its
/// component count to a color space.
fn jpeg_color_space(data: &[u8]) -> ColorSpace {
    let mut i = 2; // skip SOI
    while i + 1 < data.len() {
        if data[i] != 0xFF {
            break;
        }
        let marker = data[i + 1];
        // SOF markers: C0-C3, C5-C7, C9-CB, CD-CF
        let is_sof = matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF);
        if is_sof && i + 9 < data.len() {
            // length(2) precision(1) height(2) width(2) components(1)
            return match data[i + 9] {
                1 => ColorSpace::DeviceGray,
                4 => ColorSpace::DeviceCmyk,
                _ => ColorSpace::DeviceRgb,
            };
        }
        if i + 3 < data.len() {
            let seg_len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
            i += 2 + seg_len;
        } else {
            break;
        }
    }
    ColorSpace::DeviceRgb
}

fn decode_png(data: &[u8]) -> Result<DecodedImage> {
    let img = image::load_from_memory_with_format(data, image::ImageFormat::Png)
        .map_err(|e| FolioError::CorruptImageData(format!("Failed to decode PNG: {}", e)))?;

    let gray = matches!(
        img.color(),
        image::ColorType::L8 | image::ColorType::La8 | image::ColorType::L16 | image::ColorType::La16
    );

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let pixel_count = (width as usize) * (height as usize);
    let components = if gray { 1 } else { 3 };

    let mut samples = Vec::with_capacity(pixel_count * components);
    let mut alpha = Vec::with_capacity(pixel_count);
    let mut has_transparency = false;
    for pixel in rgba.pixels() {
        if gray {
            samples.push(pixel[0]);
        } else {
            samples.extend_from_slice(&pixel.0[..3]);
        }
        alpha.push(pixel[3]);
        has_transparency |= pixel[3] != 255;
    }

    Ok(DecodedImage {
        width_px: width,
        height_px: height,
        color_space: if gray {
            ColorSpace::DeviceGray
        } else {
            ColorSpace::DeviceRgb
        },
        payload: ImagePayload::Raw {
            samples,
            alpha: has_transparency.then_some(alpha),
        },
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};

    pub(crate) fn png_bytes(width: u32, height: u32, alpha: u8) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 10, 10, alpha]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageOutputFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([10, 200, 10]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageOutputFormat::Jpeg(80))
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(ImageFormat::detect(&[0xFF, 0xD8, 0xFF]), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::detect(&png_bytes(1, 1, 255)), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::detect(b"GIF89a"), None);
    }

    #[test]
    fn test_unknown_format_rejected() {
        let err = decode(b"not an image").unwrap_err();
        assert!(matches!(err, FolioError::UnsupportedImageFormat));
    }

    #[test]
    fn test_truncated_png_is_corrupt() {
        let bytes = png_bytes(4, 4, 255);
        let err = decode(&bytes[..20]).unwrap_err();
        assert!(matches!(err, FolioError::CorruptImageData(_)));
    }

    #[test]
    fn test_opaque_png_has_no_alpha() {
        let img = decode(&png_bytes(3, 2, 255)).unwrap();
        assert_eq!((img.width_px, img.height_px), (3, 2));
        assert_eq!(img.color_space, ColorSpace::DeviceRgb);
        match img.payload {
            ImagePayload::Raw { samples, alpha } => {
                assert_eq!(samples.len(), 3 * 2 * 3);
                assert!(alpha.is_none());
            }
            _ => panic!("expected raw samples"),
        }
    }

    #[test]
    fn test_translucent_png_keeps_alpha() {
        let img = decode(&png_bytes(2, 2, 128)).unwrap();
        match img.payload {
            ImagePayload::Raw { alpha: Some(alpha), .. } => assert_eq!(alpha, vec![128; 4]),
            _ => panic!("expected alpha channel"),
        }
    }

    #[test]
    fn test_jpeg_passthrough() {
        let bytes = jpeg_bytes(5, 4);
        let img = decode(&bytes).unwrap();
        assert_eq!((img.width_px, img.height_px), (5, 4));
        assert_eq!(img.color_space, ColorSpace::DeviceRgb);
        assert!(matches!(img.payload, ImagePayload::Jpeg(ref b) if *b == bytes));
    }

    #[test]
    fn test_resource_name_stable() {
        assert_eq!(resource_name(b"abc"), resource_name(b"abc"));
        assert_ne!(resource_name(b"abc"), resource_name(b"abd"));
        assert_eq!(resource_name(b"abc").len(), 17);
    }
}
