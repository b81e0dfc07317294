//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use folio::font::FontMetrics;
use folio::{Config, Document, FontOptions, FontProgram, FontStyle};

/// Printable ASCII mapped to its code point, every advance 600/1000 em.
/// 'A' followed by 'V' kerns by -80 units.
pub struct FixedFont;

impl FontProgram for FixedFont {
    fn postscript_name(&self) -> &str {
        "FixedSans"
    }

    fn units_per_em(&self) -> u16 {
        1000
    }

    fn glyph_index(&self, ch: char) -> Option<u16> {
        (' '..='~').contains(&ch).then_some(ch as u16)
    }

    fn glyph_advance(&self, _gid: u16) -> Option<u16> {
        Some(600)
    }

    fn metrics(&self) -> FontMetrics {
        FontMetrics {
            ascent: 750.0,
            descent: -250.0,
            cap_height: 700.0,
            bbox: [0.0, -250.0, 600.0, 750.0],
            italic_angle: 0.0,
            flags: 5,
            stem_v: 80.0,
            underline_position: -100.0,
            underline_thickness: 50.0,
            missing_width: 600.0,
        }
    }

    fn program(&self) -> &[u8] {
        b"FIXED-SANS-PROGRAM"
    }

    fn kerning(&self, left: u16, right: u16) -> i16 {
        if (left, right) == ('A' as u16, 'V' as u16) {
            -80
        } else {
            0
        }
    }
}

pub fn uncompressed() -> Config {
    Config {
        compress_level: 0,
        ..Default::default()
    }
}

/// A document with `FixedFont` registered as "fixed" at 10pt and one page.
pub fn doc_with_font(config: Config) -> Document {
    let mut doc = Document::new(config);
    doc.add_font_program("fixed", Box::new(FixedFont), FontOptions::default())
        .unwrap();
    doc.set_font("fixed", FontStyle::REGULAR, 10.0).unwrap();
    doc.add_page().unwrap();
    doc
}

pub fn text_of(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

pub fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

/// Header, xref and trailer are present, and every xref offset points at the
/// start of its object.
pub fn assert_valid_pdf(bytes: &[u8]) {
    assert!(bytes.len() > 50, "PDF too small to be valid");
    assert!(bytes.starts_with(b"%PDF-1.7"), "Missing PDF header");
    assert!(bytes.ends_with(b"%%EOF\n"), "Missing %%EOF marker");

    // the tail after the last object is plain ASCII
    let startxref = rfind(bytes, b"startxref\n").expect("missing startxref");
    let tail = text_of(&bytes[startxref + 10..]);
    let xref_offset: usize = tail
        .lines()
        .next()
        .and_then(|l| l.trim().parse().ok())
        .expect("bad startxref value");
    assert_eq!(&bytes[xref_offset..xref_offset + 4], b"xref", "startxref is off");

    let xref = text_of(&bytes[xref_offset..]);
    let mut lines = xref.lines().skip(1);
    let header = lines.next().expect("missing xref subsection");
    let size: usize = header.split(' ').nth(1).unwrap().parse().unwrap();
    assert_eq!(lines.next(), Some("0000000000 65535 f "));
    for number in 1..size {
        let entry = lines.next().expect("xref too short");
        let offset: usize = entry[..10].parse().unwrap();
        let expected = format!("{} 0 obj\n", number);
        assert_eq!(
            &bytes[offset..offset + expected.len()],
            expected.as_bytes(),
            "xref entry for object {} is off",
            number
        );
    }
    assert!(xref.contains(&format!("/Size {}", size)));
}
