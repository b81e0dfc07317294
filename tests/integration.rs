//! Integration tests for the Folio document pipeline.
//!
//! These tests drive the public `Document` API end to end and inspect the
//! serialized bytes. They verify:
//! - the file structure (header, xref offsets, trailer) is well formed
//! - graphics-state caching creates at most one object per value
//! - fonts, text, links, outlines and templates reach the output
//! - errors surface at the call and block serialization afterwards

mod common;

use std::sync::Arc;

use common::*;
use folio::pdf::ObjectKind;
use folio::{
    Align, BlendMode, CellOption, Config, Document, ErrorKind, FolioError, FontOptions, FontStyle,
    ImportBox, PageOptions, PaintStyle, PdfInfo, Protection, Rect, Template, Transparency, Unit,
};

// ─── Structure ──────────────────────────────────────────────────

#[test]
fn test_zero_page_document() {
    let doc = Document::new(uncompressed());
    let bytes = doc.to_bytes().unwrap();
    assert_valid_pdf(&bytes);
    let pdf = text_of(&bytes);
    assert!(pdf.contains("/Size 6 /Root 1 0 R /Info 5 0 R"));
    assert!(pdf.contains("<< /Type /Pages /Kids [] /Count 0 >>"));
    assert!(!pdf.contains("/Encrypt"));
}

#[test]
fn test_write_reports_byte_count() {
    let doc = doc_with_font(uncompressed());
    let mut sink = Vec::new();
    let written = doc.write_to(&mut sink).unwrap();
    assert_eq!(written, sink.len());
}

#[test]
fn test_pages_listed_in_creation_order() {
    let mut doc = Document::new(uncompressed());
    doc.add_page().unwrap();
    doc.add_page_with_options(PageOptions {
        size: Some(Rect::new(100.0, 50.0)),
        unit: Some(folio::UnitConfig::new(Unit::Mm)),
        ..Default::default()
    })
    .unwrap();
    let bytes = doc.to_bytes().unwrap();
    assert_valid_pdf(&bytes);
    let pdf = text_of(&bytes);
    assert!(pdf.contains("/Kids [6 0 R 7 0 R] /Count 2"));
    assert!(pdf.contains("/MediaBox [0 0 283.46 141.73]"));
}

#[test]
fn test_trim_box_written_in_pdf_space() {
    let mut doc = Document::new(Config {
        compress_level: 0,
        page_size: Rect::new(200.0, 100.0),
        trim_box: Some(folio::PageBox {
            left: 10.0,
            top: 10.0,
            right: 190.0,
            bottom: 90.0,
        }),
        ..Default::default()
    });
    doc.add_page().unwrap();
    let pdf = text_of(&doc.to_bytes().unwrap());
    assert!(pdf.contains("/TrimBox [10 10 190 90]"));
}

#[test]
fn test_next_object_number_tracks_store() {
    let mut doc = Document::new(uncompressed());
    assert_eq!(doc.next_object_number(), 6);
    doc.add_page().unwrap();
    assert_eq!(doc.next_object_number(), 7);
    doc.line(0.0, 0.0, 1.0, 1.0).unwrap();
    // the page's content object
    assert_eq!(doc.next_object_number(), 8);
    doc.line(0.0, 0.0, 2.0, 2.0).unwrap();
    assert_eq!(doc.next_object_number(), 8);
}

// ─── Compression ────────────────────────────────────────────────

#[test]
fn test_compress_level_zero_stores_plain_streams() {
    let mut doc = doc_with_font(uncompressed());
    doc.line(0.0, 0.0, 10.0, 10.0).unwrap();
    let pdf = text_of(&doc.to_bytes().unwrap());
    assert!(!pdf.contains("/FlateDecode"));
    assert!(pdf.contains("0 841.89 m"));
}

#[test]
fn test_out_of_range_compress_level_is_clamped() {
    let mut doc = doc_with_font(Config {
        compress_level: 42,
        ..Default::default()
    });
    doc.line(0.0, 0.0, 10.0, 10.0).unwrap();
    let bytes = doc.to_bytes().unwrap();
    assert_valid_pdf(&bytes);
    assert!(text_of(&bytes).contains("/FlateDecode"));
}

// ─── Graphics state caching ─────────────────────────────────────

#[test]
fn test_transparency_half_alpha_shared() {
    let mut doc = doc_with_font(uncompressed());
    doc.set_transparency(Transparency::new(0.5, BlendMode::Normal));
    for i in 0..10 {
        doc.rectangle(i as f64, 0.0, 5.0, 5.0, PaintStyle::Fill, 0.0)
            .unwrap();
    }
    doc.add_page().unwrap();
    doc.line(0.0, 0.0, 5.0, 5.0).unwrap();

    let bytes = doc.to_bytes().unwrap();
    assert_valid_pdf(&bytes);
    let pdf = text_of(&bytes);
    assert_eq!(count(&pdf, "/Type /ExtGState"), 1);
    assert!(pdf.contains("/ExtGState << /GS1 "));
    assert_eq!(count(&pdf, "/GS1 gs"), 11);
}

#[test]
fn test_transparency_opaque_creates_nothing() {
    let mut doc = doc_with_font(uncompressed());
    doc.set_transparency(Transparency::new(1.0, BlendMode::Normal));
    doc.line(0.0, 0.0, 5.0, 5.0).unwrap();
    let pdf = text_of(&doc.to_bytes().unwrap());
    assert_eq!(count(&pdf, "/Type /ExtGState"), 0);
}

#[test]
fn test_distinct_blend_modes_get_distinct_states() {
    let mut doc = doc_with_font(uncompressed());
    doc.set_transparency(Transparency::new(0.5, BlendMode::Multiply));
    doc.line(0.0, 0.0, 5.0, 5.0).unwrap();
    doc.set_transparency(Transparency::new(0.5, BlendMode::Screen));
    doc.line(0.0, 0.0, 5.0, 5.0).unwrap();
    doc.set_transparency(Transparency::new(0.5, BlendMode::Multiply));
    doc.line(0.0, 0.0, 5.0, 5.0).unwrap();
    let pdf = text_of(&doc.to_bytes().unwrap());
    assert_eq!(count(&pdf, "/Type /ExtGState"), 2);
    assert!(pdf.contains("/BM /Multiply"));
    assert!(pdf.contains("/BM /Screen"));
}

// ─── Fonts and text ─────────────────────────────────────────────

#[test]
fn test_font_chain_written() {
    let mut doc = doc_with_font(uncompressed());
    doc.set_xy(10.0, 20.0);
    doc.text("Hello").unwrap();
    let bytes = doc.to_bytes().unwrap();
    assert_valid_pdf(&bytes);
    let pdf = text_of(&bytes);

    assert!(pdf.contains("/Subtype /Type0 /BaseFont /FixedSans /Encoding /Identity-H"));
    assert!(pdf.contains("/Subtype /CIDFontType2"));
    assert!(pdf.contains("/FontFile2"));
    assert!(pdf.contains("FIXED-SANS-PROGRAM"));
    assert!(pdf.contains("/Font << /F1 10 0 R >>"));
    // glyph ids of "Helo" plus their unicode mapping
    assert!(pdf.contains("<0048> <0048>"));
    assert!(pdf.contains("<006F> <006F>"));
    assert!(pdf.contains("<00480065006C006C006F> Tj"));
}

#[test]
fn test_same_family_registered_once() {
    let mut doc = doc_with_font(uncompressed());
    let before = doc.next_object_number();
    doc.add_font_program("fixed", Box::new(FixedFont), FontOptions::default())
        .unwrap();
    doc.set_font("fixed", FontStyle::UNDERLINE, 24.0).unwrap();
    assert_eq!(doc.next_object_number(), before);
}

#[test]
fn test_invalid_ttf_rejected() {
    let mut doc = Document::default();
    let err = doc.add_ttf_font("broken", vec![1, 2, 3]).unwrap_err();
    assert!(matches!(err, FolioError::InvalidFontData(_)));
    assert_eq!(err.kind(), ErrorKind::Resource);
}

#[test]
fn test_fallback_glyph_replaces_missing_chars() {
    let mut doc = Document::new(uncompressed());
    doc.add_font_program(
        "fixed",
        Box::new(FixedFont),
        FontOptions {
            fallback: Some('?'),
            ..Default::default()
        },
    )
    .unwrap();
    doc.set_font("fixed", FontStyle::REGULAR, 10.0).unwrap();
    doc.add_page().unwrap();
    assert!(!doc.contains_glyph('€').unwrap());
    doc.text("€").unwrap();
    let pdf = text_of(&doc.to_bytes().unwrap());
    assert!(pdf.contains("<003F> Tj"));
    // the ToUnicode map still reports the real character
    assert!(pdf.contains("<003F> <20AC>"));
}

#[test]
fn test_kerning_writes_tj_array() {
    let mut doc = Document::new(uncompressed());
    doc.add_font_program(
        "fixed",
        Box::new(FixedFont),
        FontOptions {
            use_kerning: true,
            ..Default::default()
        },
    )
    .unwrap();
    doc.set_font("fixed", FontStyle::REGULAR, 10.0).unwrap();
    doc.add_page().unwrap();
    doc.text("AVE").unwrap();
    let pdf = text_of(&doc.to_bytes().unwrap());
    assert!(pdf.contains("[<0041> 80 <00560045>] TJ"));
}

#[test]
fn test_paragraph_lines_stay_within_width() {
    let mut doc = doc_with_font(uncompressed());
    let text = "the quick brown fox jumps over the lazy dog and keeps running far away";
    let lines = doc.split_text(text, 120.0).unwrap();
    assert!(lines.len() > 1);
    for line in &lines {
        assert!(doc.measure_text_width(line).unwrap() <= 120.0 + 1e-9);
    }
    let rejoined = lines.join(" ");
    assert_eq!(rejoined, text);
}

#[test]
fn test_multi_cell_moves_cursor_per_line() {
    let mut doc = doc_with_font(uncompressed());
    doc.set_xy(20.0, 30.0);
    let option = CellOption {
        align: Align::Justify,
        ..Default::default()
    };
    doc.multi_cell_with_option(
        Rect::new(120.0, 14.0),
        "the quick brown fox jumps over the lazy dog and keeps running far away",
        &option,
    )
    .unwrap();
    let lines = doc
        .split_text(
            "the quick brown fox jumps over the lazy dog and keeps running far away",
            120.0,
        )
        .unwrap()
        .len();
    assert!((doc.y() - (30.0 + 14.0 * lines as f64)).abs() < 1e-9);
    assert!((doc.x() - 20.0).abs() < 1e-9);
}

#[test]
fn test_text_without_page_is_state_error() {
    let mut doc = Document::new(uncompressed());
    doc.add_font_program("fixed", Box::new(FixedFont), FontOptions::default())
        .unwrap();
    doc.set_font("fixed", FontStyle::REGULAR, 10.0).unwrap();
    let err = doc.text("x").unwrap_err();
    assert!(matches!(err, FolioError::NoPage));
    assert_eq!(err.kind(), ErrorKind::State);
}

// ─── Errors ─────────────────────────────────────────────────────

#[test]
fn test_first_error_blocks_serialization() {
    let mut doc = doc_with_font(uncompressed());
    doc.text("ok").unwrap();
    let first = doc.text("é").unwrap_err();
    assert!(matches!(first, FolioError::UnsupportedGlyph('é')));
    // later failures do not replace the first one
    let _ = doc.rectangle(0.0, 0.0, -1.0, 1.0, PaintStyle::Draw, 0.0);
    assert_eq!(doc.first_error(), Some(first.to_string().as_str()));

    match doc.to_bytes() {
        Err(FolioError::PreviousFailure(message)) => assert_eq!(message, first.to_string()),
        other => panic!("expected PreviousFailure, got {:?}", other.map(|b| b.len())),
    }
}

#[test]
fn test_io_failure_is_fatal() {
    struct Broken;
    impl std::io::Write for Broken {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
    let doc = doc_with_font(uncompressed());
    let err = doc.write_to(&mut Broken).unwrap_err();
    assert!(matches!(err, FolioError::Io(_)));
}

// ─── Navigation ─────────────────────────────────────────────────

#[test]
fn test_links_and_outlines() {
    let mut doc = doc_with_font(uncompressed());
    doc.add_internal_link("second", 10.0, 10.0, 100.0, 20.0).unwrap();
    doc.add_external_link("https://example.com/docs", 10.0, 40.0, 100.0, 20.0)
        .unwrap();
    doc.add_outline("First").unwrap();
    doc.add_page().unwrap();
    doc.set_y(100.0);
    doc.set_anchor("second").unwrap();
    doc.add_outline("Second").unwrap();

    let bytes = doc.to_bytes().unwrap();
    assert_valid_pdf(&bytes);
    let pdf = text_of(&bytes);
    assert!(pdf.contains("/URI (https://example.com/docs)"));
    assert!(pdf.contains("/Dest [15 0 R /XYZ 0 741.89 null]"));
    assert!(pdf.contains("/Type /Outlines /First"));
    assert!(pdf.contains("/PageMode /UseOutlines"));
    assert!(pdf.contains("/Title (Second)"));
    assert_eq!(count(&pdf, "/Subtype /Link"), 2);
}

#[test]
fn test_unknown_anchor_fails_at_write() {
    let mut doc = doc_with_font(uncompressed());
    doc.add_internal_link("nowhere", 0.0, 0.0, 10.0, 10.0).unwrap();
    let err = doc.to_bytes().unwrap_err();
    assert!(matches!(err, FolioError::UnknownAnchor(_)));
    assert_eq!(err.kind(), ErrorKind::Input);
}

// ─── Metadata and protection ────────────────────────────────────

#[test]
fn test_info_dictionary() {
    let mut doc = Document::new(uncompressed());
    doc.set_info(PdfInfo {
        title: "Quarterly Report".to_string(),
        author: "Finance".to_string(),
        ..doc.info().clone()
    });
    let pdf = text_of(&doc.to_bytes().unwrap());
    assert!(pdf.contains("/Title (Quarterly Report)"));
    assert!(pdf.contains("/Author (Finance)"));
    assert!(pdf.contains("/Producer (folio)"));
    assert!(pdf.contains("/CreationDate (D:"));
    assert!(!pdf.contains("/Subject"));
}

#[test]
fn test_protected_document() {
    let mut doc = doc_with_font(Config {
        compress_level: 0,
        protection: Some(Protection {
            user_password: "user".to_string(),
            owner_password: "owner".to_string(),
            ..Default::default()
        }),
        ..Default::default()
    });
    doc.line(0.0, 0.0, 10.0, 10.0).unwrap();
    doc.add_external_link("https://example.com", 0.0, 0.0, 10.0, 10.0)
        .unwrap();

    let bytes = doc.to_bytes().unwrap();
    assert_valid_pdf(&bytes);
    let pdf = text_of(&bytes);
    assert!(pdf.contains("/Filter /Standard /V 1 /R 2"));
    assert!(pdf.contains("/Encrypt 6 0 R /ID [<"));
    // streams and strings are no longer readable
    assert!(!pdf.contains("0 841.89 m"));
    assert!(!pdf.contains("(https://example.com)"));
}

#[test]
fn test_import_refused_for_protected_document() {
    struct NeverCalled;
    impl folio::PageImporter for NeverCalled {
        fn reserve_object_range(&mut self, _start: usize) {
            panic!("importer must not be used");
        }
        fn import_page(&mut self, _: usize, _: ImportBox) -> folio::Result<folio::ImportedPage> {
            panic!("importer must not be used");
        }
        fn exported_objects(
            &mut self,
        ) -> folio::Result<std::collections::BTreeMap<usize, Vec<u8>>> {
            panic!("importer must not be used");
        }
    }
    let mut doc = Document::new(Config {
        protection: Some(Protection::default()),
        ..Default::default()
    });
    assert!(doc
        .import_page(&mut NeverCalled, 1, ImportBox::CropBox)
        .is_err());
}

/// Exports a dictionary and the page form that follows it.
struct TwoObjectImporter {
    start: usize,
}

impl folio::PageImporter for TwoObjectImporter {
    fn reserve_object_range(&mut self, start: usize) {
        self.start = start;
    }

    fn import_page(&mut self, page_no: usize, _: ImportBox) -> folio::Result<folio::ImportedPage> {
        assert_eq!(page_no, 1);
        Ok(folio::ImportedPage {
            template_id: 1,
            object_number: self.start + 1,
            width: 200.0,
            height: 100.0,
        })
    }

    fn exported_objects(&mut self) -> folio::Result<std::collections::BTreeMap<usize, Vec<u8>>> {
        let form = format!(
            "<< /Type /XObject /Subtype /Form /BBox [0 0 200 100] /Resources << /Shared {} 0 R >> /Length 0 >>\nstream\n\nendstream",
            self.start
        );
        Ok([
            (self.start, b"<< /Marker (first) >>".to_vec()),
            (self.start + 1, form.into_bytes()),
        ]
        .into_iter()
        .collect())
    }
}

#[test]
fn test_imported_page_placed() {
    let mut doc = doc_with_font(uncompressed());
    let mut importer = TwoObjectImporter { start: 0 };
    let start = doc.next_object_number();
    let tpl = doc.import_page(&mut importer, 1, ImportBox::MediaBox).unwrap();
    assert_eq!(importer.start, start);
    assert_eq!(tpl.name, "IMP1");
    assert_eq!(doc.next_object_number(), start + 2);

    doc.use_imported_template(&tpl, 0.0, 0.0, Rect::default()).unwrap();
    let bytes = doc.to_bytes().unwrap();
    assert_valid_pdf(&bytes);
    let pdf = text_of(&bytes);
    assert!(pdf.contains(&format!("{} 0 obj\n<< /Marker (first) >>\nendobj", start)));
    assert!(pdf.contains(&format!("{} 0 obj\n<< /Type /XObject /Subtype /Form", start + 1)));
    assert!(pdf.contains(&format!("/IMP1 {} 0 R", start + 1)));
    assert!(pdf.contains("/IMP1 Do"));
}

// ─── Templates ──────────────────────────────────────────────────

fn badge(doc: &mut Document) -> Arc<Template> {
    doc.begin_template(Rect::new(60.0, 20.0)).unwrap();
    doc.rectangle(0.0, 0.0, 60.0, 20.0, PaintStyle::Draw, 3.0).unwrap();
    doc.set_xy(4.0, 14.0);
    doc.text("DRAFT").unwrap();
    doc.end_template().unwrap()
}

#[test]
fn test_template_placed_on_many_pages() {
    let mut doc = doc_with_font(uncompressed());
    let tpl = badge(&mut doc);
    for _ in 0..3 {
        doc.use_template(&tpl, 10.0, 10.0, Rect::default()).unwrap();
        doc.add_page().unwrap();
    }
    let bytes = doc.to_bytes().unwrap();
    assert_valid_pdf(&bytes);
    let pdf = text_of(&bytes);
    assert_eq!(count(&pdf, "/Subtype /Form"), 1);
    assert_eq!(count(&pdf, &format!("/{} Do", tpl.resource_name())), 3);
}

#[test]
fn test_template_survives_serialization() {
    let mut doc = doc_with_font(uncompressed());
    let inner = badge(&mut doc);
    doc.begin_template(Rect::new(200.0, 100.0)).unwrap();
    doc.use_template(&inner, 0.0, 0.0, Rect::default()).unwrap();
    doc.use_template(&inner, 0.0, 50.0, Rect::default()).unwrap();
    let outer = doc.end_template().unwrap();

    let encoded = outer.serialize().unwrap();
    let decoded = Template::deserialize(&encoded).unwrap();
    assert_eq!(decoded.bytes(), outer.bytes());
    assert_eq!(decoded.id(), outer.id());
    assert_eq!(decoded.children().len(), 1);
    assert_eq!(decoded.children()[0].bytes(), inner.bytes());

    // a second document that uses the same font resource numbering
    let mut other = doc_with_font(uncompressed());
    other.use_template(&decoded, 20.0, 20.0, Rect::new(100.0, 50.0))
        .unwrap();
    let bytes = other.to_bytes().unwrap();
    assert_valid_pdf(&bytes);
    assert_eq!(count(&text_of(&bytes), "/Subtype /Form"), 2);
}

#[test]
fn test_corrupt_template_rejected() {
    let err = Template::deserialize(b"{ not json").unwrap_err();
    assert!(matches!(err, FolioError::Template(_)));
}

// ─── Concurrency ────────────────────────────────────────────────

#[test]
fn test_independent_documents_on_threads() {
    let handles: Vec<_> = (0..4)
        .map(|i| {
            std::thread::spawn(move || {
                let mut doc = doc_with_font(uncompressed());
                doc.set_transparency(Transparency::new(0.25 * (i + 1) as f64, BlendMode::Normal));
                doc.text(&format!("document {}", i)).unwrap();
                doc.to_bytes().unwrap()
            })
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        let bytes = handle.join().unwrap();
        assert_valid_pdf(&bytes);
        // alpha 1.0 (the fourth document) needs no graphics state
        let expected = if i == 3 { 0 } else { 1 };
        assert_eq!(count(&text_of(&bytes), "/Type /ExtGState"), expected);
    }
}

#[test]
fn test_store_kinds_after_drawing() {
    let mut doc = doc_with_font(uncompressed());
    doc.text("abc").unwrap();
    doc.add_outline("x").unwrap();
    let kinds: Vec<ObjectKind> = doc.store().iter().map(|o| o.kind()).collect();
    assert_eq!(kinds[0], ObjectKind::Catalog);
    assert_eq!(kinds[10], ObjectKind::Page);
    assert_eq!(kinds[11], ObjectKind::Content);
    assert_eq!(kinds[12], ObjectKind::OutlineItem);
}
