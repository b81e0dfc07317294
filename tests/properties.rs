//! Property-based tests for object numbering, graphics-state caching, line
//! splitting, justification, unit conversion and template encoding.

mod common;

use std::collections::HashSet;

use common::*;
use folio::cache::GraphicsCaches;
use folio::pdf::{ObjectKind, ObjectStore, ResourceDict};
use folio::text::{Measure, TextLayout};
use folio::{
    BlendMode, BreakOption, PaintStyle, Rect, Template, Transparency, Unit, UnitConfig,
};
use proptest::prelude::*;

/// Every character is `unit` points wide.
struct Monospace {
    unit: f64,
}

impl Measure for Monospace {
    fn char_widths(&mut self, chars: &[char]) -> folio::Result<Vec<f64>> {
        Ok(chars.iter().map(|_| self.unit).collect())
    }
}

#[derive(Debug, Clone)]
enum Op {
    Page,
    Line,
    Text,
    Alpha(u8),
    Outline,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Page),
        Just(Op::Line),
        Just(Op::Text),
        (0u8..5).prop_map(Op::Alpha),
        Just(Op::Outline),
    ]
}

fn alpha_strategy() -> impl Strategy<Value = Transparency> {
    (
        prop::sample::select(vec![0.1, 0.25, 0.5, 0.75, 1.0]),
        prop::sample::select(vec![BlendMode::Normal, BlendMode::Multiply]),
    )
        .prop_map(|(alpha, mode)| Transparency::new(alpha, mode))
}

fn unit_strategy() -> impl Strategy<Value = Unit> {
    prop_oneof![
        Just(Unit::Pt),
        Just(Unit::Mm),
        Just(Unit::Cm),
        Just(Unit::In),
        Just(Unit::Px),
    ]
}

proptest! {
    #[test]
    fn test_object_numbers_match_xref(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let mut doc = doc_with_font(uncompressed());
        for op in &ops {
            match op {
                Op::Page => doc.add_page().unwrap(),
                Op::Line => doc.line(0.0, 0.0, 50.0, 50.0).unwrap(),
                Op::Text => doc.text("abc").unwrap(),
                Op::Alpha(n) => doc.set_transparency(Transparency::new(
                    0.2 * (*n as f64 + 1.0),
                    BlendMode::Normal,
                )),
                Op::Outline => doc.add_outline("entry").unwrap(),
            }
        }
        prop_assert_eq!(doc.next_object_number(), doc.store().len() + 1);

        let pages = ops.iter().filter(|op| matches!(op, Op::Page)).count() + 1;
        prop_assert_eq!(doc.store().indices_of(ObjectKind::Page).count(), pages);
        prop_assert!(doc.store().indices_of(ObjectKind::Content).count() <= pages);

        let bytes = doc.to_bytes().unwrap();
        assert_valid_pdf(&bytes);
    }

    #[test]
    fn test_transparency_materialized_at_most_once(
        requests in prop::collection::vec(alpha_strategy(), 1..60)
    ) {
        let mut store = ObjectStore::new();
        let mut resources = ResourceDict::default();
        let mut caches = GraphicsCaches::new();

        let mut distinct = HashSet::new();
        for t in &requests {
            let first = caches.transparency(&mut store, &mut resources, *t);
            let again = caches.transparency(&mut store, &mut resources, *t);
            prop_assert_eq!(&first, &again);
            prop_assert_eq!(first.is_none(), t.is_noop());
            if !t.is_noop() {
                distinct.insert(((t.alpha * 100.0).round() as i64, t.blend_mode));
            }
        }
        prop_assert_eq!(store.indices_of(ObjectKind::ExtGState).count(), distinct.len());
        prop_assert_eq!(resources.ext_gstates.len(), distinct.len());
    }

    #[test]
    fn test_strict_split_keeps_every_char(
        text in "[a-z ]{1,80}",
        width in 5.0..120.0f64,
    ) {
        let mut measure = Monospace { unit: 10.0 };
        let lines: Vec<String> = TextLayout::default()
            .split(&mut measure, &text, width, &BreakOption::default())
            .unwrap()
            .collect();
        prop_assert!(lines.len() <= text.chars().count());
        prop_assert!(lines.iter().all(|l| !l.is_empty()));
        prop_assert_eq!(lines.concat(), text);
    }

    #[test]
    fn test_word_safe_split_terminates_within_width(
        words in prop::collection::vec("[a-z]{1,6}", 1..20),
        width in 60.0..200.0f64,
    ) {
        let text = words.join(" ");
        let mut measure = Monospace { unit: 10.0 };
        let lines: Vec<String> = TextLayout::default()
            .split(&mut measure, &text, width, &BreakOption::word_safe())
            .unwrap()
            .collect();
        prop_assert!(lines.len() <= text.chars().count());
        for line in &lines {
            prop_assert!(line.chars().count() as f64 * 10.0 <= width);
            prop_assert!(!line.starts_with(' ') && !line.ends_with(' '), "line {:?}", line);
        }
        // every break consumed exactly one space
        prop_assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn test_justified_line_reaches_target(
        words in prop::collection::vec("[a-z]{1,6}", 2..8),
        slack in 0.0..200.0f64,
    ) {
        let line = words.join(" ");
        let mut measure = Monospace { unit: 10.0 };
        let natural = line.chars().count() as f64 * 10.0;
        let target = natural + slack;
        let justified = TextLayout::default()
            .justify(&mut measure, &line, target)
            .unwrap();
        prop_assert_eq!(justified.words.len(), words.len());
        prop_assert!((justified.width() - target).abs() < 1e-6);
        prop_assert!((justified.natural_width - natural).abs() < 1e-6);
        prop_assert_eq!(justified.words[0].x, 0.0);
    }

    #[test]
    fn test_unit_conversion_round_trip(unit in unit_strategy(), v in -5000.0..5000.0f64) {
        let units = UnitConfig::new(unit);
        let back = units.from_points(units.to_points(v));
        prop_assert!((back - v).abs() < 1e-9 * v.abs().max(1.0));
    }

    #[test]
    fn test_template_encoding_round_trip(
        shapes in prop::collection::vec((0.0..50.0f64, 0.0..50.0f64, 1.0..20.0f64), 1..10),
        label in "[A-Za-z ]{0,12}",
    ) {
        let mut doc = doc_with_font(uncompressed());
        doc.begin_template(Rect::new(80.0, 80.0)).unwrap();
        for (x, y, side) in &shapes {
            doc.rectangle(*x, *y, *side, *side, PaintStyle::DrawFill, 0.0).unwrap();
        }
        doc.set_xy(2.0, 70.0);
        doc.text(&label).unwrap();
        let template = doc.end_template().unwrap();

        let decoded = Template::deserialize(&template.serialize().unwrap()).unwrap();
        prop_assert_eq!(decoded.id(), template.id());
        prop_assert_eq!(decoded.bytes(), template.bytes());
        prop_assert_eq!(decoded.size(), template.size());

        // the decoded content refers to /F1, so the target registers the same font
        let mut other = doc_with_font(uncompressed());
        other.use_template(&decoded, 0.0, 0.0, Rect::default()).unwrap();
        let bytes = other.to_bytes().unwrap();
        assert_valid_pdf(&bytes);
        let pdf = text_of(&bytes);
        prop_assert!(pdf.contains("/Font << /F1 "));
        let expected_do = format!("/{} Do", decoded.resource_name());
        prop_assert!(pdf.contains(&expected_do));
    }
}
