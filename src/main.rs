//! # Folio CLI
//!
//! Usage:
//!   folio font.ttf -o output.pdf
//!   folio font.ttf --text chapter.txt --width 160 -o output.pdf
//!   echo 'Some text' | folio font.ttf --text - -o output.pdf
//!
//! Lays out the text as a justified paragraph in the given font on A4 pages,
//! measured in millimetres, and writes the PDF. Set `RUST_LOG=folio=debug`
//! to see what the engine does.

use std::env;
use std::fs;
use std::io::{self, Read};

use folio::{Align, CellOption, Config, Document, FontOptions, FontStyle, PdfInfo, Rect, Unit};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const MARGIN_MM: f64 = 25.0;
const LINE_HEIGHT_MM: f64 = 6.0;
const FONT_SIZE: f64 = 11.0;

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "folio=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args: Vec<String> = env::args().collect();
    let Some(font_path) = args.get(1).filter(|a| !a.starts_with('-')) else {
        eprintln!("usage: folio <font.ttf> [--text FILE|-] [--width MM] [-o output.pdf]");
        std::process::exit(2);
    };
    let flag = |name: &str| {
        args.windows(2)
            .find(|w| w[0] == name)
            .map(|w| w[1].clone())
    };

    let output_path = flag("-o").unwrap_or_else(|| "output.pdf".to_string());
    let width = flag("--width")
        .and_then(|w| w.parse::<f64>().ok())
        .unwrap_or(210.0 - 2.0 * MARGIN_MM);

    let text = match flag("--text").as_deref() {
        Some("-") => {
            let mut buf = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut buf) {
                eprintln!("✗ Failed to read stdin: {}", e);
                std::process::exit(1);
            }
            buf
        }
        Some(path) => match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                eprintln!("✗ Failed to read {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => sample_text().to_string(),
    };

    let font = match fs::read(font_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("✗ Failed to read font {}: {}", font_path, e);
            std::process::exit(1);
        }
    };

    match render(font, &text, width) {
        Ok(pdf_bytes) => {
            if let Err(e) = fs::write(&output_path, &pdf_bytes) {
                eprintln!("✗ Failed to write {}: {}", output_path, e);
                std::process::exit(1);
            }
            eprintln!("✓ Written {} bytes to {}", pdf_bytes.len(), output_path);
        }
        Err(e) => {
            eprintln!("✗ Failed to render: {}", e);
            std::process::exit(1);
        }
    }
}

/// Typeset `text` paragraph by paragraph. A paragraph that would cross the
/// bottom margin starts on a new page when it fits on one.
fn render(font: Vec<u8>, text: &str, width: f64) -> folio::Result<Vec<u8>> {
    let config = Config {
        unit: Unit::Mm,
        ..Default::default()
    };
    let page_height_mm = config.unit_config().from_points(config.page_size.h);
    let mut doc = Document::new(config);
    doc.set_info(PdfInfo {
        title: "Folio sample".to_string(),
        creator: "folio".to_string(),
        ..doc.info().clone()
    });
    doc.add_ttf_font_with_options(
        "body",
        font,
        FontOptions {
            fallback: Some('?'),
            use_kerning: true,
            ..Default::default()
        },
    )?;
    doc.set_font("body", FontStyle::REGULAR, FONT_SIZE)?;

    let option = CellOption {
        align: Align::Justify,
        ..Default::default()
    };
    let bottom = page_height_mm - MARGIN_MM;

    doc.add_page()?;
    doc.set_xy(MARGIN_MM, MARGIN_MM);
    for paragraph in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let paragraph = paragraph.replace('\n', " ");
        let lines = doc.split_text(&paragraph, width)?;
        // keep whole paragraphs together when they fit on a fresh page
        let needed = lines.len() as f64 * LINE_HEIGHT_MM;
        if doc.y() + needed > bottom && needed <= bottom - MARGIN_MM {
            doc.add_page()?;
            doc.set_xy(MARGIN_MM, MARGIN_MM);
        }
        doc.multi_cell_with_option(Rect::new(width, LINE_HEIGHT_MM), &paragraph, &option)?;
        doc.br(LINE_HEIGHT_MM);
        doc.set_x(MARGIN_MM);
    }

    info!(pages = doc.page_count(), "layout finished");
    doc.to_bytes()
}

fn sample_text() -> &'static str {
    "Folio builds PDF files one command at a time. Every call appends operators to the \
     current page or creates the objects it needs, and nothing is renumbered afterwards.\n\n\
     Text is measured with the same font that gets embedded, so every glyph that influenced \
     a line break is guaranteed to be present in the widths array of the output. Lines of a \
     justified paragraph are stretched to the full width, except for the last one and for \
     lines that are too short to stretch without looking wrong."
}
