//! # Folio
//!
//! An imperative PDF generation engine.
//!
//! A [`Document`] accepts drawing and text commands one at a time and turns
//! each of them, immediately, into content-stream operators and PDF objects
//! in an append-only object store. Nothing is laid out lazily and nothing is
//! renumbered: an object's number is fixed the moment it is created, and a
//! single serialization pass writes the store out in order.
//!
//! ## Architecture
//!
//! ```text
//! Document API (pages, shapes, text, images, links, templates)
//!       ↓
//!   [text]      measure with the subset font, split, justify
//!   [cache]     one graphics-state object per distinct value
//!       ↓
//!   [pdf]       object store + content streams
//!       ↓
//!   [pdf::writer]  Preparing → WritingObjects → WritingXref → WritingTrailer
//! ```
//!
//! Fonts, images and page import sit behind small boundaries
//! ([`font::FontProgram`], [`image::decode`], [`import::PageImporter`]) so
//! hosts can swap the implementations.

pub mod cache;
pub mod config;
pub mod crypto;
pub mod document;
pub mod error;
pub mod font;
pub mod image;
pub mod import;
pub mod pdf;
pub mod style;
pub mod template;
pub mod text;
pub mod units;

pub use config::{Config, Permissions, Protection, TextSettings};
pub use document::{
    Border, CellOption, Document, DrawingState, Float, ImageOptions, MaskOptions, PageOptions,
    VAlign,
};
pub use error::{ErrorKind, FolioError, Result};
pub use font::{FontOptions, FontProgram, FontStyle, TrueTypeFont};
pub use import::{ImportBox, ImportedPage, ImportedTemplate, PageImporter};
pub use pdf::{PdfInfo, SMaskType};
pub use style::{BlendMode, Color, LineCap, LineType, PaintStyle, Transparency};
pub use template::Template;
pub use text::{Align, BreakMode, BreakOption, Direction};
pub use units::{page_sizes, PageBox, Point, Rect, Unit, UnitConfig};
