//! Structured error types for the Folio PDF engine.
//!
//! Every public operation returns [`Result`]. Variants are grouped into four
//! kinds (see [`ErrorKind`]) so callers can decide whether a failure is the
//! caller's fault, a bad resource, a broken document structure, or an
//! operation invoked in the wrong state.

use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, FolioError>;

/// Coarse classification of a [`FolioError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input from the caller: empty text, bad rectangle, unknown family.
    Input,
    /// A font, image, or template payload could not be decoded.
    Resource,
    /// Object graph or output failure.
    Structural,
    /// Operation invoked before the required setup.
    State,
}

/// The unified error type returned by all public Folio API functions.
#[derive(Debug, Error)]
pub enum FolioError {
    #[error("text to lay out is empty")]
    EmptyInput,

    #[error("invalid rectangle: {0}")]
    InvalidRect(String),

    #[error("character {0:?} has no glyph in the active font and no fallback is configured")]
    UnsupportedGlyph(char),

    #[error("font family '{0}' is not registered")]
    MissingFontFamily(String),

    #[error("link target anchor '{0}' was never set")]
    UnknownAnchor(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid font data: {0}")]
    InvalidFontData(String),

    #[error("unsupported image format (expected JPEG or PNG)")]
    UnsupportedImageFormat,

    #[error("corrupt image data: {0}")]
    CorruptImageData(String),

    #[error("template decode failed: {0}")]
    Template(String),

    #[error("object index {index} out of range (store holds {len} objects)")]
    OutOfRange { index: usize, len: usize },

    #[error("page {0} does not exist")]
    InvalidPageNumber(usize),

    #[error("I/O failure while writing PDF: {0}")]
    Io(#[from] std::io::Error),

    #[error("an earlier operation failed, refusing to serialize: {0}")]
    PreviousFailure(String),

    #[error("no page has been added yet")]
    NoPage,

    #[error("no font has been selected")]
    NoFont,

    #[error("no template is being recorded")]
    TemplateNotOpen,

    #[error("a template is already being recorded")]
    TemplateAlreadyOpen,
}

impl FolioError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FolioError::EmptyInput
            | FolioError::InvalidRect(_)
            | FolioError::UnsupportedGlyph(_)
            | FolioError::MissingFontFamily(_)
            | FolioError::UnknownAnchor(_)
            | FolioError::InvalidConfig(_) => ErrorKind::Input,
            FolioError::InvalidFontData(_)
            | FolioError::UnsupportedImageFormat
            | FolioError::CorruptImageData(_)
            | FolioError::Template(_) => ErrorKind::Resource,
            FolioError::OutOfRange { .. }
            | FolioError::InvalidPageNumber(_)
            | FolioError::Io(_)
            | FolioError::PreviousFailure(_) => ErrorKind::Structural,
            FolioError::NoPage
            | FolioError::NoFont
            | FolioError::TemplateNotOpen
            | FolioError::TemplateAlreadyOpen => ErrorKind::State,
        }
    }
}
