//! Error types for booklet conversions.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    // ── Input errors ──────────────────────────────────────────────────────
    #[error("Markdown source not found: '{}'", .path.display())]
    SourceNotFound { path: PathBuf },

    #[error("Stylesheet not found: '{}'", .path.display())]
    StylesheetNotFound { path: PathBuf },

    #[error("Failed to read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid stylesheet '{}': {source}", .path.display())]
    Stylesheet {
        path: PathBuf,
        #[source]
        source: StylesheetError,
    },

    // ── Configuration errors ──────────────────────────────────────────────
    #[error("Invalid length '{0}': expected a number with a unit such as 1in, 2cm, 10mm, 12pt or 16px")]
    InvalidLength(String),

    #[error("Unknown paper format '{0}': expected one of A3, A4, A5, Legal, Letter, Tabloid")]
    UnknownPaperFormat(String),

    #[error("Config file not found: '{}'", .path.display())]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid config '{}': {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    // ── Rendering errors ──────────────────────────────────────────────────
    #[error("Typst compilation failed: {0}")]
    Compile(String),

    #[error("PDF generation failed: {0}")]
    Pdf(String),

    #[error("Failed to write '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Conversion worker panicked")]
    WorkerPanicked,
}

/// Syntax errors in a CSS stylesheet. Lines are 1-based.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StylesheetError {
    #[error("unterminated comment starting on line {line}")]
    UnclosedComment { line: usize },

    #[error("unterminated block starting on line {line}")]
    UnclosedBlock { line: usize },

    #[error("unexpected '{brace}' on line {line}")]
    UnexpectedBrace { brace: char, line: usize },
}

impl Error {
    /// Map an I/O error from reading `path`, singling out a missing file.
    pub(crate) fn read(
        path: impl Into<PathBuf>,
        source: io::Error,
        missing: fn(PathBuf) -> Error,
    ) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            missing(path)
        } else {
            Error::Read { path, source }
        }
    }
}
