//! Convert a Markdown booklet into a PDF.
//!
//! Markdown is parsed with pulldown-cmark into a small block model, laid out
//! as Typst markup (page size, margins and a subset of CSS styling applied),
//! and compiled to PDF with the embedded Typst fonts.

mod block;
pub mod config;
pub mod error;
mod job;
pub mod length;
mod parser;
mod render;
pub mod stylesheet;
mod typst;

pub use block::{Block, List, ListItem, Span};
pub use config::{Config, ConversionOptions};
pub use error::{Error, Result, StylesheetError};
pub use job::{ConversionJob, PendingJob};
pub use length::{Length, Orientation, PaperFormat};
pub use render::Renderer;
pub use stylesheet::Stylesheet;

/// Parse markdown text into a vector of blocks.
pub fn parse(markdown: &str) -> Vec<Block> {
    parser::parse(markdown)
}

/// Convert markdown to Typst markup with the given options.
pub fn markdown_to_typst(markdown: &str, options: &ConversionOptions) -> Result<String> {
    Renderer::new(options.clone()).typst_markup(markdown)
}

/// Convert markdown to PDF bytes with the given options.
pub fn markdown_to_pdf(markdown: &str, options: &ConversionOptions) -> Result<Vec<u8>> {
    Renderer::new(options.clone()).render(markdown)
}
