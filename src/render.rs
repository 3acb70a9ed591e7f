use std::thread;

use typst_as_lib::TypstEngine;
use typst_as_lib::typst_kit_options::TypstKitFontOptions;
use typst_library::layout::PagedDocument;
use typst_pdf::PdfOptions;

use crate::config::ConversionOptions;
use crate::error::{Error, Result};
use crate::stylesheet::Stylesheet;
use crate::{parser, typst};

/// Turns Markdown into PDF bytes under one set of options.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    options: ConversionOptions,
}

impl Renderer {
    pub fn new(options: ConversionOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Typst markup for `markdown`, with the configured stylesheet applied.
    pub fn typst_markup(&self, markdown: &str) -> Result<String> {
        let stylesheet = self
            .options
            .stylesheet
            .as_deref()
            .map(Stylesheet::load)
            .transpose()?;
        let blocks = parser::parse(markdown);
        Ok(typst::blocks_to_typst(
            &blocks,
            &self.options,
            stylesheet.as_ref(),
        ))
    }

    /// Render `markdown` to PDF bytes.
    ///
    /// The configured render delay elapses between building the document and
    /// capturing it, so the call takes at least that long.
    pub fn render(&self, markdown: &str) -> Result<Vec<u8>> {
        let markup = self.typst_markup(markdown)?;

        let delay = self.options.render_delay;
        if !delay.is_zero() {
            log::debug!("Waiting {}ms before capture", delay.as_millis());
            thread::sleep(delay);
        }

        let doc = compile_document(markup)?;
        log::debug!("Compiled {} page(s)", doc.pages.len());

        typst_pdf::pdf(&doc, &PdfOptions::default())
            .map_err(|e| Error::Pdf(format!("{:?}", e)))
    }
}

fn compile_document(markup: String) -> Result<PagedDocument> {
    let font_options = TypstKitFontOptions::new()
        .include_embedded_fonts(true)
        .include_system_fonts(false);

    let engine = TypstEngine::builder()
        .main_file(markup)
        .search_fonts_with(font_options)
        .build();

    let compiled = engine.compile::<PagedDocument>();
    for warning in &compiled.warnings {
        log::warn!("Typst: {}", warning.message);
    }
    compiled
        .output
        .map_err(|e| Error::Compile(format!("{:?}", e)))
}
