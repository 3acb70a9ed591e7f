//! A single Markdown-to-PDF conversion and its completion callback.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use crate::config::{Config, ConversionOptions};
use crate::error::{Error, Result};
use crate::render::Renderer;

/// One source file converted to one destination file.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionJob {
    source: PathBuf,
    destination: PathBuf,
    options: ConversionOptions,
}

impl ConversionJob {
    pub fn new(
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        options: ConversionOptions,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            options,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.job.source,
            &config.job.destination,
            config.options.clone(),
        )
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Convert synchronously and return the destination path.
    ///
    /// The destination is only touched once the PDF exists in memory, so a
    /// failed conversion never leaves a partial file behind. An existing
    /// destination is overwritten.
    pub fn run(&self) -> Result<PathBuf> {
        log::info!(
            "Converting {} -> {}",
            self.source.display(),
            self.destination.display()
        );

        let markdown = fs::read_to_string(&self.source)
            .map_err(|e| Error::read(&self.source, e, |path| Error::SourceNotFound { path }))?;

        let pdf = Renderer::new(self.options.clone()).render(&markdown)?;

        fs::write(&self.destination, &pdf).map_err(|source| Error::Write {
            path: self.destination.clone(),
            source,
        })?;
        log::info!(
            "Wrote {} bytes to {}",
            pdf.len(),
            self.destination.display()
        );

        Ok(self.destination.clone())
    }

    /// Start the conversion on a worker thread.
    ///
    /// `on_complete` runs exactly once on the worker, after the renderer
    /// finishes, with the same outcome [`PendingJob::wait`] returns.
    pub fn submit<F>(self, on_complete: F) -> PendingJob
    where
        F: FnOnce(&Result<PathBuf>) + Send + 'static,
    {
        let handle = thread::spawn(move || {
            let outcome = self.run();
            on_complete(&outcome);
            outcome
        });
        PendingJob { handle }
    }
}

/// A submitted job that has not been waited on yet.
#[derive(Debug)]
pub struct PendingJob {
    handle: JoinHandle<Result<PathBuf>>,
}

impl PendingJob {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the job completes.
    pub fn wait(self) -> Result<PathBuf> {
        self.handle.join().map_err(|_| Error::WorkerPanicked)?
    }
}
