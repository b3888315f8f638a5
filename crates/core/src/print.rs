//! Print surfaces.
//!
//! A print surface accepts one rendered HTML document and makes it printable. Nothing is
//! read back from it.

use crate::{ScribeError, ScribeResult};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub trait PrintSurface {
    fn present(&mut self, html: &str) -> ScribeResult<()>;
}

/// Writes the document to an `.html` file for the user to open and print.
#[derive(Clone, Debug)]
pub struct HtmlFileSurface {
    path: PathBuf,
}

impl HtmlFileSurface {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PrintSurface for HtmlFileSurface {
    fn present(&mut self, html: &str) -> ScribeResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(ScribeError::StorageDirCreation)?;
        }
        fs::write(&self.path, html).map_err(ScribeError::FileWrite)?;
        tracing::info!(path = %self.path.display(), "report written");
        Ok(())
    }
}

/// Streams the document to any writer, such as stdout.
#[derive(Debug)]
pub struct WriterSurface<W: Write> {
    writer: W,
}

impl<W: Write> WriterSurface<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrintSurface for WriterSurface<W> {
    fn present(&mut self, html: &str) -> ScribeResult<()> {
        self.writer
            .write_all(html.as_bytes())
            .and_then(|()| self.writer.flush())
            .map_err(ScribeError::FileWrite)
    }
}
