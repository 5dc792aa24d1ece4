//! Document text extraction
//!
//! Extraction sits behind [`TextExtractor`] so ingestion does not care how
//! bytes become text. [`PdfExtractor`] is the production implementation.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use crate::errors::{RagError, Result};

/// Turns one document on disk into plain text
pub trait TextExtractor {
    /// Whether this extractor handles the file at `path`
    fn accepts(&self, path: &Path) -> bool;

    /// Extract the document's full text
    fn extract(&self, path: &Path) -> Result<String>;
}

/// PDF text extraction backed by `pdf-extract`
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn accepts(&self, path: &Path) -> bool {
        has_extension(path, "pdf")
    }

    fn extract(&self, path: &Path) -> Result<String> {
        // pdf-extract panics on some malformed inputs
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text(path)));

        match outcome {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(RagError::Extraction {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }),
            Err(_) => Err(RagError::Extraction {
                path: path.to_path_buf(),
                reason: "PDF parser panicked".to_string(),
            }),
        }
    }
}

/// Case-insensitive extension check
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}
