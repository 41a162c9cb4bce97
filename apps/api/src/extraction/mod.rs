//! Document text extraction.
//!
//! Wraps `pdf-extract` so that callers always get plain text back: a document
//! the library cannot read yields an empty string, never an error or a panic.
//! The pipeline swaps that empty string for [`SENTINEL_TEXT`].

use std::panic::{self, AssertUnwindSafe};

use pdf_extract::{output_doc_page, Document, PlainTextOutput};
use thiserror::Error;
use tracing::{debug, warn};

use crate::text::truncate_chars;

/// Text used downstream when nothing could be pulled out of the document.
pub const SENTINEL_TEXT: &str = "Resume content could not be extracted.";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("PDF library panicked while reading the document")]
    Panicked,
}

/// Plain text pulled from a document, capped at a fixed number of characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText(String);

impl ExtractedText {
    /// Truncates `text` to at most `cap` characters, never splitting one.
    pub fn capped(text: &str, cap: usize) -> Self {
        Self(truncate_chars(text, cap).to_string())
    }

    /// The sentinel marker for documents that yielded no text.
    pub fn sentinel(cap: usize) -> Self {
        Self::capped(SENTINEL_TEXT, cap)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_sentinel(&self) -> bool {
        self.0 == SENTINEL_TEXT
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DocumentTextExtractor {
    max_pages: Option<usize>,
    char_limit: usize,
}

impl DocumentTextExtractor {
    pub fn new(max_pages: Option<usize>, char_limit: usize) -> Self {
        Self {
            max_pages,
            char_limit,
        }
    }

    pub fn char_limit(&self) -> usize {
        self.char_limit
    }

    /// Concatenates page text (up to the page cap, skipping blank pages)
    /// and truncates it to the character limit. Returns an empty string when
    /// the document cannot be read.
    pub fn extract(&self, bytes: &[u8]) -> String {
        match self.read_pages(bytes) {
            Ok(pages) => {
                let text = join_pages(pages);
                truncate_chars(text.trim(), self.char_limit).to_string()
            }
            Err(e) => {
                warn!("Text extraction failed: {e}");
                String::new()
            }
        }
    }

    /// Like [`extract`](Self::extract) but substitutes the sentinel for an empty result.
    pub fn extract_or_sentinel(&self, bytes: &[u8]) -> ExtractedText {
        let text = self.extract(bytes);
        if text.is_empty() {
            warn!("No text extracted from document, continuing with sentinel text");
            ExtractedText::sentinel(self.char_limit)
        } else {
            ExtractedText(text)
        }
    }

    fn read_pages(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        // pdf-extract panics on some malformed inputs rather than returning Err.
        let pages = panic::catch_unwind(AssertUnwindSafe(|| load_pages(bytes, self.max_pages)))
            .map_err(|_| ExtractionError::Panicked)??;

        debug!("Read {} page(s) from document", pages.len());
        Ok(pages)
    }
}

/// Renders pages in order, stopping at the page cap so later pages are never
/// parsed. Blank pages count toward the cap.
fn load_pages(bytes: &[u8], max_pages: Option<usize>) -> Result<Vec<String>, ExtractionError> {
    let mut doc =
        Document::load_mem(bytes).map_err(|e| ExtractionError::PdfParsing(e.to_string()))?;
    if doc.is_encrypted() {
        doc.decrypt("")
            .map_err(|e| ExtractionError::PdfParsing(format!("encrypted document: {e}")))?;
    }

    let limit = max_pages.unwrap_or(usize::MAX);
    let mut pages = Vec::new();
    for page_num in doc.get_pages().into_keys().take(limit) {
        match page_text(&doc, page_num) {
            Ok(text) => pages.push(text),
            Err(e) => {
                warn!("Stopped reading at page {page_num}: {e}");
                break;
            }
        }
    }
    Ok(pages)
}

fn page_text(doc: &Document, page_num: u32) -> Result<String, ExtractionError> {
    let mut text = String::new();
    {
        let mut output = PlainTextOutput::new(&mut text);
        output_doc_page(doc, &mut output, page_num)
            .map_err(|e| ExtractionError::PdfParsing(e.to_string()))?;
    }
    Ok(text)
}

fn join_pages(pages: Vec<String>) -> String {
    pages
        .into_iter()
        .filter(|page| !page.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
