//! Text extraction from uploaded binaries
//!
//! A pure, synchronous transform: bytes in, page-addressable text out.
//! No retry; a failure is permanent for that input and surfaces to the
//! caller as an unreadable-document error with no internal detail.

use thiserror::Error;

/// Extraction failure
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Corrupt, encrypted, or non-PDF input, or no usable text
    #[error("document is not readable")]
    Unreadable,
}

/// Text of a single page
#[derive(Debug, Clone)]
pub struct PageText {
    /// 1-based page number matching the original document
    pub number: u32,
    pub text: String,
}

/// Extracted plain text with page boundaries preserved
#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub pages: Vec<PageText>,
}

impl ExtractedText {
    /// Render the prompt body with `[Page N]` markers so the analysis
    /// backend can report 1-based page numbers for each flagged clause.
    pub fn prompt_body(&self) -> String {
        let mut body = String::new();
        for page in &self.pages {
            body.push_str(&format!("[Page {}]\n", page.number));
            body.push_str(page.text.trim());
            body.push_str("\n\n");
        }
        body
    }
}

/// Boundary for converting an uploaded binary into page-addressable text
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedText, ExtractError>;
}

/// PDF text extractor backed by lopdf
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedText, ExtractError> {
        let doc = lopdf::Document::load_mem(bytes).map_err(|e| {
            tracing::debug!("PDF parse failed: {}", e);
            ExtractError::Unreadable
        })?;

        if doc.is_encrypted() {
            return Err(ExtractError::Unreadable);
        }

        // get_pages is keyed by 1-based page number in document order
        let mut pages = Vec::new();
        for (&number, _) in doc.get_pages().iter() {
            let text = match doc.extract_text(&[number]) {
                Ok(text) => text,
                Err(e) => {
                    tracing::debug!(page = number, "Page text extraction failed: {}", e);
                    continue;
                }
            };
            if !text.trim().is_empty() {
                pages.push(PageText { number, text });
            }
        }

        if pages.is_empty() {
            return Err(ExtractError::Unreadable);
        }

        Ok(ExtractedText { pages })
    }
}
