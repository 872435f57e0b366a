//! PDF text extraction: raw bytes to page-indexed plain text.
//!
//! Pure and stateless — no external calls, deterministic for identical input
//! bytes (modulo the underlying `pdf-extract` library). Nothing here returns
//! `Err` or panics past the boundary: every internal failure is converted to
//! an [`ExtractionError`] value carried inside the returned
//! [`ExtractionOutcome`], because an unreadable upload must still produce a
//! complete document record.

use crate::error::ExtractionError;
use crate::pipeline::cleanup;
use crate::record::{ExtractionOutcome, PageText, ParseMetadata, ParsedContent};
use chrono::Utc;
use tracing::{debug, warn};

/// Extract page-structured text from raw PDF bytes.
///
/// * Empty input is a valid zero-page document, not an error: the upload
///   collaborator already accepted the file, so it gets a record with
///   `total_pages = 0` and degrades to the fallback classification.
/// * Bytes without the `%PDF` magic fail fast with `not_a_pdf` before the
///   parser sees them.
/// * Parser failures (corrupt xref, encrypted streams, ...) become
///   `parse_failed`.
pub fn extract(bytes: &[u8], filename: &str) -> ExtractionOutcome {
    if bytes.is_empty() {
        debug!("'{filename}': empty input, producing zero-page content");
        return ExtractionOutcome::Parsed(ParsedContent {
            metadata: ParseMetadata {
                filename: filename.to_string(),
                parsed_at: Utc::now(),
                total_pages: 0,
            },
            pages: Vec::new(),
        });
    }

    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        let magic: Vec<u8> = bytes.iter().take(4).copied().collect();
        warn!("'{filename}': missing %PDF magic, first bytes {magic:?}");
        return ExtractionOutcome::Failed(ExtractionError::NotAPdf(format!(
            "first bytes: {magic:?}"
        )));
    }

    let raw_pages = match pdf_extract::extract_text_from_mem_by_pages(bytes) {
        Ok(pages) => pages,
        Err(e) => {
            warn!("'{filename}': PDF extraction failed: {e}");
            return ExtractionOutcome::Failed(ExtractionError::ParseFailed(e.to_string()));
        }
    };

    let pages: Vec<PageText> = raw_pages
        .iter()
        .enumerate()
        .map(|(idx, raw)| {
            let text = cleanup::clean_page_text(raw);
            PageText {
                page_number: idx + 1,
                length: text.chars().count(),
                text,
            }
        })
        .collect();

    debug!(
        "'{filename}': extracted {} pages, {} chars total",
        pages.len(),
        pages.iter().map(|p| p.length).sum::<usize>()
    );

    ExtractionOutcome::Parsed(ParsedContent {
        metadata: ParseMetadata {
            filename: filename.to_string(),
            parsed_at: Utc::now(),
            total_pages: pages.len(),
        },
        pages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bytes_yield_zero_page_content() {
        let outcome = extract(&[], "empty.pdf");
        let content = outcome.content().expect("empty input is not an error");
        assert_eq!(content.metadata.total_pages, 0);
        assert!(content.pages.is_empty());
        assert!(content.is_blank());
    }

    #[test]
    fn non_pdf_bytes_fail_with_not_a_pdf() {
        let outcome = extract(b"hello, not a pdf at all", "note.txt");
        match outcome.error() {
            Some(ExtractionError::NotAPdf(_)) => {}
            other => panic!("expected NotAPdf, got {other:?}"),
        }
    }

    #[test]
    fn short_garbage_fails_with_not_a_pdf() {
        let outcome = extract(b"%P", "tiny.pdf");
        assert!(matches!(
            outcome.error(),
            Some(ExtractionError::NotAPdf(_))
        ));
    }

    #[test]
    fn corrupt_pdf_fails_with_parse_failed_not_a_panic() {
        // Correct magic, garbage after it: the parser must reject it and the
        // failure must surface as a value.
        let mut bytes = b"%PDF-1.7\n".to_vec();
        bytes.extend_from_slice(&[0xFF; 64]);
        let outcome = extract(&bytes, "corrupt.pdf");
        assert!(matches!(
            outcome.error(),
            Some(ExtractionError::ParseFailed(_))
        ));
    }

    #[test]
    fn metadata_records_the_supplied_filename() {
        let outcome = extract(&[], "scan 12.pdf");
        assert_eq!(
            outcome.content().unwrap().metadata.filename,
            "scan 12.pdf"
        );
    }
}
