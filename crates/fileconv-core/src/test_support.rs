//! Shared fixtures for unit tests.

use crate::converter::{Content, ReadError, Reader, WriteError, Writer};
use crate::sniff::{MimeSniffer, SniffError};
use std::path::Path;

/// Reads and writes UTF-8 text.
pub struct PlainText;

impl Reader for PlainText {
    fn read(&self, path: &Path) -> Result<Content, ReadError> {
        std::fs::read_to_string(path)
            .map(Content::Text)
            .map_err(|e| ReadError::io(path, e))
    }

    fn check_format(&self, content: &Content) -> bool {
        content.as_text().is_some()
    }
}

impl Writer for PlainText {
    fn check_format(&self, content: &Content) -> bool {
        content.as_text().is_some()
    }

    fn write(&self, path: &Path, content: &Content) -> Result<(), WriteError> {
        let text = content
            .as_text()
            .ok_or(WriteError::UnexpectedContent(content.shape()))?;
        std::fs::write(path, text).map_err(|e| WriteError::io(path, e))
    }
}

/// Guesses a MIME type from the suffix, standing in for a real sniffer.
pub struct SuffixSniffer;

impl MimeSniffer for SuffixSniffer {
    fn sniff_mime(&self, path: &Path) -> Result<String, SniffError> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        Ok(match ext.as_str() {
            "json" => "application/json",
            "csv" => "text/csv",
            "png" => "image/png",
            _ => "text/plain",
        }
        .to_string())
    }
}
