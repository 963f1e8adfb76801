//! Magic-byte content sniffing.

use fileconv_core::{FALLBACK_MIME, MimeSniffer, SniffError};
use std::io::Cursor;
use std::path::Path;

/// Sniffs MIME types with the bundled magic database.
#[derive(Debug, Clone, Copy, Default)]
pub struct MagicSniffer;

impl MimeSniffer for MagicSniffer {
    fn sniff_mime(&self, path: &Path) -> Result<String, SniffError> {
        let data = std::fs::read(path)?;
        Ok(detect_mime(&data).unwrap_or_else(|| FALLBACK_MIME.to_string()))
    }
}

fn detect_mime(data: &[u8]) -> Option<String> {
    let db = magic_db::load().ok()?;
    let mut cursor = Cursor::new(data);
    let magic = db.best_magic(&mut cursor).ok()?;
    Some(magic.mime_type().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_png_signature() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pixel");
        // PNG signature followed by an IHDR chunk header.
        let mut data = b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0dIHDR".to_vec();
        data.extend_from_slice(b"\x00\x00\x00\x01\x00\x00\x00\x01\x08\x06\x00\x00\x00");
        std::fs::write(&path, data).unwrap();

        assert_eq!(MagicSniffer.sniff_mime(&path).unwrap(), "image/png");
    }

    #[test]
    fn test_missing_file() {
        let err = MagicSniffer
            .sniff_mime(Path::new("/definitely/not/here"))
            .unwrap_err();
        assert!(matches!(err, SniffError::Io(_)));
    }
}
