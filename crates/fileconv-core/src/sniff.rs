//! Content sniffing seam.

use std::path::Path;

/// MIME type reported when a sniffer cannot identify the content.
pub const FALLBACK_MIME: &str = "application/octet-stream";

/// Determines a MIME type by inspecting file bytes rather than the name.
///
/// Implementations are injected into [`crate::TypeResolver`]; the resolver
/// only calls them for paths that exist.
pub trait MimeSniffer: Send + Sync {
    fn sniff_mime(&self, path: &Path) -> Result<String, SniffError>;
}

/// Errors raised while sniffing content.
#[derive(Debug, thiserror::Error)]
pub enum SniffError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("content sniffing unavailable: {0}")]
    Unavailable(String),
}

/// A sniffer for setups that never read content.
///
/// Every call fails, so pair it with resolution that has content reading
/// turned off.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSniffer;

impl MimeSniffer for NoSniffer {
    fn sniff_mime(&self, _path: &Path) -> Result<String, SniffError> {
        Err(SniffError::Unavailable("no content sniffer configured".into()))
    }
}
