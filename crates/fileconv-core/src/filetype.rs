//! File type catalog.
//!
//! Every known file type is a fixed record of canonical suffixes and MIME
//! signatures. Lookups are pure functions over that table; content sniffing
//! lives in [`crate::TypeResolver`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A variant of the closed file type catalog.
///
/// `NoType` and `Unhandled` are placeholders, not real file types: the first
/// means "no suffix at all", the second "a suffix the catalog doesn't know".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileTypeKind {
    NoType,
    Csv,
    Excel,
    Json,
    Xml,
    Markdown,
    Image,
    Gif,
    Pdf,
    Video,
    Text,
    Unhandled,
}

/// Suffixes and MIME signatures of one catalog entry.
#[derive(Debug)]
pub struct Signature {
    pub name: &'static str,
    pub suffixes: &'static [&'static str],
    pub mime_types: &'static [&'static str],
    /// MIME types that don't identify this type but are still consistent
    /// with it (e.g. markdown sniffed as `text/plain`).
    pub alt_mime_types: &'static [&'static str],
}

const NOTYPE: Signature = Signature {
    name: "NOTYPE",
    suffixes: &[],
    mime_types: &[],
    alt_mime_types: &[],
};

const CSV: Signature = Signature {
    name: "CSV",
    suffixes: &["csv"],
    mime_types: &["text/csv", "application/csv"],
    alt_mime_types: &["text/plain"],
};

const EXCEL: Signature = Signature {
    name: "EXCEL",
    suffixes: &["xlsx", "xls"],
    mime_types: &[
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "application/vnd.ms-excel",
    ],
    alt_mime_types: &["application/zip"],
};

const JSON: Signature = Signature {
    name: "JSON",
    suffixes: &["json"],
    mime_types: &["application/json"],
    alt_mime_types: &["text/plain"],
};

const XML: Signature = Signature {
    name: "XML",
    suffixes: &["xml"],
    mime_types: &["application/xml", "text/xml"],
    alt_mime_types: &["text/plain"],
};

const MARKDOWN: Signature = Signature {
    name: "MARKDOWN",
    suffixes: &["md", "markdown"],
    mime_types: &["text/markdown", "text/x-markdown"],
    alt_mime_types: &["text/plain"],
};

const IMAGE: Signature = Signature {
    name: "IMAGE",
    suffixes: &["png", "jpg", "jpeg", "bmp", "webp", "tiff"],
    mime_types: &[
        "image/png",
        "image/jpeg",
        "image/bmp",
        "image/x-ms-bmp",
        "image/webp",
        "image/tiff",
    ],
    alt_mime_types: &[],
};

const GIF: Signature = Signature {
    name: "GIF",
    suffixes: &["gif"],
    mime_types: &["image/gif"],
    alt_mime_types: &[],
};

const PDF: Signature = Signature {
    name: "PDF",
    suffixes: &["pdf"],
    mime_types: &["application/pdf"],
    alt_mime_types: &[],
};

const VIDEO: Signature = Signature {
    name: "VIDEO",
    suffixes: &["mp4", "avi", "mov", "mkv", "webm"],
    mime_types: &[
        "video/mp4",
        "video/x-msvideo",
        "video/quicktime",
        "video/x-matroska",
        "video/webm",
    ],
    alt_mime_types: &[],
};

// Kept after every other text-based entry: lots of formats sniff as text/plain.
const TEXT: Signature = Signature {
    name: "TEXT",
    suffixes: &["txt"],
    mime_types: &["text/plain"],
    alt_mime_types: &[],
};

const UNHANDLED: Signature = Signature {
    name: "UNHANDLED",
    suffixes: &[],
    mime_types: &[],
    alt_mime_types: &[],
};

/// Errors from strict catalog lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("cannot derive a file type from an empty suffix")]
    EmptySuffix,

    #[error("unsupported file type: {0}")]
    Unsupported(String),
}

impl FileTypeKind {
    /// All catalog entries, in lookup order.
    pub const ALL: [FileTypeKind; 12] = [
        FileTypeKind::NoType,
        FileTypeKind::Csv,
        FileTypeKind::Excel,
        FileTypeKind::Json,
        FileTypeKind::Xml,
        FileTypeKind::Markdown,
        FileTypeKind::Image,
        FileTypeKind::Gif,
        FileTypeKind::Pdf,
        FileTypeKind::Video,
        FileTypeKind::Text,
        FileTypeKind::Unhandled,
    ];

    /// The catalog record for this variant.
    pub fn signature(self) -> &'static Signature {
        match self {
            FileTypeKind::NoType => &NOTYPE,
            FileTypeKind::Csv => &CSV,
            FileTypeKind::Excel => &EXCEL,
            FileTypeKind::Json => &JSON,
            FileTypeKind::Xml => &XML,
            FileTypeKind::Markdown => &MARKDOWN,
            FileTypeKind::Image => &IMAGE,
            FileTypeKind::Gif => &GIF,
            FileTypeKind::Pdf => &PDF,
            FileTypeKind::Video => &VIDEO,
            FileTypeKind::Text => &TEXT,
            FileTypeKind::Unhandled => &UNHANDLED,
        }
    }

    pub fn name(self) -> &'static str {
        self.signature().name
    }

    pub fn suffixes(self) -> &'static [&'static str] {
        self.signature().suffixes
    }

    pub fn mime_types(self) -> &'static [&'static str] {
        self.signature().mime_types
    }

    pub fn alt_mime_types(self) -> &'static [&'static str] {
        self.signature().alt_mime_types
    }

    /// Whether this is a concrete file type (not `NoType`/`Unhandled`).
    pub fn is_true_type(self) -> bool {
        !self.suffixes().is_empty()
    }

    /// The first suffix of this type, without the dot.
    pub fn canonical_suffix(self) -> Option<&'static str> {
        self.suffixes().first().copied()
    }

    /// The canonical suffix with a leading dot, or `""` for placeholders.
    pub fn dotted_suffix(self) -> String {
        match self.canonical_suffix() {
            Some(ext) => format!(".{ext}"),
            None => String::new(),
        }
    }

    /// Whether a sniffed MIME type is consistent with this type.
    pub fn accepts_mime(self, mime: &str) -> bool {
        let mime = normalize_mime(mime);
        self.mime_types().contains(&mime) || self.alt_mime_types().contains(&mime)
    }

    /// Look up a suffix, falling back to `NoType`/`Unhandled`.
    ///
    /// A leading dot is stripped and the suffix lower-cased first.
    pub fn lookup_suffix(suffix: &str) -> FileTypeKind {
        let suffix = normalize_suffix(suffix);
        if suffix.is_empty() {
            return FileTypeKind::NoType;
        }
        Self::ALL
            .into_iter()
            .find(|kind| kind.suffixes().contains(&suffix.as_str()))
            .unwrap_or(FileTypeKind::Unhandled)
    }

    /// Strict suffix lookup: empty or unknown suffixes are errors.
    pub fn from_suffix(suffix: &str) -> Result<FileTypeKind, CatalogError> {
        match Self::lookup_suffix(suffix) {
            FileTypeKind::NoType => Err(CatalogError::EmptySuffix),
            FileTypeKind::Unhandled => Err(CatalogError::Unsupported(format!(
                "suffix '.{}'",
                normalize_suffix(suffix)
            ))),
            kind => Ok(kind),
        }
    }

    /// Look up a MIME type against the primary signatures, falling back to
    /// `Unhandled`.
    pub fn lookup_mime(mime: &str) -> FileTypeKind {
        let mime = normalize_mime(mime);
        Self::ALL
            .into_iter()
            .find(|kind| kind.mime_types().contains(&mime))
            .unwrap_or(FileTypeKind::Unhandled)
    }

    /// Strict MIME lookup.
    pub fn from_mime(mime: &str) -> Result<FileTypeKind, CatalogError> {
        match Self::lookup_mime(mime) {
            FileTypeKind::Unhandled => Err(CatalogError::Unsupported(format!(
                "MIME type '{}'",
                normalize_mime(mime)
            ))),
            kind => Ok(kind),
        }
    }

    /// Iterate over the concrete file types only.
    pub fn true_types() -> impl Iterator<Item = FileTypeKind> {
        Self::ALL.into_iter().filter(|kind| kind.is_true_type())
    }
}

impl fmt::Display for FileTypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FileTypeKind {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_suffix(s)
    }
}

fn normalize_suffix(suffix: &str) -> String {
    suffix.trim().trim_start_matches('.').to_lowercase()
}

/// Drop MIME parameters (`text/plain; charset=utf-8` → `text/plain`).
fn normalize_mime(mime: &str) -> &str {
    mime.split(';').next().unwrap_or(mime).trim()
}
