//! Errors raised while resolving files and running conversions.

use crate::converter::{ConvertError, ReadError, WriteError};
use crate::filetype::FileTypeKind;
use crate::sniff::SniffError;
use std::fmt;
use std::path::PathBuf;

/// Where a conflicting file type came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evidence {
    /// The path's suffix.
    Suffix,
    /// The sniffed file content.
    Content,
    /// The type another step already settled on.
    Resolved,
}

impl fmt::Display for Evidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Evidence::Suffix => "its suffix",
            Evidence::Content => "its content",
            Evidence::Resolved => "its resolved type",
        })
    }
}

/// Which side of a conversion a content check ran on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Input,
    Output,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Input => "input",
            Side::Output => "output",
        })
    }
}

/// Fatal errors. Each one aborts the current conversion.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{}: no suffix to derive a file type from, and no type was declared", .path.display())]
    EmptySuffix { path: PathBuf },

    #[error("{}: unsupported file type ({found})", .path.display())]
    UnsupportedType { path: PathBuf, found: String },

    #[error("{}: expected {expected}, but {evidence} says {found}", .path.display())]
    MismatchedType {
        path: PathBuf,
        expected: FileTypeKind,
        found: FileTypeKind,
        evidence: Evidence,
    },

    #[error("{}: file does not exist, cannot inspect its content", .path.display())]
    FileNotFound { path: PathBuf },

    #[error("{}: path does not exist", .path.display())]
    PathNotFound { path: PathBuf },

    #[error(
        "{}: cannot tell whether this is a file or a directory; add a suffix or declare a type",
        .path.display()
    )]
    AmbiguousPathKind { path: PathBuf },

    #[error("{}: directory targets need a declared file type", .path.display())]
    MissingDirectoryType { path: PathBuf },

    #[error("{}: expected a {expected}", .path.display())]
    PathKindMismatch {
        path: PathBuf,
        expected: &'static str,
    },

    #[error("{}: {side} content failed the format check (got {shape})", .path.display())]
    FormatValidation {
        path: PathBuf,
        side: Side,
        shape: &'static str,
    },

    #[error("{}: content sniffing failed: {source}", .path.display())]
    Sniff {
        path: PathBuf,
        #[source]
        source: SniffError,
    },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no input files given")]
    NoInputs,

    #[error("either an output path or an output type is required")]
    MissingOutputType,

    #[error("{}: conversion reported success but the output does not exist", .path.display())]
    OutputMissing { path: PathBuf },

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Convert(#[from] ConvertError),
}

impl Error {
    /// Whether the error comes from reconciling paths and types, before any
    /// content was read.
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            Error::EmptySuffix { .. }
                | Error::UnsupportedType { .. }
                | Error::MismatchedType { .. }
                | Error::AmbiguousPathKind { .. }
                | Error::MissingDirectoryType { .. }
                | Error::PathKindMismatch { .. }
                | Error::NoInputs
                | Error::MissingOutputType
        )
    }
}
