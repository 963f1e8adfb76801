//! Converter descriptors and the reader/writer capabilities they bind.

use crate::filetype::FileTypeKind;
use std::any::Any;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// In-memory content passed between readers, converters and writers.
pub enum Content {
    /// Decoded text.
    Text(String),
    /// Tabular data, one `Vec` per row.
    Rows(Vec<Vec<String>>),
    /// A JSON document.
    Json(serde_json::Value),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Anything else a format backend keeps in memory (decoded images, ...).
    Opaque(Box<dyn Any + Send + Sync>),
}

impl Content {
    /// Wrap a backend-specific value.
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Content::Opaque(Box::new(value))
    }

    /// Short name of the content shape, for diagnostics.
    pub fn shape(&self) -> &'static str {
        match self {
            Content::Text(_) => "text",
            Content::Rows(_) => "rows",
            Content::Json(_) => "json",
            Content::Bytes(_) => "bytes",
            Content::Opaque(_) => "opaque",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_rows(&self) -> Option<&[Vec<String>]> {
        match self {
            Content::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Content::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Content::Bytes(data) => Some(data),
            _ => None,
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Content::Opaque(value) => value.downcast_ref(),
            _ => None,
        }
    }
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Content::Rows(rows) => f.debug_tuple("Rows").field(rows).finish(),
            Content::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Content::Bytes(data) => write!(f, "Bytes({} bytes)", data.len()),
            Content::Opaque(_) => f.write_str("Opaque(..)"),
        }
    }
}

/// Reads a file into memory and checks the shape of what it read.
pub trait Reader: Send + Sync {
    fn read(&self, path: &Path) -> Result<Content, ReadError>;

    fn check_format(&self, content: &Content) -> bool;
}

/// Checks and writes output content.
pub trait Writer: Send + Sync {
    fn check_format(&self, content: &Content) -> bool;

    fn write(&self, path: &Path, content: &Content) -> Result<(), WriteError>;
}

/// Errors raised by readers.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {}: {message}", .path.display())]
    Decode { path: PathBuf, message: String },
}

impl ReadError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        ReadError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn decode(path: &Path, message: impl fmt::Display) -> Self {
        ReadError::Decode {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }
}

/// Errors raised by writers.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode {}: {message}", .path.display())]
    Encode { path: PathBuf, message: String },

    #[error("writer cannot handle {0} content")]
    UnexpectedContent(&'static str),
}

impl WriteError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        WriteError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn encode(path: &Path, message: impl fmt::Display) -> Self {
        WriteError::Encode {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }
}

/// Errors raised by conversion functions.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("conversion failed: {0}")]
    Failed(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("expected {expected} content, got {found}")]
    UnexpectedContent {
        expected: &'static str,
        found: &'static str,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Conversion that returns its output for the pipeline to validate and write.
pub type BufferedFn = dyn Fn(&[Content]) -> Result<Content, ConvertError> + Send + Sync;

/// Conversion that writes its output to the path it is handed.
pub type DirectFn = dyn Fn(&[Content], &Path) -> Result<(), ConvertError> + Send + Sync;

/// What a direct converter is handed as its output location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectTarget {
    /// A single output file (inside the output directory if one was given).
    File,
    /// The output directory itself; the converter fills it.
    Folder,
}

/// How a converter produces its output.
#[derive(Clone)]
pub enum Strategy {
    Buffered {
        writer: Arc<dyn Writer>,
        convert: Arc<BufferedFn>,
    },
    Direct {
        convert: Arc<DirectFn>,
        target: DirectTarget,
    },
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Buffered { .. } => "buffered",
            Strategy::Direct {
                target: DirectTarget::File,
                ..
            } => "direct",
            Strategy::Direct {
                target: DirectTarget::Folder,
                ..
            } => "direct (folder)",
        }
    }
}

/// A registered conversion capability from one file type to another.
#[derive(Clone)]
pub struct ConverterDescriptor {
    id: String,
    description: String,
    input: FileTypeKind,
    output: FileTypeKind,
    reader: Arc<dyn Reader>,
    strategy: Strategy,
}

impl ConverterDescriptor {
    /// A converter whose output content is written by `writer`.
    pub fn buffered<F>(
        id: impl Into<String>,
        input: FileTypeKind,
        output: FileTypeKind,
        reader: impl Reader + 'static,
        writer: impl Writer + 'static,
        convert: F,
    ) -> Self
    where
        F: Fn(&[Content]) -> Result<Content, ConvertError> + Send + Sync + 'static,
    {
        Self::new(
            id.into(),
            input,
            output,
            Arc::new(reader),
            Strategy::Buffered {
                writer: Arc::new(writer),
                convert: Arc::new(convert),
            },
        )
    }

    /// A converter that writes its own output file.
    pub fn direct<F>(
        id: impl Into<String>,
        input: FileTypeKind,
        output: FileTypeKind,
        reader: impl Reader + 'static,
        convert: F,
    ) -> Self
    where
        F: Fn(&[Content], &Path) -> Result<(), ConvertError> + Send + Sync + 'static,
    {
        Self::new(
            id.into(),
            input,
            output,
            Arc::new(reader),
            Strategy::Direct {
                convert: Arc::new(convert),
                target: DirectTarget::File,
            },
        )
    }

    fn new(
        id: String,
        input: FileTypeKind,
        output: FileTypeKind,
        reader: Arc<dyn Reader>,
        strategy: Strategy,
    ) -> Self {
        debug_assert!(input.is_true_type(), "{id}: input must be a concrete type");
        debug_assert!(output.is_true_type(), "{id}: output must be a concrete type");
        Self {
            id,
            description: String::new(),
            input,
            output,
            reader,
            strategy,
        }
    }

    /// Set the description.
    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Hand a direct converter the output directory instead of a file path.
    ///
    /// No effect on buffered converters.
    pub fn writes_folder(mut self) -> Self {
        if let Strategy::Direct { target, .. } = &mut self.strategy {
            *target = DirectTarget::Folder;
        }
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn describe(&self) -> &str {
        &self.description
    }

    pub fn input(&self) -> FileTypeKind {
        self.input
    }

    pub fn output(&self) -> FileTypeKind {
        self.output
    }

    /// The `(input, output)` key this descriptor registers under.
    pub fn pair(&self) -> (FileTypeKind, FileTypeKind) {
        (self.input, self.output)
    }

    pub fn reader(&self) -> &dyn Reader {
        self.reader.as_ref()
    }

    /// The writer, if this converter uses the buffered strategy.
    pub fn writer(&self) -> Option<&dyn Writer> {
        match &self.strategy {
            Strategy::Buffered { writer, .. } => Some(writer.as_ref()),
            Strategy::Direct { .. } => None,
        }
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }
}

impl fmt::Debug for ConverterDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterDescriptor")
            .field("id", &self.id)
            .field("input", &self.input)
            .field("output", &self.output)
            .field("strategy", &self.strategy.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AnyText;

    impl Reader for AnyText {
        fn read(&self, path: &Path) -> Result<Content, ReadError> {
            std::fs::read_to_string(path)
                .map(Content::Text)
                .map_err(|e| ReadError::io(path, e))
        }

        fn check_format(&self, content: &Content) -> bool {
            content.as_text().is_some()
        }
    }

    impl Writer for AnyText {
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

    #[test]
    fn test_buffered_descriptor() {
        let decl = ConverterDescriptor::buffered(
            "text.to-markdown",
            FileTypeKind::Text,
            FileTypeKind::Markdown,
            AnyText,
            AnyText,
            |inputs| Ok(Content::Text(format!("{} inputs", inputs.len()))),
        )
        .description("Copy text into markdown");

        assert_eq!(decl.id(), "text.to-markdown");
        assert_eq!(decl.pair(), (FileTypeKind::Text, FileTypeKind::Markdown));
        assert!(decl.writer().is_some());
        assert_eq!(decl.strategy().name(), "buffered");
        assert_eq!(decl.describe(), "Copy text into markdown");
    }

    #[test]
    fn test_direct_descriptor() {
        let decl = ConverterDescriptor::direct(
            "text.copy",
            FileTypeKind::Text,
            FileTypeKind::Text,
            AnyText,
            |_, _| Ok(()),
        );

        assert!(decl.writer().is_none());
        assert_eq!(decl.strategy().name(), "direct");

        let decl = decl.writes_folder();
        assert!(matches!(
            decl.strategy(),
            Strategy::Direct {
                target: DirectTarget::Folder,
                ..
            }
        ));
    }

    #[test]
    fn test_content_accessors() {
        let text = Content::Text("hi".into());
        assert_eq!(text.as_text(), Some("hi"));
        assert!(text.as_rows().is_none());
        assert_eq!(text.shape(), "text");

        let opaque = Content::opaque(42u32);
        assert_eq!(opaque.downcast_ref::<u32>(), Some(&42));
        assert!(opaque.downcast_ref::<String>().is_none());
        assert_eq!(format!("{opaque:?}"), "Opaque(..)");
    }
}
