//! Type resolution: reconciling declared, suffix and content types.
//!
//! Precedence is fixed. A declared type is authoritative as long as nothing
//! contradicts it, the suffix is the default, and sniffed content is only a
//! fallback or a cross-check. Contradictions are errors, never silently
//! resolved.

use crate::error::{Error, Evidence};
use crate::filetype::{CatalogError, FileTypeKind};
use crate::sniff::MimeSniffer;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolves file types for paths, using an injected content sniffer.
#[derive(Clone)]
pub struct TypeResolver {
    sniffer: Arc<dyn MimeSniffer>,
}

impl TypeResolver {
    pub fn new(sniffer: impl MimeSniffer + 'static) -> Self {
        Self {
            sniffer: Arc::new(sniffer),
        }
    }

    /// Resolve a type from file content.
    ///
    /// With `strict`, an unrecognized MIME type is an error; otherwise it
    /// yields `Unhandled`.
    pub fn from_content(&self, path: &Path, strict: bool) -> Result<FileTypeKind, Error> {
        let mime = self.sniff(path)?;
        if strict {
            FileTypeKind::from_mime(&mime).map_err(|e| catalog_error(path, e))
        } else {
            Ok(FileTypeKind::lookup_mime(&mime))
        }
    }

    /// Reconcile the declared type, the suffix type and (optionally) the
    /// content type of `path` into one concrete type.
    pub fn from_path(
        &self,
        path: &Path,
        declared: Option<&str>,
        read_content: bool,
    ) -> Result<FileTypeKind, Error> {
        let suffix = path_suffix(path);
        let from_suffix = FileTypeKind::lookup_suffix(&suffix);

        let Some(declared) = declared else {
            if !from_suffix.is_true_type() {
                if read_content {
                    debug!(path = %path.display(), "no usable suffix, falling back to content");
                    return self.from_content(path, true);
                }
                return Err(match from_suffix {
                    FileTypeKind::NoType => Error::EmptySuffix {
                        path: path.to_path_buf(),
                    },
                    _ => Error::UnsupportedType {
                        path: path.to_path_buf(),
                        found: format!("suffix '.{suffix}'"),
                    },
                });
            }
            if read_content {
                self.confirm_content(path, from_suffix)?;
            }
            return Ok(from_suffix);
        };

        let declared = FileTypeKind::from_suffix(declared).map_err(|e| catalog_error(path, e))?;

        if from_suffix.is_true_type() && from_suffix != declared {
            return Err(Error::MismatchedType {
                path: path.to_path_buf(),
                expected: declared,
                found: from_suffix,
                evidence: Evidence::Suffix,
            });
        }

        if read_content {
            self.confirm_content(path, declared)?;
        }

        Ok(declared)
    }

    /// Check that sniffed content doesn't contradict `kind`.
    ///
    /// A MIME type the catalog doesn't know is no evidence either way and
    /// leaves `kind` standing.
    fn confirm_content(&self, path: &Path, kind: FileTypeKind) -> Result<(), Error> {
        let mime = self.sniff(path)?;
        if kind.accepts_mime(&mime) {
            return Ok(());
        }

        match FileTypeKind::lookup_mime(&mime) {
            FileTypeKind::Unhandled => {
                debug!(
                    path = %path.display(),
                    mime = %mime,
                    kind = %kind,
                    "sniffed MIME type is not in the catalog, keeping type"
                );
                Ok(())
            }
            found => Err(Error::MismatchedType {
                path: path.to_path_buf(),
                expected: kind,
                found,
                evidence: Evidence::Content,
            }),
        }
    }

    fn sniff(&self, path: &Path) -> Result<String, Error> {
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let mime = self.sniffer.sniff_mime(path).map_err(|source| Error::Sniff {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), mime = %mime, "sniffed content");
        Ok(mime)
    }
}

impl fmt::Debug for TypeResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeResolver").finish_non_exhaustive()
    }
}

/// How a raw path should be turned into a [`ResolvedFile`].
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// The path must already exist.
    pub should_exist: bool,
    /// `Some(true)` for a directory, `Some(false)` for a file, `None` to infer.
    pub is_dir: Option<bool>,
    /// Explicitly declared type, as a suffix (`"csv"`, `".md"`).
    pub declared: Option<String>,
    /// Rewrite the path to carry the type's canonical suffix.
    pub add_suffix: bool,
    /// Cross-check (or infer) the type from file content.
    pub read_content: bool,
    /// Create a missing directory target while resolving it.
    pub create_dir: bool,
}

impl ResolveOptions {
    /// Defaults for conversion inputs: existing files, content checked.
    pub fn input() -> Self {
        Self {
            should_exist: true,
            is_dir: Some(false),
            read_content: true,
            ..Default::default()
        }
    }

    /// Defaults for conversion outputs: may not exist yet, file or directory,
    /// canonical suffix added.
    pub fn output() -> Self {
        Self {
            should_exist: false,
            add_suffix: true,
            create_dir: true,
            ..Default::default()
        }
    }

    pub fn declared(mut self, declared: Option<impl Into<String>>) -> Self {
        self.declared = declared.map(Into::into);
        self
    }

    pub fn is_dir(mut self, is_dir: Option<bool>) -> Self {
        self.is_dir = is_dir;
        self
    }

    pub fn read_content(mut self, read_content: bool) -> Self {
        self.read_content = read_content;
        self
    }

    pub fn add_suffix(mut self, add_suffix: bool) -> Self {
        self.add_suffix = add_suffix;
        self
    }

    pub fn create_dir(mut self, create_dir: bool) -> Self {
        self.create_dir = create_dir;
        self
    }
}

/// A path bound to a confirmed file type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    path: PathBuf,
    kind: FileTypeKind,
    suffix: String,
    is_dir: bool,
    should_exist: bool,
}

impl ResolvedFile {
    /// Resolve `raw` according to `opts`.
    ///
    /// May create a directory; never deletes or truncates anything.
    pub fn resolve(
        resolver: &TypeResolver,
        raw: impl AsRef<Path>,
        opts: &ResolveOptions,
    ) -> Result<Self, Error> {
        let raw = raw.as_ref();
        let exists = raw.exists();

        if opts.should_exist && !exists {
            return Err(Error::PathNotFound {
                path: raw.to_path_buf(),
            });
        }
        if !opts.should_exist && exists {
            warn!(path = %raw.display(), "path already exists and may be overwritten");
        }

        let has_suffix = !path_suffix(raw).is_empty();
        let is_dir = match opts.is_dir {
            Some(expected) => {
                if exists && raw.is_dir() != expected {
                    return Err(Error::PathKindMismatch {
                        path: raw.to_path_buf(),
                        expected: if expected { "directory" } else { "file" },
                    });
                }
                expected
            }
            None if exists => raw.is_dir(),
            None if !has_suffix && opts.declared.is_some() => true,
            None if has_suffix => false,
            None => {
                return Err(Error::AmbiguousPathKind {
                    path: raw.to_path_buf(),
                });
            }
        };

        if is_dir {
            return Self::resolve_dir(raw, exists, opts);
        }

        let kind = resolver.from_path(raw, opts.declared.as_deref(), opts.read_content)?;
        let mut path = absolute(raw)?;
        if opts.add_suffix {
            if let Some(ext) = kind.canonical_suffix() {
                path.set_extension(ext);
            }
        }

        Ok(Self {
            path,
            kind,
            suffix: kind.dotted_suffix(),
            is_dir: false,
            should_exist: opts.should_exist,
        })
    }

    fn resolve_dir(raw: &Path, exists: bool, opts: &ResolveOptions) -> Result<Self, Error> {
        let declared = opts
            .declared
            .as_deref()
            .ok_or_else(|| Error::MissingDirectoryType {
                path: raw.to_path_buf(),
            })?;
        let kind = FileTypeKind::from_suffix(declared).map_err(|e| catalog_error(raw, e))?;

        let resolved = Self {
            path: absolute(raw)?,
            kind,
            suffix: kind.dotted_suffix(),
            is_dir: true,
            should_exist: opts.should_exist,
        };
        if !exists && opts.create_dir {
            resolved.create_dir()?;
        }
        Ok(resolved)
    }

    /// Create the directory of a directory target if it is missing.
    ///
    /// Does nothing for file targets.
    pub fn create_dir(&self) -> Result<(), Error> {
        if !self.is_dir || self.path.is_dir() {
            return Ok(());
        }
        std::fs::create_dir_all(&self.path).map_err(|source| Error::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), "created directory");
        Ok(())
    }

    /// Absolute path (suffix-normalized if requested).
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> FileTypeKind {
        self.kind
    }

    /// Canonical suffix of the type, with its dot.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    pub fn should_exist(&self) -> bool {
        self.should_exist
    }
}

impl fmt::Display for ResolvedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path.display(), self.kind)
    }
}

/// Lower-case suffix of the file name, without the dot.
fn path_suffix(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn absolute(path: &Path) -> Result<PathBuf, Error> {
    std::path::absolute(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn catalog_error(path: &Path, err: CatalogError) -> Error {
    match err {
        CatalogError::EmptySuffix => Error::EmptySuffix {
            path: path.to_path_buf(),
        },
        CatalogError::Unsupported(found) => Error::UnsupportedType {
            path: path.to_path_buf(),
            found,
        },
    }
}
