//! Conversion pipeline: read, validate, convert, validate, write, verify.
//!
//! A [`Pipeline`] runs exactly one converter over already-resolved files.
//! Stages advance strictly in order and never retry; the first error moves
//! the pipeline to [`Stage::Failed`] and is returned unchanged.

use crate::converter::{ConverterDescriptor, DirectTarget, Strategy};
use crate::error::{Error, Evidence, Side};
use crate::filetype::FileTypeKind;
use crate::resolve::ResolvedFile;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File stem used when the output is a directory and the converter needs a
/// file name inside it.
pub const DEFAULT_OUTPUT_STEM: &str = "fileconv-output";

/// Progress of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    InputsRead,
    InputsValidated,
    Converted,
    OutputValidated,
    Written,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Init => "init",
            Stage::InputsRead => "inputs read",
            Stage::InputsValidated => "inputs validated",
            Stage::Converted => "converted",
            Stage::OutputValidated => "output validated",
            Stage::Written => "written",
            Stage::Done => "done",
            Stage::Failed => "failed",
        })
    }
}

/// One conversion run.
pub struct Pipeline<'a> {
    descriptor: &'a ConverterDescriptor,
    inputs: &'a [ResolvedFile],
    output: &'a ResolvedFile,
    stage: Stage,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        descriptor: &'a ConverterDescriptor,
        inputs: &'a [ResolvedFile],
        output: &'a ResolvedFile,
    ) -> Self {
        Self {
            descriptor,
            inputs,
            output,
            stage: Stage::Init,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Where the output ends up.
    ///
    /// A file output is used as is. A directory output is handed over whole
    /// to folder-writing converters; everyone else writes
    /// `<dir>/fileconv-output<suffix>`.
    pub fn target_path(&self) -> PathBuf {
        if !self.output.is_dir() {
            return self.output.path().to_path_buf();
        }
        match self.descriptor.strategy() {
            Strategy::Direct {
                target: DirectTarget::Folder,
                ..
            } => self.output.path().to_path_buf(),
            _ => self
                .output
                .path()
                .join(format!("{DEFAULT_OUTPUT_STEM}{}", self.output.suffix())),
        }
    }

    /// Run every stage. Returns the path that was written.
    pub fn run(&mut self) -> Result<PathBuf, Error> {
        if self.stage != Stage::Init {
            debug!(stage = %self.stage, "pipeline already ran");
        }
        match self.execute() {
            Ok(path) => Ok(path),
            Err(err) => {
                debug!(converter = self.descriptor.id(), stage = %self.stage, "pipeline failed");
                self.stage = Stage::Failed;
                Err(err)
            }
        }
    }

    fn execute(&mut self) -> Result<PathBuf, Error> {
        self.check_types()?;

        let reader = self.descriptor.reader();
        let contents = self
            .inputs
            .iter()
            .map(|input| {
                debug!(path = %input.path().display(), "reading input");
                reader.read(input.path())
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.advance(Stage::InputsRead);

        for (input, content) in self.inputs.iter().zip(&contents) {
            if !reader.check_format(content) {
                return Err(Error::FormatValidation {
                    path: input.path().to_path_buf(),
                    side: Side::Input,
                    shape: content.shape(),
                });
            }
        }
        self.advance(Stage::InputsValidated);

        let target = self.target_path();
        match self.descriptor.strategy() {
            Strategy::Buffered { writer, convert } => {
                let output = convert(contents.as_slice())?;
                self.advance(Stage::Converted);

                if !writer.check_format(&output) {
                    return Err(Error::FormatValidation {
                        path: target,
                        side: Side::Output,
                        shape: output.shape(),
                    });
                }
                self.advance(Stage::OutputValidated);

                writer.write(&target, &output)?;
            }
            Strategy::Direct { convert, .. } => {
                convert(contents.as_slice(), &target)?;
                self.advance(Stage::Converted);
            }
        }
        self.advance(Stage::Written);

        verify_exists(&target)?;
        self.advance(Stage::Done);
        info!(
            converter = self.descriptor.id(),
            inputs = self.inputs.len(),
            output = %target.display(),
            "conversion finished"
        );
        Ok(target)
    }

    /// Every input and the output must carry the converter's types.
    fn check_types(&self) -> Result<(), Error> {
        if self.inputs.is_empty() {
            return Err(Error::NoInputs);
        }
        let (expected_in, expected_out) = self.descriptor.pair();
        for input in self.inputs {
            if input.kind() != expected_in {
                return Err(mismatch(input, expected_in));
            }
        }
        if self.output.kind() != expected_out {
            return Err(mismatch(self.output, expected_out));
        }
        Ok(())
    }

    fn advance(&mut self, stage: Stage) {
        debug!(converter = self.descriptor.id(), stage = %stage, "pipeline stage");
        self.stage = stage;
    }
}

/// Run a converter over resolved files.
pub fn convert(
    descriptor: &ConverterDescriptor,
    inputs: &[ResolvedFile],
    output: &ResolvedFile,
) -> Result<PathBuf, Error> {
    Pipeline::new(descriptor, inputs, output).run()
}

fn mismatch(file: &ResolvedFile, expected: FileTypeKind) -> Error {
    Error::MismatchedType {
        path: file.path().to_path_buf(),
        expected,
        found: file.kind(),
        evidence: Evidence::Resolved,
    }
}

fn verify_exists(path: &Path) -> Result<(), Error> {
    if path.exists() {
        Ok(())
    } else {
        Err(Error::OutputMissing {
            path: path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{Content, ConvertError, ReadError, Reader};
    use crate::resolve::{ResolveOptions, TypeResolver};
    use crate::sniff::NoSniffer;
    use crate::test_support::PlainText;
    use FileTypeKind::*;
    use std::fs;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn resolver() -> TypeResolver {
        TypeResolver::new(NoSniffer)
    }

    fn input(dir: &TempDir, name: &str, contents: &str) -> ResolvedFile {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        ResolvedFile::resolve(
            &resolver(),
            &path,
            &ResolveOptions::input().read_content(false),
        )
        .unwrap()
    }

    fn output(path: impl AsRef<Path>, declared: Option<&str>) -> ResolvedFile {
        ResolvedFile::resolve(&resolver(), path, &ResolveOptions::output().declared(declared))
            .unwrap()
    }

    fn text_to_markdown() -> ConverterDescriptor {
        ConverterDescriptor::buffered("text-to-md", Text, Markdown, PlainText, PlainText, |inputs| {
            let parts: Vec<&str> = inputs.iter().filter_map(Content::as_text).collect();
            Ok(Content::Text(parts.join("\n")))
        })
    }

    /// Counts reads so tests can tell whether anything was read.
    struct CountingReader(Arc<AtomicUsize>);

    impl Reader for CountingReader {
        fn read(&self, path: &Path) -> Result<Content, ReadError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            PlainText.read(path)
        }

        fn check_format(&self, content: &Content) -> bool {
            PlainText.check_format(content)
        }
    }

    #[test]
    fn test_buffered_conversion() {
        let dir = TempDir::new().unwrap();
        let notes = input(&dir, "notes.txt", "hello");
        let out = output(dir.path().join("notes.md"), None);

        let descriptor = text_to_markdown();
        let mut pipeline = Pipeline::new(&descriptor, std::slice::from_ref(&notes), &out);
        let written = pipeline.run().unwrap();

        assert_eq!(pipeline.stage(), Stage::Done);
        assert_eq!(written, dir.path().join("notes.md"));
        assert_eq!(fs::read_to_string(written).unwrap(), "hello");
    }

    #[test]
    fn test_multiple_inputs_are_passed_together() {
        let dir = TempDir::new().unwrap();
        let inputs = vec![input(&dir, "a.txt", "one"), input(&dir, "b.txt", "two")];
        let out = output(dir.path().join("joined.md"), None);

        let written = convert(&text_to_markdown(), &inputs, &out).unwrap();
        assert_eq!(fs::read_to_string(written).unwrap(), "one\ntwo");
    }

    #[test]
    fn test_directory_output_uses_default_file_name() {
        let dir = TempDir::new().unwrap();
        let notes = input(&dir, "notes.txt", "a,b");
        let out = output(dir.path().join("exports"), Some("csv"));

        let descriptor =
            ConverterDescriptor::buffered("text-to-csv", Text, Csv, PlainText, PlainText, |inputs| {
                Ok(Content::Text(inputs[0].as_text().unwrap_or_default().to_string()))
            });

        let written = convert(&descriptor, &[notes], &out).unwrap();
        assert_eq!(written, dir.path().join("exports").join("fileconv-output.csv"));
        assert!(written.is_file());
    }

    #[test]
    fn test_direct_conversion_receives_target_path() {
        let dir = TempDir::new().unwrap();
        let notes = input(&dir, "notes.txt", "abc");
        let out = output(dir.path().join("copy.txt"), None);

        let descriptor =
            ConverterDescriptor::direct("text-copy", Text, Text, PlainText, |inputs, path| {
                fs::write(path, inputs[0].as_text().unwrap_or_default())?;
                Ok(())
            });

        let written = convert(&descriptor, &[notes], &out).unwrap();
        assert_eq!(fs::read_to_string(written).unwrap(), "abc");
    }

    #[test]
    fn test_folder_converter_receives_directory() {
        let dir = TempDir::new().unwrap();
        let notes = input(&dir, "notes.txt", "x");
        let out = output(dir.path().join("pages"), Some("txt"));

        let descriptor =
            ConverterDescriptor::direct("text-split", Text, Text, PlainText, |_, path| {
                assert!(path.is_dir());
                fs::write(path.join("page-1.txt"), "x")?;
                Ok(())
            })
            .writes_folder();

        let written = convert(&descriptor, &[notes], &out).unwrap();
        assert_eq!(written, dir.path().join("pages"));
        assert!(written.join("page-1.txt").is_file());
    }

    #[test]
    fn test_direct_conversion_that_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let notes = input(&dir, "notes.txt", "abc");
        let out = output(dir.path().join("lost.txt"), None);

        let descriptor =
            ConverterDescriptor::direct("text-void", Text, Text, PlainText, |_, _| Ok(()));

        let mut pipeline = Pipeline::new(&descriptor, std::slice::from_ref(&notes), &out);
        let err = pipeline.run().unwrap_err();
        assert!(matches!(err, Error::OutputMissing { .. }));
        assert_eq!(pipeline.stage(), Stage::Failed);
    }

    #[test]
    fn test_mixed_input_types_fail_before_reading() {
        let dir = TempDir::new().unwrap();
        let reads = Arc::new(AtomicUsize::new(0));
        let inputs = vec![input(&dir, "a.txt", "one"), input(&dir, "b.md", "two")];
        let out = output(dir.path().join("out.md"), None);

        let descriptor = ConverterDescriptor::buffered(
            "text-to-md",
            Text,
            Markdown,
            CountingReader(Arc::clone(&reads)),
            PlainText,
            |_| Ok(Content::Text(String::new())),
        );

        let err = convert(&descriptor, &inputs, &out).unwrap_err();
        assert!(matches!(
            err,
            Error::MismatchedType {
                expected: Text,
                found: Markdown,
                evidence: Evidence::Resolved,
                ..
            }
        ));
        assert_eq!(reads.load(Ordering::SeqCst), 0);
        assert!(!dir.path().join("out.md").exists());
    }

    #[test]
    fn test_output_type_must_match_converter() {
        let dir = TempDir::new().unwrap();
        let notes = input(&dir, "notes.txt", "hello");
        let out = output(dir.path().join("notes.json"), None);

        let err = convert(&text_to_markdown(), &[notes], &out).unwrap_err();
        assert!(matches!(
            err,
            Error::MismatchedType {
                expected: Markdown,
                found: Json,
                ..
            }
        ));
    }

    #[test]
    fn test_no_inputs() {
        let dir = TempDir::new().unwrap();
        let out = output(dir.path().join("notes.md"), None);

        let err = convert(&text_to_markdown(), &[], &out).unwrap_err();
        assert!(matches!(err, Error::NoInputs));
    }

    #[test]
    fn test_read_error_surfaces_unchanged() {
        let dir = TempDir::new().unwrap();
        let notes = input(&dir, "notes.txt", "hello");
        fs::remove_file(notes.path()).unwrap();
        let out = output(dir.path().join("notes.md"), None);

        let err = convert(&text_to_markdown(), &[notes], &out).unwrap_err();
        assert!(matches!(err, Error::Read(ReadError::Io { .. })));
    }

    #[test]
    fn test_input_format_check() {
        let dir = TempDir::new().unwrap();
        let notes = input(&dir, "notes.txt", "hello");
        let out = output(dir.path().join("notes.md"), None);

        struct BytesReader;
        impl Reader for BytesReader {
            fn read(&self, path: &Path) -> Result<Content, ReadError> {
                fs::read(path)
                    .map(Content::Bytes)
                    .map_err(|e| ReadError::io(path, e))
            }
            fn check_format(&self, content: &Content) -> bool {
                content.as_text().is_some()
            }
        }

        let descriptor = ConverterDescriptor::buffered(
            "text-to-md",
            Text,
            Markdown,
            BytesReader,
            PlainText,
            |_| Ok(Content::Text(String::new())),
        );

        let err = convert(&descriptor, std::slice::from_ref(&notes), &out).unwrap_err();
        match err {
            Error::FormatValidation { path, side, shape } => {
                assert_eq!(path, notes.path());
                assert_eq!(side, Side::Input);
                assert_eq!(shape, "bytes");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_output_format_check() {
        let dir = TempDir::new().unwrap();
        let notes = input(&dir, "notes.txt", "hello");
        let out = output(dir.path().join("notes.md"), None);

        let descriptor = ConverterDescriptor::buffered(
            "text-to-md",
            Text,
            Markdown,
            PlainText,
            PlainText,
            |_| Ok(Content::Rows(vec![])),
        );

        let err = convert(&descriptor, &[notes], &out).unwrap_err();
        assert!(matches!(
            err,
            Error::FormatValidation {
                side: Side::Output,
                shape: "rows",
                ..
            }
        ));
        assert!(!dir.path().join("notes.md").exists());
    }

    #[test]
    fn test_conversion_error_surfaces_unchanged() {
        let dir = TempDir::new().unwrap();
        let notes = input(&dir, "notes.txt", "hello");
        let out = output(dir.path().join("notes.md"), None);

        let descriptor = ConverterDescriptor::buffered(
            "text-to-md",
            Text,
            Markdown,
            PlainText,
            PlainText,
            |_| Err(ConvertError::Failed("boom".into())),
        );

        let err = convert(&descriptor, &[notes], &out).unwrap_err();
        assert_eq!(err.to_string(), "conversion failed: boom");
    }
}
