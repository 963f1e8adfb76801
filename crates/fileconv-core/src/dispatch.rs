//! Dispatch: raw paths and type hints in, one pipeline run out.

use crate::error::{Error, Evidence};
use crate::filetype::FileTypeKind;
use crate::pipeline::Pipeline;
use crate::registry::{Pair, Registry};
use crate::resolve::{ResolveOptions, ResolvedFile, TypeResolver};
use std::fmt;
use std::path::PathBuf;
use tracing::{error, info};

/// What the caller asked to convert.
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub inputs: Vec<PathBuf>,
    /// Declared type applied to every input.
    pub input_type: Option<String>,
    /// Output file or directory. Defaults to the first input without its
    /// suffix, in which case `output_type` is required.
    pub output: Option<PathBuf>,
    pub output_type: Option<String>,
    /// Cross-check input types against their content.
    pub read_content: bool,
}

impl Request {
    pub fn new(inputs: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            read_content: true,
            ..Default::default()
        }
    }

    pub fn input_type(mut self, ty: impl Into<String>) -> Self {
        self.input_type = Some(ty.into());
        self
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    pub fn output_type(mut self, ty: impl Into<String>) -> Self {
        self.output_type = Some(ty.into());
        self
    }

    pub fn read_content(mut self, read_content: bool) -> Self {
        self.read_content = read_content;
        self
    }
}

/// No converter is registered for the requested pair.
///
/// Not an [`Error`]: the request was well-formed, the capability just isn't
/// there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConverterNotFound {
    pub requested: Pair,
    pub supported: Vec<Pair>,
}

impl ConverterNotFound {
    /// Supported output types for the requested input type.
    pub fn reachable(&self) -> Vec<FileTypeKind> {
        self.supported
            .iter()
            .filter(|(from, _)| *from == self.requested.0)
            .map(|(_, to)| *to)
            .collect()
    }
}

impl fmt::Display for ConverterNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (from, to) = self.requested;
        write!(f, "conversion from {from} to {to} is not supported")?;
        if self.supported.is_empty() {
            return write!(f, "; no converters are registered");
        }
        write!(f, "; supported conversions:")?;
        for (from, to) in &self.supported {
            write!(f, "\n  {from} -> {to}")?;
        }
        Ok(())
    }
}

/// Result of a dispatch that didn't fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Converted { output: PathBuf, pair: Pair },
    Unsupported(ConverterNotFound),
}

/// Resolves requests against a registry and runs the matching converter.
#[derive(Debug)]
pub struct Dispatcher<'r> {
    registry: &'r Registry,
    resolver: TypeResolver,
}

impl<'r> Dispatcher<'r> {
    pub fn new(registry: &'r Registry, resolver: TypeResolver) -> Self {
        Self { registry, resolver }
    }

    pub fn registry(&self) -> &Registry {
        self.registry
    }

    pub fn resolver(&self) -> &TypeResolver {
        &self.resolver
    }

    /// Resolve every input of a request.
    ///
    /// All inputs must end up with the same type.
    pub fn resolve_inputs(&self, request: &Request) -> Result<Vec<ResolvedFile>, Error> {
        if request.inputs.is_empty() {
            return Err(Error::NoInputs);
        }

        let opts = ResolveOptions::input()
            .declared(request.input_type.as_deref())
            .read_content(request.read_content);
        let inputs = request
            .inputs
            .iter()
            .map(|path| ResolvedFile::resolve(&self.resolver, path, &opts))
            .collect::<Result<Vec<_>, _>>()?;

        let first = inputs[0].kind();
        if let Some(odd) = inputs.iter().find(|input| input.kind() != first) {
            return Err(Error::MismatchedType {
                path: odd.path().to_path_buf(),
                expected: first,
                found: odd.kind(),
                evidence: Evidence::Resolved,
            });
        }
        Ok(inputs)
    }

    /// Resolve the output target, defaulting it from the first input.
    ///
    /// A missing output directory is not created here; [`Dispatcher::dispatch`]
    /// creates it once a converter has been found.
    pub fn resolve_output(&self, request: &Request) -> Result<ResolvedFile, Error> {
        let opts = ResolveOptions::output()
            .declared(request.output_type.as_deref())
            .create_dir(false);
        match &request.output {
            Some(path) => ResolvedFile::resolve(&self.resolver, path, &opts),
            None => {
                if request.output_type.is_none() {
                    return Err(Error::MissingOutputType);
                }
                let first = request.inputs.first().ok_or(Error::NoInputs)?;
                let stem = first.with_extension("");
                ResolvedFile::resolve(&self.resolver, stem, &opts.is_dir(Some(false)))
            }
        }
    }

    /// Resolve, look up and convert.
    ///
    /// A missing converter is reported as [`Outcome::Unsupported`]; nothing
    /// is read or written in that case.
    pub fn dispatch(&self, request: &Request) -> Result<Outcome, Error> {
        let inputs = self.resolve_inputs(request)?;
        let output = self.resolve_output(request)?;
        let pair = (inputs[0].kind(), output.kind());

        let Some(descriptor) = self.registry.lookup(pair.0, pair.1) else {
            let missing = ConverterNotFound {
                requested: pair,
                supported: self.registry.supported_pairs(),
            };
            error!(input = %pair.0, output = %pair.1, "no converter registered");
            return Ok(Outcome::Unsupported(missing));
        };

        output.create_dir()?;
        info!(
            converter = descriptor.id(),
            strategy = descriptor.strategy().name(),
            inputs = inputs.len(),
            "dispatching"
        );
        let output = Pipeline::new(descriptor, &inputs, &output).run()?;
        Ok(Outcome::Converted { output, pair })
    }
}
