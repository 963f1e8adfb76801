//! fileconv: type resolution and converter dispatch for file conversions.
//!
//! Paths and optional type hints are resolved into [`ResolvedFile`]s against a
//! fixed catalog of file types, the `(input, output)` pair is looked up in a
//! [`Registry`], and the matching converter runs through a staged
//! [`Pipeline`]. Format codecs live elsewhere and plug in as
//! [`Reader`]/[`Writer`] implementations.

mod converter;
mod dispatch;
mod error;
mod filetype;
mod pipeline;
mod registry;
mod resolve;
mod sniff;

#[cfg(test)]
mod test_support;

pub use converter::{
    BufferedFn, Content, ConvertError, ConverterDescriptor, DirectFn, DirectTarget, ReadError,
    Reader, Strategy, WriteError, Writer,
};
pub use dispatch::{ConverterNotFound, Dispatcher, Outcome, Request};
pub use error::{Error, Evidence, Side};
pub use filetype::{CatalogError, FileTypeKind, Signature};
pub use pipeline::{DEFAULT_OUTPUT_STEM, Pipeline, Stage, convert};
pub use registry::{Pair, Registry};
pub use resolve::{ResolveOptions, ResolvedFile, TypeResolver};
pub use sniff::{FALLBACK_MIME, MimeSniffer, NoSniffer, SniffError};
