//! Error vocabulary for the in-memory object model: parsing and write-back
//! failures, typed-accessor failures, file meta table validation, and the
//! attribute edit API.

use std::path::PathBuf;

use dcmk_core::error::{CastValueError, ConvertValueError};
use dcmk_core::ops::AttributeSelector;
use dcmk_core::value::DeserializeError;
use dcmk_core::Tag;
use snafu::Snafu;

/// Type alias for a result from this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error type covering file access, parsing, and write-back.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
#[non_exhaustive]
pub enum Error {
    /// could not open a file at the given path
    #[snafu(display("could not open file '{}': {source}", filename.display()))]
    OpenFile {
        /// the file path
        filename: PathBuf,
        /// underlying I/O error
        source: std::io::Error,
    },
    /// could not read a file's contents
    #[snafu(display("could not read file '{}': {source}", filename.display()))]
    ReadFile {
        /// the file path
        filename: PathBuf,
        /// underlying I/O error
        source: std::io::Error,
    },
    /// could not write a file's contents
    #[snafu(display("could not write file '{}': {source}", filename.display()))]
    WriteFile {
        /// the file path
        filename: PathBuf,
        /// underlying I/O error
        source: std::io::Error,
    },
    /// the byte-level parser rejected the input
    #[snafu(display("{source}"))]
    Parse {
        /// the underlying parser error
        source: dcmk_parser::Error,
    },
    /// the file meta information group could not be interpreted
    #[snafu(display("{source}"))]
    Meta {
        /// the underlying meta table error
        source: MetaError,
    },
    /// a typed attribute access failed
    #[snafu(display("{source}"))]
    Access {
        /// the underlying access error
        source: AccessError,
    },
    /// the object could not be re-serialized
    #[snafu(display("could not write object: {source}"))]
    Write {
        /// the underlying writer error
        source: dcmk_parser::Error,
    },
}

/// An error building or reading the file meta information table.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
#[non_exhaustive]
pub enum MetaError {
    /// a mandatory file meta element was absent
    #[snafu(display("missing required file meta element {tag}"))]
    MissingElement {
        /// the missing tag
        tag: Tag,
    },
}

/// An error accessing or interpreting a data element's value.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
#[non_exhaustive]
pub enum AccessError {
    /// no element with the given tag is present
    #[snafu(display("no such data element with tag {tag}"))]
    NoSuchDataElementTag {
        /// the tag that was looked up
        tag: Tag,
    },
    /// no element with the given dictionary alias is present
    #[snafu(display("no such data element named '{name}'"))]
    NoSuchDataElementName {
        /// the alias that was looked up
        name: String,
    },
    /// the referenced element is not a sequence
    #[snafu(display("element {tag} is not a sequence"))]
    NotASequenceElement {
        /// the offending tag
        tag: Tag,
    },
    /// the referenced element is a sequence, not a primitive value
    #[snafu(display("element {tag} is a sequence, not a primitive value"))]
    NotAPrimitive {
        /// the offending tag
        tag: Tag,
    },
    /// a value could not be read under the requested representation
    #[snafu(display("{source}"))]
    Cast {
        /// the underlying cast error
        source: CastValueError,
    },
    /// a value could not be converted to the requested representation
    #[snafu(display("{source}"))]
    Convert {
        /// the underlying conversion error
        source: ConvertValueError,
    },
    /// a value's text could not be parsed into the requested type
    #[snafu(display("{source}"))]
    Deserialize {
        /// the underlying deserialization error
        source: DeserializeError,
    },
}

impl From<CastValueError> for AccessError {
    fn from(source: CastValueError) -> Self {
        AccessError::Cast { source }
    }
}

impl From<ConvertValueError> for AccessError {
    fn from(source: ConvertValueError) -> Self {
        AccessError::Convert { source }
    }
}

impl From<DeserializeError> for AccessError {
    fn from(source: DeserializeError) -> Self {
        AccessError::Deserialize { source }
    }
}

/// An error applying an [`dcmk_core::ops::AttributeOp`] to an object.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
#[non_exhaustive]
pub enum ApplyError {
    /// an intermediate step of the selector names a sequence that is absent
    #[snafu(display("missing intermediate sequence for {selector} at step {step_index}"))]
    MissingSequence {
        /// the selector being applied
        selector: AttributeSelector,
        /// the step at which the sequence was expected
        step_index: u32,
    },
    /// an intermediate step of the selector names an element that is not a sequence
    #[snafu(display("step {step_index} of {selector} is not a sequence"))]
    NotASequence {
        /// the selector being applied
        selector: AttributeSelector,
        /// the step that was expected to be a sequence
        step_index: u32,
    },
    /// an intermediate step of the selector names an item index out of range
    #[snafu(display("item index out of range for {selector} at step {step_index}"))]
    ItemOutOfRange {
        /// the selector being applied
        selector: AttributeSelector,
        /// the step whose item index was out of range
        step_index: u32,
    },
    /// attempted to remove a mandatory file meta attribute
    #[snafu(display("illegal removal of a mandatory file meta attribute"))]
    Mandatory,
    /// the action is not supported against the targeted element
    #[snafu(display("unsupported attribute operation"))]
    UnsupportedAction,
    /// the value supplied cannot be represented in the targeted element
    #[snafu(display("value for {tag} is not representable as text"))]
    IncompatibleValue {
        /// the offending tag
        tag: Tag,
    },
}
