//! Crate-level error types.

use dcmk_core::Tag;
use snafu::Snafu;

/// Type alias for a result from this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced while parsing or writing a data set.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
#[non_exhaustive]
pub enum Error {
    /// The buffer ran out before a header or value could be fully read.
    #[snafu(display("unexpected end of data at offset {offset}: needed {needed} more byte(s)"))]
    UnexpectedEndOfData {
        /// byte offset at which the read was attempted
        offset: usize,
        /// number of bytes that would have been required
        needed: usize,
    },

    /// The 128-byte preamble could not be read (file shorter than 132 bytes).
    #[snafu(display("invalid or missing preamble"))]
    InvalidPreamble,

    /// The 4-byte `DICM` magic prefix was absent at offset 128.
    #[snafu(display("invalid or missing DICM prefix"))]
    InvalidDicmPrefix,

    /// A header failed to decode in strict mode.
    #[snafu(display("could not decode header at offset {offset}: {source}"))]
    DecodeHeader {
        /// offset at which decoding was attempted
        offset: usize,
        /// underlying decode error
        source: dcmk_encoding::Error,
    },

    /// A value's raw text could not be converted to its typed form.
    #[snafu(display("could not decode value for tag {tag}: {source}"))]
    DecodeValue {
        /// the offending tag
        tag: Tag,
        /// underlying deserialization error
        source: dcmk_core::value::DeserializeError,
    },

    /// A value's text could not be encoded under the active character set.
    #[snafu(display("could not encode value for tag {tag}: {source}"))]
    EncodeValue {
        /// the offending tag
        tag: Tag,
        /// underlying text encoding error
        source: dcmk_encoding::text::EncodeTextError,
    },

    /// A transfer syntax cannot be round-trip written (retired big-endian,
    /// deflated, or an encapsulated/compressed pixel data transfer syntax).
    #[snafu(display("cannot write a data set under transfer syntax {uid}"))]
    UnwritableTransferSyntax {
        /// the offending UID
        uid: String,
    },

    /// A sequence item carried a tag other than the item/delimiter family.
    #[snafu(display("unexpected item tag {tag}"))]
    UnexpectedItemTag {
        /// the offending tag
        tag: Tag,
    },

    /// Recursion nested deeper than the configured limit.
    #[snafu(display("sequence nesting exceeded the recursion limit of {limit}"))]
    RecursionLimitExceeded {
        /// the configured limit
        limit: usize,
    },

    /// The referenced transfer syntax UID is not known to the registry in use.
    #[snafu(display("unsupported transfer syntax: {uid}"))]
    UnsupportedTransferSyntax {
        /// the offending UID
        uid: String,
    },

    /// A required file meta element was absent.
    #[snafu(display("missing required file meta element {tag}"))]
    MissingMetaElement {
        /// the missing tag
        tag: Tag,
    },

    /// Parsing was cancelled through the caller-supplied cancellation token.
    #[snafu(display("parsing was cancelled"))]
    Cancelled,

    /// The deflated data set bytes of a Deflated Explicit VR Little Endian
    /// file could not be inflated.
    #[snafu(display("could not inflate deflated data set: {source}"))]
    Inflate {
        /// underlying I/O error from the deflate stream
        source: std::io::Error,
    },
}
