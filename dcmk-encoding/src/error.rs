//! Crate-level error types.

use crate::reader::UnexpectedEof;
use dcmk_core::Tag;
use snafu::Snafu;

/// Type alias for a result from this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced while decoding a data element or item header.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
#[non_exhaustive]
pub enum Error {
    /// The tag of a header could not be read.
    #[snafu(display("could not read header tag: {source}"))]
    ReadTag { source: UnexpectedEof },

    /// The reserved bytes following an explicit-VR long form could not be read.
    #[snafu(display("could not read reserved bytes: {source}"))]
    ReadReserved { source: UnexpectedEof },

    /// The length field of a header could not be read.
    #[snafu(display("could not read element length: {source}"))]
    ReadLength { source: UnexpectedEof },

    /// The value representation field of an explicit-VR header could not be read.
    #[snafu(display("could not read value representation: {source}"))]
    ReadVr { source: UnexpectedEof },

    /// A sequence item header did not carry a recognized delimiter tag.
    #[snafu(display("unexpected sequence item tag {tag}"))]
    UnexpectedItemTag { tag: Tag },
}
