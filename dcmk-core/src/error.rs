//! Core-level error vocabulary: failures that arise while casting or
//! converting an already-decoded [`PrimitiveValue`](crate::value::PrimitiveValue).

use crate::value::ValueType;
use snafu::Snafu;

/// An error type for an attempt to access a value in an inappropriate
/// representation (e.g. reading a sequence as a primitive, or a string
/// as a 32-bit float array).
#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(display("requested {requested} but value is {got:?}"), visibility(pub))]
pub struct CastValueError {
    /// the value representation that was requested
    pub requested: &'static str,
    /// the value's actual representation
    pub got: ValueType,
}

/// An error type for a failed conversion between compatible primitive
/// value representations (e.g. integer array to string list).
#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(
    display("could not convert value of type {got:?} to {requested}"),
    visibility(pub)
)]
pub struct ConvertValueError {
    /// the value representation that was requested
    pub requested: &'static str,
    /// the value's original representation
    pub got: ValueType,
}

/// Type alias for a result from this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Aggregate error type for `dcmk-core`.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// a value was accessed through an incompatible representation
    #[snafu(display("{source}"), context(false))]
    CastValue {
        /// the underlying cast error
        source: CastValueError,
    },
    /// a value could not be converted to the requested representation
    #[snafu(display("{source}"), context(false))]
    ConvertValue {
        /// the underlying conversion error
        source: ConvertValueError,
    },
    /// a value's textual content could not be parsed into the requested type
    #[snafu(display("{source}"), context(false))]
    Deserialize {
        /// the underlying deserialization error
        source: crate::value::DeserializeError,
    },
}
