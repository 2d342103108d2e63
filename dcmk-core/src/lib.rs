//! Core types shared by the whole toolkit: tags, value representations,
//! lengths, data element headers, the value model and the attribute
//! dictionary and edit-operation contracts.
//!
//! This crate has no knowledge of byte order, transfer syntaxes, or file
//! I/O — those live in `dcmk-encoding`, `dcmk-transfer-syntax-registry`,
//! `dcmk-parser` and `dcmk-object`.

pub mod dictionary;
pub mod error;
pub mod header;
pub mod length;
pub mod ops;
pub mod tag;
pub mod value;
pub mod vr;

pub use error::{CastValueError, ConvertValueError, Error, Result};
pub use header::{DataElementHeader, HasLength, Header, SequenceItemHeader};
pub use length::Length;
pub use tag::{ElementNumber, GroupNumber, Tag};
pub use value::{DicomValueType, PersonName, PrimitiveValue, Value, ValueType};
pub use vr::{ValueKind, VR};
