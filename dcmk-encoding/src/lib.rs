//! Endian-aware primitive decoding/encoding, VR-driven length field rules,
//! and specific character set text codecs.
//!
//! This crate has no notion of *which* transfer syntaxes exist — only how
//! to read and write the two families (Explicit/Implicit VR, Little/Big
//! Endian) that the standard's field layout distinguishes. The catalog of
//! concrete transfer syntax UIDs lives in `dcmk-transfer-syntax-registry`.

pub mod decode;
pub mod encode;
pub mod error;
pub mod reader;
pub mod text;
pub mod transfer_syntax;

pub use decode::Decode;
pub use encode::Encode;
pub use error::{Error, Result};
pub use reader::{ByteReader, Endianness};
pub use text::{SpecificCharacterSet, TextCodec};
pub use transfer_syntax::{Codec, TransferSyntax, TransferSyntaxIndex};
