//! The in-memory data-set model: a typed, mutable DICOM object tree built
//! from [`dcmk_parser`]'s parse result, the file meta information table,
//! and the attribute edit API ([`dcmk_core::ops`]) implemented over both.

pub mod error;
pub mod file;
pub mod mem;
pub mod meta;

pub use error::{AccessError, ApplyError, Error, MetaError, Result};
pub use file::FileDicomObject;
pub use mem::{ElementValue, InMemDicomObject, InMemElement};
pub use meta::{FileMetaTable, FileMetaTableBuilder};
