//! Recursive-descent parsing and round-trip writing of DICOM data sets.
//!
//! This crate works over a fully-buffered byte slice rather than a
//! generic `Read` stream: the parser sub-slices the input for
//! defined-length sequence items instead of tracking a stream position
//! against a limit, and builds a concrete tree ([`tree::DataSetElement`])
//! rather than a lazy token stream.

pub mod error;
pub mod file;
pub mod parser;
pub mod tree;
pub mod value;
pub mod writer;

pub use error::{Error, Result};
pub use file::{parse, ParsedFile};
pub use parser::{parse_data_set, ParseOptions, ParseOutcome};
pub use tree::{DataSetElement, ElementValue};
pub use writer::{write_elements, write_file};
