//! The parsed representation of a data set: a flat, tag-ordered list of
//! elements whose sequence values recurse into nested lists of the same
//! kind.
//!
//! This is deliberately not the lineage's `DataToken` stream. A streaming
//! token iterator earns its keep when values may be read lazily from a
//! `Read` source; this toolkit's parser always holds the whole input in
//! memory already, so building the tree directly (and handing it to
//! `dcmk-object` to wrap in a typed data set) is the simpler design.

use dcmk_core::header::{DataElementHeader, HasLength, Header};
use dcmk_core::{Length, PrimitiveValue, Tag};

/// One data element as read from a data set, together with its decoded value.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSetElement {
    /// The element's header (tag, VR, on-disk length).
    pub header: DataElementHeader,
    /// The element's decoded value.
    pub value: ElementValue,
}

impl DataSetElement {
    /// The element's tag.
    pub fn tag(&self) -> Tag {
        self.header.tag
    }
}

impl Header for DataSetElement {
    fn tag(&self) -> Tag {
        self.header.tag
    }

    fn len(&self) -> Length {
        self.header.len
    }
}

impl HasLength for DataSetElement {
    fn length(&self) -> Length {
        self.header.len
    }
}

/// The value held by a parsed [`DataSetElement`].
#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    /// A non-sequence value.
    Primitive(PrimitiveValue),
    /// A sequence of items, each itself a nested, tag-ordered element list.
    Sequence {
        /// the nested items
        items: Vec<Vec<DataSetElement>>,
        /// the sequence's on-disk length, as read (possibly undefined)
        size: Length,
    },
    /// Encapsulated pixel data: a basic offset table followed by one or
    /// more compressed fragments, found under an undefined-length pixel
    /// data element in an encapsulated transfer syntax.
    PixelSequence {
        /// byte offsets of each frame's first fragment, decoded from the
        /// basic offset table item (empty if the table itself was empty)
        offset_table: Vec<u32>,
        /// the raw bytes of each fragment item, in order
        fragments: Vec<Vec<u8>>,
    },
}
