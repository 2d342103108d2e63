//! The data element header: tag, VR and length, shared by primitive
//! elements, sequence elements and item/sequence delimiters.

use crate::{Length, Tag, VR};

/// A type that carries a length, whether or not it also carries a tag.
pub trait HasLength {
    /// The length of the value, in bytes, or undefined if delimited.
    fn length(&self) -> Length;

    /// Whether the value is empty (zero-length and defined).
    fn is_empty(&self) -> bool {
        self.length() == Length::defined(0)
    }
}

/// A trait for a data type containing a DICOM element header.
pub trait Header {
    /// The element's tag.
    fn tag(&self) -> Tag;

    /// The element's value length, as specified on disk (possibly undefined).
    fn len(&self) -> Length;

    /// Whether this is an item start delimiter.
    fn is_item(&self) -> bool {
        self.tag() == Tag::ITEM
    }

    /// Whether this is an item end delimiter.
    fn is_item_delimiter(&self) -> bool {
        self.tag() == Tag::ITEM_DELIMITER
    }

    /// Whether this is a sequence end delimiter.
    fn is_sequence_delimiter(&self) -> bool {
        self.tag() == Tag::SEQUENCE_DELIMITER
    }
}

/// A data element header: tag, value representation and on-disk length.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct DataElementHeader {
    /// The element's tag.
    pub tag: Tag,
    /// The element's value representation.
    pub vr: VR,
    /// The element's value length (may be undefined for SQ/OB/OW/OF/OD/UN).
    pub len: Length,
}

impl DataElementHeader {
    /// Build a new header from its parts.
    pub fn new<T: Into<Tag>>(tag: T, vr: VR, len: Length) -> Self {
        DataElementHeader { tag: tag.into(), vr, len }
    }
}

impl Header for DataElementHeader {
    fn tag(&self) -> Tag {
        self.tag
    }

    fn len(&self) -> Length {
        self.len
    }
}

impl HasLength for DataElementHeader {
    fn length(&self) -> Length {
        self.len
    }
}

/// A header read while inside a sequence of items: either the start of a new
/// item, an item delimiter, or a sequence delimiter.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum SequenceItemHeader {
    /// The start of an item, with its (possibly undefined) length.
    Item {
        /// the length of the item in bytes (can be undefined)
        len: Length,
    },
    /// An item delimiter: the previous undefined-length item has ended.
    ItemDelimiter,
    /// A sequence delimiter: the enclosing undefined-length sequence has ended.
    SequenceDelimiter,
}

impl Header for SequenceItemHeader {
    fn tag(&self) -> Tag {
        match *self {
            SequenceItemHeader::Item { .. } => Tag::ITEM,
            SequenceItemHeader::ItemDelimiter => Tag::ITEM_DELIMITER,
            SequenceItemHeader::SequenceDelimiter => Tag::SEQUENCE_DELIMITER,
        }
    }

    fn len(&self) -> Length {
        match *self {
            SequenceItemHeader::Item { len } => len,
            _ => Length::defined(0),
        }
    }
}
