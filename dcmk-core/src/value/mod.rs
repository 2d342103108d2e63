//! The DICOM value model: [`PrimitiveValue`], the element-level [`Value`]
//! wrapper that adds sequences on top of it, and the specialized text
//! parsers (person name, date/time) used by typed accessors upstream.

mod person_name;
mod primitive;

pub mod deserialize;

pub use person_name::PersonName;
pub use primitive::{PrimitiveValue, ValueType};

pub use deserialize::Error as DeserializeError;

use crate::header::HasLength;
use crate::Length;
use smallvec::SmallVec;

/// An aggregation of one or more elements in a value, optimized for the
/// common case of a handful of values per element.
pub type C<T> = SmallVec<[T; 2]>;

/// A trait for anything that can report its own [`ValueType`] and element
/// count ("cardinality" — the number of values inside one element, or the
/// number of items inside a sequence).
pub trait DicomValueType: HasLength {
    /// This value's representation kind.
    fn value_type(&self) -> ValueType;

    /// The number of elements contained in the value.
    fn cardinality(&self) -> usize;
}

impl HasLength for PrimitiveValue {
    fn length(&self) -> Length {
        self.calculate_byte_len()
    }
}

impl DicomValueType for PrimitiveValue {
    fn value_type(&self) -> ValueType {
        self.value_type()
    }

    fn cardinality(&self) -> usize {
        self.multiplicity() as usize
    }
}

/// A full DICOM element value: either a primitive value or a nested
/// sequence of items, each of which is itself a data set of type `I`.
///
/// `I` is supplied by the crate that owns the data-set type (`dcmk-object`),
/// keeping this crate free of any dependency on the data-set model.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<I> {
    /// A primitive (non-nested) value.
    Primitive(PrimitiveValue),
    /// A sequence of items, each a nested data set.
    Sequence {
        /// the items of the sequence
        items: Vec<I>,
        /// the original length of the sequence's value, as read from disk
        size: Length,
    },
}

impl<I> Value<I> {
    /// Build a sequence value with a defined length derived from its items.
    pub fn new_sequence(items: Vec<I>, size: Length) -> Self {
        Value::Sequence { items, size }
    }

    /// View this value as a primitive, if it is one.
    pub fn primitive(&self) -> Option<&PrimitiveValue> {
        match self {
            Value::Primitive(v) => Some(v),
            _ => None,
        }
    }

    /// View this value's items, if it is a sequence.
    pub fn items(&self) -> Option<&[I]> {
        match self {
            Value::Sequence { items, .. } => Some(items),
            _ => None,
        }
    }
}

impl<I> From<PrimitiveValue> for Value<I> {
    fn from(v: PrimitiveValue) -> Self {
        Value::Primitive(v)
    }
}

impl<I> HasLength for Value<I> {
    fn length(&self) -> Length {
        match self {
            Value::Primitive(v) => v.length(),
            Value::Sequence { size, .. } => *size,
        }
    }
}
