//! The in-memory data set: a tag-ordered tree of typed elements, built on
//! top of [`dcmk_parser::tree`]'s raw parse result, with the typed
//! accessors and the attribute edit API layered on top.

use std::borrow::Cow;
use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use dcmk_core::dictionary::{DataDictionary, DictionaryEntry};
use dcmk_core::header::{DataElementHeader, HasLength, Header};
use dcmk_core::ops::{ApplyOp, AttributeAction, AttributeOp, AttributeSelector, AttributeSelectorStep};
use dcmk_core::{Length, PersonName, PrimitiveValue, Tag, Value, VR};
use dcmk_dictionary_std::StandardDataDictionary;
use dcmk_parser::tree::{DataSetElement, ElementValue as RawElementValue};
use snafu::OptionExt;

use crate::error::{
    AccessError, ApplyError, IncompatibleValueSnafu, ItemOutOfRangeSnafu, MissingSequenceSnafu,
    NoSuchDataElementNameSnafu, NoSuchDataElementTagSnafu, NotAPrimitiveSnafu, NotASequenceElementSnafu,
    NotASequenceSnafu, UnsupportedActionSnafu,
};

/// The value held by an element of an [`InMemDicomObject`].
///
/// Distinct from [`dcmk_parser::tree::ElementValue`]: sequence items here
/// are typed [`InMemDicomObject`]s rather than raw element lists, closing
/// the recursive knot that [`dcmk_core::value::Value`] leaves open for its
/// owning crate to supply.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    /// A primitive value or a sequence of nested objects.
    Value(Value<InMemDicomObject>),
    /// Encapsulated pixel data: a basic offset table and compressed fragments.
    PixelSequence {
        /// byte offsets of each frame's first fragment
        offset_table: Vec<u32>,
        /// the raw bytes of each fragment item, in order
        fragments: Vec<Vec<u8>>,
    },
}

/// One element of an [`InMemDicomObject`]: a header paired with its value.
#[derive(Debug, Clone, PartialEq)]
pub struct InMemElement {
    header: DataElementHeader,
    value: ElementValue,
}

impl InMemElement {
    fn new(header: DataElementHeader, value: ElementValue) -> Self {
        InMemElement { header, value }
    }

    /// The element's header.
    pub fn header(&self) -> &DataElementHeader {
        &self.header
    }

    /// The element's value.
    pub fn value(&self) -> &ElementValue {
        &self.value
    }

    /// The element's value representation.
    pub fn vr(&self) -> VR {
        self.header.vr
    }

    /// The primitive value held by this element, if it is not a sequence.
    pub fn primitive(&self) -> Option<&PrimitiveValue> {
        match &self.value {
            ElementValue::Value(v) => v.primitive(),
            ElementValue::PixelSequence { .. } => None,
        }
    }

    /// The nested items held by this element, if it is a sequence.
    pub fn items(&self) -> Option<&[InMemDicomObject]> {
        match &self.value {
            ElementValue::Value(v) => v.items(),
            ElementValue::PixelSequence { .. } => None,
        }
    }

    fn to_raw(&self) -> DataSetElement {
        let value = match &self.value {
            ElementValue::Value(Value::Primitive(v)) => RawElementValue::Primitive(v.clone()),
            ElementValue::Value(Value::Sequence { items, size }) => {
                RawElementValue::Sequence { items: items.iter().map(InMemDicomObject::to_elements).collect(), size: *size }
            }
            ElementValue::PixelSequence { offset_table, fragments } => {
                RawElementValue::PixelSequence { offset_table: offset_table.clone(), fragments: fragments.clone() }
            }
        };
        DataSetElement { header: self.header, value }
    }
}

impl Header for InMemElement {
    fn tag(&self) -> Tag {
        self.header.tag
    }

    fn len(&self) -> Length {
        self.header.len
    }
}

impl HasLength for InMemElement {
    fn length(&self) -> Length {
        self.header.len
    }
}

fn convert_raw(raw: DataSetElement) -> InMemElement {
    let value = match raw.value {
        RawElementValue::Primitive(v) => ElementValue::Value(Value::Primitive(v)),
        RawElementValue::Sequence { items, size } => {
            let items = items.into_iter().map(InMemDicomObject::from_elements).collect();
            ElementValue::Value(Value::Sequence { items, size })
        }
        RawElementValue::PixelSequence { offset_table, fragments } => ElementValue::PixelSequence { offset_table, fragments },
    };
    InMemElement::new(raw.header, value)
}

/// An in-memory DICOM data set: a tag-ordered map of elements, with typed
/// accessors and the attribute edit API ([`ApplyOp`]) implemented on top.
///
/// A monotonic `epoch` counter is bumped on every mutation, independent of
/// the element map itself, so that downstream crates (`dcmk-pixeldata`'s
/// descriptor cache, in particular) can tell whether a previously read
/// object has since changed without depending back on this crate's
/// internals.
#[derive(Debug, Clone, PartialEq)]
pub struct InMemDicomObject {
    entries: BTreeMap<Tag, InMemElement>,
    len: Length,
    epoch: u64,
}

impl Default for InMemDicomObject {
    fn default() -> Self {
        InMemDicomObject::new_empty()
    }
}

impl InMemDicomObject {
    /// An object with no elements.
    pub fn new_empty() -> Self {
        InMemDicomObject { entries: BTreeMap::new(), len: Length::UNDEFINED, epoch: 0 }
    }

    /// Build an object from a parsed, tag-ordered element list, recursively
    /// converting nested sequence items.
    pub fn from_elements(elements: Vec<DataSetElement>) -> Self {
        let entries = elements.into_iter().map(|raw| {
            let element = convert_raw(raw);
            (element.tag(), element)
        });
        InMemDicomObject { entries: entries.collect(), len: Length::UNDEFINED, epoch: 0 }
    }

    /// Flatten this object back into a tag-ordered element list, suitable
    /// for [`dcmk_parser::writer::write_elements`].
    pub fn to_elements(&self) -> Vec<DataSetElement> {
        self.entries.values().map(InMemElement::to_raw).collect()
    }

    /// The number of elements directly held by this object (not counting
    /// elements nested inside sequence items).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether this object holds no elements.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A counter bumped on every mutation of this object (not its nested
    /// items). Two clones with equal epochs are not guaranteed equal, but
    /// an object whose epoch has changed is guaranteed to differ from its
    /// earlier self.
    pub fn mutation_epoch(&self) -> u64 {
        self.epoch
    }

    fn touch(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        self.len = Length::UNDEFINED;
    }

    /// The element at `tag`, if present.
    pub fn get(&self, tag: Tag) -> Option<&InMemElement> {
        self.entries.get(&tag)
    }

    /// The element at `tag`.
    pub fn element(&self, tag: Tag) -> Result<&InMemElement, AccessError> {
        self.get(tag).context(NoSuchDataElementTagSnafu { tag })
    }

    /// The element named `name` in the standard dictionary.
    pub fn element_by_name(&self, name: &str) -> Result<&InMemElement, AccessError> {
        let tag = StandardDataDictionary.by_name(name).map(|entry| entry.tag()).context(NoSuchDataElementNameSnafu { name })?;
        self.element(tag)
    }

    fn primitive_value(&self, tag: Tag) -> Result<&PrimitiveValue, AccessError> {
        match &self.element(tag)?.value {
            ElementValue::Value(v) => v.primitive().context(NotAPrimitiveSnafu { tag }),
            ElementValue::PixelSequence { .. } => NotAPrimitiveSnafu { tag }.fail(),
        }
    }

    /// The element's value as a single string (multiple values joined with `\`).
    pub fn get_string(&self, tag: Tag) -> Result<Cow<'_, str>, AccessError> {
        Ok(self.primitive_value(tag)?.to_str()?)
    }

    /// The element's value as a list of strings.
    pub fn get_strings(&self, tag: Tag) -> Result<Cow<'_, [String]>, AccessError> {
        Ok(self.primitive_value(tag)?.to_multi_str()?)
    }

    /// The element's value interpreted as a sequence of `u16`s.
    pub fn get_u16(&self, tag: Tag) -> Result<&[u16], AccessError> {
        Ok(self.primitive_value(tag)?.u16_slice()?)
    }

    /// The element's value interpreted as a sequence of `f64`s.
    pub fn get_f64(&self, tag: Tag) -> Result<Cow<'_, [f64]>, AccessError> {
        Ok(self.primitive_value(tag)?.f64_slice()?)
    }

    /// The element's value interpreted as a sequence of `i32`s.
    pub fn get_i32(&self, tag: Tag) -> Result<Cow<'_, [i32]>, AccessError> {
        Ok(self.primitive_value(tag)?.i32_slice()?)
    }

    /// The element's value parsed as a list of dates.
    pub fn get_dates(&self, tag: Tag) -> Result<Vec<NaiveDate>, AccessError> {
        Ok(self.primitive_value(tag)?.to_dates()?)
    }

    /// The element's value parsed as a list of times.
    pub fn get_times(&self, tag: Tag) -> Result<Vec<NaiveTime>, AccessError> {
        Ok(self.primitive_value(tag)?.to_times()?)
    }

    /// The element's value parsed as a list of date-times, using
    /// `default_offset` for values that omit a UTC offset.
    pub fn get_datetimes(&self, tag: Tag, default_offset: FixedOffset) -> Result<Vec<DateTime<FixedOffset>>, AccessError> {
        Ok(self.primitive_value(tag)?.to_datetimes(default_offset)?)
    }

    /// The element's value parsed as a person name.
    pub fn get_person_name(&self, tag: Tag) -> Result<PersonName, AccessError> {
        let raw = self.primitive_value(tag)?.to_str()?;
        Ok(PersonName::parse(&raw))
    }

    /// The nested items of the sequence at `tag`.
    pub fn items(&self, tag: Tag) -> Result<&[InMemDicomObject], AccessError> {
        self.element(tag)?.items().context(NotASequenceElementSnafu { tag })
    }

    /// An iterator over this object's elements, in ascending tag order.
    pub fn iter(&self) -> impl Iterator<Item = &InMemElement> {
        self.entries.values()
    }

    /// An iterator over this object's tags, in ascending order.
    pub fn tags(&self) -> impl Iterator<Item = Tag> + '_ {
        self.entries.keys().copied()
    }

    /// Insert a fully-formed element, returning the one it replaced, if any.
    pub fn put(&mut self, element: InMemElement) -> Option<InMemElement> {
        self.touch();
        self.entries.insert(element.tag(), element)
    }

    /// Insert a single-valued text element under the dictionary's VR (or
    /// `UN` if the tag has no dictionary entry).
    pub fn put_str(&mut self, tag: Tag, value: impl Into<String>) {
        self.set_primitive(tag, PrimitiveValue::from(value.into()));
    }

    /// Remove and return the element at `tag`, if present.
    pub fn remove(&mut self, tag: Tag) -> Option<InMemElement> {
        self.touch();
        self.entries.remove(&tag)
    }

    /// Retain only the elements for which `f` returns `true`.
    pub fn retain(&mut self, mut f: impl FnMut(&InMemElement) -> bool) {
        self.touch();
        self.entries.retain(|_, e| f(e));
    }

    /// Replace the value of the element at `tag` in place, if present.
    pub fn update_value(&mut self, tag: Tag, f: impl FnOnce(&mut Value<InMemDicomObject>)) {
        if let Some(e) = self.entries.get_mut(&tag) {
            if let ElementValue::Value(v) = &mut e.value {
                f(v);
            }
        }
        self.touch();
    }

    fn set_primitive(&mut self, tag: Tag, value: PrimitiveValue) {
        let len = value.calculate_byte_len();
        match self.entries.get_mut(&tag) {
            Some(e) => {
                e.header.len = len;
                e.value = ElementValue::Value(Value::Primitive(value));
            }
            None => {
                let vr = StandardDataDictionary.by_tag(tag).map(DictionaryEntry::vr).unwrap_or(VR::UN);
                self.entries.insert(tag, InMemElement::new(DataElementHeader::new(tag, vr, len), ElementValue::Value(Value::Primitive(value))));
            }
        }
        self.touch();
    }

    fn apply_at(&mut self, selector: AttributeSelector, action: AttributeAction, step_index: u32) -> Result<(), ApplyError> {
        match selector.split_first() {
            (AttributeSelectorStep::Tag(tag), None) => self.apply_leaf(tag, action),
            (AttributeSelectorStep::Nested { tag, item }, Some(rest)) => {
                match self.entries.get_mut(&tag).map(|e| &mut e.value) {
                    Some(ElementValue::Value(Value::Sequence { items, .. })) => {
                        let obj = items
                            .get_mut(item as usize)
                            .context(ItemOutOfRangeSnafu { selector: selector.clone(), step_index })?;
                        obj.apply_at(rest, action, step_index + 1)?;
                        self.touch();
                        Ok(())
                    }
                    Some(_) => NotASequenceSnafu { selector: selector.clone(), step_index }.fail(),
                    None if action.is_constructive() => {
                        let mut obj = InMemDicomObject::new_empty();
                        obj.apply_at(rest, action, step_index + 1)?;
                        let vr = StandardDataDictionary.by_tag(tag).map(DictionaryEntry::vr).unwrap_or(VR::SQ);
                        self.entries.insert(
                            tag,
                            InMemElement::new(
                                DataElementHeader::new(tag, vr, Length::UNDEFINED),
                                ElementValue::Value(Value::Sequence { items: vec![obj], size: Length::UNDEFINED }),
                            ),
                        );
                        self.touch();
                        Ok(())
                    }
                    None => MissingSequenceSnafu { selector: selector.clone(), step_index }.fail(),
                }
            }
            _ => unreachable!("a selector's only Tag step is its last"),
        }
    }

    fn apply_leaf(&mut self, tag: Tag, action: AttributeAction) -> Result<(), ApplyError> {
        match action {
            AttributeAction::Remove => {
                self.remove(tag);
                Ok(())
            }
            AttributeAction::Empty => {
                if let Some(e) = self.entries.get_mut(&tag) {
                    e.value = ElementValue::Value(Value::Primitive(PrimitiveValue::Empty));
                    e.header.len = Length::defined(0);
                }
                self.touch();
                Ok(())
            }
            AttributeAction::Set(value) => {
                self.set_primitive(tag, value);
                Ok(())
            }
            AttributeAction::SetStr(s) => {
                self.set_primitive(tag, PrimitiveValue::from(s.into_owned()));
                Ok(())
            }
            AttributeAction::SetIfMissing(value) => {
                if self.get(tag).is_none() {
                    self.set_primitive(tag, value);
                }
                Ok(())
            }
            AttributeAction::Replace(value) => {
                if self.get(tag).is_some() {
                    self.set_primitive(tag, value);
                }
                Ok(())
            }
            AttributeAction::PushStr(s) => self.apply_push_str(tag, s.into_owned()),
            AttributeAction::PushI32(n) => self.apply_push_i32(tag, n),
            AttributeAction::PushU32(n) => self.apply_push_u32(tag, n),
            AttributeAction::Truncate(n) => {
                self.apply_truncate(tag, n);
                Ok(())
            }
            _ => UnsupportedActionSnafu.fail(),
        }
    }

    fn apply_push_str(&mut self, tag: Tag, text: String) -> Result<(), ApplyError> {
        let Some(e) = self.entries.get_mut(&tag) else {
            self.set_primitive(tag, PrimitiveValue::from(text));
            return Ok(());
        };
        let ElementValue::Value(Value::Primitive(value)) = &mut e.value else {
            return IncompatibleValueSnafu { tag }.fail();
        };
        match value {
            PrimitiveValue::Empty => *value = PrimitiveValue::from(text),
            PrimitiveValue::Str(_) => {
                let PrimitiveValue::Str(s) = std::mem::replace(value, PrimitiveValue::Empty) else { unreachable!() };
                *value = PrimitiveValue::Strs(smallvec::smallvec![s, text]);
            }
            PrimitiveValue::Strs(c) => c.push(text),
            _ => return IncompatibleValueSnafu { tag }.fail(),
        }
        e.header.len = value.calculate_byte_len();
        self.touch();
        Ok(())
    }

    fn apply_push_i32(&mut self, tag: Tag, n: i32) -> Result<(), ApplyError> {
        let Some(e) = self.entries.get_mut(&tag) else {
            self.set_primitive(tag, PrimitiveValue::from(n));
            return Ok(());
        };
        let ElementValue::Value(Value::Primitive(value)) = &mut e.value else {
            return IncompatibleValueSnafu { tag }.fail();
        };
        match value {
            PrimitiveValue::Empty => *value = PrimitiveValue::from(n),
            PrimitiveValue::I32(c) => c.push(n),
            _ => return IncompatibleValueSnafu { tag }.fail(),
        }
        e.header.len = value.calculate_byte_len();
        self.touch();
        Ok(())
    }

    fn apply_push_u32(&mut self, tag: Tag, n: u32) -> Result<(), ApplyError> {
        let Some(e) = self.entries.get_mut(&tag) else {
            self.set_primitive(tag, PrimitiveValue::from(n));
            return Ok(());
        };
        let ElementValue::Value(Value::Primitive(value)) = &mut e.value else {
            return IncompatibleValueSnafu { tag }.fail();
        };
        match value {
            PrimitiveValue::Empty => *value = PrimitiveValue::from(n),
            PrimitiveValue::U32(c) => c.push(n),
            _ => return IncompatibleValueSnafu { tag }.fail(),
        }
        e.header.len = value.calculate_byte_len();
        self.touch();
        Ok(())
    }

    fn apply_truncate(&mut self, tag: Tag, n: usize) {
        if let Some(e) = self.entries.get_mut(&tag) {
            match &mut e.value {
                ElementValue::Value(Value::Primitive(value)) => {
                    truncate_primitive(value, n);
                    e.header.len = value.calculate_byte_len();
                }
                ElementValue::Value(Value::Sequence { items, .. }) => items.truncate(n),
                ElementValue::PixelSequence { fragments, .. } => fragments.truncate(n),
            }
        }
        self.touch();
    }
}

fn truncate_primitive(value: &mut PrimitiveValue, n: usize) {
    match value {
        PrimitiveValue::Strs(c) => c.truncate(n),
        PrimitiveValue::Tags(c) => c.truncate(n),
        PrimitiveValue::U8(c) => c.truncate(n),
        PrimitiveValue::I16(c) => c.truncate(n),
        PrimitiveValue::U16(c) => c.truncate(n),
        PrimitiveValue::I32(c) => c.truncate(n),
        PrimitiveValue::U32(c) => c.truncate(n),
        PrimitiveValue::I64(c) => c.truncate(n),
        PrimitiveValue::U64(c) => c.truncate(n),
        PrimitiveValue::F32(c) => c.truncate(n),
        PrimitiveValue::F64(c) => c.truncate(n),
        PrimitiveValue::Date(c) => c.truncate(n),
        PrimitiveValue::DateTime(c) => c.truncate(n),
        PrimitiveValue::Time(c) => c.truncate(n),
        PrimitiveValue::Str(_) | PrimitiveValue::Empty => {}
    }
}

impl ApplyOp for InMemDicomObject {
    type Err = ApplyError;

    fn apply(&mut self, op: AttributeOp) -> Result<(), ApplyError> {
        self.apply_at(op.selector, op.action, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcmk_core::ops::AttributeOp;

    fn patient_name_element(name: &str) -> InMemElement {
        InMemElement::new(
            DataElementHeader::new(Tag(0x0010, 0x0010), VR::PN, Length::defined(name.len() as u32)),
            ElementValue::Value(Value::Primitive(PrimitiveValue::from(name))),
        )
    }

    #[test]
    fn put_and_get_round_trip() {
        let mut obj = InMemDicomObject::new_empty();
        obj.put(patient_name_element("Doe^Jane"));
        assert_eq!(obj.get_string(Tag(0x0010, 0x0010)).unwrap(), "Doe^Jane");
    }

    #[test]
    fn mutation_bumps_epoch() {
        let mut obj = InMemDicomObject::new_empty();
        let before = obj.mutation_epoch();
        obj.put_str(Tag(0x0008, 0x0060), "OT");
        assert_ne!(before, obj.mutation_epoch());
    }

    #[test]
    fn apply_set_creates_missing_element() {
        let mut obj = InMemDicomObject::new_empty();
        let op = AttributeOp::new(Tag(0x0008, 0x0060), AttributeAction::SetStr("OT".into()));
        obj.apply(op).unwrap();
        assert_eq!(obj.get_string(Tag(0x0008, 0x0060)).unwrap(), "OT");
    }

    #[test]
    fn apply_remove_deletes_element() {
        let mut obj = InMemDicomObject::new_empty();
        obj.put(patient_name_element("Doe^Jane"));
        let op = AttributeOp::new(Tag(0x0010, 0x0010), AttributeAction::Remove);
        obj.apply(op).unwrap();
        assert!(obj.get(Tag(0x0010, 0x0010)).is_none());
    }

    #[test]
    fn apply_nested_selector_descends_into_sequence_item() {
        let mut inner = InMemDicomObject::new_empty();
        inner.put_str(Tag(0x0008, 0x0100), "1");
        let seq = InMemElement::new(
            DataElementHeader::new(Tag(0x0040, 0xa043), VR::SQ, Length::UNDEFINED),
            ElementValue::Value(Value::Sequence { items: vec![inner], size: Length::UNDEFINED }),
        );
        let mut obj = InMemDicomObject::new_empty();
        obj.put(seq);

        let op = AttributeOp::new((Tag(0x0040, 0xa043), 0, Tag(0x0008, 0x0100)), AttributeAction::SetStr("2".into()));
        obj.apply(op).unwrap();

        let items = obj.items(Tag(0x0040, 0xa043)).unwrap();
        assert_eq!(items[0].get_string(Tag(0x0008, 0x0100)).unwrap(), "2");
    }

    #[test]
    fn apply_push_str_extends_multi_valued_text() {
        let mut obj = InMemDicomObject::new_empty();
        obj.put_str(Tag(0x0008, 0x0008), "ORIGINAL");
        let op = AttributeOp::new(Tag(0x0008, 0x0008), AttributeAction::PushStr("PRIMARY".into()));
        obj.apply(op).unwrap();
        assert_eq!(obj.get_strings(Tag(0x0008, 0x0008)).unwrap().as_ref(), &["ORIGINAL".to_string(), "PRIMARY".to_string()]);
    }
}
