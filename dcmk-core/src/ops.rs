//! The attribute edit API.
//!
//! [`AttributeOp`] pairs a selector for an element ([`AttributeSelector`])
//! with the action to apply to it ([`AttributeAction`]). Types that hold a
//! data set (in `dcmk-object`) implement [`ApplyOp`] to carry it out.

use crate::value::{PrimitiveValue, C};
use crate::Tag;
use smallvec::smallvec;
use std::borrow::Cow;
use std::fmt::Write;

/// A single step of an attribute selection path: either the element at the
/// root of the current data set, or an item to navigate into first.
#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq)]
pub enum AttributeSelectorStep {
    /// Select the element with this tag in the current data set.
    Tag(Tag),
    /// Navigate into item `item` of the sequence at `tag`.
    Nested {
        /// the sequence's tag
        tag: Tag,
        /// the item index to navigate into
        item: u32,
    },
}

impl From<Tag> for AttributeSelectorStep {
    fn from(value: Tag) -> Self {
        AttributeSelectorStep::Tag(value)
    }
}

impl From<(Tag, u32)> for AttributeSelectorStep {
    fn from((tag, item): (Tag, u32)) -> Self {
        AttributeSelectorStep::Nested { tag, item }
    }
}

impl std::fmt::Display for AttributeSelectorStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeSelectorStep::Tag(tag) => std::fmt::Display::fmt(tag, f),
            AttributeSelectorStep::Nested { tag, item } => write!(f, "{tag}[{item}]"),
        }
    }
}

/// A path to a data element, possibly through one or more nested sequences.
///
/// `«key»([«item»])? ('.' «key»([«item»])?)*` — the last step always selects
/// a plain element; every step before it is a sequence to descend into
/// (item index defaults to 0 when omitted).
#[derive(Debug, Clone, Eq, Hash, PartialEq)]
pub struct AttributeSelector(C<AttributeSelectorStep>);

impl AttributeSelector {
    /// Build a selector from a sequence of steps. Returns `None` if the
    /// steps are empty or the last one is a `Nested` step rather than `Tag`.
    pub fn new(steps: impl IntoIterator<Item = AttributeSelectorStep>) -> Option<Self> {
        let mut steps: C<_> = steps.into_iter().collect();
        let (last, rest) = steps.split_last_mut()?;
        if matches!(last, AttributeSelectorStep::Nested { .. }) {
            return None;
        }
        for step in rest {
            if let AttributeSelectorStep::Tag(tag) = step {
                *step = AttributeSelectorStep::Nested { tag: *tag, item: 0 };
            }
        }
        Some(AttributeSelector(steps))
    }

    /// Split off the first step from the rest of the selector.
    pub fn split_first(&self) -> (AttributeSelectorStep, Option<AttributeSelector>) {
        let (first, rest) = self.0.split_first().expect("selector is never empty");
        let rest = if rest.is_empty() { None } else { Some(AttributeSelector(rest.into())) };
        (*first, rest)
    }

    /// The tag of the final (leaf) step.
    pub fn last_tag(&self) -> Tag {
        match self.0.last().expect("selector is never empty") {
            AttributeSelectorStep::Tag(tag) => *tag,
            AttributeSelectorStep::Nested { .. } => unreachable!("leaf step is always Tag"),
        }
    }

    /// The number of steps in this selector.
    pub fn len(&self) -> u32 {
        self.0.len() as u32
    }

    /// Whether this selector has no steps (never true for a valid selector).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for AttributeSelector {
    type Item = AttributeSelectorStep;
    type IntoIter = <C<AttributeSelectorStep> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl From<Tag> for AttributeSelector {
    fn from(tag: Tag) -> Self {
        AttributeSelector(smallvec![tag.into()])
    }
}

impl From<(Tag, u32, Tag)> for AttributeSelector {
    fn from((tag0, item, tag1): (Tag, u32, Tag)) -> Self {
        AttributeSelector(smallvec![(tag0, item).into(), tag1.into()])
    }
}

impl From<(Tag, Tag)> for AttributeSelector {
    fn from((tag0, tag1): (Tag, Tag)) -> Self {
        AttributeSelector(smallvec![(tag0, 0).into(), tag1.into()])
    }
}

impl std::fmt::Display for AttributeSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut started = false;
        for step in &self.0 {
            if started {
                f.write_char('.')?;
            }
            started = true;
            std::fmt::Display::fmt(step, f)?;
        }
        Ok(())
    }
}

/// The edit to apply to the element an [`AttributeOp`] selects.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeAction {
    /// Remove the attribute, if present.
    Remove,
    /// Clear the attribute's value, if present.
    Empty,
    /// Replace the value outright, creating the attribute if missing.
    Set(PrimitiveValue),
    /// Replace a textual value outright, creating the attribute if missing.
    SetStr(Cow<'static, str>),
    /// Set the value only if the attribute does not already exist.
    SetIfMissing(PrimitiveValue),
    /// Replace the value, but only if the attribute already exists.
    Replace(PrimitiveValue),
    /// Append a string as an additional value, creating the attribute if
    /// it does not exist. New items are `\`-delimited from existing ones.
    PushStr(Cow<'static, str>),
    /// Append a signed 32-bit value.
    PushI32(i32),
    /// Append an unsigned 32-bit value.
    PushU32(u32),
    /// Truncate a multi-valued element (or sequence) to at most `n` items,
    /// dropping items from the end. A no-op if already at or below `n`.
    Truncate(usize),
}

impl AttributeAction {
    /// Whether this action creates the attribute if it is not already
    /// present (as opposed to acting only on an existing one).
    pub fn is_constructive(&self) -> bool {
        matches!(
            self,
            AttributeAction::Set(_)
                | AttributeAction::SetStr(_)
                | AttributeAction::SetIfMissing(_)
                | AttributeAction::PushStr(_)
                | AttributeAction::PushI32(_)
                | AttributeAction::PushU32(_)
        )
    }
}

/// An operation to apply against a data set: select an element, then edit it.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeOp {
    /// the element to target
    pub selector: AttributeSelector,
    /// the edit to apply
    pub action: AttributeAction,
}

impl AttributeOp {
    /// Build an operation from a selector (or anything convertible into
    /// one) and an action.
    pub fn new(selector: impl Into<AttributeSelector>, action: AttributeAction) -> Self {
        AttributeOp { selector: selector.into(), action }
    }
}

/// Implemented by data set types that support the attribute edit API.
pub trait ApplyOp {
    /// The error produced when an operation cannot be applied.
    type Err: std::error::Error + 'static;

    /// Apply a single attribute operation, leaving the receiver unchanged
    /// if it fails.
    fn apply(&mut self, op: AttributeOp) -> Result<(), Self::Err>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_selectors() {
        let selector: AttributeSelector = Tag(0x0014, 0x5100).into();
        assert_eq!(selector.to_string(), "(0014,5100)");

        let selector: AttributeSelector = (Tag(0x0018, 0x6011), 2, Tag(0x0018, 0x6012)).into();
        assert_eq!(selector.to_string(), "(0018,6011)[2].(0018,6012)");
    }

    #[test]
    fn split_selectors() {
        let selector: AttributeSelector = Tag(0x0014, 0x5100).into();
        assert_eq!(selector.split_first(), (AttributeSelectorStep::Tag(Tag(0x0014, 0x5100)), None));

        let selector: AttributeSelector = (Tag(0x0018, 0x6011), 2, Tag(0x0018, 0x6012)).into();
        assert_eq!(
            selector.split_first(),
            (
                AttributeSelectorStep::Nested { tag: Tag(0x0018, 0x6011), item: 2 },
                Some(Tag(0x0018, 0x6012).into())
            )
        );
    }
}
