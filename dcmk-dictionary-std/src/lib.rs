//! The standard DICOM attribute dictionary: [`StandardDataDictionary`], a
//! zero-sized handle over a sorted static table, looked up by binary
//! search instead of a runtime hash map.

pub mod entries;
pub mod uids;

use dcmk_core::dictionary::{DataDictionary, DictionaryEntry, DictionaryEntryRef, TagRange};
use dcmk_core::Tag;
use entries::{ENTRIES, REPEATING_GROUP100};

static GROUP_LENGTH_ENTRY: DictionaryEntryRef<'static> =
    DictionaryEntryRef { tag: TagRange::GroupLength, alias: "GenericGroupLength", vr: dcmk_core::VR::UL };

static PRIVATE_CREATOR_ENTRY: DictionaryEntryRef<'static> =
    DictionaryEntryRef { tag: TagRange::PrivateCreator, alias: "PrivateCreator", vr: dcmk_core::VR::LO };

/// The standard attribute dictionary.
///
/// A zero-sized type: all state lives in the `static` tables in
/// [`entries`]. Lookups by tag are `O(log n)` binary searches; lookups by
/// name fall back to a linear scan, since the table is not also sorted by
/// alias.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StandardDataDictionary;

impl StandardDataDictionary {
    fn lookup_tag(tag: Tag) -> Option<&'static DictionaryEntryRef<'static>> {
        if let Ok(i) = ENTRIES.binary_search_by_key(&tag, |e| e.tag.inner()) {
            return Some(&ENTRIES[i]);
        }
        for candidate in REPEATING_GROUP100 {
            if candidate.tag_range().contains(tag) {
                return Some(candidate);
            }
        }
        if tag.is_private_creator() {
            return Some(&PRIVATE_CREATOR_ENTRY);
        }
        if TagRange::GroupLength.contains(tag) {
            return Some(&GROUP_LENGTH_ENTRY);
        }
        None
    }
}

impl DataDictionary for StandardDataDictionary {
    type Entry = DictionaryEntryRef<'static>;

    fn by_tag(&self, tag: Tag) -> Option<&Self::Entry> {
        Self::lookup_tag(tag)
    }

    fn by_name(&self, name: &str) -> Option<&Self::Entry> {
        ENTRIES.iter().find(|e| e.alias == name).or_else(|| REPEATING_GROUP100.iter().find(|e| e.alias == name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcmk_core::VR;

    #[test]
    fn looks_up_patient_name_by_tag() {
        let entry = StandardDataDictionary.by_tag(Tag(0x0010, 0x0010)).unwrap();
        assert_eq!(entry.alias(), "PatientName");
        assert_eq!(entry.vr(), VR::PN);
    }

    #[test]
    fn looks_up_by_name() {
        let entry = StandardDataDictionary.by_name("Modality").unwrap();
        assert_eq!(entry.tag(), Tag(0x0008, 0x0060));
    }

    #[test]
    fn resolves_overlay_repeating_group() {
        let entry = StandardDataDictionary.by_tag(Tag(0x6010, 0x3000)).unwrap();
        assert_eq!(entry.alias(), "OverlayData");
    }

    #[test]
    fn resolves_private_creator_and_group_length() {
        assert_eq!(StandardDataDictionary.by_tag(Tag(0x0009, 0x0010)).unwrap().alias(), "PrivateCreator");
        assert_eq!(StandardDataDictionary.by_tag(Tag(0x0009, 0x0000)).unwrap().alias(), "GenericGroupLength");
    }

    #[test]
    fn entries_are_sorted_for_binary_search() {
        let mut prev = None;
        for e in ENTRIES {
            let tag = e.tag.inner();
            if let Some(p) = prev {
                assert!(p < tag, "entries must be sorted ascending by tag");
            }
            prev = Some(tag);
        }
    }
}
