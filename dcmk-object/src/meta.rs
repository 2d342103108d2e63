//! The file meta information table: the group-0002 elements every Part 10
//! file carries ahead of its main data set, always Explicit VR Little
//! Endian regardless of the main data set's transfer syntax.

use dcmk_core::header::DataElementHeader;
use dcmk_core::ops::{ApplyOp, AttributeAction, AttributeOp, AttributeSelectorStep};
use dcmk_core::{Length, PrimitiveValue, Tag, VR};
use dcmk_encoding::SpecificCharacterSet;
use dcmk_parser::tree::{DataSetElement, ElementValue};
use snafu::OptionExt;

use crate::error::{ApplyError, IncompatibleValueSnafu, MandatorySnafu, MetaError, MissingElementSnafu, NotASequenceSnafu};

const GROUP_LENGTH: Tag = Tag(0x0002, 0x0000);
const INFORMATION_VERSION: Tag = Tag(0x0002, 0x0001);
const MEDIA_STORAGE_SOP_CLASS_UID: Tag = Tag(0x0002, 0x0002);
const MEDIA_STORAGE_SOP_INSTANCE_UID: Tag = Tag(0x0002, 0x0003);
const TRANSFER_SYNTAX_UID: Tag = Tag(0x0002, 0x0010);
const IMPLEMENTATION_CLASS_UID: Tag = Tag(0x0002, 0x0012);
const IMPLEMENTATION_VERSION_NAME: Tag = Tag(0x0002, 0x0013);
const SOURCE_APPLICATION_ENTITY_TITLE: Tag = Tag(0x0002, 0x0016);
const SENDING_APPLICATION_ENTITY_TITLE: Tag = Tag(0x0002, 0x0017);
const RECEIVING_APPLICATION_ENTITY_TITLE: Tag = Tag(0x0002, 0x0018);
const PRIVATE_INFORMATION_CREATOR_UID: Tag = Tag(0x0002, 0x0100);
const PRIVATE_INFORMATION: Tag = Tag(0x0002, 0x0102);

/// This toolkit's own implementation class UID, written into objects built
/// from scratch rather than read from a file.
pub const IMPLEMENTATION_CLASS_UID_DEFAULT: &str = "1.2.826.0.1.3680043.10.1000.1";
/// This toolkit's implementation version name.
pub const IMPLEMENTATION_VERSION_NAME_DEFAULT: &str = "DCMK_001";

/// The file meta information group (always group 0002) of a Part 10 file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileMetaTable {
    information_group_length: u32,
    information_version: [u8; 2],
    media_storage_sop_class_uid: String,
    media_storage_sop_instance_uid: String,
    transfer_syntax: String,
    implementation_class_uid: String,
    implementation_version_name: Option<String>,
    source_application_entity_title: Option<String>,
    sending_application_entity_title: Option<String>,
    receiving_application_entity_title: Option<String>,
    private_information_creator_uid: Option<String>,
    private_information: Option<Vec<u8>>,
}

impl FileMetaTable {
    /// The meta group length recorded in `(0002,0000)`, in bytes.
    pub fn information_group_length(&self) -> u32 {
        self.information_group_length
    }

    /// `(0002,0001) FileMetaInformationVersion`, normally `[0, 1]`.
    pub fn information_version(&self) -> [u8; 2] {
        self.information_version
    }

    /// `(0002,0002) MediaStorageSOPClassUID`.
    pub fn media_storage_sop_class_uid(&self) -> &str {
        &self.media_storage_sop_class_uid
    }

    /// `(0002,0003) MediaStorageSOPInstanceUID`.
    pub fn media_storage_sop_instance_uid(&self) -> &str {
        &self.media_storage_sop_instance_uid
    }

    /// `(0002,0010) TransferSyntaxUID`.
    pub fn transfer_syntax(&self) -> &str {
        &self.transfer_syntax
    }

    /// `(0002,0012) ImplementationClassUID`.
    pub fn implementation_class_uid(&self) -> &str {
        &self.implementation_class_uid
    }

    /// `(0002,0013) ImplementationVersionName`, if present.
    pub fn implementation_version_name(&self) -> Option<&str> {
        self.implementation_version_name.as_deref()
    }

    /// `(0002,0016) SourceApplicationEntityTitle`, if present.
    pub fn source_application_entity_title(&self) -> Option<&str> {
        self.source_application_entity_title.as_deref()
    }

    /// `(0002,0100) PrivateInformationCreatorUID`, if present.
    pub fn private_information_creator_uid(&self) -> Option<&str> {
        self.private_information_creator_uid.as_deref()
    }

    /// `(0002,0102) PrivateInformation`, if present.
    pub fn private_information(&self) -> Option<&[u8]> {
        self.private_information.as_deref()
    }

    /// Replace the transfer syntax UID this object is (or will be) encoded
    /// under. Does not re-encode an already-parsed main data set; callers
    /// that change this after parsing are responsible for re-serializing
    /// under the new syntax themselves.
    pub fn set_transfer_syntax(&mut self, uid: impl Into<String>) {
        self.transfer_syntax = uid.into();
    }

    /// Recompute [`information_group_length`](Self::information_group_length)
    /// from the table's current contents.
    pub fn update_information_group_length(&mut self) {
        let mut buf = Vec::new();
        let mut cs = SpecificCharacterSet::ISO_IR_6;
        // infallible: the meta group never carries pixel sequences.
        let _ = dcmk_parser::writer::write_elements(&mut buf, &self.to_elements(), true, &mut cs);
        self.information_group_length = buf.len() as u32;
    }

    /// Build a meta table from the raw elements of a parsed file meta group
    /// (as produced by [`dcmk_parser::file::parse`]) and the transfer syntax
    /// UID already resolved from `(0002,0010)`.
    pub fn from_elements(elements: &[DataSetElement], transfer_syntax_uid: impl Into<String>) -> Result<Self, MetaError> {
        let mut builder = FileMetaTableBuilder::new().transfer_syntax(transfer_syntax_uid);
        let mut information_version = [0u8, 1u8];

        for element in elements {
            let ElementValue::Primitive(value) = &element.value else { continue };
            match element.tag() {
                INFORMATION_VERSION => {
                    if let PrimitiveValue::U8(bytes) = value {
                        if let [a, b, ..] = bytes[..] {
                            information_version = [a, b];
                        }
                    }
                }
                MEDIA_STORAGE_SOP_CLASS_UID => builder = builder.media_storage_sop_class_uid(trimmed(value)),
                MEDIA_STORAGE_SOP_INSTANCE_UID => builder = builder.media_storage_sop_instance_uid(trimmed(value)),
                IMPLEMENTATION_CLASS_UID => builder = builder.implementation_class_uid(trimmed(value)),
                IMPLEMENTATION_VERSION_NAME => builder = builder.implementation_version_name(trimmed(value)),
                SOURCE_APPLICATION_ENTITY_TITLE => builder = builder.source_application_entity_title(trimmed(value)),
                SENDING_APPLICATION_ENTITY_TITLE => builder = builder.sending_application_entity_title(trimmed(value)),
                RECEIVING_APPLICATION_ENTITY_TITLE => builder = builder.receiving_application_entity_title(trimmed(value)),
                PRIVATE_INFORMATION_CREATOR_UID => builder = builder.private_information_creator_uid(trimmed(value)),
                PRIVATE_INFORMATION => {
                    if let PrimitiveValue::U8(bytes) = value {
                        builder = builder.private_information(bytes.to_vec());
                    }
                }
                _ => {}
            }
        }

        let mut table = builder.build()?;
        table.information_version = information_version;
        table.update_information_group_length();
        Ok(table)
    }

    /// Serialize this table back into its constituent elements, in tag
    /// order, excluding `(0002,0000)` itself (the writer computes and
    /// prepends the group length as it re-encodes them).
    pub fn to_elements(&self) -> Vec<DataSetElement> {
        let mut out = vec![
            DataSetElement {
                header: DataElementHeader::new(INFORMATION_VERSION, VR::OB, Length::defined(2)),
                value: ElementValue::Primitive(PrimitiveValue::U8(self.information_version.into_iter().collect())),
            },
            text_element(MEDIA_STORAGE_SOP_CLASS_UID, VR::UI, &self.media_storage_sop_class_uid),
            text_element(MEDIA_STORAGE_SOP_INSTANCE_UID, VR::UI, &self.media_storage_sop_instance_uid),
            text_element(TRANSFER_SYNTAX_UID, VR::UI, &self.transfer_syntax),
            text_element(IMPLEMENTATION_CLASS_UID, VR::UI, &self.implementation_class_uid),
        ];
        if let Some(v) = &self.implementation_version_name {
            out.push(text_element(IMPLEMENTATION_VERSION_NAME, VR::SH, v));
        }
        if let Some(v) = &self.source_application_entity_title {
            out.push(text_element(SOURCE_APPLICATION_ENTITY_TITLE, VR::AE, v));
        }
        if let Some(v) = &self.sending_application_entity_title {
            out.push(text_element(SENDING_APPLICATION_ENTITY_TITLE, VR::AE, v));
        }
        if let Some(v) = &self.receiving_application_entity_title {
            out.push(text_element(RECEIVING_APPLICATION_ENTITY_TITLE, VR::AE, v));
        }
        if let Some(v) = &self.private_information_creator_uid {
            out.push(text_element(PRIVATE_INFORMATION_CREATOR_UID, VR::UI, v));
        }
        if let Some(bytes) = &self.private_information {
            out.push(DataSetElement {
                header: DataElementHeader::new(PRIVATE_INFORMATION, VR::OB, Length::defined(bytes.len() as u32)),
                value: ElementValue::Primitive(PrimitiveValue::U8(bytes.as_slice().iter().copied().collect())),
            });
        }
        out
    }
}

fn text_element(tag: Tag, vr: VR, text: &str) -> DataSetElement {
    DataSetElement { header: DataElementHeader::new(tag, vr, Length::defined(0)), value: ElementValue::Primitive(PrimitiveValue::from(text)) }
}

fn trimmed(value: &PrimitiveValue) -> String {
    value.to_str().map(|s| s.trim_end_matches(['\0', ' ']).to_string()).unwrap_or_default()
}

/// Builds a [`FileMetaTable`] from scratch, e.g. when assembling a new
/// object to write rather than one read from a file.
#[derive(Debug, Default, Clone)]
pub struct FileMetaTableBuilder {
    media_storage_sop_class_uid: Option<String>,
    media_storage_sop_instance_uid: Option<String>,
    transfer_syntax: Option<String>,
    implementation_class_uid: Option<String>,
    implementation_version_name: Option<String>,
    source_application_entity_title: Option<String>,
    sending_application_entity_title: Option<String>,
    receiving_application_entity_title: Option<String>,
    private_information_creator_uid: Option<String>,
    private_information: Option<Vec<u8>>,
}

impl FileMetaTableBuilder {
    /// Start an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `(0002,0002) MediaStorageSOPClassUID`.
    pub fn media_storage_sop_class_uid(mut self, v: impl Into<String>) -> Self {
        self.media_storage_sop_class_uid = Some(v.into());
        self
    }

    /// Set `(0002,0003) MediaStorageSOPInstanceUID`.
    pub fn media_storage_sop_instance_uid(mut self, v: impl Into<String>) -> Self {
        self.media_storage_sop_instance_uid = Some(v.into());
        self
    }

    /// Set `(0002,0010) TransferSyntaxUID`.
    pub fn transfer_syntax(mut self, v: impl Into<String>) -> Self {
        self.transfer_syntax = Some(v.into());
        self
    }

    /// Set `(0002,0012) ImplementationClassUID`.
    pub fn implementation_class_uid(mut self, v: impl Into<String>) -> Self {
        self.implementation_class_uid = Some(v.into());
        self
    }

    /// Set `(0002,0013) ImplementationVersionName`.
    pub fn implementation_version_name(mut self, v: impl Into<String>) -> Self {
        self.implementation_version_name = Some(v.into());
        self
    }

    /// Set `(0002,0016) SourceApplicationEntityTitle`.
    pub fn source_application_entity_title(mut self, v: impl Into<String>) -> Self {
        self.source_application_entity_title = Some(v.into());
        self
    }

    /// Set `(0002,0017) SendingApplicationEntityTitle`.
    pub fn sending_application_entity_title(mut self, v: impl Into<String>) -> Self {
        self.sending_application_entity_title = Some(v.into());
        self
    }

    /// Set `(0002,0018) ReceivingApplicationEntityTitle`.
    pub fn receiving_application_entity_title(mut self, v: impl Into<String>) -> Self {
        self.receiving_application_entity_title = Some(v.into());
        self
    }

    /// Set `(0002,0100) PrivateInformationCreatorUID`.
    pub fn private_information_creator_uid(mut self, v: impl Into<String>) -> Self {
        self.private_information_creator_uid = Some(v.into());
        self
    }

    /// Set `(0002,0102) PrivateInformation`.
    pub fn private_information(mut self, v: Vec<u8>) -> Self {
        self.private_information = Some(v);
        self
    }

    /// Build the table, failing if a mandatory field was never set.
    /// `ImplementationClassUID`/`ImplementationVersionName` default to this
    /// toolkit's own identifiers when absent.
    pub fn build(self) -> Result<FileMetaTable, MetaError> {
        let media_storage_sop_class_uid =
            self.media_storage_sop_class_uid.context(MissingElementSnafu { tag: MEDIA_STORAGE_SOP_CLASS_UID })?;
        let media_storage_sop_instance_uid =
            self.media_storage_sop_instance_uid.context(MissingElementSnafu { tag: MEDIA_STORAGE_SOP_INSTANCE_UID })?;
        let transfer_syntax = self.transfer_syntax.context(MissingElementSnafu { tag: TRANSFER_SYNTAX_UID })?;

        let mut table = FileMetaTable {
            information_group_length: 0,
            information_version: [0, 1],
            media_storage_sop_class_uid,
            media_storage_sop_instance_uid,
            transfer_syntax,
            implementation_class_uid: self.implementation_class_uid.unwrap_or_else(|| IMPLEMENTATION_CLASS_UID_DEFAULT.to_string()),
            implementation_version_name: Some(
                self.implementation_version_name.unwrap_or_else(|| IMPLEMENTATION_VERSION_NAME_DEFAULT.to_string()),
            ),
            source_application_entity_title: self.source_application_entity_title,
            sending_application_entity_title: self.sending_application_entity_title,
            receiving_application_entity_title: self.receiving_application_entity_title,
            private_information_creator_uid: self.private_information_creator_uid,
            private_information: self.private_information,
        };
        table.update_information_group_length();
        Ok(table)
    }
}

fn is_mandatory(tag: Tag) -> bool {
    matches!(tag, MEDIA_STORAGE_SOP_CLASS_UID | MEDIA_STORAGE_SOP_INSTANCE_UID | TRANSFER_SYNTAX_UID | IMPLEMENTATION_CLASS_UID)
}

impl ApplyOp for FileMetaTable {
    type Err = ApplyError;

    /// Apply an attribute operation against the meta group. Only single-tag
    /// selectors are meaningful here; the group carries no sequences.
    fn apply(&mut self, op: AttributeOp) -> Result<(), ApplyError> {
        let (step, rest) = op.selector.split_first();
        if rest.is_some() {
            return NotASequenceSnafu { selector: op.selector.clone(), step_index: 0u32 }.fail();
        }
        let AttributeSelectorStep::Tag(tag) = step else {
            return NotASequenceSnafu { selector: op.selector.clone(), step_index: 0u32 }.fail();
        };

        match &op.action {
            AttributeAction::Remove => {
                if is_mandatory(tag) {
                    return MandatorySnafu.fail();
                }
                self.clear_optional(tag);
                Ok(())
            }
            AttributeAction::Empty => {
                self.set_text(tag, "")?;
                Ok(())
            }
            AttributeAction::Set(value) => {
                let text = value.to_str().map_err(|_| IncompatibleValueSnafu { tag }.build())?;
                self.set_text(tag, &text)
            }
            AttributeAction::SetIfMissing(value) => {
                if self.has(tag) {
                    return Ok(());
                }
                let text = value.to_str().map_err(|_| IncompatibleValueSnafu { tag }.build())?;
                self.set_text(tag, &text)
            }
            AttributeAction::Replace(value) => {
                if !self.has(tag) {
                    return Ok(());
                }
                let text = value.to_str().map_err(|_| IncompatibleValueSnafu { tag }.build())?;
                self.set_text(tag, &text)
            }
            AttributeAction::SetStr(s) => self.set_text(tag, s),
            _ => crate::error::UnsupportedActionSnafu.fail(),
        }
    }
}

impl FileMetaTable {
    fn has(&self, tag: Tag) -> bool {
        match tag {
            MEDIA_STORAGE_SOP_CLASS_UID | MEDIA_STORAGE_SOP_INSTANCE_UID | TRANSFER_SYNTAX_UID | IMPLEMENTATION_CLASS_UID => true,
            IMPLEMENTATION_VERSION_NAME => self.implementation_version_name.is_some(),
            SOURCE_APPLICATION_ENTITY_TITLE => self.source_application_entity_title.is_some(),
            SENDING_APPLICATION_ENTITY_TITLE => self.sending_application_entity_title.is_some(),
            RECEIVING_APPLICATION_ENTITY_TITLE => self.receiving_application_entity_title.is_some(),
            PRIVATE_INFORMATION_CREATOR_UID => self.private_information_creator_uid.is_some(),
            _ => false,
        }
    }

    fn clear_optional(&mut self, tag: Tag) {
        match tag {
            IMPLEMENTATION_VERSION_NAME => self.implementation_version_name = None,
            SOURCE_APPLICATION_ENTITY_TITLE => self.source_application_entity_title = None,
            SENDING_APPLICATION_ENTITY_TITLE => self.sending_application_entity_title = None,
            RECEIVING_APPLICATION_ENTITY_TITLE => self.receiving_application_entity_title = None,
            PRIVATE_INFORMATION_CREATOR_UID => self.private_information_creator_uid = None,
            _ => {}
        }
    }

    fn set_text(&mut self, tag: Tag, text: &str) -> Result<(), ApplyError> {
        match tag {
            MEDIA_STORAGE_SOP_CLASS_UID => self.media_storage_sop_class_uid = text.to_string(),
            MEDIA_STORAGE_SOP_INSTANCE_UID => self.media_storage_sop_instance_uid = text.to_string(),
            TRANSFER_SYNTAX_UID => self.transfer_syntax = text.to_string(),
            IMPLEMENTATION_CLASS_UID => self.implementation_class_uid = text.to_string(),
            IMPLEMENTATION_VERSION_NAME => self.implementation_version_name = Some(text.to_string()),
            SOURCE_APPLICATION_ENTITY_TITLE => self.source_application_entity_title = Some(text.to_string()),
            SENDING_APPLICATION_ENTITY_TITLE => self.sending_application_entity_title = Some(text.to_string()),
            RECEIVING_APPLICATION_ENTITY_TITLE => self.receiving_application_entity_title = Some(text.to_string()),
            PRIVATE_INFORMATION_CREATOR_UID => self.private_information_creator_uid = Some(text.to_string()),
            GROUP_LENGTH => {}
            _ => return crate::error::UnsupportedActionSnafu.fail(),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FileMetaTable {
        FileMetaTableBuilder::new()
            .media_storage_sop_class_uid("1.2.840.10008.5.1.4.1.1.7")
            .media_storage_sop_instance_uid("1.2.3.4.5")
            .transfer_syntax("1.2.840.10008.1.2.1")
            .build()
            .unwrap()
    }

    #[test]
    fn builder_defaults_implementation_identifiers() {
        let table = sample();
        assert_eq!(table.implementation_class_uid(), IMPLEMENTATION_CLASS_UID_DEFAULT);
        assert_eq!(table.implementation_version_name(), Some(IMPLEMENTATION_VERSION_NAME_DEFAULT));
    }

    #[test]
    fn builder_rejects_missing_mandatory_field() {
        let err = FileMetaTableBuilder::new().transfer_syntax("1.2.840.10008.1.2.1").build();
        assert!(err.is_err());
    }

    #[test]
    fn round_trips_through_elements() {
        let table = sample();
        let elements = table.to_elements();
        let restored = FileMetaTable::from_elements(&elements, table.transfer_syntax().to_string()).unwrap();
        assert_eq!(restored.media_storage_sop_class_uid(), table.media_storage_sop_class_uid());
        assert_eq!(restored.media_storage_sop_instance_uid(), table.media_storage_sop_instance_uid());
    }

    #[test]
    fn apply_sets_and_removes_optional_fields() {
        let mut table = sample();
        table
            .apply(AttributeOp::new(SOURCE_APPLICATION_ENTITY_TITLE, AttributeAction::SetStr("STORESCU".into())))
            .unwrap();
        assert_eq!(table.source_application_entity_title(), Some("STORESCU"));

        table.apply(AttributeOp::new(SOURCE_APPLICATION_ENTITY_TITLE, AttributeAction::Remove)).unwrap();
        assert_eq!(table.source_application_entity_title(), None);
    }

    #[test]
    fn apply_rejects_removal_of_mandatory_field() {
        let mut table = sample();
        let err = table.apply(AttributeOp::new(MEDIA_STORAGE_SOP_INSTANCE_UID, AttributeAction::Remove));
        assert!(err.is_err());
    }
}
