//! The root DICOM object: the file meta information table paired with the
//! main data set, with Part 10 file reading and round-trip writing.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use dcmk_core::ops::{ApplyOp, AttributeOp, AttributeSelectorStep};
use dcmk_core::Tag;
use dcmk_parser::parser::ParseOptions;
use snafu::ResultExt;

use crate::error::{ApplyError, Error, MetaSnafu, OpenFileSnafu, ParseSnafu, ReadFileSnafu, WriteFileSnafu, WriteSnafu};
use crate::mem::InMemDicomObject;
use crate::meta::FileMetaTable;

/// A complete DICOM file: the file meta information group and the main
/// data set it introduces.
#[derive(Debug, Clone, PartialEq)]
pub struct FileDicomObject {
    meta: FileMetaTable,
    obj: InMemDicomObject,
}

impl FileDicomObject {
    /// Pair an already-resolved meta table with a data set.
    pub fn new(meta: FileMetaTable, obj: InMemDicomObject) -> Self {
        FileDicomObject { meta, obj }
    }

    /// The file meta information table.
    pub fn meta(&self) -> &FileMetaTable {
        &self.meta
    }

    /// A mutable reference to the file meta information table.
    ///
    /// Remember to call
    /// [`update_information_group_length`](FileMetaTable::update_information_group_length)
    /// after editing it directly, or use [`update_meta`](Self::update_meta).
    pub fn meta_mut(&mut self) -> &mut FileMetaTable {
        &mut self.meta
    }

    /// Edit the file meta information table through a closure, updating the
    /// group length afterwards.
    pub fn update_meta(&mut self, f: impl FnOnce(&mut FileMetaTable)) {
        f(&mut self.meta);
        self.meta.update_information_group_length();
    }

    /// The main data set.
    pub fn dataset(&self) -> &InMemDicomObject {
        &self.obj
    }

    /// A mutable reference to the main data set.
    pub fn dataset_mut(&mut self) -> &mut InMemDicomObject {
        &mut self.obj
    }

    /// Discard the meta table, keeping only the main data set.
    pub fn into_inner(self) -> InMemDicomObject {
        self.obj
    }

    /// Parse a complete Part 10 file from its bytes.
    pub fn from_bytes(bytes: &[u8], options: &ParseOptions<'_>) -> Result<Self, Error> {
        let parsed = dcmk_parser::file::parse(bytes, options).context(ParseSnafu)?;
        let meta = FileMetaTable::from_elements(&parsed.meta, parsed.transfer_syntax_uid).context(MetaSnafu)?;
        let obj = InMemDicomObject::from_elements(parsed.dataset);
        Ok(FileDicomObject { meta, obj })
    }

    /// Read and parse a complete Part 10 file from `path`.
    pub fn open_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let bytes = fs::read(path).context(OpenFileSnafu { filename: path.to_path_buf() })?;
        Self::from_bytes(&bytes, &ParseOptions::default())
    }

    /// Read and parse a complete Part 10 file from a reader.
    pub fn from_reader(mut reader: impl Read) -> Result<Self, Error> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).context(ReadFileSnafu { filename: PathBuf::from("<reader>") })?;
        Self::from_bytes(&bytes, &ParseOptions::default())
    }

    /// Re-encode the object into bytes: preamble, `DICM` marker, file meta
    /// group and main data set, under the transfer syntax named in the meta
    /// table.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        dcmk_parser::writer::write_file(&self.meta.to_elements(), &self.obj.to_elements(), self.meta.transfer_syntax())
            .context(WriteSnafu)
    }

    /// Re-encode and write the object to `path`.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        fs::write(path, bytes).context(WriteFileSnafu { filename: path.to_path_buf() })
    }

    /// Re-encode and write the object to an arbitrary writer.
    pub fn write_all(&self, mut to: impl std::io::Write) -> Result<(), Error> {
        let bytes = self.to_bytes()?;
        to.write_all(&bytes).context(WriteFileSnafu { filename: PathBuf::from("<writer>") })
    }
}

impl std::ops::Deref for FileDicomObject {
    type Target = InMemDicomObject;

    fn deref(&self) -> &Self::Target {
        &self.obj
    }
}

impl std::ops::DerefMut for FileDicomObject {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.obj
    }
}

impl ApplyOp for FileDicomObject {
    type Err = ApplyError;

    /// Apply an operation, routing group 0002 selectors to the meta table
    /// and everything else to the main data set.
    fn apply(&mut self, op: AttributeOp) -> Result<(), ApplyError> {
        let (step, _) = op.selector.split_first();
        let targets_meta = match step {
            AttributeSelectorStep::Tag(Tag(0x0002, _)) => true,
            AttributeSelectorStep::Nested { tag: Tag(0x0002, _), .. } => true,
            _ => false,
        };
        if targets_meta {
            self.meta.apply(op)
        } else {
            self.obj.apply(op)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcmk_core::ops::AttributeAction;
    use dcmk_core::PrimitiveValue;

    fn sample() -> FileDicomObject {
        let meta = crate::meta::FileMetaTableBuilder::new()
            .media_storage_sop_class_uid("1.2.840.10008.5.1.4.1.1.7")
            .media_storage_sop_instance_uid("1.2.3.4.5")
            .transfer_syntax("1.2.840.10008.1.2.1")
            .build()
            .unwrap();
        FileDicomObject::new(meta, InMemDicomObject::new_empty())
    }

    #[test]
    fn apply_routes_group_0002_to_meta() {
        let mut obj = sample();
        let op = AttributeOp::new(Tag(0x0002, 0x0016), AttributeAction::SetStr("STORESCU".into()));
        obj.apply(op).unwrap();
        assert_eq!(obj.meta().source_application_entity_title(), Some("STORESCU"));
    }

    #[test]
    fn apply_routes_other_tags_to_dataset() {
        let mut obj = sample();
        let op = AttributeOp::new(Tag(0x0008, 0x0060), AttributeAction::Set(PrimitiveValue::from("OT")));
        obj.apply(op).unwrap();
        assert_eq!(obj.get_string(Tag(0x0008, 0x0060)).unwrap(), "OT");
    }

    #[test]
    fn round_trips_through_bytes() {
        let mut obj = sample();
        obj.put_str(Tag(0x0008, 0x0060), "OT");
        let bytes = obj.to_bytes().unwrap();
        let parsed = FileDicomObject::from_bytes(&bytes, &ParseOptions::default()).unwrap();
        assert_eq!(parsed.meta().media_storage_sop_instance_uid(), "1.2.3.4.5");
        assert_eq!(parsed.get_string(Tag(0x0008, 0x0060)).unwrap(), "OT");
    }
}
