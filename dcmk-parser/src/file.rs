//! The top-level entry point: recognizes the Part 10 preamble, reads the
//! file meta information group, resolves the transfer syntax and parses
//! the main data set under it.

use std::borrow::Cow;

use dcmk_core::Tag;
use dcmk_encoding::decode::file_header_decoder;
use dcmk_encoding::{ByteReader, Decode, Endianness, SpecificCharacterSet, TransferSyntaxIndex};
use dcmk_transfer_syntax_registry::TransferSyntaxRegistry;
use snafu::{OptionExt, ResultExt};

use crate::error::{
    DecodeHeaderSnafu, InflateSnafu, InvalidDicmPrefixSnafu, InvalidPreambleSnafu, MissingMetaElementSnafu, Result,
    UnsupportedTransferSyntaxSnafu,
};
use crate::parser::{parse_data_set, ParseOptions};
use crate::tree::{DataSetElement, ElementValue};

const PREAMBLE_LEN: usize = 128;
const GROUP_LENGTH: Tag = Tag(0x0002, 0x0000);
const TRANSFER_SYNTAX_UID: Tag = Tag(0x0002, 0x0010);

/// The outcome of parsing a complete DICOM file (or a bare data set, in
/// tolerant/forced mode).
pub struct ParsedFile {
    /// The 128-byte preamble, if one was recognized.
    pub preamble: Option<[u8; PREAMBLE_LEN]>,
    /// The file meta information group elements (always Explicit VR
    /// Little Endian), empty when no meta group was found.
    pub meta: Vec<DataSetElement>,
    /// The transfer syntax UID the main data set was parsed under.
    pub transfer_syntax_uid: String,
    /// The main data set.
    pub dataset: Vec<DataSetElement>,
    /// Whether parsing stopped early due to cancellation.
    pub cancelled: bool,
}

fn find_string(elements: &[DataSetElement], tag: Tag) -> Option<String> {
    elements.iter().find(|e| e.tag() == tag).and_then(|e| match &e.value {
        ElementValue::Primitive(v) => v.to_str().ok().map(|s| s.trim_end_matches(['\0', ' ']).to_string()),
        _ => None,
    })
}

/// Parse a complete DICOM file from `bytes`.
///
/// In strict mode, a missing preamble or `DICM` prefix is an error. With
/// `options.force` set, that structural failure is instead treated as an
/// invitation to parse the whole buffer as a bare data set, starting at
/// offset 0, under Implicit VR Little Endian.
pub fn parse(bytes: &[u8], options: &ParseOptions<'_>) -> Result<ParsedFile> {
    let has_preamble = bytes.len() >= PREAMBLE_LEN + 4 && &bytes[PREAMBLE_LEN..PREAMBLE_LEN + 4] == b"DICM";

    if !has_preamble {
        if !options.force {
            return if bytes.len() < PREAMBLE_LEN + 4 { InvalidPreambleSnafu.fail() } else { InvalidDicmPrefixSnafu.fail() };
        }
        tracing::warn!("missing or invalid preamble/DICM prefix; parsing the whole buffer as Implicit VR Little Endian");
        let decoder = dcmk_encoding::decode::default_reader();
        let mut reader = ByteReader::new(bytes, Endianness::Little);
        let outcome = parse_data_set(&mut reader, &decoder, SpecificCharacterSet::ISO_IR_6, options)?;
        return Ok(ParsedFile {
            preamble: None,
            meta: Vec::new(),
            transfer_syntax_uid: dcmk_dictionary_std::uids::IMPLICIT_VR_LITTLE_ENDIAN.to_string(),
            cancelled: outcome.was_cancelled(),
            dataset: outcome.into_elements(),
        });
    }

    let mut preamble = [0u8; PREAMBLE_LEN];
    preamble.copy_from_slice(&bytes[0..PREAMBLE_LEN]);

    let meta_decoder = file_header_decoder();
    let meta_start = PREAMBLE_LEN + 4;
    let mut reader = ByteReader::new(&bytes[meta_start..], Endianness::Little);

    let offset = meta_start + reader.position();
    let (group_length_header, _) = meta_decoder.decode_header(&mut reader).context(DecodeHeaderSnafu { offset })?;
    if group_length_header.tag != GROUP_LENGTH {
        return MissingMetaElementSnafu { tag: GROUP_LENGTH }.fail();
    }
    let raw_len = reader.read_bytes(4).map_err(|e| crate::error::Error::UnexpectedEndOfData { offset, needed: e.needed })?;
    let group_length = u32::from_le_bytes(raw_len.try_into().expect("exactly 4 bytes")) as usize;

    let meta_offset = meta_start + reader.position();
    let meta_bytes =
        reader.read_bytes(group_length).map_err(|e| crate::error::Error::UnexpectedEndOfData { offset: meta_offset, needed: e.needed })?;
    let mut meta_reader = ByteReader::new(meta_bytes, Endianness::Little);
    let meta_outcome = parse_data_set(&mut meta_reader, &meta_decoder, SpecificCharacterSet::ISO_IR_6, &ParseOptions::default())?;
    let meta = meta_outcome.into_elements();

    let ts_uid =
        find_string(&meta, TRANSFER_SYNTAX_UID).context(MissingMetaElementSnafu { tag: TRANSFER_SYNTAX_UID })?;
    let ts = TransferSyntaxRegistry.get(&ts_uid).context(UnsupportedTransferSyntaxSnafu { uid: ts_uid.clone() })?;

    let dataset_start = meta_start + reader.position();
    let dataset_bytes: Cow<'_, [u8]> = if ts.is_deflated() {
        Cow::Owned(dcmk_transfer_syntax_registry::deflate::inflate(&bytes[dataset_start..]).context(InflateSnafu)?)
    } else {
        Cow::Borrowed(&bytes[dataset_start..])
    };

    let decoder = ts.decoder();
    let mut dataset_reader = ByteReader::new(&dataset_bytes, ts.endianness());
    let outcome = parse_data_set(&mut dataset_reader, decoder.as_ref(), SpecificCharacterSet::ISO_IR_6, options)?;

    Ok(ParsedFile {
        preamble: Some(preamble),
        meta,
        transfer_syntax_uid: ts_uid,
        cancelled: outcome.was_cancelled(),
        dataset: outcome.into_elements(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn explicit_element(group: u16, elem: u16, vr: &[u8; 2], value: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&group.to_le_bytes());
        out.extend_from_slice(&elem.to_le_bytes());
        out.extend_from_slice(vr);
        out.extend_from_slice(&(value.len() as u16).to_le_bytes());
        out.extend_from_slice(value);
        out
    }

    fn minimal_file(ts_uid: &str) -> Vec<u8> {
        let mut meta = Vec::new();
        meta.extend_from_slice(&explicit_element(0x0002, 0x0002, b"UI", b"1.2.840.10008.5.1.4.1.1.7\0"));
        let mut ts_bytes = ts_uid.as_bytes().to_vec();
        if ts_bytes.len() % 2 != 0 {
            ts_bytes.push(0);
        }
        meta.extend_from_slice(&explicit_element(0x0002, 0x0010, b"UI", &ts_bytes));

        let mut out = vec![0u8; 128];
        out.extend_from_slice(b"DICM");
        out.extend_from_slice(&explicit_element(0x0002, 0x0000, b"UL", &(meta.len() as u32).to_le_bytes()));
        out.extend_from_slice(&meta);
        out.extend_from_slice(&explicit_element(0x0008, 0x0060, b"CS", b"OT"));
        out
    }

    #[test]
    fn parses_a_minimal_part10_file() {
        let bytes = minimal_file("1.2.840.10008.1.2.1");
        let options = ParseOptions::default();
        let parsed = parse(&bytes, &options).unwrap();
        assert_eq!(parsed.transfer_syntax_uid, "1.2.840.10008.1.2.1");
        assert_eq!(parsed.dataset.len(), 1);
        assert_eq!(parsed.dataset[0].tag(), Tag(0x0008, 0x0060));
        assert!(!parsed.cancelled);
    }

    #[test]
    fn rejects_unknown_transfer_syntax_uid() {
        let bytes = minimal_file("1.2.9.9.9.9");
        let options = ParseOptions::default();
        assert!(parse(&bytes, &options).is_err());
    }

    #[test]
    fn strict_mode_rejects_missing_dicm_prefix() {
        let bytes = vec![0u8; 132];
        let options = ParseOptions::default();
        assert!(parse(&bytes, &options).is_err());
    }

    #[test]
    fn forced_mode_parses_a_bare_implicit_vr_data_set() {
        // (0008,0060) with a 2-byte implicit-VR length header: tag + 4-byte length.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0x0008u16.to_le_bytes());
        bytes.extend_from_slice(&0x0060u16.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(b"OT");

        let mut options = ParseOptions::default();
        options.force = true;
        let parsed = parse(&bytes, &options).unwrap();
        assert_eq!(parsed.dataset.len(), 1);
        assert_eq!(parsed.transfer_syntax_uid, dcmk_dictionary_std::uids::IMPLICIT_VR_LITTLE_ENDIAN);
    }
}
