//! Data element header decoding, parameterized by transfer syntax.

use crate::error::{ReadLengthSnafu, ReadReservedSnafu, ReadTagSnafu, ReadVrSnafu, Result, UnexpectedItemTagSnafu};
use crate::reader::{ByteReader, Endianness};
use dcmk_core::dictionary::{DataDictionary, DictionaryEntry};
use dcmk_core::header::{DataElementHeader, SequenceItemHeader};
use dcmk_core::{Length, Tag, VR};
use dcmk_dictionary_std::StandardDataDictionary;
use snafu::ResultExt;

fn sequence_item_header(tag: Tag, len: Length) -> Result<SequenceItemHeader> {
    match tag {
        Tag::ITEM => Ok(SequenceItemHeader::Item { len }),
        Tag::ITEM_DELIMITER => Ok(SequenceItemHeader::ItemDelimiter),
        Tag::SEQUENCE_DELIMITER => Ok(SequenceItemHeader::SequenceDelimiter),
        tag => UnexpectedItemTagSnafu { tag }.fail(),
    }
}

/// Decodes data element headers for one transfer syntax, reading from a
/// borrowed [`ByteReader`] over the full input buffer.
///
/// Returns the decoded header together with the number of bytes consumed
/// from the reader, so callers can compute the offset of the value itself.
pub trait Decode {
    /// Decode the next data element header.
    ///
    /// Decoding an item or sequence delimiter as a plain header is valid;
    /// its value representation is reported as `UN`.
    fn decode_header(&self, reader: &mut ByteReader<'_>) -> Result<(DataElementHeader, usize)>;

    /// Decode the next sequence item header. Value representation is always
    /// implicit for item headers, so this has its own entry point.
    fn decode_item_header(&self, reader: &mut ByteReader<'_>) -> Result<SequenceItemHeader>;

    /// Decode a standalone tag.
    fn decode_tag(&self, reader: &mut ByteReader<'_>) -> Result<Tag> {
        reader.read_tag().context(ReadTagSnafu)
    }
}

/// Decoder for the Explicit VR Little Endian transfer syntax.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExplicitVRLittleEndianDecoder;

/// Decoder for the retired Explicit VR Big Endian transfer syntax.
///
/// Per the standard, only the value bytes of binary numerics are
/// byte-swapped; tags, VR codes and lengths keep the same field layout as
/// every other transfer syntax. Since [`ByteReader`] is itself
/// endianness-parameterized, this type differs from its little-endian
/// counterpart only in which `Endianness` it hands to the reader.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExplicitVRBigEndianDecoder;

fn decode_explicit_header(reader: &mut ByteReader<'_>) -> Result<(DataElementHeader, usize)> {
    let tag = reader.read_tag().context(ReadTagSnafu)?;

    if tag.group() == 0xFFFE {
        // item delimiters carry no VR or reserved field
        let len = reader.read_u32().context(ReadLengthSnafu)?;
        return Ok((DataElementHeader::new(tag, VR::UN, Length(len)), 8));
    }

    let vr_bytes = reader.read_bytes(2).context(ReadVrSnafu)?;
    let vr = VR::from_binary([vr_bytes[0], vr_bytes[1]]).unwrap_or(VR::UN);

    let (len, consumed) = if vr.is_long_form() {
        reader.skip(2).context(ReadReservedSnafu)?;
        let len = reader.read_u32().context(ReadLengthSnafu)?;
        (len, 12)
    } else {
        let len = reader.read_u16().context(ReadLengthSnafu)?;
        (u32::from(len), 8)
    };

    Ok((DataElementHeader::new(tag, vr, Length(len)), consumed))
}

fn decode_explicit_item_header(reader: &mut ByteReader<'_>) -> Result<SequenceItemHeader> {
    let tag = reader.read_tag().context(ReadTagSnafu)?;
    let len = reader.read_u32().context(ReadLengthSnafu)?;
    sequence_item_header(tag, Length(len))
}

impl Decode for ExplicitVRLittleEndianDecoder {
    fn decode_header(&self, reader: &mut ByteReader<'_>) -> Result<(DataElementHeader, usize)> {
        decode_explicit_header(reader)
    }

    fn decode_item_header(&self, reader: &mut ByteReader<'_>) -> Result<SequenceItemHeader> {
        decode_explicit_item_header(reader)
    }
}

impl Decode for ExplicitVRBigEndianDecoder {
    fn decode_header(&self, reader: &mut ByteReader<'_>) -> Result<(DataElementHeader, usize)> {
        decode_explicit_header(reader)
    }

    fn decode_item_header(&self, reader: &mut ByteReader<'_>) -> Result<SequenceItemHeader> {
        decode_explicit_item_header(reader)
    }
}

/// Decoder for the Implicit VR Little Endian transfer syntax.
///
/// Value representations are not written on disk, so this decoder consults
/// an attribute dictionary to resolve each element's VR; unrecognized tags
/// decode as `UN`.
pub struct ImplicitVRLittleEndianDecoder<D = StandardDataDictionary> {
    dict: D,
}

impl Default for ImplicitVRLittleEndianDecoder<StandardDataDictionary> {
    fn default() -> Self {
        ImplicitVRLittleEndianDecoder { dict: StandardDataDictionary }
    }
}

impl<D> ImplicitVRLittleEndianDecoder<D>
where
    D: DataDictionary,
{
    /// Build a decoder that resolves VRs through a custom dictionary.
    pub fn with_dict(dict: D) -> Self {
        ImplicitVRLittleEndianDecoder { dict }
    }
}

impl<D> Decode for ImplicitVRLittleEndianDecoder<D>
where
    D: DataDictionary,
{
    fn decode_header(&self, reader: &mut ByteReader<'_>) -> Result<(DataElementHeader, usize)> {
        let tag = reader.read_tag().context(ReadTagSnafu)?;
        let len = reader.read_u32().context(ReadLengthSnafu)?;

        let vr = if tag.group() == 0xFFFE {
            VR::UN
        } else {
            self.dict.by_tag(tag).map(DictionaryEntry::vr).unwrap_or(VR::UN)
        };

        Ok((DataElementHeader::new(tag, vr, Length(len)), 8))
    }

    fn decode_item_header(&self, reader: &mut ByteReader<'_>) -> Result<SequenceItemHeader> {
        let tag = reader.read_tag().context(ReadTagSnafu)?;
        let len = reader.read_u32().context(ReadLengthSnafu)?;
        sequence_item_header(tag, Length(len))
    }
}

/// The default data element decoder: Implicit VR Little Endian against the
/// standard dictionary, per the standard's own default transfer syntax.
pub fn default_reader() -> ImplicitVRLittleEndianDecoder<StandardDataDictionary> {
    ImplicitVRLittleEndianDecoder::default()
}

/// The decoder mandated for a DICOM file's meta information group, which is
/// always Explicit VR Little Endian regardless of the data set's own
/// transfer syntax.
pub fn file_header_decoder() -> ExplicitVRLittleEndianDecoder {
    ExplicitVRLittleEndianDecoder
}

/// Convenience to build a reader with the byte order a decoder expects.
pub fn reader_for<'a>(buf: &'a [u8], endianness: Endianness) -> ByteReader<'a> {
    ByteReader::new(buf, endianness)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcmk_core::header::{HasLength, Header};

    // (0002,0002) UI len=26 "1.2.840.10008.5.1.4.1.1.1\0"
    // (0002,0010) UI len=20 "1.2.840.10008.1.2.1\0"
    const RAW: &[u8] = &[
        0x02, 0x00, 0x02, 0x00, 0x55, 0x49, 0x1a, 0x00, 0x31, 0x2e, 0x32, 0x2e, 0x38, 0x34, 0x30, 0x2e, 0x31, 0x30,
        0x30, 0x30, 0x38, 0x2e, 0x35, 0x2e, 0x31, 0x2e, 0x34, 0x2e, 0x31, 0x2e, 0x31, 0x2e, 0x31, 0x00, 0x02, 0x00,
        0x10, 0x00, 0x55, 0x49, 0x14, 0x00, 0x31, 0x2e, 0x32, 0x2e, 0x38, 0x34, 0x30, 0x2e, 0x31, 0x30, 0x30, 0x30,
        0x38, 0x2e, 0x31, 0x2e, 0x32, 0x2e, 0x31, 0x00,
    ];

    #[test]
    fn decodes_explicit_short_form_elements() {
        let dec = ExplicitVRLittleEndianDecoder;
        let mut reader = ByteReader::new(RAW, Endianness::Little);
        let (elem, consumed) = dec.decode_header(&mut reader).unwrap();
        assert_eq!(elem.tag(), Tag(2, 2));
        assert_eq!(elem.vr, VR::UI);
        assert_eq!(elem.length(), Length(26));
        assert_eq!(consumed, 8);
        reader.skip(26).unwrap();

        let (elem, _) = dec.decode_header(&mut reader).unwrap();
        assert_eq!(elem.tag(), Tag(2, 0x10));
        assert_eq!(elem.length(), Length(20));
    }

    #[test]
    fn decodes_sequence_item_delimiters() {
        // (0008,103F) SQ reserved=0000 len=undefined, then an item and
        // item/sequence delimiters with zero length.
        const RAW_SEQ: &[u8] = &[
            0x08, 0x00, 0x3F, 0x10, b'S', b'Q', 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE, 0xFF, 0x00, 0xE0, 0xFF,
            0xFF, 0xFF, 0xFF, 0xFE, 0xFF, 0x0D, 0xE0, 0x00, 0x00, 0x00, 0x00, 0xFE, 0xFF, 0xDD, 0xE0, 0x00, 0x00,
            0x00, 0x00,
        ];
        let dec = ExplicitVRLittleEndianDecoder;
        let mut reader = ByteReader::new(RAW_SEQ, Endianness::Little);
        let (elem, consumed) = dec.decode_header(&mut reader).unwrap();
        assert_eq!(elem.vr, VR::SQ);
        assert!(elem.length().is_undefined());
        assert_eq!(consumed, 12);

        let item = dec.decode_item_header(&mut reader).unwrap();
        assert!(item.is_item());
        let delim = dec.decode_item_header(&mut reader).unwrap();
        assert!(delim.is_item_delimiter());
        let seq_delim = dec.decode_item_header(&mut reader).unwrap();
        assert!(seq_delim.is_sequence_delimiter());
    }

    #[test]
    fn implicit_vr_resolves_from_dictionary() {
        // (0010,0010) PatientName, len=8
        let raw: &[u8] = &[0x10, 0x00, 0x10, 0x00, 0x08, 0x00, 0x00, 0x00, b'D', b'o', b'e', b'^', b'J', b'o', b'e', 0x00];
        let dec = ImplicitVRLittleEndianDecoder::default();
        let mut reader = ByteReader::new(raw, Endianness::Little);
        let (elem, consumed) = dec.decode_header(&mut reader).unwrap();
        assert_eq!(elem.vr, VR::PN);
        assert_eq!(elem.length(), Length(8));
        assert_eq!(consumed, 8);
    }
}
