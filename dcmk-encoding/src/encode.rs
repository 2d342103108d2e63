//! Data element header encoding: the write-side counterpart of [`decode`](crate::decode).
//!
//! Only the two transfer syntaxes the round-trip writer targets — Explicit
//! VR Little Endian and Implicit VR Little Endian — are implemented here.

use byteordered::byteorder::{ByteOrder, LittleEndian};
use dcmk_core::header::{DataElementHeader, Header};
use dcmk_core::{Length, Tag};

/// Encodes data element headers and item/sequence delimiters for one
/// transfer syntax, appending bytes to an in-memory buffer.
pub trait Encode {
    /// Write a standalone tag.
    fn encode_tag(&self, to: &mut Vec<u8>, tag: Tag);

    /// Write a full data element header, returning the number of bytes written.
    fn encode_element_header(&self, to: &mut Vec<u8>, header: DataElementHeader) -> usize;

    /// Write an item header with the given length.
    fn encode_item_header(&self, to: &mut Vec<u8>, len: u32);

    /// Write an item delimiter (zero length).
    fn encode_item_delimiter(&self, to: &mut Vec<u8>) {
        self.encode_tag(to, Tag::ITEM_DELIMITER);
        to.extend_from_slice(&0u32.to_le_bytes());
    }

    /// Write a sequence delimiter (zero length).
    fn encode_sequence_delimiter(&self, to: &mut Vec<u8>) {
        self.encode_tag(to, Tag::SEQUENCE_DELIMITER);
        to.extend_from_slice(&0u32.to_le_bytes());
    }
}

fn push_tag(to: &mut Vec<u8>, tag: Tag) {
    let mut buf = [0u8; 4];
    LittleEndian::write_u16(&mut buf[0..2], tag.group());
    LittleEndian::write_u16(&mut buf[2..4], tag.element());
    to.extend_from_slice(&buf);
}

fn push_u32(to: &mut Vec<u8>, v: u32) {
    let mut buf = [0u8; 4];
    LittleEndian::write_u32(&mut buf, v);
    to.extend_from_slice(&buf);
}

/// Encoder for the Explicit VR Little Endian transfer syntax.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExplicitVRLittleEndianEncoder;

impl Encode for ExplicitVRLittleEndianEncoder {
    fn encode_tag(&self, to: &mut Vec<u8>, tag: Tag) {
        push_tag(to, tag);
    }

    fn encode_element_header(&self, to: &mut Vec<u8>, header: DataElementHeader) -> usize {
        push_tag(to, header.tag);
        let len = header.len.0;

        if header.tag.group() == 0xFFFE {
            push_u32(to, len);
            return 8;
        }

        to.extend_from_slice(&header.vr.to_bytes());
        if header.vr.is_long_form() {
            to.extend_from_slice(&[0, 0]);
            push_u32(to, len);
            12
        } else {
            let mut buf = [0u8; 2];
            LittleEndian::write_u16(&mut buf, len as u16);
            to.extend_from_slice(&buf);
            8
        }
    }

    fn encode_item_header(&self, to: &mut Vec<u8>, len: u32) {
        push_tag(to, Tag::ITEM);
        push_u32(to, len);
    }
}

/// Encoder for the Implicit VR Little Endian transfer syntax: value
/// representations are never written, only tag and length.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImplicitVRLittleEndianEncoder;

impl Encode for ImplicitVRLittleEndianEncoder {
    fn encode_tag(&self, to: &mut Vec<u8>, tag: Tag) {
        push_tag(to, tag);
    }

    fn encode_element_header(&self, to: &mut Vec<u8>, header: DataElementHeader) -> usize {
        push_tag(to, header.tag);
        push_u32(to, header.len.0);
        8
    }

    fn encode_item_header(&self, to: &mut Vec<u8>, len: u32) {
        push_tag(to, Tag::ITEM);
        push_u32(to, len);
    }
}

/// The encoder mandated for a DICOM file's meta information group.
pub fn file_header_encoder() -> ExplicitVRLittleEndianEncoder {
    ExplicitVRLittleEndianEncoder
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcmk_core::VR;

    #[test]
    fn explicit_short_form_round_trips_tag_and_length() {
        let enc = ExplicitVRLittleEndianEncoder;
        let mut buf = Vec::new();
        let header = DataElementHeader::new(Tag(0x0010, 0x0010), VR::PN, Length(8));
        let written = enc.encode_element_header(&mut buf, header);
        assert_eq!(written, 8);
        assert_eq!(&buf[0..4], &[0x10, 0x00, 0x10, 0x00]);
        assert_eq!(&buf[4..6], b"PN");
        assert_eq!(LittleEndian::read_u16(&buf[6..8]), 8);
    }

    #[test]
    fn explicit_long_form_writes_reserved_bytes() {
        let enc = ExplicitVRLittleEndianEncoder;
        let mut buf = Vec::new();
        let header = DataElementHeader::new(Tag(0x7FE0, 0x0010), VR::OW, Length(4));
        let written = enc.encode_element_header(&mut buf, header);
        assert_eq!(written, 12);
        assert_eq!(&buf[4..6], b"OW");
        assert_eq!(&buf[6..8], &[0, 0]);
    }

    #[test]
    fn implicit_encoder_omits_vr() {
        let enc = ImplicitVRLittleEndianEncoder;
        let mut buf = Vec::new();
        let header = DataElementHeader::new(Tag(0x0008, 0x0060), VR::CS, Length(2));
        let written = enc.encode_element_header(&mut buf, header);
        assert_eq!(written, 8);
        assert_eq!(buf.len(), 8);
    }
}
