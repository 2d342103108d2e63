//! Serializes a parsed tree back into bytes, either as a bare data set or as
//! a full Part 10 file (preamble, `DICM`, re-encoded file meta group, main
//! data set).
//!
//! Only Explicit VR Little Endian and Implicit VR Little Endian data sets
//! can be written, matching [`dcmk_encoding::encode`]. Retired big-endian,
//! deflated, and encapsulated/compressed transfer syntaxes are rejected up
//! front rather than partially serialized.

use byteordered::byteorder::{ByteOrder, LittleEndian};
use chrono::{DateTime, FixedOffset, NaiveTime, Timelike};
use dcmk_core::header::DataElementHeader;
use dcmk_core::{Length, PrimitiveValue, Tag, VR};
use dcmk_encoding::encode::{file_header_encoder, Encode, ExplicitVRLittleEndianEncoder, ImplicitVRLittleEndianEncoder};
use dcmk_encoding::{Codec, Endianness, SpecificCharacterSet, TextCodec, TransferSyntax, TransferSyntaxIndex};
use dcmk_transfer_syntax_registry::TransferSyntaxRegistry;
use snafu::{OptionExt, ResultExt};

use crate::error::{EncodeValueSnafu, Result, UnwritableTransferSyntaxSnafu};
use crate::tree::{DataSetElement, ElementValue};

const SPECIFIC_CHARACTER_SET: Tag = Tag(0x0008, 0x0005);

fn padding_for(vr: VR, len: usize) -> Option<u8> {
    (len % 2 != 0).then(|| vr.padding_byte())
}

fn write_text(out: &mut Vec<u8>, tag: Tag, vr: VR, text: &str, cs: &SpecificCharacterSet) -> Result<()> {
    let bytes = if vr.is_always_ascii() {
        text.as_bytes().to_vec()
    } else {
        cs.encode(text).context(EncodeValueSnafu { tag })?
    };
    out.extend_from_slice(&bytes);
    if let Some(pad) = padding_for(vr, bytes.len()) {
        out.push(pad);
    }
    Ok(())
}

fn format_time(t: &NaiveTime) -> String {
    let micros = t.nanosecond() / 1_000;
    if micros == 0 {
        t.format("%H%M%S").to_string()
    } else {
        format!("{}.{:06}", t.format("%H%M%S"), micros)
    }
}

fn format_datetime(dt: &DateTime<FixedOffset>) -> String {
    let offset_secs = dt.offset().local_minus_utc();
    let sign = if offset_secs < 0 { '-' } else { '+' };
    let offset_secs = offset_secs.abs();
    format!(
        "{}{}{}{:02}{:02}",
        dt.format("%Y%m%d"),
        format_time(&dt.naive_local().time()),
        sign,
        offset_secs / 3600,
        (offset_secs % 3600) / 60
    )
}

fn encode_numeric<T: Copy>(values: &[T], width: usize, write: impl Fn(&mut [u8], T)) -> Vec<u8> {
    let mut out = vec![0u8; values.len() * width];
    for (chunk, &v) in out.chunks_mut(width).zip(values) {
        write(chunk, v);
    }
    out
}

fn encode_value(tag: Tag, vr: VR, value: &PrimitiveValue, cs: &SpecificCharacterSet) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    match value {
        PrimitiveValue::Empty => {}
        PrimitiveValue::Tags(tags) => {
            for t in tags {
                let mut buf = [0u8; 4];
                LittleEndian::write_u16(&mut buf[0..2], t.group());
                LittleEndian::write_u16(&mut buf[2..4], t.element());
                out.extend_from_slice(&buf);
            }
        }
        PrimitiveValue::U8(c) => out.extend_from_slice(c),
        PrimitiveValue::I16(c) => out.extend(encode_numeric(c, 2, |b, v| LittleEndian::write_i16(b, v))),
        PrimitiveValue::U16(c) => out.extend(encode_numeric(c, 2, |b, v| LittleEndian::write_u16(b, v))),
        PrimitiveValue::I32(c) if vr == VR::IS => {
            let joined = c.iter().map(i32::to_string).collect::<Vec<_>>().join("\\");
            out.extend_from_slice(joined.as_bytes());
        }
        PrimitiveValue::I32(c) => out.extend(encode_numeric(c, 4, |b, v| LittleEndian::write_i32(b, v))),
        PrimitiveValue::U32(c) => out.extend(encode_numeric(c, 4, |b, v| LittleEndian::write_u32(b, v))),
        PrimitiveValue::I64(c) => out.extend(encode_numeric(c, 8, |b, v| LittleEndian::write_i64(b, v))),
        PrimitiveValue::U64(c) => out.extend(encode_numeric(c, 8, |b, v| LittleEndian::write_u64(b, v))),
        PrimitiveValue::F32(c) => out.extend(encode_numeric(c, 4, |b, v| LittleEndian::write_f32(b, v))),
        PrimitiveValue::F64(c) if vr == VR::DS => {
            let joined = c.iter().map(f64::to_string).collect::<Vec<_>>().join("\\");
            out.extend_from_slice(joined.as_bytes());
        }
        PrimitiveValue::F64(c) => out.extend(encode_numeric(c, 8, |b, v| LittleEndian::write_f64(b, v))),
        PrimitiveValue::Date(dates) => {
            let joined = dates.iter().map(|d| d.format("%Y%m%d").to_string()).collect::<Vec<_>>().join("\\");
            out.extend_from_slice(joined.as_bytes());
        }
        PrimitiveValue::Time(times) => {
            let joined = times.iter().map(format_time).collect::<Vec<_>>().join("\\");
            out.extend_from_slice(joined.as_bytes());
        }
        PrimitiveValue::DateTime(dts) => {
            let joined = dts.iter().map(format_datetime).collect::<Vec<_>>().join("\\");
            out.extend_from_slice(joined.as_bytes());
        }
        PrimitiveValue::Str(s) => return text_value_bytes(tag, vr, s, cs),
        PrimitiveValue::Strs(strs) => {
            let joined = strs.iter().cloned().collect::<Vec<_>>().join("\\");
            return text_value_bytes(tag, vr, &joined, cs);
        }
    }
    if let Some(pad) = padding_for(vr, out.len()) {
        out.push(pad);
    }
    Ok(out)
}

fn text_value_bytes(tag: Tag, vr: VR, text: &str, cs: &SpecificCharacterSet) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write_text(&mut out, tag, vr, text, cs)?;
    Ok(out)
}

/// Write one flat list of elements (a data set, or the inside of a sequence
/// item), appending encoded bytes to `out`.
///
/// `explicit` selects whether value representations are written alongside
/// each header (Explicit VR) or omitted (Implicit VR); both write value
/// bytes in little-endian byte order, the only byte order the writer
/// supports.
pub fn write_elements(out: &mut Vec<u8>, elements: &[DataSetElement], explicit: bool, cs: &mut SpecificCharacterSet) -> Result<()> {
    let explicit_encoder = ExplicitVRLittleEndianEncoder;
    let implicit_encoder = ImplicitVRLittleEndianEncoder;

    for element in elements {
        let tag = element.tag();
        let vr = element.header.vr;

        match &element.value {
            ElementValue::Primitive(value) => {
                let bytes = encode_value(tag, vr, value, cs)?;
                let header = DataElementHeader::new(tag, vr, Length::defined(bytes.len() as u32));
                if explicit {
                    explicit_encoder.encode_element_header(out, header);
                } else {
                    implicit_encoder.encode_element_header(out, header);
                }
                out.extend_from_slice(&bytes);
                if tag == SPECIFIC_CHARACTER_SET {
                    if let Ok(code) = value.to_str() {
                        if let Some(resolved) = SpecificCharacterSet::from_code(&code) {
                            *cs = resolved;
                        }
                    }
                }
            }
            ElementValue::Sequence { items, .. } => {
                let mut item_bytes = Vec::new();
                for item in items {
                    let mut body = Vec::new();
                    write_elements(&mut body, item, explicit, cs)?;
                    if explicit {
                        explicit_encoder.encode_item_header(&mut item_bytes, body.len() as u32);
                    } else {
                        implicit_encoder.encode_item_header(&mut item_bytes, body.len() as u32);
                    }
                    item_bytes.extend_from_slice(&body);
                }
                let header = DataElementHeader::new(tag, VR::SQ, Length::defined(item_bytes.len() as u32));
                if explicit {
                    explicit_encoder.encode_element_header(out, header);
                } else {
                    implicit_encoder.encode_element_header(out, header);
                }
                out.extend_from_slice(&item_bytes);
            }
            ElementValue::PixelSequence { .. } => {
                return UnwritableTransferSyntaxSnafu { uid: "encapsulated pixel data".to_string() }.fail();
            }
        }
    }
    Ok(())
}

fn writable_transfer_syntax(ts: &TransferSyntax) -> Result<bool> {
    if ts.is_deflated() || matches!(ts.codec(), Codec::EncapsulatedPixelData) {
        return UnwritableTransferSyntaxSnafu { uid: ts.uid().to_string() }.fail();
    }
    Ok(ts.endianness() == Endianness::Little)
}

/// Write a complete Part 10 file: preamble, `DICM`, the file meta group
/// (always re-encoded as Explicit VR Little Endian), and the main data set
/// under `transfer_syntax_uid`.
pub fn write_file(
    meta: &[DataSetElement],
    dataset: &[DataSetElement],
    transfer_syntax_uid: &str,
) -> Result<Vec<u8>> {
    let ts = TransferSyntaxRegistry
        .get(transfer_syntax_uid)
        .context(UnwritableTransferSyntaxSnafu { uid: transfer_syntax_uid.to_string() })?;
    if !writable_transfer_syntax(ts)? {
        return UnwritableTransferSyntaxSnafu { uid: transfer_syntax_uid.to_string() }.fail();
    }

    let mut out = vec![0u8; 128];
    out.extend_from_slice(b"DICM");

    let mut meta_bytes = Vec::new();
    let mut meta_cs = SpecificCharacterSet::ISO_IR_6;
    write_elements(&mut meta_bytes, meta, true, &mut meta_cs)?;

    let meta_encoder = file_header_encoder();
    let group_length_header = DataElementHeader::new(Tag(0x0002, 0x0000), VR::UL, Length::defined(4));
    meta_encoder.encode_element_header(&mut out, group_length_header);
    let mut len_bytes = [0u8; 4];
    LittleEndian::write_u32(&mut len_bytes, meta_bytes.len() as u32);
    out.extend_from_slice(&len_bytes);
    out.extend_from_slice(&meta_bytes);

    let mut dataset_cs = SpecificCharacterSet::ISO_IR_6;
    write_elements(&mut out, dataset, ts.is_explicit_vr(), &mut dataset_cs)?;

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcmk_core::Length as L;
    use dcmk_encoding::decode::ExplicitVRLittleEndianDecoder;
    use dcmk_encoding::ByteReader;
    use rstest::rstest;

    use crate::parser::{parse_data_set, ParseOptions};

    fn elem(tag: Tag, vr: VR, value: PrimitiveValue) -> DataSetElement {
        DataSetElement { header: DataElementHeader::new(tag, vr, L(0)), value: ElementValue::Primitive(value) }
    }

    #[rstest]
    #[case(Tag(0x0028, 0x0010), VR::US, PrimitiveValue::U16(vec![512].into()))]
    #[case(Tag(0x0010, 0x0010), VR::PN, PrimitiveValue::Strs(vec!["Doe^Jane".to_string()].into()))]
    #[case(Tag(0x0008, 0x0018), VR::UI, PrimitiveValue::Strs(vec!["1.2.3.4".to_string()].into()))]
    #[case(Tag(0x0018, 0x1160), VR::OB, PrimitiveValue::U8(vec![1, 2, 3, 4, 5].into()))]
    fn element_round_trips_through_write_then_parse(#[case] tag: Tag, #[case] vr: VR, #[case] value: PrimitiveValue) {
        let elements = vec![elem(tag, vr, value.clone())];
        let mut out = Vec::new();
        let mut cs = SpecificCharacterSet::ISO_IR_6;
        write_elements(&mut out, &elements, true, &mut cs).unwrap();

        let dec = ExplicitVRLittleEndianDecoder;
        let mut reader = ByteReader::new(&out, Endianness::Little);
        let opts = ParseOptions::default();
        let outcome = parse_data_set(&mut reader, &dec, SpecificCharacterSet::ISO_IR_6, &opts).unwrap();
        let parsed = outcome.into_elements();

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].tag(), tag);
        match &parsed[0].value {
            ElementValue::Primitive(v) => assert_eq!(v, &value),
            other => panic!("expected a primitive value, got {other:?}"),
        }
    }

    #[test]
    fn writes_explicit_short_form_us() {
        let elements = vec![elem(Tag(0x0028, 0x0010), VR::US, PrimitiveValue::U16(vec![512].into()))];
        let mut out = Vec::new();
        let mut cs = SpecificCharacterSet::ISO_IR_6;
        write_elements(&mut out, &elements, true, &mut cs).unwrap();
        assert_eq!(&out[0..4], &[0x28, 0x00, 0x10, 0x00]);
        assert_eq!(&out[4..6], b"US");
        assert_eq!(LittleEndian::read_u16(&out[6..8]), 2);
        assert_eq!(LittleEndian::read_u16(&out[8..10]), 512);
    }

    #[test]
    fn pads_odd_length_text_with_trailing_space() {
        let elements = vec![elem(Tag(0x0010, 0x0010), VR::PN, PrimitiveValue::Strs(vec!["ODD".to_string()].into()))];
        let mut out = Vec::new();
        let mut cs = SpecificCharacterSet::ISO_IR_6;
        write_elements(&mut out, &elements, true, &mut cs).unwrap();
        let len = LittleEndian::read_u16(&out[6..8]) as usize;
        assert_eq!(len, 4);
        assert_eq!(out[11], b' ');
    }

    #[test]
    fn rejects_encapsulated_pixel_data() {
        let elements = vec![DataSetElement {
            header: DataElementHeader::new(Tag(0x7FE0, 0x0010), VR::OB, L::UNDEFINED),
            value: ElementValue::PixelSequence { offset_table: vec![], fragments: vec![] },
        }];
        let mut out = Vec::new();
        let mut cs = SpecificCharacterSet::ISO_IR_6;
        assert!(write_elements(&mut out, &elements, true, &mut cs).is_err());
    }
}
