//! Decodes a primitive value's raw bytes into its typed [`PrimitiveValue`],
//! dispatching on value representation the way the lineage's stateful
//! decoder does (grouped here by [`dcmk_core::vr::ValueKind`] plus the
//! per-VR distinctions `ValueKind` does not itself capture, such as which
//! binary width a `Binary`-kind VR uses).

use chrono::FixedOffset;
use dcmk_core::value::deserialize::{parse_date, parse_datetime, parse_time};
use dcmk_core::value::C;
use dcmk_core::{PrimitiveValue, Tag, VR};
use dcmk_encoding::{ByteReader, Endianness, SpecificCharacterSet, TextCodec};
use snafu::ResultExt;

use crate::error::{DecodeValueSnafu, Result};

fn trim_padding(raw: &[u8], vr: VR) -> &[u8] {
    match raw.last() {
        Some(&b) if b == vr.padding_byte() => &raw[..raw.len() - 1],
        _ => raw,
    }
}

fn decode_ascii(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

macro_rules! read_array {
    ($name:ident, $ty:ty, $width:literal, $read:ident) => {
        fn $name(raw: &[u8], endianness: Endianness) -> C<$ty> {
            let mut reader = ByteReader::new(raw, endianness);
            let mut out = C::new();
            while reader.bytes_left() >= $width {
                out.push(reader.$read().expect("checked length"));
            }
            out
        }
    };
}

read_array!(read_u16_array, u16, 2, read_u16);
read_array!(read_i16_array, i16, 2, read_i16);
read_array!(read_u32_array, u32, 4, read_u32);
read_array!(read_i32_array, i32, 4, read_i32);
read_array!(read_f32_array, f32, 4, read_f32);
read_array!(read_f64_array, f64, 8, read_f64);

/// Parse DS text (`\`-delimited floats) into [`PrimitiveValue::F64`],
/// falling back to [`PrimitiveValue::Strs`] when any value is not
/// format-conformant numeric text.
fn parse_ds(text: &str) -> PrimitiveValue {
    let mut values = C::new();
    for part in text.split('\\') {
        match part.trim().parse::<f64>() {
            Ok(v) => values.push(v),
            Err(_) => return PrimitiveValue::Strs(text.split('\\').map(str::to_string).collect()),
        }
    }
    PrimitiveValue::F64(values)
}

/// Parse IS text (`\`-delimited integers) into [`PrimitiveValue::I32`],
/// falling back to [`PrimitiveValue::Strs`] when any value is not
/// format-conformant numeric text.
fn parse_is(text: &str) -> PrimitiveValue {
    let mut values = C::new();
    for part in text.split('\\') {
        match part.trim().parse::<i32>() {
            Ok(v) => values.push(v),
            Err(_) => return PrimitiveValue::Strs(text.split('\\').map(str::to_string).collect()),
        }
    }
    PrimitiveValue::I32(values)
}

/// Decode the raw value bytes of one data element into a typed
/// [`PrimitiveValue`], given the element's VR, the byte order of the
/// enclosing transfer syntax, and the data set's current character set.
///
/// `tag` is used only to annotate decode errors; it plays no role in the
/// decoding rules themselves.
pub fn read_primitive(tag: Tag, vr: VR, raw: &[u8], endianness: Endianness, cs: &SpecificCharacterSet) -> Result<PrimitiveValue> {
    use VR::*;

    if raw.is_empty() {
        return Ok(PrimitiveValue::Empty);
    }

    match vr {
        AT => {
            let mut reader = ByteReader::new(raw, endianness);
            let mut tags = C::new();
            while reader.bytes_left() >= 4 {
                tags.push(reader.read_tag().expect("checked length"));
            }
            Ok(PrimitiveValue::Tags(tags))
        }
        US | OW => Ok(PrimitiveValue::U16(read_u16_array(raw, endianness))),
        SS => Ok(PrimitiveValue::I16(read_i16_array(raw, endianness))),
        UL | OL => Ok(PrimitiveValue::U32(read_u32_array(raw, endianness))),
        SL => Ok(PrimitiveValue::I32(read_i32_array(raw, endianness))),
        FL | OF => Ok(PrimitiveValue::F32(read_f32_array(raw, endianness))),
        FD | OD => Ok(PrimitiveValue::F64(read_f64_array(raw, endianness))),
        OB | UN => Ok(PrimitiveValue::U8(raw.iter().copied().collect())),
        DA => {
            let raw = trim_padding(raw, vr);
            let mut dates = C::new();
            for part in raw.split(|&b| b == b'\\') {
                let (d, _) = parse_date(part).context(DecodeValueSnafu { tag })?;
                dates.push(d);
            }
            Ok(PrimitiveValue::Date(dates))
        }
        TM => {
            let raw = trim_padding(raw, vr);
            let mut times = C::new();
            for part in raw.split(|&b| b == b'\\') {
                let (t, _) = parse_time(part).context(DecodeValueSnafu { tag })?;
                times.push(t);
            }
            Ok(PrimitiveValue::Time(times))
        }
        DT => {
            let raw = trim_padding(raw, vr);
            let mut dts = C::new();
            for part in raw.split(|&b| b == b'\\') {
                let dt = parse_datetime(part, FixedOffset::east_opt(0).expect("zero is a valid offset"))
                    .context(DecodeValueSnafu { tag })?;
                dts.push(dt);
            }
            Ok(PrimitiveValue::DateTime(dts))
        }
        DS => Ok(parse_ds(&decode_ascii(trim_padding(raw, vr)))),
        IS => Ok(parse_is(&decode_ascii(trim_padding(raw, vr)))),
        ST | LT | UT => {
            let raw = trim_padding(raw, vr);
            let text = cs.decode(raw).unwrap_or_else(|_| decode_ascii(raw));
            Ok(PrimitiveValue::Str(text))
        }
        _ => {
            // AE, AS, CS, LO, PN, SH, UI: possibly multi-valued text.
            let raw = trim_padding(raw, vr);
            let text = if vr.is_always_ascii() {
                decode_ascii(raw)
            } else {
                cs.decode(raw).unwrap_or_else(|_| decode_ascii(raw))
            };
            let strs: C<String> = text.split('\\').map(str::to_string).collect();
            Ok(PrimitiveValue::Strs(strs))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_multi_valued_text() {
        let v = read_primitive(Tag(8, 0x60), VR::CS, b"OT\\MR", Endianness::Little, &SpecificCharacterSet::ISO_IR_6).unwrap();
        assert_eq!(v.to_multi_str().unwrap().as_ref(), &["OT".to_string(), "MR".to_string()]);
    }

    #[test]
    fn decodes_us_array() {
        let raw = [0x01, 0x00, 0x02, 0x00];
        let v = read_primitive(Tag(0x28, 0x10), VR::US, &raw, Endianness::Little, &SpecificCharacterSet::ISO_IR_6).unwrap();
        assert_eq!(v.u16_slice().unwrap(), &[1, 2]);
    }

    #[test]
    fn falls_back_to_text_for_non_numeric_ds() {
        let v = read_primitive(Tag(0x18, 0x50), VR::DS, b"not-a-number", Endianness::Little, &SpecificCharacterSet::ISO_IR_6).unwrap();
        assert!(matches!(v, PrimitiveValue::Strs(_)));
    }

    #[test]
    fn empty_value_decodes_as_empty() {
        let v = read_primitive(Tag(8, 0x60), VR::CS, b"", Endianness::Little, &SpecificCharacterSet::ISO_IR_6).unwrap();
        assert_eq!(v, PrimitiveValue::Empty);
    }
}
