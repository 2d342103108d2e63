//! The recursive-descent data set parser.
//!
//! Builds a [`DataSetElement`] tree directly from a fully-buffered data set,
//! rather than lazily through a token stream: see [`crate::tree`] for why.

use byteordered::byteorder::{BigEndian, ByteOrder, LittleEndian};
use dcmk_core::header::{DataElementHeader, Header, SequenceItemHeader};
use dcmk_core::{Length, PrimitiveValue, Tag, VR};
use dcmk_encoding::{ByteReader, Decode, Endianness, SpecificCharacterSet};
use snafu::ResultExt;

use crate::error::{
    DecodeHeaderSnafu, Error, RecursionLimitExceededSnafu, Result, UnexpectedEndOfDataSnafu, UnexpectedItemTagSnafu,
};
use crate::tree::{DataSetElement, ElementValue};
use crate::value;

const DEFAULT_MAX_DEPTH: usize = 32;
const SPECIFIC_CHARACTER_SET: Tag = Tag(0x0008, 0x0005);
const PIXEL_DATA: Tag = Tag(0x7FE0, 0x0010);

/// Parsing behavior flags, passed to [`parse_data_set`].
pub struct ParseOptions<'a> {
    /// When a structural anomaly prevents even identifying a transfer
    /// syntax (missing preamble, missing `DICM` prefix), fall back to
    /// parsing the whole input as Implicit VR Little Endian rather than
    /// failing outright. Evaluated only by [`crate::file::parse`].
    pub force: bool,
    /// When a per-element anomaly is found (an undecodable header, a
    /// value whose raw bytes do not parse under its VR, a length that
    /// overruns the buffer), downgrade the element to `UN` with its raw
    /// bytes and resume at the next plausible tag boundary, instead of
    /// aborting the parse.
    pub tolerant: bool,
    /// Maximum sequence/item nesting depth before giving up.
    pub max_depth: usize,
    /// Polled at each top-level element boundary; when it returns `true`,
    /// parsing stops and the data collected so far is returned.
    pub cancel: Option<&'a dyn Fn() -> bool>,
}

impl<'a> Default for ParseOptions<'a> {
    fn default() -> Self {
        ParseOptions { force: false, tolerant: false, max_depth: DEFAULT_MAX_DEPTH, cancel: None }
    }
}

impl<'a> ParseOptions<'a> {
    fn is_cancelled(&self) -> bool {
        self.cancel.map_or(false, |f| f())
    }
}

/// The result of parsing a data set to completion or to cancellation.
pub enum ParseOutcome {
    /// The data set was parsed to the end of the buffer.
    Complete(Vec<DataSetElement>),
    /// Parsing stopped early because the cancellation token fired; the
    /// elements read so far are still returned.
    Cancelled(Vec<DataSetElement>),
}

impl ParseOutcome {
    /// The elements read, whether or not parsing completed.
    pub fn into_elements(self) -> Vec<DataSetElement> {
        match self {
            ParseOutcome::Complete(v) | ParseOutcome::Cancelled(v) => v,
        }
    }

    /// Whether the cancellation token interrupted parsing.
    pub fn was_cancelled(&self) -> bool {
        matches!(self, ParseOutcome::Cancelled(_))
    }
}

/// Parse a complete data set from `reader`, using `decoder` to read element
/// headers and `initial_cs` as the character set in effect until a
/// `SpecificCharacterSet` (0008,0005) element says otherwise.
pub fn parse_data_set(
    reader: &mut ByteReader<'_>,
    decoder: &dyn Decode,
    initial_cs: SpecificCharacterSet,
    options: &ParseOptions<'_>,
) -> Result<ParseOutcome> {
    let mut ctx = Ctx { decoder, endianness: reader.endianness(), options, cs: initial_cs };
    let (elements, cancelled) = ctx.parse_elements(reader, 0, false)?;
    Ok(if cancelled { ParseOutcome::Cancelled(elements) } else { ParseOutcome::Complete(elements) })
}

struct Ctx<'r, 'o> {
    decoder: &'r dyn Decode,
    endianness: Endianness,
    options: &'r ParseOptions<'o>,
    cs: SpecificCharacterSet,
}

impl<'r, 'o> Ctx<'r, 'o> {
    /// Parse a run of elements, either to the end of the buffer (used for
    /// the top-level data set and for defined-length sequence items, whose
    /// reader is a sub-slice that ends exactly where the item does) or,
    /// when `stop_at_item_delimiter` is set, up to and including an item
    /// delimiter (used for undefined-length sequence items, which share
    /// the enclosing reader).
    fn parse_elements(&mut self, reader: &mut ByteReader<'_>, depth: usize, stop_at_item_delimiter: bool) -> Result<(Vec<DataSetElement>, bool)> {
        if depth > self.options.max_depth {
            return RecursionLimitExceededSnafu { limit: self.options.max_depth }.fail();
        }

        let mut elements = Vec::new();
        loop {
            if reader.bytes_left() == 0 {
                break;
            }
            if depth == 0 && self.options.is_cancelled() {
                return Ok((elements, true));
            }

            let offset = reader.position();
            let header = match self.decoder.decode_header(reader) {
                Ok((header, _consumed)) => header,
                Err(source) => {
                    if self.options.tolerant {
                        tracing::warn!(offset, %source, "could not decode element header, resynchronizing");
                        if self.resync(reader) {
                            continue;
                        }
                        break;
                    }
                    return Err(source).context(DecodeHeaderSnafu { offset });
                }
            };

            if header.tag == Tag::ITEM_DELIMITER {
                if stop_at_item_delimiter {
                    break;
                }
                if self.options.tolerant {
                    tracing::warn!(offset, "stray item delimiter outside of an item, ignoring");
                    continue;
                }
                return UnexpectedItemTagSnafu { tag: header.tag }.fail();
            }
            if header.tag == Tag::SEQUENCE_DELIMITER {
                if self.options.tolerant {
                    tracing::warn!(offset, "stray sequence delimiter outside of a sequence, ignoring");
                    continue;
                }
                return UnexpectedItemTagSnafu { tag: header.tag }.fail();
            }

            if header.vr == VR::SQ {
                match self.parse_sequence(reader, header.len, depth) {
                    Ok(items) => elements.push(DataSetElement { header, value: ElementValue::Sequence { items, size: header.len } }),
                    Err(e) if self.options.tolerant => {
                        tracing::warn!(tag = %header.tag, error = %e, "failed to parse sequence, resynchronizing");
                        if !self.resync(reader) {
                            break;
                        }
                    }
                    Err(e) => return Err(e),
                }
                continue;
            }

            if header.tag == PIXEL_DATA && header.len.is_undefined() {
                match self.parse_pixel_sequence(reader) {
                    Ok((offset_table, fragments)) => {
                        elements.push(DataSetElement { header, value: ElementValue::PixelSequence { offset_table, fragments } })
                    }
                    Err(e) if self.options.tolerant => {
                        tracing::warn!(tag = %header.tag, error = %e, "failed to parse encapsulated pixel data, resynchronizing");
                        if !self.resync(reader) {
                            break;
                        }
                    }
                    Err(e) => return Err(e),
                }
                continue;
            }

            let len = match header.len.get() {
                Some(len) => len as usize,
                None => {
                    // Undefined length outside SQ/pixel data is malformed.
                    if self.options.tolerant {
                        tracing::warn!(tag = %header.tag, "undefined length on a non-sequence element, resynchronizing");
                        if self.resync(reader) {
                            continue;
                        }
                        break;
                    }
                    return UnexpectedEndOfDataSnafu { offset: reader.position(), needed: 0usize }.fail();
                }
            };

            if reader.bytes_left() < len {
                if self.options.tolerant {
                    tracing::warn!(tag = %header.tag, available = reader.bytes_left(), needed = len, "value length overruns buffer, taking what remains as UN");
                    let raw = reader.read_bytes(reader.bytes_left()).expect("reads exactly what is available");
                    self.push_as_unknown(&mut elements, header, raw);
                    break;
                }
                return UnexpectedEndOfDataSnafu { offset: reader.position(), needed: len - reader.bytes_left() }.fail();
            }

            let raw = reader.read_bytes(len).expect("checked length");
            self.push_primitive(&mut elements, header, raw)?;
        }

        Ok((elements, false))
    }

    fn push_primitive(&mut self, elements: &mut Vec<DataSetElement>, header: DataElementHeader, raw: &[u8]) -> Result<()> {
        match value::read_primitive(header.tag, header.vr, raw, self.endianness, &self.cs) {
            Ok(parsed) => {
                if header.tag == SPECIFIC_CHARACTER_SET {
                    if let Ok(code) = parsed.to_str() {
                        if let Some(cs) = SpecificCharacterSet::from_code(&code) {
                            self.cs = cs;
                        }
                    }
                }
                elements.push(DataSetElement { header, value: ElementValue::Primitive(parsed) });
                Ok(())
            }
            Err(source) if self.options.tolerant => {
                tracing::warn!(tag = %header.tag, %source, "failed to interpret value under its VR, keeping raw bytes as UN");
                self.push_as_unknown(elements, header, raw);
                Ok(())
            }
            Err(source) => Err(source),
        }
    }

    fn push_as_unknown(&self, elements: &mut Vec<DataSetElement>, header: DataElementHeader, raw: &[u8]) {
        let header = DataElementHeader::new(header.tag, VR::UN, header.len);
        let value = PrimitiveValue::U8(raw.iter().copied().collect());
        elements.push(DataSetElement { header, value: ElementValue::Primitive(value) });
    }

    fn decode_item_header(&self, reader: &mut ByteReader<'_>) -> Result<SequenceItemHeader> {
        let offset = reader.position();
        self.decoder.decode_item_header(reader).context(DecodeHeaderSnafu { offset })
    }

    fn parse_sequence(&mut self, reader: &mut ByteReader<'_>, len: Length, depth: usize) -> Result<Vec<Vec<DataSetElement>>> {
        let mut items = Vec::new();
        match len.get() {
            Some(len) => {
                let end = reader.position() + len as usize;
                while reader.position() < end {
                    let item_header = self.decode_item_header(reader)?;
                    items.push(self.parse_item(reader, item_header, depth)?);
                }
            }
            None => loop {
                if reader.bytes_left() == 0 {
                    break;
                }
                let item_header = self.decode_item_header(reader)?;
                if matches!(item_header, SequenceItemHeader::SequenceDelimiter) {
                    break;
                }
                items.push(self.parse_item(reader, item_header, depth)?);
            },
        }
        Ok(items)
    }

    fn parse_item(&mut self, reader: &mut ByteReader<'_>, header: SequenceItemHeader, depth: usize) -> Result<Vec<DataSetElement>> {
        let len = match header {
            SequenceItemHeader::Item { len } => len,
            other => return UnexpectedItemTagSnafu { tag: other.tag() }.fail(),
        };
        match len.get() {
            Some(len) => {
                let offset = reader.position();
                let bytes = reader
                    .read_bytes(len as usize)
                    .map_err(|e| Error::UnexpectedEndOfData { offset, needed: e.needed })?;
                let mut sub = ByteReader::new(bytes, self.endianness);
                let (elements, _) = self.parse_elements(&mut sub, depth + 1, false)?;
                Ok(elements)
            }
            None => {
                let (elements, _) = self.parse_elements(reader, depth + 1, true)?;
                Ok(elements)
            }
        }
    }

    fn parse_pixel_sequence(&mut self, reader: &mut ByteReader<'_>) -> Result<(Vec<u32>, Vec<Vec<u8>>)> {
        let first = self.decode_item_header(reader)?;
        let bot_len = match first {
            SequenceItemHeader::Item { len } => len,
            other => return UnexpectedItemTagSnafu { tag: other.tag() }.fail(),
        };
        let offset = reader.position();
        let bot_len = bot_len.get().unwrap_or(0);
        let bot_bytes = reader.read_bytes(bot_len as usize).map_err(|e| Error::UnexpectedEndOfData { offset, needed: e.needed })?;
        let mut bot_reader = ByteReader::new(bot_bytes, self.endianness);
        let mut offset_table = Vec::new();
        while bot_reader.bytes_left() >= 4 {
            offset_table.push(bot_reader.read_u32().expect("checked length"));
        }

        let mut fragments = Vec::new();
        loop {
            if reader.bytes_left() == 0 {
                break;
            }
            let item_header = self.decode_item_header(reader)?;
            match item_header {
                SequenceItemHeader::SequenceDelimiter => break,
                SequenceItemHeader::ItemDelimiter => return UnexpectedItemTagSnafu { tag: Tag::ITEM_DELIMITER }.fail(),
                SequenceItemHeader::Item { len } => {
                    let offset = reader.position();
                    let len = len.get().unwrap_or(0);
                    let bytes = reader.read_bytes(len as usize).map_err(|e| Error::UnexpectedEndOfData { offset, needed: e.needed })?;
                    fragments.push(bytes.to_vec());
                }
            }
        }

        Ok((offset_table, fragments))
    }

    /// Best-effort recovery after a decode failure: scan forward from the
    /// current position for the next plausible element boundary, defined
    /// as an even-group tag whose claimed length (if defined) still fits
    /// in the remaining buffer. Leaves the reader there, or at the end of
    /// the buffer if nothing plausible is found.
    fn resync(&self, reader: &mut ByteReader<'_>) -> bool {
        let buf = reader.remaining();
        if buf.len() < 8 {
            return false;
        }
        for offset in (0..=buf.len() - 8).step_by(2) {
            let group = self.read_u16_at(buf, offset);
            if group % 2 != 0 || group == 0xFFFE {
                continue;
            }
            let len = self.read_u32_at(buf, offset + 4);
            let fits = len == u32::MAX || (offset + 8).saturating_add(len as usize) <= buf.len();
            if fits {
                reader.skip(offset).expect("within bounds");
                return true;
            }
        }
        false
    }

    fn read_u16_at(&self, buf: &[u8], at: usize) -> u16 {
        match self.endianness {
            Endianness::Little => LittleEndian::read_u16(&buf[at..at + 2]),
            Endianness::Big => BigEndian::read_u16(&buf[at..at + 2]),
        }
    }

    fn read_u32_at(&self, buf: &[u8], at: usize) -> u32 {
        match self.endianness {
            Endianness::Little => LittleEndian::read_u32(&buf[at..at + 4]),
            Endianness::Big => BigEndian::read_u32(&buf[at..at + 4]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcmk_encoding::decode::ExplicitVRLittleEndianDecoder;

    fn options() -> ParseOptions<'static> {
        ParseOptions::default()
    }

    #[test]
    fn parses_flat_elements() {
        // (0008,0060) CS len=2 "OT", (0010,0010) PN len=8 "Doe^Joe\0"
        const RAW: &[u8] = &[
            0x08, 0x00, 0x60, 0x00, b'C', b'S', 0x02, 0x00, b'O', b'T', 0x10, 0x00, 0x10, 0x00, b'P', b'N', 0x08,
            0x00, b'D', b'o', b'e', b'^', b'J', b'o', b'e', 0x00,
        ];
        let dec = ExplicitVRLittleEndianDecoder;
        let mut reader = ByteReader::new(RAW, Endianness::Little);
        let opts = options();
        let outcome = parse_data_set(&mut reader, &dec, SpecificCharacterSet::ISO_IR_6, &opts).unwrap();
        let elements = outcome.into_elements();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].tag(), Tag(0x0008, 0x0060));
        assert_eq!(elements[1].tag(), Tag(0x0010, 0x0010));
    }

    #[test]
    fn parses_nested_sequence_with_undefined_length() {
        // (0008,1140) SQ undefined-length, one undefined-length item
        // containing (0008,1150) UI "1\0", item delimiter, sequence delimiter.
        const RAW: &[u8] = &[
            0x08, 0x00, 0x40, 0x11, b'S', b'Q', 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, // SQ header, undefined len
            0xFE, 0xFF, 0x00, 0xE0, 0xFF, 0xFF, 0xFF, 0xFF, // item, undefined len
            0x08, 0x00, 0x50, 0x11, b'U', b'I', 0x02, 0x00, b'1', 0x00, // (0008,1150) UI "1\0"
            0xFE, 0xFF, 0x0D, 0xE0, 0x00, 0x00, 0x00, 0x00, // item delimiter
            0xFE, 0xFF, 0xDD, 0xE0, 0x00, 0x00, 0x00, 0x00, // sequence delimiter
        ];
        let dec = ExplicitVRLittleEndianDecoder;
        let mut reader = ByteReader::new(RAW, Endianness::Little);
        let opts = options();
        let outcome = parse_data_set(&mut reader, &dec, SpecificCharacterSet::ISO_IR_6, &opts).unwrap();
        let elements = outcome.into_elements();
        assert_eq!(elements.len(), 1);
        match &elements[0].value {
            ElementValue::Sequence { items, .. } => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].len(), 1);
                assert_eq!(items[0][0].tag(), Tag(0x0008, 0x1150));
            }
            other => panic!("expected a sequence, got {other:?}"),
        }
    }

    #[test]
    fn strict_mode_aborts_on_truncated_value() {
        const RAW: &[u8] = &[0x08, 0x00, 0x60, 0x00, b'C', b'S', 0x10, 0x00, b'O', b'T'];
        let dec = ExplicitVRLittleEndianDecoder;
        let mut reader = ByteReader::new(RAW, Endianness::Little);
        let opts = options();
        assert!(parse_data_set(&mut reader, &dec, SpecificCharacterSet::ISO_IR_6, &opts).is_err());
    }

    #[test]
    fn tolerant_mode_recovers_truncated_value_as_unknown() {
        const RAW: &[u8] = &[0x08, 0x00, 0x60, 0x00, b'C', b'S', 0x10, 0x00, b'O', b'T'];
        let dec = ExplicitVRLittleEndianDecoder;
        let mut reader = ByteReader::new(RAW, Endianness::Little);
        let mut opts = options();
        opts.tolerant = true;
        let outcome = parse_data_set(&mut reader, &dec, SpecificCharacterSet::ISO_IR_6, &opts).unwrap();
        let elements = outcome.into_elements();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].header.vr, VR::UN);
    }

    #[test]
    fn cancellation_token_stops_before_the_second_element() {
        const RAW: &[u8] = &[
            0x08, 0x00, 0x60, 0x00, b'C', b'S', 0x02, 0x00, b'O', b'T', 0x10, 0x00, 0x10, 0x00, b'P', b'N', 0x08,
            0x00, b'D', b'o', b'e', b'^', b'J', b'o', b'e', 0x00,
        ];
        let dec = ExplicitVRLittleEndianDecoder;
        let mut reader = ByteReader::new(RAW, Endianness::Little);
        let cancel = || true;
        let opts = ParseOptions { cancel: Some(&cancel), ..ParseOptions::default() };
        let outcome = parse_data_set(&mut reader, &dec, SpecificCharacterSet::ISO_IR_6, &opts).unwrap();
        assert!(outcome.was_cancelled());
        assert!(outcome.into_elements().is_empty());
    }
}
