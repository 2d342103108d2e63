//! Text codecs for the specific character sets DICOM strings may be encoded
//! in, as named by the `SpecificCharacterSet` (0008,0005) element.
//!
//! Only the single-designator case is supported: one character set active
//! for the whole value. ISO 2022 code-extension escape sequences that
//! switch designators mid-value are out of scope; a `SpecificCharacterSet`
//! naming more than one value falls back to its first recognized entry.

use encoding::all::{GB18030, ISO_8859_1, ISO_8859_2, ISO_8859_3, ISO_8859_4, ISO_8859_5, UTF_8};
use encoding::{DecoderTrap, EncoderTrap, Encoding, RawDecoder, StringWriter};
use snafu::{Backtrace, Snafu};
use std::borrow::Cow;

/// An error produced while encoding text into its on-disk byte form.
#[derive(Debug, Snafu)]
#[snafu(display("{message}"))]
pub struct EncodeTextError {
    message: Cow<'static, str>,
    backtrace: Backtrace,
}

/// An error produced while decoding on-disk bytes into text.
#[derive(Debug, Snafu)]
#[snafu(display("{message}"))]
pub struct DecodeTextError {
    message: Cow<'static, str>,
    backtrace: Backtrace,
}

type EncodeResult<T> = Result<T, EncodeTextError>;
type DecodeResult<T> = Result<T, DecodeTextError>;

/// A text codec for one DICOM character repertoire.
pub trait TextCodec {
    /// The defined term naming this codec, as it would appear in a
    /// Specific Character Set (0008,0005) value.
    fn name(&self) -> Cow<'static, str>;

    /// Decode a byte buffer into text. The result may still contain `\`
    /// delimiters between multiple values.
    fn decode(&self, text: &[u8]) -> DecodeResult<String>;

    /// Encode text, which may itself use `\` to delimit multiple values.
    fn encode(&self, text: &str) -> EncodeResult<Vec<u8>>;
}

/// The specific character set named by a data set's (0008,0005) element.
///
/// Defaults to [`SpecificCharacterSet::ISO_IR_6`], the repertoire implied
/// when the element is absent.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SpecificCharacterSet(Repertoire);

impl SpecificCharacterSet {
    /// ISO-IR 6: the default repertoire (essentially ASCII).
    pub const ISO_IR_6: SpecificCharacterSet = SpecificCharacterSet(Repertoire::Default);
    /// ISO-IR 100 (ISO 8859-1): Western Europe.
    pub const ISO_IR_100: SpecificCharacterSet = SpecificCharacterSet(Repertoire::IsoIr100);
    /// ISO-IR 192: UTF-8.
    pub const ISO_IR_192: SpecificCharacterSet = SpecificCharacterSet(Repertoire::IsoIr192);

    /// Resolve a character set from one value of (0008,0005).
    ///
    /// When `code` names several designators separated by `\` (the ISO 2022
    /// code-extension form), only the first recognized one is honored.
    pub fn from_code(code: &str) -> Option<Self> {
        code.split('\\').find_map(|part| Repertoire::from_code(part.trim())).map(SpecificCharacterSet)
    }
}

impl TextCodec for SpecificCharacterSet {
    fn name(&self) -> Cow<'static, str> {
        self.0.name()
    }

    fn decode(&self, text: &[u8]) -> DecodeResult<String> {
        self.0.decode(text)
    }

    fn encode(&self, text: &str) -> EncodeResult<Vec<u8>> {
        self.0.encode(text)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Repertoire {
    #[default]
    Default,
    IsoIr100,
    IsoIr101,
    IsoIr109,
    IsoIr110,
    IsoIr144,
    IsoIr192,
    Gb18030,
}

impl Repertoire {
    fn from_code(code: &str) -> Option<Self> {
        use Repertoire::*;
        match code {
            "" | "ISO_IR 6" | "ISO 2022 IR 6" => Some(Default),
            "ISO_IR 100" | "ISO 2022 IR 100" => Some(IsoIr100),
            "ISO_IR 101" | "ISO 2022 IR 101" => Some(IsoIr101),
            "ISO_IR 109" | "ISO 2022 IR 109" => Some(IsoIr109),
            "ISO_IR 110" | "ISO 2022 IR 110" => Some(IsoIr110),
            "ISO_IR 144" | "ISO 2022 IR 144" => Some(IsoIr144),
            "ISO_IR 192" => Some(IsoIr192),
            "GB18030" => Some(Gb18030),
            _ => None,
        }
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed(match self {
            Repertoire::Default => "ISO_IR 6",
            Repertoire::IsoIr100 => "ISO_IR 100",
            Repertoire::IsoIr101 => "ISO_IR 101",
            Repertoire::IsoIr109 => "ISO_IR 109",
            Repertoire::IsoIr110 => "ISO_IR 110",
            Repertoire::IsoIr144 => "ISO_IR 144",
            Repertoire::IsoIr192 => "ISO_IR 192",
            Repertoire::Gb18030 => "GB18030",
        })
    }
}

fn decode_text_trap(_decoder: &mut dyn RawDecoder, input: &[u8], output: &mut dyn StringWriter) -> bool {
    let c = input[0];
    output.write_char('\\');
    output.write_char(((c & 192) >> 6) as char);
    output.write_char(((c & 56) >> 3) as char);
    output.write_char((c & 7) as char);
    true
}

impl TextCodec for Repertoire {
    fn name(&self) -> Cow<'static, str> {
        Repertoire::name(self)
    }

    fn decode(&self, text: &[u8]) -> DecodeResult<String> {
        let encoding: &dyn Encoding = match self {
            Repertoire::Default | Repertoire::IsoIr100 => ISO_8859_1,
            Repertoire::IsoIr101 => ISO_8859_2,
            Repertoire::IsoIr109 => ISO_8859_3,
            Repertoire::IsoIr110 => ISO_8859_4,
            Repertoire::IsoIr144 => ISO_8859_5,
            Repertoire::IsoIr192 => UTF_8,
            Repertoire::Gb18030 => GB18030,
        };
        encoding.decode(text, DecoderTrap::Call(decode_text_trap)).map_err(|message| DecodeTextSnafu { message }.build())
    }

    fn encode(&self, text: &str) -> EncodeResult<Vec<u8>> {
        let encoding: &dyn Encoding = match self {
            Repertoire::Default | Repertoire::IsoIr100 => ISO_8859_1,
            Repertoire::IsoIr101 => ISO_8859_2,
            Repertoire::IsoIr109 => ISO_8859_3,
            Repertoire::IsoIr110 => ISO_8859_4,
            Repertoire::IsoIr144 => ISO_8859_5,
            Repertoire::IsoIr192 => UTF_8,
            Repertoire::Gb18030 => GB18030,
        };
        encoding.encode(text, EncoderTrap::Strict).map_err(|message| EncodeTextSnafu { message }.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_charset_round_trips_ascii() {
        let cs = SpecificCharacterSet::ISO_IR_6;
        let bytes = cs.encode("Doe^John").unwrap();
        assert_eq!(cs.decode(&bytes).unwrap(), "Doe^John");
    }

    #[test]
    fn from_code_recognizes_latin1() {
        let cs = SpecificCharacterSet::from_code("ISO_IR 100").unwrap();
        assert_eq!(cs, SpecificCharacterSet::ISO_IR_100);
        assert_eq!(cs.name(), "ISO_IR 100");
    }

    #[test]
    fn from_code_falls_back_to_first_recognized_designator() {
        let cs = SpecificCharacterSet::from_code("\\ISO_IR 100").unwrap();
        assert_eq!(cs, SpecificCharacterSet::ISO_IR_6);
    }

    #[test]
    fn utf8_decodes_multibyte_text() {
        let cs = SpecificCharacterSet::ISO_IR_192;
        let bytes = "山田".as_bytes().to_vec();
        assert_eq!(cs.decode(&bytes).unwrap(), "山田");
    }
}
