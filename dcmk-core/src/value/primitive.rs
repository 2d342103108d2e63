//! [`PrimitiveValue`], the decoded form of any non-sequence data element.

use super::deserialize::{parse_date, parse_datetime, parse_time};
use super::C;
use crate::error::{CastValueSnafu, ConvertValueSnafu};
use crate::Length;
use crate::Tag;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use snafu::OptionExt;
use std::borrow::Cow;
use std::fmt;

/// A tag identifying which variant of [`PrimitiveValue`] is held, used in
/// cast/convert error messages without borrowing the value itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ValueType {
    Empty,
    Strs,
    Str,
    Tags,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Date,
    DateTime,
    Time,
}

/// The decoded value of a non-sequence DICOM data element.
///
/// Multiple values are held in a [`C`] (a small-vector), so a single-valued
/// element does not require a heap allocation.
#[derive(Debug, PartialEq, Clone)]
pub enum PrimitiveValue {
    /// No data (zero-length value).
    Empty,
    /// A sequence of text strings: AE, AS, PN, SH, CS, LO, UI, IS, DS (when
    /// format-preserving), and other text VRs with multiplicity.
    Strs(C<String>),
    /// A single unbounded string: ST, LT, UT.
    Str(String),
    /// A sequence of attribute tags (AT).
    Tags(C<Tag>),
    /// Raw or unsigned byte octets (OB, UN).
    U8(C<u8>),
    /// Signed 16-bit integers (SS).
    I16(C<i16>),
    /// Unsigned 16-bit integers (US, OW).
    U16(C<u16>),
    /// Signed 32-bit integers (SL, IS when numeric).
    I32(C<i32>),
    /// Unsigned 32-bit integers (UL, OL).
    U32(C<u32>),
    /// Signed 64-bit integers.
    I64(C<i64>),
    /// Unsigned 64-bit integers.
    U64(C<u64>),
    /// 32-bit floating point numbers (FL, OF).
    F32(C<f32>),
    /// 64-bit floating point numbers (FD, OD, DS when numeric).
    F64(C<f64>),
    /// Parsed dates (DA).
    Date(C<NaiveDate>),
    /// Parsed date-times (DT).
    DateTime(C<DateTime<FixedOffset>>),
    /// Parsed times (TM).
    Time(C<NaiveTime>),
}

macro_rules! from_single {
    ($t:ty, $variant:ident) => {
        impl From<$t> for PrimitiveValue {
            fn from(v: $t) -> Self {
                PrimitiveValue::$variant(C::from_elem(v, 1))
            }
        }
    };
}

from_single!(u8, U8);
from_single!(u16, U16);
from_single!(i16, I16);
from_single!(u32, U32);
from_single!(i32, I32);
from_single!(u64, U64);
from_single!(i64, I64);
from_single!(f32, F32);
from_single!(f64, F64);
from_single!(Tag, Tags);

impl From<String> for PrimitiveValue {
    fn from(v: String) -> Self {
        PrimitiveValue::Strs(C::from_elem(v, 1))
    }
}

impl From<&str> for PrimitiveValue {
    fn from(v: &str) -> Self {
        PrimitiveValue::from(v.to_string())
    }
}

impl PrimitiveValue {
    /// The number of individual values held (item count for multi-valued
    /// variants, 1 for `Str`, 0 for `Empty`).
    pub fn multiplicity(&self) -> u32 {
        match self {
            PrimitiveValue::Empty => 0,
            PrimitiveValue::Str(_) => 1,
            PrimitiveValue::Strs(c) => c.len() as u32,
            PrimitiveValue::Tags(c) => c.len() as u32,
            PrimitiveValue::U8(c) => c.len() as u32,
            PrimitiveValue::I16(c) => c.len() as u32,
            PrimitiveValue::U16(c) => c.len() as u32,
            PrimitiveValue::I32(c) => c.len() as u32,
            PrimitiveValue::U32(c) => c.len() as u32,
            PrimitiveValue::I64(c) => c.len() as u32,
            PrimitiveValue::U64(c) => c.len() as u32,
            PrimitiveValue::F32(c) => c.len() as u32,
            PrimitiveValue::F64(c) => c.len() as u32,
            PrimitiveValue::Date(c) => c.len() as u32,
            PrimitiveValue::DateTime(c) => c.len() as u32,
            PrimitiveValue::Time(c) => c.len() as u32,
        }
    }

    /// This value's type tag, for error reporting.
    pub fn value_type(&self) -> ValueType {
        match self {
            PrimitiveValue::Empty => ValueType::Empty,
            PrimitiveValue::Strs(_) => ValueType::Strs,
            PrimitiveValue::Str(_) => ValueType::Str,
            PrimitiveValue::Tags(_) => ValueType::Tags,
            PrimitiveValue::U8(_) => ValueType::U8,
            PrimitiveValue::I16(_) => ValueType::I16,
            PrimitiveValue::U16(_) => ValueType::U16,
            PrimitiveValue::I32(_) => ValueType::I32,
            PrimitiveValue::U32(_) => ValueType::U32,
            PrimitiveValue::I64(_) => ValueType::I64,
            PrimitiveValue::U64(_) => ValueType::U64,
            PrimitiveValue::F32(_) => ValueType::F32,
            PrimitiveValue::F64(_) => ValueType::F64,
            PrimitiveValue::Date(_) => ValueType::Date,
            PrimitiveValue::DateTime(_) => ValueType::DateTime,
            PrimitiveValue::Time(_) => ValueType::Time,
        }
    }

    /// The length this value would occupy if re-encoded, in bytes
    /// (even-padded).
    pub fn calculate_byte_len(&self) -> Length {
        let raw = match self {
            PrimitiveValue::Empty => 0,
            PrimitiveValue::Str(s) => s.len(),
            PrimitiveValue::Strs(c) => {
                let joined: usize = c.iter().map(|s| s.len()).sum();
                joined + c.len().saturating_sub(1)
            }
            PrimitiveValue::Tags(c) => c.len() * 4,
            PrimitiveValue::U8(c) => c.len(),
            PrimitiveValue::I16(c) => c.len() * 2,
            PrimitiveValue::U16(c) => c.len() * 2,
            PrimitiveValue::I32(c) => c.len() * 4,
            PrimitiveValue::U32(c) => c.len() * 4,
            PrimitiveValue::I64(c) => c.len() * 8,
            PrimitiveValue::U64(c) => c.len() * 8,
            PrimitiveValue::F32(c) => c.len() * 4,
            PrimitiveValue::F64(c) => c.len() * 8,
            PrimitiveValue::Date(c) => c.len() * 8,
            PrimitiveValue::DateTime(c) => c.len() * 26,
            PrimitiveValue::Time(c) => c.len() * 13,
        };
        Length::defined((raw + (raw % 2)) as u32)
    }

    /// Read this value as a single string, joining multiple values with `\`.
    pub fn to_str(&self) -> Result<Cow<'_, str>, crate::error::CastValueError> {
        match self {
            PrimitiveValue::Str(s) => Ok(Cow::Borrowed(s)),
            PrimitiveValue::Strs(c) if c.len() == 1 => Ok(Cow::Borrowed(&c[0])),
            PrimitiveValue::Strs(c) => Ok(Cow::Owned(c.join("\\"))),
            PrimitiveValue::Empty => Ok(Cow::Borrowed("")),
            _ => CastValueSnafu { requested: "string", got: self.value_type() }.fail(),
        }
    }

    /// Read this value as a list of strings.
    pub fn to_multi_str(&self) -> Result<Cow<'_, [String]>, crate::error::CastValueError> {
        match self {
            PrimitiveValue::Strs(c) => Ok(Cow::Borrowed(c)),
            PrimitiveValue::Str(s) => Ok(Cow::Owned(vec![s.clone()])),
            PrimitiveValue::Empty => Ok(Cow::Owned(vec![])),
            _ => CastValueSnafu { requested: "string list", got: self.value_type() }.fail(),
        }
    }

    /// Interpret this value as a sequence of `u16`s (US, OW).
    pub fn u16_slice(&self) -> Result<&[u16], crate::error::CastValueError> {
        match self {
            PrimitiveValue::U16(c) => Ok(c),
            _ => CastValueSnafu { requested: "u16", got: self.value_type() }.fail(),
        }
    }

    /// Interpret this value as a sequence of `f64`s (FD, OD, or DS parsed
    /// numerically).
    pub fn f64_slice(&self) -> Result<Cow<'_, [f64]>, crate::error::ConvertValueError> {
        match self {
            PrimitiveValue::F64(c) => Ok(Cow::Borrowed(c)),
            PrimitiveValue::F32(c) => Ok(Cow::Owned(c.iter().map(|&v| v as f64).collect())),
            PrimitiveValue::I32(c) => Ok(Cow::Owned(c.iter().map(|&v| v as f64).collect())),
            PrimitiveValue::U32(c) => Ok(Cow::Owned(c.iter().map(|&v| v as f64).collect())),
            PrimitiveValue::Strs(c) => c
                .iter()
                .map(|s| s.trim().parse().ok())
                .collect::<Option<Vec<f64>>>()
                .map(Cow::Owned)
                .context(ConvertValueSnafu { requested: "f64", got: self.value_type() }),
            _ => ConvertValueSnafu { requested: "f64", got: self.value_type() }.fail(),
        }
    }

    /// Interpret this value as a single `f64`.
    pub fn to_f64(&self) -> Result<f64, crate::error::ConvertValueError> {
        self.f64_slice()?.first().copied().ok_or_else(|| {
            ConvertValueSnafu { requested: "f64", got: self.value_type() }.build()
        })
    }

    /// Interpret this value as a sequence of `i32`s (SL, or IS parsed
    /// numerically).
    pub fn i32_slice(&self) -> Result<Cow<'_, [i32]>, crate::error::ConvertValueError> {
        match self {
            PrimitiveValue::I32(c) => Ok(Cow::Borrowed(c)),
            PrimitiveValue::U16(c) => Ok(Cow::Owned(c.iter().map(|&v| v as i32).collect())),
            PrimitiveValue::I16(c) => Ok(Cow::Owned(c.iter().map(|&v| v as i32).collect())),
            PrimitiveValue::Strs(c) => c
                .iter()
                .map(|s| s.trim().parse().ok())
                .collect::<Option<Vec<i32>>>()
                .map(Cow::Owned)
                .context(ConvertValueSnafu { requested: "i32", got: self.value_type() }),
            _ => ConvertValueSnafu { requested: "i32", got: self.value_type() }.fail(),
        }
    }

    /// Parse this value as a list of DICOM dates (DA).
    pub fn to_dates(&self) -> Result<Vec<NaiveDate>, super::DeserializeError> {
        match self {
            PrimitiveValue::Date(c) => Ok(c.to_vec()),
            PrimitiveValue::Strs(c) => c.iter().map(|s| Ok(parse_date(s.as_bytes())?.0)).collect(),
            PrimitiveValue::Str(s) => Ok(vec![parse_date(s.as_bytes())?.0]),
            _ => Ok(vec![]),
        }
    }

    /// Parse this value as a list of DICOM times (TM).
    pub fn to_times(&self) -> Result<Vec<NaiveTime>, super::DeserializeError> {
        match self {
            PrimitiveValue::Time(c) => Ok(c.to_vec()),
            PrimitiveValue::Strs(c) => c.iter().map(|s| Ok(parse_time(s.as_bytes())?.0)).collect(),
            PrimitiveValue::Str(s) => Ok(vec![parse_time(s.as_bytes())?.0]),
            _ => Ok(vec![]),
        }
    }

    /// Parse this value as a list of DICOM date-times (DT).
    pub fn to_datetimes(
        &self,
        default_offset: FixedOffset,
    ) -> Result<Vec<DateTime<FixedOffset>>, super::DeserializeError> {
        match self {
            PrimitiveValue::DateTime(c) => Ok(c.to_vec()),
            PrimitiveValue::Strs(c) => c
                .iter()
                .map(|s| Ok(parse_datetime(s.as_bytes(), default_offset)?))
                .collect(),
            PrimitiveValue::Str(s) => Ok(vec![parse_datetime(s.as_bytes(), default_offset)?]),
            _ => Ok(vec![]),
        }
    }
}

impl fmt::Display for PrimitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.to_str() {
            Ok(s) => f.write_str(&s),
            Err(_) => write!(f, "<{:?}>", self.value_type()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_value_joins_as_is() {
        let v = PrimitiveValue::from("DOE^JANE");
        assert_eq!(v.to_str().unwrap(), "DOE^JANE");
    }

    #[test]
    fn multi_value_join_uses_backslash() {
        let v = PrimitiveValue::Strs(C::from_vec(vec!["1.2.3".into(), "1.2.4".into()]));
        assert_eq!(v.to_str().unwrap(), "1.2.3\\1.2.4");
    }

    #[test]
    fn numeric_cast_rejects_text() {
        let v = PrimitiveValue::from("not a number");
        assert!(v.u16_slice().is_err());
    }

    #[test]
    fn ds_strings_convert_to_f64() {
        let v = PrimitiveValue::Strs(C::from_vec(vec!["1.5".into(), "-2".into()]));
        assert_eq!(v.f64_slice().unwrap().as_ref(), &[1.5, -2.0]);
    }
}
