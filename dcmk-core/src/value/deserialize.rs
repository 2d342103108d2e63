//! Parsing of DA/TM/DT/range text values into their typed chrono forms.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone};
use snafu::{Backtrace, OptionExt, Snafu};
use std::ops::{Add, Mul, Sub};

/// Errors arising from parsing a textual date, time or date-time value.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// the text ended before a complete component could be read
    #[snafu(display("unexpected end of element"))]
    UnexpectedEndOfElement {
        /// backtrace
        backtrace: Backtrace,
    },
    /// the date or time component did not form a valid calendar value
    #[snafu(display("invalid date-time zone component"))]
    InvalidDateTimeZone {
        /// backtrace
        backtrace: Backtrace,
    },
    /// hour component out of range
    #[snafu(display("invalid hour component: got {value}, but must be in 0..24"))]
    InvalidDateTimeHour {
        /// the offending value
        value: u32,
        /// backtrace
        backtrace: Backtrace,
    },
    /// minute component out of range
    #[snafu(display("invalid minute component: got {value}, but must be in 0..60"))]
    InvalidDateTimeMinute {
        /// the offending value
        value: u32,
        /// backtrace
        backtrace: Backtrace,
    },
    /// second component out of range
    #[snafu(display("invalid second component: got {value}, but must be in 0..60"))]
    InvalidDateTimeSecond {
        /// the offending value
        value: u32,
        /// backtrace
        backtrace: Backtrace,
    },
    /// fractional-second component out of range
    #[snafu(display("invalid microsecond component: got {value}, but must be in 0..2_000_000"))]
    InvalidDateTimeMicrosecond {
        /// the offending value
        value: u32,
        /// backtrace
        backtrace: Backtrace,
    },
    /// unexpected token following a date component
    #[snafu(display("unexpected token after date: got '{}', but must be '.', '+', or '-'", *value as char))]
    UnexpectedAfterDateToken {
        /// the offending byte
        value: u8,
        /// backtrace
        backtrace: Backtrace,
    },
    /// a numeric run was the wrong length
    #[snafu(display("invalid number length: it is {len}, but must be between 1 and 9"))]
    InvalidNumberLength {
        /// the offending length
        len: usize,
        /// backtrace
        backtrace: Backtrace,
    },
    /// a non-digit byte appeared where a digit was expected
    #[snafu(display("invalid number token: got '{}', but must be a digit in '0'..='9'", *value as char))]
    InvalidNumberToken {
        /// the offending byte
        value: u8,
        /// backtrace
        backtrace: Backtrace,
    },
    /// a UTC offset sign byte was neither `+` nor `-`
    #[snafu(display("invalid time zone sign token: got '{}', but must be '+' or '-'", *value as char))]
    InvalidTimeZoneSignToken {
        /// the offending byte
        value: u8,
        /// backtrace
        backtrace: Backtrace,
    },
    /// a range value had no `-` separator
    #[snafu(display("no range separator present"))]
    NoRangeSeparator {
        /// backtrace
        backtrace: Backtrace,
    },
    /// a range's end preceded its start
    #[snafu(display("end {end} before start {start}"))]
    RangeInversion {
        /// the range start, formatted
        start: String,
        /// the range end, formatted
        end: String,
        /// backtrace
        backtrace: Backtrace,
    },
    /// a range's start and end were identical
    #[snafu(display("start {start} == end {end}"))]
    RangeIsZero {
        /// the range start, formatted
        start: String,
        /// the range end, formatted
        end: String,
        /// backtrace
        backtrace: Backtrace,
    },
}

type Result<T, E = Error> = std::result::Result<T, E>;

/// Decode a single DICOM Date (DA) into a `NaiveDate` value, returning
/// whatever trailing bytes were not consumed.
pub fn parse_date(buf: &[u8]) -> Result<(NaiveDate, &[u8])> {
    // YYYY(MM(DD)?)?
    match buf.len() {
        0 | 5 | 7 => UnexpectedEndOfElementSnafu.fail(),
        4 => {
            let year = read_number(buf)?;
            let date =
                NaiveDate::from_ymd_opt(year, 1, 1).context(InvalidDateTimeZoneSnafu)?;
            Ok((date, &[]))
        }
        6 => {
            let year = read_number(&buf[0..4])?;
            let month: u32 = read_number(&buf[4..6])?;
            let date =
                NaiveDate::from_ymd_opt(year, month, 1).context(InvalidDateTimeZoneSnafu)?;
            Ok((date, &buf[6..]))
        }
        len => {
            debug_assert!(len >= 8);
            let year = read_number(&buf[0..4])?;
            let (month, day, rest) = match buf[4] {
                b'-' | b'+' => (1, 1, &buf[4..]),
                _ => {
                    let m: u32 = read_number(&buf[4..6])?;
                    let (d, r) = match buf[6] {
                        b'-' | b'+' => (1, &buf[6..]),
                        _ => (read_number(&buf[6..8])?, &buf[8..]),
                    };
                    (m, d, r)
                }
            };

            let date = NaiveDate::from_ymd_opt(year, month, day)
                .context(InvalidDateTimeZoneSnafu)?;
            Ok((date, rest))
        }
    }
}

/// Decode a single DICOM Time (TM) into a `NaiveTime` value.
pub fn parse_time(buf: &[u8]) -> Result<(NaiveTime, &[u8])> {
    parse_time_impl(buf, false)
}

fn naive_time_from_components(hour: u32, minute: u32, second: u32, micro: u32) -> Result<NaiveTime> {
    if hour >= 24 {
        return InvalidDateTimeHourSnafu { value: hour }.fail();
    }
    if minute >= 60 {
        return InvalidDateTimeMinuteSnafu { value: minute }.fail();
    }
    if second >= 60 {
        return InvalidDateTimeSecondSnafu { value: second }.fail();
    }
    if micro >= 2_000_000 {
        return InvalidDateTimeMicrosecondSnafu { value: micro }.fail();
    }
    NaiveTime::from_hms_micro_opt(hour, minute, second, micro)
        .context(InvalidDateTimeZoneSnafu)
}

fn parse_time_impl(buf: &[u8], for_datetime: bool) -> Result<(NaiveTime, &[u8])> {
    const Z: i32 = b'0' as i32;
    // HH(MM(SS(.F{1,6})?)?)?

    match buf.len() {
        0 | 1 | 3 | 5 | 7 => UnexpectedEndOfElementSnafu.fail(),
        2 => {
            let hour = (i32::from(buf[0]) - Z) * 10 + i32::from(buf[1]) - Z;
            let time = naive_time_from_components(hour as u32, 0, 0, 0)?;
            Ok((time, &buf[2..]))
        }
        4 => {
            let hour = (i32::from(buf[0]) - Z) * 10 + i32::from(buf[1]) - Z;
            let minute = (i32::from(buf[2]) - Z) * 10 + i32::from(buf[3]) - Z;
            let time = naive_time_from_components(hour as u32, minute as u32, 0, 0)?;
            Ok((time, &buf[4..]))
        }
        6 => {
            let hour = (i32::from(buf[0]) - Z) * 10 + i32::from(buf[1]) - Z;
            let minute = (i32::from(buf[2]) - Z) * 10 + i32::from(buf[3]) - Z;
            let second = (i32::from(buf[4]) - Z) * 10 + i32::from(buf[5]) - Z;
            let time = naive_time_from_components(hour as u32, minute as u32, second as u32, 0)?;
            Ok((time, &buf[6..]))
        }
        _ => {
            let hour = (i32::from(buf[0]) - Z) * 10 + i32::from(buf[1]) - Z;
            let minute = (i32::from(buf[2]) - Z) * 10 + i32::from(buf[3]) - Z;
            let second = (i32::from(buf[4]) - Z) * 10 + i32::from(buf[5]) - Z;
            let (fract, rest) = match buf[6] {
                b'.' => {
                    let buf = &buf[7..];
                    let mut n = usize::min(6, buf.len());
                    if for_datetime {
                        if let Some(i) = buf.iter().position(|v| *v == b'+' || *v == b'-') {
                            n = i;
                        }
                    }
                    let mut fract: u32 = read_number(&buf[0..n])?;
                    let mut acc = n;
                    while acc < 6 {
                        fract *= 10;
                        acc += 1;
                    }
                    (fract, &buf[n..])
                }
                b'+' | b'-' if for_datetime => (0, &buf[6..]),
                c => return UnexpectedAfterDateTokenSnafu { value: c }.fail(),
            };

            let time = naive_time_from_components(hour as u32, minute as u32, second as u32, fract)?;
            Ok((time, rest))
        }
    }
}

/// A type with a decimal base, used to fold ASCII digit runs into an integer.
pub trait Ten {
    /// The value ten, in this type.
    fn ten() -> Self;
}

macro_rules! impl_integral_ten {
    ($t:ty) => {
        impl Ten for $t {
            fn ten() -> Self {
                10
            }
        }
    };
}

macro_rules! impl_floating_ten {
    ($t:ty) => {
        impl Ten for $t {
            fn ten() -> Self {
                10.
            }
        }
    };
}

impl_integral_ten!(i16);
impl_integral_ten!(u16);
impl_integral_ten!(i32);
impl_integral_ten!(u32);
impl_integral_ten!(i64);
impl_integral_ten!(u64);
impl_integral_ten!(isize);
impl_integral_ten!(usize);
impl_floating_ten!(f32);
impl_floating_ten!(f64);

/// Parse an unsigned integer from an ASCII digit run of 1 to 9 bytes.
pub fn read_number<T>(text: &[u8]) -> Result<T>
where
    T: Ten + From<u8> + Add<T, Output = T> + Mul<T, Output = T> + Sub<T, Output = T>,
{
    if text.is_empty() || text.len() > 9 {
        return InvalidNumberLengthSnafu { len: text.len() }.fail();
    }
    if let Some(c) = text.iter().copied().find(|b| !(b'0'..=b'9').contains(b)) {
        return InvalidNumberTokenSnafu { value: c }.fail();
    }

    Ok(read_number_unchecked(text))
}

#[inline]
fn read_number_unchecked<T>(buf: &[u8]) -> T
where
    T: Ten + From<u8> + Add<T, Output = T> + Mul<T, Output = T>,
{
    debug_assert!(!buf.is_empty() && buf.len() < 10);
    buf[1..]
        .iter()
        .fold((buf[0] - b'0').into(), |acc, v| acc * T::ten() + (*v - b'0').into())
}

/// Parse a DICOM date-time (DT) into a `DateTime<FixedOffset>`, assuming
/// `dt_utc_offset` whenever the text carries no explicit UTC offset suffix.
pub fn parse_datetime(buf: &[u8], dt_utc_offset: FixedOffset) -> Result<DateTime<FixedOffset>> {
    let (date, rest) = parse_date(buf)?;
    if buf.len() <= 8 {
        let time = NaiveTime::from_hms_opt(0, 0, 0).expect("midnight is always valid");
        return FixedOffset::east_opt(0)
            .and_then(|o| o.from_local_datetime(&date.and_time(time)).single())
            .context(InvalidDateTimeZoneSnafu);
    }
    let buf = rest;
    let (time, buf) = parse_time_impl(buf, true)
        .unwrap_or((naive_time_from_components(0, 0, 0, 0)?, rest));

    let len = buf.len();
    let offset = match len {
        0 => {
            return dt_utc_offset
                .from_local_datetime(&date.and_time(time))
                .single()
                .context(InvalidDateTimeZoneSnafu);
        }
        5 => {
            let tz_sign = buf[0];
            let buf = &buf[1..];
            let (h_buf, m_buf) = buf.split_at(2);
            let tz_h: i32 = read_number(h_buf)?;
            let tz_m: i32 = read_number(m_buf)?;
            let s = (tz_h * 60 + tz_m) * 60;
            match tz_sign {
                b'+' => FixedOffset::east_opt(s),
                b'-' => FixedOffset::west_opt(s),
                c => return InvalidTimeZoneSignTokenSnafu { value: c }.fail(),
            }
            .context(InvalidDateTimeZoneSnafu)?
        }
        _ => return UnexpectedEndOfElementSnafu.fail(),
    };

    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .context(InvalidDateTimeZoneSnafu)
}

macro_rules! check_range {
    ($s:expr, $e:expr) => {
        if $s == $e {
            RangeIsZeroSnafu { start: $s.to_string(), end: $e.to_string() }.fail()
        } else if $s < $e {
            Ok((Some($s), Some($e)))
        } else {
            RangeInversionSnafu { start: $s.to_string(), end: $e.to_string() }.fail()
        }
    };
}

/// Parse a DICOM date range (`-` separated, either bound optional).
pub fn parse_date_range(buf: &[u8]) -> Result<(Option<NaiveDate>, Option<NaiveDate>)> {
    if buf.len() < 5 {
        return UnexpectedEndOfElementSnafu.fail();
    }

    if let Some(separator) = buf.iter().position(|e| *e == b'-') {
        let (start, end) = buf.split_at(separator);
        let end = &end[1..];
        match separator {
            0 => Ok((None, Some(parse_date(end)?.0))),
            i if i == buf.len() - 1 => Ok((Some(parse_date(start)?.0), None)),
            _ => {
                let (s, e) = (parse_date(start)?.0, parse_date(end)?.0);
                check_range!(s, e)
            }
        }
    } else {
        NoRangeSeparatorSnafu.fail()
    }
}

/// Parse a DICOM time range (`-` separated, either bound optional).
pub fn parse_time_range(buf: &[u8]) -> Result<(Option<NaiveTime>, Option<NaiveTime>)> {
    if buf.len() < 3 {
        return UnexpectedEndOfElementSnafu.fail();
    }

    if let Some(separator) = buf.iter().position(|e| *e == b'-') {
        let (start, end) = buf.split_at(separator);
        let end = &end[1..];
        match separator {
            0 => Ok((None, Some(parse_time(end)?.0))),
            i if i == buf.len() - 1 => Ok((Some(parse_time(start)?.0), None)),
            _ => {
                let (s, e) = (parse_time(start)?.0, parse_time(end)?.0);
                check_range!(s, e)
            }
        }
    } else {
        NoRangeSeparatorSnafu.fail()
    }
}

/// Parse a DICOM date-time range (`-` separated, either bound optional).
pub fn parse_datetime_range(
    buf: &[u8],
    dt_utc_offset: FixedOffset,
) -> Result<(Option<DateTime<FixedOffset>>, Option<DateTime<FixedOffset>>)> {
    if buf.len() < 5 {
        return UnexpectedEndOfElementSnafu.fail();
    }

    let separator = buf
        .iter()
        .enumerate()
        .find(|(i, c)| match **c == b'-' {
            true => match i {
                0 => true,
                x if *x == buf.len() - 1 => true,
                x if *x < buf.len() - 6 => !matches!(buf[x + 5], b'-'),
                4 if buf.len() == 9 => true,
                _ => false,
            },
            false => false,
        })
        .map(|(i, _)| i);

    if let Some(separator) = separator {
        let (start, end) = buf.split_at(separator);
        let end = &end[1..];
        match separator {
            0 => Ok((None, Some(parse_datetime(end, dt_utc_offset)?))),
            i if i == buf.len() - 1 => Ok((Some(parse_datetime(start, dt_utc_offset)?), None)),
            _ => {
                let (s, e) = (
                    parse_datetime(start, dt_utc_offset)?,
                    parse_datetime(end, dt_utc_offset)?,
                );
                check_range!(s, e)
            }
        }
    } else {
        NoRangeSeparatorSnafu.fail()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_date() {
        assert_eq!(
            parse_date(b"20180101").unwrap(),
            (NaiveDate::from_ymd_opt(2018, 1, 1).unwrap(), &[][..])
        );
        assert_eq!(
            parse_date(b"197112").unwrap(),
            (NaiveDate::from_ymd_opt(1971, 12, 1).unwrap(), &[][..])
        );
        assert_eq!(
            parse_date(b"1902").unwrap(),
            (NaiveDate::from_ymd_opt(1902, 1, 1).unwrap(), &[][..])
        );
        assert!(parse_date(b"").is_err());
        assert!(parse_date(b"19991313").is_err());
        assert!(parse_date(b"20180229").is_err());
    }

    #[test]
    fn parses_time_with_fraction() {
        assert_eq!(
            parse_time(b"075501.5").unwrap(),
            (NaiveTime::from_hms_micro_opt(7, 55, 1, 500_000).unwrap(), &[][..])
        );
        assert_eq!(
            parse_time(b"235959.99999").unwrap(),
            (NaiveTime::from_hms_micro_opt(23, 59, 59, 999_990).unwrap(), &[][..])
        );
        assert!(parse_time(b"075501.123......").is_err());
    }

    #[test]
    fn parses_datetime_with_offset() {
        let default_offset = FixedOffset::east_opt(0).unwrap();
        let dt = parse_datetime(b"20171130101010.204+0100", default_offset).unwrap();
        assert_eq!(dt.naive_local().date(), NaiveDate::from_ymd_opt(2017, 11, 30).unwrap());
        assert_eq!(dt.offset().local_minus_utc(), 3600);
    }

    #[test]
    fn date_range_with_open_bounds() {
        assert_eq!(
            parse_date_range(b"-201003").unwrap(),
            (None, Some(NaiveDate::from_ymd_opt(2010, 3, 1).unwrap()))
        );
        assert_eq!(
            parse_date_range(b"20100305-").unwrap(),
            (Some(NaiveDate::from_ymd_opt(2010, 3, 5).unwrap()), None)
        );
        assert!(parse_date_range(b"19140101-19140101").is_err());
    }
}
