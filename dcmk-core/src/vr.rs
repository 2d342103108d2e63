//! The DICOM Value Representation (VR) registry.

use std::fmt;
use std::str::FromStr;

/// A DICOM value representation code.
///
/// Each variant fixes how a data element's value is laid out on disk and
/// how it should be interpreted: as text, a binary numeric array, raw
/// opaque bytes, or a nested sequence.
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone, Ord, PartialOrd)]
#[allow(missing_docs)]
pub enum VR {
    AE,
    AS,
    AT,
    CS,
    DA,
    DS,
    DT,
    FL,
    FD,
    IS,
    LO,
    LT,
    OB,
    OD,
    OF,
    OL,
    OW,
    PN,
    SH,
    SL,
    SQ,
    SS,
    ST,
    TM,
    UI,
    UL,
    UN,
    US,
    UT,
}

/// How a VR's on-disk value is ultimately interpreted once decoded.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum ValueKind {
    /// A `\`-delimited list of text strings.
    Text,
    /// A fixed-width array of binary numbers.
    BinaryNumeric,
    /// Opaque raw bytes (or, for `SQ`, a list of nested data sets).
    Binary,
    /// A sequence of items, each a nested data set.
    Sequence,
}

impl VR {
    /// All 29 value representations recognized by this registry.
    pub const ALL: [VR; 29] = [
        VR::AE,
        VR::AS,
        VR::AT,
        VR::CS,
        VR::DA,
        VR::DS,
        VR::DT,
        VR::FL,
        VR::FD,
        VR::IS,
        VR::LO,
        VR::LT,
        VR::OB,
        VR::OD,
        VR::OF,
        VR::OL,
        VR::OW,
        VR::PN,
        VR::SH,
        VR::SL,
        VR::SQ,
        VR::SS,
        VR::ST,
        VR::TM,
        VR::UI,
        VR::UL,
        VR::UN,
        VR::US,
        VR::UT,
    ];

    /// Parse a VR from its two raw ASCII bytes, as found on disk.
    pub fn from_binary(chars: [u8; 2]) -> Option<Self> {
        std::str::from_utf8(&chars).ok().and_then(|s| VR::from_str(s).ok())
    }

    /// This VR's two-letter code as bytes.
    pub fn to_bytes(self) -> [u8; 2] {
        let s = self.as_str().as_bytes();
        [s[0], s[1]]
    }

    /// This VR's two-letter code.
    pub fn as_str(self) -> &'static str {
        use VR::*;
        match self {
            AE => "AE",
            AS => "AS",
            AT => "AT",
            CS => "CS",
            DA => "DA",
            DS => "DS",
            DT => "DT",
            FL => "FL",
            FD => "FD",
            IS => "IS",
            LO => "LO",
            LT => "LT",
            OB => "OB",
            OD => "OD",
            OF => "OF",
            OL => "OL",
            OW => "OW",
            PN => "PN",
            SH => "SH",
            SL => "SL",
            SQ => "SQ",
            SS => "SS",
            ST => "ST",
            TM => "TM",
            UI => "UI",
            UL => "UL",
            UN => "UN",
            US => "US",
            UT => "UT",
        }
    }

    /// Whether this VR uses the "long form" explicit-VR length encoding:
    /// 2 reserved bytes followed by a 4-byte length, instead of a plain
    /// 2-byte length.
    pub fn is_long_form(self) -> bool {
        matches!(self, VR::OB | VR::OD | VR::OF | VR::OL | VR::OW | VR::SQ | VR::UN | VR::UT)
    }

    /// How values of this VR are ultimately interpreted.
    pub fn value_kind(self) -> ValueKind {
        use VR::*;
        match self {
            SQ => ValueKind::Sequence,
            OB | OD | OF | OL | OW | UN => ValueKind::Binary,
            US | SS | UL | SL | FL | FD | AT => ValueKind::BinaryNumeric,
            _ => ValueKind::Text,
        }
    }

    /// The padding byte used to bring an odd-length value to an even length.
    pub fn padding_byte(self) -> u8 {
        match self {
            VR::UI => 0x00,
            _ => b' ',
        }
    }

    /// The maximum number of characters a single text value of this VR
    /// may contain, per the standard, if bounded.
    pub fn max_length(self) -> Option<usize> {
        use VR::*;
        match self {
            AE => Some(16),
            AS => Some(4),
            CS => Some(16),
            DA => Some(8),
            DS => Some(16),
            DT => Some(26),
            IS => Some(12),
            LO => Some(64),
            SH => Some(16),
            TM => Some(16),
            UI => Some(64),
            _ => None,
        }
    }

    /// Whether this VR is always restricted to 7-bit ASCII regardless of
    /// `SpecificCharacterSet`.
    pub fn is_always_ascii(self) -> bool {
        matches!(
            self,
            VR::AE | VR::AS | VR::CS | VR::DA | VR::DS | VR::DT | VR::IS | VR::TM | VR::UI
        )
    }
}

impl FromStr for VR {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use VR::*;
        Ok(match s {
            "AE" => AE,
            "AS" => AS,
            "AT" => AT,
            "CS" => CS,
            "DA" => DA,
            "DS" => DS,
            "DT" => DT,
            "FL" => FL,
            "FD" => FD,
            "IS" => IS,
            "LO" => LO,
            "LT" => LT,
            "OB" => OB,
            "OD" => OD,
            "OF" => OF,
            "OL" => OL,
            "OW" => OW,
            "PN" => PN,
            "SH" => SH,
            "SL" => SL,
            "SQ" => SQ,
            "SS" => SS,
            "ST" => ST,
            "TM" => TM,
            "UI" => UI,
            "UL" => UL,
            "UN" => UN,
            "US" => US,
            "UT" => UT,
            _ => return Err("not a recognized value representation"),
        })
    }
}

impl fmt::Display for VR {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        for vr in VR::ALL {
            assert_eq!(VR::from_binary(vr.to_bytes()), Some(vr));
        }
    }

    #[test]
    fn long_form_vrs_match_spec_list() {
        for vr in [VR::OB, VR::OD, VR::OF, VR::OL, VR::OW, VR::SQ, VR::UN, VR::UT] {
            assert!(vr.is_long_form(), "{vr} should be long-form");
        }
        for vr in [VR::US, VR::SS, VR::CS, VR::PN, VR::DA] {
            assert!(!vr.is_long_form(), "{vr} should not be long-form");
        }
    }

    #[test]
    fn invalid_code_rejected() {
        assert!(VR::from_binary(*b"ZZ").is_none());
    }
}
