//! The DICOM transfer syntax descriptor and its registry contract.
//!
//! This crate does not host the catalog of known transfer syntaxes itself
//! — that lives in `dcmk-transfer-syntax-registry`, which implements
//! [`TransferSyntaxIndex`]. Keeping the descriptor and the index trait here
//! lets the parser and object crates depend on the concept without pulling
//! in the registry's static table when they only need to decode a single,
//! already-known transfer syntax.

use crate::decode::{
    default_reader, file_header_decoder, Decode, ExplicitVRBigEndianDecoder, ExplicitVRLittleEndianDecoder,
    ImplicitVRLittleEndianDecoder,
};
use crate::encode::{file_header_encoder, Encode, ExplicitVRLittleEndianEncoder, ImplicitVRLittleEndianEncoder};
pub use byteordered::Endianness;

/// What a transfer syntax requires beyond a plain data set codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// Pixel data, if present, is native (unencapsulated).
    None,
    /// Pixel data is encapsulated in fragments and requires a pixel data
    /// codec (see `dcmk-pixeldata`) to decode into a native form.
    EncapsulatedPixelData,
    /// The data set bytes themselves are deflated (RFC 1951) after the file
    /// meta group, as in Deflated Explicit VR Little Endian.
    Deflated,
}

/// A DICOM transfer syntax specifier: byte order, VR explicitness and
/// codec requirements, together with the decoder/encoder pair that
/// implements them.
#[derive(Debug, Clone, Copy)]
pub struct TransferSyntax {
    uid: &'static str,
    name: &'static str,
    byte_order: Endianness,
    explicit_vr: bool,
    codec: Codec,
}

impl TransferSyntax {
    /// Build a new transfer syntax descriptor.
    pub const fn new(uid: &'static str, name: &'static str, byte_order: Endianness, explicit_vr: bool, codec: Codec) -> Self {
        TransferSyntax { uid, name, byte_order, explicit_vr, codec }
    }

    /// This transfer syntax' unique identifier.
    pub const fn uid(&self) -> &'static str {
        self.uid
    }

    /// A short human-readable name.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The data set's byte order.
    pub const fn endianness(&self) -> Endianness {
        self.byte_order
    }

    /// Whether value representations are written explicitly.
    pub const fn is_explicit_vr(&self) -> bool {
        self.explicit_vr
    }

    /// Whether the data set bytes are deflated after the file meta group.
    pub const fn is_deflated(&self) -> bool {
        matches!(self.codec, Codec::Deflated)
    }

    /// Whether pixel data, if present, is encapsulated.
    pub const fn is_encapsulated(&self) -> bool {
        matches!(self.codec, Codec::EncapsulatedPixelData)
    }

    /// This transfer syntax' codec requirements.
    pub const fn codec(&self) -> Codec {
        self.codec
    }

    /// Obtain a boxed data element decoder for this transfer syntax,
    /// resolving implicit VRs against the standard dictionary.
    ///
    /// Use [`ImplicitVRLittleEndianDecoder::with_dict`](crate::decode::ImplicitVRLittleEndianDecoder::with_dict)
    /// directly when a custom dictionary is needed instead.
    pub fn decoder(&self) -> Box<dyn Decode> {
        if !self.explicit_vr {
            return Box::new(default_reader());
        }
        match self.byte_order {
            Endianness::Little => Box::new(ExplicitVRLittleEndianDecoder),
            Endianness::Big => Box::new(ExplicitVRBigEndianDecoder),
        }
    }

    /// Obtain a boxed data element encoder for this transfer syntax.
    ///
    /// Only the two non-retired, non-deflated transfer syntaxes this
    /// toolkit writes (Explicit/Implicit VR Little Endian) produce an
    /// encoder; anything else returns `None`.
    pub fn encoder(&self) -> Option<Box<dyn Encode>> {
        match (self.explicit_vr, self.byte_order) {
            (true, Endianness::Little) => Some(Box::new(ExplicitVRLittleEndianEncoder)),
            (false, Endianness::Little) => Some(Box::new(ImplicitVRLittleEndianEncoder)),
            _ => None,
        }
    }
}

impl PartialEq for TransferSyntax {
    fn eq(&self, other: &Self) -> bool {
        self.uid == other.uid
    }
}

impl Eq for TransferSyntax {}

/// A container of known transfer syntax descriptors, looked up by UID.
///
/// Implementations should tolerate a trailing NUL or whitespace in `uid`,
/// since UI-VR values are padded to an even length with `\0`.
pub trait TransferSyntaxIndex {
    /// Look up a transfer syntax by its UID.
    fn get(&self, uid: &str) -> Option<&TransferSyntax>;
}

/// The decoder/encoder pair mandated for a DICOM file's meta information
/// group, which is always Explicit VR Little Endian.
pub fn file_meta_transfer_syntax() -> (ExplicitVRLittleEndianDecoder, ExplicitVRLittleEndianEncoder) {
    (file_header_decoder(), file_header_encoder())
}

/// Strip a trailing NUL/whitespace padding from a transfer syntax UID, as
/// commonly found in UI-VR element values.
pub fn trim_uid(uid: &str) -> &str {
    uid.trim_end_matches(['\0', ' '])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_nul_padded_uid() {
        assert_eq!(trim_uid("1.2.840.10008.1.2.1\0"), "1.2.840.10008.1.2.1");
    }

    #[test]
    fn implicit_le_descriptor_reports_codec() {
        let ts = TransferSyntax::new("1.2.840.10008.1.2", "Implicit VR Little Endian", Endianness::Little, false, Codec::None);
        assert!(!ts.is_explicit_vr());
        assert!(!ts.is_deflated());
        assert!(ts.encoder().is_some());
    }
}
