//! The built-in table of known transfer syntaxes.

use dcmk_dictionary_std::uids;
use dcmk_encoding::transfer_syntax::{Codec, Endianness, TransferSyntax};

pub const IMPLICIT_VR_LITTLE_ENDIAN: TransferSyntax =
    TransferSyntax::new(uids::IMPLICIT_VR_LITTLE_ENDIAN, "Implicit VR Little Endian", Endianness::Little, false, Codec::None);

pub const EXPLICIT_VR_LITTLE_ENDIAN: TransferSyntax =
    TransferSyntax::new(uids::EXPLICIT_VR_LITTLE_ENDIAN, "Explicit VR Little Endian", Endianness::Little, true, Codec::None);

#[allow(deprecated)]
pub const EXPLICIT_VR_BIG_ENDIAN: TransferSyntax =
    TransferSyntax::new(uids::EXPLICIT_VR_BIG_ENDIAN, "Explicit VR Big Endian", Endianness::Big, true, Codec::None);

pub const DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN: TransferSyntax = TransferSyntax::new(
    uids::DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN,
    "Deflated Explicit VR Little Endian",
    Endianness::Little,
    true,
    Codec::Deflated,
);

pub const JPEG_BASELINE8_BIT: TransferSyntax =
    TransferSyntax::new(uids::JPEG_BASELINE8_BIT, "JPEG Baseline (Process 1)", Endianness::Little, true, Codec::EncapsulatedPixelData);

pub const JPEG_LOSSLESS_SV1: TransferSyntax = TransferSyntax::new(
    uids::JPEG_LOSSLESS_SV1,
    "JPEG Lossless, Non-Hierarchical, First-Order Prediction",
    Endianness::Little,
    true,
    Codec::EncapsulatedPixelData,
);

pub const JPEG_LS_LOSSLESS: TransferSyntax = TransferSyntax::new(
    uids::JPEG_LS_LOSSLESS,
    "JPEG-LS Lossless Image Compression",
    Endianness::Little,
    true,
    Codec::EncapsulatedPixelData,
);

pub const JPEG2000_LOSSLESS: TransferSyntax = TransferSyntax::new(
    uids::JPEG2000_LOSSLESS,
    "JPEG 2000 Image Compression (Lossless Only)",
    Endianness::Little,
    true,
    Codec::EncapsulatedPixelData,
);

pub const JPEG2000: TransferSyntax =
    TransferSyntax::new(uids::JPEG2000, "JPEG 2000 Image Compression", Endianness::Little, true, Codec::EncapsulatedPixelData);

pub const RLE_LOSSLESS: TransferSyntax =
    TransferSyntax::new(uids::RLE_LOSSLESS, "RLE Lossless", Endianness::Little, true, Codec::EncapsulatedPixelData);

/// All transfer syntaxes known to this crate at compile time.
pub const BUILT_IN: &[TransferSyntax] = &[
    IMPLICIT_VR_LITTLE_ENDIAN,
    EXPLICIT_VR_LITTLE_ENDIAN,
    EXPLICIT_VR_BIG_ENDIAN,
    DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN,
    JPEG_BASELINE8_BIT,
    JPEG_LOSSLESS_SV1,
    JPEG_LS_LOSSLESS,
    JPEG2000_LOSSLESS,
    JPEG2000,
    RLE_LOSSLESS,
];
