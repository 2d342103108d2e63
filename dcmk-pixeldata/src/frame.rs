//! Frame extraction: turning the raw bytes under _Pixel Data_ into one
//! `Vec<u8>` (or bit-unpacked `Vec<u8>` of 0/1 samples) per frame, whether
//! the data is native or encapsulated.

use std::collections::HashMap;

use byteorder::{ByteOrder, LittleEndian};
use dcmk_core::PrimitiveValue;
use dcmk_encoding::transfer_syntax::TransferSyntax;
use dcmk_object::{ElementValue, InMemDicomObject};
use once_cell::sync::OnceCell;
use snafu::OptionExt;

use crate::descriptor::{PixelDataDescriptor, PIXEL_DATA};
use crate::error::{Error, FrameOutOfRangeSnafu, InvalidPixelDataSnafu, RegistrySealedSnafu, UnsupportedTransferSyntaxSnafu};

/// A pluggable decoder for one encapsulated transfer syntax's compressed
/// pixel data fragments.
///
/// Implementations of this trait are what a JPEG, JPEG-LS, JPEG 2000 or RLE
/// codec crate provides; none is implemented here. A [`CodecRegistry`] maps
/// transfer syntax UIDs to the reader that understands them.
pub trait PixelDataReader: Send + Sync {
    /// Decode a single frame's fragments into raw, uncompressed samples
    /// (row-major, following the descriptor's photometric interpretation
    /// and planar configuration).
    fn decode_frame(&self, transfer_syntax: &TransferSyntax, fragments: &[Vec<u8>], descriptor: &PixelDataDescriptor) -> Result<Vec<u8>, Error>;
}

/// A registry of [`PixelDataReader`]s, keyed by transfer syntax UID.
///
/// Codecs are meant to be registered once at startup. The registry seals
/// itself on its first lookup: any [`CodecRegistry::register`] call after
/// that point fails with [`Error::RegistrySealed`], so a codec cannot be
/// swapped out from under a decode already in progress.
#[derive(Default)]
pub struct CodecRegistry {
    codecs: HashMap<String, Box<dyn PixelDataReader>>,
    sealed: OnceCell<()>,
}

impl CodecRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        CodecRegistry { codecs: HashMap::new(), sealed: OnceCell::new() }
    }

    /// Register a codec for the given transfer syntax UID, replacing any
    /// previous registration for the same UID.
    ///
    /// Fails with [`Error::RegistrySealed`] once the registry has served
    /// its first [`CodecRegistry::get`] lookup.
    pub fn register(&mut self, transfer_syntax_uid: impl Into<String>, reader: Box<dyn PixelDataReader>) -> Result<(), Error> {
        let uid = transfer_syntax_uid.into();
        if self.sealed.get().is_some() {
            return RegistrySealedSnafu { uid }.fail();
        }
        self.codecs.insert(uid, reader);
        Ok(())
    }

    /// The codec registered for `uid`, if any. Seals the registry against
    /// further registration.
    pub fn get(&self, uid: &str) -> Option<&dyn PixelDataReader> {
        self.sealed.get_or_init(|| ());
        self.codecs.get(uid).map(|b| b.as_ref())
    }
}

/// Extract one frame's raw sample bytes from an object's pixel data,
/// decoding through a registered codec when the transfer syntax is
/// encapsulated.
pub fn extract_frame(
    obj: &InMemDicomObject,
    descriptor: &PixelDataDescriptor,
    transfer_syntax: &TransferSyntax,
    frame: u32,
    codecs: &CodecRegistry,
) -> Result<Vec<u8>, Error> {
    if frame >= descriptor.number_of_frames {
        return FrameOutOfRangeSnafu { frame, number_of_frames: descriptor.number_of_frames }.fail();
    }

    let element = obj.element(PIXEL_DATA)?;
    match element.value() {
        ElementValue::Value(value) => {
            let primitive = value.primitive().context(InvalidPixelDataSnafu)?;
            let bytes = primitive_value_bytes(primitive)?;

            if descriptor.bits_allocated == 1 {
                let sample_count = descriptor.samples_per_frame();
                let bit_offset = frame as usize * sample_count;
                if bit_offset + sample_count > bytes.len() * 8 {
                    return InvalidPixelDataSnafu.fail();
                }
                return Ok(extract_bit_range(&bytes, bit_offset, sample_count));
            }

            let frame_len = descriptor.uncompressed_frame_byte_len();
            let start = frame as usize * frame_len;
            let end = start + frame_len;
            if end > bytes.len() {
                return InvalidPixelDataSnafu.fail();
            }
            Ok(bytes[start..end].to_vec())
        }
        ElementValue::PixelSequence { offset_table, fragments } => {
            let codec = codecs
                .get(transfer_syntax.uid())
                .context(UnsupportedTransferSyntaxSnafu { uid: transfer_syntax.uid().to_string() })?;
            let frame_fragments = fragments_for_frame(fragments, offset_table, descriptor.number_of_frames, frame)?;
            codec.decode_frame(transfer_syntax, &frame_fragments, descriptor)
        }
    }
}

/// Render a primitive pixel data element's samples as a flat byte buffer:
/// `OB`-held bytes as-is, `OW`-held words as little-endian pairs.
fn primitive_value_bytes(value: &PrimitiveValue) -> Result<Vec<u8>, Error> {
    match value {
        PrimitiveValue::U8(bytes) => Ok(bytes.to_vec()),
        PrimitiveValue::U16(words) => {
            let mut out = vec![0u8; words.len() * 2];
            LittleEndian::write_u16_into(words, &mut out);
            Ok(out)
        }
        _ => InvalidPixelDataSnafu.fail(),
    }
}

/// Split an encapsulated pixel data's fragment list into the fragments that
/// belong to one frame.
///
/// When a non-empty basic offset table is present, each entry names the
/// byte offset (within the concatenated fragment stream, not counting item
/// headers) at which a frame's fragments begin; consecutive offsets bound
/// each frame's fragment run. With a single frame (or an empty offset
/// table and a single frame declared), all fragments belong to that frame.
fn fragments_for_frame(fragments: &[Vec<u8>], offset_table: &[u32], number_of_frames: u32, frame: u32) -> Result<Vec<Vec<u8>>, Error> {
    if number_of_frames <= 1 || offset_table.len() <= 1 {
        return Ok(fragments.to_vec());
    }

    let mut cumulative = Vec::with_capacity(fragments.len());
    let mut running = 0u32;
    for fragment in fragments {
        cumulative.push(running);
        running += fragment.len() as u32;
    }

    let start_index = offset_table
        .get(frame as usize)
        .and_then(|&offset| cumulative.iter().position(|&c| c == offset))
        .unwrap_or(0);
    let end_index = offset_table
        .get(frame as usize + 1)
        .and_then(|&offset| cumulative.iter().position(|&c| c == offset))
        .unwrap_or(fragments.len());

    Ok(fragments[start_index..end_index].to_vec())
}

/// Lift `bit_count` bits starting at `bit_offset` out of a contiguous,
/// MSB-first bitstream and repack them into a fresh byte buffer starting
/// at bit 0, padding the last byte with zero bits.
///
/// `bits_allocated == 1` frames are not byte-aligned to each other: frame
/// *i* begins at bit `i * samples_per_frame` of the whole _Pixel Data_
/// value, not at byte `ceil(samples_per_frame / 8) * i`. This re-packs a
/// frame's bits out of that shared bitstream so downstream unpacking can
/// treat it like any other self-contained frame buffer.
fn extract_bit_range(bytes: &[u8], bit_offset: usize, bit_count: usize) -> Vec<u8> {
    let mut out = vec![0u8; (bit_count + 7) / 8];
    for i in 0..bit_count {
        let src_bit = bit_offset + i;
        let byte = bytes[src_bit / 8];
        let bit = 7 - (src_bit % 8);
        if (byte >> bit) & 1 != 0 {
            out[i / 8] |= 1 << (7 - (i % 8));
        }
    }
    out
}

/// Unpack a bit-packed (`bits_allocated == 1`) frame into one byte per
/// sample, each holding `0` or `1`. Samples are packed MSB-first within
/// each byte.
pub fn unpack_bits(packed: &[u8], sample_count: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(sample_count);
    for i in 0..sample_count {
        let byte = packed[i / 8];
        let bit = 7 - (i % 8);
        out.push((byte >> bit) & 1);
    }
    out
}

/// Unpack a frame's bytes into individual samples, given the descriptor's
/// `bits_allocated`. 8-bit samples pass through unchanged; 16-bit samples
/// are read little-endian; 1-bit samples are unpacked via [`unpack_bits`].
pub fn unpack_samples(descriptor: &PixelDataDescriptor, frame_bytes: &[u8]) -> Vec<u32> {
    let sample_count =
        descriptor.rows as usize * descriptor.columns as usize * descriptor.samples_per_pixel as usize;
    match descriptor.bits_allocated {
        1 => unpack_bits(frame_bytes, sample_count).into_iter().map(u32::from).collect(),
        8 => frame_bytes.iter().take(sample_count).map(|&b| u32::from(b)).collect(),
        16 => {
            let mut words = vec![0u16; sample_count.min(frame_bytes.len() / 2)];
            LittleEndian::read_u16_into(&frame_bytes[..words.len() * 2], &mut words);
            words.into_iter().map(u32::from).collect()
        }
        32 => {
            let mut words = vec![0u32; sample_count.min(frame_bytes.len() / 4)];
            LittleEndian::read_u32_into(&frame_bytes[..words.len() * 4], &mut words);
            words
        }
        _ => Vec::new(),
    }
}

/// Extract the meaningful `bits_stored` value from a raw allocated sample,
/// then sign-extend it when the descriptor declares signed samples.
///
/// Right-shifts the allocated sample by `bits_allocated - 1 - high_bit` and
/// masks the result to `bits_stored` bits.
pub fn stored_value(descriptor: &PixelDataDescriptor, raw: u32) -> i32 {
    let shift = descriptor.bits_allocated as u32 - 1 - descriptor.high_bit as u32;
    let mask = if descriptor.bits_stored >= 32 { u32::MAX } else { (1u32 << descriptor.bits_stored) - 1 };
    let unsigned = (raw >> shift) & mask;

    use crate::descriptor::PixelRepresentation;
    match descriptor.pixel_representation {
        PixelRepresentation::Unsigned => unsigned as i32,
        PixelRepresentation::Signed => {
            let sign_bit = 1u32 << (descriptor.bits_stored - 1);
            if unsigned & sign_bit != 0 {
                (unsigned | !mask) as i32
            } else {
                unsigned as i32
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpacks_bits_msb_first() {
        // 0b1011_0000 -> samples 1,0,1,1,0,0,0,0
        let packed = [0b1011_0000u8];
        let samples = unpack_bits(&packed, 8);
        assert_eq!(samples, vec![1, 0, 1, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn bit_packed_frames_pack_across_byte_boundaries() {
        // Two 3x3 (9 bits/frame) frames packed back to back with no padding:
        // frame 0 occupies bits 0..9, frame 1 occupies bits 9..18, crossing
        // the byte 1/byte 2 boundary mid-frame.
        let bytes = [0b1011_0001u8, 0b1110_0101u8, 0b1000_0000u8];
        let sample_count = 9;

        let frame0 = extract_bit_range(&bytes, 0, sample_count);
        assert_eq!(unpack_bits(&frame0, sample_count), vec![1, 0, 1, 1, 0, 0, 0, 1, 1]);

        let frame1 = extract_bit_range(&bytes, sample_count, sample_count);
        assert_eq!(unpack_bits(&frame1, sample_count), vec![1, 1, 0, 0, 1, 0, 1, 1, 0]);
    }

    #[test]
    fn stored_value_masks_and_shifts() {
        let mut descriptor = sample_descriptor();
        descriptor.bits_allocated = 16;
        descriptor.bits_stored = 12;
        descriptor.high_bit = 11;
        // shift = bits_allocated - 1 - high_bit = 4, then mask to 12 bits
        let raw = 0b1111_0000_1010_1010u32;
        assert_eq!(stored_value(&descriptor, raw), 0b1111_0000_1010);
    }

    #[test]
    fn stored_value_sign_extends_negative() {
        let mut descriptor = sample_descriptor();
        descriptor.bits_allocated = 16;
        descriptor.bits_stored = 16;
        descriptor.high_bit = 15;
        descriptor.pixel_representation = crate::descriptor::PixelRepresentation::Signed;
        assert_eq!(stored_value(&descriptor, 0xFFFF), -1);
        assert_eq!(stored_value(&descriptor, 0x8000), i16::MIN as i32);
    }

    #[test]
    fn single_frame_uses_all_fragments() {
        let fragments = vec![vec![1, 2, 3], vec![4, 5, 6]];
        let result = fragments_for_frame(&fragments, &[], 1, 0).unwrap();
        assert_eq!(result, fragments);
    }

    struct StubReader;

    impl PixelDataReader for StubReader {
        fn decode_frame(&self, _transfer_syntax: &TransferSyntax, _fragments: &[Vec<u8>], _descriptor: &PixelDataDescriptor) -> Result<Vec<u8>, Error> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn registration_after_first_lookup_is_rejected() {
        let mut registry = CodecRegistry::new();
        registry.register("1.2.840.10008.1.2.4.70", Box::new(StubReader)).unwrap();
        assert!(registry.get("1.2.840.10008.1.2.4.70").is_some());

        let err = registry.register("1.2.840.10008.1.2.4.90", Box::new(StubReader)).unwrap_err();
        assert!(matches!(err, Error::RegistrySealed { .. }));
    }

    fn sample_descriptor() -> PixelDataDescriptor {
        PixelDataDescriptor {
            rows: 2,
            columns: 2,
            samples_per_pixel: 1,
            photometric_interpretation: crate::descriptor::PhotometricInterpretation::Monochrome2,
            planar_configuration: crate::descriptor::PlanarConfiguration::Interleaved,
            bits_allocated: 16,
            bits_stored: 12,
            high_bit: 11,
            pixel_representation: crate::descriptor::PixelRepresentation::Unsigned,
            number_of_frames: 1,
            rescale: crate::transform::Rescale::IDENTITY,
            voi_lut_function: None,
            window: None,
        }
    }
}
