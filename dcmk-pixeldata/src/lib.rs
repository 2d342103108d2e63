//! Pixel data decoding: turning the bytes under an object's _Pixel Data_
//! element into displayable rasters.
//!
//! The pipeline runs in five stages: [`descriptor`] reads the `(0028,xxxx)`
//! attributes that describe the encoding, [`frame`] slices out one frame's
//! raw bytes (decoding through a registered [`CodecRegistry`] codec when
//! the transfer syntax is encapsulated), the modality and VOI transforms in
//! [`transform`] and [`lut`] rescale and window the stored samples, and
//! [`photometric`] resolves the result to a displayable raster.
//!
//! This crate does not itself decode compressed pixel data; JPEG, JPEG-LS,
//! JPEG 2000 and RLE codecs are external implementations of
//! [`PixelDataReader`], registered by transfer syntax UID.

pub mod descriptor;
pub mod error;
pub mod frame;
pub mod lut;
pub mod photometric;
pub mod transform;

pub use descriptor::{PhotometricInterpretation, PixelDataDescriptor, PixelRepresentation, PlanarConfiguration};
pub use error::{Error, Result};
pub use frame::{CodecRegistry, PixelDataReader};
pub use lut::{ExplicitLut, Lut};
pub use photometric::{PaletteLut, Raster};
pub use transform::{Rescale, VoiLutFunction, WindowLevel, WindowLevelTransform};

use dcmk_encoding::transfer_syntax::{TransferSyntax, TransferSyntaxIndex};
use dcmk_object::{FileDicomObject, InMemDicomObject};
use dcmk_transfer_syntax_registry::TransferSyntaxRegistry;
use snafu::OptionExt;

use crate::descriptor::{LUT_DATA, LUT_DESCRIPTOR, MODALITY_LUT_SEQUENCE, VOI_LUT_SEQUENCE};
use crate::error::{MissingPaletteLutSnafu, UnsupportedTransferSyntaxSnafu};

/// How the modality rescale stage (or Modality LUT Sequence table) should
/// be applied to monochrome samples.
#[derive(Debug, Clone, Copy, Default)]
pub enum ModalityLutOption {
    /// Use the object's own Rescale Slope/Intercept or Modality LUT
    /// Sequence, whichever is present.
    #[default]
    Default,
    /// Use a caller-supplied rescale function instead of the object's own.
    Override(Rescale),
    /// Skip the modality stage entirely (stored values pass through).
    None,
}

/// How the VOI transform stage (or VOI LUT Sequence table) should be
/// applied to modality-rescaled monochrome samples.
#[derive(Debug, Clone, Copy, Default)]
pub enum VoiLutOption {
    /// Use the object's own Window Center/Width (or VOI LUT Sequence),
    /// whichever is present.
    #[default]
    Default,
    /// Use a caller-supplied window level instead of the object's own.
    Custom(WindowLevel),
    /// Skip the VOI stage entirely (modality output is clamped to the
    /// output range directly).
    Identity,
}

/// Options controlling how [`PixelDecoder::decode_pixel_data_with_options`]
/// runs the modality and VOI transform stages.
#[derive(Clone, Copy, Default)]
pub struct ConvertOptions<'a> {
    modality_lut: ModalityLutOption,
    voi_lut: VoiLutOption,
    /// Polled between frames during decode; when it returns `true`,
    /// decoding stops and the frames decoded so far are returned.
    cancel: Option<&'a dyn Fn() -> bool>,
}

impl<'a> std::fmt::Debug for ConvertOptions<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConvertOptions")
            .field("modality_lut", &self.modality_lut)
            .field("voi_lut", &self.voi_lut)
            .field("cancel", &self.cancel.map(|_| "Some(..)").unwrap_or("None"))
            .finish()
    }
}

impl<'a> ConvertOptions<'a> {
    /// The default options: object-declared modality rescale and VOI window.
    pub fn new() -> Self {
        ConvertOptions::default()
    }

    /// Set the modality LUT option.
    pub fn with_modality_lut(mut self, option: ModalityLutOption) -> Self {
        self.modality_lut = option;
        self
    }

    /// Set the VOI LUT option.
    pub fn with_voi_lut(mut self, option: VoiLutOption) -> Self {
        self.voi_lut = option;
        self
    }

    /// Set a cancellation token, polled between frames during decode.
    pub fn with_cancel(mut self, cancel: &'a dyn Fn() -> bool) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.map_or(false, |f| f())
    }
}

/// The result of decoding an object's pixel data: the descriptor that
/// describes it, plus one 8-bit raster per frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPixelData {
    /// the descriptor extracted from the object
    pub descriptor: PixelDataDescriptor,
    /// one raster per frame, in order; short of `descriptor.number_of_frames`
    /// when decoding was interrupted by a cancellation token
    pub frames: Vec<Raster>,
    /// whether a cancellation token interrupted decoding before every frame was read
    pub cancelled: bool,
}

impl DecodedPixelData {
    /// The raster for a single frame.
    pub fn frame(&self, index: u32) -> Result<&Raster, Error> {
        self.frames.get(index as usize).context(crate::error::FrameOutOfRangeSnafu {
            frame: index,
            number_of_frames: self.descriptor.number_of_frames,
        })
    }
}

/// Decode an object's pixel data into displayable rasters.
pub trait PixelDecoder {
    /// Decode every frame with default options and no compressed pixel
    /// codecs registered (encapsulated transfer syntaxes will fail with
    /// [`Error::UnsupportedTransferSyntax`]).
    fn decode_pixel_data(&self) -> Result<DecodedPixelData, Error>;

    /// Decode every frame with the given codec registry and convert options,
    /// checking `options`' cancellation token between frames.
    fn decode_pixel_data_with_options(&self, codecs: &CodecRegistry, options: &ConvertOptions<'_>) -> Result<DecodedPixelData, Error>;
}

impl PixelDecoder for FileDicomObject {
    fn decode_pixel_data(&self) -> Result<DecodedPixelData, Error> {
        self.decode_pixel_data_with_options(&CodecRegistry::new(), &ConvertOptions::default())
    }

    fn decode_pixel_data_with_options(&self, codecs: &CodecRegistry, options: &ConvertOptions<'_>) -> Result<DecodedPixelData, Error> {
        let obj = self.dataset();
        let descriptor = PixelDataDescriptor::extract(obj)?;
        let ts_uid = self.meta().transfer_syntax();
        let ts = resolve_transfer_syntax(ts_uid)?;

        let palette = if descriptor.photometric_interpretation == PhotometricInterpretation::PaletteColor {
            Some(extract_palette_luts(obj)?)
        } else {
            None
        };

        let mut frames = Vec::with_capacity(descriptor.number_of_frames as usize);
        let mut cancelled = false;
        for frame_index in 0..descriptor.number_of_frames {
            if options.is_cancelled() {
                cancelled = true;
                break;
            }
            let raw = frame::extract_frame(obj, &descriptor, &ts, frame_index, codecs)?;
            let raster = decode_one_frame(obj, &descriptor, &raw, options, palette.as_ref())?;
            frames.push(raster);
        }

        Ok(DecodedPixelData { descriptor, frames, cancelled })
    }
}

fn resolve_transfer_syntax(uid: &str) -> Result<TransferSyntax, Error> {
    TransferSyntaxRegistry.get(uid).copied().context(UnsupportedTransferSyntaxSnafu { uid: uid.to_string() })
}

fn extract_palette_luts(obj: &InMemDicomObject) -> Result<(ExplicitLut, ExplicitLut, ExplicitLut), Error> {
    let red = extract_palette_channel(obj, descriptor::RED_PALETTE_DESCRIPTOR, descriptor::RED_PALETTE_DATA)?;
    let green = extract_palette_channel(obj, descriptor::GREEN_PALETTE_DESCRIPTOR, descriptor::GREEN_PALETTE_DATA)?;
    let blue = extract_palette_channel(obj, descriptor::BLUE_PALETTE_DESCRIPTOR, descriptor::BLUE_PALETTE_DATA)?;
    Ok((red, green, blue))
}

fn extract_palette_channel(obj: &InMemDicomObject, descriptor_tag: dcmk_core::Tag, data_tag: dcmk_core::Tag) -> Result<ExplicitLut, Error> {
    let desc = obj.get_u16(descriptor_tag).map_err(Error::from)?;
    if desc.len() < 3 {
        return Err(Error::InvalidDescriptor { reason: "palette color lookup table descriptor has fewer than 3 values".into() });
    }
    let number_of_entries = desc[0];
    let first_mapped_value = desc[1] as i32;
    let data = obj.get_u16(data_tag).map_err(Error::from)?;
    let data = data.iter().map(|&v| u32::from(v)).collect();
    Ok(ExplicitLut::new(number_of_entries, first_mapped_value, data))
}

/// Read a Modality LUT Sequence or VOI LUT Sequence's first item into an
/// [`ExplicitLut`], if the sequence is present and non-empty.
fn extract_lut_sequence(obj: &InMemDicomObject, sequence_tag: dcmk_core::Tag) -> Option<ExplicitLut> {
    let items = obj.items(sequence_tag).ok()?;
    let item = items.first()?;
    let desc = item.get_u16(LUT_DESCRIPTOR).ok()?;
    if desc.len() < 3 {
        return None;
    }
    let number_of_entries = desc[0];
    let first_mapped_value = desc[1] as i32;
    let data = item.get_u16(LUT_DATA).ok()?;
    let data = data.iter().map(|&v| u32::from(v)).collect();
    Some(ExplicitLut::new(number_of_entries, first_mapped_value, data))
}

fn decode_one_frame(
    obj: &InMemDicomObject,
    descriptor: &PixelDataDescriptor,
    raw: &[u8],
    options: &ConvertOptions<'_>,
    palette: Option<&(ExplicitLut, ExplicitLut, ExplicitLut)>,
) -> Result<Raster, Error> {
    let raw_samples = frame::unpack_samples(descriptor, raw);

    if descriptor.photometric_interpretation == PhotometricInterpretation::PaletteColor {
        let (red, green, blue) = palette.context(MissingPaletteLutSnafu)?;
        let indices: Vec<u8> = raw_samples.iter().map(|&s| frame::stored_value(descriptor, s).clamp(0, 255) as u8).collect();
        return photometric::apply(descriptor, &indices, Some(PaletteLut { red, green, blue }));
    }

    if descriptor.photometric_interpretation.is_monochrome() {
        let modality_lut = extract_lut_sequence(obj, MODALITY_LUT_SEQUENCE);
        let voi_lut = extract_lut_sequence(obj, VOI_LUT_SEQUENCE);

        let rescale = match options.modality_lut {
            ModalityLutOption::Override(r) => Some(r),
            ModalityLutOption::None => None,
            ModalityLutOption::Default => Some(descriptor.rescale),
        };

        let window = match options.voi_lut {
            VoiLutOption::Identity => None,
            VoiLutOption::Custom(w) => Some(w),
            VoiLutOption::Default => descriptor.window(0),
        };

        let samples: Vec<u8> = raw_samples
            .iter()
            .map(|&raw_sample| {
                let stored = frame::stored_value(descriptor, raw_sample);
                let modality_out = match (&modality_lut, options.modality_lut, rescale) {
                    (Some(lut), ModalityLutOption::Default, _) => lut.get(stored) as f64,
                    (_, ModalityLutOption::None, _) => stored as f64,
                    (_, _, Some(rescale)) => rescale.apply(stored as f64),
                    _ => stored as f64,
                };

                match (&voi_lut, options.voi_lut) {
                    (Some(lut), VoiLutOption::Default) => lut.get(modality_out as i32).clamp(0, 255) as u8,
                    _ => match window {
                        Some(window) => {
                            let transform = WindowLevelTransform::new(descriptor.voi_lut_function(0), window);
                            transform.apply(modality_out, 255.0).round().clamp(0.0, 255.0) as u8
                        }
                        None => modality_out.round().clamp(0.0, 255.0) as u8,
                    },
                }
            })
            .collect();

        return photometric::apply(descriptor, &samples, None);
    }

    let samples: Vec<u8> = raw_samples.iter().map(|&s| s as u8).collect();
    photometric::apply(descriptor, &samples, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcmk_core::header::DataElementHeader;
    use dcmk_core::{Length, PrimitiveValue, Tag, VR};
    use dcmk_object::FileMetaTableBuilder;
    use dcmk_parser::tree::{DataSetElement, ElementValue as RawElementValue};

    fn put_u16(elements: &mut Vec<DataSetElement>, tag: Tag, value: u16) {
        elements.push(DataSetElement { header: DataElementHeader::new(tag, VR::US, Length::defined(2)), value: RawElementValue::Primitive(PrimitiveValue::from(value)) });
    }

    fn put_str(elements: &mut Vec<DataSetElement>, tag: Tag, vr: VR, value: &str) {
        let bytes = value.as_bytes();
        elements.push(DataSetElement {
            header: DataElementHeader::new(tag, vr, Length::defined(bytes.len() as u32)),
            value: RawElementValue::Primitive(PrimitiveValue::from(value)),
        });
    }

    fn put_pixel_data_u8(elements: &mut Vec<DataSetElement>, bytes: Vec<u8>) {
        let len = bytes.len() as u32;
        elements.push(DataSetElement {
            header: DataElementHeader::new(descriptor::PIXEL_DATA, VR::OB, Length::defined(len)),
            value: RawElementValue::Primitive(PrimitiveValue::U8(bytes.into())),
        });
    }

    fn grayscale_file(pixels: Vec<u8>) -> FileDicomObject {
        let mut elements = Vec::new();
        put_u16(&mut elements, descriptor::ROWS, 1);
        put_u16(&mut elements, descriptor::COLUMNS, 2);
        put_u16(&mut elements, descriptor::SAMPLES_PER_PIXEL, 1);
        put_str(&mut elements, descriptor::PHOTOMETRIC_INTERPRETATION, VR::CS, "MONOCHROME2");
        put_u16(&mut elements, descriptor::BITS_ALLOCATED, 8);
        put_u16(&mut elements, descriptor::BITS_STORED, 8);
        put_u16(&mut elements, descriptor::HIGH_BIT, 7);
        put_u16(&mut elements, descriptor::PIXEL_REPRESENTATION, 0);
        put_pixel_data_u8(&mut elements, pixels);
        let obj = InMemDicomObject::from_elements(elements);

        let meta = FileMetaTableBuilder::new()
            .media_storage_sop_class_uid("1.2.840.10008.5.1.4.1.1.7")
            .media_storage_sop_instance_uid("1.2.3.4.5")
            .transfer_syntax("1.2.840.10008.1.2.1")
            .build()
            .unwrap();
        FileDicomObject::new(meta, obj)
    }

    #[test]
    fn decodes_uncompressed_grayscale_frame_with_no_transforms() {
        let file = grayscale_file(vec![0, 255]);
        let decoded = file.decode_pixel_data().unwrap();
        assert_eq!(decoded.descriptor.rows, 1);
        assert_eq!(decoded.frames.len(), 1);
        assert_eq!(decoded.frame(0).unwrap().data, vec![0, 255]);
    }

    #[test]
    fn unknown_transfer_syntax_is_rejected() {
        let mut file = grayscale_file(vec![0, 255]);
        file.update_meta(|meta| {
            *meta = FileMetaTableBuilder::new()
                .media_storage_sop_class_uid("1.2.840.10008.5.1.4.1.1.7")
                .media_storage_sop_instance_uid("1.2.3.4.5")
                .transfer_syntax("1.2.3.4.5.6.7.8.9")
                .build()
                .unwrap();
        });
        let err = file.decode_pixel_data().unwrap_err();
        assert!(matches!(err, Error::UnsupportedTransferSyntax { .. }));
    }

    #[test]
    fn cancellation_token_stops_before_the_second_frame() {
        let mut elements = Vec::new();
        put_u16(&mut elements, descriptor::ROWS, 1);
        put_u16(&mut elements, descriptor::COLUMNS, 1);
        put_u16(&mut elements, descriptor::SAMPLES_PER_PIXEL, 1);
        put_str(&mut elements, descriptor::PHOTOMETRIC_INTERPRETATION, VR::CS, "MONOCHROME2");
        put_u16(&mut elements, descriptor::BITS_ALLOCATED, 8);
        put_u16(&mut elements, descriptor::BITS_STORED, 8);
        put_u16(&mut elements, descriptor::HIGH_BIT, 7);
        put_u16(&mut elements, descriptor::PIXEL_REPRESENTATION, 0);
        put_u16(&mut elements, descriptor::NUMBER_OF_FRAMES, 2);
        put_pixel_data_u8(&mut elements, vec![0, 255]);
        let obj = InMemDicomObject::from_elements(elements);
        let meta = FileMetaTableBuilder::new()
            .media_storage_sop_class_uid("1.2.840.10008.5.1.4.1.1.7")
            .media_storage_sop_instance_uid("1.2.3.4.5")
            .transfer_syntax("1.2.840.10008.1.2.1")
            .build()
            .unwrap();
        let file = FileDicomObject::new(meta, obj);

        let cancel = || true;
        let options = ConvertOptions::new().with_cancel(&cancel);
        let decoded = file.decode_pixel_data_with_options(&CodecRegistry::new(), &options).unwrap();
        assert!(decoded.cancelled);
        assert!(decoded.frames.is_empty());
    }

    #[test]
    fn frame_out_of_range_reports_declared_count() {
        let file = grayscale_file(vec![0, 255]);
        let decoded = file.decode_pixel_data().unwrap();
        let err = decoded.frame(3).unwrap_err();
        assert!(matches!(err, Error::FrameOutOfRange { frame: 3, number_of_frames: 1 }));
    }
}
