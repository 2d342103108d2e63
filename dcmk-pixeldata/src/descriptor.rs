//! The pixel data descriptor: the handful of `(0028,xxxx)` attributes that
//! together describe how to interpret the bytes under _Pixel Data_
//! `(7FE0,0010)`.

use std::convert::TryFrom;
use std::fmt;

use dcmk_core::Tag;
use dcmk_object::InMemDicomObject;
use snafu::OptionExt;

use crate::error::{Error, InvalidDescriptorSnafu, MissingRequiredTagSnafu};
use crate::transform::{Rescale, VoiLutFunction, WindowLevel};

pub(crate) const ROWS: Tag = Tag(0x0028, 0x0010);
pub(crate) const COLUMNS: Tag = Tag(0x0028, 0x0011);
pub(crate) const SAMPLES_PER_PIXEL: Tag = Tag(0x0028, 0x0002);
pub(crate) const PHOTOMETRIC_INTERPRETATION: Tag = Tag(0x0028, 0x0004);
pub(crate) const PLANAR_CONFIGURATION: Tag = Tag(0x0028, 0x0006);
pub(crate) const BITS_ALLOCATED: Tag = Tag(0x0028, 0x0100);
pub(crate) const BITS_STORED: Tag = Tag(0x0028, 0x0101);
pub(crate) const HIGH_BIT: Tag = Tag(0x0028, 0x0102);
pub(crate) const PIXEL_REPRESENTATION: Tag = Tag(0x0028, 0x0103);
pub(crate) const NUMBER_OF_FRAMES: Tag = Tag(0x0028, 0x0008);
pub(crate) const PIXEL_DATA: Tag = Tag(0x7FE0, 0x0010);
pub(crate) const RESCALE_INTERCEPT: Tag = Tag(0x0028, 0x1052);
pub(crate) const RESCALE_SLOPE: Tag = Tag(0x0028, 0x1053);
pub(crate) const WINDOW_CENTER: Tag = Tag(0x0028, 0x1050);
pub(crate) const WINDOW_WIDTH: Tag = Tag(0x0028, 0x1051);
pub(crate) const VOI_LUT_FUNCTION: Tag = Tag(0x0028, 0x1056);
pub(crate) const MODALITY_LUT_SEQUENCE: Tag = Tag(0x0028, 0x3000);
pub(crate) const VOI_LUT_SEQUENCE: Tag = Tag(0x0028, 0x3010);
pub(crate) const LUT_DESCRIPTOR: Tag = Tag(0x0028, 0x3002);
pub(crate) const LUT_DATA: Tag = Tag(0x0028, 0x3006);
pub(crate) const RED_PALETTE_DESCRIPTOR: Tag = Tag(0x0028, 0x1101);
pub(crate) const GREEN_PALETTE_DESCRIPTOR: Tag = Tag(0x0028, 0x1102);
pub(crate) const BLUE_PALETTE_DESCRIPTOR: Tag = Tag(0x0028, 0x1103);
pub(crate) const RED_PALETTE_DATA: Tag = Tag(0x0028, 0x1201);
pub(crate) const GREEN_PALETTE_DATA: Tag = Tag(0x0028, 0x1202);
pub(crate) const BLUE_PALETTE_DATA: Tag = Tag(0x0028, 0x1203);

/// The _Photometric Interpretation_ of a pixel data element: how raw
/// samples map to displayable color.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[non_exhaustive]
pub enum PhotometricInterpretation {
    /// MONOCHROME1: grayscale, minimum sample value is displayed as white
    Monochrome1,
    /// MONOCHROME2: grayscale, minimum sample value is displayed as black
    Monochrome2,
    /// RGB: three samples per pixel, no further transformation
    Rgb,
    /// PALETTE COLOR: a single sample indexes into three palette LUTs
    PaletteColor,
    /// YBR_FULL: luminance/chrominance, every component sampled per pixel
    YbrFull,
    /// YBR_FULL_422: luminance/chrominance, chrominance subsampled 2:1 horizontally
    YbrFull422,
    /// YBR_PARTIAL_422: as YBR_FULL_422, with a narrower luminance range
    YbrPartial422,
}

impl PhotometricInterpretation {
    /// Whether this interpretation describes a single-sample grayscale image.
    pub fn is_monochrome(&self) -> bool {
        matches!(self, PhotometricInterpretation::Monochrome1 | PhotometricInterpretation::Monochrome2)
    }

    /// Whether this interpretation is one of the YBR color space variants.
    pub fn is_ybr(&self) -> bool {
        matches!(
            self,
            PhotometricInterpretation::YbrFull | PhotometricInterpretation::YbrFull422 | PhotometricInterpretation::YbrPartial422
        )
    }
}

/// An unrecognized _Photometric Interpretation_ value.
#[derive(Debug, Clone, PartialEq)]
pub struct FromPhotometricInterpretationError(pub(crate) String);

impl TryFrom<&str> for PhotometricInterpretation {
    type Error = FromPhotometricInterpretationError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.trim() {
            "MONOCHROME1" => Ok(Self::Monochrome1),
            "MONOCHROME2" => Ok(Self::Monochrome2),
            "RGB" => Ok(Self::Rgb),
            "PALETTE COLOR" => Ok(Self::PaletteColor),
            "YBR_FULL" => Ok(Self::YbrFull),
            "YBR_FULL_422" => Ok(Self::YbrFull422),
            "YBR_PARTIAL_422" => Ok(Self::YbrPartial422),
            other => Err(FromPhotometricInterpretationError(other.to_string())),
        }
    }
}

impl fmt::Display for PhotometricInterpretation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PhotometricInterpretation::Monochrome1 => "MONOCHROME1",
            PhotometricInterpretation::Monochrome2 => "MONOCHROME2",
            PhotometricInterpretation::Rgb => "RGB",
            PhotometricInterpretation::PaletteColor => "PALETTE COLOR",
            PhotometricInterpretation::YbrFull => "YBR_FULL",
            PhotometricInterpretation::YbrFull422 => "YBR_FULL_422",
            PhotometricInterpretation::YbrPartial422 => "YBR_PARTIAL_422",
        };
        f.write_str(s)
    }
}

/// Whether pixel samples are encoded as signed or unsigned integers
/// (_Pixel Representation_).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PixelRepresentation {
    /// 0: unsigned
    Unsigned,
    /// 1: two's complement signed
    Signed,
}

impl From<u16> for PixelRepresentation {
    fn from(v: u16) -> Self {
        if v == 0 {
            PixelRepresentation::Unsigned
        } else {
            PixelRepresentation::Signed
        }
    }
}

/// How multi-sample pixels are laid out in a frame (_Planar Configuration_).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PlanarConfiguration {
    /// 0: samples interleaved per pixel (`R1 G1 B1 R2 G2 B2 ...`)
    Interleaved,
    /// 1: samples grouped per plane (`R1 R2 ... G1 G2 ... B1 B2 ...`)
    Planar,
}

impl From<u16> for PlanarConfiguration {
    fn from(v: u16) -> Self {
        if v == 0 {
            PlanarConfiguration::Interleaved
        } else {
            PlanarConfiguration::Planar
        }
    }
}

/// The descriptive attributes of a _Pixel Data_ element, extracted once
/// and consulted by every later stage of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelDataDescriptor {
    /// number of rows per frame
    pub rows: u16,
    /// number of columns per frame
    pub columns: u16,
    /// number of samples per pixel (1 for grayscale/palette, 3 for color)
    pub samples_per_pixel: u16,
    /// how samples map to color
    pub photometric_interpretation: PhotometricInterpretation,
    /// pixel layout when `samples_per_pixel > 1`
    pub planar_configuration: PlanarConfiguration,
    /// bits physically allocated per sample: one of 1, 8, 16, 32
    pub bits_allocated: u16,
    /// bits of each sample that are meaningful (`<= bits_allocated`)
    pub bits_stored: u16,
    /// index of the most significant meaningful bit (`bits_stored - 1`, usually)
    pub high_bit: u16,
    /// whether samples are signed or unsigned
    pub pixel_representation: PixelRepresentation,
    /// number of frames in a multi-frame object
    pub number_of_frames: u32,
    /// the shared modality rescale, identity when neither tag is present
    pub rescale: Rescale,
    /// the VOI LUT function paired with each window level preset, parallel to `window`
    pub voi_lut_function: Option<Vec<VoiLutFunction>>,
    /// the window level presets declared by the object, if any; the first is the default
    pub window: Option<Vec<WindowLevel>>,
}

impl PixelDataDescriptor {
    /// Extract the descriptor from an object's `(0028,xxxx)` attributes.
    pub fn extract(obj: &InMemDicomObject) -> Result<Self, Error> {
        let rows = required_u16(obj, ROWS, "Rows")?;
        let columns = required_u16(obj, COLUMNS, "Columns")?;
        let samples_per_pixel = required_u16(obj, SAMPLES_PER_PIXEL, "SamplesPerPixel")?;
        let photometric_interpretation = {
            let raw = obj.get_string(PHOTOMETRIC_INTERPRETATION).ok().map(|s| s.trim().to_string()).context(
                MissingRequiredTagSnafu { name: "PhotometricInterpretation", tag: PHOTOMETRIC_INTERPRETATION },
            )?;
            PhotometricInterpretation::try_from(raw.as_str())
                .map_err(|e| Error::InvalidDescriptor { reason: format!("unrecognized PhotometricInterpretation '{}'", e.0) })?
        };
        let planar_configuration =
            obj.get_u16(PLANAR_CONFIGURATION).ok().and_then(|v| v.first().copied()).map(PlanarConfiguration::from).unwrap_or(PlanarConfiguration::Interleaved);
        let bits_allocated = required_u16(obj, BITS_ALLOCATED, "BitsAllocated")?;
        let bits_stored = required_u16(obj, BITS_STORED, "BitsStored")?;
        let high_bit = required_u16(obj, HIGH_BIT, "HighBit")?;
        let pixel_representation =
            required_u16(obj, PIXEL_REPRESENTATION, "PixelRepresentation").map(PixelRepresentation::from)?;
        let number_of_frames = obj.get_i32(NUMBER_OF_FRAMES).ok().and_then(|v| v.first().copied()).map(|v| v.max(1) as u32).unwrap_or(1);

        let rescale_slope = obj.get_f64(RESCALE_SLOPE).ok().and_then(|v| v.first().copied());
        let rescale_intercept = obj.get_f64(RESCALE_INTERCEPT).ok().and_then(|v| v.first().copied());
        let rescale = match (rescale_slope, rescale_intercept) {
            (None, None) => Rescale::IDENTITY,
            (slope, intercept) => Rescale::new(slope.unwrap_or(1.0), intercept.unwrap_or(0.0)),
        };

        let window_center = obj.get_f64(WINDOW_CENTER).ok().map(|v| v.into_owned());
        let window_width = obj.get_f64(WINDOW_WIDTH).ok().map(|v| v.into_owned());
        let window = match (window_center, window_width) {
            (Some(centers), Some(widths)) if !centers.is_empty() && !widths.is_empty() => {
                let len = centers.len().max(widths.len());
                Some(
                    (0..len)
                        .map(|i| WindowLevel {
                            center: centers.get(i).or_else(|| centers.first()).copied().unwrap_or(0.0),
                            width: widths.get(i).or_else(|| widths.first()).copied().unwrap_or(1.0),
                        })
                        .collect(),
                )
            }
            _ => None,
        };

        let voi_lut_function = obj.get_strings(VOI_LUT_FUNCTION).ok().map(|names| {
            names.iter().map(|s| VoiLutFunction::try_from(s.as_str()).unwrap_or_default()).collect::<Vec<_>>()
        });

        if rows == 0 || columns == 0 {
            return InvalidDescriptorSnafu { reason: "Rows and Columns must be non-zero".to_string() }.fail();
        }
        if bits_stored > bits_allocated {
            return InvalidDescriptorSnafu { reason: format!("BitsStored ({bits_stored}) exceeds BitsAllocated ({bits_allocated})") }.fail();
        }

        Ok(PixelDataDescriptor {
            rows,
            columns,
            samples_per_pixel,
            photometric_interpretation,
            planar_configuration,
            bits_allocated,
            bits_stored,
            high_bit,
            pixel_representation,
            number_of_frames,
            rescale,
            voi_lut_function,
            window,
        })
    }

    /// The window level preset at `index`, or the default (first) preset
    /// when `index` is out of range. `None` if the object declares no
    /// window level at all.
    pub fn window(&self, index: usize) -> Option<WindowLevel> {
        self.window.as_ref().and_then(|w| w.get(index).or_else(|| w.first())).copied()
    }

    /// The VOI LUT function paired with the window level preset at `index`,
    /// defaulting to `LINEAR` when unspecified.
    pub fn voi_lut_function(&self, index: usize) -> VoiLutFunction {
        self.voi_lut_function.as_ref().and_then(|fns| fns.get(index).or_else(|| fns.first())).copied().unwrap_or_default()
    }

    /// The number of samples in a single frame (`rows * columns * samples_per_pixel`).
    pub fn samples_per_frame(&self) -> usize {
        self.rows as usize * self.columns as usize * self.samples_per_pixel as usize
    }

    /// The number of bytes a single uncompressed frame occupies, per the
    /// standard's native pixel data encoding rule: `ceil(rows * columns *
    /// samples_per_pixel * bits_allocated / 8)`.
    ///
    /// For `bits_allocated == 1`, this is the frame's length rounded up to a
    /// whole byte; it is not the frame's position in the bitstream, since
    /// 1-bit frames pack back to back without byte-alignment padding
    /// between frames. Use [`PixelDataDescriptor::samples_per_frame`] and
    /// bit offsets into the whole bitstream to locate a bit-packed frame.
    pub fn uncompressed_frame_byte_len(&self) -> usize {
        let total_bits = self.samples_per_frame() * self.bits_allocated as usize;
        (total_bits + 7) / 8
    }
}

fn required_u16(obj: &InMemDicomObject, tag: Tag, name: &'static str) -> Result<u16, Error> {
    let values = obj.get_u16(tag).ok().context(MissingRequiredTagSnafu { name, tag })?;
    values.first().copied().context(MissingRequiredTagSnafu { name, tag })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcmk_core::header::DataElementHeader;
    use dcmk_core::{Length, PrimitiveValue, VR};
    use dcmk_parser::tree::{DataSetElement, ElementValue as RawElementValue};

    fn put_u16(obj: &mut InMemDicomObject, tag: Tag, value: u16) {
        let element = DataSetElement {
            header: DataElementHeader::new(tag, VR::US, Length::defined(2)),
            value: RawElementValue::Primitive(PrimitiveValue::from(value)),
        };
        let mut elements = obj.to_elements();
        elements.retain(|e| e.tag() != tag);
        elements.push(element);
        *obj = InMemDicomObject::from_elements(elements);
    }

    fn put_str(obj: &mut InMemDicomObject, tag: Tag, value: &str) {
        obj.put_str(tag, value);
    }

    fn grayscale_object() -> InMemDicomObject {
        let mut obj = InMemDicomObject::new_empty();
        put_u16(&mut obj, ROWS, 4);
        put_u16(&mut obj, COLUMNS, 4);
        put_u16(&mut obj, SAMPLES_PER_PIXEL, 1);
        put_str(&mut obj, PHOTOMETRIC_INTERPRETATION, "MONOCHROME2");
        put_u16(&mut obj, BITS_ALLOCATED, 16);
        put_u16(&mut obj, BITS_STORED, 12);
        put_u16(&mut obj, HIGH_BIT, 11);
        put_u16(&mut obj, PIXEL_REPRESENTATION, 0);
        obj
    }

    #[test]
    fn extracts_minimal_grayscale_descriptor() {
        let obj = grayscale_object();
        let desc = PixelDataDescriptor::extract(&obj).unwrap();
        assert_eq!(desc.rows, 4);
        assert_eq!(desc.columns, 4);
        assert_eq!(desc.photometric_interpretation, PhotometricInterpretation::Monochrome2);
        assert_eq!(desc.pixel_representation, PixelRepresentation::Unsigned);
        assert_eq!(desc.number_of_frames, 1);
        assert_eq!(desc.rescale, Rescale::IDENTITY);
        assert_eq!(desc.uncompressed_frame_byte_len(), 4 * 4 * 2);
    }

    #[test]
    fn missing_rows_fails() {
        let mut obj = grayscale_object();
        obj.remove(ROWS);
        assert!(PixelDataDescriptor::extract(&obj).is_err());
    }

    #[test]
    fn bits_stored_above_allocated_is_invalid() {
        let mut obj = grayscale_object();
        put_u16(&mut obj, BITS_STORED, 20);
        let err = PixelDataDescriptor::extract(&obj).unwrap_err();
        assert!(matches!(err, Error::InvalidDescriptor { .. }));
    }

    #[test]
    fn bit_packed_frame_length_rounds_up() {
        let mut obj = grayscale_object();
        put_u16(&mut obj, BITS_ALLOCATED, 1);
        put_u16(&mut obj, BITS_STORED, 1);
        put_u16(&mut obj, HIGH_BIT, 0);
        let desc = PixelDataDescriptor::extract(&obj).unwrap();
        // 4x4 = 16 bits exactly -> 2 bytes
        assert_eq!(desc.uncompressed_frame_byte_len(), 2);
    }
}
