//! Error vocabulary for the pixel pipeline: descriptor extraction, frame
//! extraction (raw and encapsulated), and the transform stages above it.

use dcmk_core::Tag;
use dcmk_object::AccessError;
use snafu::Snafu;

/// Type alias for a result from this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level pixel pipeline error.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
#[non_exhaustive]
pub enum Error {
    /// a tag the descriptor or transform stages require was absent
    #[snafu(display("missing required attribute '{name}' ({tag})"))]
    MissingRequiredTag {
        /// the dictionary alias of the missing attribute, for diagnostics
        name: &'static str,
        /// the missing tag
        tag: Tag,
    },
    /// a present attribute could not be read under its expected representation
    #[snafu(display("{source}"))]
    Access {
        /// the underlying typed-accessor error
        source: AccessError,
    },
    /// the descriptor attributes are present but mutually inconsistent
    #[snafu(display("invalid pixel data descriptor: {reason}"))]
    InvalidDescriptor {
        /// what about the descriptor was invalid
        reason: String,
    },
    /// the requested frame index is not within the object's frame count
    #[snafu(display("frame {frame} is out of range (object has {number_of_frames} frame(s))"))]
    FrameOutOfRange {
        /// the requested frame index
        frame: u32,
        /// the object's declared number of frames
        number_of_frames: u32,
    },
    /// the object's pixel data is encapsulated under a transfer syntax with
    /// no codec registered to decode it
    #[snafu(display("no pixel codec registered for transfer syntax '{uid}'"))]
    UnsupportedTransferSyntax {
        /// the transfer syntax UID
        uid: String,
    },
    /// the Pixel Data element is neither a primitive value nor a pixel sequence
    #[snafu(display("PixelData element is not a primitive value or pixel sequence"))]
    InvalidPixelData,
    /// a registered codec failed to decode a compressed fragment
    #[snafu(display("codec failed to decode frame {frame}: {message}"))]
    Decode {
        /// the frame that failed to decode
        frame: u32,
        /// the codec's error message
        message: String,
    },
    /// a codec was registered into a [`crate::frame::CodecRegistry`] after its first lookup
    #[snafu(display("codec registry is sealed, cannot register transfer syntax '{uid}'"))]
    RegistrySealed {
        /// the transfer syntax UID that could not be registered
        uid: String,
    },
    /// a PALETTE COLOR image was rendered with no palette lookup tables supplied
    #[snafu(display("PALETTE COLOR image requires red/green/blue palette lookup tables"))]
    MissingPaletteLut,
}

impl From<AccessError> for Error {
    fn from(source: AccessError) -> Self {
        Error::Access { source }
    }
}
