//! Deflate/inflate for Deflated Explicit VR Little Endian.
//!
//! The standard deflates the data set bytes that follow the file meta
//! group (RFC 1951, no zlib or gzip framing). Since the parser already
//! requires the whole input up front, this operates on owned buffers
//! rather than wrapping a `Read`/`Write` pair the way the lineage's
//! `DataRWAdapter` does.

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::{self, Read, Write};

/// Inflate a raw deflate stream (no header/trailer) into a byte buffer.
pub fn inflate(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    DeflateDecoder::new(data).read_to_end(&mut out)?;
    Ok(out)
}

/// Deflate a byte buffer using the fastest compression level, matching
/// what data set writers typically want (encoding speed over ratio).
pub fn deflate(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(data)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_arbitrary_bytes() {
        let original = b"\x08\x00\x08\x00\x43\x53\x04\x00\x4f\x52\x20\x20";
        let compressed = deflate(original).unwrap();
        let restored = inflate(&compressed).unwrap();
        assert_eq!(restored, original);
    }
}
