//! Compressed frame encoding and decoding.
//!
//! A frame carries one zlib-compressed buffer behind a fixed 8-byte header.
//! All multi-byte fields are big-endian (network byte order).
//!
//! ```text
//! ┌──────────────────────┬────────────────────────┬─────────────────────────┐
//! │ original_len: u32 BE │ compressed_len: u32 BE │ compressed_len bytes    │
//! └──────────────────────┴────────────────────────┴─────────────────────────┘
//! ```
//!
//! Decoding checks the declared original length against the configured
//! ceiling before touching the payload, so a hostile header can neither force
//! a large allocation nor make the inflater run unbounded.

use crate::FRAME_HEADER_SIZE;
use crate::config::CodecConfig;
use crate::error::{ConfigError, FrameError};
use crate::wire::WireReader;
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use std::io::{Read, Write};

/// Owned encoded frame, as produced by [`FrameCodec::encode`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    original_len: u32,
    payload: Vec<u8>,
}

impl Frame {
    /// Uncompressed length recorded in the header
    pub fn original_len(&self) -> u32 {
        self.original_len
    }

    /// Length of the compressed payload
    pub fn compressed_len(&self) -> usize {
        self.payload.len()
    }

    /// Compressed payload bytes
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Size of the frame on the wire, header included
    pub fn encoded_len(&self) -> usize {
        FRAME_HEADER_SIZE + self.payload.len()
    }

    /// Borrowed view of this frame
    pub fn view(&self) -> FrameRef<'_> {
        FrameRef {
            original_len: self.original_len,
            payload: &self.payload,
        }
    }

    /// Append the wire encoding to `buf`
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        buf.reserve(self.encoded_len());
        buf.extend_from_slice(&self.original_len.to_be_bytes());
        // encode() guarantees the payload length fits the u32 field
        buf.extend_from_slice(&(self.payload.len() as u32).to_be_bytes());
        buf.extend_from_slice(&self.payload);
    }

    /// Serialize the frame into a fresh buffer
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.write_to(&mut buf);
        buf
    }
}

/// Zero-copy frame view into a packet buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRef<'a> {
    original_len: u32,
    payload: &'a [u8],
}

impl<'a> FrameRef<'a> {
    /// Parse one frame occupying all of `data`
    ///
    /// Fails with [`FrameError::TrailingBytes`] if `data` continues past the
    /// declared payload.
    pub fn parse(data: &'a [u8], max_original_len: usize) -> Result<Self, FrameError> {
        let mut reader = WireReader::new(data);
        let frame = Self::read(&mut reader, max_original_len)?;
        if !reader.is_empty() {
            return Err(FrameError::TrailingBytes(reader.remaining()));
        }
        Ok(frame)
    }

    /// Read one frame from the reader's current position
    pub fn read(reader: &mut WireReader<'a>, max_original_len: usize) -> Result<Self, FrameError> {
        reader.require(FRAME_HEADER_SIZE)?;

        let original_len = reader.read_u32()?;
        if original_len as u64 > max_original_len as u64 {
            return Err(FrameError::SizeLimitExceeded {
                declared: u64::from(original_len),
                limit: max_original_len as u64,
            });
        }

        let compressed_len = reader.read_u32()? as usize;
        let payload = reader.read_bytes(compressed_len)?;

        Ok(Self {
            original_len,
            payload,
        })
    }

    /// Uncompressed length recorded in the header
    pub fn original_len(&self) -> u32 {
        self.original_len
    }

    /// Compressed payload slice (zero-copy)
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// Copy into an owned [`Frame`]
    pub fn to_frame(&self) -> Frame {
        Frame {
            original_len: self.original_len,
            payload: self.payload.to_vec(),
        }
    }
}

/// Stateless packet codec
///
/// Holds only configuration, so it is cheap to copy into worker tasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCodec {
    config: CodecConfig,
}

impl FrameCodec {
    /// Create a codec with the given configuration
    ///
    /// Fails if the ceiling does not fit the 32-bit length fields or the
    /// compression level is outside zlib's range.
    pub fn new(config: CodecConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Configuration in use
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Ceiling on declared uncompressed lengths
    pub fn max_original_len(&self) -> usize {
        self.config.max_original_len
    }

    /// Compress `data` into a frame
    ///
    /// Succeeds for any input, including empty buffers. Tiny or
    /// incompressible input produces a payload larger than the input.
    ///
    /// # Panics
    ///
    /// Panics if `data` is too large for the 32-bit length fields. The file
    /// and folder codecs check sizes against the configured ceiling first.
    pub fn encode(&self, data: &[u8]) -> Frame {
        let original_len =
            u32::try_from(data.len()).expect("frame input exceeds the u32 length field");

        let level = Compression::new(self.config.compression_level);
        let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2 + 64), level);
        // Writes go to a Vec, which cannot fail
        encoder
            .write_all(data)
            .expect("in-memory zlib encoder failed");
        let payload = encoder.finish().expect("in-memory zlib encoder failed");
        assert!(
            u32::try_from(payload.len()).is_ok(),
            "compressed frame exceeds the u32 length field"
        );

        Frame {
            original_len,
            payload,
        }
    }

    /// Encode straight to wire bytes
    pub fn encode_to_bytes(&self, data: &[u8]) -> Vec<u8> {
        self.encode(data).to_bytes()
    }

    /// Decode a standalone frame
    pub fn decode(&self, data: &[u8]) -> Result<Vec<u8>, FrameError> {
        let frame = FrameRef::parse(data, self.config.max_original_len)?;
        self.inflate(&frame)
    }

    /// Decode the next frame embedded in a larger message
    pub fn read_frame(&self, reader: &mut WireReader<'_>) -> Result<Vec<u8>, FrameError> {
        let frame = FrameRef::read(reader, self.config.max_original_len)?;
        self.inflate(&frame)
    }

    /// Decode an owned frame
    pub fn decode_frame(&self, frame: &Frame) -> Result<Vec<u8>, FrameError> {
        self.inflate(&frame.view())
    }

    /// Inflate a parsed frame, checking the result against the header
    pub fn inflate(&self, frame: &FrameRef<'_>) -> Result<Vec<u8>, FrameError> {
        let expected = frame.original_len() as usize;
        if expected > self.config.max_original_len {
            return Err(FrameError::SizeLimitExceeded {
                declared: expected as u64,
                limit: self.config.max_original_len as u64,
            });
        }

        let mut out = Vec::with_capacity(expected);
        // One byte past the declared length is enough to detect overrun
        let mut decoder = ZlibDecoder::new(frame.payload()).take(expected as u64 + 1);
        decoder
            .read_to_end(&mut out)
            .map_err(|e| FrameError::CorruptStream(e.to_string()))?;

        if out.len() != expected {
            return Err(FrameError::CorruptStream(format!(
                "inflated to {} bytes, header declared {}",
                out.len(),
                expected
            )));
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    fn codec() -> FrameCodec {
        FrameCodec::default()
    }

    #[test]
    fn test_frame_roundtrip() {
        let data = b"Hello, netplay! Hello, netplay! Hello, netplay!";
        let bytes = codec().encode_to_bytes(data);

        assert_eq!(codec().decode(&bytes).unwrap(), data);
    }

    #[test]
    fn test_empty_buffer_roundtrip() {
        let frame = codec().encode(&[]);
        assert_eq!(frame.original_len(), 0);
        assert!(frame.compressed_len() > 0);

        let decoded = codec().decode(&frame.to_bytes()).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_incompressible_input_may_grow() {
        let mut data = vec![0u8; 4096];
        rand::thread_rng().fill_bytes(&mut data);

        let frame = codec().encode(&data);
        assert!(frame.compressed_len() >= data.len());
        assert_eq!(codec().decode_frame(&frame).unwrap(), data);
    }

    #[test]
    fn test_compressible_input_shrinks() {
        let data = vec![0x42u8; 64 * 1024];
        let frame = codec().encode(&data);
        assert!(frame.compressed_len() < data.len() / 10);
    }

    #[test]
    fn test_header_layout_is_big_endian() {
        let frame = codec().encode(b"abc");
        let bytes = frame.to_bytes();

        assert_eq!(&bytes[0..4], &3u32.to_be_bytes());
        assert_eq!(
            &bytes[4..8],
            &(frame.compressed_len() as u32).to_be_bytes()
        );
        assert_eq!(&bytes[FRAME_HEADER_SIZE..], frame.payload());
    }

    #[test]
    fn test_frame_too_short() {
        let short = [0u8; 5];
        assert!(matches!(
            codec().decode(&short),
            Err(FrameError::Truncated {
                expected: FRAME_HEADER_SIZE,
                actual: 5
            })
        ));
    }

    #[test]
    fn test_truncated_at_every_boundary() {
        let bytes = codec().encode_to_bytes(b"some payload that spans a few bytes");

        for cut in 0..bytes.len() {
            assert!(
                matches!(
                    codec().decode(&bytes[..cut]),
                    Err(FrameError::Truncated { .. })
                ),
                "cut at {cut} was not reported as truncated"
            );
        }
    }

    #[test]
    fn test_declared_length_over_limit() {
        let codec = FrameCodec::new(CodecConfig {
            max_original_len: 1024,
            ..Default::default()
        })
        .unwrap();

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&u32::MAX.to_be_bytes());
        bytes.extend_from_slice(&4u32.to_be_bytes());
        bytes.extend_from_slice(&[0u8; 4]);

        assert_eq!(
            codec.decode(&bytes),
            Err(FrameError::SizeLimitExceeded {
                declared: u64::from(u32::MAX),
                limit: 1024
            })
        );
    }

    #[test]
    fn test_limit_checked_before_payload() {
        let codec = FrameCodec::new(CodecConfig {
            max_original_len: 16,
            ..Default::default()
        })
        .unwrap();

        // Header claims a huge payload that is not present
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&17u32.to_be_bytes());
        bytes.extend_from_slice(&u32::MAX.to_be_bytes());

        assert!(matches!(
            codec.decode(&bytes),
            Err(FrameError::SizeLimitExceeded { .. })
        ));
    }

    #[test]
    fn test_garbage_payload_is_corrupt() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&10u32.to_be_bytes());
        bytes.extend_from_slice(&6u32.to_be_bytes());
        bytes.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x11]);

        assert!(matches!(
            codec().decode(&bytes),
            Err(FrameError::CorruptStream(_))
        ));
    }

    #[test]
    fn test_length_mismatch_is_corrupt() {
        let mut bytes = codec().encode_to_bytes(b"twelve bytes");

        // Claim fewer bytes than the stream inflates to
        bytes[0..4].copy_from_slice(&4u32.to_be_bytes());
        assert!(matches!(
            codec().decode(&bytes),
            Err(FrameError::CorruptStream(_))
        ));

        // Claim more bytes than the stream inflates to
        bytes[0..4].copy_from_slice(&100u32.to_be_bytes());
        assert!(matches!(
            codec().decode(&bytes),
            Err(FrameError::CorruptStream(_))
        ));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = codec().encode_to_bytes(b"data");
        bytes.extend_from_slice(&[1, 2, 3]);

        assert_eq!(codec().decode(&bytes), Err(FrameError::TrailingBytes(3)));
    }

    #[test]
    fn test_read_consecutive_frames() {
        let mut buf = Vec::new();
        codec().encode(b"first").write_to(&mut buf);
        codec().encode(b"second").write_to(&mut buf);

        let mut reader = WireReader::new(&buf);
        assert_eq!(codec().read_frame(&mut reader).unwrap(), b"first");
        assert_eq!(codec().read_frame(&mut reader).unwrap(), b"second");
        assert!(reader.is_empty());
    }

    #[test]
    fn test_frame_ref_to_frame() {
        let frame = codec().encode(b"view me");
        let bytes = frame.to_bytes();
        let parsed = FrameRef::parse(&bytes, 1024).unwrap();

        assert_eq!(parsed.original_len(), 7);
        assert_eq!(parsed.to_frame(), frame);
    }

    #[test]
    fn test_new_rejects_unrepresentable_config() {
        let oversized = CodecConfig {
            max_original_len: u32::MAX as usize + 1,
            ..Default::default()
        };
        assert_eq!(
            FrameCodec::new(oversized).unwrap_err(),
            ConfigError::InvalidSizeLimit(u32::MAX as usize + 1)
        );

        let bad_level = CodecConfig {
            compression_level: 10,
            ..Default::default()
        };
        assert_eq!(
            FrameCodec::new(bad_level).unwrap_err(),
            ConfigError::InvalidCompressionLevel(10)
        );

        let widest = CodecConfig {
            max_original_len: u32::MAX as usize,
            ..Default::default()
        };
        assert_eq!(
            FrameCodec::new(widest).unwrap().max_original_len(),
            u32::MAX as usize
        );
    }
}
