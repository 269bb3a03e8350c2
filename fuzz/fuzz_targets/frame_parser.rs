//! Fuzz target for frame parsing
//!
//! Arbitrary bytes must only ever produce Ok or Err, and a successful decode
//! must respect the ceiling.

#![no_main]

use libfuzzer_sys::fuzz_target;
use netplay_core::{CodecConfig, FrameCodec, FrameRef};

const LIMIT: usize = 1 << 20;

fuzz_target!(|data: &[u8]| {
    let _ = FrameRef::parse(data, LIMIT);

    let codec = FrameCodec::new(CodecConfig {
        max_original_len: LIMIT,
        ..Default::default()
    })
    .unwrap();
    if let Ok(decoded) = codec.decode(data) {
        assert!(decoded.len() <= LIMIT);
    }
});
