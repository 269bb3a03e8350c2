//! Fuzz target for folder manifest parsing

#![no_main]

use libfuzzer_sys::fuzz_target;
use netplay_files::FolderManifest;

fuzz_target!(|data: &[u8]| {
    if let Ok(manifest) = FolderManifest::from_bytes(data, 1 << 20) {
        // Whatever parses must serialize back to the same bytes
        assert_eq!(manifest.to_bytes(), data);
    }
});
