//! Fuzz target for manifest path normalization
//!
//! An accepted path must resolve below the root.

#![no_main]

use libfuzzer_sys::fuzz_target;
use netplay_files::path::{normalize_relative, resolve};
use std::path::{Component, Path};

fuzz_target!(|raw: &str| {
    if let Ok(normalized) = normalize_relative(raw) {
        let root = Path::new("/fuzz-root");
        let resolved = resolve(root, &normalized);
        let relative = resolved.strip_prefix(root).expect("resolved outside root");
        assert!(relative.components().all(|c| matches!(c, Component::Normal(_))));
    }
});
