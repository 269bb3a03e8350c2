//! Property-based tests for the netplay transfer layer
//!
//! Uses proptest to verify invariants across large input spaces.

use proptest::prelude::*;

// ============================================================================
// Frame Encoding/Decoding Properties
// ============================================================================

mod frame_properties {
    use super::*;
    use netplay_core::{CodecConfig, FRAME_HEADER_SIZE, FrameCodec, FrameError, FrameRef};

    proptest! {
        /// Anything encoded decodes to the same bytes
        #[test]
        fn frame_roundtrip(data in prop::collection::vec(any::<u8>(), 0..8192)) {
            let codec = FrameCodec::default();
            let bytes = codec.encode_to_bytes(&data);

            prop_assert_eq!(codec.decode(&bytes).unwrap(), data);
        }

        /// Repetitive input survives the roundtrip too (exercises real compression)
        #[test]
        fn frame_roundtrip_repetitive(byte in any::<u8>(), len in 0usize..65536, level in 0u32..=9) {
            let codec = FrameCodec::new(CodecConfig {
                compression_level: level,
                ..Default::default()
            })
            .unwrap();
            let data = vec![byte; len];
            let frame = codec.encode(&data);

            prop_assert_eq!(frame.original_len() as usize, len);
            prop_assert_eq!(codec.decode_frame(&frame).unwrap(), data);
        }

        /// Cutting a frame anywhere short of its end is always `Truncated`
        #[test]
        fn frame_truncation_detected(
            data in prop::collection::vec(any::<u8>(), 0..2048),
            cut_ratio in 0.0f64..1.0,
        ) {
            let codec = FrameCodec::default();
            let bytes = codec.encode_to_bytes(&data);
            let cut = ((bytes.len() as f64) * cut_ratio) as usize;
            prop_assume!(cut < bytes.len());

            let result = codec.decode(&bytes[..cut]);
            prop_assert!(matches!(result, Err(FrameError::Truncated { .. })), "cut {}: {:?}", cut, result);
        }

        /// A declared length over the ceiling fails before the payload is looked at
        #[test]
        fn frame_ceiling_enforced(
            limit in 1usize..1_000_000,
            excess in 1u32..1_000_000,
            compressed_len in any::<u32>(),
        ) {
            let declared = limit as u32 + excess;
            let mut bytes = Vec::with_capacity(FRAME_HEADER_SIZE);
            bytes.extend_from_slice(&declared.to_be_bytes());
            bytes.extend_from_slice(&compressed_len.to_be_bytes());

            let codec = FrameCodec::new(CodecConfig {
                max_original_len: limit,
                ..Default::default()
            })
            .unwrap();
            let result = codec.decode(&bytes);
            prop_assert!(
                matches!(result, Err(FrameError::SizeLimitExceeded { .. })),
                "{:?}",
                result
            );
        }

        /// Arbitrary bytes never panic the parser or decoder
        #[test]
        fn frame_garbage_never_panics(data in prop::collection::vec(any::<u8>(), 0..512)) {
            let _ = FrameRef::parse(&data, 1 << 20);
            let _ = FrameCodec::default().decode(&data);
        }
    }
}

// ============================================================================
// Path Normalization Properties
// ============================================================================

mod path_properties {
    use super::*;
    use netplay_files::TransferError;
    use netplay_files::path::{normalize_relative, resolve};
    use std::path::{Component, Path};

    fn component() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("..".to_string()),
            Just(".".to_string()),
            Just(String::new()),
            "[a-zA-Z0-9_\\-]{1,8}",
            "[a-z]{1,3}[:\\\\][a-z]{0,3}",
        ]
    }

    proptest! {
        /// Whatever the input, an accepted path resolves below the root
        #[test]
        fn normalized_paths_stay_under_root(
            parts in prop::collection::vec(component(), 0..12),
            absolute in any::<bool>(),
        ) {
            let mut raw = parts.join("/");
            if absolute {
                raw.insert(0, '/');
            }

            match normalize_relative(&raw) {
                Ok(normalized) => {
                    let root = Path::new("/dst");
                    let resolved = resolve(root, &normalized);
                    prop_assert!(resolved.starts_with(root));
                    prop_assert!(
                        resolved
                            .strip_prefix(root)
                            .unwrap()
                            .components()
                            .all(|c| matches!(c, Component::Normal(_)))
                    );
                    prop_assert!(!normalized.contains(".."));
                }
                Err(e) => prop_assert!(matches!(e, TransferError::PathEscape { .. }), "unexpected error: {:?}", e),
            }
        }

        /// Plain names pass through unchanged
        #[test]
        fn plain_paths_unchanged(parts in prop::collection::vec("[a-zA-Z0-9_]{1,8}", 1..6)) {
            let raw = parts.join("/");
            prop_assert_eq!(normalize_relative(&raw).unwrap(), raw);
        }

        /// Climbing one level above the depth reached always escapes
        #[test]
        fn excess_parent_always_escapes(
            parts in prop::collection::vec("[a-z]{1,6}", 0..5),
        ) {
            let mut raw = parts.join("/");
            for _ in 0..=parts.len() {
                if !raw.is_empty() {
                    raw.push('/');
                }
                raw.push_str("..");
            }
            prop_assert!(
                matches!(normalize_relative(&raw), Err(TransferError::PathEscape { .. })),
                "{}",
                raw
            );
        }
    }
}

// ============================================================================
// Manifest Properties
// ============================================================================

mod manifest_properties {
    use super::*;
    use netplay_core::{DEFAULT_MAX_ORIGINAL_LEN, FrameCodec};
    use netplay_files::{FolderManifest, ManifestEntry};

    fn entry() -> impl Strategy<Value = (String, Option<Vec<u8>>)> {
        (
            "[a-z]{1,6}(/[a-z]{1,6}){0,3}",
            prop::option::of(prop::collection::vec(any::<u8>(), 0..256)),
        )
    }

    proptest! {
        /// A manifest parses back to itself
        #[test]
        fn manifest_roundtrip(entries in prop::collection::vec(entry(), 0..16)) {
            let codec = FrameCodec::default();
            let mut manifest = FolderManifest::new();
            for (path, contents) in entries {
                let entry = match contents {
                    Some(data) => ManifestEntry::file(path, codec.encode(&data)),
                    None => ManifestEntry::directory(path),
                };
                manifest.push(entry).unwrap();
            }

            let bytes = manifest.to_bytes();
            prop_assert_eq!(bytes.len(), manifest.encoded_len());
            let parsed = FolderManifest::from_bytes(&bytes, DEFAULT_MAX_ORIGINAL_LEN).unwrap();
            prop_assert_eq!(parsed, manifest);
        }

        /// Arbitrary bytes never panic the manifest parser
        #[test]
        fn manifest_garbage_never_panics(data in prop::collection::vec(any::<u8>(), 0..512)) {
            let _ = FolderManifest::from_bytes(&data, 1 << 20);
        }
    }
}

// ============================================================================
// Folder Round-Trip Properties
// ============================================================================

mod folder_properties {
    use super::*;
    use netplay_files::FolderCodec;
    use netplay_integration_tests::list_tree;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    // Directory and file names use distinct first letters so a generated file
    // never sits where another entry needs a directory
    #[cfg(not(windows))]
    const NAME_TAIL: &str = "[-a-zA-Z0-9 _.:\\\\]{0,8}";
    #[cfg(windows)]
    const NAME_TAIL: &str = "[a-zA-Z0-9 _-]{0,7}[a-zA-Z0-9_-]";

    fn dir_name() -> impl Strategy<Value = String> {
        prop::string::string_regex(&format!("d{NAME_TAIL}")).unwrap()
    }

    fn file_name() -> impl Strategy<Value = String> {
        prop::string::string_regex(&format!("f{NAME_TAIL}")).unwrap()
    }

    /// One node: a directory chain, optionally ending in a file
    fn node() -> impl Strategy<Value = (Vec<String>, Option<(String, Vec<u8>)>)> {
        (
            prop::collection::vec(dir_name(), 0..4),
            prop::option::of((file_name(), prop::collection::vec(any::<u8>(), 0..512))),
        )
    }

    fn build_tree(root: &Path, nodes: &[(Vec<String>, Option<(String, Vec<u8>)>)]) {
        for (dirs, file) in nodes {
            let dir = dirs.iter().fold(root.to_path_buf(), |p, d| p.join(d));
            fs::create_dir_all(&dir).unwrap();
            if let Some((name, contents)) = file {
                fs::write(dir.join(name), contents).unwrap();
            }
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        /// Sending a tree and receiving it elsewhere reproduces every path,
        /// every empty directory and every file's bytes
        #[test]
        fn folder_roundtrip_any_tree(nodes in prop::collection::vec(node(), 0..12)) {
            let src = TempDir::new().unwrap();
            build_tree(src.path(), &nodes);
            let dst = TempDir::new().unwrap();
            let out = dst.path().join("received");

            let codec = FolderCodec::default();
            let bytes = codec.send_folder(src.path()).unwrap().to_bytes();
            codec.receive_folder_bytes(&bytes, &out).unwrap();

            let expected = list_tree(src.path());
            prop_assert_eq!(&expected, &list_tree(&out));
            for relative in expected.iter().filter(|p| !p.ends_with('/')) {
                prop_assert_eq!(
                    fs::read(src.path().join(relative)).unwrap(),
                    fs::read(out.join(relative)).unwrap(),
                    "{}",
                    relative
                );
            }
        }
    }
}
