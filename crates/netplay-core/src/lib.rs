//! # Netplay Core
//!
//! Core of the netplay transfer layer used to move payloads between two
//! already-connected peers of a multiplayer synchronization session.
//!
//! This crate provides:
//! - Compressed frame encoding and decoding (zero-copy header parsing)
//! - A bounds-checked big-endian wire cursor
//! - The peer liveness monitor (acknowledgement-gap state machine)
//! - Configuration values and error types
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Session layer (external)                   │
//! ├────────────────────────────────┬────────────────────────────────┤
//! │   File / folder transfer       │                                │
//! │   (netplay-files)              │      Peer liveness monitor     │
//! ├────────────────────────────────┤   (fed by raw receipt events)  │
//! │   Frames                       │                                │
//! │   (zlib payload + length hdr)  │                                │
//! └────────────────────────────────┴────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod config;
pub mod error;
pub mod frame;
pub mod liveness;
pub mod wire;

use std::time::Duration;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CodecConfig, LivenessConfig, SessionSettings};
pub use error::{ConfigError, Error, FrameError};
pub use frame::{Frame, FrameCodec, FrameRef};
pub use liveness::{LivenessEvent, LivenessMonitor, PeerId, PeerLiveness, PeerStatus};
pub use wire::WireReader;

/// Fixed frame header size in bytes (`original_len: u32` + `compressed_len: u32`)
pub const FRAME_HEADER_SIZE: usize = 8;

/// Default ceiling on the declared uncompressed length of a single frame (256 MiB)
pub const DEFAULT_MAX_ORIGINAL_LEN: usize = 256 * 1024 * 1024;

/// Default zlib compression level
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Time without an acknowledged packet after which a peer is presumed gone
pub const PEER_TIMEOUT: Duration = Duration::from_secs(30);
