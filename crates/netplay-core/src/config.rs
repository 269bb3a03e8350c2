//! Configuration values handed to the transfer layer.
//!
//! Nothing here reads files or command lines; the surrounding application
//! builds these values (or deserializes them with serde) and passes them to
//! constructors.

use crate::error::ConfigError;
use crate::{DEFAULT_COMPRESSION_LEVEL, DEFAULT_MAX_ORIGINAL_LEN, PEER_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Packet codec configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Largest uncompressed length a frame may declare
    pub max_original_len: usize,

    /// zlib compression level (0-9)
    pub compression_level: u32,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_original_len: DEFAULT_MAX_ORIGINAL_LEN,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl CodecConfig {
    /// Check that the values can be honoured by the wire format
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_original_len == 0 || self.max_original_len as u64 > u64::from(u32::MAX) {
            return Err(ConfigError::InvalidSizeLimit(self.max_original_len));
        }
        if self.compression_level > 9 {
            return Err(ConfigError::InvalidCompressionLevel(self.compression_level));
        }
        Ok(())
    }
}

/// Peer liveness configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LivenessConfig {
    /// Acknowledgement gap after which a connected peer is timed out
    pub timeout: Duration,

    /// How often the background ticker evaluates the peer table
    pub tick_interval: Duration,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            timeout: PEER_TIMEOUT,
            tick_interval: Duration::from_secs(1),
        }
    }
}

impl LivenessConfig {
    /// Reject a zero timeout or tick interval
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() || self.tick_interval.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

/// Session identity and endpoint, supplied already parsed by the host application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Player nickname
    pub nickname: String,
    /// Room password
    pub password: String,
    /// Room name
    pub room: String,
    /// Matchmaking region
    pub region: String,
    /// Game or payload file offered to the session
    pub filename: String,
    /// Remote host
    pub host: String,
    /// Remote port
    pub port: u16,
}

impl SessionSettings {
    /// True when every field carries a value
    pub fn is_valid(&self) -> bool {
        !self.nickname.is_empty()
            && !self.password.is_empty()
            && !self.room.is_empty()
            && !self.region.is_empty()
            && !self.filename.is_empty()
            && !self.host.is_empty()
            && self.port != 0
    }
}
