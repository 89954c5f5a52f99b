//! Node, port and link identities plus the typed node vocabulary.

use serde::{Deserialize, Serialize};

/// Engine node handle type
pub type NodeId = u32;

/// Engine port handle type
pub type PortId = u32;

/// Engine link handle type
pub type LinkId = u32;

/// Typed processing unit kinds understood by the Engine.
///
/// Static topology kinds plus the kinds of the dynamically built live
/// decode sub-chain (`Depacketize` through `Normalize`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Network feed receiver (ports discovered after negotiation)
    LiveSource,
    /// Synthetic placeholder generator, always available
    FallbackSource,
    /// Single-active-input multiplexer
    Selector,
    /// One-to-many replicator feeding the profile branches
    FanOut,
    /// Resolution scaler (per profile)
    Scale,
    /// Frame-rate normalizer (per profile)
    Rate,
    /// Video encoder (per profile)
    Encoder,
    /// Segment writer / manifest producer (per profile)
    Packager,
    /// Strips transport packetization from the live feed
    Depacketize,
    /// Elementary stream parser
    Parse,
    /// Video decoder
    Decode,
    /// Converts decoded output to the canonical intermediate format
    Normalize,
}

/// Engine node run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Idle,
    Running,
}

/// Media classification of a discovered elementary stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Video,
    Audio,
    Data,
}

/// Stream metadata carried by dynamic port-available notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    /// Media classification; only video ports are consumed
    pub media: MediaKind,
    /// Encoding name as reported by the Engine (e.g., "h264")
    pub encoding: String,
}

impl StreamInfo {
    pub fn video(encoding: impl Into<String>) -> Self {
        Self {
            media: MediaKind::Video,
            encoding: encoding.into(),
        }
    }

    pub fn audio(encoding: impl Into<String>) -> Self {
        Self {
            media: MediaKind::Audio,
            encoding: encoding.into(),
        }
    }

    pub fn is_video(&self) -> bool {
        self.media == MediaKind::Video
    }
}
