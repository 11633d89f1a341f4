//! Error types for the streaming core.
//!
//! Nothing here is fatal to the process: track-level failures are returned to
//! the immediate caller and never abort an in-progress session, and session
//! level failures leave any active session untouched.

use serde::{Deserialize, Serialize};

use crate::track::TrackKind;

/// Failure taxonomy for tracks, layers, sessions, and face-image reassembly.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum StreamError {
    /// Track is at its keyframe cap.
    #[error("track {kind:?} is full ({cap} keyframes)")]
    CapacityExceeded { kind: TrackKind, cap: usize },

    /// Appended keyframe does not strictly follow the track's last frame.
    #[error("keyframe at {attempted_ms}ms precedes earliest legal trigger {earliest_ms}ms")]
    OutOfOrderTrigger { attempted_ms: u32, earliest_ms: u32 },

    /// Sorted insert collided with an existing trigger time.
    #[error("keyframe already present at {time_ms}ms")]
    DuplicateTime { time_ms: u32 },

    /// Animation name not known to the library, or a null selection.
    #[error("animation not found: {name}")]
    InvalidAnimation { name: String },

    /// A session is active and the request declined to interrupt it.
    #[error("streamer busy with '{active}' and interrupt was not requested")]
    Busy { active: String },

    /// A new image id arrived before the previous image finished; the prior
    /// partial image was discarded.
    #[error("face image {discarded_id} discarded, reassembly restarted for {new_id}")]
    ReassemblyReset { discarded_id: u32, new_id: u32 },

    /// Chunk index outside the format's chunk count.
    #[error("chunk index {index} out of range for format with {count} chunks")]
    ChunkIndexOutOfRange { index: u8, count: u8 },

    /// A keep-alive modifier failed to synthesize its layer this cycle.
    #[error("keep-alive modifier '{name}' failed: {reason}")]
    ModifierFailed { name: String, reason: String },

    /// Named layer does not exist (persistent-layer append/removal).
    #[error("no persistent layer named '{name}'")]
    LayerNotFound { name: String },

    /// Malformed layer name or duration rejected at the API boundary.
    #[error("invalid layer: {reason}")]
    InvalidLayer { reason: String },

    /// Streaming read attempted before `Animation::init`.
    #[error("animation '{name}' was not initialized before streaming")]
    NotInitialized { name: String },

    /// Stored clip JSON failed to parse or validate.
    #[error("malformed animation clip: {reason}")]
    MalformedClip { reason: String },
}

impl StreamError {
    /// Coarse grouping for logging.
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::CapacityExceeded { .. }
            | Self::OutOfOrderTrigger { .. }
            | Self::DuplicateTime { .. } => "track",
            Self::InvalidAnimation { .. }
            | Self::Busy { .. }
            | Self::NotInitialized { .. }
            | Self::MalformedClip { .. } => "session",
            Self::ReassemblyReset { .. } | Self::ChunkIndexOutOfRange { .. } => "reassembly",
            Self::ModifierFailed { .. } => "keep-alive",
            Self::LayerNotFound { .. } | Self::InvalidLayer { .. } => "layer",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories() {
        let e = StreamError::DuplicateTime { time_ms: 40 };
        assert_eq!(e.category(), "track");
        let e = StreamError::Busy {
            active: "smile".into(),
        };
        assert_eq!(e.category(), "session");
    }

    #[test]
    fn serializes() {
        let e = StreamError::OutOfOrderTrigger {
            attempted_ms: 400,
            earliest_ms: 500,
        };
        let s = serde_json::to_string(&e).unwrap();
        let back: StreamError = serde_json::from_str(&s).unwrap();
        assert_eq!(e, back);
    }
}
