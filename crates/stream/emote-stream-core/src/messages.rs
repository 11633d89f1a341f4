//! Outbound transport message contract.
//!
//! The wire format itself is owned by the transport collaborator; this core
//! only commits to a serialized-size accounting so the per-tick byte budget
//! can be enforced before hand-off.

use serde::{Deserialize, Serialize};

use crate::chunks::FaceImageFormat;
use crate::face::ProceduralFace;
use crate::track::TrackBits;

/// One per-tick command for the robot process, or a session notification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum StreamMessage {
    HeadAngle {
        angle_deg: f32,
        duration_ms: u32,
        variability_deg: f32,
    },
    LiftHeight {
        height_mm: f32,
        duration_ms: u32,
        variability_mm: f32,
    },
    BodyMotion {
        radius_mm: f32,
        speed_mmps: f32,
        duration_ms: u32,
    },
    SpriteSequence {
        name: String,
        loop_count: u32,
    },
    ProceduralFace {
        face: ProceduralFace,
        duration_ms: u32,
    },
    AnimationEvent {
        event_id: u32,
    },
    BackpackLights {
        colors: [u32; 5],
        duration_ms: u32,
    },
    RecordHeading,
    TurnToRecordedHeading {
        offset_deg: f32,
        speed_deg_s: f32,
        accel_deg_s2: f32,
        tolerance_deg: f32,
        num_half_revs: u16,
        use_shortest_direction: bool,
    },
    AudioEvent {
        event_ids: Vec<u32>,
        volume: f32,
    },
    DisplayFaceImage {
        format: FaceImageFormat,
        data: Vec<u8>,
        duration_ms: u32,
    },
    AnimationStarted {
        name: String,
        tag: u32,
    },
    AnimationEnded {
        name: String,
        tag: u32,
        aborting: bool,
        streaming_time_ms: u32,
    },
    StopMotors {
        tracks: TrackBits,
    },
    EnableBackpackLayer {
        enabled: bool,
    },
}

impl StreamMessage {
    /// Serialized size charged against the per-tick byte budget.
    pub fn wire_size(&self) -> usize {
        // Plain data enums cannot fail to size; fall back to zero rather
        // than panic if that ever changes.
        bincode::serialized_size(self).map(|n| n as usize).unwrap_or(0)
    }
}
