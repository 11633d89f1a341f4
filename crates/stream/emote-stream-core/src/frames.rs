//! The keyframe variant set.
//!
//! One concrete struct per track kind, all behind the `KeyFrame` seam
//! (trigger/duration accessors, time predicates, message translation). Tracks
//! are monomorphized per kind; there is no dynamic dispatch on the hot path.

use serde::{Deserialize, Serialize};

use crate::face::ProceduralFace;
use crate::messages::StreamMessage;
use crate::track::TrackKind;

/// Shared contract every keyframe kind implements.
pub trait KeyFrame: Clone {
    /// Track kind this frame belongs to.
    const KIND: TrackKind;

    /// Track-relative trigger time in milliseconds.
    fn trigger_ms(&self) -> u32;
    fn set_trigger_ms(&mut self, ms: u32);

    fn duration_ms(&self) -> u32;
    fn set_duration_ms(&mut self, ms: u32);

    /// Eligible to play once the clock reaches the trigger.
    #[inline]
    fn is_time_to_play(&self, now_ms: u32) -> bool {
        now_ms >= self.trigger_ms()
    }

    /// Fully elapsed at `now_ms`.
    #[inline]
    fn is_done(&self, now_ms: u32) -> bool {
        now_ms >= self.trigger_ms() + self.duration_ms()
    }

    /// Translate into one transport message.
    fn to_message(&self) -> StreamMessage;
}

macro_rules! impl_keyframe {
    ($ty:ty, $kind:expr, |$this:ident| $msg:expr) => {
        impl KeyFrame for $ty {
            const KIND: TrackKind = $kind;

            #[inline]
            fn trigger_ms(&self) -> u32 {
                self.trigger_ms
            }

            #[inline]
            fn set_trigger_ms(&mut self, ms: u32) {
                self.trigger_ms = ms;
            }

            #[inline]
            fn duration_ms(&self) -> u32 {
                self.duration_ms
            }

            #[inline]
            fn set_duration_ms(&mut self, ms: u32) {
                self.duration_ms = ms;
            }

            fn to_message(&self) -> StreamMessage {
                let $this = self;
                $msg
            }
        }
    };
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeadAngleKeyFrame {
    pub trigger_ms: u32,
    pub duration_ms: u32,
    pub angle_deg: f32,
    pub variability_deg: f32,
}

impl_keyframe!(HeadAngleKeyFrame, TrackKind::Head, |f| {
    StreamMessage::HeadAngle {
        angle_deg: f.angle_deg,
        duration_ms: f.duration_ms,
        variability_deg: f.variability_deg,
    }
});

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LiftHeightKeyFrame {
    pub trigger_ms: u32,
    pub duration_ms: u32,
    pub height_mm: f32,
    pub variability_mm: f32,
}

impl_keyframe!(LiftHeightKeyFrame, TrackKind::Lift, |f| {
    StreamMessage::LiftHeight {
        height_mm: f.height_mm,
        duration_ms: f.duration_ms,
        variability_mm: f.variability_mm,
    }
});

/// Arc motion: straight when `radius_mm` is infinite-as-sentinel (f32::MAX),
/// point turn when zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BodyMotionKeyFrame {
    pub trigger_ms: u32,
    pub duration_ms: u32,
    pub radius_mm: f32,
    pub speed_mmps: f32,
}

impl_keyframe!(BodyMotionKeyFrame, TrackKind::Body, |f| {
    StreamMessage::BodyMotion {
        radius_mm: f.radius_mm,
        speed_mmps: f.speed_mmps,
        duration_ms: f.duration_ms,
    }
});

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpriteSequenceKeyFrame {
    pub trigger_ms: u32,
    pub duration_ms: u32,
    pub sequence_name: String,
    pub loop_count: u32,
}

impl_keyframe!(SpriteSequenceKeyFrame, TrackKind::Sprite, |f| {
    StreamMessage::SpriteSequence {
        name: f.sequence_name.clone(),
        loop_count: f.loop_count,
    }
});

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProceduralFaceKeyFrame {
    pub trigger_ms: u32,
    pub duration_ms: u32,
    pub face: ProceduralFace,
}

impl ProceduralFaceKeyFrame {
    pub fn new(trigger_ms: u32, duration_ms: u32, face: ProceduralFace) -> Self {
        Self {
            trigger_ms,
            duration_ms,
            face,
        }
    }
}

impl_keyframe!(ProceduralFaceKeyFrame, TrackKind::Face, |f| {
    StreamMessage::ProceduralFace {
        face: f.face,
        duration_ms: f.duration_ms,
    }
});

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventKeyFrame {
    pub trigger_ms: u32,
    pub duration_ms: u32,
    pub event_id: u32,
}

impl_keyframe!(EventKeyFrame, TrackKind::Event, |f| {
    StreamMessage::AnimationEvent {
        event_id: f.event_id,
    }
});

/// Five backpack LEDs, RGBA packed per light.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BackpackLightsKeyFrame {
    pub trigger_ms: u32,
    pub duration_ms: u32,
    pub colors: [u32; 5],
}

impl_keyframe!(BackpackLightsKeyFrame, TrackKind::Backpack, |f| {
    StreamMessage::BackpackLights {
        colors: f.colors,
        duration_ms: f.duration_ms,
    }
});

/// Heading bookkeeping shares one track: a `Record` marks the robot's current
/// heading, a later `TurnToRecorded` turns back to it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum HeadingAction {
    Record,
    TurnToRecorded {
        offset_deg: f32,
        speed_deg_s: f32,
        accel_deg_s2: f32,
        tolerance_deg: f32,
        num_half_revs: u16,
        use_shortest_direction: bool,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeadingKeyFrame {
    pub trigger_ms: u32,
    pub duration_ms: u32,
    pub action: HeadingAction,
}

impl_keyframe!(HeadingKeyFrame, TrackKind::Heading, |f| {
    match &f.action {
        HeadingAction::Record => StreamMessage::RecordHeading,
        HeadingAction::TurnToRecorded {
            offset_deg,
            speed_deg_s,
            accel_deg_s2,
            tolerance_deg,
            num_half_revs,
            use_shortest_direction,
        } => StreamMessage::TurnToRecordedHeading {
            offset_deg: *offset_deg,
            speed_deg_s: *speed_deg_s,
            accel_deg_s2: *accel_deg_s2,
            tolerance_deg: *tolerance_deg,
            num_half_revs: *num_half_revs,
            use_shortest_direction: *use_shortest_direction,
        },
    }
});

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RobotAudioKeyFrame {
    pub trigger_ms: u32,
    pub duration_ms: u32,
    pub event_ids: Vec<u32>,
    pub volume: f32,
    pub probability: f32,
}

impl_keyframe!(RobotAudioKeyFrame, TrackKind::Audio, |f| {
    StreamMessage::AudioEvent {
        event_ids: f.event_ids.clone(),
        volume: f.volume,
    }
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_predicates() {
        let f = HeadAngleKeyFrame {
            trigger_ms: 100,
            duration_ms: 50,
            angle_deg: 0.0,
            variability_deg: 0.0,
        };
        assert!(!f.is_time_to_play(99));
        assert!(f.is_time_to_play(100));
        assert!(!f.is_done(149));
        assert!(f.is_done(150));
    }

    #[test]
    fn heading_actions_translate() {
        let rec = HeadingKeyFrame {
            trigger_ms: 0,
            duration_ms: 0,
            action: HeadingAction::Record,
        };
        assert!(matches!(rec.to_message(), StreamMessage::RecordHeading));
        let turn = HeadingKeyFrame {
            trigger_ms: 0,
            duration_ms: 0,
            action: HeadingAction::TurnToRecorded {
                offset_deg: 0.0,
                speed_deg_s: 90.0,
                accel_deg_s2: 180.0,
                tolerance_deg: 2.0,
                num_half_revs: 0,
                use_shortest_direction: true,
            },
        };
        assert!(matches!(
            turn.to_message(),
            StreamMessage::TurnToRecordedHeading { .. }
        ));
    }
}
