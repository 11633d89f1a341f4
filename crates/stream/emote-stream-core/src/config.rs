//! Core configuration for emote-stream-core.
//!
//! Configuration is an explicit value passed into constructors; there is no
//! global or lazily-initialized state. Hosts create one `StreamConfig` at
//! startup and hand it to the streamer.

use serde::{Deserialize, Serialize};

/// Fixed-tick streaming configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Duration of one control tick in milliseconds.
    pub tick_ms: u32,

    /// Hard cap on keyframes held by a single track. Applied to a clip's
    /// tracks when its session starts; a clip already over the cap is
    /// refused.
    pub max_frames_per_track: usize,

    /// Maximum serialized bytes handed to the transport per `update()` call.
    /// Messages over budget stay queued for the next tick.
    pub byte_budget_per_tick: usize,

    /// How many audio frames the stream cursor may run ahead of what the
    /// audio collaborator reports as consumed.
    pub max_audio_lead_frames: u32,

    /// Idle time after the last real stream before keep-alive takes over
    /// the face.
    pub keep_alive_idle_timeout_ms: u64,

    /// Sentinel duration assigned to the final keyframe of each track when
    /// an animation is initialized (trigger deltas define the rest).
    pub last_frame_duration_ms: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            tick_ms: 33,
            max_frames_per_track: 1000,
            byte_budget_per_tick: 1024,
            max_audio_lead_frames: 2,
            keep_alive_idle_timeout_ms: 1500,
            last_frame_duration_ms: 33,
        }
    }
}

/// Tunable keep-alive parameters, settable individually by key.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum KeepAliveParameter {
    BlinkIntervalMinMs,
    BlinkIntervalMaxMs,
    EyeDartIntervalMinMs,
    EyeDartIntervalMaxMs,
    EyeDartMaxDistancePix,
    SquintIntervalMinMs,
    SquintIntervalMaxMs,
}

/// Keep-alive parameter set with per-key get/set and reset-to-defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeepAliveParams {
    pub blink_interval_min_ms: f32,
    pub blink_interval_max_ms: f32,
    pub eye_dart_interval_min_ms: f32,
    pub eye_dart_interval_max_ms: f32,
    pub eye_dart_max_distance_pix: f32,
    pub squint_interval_min_ms: f32,
    pub squint_interval_max_ms: f32,
}

impl Default for KeepAliveParams {
    fn default() -> Self {
        Self {
            blink_interval_min_ms: 2000.0,
            blink_interval_max_ms: 5000.0,
            eye_dart_interval_min_ms: 500.0,
            eye_dart_interval_max_ms: 3000.0,
            eye_dart_max_distance_pix: 6.0,
            squint_interval_min_ms: 8000.0,
            squint_interval_max_ms: 20000.0,
        }
    }
}

impl KeepAliveParams {
    pub fn get(&self, key: KeepAliveParameter) -> f32 {
        match key {
            KeepAliveParameter::BlinkIntervalMinMs => self.blink_interval_min_ms,
            KeepAliveParameter::BlinkIntervalMaxMs => self.blink_interval_max_ms,
            KeepAliveParameter::EyeDartIntervalMinMs => self.eye_dart_interval_min_ms,
            KeepAliveParameter::EyeDartIntervalMaxMs => self.eye_dart_interval_max_ms,
            KeepAliveParameter::EyeDartMaxDistancePix => self.eye_dart_max_distance_pix,
            KeepAliveParameter::SquintIntervalMinMs => self.squint_interval_min_ms,
            KeepAliveParameter::SquintIntervalMaxMs => self.squint_interval_max_ms,
        }
    }

    pub fn set(&mut self, key: KeepAliveParameter, value: f32) {
        match key {
            KeepAliveParameter::BlinkIntervalMinMs => self.blink_interval_min_ms = value,
            KeepAliveParameter::BlinkIntervalMaxMs => self.blink_interval_max_ms = value,
            KeepAliveParameter::EyeDartIntervalMinMs => self.eye_dart_interval_min_ms = value,
            KeepAliveParameter::EyeDartIntervalMaxMs => self.eye_dart_interval_max_ms = value,
            KeepAliveParameter::EyeDartMaxDistancePix => self.eye_dart_max_distance_pix = value,
            KeepAliveParameter::SquintIntervalMinMs => self.squint_interval_min_ms = value,
            KeepAliveParameter::SquintIntervalMaxMs => self.squint_interval_max_ms = value,
        }
    }

    pub fn reset_defaults(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_roundtrip_and_reset() {
        let mut p = KeepAliveParams::default();
        p.set(KeepAliveParameter::BlinkIntervalMinMs, 1234.0);
        assert_eq!(p.get(KeepAliveParameter::BlinkIntervalMinMs), 1234.0);
        p.reset_defaults();
        assert_eq!(
            p.get(KeepAliveParameter::BlinkIntervalMinMs),
            KeepAliveParams::default().blink_interval_min_ms
        );
    }
}
