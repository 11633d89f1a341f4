//! A named bundle of nine typed keyframe tracks.
//!
//! Built by the asset source (canned) or at runtime (live), then handed to
//! the streamer. `init()` must run once per streaming session before any
//! streaming read; it rewinds every playhead and derives per-frame durations
//! from trigger deltas.

use serde::{Deserialize, Serialize};

use crate::error::StreamError;
use crate::frames::{
    BackpackLightsKeyFrame, BodyMotionKeyFrame, EventKeyFrame, HeadAngleKeyFrame, HeadingKeyFrame,
    LiftHeightKeyFrame, ProceduralFaceKeyFrame, RobotAudioKeyFrame, SpriteSequenceKeyFrame,
};
use crate::track::{Track, TrackBits, TrackKind};

macro_rules! each_track_mut {
    ($self:ident, $t:ident => $body:expr) => {{
        {
            let $t = &mut $self.head;
            $body;
        }
        {
            let $t = &mut $self.lift;
            $body;
        }
        {
            let $t = &mut $self.body;
            $body;
        }
        {
            let $t = &mut $self.sprite;
            $body;
        }
        {
            let $t = &mut $self.face;
            $body;
        }
        {
            let $t = &mut $self.event;
            $body;
        }
        {
            let $t = &mut $self.backpack;
            $body;
        }
        {
            let $t = &mut $self.heading;
            $body;
        }
        {
            let $t = &mut $self.audio;
            $body;
        }
    }};
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Animation {
    name: String,
    pub head: Track<HeadAngleKeyFrame>,
    pub lift: Track<LiftHeightKeyFrame>,
    pub body: Track<BodyMotionKeyFrame>,
    pub sprite: Track<SpriteSequenceKeyFrame>,
    pub face: Track<ProceduralFaceKeyFrame>,
    pub event: Track<EventKeyFrame>,
    pub backpack: Track<BackpackLightsKeyFrame>,
    pub heading: Track<HeadingKeyFrame>,
    pub audio: Track<RobotAudioKeyFrame>,
    #[serde(skip)]
    initialized: bool,
}

impl Animation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            head: Track::new(),
            lift: Track::new(),
            body: Track::new(),
            sprite: Track::new(),
            face: Track::new(),
            event: Track::new(),
            backpack: Track::new(),
            heading: Track::new(),
            audio: Track::new(),
            initialized: false,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Prepare for a streaming session: rewind every playhead and recompute
    /// frame durations as trigger deltas (the final frame of each track gets
    /// `last_frame_duration_ms`).
    pub fn init(&mut self, last_frame_duration_ms: u32) {
        each_track_mut!(self, t => {
            t.move_to_start();
            t.recompute_durations(last_frame_duration_ms);
        });
        self.initialized = true;
    }

    /// Rewind all playheads without recomputing durations (loop restart).
    pub fn restart(&mut self) {
        each_track_mut!(self, t => t.move_to_start());
    }

    /// Apply a per-track keyframe cap to every track, reporting the kind of
    /// the first track already holding more frames than allowed.
    pub fn apply_frame_cap(&mut self, cap: usize) -> Option<TrackKind> {
        each_track_mut!(self, t => t.set_cap(cap));
        if self.head.len() > cap {
            return Some(TrackKind::Head);
        }
        if self.lift.len() > cap {
            return Some(TrackKind::Lift);
        }
        if self.body.len() > cap {
            return Some(TrackKind::Body);
        }
        if self.sprite.len() > cap {
            return Some(TrackKind::Sprite);
        }
        if self.face.len() > cap {
            return Some(TrackKind::Face);
        }
        if self.event.len() > cap {
            return Some(TrackKind::Event);
        }
        if self.backpack.len() > cap {
            return Some(TrackKind::Backpack);
        }
        if self.heading.len() > cap {
            return Some(TrackKind::Heading);
        }
        if self.audio.len() > cap {
            return Some(TrackKind::Audio);
        }
        None
    }

    /// True iff every track is empty.
    pub fn is_empty(&self) -> bool {
        self.head.is_empty()
            && self.lift.is_empty()
            && self.body.is_empty()
            && self.sprite.is_empty()
            && self.face.is_empty()
            && self.event.is_empty()
            && self.backpack.is_empty()
            && self.heading.is_empty()
            && self.audio.is_empty()
    }

    /// True if any track still has unplayed frames.
    pub fn has_frames_left(&self) -> bool {
        self.head.has_frames_left()
            || self.lift.has_frames_left()
            || self.body.has_frames_left()
            || self.sprite.has_frames_left()
            || self.face.has_frames_left()
            || self.event.has_frames_left()
            || self.backpack.has_frames_left()
            || self.heading.has_frames_left()
            || self.audio.has_frames_left()
    }

    /// Advance every playhead past frames already finished at `to_time_ms`,
    /// without retrieving them.
    pub fn advance_tracks(&mut self, to_time_ms: u32) {
        each_track_mut!(self, t => t.advance_to(to_time_ms));
    }

    /// End time of the latest frame across all tracks.
    pub fn last_frame_end_ms(&self) -> u32 {
        [
            self.head.last_frame_end_ms(),
            self.lift.last_frame_end_ms(),
            self.body.last_frame_end_ms(),
            self.sprite.last_frame_end_ms(),
            self.face.last_frame_end_ms(),
            self.event.last_frame_end_ms(),
            self.backpack.last_frame_end_ms(),
            self.heading.last_frame_end_ms(),
            self.audio.last_frame_end_ms(),
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    /// Bitmask of the kinds with at least one frame.
    pub fn tracks_in_use(&self) -> TrackBits {
        let mut bits = TrackBits::NONE;
        if !self.head.is_empty() {
            bits.set(TrackKind::Head);
        }
        if !self.lift.is_empty() {
            bits.set(TrackKind::Lift);
        }
        if !self.body.is_empty() {
            bits.set(TrackKind::Body);
        }
        if !self.sprite.is_empty() {
            bits.set(TrackKind::Sprite);
        }
        if !self.face.is_empty() {
            bits.set(TrackKind::Face);
        }
        if !self.event.is_empty() {
            bits.set(TrackKind::Event);
        }
        if !self.backpack.is_empty() {
            bits.set(TrackKind::Backpack);
        }
        if !self.heading.is_empty() {
            bits.set(TrackKind::Heading);
        }
        if !self.audio.is_empty() {
            bits.set(TrackKind::Audio);
        }
        bits
    }

    /// Concatenate another animation onto this one's tail, shifting the
    /// appended triggers by this animation's final time. Used to chain
    /// canned clips.
    pub fn append_animation(&mut self, other: &Animation) -> Result<(), StreamError> {
        let shift = self.last_frame_end_ms();
        self.head.append_track(&other.head, shift)?;
        self.lift.append_track(&other.lift, shift)?;
        self.body.append_track(&other.body, shift)?;
        self.sprite.append_track(&other.sprite, shift)?;
        self.face.append_track(&other.face, shift)?;
        self.event.append_track(&other.event, shift)?;
        self.backpack.append_track(&other.backpack, shift)?;
        self.heading.append_track(&other.heading, shift)?;
        self.audio.append_track(&other.audio, shift)?;
        self.initialized = false;
        Ok(())
    }
}
