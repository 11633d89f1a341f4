//! Ordered keyframe storage with a single playhead.
//!
//! The playhead is a plain index into a growable vector, so copying a track
//! is a value copy and consuming a frame on a live track is a removal at the
//! playhead. Live tracks delete frames as they are played (one-shot); canned
//! tracks retain them so playback can rewind and loop.

use serde::{Deserialize, Serialize};

use crate::error::StreamError;
use crate::frames::KeyFrame;

/// Default keyframe cap per track; see `StreamConfig::max_frames_per_track`.
pub const MAX_FRAMES_PER_TRACK: usize = 1000;

/// The fixed set of track kinds an animation carries.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum TrackKind {
    Head,
    Lift,
    Body,
    Sprite,
    Face,
    Event,
    Backpack,
    Heading,
    Audio,
}

impl TrackKind {
    pub const ALL: [TrackKind; 9] = [
        TrackKind::Head,
        TrackKind::Lift,
        TrackKind::Body,
        TrackKind::Sprite,
        TrackKind::Face,
        TrackKind::Event,
        TrackKind::Backpack,
        TrackKind::Heading,
        TrackKind::Audio,
    ];

    #[inline]
    fn bit(self) -> u16 {
        1 << (self as u16)
    }

    /// Kinds that drive motors; only these are force-stopped on abort.
    #[inline]
    pub fn is_motor(self) -> bool {
        matches!(self, TrackKind::Head | TrackKind::Lift | TrackKind::Body)
    }
}

/// One bit per track kind; used for the lock mask and in-use reporting.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct TrackBits(u16);

impl TrackBits {
    pub const NONE: TrackBits = TrackBits(0);

    pub fn with(mut self, kind: TrackKind) -> TrackBits {
        self.set(kind);
        self
    }

    #[inline]
    pub fn set(&mut self, kind: TrackKind) {
        self.0 |= kind.bit();
    }

    #[inline]
    pub fn clear(&mut self, kind: TrackKind) {
        self.0 &= !kind.bit();
    }

    #[inline]
    pub fn contains(self, kind: TrackKind) -> bool {
        self.0 & kind.bit() != 0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn union(self, other: TrackBits) -> TrackBits {
        TrackBits(self.0 | other.0)
    }

    #[inline]
    pub fn intersect(self, other: TrackBits) -> TrackBits {
        TrackBits(self.0 & other.0)
    }

    /// Bits for the motor kinds only.
    pub fn motors(self) -> TrackBits {
        let mut out = TrackBits::NONE;
        for kind in TrackKind::ALL {
            if kind.is_motor() && self.contains(kind) {
                out.set(kind);
            }
        }
        out
    }
}

/// Ordered same-kind keyframes plus one playhead.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Track<F> {
    frames: Vec<F>,
    playhead: usize,
    live: bool,
    cap: usize,
}

impl<F: KeyFrame> Track<F> {
    /// A canned (rewindable) track.
    pub fn new() -> Self {
        Self {
            frames: Vec::new(),
            playhead: 0,
            live: false,
            cap: MAX_FRAMES_PER_TRACK,
        }
    }

    /// A live track: frames are deleted as they are played.
    pub fn live() -> Self {
        Self {
            live: true,
            ..Self::new()
        }
    }

    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = cap;
        self
    }

    /// Replace the keyframe cap. Frames already held are kept; appends past
    /// the new cap fail.
    pub fn set_cap(&mut self, cap: usize) {
        self.cap = cap;
    }

    #[inline]
    pub fn is_live(&self) -> bool {
        self.live
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// True if the playhead has not passed the last frame.
    #[inline]
    pub fn has_frames_left(&self) -> bool {
        self.playhead < self.frames.len()
    }

    #[inline]
    pub fn last_frame(&self) -> Option<&F> {
        self.frames.last()
    }

    /// End time (trigger + duration) of the final stored frame, 0 if empty.
    pub fn last_frame_end_ms(&self) -> u32 {
        self.frames
            .last()
            .map(|f| f.trigger_ms() + f.duration_ms())
            .unwrap_or(0)
    }

    /// Append after the current last frame. The new trigger must clear the
    /// previous frame's duration-adjusted end; only the immediately preceding
    /// frame is consulted. Fails leave the track unchanged.
    pub fn append_at_back(&mut self, frame: F) -> Result<(), StreamError> {
        if self.frames.len() >= self.cap {
            return Err(StreamError::CapacityExceeded {
                kind: F::KIND,
                cap: self.cap,
            });
        }
        if let Some(last) = self.frames.last() {
            let earliest = last.trigger_ms() + last.duration_ms().max(1);
            if frame.trigger_ms() < earliest {
                return Err(StreamError::OutOfOrderTrigger {
                    attempted_ms: frame.trigger_ms(),
                    earliest_ms: earliest,
                });
            }
        }
        let was_empty = self.frames.is_empty();
        self.frames.push(frame);
        if was_empty {
            self.playhead = 0;
        }
        Ok(())
    }

    /// Insert in trigger-time order; an exact trigger collision fails.
    pub fn insert_by_time(&mut self, frame: F) -> Result<(), StreamError> {
        if self.frames.len() >= self.cap {
            return Err(StreamError::CapacityExceeded {
                kind: F::KIND,
                cap: self.cap,
            });
        }
        match self
            .frames
            .binary_search_by_key(&frame.trigger_ms(), |f| f.trigger_ms())
        {
            Ok(_) => Err(StreamError::DuplicateTime {
                time_ms: frame.trigger_ms(),
            }),
            Err(pos) => {
                self.frames.insert(pos, frame);
                if pos < self.playhead {
                    self.playhead += 1;
                }
                Ok(())
            }
        }
    }

    /// Frame at the playhead, only once its trigger time has arrived.
    /// Never mutates the playhead.
    pub fn current_frame(&self, now_ms: u32) -> Option<&F> {
        self.frames
            .get(self.playhead)
            .filter(|f| f.is_time_to_play(now_ms))
    }

    /// Frame at the playhead regardless of time.
    #[inline]
    pub fn frame_at_playhead(&self) -> Option<&F> {
        self.frames.get(self.playhead)
    }

    /// Move the playhead past the current frame. On a live track the frame
    /// just left is deleted and unrecoverable.
    pub fn advance(&mut self) {
        if self.playhead >= self.frames.len() {
            return;
        }
        if self.live {
            self.frames.remove(self.playhead);
        } else {
            self.playhead += 1;
        }
    }

    /// Batch-advance past every frame whose end time has passed `ts_ms`,
    /// without retrieving them.
    pub fn advance_to(&mut self, ts_ms: u32) {
        while let Some(f) = self.frames.get(self.playhead) {
            if f.is_done(ts_ms) {
                self.advance();
            } else {
                break;
            }
        }
    }

    pub fn move_to_start(&mut self) {
        self.playhead = 0;
    }

    pub fn move_to_last(&mut self) {
        self.playhead = self.frames.len().saturating_sub(1);
    }

    /// Position past the last frame. A live track would consider everything
    /// played, so it is cleared outright (preserved as observed in the
    /// original system).
    pub fn move_to_end(&mut self) {
        if self.live {
            self.frames.clear();
            self.playhead = 0;
        } else {
            self.playhead = self.frames.len();
        }
    }

    /// Recompute per-frame durations as trigger deltas; the final frame gets
    /// the sentinel duration.
    pub fn recompute_durations(&mut self, last_frame_duration_ms: u32) {
        let n = self.frames.len();
        for i in 0..n {
            let dur = if i + 1 < n {
                self.frames[i + 1].trigger_ms() - self.frames[i].trigger_ms()
            } else {
                last_frame_duration_ms
            };
            self.frames[i].set_duration_ms(dur);
        }
    }

    /// Concatenate another track's frames onto this one's tail, shifting
    /// every appended trigger by `shift_ms`.
    pub fn append_track(&mut self, other: &Track<F>, shift_ms: u32) -> Result<(), StreamError> {
        for f in &other.frames {
            let mut shifted = f.clone();
            shifted.set_trigger_ms(f.trigger_ms() + shift_ms);
            self.append_at_back(shifted)?;
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &F> {
        self.frames.iter()
    }
}
