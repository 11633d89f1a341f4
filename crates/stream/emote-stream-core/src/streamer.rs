//! Session orchestration: one streamer, one control tick, one transport.
//!
//! `update()` is called once per fixed tick by the host's main loop. It pulls
//! every due keyframe from the active session's tracks, resolves layers,
//! translates frames to transport messages, and drains them within the
//! per-tick byte budget; the remainder carries over. With no session active
//! past the idle timeout, keep-alive drives the face instead.
//!
//! Everything is single-threaded; `abort()` and `set_streaming_animation()`
//! take full effect before the next tick.

use std::collections::VecDeque;

use crate::animation::Animation;
use crate::chunks::{ChunkOutcome, FaceImageAssembler, FaceImageChunk, FaceImageFormat};
use crate::config::{KeepAliveParameter, KeepAliveParams, StreamConfig};
use crate::error::StreamError;
use crate::frames::KeyFrame;
use crate::layer_component::{LayeredKeyFrames, TrackLayerComponent};
use crate::library::AnimationLibrary;
use crate::messages::StreamMessage;
use crate::track::{TrackBits, TrackKind};
use crate::transport::{AudioClient, MessageSink};

/// Game object all animation audio events are posted under.
const AUDIO_GAME_OBJECT_ID: u32 = 0;

struct Session {
    name: String,
    tag: u32,
    anim: Animation,
    /// Session-relative playback clock; held while audio lead is exhausted.
    anim_time_ms: u32,
    loops_remaining: u32,
    loop_forever: bool,
    sent_start: bool,
    sent_end: bool,
    tracks_in_use: TrackBits,
}

pub struct AnimationStreamer {
    config: StreamConfig,
    params: KeepAliveParams,
    layers: TrackLayerComponent,
    session: Option<Session>,
    /// Monotonic stream clock shared by layers and keep-alive, in ms.
    stream_time_ms: u32,
    last_stream_end_ms: u32,
    locked: TrackBits,
    queue: VecDeque<StreamMessage>,
    audio_frames_streamed: u32,
    backpack_enabled: bool,
    binary_assembler: FaceImageAssembler,
    gray_assembler: FaceImageAssembler,
    rgb_assembler: FaceImageAssembler,
    /// Procedural face output is suppressed while an image override holds.
    face_override_until_ms: u32,
}

impl AnimationStreamer {
    pub fn new(config: StreamConfig) -> Self {
        let params = KeepAliveParams::default();
        let layers = TrackLayerComponent::new(&params);
        Self::assemble(config, params, layers)
    }

    /// Deterministic keep-alive scheduling for tests.
    pub fn with_seed(config: StreamConfig, seed: u64) -> Self {
        let params = KeepAliveParams::default();
        let layers = TrackLayerComponent::with_seed(&params, seed);
        Self::assemble(config, params, layers)
    }

    fn assemble(config: StreamConfig, params: KeepAliveParams, layers: TrackLayerComponent) -> Self {
        Self {
            config,
            params,
            layers,
            session: None,
            stream_time_ms: 0,
            last_stream_end_ms: 0,
            locked: TrackBits::NONE,
            queue: VecDeque::new(),
            audio_frames_streamed: 0,
            backpack_enabled: false,
            binary_assembler: FaceImageAssembler::new(FaceImageFormat::Binary),
            gray_assembler: FaceImageAssembler::new(FaceImageFormat::Grayscale),
            rgb_assembler: FaceImageAssembler::new(FaceImageFormat::Rgb565),
            face_override_until_ms: 0,
        }
    }

    #[inline]
    pub fn is_streaming(&self) -> bool {
        self.session.is_some()
    }

    pub fn streaming_name(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.name.as_str())
    }

    pub fn current_tag(&self) -> Option<u32> {
        self.session.as_ref().map(|s| s.tag)
    }

    #[inline]
    pub fn stream_time_ms(&self) -> u32 {
        self.stream_time_ms
    }

    #[inline]
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Direct access to the layer managers (host-driven overlays).
    pub fn layers_mut(&mut self) -> &mut TrackLayerComponent {
        &mut self.layers
    }

    pub fn lock_track(&mut self, kind: TrackKind) {
        self.locked.set(kind);
    }

    pub fn unlock_track(&mut self, kind: TrackKind) {
        self.locked.clear(kind);
    }

    pub fn set_locked_tracks(&mut self, locked: TrackBits) {
        self.locked = locked;
    }

    #[inline]
    pub fn locked_tracks(&self) -> TrackBits {
        self.locked
    }

    pub fn set_keep_alive_parameter(&mut self, key: KeepAliveParameter, value: f32) {
        self.params.set(key, value);
    }

    pub fn keep_alive_parameter(&self, key: KeepAliveParameter) -> f32 {
        self.params.get(key)
    }

    pub fn reset_keep_alive_parameters(&mut self) {
        self.params.reset_defaults();
    }

    /// Begin a session from a library clip. An empty name aborts instead.
    pub fn set_streaming_animation_by_name(
        &mut self,
        library: &AnimationLibrary,
        name: &str,
        tag: u32,
        num_loops: u32,
        interrupt_running: bool,
    ) -> Result<(), StreamError> {
        if name.is_empty() {
            self.abort();
            return Ok(());
        }
        let anim = library
            .get(name)
            .cloned()
            .ok_or_else(|| StreamError::InvalidAnimation {
                name: name.to_string(),
            })?;
        self.set_streaming_animation(Some(anim), tag, num_loops, interrupt_running)
    }

    /// Begin a session. `None` (or an animation with no frames) aborts any
    /// active session instead. With a session active and `interrupt_running`
    /// false the request fails `Busy` and the active session is untouched.
    /// `num_loops` of zero loops forever.
    pub fn set_streaming_animation(
        &mut self,
        anim: Option<Animation>,
        tag: u32,
        num_loops: u32,
        interrupt_running: bool,
    ) -> Result<(), StreamError> {
        let mut anim = match anim {
            Some(a) if !a.is_empty() => a,
            _ => {
                self.abort();
                return Ok(());
            }
        };
        if let Some(active) = &self.session {
            if !interrupt_running {
                return Err(StreamError::Busy {
                    active: active.name.clone(),
                });
            }
        }
        let cap = self.config.max_frames_per_track;
        if let Some(kind) = anim.apply_frame_cap(cap) {
            return Err(StreamError::CapacityExceeded { kind, cap });
        }
        self.abort();

        anim.init(self.config.last_frame_duration_ms);
        let tracks_in_use = anim.tracks_in_use();
        if tracks_in_use.contains(TrackKind::Backpack) && !self.backpack_enabled {
            self.queue
                .push_back(StreamMessage::EnableBackpackLayer { enabled: true });
            self.backpack_enabled = true;
        }
        log::info!(
            "streaming '{}' tag {} loops {}",
            anim.name(),
            tag,
            num_loops
        );
        self.layers.reset_keep_alive(&self.params);
        self.session = Some(Session {
            name: anim.name().to_string(),
            tag,
            anim,
            anim_time_ms: 0,
            loops_remaining: num_loops.max(1),
            loop_forever: num_loops == 0,
            sent_start: false,
            sent_end: false,
            tracks_in_use,
        });
        Ok(())
    }

    /// Force-stop the active session: stop only the motor kinds this session
    /// used, flush one final face frame, and send the end notification if a
    /// start had gone out.
    pub fn abort(&mut self) {
        let Some(s) = self.session.take() else {
            return;
        };
        log::info!("aborting '{}' tag {}", s.name, s.tag);
        let motors = s.tracks_in_use.motors();
        if !motors.is_empty() {
            self.queue.push_back(StreamMessage::StopMotors { tracks: motors });
        }
        self.queue.push_back(StreamMessage::ProceduralFace {
            face: *self.layers.last_face(),
            duration_ms: self.config.tick_ms,
        });
        if s.sent_start && !s.sent_end {
            self.queue.push_back(StreamMessage::AnimationEnded {
                name: s.name,
                tag: s.tag,
                aborting: true,
                streaming_time_ms: s.anim_time_ms,
            });
        }
        self.end_session_common();
    }

    /// One control tick.
    pub fn update(&mut self, sink: &mut dyn MessageSink, audio: &mut dyn AudioClient) {
        let now = self.stream_time_ms;
        let tick = self.config.tick_ms;

        let mut finished = false;
        {
            let Self {
                config,
                session,
                layers,
                locked,
                queue,
                audio_frames_streamed,
                face_override_until_ms,
                ..
            } = self;
            if let Some(s) = session.as_mut() {
                if !s.sent_start {
                    queue.push_back(StreamMessage::AnimationStarted {
                        name: s.name.clone(),
                        tag: s.tag,
                    });
                    s.sent_start = true;
                }

                let lead_cap = audio.frames_consumed() + config.max_audio_lead_frames;
                if *audio_frames_streamed >= lead_cap {
                    log::debug!(
                        "stream held at {}ms: {} audio frames streamed, cap {}",
                        s.anim_time_ms,
                        audio_frames_streamed,
                        lead_cap
                    );
                } else {
                    let at = s.anim_time_ms;
                    pull_due(&mut s.anim.head, at, *locked, queue);
                    pull_due(&mut s.anim.lift, at, *locked, queue);
                    pull_due(&mut s.anim.body, at, *locked, queue);
                    pull_due(&mut s.anim.sprite, at, *locked, queue);
                    pull_due(&mut s.anim.event, at, *locked, queue);
                    pull_due(&mut s.anim.heading, at, *locked, queue);

                    let layered = layers.apply_layers_to_anim(Some(&mut s.anim), at, now, true);
                    emit_layered(
                        layered,
                        *locked,
                        now,
                        *face_override_until_ms,
                        queue,
                        audio,
                        audio_frames_streamed,
                    );

                    s.anim_time_ms = at + tick;
                    if !s.anim.has_frames_left() && s.anim_time_ms >= s.anim.last_frame_end_ms() {
                        if s.loop_forever || s.loops_remaining > 1 {
                            if !s.loop_forever {
                                s.loops_remaining -= 1;
                            }
                            s.anim.restart();
                            s.anim_time_ms = 0;
                        } else {
                            queue.push_back(StreamMessage::AnimationEnded {
                                name: s.name.clone(),
                                tag: s.tag,
                                aborting: false,
                                streaming_time_ms: s.anim_time_ms,
                            });
                            s.sent_end = true;
                            finished = true;
                        }
                    }
                }
            }
        }
        if finished {
            if let Some(s) = self.session.take() {
                log::info!("finished '{}' tag {}", s.name, s.tag);
            }
            self.end_session_common();
        }

        if self.session.is_none() && !finished {
            let idle_ms = u64::from(now.saturating_sub(self.last_stream_end_ms));
            if idle_ms >= self.config.keep_alive_idle_timeout_ms {
                self.layers.keep_face_alive(&self.params, now, tick);
                let layered = self.layers.apply_layers_to_anim(None, 0, now, true);
                let Self {
                    locked,
                    queue,
                    audio_frames_streamed,
                    face_override_until_ms,
                    ..
                } = self;
                emit_layered(
                    layered,
                    *locked,
                    now,
                    *face_override_until_ms,
                    queue,
                    audio,
                    audio_frames_streamed,
                );
            }
        }

        self.drain_queue(sink);
        self.stream_time_ms = now + tick;
    }

    /// Route one face-image chunk to its format's assembler. A completed
    /// image is queued for display exactly once and overrides procedural
    /// face output for `hold_duration_ms`. A chunk that preempts an image
    /// still being assembled fails with `ReassemblyReset`; the chunk itself
    /// is kept as the start of the new image.
    pub fn receive_face_chunk(
        &mut self,
        format: FaceImageFormat,
        chunk: &FaceImageChunk,
        hold_duration_ms: u32,
    ) -> Result<(), StreamError> {
        let assembler = match format {
            FaceImageFormat::Binary => &mut self.binary_assembler,
            FaceImageFormat::Grayscale => &mut self.gray_assembler,
            FaceImageFormat::Rgb565 => &mut self.rgb_assembler,
        };
        match assembler.handle_chunk(chunk)? {
            ChunkOutcome::Complete(image) => {
                self.queue.push_back(StreamMessage::DisplayFaceImage {
                    format: image.format,
                    data: image.data,
                    duration_ms: hold_duration_ms,
                });
                self.face_override_until_ms = self.stream_time_ms + hold_duration_ms;
            }
            ChunkOutcome::Restarted { discarded_id } => {
                return Err(StreamError::ReassemblyReset {
                    discarded_id,
                    new_id: chunk.image_id,
                });
            }
            ChunkOutcome::Pending => {}
        }
        Ok(())
    }

    fn end_session_common(&mut self) {
        if self.backpack_enabled {
            self.queue
                .push_back(StreamMessage::EnableBackpackLayer { enabled: false });
            self.backpack_enabled = false;
        }
        self.last_stream_end_ms = self.stream_time_ms;
    }

    fn drain_queue(&mut self, sink: &mut dyn MessageSink) {
        let budget = self.config.byte_budget_per_tick;
        let mut spent = 0usize;
        loop {
            let Some(front) = self.queue.front() else {
                break;
            };
            let size = front.wire_size();
            if spent > 0 && spent + size > budget {
                log::debug!(
                    "byte budget reached ({}/{}), {} messages carried over",
                    spent,
                    budget,
                    self.queue.len()
                );
                break;
            }
            if let Some(msg) = self.queue.pop_front() {
                spent += size;
                sink.post(msg);
            }
        }
    }
}

/// Pull every due frame from one plain (non-layered) track, advancing past
/// each. Locked kinds are consumed but not emitted.
fn pull_due<F: KeyFrame>(
    track: &mut crate::track::Track<F>,
    at_ms: u32,
    locked: TrackBits,
    queue: &mut VecDeque<StreamMessage>,
) {
    while let Some(f) = track.current_frame(at_ms) {
        if !locked.contains(F::KIND) {
            queue.push_back(f.to_message());
        }
        track.advance();
    }
}

/// Queue the layered-kind results, posting audio events to the collaborator.
fn emit_layered(
    layered: LayeredKeyFrames,
    locked: TrackBits,
    now_ms: u32,
    face_override_until_ms: u32,
    queue: &mut VecDeque<StreamMessage>,
    audio: &mut dyn AudioClient,
    audio_frames_streamed: &mut u32,
) {
    if let Some(face) = layered.face {
        if !locked.contains(TrackKind::Face) && now_ms >= face_override_until_ms {
            queue.push_back(face.to_message());
        }
    }
    if let Some(a) = layered.audio {
        if !locked.contains(TrackKind::Audio) {
            for id in &a.event_ids {
                audio.post_event(*id, AUDIO_GAME_OBJECT_ID);
            }
            *audio_frames_streamed += 1;
            queue.push_back(a.to_message());
        }
    }
    if let Some(b) = layered.backpack {
        if !locked.contains(TrackKind::Backpack) {
            queue.push_back(b.to_message());
        }
    }
}
