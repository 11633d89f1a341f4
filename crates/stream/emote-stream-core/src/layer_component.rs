//! Per-tick resolution of canned frames and procedural overlays.
//!
//! Owns the three layer managers, the last-procedural-face continuity value,
//! and the keep-alive registry. The merge contract per tick:
//!
//! 1. Face: seed from the last procedural face; a due canned face frame
//!    replaces the seed; every due face-layer frame merges in. With
//!    `store_face` the post-merge face becomes the new continuity value.
//! 2. Audio: due canned frame seeds; due audio layers merge in.
//! 3. Backpack: due canned frame seeds; due backpack layers replace it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::animation::Animation;
use crate::config::KeepAliveParams;
use crate::error::StreamError;
use crate::face::ProceduralFace;
use crate::frames::{BackpackLightsKeyFrame, ProceduralFaceKeyFrame, RobotAudioKeyFrame};
use crate::keep_alive::{default_registry, KeepAliveModifier, ModifierKind};
use crate::layers::{LayerBlend, TrackLayerManager};
use crate::track::Track;

/// Blink timing: lids closed for two ticks, then reopened.
const BLINK_CLOSE_MS: u32 = 66;
/// Squint eye-height multiplier (inverse reopens).
const SQUINT_SCALE_Y: f32 = 0.5;
const SQUINT_HOLD_MS: u32 = 300;

/// At most one resolved frame per layered kind, fresh each tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayeredKeyFrames {
    pub face: Option<ProceduralFaceKeyFrame>,
    pub audio: Option<RobotAudioKeyFrame>,
    pub backpack: Option<BackpackLightsKeyFrame>,
}

pub struct TrackLayerComponent {
    face_layers: TrackLayerManager<ProceduralFaceKeyFrame>,
    audio_layers: TrackLayerManager<RobotAudioKeyFrame>,
    backpack_layers: TrackLayerManager<BackpackLightsKeyFrame>,
    last_face: ProceduralFace,
    modifiers: Vec<KeepAliveModifier>,
    rng: StdRng,
    // Resolved output keyed by (anim_time_ms, stream_time_ms). Frame
    // consumption happens on the first resolve at a timestamp; repeats
    // replay this instead of finding the tracks drained.
    last_resolve: Option<(u32, u32, LayeredKeyFrames)>,
}

impl TrackLayerComponent {
    pub fn new(params: &KeepAliveParams) -> Self {
        Self::with_rng(params, StdRng::from_os_rng())
    }

    /// Deterministic construction for tests.
    pub fn with_seed(params: &KeepAliveParams, seed: u64) -> Self {
        Self::with_rng(params, StdRng::seed_from_u64(seed))
    }

    fn with_rng(params: &KeepAliveParams, mut rng: StdRng) -> Self {
        let modifiers = default_registry(params, &mut rng);
        Self {
            face_layers: TrackLayerManager::new(),
            audio_layers: TrackLayerManager::new(),
            backpack_layers: TrackLayerManager::new(),
            last_face: ProceduralFace::neutral(),
            modifiers,
            rng,
            last_resolve: None,
        }
    }

    #[inline]
    pub fn last_face(&self) -> &ProceduralFace {
        &self.last_face
    }

    pub fn face_layers(&mut self) -> &mut TrackLayerManager<ProceduralFaceKeyFrame> {
        self.last_resolve = None;
        &mut self.face_layers
    }

    pub fn audio_layers(&mut self) -> &mut TrackLayerManager<RobotAudioKeyFrame> {
        self.last_resolve = None;
        &mut self.audio_layers
    }

    pub fn backpack_layers(&mut self) -> &mut TrackLayerManager<BackpackLightsKeyFrame> {
        self.last_resolve = None;
        &mut self.backpack_layers
    }

    /// Resolve one merged frame-set for this tick. `anim_time_ms` positions
    /// the canned animation's tracks; `stream_time_ms` positions the layers
    /// (which live across sessions on the streamer's monotonic clock).
    /// Resolving again at the same timestamp pair replays the same frames.
    pub fn apply_layers_to_anim(
        &mut self,
        anim: Option<&mut Animation>,
        anim_time_ms: u32,
        stream_time_ms: u32,
        store_face: bool,
    ) -> LayeredKeyFrames {
        if let Some((at, st, cached)) = &self.last_resolve {
            if *at == anim_time_ms && *st == stream_time_ms {
                let out = cached.clone();
                if store_face {
                    if let Some(f) = &out.face {
                        self.last_face = f.face;
                    }
                }
                return out;
            }
        }

        let mut out = LayeredKeyFrames::default();

        // Face: continuity seed, canned replaces, layers merge.
        let mut face = ProceduralFaceKeyFrame::new(stream_time_ms, 0, self.last_face);
        let mut have_face = false;

        let mut audio: Option<RobotAudioKeyFrame> = None;
        let mut backpack: Option<BackpackLightsKeyFrame> = None;

        if let Some(anim) = anim {
            if !anim.is_initialized() {
                log::warn!(
                    "{}",
                    StreamError::NotInitialized {
                        name: anim.name().to_string(),
                    }
                );
            } else {
                while let Some(f) = anim.face.current_frame(anim_time_ms) {
                    face.face = f.face;
                    face.duration_ms = f.duration_ms;
                    have_face = true;
                    anim.face.advance();
                }
                while let Some(f) = anim.audio.current_frame(anim_time_ms) {
                    // Probability-gated: a skipped roll still consumes the frame.
                    if f.probability >= 1.0 || self.rng.random::<f32>() < f.probability {
                        match &mut audio {
                            Some(a) => f.blend_into(a),
                            None => audio = Some(f.clone()),
                        }
                    }
                    anim.audio.advance();
                }
                while let Some(f) = anim.backpack.current_frame(anim_time_ms) {
                    backpack = Some(f.clone());
                    anim.backpack.advance();
                }
            }
        }

        self.face_layers.apply_due(stream_time_ms, |f| {
            f.blend_into(&mut face);
            have_face = true;
        });
        self.audio_layers.apply_due(stream_time_ms, |f| match &mut audio {
            Some(a) => f.blend_into(a),
            None => audio = Some(f.clone()),
        });
        self.backpack_layers
            .apply_due(stream_time_ms, |f| match &mut backpack {
                Some(b) => f.blend_into(b),
                None => backpack = Some(f.clone()),
            });

        if have_face {
            if store_face {
                self.last_face = face.face;
            }
            out.face = Some(face);
        }
        out.audio = audio;
        out.backpack = backpack;
        self.last_resolve = Some((anim_time_ms, stream_time_ms, out.clone()));
        out
    }

    /// Run the keep-alive registry for one tick: countdowns decrement, due
    /// modifiers synthesize their layer bursts (failures are logged and
    /// skipped), and each due modifier is rescheduled. If nothing put a
    /// layer on the face this tick, the default idle layer is reapplied so
    /// the face is never perfectly static.
    pub fn keep_face_alive(&mut self, params: &KeepAliveParams, now_ms: u32, tick_ms: u32) {
        self.last_resolve = None;
        let mut due = Vec::new();
        for m in &mut self.modifiers {
            if m.tick(tick_ms as f32) {
                due.push((m.kind, m.produces_face_layer));
            }
        }

        let mut produced_face = false;
        for (kind, face_layer) in &due {
            match self.perform_modifier(*kind, params, now_ms) {
                Ok(()) => produced_face |= *face_layer,
                Err(e) => log::warn!("{}", e),
            }
        }
        for m in &mut self.modifiers {
            if due.iter().any(|(kind, _)| *kind == m.kind) {
                m.reschedule(params, &mut self.rng);
            }
        }

        if !produced_face && !self.face_layers.any_due(now_ms) {
            if let Err(e) = self.apply_idle_layer(now_ms) {
                log::warn!("idle layer rejected: {}", e);
            }
        }
    }

    /// Reset every countdown against current parameters (new session).
    pub fn reset_keep_alive(&mut self, params: &KeepAliveParams) {
        for m in &mut self.modifiers {
            m.reschedule(params, &mut self.rng);
        }
    }

    fn perform_modifier(
        &mut self,
        kind: ModifierKind,
        params: &KeepAliveParams,
        now_ms: u32,
    ) -> Result<(), StreamError> {
        let name = kind.name();
        let failed = |e: StreamError| StreamError::ModifierFailed {
            name: name.to_string(),
            reason: e.to_string(),
        };
        match kind {
            ModifierKind::Blink => {
                let mut t = Track::live();
                t.append_at_back(ProceduralFaceKeyFrame::new(
                    now_ms,
                    BLINK_CLOSE_MS,
                    ProceduralFace::blink_close_delta(),
                ))
                .map_err(failed)?;
                t.append_at_back(ProceduralFaceKeyFrame::new(
                    now_ms + BLINK_CLOSE_MS,
                    BLINK_CLOSE_MS,
                    ProceduralFace::blink_open_delta(),
                ))
                .map_err(failed)?;
                self.face_layers.add_layer(name, t).map_err(failed)?;
                Ok(())
            }
            ModifierKind::EyeDart => {
                let max = params.eye_dart_max_distance_pix.max(0.0);
                let dx = self.rng.random_range(-max..=max);
                let dy = self.rng.random_range(-max..=max);
                if self.face_layers.has_layer(name) {
                    // Retarget the ongoing shift by the difference from its
                    // accumulated offset.
                    let (cur_x, cur_y) = self
                        .face_layers
                        .layer_delta(name)
                        .map(|f| (f.face.left_eye.center_x, f.face.left_eye.center_y))
                        .unwrap_or((0.0, 0.0));
                    let frame = ProceduralFaceKeyFrame::new(
                        now_ms,
                        0,
                        ProceduralFace::eye_shift_delta(dx - cur_x, dy - cur_y),
                    );
                    self.face_layers
                        .add_to_persistent_layer(name, frame)
                        .map_err(failed)?;
                } else {
                    let mut t = Track::live();
                    t.append_at_back(ProceduralFaceKeyFrame::new(
                        now_ms,
                        0,
                        ProceduralFace::eye_shift_delta(dx, dy),
                    ))
                    .map_err(failed)?;
                    self.face_layers
                        .add_persistent_layer(name, t)
                        .map_err(failed)?;
                }
                Ok(())
            }
            ModifierKind::Squint => {
                let mut t = Track::live();
                t.append_at_back(ProceduralFaceKeyFrame::new(
                    now_ms,
                    SQUINT_HOLD_MS,
                    ProceduralFace::squint_delta(SQUINT_SCALE_Y),
                ))
                .map_err(failed)?;
                t.append_at_back(ProceduralFaceKeyFrame::new(
                    now_ms + SQUINT_HOLD_MS,
                    BLINK_CLOSE_MS,
                    ProceduralFace::squint_delta(1.0 / SQUINT_SCALE_Y),
                ))
                .map_err(failed)?;
                self.face_layers.add_layer(name, t).map_err(failed)?;
                Ok(())
            }
        }
    }

    fn apply_idle_layer(&mut self, now_ms: u32) -> Result<(), StreamError> {
        let mut t = Track::live();
        t.append_at_back(ProceduralFaceKeyFrame::new(
            now_ms,
            0,
            ProceduralFace::neutral(),
        ))?;
        self.face_layers.add_layer("keepalive_idle", t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::HeadAngleKeyFrame;

    fn face_anim(trigger_ms: u32, dx: f32) -> Animation {
        let mut a = Animation::new("look");
        a.face
            .append_at_back(ProceduralFaceKeyFrame::new(
                trigger_ms,
                100,
                ProceduralFace::eye_shift_delta(dx, 0.0),
            ))
            .unwrap();
        a
    }

    fn blink_layer(component: &mut TrackLayerComponent, at_ms: u32) {
        let mut t = Track::live();
        t.append_at_back(ProceduralFaceKeyFrame::new(
            at_ms,
            33,
            ProceduralFace::blink_close_delta(),
        ))
        .unwrap();
        component.face_layers().add_layer("blink", t).unwrap();
    }

    #[test]
    fn canned_face_replaces_seed_then_layers_merge() {
        let mut c = TrackLayerComponent::with_seed(&KeepAliveParams::default(), 1);
        let mut anim = face_anim(0, 4.0);
        anim.init(33);
        blink_layer(&mut c, 0);

        let out = c.apply_layers_to_anim(Some(&mut anim), 0, 0, true);
        let face = out.face.unwrap().face;
        // Canned frame replaced the neutral seed, blink merged on top.
        assert_eq!(face.left_eye.center_x, 4.0);
        assert_eq!(face.left_eye.upper_lid, 1.0);
    }

    #[test]
    fn face_continuity_between_native_frames() {
        let mut c = TrackLayerComponent::with_seed(&KeepAliveParams::default(), 1);
        let mut anim = face_anim(0, 4.0);
        anim.init(33);

        let first = c.apply_layers_to_anim(Some(&mut anim), 0, 0, true);
        assert!(first.face.is_some());
        assert_eq!(c.last_face().left_eye.center_x, 4.0);

        // Next tick: no native face frame, no layers. Nothing to send, but
        // the continuity value holds the last face.
        let second = c.apply_layers_to_anim(Some(&mut anim), 33, 33, true);
        assert!(second.face.is_none());
        assert_eq!(c.last_face().left_eye.center_x, 4.0);
    }

    #[test]
    fn resolving_twice_at_same_time_is_stable() {
        let mut c = TrackLayerComponent::with_seed(&KeepAliveParams::default(), 1);
        let mut anim = face_anim(0, 2.0);
        anim.audio
            .append_at_back(RobotAudioKeyFrame {
                trigger_ms: 0,
                duration_ms: 0,
                event_ids: vec![10],
                volume: 0.5,
                probability: 1.0,
            })
            .unwrap();
        anim.init(33);
        blink_layer(&mut c, 0);

        let first = c.apply_layers_to_anim(Some(&mut anim), 0, 0, true);
        assert!(first.face.is_some());
        assert!(first.audio.is_some());
        // Same timestamps again: identical output, even though the first
        // resolve consumed the due frames.
        let second = c.apply_layers_to_anim(Some(&mut anim), 0, 0, true);
        assert_eq!(first, second);

        // A later timestamp resolves fresh; everything due was spent at 0.
        let third = c.apply_layers_to_anim(Some(&mut anim), 33, 33, true);
        assert!(third.face.is_none());
        assert!(third.audio.is_none());
    }

    #[test]
    fn layer_edits_invalidate_a_repeated_resolve() {
        let mut c = TrackLayerComponent::with_seed(&KeepAliveParams::default(), 1);
        let first = c.apply_layers_to_anim(None, 0, 0, true);
        assert!(first.face.is_none());

        blink_layer(&mut c, 0);
        let second = c.apply_layers_to_anim(None, 0, 0, true);
        assert!(second.face.is_some());
    }

    #[test]
    fn uninitialized_animation_contributes_nothing() {
        let mut c = TrackLayerComponent::with_seed(&KeepAliveParams::default(), 1);
        let mut anim = face_anim(0, 4.0);
        // No init(): the canned tracks are not read, let alone consumed.
        let out = c.apply_layers_to_anim(Some(&mut anim), 0, 0, true);
        assert!(out.face.is_none());
        assert!(anim.face.has_frames_left());
    }

    #[test]
    fn audio_merges_and_backpack_replaces() {
        let mut c = TrackLayerComponent::with_seed(&KeepAliveParams::default(), 1);
        let mut anim = Animation::new("chirp");
        anim.audio
            .append_at_back(RobotAudioKeyFrame {
                trigger_ms: 0,
                duration_ms: 0,
                event_ids: vec![10],
                volume: 0.4,
                probability: 1.0,
            })
            .unwrap();
        anim.backpack
            .append_at_back(BackpackLightsKeyFrame {
                trigger_ms: 0,
                duration_ms: 100,
                colors: [0x111111ff; 5],
            })
            .unwrap();
        anim.init(33);

        let mut audio_track = Track::live();
        audio_track
            .append_at_back(RobotAudioKeyFrame {
                trigger_ms: 0,
                duration_ms: 0,
                event_ids: vec![20],
                volume: 0.9,
                probability: 1.0,
            })
            .unwrap();
        c.audio_layers().add_layer("chime", audio_track).unwrap();

        let mut bp_track = Track::live();
        bp_track
            .append_at_back(BackpackLightsKeyFrame {
                trigger_ms: 0,
                duration_ms: 100,
                colors: [0x00ff00ff; 5],
            })
            .unwrap();
        c.backpack_layers().add_layer("alert", bp_track).unwrap();

        let out = c.apply_layers_to_anim(Some(&mut anim), 0, 0, false);
        let audio = out.audio.unwrap();
        assert_eq!(audio.event_ids, vec![10, 20]);
        assert_eq!(audio.volume, 0.9);
        // Backpack: layer replaced the canned lights wholesale.
        assert_eq!(out.backpack.unwrap().colors, [0x00ff00ff; 5]);
    }

    #[test]
    fn keep_alive_blinks_within_configured_interval() {
        let mut params = KeepAliveParams::default();
        params.blink_interval_min_ms = 2000.0;
        params.blink_interval_max_ms = 5000.0;
        // Push the other modifiers far out so only blinks fire.
        params.eye_dart_interval_min_ms = 60_000.0;
        params.eye_dart_interval_max_ms = 60_000.0;
        params.squint_interval_min_ms = 60_000.0;
        params.squint_interval_max_ms = 60_000.0;

        let mut c = TrackLayerComponent::with_seed(&params, 42);
        let tick = 33u32;
        let mut blinks = 0;
        let mut was_present = false;
        let mut now = 0u32;
        while now < 10_000 {
            c.keep_face_alive(&params, now, tick);
            let present = c.face_layers.has_layer(ModifierKind::Blink.name());
            if present && !was_present {
                blinks += 1;
            }
            was_present = present;
            c.apply_layers_to_anim(None, 0, now, true);
            now += tick;
        }
        // 10s of uniform [2,5]s intervals: between 2 and 5 activations.
        assert!((2..=5).contains(&blinks), "blinks={blinks}");
    }

    #[test]
    fn idle_layer_reapplied_when_no_modifier_fires() {
        let params = KeepAliveParams::default();
        let mut c = TrackLayerComponent::with_seed(&params, 3);
        // First tick: no modifier is due yet (countdowns start in the
        // seconds), so the idle layer must appear.
        c.keep_face_alive(&params, 0, 33);
        let out = c.apply_layers_to_anim(None, 0, 0, true);
        assert!(out.face.is_some());
    }

    #[test]
    fn unrelated_tracks_do_not_feed_layering() {
        let mut c = TrackLayerComponent::with_seed(&KeepAliveParams::default(), 1);
        let mut anim = Animation::new("nod");
        anim.head
            .append_at_back(HeadAngleKeyFrame {
                trigger_ms: 0,
                duration_ms: 100,
                angle_deg: 30.0,
                variability_deg: 0.0,
            })
            .unwrap();
        anim.init(33);
        let out = c.apply_layers_to_anim(Some(&mut anim), 0, 0, true);
        assert!(out.face.is_none());
        assert!(out.audio.is_none());
        assert!(out.backpack.is_none());
    }
}
