//! Named procedural overlay tracks and their per-kind blend policies.
//!
//! Face and audio layers merge into whatever the canned animation produced;
//! backpack layers replace it outright (lights are discrete states, they do
//! not blend). The asymmetry is intentional, not a bug.

use crate::error::StreamError;
use crate::face::ProceduralFace;
use crate::frames::{
    BackpackLightsKeyFrame, KeyFrame, ProceduralFaceKeyFrame, RobotAudioKeyFrame,
};
use crate::track::Track;

/// Removal transitions step once per control tick.
const FACE_TRANSITION_STEP_MS: u32 = 33;

/// Per-kind layering policy on top of the `KeyFrame` seam.
pub trait LayerBlend: KeyFrame {
    /// Apply this frame onto an already-resolved frame of the same kind.
    fn blend_into(&self, into: &mut Self);

    /// Fold this frame into a persistent layer's accumulated delta. Only
    /// kinds whose effects accumulate (the face) override this.
    fn fold_delta(&self, acc: &mut Option<Self>) {
        let _ = acc;
    }

    /// Frames that walk an accumulated delta back to neutral over
    /// `duration_ms`. Empty for kinds with nothing to unwind.
    fn removal_frames(acc: Option<&Self>, trigger_ms: u32, duration_ms: u32) -> Vec<Self> {
        let _ = (acc, trigger_ms, duration_ms);
        Vec::new()
    }
}

impl LayerBlend for ProceduralFaceKeyFrame {
    fn blend_into(&self, into: &mut Self) {
        into.face.combine(&self.face);
    }

    fn fold_delta(&self, acc: &mut Option<Self>) {
        match acc {
            Some(a) => a.face.combine(&self.face),
            None => *acc = Some(self.clone()),
        }
    }

    /// Stepped return to neutral: the cumulative inverse at each step is
    /// interpolated between neutral and the full inverse, and each frame
    /// carries the delta from the previous step's position.
    fn removal_frames(acc: Option<&Self>, trigger_ms: u32, duration_ms: u32) -> Vec<Self> {
        let Some(a) = acc else {
            return Vec::new();
        };
        let neutral = ProceduralFace::neutral();
        let target = a.face.inverted();
        let steps = (duration_ms / FACE_TRANSITION_STEP_MS).max(1);
        let step_ms = (duration_ms / steps).max(1);
        let mut frames = Vec::with_capacity(steps as usize);
        let mut prev = neutral;
        for i in 1..=steps {
            let cum = neutral.interpolate(&target, i as f32 / steps as f32);
            frames.push(ProceduralFaceKeyFrame::new(
                trigger_ms + (i - 1) * step_ms,
                step_ms,
                prev.delta_to(&cum),
            ));
            prev = cum;
        }
        frames
    }
}

impl LayerBlend for RobotAudioKeyFrame {
    fn blend_into(&self, into: &mut Self) {
        into.event_ids.extend_from_slice(&self.event_ids);
        into.volume = into.volume.max(self.volume);
    }
}

impl LayerBlend for BackpackLightsKeyFrame {
    /// Last applied layer wins.
    fn blend_into(&self, into: &mut Self) {
        *into = self.clone();
    }
}

struct LayerEntry<F> {
    name: String,
    track: Track<F>,
    persistent: bool,
    /// Stream time at which a scheduled removal deletes this layer.
    remove_at_ms: Option<u32>,
    /// Net effect applied so far (persistent layers only).
    delta: Option<F>,
}

/// Named-overlay track management for one frame kind.
pub struct TrackLayerManager<F> {
    layers: Vec<LayerEntry<F>>,
}

impl<F: LayerBlend> Default for TrackLayerManager<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: LayerBlend> TrackLayerManager<F> {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    fn validate_name(name: &str) -> Result<(), StreamError> {
        if name.is_empty() {
            return Err(StreamError::InvalidLayer {
                reason: "empty layer name".into(),
            });
        }
        Ok(())
    }

    fn find(&mut self, name: &str) -> Option<&mut LayerEntry<F>> {
        self.layers.iter_mut().find(|l| l.name == name)
    }

    /// Add a one-shot layer, unconditionally replacing any layer of the same
    /// name. The layer is deleted once its frames are consumed.
    pub fn add_layer(&mut self, name: &str, track: Track<F>) -> Result<(), StreamError> {
        self.add_impl(name, track, false)
    }

    /// Add a layer whose final keyframe effect is held until explicitly
    /// removed.
    pub fn add_persistent_layer(&mut self, name: &str, track: Track<F>) -> Result<(), StreamError> {
        self.add_impl(name, track, true)
    }

    fn add_impl(&mut self, name: &str, track: Track<F>, persistent: bool) -> Result<(), StreamError> {
        Self::validate_name(name)?;
        if !track.is_live() {
            return Err(StreamError::InvalidLayer {
                reason: format!("layer '{}' requires a live track", name),
            });
        }
        if let Some(pos) = self.layers.iter().position(|l| l.name == name) {
            log::debug!("layer '{}' replaced", name);
            self.layers.remove(pos);
        }
        self.layers.push(LayerEntry {
            name: name.to_string(),
            track,
            persistent,
            remove_at_ms: None,
            delta: None,
        });
        Ok(())
    }

    /// Append one more keyframe to an existing persistent layer's tail,
    /// retargeting its ongoing effect without restarting it.
    pub fn add_to_persistent_layer(&mut self, name: &str, frame: F) -> Result<(), StreamError> {
        Self::validate_name(name)?;
        let layer = self
            .find(name)
            .filter(|l| l.persistent)
            .ok_or_else(|| StreamError::LayerNotFound { name: name.into() })?;
        layer.track.append_at_back(frame)
    }

    /// Schedule a return-to-neutral transition of `transition_ms` starting at
    /// `at_ms`; the layer is deleted once the transition completes.
    pub fn remove_persistent_layer(
        &mut self,
        name: &str,
        at_ms: u32,
        transition_ms: u32,
    ) -> Result<(), StreamError> {
        Self::validate_name(name)?;
        let layer = self
            .find(name)
            .filter(|l| l.persistent)
            .ok_or_else(|| StreamError::LayerNotFound { name: name.into() })?;
        for frame in F::removal_frames(layer.delta.as_ref(), at_ms, transition_ms) {
            layer.track.append_at_back(frame)?;
        }
        layer.remove_at_ms = Some(at_ms + transition_ms);
        Ok(())
    }

    /// Drain every due frame across all layers into `apply`, consume them,
    /// and clean up exhausted and expired layers.
    pub fn apply_due(&mut self, now_ms: u32, mut apply: impl FnMut(&F)) {
        for layer in &mut self.layers {
            while let Some(frame) = layer.track.current_frame(now_ms) {
                apply(frame);
                if layer.persistent {
                    let frame = frame.clone();
                    frame.fold_delta(&mut layer.delta);
                }
                // Layer tracks are live, so this consumes the frame.
                layer.track.advance();
            }
        }
        self.layers.retain(|l| {
            if let Some(at) = l.remove_at_ms {
                if now_ms >= at {
                    log::debug!("layer '{}' removed after transition", l.name);
                    return false;
                }
            }
            if !l.persistent && l.track.is_empty() {
                return false;
            }
            true
        });
    }

    pub fn has_layer(&self, name: &str) -> bool {
        self.layers.iter().any(|l| l.name == name)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Accumulated net effect of a persistent layer, if any frames have
    /// applied yet.
    pub fn layer_delta(&self, name: &str) -> Option<&F> {
        self.layers
            .iter()
            .find(|l| l.name == name && l.persistent)
            .and_then(|l| l.delta.as_ref())
    }

    /// True if any layer has a frame due at `now_ms`.
    pub fn any_due(&self, now_ms: u32) -> bool {
        self.layers
            .iter()
            .any(|l| l.track.current_frame(now_ms).is_some())
    }
}
