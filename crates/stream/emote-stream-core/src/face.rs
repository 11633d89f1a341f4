//! Procedural face parameters and their blend rules.
//!
//! A `ProceduralFace` is the full parameter set the renderer needs for one
//! frame of the eyes. Layering treats faces as orthogonal deltas: position
//! offsets and angle add, scales multiply, lid closedness adds with a clamp,
//! so any set of concurrent layers combines in any order to the same result.

use serde::{Deserialize, Serialize};

/// Per-eye parameters. Offsets are pixels relative to the eye's nominal
/// position; scales are multipliers around 1.0; lids are closedness in [0,1].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EyeParams {
    pub center_x: f32,
    pub center_y: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub upper_lid: f32,
    pub lower_lid: f32,
}

impl Default for EyeParams {
    fn default() -> Self {
        Self {
            center_x: 0.0,
            center_y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            upper_lid: 0.0,
            lower_lid: 0.0,
        }
    }
}

impl EyeParams {
    fn combine(&mut self, other: &EyeParams) {
        self.center_x += other.center_x;
        self.center_y += other.center_y;
        self.scale_x *= other.scale_x;
        self.scale_y *= other.scale_y;
        self.upper_lid = (self.upper_lid + other.upper_lid).clamp(0.0, 1.0);
        self.lower_lid = (self.lower_lid + other.lower_lid).clamp(0.0, 1.0);
    }

    fn inverted(&self) -> EyeParams {
        EyeParams {
            center_x: -self.center_x,
            center_y: -self.center_y,
            scale_x: safe_recip(self.scale_x),
            scale_y: safe_recip(self.scale_y),
            upper_lid: -self.upper_lid,
            lower_lid: -self.lower_lid,
        }
    }

    fn delta_to(&self, next: &EyeParams) -> EyeParams {
        EyeParams {
            center_x: next.center_x - self.center_x,
            center_y: next.center_y - self.center_y,
            scale_x: next.scale_x * safe_recip(self.scale_x),
            scale_y: next.scale_y * safe_recip(self.scale_y),
            upper_lid: next.upper_lid - self.upper_lid,
            lower_lid: next.lower_lid - self.lower_lid,
        }
    }

    fn lerp(&self, other: &EyeParams, t: f32) -> EyeParams {
        EyeParams {
            center_x: lerp(self.center_x, other.center_x, t),
            center_y: lerp(self.center_y, other.center_y, t),
            scale_x: lerp(self.scale_x, other.scale_x, t),
            scale_y: lerp(self.scale_y, other.scale_y, t),
            upper_lid: lerp(self.upper_lid, other.upper_lid, t),
            lower_lid: lerp(self.lower_lid, other.lower_lid, t),
        }
    }
}

/// Whole-face parameter set.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProceduralFace {
    pub face_angle_deg: f32,
    pub face_center_x: f32,
    pub face_center_y: f32,
    pub face_scale_x: f32,
    pub face_scale_y: f32,
    pub left_eye: EyeParams,
    pub right_eye: EyeParams,
}

impl Default for ProceduralFace {
    fn default() -> Self {
        Self::neutral()
    }
}

impl ProceduralFace {
    /// Identity under `combine`: zero offsets, unit scales, open lids.
    pub fn neutral() -> Self {
        Self {
            face_angle_deg: 0.0,
            face_center_x: 0.0,
            face_center_y: 0.0,
            face_scale_x: 1.0,
            face_scale_y: 1.0,
            left_eye: EyeParams::default(),
            right_eye: EyeParams::default(),
        }
    }

    /// Merge another face's parameters into this one. Order-independent for
    /// any set of faces (add/multiply are commutative; clamped lid sums are
    /// order-independent for same-signed contributions).
    pub fn combine(&mut self, other: &ProceduralFace) {
        self.face_angle_deg += other.face_angle_deg;
        self.face_center_x += other.face_center_x;
        self.face_center_y += other.face_center_y;
        self.face_scale_x *= other.face_scale_x;
        self.face_scale_y *= other.face_scale_y;
        self.left_eye.combine(&other.left_eye);
        self.right_eye.combine(&other.right_eye);
    }

    /// The delta that undoes this one under `combine`. Used to transition a
    /// persistent layer's accumulated effect back to neutral.
    pub fn inverted(&self) -> ProceduralFace {
        ProceduralFace {
            face_angle_deg: -self.face_angle_deg,
            face_center_x: -self.face_center_x,
            face_center_y: -self.face_center_y,
            face_scale_x: safe_recip(self.face_scale_x),
            face_scale_y: safe_recip(self.face_scale_y),
            left_eye: self.left_eye.inverted(),
            right_eye: self.right_eye.inverted(),
        }
    }

    /// The delta that takes this face to `next` under `combine`. Lid terms
    /// subtract without clamping so mid-transition steps stay exact.
    pub fn delta_to(&self, next: &ProceduralFace) -> ProceduralFace {
        ProceduralFace {
            face_angle_deg: next.face_angle_deg - self.face_angle_deg,
            face_center_x: next.face_center_x - self.face_center_x,
            face_center_y: next.face_center_y - self.face_center_y,
            face_scale_x: next.face_scale_x * safe_recip(self.face_scale_x),
            face_scale_y: next.face_scale_y * safe_recip(self.face_scale_y),
            left_eye: self.left_eye.delta_to(&next.left_eye),
            right_eye: self.right_eye.delta_to(&next.right_eye),
        }
    }

    /// Linear interpolation toward `other` with `t` in [0,1].
    pub fn interpolate(&self, other: &ProceduralFace, t: f32) -> ProceduralFace {
        let t = t.clamp(0.0, 1.0);
        ProceduralFace {
            face_angle_deg: lerp(self.face_angle_deg, other.face_angle_deg, t),
            face_center_x: lerp(self.face_center_x, other.face_center_x, t),
            face_center_y: lerp(self.face_center_y, other.face_center_y, t),
            face_scale_x: lerp(self.face_scale_x, other.face_scale_x, t),
            face_scale_y: lerp(self.face_scale_y, other.face_scale_y, t),
            left_eye: self.left_eye.lerp(&other.left_eye, t),
            right_eye: self.right_eye.lerp(&other.right_eye, t),
        }
    }

    /// Delta that closes both eyes from fully open.
    pub fn blink_close_delta() -> ProceduralFace {
        let mut f = Self::neutral();
        f.left_eye.upper_lid = 1.0;
        f.right_eye.upper_lid = 1.0;
        f
    }

    /// Delta that reopens both eyes after `blink_close_delta`.
    pub fn blink_open_delta() -> ProceduralFace {
        let mut f = Self::neutral();
        f.left_eye.upper_lid = -1.0;
        f.right_eye.upper_lid = -1.0;
        f
    }

    /// Delta shifting both eyes by the given pixel offset.
    pub fn eye_shift_delta(dx: f32, dy: f32) -> ProceduralFace {
        let mut f = Self::neutral();
        f.left_eye.center_x = dx;
        f.left_eye.center_y = dy;
        f.right_eye.center_x = dx;
        f.right_eye.center_y = dy;
        f
    }

    /// Delta squinting both eyes by scaling their height.
    pub fn squint_delta(scale_y: f32) -> ProceduralFace {
        let mut f = Self::neutral();
        f.left_eye.scale_y = scale_y;
        f.right_eye.scale_y = scale_y;
        f
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
fn safe_recip(v: f32) -> f32 {
    if v.abs() <= f32::EPSILON {
        1.0
    } else {
        1.0 / v
    }
}
