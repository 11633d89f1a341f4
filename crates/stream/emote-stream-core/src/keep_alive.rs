//! Keep-alive modifier scheduling.
//!
//! A small fixed registry of procedural activities (blink, eye dart, squint),
//! each with its own countdown and a parameter-driven randomized reschedule.
//! The registry lives for the life of the component and is only ever reset,
//! never rebuilt. Synthesis of the actual layers happens in
//! `TrackLayerComponent::keep_face_alive`, dispatched by kind.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::KeepAliveParams;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ModifierKind {
    Blink,
    EyeDart,
    Squint,
}

impl ModifierKind {
    pub fn name(self) -> &'static str {
        match self {
            ModifierKind::Blink => "keepalive_blink",
            ModifierKind::EyeDart => "keepalive_eyedart",
            ModifierKind::Squint => "keepalive_squint",
        }
    }

    fn interval_ms(self, params: &KeepAliveParams) -> (f32, f32) {
        match self {
            ModifierKind::Blink => (params.blink_interval_min_ms, params.blink_interval_max_ms),
            ModifierKind::EyeDart => (
                params.eye_dart_interval_min_ms,
                params.eye_dart_interval_max_ms,
            ),
            ModifierKind::Squint => (
                params.squint_interval_min_ms,
                params.squint_interval_max_ms,
            ),
        }
    }
}

/// One scheduled keep-alive activity.
#[derive(Clone, Debug)]
pub struct KeepAliveModifier {
    pub kind: ModifierKind,
    pub countdown_ms: f32,
    /// Whether a successful perform puts a layer on the face (as opposed to
    /// audio-only side effects).
    pub produces_face_layer: bool,
}

impl KeepAliveModifier {
    /// Tick the countdown down; true when the modifier is due to perform.
    pub fn tick(&mut self, dt_ms: f32) -> bool {
        self.countdown_ms -= dt_ms;
        self.countdown_ms <= 0.0
    }

    /// Draw the next activation delay from the modifier's configured range.
    pub fn reschedule(&mut self, params: &KeepAliveParams, rng: &mut impl Rng) {
        let (min, max) = self.kind.interval_ms(params);
        let max = max.max(min);
        self.countdown_ms = rng.random_range(min..=max);
    }
}

/// The fixed registry, with countdowns drawn from `params`.
pub fn default_registry(params: &KeepAliveParams, rng: &mut impl Rng) -> Vec<KeepAliveModifier> {
    let mut mods = vec![
        KeepAliveModifier {
            kind: ModifierKind::Blink,
            countdown_ms: 0.0,
            produces_face_layer: true,
        },
        KeepAliveModifier {
            kind: ModifierKind::EyeDart,
            countdown_ms: 0.0,
            produces_face_layer: true,
        },
        KeepAliveModifier {
            kind: ModifierKind::Squint,
            countdown_ms: 0.0,
            produces_face_layer: true,
        },
    ];
    for m in &mut mods {
        m.reschedule(params, rng);
    }
    mods
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn reschedule_stays_in_configured_range() {
        let params = KeepAliveParams::default();
        let mut rng = StdRng::seed_from_u64(7);
        let mut m = KeepAliveModifier {
            kind: ModifierKind::Blink,
            countdown_ms: 0.0,
            produces_face_layer: true,
        };
        for _ in 0..100 {
            m.reschedule(&params, &mut rng);
            assert!(m.countdown_ms >= params.blink_interval_min_ms);
            assert!(m.countdown_ms <= params.blink_interval_max_ms);
        }
    }

    #[test]
    fn tick_counts_down_to_due() {
        let params = KeepAliveParams::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut m = KeepAliveModifier {
            kind: ModifierKind::EyeDart,
            countdown_ms: 0.0,
            produces_face_layer: true,
        };
        m.reschedule(&params, &mut rng);
        let mut ticks = 0;
        while !m.tick(33.0) {
            ticks += 1;
            assert!(ticks < 1000, "countdown never elapsed");
        }
        assert!(ticks >= 1);
    }
}
