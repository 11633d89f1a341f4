//! Read-only named animation storage.
//!
//! Asset formats live outside this core; whatever loads the assets inserts
//! finished `Animation` values here for the streamer to select by name.
//! `parse_animation_json` covers the one format this crate does own: its own
//! serde representation of a clip.

use crate::animation::Animation;
use crate::error::StreamError;

/// Parse one stored clip from this crate's canonical JSON shape. Playheads
/// and durations are session state, so the parsed clip still needs `init()`
/// (the streamer does this when a session starts).
pub fn parse_animation_json(raw: &str) -> Result<Animation, StreamError> {
    let anim: Animation = serde_json::from_str(raw).map_err(|e| StreamError::MalformedClip {
        reason: e.to_string(),
    })?;
    if anim.name().is_empty() {
        return Err(StreamError::MalformedClip {
            reason: "clip has no name".to_string(),
        });
    }
    Ok(anim)
}

#[derive(Default, Debug)]
pub struct AnimationLibrary {
    items: Vec<(String, Animation)>,
}

impl AnimationLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace by name.
    pub fn insert(&mut self, anim: Animation) {
        let name = anim.name().to_string();
        if let Some(slot) = self.items.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = anim;
        } else {
            self.items.push((name, anim));
        }
    }

    /// Parse a JSON clip and insert it, returning its name.
    pub fn insert_json(&mut self, raw: &str) -> Result<String, StreamError> {
        let anim = parse_animation_json(raw)?;
        let name = anim.name().to_string();
        self.insert(anim);
        Ok(name)
    }

    pub fn get(&self, name: &str) -> Option<&Animation> {
        self.items
            .iter()
            .find_map(|(n, a)| if n == name { Some(a) } else { None })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
