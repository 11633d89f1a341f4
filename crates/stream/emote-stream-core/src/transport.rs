//! Collaborator seams: outbound transport and the audio engine.
//!
//! Both run outside this core; hosts implement these traits over their
//! actual transport/audio plumbing. `RecordingSink` and `NullAudio` are the
//! doubles the tests use.

use crate::messages::StreamMessage;

/// Accepts serialized per-tick command messages, already budget-limited.
pub trait MessageSink {
    fn post(&mut self, msg: StreamMessage);
}

/// Audio engine hand-off. No mixing or playback happens in this core.
pub trait AudioClient {
    /// Post one audio event for a game object.
    fn post_event(&mut self, event_id: u32, game_object_id: u32);

    /// Number of audio frames the engine has consumed so far; bounds how far
    /// ahead the stream cursor may run.
    fn frames_consumed(&self) -> u32;
}

/// Sink that records every posted message, for tests and tooling.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub messages: Vec<StreamMessage>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count<P: Fn(&StreamMessage) -> bool>(&self, pred: P) -> usize {
        self.messages.iter().filter(|m| pred(m)).count()
    }
}

impl MessageSink for RecordingSink {
    fn post(&mut self, msg: StreamMessage) {
        self.messages.push(msg);
    }
}

/// Audio double: counts posted events and reports a caller-set consumed count.
#[derive(Debug, Default)]
pub struct NullAudio {
    pub posted: Vec<(u32, u32)>,
    pub consumed: u32,
}

impl NullAudio {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioClient for NullAudio {
    fn post_event(&mut self, event_id: u32, game_object_id: u32) {
        self.posted.push((event_id, game_object_id));
    }

    fn frames_consumed(&self) -> u32 {
        self.consumed
    }
}
