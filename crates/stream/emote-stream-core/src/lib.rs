//! Emote Stream Core (robot-agnostic)
//!
//! Keyframe streaming core for an expressive robot character: typed keyframe
//! tracks, canned/live animations, a per-tick streaming session state machine,
//! procedural layering (face/audio/backpack) with keep-alive modifiers, and
//! face-image chunk reassembly. The transport wire format, audio playback,
//! rendering, and motor control all live behind collaborator traits.

pub mod animation;
pub mod chunks;
pub mod config;
pub mod error;
pub mod face;
pub mod frames;
pub mod keep_alive;
pub mod layer_component;
pub mod layers;
pub mod library;
pub mod messages;
pub mod streamer;
pub mod track;
pub mod transport;

// Re-exports for consumers (hosts)
pub use animation::Animation;
pub use chunks::{
    ChunkOutcome, FaceImage, FaceImageAssembler, FaceImageChunk, FaceImageFormat,
    FACE_IMAGE_HEIGHT, FACE_IMAGE_WIDTH,
};
pub use config::{KeepAliveParameter, KeepAliveParams, StreamConfig};
pub use error::StreamError;
pub use face::{EyeParams, ProceduralFace};
pub use frames::{
    BackpackLightsKeyFrame, BodyMotionKeyFrame, EventKeyFrame, HeadAngleKeyFrame, HeadingAction,
    HeadingKeyFrame, KeyFrame, LiftHeightKeyFrame, ProceduralFaceKeyFrame, RobotAudioKeyFrame,
    SpriteSequenceKeyFrame,
};
pub use layer_component::{LayeredKeyFrames, TrackLayerComponent};
pub use layers::{LayerBlend, TrackLayerManager};
pub use library::{parse_animation_json, AnimationLibrary};
pub use messages::StreamMessage;
pub use streamer::AnimationStreamer;
pub use track::{Track, TrackBits, TrackKind, MAX_FRAMES_PER_TRACK};
pub use transport::{AudioClient, MessageSink, NullAudio, RecordingSink};
