//! Shared canned-animation builders for emote-stream-core tests.
//!
//! Each builder returns an uninitialized `Animation` (the streamer calls
//! `init()` when a session starts). Times are small multiples of the 33 ms
//! tick so frames land exactly on tick boundaries.

use anyhow::{Context, Result};

use emote_stream_core::{
    Animation, AnimationLibrary, BackpackLightsKeyFrame, BodyMotionKeyFrame, EventKeyFrame,
    HeadAngleKeyFrame, LiftHeightKeyFrame, ProceduralFace, ProceduralFaceKeyFrame,
    RobotAudioKeyFrame, SpriteSequenceKeyFrame,
};

pub fn head_frame(trigger_ms: u32, angle_deg: f32) -> HeadAngleKeyFrame {
    HeadAngleKeyFrame {
        trigger_ms,
        duration_ms: 0,
        angle_deg,
        variability_deg: 0.0,
    }
}

pub fn face_frame(trigger_ms: u32, face: ProceduralFace) -> ProceduralFaceKeyFrame {
    ProceduralFaceKeyFrame::new(trigger_ms, 0, face)
}

pub fn audio_frame(trigger_ms: u32, event_id: u32) -> RobotAudioKeyFrame {
    RobotAudioKeyFrame {
        trigger_ms,
        duration_ms: 0,
        event_ids: vec![event_id],
        volume: 1.0,
        probability: 1.0,
    }
}

/// Two-second smile: the eyes widen, hold, and relax.
pub fn smile() -> Result<Animation> {
    let mut a = Animation::new("smile");
    let mut wide = ProceduralFace::neutral();
    wide.left_eye.scale_y = 1.3;
    wide.right_eye.scale_y = 1.3;
    a.face
        .append_at_back(face_frame(0, wide))
        .context("smile face frame")?;
    a.face
        .append_at_back(face_frame(1980, ProceduralFace::neutral()))
        .context("smile relax frame")?;
    Ok(a)
}

/// One-second wave: lift raises and lowers while the head nods.
pub fn wave() -> Result<Animation> {
    let mut a = Animation::new("wave");
    for (t, h) in [(0, 60.0), (330, 20.0), (660, 60.0)] {
        a.lift
            .append_at_back(LiftHeightKeyFrame {
                trigger_ms: t,
                duration_ms: 0,
                height_mm: h,
                variability_mm: 0.0,
            })
            .context("wave lift frame")?;
    }
    a.head
        .append_at_back(head_frame(0, 20.0))
        .context("wave head frame")?;
    a.head
        .append_at_back(head_frame(990, 0.0))
        .context("wave head frame")?;
    Ok(a)
}

/// Audio-only chirp; one event per 330 ms.
pub fn chirp(events: u32) -> Result<Animation> {
    let mut a = Animation::new("chirp");
    for i in 0..events {
        a.audio
            .append_at_back(audio_frame(i * 330, 100 + i))
            .context("chirp audio frame")?;
    }
    Ok(a)
}

/// Exercises every track kind once; handy for in-use/lock reporting tests.
pub fn full_body_demo() -> Result<Animation> {
    let mut a = Animation::new("full_body_demo");
    a.head
        .append_at_back(head_frame(0, 15.0))
        .context("demo head")?;
    a.lift
        .append_at_back(LiftHeightKeyFrame {
            trigger_ms: 0,
            duration_ms: 0,
            height_mm: 40.0,
            variability_mm: 0.0,
        })
        .context("demo lift")?;
    a.body
        .append_at_back(BodyMotionKeyFrame {
            trigger_ms: 0,
            duration_ms: 330,
            radius_mm: 0.0,
            speed_mmps: 50.0,
        })
        .context("demo body")?;
    a.sprite
        .append_at_back(SpriteSequenceKeyFrame {
            trigger_ms: 0,
            duration_ms: 330,
            sequence_name: "sparkle".into(),
            loop_count: 1,
        })
        .context("demo sprite")?;
    a.face
        .append_at_back(face_frame(0, ProceduralFace::neutral()))
        .context("demo face")?;
    a.event
        .append_at_back(EventKeyFrame {
            trigger_ms: 330,
            duration_ms: 0,
            event_id: 7,
        })
        .context("demo event")?;
    a.backpack
        .append_at_back(BackpackLightsKeyFrame {
            trigger_ms: 0,
            duration_ms: 330,
            colors: [0x2020ffff; 5],
        })
        .context("demo backpack")?;
    a.audio
        .append_at_back(audio_frame(0, 42))
        .context("demo audio")?;
    Ok(a)
}

/// Library holding every fixture clip.
pub fn library() -> Result<AnimationLibrary> {
    let mut lib = AnimationLibrary::new();
    lib.insert(smile()?);
    lib.insert(wave()?);
    lib.insert(chirp(3)?);
    lib.insert(full_body_demo()?);
    Ok(lib)
}
