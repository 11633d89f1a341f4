use emote_stream_core::{
    AnimationStreamer, FaceImageChunk, FaceImageFormat, NullAudio, RecordingSink, StreamConfig,
    StreamError, StreamMessage,
};
use emote_test_fixtures as fixtures;

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn quiet_config() -> StreamConfig {
    // Keep-alive stays out of the way unless a test opts in.
    StreamConfig {
        keep_alive_idle_timeout_ms: 1_000_000,
        ..StreamConfig::default()
    }
}

fn tick(streamer: &mut AnimationStreamer, sink: &mut RecordingSink, audio: &mut NullAudio, n: usize) {
    for _ in 0..n {
        audio.consumed = audio.consumed.saturating_add(1);
        streamer.update(sink, audio);
    }
}

#[test]
fn interrupt_ends_old_session_and_new_one_runs_its_loops() {
    init_logs();
    let mut s = AnimationStreamer::with_seed(quiet_config(), 1);
    let mut sink = RecordingSink::new();
    let mut audio = NullAudio::new();

    s.set_streaming_animation(Some(fixtures::smile().unwrap()), 3, 1, false)
        .unwrap();
    tick(&mut s, &mut sink, &mut audio, 5);
    assert_eq!(s.streaming_name(), Some("smile"));

    // Wave interrupts mid-smile, two loops.
    s.set_streaming_animation(Some(fixtures::wave().unwrap()), 5, 2, true)
        .unwrap();
    tick(&mut s, &mut sink, &mut audio, 80);
    assert!(!s.is_streaming());

    assert_eq!(
        sink.count(|m| matches!(
            m,
            StreamMessage::AnimationEnded {
                name,
                tag: 3,
                aborting: true,
                ..
            } if name == "smile"
        )),
        1
    );
    assert_eq!(
        sink.count(|m| matches!(
            m,
            StreamMessage::AnimationStarted { name, tag: 5 } if name == "wave"
        )),
        1
    );
    assert_eq!(
        sink.count(|m| matches!(
            m,
            StreamMessage::AnimationEnded {
                name,
                tag: 5,
                aborting: false,
                ..
            } if name == "wave"
        )),
        1
    );
    // Two loops of lift motion: three lift frames each.
    assert_eq!(
        sink.count(|m| matches!(m, StreamMessage::LiftHeight { .. })),
        6
    );
}

#[test]
fn start_and_end_fire_once_no_matter_the_tick_count() {
    let mut s = AnimationStreamer::with_seed(quiet_config(), 1);
    let mut sink = RecordingSink::new();
    let mut audio = NullAudio::new();
    s.set_streaming_animation(Some(fixtures::wave().unwrap()), 9, 1, false)
        .unwrap();
    // Far more ticks than the clip needs.
    tick(&mut s, &mut sink, &mut audio, 200);
    assert_eq!(
        sink.count(|m| matches!(m, StreamMessage::AnimationStarted { tag: 9, .. })),
        1
    );
    assert_eq!(
        sink.count(|m| matches!(m, StreamMessage::AnimationEnded { tag: 9, .. })),
        1
    );
}

#[test]
fn zero_loops_streams_forever() {
    let mut s = AnimationStreamer::with_seed(quiet_config(), 1);
    let mut sink = RecordingSink::new();
    let mut audio = NullAudio::new();
    s.set_streaming_animation(Some(fixtures::wave().unwrap()), 1, 0, false)
        .unwrap();
    // Wave is ~1s; run well past several loops.
    tick(&mut s, &mut sink, &mut audio, 150);
    assert!(s.is_streaming());
    assert!(sink.count(|m| matches!(m, StreamMessage::LiftHeight { .. })) >= 9);
    assert_eq!(
        sink.count(|m| matches!(m, StreamMessage::AnimationEnded { .. })),
        0
    );
}

#[test]
fn by_name_lookup_and_empty_name_abort() {
    let lib = fixtures::library().unwrap();
    let mut s = AnimationStreamer::with_seed(quiet_config(), 1);
    let mut sink = RecordingSink::new();
    let mut audio = NullAudio::new();

    let err = s
        .set_streaming_animation_by_name(&lib, "no_such_clip", 1, 1, false)
        .unwrap_err();
    assert_eq!(
        err,
        StreamError::InvalidAnimation {
            name: "no_such_clip".into()
        }
    );
    assert!(!s.is_streaming());

    s.set_streaming_animation_by_name(&lib, "wave", 2, 1, false)
        .unwrap();
    tick(&mut s, &mut sink, &mut audio, 2);
    s.set_streaming_animation_by_name(&lib, "", 0, 1, false)
        .unwrap();
    assert!(!s.is_streaming());
    tick(&mut s, &mut sink, &mut audio, 1);
    assert_eq!(
        sink.count(|m| matches!(m, StreamMessage::AnimationEnded { aborting: true, .. })),
        1
    );
}

#[test]
fn backpack_layer_toggles_around_a_session_that_uses_it() {
    let mut s = AnimationStreamer::with_seed(quiet_config(), 1);
    let mut sink = RecordingSink::new();
    let mut audio = NullAudio::new();
    s.set_streaming_animation(Some(fixtures::full_body_demo().unwrap()), 1, 1, false)
        .unwrap();
    tick(&mut s, &mut sink, &mut audio, 30);
    assert!(!s.is_streaming());
    assert_eq!(
        sink.count(|m| matches!(m, StreamMessage::EnableBackpackLayer { enabled: true })),
        1
    );
    assert_eq!(
        sink.count(|m| matches!(m, StreamMessage::EnableBackpackLayer { enabled: false })),
        1
    );
    // A head-only clip must not toggle the layer again.
    s.set_streaming_animation(Some(fixtures::wave().unwrap()), 2, 1, false)
        .unwrap();
    tick(&mut s, &mut sink, &mut audio, 40);
    assert_eq!(
        sink.count(|m| matches!(m, StreamMessage::EnableBackpackLayer { .. })),
        2
    );
}

#[test]
fn keep_alive_takes_over_after_idle_timeout() {
    let config = StreamConfig {
        keep_alive_idle_timeout_ms: 1500,
        ..StreamConfig::default()
    };
    let mut s = AnimationStreamer::with_seed(config, 7);
    let mut sink = RecordingSink::new();
    let mut audio = NullAudio::new();

    s.set_streaming_animation(Some(fixtures::wave().unwrap()), 1, 1, false)
        .unwrap();
    tick(&mut s, &mut sink, &mut audio, 40);
    assert!(!s.is_streaming());
    let faces_after_session = sink.count(|m| matches!(m, StreamMessage::ProceduralFace { .. }));

    // Within the timeout the face stays quiet.
    tick(&mut s, &mut sink, &mut audio, 20);
    assert_eq!(
        sink.count(|m| matches!(m, StreamMessage::ProceduralFace { .. })),
        faces_after_session
    );

    // Past the timeout keep-alive streams idle faces every tick.
    tick(&mut s, &mut sink, &mut audio, 60);
    assert!(
        sink.count(|m| matches!(m, StreamMessage::ProceduralFace { .. })) > faces_after_session
    );
}

#[test]
fn face_image_override_suppresses_procedural_face_for_its_hold() {
    let config = StreamConfig {
        keep_alive_idle_timeout_ms: 0,
        ..StreamConfig::default()
    };
    let mut s = AnimationStreamer::with_seed(config, 7);
    let mut sink = RecordingSink::new();
    let mut audio = NullAudio::new();

    let format = FaceImageFormat::Binary;
    for index in 0..format.chunk_count() {
        s.receive_face_chunk(
            format,
            &FaceImageChunk {
                image_id: 1,
                chunk_index: index,
                data: vec![0xFF; format.chunk_bytes()],
            },
            330,
        )
        .unwrap();
    }

    // Ten ticks land inside the 330 ms hold: the image goes out, the
    // procedural face does not.
    tick(&mut s, &mut sink, &mut audio, 10);
    assert_eq!(
        sink.count(|m| matches!(m, StreamMessage::DisplayFaceImage { .. })),
        1
    );
    assert_eq!(
        sink.count(|m| matches!(m, StreamMessage::ProceduralFace { .. })),
        0
    );

    // After the hold, keep-alive resumes the procedural face.
    tick(&mut s, &mut sink, &mut audio, 10);
    assert!(sink.count(|m| matches!(m, StreamMessage::ProceduralFace { .. })) > 0);
}
