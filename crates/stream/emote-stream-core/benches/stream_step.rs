use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

use emote_stream_core::{AnimationStreamer, NullAudio, RecordingSink, StreamConfig};
use emote_test_fixtures as fixtures;

fn bench_update_tick(c: &mut Criterion) {
    c.bench_function("streamer_update_tick", |b| {
        b.iter_batched(
            || {
                let mut s = AnimationStreamer::with_seed(StreamConfig::default(), 1);
                s.set_streaming_animation(Some(fixtures::full_body_demo().unwrap()), 1, 0, false)
                    .unwrap();
                (s, RecordingSink::new(), NullAudio::new())
            },
            |(mut s, mut sink, mut audio)| {
                for _ in 0..32 {
                    audio.consumed += 1;
                    s.update(&mut sink, &mut audio);
                }
                sink
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_update_tick);
criterion_main!(benches);
