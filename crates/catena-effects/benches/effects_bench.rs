//! Criterion benchmarks for catena effects
//!
//! Run with: cargo bench -p catena-effects
#![allow(missing_docs)]

use catena_core::{ChainOperator, SampleBuffer};
use catena_effects::{
    AdvancedReverb, Amplify, Bandpass, Compress, Delay, Limiter, Lowpass, NoiseGate, NormalPan,
    PitchShift, Reverb, VolumeBuckets,
};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

const SAMPLE_RATE: u32 = 48000;
const BLOCK_SIZES: &[usize] = &[64, 256, 1024];

fn fill_test_signal(buffer: &mut SampleBuffer) {
    let rate = buffer.sample_rate() as f32;
    for ch in buffer.channels_mut() {
        for (i, s) in ch.iter_mut().enumerate() {
            let t = i as f32 / rate;
            *s = (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5;
        }
    }
}

fn bench_operator<O: ChainOperator>(c: &mut Criterion, name: &str, mut op: O) {
    let mut group = c.benchmark_group(name);

    for &block_size in BLOCK_SIZES {
        group.bench_with_input(
            BenchmarkId::from_parameter(block_size),
            &block_size,
            |b, &frames| {
                let mut buffer = SampleBuffer::new(2, frames, SAMPLE_RATE);
                op.init(&buffer);
                b.iter(|| {
                    buffer.set_channel_count(2);
                    buffer.set_frame_count(frames);
                    fill_test_signal(&mut buffer);
                    op.process(black_box(&mut buffer));
                    black_box(buffer.frame_count())
                });
            },
        );
    }

    group.finish();
}

fn bench_amplitude(c: &mut Criterion) {
    bench_operator(c, "Amplify", Amplify::new(120.0));
    bench_operator(c, "Limiter", Limiter::new(70.0));
}

fn bench_dynamics(c: &mut Criterion) {
    bench_operator(c, "Compress", Compress::new(6.0, 20.0));
    bench_operator(c, "NoiseGate", NoiseGate::new(10.0, 5.0, 5.0, 20.0, 50.0));
}

fn bench_filters(c: &mut Criterion) {
    bench_operator(c, "Lowpass", Lowpass::new(2000.0));
    bench_operator(c, "Bandpass", Bandpass::new(1000.0, 400.0));
}

fn bench_time_based(c: &mut Criterion) {
    bench_operator(c, "Delay", Delay::new(120.0, 0.0, 3, 50.0));
    bench_operator(c, "Reverb", Reverb::new(40.0, true, 60.0));
    bench_operator(c, "AdvancedReverb", AdvancedReverb::default());
}

fn bench_misc(c: &mut Criterion) {
    bench_operator(c, "NormalPan", NormalPan::new(30.0));
    bench_operator(c, "VolumeBuckets", VolumeBuckets::new());
    bench_operator(c, "PitchShift", PitchShift::new(150.0));
}

criterion_group!(
    benches,
    bench_amplitude,
    bench_dynamics,
    bench_filters,
    bench_time_based,
    bench_misc,
);
criterion_main!(benches);
