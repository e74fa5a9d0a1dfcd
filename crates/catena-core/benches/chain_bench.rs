//! Criterion benchmarks for catena-core chain processing
//!
//! Run with: cargo bench -p catena-core
#![allow(missing_docs)]

use std::borrow::Cow;

use catena_core::{
    Chain, ChainOperator, ControllerSource, GenericController, Operator, SampleBuffer,
    SourceClock, param_names,
};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

const SAMPLE_RATE: u32 = 48000;
const BLOCK_SIZES: &[usize] = &[64, 256, 1024];

#[derive(Clone)]
struct Gain(f32);

impl Operator for Gain {
    fn name(&self) -> &str {
        "Gain"
    }

    fn keyword(&self) -> &str {
        "g"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("gain")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        if index == 1 {
            self.0 = value;
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        if index == 1 { self.0 } else { 0.0 }
    }
}

impl ChainOperator for Gain {
    fn init(&mut self, _buffer: &SampleBuffer) {}

    fn process(&mut self, buffer: &mut SampleBuffer) {
        for ch in buffer.channels_mut() {
            ch.iter_mut().for_each(|s| *s *= self.0);
        }
    }
}

#[derive(Clone)]
struct Sweep(SourceClock);

impl Operator for Sweep {
    fn name(&self) -> &str {
        "Sweep"
    }

    fn keyword(&self) -> &str {
        "ksw"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        Vec::new()
    }

    fn set_parameter(&mut self, _index: usize, _value: f32) {}

    fn get_parameter(&self, _index: usize) -> f32 {
        0.0
    }
}

impl ControllerSource for Sweep {
    fn init(&mut self, step: f64) {
        self.0.init(step);
    }

    fn value(&mut self) -> f32 {
        (self.0.advance().fract()) as f32
    }

    fn step_length(&self) -> f64 {
        self.0.step()
    }
}

fn build_chain(operators: usize, controllers: bool) -> Chain {
    let mut chain = Chain::new("bench");
    for _ in 0..operators {
        chain.add_chain_operator(Box::new(Gain(0.99)));
        if controllers {
            chain.add_controller(GenericController::new(
                Box::new(Sweep(SourceClock::default())),
                1,
                0.9,
                1.0,
            ));
        }
    }
    chain
}

fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("Chain");

    for &block_size in BLOCK_SIZES {
        for (label, controllers) in [("plain", false), ("controlled", true)] {
            group.bench_with_input(
                BenchmarkId::new(label, block_size),
                &block_size,
                |b, &frames| {
                    let mut chain = build_chain(8, controllers);
                    let mut buffer = SampleBuffer::new(2, frames, SAMPLE_RATE);
                    let mut running = chain.init(&mut buffer, 2, 2);
                    b.iter(|| {
                        running.buffer_mut().channel_mut(0).fill(0.5);
                        running.process();
                        black_box(running.buffer().channel(0)[0]);
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_channel_change(c: &mut Criterion) {
    c.bench_function("SampleBuffer/mono_stereo_toggle", |b| {
        let mut buffer = SampleBuffer::new(1, 1024, SAMPLE_RATE);
        b.iter(|| {
            buffer.set_channel_count(black_box(2));
            buffer.set_channel_count(black_box(1));
        });
    });
}

criterion_group!(benches, bench_chain, bench_channel_change);
criterion_main!(benches);
