//! Integration tests for catena-io: WAV files through real chains.

use catena_core::Chain;
use catena_io::{WavSpec, read_wav, read_wav_info, render_chain, write_wav};
use catena_registry::Registry;
use tempfile::TempDir;

fn sine_wave(sample_rate: u32, freq_hz: f32, frames: usize) -> Vec<f32> {
    (0..frames)
        .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq_hz * i as f32 / sample_rate as f32).sin())
        .collect()
}

fn chain_of(ops: &[(&str, &[f32])]) -> Chain {
    let registry = Registry::new();
    let mut chain = Chain::new("test");
    for (keyword, values) in ops {
        chain.add_chain_operator(registry.create_operator(keyword, values).unwrap());
    }
    chain
}

// ---------------------------------------------------------------------------
// File to file
// ---------------------------------------------------------------------------

#[test]
fn amplified_file_round_trip() {
    let temp = TempDir::new().unwrap();
    let input_path = temp.path().join("in.wav");
    let output_path = temp.path().join("out.wav");

    let input = sine_wave(48000, 440.0, 4800);
    let spec = WavSpec::default().with_channels(1);
    write_wav(&input_path, &input, spec).unwrap();

    let (samples, spec) = read_wav(&input_path).unwrap();
    let mut chain = chain_of(&[("ea", &[50.0])]);
    let (output, channels) = render_chain(
        &mut chain,
        &samples,
        spec.channels as usize,
        spec.sample_rate,
        512,
        |_, _| {},
    )
    .unwrap();
    write_wav(&output_path, &output, spec.with_channels(channels as u16)).unwrap();

    let info = read_wav_info(&output_path).unwrap();
    assert_eq!(info.num_frames, 4800);
    let (written, _) = read_wav(&output_path).unwrap();
    for (a, b) in input.iter().zip(&written) {
        assert!((a * 0.5 - b).abs() < 1e-6);
    }
}

#[test]
fn pan_turns_mono_file_stereo() {
    let input = vec![0.4; 1000];
    let mut chain = chain_of(&[("epp", &[0.0])]);
    let (output, channels) = render_chain(&mut chain, &input, 1, 44100, 256, |_, _| {}).unwrap();
    assert_eq!(channels, 2);
    assert_eq!(output.len(), 2000);

    // Hard left: the right channel is silent.
    assert!(output.iter().skip(1).step_by(2).all(|&s| s == 0.0));
    assert!(output.iter().step_by(2).any(|&s| s != 0.0));
}

#[test]
fn integer_output_survives_chain() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("out24.wav");

    let input = sine_wave(48000, 1000.0, 2048);
    let mut chain = chain_of(&[("ea", &[100.0])]);
    let (output, channels) = render_chain(&mut chain, &input, 1, 48000, 1024, |_, _| {}).unwrap();

    let spec = WavSpec {
        channels: channels as u16,
        sample_rate: 48000,
        bits_per_sample: 24,
    };
    write_wav(&path, &output, spec).unwrap();
    let (loaded, loaded_spec) = read_wav(&path).unwrap();
    assert_eq!(loaded_spec, spec);
    for (a, b) in input.iter().zip(&loaded) {
        assert!((a - b).abs() < 1e-5);
    }
}

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

#[test]
fn progress_sees_every_block() {
    let input = vec![0.0; 2 * 1000];
    let mut chain = Chain::new("thru");
    let mut frames = 0;
    let mut consumed = Vec::new();
    let (output, _) = render_chain(&mut chain, &input, 2, 48000, 300, |done, block| {
        frames += block.frame_count();
        consumed.push(done);
    })
    .unwrap();
    assert_eq!(frames, 1000);
    assert_eq!(consumed, vec![300, 600, 900, 1000]);
    assert_eq!(output.len(), input.len());
    assert!(!chain.is_initialized());
}

#[test]
fn zero_block_size_is_an_error() {
    let mut chain = Chain::new("thru");
    assert!(render_chain(&mut chain, &[0.0; 8], 1, 48000, 0, |_, _| {}).is_err());
}
