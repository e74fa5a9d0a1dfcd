//! WAV file reading and writing.
//!
//! Samples travel as interleaved `f32` in `[-1.0, 1.0)`. Integer files are
//! scaled by `2^(bits - 1)`; 32-bit files are IEEE float.

use crate::{Error, Result};
use catena_core::Sample;
use hound::{SampleFormat, WavReader, WavWriter};
use std::path::Path;

/// WAV audio encoding format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavFormat {
    /// Linear PCM (integer samples).
    Pcm,
    /// IEEE 754 floating-point samples.
    IeeeFloat,
}

/// WAV file metadata read from the header alone.
#[derive(Debug, Clone)]
pub struct WavInfo {
    /// Number of interleaved channels.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth per sample.
    pub bits_per_sample: u16,
    /// Total number of frames (samples per channel).
    pub num_frames: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Audio encoding format.
    pub format: WavFormat,
}

/// Reads WAV metadata without decoding any samples.
pub fn read_wav_info<P: AsRef<Path>>(path: P) -> Result<WavInfo> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let num_frames = u64::from(reader.len()) / u64::from(spec.channels.max(1));

    let format = match spec.sample_format {
        SampleFormat::Float => WavFormat::IeeeFloat,
        SampleFormat::Int => WavFormat::Pcm,
    };

    Ok(WavInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        num_frames,
        duration_secs: num_frames as f64 / f64::from(spec.sample_rate),
        format,
    })
}

/// Shape of a WAV file as catena writes it.
///
/// 32 bits means IEEE float, 16 and 24 mean integer PCM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    /// Number of interleaved channels.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth per sample.
    pub bits_per_sample: u16,
}

impl Default for WavSpec {
    fn default() -> Self {
        Self {
            channels: 2,
            sample_rate: 48000,
            bits_per_sample: 32,
        }
    }
}

impl WavSpec {
    /// Copy of this spec with another channel count.
    pub fn with_channels(self, channels: u16) -> Self {
        Self { channels, ..self }
    }

    /// Copy of this spec with another bit depth.
    pub fn with_bits(self, bits_per_sample: u16) -> Self {
        Self {
            bits_per_sample,
            ..self
        }
    }
}

impl From<hound::WavSpec> for WavSpec {
    fn from(spec: hound::WavSpec) -> Self {
        Self {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
        }
    }
}

impl From<WavSpec> for hound::WavSpec {
    fn from(spec: WavSpec) -> Self {
        hound::WavSpec {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
            sample_format: if spec.bits_per_sample == 32 {
                SampleFormat::Float
            } else {
                SampleFormat::Int
            },
        }
    }
}

fn int_scale(bits: u16) -> Sample {
    (1i64 << (bits.clamp(1, 32) - 1)) as Sample
}

/// Reads a WAV file as interleaved samples along with its spec.
///
/// Channels are kept as they are in the file; nothing is mixed down.
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<(Vec<Sample>, WavSpec)> {
    let path = path.as_ref();
    let reader = WavReader::open(path)?;
    let hound_spec = reader.spec();
    let spec = WavSpec::from(hound_spec);

    let samples: Vec<Sample> = match hound_spec.sample_format {
        SampleFormat::Float => {
            if spec.bits_per_sample != 32 {
                return Err(Error::UnsupportedFormat(format!(
                    "{}-bit float",
                    spec.bits_per_sample
                )));
            }
            reader
                .into_samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
        SampleFormat::Int => {
            let scale = int_scale(spec.bits_per_sample);
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as Sample / scale))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    tracing::debug!(
        path = %path.display(),
        channels = spec.channels,
        sample_rate = spec.sample_rate,
        bits = spec.bits_per_sample,
        samples = samples.len(),
        "read wav"
    );
    Ok((samples, spec))
}

/// Writes interleaved samples to a WAV file.
///
/// Integer depths clamp to the representable range; float output is
/// written unclamped. Bit depths other than 16, 24 and 32 are rejected
/// before the file is created.
pub fn write_wav<P: AsRef<Path>>(path: P, samples: &[Sample], spec: WavSpec) -> Result<()> {
    if !matches!(spec.bits_per_sample, 16 | 24 | 32) {
        return Err(Error::UnsupportedFormat(format!(
            "{}-bit output",
            spec.bits_per_sample
        )));
    }
    if spec.channels == 0 {
        return Err(Error::InvalidLayout("zero channels".into()));
    }

    let path = path.as_ref();
    let mut writer = WavWriter::create(path, hound::WavSpec::from(spec))?;
    if spec.bits_per_sample == 32 {
        for &sample in samples {
            writer.write_sample(sample)?;
        }
    } else {
        let scale = int_scale(spec.bits_per_sample);
        for &sample in samples {
            let int_sample = (sample * scale).clamp(-scale, scale - 1.0) as i32;
            writer.write_sample(int_sample)?;
        }
    }
    writer.finalize()?;

    tracing::debug!(
        path = %path.display(),
        channels = spec.channels,
        bits = spec.bits_per_sample,
        samples = samples.len(),
        "wrote wav"
    );
    Ok(())
}
