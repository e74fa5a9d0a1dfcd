//! Engine-wide processing settings.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Sample widths a setup may ask the output to be written with.
pub const SUPPORTED_BITS: [u16; 3] = [16, 24, 32];

/// Processing parameters shared by every chain of a setup.
///
/// Every field has a serde default, so a setup file may leave out the
/// `[settings]` table entirely or give only some of its keys.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineSettings {
    /// Sample rate in Hz used when the input does not dictate one.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Frames per processing block.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Bits per sample of written output (32 means float).
    #[serde(default = "default_output_bits")]
    pub output_bits: u16,
}

fn default_sample_rate() -> u32 {
    48000
}

fn default_buffer_size() -> usize {
    1024
}

fn default_output_bits() -> u16 {
    32
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            buffer_size: default_buffer_size(),
            output_bits: default_output_bits(),
        }
    }
}

impl EngineSettings {
    /// Set the sample rate.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Set the block size.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Set the output sample width.
    pub fn with_output_bits(mut self, output_bits: u16) -> Self {
        self.output_bits = output_bits;
        self
    }

    /// Checks every field against its legal range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSetting`] for the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "sample_rate",
                reason: "must be at least 1 Hz".into(),
            });
        }
        if self.buffer_size == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "buffer_size",
                reason: "must be at least 1 frame".into(),
            });
        }
        if !SUPPORTED_BITS.contains(&self.output_bits) {
            return Err(ConfigError::InvalidSetting {
                name: "output_bits",
                reason: format!("{} is not one of 16, 24 or 32", self.output_bits),
            });
        }
        Ok(())
    }

    /// Length of one block in seconds.
    pub fn block_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.buffer_size as f64 / f64::from(self.sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = EngineSettings::default();
        assert_eq!(settings.sample_rate, 48000);
        assert_eq!(settings.buffer_size, 1024);
        assert_eq!(settings.output_bits, 32);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let settings: EngineSettings = toml::from_str("buffer_size = 256").unwrap();
        assert_eq!(settings.buffer_size, 256);
        assert_eq!(settings.sample_rate, 48000);
        assert_eq!(settings.output_bits, 32);
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        let zero_block = EngineSettings::default().with_buffer_size(0);
        assert!(matches!(
            zero_block.validate(),
            Err(ConfigError::InvalidSetting {
                name: "buffer_size",
                ..
            })
        ));
        let odd_bits = EngineSettings::default().with_output_bits(20);
        assert!(odd_bits.validate().is_err());
        let no_rate = EngineSettings::default().with_sample_rate(0);
        assert!(no_rate.validate().is_err());
        assert_eq!(no_rate.block_seconds(), 0.0);
    }

    #[test]
    fn test_block_seconds() {
        let settings = EngineSettings::default()
            .with_sample_rate(1000)
            .with_buffer_size(250);
        assert_eq!(settings.block_seconds(), 0.25);
    }
}
