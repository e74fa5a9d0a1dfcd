//! File I/O for catena.
//!
//! WAV files are read into interleaved sample vectors, cut into
//! block-sized [`SampleBuffer`](catena_core::SampleBuffer)s for a chain and
//! gathered back into interleaved output.

mod block;
mod wav;

pub use block::{BlockReader, BlockWriter, render_chain};
pub use wav::{WavFormat, WavInfo, WavSpec, read_wav, read_wav_info, write_wav};

use thiserror::Error;

/// Errors from audio file I/O.
#[derive(Error, Debug)]
pub enum Error {
    /// WAV decoding or encoding failed.
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// Sample format the reader or writer does not handle.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Channel count or block size that cannot describe audio.
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    /// A block whose channel count differs from the writer's.
    #[error("Channel mismatch: expected {expected}, found {found}")]
    ChannelMismatch {
        /// Channels the writer was created with.
        expected: usize,
        /// Channels of the pushed block.
        found: usize,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for catena-io operations.
pub type Result<T> = std::result::Result<T, Error>;
