//! Block streaming between interleaved sample vectors and chains.

use crate::{Error, Result};
use catena_core::{Chain, Sample, SampleBuffer};

/// Cuts an interleaved sample slice into blocks of at most `block_frames`
/// frames.
///
/// The last block carries whatever frames remain. A trailing partial frame
/// (fewer samples than channels) is dropped.
#[derive(Debug, Clone)]
pub struct BlockReader<'a> {
    samples: &'a [Sample],
    channels: usize,
    block_frames: usize,
    sample_rate: u32,
    offset: usize,
}

impl<'a> BlockReader<'a> {
    /// Creates a reader over `samples` holding `channels` interleaved
    /// channels.
    pub fn new(
        samples: &'a [Sample],
        channels: usize,
        block_frames: usize,
        sample_rate: u32,
    ) -> Result<Self> {
        if channels == 0 {
            return Err(Error::InvalidLayout("zero channels".into()));
        }
        if block_frames == 0 {
            return Err(Error::InvalidLayout("zero-length blocks".into()));
        }
        Ok(Self {
            samples,
            channels,
            block_frames,
            sample_rate,
            offset: 0,
        })
    }

    /// Interleaved channel count.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Frames in the whole input.
    pub fn total_frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    /// Frames not yet handed out.
    pub fn remaining_frames(&self) -> usize {
        (self.samples.len() - self.offset) / self.channels
    }

    /// Loads the next block into `buffer`, reshaping it to this reader's
    /// channel count and the block's frame count.
    ///
    /// Returns `false` once the input is exhausted, leaving `buffer` as it
    /// was.
    pub fn fill_next(&mut self, buffer: &mut SampleBuffer) -> bool {
        let frames = self.remaining_frames().min(self.block_frames);
        if frames == 0 {
            return false;
        }
        let end = self.offset + frames * self.channels;
        buffer.read_interleaved(&self.samples[self.offset..end], self.channels);
        self.offset = end;
        true
    }
}

impl Iterator for BlockReader<'_> {
    type Item = SampleBuffer;

    fn next(&mut self) -> Option<SampleBuffer> {
        let mut buffer = SampleBuffer::new(self.channels, 0, self.sample_rate);
        self.fill_next(&mut buffer).then_some(buffer)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let blocks = self.remaining_frames().div_ceil(self.block_frames);
        (blocks, Some(blocks))
    }
}

/// Gathers processed blocks back into one interleaved vector.
#[derive(Debug, Clone, Default)]
pub struct BlockWriter {
    channels: usize,
    samples: Vec<Sample>,
}

impl BlockWriter {
    /// Creates a writer for blocks of `channels` channels.
    pub fn new(channels: usize) -> Self {
        Self {
            channels,
            samples: Vec::new(),
        }
    }

    /// Creates a writer with room for `frames` frames.
    pub fn with_capacity(channels: usize, frames: usize) -> Self {
        Self {
            channels,
            samples: Vec::with_capacity(channels * frames),
        }
    }

    /// Interleaved channel count.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Frames gathered so far.
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1)
    }

    /// Appends a block. Empty blocks are skipped whatever their channel
    /// count.
    pub fn push(&mut self, block: &SampleBuffer) -> Result<()> {
        if block.frame_count() == 0 {
            return Ok(());
        }
        if block.channel_count() != self.channels {
            return Err(Error::ChannelMismatch {
                expected: self.channels,
                found: block.channel_count(),
            });
        }
        block.write_interleaved(&mut self.samples);
        Ok(())
    }

    /// Interleaved samples gathered so far.
    pub fn as_slice(&self) -> &[Sample] {
        &self.samples
    }

    /// Consumes the writer, returning the interleaved samples.
    pub fn finish(self) -> Vec<Sample> {
        self.samples
    }
}

/// Runs `chain` over interleaved `input`, one block at a time.
///
/// Returns the interleaved output and its channel count, which is whatever
/// the chain turns `channels` into. `on_block` sees every processed block
/// before it is gathered, along with the input frames consumed so far.
pub fn render_chain<F>(
    chain: &mut Chain,
    input: &[Sample],
    channels: usize,
    sample_rate: u32,
    block_frames: usize,
    mut on_block: F,
) -> Result<(Vec<Sample>, usize)>
where
    F: FnMut(usize, &SampleBuffer),
{
    let mut reader = BlockReader::new(input, channels, block_frames, sample_rate)?;
    let out_channels = chain.output_channels(channels);
    let mut writer = BlockWriter::with_capacity(out_channels, reader.total_frames());
    tracing::debug!(
        chain = chain.name(),
        channels,
        out_channels,
        block_frames,
        frames = reader.total_frames(),
        "rendering"
    );

    let mut buffer = SampleBuffer::new(channels, block_frames, sample_rate);
    let mut running = chain.init(&mut buffer, channels, out_channels);
    while reader.fill_next(running.buffer_mut()) {
        running.process();
        on_block(reader.total_frames() - reader.remaining_frames(), running.buffer());
        writer.push(running.buffer())?;
    }
    running.release();

    tracing::debug!(frames = writer.frames(), "render finished");
    Ok((writer.finish(), out_channels))
}
