//! Multi-channel sample buffer shared by every stage of a chain.
//!
//! A [`SampleBuffer`] is a rectangular block of audio indexed
//! `[channel][frame]`. Chain operators transform it in place; operators that
//! change the channel count (a pan forcing stereo, a channel copy) resize it
//! through [`SampleBuffer::set_channel_count`], which keeps every channel at
//! the current frame count.
//!
//! Channel storage is retained when the channel count shrinks, so a chain
//! that toggles between mono and stereo every block does not allocate after
//! the first block.

/// A single audio sample.
pub type Sample = f32;

/// Largest sample value before clipping.
pub const MAX_AMPLITUDE: Sample = 1.0;

/// Most channels an operator may ask for.
///
/// Operators that take a channel number as a parameter clamp it below this,
/// so a chain string cannot make a block allocate without bound.
pub const MAX_CHANNELS: usize = 64;

/// Rectangular `[channel][frame]` audio block with a sample rate.
///
/// # Example
///
/// ```rust
/// use catena_core::SampleBuffer;
///
/// let mut buffer = SampleBuffer::new(1, 64, 48000);
/// buffer.channel_mut(0).fill(0.5);
///
/// // Mono to stereo: the new channel starts silent.
/// buffer.set_channel_count(2);
/// assert_eq!(buffer.channel(0)[10], 0.5);
/// assert_eq!(buffer.channel(1)[10], 0.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    data: Vec<Vec<Sample>>,
    channel_count: usize,
    frame_count: usize,
    sample_rate: u32,
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new(2, 0, 48000)
    }
}

impl SampleBuffer {
    /// Creates a silent buffer with the given shape.
    pub fn new(channels: usize, frames: usize, sample_rate: u32) -> Self {
        Self {
            data: vec![vec![0.0; frames]; channels],
            channel_count: channels,
            frame_count: frames,
            sample_rate,
        }
    }

    /// Returns the number of active channels.
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Sets the number of active channels.
    ///
    /// Channels added by growing are silent. Shrinking hides trailing
    /// channels without freeing their storage.
    pub fn set_channel_count(&mut self, channels: usize) {
        while self.data.len() < channels {
            self.data.push(vec![0.0; self.frame_count]);
        }
        for ch in self.channel_count..channels {
            self.data[ch].fill(0.0);
        }
        self.channel_count = channels;
    }

    /// Returns the number of frames (samples per channel) in the block.
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Sets the block length. New frames are silent; zero is allowed.
    pub fn set_frame_count(&mut self, frames: usize) {
        for channel in &mut self.data {
            channel.resize(frames, 0.0);
        }
        self.frame_count = frames;
    }

    /// Returns the sample rate in Hz.
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Sets the sample rate in Hz.
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
    }

    /// Returns the block length in seconds.
    pub fn length_in_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count as f64 / f64::from(self.sample_rate)
    }

    /// Returns the samples of one channel.
    ///
    /// # Panics
    ///
    /// Panics if `channel >= channel_count()`.
    #[inline]
    pub fn channel(&self, channel: usize) -> &[Sample] {
        assert!(channel < self.channel_count, "channel {channel} out of range");
        &self.data[channel]
    }

    /// Returns the samples of one channel mutably.
    ///
    /// # Panics
    ///
    /// Panics if `channel >= channel_count()`.
    #[inline]
    pub fn channel_mut(&mut self, channel: usize) -> &mut [Sample] {
        assert!(channel < self.channel_count, "channel {channel} out of range");
        &mut self.data[channel]
    }

    /// Iterates over the active channels.
    pub fn channels(&self) -> impl Iterator<Item = &[Sample]> {
        self.data[..self.channel_count].iter().map(Vec::as_slice)
    }

    /// Iterates mutably over the active channels.
    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut [Sample]> {
        self.data[..self.channel_count]
            .iter_mut()
            .map(Vec::as_mut_slice)
    }

    /// Returns two distinct channels mutably.
    ///
    /// Returns `None` if either index is out of range or both are equal.
    pub fn channel_pair_mut(
        &mut self,
        first: usize,
        second: usize,
    ) -> Option<(&mut [Sample], &mut [Sample])> {
        if first == second || first >= self.channel_count || second >= self.channel_count {
            return None;
        }
        if first < second {
            let (head, tail) = self.data.split_at_mut(second);
            Some((head[first].as_mut_slice(), tail[0].as_mut_slice()))
        } else {
            let (head, tail) = self.data.split_at_mut(first);
            Some((tail[0].as_mut_slice(), head[second].as_mut_slice()))
        }
    }

    /// Zeroes every active sample.
    pub fn make_silent(&mut self) {
        for channel in self.channels_mut() {
            channel.fill(0.0);
        }
    }

    /// Zeroes frames `start..end` of every active channel.
    pub fn make_silent_range(&mut self, start: usize, end: usize) {
        let end = end.min(self.frame_count);
        if start >= end {
            return;
        }
        for channel in self.channels_mut() {
            channel[start..end].fill(0.0);
        }
    }

    /// Returns true if every active sample is exactly zero.
    pub fn is_silent(&self) -> bool {
        self.channels().all(|ch| ch.iter().all(|&s| s == 0.0))
    }

    /// Clamps every active sample to `[-MAX_AMPLITUDE, MAX_AMPLITUDE]`.
    pub fn limit_values(&mut self) {
        for channel in self.channels_mut() {
            for sample in channel.iter_mut() {
                *sample = sample.clamp(-MAX_AMPLITUDE, MAX_AMPLITUDE);
            }
        }
    }

    /// Root mean square over every active sample. 0.0 for an empty block.
    pub fn rms_volume(&self) -> Sample {
        let count = self.channel_count * self.frame_count;
        if count == 0 {
            return 0.0;
        }
        let sum: f64 = self
            .channels()
            .flat_map(|ch| ch.iter())
            .map(|&s| f64::from(s) * f64::from(s))
            .sum();
        libm::sqrt(sum / count as f64) as Sample
    }

    /// Mean absolute value over every active sample. 0.0 for an empty block.
    pub fn average_amplitude(&self) -> Sample {
        let count = self.channel_count * self.frame_count;
        if count == 0 {
            return 0.0;
        }
        let sum: f64 = self
            .channels()
            .flat_map(|ch| ch.iter())
            .map(|&s| f64::from(s.abs()))
            .sum();
        (sum / count as f64) as Sample
    }

    /// Largest absolute value over every active sample.
    pub fn peak_amplitude(&self) -> Sample {
        self.channels()
            .flat_map(|ch| ch.iter())
            .fold(0.0, |peak: Sample, &s| peak.max(s.abs()))
    }

    /// Copies another buffer's block length and the channels both share.
    pub fn copy_from(&mut self, other: &SampleBuffer) {
        self.set_frame_count(other.frame_count);
        let shared = self.channel_count.min(other.channel_count);
        for ch in 0..shared {
            self.data[ch].copy_from_slice(&other.data[ch]);
        }
    }

    /// Adds another buffer's samples into this one, channel by channel.
    ///
    /// Only the overlapping channels and frames are mixed.
    pub fn add_from(&mut self, other: &SampleBuffer) {
        let shared = self.channel_count.min(other.channel_count);
        for ch in 0..shared {
            for (dst, src) in self.data[ch].iter_mut().zip(other.data[ch].iter()) {
                *dst += *src;
            }
        }
    }

    /// Divides every active sample by `divisor`. A zero divisor is ignored.
    pub fn divide_by(&mut self, divisor: Sample) {
        if divisor == 0.0 {
            return;
        }
        for channel in self.channels_mut() {
            for sample in channel.iter_mut() {
                *sample /= divisor;
            }
        }
    }

    /// Fills the buffer from interleaved samples.
    ///
    /// The channel count becomes `channels` and the frame count becomes
    /// `interleaved.len() / channels`; a trailing partial frame is dropped.
    pub fn read_interleaved(&mut self, interleaved: &[Sample], channels: usize) {
        if channels == 0 {
            self.set_frame_count(0);
            return;
        }
        let frames = interleaved.len() / channels;
        self.set_channel_count(channels);
        self.set_frame_count(frames);
        for (frame, chunk) in interleaved.chunks_exact(channels).enumerate() {
            for (ch, &sample) in chunk.iter().enumerate() {
                self.data[ch][frame] = sample;
            }
        }
    }

    /// Appends the active channels to `out` in interleaved (frame-major) order.
    pub fn write_interleaved(&self, out: &mut Vec<Sample>) {
        out.reserve(self.frame_count * self.channel_count);
        for frame in 0..self.frame_count {
            for ch in 0..self.channel_count {
                out.push(self.data[ch][frame]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_silent() {
        let buffer = SampleBuffer::new(2, 128, 44100);
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.frame_count(), 128);
        assert_eq!(buffer.sample_rate(), 44100);
        assert!(buffer.is_silent());
    }

    #[test]
    fn test_grow_channels_zero_fills() {
        let mut buffer = SampleBuffer::new(2, 8, 48000);
        buffer.channel_mut(1).fill(0.7);
        buffer.set_channel_count(1);
        buffer.set_channel_count(3);

        assert_eq!(buffer.channel_count(), 3);
        for ch in buffer.channels() {
            assert_eq!(ch.len(), 8);
        }
        // Stale data from the hidden channel must not reappear.
        assert!(buffer.channel(1).iter().all(|&s| s == 0.0));
        assert!(buffer.channel(2).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_frame_count_resizes_all_channels() {
        let mut buffer = SampleBuffer::new(3, 16, 48000);
        buffer.set_channel_count(1);
        buffer.set_frame_count(4);
        buffer.set_channel_count(3);
        for ch in buffer.channels() {
            assert_eq!(ch.len(), 4);
        }

        buffer.set_frame_count(0);
        assert_eq!(buffer.frame_count(), 0);
        assert!(buffer.is_silent());
    }

    #[test]
    fn test_make_silent_range() {
        let mut buffer = SampleBuffer::new(1, 8, 48000);
        buffer.channel_mut(0).fill(1.0);
        buffer.make_silent_range(2, 5);
        assert_eq!(buffer.channel(0), &[1.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);

        // Out of range end is clamped, inverted ranges are ignored.
        buffer.make_silent_range(6, 100);
        buffer.make_silent_range(4, 1);
        assert_eq!(buffer.channel(0), &[1.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_limit_values() {
        let mut buffer = SampleBuffer::new(1, 3, 48000);
        buffer.channel_mut(0).copy_from_slice(&[1.5, -2.0, 0.25]);
        buffer.limit_values();
        assert_eq!(buffer.channel(0), &[1.0, -1.0, 0.25]);
    }

    #[test]
    fn test_interleaved_roundtrip() {
        let input = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let mut buffer = SampleBuffer::default();
        buffer.read_interleaved(&input, 2);

        assert_eq!(buffer.frame_count(), 3);
        assert_eq!(buffer.channel(0), &[1.0, 3.0, 5.0]);
        assert_eq!(buffer.channel(1), &[2.0, 4.0, 6.0]);

        let mut out = Vec::new();
        buffer.write_interleaved(&mut out);
        assert_eq!(out, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_mixing_helpers() {
        let mut a = SampleBuffer::new(2, 2, 48000);
        let mut b = SampleBuffer::new(1, 2, 48000);
        a.channel_mut(0).fill(1.0);
        a.channel_mut(1).fill(1.0);
        b.channel_mut(0).fill(3.0);

        a.add_from(&b);
        a.divide_by(2.0);
        assert_eq!(a.channel(0), &[2.0, 2.0]);
        assert_eq!(a.channel(1), &[0.5, 0.5]);

        a.divide_by(0.0);
        assert_eq!(a.channel(0), &[2.0, 2.0]);
    }

    #[test]
    fn test_copy_from_takes_shape_of_shared_channels() {
        let mut src = SampleBuffer::new(1, 4, 48000);
        src.channel_mut(0).fill(0.5);
        let mut dst = SampleBuffer::new(2, 16, 48000);
        dst.channel_mut(1).fill(0.9);

        dst.copy_from(&src);
        assert_eq!(dst.frame_count(), 4);
        assert_eq!(dst.channel(0), &[0.5; 4]);
        assert_eq!(dst.channel(1), &[0.9; 4]);
    }

    #[test]
    fn test_channel_pair_mut() {
        let mut buffer = SampleBuffer::new(3, 2, 48000);
        {
            let (a, b) = buffer.channel_pair_mut(2, 0).unwrap();
            a.fill(2.0);
            b.fill(1.0);
        }
        assert_eq!(buffer.channel(0), &[1.0, 1.0]);
        assert_eq!(buffer.channel(2), &[2.0, 2.0]);
        assert!(buffer.channel_pair_mut(1, 1).is_none());
        assert!(buffer.channel_pair_mut(0, 3).is_none());
    }

    #[test]
    fn test_level_measurements() {
        let mut buffer = SampleBuffer::new(2, 2, 48000);
        buffer.channel_mut(0).copy_from_slice(&[0.5, -0.5]);
        buffer.channel_mut(1).copy_from_slice(&[1.0, 0.0]);
        assert_eq!(buffer.peak_amplitude(), 1.0);
        assert!((buffer.average_amplitude() - 0.5).abs() < 1e-6);
        assert!((buffer.rms_volume() - 0.375f32.sqrt()).abs() < 1e-6);
        assert_eq!(SampleBuffer::new(1, 0, 48000).rms_volume(), 0.0);
    }

    #[test]
    fn test_length_in_seconds() {
        let buffer = SampleBuffer::new(1, 480, 48000);
        assert!((buffer.length_in_seconds() - 0.01).abs() < 1e-12);
        assert_eq!(SampleBuffer::new(1, 480, 0).length_in_seconds(), 0.0);
    }
}
