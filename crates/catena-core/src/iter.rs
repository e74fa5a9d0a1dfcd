//! Cursors for walking the samples of a [`SampleBuffer`].
//!
//! Operators that do not care about buffer layout can use a cursor to visit
//! every sample they need to touch. All three cursors share the same
//! protocol:
//!
//! ```rust
//! use catena_core::{ChannelsCursor, SampleBuffer};
//!
//! let mut buffer = SampleBuffer::new(2, 4, 48000);
//! let mut cursor = ChannelsCursor::new(&mut buffer);
//! cursor.begin();
//! while !cursor.end() {
//!     *cursor.current() = cursor.channel() as f32;
//!     cursor.next();
//! }
//! assert_eq!(buffer.channel(1), &[1.0; 4]);
//! ```
//!
//! Cursors borrow the buffer mutably, so the buffer shape cannot change
//! while one is alive.

use crate::buffer::{Sample, SampleBuffer};

/// Walks a single channel.
///
/// A channel index beyond the buffer's channel count gives a cursor that is
/// exhausted immediately.
#[derive(Debug)]
pub struct ChannelCursor<'a> {
    buffer: &'a mut SampleBuffer,
    channel: usize,
    frame: usize,
}

impl<'a> ChannelCursor<'a> {
    /// Creates a cursor over channel 0.
    pub fn new(buffer: &'a mut SampleBuffer) -> Self {
        Self {
            buffer,
            channel: 0,
            frame: 0,
        }
    }

    /// Rewinds to the first frame of the current channel.
    pub fn begin(&mut self) {
        self.frame = 0;
    }

    /// Rebinds to `channel` and rewinds.
    pub fn begin_channel(&mut self, channel: usize) {
        self.channel = channel;
        self.frame = 0;
    }

    /// Returns true once every frame of the channel has been visited.
    pub fn end(&self) -> bool {
        self.channel >= self.buffer.channel_count() || self.frame >= self.buffer.frame_count()
    }

    /// Moves to the next frame.
    pub fn next(&mut self) {
        self.frame += 1;
    }

    /// Returns the sample under the cursor.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is exhausted.
    pub fn current(&mut self) -> &mut Sample {
        assert!(!self.end(), "cursor is past the end of the channel");
        &mut self.buffer.channel_mut(self.channel)[self.frame]
    }

    /// Returns the bound channel index.
    pub fn channel(&self) -> usize {
        self.channel
    }

    /// Returns the current frame index.
    pub fn frame(&self) -> usize {
        self.frame
    }
}

/// Walks every channel in channel-major order.
#[derive(Debug)]
pub struct ChannelsCursor<'a> {
    buffer: &'a mut SampleBuffer,
    channel: usize,
    frame: usize,
}

impl<'a> ChannelsCursor<'a> {
    /// Creates a cursor positioned at channel 0, frame 0.
    pub fn new(buffer: &'a mut SampleBuffer) -> Self {
        Self {
            buffer,
            channel: 0,
            frame: 0,
        }
    }

    /// Rewinds to channel 0, frame 0.
    pub fn begin(&mut self) {
        self.channel = 0;
        self.frame = 0;
    }

    /// Returns true once every sample has been visited.
    pub fn end(&self) -> bool {
        self.buffer.frame_count() == 0 || self.channel >= self.buffer.channel_count()
    }

    /// Advances one frame, wrapping to the next channel after the last frame.
    pub fn next(&mut self) {
        self.frame += 1;
        if self.frame >= self.buffer.frame_count() {
            self.frame = 0;
            self.channel += 1;
        }
    }

    /// Returns the sample under the cursor.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is exhausted.
    pub fn current(&mut self) -> &mut Sample {
        assert!(!self.end(), "cursor is past the end of the buffer");
        &mut self.buffer.channel_mut(self.channel)[self.frame]
    }

    /// Returns the current channel index.
    pub fn channel(&self) -> usize {
        self.channel
    }

    /// Returns the current frame index.
    pub fn frame(&self) -> usize {
        self.frame
    }
}

/// Walks every channel in frame-major (interleaved) order.
#[derive(Debug)]
pub struct InterleavedCursor<'a> {
    buffer: &'a mut SampleBuffer,
    channel: usize,
    frame: usize,
}

impl<'a> InterleavedCursor<'a> {
    /// Creates a cursor positioned at frame 0, channel 0.
    pub fn new(buffer: &'a mut SampleBuffer) -> Self {
        Self {
            buffer,
            channel: 0,
            frame: 0,
        }
    }

    /// Rewinds to frame 0, channel 0.
    pub fn begin(&mut self) {
        self.channel = 0;
        self.frame = 0;
    }

    /// Returns true once every sample has been visited.
    pub fn end(&self) -> bool {
        self.buffer.channel_count() == 0 || self.frame >= self.buffer.frame_count()
    }

    /// Advances one channel, wrapping to the next frame after the last channel.
    pub fn next(&mut self) {
        self.channel += 1;
        if self.channel >= self.buffer.channel_count() {
            self.channel = 0;
            self.frame += 1;
        }
    }

    /// Returns the sample under the cursor.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is exhausted.
    pub fn current(&mut self) -> &mut Sample {
        assert!(!self.end(), "cursor is past the end of the buffer");
        &mut self.buffer.channel_mut(self.channel)[self.frame]
    }

    /// Returns the current channel index.
    pub fn channel(&self) -> usize {
        self.channel
    }

    /// Returns the current frame index.
    pub fn frame(&self) -> usize {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(channels: usize, frames: usize) -> SampleBuffer {
        let mut buffer = SampleBuffer::new(channels, frames, 48000);
        for ch in 0..channels {
            for (i, s) in buffer.channel_mut(ch).iter_mut().enumerate() {
                *s = (ch * 10 + i) as f32;
            }
        }
        buffer
    }

    #[test]
    fn test_channel_cursor_visits_one_channel() {
        let mut buffer = numbered(2, 3);
        let mut cursor = ChannelCursor::new(&mut buffer);
        cursor.begin_channel(1);
        let mut seen = Vec::new();
        while !cursor.end() {
            seen.push(*cursor.current());
            cursor.next();
        }
        assert_eq!(seen, vec![10.0, 11.0, 12.0]);
    }

    #[test]
    fn test_channel_cursor_out_of_range_channel() {
        let mut buffer = numbered(1, 3);
        let mut cursor = ChannelCursor::new(&mut buffer);
        cursor.begin_channel(4);
        assert!(cursor.end());
    }

    #[test]
    fn test_channels_cursor_is_channel_major() {
        let mut buffer = numbered(2, 2);
        let mut cursor = ChannelsCursor::new(&mut buffer);
        cursor.begin();
        let mut seen = Vec::new();
        while !cursor.end() {
            seen.push((cursor.channel(), cursor.frame(), *cursor.current()));
            cursor.next();
        }
        assert_eq!(
            seen,
            vec![(0, 0, 0.0), (0, 1, 1.0), (1, 0, 10.0), (1, 1, 11.0)]
        );
    }

    #[test]
    fn test_interleaved_cursor_is_frame_major() {
        let mut buffer = numbered(2, 2);
        let mut cursor = InterleavedCursor::new(&mut buffer);
        cursor.begin();
        let mut seen = Vec::new();
        while !cursor.end() {
            seen.push(*cursor.current());
            cursor.next();
        }
        assert_eq!(seen, vec![0.0, 10.0, 1.0, 11.0]);
    }

    #[test]
    fn test_cursors_on_empty_block() {
        let mut buffer = SampleBuffer::new(2, 0, 48000);
        assert!(ChannelsCursor::new(&mut buffer).end());
        assert!(InterleavedCursor::new(&mut buffer).end());
        assert!(ChannelCursor::new(&mut buffer).end());
    }

    #[test]
    fn test_cursor_writes_through() {
        let mut buffer = SampleBuffer::new(2, 2, 48000);
        {
            let mut cursor = InterleavedCursor::new(&mut buffer);
            let mut n = 0.0;
            while !cursor.end() {
                *cursor.current() = n;
                n += 1.0;
                cursor.next();
            }
        }
        assert_eq!(buffer.channel(0), &[0.0, 2.0]);
        assert_eq!(buffer.channel(1), &[1.0, 3.0]);
    }

    #[test]
    #[should_panic(expected = "past the end")]
    fn test_current_panics_when_exhausted() {
        let mut buffer = SampleBuffer::new(1, 1, 48000);
        let mut cursor = ChannelCursor::new(&mut buffer);
        cursor.next();
        let _ = cursor.current();
    }
}
