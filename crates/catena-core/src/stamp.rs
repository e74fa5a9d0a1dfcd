//! Shared table of audio stamps.
//!
//! A stamp is the most recent block an operator saw, stored under an integer
//! id. One chain writes stamps (the `eS` operator) and controllers anywhere
//! else read them back, so the table sits behind `Arc<Mutex<..>>` and every
//! clone of a [`StampServer`] refers to the same storage.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::SampleBuffer;

/// Handle to a shared stamp table. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct StampServer {
    stamps: Arc<Mutex<HashMap<i32, SampleBuffer>>>,
}

impl StampServer {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a copy of `buffer` under `id`, replacing the previous stamp.
    ///
    /// The stored block keeps its allocation between calls, so steady-state
    /// stamping does not allocate.
    pub fn store(&self, id: i32, buffer: &SampleBuffer) {
        let mut stamps = self.stamps.lock();
        match stamps.get_mut(&id) {
            Some(stamp) => {
                stamp.set_channel_count(buffer.channel_count());
                stamp.set_sample_rate(buffer.sample_rate());
                stamp.copy_from(buffer);
            }
            None => {
                stamps.insert(id, buffer.clone());
            }
        }
    }

    /// Runs `f` on the stamp stored under `id`, if any.
    pub fn with_stamp<R>(&self, id: i32, f: impl FnOnce(&SampleBuffer) -> R) -> Option<R> {
        self.stamps.lock().get(&id).map(f)
    }

    /// Copy of the stamp stored under `id`.
    pub fn fetch(&self, id: i32) -> Option<SampleBuffer> {
        self.with_stamp(id, SampleBuffer::clone)
    }

    /// Whether a stamp exists under `id`.
    pub fn contains(&self, id: i32) -> bool {
        self.stamps.lock().contains_key(&id)
    }

    /// Number of stored stamps.
    pub fn len(&self) -> usize {
        self.stamps.lock().len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every stamp.
    pub fn clear(&self) {
        self.stamps.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(value: f32) -> SampleBuffer {
        let mut buffer = SampleBuffer::new(2, 4, 48000);
        for ch in buffer.channels_mut() {
            ch.fill(value);
        }
        buffer
    }

    #[test]
    fn test_clones_share_storage() {
        let writer = StampServer::new();
        let reader = writer.clone();
        assert!(reader.is_empty());

        writer.store(3, &block(0.25));
        assert!(reader.contains(3));
        assert_eq!(reader.len(), 1);
        assert_eq!(reader.with_stamp(3, SampleBuffer::peak_amplitude), Some(0.25));
        assert_eq!(reader.with_stamp(4, SampleBuffer::peak_amplitude), None);
    }

    #[test]
    fn test_store_replaces_previous_stamp() {
        let server = StampServer::new();
        server.store(1, &block(0.5));
        server.store(1, &block(-0.75));
        let stamp = server.fetch(1).unwrap();
        assert_eq!(stamp.channel(1), &[-0.75; 4]);
        assert_eq!(server.len(), 1);

        server.clear();
        assert!(server.fetch(1).is_none());
    }
}
