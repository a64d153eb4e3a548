//! FIFO track queue for a single session.
//!
//! The queue carries its own lock, so any number of command handlers can
//! enqueue concurrently while the session's single consumer path (auto-start
//! in `play`, auto-advance on finished-notifications) dequeues. Every
//! operation is O(1) except [`TrackQueue::snapshot`].

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::types::Track;

/// Ordered collection of tracks waiting to be played.
#[derive(Debug, Default)]
pub struct TrackQueue {
    entries: Mutex<VecDeque<Track>>,
}

impl TrackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a track to the tail. Returns the queue length after the append.
    pub fn enqueue(&self, track: Track) -> usize {
        let mut entries = self.entries.lock();
        entries.push_back(track);
        entries.len()
    }

    /// Removes and returns the earliest-enqueued track.
    pub fn dequeue_next(&self) -> Option<Track> {
        self.entries.lock().pop_front()
    }

    /// Drops every pending track, returning how many were removed.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.lock();
        let removed = entries.len();
        entries.clear();
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Copy of the pending tracks in queue order.
    pub fn snapshot(&self) -> Vec<Track> {
        self.entries.lock().iter().cloned().collect()
    }
}
