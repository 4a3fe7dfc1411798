use neon_session_core::{PeerId, SyncMessage};
use std::collections::VecDeque;

/// Bounded FIFO of gameplay messages waiting for the next sync call
#[derive(Debug)]
pub struct MessageQueue {
    queue: VecDeque<(PeerId, SyncMessage)>,
    max_size: usize,
}

impl MessageQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    /// Push a message (returns error if full)
    pub fn push(&mut self, from: PeerId, msg: SyncMessage) -> Result<(), QueueError> {
        if self.queue.len() >= self.max_size {
            return Err(QueueError::Full { max: self.max_size });
        }
        self.queue.push_back((from, msg));
        Ok(())
    }

    /// Drain all messages (for batch processing)
    pub fn drain(&mut self) -> Vec<(PeerId, SyncMessage)> {
        self.queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_size
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum QueueError {
    #[error("Queue is full (max size: {max})")]
    Full { max: usize },
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new(256)
    }
}
