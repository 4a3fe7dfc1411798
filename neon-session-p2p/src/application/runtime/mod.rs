mod message_queue;
mod ticker;

pub use message_queue::{MessageQueue, QueueError};
pub use ticker::Ticker;
