pub mod error;
mod matchbox;
mod transport;

pub use matchbox::MatchboxTransport;
pub use transport::Transport;
