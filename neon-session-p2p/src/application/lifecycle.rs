use crate::infrastructure::error::{Result, SessionError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Cloneable request to tear a session down from elsewhere (a signal
/// handler, another task).
///
/// Each request bumps the session epoch. Work started under an older epoch
/// is discarded when it resumes.
#[derive(Debug, Clone, Default)]
pub struct TeardownHandle {
    epoch: Arc<AtomicU64>,
}

impl TeardownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn teardown(&self) {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(epoch, "Teardown requested");
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    pub(crate) fn guard(&self) -> EpochGuard {
        EpochGuard {
            handle: self.clone(),
            epoch: self.epoch(),
        }
    }
}

/// Epoch captured before a suspension point
#[derive(Debug)]
pub(crate) struct EpochGuard {
    handle: TeardownHandle,
    epoch: u64,
}

impl EpochGuard {
    pub fn is_current(&self) -> bool {
        self.handle.epoch() == self.epoch
    }

    pub fn check(&self, stage: &'static str) -> Result<()> {
        if self.is_current() {
            Ok(())
        } else {
            Err(SessionError::Cancelled(stage))
        }
    }
}
