use crate::domain::PlayerRecord;

/// Hook run on the local avatar after an authoritative snapshot overwrote it.
///
/// `previous` is the locally predicted record from before the snapshot;
/// `current` already holds the host's values and may be adjusted in place.
pub trait Smoothing {
    fn smooth(&mut self, previous: &PlayerRecord, current: &mut PlayerRecord);
}

/// Accept the host's values as they are
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HardOverwrite;

impl Smoothing for HardOverwrite {
    fn smooth(&mut self, _previous: &PlayerRecord, _current: &mut PlayerRecord) {}
}
