use instant::{Duration, Instant};

/// Fixed-interval trigger driven by the caller's clock.
///
/// Fires on the first check, then once per interval. Missed intervals are
/// not replayed and late fires do not pull the schedule back.
#[derive(Debug, Clone)]
pub struct Ticker {
    interval: Duration,
    next: Option<Instant>,
}

impl Ticker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn ready(&mut self, now: Instant) -> bool {
        match self.next {
            Some(next) if now < next => false,
            _ => {
                self.next = Some(now + self.interval);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.next = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_immediately_then_waits() {
        let start = Instant::now();
        let mut ticker = Ticker::new(Duration::from_millis(50));

        assert!(ticker.ready(start));
        assert!(!ticker.ready(start + Duration::from_millis(10)));
        assert!(ticker.ready(start + Duration::from_millis(50)));
    }

    #[test]
    fn test_no_catch_up_after_stall() {
        let start = Instant::now();
        let mut ticker = Ticker::new(Duration::from_millis(50));
        ticker.ready(start);

        let late = start + Duration::from_millis(500);
        assert!(ticker.ready(late));
        assert!(!ticker.ready(late + Duration::from_millis(1)));
    }

    #[test]
    fn test_reset_fires_again() {
        let start = Instant::now();
        let mut ticker = Ticker::new(Duration::from_millis(50));
        ticker.ready(start);
        ticker.reset();
        assert!(ticker.ready(start));
    }
}
