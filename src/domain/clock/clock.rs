use std::sync::Arc;

/// Source of "now" for every deadline in the control plane.
///
/// The core never sleeps. Timeouts and scenario delays are compared against this clock
/// whenever the owner ticks the control plane, so tests can drive time by hand.
pub trait SystemClock: std::fmt::Debug + Send + Sync {
    fn now_ms(&self) -> i64;

    fn now_s(&self) -> i64 {
        self.now_ms() / 1000
    }
}

pub type SharedClock = Arc<dyn SystemClock>;

/// Wall clock time.
#[derive(Debug, Clone, Default)]
pub struct RealTimeClock;

impl RealTimeClock {
    pub fn new() -> Self {
        RealTimeClock
    }
}

impl SystemClock for RealTimeClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}
