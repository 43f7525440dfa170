use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::domain::clock::clock::SystemClock;

/// Hand-driven clock. Clones share the same time.
#[derive(Debug, Clone)]
pub struct MockClock {
    pub time: Arc<AtomicI64>,
}

impl MockClock {
    pub fn new(time_ms: i64) -> MockClock {
        MockClock { time: Arc::new(AtomicI64::new(time_ms)) }
    }

    pub fn set_ms(&self, time_ms: i64) {
        self.time.store(time_ms, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, delta_ms: i64) {
        self.time.fetch_add(delta_ms, Ordering::SeqCst);
    }

    pub fn advance_s(&self, delta_s: i64) {
        self.advance_ms(delta_s * 1000);
    }
}

impl SystemClock for MockClock {
    fn now_ms(&self) -> i64 {
        self.time.load(Ordering::SeqCst)
    }
}
