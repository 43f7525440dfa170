use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Handle of one armed deadline inside a [`TimerQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// One-shot deadline timers evaluated against an externally supplied clock.
///
/// Nothing in here sleeps. The owner arms deadlines (control-plane clock time in ms) and later calls
/// [`TimerQueue::pop_due`] from its tick to collect every payload whose deadline passed.
/// Timers with the same deadline fire in the order they were armed.
#[derive(Debug)]
pub struct TimerQueue<T> {
    heap: BinaryHeap<Reverse<(i64, u64)>>,
    entries: HashMap<u64, (i64, T)>,
    next_seq: u64,
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self { heap: BinaryHeap::new(), entries: HashMap::new(), next_seq: 0 }
    }

    pub fn arm(&mut self, deadline_ms: i64, payload: T) -> TimerId {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse((deadline_ms, seq)));
        self.entries.insert(seq, (deadline_ms, payload));
        TimerId(seq)
    }

    /// Disarms a timer. Returns the payload if the timer had not fired yet.
    pub fn cancel(&mut self, id: TimerId) -> Option<T> {
        // The heap entry stays behind and is skipped once it surfaces.
        self.entries.remove(&id.0).map(|(_, payload)| payload)
    }

    pub fn pop_due(&mut self, now_ms: i64) -> Vec<T> {
        let mut due = Vec::new();

        while let Some(Reverse((deadline, seq))) = self.heap.peek().copied() {
            if deadline > now_ms {
                break;
            }
            self.heap.pop();

            if let Some((_, payload)) = self.entries.remove(&seq) {
                due.push(payload);
            }
        }
        due
    }

    pub fn deadline_of(&self, id: TimerId) -> Option<i64> {
        self.entries.get(&id.0).map(|(deadline, _)| *deadline)
    }

    pub fn next_deadline(&self) -> Option<i64> {
        self.entries.values().map(|(deadline, _)| *deadline).min()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Deadline `delay_sec` seconds after `now_ms`, saturating at the end of the clock range.
pub fn deadline_after(now_ms: i64, delay_sec: u64) -> i64 {
    let delay_ms = i64::try_from(delay_sec).unwrap_or(i64::MAX).saturating_mul(1000);
    now_ms.saturating_add(delay_ms)
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_due_respects_deadline_and_arm_order() {
        let mut timers = TimerQueue::new();
        timers.arm(200, "late");
        timers.arm(100, "first");
        timers.arm(100, "second");

        assert!(timers.pop_due(99).is_empty());
        assert_eq!(timers.pop_due(100), vec!["first", "second"]);
        assert_eq!(timers.next_deadline(), Some(200));
        assert_eq!(timers.pop_due(1_000), vec!["late"]);
        assert!(timers.is_empty());
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let mut timers = TimerQueue::new();
        let id = timers.arm(50, 1);
        timers.arm(60, 2);

        assert_eq!(timers.cancel(id), Some(1));
        assert_eq!(timers.cancel(id), None);
        assert_eq!(timers.pop_due(100), vec![2]);
    }

    #[test]
    fn test_deadline_after_saturates_huge_delays() {
        assert_eq!(deadline_after(500, 2), 2_500);
        assert_eq!(deadline_after(500, u64::MAX), i64::MAX);
        assert_eq!(deadline_after(500, i64::MAX as u64 / 10), i64::MAX);
    }
}
