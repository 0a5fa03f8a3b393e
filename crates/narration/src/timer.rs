//! Owned queue of delayed events.
//!
//! Nothing fires on its own: the owner pulls due events with [`TimerQueue::pop_due`]
//! from its tick. Dropping the queue cancels everything still pending.

use std::time::Instant;

#[derive(Debug)]
struct Pending<E> {
    due: Instant,
    event: E,
}

#[derive(Debug)]
pub struct TimerQueue<E> {
    pending: Vec<Pending<E>>,
}

impl<E> Default for TimerQueue<E> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
        }
    }
}

impl<E> TimerQueue<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: Instant, event: E) {
        // Equal due times keep scheduling order.
        let at = self.pending.partition_point(|p| p.due <= due);
        self.pending.insert(at, Pending { due, event });
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    /// Removes and returns the earliest event due at `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<E> {
        match self.pending.first() {
            Some(first) if first.due <= now => Some(self.pending.remove(0).event),
            _ => None,
        }
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.pending.first().map(|p| p.due)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn pops_in_due_order() {
        let t0 = Instant::now();
        let mut timers = TimerQueue::new();
        timers.schedule(t0 + Duration::from_millis(30), "c");
        timers.schedule(t0 + Duration::from_millis(10), "a");
        timers.schedule(t0 + Duration::from_millis(10), "b");

        assert_eq!(timers.pop_due(t0), None);
        assert_eq!(timers.next_due(), Some(t0 + Duration::from_millis(10)));

        let later = t0 + Duration::from_secs(1);
        let fired: Vec<_> = std::iter::from_fn(|| timers.pop_due(later)).collect();
        assert_eq!(fired, vec!["a", "b", "c"]);
        assert!(timers.is_empty());
    }

    #[test]
    fn cancelled_events_never_fire() {
        let t0 = Instant::now();
        let mut timers = TimerQueue::new();
        timers.schedule(t0, 3);
        timers.schedule(t0 + Duration::from_millis(5), 4);
        timers.cancel_all();
        assert_eq!(timers.pop_due(t0 + Duration::from_secs(60)), None);
        assert_eq!(timers.len(), 0);
    }
}
