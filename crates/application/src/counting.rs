//! Timed highlight-and-count sequence for numbers pages.

use std::time::{Duration, Instant};

use picturebook_core::CountingSettings;
use picturebook_narration::TimerQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountStep {
    /// Highlight object `i` and say `i + 1`.
    Highlight(usize),
    Clear,
}

/// Owns every pending step of one counting run. Dropping the session
/// cancels whatever has not fired yet.
#[derive(Debug)]
pub struct CountingSession {
    timers: TimerQueue<CountStep>,
    highlight: Option<usize>,
    count: usize,
}

impl CountingSession {
    /// Schedules `count` highlights after a lead long enough for `intro` to be heard.
    pub fn start(intro: &str, count: usize, settings: &CountingSettings, now: Instant) -> Self {
        let lead = lead_delay(intro, settings);
        let interval = Duration::from_millis(settings.interval_ms);
        let mut timers = TimerQueue::new();
        for i in 0..count {
            timers.schedule(now + lead + interval * i as u32, CountStep::Highlight(i));
        }
        timers.schedule(now + lead + interval * count as u32, CountStep::Clear);
        Self {
            timers,
            highlight: None,
            count,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn highlight(&self) -> Option<usize> {
        self.highlight
    }

    pub fn pending_len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_finished(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.timers.next_due()
    }

    /// Fires due steps in order and returns them.
    pub fn tick(&mut self, now: Instant) -> Vec<CountStep> {
        let mut fired = Vec::new();
        while let Some(step) = self.timers.pop_due(now) {
            self.highlight = match step {
                CountStep::Highlight(i) => Some(i),
                CountStep::Clear => None,
            };
            fired.push(step);
        }
        fired
    }

    pub fn cancel(&mut self) {
        self.timers.cancel_all();
        self.highlight = None;
    }
}

impl Drop for CountingSession {
    fn drop(&mut self) {
        self.cancel();
    }
}

pub fn lead_delay(intro: &str, settings: &CountingSettings) -> Duration {
    let chars = intro.chars().count() as u64;
    Duration::from_millis(
        settings
            .lead_floor_ms
            .max(chars.saturating_mul(settings.lead_per_char_ms)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn schedules_one_step_per_object_plus_clear() {
        let t0 = Instant::now();
        let session = CountingSession::start("Three ducks!", 3, &CountingSettings::default(), t0);
        assert_eq!(session.pending_len(), 4);
        assert_eq!(session.next_due(), Some(t0 + ms(1_200)));
        assert_eq!(session.highlight(), None);
    }

    #[test]
    fn steps_fire_at_lead_plus_interval() {
        let t0 = Instant::now();
        let mut session = CountingSession::start("Two", 2, &CountingSettings::default(), t0);

        assert!(session.tick(t0 + ms(1_199)).is_empty());
        assert_eq!(session.tick(t0 + ms(1_200)), vec![CountStep::Highlight(0)]);
        assert_eq!(session.highlight(), Some(0));
        assert_eq!(session.tick(t0 + ms(2_100)), vec![CountStep::Highlight(1)]);
        assert_eq!(session.highlight(), Some(1));
        assert_eq!(session.tick(t0 + ms(3_000)), vec![CountStep::Clear]);
        assert_eq!(session.highlight(), None);
        assert!(session.is_finished());
    }

    #[test]
    fn late_tick_fires_everything_in_order() {
        let t0 = Instant::now();
        let mut session = CountingSession::start("x", 3, &CountingSettings::default(), t0);
        assert_eq!(
            session.tick(t0 + ms(60_000)),
            vec![
                CountStep::Highlight(0),
                CountStep::Highlight(1),
                CountStep::Highlight(2),
                CountStep::Clear
            ]
        );
    }

    #[test]
    fn cancel_releases_every_step() {
        let t0 = Instant::now();
        let mut session = CountingSession::start("Four", 4, &CountingSettings::default(), t0);
        session.tick(t0 + ms(1_200));
        session.cancel();
        assert_eq!(session.pending_len(), 0);
        assert_eq!(session.highlight(), None);
        assert!(session.tick(t0 + ms(600_000)).is_empty());
    }

    #[test]
    fn long_intros_extend_the_lead() {
        let settings = CountingSettings::default();
        assert_eq!(lead_delay("", &settings), ms(1_200));
        assert_eq!(lead_delay(&"a".repeat(30), &settings), ms(1_800));
    }
}
