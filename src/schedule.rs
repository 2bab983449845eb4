//! Fixed-period broadcast schedule
//!
//! Deadlines advance by whole periods while broadcasts go out on time. A
//! late broadcast moves the next deadline a full period past the moment it
//! actually went out, so two broadcasts are never closer than one period and
//! missed slots are never replayed.

use embassy_time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct BroadcastSchedule {
    period: Duration,
    next: Instant,
}

impl BroadcastSchedule {
    /// First broadcast is due immediately at `start`
    pub fn new(start: Instant, period: Duration) -> Self {
        Self {
            period,
            next: start,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Instant the next broadcast is due
    pub fn next_deadline(&self) -> Instant {
        self.next
    }

    /// Whether a broadcast is due at `now`; advances the schedule when it is
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next {
            return false;
        }

        self.next = (self.next + self.period).max(now + self.period);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_millis(2000);

    #[test]
    fn first_broadcast_is_immediate() {
        let mut schedule = BroadcastSchedule::new(Instant::from_millis(0), PERIOD);
        assert!(schedule.poll(Instant::from_millis(0)));
        assert_eq!(schedule.next_deadline(), Instant::from_millis(2000));
    }

    #[test]
    fn fires_once_per_period() {
        let mut schedule = BroadcastSchedule::new(Instant::from_millis(0), PERIOD);
        let mut fired = std::vec::Vec::new();

        for ms in (0..10_000).step_by(50) {
            if schedule.poll(Instant::from_millis(ms)) {
                fired.push(ms);
            }
        }

        assert_eq!(fired, [0, 2000, 4000, 6000, 8000]);
    }

    #[test]
    fn late_wakeup_moves_next_deadline() {
        let mut schedule = BroadcastSchedule::new(Instant::from_millis(0), PERIOD);
        assert!(schedule.poll(Instant::from_millis(3)));
        assert_eq!(schedule.next_deadline(), Instant::from_millis(2003));
        assert!(!schedule.poll(Instant::from_millis(2002)));
        assert!(schedule.poll(Instant::from_millis(2011)));
        assert_eq!(schedule.next_deadline(), Instant::from_millis(4011));
    }

    #[test]
    fn slow_send_shorter_than_a_period_does_not_double_fire() {
        let mut schedule = BroadcastSchedule::new(Instant::from_millis(0), PERIOD);
        assert!(schedule.poll(Instant::from_millis(0)));

        // The loop only gets back just before the following slot
        assert!(schedule.poll(Instant::from_millis(3999)));
        assert!(!schedule.poll(Instant::from_millis(4000)));
        assert!(!schedule.poll(Instant::from_millis(5998)));
        assert!(schedule.poll(Instant::from_millis(5999)));
    }

    #[test]
    fn consecutive_sends_are_at_least_a_period_apart() {
        let mut schedule = BroadcastSchedule::new(Instant::from_millis(0), PERIOD);
        let mut last: Option<u64> = None;

        for ms in [0, 1500, 2000, 2700, 3999, 4000, 4001, 6100, 7999, 8100, 12_000] {
            if schedule.poll(Instant::from_millis(ms)) {
                if let Some(prev) = last {
                    assert!(ms - prev >= 2000, "sends at {} and {}", prev, ms);
                }
                last = Some(ms);
            }
        }
        assert_eq!(last, Some(12_000));
    }

    #[test]
    fn stall_reanchors_instead_of_bursting() {
        let mut schedule = BroadcastSchedule::new(Instant::from_millis(0), PERIOD);
        assert!(schedule.poll(Instant::from_millis(0)));

        // Stalled across several slots
        assert!(schedule.poll(Instant::from_millis(6500)));
        assert_eq!(schedule.next_deadline(), Instant::from_millis(8500));

        assert!(!schedule.poll(Instant::from_millis(6501)));
        assert!(!schedule.poll(Instant::from_millis(8000)));
        assert!(schedule.poll(Instant::from_millis(8500)));
    }

    #[test]
    fn never_fires_before_deadline() {
        let mut schedule = BroadcastSchedule::new(Instant::from_millis(100), PERIOD);
        assert!(!schedule.poll(Instant::from_millis(99)));
        assert!(schedule.poll(Instant::from_millis(100)));
        assert!(!schedule.poll(Instant::from_millis(2099)));
        assert!(schedule.poll(Instant::from_millis(2100)));
    }
}
