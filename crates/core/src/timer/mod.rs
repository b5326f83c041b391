use std::time::Duration;

use tokio::time::{self, Instant};

use crate::{
    query::format_clock,
    render::{Slot, UpdateCommand},
};

/// Count-up match clock.
///
/// The counter only moves through [`MatchTimer::tick`], which the owning event
/// loop drives via [`MatchTimer::next_tick`]. Holding at most one deadline
/// guarantees a single active tick source.
#[derive(Debug)]
pub struct MatchTimer {
    elapsed: u64,
    period: Duration,
    next_deadline: Option<Instant>,
}

impl Default for MatchTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchTimer {
    pub fn new() -> Self {
        Self::with_period(Duration::from_secs(1))
    }

    pub fn with_period(period: Duration) -> Self {
        Self {
            elapsed: 0,
            period,
            next_deadline: None,
        }
    }

    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    pub fn is_running(&self) -> bool {
        self.next_deadline.is_some()
    }

    /// Replaces any existing tick source with a fresh one. The first tick
    /// lands one period from now and the counter is left alone.
    pub fn start(&mut self) {
        self.next_deadline = Some(Instant::now() + self.period);
    }

    pub fn stop(&mut self) {
        self.next_deadline = None;
    }

    pub fn reset(&mut self) {
        self.stop();
        self.elapsed = 0;
    }

    /// Overwrites the counter without touching the running state.
    pub fn set_absolute(&mut self, seconds: u64) {
        self.elapsed = seconds;
    }

    pub fn tick(&mut self) -> UpdateCommand {
        self.elapsed = self.elapsed.saturating_add(1);
        self.render()
    }

    pub fn display(&self) -> String {
        format_clock(self.elapsed)
    }

    pub fn render(&self) -> UpdateCommand {
        UpdateCommand::SetText {
            slot: Slot::Timer,
            text: self.display(),
        }
    }

    /// Waits for the next tick and applies it. Pending forever while stopped.
    ///
    /// Cancel safe: the deadline only advances once the sleep has completed.
    /// Late wake-ups catch up one tick per call so no second is lost.
    pub async fn next_tick(&mut self) -> UpdateCommand {
        let Some(deadline) = self.next_deadline else {
            return std::future::pending().await;
        };

        time::sleep_until(deadline).await;
        self.next_deadline = Some(deadline + self.period);
        self.tick()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn running_clock_counts_once_per_second() {
        let mut timer = MatchTimer::new();
        let begin = Instant::now();
        timer.start();

        for _ in 0..3 {
            timer.next_tick().await;
        }

        assert_eq!(timer.elapsed(), 3);
        assert_eq!(Instant::now() - begin, Duration::from_secs(3));
        assert_eq!(timer.display(), "00:03");
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_clock_never_ticks() {
        let mut timer = MatchTimer::new();
        let waited = time::timeout(Duration::from_secs(10), timer.next_tick()).await;
        assert!(waited.is_err());
        assert_eq!(timer.elapsed(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_keeps_counter_and_single_source() {
        let mut timer = MatchTimer::new();
        timer.set_absolute(125);
        timer.start();
        time::advance(Duration::from_millis(600)).await;
        timer.start();

        let begin = Instant::now();
        timer.next_tick().await;
        assert_eq!(Instant::now() - begin, Duration::from_secs(1));
        assert_eq!(timer.elapsed(), 126);
    }

    #[test]
    fn reset_zeroes_and_stops() {
        let mut timer = MatchTimer::new();
        timer.set_absolute(42);
        timer.start();
        timer.reset();

        assert_eq!(timer.elapsed(), 0);
        assert!(!timer.is_running());
        assert_eq!(
            timer.render(),
            UpdateCommand::SetText {
                slot: Slot::Timer,
                text: "00:00".into()
            }
        );
    }

    #[test]
    fn set_absolute_preserves_running_state() {
        let mut timer = MatchTimer::new();
        timer.set_absolute(10);
        assert!(!timer.is_running());

        timer.start();
        timer.set_absolute(3);
        assert!(timer.is_running());
        assert_eq!(
            timer.tick(),
            UpdateCommand::SetText {
                slot: Slot::Timer,
                text: "00:04".into()
            }
        );
    }
}
