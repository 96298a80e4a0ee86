use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// Timer behind livestream mode. Dropping it cancels all further ticks.
///
/// Must be created inside a Tokio runtime.
#[derive(Debug)]
pub struct PeriodicTask {
    interval: Interval,
}

impl PeriodicTask {
    /// First tick fires one `period` after creation.
    pub fn start(period: Duration) -> Self {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    pub fn period(&self) -> Duration {
        self.interval.period()
    }

    /// Wait for the next tick. Cancel safe.
    pub async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_tick_waits_one_period() {
        let started = Instant::now();
        let mut task = PeriodicTask::start(Duration::from_millis(30));
        task.tick().await;
        let first = started.elapsed();
        assert!(first >= Duration::from_millis(30) && first < Duration::from_millis(31), "{first:?}");
        task.tick().await;
        let second = started.elapsed();
        assert!(second >= Duration::from_millis(60) && second < Duration::from_millis(61), "{second:?}");
        assert_eq!(task.period(), Duration::from_millis(30));
    }
}
