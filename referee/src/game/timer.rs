use std::time::Duration;

use rand::Rng;
use tokio::time::{sleep_until, Instant};

/// One-shot deadline for the next light flip.
///
/// Replaces polling a countdown: the driver awaits [`LightTimer::expired`],
/// which resolves exactly once per schedule.
pub struct LightTimer {
    deadline: Option<Instant>,
    min_secs: u64,
    max_secs: u64,
}

impl LightTimer {
    /// Durations are drawn in whole seconds from `[min_secs, max_secs)`.
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            deadline: None,
            min_secs,
            max_secs: max_secs.max(min_secs + 1),
        }
    }

    pub fn schedule<R: Rng>(&mut self, rng: &mut R) -> Duration {
        let delay = Duration::from_secs(rng.gen_range(self.min_secs..self.max_secs));
        self.deadline = Some(Instant::now() + delay);
        delay
    }

    pub fn fire_now(&mut self) {
        self.deadline = Some(Instant::now());
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Resolves when the deadline passes and clears it. Pending forever while
    /// nothing is scheduled. Cancel safe.
    pub async fn expired(&mut self) {
        match self.deadline {
            Some(deadline) => {
                sleep_until(deadline).await;
                self.deadline = None;
            }
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[tokio::test(start_paused = true)]
    async fn schedule_stays_in_window() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut timer = LightTimer::new(1, 5);
        for _ in 0..100 {
            let delay = timer.schedule(&mut rng);
            assert!(delay >= Duration::from_secs(1));
            assert!(delay < Duration::from_secs(5));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_deadline() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut timer = LightTimer::new(2, 3);
        let start = Instant::now();
        timer.schedule(&mut rng);
        timer.expired().await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed < Duration::from_millis(2010));
        assert!(timer.deadline().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn idle_timer_never_fires() {
        let mut timer = LightTimer::new(1, 5);
        let result = tokio::time::timeout(Duration::from_secs(60), timer.expired()).await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn fire_now_overrides_pending_deadline() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut timer = LightTimer::new(3, 4);
        let start = Instant::now();
        timer.schedule(&mut rng);
        timer.fire_now();
        timer.expired().await;
        assert!(start.elapsed() < Duration::from_millis(10));
    }
}
