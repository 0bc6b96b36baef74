use std::sync::Arc;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::metrics::TRACKED_CLIENTS;
use crate::rate_limit::RateLimiter;

// Evicts clients whose history has aged out of every window
pub async fn idle_sweeper(limiter: Arc<RateLimiter>, sweep_interval: Duration) {
    let mut interval = interval(sweep_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Idle client sweeper started (interval: {:?})", sweep_interval);

    loop {
        interval.tick().await;
        sweep_once(&limiter);
    }
}

pub fn sweep_once(limiter: &RateLimiter) -> usize {
    let removed = limiter.sweep_idle();
    let tracked = limiter.tracked_clients();
    TRACKED_CLIENTS.set(tracked as f64);

    if removed > 0 {
        debug!(removed, tracked, "swept idle rate limit records");
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitConfig;
    use crate::rate_limit::ManualClock;

    #[tokio::test(start_paused = true)]
    async fn sweeper_task_evicts_on_schedule() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = Arc::new(RateLimiter::with_clock(RateLimitConfig::chat(), clock.clone()));
        assert!(limiter.check_and_record("A"));

        let task = tokio::spawn(idle_sweeper(limiter.clone(), Duration::from_secs(60)));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(limiter.tracked_clients(), 1);

        clock.advance(Duration::from_secs(24 * 3600));
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(limiter.tracked_clients(), 0);

        task.abort();
    }

    #[test]
    fn sweep_once_reports_removed() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = RateLimiter::with_clock(RateLimitConfig::chat(), clock.clone());
        assert!(limiter.check_and_record("A"));
        assert!(limiter.check_and_record("B"));

        assert_eq!(sweep_once(&limiter), 0);
        clock.advance(Duration::from_secs(24 * 3600));
        assert_eq!(sweep_once(&limiter), 2);
    }
}
