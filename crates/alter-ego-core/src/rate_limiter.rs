//! Send spacing state and the display refresh timer for the cool-down.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::validator::{remaining_cooldown, DEFAULT_COOLDOWN};

/// How often an armed [`CooldownTimer`] reports the remaining cool-down.
pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_millis(100);

/// Tracks the last accepted send and the cool-down derived from it.
///
/// `last_sent_at` moves when a message is accepted, not when the reply
/// arrives, so spacing between submissions does not depend on backend
/// latency.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    cooldown: Duration,
    last_sent_at: Option<Instant>,
    // Value shown to the user, recomputed on refresh
    displayed: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl RateLimiter {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_sent_at: None,
            displayed: Duration::ZERO,
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn last_sent_at(&self) -> Option<Instant> {
        self.last_sent_at
    }

    /// Remaining cool-down at `now`. Pure: same inputs, same answer.
    pub fn remaining_cooldown(&self, now: Instant) -> Duration {
        remaining_cooldown(self.cooldown, self.last_sent_at, now)
    }

    pub fn record_send(&mut self, now: Instant) {
        self.last_sent_at = Some(now);
        self.displayed = self.cooldown;
    }

    /// Recompute the displayed cool-down and return it.
    pub fn refresh(&mut self, now: Instant) -> Duration {
        self.displayed = self.remaining_cooldown(now);
        self.displayed
    }

    /// Cool-down as of the last `record_send` or `refresh`.
    pub fn displayed_remaining(&self) -> Duration {
        self.displayed
    }

    /// Instant at which the current cool-down ends, if one was ever started.
    pub fn deadline(&self) -> Option<Instant> {
        self.last_sent_at.map(|sent_at| sent_at + self.cooldown)
    }
}

type TickFn = dyn Fn(Duration) -> bool + Send + Sync;

/// Single cancellable repeating task that drives the cool-down display.
///
/// Once armed it calls `on_tick` with the remaining duration every period
/// until it has reported zero, then exits. `on_tick` returns `false` when
/// nobody is listening any more, which also ends the task. Re-arming replaces
/// the running task; dropping the timer aborts it.
pub struct CooldownTimer {
    period: Duration,
    on_tick: Arc<TickFn>,
    task: Option<JoinHandle<()>>,
}

impl CooldownTimer {
    pub fn new<F>(period: Duration, on_tick: F) -> Self
    where
        F: Fn(Duration) -> bool + Send + Sync + 'static,
    {
        Self {
            period,
            on_tick: Arc::new(on_tick),
            task: None,
        }
    }

    /// Start reporting until `deadline`. Must be called inside a tokio runtime.
    pub fn arm(&mut self, deadline: Instant) {
        self.disarm();

        let on_tick = Arc::clone(&self.on_tick);
        let period = self.period;
        self.task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let remaining = deadline.saturating_duration_since(Instant::now());
                if !on_tick(remaining) || remaining.is_zero() {
                    break;
                }
            }
            tracing::trace!("cooldown timer finished");
        }));
    }

    pub fn disarm(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for CooldownTimer {
    fn drop(&mut self) {
        self.disarm();
    }
}

impl std::fmt::Debug for CooldownTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CooldownTimer")
            .field("period", &self.period)
            .field("armed", &self.is_armed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_no_cooldown_before_first_send() {
        let limiter = RateLimiter::new(ms(1000));
        assert_eq!(limiter.remaining_cooldown(Instant::now()), Duration::ZERO);
        assert_eq!(limiter.displayed_remaining(), Duration::ZERO);
        assert!(limiter.deadline().is_none());
    }

    #[test]
    fn test_record_send_starts_full_cooldown() {
        let mut limiter = RateLimiter::new(ms(1000));
        let sent = Instant::now();
        limiter.record_send(sent);

        assert_eq!(limiter.last_sent_at(), Some(sent));
        assert_eq!(limiter.displayed_remaining(), ms(1000));
        assert_eq!(limiter.remaining_cooldown(sent + ms(200)), ms(800));
        assert_eq!(limiter.deadline(), Some(sent + ms(1000)));
    }

    #[test]
    fn test_remaining_cooldown_is_pure() {
        let mut limiter = RateLimiter::new(ms(1000));
        let sent = Instant::now();
        limiter.record_send(sent);

        let first = limiter.remaining_cooldown(sent + ms(300));
        let second = limiter.remaining_cooldown(sent + ms(300));
        assert_eq!(first, second);
        assert_eq!(limiter.remaining_cooldown(sent + ms(2000)), Duration::ZERO);
    }

    #[test]
    fn test_refresh_updates_displayed_value() {
        let mut limiter = RateLimiter::new(ms(1000));
        let sent = Instant::now();
        limiter.record_send(sent);

        assert_eq!(limiter.refresh(sent + ms(400)), ms(600));
        assert_eq!(limiter.displayed_remaining(), ms(600));
        assert_eq!(limiter.refresh(sent + ms(1500)), Duration::ZERO);
        assert_eq!(limiter.displayed_remaining(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_ticks_down_to_zero_then_stops() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = CooldownTimer::new(ms(100), move |remaining| tx.send(remaining).is_ok());

        timer.arm(Instant::now() + ms(1000));

        let mut ticks = Vec::new();
        while let Some(remaining) = rx.recv().await {
            ticks.push(remaining);
            if remaining.is_zero() {
                break;
            }
        }

        assert_eq!(ticks.first(), Some(&ms(1000)));
        assert_eq!(ticks.last(), Some(&Duration::ZERO));
        assert!(ticks.windows(2).all(|pair| pair[0] >= pair[1]));

        // Let the task observe its own exit
        tokio::time::sleep(ms(500)).await;
        assert!(!timer.is_armed());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_running_task() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut timer = CooldownTimer::new(ms(100), move |remaining| {
            sink.lock().map(|mut ticks| ticks.push(remaining)).is_ok()
        });

        let start = Instant::now();
        timer.arm(start + ms(1000));
        tokio::time::sleep(ms(250)).await;
        timer.arm(Instant::now() + ms(300));
        tokio::time::sleep(ms(1000)).await;

        let ticks = seen.lock().map(|ticks| ticks.clone()).unwrap_or_default();
        assert_eq!(ticks.last(), Some(&Duration::ZERO));
        // Only one zero: the replaced task never reached its deadline
        assert_eq!(ticks.iter().filter(|d| d.is_zero()).count(), 1);
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_stops_ticks() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = CooldownTimer::new(ms(100), move |remaining| tx.send(remaining).is_ok());

        timer.arm(Instant::now() + ms(1000));
        assert_eq!(rx.recv().await, Some(ms(1000)));
        timer.disarm();
        assert!(!timer.is_armed());

        tokio::time::sleep(ms(2000)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_exits_when_listener_is_gone() {
        let (tx, rx) = mpsc::unbounded_channel::<Duration>();
        let mut timer = CooldownTimer::new(ms(100), move |remaining| tx.send(remaining).is_ok());
        drop(rx);

        timer.arm(Instant::now() + ms(60_000));
        tokio::time::sleep(ms(300)).await;
        assert!(!timer.is_armed());
    }
}
