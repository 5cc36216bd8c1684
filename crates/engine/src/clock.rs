//! Pause-aware time.
//!
//! A pause must not restart half-finished waits: a gravity step that was
//! 300ms away when the game paused is still 300ms away after unpausing.
//! [`PausableTimer`] keeps that remainder and [`PauseClock::sleep`] drives it
//! from the shared pause flag.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

/// A countdown that can be stopped and resumed.
#[derive(Debug, Clone, Copy)]
pub struct PausableTimer {
    remaining: Duration,
    running_since: Option<Instant>,
}

impl PausableTimer {
    /// Stopped timer with `duration` left.
    pub fn new(duration: Duration) -> Self {
        Self {
            remaining: duration,
            running_since: None,
        }
    }

    pub fn remaining(&self) -> Duration {
        match self.running_since {
            Some(since) => self.remaining.saturating_sub(since.elapsed()),
            None => self.remaining,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    pub fn is_done(&self) -> bool {
        self.remaining().is_zero()
    }

    pub fn resume(&mut self) {
        if self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }

    /// Snapshot the remaining time and stop.
    pub fn pause(&mut self) {
        self.remaining = self.remaining();
        self.running_since = None;
    }

    /// When the timer runs out if nothing pauses it.
    pub fn deadline(&self) -> Instant {
        Instant::now() + self.remaining()
    }
}

#[derive(Debug)]
struct PlayTime {
    started: Instant,
    paused_at: Option<Instant>,
    paused_total: Duration,
}

/// Pause flag and played-time accounting of one game.
#[derive(Debug)]
pub struct PauseClock {
    paused: watch::Sender<bool>,
    time: Mutex<PlayTime>,
}

impl Default for PauseClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PauseClock {
    pub fn new() -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            paused,
            time: Mutex::new(PlayTime {
                started: Instant::now(),
                paused_at: None,
                paused_total: Duration::ZERO,
            }),
        }
    }

    fn time(&self) -> std::sync::MutexGuard<'_, PlayTime> {
        self.time.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.paused.subscribe()
    }

    /// Returns whether anything changed.
    pub fn set_paused(&self, paused: bool) -> bool {
        let changed = self.paused.send_if_modified(|current| {
            let changed = *current != paused;
            *current = paused;
            changed
        });
        if changed {
            let mut time = self.time();
            if paused {
                time.paused_at = Some(Instant::now());
            } else if let Some(at) = time.paused_at.take() {
                time.paused_total += at.elapsed();
            }
        }
        changed
    }

    /// Flip the pause flag and return the new value.
    pub fn toggle(&self) -> bool {
        let paused = !self.is_paused();
        self.set_paused(paused);
        paused
    }

    /// Time since the start, pauses excluded.
    pub fn played(&self) -> Duration {
        let time = self.time();
        let now = Instant::now();
        let paused_now = time.paused_at.map_or(Duration::ZERO, |at| now - at);
        (now - time.started)
            .saturating_sub(time.paused_total)
            .saturating_sub(paused_now)
    }

    pub fn minutes_played(&self) -> f64 {
        self.played().as_secs_f64() / 60.0
    }

    /// Start counting from zero again, unpaused.
    pub fn reset(&self) {
        self.set_paused(false);
        let mut time = self.time();
        time.started = Instant::now();
        time.paused_at = None;
        time.paused_total = Duration::ZERO;
    }

    /// Sleep for `duration` of unpaused time.
    pub async fn sleep(&self, duration: Duration) {
        let mut paused = self.paused.subscribe();
        let mut timer = PausableTimer::new(duration);
        loop {
            if *paused.borrow_and_update() {
                timer.pause();
                if paused.changed().await.is_err() {
                    return;
                }
                continue;
            }
            timer.resume();
            if timer.is_done() {
                return;
            }
            tokio::select! {
                _ = tokio::time::sleep_until(timer.deadline()) => return,
                res = paused.changed() => {
                    if res.is_err() {
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_timer_keeps_remainder_over_pause() {
        let mut timer = PausableTimer::new(Duration::from_secs(1));
        timer.resume();
        tokio::time::sleep(Duration::from_millis(300)).await;
        timer.pause();
        assert_eq!(timer.remaining(), Duration::from_millis(700));
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(timer.remaining(), Duration::from_millis(700));
        assert!(!timer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_is_extended_by_pause() {
        let clock = Arc::new(PauseClock::new());
        let start = Instant::now();
        let sleeper = {
            let clock = clock.clone();
            tokio::spawn(async move {
                clock.sleep(Duration::from_millis(1000)).await;
                Instant::now()
            })
        };

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(clock.set_paused(true));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!sleeper.is_finished());
        clock.set_paused(false);

        let woke = sleeper.await.unwrap();
        let slept = woke - start;
        assert!(slept >= Duration::from_millis(6000), "{:?}", slept);
        assert!(slept < Duration::from_millis(6100), "{:?}", slept);
    }

    #[tokio::test(start_paused = true)]
    async fn test_played_excludes_pauses() {
        let clock = PauseClock::new();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(clock.toggle());
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(clock.played(), Duration::from_secs(2));
        assert!(!clock.toggle());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(clock.played(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset() {
        let clock = PauseClock::new();
        tokio::time::sleep(Duration::from_secs(90)).await;
        assert!(clock.minutes_played() > 1.0);
        clock.set_paused(true);
        clock.reset();
        assert!(!clock.is_paused());
        assert_eq!(clock.played(), Duration::ZERO);
    }
}
