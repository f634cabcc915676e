//! Virtual clock: simulated time advancing in one-minute quanta at a
//! runtime-adjustable speed.
//!
//! The clock is the single source of temporal truth. Simulated time is the
//! start instant plus an atomic minute counter, so cross-thread reads never
//! observe a torn update. The tick loop sleeps `base quantum / multiplier`
//! real milliseconds per simulated minute; a speed change takes effect from
//! the next sleep. Month boundaries are evaluated once per advanced minute
//! and delivered over a channel, so each boundary is observed exactly once.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

/// Real milliseconds one simulated minute takes at 1× speed.
pub const DEFAULT_BASE_QUANTUM_MS: u64 = 1_000;

/// The enumerated set of allowed speed multipliers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speed {
    /// Real time: one quantum per simulated minute.
    X1,
    /// 4× acceleration (the startup default).
    X4,
    /// 8× acceleration.
    X8,
    /// 16× acceleration.
    X16,
    /// 32× acceleration.
    X32,
    /// 64× acceleration.
    X64,
    /// 128× acceleration.
    X128,
    /// Turbo: a simulated half-day per real minute.
    X720,
}

impl Speed {
    /// Numeric multiplier.
    pub fn multiplier(self) -> u32 {
        match self {
            Speed::X1 => 1,
            Speed::X4 => 4,
            Speed::X8 => 8,
            Speed::X16 => 16,
            Speed::X32 => 32,
            Speed::X64 => 64,
            Speed::X128 => 128,
            Speed::X720 => 720,
        }
    }

    /// Parse a multiplier, rejecting anything outside the allowed set.
    pub fn from_multiplier(multiplier: u32) -> Option<Speed> {
        match multiplier {
            1 => Some(Speed::X1),
            4 => Some(Speed::X4),
            8 => Some(Speed::X8),
            16 => Some(Speed::X16),
            32 => Some(Speed::X32),
            64 => Some(Speed::X64),
            128 => Some(Speed::X128),
            720 => Some(Speed::X720),
            _ => None,
        }
    }
}

/// Shared virtual-clock state. Wrapped in [`Arc`] and read lock-free from
/// every worker loop.
#[derive(Debug)]
pub struct SimClock {
    start: NaiveDateTime,
    base_quantum_ms: u64,
    elapsed_minutes: AtomicU64,
    multiplier: AtomicU32,
    running: AtomicBool,
}

impl SimClock {
    /// New clock at `start`, running, at the default 4× speed.
    pub fn new(start: NaiveDateTime, base_quantum_ms: u64) -> Self {
        Self {
            start,
            base_quantum_ms,
            elapsed_minutes: AtomicU64::new(0),
            multiplier: AtomicU32::new(Speed::X4.multiplier()),
            running: AtomicBool::new(true),
        }
    }

    /// Current simulated time; safe from any thread while the tick loop is
    /// advancing it.
    pub fn now(&self) -> NaiveDateTime {
        let minutes = self.elapsed_minutes.load(Ordering::Acquire);
        self.start + Duration::minutes(minutes as i64)
    }

    /// Simulated minutes elapsed since the start instant.
    pub fn elapsed_minutes(&self) -> u64 {
        self.elapsed_minutes.load(Ordering::Acquire)
    }

    /// Current speed.
    pub fn speed(&self) -> Speed {
        Speed::from_multiplier(self.multiplier.load(Ordering::Acquire)).unwrap_or(Speed::X1)
    }

    /// Request a speed change. Only multipliers from the allowed set are
    /// accepted; anything else logs a warning and leaves the current speed
    /// untouched. Takes effect from the next sleep.
    pub fn set_speed(&self, multiplier: u32) -> bool {
        match Speed::from_multiplier(multiplier) {
            Some(speed) => {
                self.multiplier
                    .store(speed.multiplier(), Ordering::Release);
                info!(multiplier, "simulation speed set");
                true
            }
            None => {
                warn!(
                    multiplier,
                    "invalid speed, allowed: 1, 4, 8, 16, 32, 64, 128, 720"
                );
                false
            }
        }
    }

    /// Advance simulated time by exactly one minute and return the new time.
    pub fn advance_minute(&self) -> NaiveDateTime {
        let minutes = self.elapsed_minutes.fetch_add(1, Ordering::AcqRel) + 1;
        self.start + Duration::minutes(minutes as i64)
    }

    /// Real milliseconds the next tick should sleep at the current speed.
    pub fn tick_sleep_ms(&self) -> u64 {
        (self.base_quantum_ms / u64::from(self.speed().multiplier())).max(1)
    }

    /// Clear the running flag; loops exit after their current sleep.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Whether the cooperative running flag is still set.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

fn last_day_of_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map_or(28, |d| d.day())
}

/// True exactly at the last instant of a calendar month: last day, 23:59.
pub fn is_month_end(t: NaiveDateTime) -> bool {
    t.day() == last_day_of_month(t.year(), t.month()) && t.hour() == 23 && t.minute() == 59
}

/// The clock tick loop. Sleeps one quantum at the current speed, advances
/// one simulated minute, and pushes every month boundary it crosses onto
/// `month_end`. Exits when the running flag clears or the receiver is gone.
pub async fn run(clock: Arc<SimClock>, month_end: UnboundedSender<NaiveDateTime>) {
    while clock.is_running() {
        tokio::time::sleep(std::time::Duration::from_millis(clock.tick_sleep_ms())).await;
        if !clock.is_running() {
            break;
        }
        let now = clock.advance_minute();
        if is_month_end(now) {
            info!(%now, "simulated month end reached");
            if month_end.send(now).is_err() {
                break;
            }
        }
    }
    info!("clock loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn sixty_advances_are_sixty_minutes() {
        let clock = SimClock::new(at(2024, 3, 1, 9, 0), DEFAULT_BASE_QUANTUM_MS);
        for _ in 0..60 {
            clock.advance_minute();
        }
        assert_eq!(clock.elapsed_minutes(), 60);
        assert_eq!(clock.now(), at(2024, 3, 1, 10, 0));
    }

    #[test]
    fn speed_changes_only_affect_sleep() {
        let clock = SimClock::new(at(2024, 3, 1, 9, 0), 1_000);
        assert!(clock.set_speed(1));
        assert_eq!(clock.tick_sleep_ms(), 1_000);

        assert!(clock.set_speed(32));
        assert_eq!(clock.tick_sleep_ms(), 1_000 / 32);
        // The advance per tick stays one minute regardless of speed.
        let before = clock.now();
        let after = clock.advance_minute();
        assert_eq!(after - before, Duration::minutes(1));

        assert!(clock.set_speed(720));
        assert_eq!(clock.tick_sleep_ms(), 1);
    }

    #[test]
    fn invalid_speed_is_a_noop() {
        let clock = SimClock::new(at(2024, 3, 1, 9, 0), 1_000);
        assert!(clock.set_speed(8));
        assert!(!clock.set_speed(3));
        assert!(!clock.set_speed(0));
        assert_eq!(clock.speed(), Speed::X8);
    }

    #[test]
    fn month_end_at_last_minute_only() {
        assert!(is_month_end(at(2024, 1, 31, 23, 59)));
        assert!(!is_month_end(at(2024, 1, 31, 23, 58)));
        assert!(!is_month_end(at(2024, 1, 30, 23, 59)));
        // Leap and non-leap February.
        assert!(is_month_end(at(2024, 2, 29, 23, 59)));
        assert!(!is_month_end(at(2024, 2, 28, 23, 59)));
        assert!(is_month_end(at(2023, 2, 28, 23, 59)));
        assert!(is_month_end(at(2024, 4, 30, 23, 59)));
        assert!(is_month_end(at(2024, 12, 31, 23, 59)));
    }

    #[test]
    fn exactly_twelve_boundaries_in_a_year() {
        let clock = SimClock::new(at(2023, 1, 1, 0, 0), 1_000);
        let mut boundaries = 0;
        for _ in 0..(365 * 24 * 60) {
            let now = clock.advance_minute();
            if is_month_end(now) {
                boundaries += 1;
            }
        }
        assert_eq!(boundaries, 12);
    }

    #[tokio::test]
    async fn tick_loop_advances_and_stops_cooperatively() {
        let clock = Arc::new(SimClock::new(at(2024, 3, 1, 9, 0), 1));
        let (tx, _rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(clock.clone(), tx));

        tokio::time::sleep(std::time::Duration::from_millis(80)).await;
        assert!(clock.elapsed_minutes() > 0);

        clock.stop();
        handle.await.unwrap();
        assert!(!clock.is_running());
    }

    #[tokio::test]
    async fn tick_loop_reports_a_crossed_boundary_once() {
        // Two simulated minutes from the boundary, 1ms per minute.
        let clock = Arc::new(SimClock::new(at(2024, 1, 31, 23, 57), 1));
        clock.set_speed(1);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(clock.clone(), tx));

        let boundary = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .expect("boundary within timeout")
            .expect("sender alive");
        assert_eq!(boundary, at(2024, 1, 31, 23, 59));

        clock.stop();
        handle.await.unwrap();
        // No duplicate event for the same boundary minute.
        assert!(rx.try_recv().is_err());
    }
}
