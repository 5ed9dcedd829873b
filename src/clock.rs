//! Wall-clock access and the daily reset calendar.

use std::sync::Mutex;

use time::{Duration, OffsetDateTime, Time};

use crate::zone::LobbyZone;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    /// The current instant. Its offset is informative only, comparisons use the instant.
    fn now(&self) -> OffsetDateTime;
}

/// Real time, expressed in the offset the lobby's zone has right now.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    zone: LobbyZone,
}

impl SystemClock {
    /// A clock reading the host's time in `zone`.
    pub fn new(zone: LobbyZone) -> Self {
        Self { zone }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        self.zone.to_local(OffsetDateTime::now_utc())
    }
}

/// A clock that only moves when told to. Used by tests and replays.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<OffsetDateTime>,
}

impl ManualClock {
    /// A clock stopped at `start`.
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Jump to `instant`, forwards or backwards.
    pub fn set(&self, instant: OffsetDateTime) {
        *self.now.lock().expect("poisoned") = instant;
    }

    /// Move forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().expect("poisoned");
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().expect("poisoned")
    }
}

/// Next instant strictly after `now` at which the wall clock of `zone` reads `reset`.
///
/// A reset exactly at `now` is considered done, so the next one is the following day. The result
/// carries the offset in effect on the reset day, which differs from `now`'s across a daylight
/// saving change.
pub fn next_reset_after(now: OffsetDateTime, reset: Time, zone: &LobbyZone) -> OffsetDateTime {
    let today = zone.to_local(now).date();
    let candidate = zone.resolve(today, reset);
    if candidate > now {
        return candidate;
    }
    match today.next_day() {
        Some(tomorrow) => zone.resolve(tomorrow, reset),
        None => candidate,
    }
}

/// Remaining time formatted as `HH:MM`, truncated to the minute.
pub fn format_countdown(remaining: Duration) -> String {
    let total = remaining.whole_seconds().max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    format!("{hours:02}:{minutes:02}")
}
