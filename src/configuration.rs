//! Lobby settings
//!
//! Configuration can be created programmatically using [`Configuration::new()`] or by reading
//! environment variables using [`Configuration::from_env()`].
//!
//! # Environment Variables
//!
//! All values are optional. Unset variables keep the default; unparseable ones keep the default
//! and log a warning.
//!
//! - `LOBBY_CAPACITY` — Number of active slots (default: `10`)
//! - `LOBBY_QUORUM` — Ready players needed for the "ready to go" notification (default: `10`)
//! - `LOBBY_RESET_TIME` — Daily reset time, `HH:MM` (default: `09:00`)
//! - `LOBBY_TIMEZONE` — Zone the reset time is expressed in: `UTC`, `+HH:MM`, or a POSIX TZ rule
//!   such as `NZST-12NZDT,M9.5.0,M4.1.0/3` (default: New Zealand time). `LOBBY_UTC_OFFSET` is
//!   read when it is unset.
//! - `LOBBY_TICK_SECS` — Seconds between quorum checks (default: `60`)
//! - `LOBBY_ADMIN_ID` — Participant who gets a direct notice when the quorum is reached
//! - `LOBBY_STATE_FILE` — Where the lobby is saved (default: `state.json`)
//! - `LOBBY_LOG` — Enable logging to a file (default: `false`)
//! - `LOBBY_VERBOSE` — Print the board after every change (default: `true`)

use std::{path::PathBuf, str::FromStr, time::Duration};

use time::{macros::format_description, Time, UtcOffset};
use tracing::warn;

use crate::{participant::ParticipantId, zone::LobbyZone};

/// Configuration for the lobby and its timers.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub(crate) capacity: usize,
    pub(crate) quorum_threshold: usize,
    pub(crate) reset_time: Time,
    pub(crate) zone: LobbyZone,
    pub(crate) tick_interval: Duration,
    pub(crate) admin_id: Option<ParticipantId>,
    pub(crate) state_file: PathBuf,
    pub(crate) log: bool,
    pub(crate) verbose: bool,
}

impl Configuration {
    /// Create a new configuration with default parameters.
    ///
    /// By default:
    /// - 10 active slots, and 10 ready players make a quorum.
    /// - The lobby resets every day at 09:00 New Zealand time, daylight saving included.
    /// - Quorum is checked every 60 seconds.
    /// - No admin is notified.
    /// - State is saved to `state.json`.
    /// - Logging to file is disabled and the board is printed after every change.
    pub fn new() -> Self {
        Self {
            capacity: 10,
            quorum_threshold: 10,
            reset_time: Time::from_hms(9, 0, 0).unwrap_or(Time::MIDNIGHT),
            zone: LobbyZone::NEW_ZEALAND,
            tick_interval: Duration::from_secs(60),
            admin_id: None,
            state_file: PathBuf::from("state.json"),
            log: false,
            verbose: true,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// See the module documentation for the recognized variables.
    pub fn from_env() -> Self {
        fn parsed<T: FromStr>(var: &str) -> Option<T> {
            let raw = std::env::var(var).ok()?;
            let value = raw.trim().parse().ok();
            if value.is_none() {
                warn!("ignoring {var}={raw:?}: cannot parse it");
            }
            value
        }

        fn get_env_flag(var: &str, default: bool) -> bool {
            match std::env::var(var) {
                Ok(val) => val.eq_ignore_ascii_case("true"),
                Err(_) => default,
            }
        }

        let defaults = Self::new();
        let reset_time = std::env::var("LOBBY_RESET_TIME").ok().and_then(|raw| {
            let parsed = parse_time_of_day(&raw);
            if parsed.is_none() {
                warn!("ignoring LOBBY_RESET_TIME={raw:?}: expected HH:MM");
            }
            parsed
        });
        let zone = ["LOBBY_TIMEZONE", "LOBBY_UTC_OFFSET"]
            .into_iter()
            .find(|var| std::env::var_os(var).is_some())
            .and_then(parsed::<LobbyZone>);

        Self {
            capacity: parsed("LOBBY_CAPACITY").unwrap_or(defaults.capacity),
            quorum_threshold: parsed("LOBBY_QUORUM").unwrap_or(defaults.quorum_threshold),
            reset_time: reset_time.unwrap_or(defaults.reset_time),
            zone: zone.unwrap_or(defaults.zone),
            tick_interval: parsed::<u64>("LOBBY_TICK_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.tick_interval),
            admin_id: parsed::<ParticipantId>("LOBBY_ADMIN_ID")
                // 0 means nobody
                .filter(|id| id.0 != 0),
            state_file: std::env::var("LOBBY_STATE_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.state_file),
            log: get_env_flag("LOBBY_LOG", defaults.log),
            verbose: get_env_flag("LOBBY_VERBOSE", defaults.verbose),
        }
    }

    /// Set the number of active slots. `0` sends everyone to the reserve queue.
    pub fn with_capacity(mut self, value: usize) -> Self {
        self.capacity = value;
        self
    }

    /// Set how many simultaneously ready active players trigger the notification.
    pub fn with_quorum_threshold(mut self, value: usize) -> Self {
        self.quorum_threshold = value;
        self
    }

    /// Set the daily reset time, read on the lobby's wall clock.
    pub fn with_reset_time(mut self, value: Time) -> Self {
        self.reset_time = value;
        self
    }

    /// Set the zone used for the reset time and for displayed times.
    pub fn with_zone(mut self, value: LobbyZone) -> Self {
        self.zone = value;
        self
    }

    /// Use a fixed UTC offset, without daylight saving.
    pub fn with_utc_offset(self, value: UtcOffset) -> Self {
        self.with_zone(LobbyZone::Fixed(value))
    }

    /// Set the interval between quorum checks.
    pub fn with_tick_interval(mut self, value: Duration) -> Self {
        self.tick_interval = value;
        self
    }

    /// Set (or unset) the participant who receives the direct quorum notice.
    pub fn with_admin_id(mut self, value: Option<ParticipantId>) -> Self {
        self.admin_id = value;
        self
    }

    /// Set the state file used by the command-line shell.
    pub fn with_state_file(mut self, value: impl Into<PathBuf>) -> Self {
        self.state_file = value.into();
        self
    }

    /// Enable or disable logging to file.
    pub fn with_log(mut self, value: bool) -> Self {
        self.log = value;
        self
    }

    /// Enable or disable printing the board after every change.
    pub fn with_verbose(mut self, value: bool) -> Self {
        self.verbose = value;
        self
    }

    /// Number of active slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Ready players needed for the "ready to go" notification.
    pub fn quorum_threshold(&self) -> usize {
        self.quorum_threshold
    }

    /// Daily reset time.
    pub fn reset_time(&self) -> Time {
        self.reset_time
    }

    /// Zone of the reset time.
    pub fn zone(&self) -> LobbyZone {
        self.zone
    }

    /// Interval between quorum checks.
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Who gets the direct quorum notice, if anyone.
    pub fn admin_id(&self) -> Option<ParticipantId> {
        self.admin_id
    }

    /// State file used by the command-line shell.
    pub fn state_file(&self) -> &std::path::Path {
        &self.state_file
    }

    /// Whether to log to a file.
    pub fn log(&self) -> bool {
        self.log
    }

    /// Whether to print the board after every change.
    pub fn verbose(&self) -> bool {
        self.verbose
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_time_of_day(raw: &str) -> Option<Time> {
    Time::parse(raw.trim(), format_description!("[hour]:[minute]")).ok()
}

#[cfg(test)]
mod tests {
    use time::macros::{offset, time};

    use super::*;

    #[test]
    fn defaults() {
        let config = Configuration::default();
        assert_eq!(config.capacity(), 10);
        assert_eq!(config.quorum_threshold(), 10);
        assert_eq!(config.reset_time(), time!(09:00));
        assert_eq!(config.tick_interval(), Duration::from_secs(60));
        assert_eq!(config.admin_id(), None);
        assert_eq!(config.zone(), LobbyZone::NEW_ZEALAND);
    }

    #[test]
    fn builder_overrides() {
        let config = Configuration::new()
            .with_capacity(4)
            .with_quorum_threshold(2)
            .with_reset_time(time!(10:30))
            .with_utc_offset(offset!(+13))
            .with_admin_id(Some(ParticipantId(5)));
        assert_eq!(config.capacity(), 4);
        assert_eq!(config.quorum_threshold(), 2);
        assert_eq!(config.reset_time(), time!(10:30));
        assert_eq!(config.zone(), LobbyZone::Fixed(offset!(+13)));
        assert_eq!(config.admin_id(), Some(ParticipantId(5)));
    }

    #[test]
    fn parses_times_of_day() {
        assert_eq!(parse_time_of_day("09:00"), Some(time!(09:00)));
        assert_eq!(parse_time_of_day(" 17:45 "), Some(time!(17:45)));
        assert_eq!(parse_time_of_day("9am"), None);
    }
}
