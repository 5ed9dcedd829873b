//! Error types surfaced to the calling shell.
//!
//! Plumbing failures (I/O, serialization, delivery) travel as [`anyhow::Error`]. Rejected user
//! input is a closed enum so a shell can map each reason to its own wording.

use std::fmt;

use thiserror::Error;

/// Why a request was rejected before touching any lobby state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// Not a numeric id or a `<@id>` mention.
    #[error("'{0}' is not a valid participant id")]
    InvalidParticipantId(String),
    /// Not `1`, `2`, `team1` or `team 2`.
    #[error("'{0}' is not a team (expected 1 or 2)")]
    InvalidTeam(String),
    /// Not one of the five positions or `fill`.
    #[error("'{0}' is not a position (expected top, jungle, mid, bot, support or fill)")]
    InvalidPosition(String),
    /// Unparsable, or too far in the future.
    #[error("'{0}' is not an RFC 3339 timestamp within the next week")]
    InvalidTimestamp(String),
    /// Unparsable, or longer than a week.
    #[error("'{0}' is not a ready-time offset (expected e.g. 90, 1h, 1h30m or 45m, at most a week)")]
    InvalidOffset(String),
    /// Neither a fixed offset nor a POSIX TZ rule.
    #[error("'{0}' is not a time zone (expected e.g. UTC, +13:00 or NZST-12NZDT,M9.5.0,M4.1.0/3)")]
    InvalidTimeZone(String),
    /// First word after the actor is not a command.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    /// The named argument was not given.
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    /// A member tried an admin action.
    #[error("this action requires the admin capability")]
    NotPermitted,
    /// A member tried to act for someone else.
    #[error("participants can only act on their own sign-up")]
    IdentityMismatch,
}

/// A post-commit side effect that failed.
///
/// The transition that produced the effect has already been applied and stays applied.
#[derive(Debug)]
pub struct EffectFailure {
    /// Which effect, e.g. `persist` or `announce`.
    pub effect: &'static str,
    /// What the collaborator reported.
    pub error: anyhow::Error,
}

impl fmt::Display for EffectFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {:#}", self.effect, self.error)
    }
}
