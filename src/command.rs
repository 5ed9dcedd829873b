//! The closed set of lobby commands, who may issue them, and a line parser for text shells.

use time::{format_description::well_known::Rfc3339, Duration, OffsetDateTime};

use crate::{
    error::InputError,
    participant::ParticipantId,
    roles::{Position, Team},
};

/// Longest accepted ready-time offset: one week.
pub const MAX_READY_OFFSET_MINUTES: i64 = 7 * 24 * 60;

/// Every transition the lobby knows about.
///
/// How a command was delivered (a button, a timer, a terminal line) does not matter to the
/// lobby; only the variant does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Take an active slot, or queue as a reserve.
    Join(ParticipantId),
    /// Give up the slot or the place in the queue.
    Leave(ParticipantId),
    /// Ready from this instant on.
    SetReadyAt(ParticipantId, OffsetDateTime),
    /// Ready this many minutes from now, clamped to `0..=MAX_READY_OFFSET_MINUTES`.
    SetReadyIn(ParticipantId, i64),
    /// Ready right away.
    SetReadyNow(ParticipantId),
    /// Pick a team and position.
    SelectRole(ParticipantId, Team, Position),
    /// Remove someone else (admin).
    AdminRemove(ParticipantId),
    /// Show a lobby code on the board (admin).
    PublishCode(String),
    /// Remember which message holds the board.
    SetBoardRef(String),
    /// Periodic quorum check at the given instant.
    Tick(OffsetDateTime),
    /// Clear everything.
    DailyReset,
}

/// Who is allowed to issue a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// The participant the command is about, or an admin.
    Owner(ParticipantId),
    /// Only an admin.
    Admin,
    /// Timers and the shell itself.
    System,
}

impl Command {
    /// Who may issue this command.
    pub fn permission(&self) -> Permission {
        match self {
            Command::Join(id)
            | Command::Leave(id)
            | Command::SetReadyAt(id, _)
            | Command::SetReadyIn(id, _)
            | Command::SetReadyNow(id)
            | Command::SelectRole(id, _, _) => Permission::Owner(*id),
            Command::AdminRemove(_) | Command::PublishCode(_) => Permission::Admin,
            Command::SetBoardRef(_) | Command::Tick(_) | Command::DailyReset => Permission::System,
        }
    }
}

/// Issuer of a command, as vouched for by the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    /// A person, possibly holding the admin capability.
    Participant {
        /// Who is acting.
        id: ParticipantId,
        /// Whether the shell vouches for the admin capability.
        admin: bool,
    },
    /// Timers and the shell itself.
    System,
}

impl Actor {
    /// A participant without the admin capability.
    pub fn member(id: u64) -> Self {
        Actor::Participant {
            id: ParticipantId(id),
            admin: false,
        }
    }

    /// A participant holding the admin capability.
    pub fn admin(id: u64) -> Self {
        Actor::Participant {
            id: ParticipantId(id),
            admin: true,
        }
    }

    /// Checks the identity and capability rules for `command`.
    ///
    /// Admins may act on anyone's sign-up; that is what the admin eviction relies on.
    pub fn authorize(&self, command: &Command) -> Result<(), InputError> {
        match (self, command.permission()) {
            (Actor::System, _) => Ok(()),
            (Actor::Participant { admin: true, .. }, Permission::Owner(_) | Permission::Admin) => {
                Ok(())
            }
            (Actor::Participant { id, .. }, Permission::Owner(owner)) if *id == owner => Ok(()),
            (Actor::Participant { .. }, Permission::Owner(_)) => Err(InputError::IdentityMismatch),
            (Actor::Participant { .. }, _) => Err(InputError::NotPermitted),
        }
    }
}

/// Parses one shell line: `<actor> <verb> [args...]`.
///
/// `<actor>` is a participant id, suffixed with `!` when the shell vouches for the admin
/// capability, or `sys` for system events. Verbs:
///
/// - `join` / `in`, `leave` / `out`
/// - `ready [now | in <offset> | at <rfc3339> | <offset>]`, where an offset is `90`, `45m`,
///   `1h` or `1h30m`
/// - `role <team> <position>`
/// - `kick <id>`, `code <text>` (admin)
/// - `tick`, `reset`, `board-ref <ref>` (system)
///
/// `now` stamps `tick` commands, and `ready at` rejects instants more than a week after it.
pub fn parse_line(line: &str, now: OffsetDateTime) -> Result<(Actor, Command), InputError> {
    let mut words = line.split_whitespace();
    let actor = parse_actor(words.next().ok_or(InputError::MissingArgument("actor"))?)?;
    let verb = words.next().ok_or(InputError::MissingArgument("command"))?;
    let me = || match actor {
        Actor::Participant { id, .. } => Ok(id),
        Actor::System => Err(InputError::MissingArgument("participant id")),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "join" | "in" => Command::Join(me()?),
        "leave" | "out" => Command::Leave(me()?),
        "ready" => {
            let id = me()?;
            match words.next() {
                None | Some("now") | Some("asap") => Command::SetReadyNow(id),
                Some("at") => {
                    let raw = words.next().ok_or(InputError::MissingArgument("timestamp"))?;
                    let latest = now.saturating_add(Duration::minutes(MAX_READY_OFFSET_MINUTES));
                    let at = OffsetDateTime::parse(raw, &Rfc3339)
                        .ok()
                        .filter(|at| *at <= latest)
                        .ok_or_else(|| InputError::InvalidTimestamp(raw.to_string()))?;
                    Command::SetReadyAt(id, at)
                }
                Some("in") => {
                    let raw = words.next().ok_or(InputError::MissingArgument("offset"))?;
                    Command::SetReadyIn(id, parse_offset_minutes(raw)?)
                }
                Some(raw) => Command::SetReadyIn(id, parse_offset_minutes(raw)?),
            }
        }
        "role" => {
            let id = me()?;
            let team = words
                .next()
                .ok_or(InputError::MissingArgument("team"))?
                .parse::<Team>()?;
            let position = words
                .next()
                .ok_or(InputError::MissingArgument("position"))?
                .parse::<Position>()?;
            Command::SelectRole(id, team, position)
        }
        "kick" | "remove" => Command::AdminRemove(
            words
                .next()
                .ok_or(InputError::MissingArgument("participant id"))?
                .parse()?,
        ),
        "code" => {
            let code = words.collect::<Vec<_>>().join(" ");
            if code.is_empty() {
                return Err(InputError::MissingArgument("code"));
            }
            Command::PublishCode(code)
        }
        "board-ref" => Command::SetBoardRef(
            words
                .next()
                .ok_or(InputError::MissingArgument("reference"))?
                .to_string(),
        ),
        "tick" => Command::Tick(now),
        "reset" => Command::DailyReset,
        other => return Err(InputError::UnknownCommand(other.to_string())),
    };
    Ok((actor, command))
}

fn parse_actor(raw: &str) -> Result<Actor, InputError> {
    if raw.eq_ignore_ascii_case("sys") {
        return Ok(Actor::System);
    }
    match raw.strip_suffix('!') {
        Some(id) => Ok(Actor::admin(id.parse::<ParticipantId>()?.0)),
        None => Ok(Actor::member(raw.parse::<ParticipantId>()?.0)),
    }
}

/// `90` (minutes), `45m`, `2h`, `1h30m`, optionally prefixed with `+`.
///
/// Offsets longer than [`MAX_READY_OFFSET_MINUTES`] either way are rejected.
pub fn parse_offset_minutes(raw: &str) -> Result<i64, InputError> {
    let invalid = || InputError::InvalidOffset(raw.to_string());
    let s = raw.trim();
    let s = s.strip_prefix('+').unwrap_or(s);
    if s.is_empty() {
        return Err(invalid());
    }
    let in_range = |minutes: i64| {
        if minutes.unsigned_abs() <= MAX_READY_OFFSET_MINUTES.unsigned_abs() {
            Ok(minutes)
        } else {
            Err(invalid())
        }
    };
    if let Ok(minutes) = s.parse::<i64>() {
        return in_range(minutes);
    }

    let (hours, rest) = match s.split_once(['h', 'H']) {
        Some((h, rest)) => (h.parse::<i64>().map_err(|_| invalid())?, rest),
        None => (0, s),
    };
    let minutes = match rest.strip_suffix(['m', 'M']) {
        Some(m) => m.parse::<i64>().map_err(|_| invalid())?,
        None if rest.is_empty() => 0,
        None => return Err(invalid()),
    };
    hours
        .checked_mul(60)
        .and_then(|h| h.checked_add(minutes))
        .ok_or_else(invalid)
        .and_then(in_range)
}
