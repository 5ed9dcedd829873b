//! Participant identity.

use std::{fmt, hash::Hash, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// Stable platform identifier of a participant.
///
/// Serialized as a bare integer (and as a string when used as a JSON map key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ParticipantId {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // mentions are accepted as-is: "<@123>" or "<@!123>"
        let raw = s.trim();
        let digits = match raw.strip_prefix("<@").and_then(|rest| rest.strip_suffix('>')) {
            Some(inner) => inner.strip_prefix('!').unwrap_or(inner),
            None => raw,
        };
        digits
            .parse::<u64>()
            .map(ParticipantId)
            .map_err(|_| InputError::InvalidParticipantId(s.to_string()))
    }
}

impl From<u64> for ParticipantId {
    fn from(value: u64) -> Self {
        ParticipantId(value)
    }
}

/// A participant as known by the platform directory.
///
/// The handle is only used for display; everything the lobby tracks is keyed by [`ParticipantId`].
#[derive(Debug, Clone)]
pub struct Participant {
    /// Platform id.
    pub id: ParticipantId,
    /// Display name.
    pub handle: String,
}

impl PartialEq for Participant {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Participant {}

impl Hash for Participant {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Participant {
    /// A participant known under `handle`.
    pub fn new(id: ParticipantId, handle: impl Into<String>) -> Participant {
        Participant {
            id,
            handle: handle.into(),
        }
    }

    /// Platform mention of this participant, e.g. `<@42>`.
    pub fn mention(&self) -> String {
        mention(self.id)
    }
}

pub(crate) fn mention(id: ParticipantId) -> String {
    format!("<@{id}>")
}
