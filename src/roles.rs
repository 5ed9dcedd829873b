//! Team and position selections, and the derived team compositions.
//!
//! Selections are never rejected at write time. Conflicts are resolved when a composition is
//! derived:
//! - each named position goes to the first participant (in record order) who picked it,
//! - everyone who picked a taken position or [`Position::Fill`] floats,
//! - floaters take, in record order, the first open position in the order
//!   Top, Jungle, Mid, Bot, Support,
//! - floaters left over stay listed as unassigned fill.
//!
//! "Record order" is the order in which a participant's selection was first stored. Changing a
//! selection keeps the participant's place.

use std::{collections::VecDeque, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{error::InputError, participant::ParticipantId};

/// One of the two sides of the lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Team {
    /// Team 1.
    One,
    /// Team 2.
    Two,
}

impl Team {
    /// Both teams, in display order.
    pub const ALL: [Team; 2] = [Team::One, Team::Two];

    /// `1` or `2`.
    pub fn number(self) -> u8 {
        match self {
            Team::One => 1,
            Team::Two => 2,
        }
    }
}

impl TryFrom<u8> for Team {
    type Error = InputError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Team::One),
            2 => Ok(Team::Two),
            other => Err(InputError::InvalidTeam(other.to_string())),
        }
    }
}

impl From<Team> for u8 {
    fn from(team: Team) -> u8 {
        team.number()
    }
}

impl FromStr for Team {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "1", "t1", "team1", "Team 2"
        let lower = s.trim().to_ascii_lowercase();
        let digits = lower
            .strip_prefix("team")
            .or_else(|| lower.strip_prefix('t'))
            .unwrap_or(lower.as_str())
            .trim();
        match digits {
            "1" => Ok(Team::One),
            "2" => Ok(Team::Two),
            _ => Err(InputError::InvalidTeam(s.to_string())),
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Team {}", self.number())
    }
}

/// A lane position, or `Fill` for "whatever is open".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Position {
    /// Top lane.
    #[serde(alias = "Top")]
    Top,
    /// Shown as `JG`.
    #[serde(alias = "JG", alias = "Jungle")]
    Jungle,
    /// Mid lane.
    #[serde(alias = "Mid")]
    Mid,
    /// Bot lane carry.
    #[serde(alias = "Bot")]
    Bot,
    /// Bot lane support.
    #[serde(alias = "Support")]
    Support,
    /// No preference: takes the first open named position.
    #[serde(alias = "Fill")]
    Fill,
}

impl Position {
    /// Named positions, in the order floaters are placed.
    pub const NAMED: [Position; 5] = [
        Position::Top,
        Position::Jungle,
        Position::Mid,
        Position::Bot,
        Position::Support,
    ];

    fn slot(self) -> Option<usize> {
        Position::NAMED.iter().position(|p| *p == self)
    }

    /// Short name used on the board.
    pub fn label(self) -> &'static str {
        match self {
            Position::Top => "Top",
            Position::Jungle => "JG",
            Position::Mid => "Mid",
            Position::Bot => "Bot",
            Position::Support => "Support",
            Position::Fill => "Fill",
        }
    }
}

impl FromStr for Position {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(Position::Top),
            "jg" | "jungle" | "jungler" => Ok(Position::Jungle),
            "mid" | "middle" => Ok(Position::Mid),
            "bot" | "adc" | "bottom" => Ok(Position::Bot),
            "support" | "sup" | "supp" => Ok(Position::Support),
            "fill" => Ok(Position::Fill),
            _ => Err(InputError::InvalidPosition(s.to_string())),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A participant's pick, as stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleSelection {
    /// Chosen side.
    pub team: Team,
    /// Chosen position, possibly `Fill`.
    pub position: Position,
}

/// Derived line-up of one team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamComposition {
    /// Side this lineup belongs to.
    pub team: Team,
    slots: [Option<ParticipantId>; 5],
    /// Floaters that found no open position, in record order.
    pub unassigned_fill: Vec<ParticipantId>,
}

impl TeamComposition {
    fn empty(team: Team) -> Self {
        Self {
            team,
            slots: [None; 5],
            unassigned_fill: vec![],
        }
    }

    /// Occupant of a named position. Always `None` for [`Position::Fill`].
    pub fn get(&self, position: Position) -> Option<ParticipantId> {
        position.slot().and_then(|i| self.slots[i])
    }

    /// Named positions with their occupant, in display order.
    pub fn slots(&self) -> impl Iterator<Item = (Position, Option<ParticipantId>)> + '_ {
        Position::NAMED.iter().copied().zip(self.slots.iter().copied())
    }

    /// Every named position is taken.
    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }
}

/// Stored role selections, and the lineups derived from them.
#[derive(Debug, Clone, Default)]
pub struct RoleAssignmentEngine {
    // record order matters for conflict resolution
    selections: Vec<(ParticipantId, RoleSelection)>,
}

impl RoleAssignmentEngine {
    /// No selections.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_records(records: impl IntoIterator<Item = (ParticipantId, RoleSelection)>) -> Self {
        let mut engine = Self::new();
        for (id, selection) in records {
            engine.set_role(id, selection.team, selection.position);
        }
        engine
    }

    /// Stores or replaces `id`'s pick. A replaced pick keeps its place in record order.
    pub fn set_role(&mut self, id: ParticipantId, team: Team, position: Position) {
        let selection = RoleSelection { team, position };
        match self.selections.iter_mut().find(|(p, _)| *p == id) {
            Some((_, existing)) => *existing = selection,
            None => self.selections.push((id, selection)),
        }
    }

    /// Drops `id`'s pick, if any.
    pub fn clear(&mut self, id: ParticipantId) {
        self.selections.retain(|(p, _)| *p != id);
    }

    /// Drops every pick.
    pub fn clear_all(&mut self) {
        self.selections.clear();
    }

    /// `id`'s current pick.
    pub fn selection(&self, id: ParticipantId) -> Option<RoleSelection> {
        self.selections
            .iter()
            .find_map(|(p, s)| (*p == id).then_some(*s))
    }

    /// Selections in record order.
    pub fn records(&self) -> &[(ParticipantId, RoleSelection)] {
        &self.selections
    }

    /// No picks stored.
    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    /// Named positions nobody on `team` explicitly claimed, followed by [`Position::Fill`].
    ///
    /// Meant for interactive pickers; writes are never checked against it.
    pub fn available_positions(&self, team: Team) -> Vec<Position> {
        let claimed = self.claimed(team);
        Position::NAMED
            .iter()
            .copied()
            .filter(|p| !claimed.contains(p))
            .chain(std::iter::once(Position::Fill))
            .collect()
    }

    fn claimed(&self, team: Team) -> Vec<Position> {
        self.selections
            .iter()
            .filter(|(_, s)| s.team == team && s.position != Position::Fill)
            .map(|(_, s)| s.position)
            .collect()
    }

    /// Lineup of `team`, resolved as described in the module documentation.
    pub fn composition(&self, team: Team) -> TeamComposition {
        let mut comp = TeamComposition::empty(team);
        let mut floaters = VecDeque::new();

        for (id, selection) in self.selections.iter().filter(|(_, s)| s.team == team) {
            match selection.position.slot() {
                Some(i) if comp.slots[i].is_none() => comp.slots[i] = Some(*id),
                _ => floaters.push_back(*id),
            }
        }

        for slot in comp.slots.iter_mut().filter(|s| s.is_none()) {
            match floaters.pop_front() {
                Some(id) => *slot = Some(id),
                None => break,
            }
        }
        comp.unassigned_fill = floaters.into();
        comp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: ParticipantId = ParticipantId(1);
    const B: ParticipantId = ParticipantId(2);
    const C: ParticipantId = ParticipantId(3);

    #[test]
    fn conflicting_pick_floats_into_first_open_slot() {
        let mut engine = RoleAssignmentEngine::new();
        engine.set_role(A, Team::One, Position::Top);
        engine.set_role(B, Team::One, Position::Top);
        engine.set_role(C, Team::One, Position::Fill);

        let comp = engine.composition(Team::One);
        assert_eq!(comp.get(Position::Top), Some(A));
        assert_eq!(comp.get(Position::Jungle), Some(B));
        assert_eq!(comp.get(Position::Mid), Some(C));
        assert_eq!(comp.get(Position::Bot), None);
        assert_eq!(comp.get(Position::Support), None);
        assert!(comp.unassigned_fill.is_empty());

        // pure function of the stored selections
        assert_eq!(engine.composition(Team::One), comp);
        assert_eq!(engine.composition(Team::One), comp);
    }

    #[test]
    fn explicit_pick_beats_earlier_fill() {
        let mut engine = RoleAssignmentEngine::new();
        engine.set_role(C, Team::Two, Position::Fill);
        engine.set_role(A, Team::Two, Position::Top);

        let comp = engine.composition(Team::Two);
        assert_eq!(comp.get(Position::Top), Some(A));
        assert_eq!(comp.get(Position::Jungle), Some(C));
    }

    #[test]
    fn teams_are_independent() {
        let mut engine = RoleAssignmentEngine::new();
        engine.set_role(A, Team::One, Position::Mid);
        engine.set_role(B, Team::Two, Position::Mid);

        assert_eq!(engine.composition(Team::One).get(Position::Mid), Some(A));
        assert_eq!(engine.composition(Team::Two).get(Position::Mid), Some(B));
    }

    #[test]
    fn overflow_floaters_stay_unassigned() {
        let mut engine = RoleAssignmentEngine::new();
        for id in 1..=7 {
            engine.set_role(ParticipantId(id), Team::One, Position::Fill);
        }
        let comp = engine.composition(Team::One);
        assert!(comp.is_full());
        assert_eq!(comp.get(Position::Support), Some(ParticipantId(5)));
        assert_eq!(comp.unassigned_fill, vec![ParticipantId(6), ParticipantId(7)]);
    }

    #[test]
    fn reselecting_keeps_record_order() {
        let mut engine = RoleAssignmentEngine::new();
        engine.set_role(A, Team::One, Position::Bot);
        engine.set_role(B, Team::One, Position::Top);
        // A switches to Top later but was recorded first, so A keeps priority
        engine.set_role(A, Team::One, Position::Top);

        let comp = engine.composition(Team::One);
        assert_eq!(comp.get(Position::Top), Some(A));
        assert_eq!(comp.get(Position::Jungle), Some(B));
        assert_eq!(engine.records().len(), 2);
    }

    #[test]
    fn available_positions_skip_explicit_claims() {
        let mut engine = RoleAssignmentEngine::new();
        engine.set_role(A, Team::One, Position::Top);
        engine.set_role(B, Team::One, Position::Fill);
        engine.set_role(C, Team::Two, Position::Mid);

        assert_eq!(
            engine.available_positions(Team::One),
            vec![
                Position::Jungle,
                Position::Mid,
                Position::Bot,
                Position::Support,
                Position::Fill
            ]
        );
        assert!(!engine.available_positions(Team::Two).contains(&Position::Mid));
        assert_eq!(engine.available_positions(Team::Two).last(), Some(&Position::Fill));
    }

    #[test]
    fn clearing_removes_selection() {
        let mut engine = RoleAssignmentEngine::new();
        engine.set_role(A, Team::One, Position::Top);
        engine.clear(A);
        engine.clear(A);
        assert_eq!(engine.selection(A), None);
        assert_eq!(engine.composition(Team::One).get(Position::Top), None);
    }

    #[test]
    fn parses_labels() {
        assert_eq!("JG".parse::<Position>().unwrap(), Position::Jungle);
        assert_eq!("Support".parse::<Position>().unwrap(), Position::Support);
        assert!("carry".parse::<Position>().is_err());
        assert_eq!("2".parse::<Team>().unwrap(), Team::Two);
        assert_eq!("team1".parse::<Team>().unwrap(), Team::One);
        assert_eq!("Team 2".parse::<Team>().unwrap(), Team::Two);
        assert!("3".parse::<Team>().is_err());
        assert_eq!("t2".parse::<Team>().unwrap(), Team::Two);
        for raw in ["ttt1", "tteam1", "teamteam1", "team", "12"] {
            assert_eq!(
                raw.parse::<Team>(),
                Err(InputError::InvalidTeam(raw.to_string())),
                "{raw}"
            );
        }
        assert!(Team::try_from(0).is_err());
    }
}
