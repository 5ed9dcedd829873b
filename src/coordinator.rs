//! The lobby state machine.
//!
//! [`SignupCoordinator`] owns the roster, the readiness records and the role selections, and is
//! the only thing that mutates them. Each operation applies its transition immediately and
//! returns a [`Transition`]: the outcome plus the side effects ([`Effect`]) the caller must run
//! once it has released whatever lock protects the coordinator.
//!
//! A participant moves through `Unregistered -> Active | Reserve -> Unregistered`. The only way
//! from `Reserve` to `Active` is promotion when an active participant leaves; there is no way
//! back from `Active` to `Reserve`. Leaving, for whatever reason, clears the participant's
//! readiness and role selection.

use std::{collections::BTreeMap, sync::Arc};

use time::{Duration, OffsetDateTime, Time};
use tracing::{debug, info, instrument, trace, warn};

use crate::{
    clock::{next_reset_after, Clock},
    command::{Command, MAX_READY_OFFSET_MINUTES},
    configuration::Configuration,
    participant::ParticipantId,
    readiness::ReadinessTracker,
    roles::{Position, RoleAssignmentEngine, RoleSelection, Team, TeamComposition},
    roster::{JoinOutcome, RemoveOutcome, RosterManager},
    store::{Directory, PersistentSnapshot, ReadyAt},
    zone::LobbyZone,
};

pub(crate) const RESET_ANNOUNCEMENT: &str = "Daily reset: Sign-ups are now open!";

/// Work left to do after a transition was committed.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Save this snapshot.
    Persist(PersistentSnapshot),
    /// Broadcast to the sign-up channel.
    Announce(String),
    /// Best-effort private notice.
    DirectNotify {
        /// Recipient.
        to: ParticipantId,
        /// Message body.
        text: String,
    },
    /// Redraw the board.
    Refresh(LobbyView),
}

impl Effect {
    /// Short label used in logs and in [`EffectFailure`](crate::error::EffectFailure).
    pub fn name(&self) -> &'static str {
        match self {
            Effect::Persist(_) => "persist",
            Effect::Announce(_) => "announce",
            Effect::DirectNotify { .. } => "direct notify",
            Effect::Refresh(_) => "refresh",
        }
    }
}

/// What a transition did to the lobby.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A join request, including the idempotent repeat.
    Joined(JoinOutcome),
    /// The participant left on their own.
    Left(RemoveOutcome),
    /// An admin removed the participant.
    Evicted(RemoveOutcome),
    /// A ready time was recorded.
    ReadySet {
        /// The recorded instant.
        at: OffsetDateTime,
        /// `false` when the participant is not active: the record is kept but not counted.
        counted: bool,
    },
    /// A team and position were picked.
    RoleSet(RoleSelection),
    /// Periodic quorum check.
    Ticked {
        /// Active participants ready at the tick instant.
        ready: usize,
        /// The quorum notification went out on this tick.
        notified: bool,
    },
    /// Everything was cleared.
    Reset,
    /// A lobby code was added to the board.
    CodePublished,
    /// The board message reference was stored.
    BoardRefSet,
}

/// Result of applying a command: already committed, with effects still to run.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// What happened.
    pub outcome: Outcome,
    /// In order: persist before announcing or refreshing.
    pub effects: Vec<Effect>,
}

impl Transition {
    fn quiet(outcome: Outcome) -> Self {
        Self {
            outcome,
            effects: vec![],
        }
    }
}

/// Where a participant currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantStatus {
    /// Neither active nor queued.
    Unregistered,
    /// Holds an active slot.
    Active,
    /// Zero-based place in the reserve queue.
    Reserve(usize),
}

/// Everything a renderer needs, captured at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct LobbyView {
    /// Roster, readiness and role records.
    pub snapshot: PersistentSnapshot,
    /// Derived Team 1 lineup.
    pub team_one: TeamComposition,
    /// Derived Team 2 lineup.
    pub team_two: TeamComposition,
    /// Active participants ready at `as_of`.
    pub ready_count: usize,
    /// Number of active slots.
    pub capacity: usize,
    /// Ready count that triggers the notification.
    pub quorum_threshold: usize,
    /// Lobby codes published since the last reset, oldest first.
    pub codes: Vec<String>,
    /// The instant the view was taken.
    pub as_of: OffsetDateTime,
    /// The next daily reset.
    pub next_reset: OffsetDateTime,
    /// Zone displayed times are converted to.
    pub zone: LobbyZone,
}

impl LobbyView {
    /// Lineup of `team`.
    pub fn composition(&self, team: Team) -> &TeamComposition {
        match team {
            Team::One => &self.team_one,
            Team::Two => &self.team_two,
        }
    }

    /// Countdown shown in the board footer.
    pub fn time_until_reset(&self) -> Duration {
        self.next_reset - self.as_of
    }
}

/// Owner of the lobby state. See the module documentation.
pub struct SignupCoordinator {
    roster: RosterManager,
    readiness: ReadinessTracker,
    roles: RoleAssignmentEngine,
    quorum_threshold: usize,
    quorum_notified: bool,
    admin: Option<ParticipantId>,
    reset_time: Time,
    zone: LobbyZone,
    // ephemeral, cleared on reset and never persisted
    codes: Vec<String>,
    board_ref: Option<String>,
    revision: u64,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SignupCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignupCoordinator")
            .field("roster", &self.roster)
            .field("readiness", &self.readiness)
            .field("roles", &self.roles)
            .field("quorum_notified", &self.quorum_notified)
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}

impl SignupCoordinator {
    /// An empty lobby.
    pub fn new(config: &Configuration, clock: Arc<dyn Clock>) -> Self {
        Self {
            roster: RosterManager::new(config.capacity),
            readiness: ReadinessTracker::new(),
            roles: RoleAssignmentEngine::new(),
            quorum_threshold: config.quorum_threshold,
            quorum_notified: false,
            admin: config.admin_id,
            reset_time: config.reset_time,
            zone: config.zone,
            codes: vec![],
            board_ref: None,
            revision: 0,
            clock,
        }
    }

    /// Rebuilds a lobby from a persisted snapshot.
    ///
    /// Ids the directory cannot resolve are dropped, duplicates are dropped, actives beyond the
    /// configured capacity go back to the head of the reserve queue, and readiness or role
    /// records of anyone no longer on the roster are discarded.
    #[instrument(skip_all, fields(revision = snapshot.revision))]
    pub fn restore(
        config: &Configuration,
        clock: Arc<dyn Clock>,
        snapshot: PersistentSnapshot,
        directory: &dyn Directory,
    ) -> Self {
        let mut lobby = Self::new(config, clock);
        let mut resolvable = |id: &ParticipantId| {
            let found = directory.resolve(*id).is_some();
            if !found {
                warn!(%id, "participant no longer resolvable, dropped from roster");
            }
            found
        };
        let active: Vec<_> = snapshot.active_ids.into_iter().filter(&mut resolvable).collect();
        let reserve: Vec<_> = snapshot.reserve_ids.into_iter().filter(&mut resolvable).collect();
        lobby.roster = RosterManager::from_sequences(config.capacity, active, reserve);

        for (id, ReadyAt(at)) in snapshot.readiness {
            if lobby.roster.contains(id) {
                lobby.readiness.set_ready(id, at);
            }
        }
        let roster = &lobby.roster;
        lobby.roles = RoleAssignmentEngine::from_records(
            snapshot
                .roles
                .into_iter()
                .filter(|(id, _)| roster.contains(*id)),
        );
        lobby.board_ref = snapshot.board_ref;
        lobby.revision = snapshot.revision;

        info!(
            active = lobby.roster.active().len(),
            reserve = lobby.roster.reserve().len(),
            "lobby restored"
        );
        lobby
    }

    /// Applies one command. This is the single entry point the service uses.
    pub fn apply(&mut self, command: Command) -> Transition {
        trace!(?command);
        match command {
            Command::Join(id) => self.on_join_request(id),
            Command::Leave(id) => self.on_leave_request(id),
            Command::SetReadyAt(id, at) => self.on_set_ready_time(id, at),
            Command::SetReadyIn(id, minutes) => self.on_set_ready_in(id, minutes),
            Command::SetReadyNow(id) => self.on_set_ready_now(id),
            Command::SelectRole(id, team, position) => self.on_select_role(id, team, position),
            Command::AdminRemove(id) => self.on_admin_remove(id),
            Command::PublishCode(code) => self.on_publish_code(code),
            Command::SetBoardRef(reference) => self.on_set_board_ref(reference),
            Command::Tick(now) => self.on_tick(now),
            Command::DailyReset => self.on_daily_reset(),
        }
    }

    /// Admits into an active slot, or queues as a reserve once the slots are full.
    pub fn on_join_request(&mut self, id: ParticipantId) -> Transition {
        let outcome = self.roster.join(id);
        debug!(%id, ?outcome, "join");
        match outcome {
            JoinOutcome::AlreadyPresent => Transition::quiet(Outcome::Joined(outcome)),
            _ => self.committed(Outcome::Joined(outcome)),
        }
    }

    /// Removes the participant, promoting the reserve head if an active slot opened.
    pub fn on_leave_request(&mut self, id: ParticipantId) -> Transition {
        let outcome = self.remove(id);
        self.committed(Outcome::Left(outcome))
    }

    /// Same as a leave, issued on someone else's behalf. The capability check belongs to the
    /// caller.
    pub fn on_admin_remove(&mut self, id: ParticipantId) -> Transition {
        let outcome = self.remove(id);
        info!(%id, ?outcome, "evicted by admin");
        self.committed(Outcome::Evicted(outcome))
    }

    fn remove(&mut self, id: ParticipantId) -> RemoveOutcome {
        let outcome = self.roster.remove(id);
        self.readiness.clear(id);
        self.roles.clear(id);
        debug!(%id, ?outcome, "leave");
        outcome
    }

    /// Records `at` as the participant's ready instant, replacing any earlier one.
    pub fn on_set_ready_time(&mut self, id: ParticipantId, at: OffsetDateTime) -> Transition {
        self.readiness.set_ready(id, at);
        self.ready_recorded(id, at)
    }

    /// Ready as of the clock's current instant.
    pub fn on_set_ready_now(&mut self, id: ParticipantId) -> Transition {
        self.readiness.set_ready_now(id, self.clock.as_ref());
        let at = self.readiness.ready_at(id).unwrap_or_else(|| self.clock.now());
        self.ready_recorded(id, at)
    }

    /// Ready `minutes` from now, clamped to `0..=MAX_READY_OFFSET_MINUTES`.
    pub fn on_set_ready_in(&mut self, id: ParticipantId, minutes: i64) -> Transition {
        let clamped = minutes.clamp(0, MAX_READY_OFFSET_MINUTES);
        if clamped != minutes {
            debug!(%id, minutes, clamped, "ready offset out of range");
        }
        let at = self.clock.now().saturating_add(Duration::minutes(clamped));
        self.on_set_ready_time(id, at)
    }

    fn ready_recorded(&mut self, id: ParticipantId, at: OffsetDateTime) -> Transition {
        let counted = self.roster.is_active(id);
        if !counted {
            debug!(%id, "ready time recorded for a participant who is not active");
        }
        self.committed(Outcome::ReadySet { at, counted })
    }

    /// Replaces the participant's role record. Conflicts are resolved when lineups are derived.
    pub fn on_select_role(&mut self, id: ParticipantId, team: Team, position: Position) -> Transition {
        self.roles.set_role(id, team, position);
        self.committed(Outcome::RoleSet(RoleSelection { team, position }))
    }

    /// Shows a lobby code on the board until the next reset. Nothing is persisted.
    pub fn on_publish_code(&mut self, code: String) -> Transition {
        self.codes.push(code);
        let view = self.snapshot();
        Transition {
            outcome: Outcome::CodePublished,
            effects: vec![Effect::Refresh(view)],
        }
    }

    /// Remembers which message holds the board.
    pub fn on_set_board_ref(&mut self, reference: String) -> Transition {
        self.board_ref = Some(reference);
        self.revision += 1;
        Transition {
            outcome: Outcome::BoardRefSet,
            effects: vec![Effect::Persist(self.persistent_snapshot())],
        }
    }

    /// Quorum edge detection.
    ///
    /// The notification goes out once when the ready count reaches the threshold, and is
    /// re-armed the first time the count drops below it again.
    pub fn on_tick(&mut self, now: OffsetDateTime) -> Transition {
        let ready = self
            .readiness
            .count_ready_as_of(now, self.roster.active());
        let mut effects = vec![];
        let mut notified = false;

        if ready >= self.quorum_threshold {
            if !self.quorum_notified {
                self.quorum_notified = true;
                notified = true;
                info!(ready, threshold = self.quorum_threshold, "quorum reached");
                effects.push(Effect::Announce(format!(
                    "@here {} players are ready to go! (Ready count: {ready})",
                    self.quorum_threshold
                )));
                if let Some(admin) = self.admin {
                    effects.push(Effect::DirectNotify {
                        to: admin,
                        text: format!("{} players are ready to go!", self.quorum_threshold),
                    });
                }
            }
        } else if self.quorum_notified {
            debug!(ready, "quorum lost, notification re-armed");
            self.quorum_notified = false;
        }

        // the countdown on the board moves with every tick
        effects.push(Effect::Refresh(self.view_at(now)));
        Transition {
            outcome: Outcome::Ticked { ready, notified },
            effects,
        }
    }

    /// Clears roster, readiness, roles and codes, and re-arms the quorum notification.
    #[instrument(skip(self))]
    pub fn on_daily_reset(&mut self) -> Transition {
        self.roster.clear();
        self.readiness.clear_all();
        self.roles.clear_all();
        self.codes.clear();
        self.quorum_notified = false;
        self.revision += 1;
        info!("lobby reset");

        Transition {
            outcome: Outcome::Reset,
            effects: vec![
                Effect::Persist(self.persistent_snapshot()),
                Effect::Announce(RESET_ANNOUNCEMENT.to_string()),
                Effect::Refresh(self.snapshot()),
            ],
        }
    }

    fn committed(&mut self, outcome: Outcome) -> Transition {
        self.revision += 1;
        Transition {
            outcome,
            effects: vec![
                Effect::Persist(self.persistent_snapshot()),
                Effect::Refresh(self.snapshot()),
            ],
        }
    }

    /// The state that survives a restart.
    pub fn persistent_snapshot(&self) -> PersistentSnapshot {
        let (active_ids, reserve_ids) = self.roster.snapshot();
        PersistentSnapshot {
            active_ids,
            reserve_ids,
            readiness: self
                .readiness
                .iter()
                .map(|(id, at)| (*id, ReadyAt(*at)))
                .collect::<BTreeMap<_, _>>(),
            roles: self.roles.records().to_vec(),
            board_ref: self.board_ref.clone(),
            revision: self.revision,
        }
    }

    /// The renderable state, as of the clock's current instant.
    pub fn snapshot(&self) -> LobbyView {
        self.view_at(self.clock.now())
    }

    fn view_at(&self, now: OffsetDateTime) -> LobbyView {
        LobbyView {
            snapshot: self.persistent_snapshot(),
            team_one: self.roles.composition(Team::One),
            team_two: self.roles.composition(Team::Two),
            ready_count: self.readiness.count_ready_as_of(now, self.roster.active()),
            capacity: self.roster.capacity(),
            quorum_threshold: self.quorum_threshold,
            codes: self.codes.clone(),
            as_of: now,
            next_reset: next_reset_after(now, self.reset_time, &self.zone),
            zone: self.zone,
        }
    }

    /// Where `id` stands right now.
    pub fn status(&self, id: ParticipantId) -> ParticipantStatus {
        if self.roster.is_active(id) {
            ParticipantStatus::Active
        } else if let Some(place) = self.roster.reserve().position(|p| *p == id) {
            ParticipantStatus::Reserve(place)
        } else {
            ParticipantStatus::Unregistered
        }
    }

    /// Active and reserve sequences.
    pub fn roster(&self) -> &RosterManager {
        &self.roster
    }

    /// Ready instants.
    pub fn readiness(&self) -> &ReadinessTracker {
        &self.readiness
    }

    /// Role records.
    pub fn roles(&self) -> &RoleAssignmentEngine {
        &self.roles
    }

    /// Whether the current quorum episode was already announced.
    pub fn quorum_notified(&self) -> bool {
        self.quorum_notified
    }

    /// Incremented by every persisted change.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::{clock::ManualClock, participant::Participant, roster::RemovedFrom};

    const START: OffsetDateTime = datetime!(2025-02-10 17:00 +13:00);

    fn lobby(capacity: usize, quorum: usize) -> (SignupCoordinator, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(START));
        let config = Configuration::new()
            .with_capacity(capacity)
            .with_quorum_threshold(quorum)
            .with_admin_id(Some(ParticipantId(999)));
        (SignupCoordinator::new(&config, clock.clone()), clock)
    }

    fn p(id: u64) -> ParticipantId {
        ParticipantId(id)
    }

    fn announcements(t: &Transition) -> usize {
        t.effects
            .iter()
            .filter(|e| matches!(e, Effect::Announce(_)))
            .count()
    }

    #[test]
    fn join_persists_and_refreshes_unless_already_present() {
        let (mut lobby, _) = lobby(10, 10);
        let first = lobby.on_join_request(p(1));
        assert_eq!(first.outcome, Outcome::Joined(JoinOutcome::Admitted));
        assert!(matches!(first.effects[..], [Effect::Persist(_), Effect::Refresh(_)]));

        let second = lobby.on_join_request(p(1));
        assert_eq!(second.outcome, Outcome::Joined(JoinOutcome::AlreadyPresent));
        assert!(second.effects.is_empty());
        assert_eq!(lobby.revision(), 1);
    }

    #[test]
    fn leaving_clears_readiness_and_role_and_promotes() {
        let (mut lobby, _) = lobby(2, 10);
        for id in 1..=4 {
            lobby.on_join_request(p(id));
        }
        lobby.on_set_ready_now(p(1));
        lobby.on_select_role(p(1), Team::One, Position::Top);

        let t = lobby.on_leave_request(p(1));
        assert_eq!(
            t.outcome,
            Outcome::Left(RemoveOutcome::Removed {
                from: RemovedFrom::Active,
                promoted: Some(p(3)),
            })
        );
        assert_eq!(lobby.readiness().ready_at(p(1)), None);
        assert_eq!(lobby.roles().selection(p(1)), None);
        assert_eq!(lobby.roster().snapshot(), (vec![p(2), p(3)], vec![p(4)]));
        assert_eq!(lobby.status(p(3)), ParticipantStatus::Active);
        assert_eq!(lobby.status(p(4)), ParticipantStatus::Reserve(0));
        assert_eq!(lobby.status(p(1)), ParticipantStatus::Unregistered);
    }

    #[test]
    fn leaving_when_absent_still_clears_stray_records() {
        let (mut lobby, _) = lobby(2, 10);
        lobby.on_select_role(p(5), Team::Two, Position::Mid);
        lobby.on_set_ready_now(p(5));
        let t = lobby.on_leave_request(p(5));
        assert_eq!(t.outcome, Outcome::Left(RemoveOutcome::NotPresent));
        assert!(lobby.roles().is_empty());
        assert!(lobby.readiness().is_empty());
        assert_eq!(t.effects.len(), 2);
    }

    #[test]
    fn admin_remove_matches_leave() {
        let (mut lobby, _) = lobby(1, 10);
        lobby.on_join_request(p(1));
        lobby.on_join_request(p(2));
        lobby.on_set_ready_now(p(1));
        let t = lobby.on_admin_remove(p(1));
        assert_eq!(
            t.outcome,
            Outcome::Evicted(RemoveOutcome::Removed {
                from: RemovedFrom::Active,
                promoted: Some(p(2)),
            })
        );
        assert!(lobby.readiness().is_empty());
    }

    #[test]
    fn ready_in_clamps_negative_offsets() {
        let (mut lobby, _) = lobby(10, 10);
        lobby.on_join_request(p(1));
        let t = lobby.on_set_ready_in(p(1), 90);
        assert_eq!(
            t.outcome,
            Outcome::ReadySet {
                at: START + Duration::minutes(90),
                counted: true
            }
        );
        lobby.on_set_ready_in(p(1), -30);
        assert_eq!(lobby.readiness().ready_at(p(1)), Some(START));
    }

    #[test]
    fn ready_in_caps_huge_offsets() {
        let (mut lobby, _) = lobby(10, 10);
        lobby.on_join_request(p(1));
        let t = lobby.on_set_ready_in(p(1), i64::MAX);
        let week = START + Duration::minutes(MAX_READY_OFFSET_MINUTES);
        assert_eq!(t.outcome, Outcome::ReadySet { at: week, counted: true });

        // the lobby keeps working afterwards
        let t = lobby.on_join_request(p(2));
        assert_eq!(t.outcome, Outcome::Joined(JoinOutcome::Admitted));
        assert_eq!(lobby.on_tick(START).outcome, Outcome::Ticked { ready: 0, notified: false });
    }

    #[test]
    fn reset_countdown_follows_daylight_saving() {
        // the evening before New Zealand clocks go back
        let clock = Arc::new(ManualClock::new(datetime!(2025-04-05 21:00 +13:00)));
        let lobby = SignupCoordinator::new(&Configuration::new(), clock);
        let view = lobby.snapshot();
        assert_eq!(view.next_reset, datetime!(2025-04-06 09:00 +12:00));
        assert_eq!(view.time_until_reset(), Duration::hours(13));
    }

    #[test]
    fn reserve_readiness_is_recorded_but_not_counted() {
        let (mut lobby, _) = lobby(1, 1);
        lobby.on_join_request(p(1));
        lobby.on_join_request(p(2));
        let t = lobby.on_set_ready_now(p(2));
        assert!(matches!(t.outcome, Outcome::ReadySet { counted: false, .. }));
        let tick = lobby.on_tick(START);
        assert_eq!(tick.outcome, Outcome::Ticked { ready: 0, notified: false });
    }

    #[test]
    fn quorum_notifies_once_per_episode() {
        let (mut lobby, clock) = lobby(10, 2);
        for id in 1..=3 {
            lobby.on_join_request(p(id));
        }
        lobby.on_set_ready_now(p(1));
        lobby.on_set_ready_now(p(2));

        let t = lobby.on_tick(clock.now());
        assert_eq!(t.outcome, Outcome::Ticked { ready: 2, notified: true });
        assert_eq!(announcements(&t), 1);
        assert!(t.effects.contains(&Effect::DirectNotify {
            to: p(999),
            text: "2 players are ready to go!".to_string()
        }));

        lobby.on_set_ready_now(p(3));
        let t = lobby.on_tick(clock.now());
        assert_eq!(t.outcome, Outcome::Ticked { ready: 3, notified: false });
        assert_eq!(announcements(&t), 0);

        // below threshold re-arms
        lobby.on_leave_request(p(1));
        lobby.on_leave_request(p(2));
        let t = lobby.on_tick(clock.now());
        assert_eq!(t.outcome, Outcome::Ticked { ready: 1, notified: false });
        assert!(!lobby.quorum_notified());

        lobby.on_join_request(p(1));
        lobby.on_set_ready_now(p(1));
        let t = lobby.on_tick(clock.now());
        assert_eq!(t.outcome, Outcome::Ticked { ready: 2, notified: true });
        assert_eq!(announcements(&t), 1);
    }

    #[test]
    fn future_ready_times_count_once_reached() {
        let (mut lobby, clock) = lobby(10, 1);
        lobby.on_join_request(p(1));
        lobby.on_set_ready_in(p(1), 30);
        assert_eq!(
            lobby.on_tick(clock.now()).outcome,
            Outcome::Ticked { ready: 0, notified: false }
        );
        clock.advance(Duration::minutes(30));
        assert_eq!(
            lobby.on_tick(clock.now()).outcome,
            Outcome::Ticked { ready: 1, notified: true }
        );
    }

    #[test]
    fn daily_reset_clears_everything() {
        let (mut lobby, clock) = lobby(1, 1);
        lobby.on_join_request(p(1));
        lobby.on_join_request(p(2));
        lobby.on_set_ready_now(p(1));
        lobby.on_select_role(p(1), Team::One, Position::Mid);
        lobby.on_publish_code("NA-1234".to_string());
        lobby.on_tick(clock.now());
        assert!(lobby.quorum_notified());

        let t = lobby.on_daily_reset();
        assert_eq!(t.outcome, Outcome::Reset);
        assert!(t
            .effects
            .contains(&Effect::Announce(RESET_ANNOUNCEMENT.to_string())));
        let snapshot = lobby.persistent_snapshot();
        assert!(snapshot.is_empty());
        assert!(lobby.snapshot().codes.is_empty());
        assert!(!lobby.quorum_notified());
    }

    #[test]
    fn view_carries_compositions_and_countdown() {
        let (mut lobby, _) = lobby(10, 10);
        lobby.on_join_request(p(1));
        lobby.on_select_role(p(1), Team::Two, Position::Support);
        lobby.on_set_ready_now(p(1));

        let view = lobby.snapshot();
        assert_eq!(view.team_two.get(Position::Support), Some(p(1)));
        assert_eq!(view.ready_count, 1);
        assert_eq!(view.next_reset, datetime!(2025-02-11 09:00 +13:00));
        assert_eq!(view.time_until_reset(), Duration::hours(16));
    }

    #[test]
    fn restore_drops_unknown_ids_and_their_records() {
        let (mut lobby, clock) = lobby(2, 10);
        for id in 1..=3 {
            lobby.on_join_request(p(id));
        }
        lobby.on_set_ready_now(p(1));
        lobby.on_select_role(p(1), Team::One, Position::Top);
        lobby.on_select_role(p(2), Team::One, Position::Top);
        lobby.on_set_board_ref("msg-1".to_string());
        let saved = lobby.persistent_snapshot();

        let directory = |id: ParticipantId| (id != p(1)).then(|| Participant::new(id, "x"));
        let config = Configuration::new().with_capacity(2);
        let restored = SignupCoordinator::restore(&config, clock, saved.clone(), &directory);

        assert_eq!(restored.roster().snapshot(), (vec![p(2), p(3)], vec![]));
        assert_eq!(restored.readiness().ready_at(p(1)), None);
        assert_eq!(restored.roles().records().len(), 1);
        assert_eq!(restored.revision(), saved.revision);
        assert_eq!(restored.persistent_snapshot().board_ref.as_deref(), Some("msg-1"));
    }
}
