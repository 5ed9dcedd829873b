//! Per-participant ready instants.

use std::collections::HashMap;

use time::OffsetDateTime;

use crate::{clock::Clock, participant::ParticipantId};

/// Declared ready instants, keyed by participant.
///
/// An instant at or before "now" means the participant is ready now.
#[derive(Debug, Clone, Default)]
pub struct ReadinessTracker {
    ready_at: HashMap<ParticipantId, OffsetDateTime>,
}

impl ReadinessTracker {
    /// No records.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores or replaces `id`'s ready instant.
    pub fn set_ready(&mut self, id: ParticipantId, instant: OffsetDateTime) {
        self.ready_at.insert(id, instant);
    }

    /// Ready as of `clock`'s current instant.
    pub fn set_ready_now(&mut self, id: ParticipantId, clock: &dyn Clock) {
        self.set_ready(id, clock.now());
    }

    /// Drops `id`'s record, if any.
    pub fn clear(&mut self, id: ParticipantId) {
        self.ready_at.remove(&id);
    }

    /// Drops every record.
    pub fn clear_all(&mut self) {
        self.ready_at.clear();
    }

    /// `id`'s declared ready instant.
    pub fn ready_at(&self, id: ParticipantId) -> Option<OffsetDateTime> {
        self.ready_at.get(&id).copied()
    }

    /// Number of ids in `ids` whose declared instant is at or before `now`.
    ///
    /// Records of ids outside `ids` (e.g. reserves) are ignored.
    pub fn count_ready_as_of<'a>(
        &self,
        now: OffsetDateTime,
        ids: impl IntoIterator<Item = &'a ParticipantId>,
    ) -> usize {
        ids.into_iter()
            .filter(|id| self.ready_at.get(*id).is_some_and(|at| *at <= now))
            .count()
    }

    /// All records, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&ParticipantId, &OffsetDateTime)> {
        self.ready_at.iter()
    }

    /// No records.
    pub fn is_empty(&self) -> bool {
        self.ready_at.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use time::{macros::datetime, Duration};

    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn counts_only_considered_ids_at_or_before_now() {
        let now = datetime!(2025-02-10 17:00 +13:00);
        let mut tracker = ReadinessTracker::new();
        tracker.set_ready(ParticipantId(1), now - Duration::minutes(5));
        tracker.set_ready(ParticipantId(2), now);
        tracker.set_ready(ParticipantId(3), now + Duration::minutes(30));
        tracker.set_ready(ParticipantId(4), now); // e.g. a reserve

        let active = [ParticipantId(1), ParticipantId(2), ParticipantId(3)];
        assert_eq!(tracker.count_ready_as_of(now, &active), 2);
        assert_eq!(
            tracker.count_ready_as_of(now + Duration::hours(1), &active),
            3
        );
    }

    #[test]
    fn upsert_and_clear() {
        let clock = ManualClock::new(datetime!(2025-02-10 17:00 UTC));
        let mut tracker = ReadinessTracker::new();
        tracker.set_ready(ParticipantId(1), datetime!(2025-02-10 20:00 UTC));
        tracker.set_ready_now(ParticipantId(1), &clock);
        assert_eq!(tracker.ready_at(ParticipantId(1)), Some(clock.now()));

        tracker.clear(ParticipantId(1));
        tracker.clear(ParticipantId(1));
        assert_eq!(tracker.ready_at(ParticipantId(1)), None);
        assert!(tracker.is_empty());
    }
}
