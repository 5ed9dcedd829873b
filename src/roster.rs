//! Active/reserve partition of the lobby.
//!
//! The roster admits participants into `active` while there is room and queues the rest in
//! `reserve`. Reserve is FIFO: a slot freed in `active` is taken by the head of the queue.

use std::collections::{HashSet, VecDeque};

use tracing::trace;

use crate::participant::ParticipantId;

/// Result of [`RosterManager::join`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Took a slot in `active`.
    Admitted,
    /// `active` was full; appended to the reserve queue.
    Queued,
    /// Already in `active` or `reserve`. Nothing changed.
    AlreadyPresent,
}

/// Which sequence a removed participant was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovedFrom {
    /// Held an active slot.
    Active,
    /// Was waiting in the reserve queue.
    Reserve,
}

/// Result of [`RosterManager::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The participant was on the roster.
    Removed {
        /// Sequence the participant was taken from.
        from: RemovedFrom,
        /// Reserve head moved into `active` to fill the freed slot, if any.
        promoted: Option<ParticipantId>,
    },
    /// Nothing to remove.
    NotPresent,
}

/// Ordered active slots plus the FIFO reserve queue.
#[derive(Debug, Clone)]
pub struct RosterManager {
    capacity: usize,
    active: Vec<ParticipantId>,
    reserve: VecDeque<ParticipantId>,
}

impl RosterManager {
    /// An empty roster with `capacity` active slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            active: vec![],
            reserve: VecDeque::new(),
        }
    }

    /// Number of active slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Admits `id`, or queues it once `active` is full. Joining twice changes nothing.
    pub fn join(&mut self, id: ParticipantId) -> JoinOutcome {
        if self.contains(id) {
            return JoinOutcome::AlreadyPresent;
        }
        if self.active.len() < self.capacity {
            self.active.push(id);
            JoinOutcome::Admitted
        } else {
            self.reserve.push_back(id);
            JoinOutcome::Queued
        }
    }

    /// Removes `id` from whichever sequence holds it.
    ///
    /// A removal frees at most one active slot, so at most one reserve participant is promoted.
    pub fn remove(&mut self, id: ParticipantId) -> RemoveOutcome {
        if let Some(pos) = self.active.iter().position(|p| *p == id) {
            self.active.remove(pos);
            let promoted = if self.active.len() < self.capacity {
                self.reserve.pop_front()
            } else {
                None
            };
            if let Some(promoted) = promoted {
                trace!(%promoted, "promoted from reserve");
                self.active.push(promoted);
            }
            return RemoveOutcome::Removed {
                from: RemovedFrom::Active,
                promoted,
            };
        }
        if let Some(pos) = self.reserve.iter().position(|p| *p == id) {
            self.reserve.remove(pos);
            return RemoveOutcome::Removed {
                from: RemovedFrom::Reserve,
                promoted: None,
            };
        }
        RemoveOutcome::NotPresent
    }

    /// `id` is active or queued.
    pub fn contains(&self, id: ParticipantId) -> bool {
        self.is_active(id) || self.reserve.contains(&id)
    }

    /// `id` holds an active slot.
    pub fn is_active(&self, id: ParticipantId) -> bool {
        self.active.contains(&id)
    }

    /// Active participants, in admission order.
    pub fn active(&self) -> &[ParticipantId] {
        &self.active
    }

    /// Reserve queue, head first.
    pub fn reserve(&self) -> impl ExactSizeIterator<Item = &ParticipantId> {
        self.reserve.iter()
    }

    /// Copies of both sequences, in order.
    pub fn snapshot(&self) -> (Vec<ParticipantId>, Vec<ParticipantId>) {
        (self.active.clone(), self.reserve.iter().copied().collect())
    }

    /// Empties both sequences.
    pub fn clear(&mut self) {
        self.active.clear();
        self.reserve.clear();
    }

    /// Rebuilds the roster from persisted sequences.
    ///
    /// Duplicates are dropped (first occurrence wins, `active` before `reserve`). The combined
    /// order is then re-cut at `capacity`: actives beyond it go back to the front of the reserve
    /// queue, and free slots are taken by the reserve head.
    pub(crate) fn from_sequences(
        capacity: usize,
        active: impl IntoIterator<Item = ParticipantId>,
        reserve: impl IntoIterator<Item = ParticipantId>,
    ) -> Self {
        let mut seen = HashSet::new();
        let mut queue: VecDeque<_> = active
            .into_iter()
            .chain(reserve)
            .filter(|id| seen.insert(*id))
            .collect();

        let split = queue.len().min(capacity);
        RosterManager {
            capacity,
            active: queue.drain(..split).collect(),
            reserve: queue,
        }
    }
}
