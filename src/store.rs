//! Durable projection of the lobby and the collaborators used to rehydrate it.
//!
//! A [`StateStore`] saves and loads a [`PersistentSnapshot`]. On startup the persisted ids are
//! checked against a [`Directory`]: ids the platform no longer knows are dropped.
//!
//! The JSON layout is:
//!
//! ```json
//! {
//!   "activeIds": [1, 2],
//!   "reserveIds": [3],
//!   "readiness": { "1": "2025-02-10T17:00:00+13:00" },
//!   "roles": { "2": { "team": 1, "position": "JUNGLE" } },
//!   "boardRef": "1336930586341937195",
//!   "revision": 12
//! }
//! ```
//!
//! Older state files (`signups`, `reserves`, `available_times`,
//! `player_roles`, `signup_message_id`) load as well.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
};

use anyhow::{bail, Context};
use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;
use tracing::{info, instrument};

use crate::{
    participant::{Participant, ParticipantId},
    roles::RoleSelection,
};

/// A ready instant, stored as RFC 3339.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReadyAt(#[serde(with = "time::serde::rfc3339")] pub OffsetDateTime);

/// Everything that survives a restart. Lobby codes and the quorum flag do not.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistentSnapshot {
    /// Active participants, in admission order.
    #[serde(default, alias = "signups")]
    pub active_ids: Vec<ParticipantId>,
    /// Reserve queue, head first.
    #[serde(default, alias = "reserves")]
    pub reserve_ids: Vec<ParticipantId>,
    /// Declared ready instants.
    #[serde(default, alias = "available_times")]
    pub readiness: BTreeMap<ParticipantId, ReadyAt>,
    /// Selections in record order.
    #[serde(default, alias = "player_roles", with = "ordered_roles")]
    pub roles: Vec<(ParticipantId, RoleSelection)>,
    /// Opaque reference owned by the rendering collaborator (e.g. the board message id).
    #[serde(
        default,
        alias = "signup_message_id",
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub board_ref: Option<String>,
    /// Bumped by every persisted change. Lets late saves be recognised as stale.
    #[serde(default)]
    pub revision: u64,
}

impl PersistentSnapshot {
    /// No roster, readiness or role records. The board reference does not count.
    pub fn is_empty(&self) -> bool {
        self.active_ids.is_empty()
            && self.reserve_ids.is_empty()
            && self.readiness.is_empty()
            && self.roles.is_empty()
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    }))
}

/// (De)serializes selections as a JSON object while keeping their order.
mod ordered_roles {
    use std::fmt;

    use serde::{
        de::{MapAccess, Visitor},
        ser::SerializeMap,
        Deserializer, Serializer,
    };

    use crate::{participant::ParticipantId, roles::RoleSelection};

    pub fn serialize<S>(
        records: &[(ParticipantId, RoleSelection)],
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(records.len()))?;
        for (id, selection) in records {
            map.serialize_entry(id, selection)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<(ParticipantId, RoleSelection)>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RecordsVisitor;

        impl<'de> Visitor<'de> for RecordsVisitor {
            type Value = Vec<(ParticipantId, RoleSelection)>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of participant id to role selection")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut records = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((id, selection)) = access.next_entry()? {
                    records.push((id, selection));
                }
                Ok(records)
            }
        }

        deserializer.deserialize_map(RecordsVisitor)
    }
}

/// Durable load/save of the lobby.
pub trait StateStore: Send + Sync {
    /// `Ok(None)` when nothing was saved yet.
    fn load(&self) -> anyhow::Result<Option<PersistentSnapshot>>;

    /// Replaces whatever was saved before.
    fn save(&self, snapshot: &PersistentSnapshot) -> anyhow::Result<()>;
}

/// Stores the snapshot as a single JSON file, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// A store backed by `path`. Nothing is touched until the first load or save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The state file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonFileStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn load(&self) -> anyhow::Result<Option<PersistentSnapshot>> {
        if !self.path.exists() {
            info!("no saved state found");
            return Ok(None);
        }
        if !self.path.is_file() {
            bail!("'{}' is not a file", self.path.display());
        }
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("could not read '{}'", self.path.display()))?;
        if contents.trim().is_empty() {
            return Ok(None);
        }
        let snapshot = serde_json::from_str(&contents)
            .with_context(|| format!("'{}' is not a valid lobby state", self.path.display()))?;
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &PersistentSnapshot) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(snapshot).context("serialization failed")?;

        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, json)
            .with_context(|| format!("could not write '{}'", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("could not replace '{}'", self.path.display()))?;
        Ok(())
    }
}

/// Keeps the last saved snapshot in memory. Can be told to fail, to exercise error paths.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    saved: Mutex<Option<PersistentSnapshot>>,
    saves: AtomicUsize,
    failing: AtomicBool,
}

impl InMemoryStore {
    /// Nothing saved yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// As if `snapshot` had been saved by an earlier run.
    pub fn with_snapshot(snapshot: PersistentSnapshot) -> Self {
        Self {
            saved: Mutex::new(Some(snapshot)),
            ..Self::default()
        }
    }

    /// While set, both load and save fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    /// Last saved snapshot.
    pub fn saved(&self) -> Option<PersistentSnapshot> {
        self.saved.lock().expect("poisoned").clone()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }
}

impl StateStore for InMemoryStore {
    fn load(&self) -> anyhow::Result<Option<PersistentSnapshot>> {
        if self.failing.load(Ordering::Relaxed) {
            bail!("store unavailable");
        }
        Ok(self.saved())
    }

    fn save(&self, snapshot: &PersistentSnapshot) -> anyhow::Result<()> {
        if self.failing.load(Ordering::Relaxed) {
            bail!("store unavailable");
        }
        *self.saved.lock().expect("poisoned") = Some(snapshot.clone());
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Live lookup of participants on the platform.
pub trait Directory {
    /// `None` once the platform no longer knows `id`.
    fn resolve(&self, id: ParticipantId) -> Option<Participant>;
}

impl<F> Directory for F
where
    F: Fn(ParticipantId) -> Option<Participant>,
{
    fn resolve(&self, id: ParticipantId) -> Option<Participant> {
        self(id)
    }
}

/// Resolves every id. For shells that have no member list, like the CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenDirectory;

impl Directory for OpenDirectory {
    fn resolve(&self, id: ParticipantId) -> Option<Participant> {
        Some(Participant::new(id, crate::participant::mention(id)))
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::roles::{Position, Team};

    fn sample() -> PersistentSnapshot {
        let mut readiness = BTreeMap::new();
        readiness.insert(ParticipantId(1), ReadyAt(datetime!(2025-02-10 17:00 +13:00)));
        PersistentSnapshot {
            active_ids: vec![ParticipantId(1), ParticipantId(2)],
            reserve_ids: vec![ParticipantId(3)],
            readiness,
            roles: vec![
                (
                    ParticipantId(2),
                    RoleSelection {
                        team: Team::Two,
                        position: Position::Support,
                    },
                ),
                (
                    ParticipantId(1),
                    RoleSelection {
                        team: Team::One,
                        position: Position::Top,
                    },
                ),
            ],
            board_ref: Some("99".to_string()),
            revision: 4,
        }
    }

    #[test]
    fn json_layout() {
        let json: serde_json::Value = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["activeIds"], serde_json::json!([1, 2]));
        assert_eq!(json["readiness"]["1"], "2025-02-10T17:00:00+13:00");
        assert_eq!(json["roles"]["2"]["team"], 2);
        assert_eq!(json["roles"]["2"]["position"], "SUPPORT");
        assert_eq!(json["boardRef"], "99");
    }

    #[test]
    fn roles_keep_record_order_through_json() {
        let text = serde_json::to_string(&sample()).unwrap();
        let back: PersistentSnapshot = serde_json::from_str(&text).unwrap();
        assert_eq!(back.roles[0].0, ParticipantId(2));
        assert_eq!(back, sample());
    }

    #[test]
    fn loads_legacy_bot_state() {
        let legacy = r#"{
            "signup_message_id": 1336930586341937195,
            "signups": [11, 12],
            "reserves": [13],
            "available_times": {"11": "2025-02-10T17:30:00.123456+13:00"},
            "player_roles": {"12": {"team": 1, "position": "JG"}, "11": {"team": 2, "position": "Fill"}}
        }"#;
        let snapshot: PersistentSnapshot = serde_json::from_str(legacy).unwrap();
        assert_eq!(snapshot.active_ids, vec![ParticipantId(11), ParticipantId(12)]);
        assert_eq!(snapshot.reserve_ids, vec![ParticipantId(13)]);
        assert_eq!(snapshot.board_ref.as_deref(), Some("1336930586341937195"));
        assert_eq!(snapshot.roles[0].1.position, Position::Jungle);
        assert_eq!(snapshot.roles[1].1.position, Position::Fill);
        assert_eq!(snapshot.revision, 0);
        assert!(snapshot.readiness.contains_key(&ParticipantId(11)));
    }

    #[test]
    fn json_file_store_round_trips_and_handles_missing_file() {
        let dir = std::env::temp_dir().join(format!("lobby-signup-store-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let store = JsonFileStore::new(dir.join("state.json"));
        let _ = std::fs::remove_file(store.path());

        assert_eq!(store.load().unwrap(), None);
        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), Some(sample()));
        assert!(!store.path().with_extension("tmp").exists());

        std::fs::write(store.path(), "{ not json").unwrap();
        assert!(store.load().is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn in_memory_store_can_fail() {
        let store = InMemoryStore::new();
        store.save(&sample()).unwrap();
        store.set_failing(true);
        assert!(store.save(&PersistentSnapshot::default()).is_err());
        assert!(store.load().is_err());
        store.set_failing(false);
        assert_eq!(store.saved(), Some(sample()));
        assert_eq!(store.save_count(), 1);
    }
}
