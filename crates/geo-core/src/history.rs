use std::collections::HashMap;

use crate::config::HistoryConfig;
use crate::constants::HISTORY_STORAGE_KEY;
use crate::error::Result;
use crate::pose::GeospatialPose;
use crate::quaternion::Quaternion;
use crate::serde_compat::{decode_history, encode_history};

/// Record of one placed anchor, enough to place it again later.
#[derive(Clone, Debug, PartialEq)]
pub struct AnchorHistoryEntry {
    /// Unix seconds.
    pub created_at: u64,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    /// Degrees. Only consulted when `eun_rotation` is identity.
    pub heading: f64,
    pub eun_rotation: Quaternion,
}

impl AnchorHistoryEntry {
    pub fn from_pose(pose: &GeospatialPose, created_at: u64) -> Self {
        Self {
            created_at,
            latitude: pose.latitude,
            longitude: pose.longitude,
            altitude: pose.altitude,
            heading: 0.0,
            eun_rotation: pose.eun_rotation,
        }
    }

    /// Stored rotation, or the heading-derived one for records that predate
    /// stored rotations.
    pub fn effective_rotation(&self) -> Quaternion {
        if self.eun_rotation.is_identity() {
            Quaternion::from_legacy_heading(self.heading)
        } else {
            self.eun_rotation
        }
    }
}

/// Recency-bounded list of history entries.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnchorHistoryCollection {
    entries: Vec<AnchorHistoryEntry>,
}

impl AnchorHistoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<AnchorHistoryEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[AnchorHistoryEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnchorHistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn append(&mut self, entry: AnchorHistoryEntry) {
        self.entries.push(entry);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop entries at least `max_age_secs` old at `now`. Entries stamped in
    /// the future are kept. Returns the number removed.
    pub fn prune_older_than(&mut self, now: u64, max_age_secs: u64) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|e| now.saturating_sub(e.created_at) < max_age_secs);
        before - self.entries.len()
    }

    /// Newest first, then keep at most `capacity`. Equal timestamps keep
    /// their insertion order.
    pub fn sort_and_truncate(&mut self, capacity: usize) {
        self.entries
            .sort_by(|left, right| right.created_at.cmp(&left.created_at));
        self.entries.truncate(capacity);
    }
}

/// String key/value persistence, one value per key.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// In-process store, used by tests and the simulator.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `set` calls.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.writes += 1;
        Ok(())
    }
}

/// Owns the persisted anchor history and its in-memory copy.
pub struct AnchorHistoryStore<K> {
    backend: K,
    config: HistoryConfig,
    collection: AnchorHistoryCollection,
    /// Entries as loaded, pending their one replay.
    replay: Option<Vec<AnchorHistoryEntry>>,
}

impl<K: KeyValueStore> AnchorHistoryStore<K> {
    pub fn new(backend: K, config: HistoryConfig) -> Self {
        Self {
            backend,
            config,
            collection: AnchorHistoryCollection::new(),
            replay: None,
        }
    }

    /// Read persisted history, purge stale entries and write the pruned
    /// result back. Absent or unreadable data yields an empty collection.
    ///
    /// Arms the one-shot replay with a snapshot of what survives. Entries
    /// appended later in the session are not part of it.
    pub fn load(&mut self, now: u64) -> &AnchorHistoryCollection {
        let stored = match self.backend.get(HISTORY_STORAGE_KEY) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!("failed to read anchor history: {e}");
                None
            }
        };

        self.collection = match stored {
            None => AnchorHistoryCollection::new(),
            Some(json) => {
                let mut collection = decode_history(&json).unwrap_or_else(|e| {
                    tracing::warn!("discarding unreadable anchor history: {e}");
                    AnchorHistoryCollection::new()
                });
                let purged = collection.prune_older_than(now, self.config.max_age_secs);
                if purged > 0 {
                    tracing::info!("purged {purged} expired history record(s)");
                }
                if let Err(e) = self.persist(&collection) {
                    tracing::warn!("failed to persist pruned anchor history: {e}");
                }
                collection
            }
        };

        self.replay = (!self.collection.is_empty()).then(|| self.collection.entries().to_vec());
        tracing::debug!(
            "loaded {} history record(s), replay armed: {}",
            self.collection.len(),
            self.replay.is_some()
        );
        &self.collection
    }

    /// Add to the in-memory collection. Nothing is written until `save`.
    pub fn append(&mut self, entry: AnchorHistoryEntry) {
        self.collection.append(entry);
    }

    /// Sort newest first, cap to capacity, persist.
    pub fn save(&mut self) -> Result<()> {
        self.collection.sort_and_truncate(self.config.capacity);
        let json = encode_history(&self.collection)?;
        self.backend.set(HISTORY_STORAGE_KEY, &json)
    }

    /// Forget every record and persist the empty collection. A pending
    /// replay is dropped with them.
    pub fn clear(&mut self) -> Result<()> {
        self.collection.clear();
        self.replay = None;
        self.save()
    }

    /// Run `place` for every entry retained by `load`, in stored order, once
    /// per session. Returns `None` when replay already ran or nothing was
    /// loaded.
    pub fn replay_all<F>(&mut self, mut place: F) -> Option<usize>
    where
        F: FnMut(&AnchorHistoryEntry),
    {
        let entries = self.replay.take()?;
        for entry in &entries {
            place(entry);
        }
        Some(entries.len())
    }

    pub fn should_replay(&self) -> bool {
        self.replay.is_some()
    }

    pub fn collection(&self) -> &AnchorHistoryCollection {
        &self.collection
    }

    pub fn backend(&self) -> &K {
        &self.backend
    }

    pub fn into_backend(self) -> K {
        self.backend
    }

    fn persist(&mut self, collection: &AnchorHistoryCollection) -> Result<()> {
        let json = encode_history(collection)?;
        self.backend.set(HISTORY_STORAGE_KEY, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_771_632_000;
    const HOUR: u64 = 3600;

    fn entry(created_at: u64, latitude: f64) -> AnchorHistoryEntry {
        AnchorHistoryEntry {
            created_at,
            latitude,
            longitude: 10.0,
            altitude: 5.0,
            heading: 0.0,
            eun_rotation: Quaternion::from_axis_angle([0.0, 1.0, 0.0], 45.0),
        }
    }

    fn store() -> AnchorHistoryStore<MemoryStore> {
        AnchorHistoryStore::new(MemoryStore::new(), HistoryConfig::default())
    }

    fn stored_json(store: &AnchorHistoryStore<MemoryStore>) -> String {
        store.backend().get(HISTORY_STORAGE_KEY).unwrap().unwrap()
    }

    #[test]
    fn test_load_absent_is_empty_and_not_replayed() {
        let mut s = store();
        assert!(s.load(NOW).is_empty());
        assert!(!s.should_replay());
        assert_eq!(s.backend().writes(), 0);
    }

    #[test]
    fn test_load_malformed_fails_soft() {
        let mut backend = MemoryStore::new();
        backend.set(HISTORY_STORAGE_KEY, "{{{ nope").unwrap();
        let mut s = AnchorHistoryStore::new(backend, HistoryConfig::default());
        assert!(s.load(NOW).is_empty());
        assert_eq!(stored_json(&s), r#"{"Collection":[]}"#);
    }

    #[test]
    fn test_save_caps_and_sorts_descending() {
        let mut s = store();
        for i in 0..8 {
            s.append(entry(NOW + i * 10, i as f64));
        }
        s.save().unwrap();

        let saved = s.collection();
        assert_eq!(saved.len(), 5);
        let times: Vec<u64> = saved.iter().map(|e| e.created_at).collect();
        assert_eq!(times, vec![NOW + 70, NOW + 60, NOW + 50, NOW + 40, NOW + 30]);
        assert!(times.windows(2).all(|w| w[0] > w[1]));

        let reloaded = decode_history(&stored_json(&s)).unwrap();
        assert_eq!(&reloaded, saved);
    }

    #[test]
    fn test_save_is_idempotent() {
        let mut s = store();
        s.append(entry(NOW - 5, 1.0));
        s.append(entry(NOW, 2.0));
        s.save().unwrap();
        let first = stored_json(&s);
        s.save().unwrap();
        assert_eq!(stored_json(&s), first);
    }

    #[test]
    fn test_load_prunes_expired_and_repersists() {
        let mut s = store();
        s.append(entry(NOW - 25 * HOUR, 1.0));
        s.append(entry(NOW - 23 * HOUR, 2.0));
        s.append(entry(NOW - 24 * HOUR, 3.0));
        s.save().unwrap();

        let mut reopened = AnchorHistoryStore::new(s.into_backend(), HistoryConfig::default());
        let loaded = reopened.load(NOW);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.entries()[0].latitude, 2.0);

        let persisted = decode_history(&stored_json(&reopened)).unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted.entries()[0].created_at, NOW - 23 * HOUR);
    }

    #[test]
    fn test_prune_happens_before_capacity() {
        let mut c = AnchorHistoryCollection::new();
        for i in 0..5 {
            c.append(entry(NOW - 30 * HOUR + i, 0.0));
        }
        c.append(entry(NOW - HOUR, 9.0));
        assert_eq!(c.prune_older_than(NOW, 24 * HOUR), 5);
        c.sort_and_truncate(5);
        assert_eq!(c.len(), 1);
        assert_eq!(c.entries()[0].latitude, 9.0);
    }

    #[test]
    fn test_future_entries_survive_prune() {
        let mut c = AnchorHistoryCollection::from_entries(vec![entry(NOW + HOUR, 0.0)]);
        assert_eq!(c.prune_older_than(NOW, 24 * HOUR), 0);
    }

    #[test]
    fn test_replay_is_one_shot_and_ordered() {
        let mut s = store();
        s.append(entry(NOW - 2, 1.0));
        s.append(entry(NOW - 1, 2.0));
        s.save().unwrap();
        let mut s = AnchorHistoryStore::new(s.into_backend(), HistoryConfig::default());
        s.load(NOW);
        assert!(s.should_replay());

        let mut seen = Vec::new();
        assert_eq!(s.replay_all(|e| seen.push(e.latitude)), Some(2));
        assert_eq!(seen, vec![2.0, 1.0]);
        assert_eq!(s.replay_all(|e| seen.push(e.latitude)), None);
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_replay_skips_entries_appended_after_load() {
        let mut s = store();
        s.append(entry(NOW - 10, 1.0));
        s.save().unwrap();
        let mut s = AnchorHistoryStore::new(s.into_backend(), HistoryConfig::default());
        s.load(NOW);

        s.append(entry(NOW, 2.0));
        s.save().unwrap();
        assert_eq!(s.collection().len(), 2);

        let mut seen = Vec::new();
        assert_eq!(s.replay_all(|e| seen.push(e.latitude)), Some(1));
        assert_eq!(seen, vec![1.0]);
    }

    #[test]
    fn test_clear_disarms_replay() {
        let mut s = store();
        s.append(entry(NOW - 10, 1.0));
        s.save().unwrap();
        let mut s = AnchorHistoryStore::new(s.into_backend(), HistoryConfig::default());
        s.load(NOW);
        assert!(s.should_replay());

        s.clear().unwrap();
        assert!(!s.should_replay());
        assert_eq!(s.replay_all(|_| panic!("nothing to replay")), None);
    }

    #[test]
    fn test_clear_persists_empty() {
        let mut s = store();
        s.append(entry(NOW, 1.0));
        s.save().unwrap();
        s.clear().unwrap();
        assert!(s.collection().is_empty());
        assert_eq!(stored_json(&s), r#"{"Collection":[]}"#);
    }

    #[test]
    fn test_effective_rotation_prefers_stored() {
        let e = entry(NOW, 0.0);
        assert_eq!(e.effective_rotation(), e.eun_rotation);
    }
}
