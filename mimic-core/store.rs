//! Seam to the persistence collaborator.

use std::{
  collections::HashMap,
  sync::Arc,
};

use thiserror::Error;

use crate::record::{
  RecordSummary,
  ReplayRecord,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
  #[error("no replay record with id '{0}'")]
  NotFound(String),
}

/// Supplies replay records by id. The replay engine only reads.
pub trait RecordStore {
  fn get(&self, id: &str) -> Option<Arc<ReplayRecord>>;

  /// Stores `record`, returning the record it replaced.
  fn insert(&mut self, record: ReplayRecord) -> Option<Arc<ReplayRecord>>;

  /// Summaries of every stored record, newest first.
  fn list(&self) -> Vec<RecordSummary>;

  fn require(&self, id: &str) -> Result<Arc<ReplayRecord>, StoreError> {
    self.get(id).ok_or_else(|| StoreError::NotFound(id.to_string()))
  }

  /// Resolves `ids` in order, skipping unknown ids.
  fn playlist(&self, ids: &[&str]) -> Vec<Arc<ReplayRecord>> {
    ids
      .iter()
      .filter_map(|id| {
        let record = self.get(id);
        if record.is_none() {
          log::warn!("skipping unknown replay record '{id}'");
        }
        record
      })
      .collect()
  }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
  records: HashMap<String, Arc<ReplayRecord>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }
}

impl RecordStore for MemoryStore {
  fn get(&self, id: &str) -> Option<Arc<ReplayRecord>> {
    self.records.get(id).cloned()
  }

  fn insert(&mut self, record: ReplayRecord) -> Option<Arc<ReplayRecord>> {
    self.records.insert(record.id.clone(), Arc::new(record))
  }

  fn list(&self) -> Vec<RecordSummary> {
    let mut summaries: Vec<_> = self.records.values().map(|record| record.summary()).collect();
    summaries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
    summaries
  }
}

impl FromIterator<ReplayRecord> for MemoryStore {
  fn from_iter<I: IntoIterator<Item = ReplayRecord>>(iter: I) -> Self {
    let mut store = MemoryStore::new();
    for record in iter {
      store.insert(record);
    }
    store
  }
}

#[cfg(test)]
mod test {
  use super::*;

  fn record(id: &str, timestamp: u64) -> ReplayRecord {
    let mut record = ReplayRecord::new(id, "a", "b", Vec::new());
    record.timestamp = timestamp;
    record
  }

  #[test]
  fn get_and_require() {
    let store: MemoryStore = [record("a", 1)].into_iter().collect();
    assert_eq!(store.get("a").unwrap().id, "a");
    assert!(store.get("b").is_none());
    assert_eq!(
      store.require("b").unwrap_err(),
      StoreError::NotFound("b".into())
    );
  }

  #[test]
  fn list_is_newest_first() {
    let store: MemoryStore = [record("old", 1), record("new", 3), record("mid", 2)]
      .into_iter()
      .collect();
    let ids: Vec<_> = store.list().into_iter().map(|summary| summary.id).collect();
    assert_eq!(ids, ["new", "mid", "old"]);
  }

  #[test]
  fn playlist_skips_unknown_ids() {
    let store: MemoryStore = [record("a", 1), record("b", 2)].into_iter().collect();
    let playlist = store.playlist(&["b", "missing", "a"]);
    let ids: Vec<_> = playlist.iter().map(|record| record.id.as_str()).collect();
    assert_eq!(ids, ["b", "a"]);
  }

  #[test]
  fn insert_replaces() {
    let mut store = MemoryStore::new();
    assert!(store.insert(record("a", 1)).is_none());
    assert_eq!(store.insert(record("a", 2)).unwrap().timestamp, 1);
    assert_eq!(store.len(), 1);
  }
}
