//! Builds replay records from a before/after snapshot pair.

use std::time::{
  SystemTime,
  UNIX_EPOCH,
};

use mimic_core::{
  config::TimingConfig,
  record::{
    CaptureSource,
    ChangeKind,
    ReplayRecord,
  },
};
use uuid::Uuid;

use crate::compiler::compile_with_stats;

#[derive(Debug, Clone, Default)]
pub struct RecordBuilder {
  id:             Option<String>,
  timestamp:      Option<u64>,
  file_path:      Option<String>,
  author:         Option<String>,
  agent_name:     Option<String>,
  source:         CaptureSource,
  branch:         Option<String>,
  commit_hash:    Option<String>,
  commit_message: Option<String>,
  timing:         TimingConfig,
}

impl RecordBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn id(mut self, id: impl Into<String>) -> Self {
    self.id = Some(id.into());
    self
  }

  /// Unix time in milliseconds. Defaults to now.
  pub fn timestamp(mut self, timestamp: u64) -> Self {
    self.timestamp = Some(timestamp);
    self
  }

  pub fn file_path(mut self, path: impl Into<String>) -> Self {
    self.file_path = Some(path.into());
    self
  }

  pub fn author(mut self, author: impl Into<String>) -> Self {
    self.author = Some(author.into());
    self
  }

  pub fn agent_name(mut self, name: impl Into<String>) -> Self {
    self.agent_name = Some(name.into());
    self
  }

  pub fn source(mut self, source: CaptureSource) -> Self {
    self.source = source;
    self
  }

  pub fn branch(mut self, branch: impl Into<String>) -> Self {
    self.branch = Some(branch.into());
    self
  }

  pub fn commit(mut self, hash: impl Into<String>, message: impl Into<String>) -> Self {
    self.commit_hash = Some(hash.into());
    self.commit_message = Some(message.into());
    self
  }

  pub fn timing(mut self, timing: TimingConfig) -> Self {
    self.timing = timing;
    self
  }

  pub fn build(self, original: impl Into<String>, new: impl Into<String>) -> ReplayRecord {
    let original = original.into();
    let new = new.into();
    let compilation = compile_with_stats(&original, &new, &self.timing);
    let id = self.id.unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut record = ReplayRecord::new(id, original, new, compilation.actions);
    if let Some(path) = self.file_path {
      record = record.with_file_path(path);
    }
    record.timestamp = self.timestamp.unwrap_or_else(now_millis);
    record.author = self.author;
    record.agent_name = self.agent_name.unwrap_or_default();
    record.source = self.source;
    if let Some(branch) = self.branch {
      record.branch = branch;
    }
    record.commit_hash = self.commit_hash;
    record.commit_message = self.commit_message;
    record.action_type = ChangeKind::classify(&record.original_content, &record.new_content);
    record.stats = compilation.stats;

    log::debug!(
      "captured {} change to '{}': {} actions, {}",
      record.action_type.as_str(),
      record.file_path,
      record.actions.len(),
      record.stats
    );
    record
  }
}

fn now_millis() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|elapsed| elapsed.as_millis() as u64)
    .unwrap_or_default()
}
