//! Replay records ("ghost files"): one captured change of one file.

use std::path::Path;

use serde::{
  Deserialize,
  Serialize,
};

use crate::{
  action::Action,
  stats::ChangeStats,
};

/// File extension used for serialized records.
pub const RECORD_FILE_EXTENSION: &str = "ghost";

/// How a record was captured.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CaptureSource {
  #[default]
  Watch,
  Git,
}

/// What happened to the file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeKind {
  Create,
  #[default]
  Edit,
  Delete,
}

impl ChangeKind {
  pub fn classify(original: &str, new: &str) -> Self {
    match (original.is_empty(), new.is_empty()) {
      (true, _) => Self::Create,
      (false, true) => Self::Delete,
      (false, false) => Self::Edit,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Create => "create",
      Self::Edit => "edit",
      Self::Delete => "delete",
    }
  }
}

/// The unit the replay engine consumes.
///
/// Only `id`, `original_content`, `new_content` and `actions` matter to
/// playback; the remaining fields describe where the change came from.
/// Records are immutable once built; share them behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayRecord {
  pub id:               String,
  #[serde(default)]
  pub timestamp:        u64,
  #[serde(default)]
  pub file_path:        String,
  #[serde(default)]
  pub file_extension:   String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub author:           Option<String>,
  #[serde(default)]
  pub agent_name:       String,
  #[serde(default)]
  pub source:           CaptureSource,
  #[serde(default = "unknown_branch")]
  pub branch:           String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub commit_hash:      Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub commit_message:   Option<String>,
  #[serde(default)]
  pub action_type:      ChangeKind,
  #[serde(default)]
  pub stats:            ChangeStats,
  pub original_content: String,
  pub new_content:      String,
  pub actions:          Vec<Action>,
}

fn unknown_branch() -> String {
  "unknown".to_string()
}

impl ReplayRecord {
  /// A record with only the fields playback needs.
  pub fn new(
    id: impl Into<String>,
    original_content: impl Into<String>,
    new_content: impl Into<String>,
    actions: Vec<Action>,
  ) -> Self {
    let original_content = original_content.into();
    let new_content = new_content.into();
    Self {
      id: id.into(),
      timestamp: 0,
      file_path: String::new(),
      file_extension: String::new(),
      author: None,
      agent_name: String::new(),
      source: CaptureSource::default(),
      branch: unknown_branch(),
      commit_hash: None,
      commit_message: None,
      action_type: ChangeKind::classify(&original_content, &new_content),
      stats: ChangeStats::default(),
      original_content,
      new_content,
      actions,
    }
  }

  pub fn with_file_path(mut self, path: impl Into<String>) -> Self {
    self.file_path = path.into();
    self.file_extension = extension_of(&self.file_path);
    self
  }

  pub fn total_steps(&self) -> usize {
    self.actions.len()
  }

  pub fn summary(&self) -> RecordSummary {
    RecordSummary {
      id:             self.id.clone(),
      timestamp:      self.timestamp,
      file_path:      self.file_path.clone(),
      file_extension: self.file_extension.clone(),
      author:         self.author.clone(),
      agent_name:     self.agent_name.clone(),
      source:         self.source,
      branch:         self.branch.clone(),
      commit_hash:    self.commit_hash.clone(),
      commit_message: self.commit_message.clone(),
      action_type:    self.action_type,
      stats:          self.stats,
    }
  }

  pub fn from_json(json: &str) -> serde_json::Result<Self> {
    serde_json::from_str(json)
  }

  pub fn to_json_pretty(&self) -> serde_json::Result<String> {
    serde_json::to_string_pretty(self)
  }

  /// File name used when the record is written to disk:
  /// `<stem>-<action type>-<id>.ghost`.
  pub fn file_name(&self) -> String {
    let stem = Path::new(&self.file_path)
      .file_stem()
      .and_then(|stem| stem.to_str())
      .filter(|stem| !stem.is_empty())
      .unwrap_or("untitled");
    format!(
      "{stem}-{}-{}.{RECORD_FILE_EXTENSION}",
      self.action_type.as_str(),
      self.id
    )
  }
}

/// Record metadata without contents or actions, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSummary {
  pub id:             String,
  pub timestamp:      u64,
  pub file_path:      String,
  pub file_extension: String,
  pub author:         Option<String>,
  pub agent_name:     String,
  pub source:         CaptureSource,
  pub branch:         String,
  pub commit_hash:    Option<String>,
  pub commit_message: Option<String>,
  pub action_type:    ChangeKind,
  pub stats:          ChangeStats,
}

/// Extension of `path` with a leading dot (`.rs`), or empty.
pub fn extension_of(path: &str) -> String {
  Path::new(path)
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| format!(".{ext}"))
    .unwrap_or_default()
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn classify_change_kind() {
    assert_eq!(ChangeKind::classify("", "x"), ChangeKind::Create);
    assert_eq!(ChangeKind::classify("", ""), ChangeKind::Create);
    assert_eq!(ChangeKind::classify("x", ""), ChangeKind::Delete);
    assert_eq!(ChangeKind::classify("x", "y"), ChangeKind::Edit);
  }

  #[test]
  fn reads_minimal_json() {
    let json = r#"{
      "id": "abc",
      "originalContent": "a\nb",
      "newContent": "a\nc",
      "actions": [
        { "type": "scroll", "line": 2, "delayMs": 100 },
        { "type": "backspace", "count": 1 }
      ]
    }"#;
    let record = ReplayRecord::from_json(json).unwrap();
    assert_eq!(record.id, "abc");
    assert_eq!(record.branch, "unknown");
    assert_eq!(record.total_steps(), 2);
    assert_eq!(record.actions[1], Action::backspace(1, 0));
  }

  #[test]
  fn file_name_and_extension() {
    let record = ReplayRecord::new("42", "", "fn main() {}", Vec::new()).with_file_path("src/main.rs");
    assert_eq!(record.file_extension, ".rs");
    assert_eq!(record.file_name(), "main-create-42.ghost");

    let unnamed = ReplayRecord::new("7", "a", "b", Vec::new());
    assert_eq!(unnamed.file_name(), "untitled-edit-7.ghost");
  }

  #[test]
  fn json_round_trip_keeps_metadata() {
    let mut record = ReplayRecord::new("1", "a", "b", vec![Action::type_text("b", 50)])
      .with_file_path("notes.md");
    record.author = Some("dev".into());
    record.source = CaptureSource::Git;

    let json = record.to_json_pretty().unwrap();
    assert!(json.contains("\"filePath\": \"notes.md\""));
    assert!(json.contains("\"source\": \"git\""));
    assert_eq!(ReplayRecord::from_json(&json).unwrap(), record);
  }
}
