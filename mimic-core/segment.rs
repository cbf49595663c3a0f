use serde::{
  Deserialize,
  Serialize,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
  Equal,
  Insert,
  Delete,
}

/// One piece of an old → new transformation.
///
/// A well formed segment list reconstructs the old text from its `Equal` and
/// `Delete` segments and the new text from its `Equal` and `Insert` segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiffSegment {
  pub operation: Operation,
  pub text:      String,
}

impl DiffSegment {
  pub fn new(operation: Operation, text: impl Into<String>) -> Self {
    Self {
      operation,
      text: text.into(),
    }
  }

  pub fn equal(text: impl Into<String>) -> Self {
    Self::new(Operation::Equal, text)
  }

  pub fn insert(text: impl Into<String>) -> Self {
    Self::new(Operation::Insert, text)
  }

  pub fn delete(text: impl Into<String>) -> Self {
    Self::new(Operation::Delete, text)
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.text.is_empty()
  }

  /// Length in chars.
  #[inline]
  pub fn len_chars(&self) -> usize {
    self.text.chars().count()
  }
}

/// Rebuilds the old text described by `segments`.
pub fn old_text(segments: &[DiffSegment]) -> String {
  segments
    .iter()
    .filter(|segment| segment.operation != Operation::Insert)
    .map(|segment| segment.text.as_str())
    .collect()
}

/// Rebuilds the new text described by `segments`.
pub fn new_text(segments: &[DiffSegment]) -> String {
  segments
    .iter()
    .filter(|segment| segment.operation != Operation::Delete)
    .map(|segment| segment.text.as_str())
    .collect()
}
