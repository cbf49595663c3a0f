use std::{
  fmt,
  ops::{
    Add,
    AddAssign,
  },
};

use serde::{
  Deserialize,
  Serialize,
};

/// Added/deleted line and character counts for one captured change.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeStats {
  pub lines_added:   usize,
  pub lines_deleted: usize,
  pub chars_added:   usize,
  pub chars_deleted: usize,
}

impl ChangeStats {
  pub fn is_empty(&self) -> bool {
    *self == Self::default()
  }
}

impl AddAssign for ChangeStats {
  fn add_assign(&mut self, rhs: Self) {
    self.lines_added += rhs.lines_added;
    self.lines_deleted += rhs.lines_deleted;
    self.chars_added += rhs.chars_added;
    self.chars_deleted += rhs.chars_deleted;
  }
}

impl Add for ChangeStats {
  type Output = ChangeStats;

  fn add(mut self, rhs: Self) -> Self::Output {
    self += rhs;
    self
  }
}

impl fmt::Display for ChangeStats {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "+{}/-{} lines, +{}/-{} chars",
      self.lines_added, self.lines_deleted, self.chars_added, self.chars_deleted
    )
  }
}
