//! Primitive replay instructions ("ghost actions").
//!
//! An ordered list of [`Action`]s, applied in order to a buffer holding the
//! old content of a file, reproduces the new content exactly. The `delay_ms`
//! carried by each action is advisory pacing metadata and plays no part in
//! that contract.

use std::fmt;

use serde::{
  Deserialize,
  Serialize,
};

use crate::position::Position;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Action {
  /// Bring `line` into view.
  Scroll {
    line:     usize,
    #[serde(default)]
    delay_ms: u64,
  },
  /// Place the caret, collapsing any selection.
  MoveCursor {
    line:     usize,
    column:   usize,
    #[serde(default)]
    delay_ms: u64,
  },
  /// Select the text between two positions.
  Select {
    start_line:   usize,
    start_column: usize,
    end_line:     usize,
    end_column:   usize,
    #[serde(default)]
    delay_ms:     u64,
  },
  /// Delete `count` characters: from the selection when there is one,
  /// otherwise backwards from the caret.
  Backspace {
    count:    usize,
    #[serde(default)]
    delay_ms: u64,
  },
  /// Type `text` at the caret.
  Type {
    text:     String,
    #[serde(default)]
    delay_ms: u64,
  },
}

impl Action {
  pub fn scroll(line: usize, delay_ms: u64) -> Self {
    Self::Scroll { line, delay_ms }
  }

  pub fn move_cursor(pos: Position, delay_ms: u64) -> Self {
    Self::MoveCursor {
      line: pos.line,
      column: pos.column,
      delay_ms,
    }
  }

  pub fn select(start: Position, end: Position, delay_ms: u64) -> Self {
    Self::Select {
      start_line: start.line,
      start_column: start.column,
      end_line: end.line,
      end_column: end.column,
      delay_ms,
    }
  }

  pub fn backspace(count: usize, delay_ms: u64) -> Self {
    Self::Backspace { count, delay_ms }
  }

  pub fn type_text(text: impl Into<String>, delay_ms: u64) -> Self {
    Self::Type {
      text: text.into(),
      delay_ms,
    }
  }

  pub fn delay_ms(&self) -> u64 {
    match self {
      Self::Scroll { delay_ms, .. }
      | Self::MoveCursor { delay_ms, .. }
      | Self::Select { delay_ms, .. }
      | Self::Backspace { delay_ms, .. }
      | Self::Type { delay_ms, .. } => *delay_ms,
    }
  }

  /// The wire name of this action, as used in the `type` tag.
  pub fn name(&self) -> &'static str {
    match self {
      Self::Scroll { .. } => "scroll",
      Self::MoveCursor { .. } => "moveCursor",
      Self::Select { .. } => "select",
      Self::Backspace { .. } => "backspace",
      Self::Type { .. } => "type",
    }
  }

  /// Whether this action is animated one character at a time.
  pub fn is_character_level(&self) -> bool {
    matches!(self, Self::Backspace { .. } | Self::Type { .. })
  }
}

impl fmt::Display for Action {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Scroll { line, .. } => write!(f, "scroll {line}"),
      Self::MoveCursor { line, column, .. } => write!(f, "move-cursor {line}:{column}"),
      Self::Select {
        start_line,
        start_column,
        end_line,
        end_column,
        ..
      } => {
        write!(
          f,
          "select {start_line}:{start_column}-{end_line}:{end_column}"
        )
      },
      Self::Backspace { count, .. } => write!(f, "backspace {count}"),
      Self::Type { text, .. } => write!(f, "type {text:?}"),
    }?;
    write!(f, " ({}ms)", self.delay_ms())
  }
}
