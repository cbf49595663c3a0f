use std::fmt;

use serde::{
  Deserialize,
  Serialize,
};

/// A caret location in a text buffer.
/// 1-indexed, like the line/column numbers an editor displays.
///
/// Columns count `char`s. Only `\n` starts a new line; a `\r` before it is an
/// ordinary column character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
  pub line:   usize,
  pub column: usize,
}

impl Default for Position {
  fn default() -> Self {
    Self::START
  }
}

impl Position {
  /// The first column of the first line.
  pub const START: Position = Position { line: 1, column: 1 };

  pub const fn new(line: usize, column: usize) -> Self {
    Self { line, column }
  }

  /// Returns the position reached after `text` is logically inserted at
  /// `self`.
  ///
  /// Single-line text only moves the column. Multi-line text lands on the
  /// last line of `text`, one column past its final character.
  pub fn traverse(self, text: &str) -> Self {
    let mut breaks = 0;
    let mut last_line_len = 0;
    for ch in text.chars() {
      if ch == '\n' {
        breaks += 1;
        last_line_len = 0;
      } else {
        last_line_len += 1;
      }
    }

    if breaks == 0 {
      Self::new(self.line, self.column + last_line_len)
    } else {
      Self::new(self.line + breaks, last_line_len + 1)
    }
  }

  /// The position one character further, given the character at `self`.
  #[inline]
  pub fn step(self, ch: char) -> Self {
    if ch == '\n' {
      Self::new(self.line + 1, 1)
    } else {
      Self::new(self.line, self.column + 1)
    }
  }
}

impl fmt::Display for Position {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.line, self.column)
  }
}

impl From<(usize, usize)> for Position {
  fn from(value: (usize, usize)) -> Self {
    Position::new(value.0, value.1)
  }
}
