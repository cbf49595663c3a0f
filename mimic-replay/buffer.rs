//! The text buffer the replay engine drives.
//!
//! The engine never assumes a particular editor widget: anything that can
//! implement [`TextBuffer`] can be replayed into. [`RopeBuffer`] is the
//! in-memory implementation used by the command line player and the tests.

use std::{
  cell::RefCell,
  cmp::Ordering,
  rc::{
    Rc,
    Weak,
  },
};

use mimic_core::position::Position;
use ropey::Rope;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
  #[error("text buffer is no longer available")]
  Unavailable,
  #[error("position {line}:{column} is outside the buffer")]
  OutOfRange { line: usize, column: usize },
}

impl BufferError {
  fn out_of_range(pos: Position) -> Self {
    Self::OutOfRange {
      line:   pos.line,
      column: pos.column,
    }
  }
}

pub type Result<T> = std::result::Result<T, BufferError>;

/// A span between two positions. `start` may come after `end`; the range
/// then describes a backwards selection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextRange {
  pub start: Position,
  pub end:   Position,
}

impl TextRange {
  pub const fn new(start: Position, end: Position) -> Self {
    Self { start, end }
  }

  pub const fn point(pos: Position) -> Self {
    Self::new(pos, pos)
  }

  pub fn is_empty(&self) -> bool {
    self.start == self.end
  }

  /// The same range with `start <= end`.
  pub fn normalized(self) -> Self {
    match self.start.cmp(&self.end) {
      Ordering::Greater => Self::new(self.end, self.start),
      _ => self,
    }
  }
}

/// Editor capabilities needed to replay a record.
///
/// Every method may fail with [`BufferError::Unavailable`] once the
/// underlying document is gone.
pub trait TextBuffer {
  fn set_full_text(&mut self, text: &str) -> Result<()>;

  fn text(&self) -> Result<String>;

  fn line_count(&self) -> Result<usize>;

  /// One past the last column of `line`.
  fn line_max_column(&self, line: usize) -> Result<usize>;

  /// The caret, which is the active end of the selection.
  fn cursor(&self) -> Result<Position>;

  /// Moves the caret and collapses the selection.
  fn set_cursor(&mut self, pos: Position) -> Result<()>;

  fn selection(&self) -> Result<TextRange>;

  fn set_selection(&mut self, range: TextRange) -> Result<()>;

  /// Replaces the text in `range` with `text`.
  fn apply_edit(&mut self, range: TextRange, text: &str) -> Result<()>;

  fn reveal_line(&mut self, line: usize) -> Result<()>;

  /// Position after the last character of the document.
  fn end_position(&self) -> Result<Position> {
    let line = self.line_count()?;
    Ok(Position::new(line, self.line_max_column(line)?))
  }
}

impl<B: TextBuffer + ?Sized> TextBuffer for &mut B {
  fn set_full_text(&mut self, text: &str) -> Result<()> {
    (**self).set_full_text(text)
  }

  fn text(&self) -> Result<String> {
    (**self).text()
  }

  fn line_count(&self) -> Result<usize> {
    (**self).line_count()
  }

  fn line_max_column(&self, line: usize) -> Result<usize> {
    (**self).line_max_column(line)
  }

  fn cursor(&self) -> Result<Position> {
    (**self).cursor()
  }

  fn set_cursor(&mut self, pos: Position) -> Result<()> {
    (**self).set_cursor(pos)
  }

  fn selection(&self) -> Result<TextRange> {
    (**self).selection()
  }

  fn set_selection(&mut self, range: TextRange) -> Result<()> {
    (**self).set_selection(range)
  }

  fn apply_edit(&mut self, range: TextRange, text: &str) -> Result<()> {
    (**self).apply_edit(range, text)
  }

  fn reveal_line(&mut self, line: usize) -> Result<()> {
    (**self).reveal_line(line)
  }
}

/// A rope-backed buffer with a single selection.
#[derive(Debug, Clone)]
pub struct RopeBuffer {
  text:          Rope,
  selection:     TextRange,
  revealed_line: usize,
}

impl Default for RopeBuffer {
  fn default() -> Self {
    Self::new("")
  }
}

impl RopeBuffer {
  pub fn new(text: &str) -> Self {
    Self {
      text:          Rope::from_str(text),
      selection:     TextRange::point(Position::START),
      revealed_line: 1,
    }
  }

  pub fn rope(&self) -> &Rope {
    &self.text
  }

  /// The line last brought into view.
  pub fn revealed_line(&self) -> usize {
    self.revealed_line
  }

  fn max_column(&self, line: usize) -> Option<usize> {
    if line == 0 || line > self.text.len_lines() {
      return None;
    }
    let slice = self.text.line(line - 1);
    let mut len = slice.len_chars();
    if len > 0 && slice.char(len - 1) == '\n' {
      len -= 1;
    }
    Some(len + 1)
  }

  fn char_idx(&self, pos: Position) -> Result<usize> {
    match self.max_column(pos.line) {
      Some(max) if (1..=max).contains(&pos.column) => {
        Ok(self.text.line_to_char(pos.line - 1) + pos.column - 1)
      },
      _ => Err(BufferError::out_of_range(pos)),
    }
  }

  fn clamp(&self, pos: Position) -> Position {
    let line = pos.line.clamp(1, self.text.len_lines());
    let max = self.max_column(line).unwrap_or(1);
    Position::new(line, pos.column.clamp(1, max))
  }
}

impl TextBuffer for RopeBuffer {
  fn set_full_text(&mut self, text: &str) -> Result<()> {
    self.text = Rope::from_str(text);
    self.selection = TextRange::point(self.clamp(self.selection.end));
    Ok(())
  }

  fn text(&self) -> Result<String> {
    Ok(self.text.to_string())
  }

  fn line_count(&self) -> Result<usize> {
    Ok(self.text.len_lines())
  }

  fn line_max_column(&self, line: usize) -> Result<usize> {
    self
      .max_column(line)
      .ok_or(BufferError::out_of_range(Position::new(line, 1)))
  }

  fn cursor(&self) -> Result<Position> {
    Ok(self.selection.end)
  }

  fn set_cursor(&mut self, pos: Position) -> Result<()> {
    self.char_idx(pos)?;
    self.selection = TextRange::point(pos);
    Ok(())
  }

  fn selection(&self) -> Result<TextRange> {
    Ok(self.selection)
  }

  fn set_selection(&mut self, range: TextRange) -> Result<()> {
    self.char_idx(range.start)?;
    self.char_idx(range.end)?;
    self.selection = range;
    Ok(())
  }

  fn apply_edit(&mut self, range: TextRange, text: &str) -> Result<()> {
    let range = range.normalized();
    let start = self.char_idx(range.start)?;
    let end = self.char_idx(range.end)?;
    self.text.remove(start..end);
    self.text.insert(start, text);
    self.selection = TextRange::new(
      self.clamp(self.selection.start),
      self.clamp(self.selection.end),
    );
    Ok(())
  }

  fn reveal_line(&mut self, line: usize) -> Result<()> {
    if line == 0 || line > self.text.len_lines() {
      return Err(BufferError::out_of_range(Position::new(line, 1)));
    }
    self.revealed_line = line;
    Ok(())
  }
}

/// An open document that playback can hold a [`DocumentHandle`] to.
///
/// Dropping the document closes it; operations through outstanding handles
/// then fail with [`BufferError::Unavailable`].
#[derive(Debug, Default)]
pub struct Document {
  buffer: Rc<RefCell<RopeBuffer>>,
}

impl Document {
  pub fn new(text: &str) -> Self {
    Self {
      buffer: Rc::new(RefCell::new(RopeBuffer::new(text))),
    }
  }

  pub fn handle(&self) -> DocumentHandle {
    DocumentHandle {
      buffer: Rc::downgrade(&self.buffer),
    }
  }

  pub fn text(&self) -> String {
    self.buffer.borrow().text.to_string()
  }

  pub fn close(self) {}
}

#[derive(Debug, Clone, Default)]
pub struct DocumentHandle {
  buffer: Weak<RefCell<RopeBuffer>>,
}

impl DocumentHandle {
  pub fn is_open(&self) -> bool {
    self.buffer.strong_count() > 0
  }

  fn with<T>(&self, f: impl FnOnce(&RopeBuffer) -> Result<T>) -> Result<T> {
    let buffer = self.buffer.upgrade().ok_or(BufferError::Unavailable)?;
    let buffer = buffer.borrow();
    f(&buffer)
  }

  fn with_mut<T>(&mut self, f: impl FnOnce(&mut RopeBuffer) -> Result<T>) -> Result<T> {
    let buffer = self.buffer.upgrade().ok_or(BufferError::Unavailable)?;
    let mut buffer = buffer.borrow_mut();
    f(&mut buffer)
  }
}

impl TextBuffer for DocumentHandle {
  fn set_full_text(&mut self, text: &str) -> Result<()> {
    self.with_mut(|buffer| buffer.set_full_text(text))
  }

  fn text(&self) -> Result<String> {
    self.with(|buffer| buffer.text())
  }

  fn line_count(&self) -> Result<usize> {
    self.with(|buffer| buffer.line_count())
  }

  fn line_max_column(&self, line: usize) -> Result<usize> {
    self.with(|buffer| buffer.line_max_column(line))
  }

  fn cursor(&self) -> Result<Position> {
    self.with(|buffer| buffer.cursor())
  }

  fn set_cursor(&mut self, pos: Position) -> Result<()> {
    self.with_mut(|buffer| buffer.set_cursor(pos))
  }

  fn selection(&self) -> Result<TextRange> {
    self.with(|buffer| buffer.selection())
  }

  fn set_selection(&mut self, range: TextRange) -> Result<()> {
    self.with_mut(|buffer| buffer.set_selection(range))
  }

  fn apply_edit(&mut self, range: TextRange, text: &str) -> Result<()> {
    self.with_mut(|buffer| buffer.apply_edit(range, text))
  }

  fn reveal_line(&mut self, line: usize) -> Result<()> {
    self.with_mut(|buffer| buffer.reveal_line(line))
  }
}
