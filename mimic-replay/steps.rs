//! Character level sub-steps of `Type` and `Backspace` actions.
//!
//! A run is a finite sequence of buffer mutations. It is consumed one step
//! at a time, cannot be restarted, and is cancelled by dropping it between
//! two steps.

use mimic_core::{
  action::Action,
  position::Position,
};

use crate::buffer::{
  Result,
  TextBuffer,
  TextRange,
};

/// What one sub-step did to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubStep {
  Typed(char),
  Deleted,
}

/// One character typed at `at`, leaving the caret at `next`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keystroke {
  pub at:   Position,
  pub ch:   char,
  pub next: Position,
}

/// The keystrokes that type a text starting at a position.
#[derive(Debug, Clone)]
pub struct TypeSteps {
  chars: Vec<char>,
  idx:   usize,
  at:    Position,
}

impl TypeSteps {
  pub fn new(text: &str, start: Position) -> Self {
    Self {
      chars: text.chars().collect(),
      idx:   0,
      at:    start,
    }
  }

  pub fn remaining(&self) -> usize {
    self.chars.len() - self.idx
  }
}

impl Iterator for TypeSteps {
  type Item = Keystroke;

  fn next(&mut self) -> Option<Keystroke> {
    let ch = *self.chars.get(self.idx)?;
    self.idx += 1;
    let at = self.at;
    self.at = at.step(ch);
    Some(Keystroke {
      at,
      ch,
      next: self.at,
    })
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    (self.remaining(), Some(self.remaining()))
  }
}

impl ExactSizeIterator for TypeSteps {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackspaceMode {
  /// Eat the selection from its start.
  Selection,
  /// Delete the character before the caret.
  Backward,
}

/// Deletes up to `count` characters one at a time. A run that starts on a
/// selection only ever deletes inside it and ends once it is empty.
#[derive(Debug, Clone)]
pub struct BackspaceSteps {
  remaining: usize,
  mode:      BackspaceMode,
}

impl BackspaceSteps {
  pub fn new<B: TextBuffer + ?Sized>(count: usize, buffer: &B) -> Result<Self> {
    let mode = if buffer.selection()?.is_empty() {
      BackspaceMode::Backward
    } else {
      BackspaceMode::Selection
    };
    Ok(Self {
      remaining: count,
      mode,
    })
  }

  pub fn remaining(&self) -> usize {
    self.remaining
  }

  pub fn step<B: TextBuffer + ?Sized>(&mut self, buffer: &mut B) -> Result<Option<SubStep>> {
    if self.remaining == 0 {
      return Ok(None);
    }

    let deleted = match self.mode {
      BackspaceMode::Selection => {
        let selection = buffer.selection()?.normalized();
        if !selection.is_empty() {
          delete_selection_start(buffer, selection)?;
        }
        !selection.is_empty()
      },
      BackspaceMode::Backward => delete_backward(buffer)?,
    };

    if !deleted {
      self.remaining = 0;
      return Ok(None);
    }
    self.remaining -= 1;
    Ok(Some(SubStep::Deleted))
  }
}

/// Removes the first character of a non-empty `selection`.
fn delete_selection_start<B: TextBuffer + ?Sized>(buffer: &mut B, selection: TextRange) -> Result<()> {
  let start = selection.start;
  let max_column = buffer.line_max_column(start.line)?;
  let joins_lines = start.column >= max_column;
  let one_past = if joins_lines {
    Position::new(start.line + 1, 1)
  } else {
    Position::new(start.line, start.column + 1)
  };
  buffer.apply_edit(TextRange::new(start, one_past), "")?;

  let end = selection.end;
  let end = if joins_lines {
    if end.line == start.line + 1 {
      Position::new(start.line, start.column + end.column - 1)
    } else {
      Position::new(end.line - 1, end.column)
    }
  } else if end.line == start.line {
    Position::new(end.line, end.column - 1)
  } else {
    end
  };

  if end == start {
    buffer.set_cursor(start)
  } else {
    buffer.set_selection(TextRange::new(start, end))
  }
}

/// Removes the character before the caret. Returns `false` at the start of
/// the document.
fn delete_backward<B: TextBuffer + ?Sized>(buffer: &mut B) -> Result<bool> {
  let cursor = buffer.cursor()?;
  let prev = if cursor.column > 1 {
    Position::new(cursor.line, cursor.column - 1)
  } else if cursor.line > 1 {
    Position::new(cursor.line - 1, buffer.line_max_column(cursor.line - 1)?)
  } else {
    return Ok(false);
  };
  buffer.apply_edit(TextRange::new(prev, cursor), "")?;
  buffer.set_cursor(prev)?;
  Ok(true)
}

/// An in-flight character level action.
#[derive(Debug, Clone)]
pub enum ActionRun {
  Type(TypeSteps),
  Backspace(BackspaceSteps),
}

impl ActionRun {
  /// Starts the sub-steps of `action`, or `None` when the action is applied
  /// in one go.
  pub fn start<B: TextBuffer + ?Sized>(action: &Action, buffer: &B) -> Result<Option<Self>> {
    let run = match action {
      Action::Type { text, .. } => Self::Type(TypeSteps::new(text, buffer.cursor()?)),
      Action::Backspace { count, .. } => Self::Backspace(BackspaceSteps::new(*count, buffer)?),
      _ => return Ok(None),
    };
    Ok(Some(run))
  }

  /// Applies the next sub-step. `None` once the action is done.
  pub fn step<B: TextBuffer + ?Sized>(&mut self, buffer: &mut B) -> Result<Option<SubStep>> {
    match self {
      Self::Type(keys) => {
        let Some(key) = keys.next() else {
          return Ok(None);
        };
        let mut utf8 = [0; 4];
        buffer.apply_edit(TextRange::point(key.at), key.ch.encode_utf8(&mut utf8))?;
        buffer.set_cursor(key.next)?;
        Ok(Some(SubStep::Typed(key.ch)))
      },
      Self::Backspace(steps) => steps.step(buffer),
    }
  }

  pub fn remaining(&self) -> usize {
    match self {
      Self::Type(keys) => keys.remaining(),
      Self::Backspace(steps) => steps.remaining(),
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::buffer::RopeBuffer;

  fn pos(line: usize, column: usize) -> Position {
    Position::new(line, column)
  }

  fn run_to_end(run: &mut ActionRun, buffer: &mut RopeBuffer) -> usize {
    let mut steps = 0;
    while run.step(buffer).unwrap().is_some() {
      steps += 1;
    }
    steps
  }

  #[test]
  fn type_steps_track_lines() {
    let keys: Vec<_> = TypeSteps::new("a\nb", pos(2, 3)).collect();
    assert_eq!(
      keys,
      [
        Keystroke {
          at:   pos(2, 3),
          ch:   'a',
          next: pos(2, 4),
        },
        Keystroke {
          at:   pos(2, 4),
          ch:   '\n',
          next: pos(3, 1),
        },
        Keystroke {
          at:   pos(3, 1),
          ch:   'b',
          next: pos(3, 2),
        },
      ]
    );
  }

  #[test]
  fn typing_inserts_at_the_caret() {
    let mut buffer = RopeBuffer::new("ad");
    buffer.set_cursor(pos(1, 2)).unwrap();
    let mut run = ActionRun::start(&Action::type_text("b\nc", 0), &buffer)
      .unwrap()
      .unwrap();
    assert_eq!(run.remaining(), 3);
    assert_eq!(run.step(&mut buffer).unwrap(), Some(SubStep::Typed('b')));
    assert_eq!(buffer.text().unwrap(), "abd");
    assert_eq!(run_to_end(&mut run, &mut buffer), 2);
    assert_eq!(buffer.text().unwrap(), "ab\ncd");
    assert_eq!(buffer.cursor(), Ok(pos(2, 2)));
  }

  #[test]
  fn backspace_eats_the_selection() {
    let mut buffer = RopeBuffer::new("ab\ncd\nef");
    buffer
      .set_selection(TextRange::new(pos(1, 2), pos(3, 2)))
      .unwrap();
    let mut run = ActionRun::start(&Action::backspace(6, 0), &buffer)
      .unwrap()
      .unwrap();

    run.step(&mut buffer).unwrap();
    assert_eq!(buffer.text().unwrap(), "a\ncd\nef");
    assert_eq!(
      buffer.selection(),
      Ok(TextRange::new(pos(1, 2), pos(3, 2)))
    );

    // the line break: line 2 merges into line 1
    run.step(&mut buffer).unwrap();
    assert_eq!(buffer.text().unwrap(), "acd\nef");
    assert_eq!(
      buffer.selection(),
      Ok(TextRange::new(pos(1, 2), pos(2, 2)))
    );

    assert_eq!(run_to_end(&mut run, &mut buffer), 4);
    assert_eq!(buffer.text().unwrap(), "af");
    assert_eq!(buffer.selection(), Ok(TextRange::point(pos(1, 2))));
  }

  #[test]
  fn backspace_never_leaves_the_selection() {
    let mut buffer = RopeBuffer::new("abXY");
    buffer
      .set_selection(TextRange::new(pos(1, 3), pos(1, 5)))
      .unwrap();
    let mut run = ActionRun::start(&Action::backspace(3, 0), &buffer)
      .unwrap()
      .unwrap();
    assert_eq!(run_to_end(&mut run, &mut buffer), 2);
    assert_eq!(buffer.text().unwrap(), "ab");
    assert_eq!(buffer.cursor(), Ok(pos(1, 3)));
    assert_eq!(run.remaining(), 0);
  }

  #[test]
  fn backspace_on_a_line_break_keeps_end_column() {
    let mut buffer = RopeBuffer::new("ab\ncdef");
    buffer
      .set_selection(TextRange::new(pos(1, 3), pos(2, 3)))
      .unwrap();
    let mut steps = BackspaceSteps::new(3, &buffer).unwrap();
    steps.step(&mut buffer).unwrap();
    assert_eq!(buffer.text().unwrap(), "abcdef");
    assert_eq!(
      buffer.selection(),
      Ok(TextRange::new(pos(1, 3), pos(1, 5)))
    );
  }

  #[test]
  fn backspace_without_selection_goes_backward() {
    let mut buffer = RopeBuffer::new("ab\ncd");
    buffer.set_cursor(pos(2, 2)).unwrap();
    let mut run = ActionRun::start(&Action::backspace(3, 0), &buffer)
      .unwrap()
      .unwrap();
    assert_eq!(run_to_end(&mut run, &mut buffer), 3);
    assert_eq!(buffer.text().unwrap(), "ad");
    assert_eq!(buffer.cursor(), Ok(pos(1, 2)));
  }

  #[test]
  fn backspace_stops_at_document_start() {
    let mut buffer = RopeBuffer::new("ab");
    buffer.set_cursor(pos(1, 2)).unwrap();
    let mut run = ActionRun::start(&Action::backspace(5, 0), &buffer)
      .unwrap()
      .unwrap();
    assert_eq!(run_to_end(&mut run, &mut buffer), 1);
    assert_eq!(buffer.text().unwrap(), "b");
    assert_eq!(run.remaining(), 0);
  }

  #[test]
  fn coarse_actions_have_no_run() {
    let buffer = RopeBuffer::new("");
    assert!(
      ActionRun::start(&Action::scroll(1, 0), &buffer)
        .unwrap()
        .is_none()
    );
  }

  #[test]
  fn dropping_a_run_cancels_it() {
    let mut buffer = RopeBuffer::new("");
    let mut run = ActionRun::start(&Action::type_text("abc", 0), &buffer)
      .unwrap()
      .unwrap();
    run.step(&mut buffer).unwrap();
    drop(run);
    assert_eq!(buffer.text().unwrap(), "a");
  }
}
