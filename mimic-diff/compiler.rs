//! Compiles a diff segment list into ghost actions.
//!
//! The compiler keeps one running cursor in *new* document coordinates. Text
//! before the cursor has already been transformed; text after it is still
//! the old content. Equal segments move the cursor, deletions leave it in
//! place and insertions move it past the typed text.

use mimic_core::{
  action::Action,
  config::TimingConfig,
  position::Position,
  segment::{
    DiffSegment,
    Operation,
  },
  stats::ChangeStats,
};

use crate::{
  segment::diff_semantic,
  stats::stats_for_segments,
};

/// Actions and statistics compiled from the same segment list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compilation {
  pub actions: Vec<Action>,
  pub stats:   ChangeStats,
}

#[derive(Debug)]
pub struct Compiler<'a> {
  timing:    &'a TimingConfig,
  cursor:    Position,
  needs_nav: bool,
  actions:   Vec<Action>,
}

impl<'a> Compiler<'a> {
  pub fn new(timing: &'a TimingConfig) -> Self {
    Self {
      timing,
      cursor: Position::START,
      needs_nav: true,
      actions: Vec::new(),
    }
  }

  /// Where the next change would start.
  pub fn cursor(&self) -> Position {
    self.cursor
  }

  pub fn push(&mut self, segment: &DiffSegment) {
    if segment.is_empty() {
      return;
    }

    match segment.operation {
      Operation::Equal => {
        self.cursor = self.cursor.traverse(&segment.text);
        self.needs_nav = true;
      },
      Operation::Delete => {
        self.navigate();
        let end = self.cursor.traverse(&segment.text);
        let count = segment.len_chars();
        self
          .actions
          .push(Action::select(self.cursor, end, self.timing.select_ms));
        self.actions.push(Action::backspace(
          count,
          self.timing.backspace_ms_per_char * count as u64,
        ));
      },
      Operation::Insert => {
        self.navigate();
        for chunk in type_chunks(&segment.text) {
          let delay = self.timing.typing_ms_per_char * chunk.chars().count() as u64;
          self.actions.push(Action::type_text(chunk, delay));
        }
        self.cursor = self.cursor.traverse(&segment.text);
      },
    }
  }

  fn navigate(&mut self) {
    if !self.needs_nav {
      return;
    }
    self
      .actions
      .push(Action::scroll(self.cursor.line, self.timing.scroll_ms));
    self
      .actions
      .push(Action::move_cursor(self.cursor, self.timing.cursor_move_ms));
    self.needs_nav = false;
  }

  pub fn finish(self) -> Vec<Action> {
    self.actions
  }
}

/// Splits typed text into one chunk per visual line.
///
/// Every chunk but the last keeps its `\n`. Text ending in `\n` yields a
/// trailing empty chunk.
pub fn type_chunks(text: &str) -> impl Iterator<Item = &str> {
  let trailing = text.ends_with('\n').then_some("");
  text.split_inclusive('\n').chain(trailing)
}

pub fn compile_segments(segments: &[DiffSegment], timing: &TimingConfig) -> Vec<Action> {
  let mut compiler = Compiler::new(timing);
  for segment in segments {
    compiler.push(segment);
  }
  let actions = compiler.finish();
  log::debug!(
    "compiled {} segments into {} actions",
    segments.len(),
    actions.len()
  );
  actions
}

/// Diffs `old` against `new` and compiles the result.
pub fn compile(old: &str, new: &str, timing: &TimingConfig) -> Vec<Action> {
  compile_segments(&diff_semantic(old, new), timing)
}

/// Diffs once and derives both the actions and the statistics from that
/// single segment list.
pub fn compile_with_stats(old: &str, new: &str, timing: &TimingConfig) -> Compilation {
  let segments = diff_semantic(old, new);
  Compilation {
    actions: compile_segments(&segments, timing),
    stats:   stats_for_segments(&segments),
  }
}

/// The tracker position after every segment has been walked.
pub fn final_cursor(segments: &[DiffSegment]) -> Position {
  segments
    .iter()
    .filter(|segment| segment.operation != Operation::Delete)
    .fold(Position::START, |pos, segment| pos.traverse(&segment.text))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn timing() -> TimingConfig {
    TimingConfig::default()
  }

  #[test]
  fn replace_within_a_line() {
    let segments = [
      DiffSegment::equal("a\n"),
      DiffSegment::delete("b"),
      DiffSegment::insert("c"),
    ];
    let t = timing();
    assert_eq!(
      compile_segments(&segments, &t),
      vec![
        Action::scroll(2, t.scroll_ms),
        Action::move_cursor(Position::new(2, 1), t.cursor_move_ms),
        Action::select(Position::new(2, 1), Position::new(2, 2), t.select_ms),
        Action::backspace(1, t.backspace_ms_per_char),
        Action::type_text("c", t.typing_ms_per_char),
      ]
    );
  }

  #[test]
  fn compile_runs_the_diff() {
    let t = timing();
    let compilation = compile_with_stats("a\nb", "a\nc", &t);
    assert_eq!(compilation.actions.len(), 5);
    assert_eq!(
      compilation.stats,
      ChangeStats {
        lines_added:   1,
        lines_deleted: 1,
        chars_added:   1,
        chars_deleted: 1,
      }
    );
    assert_eq!(compile("a\nb", "a\nc", &t), compilation.actions);
  }

  #[test]
  fn pure_insertion_navigates_once() {
    let t = timing();
    let segments = [DiffSegment::insert("x\ny")];
    assert_eq!(
      compile_segments(&segments, &t),
      vec![
        Action::scroll(1, t.scroll_ms),
        Action::move_cursor(Position::START, t.cursor_move_ms),
        Action::type_text("x\n", 2 * t.typing_ms_per_char),
        Action::type_text("y", t.typing_ms_per_char),
      ]
    );
    assert_eq!(final_cursor(&segments), Position::new(2, 2));
  }

  #[test]
  fn equal_segments_renavigate() {
    let t = timing();
    let segments = [
      DiffSegment::insert("x"),
      DiffSegment::equal("abc\n"),
      DiffSegment::insert("y"),
    ];
    let actions = compile_segments(&segments, &t);
    assert_eq!(actions[3], Action::scroll(2, t.scroll_ms));
    assert_eq!(
      actions[4],
      Action::move_cursor(Position::new(2, 1), t.cursor_move_ms)
    );
  }

  #[test]
  fn delete_keeps_cursor() {
    let t = timing();
    let segments = [
      DiffSegment::delete("one\ntwo"),
      DiffSegment::equal("!"),
      DiffSegment::delete("x"),
    ];
    let actions = compile_segments(&segments, &t);
    assert_eq!(
      actions[2],
      Action::select(Position::START, Position::new(2, 4), t.select_ms)
    );
    assert_eq!(actions[3], Action::backspace(7, 7 * t.backspace_ms_per_char));
    // after the deletion "!" sits at 1:1
    assert_eq!(actions[5], Action::move_cursor(Position::new(1, 2), t.cursor_move_ms));
  }

  #[test]
  fn empty_segments_emit_nothing() {
    let segments = [
      DiffSegment::insert(""),
      DiffSegment::delete(""),
      DiffSegment::equal(""),
    ];
    assert!(compile_segments(&segments, &timing()).is_empty());
  }

  #[test]
  fn consecutive_equals() {
    let t = timing();
    let segments = [
      DiffSegment::equal("a"),
      DiffSegment::equal("b\n"),
      DiffSegment::insert("c"),
    ];
    let actions = compile_segments(&segments, &t);
    assert_eq!(actions[1], Action::move_cursor(Position::new(2, 1), t.cursor_move_ms));
  }

  #[test]
  fn trailing_newline_chunk() {
    assert_eq!(type_chunks("a\nb\n").collect::<Vec<_>>(), ["a\n", "b\n", ""]);
    assert_eq!(type_chunks("\n").collect::<Vec<_>>(), ["\n", ""]);
    assert_eq!(type_chunks("ab").collect::<Vec<_>>(), ["ab"]);
    assert_eq!(type_chunks("").count(), 0);
  }

  #[test]
  fn typing_delay_counts_chars() {
    let t = timing();
    let actions = compile_segments(&[DiffSegment::insert("héé")], &t);
    assert_eq!(actions[2].delay_ms(), 3 * t.typing_ms_per_char);
  }
}
