//! Applying actions without any pacing.

use mimic_core::action::Action;

use crate::{
  buffer::{
    Result,
    RopeBuffer,
    TextBuffer,
    TextRange,
  },
  steps::ActionRun,
};

/// Applies the coarse part of `action`, or runs every sub-step of a
/// character level action.
pub fn apply_action<B: TextBuffer + ?Sized>(buffer: &mut B, action: &Action) -> Result<()> {
  match *action {
    Action::Scroll { line, .. } => buffer.reveal_line(line),
    Action::MoveCursor { line, column, .. } => {
      let pos = (line, column).into();
      buffer.set_cursor(pos)?;
      buffer.reveal_line(line)
    },
    Action::Select {
      start_line,
      start_column,
      end_line,
      end_column,
      ..
    } => {
      buffer.set_selection(TextRange::new(
        (start_line, start_column).into(),
        (end_line, end_column).into(),
      ))
    },
    Action::Backspace { .. } | Action::Type { .. } => {
      if let Some(mut run) = ActionRun::start(action, buffer)? {
        while run.step(buffer)?.is_some() {}
      }
      Ok(())
    },
  }
}

pub fn apply_actions<B: TextBuffer + ?Sized>(buffer: &mut B, actions: &[Action]) -> Result<()> {
  actions
    .iter()
    .try_for_each(|action| apply_action(buffer, action))
}

/// Replays `actions` over `original` and returns the final text.
pub fn replay_to_string(original: &str, actions: &[Action]) -> Result<String> {
  let mut buffer = RopeBuffer::new(original);
  apply_actions(&mut buffer, actions)?;
  buffer.text()
}

#[cfg(test)]
mod test {
  use mimic_core::{
    config::TimingConfig,
    position::Position,
  };
  use mimic_diff::compile;

  use super::*;

  fn round_trip(old: &str, new: &str) -> String {
    let actions = compile(old, new, &TimingConfig::default());
    replay_to_string(old, &actions).unwrap()
  }

  quickcheck::quickcheck! {
    fn compiled_actions_reproduce_new_text(old: String, new: String) -> bool {
      round_trip(&old, &new) == new
    }

    fn line_based_edits_round_trip(old: Vec<String>, new: Vec<String>) -> bool {
      let old = old.join("\n");
      let new = new.join("\n");
      round_trip(&old, &new) == new
    }
  }

  #[test]
  fn replace_one_line() {
    assert_eq!(round_trip("a\nb", "a\nc"), "a\nc");
  }

  #[test]
  fn insert_into_empty() {
    let actions = compile("", "x\ny", &TimingConfig::default());
    let mut buffer = RopeBuffer::new("");
    apply_actions(&mut buffer, &actions).unwrap();
    assert_eq!(buffer.text().unwrap(), "x\ny");
    assert_eq!(buffer.cursor(), Ok(Position::new(2, 2)));
  }

  #[test]
  fn realistic_edit() {
    let old = "fn main() {\n    println!(\"hello\");\n}\n";
    let new = "use std::io;\n\nfn main() {\n    let name = \"world\";\n    println!(\"hello {name}\");\n}\n";
    assert_eq!(round_trip(old, new), new);
    assert_eq!(round_trip(new, old), old);
  }

  #[test]
  fn crlf_text() {
    assert_eq!(round_trip("a\r\nb\r\n", "a\r\nc\r\nb\r\n"), "a\r\nc\r\nb\r\n");
  }

  #[test]
  fn invalid_positions_are_errors() {
    let mut buffer = RopeBuffer::new("a");
    let err = apply_action(&mut buffer, &Action::move_cursor(Position::new(3, 1), 0));
    assert!(err.is_err());
  }
}
