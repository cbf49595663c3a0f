//! Added/deleted line and character counts.

use mimic_core::{
  segment::{
    DiffSegment,
    Operation,
  },
  stats::ChangeStats,
};

use crate::segment::diff_semantic;

/// Counts changes on one side of the diff.
///
/// Every line break inside a changed segment is one changed line. A changed
/// segment without line breaks edits inside an existing line and counts as
/// one line, once per line no matter how many fragments touch it.
#[derive(Debug, Default)]
struct SideCounter {
  line:         usize,
  last_counted: Option<usize>,
  lines:        usize,
  chars:        usize,
}

impl SideCounter {
  fn new() -> Self {
    Self {
      line: 1,
      ..Self::default()
    }
  }

  fn skip(&mut self, text: &str) {
    self.line += line_breaks(text);
  }

  fn change(&mut self, text: &str) {
    let breaks = line_breaks(text);
    self.chars += text.chars().count();
    if breaks > 0 {
      self.lines += breaks;
    } else if self.last_counted != Some(self.line) {
      self.lines += 1;
      self.last_counted = Some(self.line);
    }
    self.line += breaks;
  }
}

#[inline]
fn line_breaks(text: &str) -> usize {
  text.bytes().filter(|&b| b == b'\n').count()
}

/// Statistics for a segment list. Pass the same list the actions were
/// compiled from.
pub fn stats_for_segments(segments: &[DiffSegment]) -> ChangeStats {
  let mut old = SideCounter::new();
  let mut new = SideCounter::new();

  for segment in segments.iter().filter(|segment| !segment.is_empty()) {
    match segment.operation {
      Operation::Equal => {
        old.skip(&segment.text);
        new.skip(&segment.text);
      },
      Operation::Delete => old.change(&segment.text),
      Operation::Insert => new.change(&segment.text),
    }
  }

  ChangeStats {
    lines_added:   new.lines,
    lines_deleted: old.lines,
    chars_added:   new.chars,
    chars_deleted: old.chars,
  }
}

pub fn calculate_stats(old: &str, new: &str) -> ChangeStats {
  stats_for_segments(&diff_semantic(old, new))
}
