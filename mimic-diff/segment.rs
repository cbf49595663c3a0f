//! The diff primitive: turns an (old, new) text pair into ordered
//! [`DiffSegment`]s.
//!
//! Lines are diffed first with the histogram algorithm. Each changed hunk is
//! then refined with a Myers diff over characters (or over word tokens for
//! big hunks) so that edits inside a line come out as small segments.
//! [`cleanup_semantic`] then folds noisy fragments back into readable
//! replacements.

use std::{
  ops::Range,
  time::Instant,
};

use imara_diff::{
  Algorithm,
  Diff,
  Hunk,
  IndentHeuristic,
  IndentLevel,
  InternedInput,
};
use mimic_core::segment::{
  DiffSegment,
  Operation,
};

#[derive(Debug, Clone)]
pub struct DiffOptions {
  pub indent_width:              u8,
  pub max_char_diff_ratio:       usize,
  pub max_char_diff_total_lines: u32,
  pub max_char_diff_total_chars: usize,
  pub word_diff_min_chars:       usize,
}

impl Default for DiffOptions {
  fn default() -> Self {
    const DEFAULT_CHARS_PER_LINE: usize = 200;
    Self {
      indent_width:              4,
      max_char_diff_ratio:       5,
      max_char_diff_total_lines: 200,
      max_char_diff_total_chars: 200 * DEFAULT_CHARS_PER_LINE,
      word_diff_min_chars:       1024,
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TokenClass {
  Whitespace,
  Word,
  Other,
}

fn token_class(ch: char) -> TokenClass {
  if ch.is_whitespace() {
    TokenClass::Whitespace
  } else if ch.is_alphanumeric() || ch == '_' {
    TokenClass::Word
  } else {
    TokenClass::Other
  }
}

/// Splits `text` into runs of same-class characters.
fn tokenize_words(text: &str) -> Vec<&str> {
  let mut tokens = Vec::new();
  let mut start = 0;
  let mut class = None;

  for (idx, ch) in text.char_indices() {
    let next_class = token_class(ch);
    if class.is_some_and(|class| class != next_class) {
      tokens.push(&text[start..idx]);
      start = idx;
    }
    class = Some(next_class);
  }

  if start < text.len() {
    tokens.push(&text[start..]);
  }
  tokens
}

/// Lines of a `&str`, each keeping its trailing `\n`.
struct TextLines<'a>(&'a str);

impl<'a> imara_diff::TokenSource for TextLines<'a> {
  type Token = &'a str;
  type Tokenizer = std::str::SplitInclusive<'a, char>;

  fn tokenize(&self) -> Self::Tokenizer {
    self.0.split_inclusive('\n')
  }

  fn estimate_tokens(&self) -> u32 {
    let lines = self.0.bytes().filter(|&b| b == b'\n').count() + 1;
    u32::try_from(lines).unwrap_or(u32::MAX)
  }
}

/// Accumulates segments, merging neighbours with the same operation.
#[derive(Debug, Default)]
struct SegmentBuilder {
  segments: Vec<DiffSegment>,
}

impl SegmentBuilder {
  fn push(&mut self, operation: Operation, text: &str) {
    if text.is_empty() {
      return;
    }
    match self.segments.last_mut() {
      Some(last) if last.operation == operation => last.text.push_str(text),
      _ => self.segments.push(DiffSegment::new(operation, text)),
    }
  }

  fn equal(&mut self, text: &str) {
    self.push(Operation::Equal, text);
  }

  fn delete(&mut self, text: &str) {
    self.push(Operation::Delete, text);
  }

  fn insert(&mut self, text: &str) {
    self.push(Operation::Insert, text);
  }
}

struct HunkRefiner<'a> {
  out:        SegmentBuilder,
  file:       &'a InternedInput<&'a str>,
  options:    &'a DiffOptions,
  char_hunk:  InternedInput<char>,
  word_hunk:  InternedInput<String>,
  token_diff: Diff,
  pos:        u32,
}

impl<'a> HunkRefiner<'a> {
  fn before_text(&self, range: Range<u32>) -> String {
    self.file.before[range.start as usize..range.end as usize]
      .iter()
      .map(|&token| self.file.interner[token])
      .collect()
  }

  fn after_text(&self, range: Range<u32>) -> String {
    self.file.after[range.start as usize..range.end as usize]
      .iter()
      .map(|&token| self.file.interner[token])
      .collect()
  }

  fn should_char_diff(
    &self,
    before: &Range<u32>,
    after: &Range<u32>,
    len_before: usize,
    len_after: usize,
  ) -> bool {
    let len_before_lines = before.end - before.start;
    let len_after_lines = after.end - after.start;
    if len_before_lines == 0 || len_after_lines == 0 {
      return false;
    }

    let total_lines = len_before_lines as u64 + len_after_lines as u64;
    if total_lines > self.options.max_char_diff_total_lines as u64 {
      return false;
    }

    if len_before.saturating_add(len_after) > self.options.max_char_diff_total_chars {
      return false;
    }

    let ratio = self.options.max_char_diff_ratio;
    len_after <= ratio.saturating_mul(len_before) && len_before <= ratio.saturating_mul(len_after)
  }

  fn process_char_diff(&mut self, before: &str, after: &str) {
    let before_chars: Vec<char> = before.chars().collect();
    let after_chars: Vec<char> = after.chars().collect();
    self.char_hunk.update_before(before_chars.iter().copied());
    self.char_hunk.update_after(after_chars.iter().copied());
    // characters repeat too often for histogram to pick good anchors
    self.token_diff.compute_with(
      Algorithm::Myers,
      &self.char_hunk.before,
      &self.char_hunk.after,
      self.char_hunk.interner.num_tokens(),
    );

    let collect = |chars: &[char]| chars.iter().collect::<String>();
    let mut pos = 0;
    for Hunk { before, after } in self.token_diff.hunks() {
      let (start, end) = (before.start as usize, before.end as usize);
      self.out.equal(&collect(&before_chars[pos..start]));
      self.out.delete(&collect(&before_chars[start..end]));
      self
        .out
        .insert(&collect(&after_chars[after.start as usize..after.end as usize]));
      pos = end;
    }
    self.out.equal(&collect(&before_chars[pos..]));
    self.char_hunk.clear();
  }

  fn process_word_diff(&mut self, before: &str, after: &str) {
    let before_tokens: Vec<String> = tokenize_words(before).into_iter().map(String::from).collect();
    let after_tokens: Vec<String> = tokenize_words(after).into_iter().map(String::from).collect();
    self.word_hunk.update_before(before_tokens.iter().cloned());
    self.word_hunk.update_after(after_tokens.iter().cloned());

    self.token_diff.compute_with(
      Algorithm::Myers,
      &self.word_hunk.before,
      &self.word_hunk.after,
      self.word_hunk.interner.num_tokens(),
    );

    let mut pos = 0;
    for Hunk { before, after } in self.token_diff.hunks() {
      let (start, end) = (before.start as usize, before.end as usize);
      self.out.equal(&before_tokens[pos..start].concat());
      self.out.delete(&before_tokens[start..end].concat());
      self
        .out
        .insert(&after_tokens[after.start as usize..after.end as usize].concat());
      pos = end;
    }
    self.out.equal(&before_tokens[pos..].concat());
    self.word_hunk.clear();
  }

  fn process_hunk(&mut self, before: Range<u32>, after: Range<u32>) {
    let unchanged = self.before_text(self.pos..before.start);
    self.out.equal(&unchanged);
    self.pos = before.end;

    let before_text = self.before_text(before.clone());
    let after_text = self.after_text(after.clone());
    let len_before = before_text.chars().count();
    let len_after = after_text.chars().count();

    // whole-line replacement for pure insertions, pure removals and hunks
    // above the size limits
    if !self.should_char_diff(&before, &after, len_before, len_after) {
      self.out.delete(&before_text);
      self.out.insert(&after_text);
    } else if len_before.saturating_add(len_after) >= self.options.word_diff_min_chars {
      self.process_word_diff(&before_text, &after_text);
    } else {
      self.process_char_diff(&before_text, &after_text);
    }
  }

  fn finish(mut self) -> Vec<DiffSegment> {
    let end = u32::try_from(self.file.before.len()).unwrap_or(u32::MAX);
    let tail = self.before_text(self.pos..end);
    self.out.equal(&tail);
    self.out.segments
  }
}

/// Computes the raw segment list turning `old` into `new`.
pub fn diff(old: &str, new: &str) -> Vec<DiffSegment> {
  diff_with_options(old, new, &DiffOptions::default())
}

pub fn diff_with_options(old: &str, new: &str, options: &DiffOptions) -> Vec<DiffSegment> {
  if old == new {
    let mut out = SegmentBuilder::default();
    out.equal(old);
    return out.segments;
  }

  let start = log::log_enabled!(log::Level::Debug).then(Instant::now);
  let file = InternedInput::new(TextLines(old), TextLines(new));
  let mut line_diff = Diff::compute(Algorithm::Histogram, &file);
  line_diff.postprocess_with_heuristic(
    &file,
    IndentHeuristic::new(|token| {
      IndentLevel::for_ascii_line(file.interner[token].bytes(), options.indent_width)
    }),
  );

  let mut refiner = HunkRefiner {
    out: SegmentBuilder::default(),
    file: &file,
    options,
    char_hunk: InternedInput::default(),
    word_hunk: InternedInput::default(),
    token_diff: Diff::default(),
    pos: 0,
  };
  for hunk in line_diff.hunks() {
    refiner.process_hunk(hunk.before, hunk.after);
  }
  let segments = refiner.finish();

  if let Some(start) = start {
    log::debug!(
      "text diff produced {} segments in {:?}",
      segments.len(),
      start.elapsed()
    );
  }
  segments
}

/// [`diff`] followed by [`cleanup_semantic`].
pub fn diff_semantic(old: &str, new: &str) -> Vec<DiffSegment> {
  let mut segments = diff(old, new);
  cleanup_semantic(&mut segments);
  segments
}

/// Normalizes a segment list so every change reads as whole replacements.
///
/// - empty segments are dropped and neighbours with the same operation merged
/// - inside a run of changes, all deleted text comes first as one `Delete`,
///   followed by all inserted text as one `Insert`
/// - an equality that is no longer than the edits on both of its sides is
///   folded into those edits, repeatedly, until no such equality is left
///
/// Both reconstructions (old and new text) are preserved. Runs in linear
/// time: equalities still standing are kept on a stack, and folding one only
/// rechecks the equality before it.
pub fn cleanup_semantic(segments: &mut Vec<DiffSegment>) {
  let mut folder = EqualityFolder::new(segments.len());
  for (idx, segment) in segments.iter().enumerate() {
    let len = segment.len_chars();
    if len == 0 {
      continue;
    }
    match segment.operation {
      Operation::Delete => folder.delete(len),
      Operation::Insert => folder.insert(len),
      Operation::Equal => folder.equal(idx, len),
    }
  }
  normalize_runs(segments, &folder.absorbed);
}

/// Char counts of a run of changes between two equalities.
#[derive(Debug, Default, Clone, Copy)]
struct Run {
  deleted:  usize,
  inserted: usize,
}

impl Run {
  fn weight(self) -> usize {
    self.deleted.max(self.inserted)
  }
}

/// Decides which equalities get folded into the edits around them.
struct EqualityFolder {
  /// One more entry than `standing`: the runs around each standing equality.
  runs:     Vec<Run>,
  /// Segment index and char length of each equality not folded so far.
  standing: Vec<(usize, usize)>,
  absorbed: Vec<bool>,
}

impl EqualityFolder {
  fn new(segments: usize) -> Self {
    Self {
      runs:     vec![Run::default()],
      standing: Vec::new(),
      absorbed: vec![false; segments],
    }
  }

  fn current(&mut self) -> &mut Run {
    let last = self.runs.len() - 1;
    &mut self.runs[last]
  }

  fn delete(&mut self, len: usize) {
    self.current().deleted += len;
    self.fold();
  }

  fn insert(&mut self, len: usize) {
    self.current().inserted += len;
    self.fold();
  }

  fn equal(&mut self, idx: usize, len: usize) {
    self.standing.push((idx, len));
    self.runs.push(Run::default());
  }

  /// Folds the newest standing equality while it is short enough, then the
  /// one before it, and so on. Run weights only grow, so an equality that
  /// stays is only rechecked once its right-hand run grows.
  fn fold(&mut self) {
    while let Some(&(idx, len)) = self.standing.last() {
      let n = self.runs.len();
      let (before, after) = (self.runs[n - 2], self.runs[n - 1]);
      if len > before.weight() || len > after.weight() {
        break;
      }
      self.standing.pop();
      self.runs.pop();
      let merged = self.current();
      merged.deleted += len + after.deleted;
      merged.inserted += len + after.inserted;
      self.absorbed[idx] = true;
    }
  }
}

/// Merges each maximal run of non-equal segments into `Delete` + `Insert`.
/// Equalities flagged in `absorbed` become part of both sides of their run.
fn normalize_runs(segments: &mut Vec<DiffSegment>, absorbed: &[bool]) {
  let mut out = SegmentBuilder::default();
  let mut deleted = String::new();
  let mut inserted = String::new();

  for (idx, segment) in segments.drain(..).enumerate() {
    match segment.operation {
      Operation::Delete => deleted.push_str(&segment.text),
      Operation::Insert => inserted.push_str(&segment.text),
      Operation::Equal if absorbed.get(idx).copied().unwrap_or(false) => {
        deleted.push_str(&segment.text);
        inserted.push_str(&segment.text);
      },
      Operation::Equal => {
        if segment.text.is_empty() {
          continue;
        }
        out.delete(&std::mem::take(&mut deleted));
        out.insert(&std::mem::take(&mut inserted));
        out.equal(&segment.text);
      },
    }
  }
  out.delete(&deleted);
  out.insert(&inserted);
  *segments = out.segments;
}

#[cfg(test)]
mod tests {
  use mimic_core::segment::{
    new_text,
    old_text,
  };

  use super::*;

  fn check_round_trip(a: &str, b: &str) {
    let segments = diff(a, b);
    assert_eq!(old_text(&segments), a);
    assert_eq!(new_text(&segments), b);

    let segments = diff_semantic(a, b);
    assert_eq!(old_text(&segments), a);
    assert_eq!(new_text(&segments), b);
  }

  quickcheck::quickcheck! {
    fn diff_reconstructs_both_sides(a: String, b: String) -> bool {
      let segments = diff_semantic(&a, &b);
      old_text(&segments) == a && new_text(&segments) == b
    }

    fn cleanup_never_leaves_empty_or_adjacent_duplicates(a: String, b: String) -> bool {
      let segments = diff_semantic(&a, &b);
      segments.iter().all(|segment| !segment.is_empty())
        && segments.windows(2).all(|pair| pair[0].operation != pair[1].operation)
    }
  }

  #[test]
  fn equal_texts() {
    assert_eq!(diff("foo", "foo"), vec![DiffSegment::equal("foo")]);
    assert!(diff("", "").is_empty());
  }

  #[test]
  fn single_line_replacement() {
    assert_eq!(
      diff_semantic("a\nb", "a\nc"),
      vec![
        DiffSegment::equal("a\n"),
        DiffSegment::delete("b"),
        DiffSegment::insert("c"),
      ]
    );
  }

  #[test]
  fn pure_insertion() {
    assert_eq!(diff_semantic("", "x\ny"), vec![DiffSegment::insert("x\ny")]);
  }

  #[test]
  fn pure_deletion() {
    assert_eq!(diff_semantic("gone", ""), vec![DiffSegment::delete("gone")]);
  }

  #[test]
  fn edit_inside_a_line() {
    let segments = diff_semantic("let x = 1;\n", "let x = 42;\n");
    assert_eq!(old_text(&segments), "let x = 1;\n");
    assert_eq!(new_text(&segments), "let x = 42;\n");
    assert_eq!(segments.first(), Some(&DiffSegment::equal("let x = ")));
    assert_eq!(segments.last(), Some(&DiffSegment::equal(";\n")));
  }

  #[test]
  fn trailing_newline() {
    check_round_trip("foo\n", "foo");
    check_round_trip("foo", "foo\n");
  }

  #[test]
  fn multibyte_text() {
    check_round_trip("hello 世界\n", "hello 世界!\n");
    check_round_trip("héllo", "hallo");
  }

  #[test]
  fn large_hunks_use_word_tokens() {
    let old: String = (0..80).map(|i| format!("word{i} value {i}\n")).collect();
    let new: String = (0..80).map(|i| format!("word{i} valve {i}\n")).collect();
    check_round_trip(&old, &new);
  }

  #[test]
  fn tokenize_words_splits_classes() {
    assert_eq!(tokenize_words("foo_bar  +=baz"), ["foo_bar", "  ", "+=", "baz"]);
    assert!(tokenize_words("").is_empty());
  }

  #[test]
  fn cleanup_orders_deletes_first() {
    let mut segments = vec![
      DiffSegment::equal("a"),
      DiffSegment::insert("x"),
      DiffSegment::delete("b"),
      DiffSegment::insert("y"),
      DiffSegment::equal("c"),
    ];
    cleanup_semantic(&mut segments);
    assert_eq!(
      segments,
      vec![
        DiffSegment::equal("a"),
        DiffSegment::delete("b"),
        DiffSegment::insert("xy"),
        DiffSegment::equal("c"),
      ]
    );
  }

  #[test]
  fn cleanup_absorbs_short_equality() {
    let mut segments = vec![
      DiffSegment::delete("abc"),
      DiffSegment::insert("xyz"),
      DiffSegment::equal("_"),
      DiffSegment::delete("def"),
      DiffSegment::insert("uvw"),
    ];
    cleanup_semantic(&mut segments);
    assert_eq!(
      segments,
      vec![DiffSegment::delete("abc_def"), DiffSegment::insert("xyz_uvw")]
    );
  }

  #[test]
  fn cleanup_folds_back_into_earlier_equalities() {
    let mut segments = vec![
      DiffSegment::delete("aaaa"),
      DiffSegment::equal("bbb"),
      DiffSegment::delete("c"),
      DiffSegment::equal("_"),
      DiffSegment::delete("dd"),
    ];
    cleanup_semantic(&mut segments);
    assert_eq!(
      segments,
      vec![DiffSegment::delete("aaaabbbc_dd"), DiffSegment::insert("bbb_")]
    );
  }

  #[test]
  fn cleanup_handles_many_small_edits() {
    let mut segments = Vec::new();
    for _ in 0..50_000 {
      segments.push(DiffSegment::delete("xx"));
      segments.push(DiffSegment::insert("yy"));
      segments.push(DiffSegment::equal("="));
    }
    let (old, new) = (old_text(&segments), new_text(&segments));
    cleanup_semantic(&mut segments);

    assert_eq!(segments.len(), 3);
    assert_eq!(segments[2], DiffSegment::equal("="));
    assert_eq!(old_text(&segments), old);
    assert_eq!(new_text(&segments), new);
  }

  #[test]
  fn many_changed_lines_round_trip() {
    let old: String = (0..5_000).map(|i| format!("line {i}
keep
")).collect();
    let new: String = (0..5_000).map(|i| format!("line {}
keep
", i * 7)).collect();
    check_round_trip(&old, &new);
  }

  #[test]
  fn cleanup_keeps_long_equality() {
    let mut segments = vec![
      DiffSegment::delete("a"),
      DiffSegment::equal("unchanged"),
      DiffSegment::insert("b"),
    ];
    let expected = segments.clone();
    cleanup_semantic(&mut segments);
    assert_eq!(segments, expected);
  }

  #[test]
  fn cleanup_drops_empty_segments() {
    let mut segments = vec![
      DiffSegment::equal(""),
      DiffSegment::insert("x"),
      DiffSegment::equal(""),
      DiffSegment::insert("y"),
    ];
    cleanup_semantic(&mut segments);
    assert_eq!(segments, vec![DiffSegment::insert("xy")]);
  }
}
