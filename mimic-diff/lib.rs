//! Turns an old/new text pair into ghost actions and change statistics.

pub mod capture;
pub mod compiler;
pub mod segment;
pub mod stats;

pub use capture::RecordBuilder;
pub use compiler::{
  Compilation,
  Compiler,
  compile,
  compile_segments,
  compile_with_stats,
  final_cursor,
};
pub use segment::{
  cleanup_semantic,
  diff,
  diff_semantic,
};
pub use stats::{
  calculate_stats,
  stats_for_segments,
};
