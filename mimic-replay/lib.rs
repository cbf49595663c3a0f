//! Paced replay of compiled edit actions into a text buffer.

pub mod apply;
pub mod buffer;
pub mod driver;
pub mod observer;
pub mod playlist;
pub mod scheduler;
pub mod steps;
pub mod transport;

pub use apply::{
  apply_action,
  apply_actions,
  replay_to_string,
};
pub use buffer::{
  BufferError,
  Document,
  RopeBuffer,
  TextBuffer,
  TextRange,
};
pub use driver::Command;
pub use observer::ObserverId;
pub use playlist::{
  BufferFactory,
  Playlist,
  RopeBufferFactory,
};
pub use scheduler::{
  PlaybackState,
  Scheduler,
};
pub use transport::Transport;
