//! Shared data model for mimicflow: positions, replay actions, diff segments,
//! change statistics, replay records and configuration.

pub mod action;
pub mod config;
pub mod language;
pub mod position;
pub mod record;
pub mod segment;
pub mod stats;
pub mod store;

pub use action::Action;
pub use config::{
  Config,
  PlaybackConfig,
  TimingConfig,
};
pub use position::Position;
pub use record::ReplayRecord;
pub use segment::{
  DiffSegment,
  Operation,
};
pub use stats::ChangeStats;
