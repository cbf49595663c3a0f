//! The replay scheduler: a timer driven state machine that plays one record
//! into one buffer.
//!
//! The scheduler owns no timer. It keeps at most one pending tick and
//! reports its deadline from [`Scheduler::poll`]; the caller sleeps until
//! then and polls again. Every transition (`pause`, `reset`, `skip_to_end`,
//! a speed change) replaces or drops the pending tick before touching
//! anything else, so a stale tick can never fire.
//!
//! Character level actions run one sub-step per tick. Pausing keeps the
//! in-flight run and resuming continues it, and `current_step` only moves
//! once an action has completed, so no action is ever applied twice.

use std::{
  sync::Arc,
  time::Duration,
};

use mimic_core::{
  action::Action,
  config::{
    PlaybackConfig,
    is_positive,
  },
  position::Position,
  record::ReplayRecord,
};
use tokio::time::Instant;

use crate::{
  buffer::{
    BufferError,
    TextBuffer,
    TextRange,
  },
  observer::{
    ObserverId,
    Observers,
  },
  steps::{
    ActionRun,
    SubStep,
  },
};

/// Longest single wait the scheduler will schedule.
const MAX_DELAY: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackState {
  pub is_playing:       bool,
  pub is_paused:        bool,
  pub current_step:     usize,
  /// Where the ghost cursor is drawn.
  pub current_position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickKind {
  /// Start `actions[current_step]`.
  Execute,
  /// Apply the next character of the in-flight run.
  SubStep,
  /// The in-flight action has settled; count it and move on.
  Finish,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
  due:     Instant,
  base_ms: u64,
  kind:    TickKind,
}

enum Started {
  Settle(u64),
  Run(ActionRun),
}

pub struct Scheduler<B> {
  record:    Arc<ReplayRecord>,
  buffer:    B,
  config:    PlaybackConfig,
  speed:     f64,
  state:     PlaybackState,
  pending:   Option<Pending>,
  /// Tick to resume with after a pause.
  suspended: Option<TickKind>,
  run:       Option<ActionRun>,
  observers: Observers,
}

impl<B: TextBuffer> Scheduler<B> {
  /// Binds `record` to `buffer` and loads the original content.
  pub fn new(record: Arc<ReplayRecord>, buffer: B, config: PlaybackConfig) -> Self {
    Self::with_observers(record, buffer, config, Observers::new())
  }

  /// Like [`Scheduler::new`], reusing an existing set of observers. They are
  /// notified of the freshly loaded state.
  pub fn with_observers(
    record: Arc<ReplayRecord>,
    buffer: B,
    config: PlaybackConfig,
    observers: Observers,
  ) -> Self {
    let config = config.validated();
    let mut scheduler = Self {
      record,
      buffer,
      speed: config.default_speed,
      config,
      state: PlaybackState::default(),
      pending: None,
      suspended: None,
      run: None,
      observers,
    };
    scheduler.load_original();
    scheduler.notify();
    scheduler
  }

  /// Releases the buffer and the observers.
  pub fn into_parts(self) -> (B, Observers) {
    (self.buffer, self.observers)
  }

  pub fn record(&self) -> &Arc<ReplayRecord> {
    &self.record
  }

  pub fn buffer(&self) -> &B {
    &self.buffer
  }

  pub fn buffer_mut(&mut self) -> &mut B {
    &mut self.buffer
  }

  pub fn state(&self) -> &PlaybackState {
    &self.state
  }

  pub fn config(&self) -> &PlaybackConfig {
    &self.config
  }

  pub fn speed(&self) -> f64 {
    self.speed
  }

  pub fn total_steps(&self) -> usize {
    self.record.actions.len()
  }

  pub fn is_playing(&self) -> bool {
    self.state.is_playing
  }

  pub fn is_complete(&self) -> bool {
    self.state.current_step >= self.total_steps()
  }

  /// Percentage of completed actions, 0 for an empty record.
  pub fn progress(&self) -> f64 {
    match self.total_steps() {
      0 => 0.0,
      total => self.state.current_step as f64 / total as f64 * 100.0,
    }
  }

  pub fn next_deadline(&self) -> Option<Instant> {
    self.pending.map(|pending| pending.due)
  }

  pub fn subscribe(&mut self, callback: impl FnMut(&PlaybackState) + 'static) -> ObserverId {
    self.observers.subscribe(callback)
  }

  pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
    self.observers.unsubscribe(id)
  }

  /// Starts or resumes playback. A finished record is reset first and
  /// starts again after the restart delay.
  pub fn play(&mut self) {
    if self.state.is_playing {
      return;
    }

    let now = Instant::now();
    if self.is_complete() {
      self.cancel();
      self.reset_state();
      self.state.is_playing = true;
      self.schedule(now, self.config.restart_delay_ms, TickKind::Execute);
    } else {
      let kind = self.suspended.take().unwrap_or(TickKind::Execute);
      self.state.is_playing = true;
      self.state.is_paused = false;
      self.schedule(now, 0, kind);
    }
    log::debug!(
      "playing '{}' from step {}",
      self.record.id,
      self.state.current_step
    );
    self.notify();
  }

  pub fn pause(&mut self) {
    if !self.state.is_playing {
      return;
    }
    self.suspended = self.pending.take().map(|pending| pending.kind);
    self.state.is_playing = false;
    self.state.is_paused = true;
    self.notify();
  }

  /// Back to the original content at step 0.
  pub fn reset(&mut self) {
    self.cancel();
    self.reset_state();
    self.notify();
  }

  /// Jumps straight to the new content without replaying any action.
  pub fn skip_to_end(&mut self) {
    self.cancel();
    let end = self.load_new();
    self.state = PlaybackState {
      is_playing:       false,
      is_paused:        false,
      current_step:     self.total_steps(),
      current_position: end,
    };
    self.notify();
  }

  /// Changes the speed multiplier. A pending tick is rescheduled from now
  /// with the new speed.
  pub fn set_speed(&mut self, speed: f64) {
    if !is_positive(speed) {
      log::warn!("ignoring invalid playback speed {speed}");
      return;
    }
    self.speed = speed;
    if let Some(pending) = self.pending {
      self.schedule(Instant::now(), pending.base_ms, pending.kind);
    }
  }

  /// Fires every tick that is due and returns the next deadline.
  pub fn poll(&mut self) -> Option<Instant> {
    self.poll_at(Instant::now())
  }

  pub fn poll_at(&mut self, now: Instant) -> Option<Instant> {
    while let Some(pending) = self.pending.filter(|pending| pending.due <= now) {
      self.pending = None;
      match pending.kind {
        TickKind::Execute => self.execute(pending.due),
        TickKind::SubStep => self.sub_step(pending.due),
        TickKind::Finish => self.finish_action(pending.due),
      }
    }
    self.next_deadline()
  }

  fn cancel(&mut self) {
    self.pending = None;
    self.suspended = None;
    self.run = None;
  }

  /// `ms` scaled by the speed multiplier and the pacing divisor.
  fn scaled(&self, ms: u64) -> Duration {
    let secs = ms as f64 / 1000.0 / (self.speed * self.config.pacing_divisor);
    Duration::try_from_secs_f64(secs)
      .unwrap_or(MAX_DELAY)
      .min(MAX_DELAY)
  }

  fn schedule(&mut self, from: Instant, base_ms: u64, kind: TickKind) {
    self.pending = Some(Pending {
      due: from + self.scaled(base_ms),
      base_ms,
      kind,
    });
  }

  fn notify(&mut self) {
    self.observers.notify(&self.state);
  }

  fn reset_state(&mut self) {
    self.load_original();
    self.state = PlaybackState::default();
  }

  fn load_original(&mut self) {
    let result = self
      .buffer
      .set_full_text(&self.record.original_content)
      .and_then(|_| self.buffer.set_cursor(Position::START))
      .and_then(|_| self.buffer.reveal_line(1));
    if let Err(err) = result {
      log::warn!("failed to load '{}': {err}", self.record.id);
    }
  }

  fn load_new(&mut self) -> Position {
    let fallback = Position::START.traverse(&self.record.new_content);
    let result = self
      .buffer
      .set_full_text(&self.record.new_content)
      .and_then(|_| self.buffer.end_position())
      .and_then(|end| {
        self.buffer.set_cursor(end)?;
        self.buffer.reveal_line(end.line)?;
        Ok(end)
      });
    result.unwrap_or_else(|err| {
      log::warn!("failed to show the end of '{}': {err}", self.record.id);
      fallback
    })
  }

  fn execute(&mut self, at: Instant) {
    let record = Arc::clone(&self.record);
    let Some(action) = record.actions.get(self.state.current_step) else {
      self.complete();
      return;
    };

    log::debug!("step {}: {action}", self.state.current_step);
    match self.start(action) {
      Ok(Started::Settle(ms)) => {
        self.schedule(at, ms, TickKind::Finish);
        self.notify();
      },
      Ok(Started::Run(run)) => {
        self.run = Some(run);
        self.sub_step(at);
      },
      Err(err) => self.abort(at, err),
    }
  }

  fn start(&mut self, action: &Action) -> Result<Started, BufferError> {
    let settle = match *action {
      Action::Scroll { line, .. } => {
        self.buffer.reveal_line(line)?;
        self.config.scroll_settle_ms
      },
      Action::MoveCursor { line, column, .. } => {
        let pos = Position::new(line, column);
        self.buffer.set_cursor(pos)?;
        self.buffer.reveal_line(line)?;
        self.state.current_position = pos;
        self.config.cursor_settle_ms
      },
      Action::Select {
        start_line,
        start_column,
        end_line,
        end_column,
        ..
      } => {
        self.buffer.set_selection(TextRange::new(
          Position::new(start_line, start_column),
          Position::new(end_line, end_column),
        ))?;
        self.config.select_settle_ms
      },
      Action::Backspace { .. } | Action::Type { .. } => {
        return match ActionRun::start(action, &self.buffer)? {
          Some(run) => Ok(Started::Run(run)),
          None => Ok(Started::Settle(0)),
        };
      },
    };
    Ok(Started::Settle(settle))
  }

  fn sub_step(&mut self, at: Instant) {
    let Some(run) = self.run.as_mut() else {
      self.finish_action(at);
      return;
    };

    match run.step(&mut self.buffer) {
      Ok(Some(step)) => {
        // deletions happen at the start of the selection
        let pos = match step {
          SubStep::Deleted => self.buffer.selection().map(|range| range.normalized().start),
          SubStep::Typed(_) => self.buffer.cursor(),
        };
        if let Ok(pos) = pos {
          self.state.current_position = pos;
        }
        let ms = match step {
          SubStep::Typed(ch) if ch.is_whitespace() => self.config.type_whitespace_ms,
          SubStep::Typed(_) => self.config.type_char_ms,
          SubStep::Deleted => self.config.backspace_char_ms,
        };
        self.schedule(at, ms, TickKind::SubStep);
        self.notify();
      },
      Ok(None) => {
        self.run = None;
        self.finish_action(at);
      },
      Err(err) => self.abort(at, err),
    }
  }

  /// Gives up on the in-flight action and treats it as done.
  fn abort(&mut self, at: Instant, err: BufferError) {
    log::warn!(
      "aborting step {} of '{}': {err}",
      self.state.current_step,
      self.record.id
    );
    self.run = None;
    self.finish_action(at);
  }

  fn finish_action(&mut self, at: Instant) {
    let delay = self
      .record
      .actions
      .get(self.state.current_step)
      .map(Action::delay_ms)
      .filter(|&delay| delay > 0)
      .unwrap_or(self.config.fallback_delay_ms);

    self.state.current_step = (self.state.current_step + 1).min(self.total_steps());
    if self.is_complete() {
      self.complete();
      return;
    }
    if self.state.is_playing {
      self.schedule(at, delay, TickKind::Execute);
    }
    self.notify();
  }

  fn complete(&mut self) {
    log::debug!("finished playing '{}'", self.record.id);
    self.cancel();
    self.state.is_playing = false;
    self.state.is_paused = false;
    self.notify();
  }
}
