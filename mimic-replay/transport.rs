//! Player controls: play/pause, previous, next and speed.
//!
//! This is the policy layer on top of [`Playlist`]. Play/pause doubles as
//! the autoplay switch, "previous" restarts the current file once it has
//! been played for a while, and "next" finishes the current file before
//! moving on.

use std::time::Duration;

use tokio::time::Instant;

use crate::playlist::{
  BufferFactory,
  Playlist,
};

pub struct Transport<F: BufferFactory> {
  playlist:      Playlist<F>,
  threshold:     Duration,
  /// Time spent playing the current file, excluding `playing_since`.
  played:        Duration,
  playing_since: Option<Instant>,
  tracked_file:  Option<usize>,
}

impl<F: BufferFactory> Transport<F> {
  pub fn new(playlist: Playlist<F>) -> Self {
    let threshold = Duration::from_millis(playlist.config().previous_threshold_ms);
    Self {
      playlist,
      threshold,
      played: Duration::ZERO,
      playing_since: None,
      tracked_file: None,
    }
  }

  pub fn playlist(&self) -> &Playlist<F> {
    &self.playlist
  }

  pub fn playlist_mut(&mut self) -> &mut Playlist<F> {
    &mut self.playlist
  }

  pub fn into_playlist(self) -> Playlist<F> {
    self.playlist
  }

  fn is_playing(&self) -> bool {
    self.playlist.state().is_some_and(|state| state.is_playing)
  }

  fn is_incomplete(&self) -> bool {
    self
      .playlist
      .player()
      .is_some_and(|player| player.total_steps() > 0 && !player.is_complete())
  }

  /// Wall clock time the current file has been playing. Paused time does
  /// not count.
  pub fn played(&self) -> Duration {
    self.played_at(Instant::now())
  }

  fn played_at(&self, now: Instant) -> Duration {
    let running = self
      .playing_since
      .map(|since| now.saturating_duration_since(since))
      .unwrap_or_default();
    self.played + running
  }

  fn forget_played(&mut self, now: Instant) {
    self.played = Duration::ZERO;
    self.playing_since = self.is_playing().then_some(now);
  }

  /// Folds play/pause transitions and file switches into the played time.
  fn track(&mut self, now: Instant) {
    let active = (!self.playlist.is_empty()).then(|| self.playlist.active_index());
    if active != self.tracked_file {
      self.tracked_file = active;
      self.forget_played(now);
      return;
    }

    match (self.is_playing(), self.playing_since) {
      (true, None) => self.playing_since = Some(now),
      (false, Some(since)) => {
        self.played += now.saturating_duration_since(since);
        self.playing_since = None;
      },
      _ => {},
    }
  }

  /// Pauses a playing file and turns autoplay off, or plays and turns it on.
  pub fn toggle_play(&mut self) {
    let now = Instant::now();
    self.track(now);
    if self.is_playing() {
      self.playlist.set_autoplay(false);
      self.playlist.pause();
    } else {
      self.playlist.set_autoplay(true);
      self.playlist.play();
    }
    self.track(now);
  }

  /// Restarts the current file if it has been playing for longer than the
  /// threshold, otherwise goes to the previous file (or to the start of
  /// the first one).
  pub fn previous(&mut self) {
    let now = Instant::now();
    self.track(now);

    if self.played_at(now) > self.threshold {
      let was_playing = self.is_playing();
      self.playlist.reset();
      if was_playing {
        self.playlist.play();
      }
      self.forget_played(now);
      return;
    }

    if self.playlist.previous_file() {
      self.after_switch();
    } else {
      self.playlist.reset();
    }
    self.forget_played(now);
    self.track(now);
  }

  /// Finishes an incomplete file, otherwise goes to the next one.
  pub fn next(&mut self) {
    let now = Instant::now();
    self.track(now);

    if self.is_incomplete() {
      self.playlist.skip_to_end();
      self.played = Duration::ZERO;
      self.playing_since = None;
      return;
    }

    if self.playlist.next_file() {
      self.after_switch();
    }
    self.track(now);
  }

  fn after_switch(&mut self) {
    if self.playlist.autoplay() {
      self.playlist.play();
    }
  }

  pub fn can_go_previous(&self) -> bool {
    self.playlist.has_previous() || self.played() > Duration::ZERO
  }

  pub fn can_go_next(&self) -> bool {
    self.playlist.has_next() || self.is_incomplete()
  }

  pub fn switch_to_file(&mut self, index: usize) {
    let now = Instant::now();
    if self.playlist.switch_to_file(index) {
      self.after_switch();
    }
    self.track(now);
  }

  pub fn set_speed(&mut self, speed: f64) {
    self.playlist.set_speed(speed);
  }

  /// Moves to the next speed preset and returns it.
  pub fn cycle_speed(&mut self) -> f64 {
    let speed = self.playlist.config().next_preset(self.playlist.speed());
    self.playlist.set_speed(speed);
    speed
  }

  pub fn poll(&mut self) -> Option<Instant> {
    let now = Instant::now();
    let deadline = self.playlist.poll_at(now);
    self.track(now);
    deadline
  }
}
