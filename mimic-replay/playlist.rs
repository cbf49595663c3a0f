//! An ordered queue of records played one after the other.
//!
//! The playlist owns one buffer per record, created the first time the
//! record becomes active and disposed when a new playlist is loaded or the
//! playlist is dropped. At most one scheduler is bound at a time; switching
//! files tears the bound one down before the next is created.

use std::{
  sync::Arc,
  time::Duration,
};

use mimic_core::{
  config::{
    PlaybackConfig,
    is_positive,
  },
  record::ReplayRecord,
};
use tokio::time::Instant;

use crate::{
  buffer::{
    RopeBuffer,
    TextBuffer,
  },
  observer::{
    ObserverId,
    Observers,
  },
  scheduler::{
    PlaybackState,
    Scheduler,
  },
};

/// Creates and disposes the buffer a record is replayed into.
pub trait BufferFactory {
  type Buffer: TextBuffer;

  fn create(&mut self, record: &ReplayRecord) -> Self::Buffer;

  fn dispose(&mut self, buffer: Self::Buffer) {
    drop(buffer);
  }
}

impl<B, F> BufferFactory for F
where
  B: TextBuffer,
  F: FnMut(&ReplayRecord) -> B,
{
  type Buffer = B;

  fn create(&mut self, record: &ReplayRecord) -> B {
    self(record)
  }
}

/// In-memory buffers holding each record's original content.
#[derive(Debug, Default, Clone, Copy)]
pub struct RopeBufferFactory;

impl BufferFactory for RopeBufferFactory {
  type Buffer = RopeBuffer;

  fn create(&mut self, record: &ReplayRecord) -> RopeBuffer {
    RopeBuffer::new(&record.original_content)
  }
}

pub struct Playlist<F: BufferFactory> {
  factory:    F,
  config:     PlaybackConfig,
  queue:      Vec<Arc<ReplayRecord>>,
  active:     usize,
  /// Buffers of inactive records, indexed like `queue`.
  buffers:    Vec<Option<F::Buffer>>,
  player:     Option<Scheduler<F::Buffer>>,
  /// Observers waiting for a scheduler to be bound.
  parked:     Observers,
  speed:      f64,
  autoplay:   bool,
  advance_at: Option<Instant>,
  /// Index whose completion has already been handled.
  completed:  Option<usize>,
}

impl<F: BufferFactory> Playlist<F> {
  pub fn new(factory: F, config: PlaybackConfig) -> Self {
    let config = config.validated();
    Self {
      factory,
      speed: config.default_speed,
      config,
      queue: Vec::new(),
      active: 0,
      buffers: Vec::new(),
      player: None,
      parked: Observers::new(),
      autoplay: false,
      advance_at: None,
      completed: None,
    }
  }

  /// Replaces the queue. Buffers of the previous playlist are disposed and
  /// only the record at `start` is bound. An out of range `start` falls
  /// back to the first record.
  pub fn load_playlist(&mut self, records: Vec<Arc<ReplayRecord>>, start: usize) {
    self.unbind();
    self.dispose_buffers();

    let start = if start < records.len() {
      start
    } else {
      if !records.is_empty() {
        log::warn!(
          "start index {start} is outside a playlist of {} records, starting at 0",
          records.len()
        );
      }
      0
    };

    log::info!("loaded playlist of {} records", records.len());
    self.buffers = records.iter().map(|_| None).collect();
    self.queue = records;
    self.active = start;
    self.advance_at = None;
    self.completed = None;
    if !self.queue.is_empty() {
      self.bind(start);
    }
  }

  /// Makes `index` the active record, showing its original content with the
  /// cursor at the start. Does not start playback. Out of range indices are
  /// ignored.
  pub fn switch_to_file(&mut self, index: usize) -> bool {
    if index >= self.queue.len() {
      return false;
    }
    self.unbind();
    self.bind(index);
    self.advance_at = None;
    self.completed = None;
    true
  }

  pub fn next_file(&mut self) -> bool {
    self.has_next() && self.switch_to_file(self.active + 1)
  }

  pub fn previous_file(&mut self) -> bool {
    self.has_previous() && self.switch_to_file(self.active - 1)
  }

  pub fn has_next(&self) -> bool {
    self.active + 1 < self.queue.len()
  }

  pub fn has_previous(&self) -> bool {
    self.active > 0 && !self.queue.is_empty()
  }

  pub fn queue(&self) -> &[Arc<ReplayRecord>] {
    &self.queue
  }

  pub fn len(&self) -> usize {
    self.queue.len()
  }

  pub fn is_empty(&self) -> bool {
    self.queue.is_empty()
  }

  pub fn active_index(&self) -> usize {
    self.active
  }

  pub fn active_record(&self) -> Option<&Arc<ReplayRecord>> {
    self.queue.get(self.active)
  }

  pub fn player(&self) -> Option<&Scheduler<F::Buffer>> {
    self.player.as_ref()
  }

  pub fn player_mut(&mut self) -> Option<&mut Scheduler<F::Buffer>> {
    self.player.as_mut()
  }

  pub fn state(&self) -> Option<&PlaybackState> {
    self.player.as_ref().map(Scheduler::state)
  }

  pub fn config(&self) -> &PlaybackConfig {
    &self.config
  }

  pub fn autoplay(&self) -> bool {
    self.autoplay
  }

  pub fn set_autoplay(&mut self, autoplay: bool) {
    self.autoplay = autoplay;
    if !autoplay {
      self.advance_at = None;
    }
  }

  pub fn speed(&self) -> f64 {
    self.speed
  }

  /// Sets the speed of the bound scheduler and of every later one.
  pub fn set_speed(&mut self, speed: f64) {
    if !is_positive(speed) {
      log::warn!("ignoring invalid playback speed {speed}");
      return;
    }
    self.speed = speed;
    if let Some(player) = &mut self.player {
      player.set_speed(speed);
    }
  }

  pub fn play(&mut self) {
    if let Some(player) = &mut self.player {
      player.play();
    }
  }

  pub fn pause(&mut self) {
    if let Some(player) = &mut self.player {
      player.pause();
    }
  }

  pub fn reset(&mut self) {
    if let Some(player) = &mut self.player {
      player.reset();
    }
  }

  pub fn skip_to_end(&mut self) {
    if let Some(player) = &mut self.player {
      player.skip_to_end();
    }
  }

  pub fn subscribe(&mut self, callback: impl FnMut(&PlaybackState) + 'static) -> ObserverId {
    match &mut self.player {
      Some(player) => player.subscribe(callback),
      None => self.parked.subscribe(callback),
    }
  }

  pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
    match &mut self.player {
      Some(player) => player.unsubscribe(id),
      None => self.parked.unsubscribe(id),
    }
  }

  pub fn next_deadline(&self) -> Option<Instant> {
    let player = self.player.as_ref().and_then(Scheduler::next_deadline);
    match (player, self.advance_at) {
      (Some(a), Some(b)) => Some(a.min(b)),
      (a, b) => a.or(b),
    }
  }

  /// Drives the bound scheduler and the auto-advance timer. Returns the
  /// next deadline.
  pub fn poll(&mut self) -> Option<Instant> {
    self.poll_at(Instant::now())
  }

  pub fn poll_at(&mut self, now: Instant) -> Option<Instant> {
    if let Some(player) = &mut self.player {
      player.poll_at(now);
    }
    self.watch_completion(now);

    if let Some(at) = self.advance_at
      && at <= now
    {
      self.advance_at = None;
      if self.next_file() {
        self.play();
      } else {
        self.autoplay = false;
      }
    }
    self.next_deadline()
  }

  /// Arms the auto-advance timer the first time the active record is seen
  /// complete.
  fn watch_completion(&mut self, now: Instant) {
    let Some(player) = &self.player else {
      return;
    };
    if !player.is_complete() || player.is_playing() || player.total_steps() == 0 {
      self.completed = None;
      self.advance_at = None;
      return;
    }
    if !self.autoplay || self.completed == Some(self.active) {
      return;
    }

    self.completed = Some(self.active);
    if self.has_next() {
      log::debug!("record {} complete, advancing", self.active);
      self.advance_at = Some(now + Duration::from_millis(self.config.advance_settle_ms));
    } else {
      log::info!("playlist complete");
      self.autoplay = false;
    }
  }

  fn bind(&mut self, index: usize) {
    let Some(record) = self.queue.get(index).cloned() else {
      return;
    };
    let buffer = match self.buffers.get_mut(index).and_then(Option::take) {
      Some(buffer) => buffer,
      None => self.factory.create(&record),
    };
    log::debug!("switching to '{}' ({})", record.file_path, record.id);

    let observers = std::mem::take(&mut self.parked);
    let mut player = Scheduler::with_observers(record, buffer, self.config.clone(), observers);
    player.set_speed(self.speed);
    self.player = Some(player);
    self.active = index;
  }

  fn unbind(&mut self) {
    let Some(player) = self.player.take() else {
      return;
    };
    let (buffer, observers) = player.into_parts();
    self.parked = observers;
    match self.buffers.get_mut(self.active) {
      Some(slot) => *slot = Some(buffer),
      None => self.factory.dispose(buffer),
    }
  }

  fn dispose_buffers(&mut self) {
    for buffer in std::mem::take(&mut self.buffers).into_iter().flatten() {
      self.factory.dispose(buffer);
    }
  }
}

impl<F: BufferFactory> Drop for Playlist<F> {
  fn drop(&mut self) {
    self.unbind();
    self.dispose_buffers();
  }
}

#[cfg(test)]
mod test {
  use std::{
    cell::{
      Cell,
      RefCell,
    },
    rc::Rc,
  };

  use mimic_core::{
    config::TimingConfig,
    position::Position,
  };
  use mimic_diff::compile;
  use tokio::time::{
    advance,
    sleep_until,
  };

  use super::*;

  fn config() -> PlaybackConfig {
    PlaybackConfig {
      pacing_divisor: 1.0,
      ..PlaybackConfig::default()
    }
  }

  fn record(id: &str, old: &str, new: &str) -> Arc<ReplayRecord> {
    let actions = compile(old, new, &TimingConfig::default());
    Arc::new(ReplayRecord::new(id, old, new, actions))
  }

  fn records() -> Vec<Arc<ReplayRecord>> {
    vec![
      record("a", "one", "ONE"),
      record("b", "two\n", "two\n2\n"),
      record("c", "three", ""),
    ]
  }

  fn playlist() -> Playlist<RopeBufferFactory> {
    Playlist::new(RopeBufferFactory, config())
  }

  fn active_text<F: BufferFactory>(playlist: &Playlist<F>) -> String {
    playlist.player().unwrap().buffer().text().unwrap()
  }

  async fn run_until_idle<F: BufferFactory>(playlist: &mut Playlist<F>) {
    while let Some(deadline) = playlist.poll() {
      sleep_until(deadline).await;
    }
  }

  #[derive(Default)]
  struct Counting {
    created:  Rc<Cell<usize>>,
    disposed: Rc<Cell<usize>>,
  }

  impl BufferFactory for Counting {
    type Buffer = RopeBuffer;

    fn create(&mut self, record: &ReplayRecord) -> RopeBuffer {
      self.created.set(self.created.get() + 1);
      RopeBuffer::new(&record.original_content)
    }

    fn dispose(&mut self, _buffer: RopeBuffer) {
      self.disposed.set(self.disposed.get() + 1);
    }
  }

  #[tokio::test(start_paused = true)]
  async fn empty_playlist() {
    let mut playlist = playlist();
    assert!(playlist.is_empty());
    assert!(playlist.player().is_none());
    assert!(!playlist.next_file());
    assert!(!playlist.previous_file());
    assert!(!playlist.switch_to_file(0));
    playlist.play();
    assert_eq!(playlist.poll(), None);

    playlist.load_playlist(Vec::new(), 3);
    assert!(playlist.player().is_none());
  }

  #[tokio::test(start_paused = true)]
  async fn load_binds_only_the_start_record() {
    let factory = Counting::default();
    let created = factory.created.clone();
    let mut playlist = Playlist::new(factory, config());

    playlist.load_playlist(records(), 1);
    assert_eq!(playlist.active_index(), 1);
    assert_eq!(playlist.active_record().unwrap().id, "b");
    assert_eq!(active_text(&playlist), "two\n");
    assert_eq!(created.get(), 1);
    assert!(playlist.has_next());
    assert!(playlist.has_previous());
  }

  #[tokio::test(start_paused = true)]
  async fn out_of_range_start_falls_back() {
    let mut playlist = playlist();
    playlist.load_playlist(records(), 7);
    assert_eq!(playlist.active_index(), 0);
    assert_eq!(active_text(&playlist), "one");
  }

  #[tokio::test(start_paused = true)]
  async fn switching_resets_without_playing() {
    let mut playlist = playlist();
    playlist.load_playlist(records(), 0);
    playlist.play();
    run_until_idle(&mut playlist).await;
    assert_eq!(active_text(&playlist), "ONE");

    assert!(!playlist.switch_to_file(3));
    assert_eq!(playlist.active_index(), 0);

    assert!(playlist.switch_to_file(2));
    assert!(playlist.switch_to_file(0));
    assert_eq!(active_text(&playlist), "one");
    let state = playlist.state().unwrap();
    assert!(!state.is_playing);
    assert_eq!(state.current_step, 0);
    assert_eq!(playlist.player().unwrap().buffer().cursor(), Ok(Position::START));
  }

  #[tokio::test(start_paused = true)]
  async fn next_and_previous_are_guarded() {
    let mut playlist = playlist();
    playlist.load_playlist(records(), 0);
    assert!(!playlist.has_previous());
    assert!(!playlist.previous_file());

    assert!(playlist.next_file());
    assert!(playlist.next_file());
    assert_eq!(playlist.active_index(), 2);
    assert!(!playlist.has_next());
    assert!(!playlist.next_file());
    assert_eq!(playlist.active_index(), 2);

    assert!(playlist.previous_file());
    assert_eq!(playlist.active_index(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn buffers_are_created_lazily_and_disposed() {
    let factory = Counting::default();
    let created = factory.created.clone();
    let disposed = factory.disposed.clone();
    let mut playlist = Playlist::new(factory, config());

    playlist.load_playlist(records(), 0);
    playlist.next_file();
    playlist.previous_file();
    playlist.next_file();
    assert_eq!(created.get(), 2);
    assert_eq!(disposed.get(), 0);

    playlist.load_playlist(records(), 0);
    assert_eq!(disposed.get(), 2);
    assert_eq!(created.get(), 3);

    drop(playlist);
    assert_eq!(disposed.get(), 3);
  }

  #[tokio::test(start_paused = true)]
  async fn closure_factories() {
    let mut playlist = Playlist::new(
      |record: &ReplayRecord| RopeBuffer::new(&record.original_content.to_uppercase()),
      config(),
    );
    playlist.load_playlist(records(), 0);
    // the scheduler always loads the original content
    assert_eq!(active_text(&playlist), "one");
  }

  #[tokio::test(start_paused = true)]
  async fn auto_advance_after_settle() {
    let mut playlist = playlist();
    playlist.load_playlist(records(), 0);
    playlist.set_autoplay(true);
    playlist.play();

    loop {
      let deadline = playlist.poll().unwrap();
      if playlist.player().unwrap().is_complete() {
        assert_eq!(deadline, Instant::now() + Duration::from_millis(500));
        break;
      }
      sleep_until(deadline).await;
    }

    advance(Duration::from_millis(499)).await;
    playlist.poll();
    assert_eq!(playlist.active_index(), 0);

    advance(Duration::from_millis(1)).await;
    playlist.poll();
    assert_eq!(playlist.active_index(), 1);
    assert!(playlist.state().unwrap().is_playing);

    run_until_idle(&mut playlist).await;
    assert_eq!(playlist.active_index(), 2);
    assert_eq!(active_text(&playlist), "");
    assert!(playlist.player().unwrap().is_complete());
    assert!(!playlist.autoplay());
  }

  #[tokio::test(start_paused = true)]
  async fn no_auto_advance_without_autoplay() {
    let mut playlist = playlist();
    playlist.load_playlist(records(), 0);
    playlist.play();
    run_until_idle(&mut playlist).await;
    assert_eq!(playlist.active_index(), 0);
    assert!(playlist.player().unwrap().is_complete());
  }

  #[tokio::test(start_paused = true)]
  async fn observers_survive_switches() {
    let mut playlist = playlist();
    let steps = Rc::new(RefCell::new(Vec::new()));
    let sink = steps.clone();
    let id = playlist.subscribe(move |state| sink.borrow_mut().push(state.current_step));

    playlist.load_playlist(records(), 0);
    playlist.skip_to_end();
    playlist.next_file();
    playlist.skip_to_end();
    assert_eq!(*steps.borrow(), [0, 5, 0, 4]);

    assert!(playlist.unsubscribe(id));
    playlist.next_file();
    assert_eq!(steps.borrow().len(), 4);
  }

  #[tokio::test(start_paused = true)]
  async fn speed_carries_over() {
    let mut playlist = playlist();
    playlist.set_speed(4.0);
    playlist.load_playlist(records(), 0);
    assert_eq!(playlist.player().unwrap().speed(), 4.0);
    playlist.next_file();
    assert_eq!(playlist.player().unwrap().speed(), 4.0);
  }
}
