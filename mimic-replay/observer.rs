use std::fmt;

use crate::scheduler::PlaybackState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Callback = Box<dyn FnMut(&PlaybackState)>;

/// Callbacks notified on every playback state change.
///
/// The set moves with the playlist from one scheduler to the next, so a
/// subscriber keeps receiving updates across file switches.
#[derive(Default)]
pub struct Observers {
  next_id:   u64,
  callbacks: Vec<(ObserverId, Callback)>,
}

impl Observers {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn subscribe(&mut self, callback: impl FnMut(&PlaybackState) + 'static) -> ObserverId {
    let id = ObserverId(self.next_id);
    self.next_id += 1;
    self.callbacks.push((id, Box::new(callback)));
    id
  }

  /// Returns whether `id` was subscribed.
  pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
    let len = self.callbacks.len();
    self.callbacks.retain(|(observer, _)| *observer != id);
    self.callbacks.len() != len
  }

  pub fn notify(&mut self, state: &PlaybackState) {
    for (_, callback) in &mut self.callbacks {
      callback(state);
    }
  }

  pub fn len(&self) -> usize {
    self.callbacks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.callbacks.is_empty()
  }
}

impl fmt::Debug for Observers {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Observers")
      .field("len", &self.callbacks.len())
      .finish()
  }
}
