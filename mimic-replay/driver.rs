//! Drives a [`Transport`] from a tokio task.
//!
//! The driver sleeps until the next playback deadline or the next
//! [`Command`], whichever comes first. Everything runs on the current task,
//! the playlist never crosses threads.

use std::ops::ControlFlow;

use tokio::{
  sync::mpsc,
  time::{
    Instant,
    sleep_until,
    timeout_at,
  },
};

use crate::{
  playlist::BufferFactory,
  transport::Transport,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
  TogglePlay,
  Play,
  Pause,
  Reset,
  SkipToEnd,
  Previous,
  Next,
  SetSpeed(f64),
  CycleSpeed,
  SwitchTo(usize),
  SetAutoplay(bool),
  Quit,
}

pub fn dispatch<F: BufferFactory>(transport: &mut Transport<F>, command: Command) -> ControlFlow<()> {
  log::debug!("playback command {command:?}");
  match command {
    Command::TogglePlay => transport.toggle_play(),
    Command::Play => transport.playlist_mut().play(),
    Command::Pause => transport.playlist_mut().pause(),
    Command::Reset => transport.playlist_mut().reset(),
    Command::SkipToEnd => transport.playlist_mut().skip_to_end(),
    Command::Previous => transport.previous(),
    Command::Next => transport.next(),
    Command::SetSpeed(speed) => transport.set_speed(speed),
    Command::CycleSpeed => {
      let speed = transport.cycle_speed();
      log::info!("speed set to {speed}x");
    },
    Command::SwitchTo(index) => transport.switch_to_file(index),
    Command::SetAutoplay(autoplay) => transport.playlist_mut().set_autoplay(autoplay),
    Command::Quit => return ControlFlow::Break(()),
  }
  ControlFlow::Continue(())
}

/// Runs until [`Command::Quit`] is received, or until the channel is closed
/// and nothing is left to play.
pub async fn run<F: BufferFactory>(
  transport: &mut Transport<F>,
  mut rx: mpsc::UnboundedReceiver<Command>,
) {
  let mut next = transport.poll();
  let mut open = true;
  loop {
    let command = match (next, open) {
      (Some(deadline), true) => timeout_at(deadline, rx.recv()).await.ok(),
      (Some(deadline), false) => {
        sleep_until(deadline).await;
        None
      },
      (None, true) => Some(rx.recv().await),
      (None, false) => break,
    };

    match command {
      // deadline reached
      None => {},
      Some(None) => {
        log::debug!("command channel closed");
        open = false;
      },
      Some(Some(command)) => {
        if dispatch(transport, command).is_break() {
          break;
        }
      },
    }
    next = transport.poll();
  }
}

/// Plays out every pending deadline. Returns when nothing is scheduled.
pub async fn run_until_idle<F: BufferFactory>(transport: &mut Transport<F>) {
  while let Some(deadline) = transport.poll() {
    if deadline > Instant::now() {
      sleep_until(deadline).await;
    }
  }
}
