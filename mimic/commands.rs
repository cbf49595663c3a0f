use std::{
  cell::Cell,
  fs,
  io::{
    BufRead,
    Write,
  },
  path::{
    Path,
    PathBuf,
  },
  rc::Rc,
  sync::Arc,
  thread,
};

use anyhow::{
  Context,
  Result,
};
use mimic_core::{
  Config,
  ReplayRecord,
};
use mimic_diff::{
  RecordBuilder,
  calculate_stats,
};
use mimic_replay::{
  Command,
  Playlist,
  RopeBufferFactory,
  Transport,
  driver,
  replay_to_string,
};
use tokio::sync::mpsc;

fn read_text(path: &Path) -> Result<String> {
  fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

pub fn load_record(path: &Path) -> Result<ReplayRecord> {
  let json = read_text(path)?;
  ReplayRecord::from_json(&json)
    .with_context(|| format!("{} is not a replay record", path.display()))
}

pub fn compile(
  old: &Path,
  new: &Path,
  path: Option<String>,
  config: &Config,
  out: &mut impl Write,
) -> Result<ReplayRecord> {
  let original = read_text(old)?;
  let updated = read_text(new)?;
  let path = path.unwrap_or_else(|| new.display().to_string());

  let record = RecordBuilder::new()
    .file_path(path)
    .timing(config.timing)
    .build(original, updated);
  writeln!(out, "{}", record.to_json_pretty()?)?;
  Ok(record)
}

pub fn stats(old: &Path, new: &Path, out: &mut impl Write) -> Result<()> {
  let stats = calculate_stats(&read_text(old)?, &read_text(new)?);
  writeln!(out, "lines: +{} -{}", stats.lines_added, stats.lines_deleted)?;
  writeln!(out, "chars: +{} -{}", stats.chars_added, stats.chars_deleted)?;
  Ok(())
}

pub fn actions(record: &Path, out: &mut impl Write) -> Result<()> {
  let record = load_record(record)?;
  for (step, action) in record.actions.iter().enumerate() {
    writeln!(out, "{step:>4}  {action}")?;
  }
  Ok(())
}

/// Returns whether every record reproduced its new content.
pub fn verify(records: &[PathBuf], out: &mut impl Write) -> Result<bool> {
  let mut all_match = true;
  for path in records {
    let record = load_record(path)?;
    let status = match replay_to_string(&record.original_content, &record.actions) {
      Ok(text) if text == record.new_content => "ok".to_string(),
      Ok(_) => "mismatch".to_string(),
      Err(err) => format!("failed: {err}"),
    };
    if status != "ok" {
      all_match = false;
    }
    writeln!(out, "{}: {status}", path.display())?;
  }
  Ok(all_match)
}

pub struct PlayOptions {
  pub speed:       Option<f64>,
  pub autoplay:    bool,
  pub interactive: bool,
}

pub fn play(records: &[PathBuf], options: PlayOptions, config: &Config) -> Result<()> {
  let records = records
    .iter()
    .map(|path| load_record(path).map(Arc::new))
    .collect::<Result<Vec<_>>>()?;

  let mut playlist = Playlist::new(RopeBufferFactory, config.playback.clone());
  playlist.load_playlist(records, 0);
  if let Some(speed) = options.speed {
    playlist.set_speed(speed);
  }

  let last_step = Rc::new(Cell::new(None));
  playlist.subscribe(move |state| {
    if last_step.get() == Some(state.current_step) {
      return;
    }
    last_step.set(Some(state.current_step));
    println!(
      "step {} at {}:{}",
      state.current_step, state.current_position.line, state.current_position.column
    );
  });
  let mut transport = Transport::new(playlist);

  let (tx, rx) = mpsc::unbounded_channel();
  if options.interactive {
    println!("commands: [enter] play/pause, n next, b previous, s speed, r reset, e end, N file, q quit");
    let tx = tx.clone();
    thread::spawn(move || {
      let stdin = std::io::stdin();
      for line in stdin.lock().lines() {
        let Ok(line) = line else {
          break;
        };
        match parse_command(&line) {
          Some(command) => {
            if tx.send(command).is_err() {
              break;
            }
          },
          None => eprintln!("unknown command '{}'", line.trim()),
        }
      }
    });
  }
  tx.send(if options.autoplay {
    Command::TogglePlay
  } else {
    Command::Play
  })?;
  drop(tx);

  let runtime = tokio::runtime::Builder::new_current_thread()
    .enable_time()
    .build()?;
  runtime.block_on(driver::run(&mut transport, rx));

  let playlist = transport.playlist();
  if let Some(record) = playlist.active_record() {
    let progress = playlist.player().map(|player| player.progress()).unwrap_or_default();
    println!("finished '{}' at {progress:.0}%", record.file_path);
  }
  Ok(())
}

/// Maps a line typed on stdin to a transport command. File numbers are
/// one-based.
pub fn parse_command(line: &str) -> Option<Command> {
  let command = match line.trim() {
    "" | "p" => Command::TogglePlay,
    "n" => Command::Next,
    "b" => Command::Previous,
    "s" => Command::CycleSpeed,
    "r" => Command::Reset,
    "e" => Command::SkipToEnd,
    "a" => Command::SetAutoplay(true),
    "A" => Command::SetAutoplay(false),
    "q" => Command::Quit,
    other => {
      if let Some(speed) = other.strip_suffix('x') {
        return speed.parse().ok().map(Command::SetSpeed);
      }
      let index: usize = other.parse().ok()?;
      Command::SwitchTo(index.checked_sub(1)?)
    },
  };
  Some(command)
}
