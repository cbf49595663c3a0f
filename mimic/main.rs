mod cli;
mod commands;

use std::{
  fs::File,
  io::{
    self,
    BufWriter,
    Write,
  },
  path::PathBuf,
  process::ExitCode,
};

use anyhow::{
  Context,
  Result,
};
use clap::Parser;
use mimic_core::config::{
  Config,
  ConfigLoadError,
};

use crate::{
  cli::{
    Cli,
    Command,
  },
  commands::PlayOptions,
};

fn setup_logging(verbosity: u8) -> Result<()> {
  let mut base_config = fern::Dispatch::new();

  base_config = match verbosity {
    0 => base_config.level(log::LevelFilter::Warn),
    1 => base_config.level(log::LevelFilter::Info),
    2 => base_config.level(log::LevelFilter::Debug),
    _3_or_more => base_config.level(log::LevelFilter::Trace),
  };

  // Separate file config so we can include year, month and day in file logs
  let file_config = fern::Dispatch::new()
    .format(|out, message, record| {
      out.finish(format_args!(
        "{} {} [{}] {}",
        chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
        record.target(),
        record.level(),
        message
      ))
    })
    .chain(fern::log_file(mimic_loader::log_file())?);

  base_config.chain(file_config).apply()?;

  Ok(())
}

fn load_config() -> Config {
  match Config::load_user() {
    Ok(config) => config,
    Err(ConfigLoadError::BadConfig(err)) => {
      eprintln!("Bad config: {err}");
      eprintln!("Falling back to the default configuration");
      Config::default()
    },
    Err(ConfigLoadError::Error(err)) => {
      log::debug!("no config loaded: {err}");
      Config::default()
    },
  }
}

fn open_output(path: Option<PathBuf>) -> Result<Box<dyn Write>> {
  Ok(match path {
    Some(path) => {
      let file =
        File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
      Box::new(BufWriter::new(file))
    },
    None => Box::new(io::stdout().lock()),
  })
}

fn main() -> Result<ExitCode> {
  let cli = Cli::parse();

  mimic_loader::initialize_config_file(cli.config_file);
  mimic_loader::initialize_log_file(cli.log_file);
  setup_logging(cli.verbosity).context("failed to initialize logging")?;

  let config = load_config();
  let mut stdout = io::stdout().lock();

  match cli.command {
    Command::Compile { old, new, path, out } => {
      let mut out = open_output(out)?;
      let record = commands::compile(&old, &new, path, &config, &mut out)?;
      out.flush()?;
      log::info!(
        "compiled {} actions for '{}' ({})",
        record.actions.len(),
        record.file_path,
        record.stats
      );
    },
    Command::Stats { old, new } => commands::stats(&old, &new, &mut stdout)?,
    Command::Actions { record } => commands::actions(&record, &mut stdout)?,
    Command::Verify { records } => {
      if !commands::verify(&records, &mut stdout)? {
        return Ok(ExitCode::FAILURE);
      }
    },
    Command::Play {
      records,
      speed,
      no_autoplay,
      interactive,
    } => {
      let options = PlayOptions {
        speed,
        autoplay: !no_autoplay,
        interactive,
      };
      commands::play(&records, options, &config)?;
    },
  }

  Ok(ExitCode::SUCCESS)
}
