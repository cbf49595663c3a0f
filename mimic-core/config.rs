//! Compile-time timing and playback pacing configuration.
//!
//! Both sections can be set from a global config file and a per-workspace
//! file; the workspace file wins key by key.
//!
//! ```toml
//! [timing]
//! typing-ms-per-char = 40
//!
//! [playback]
//! default-speed = 2.0
//! speed-presets = [1.0, 2.0, 4.0, 8.0]
//! ```

use std::{
  fs,
  io::Error as IOError,
};

use mimic_loader::merge_toml_values;
use serde::{
  Deserialize,
  Serialize,
};
use thiserror::Error;
use toml::de::Error as TomlError;

/// Delays assigned to actions when a diff is compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct TimingConfig {
  pub typing_ms_per_char:    u64,
  pub cursor_move_ms:        u64,
  pub select_ms:             u64,
  pub backspace_ms_per_char: u64,
  pub scroll_ms:             u64,
}

impl Default for TimingConfig {
  fn default() -> Self {
    Self {
      typing_ms_per_char:    50,
      cursor_move_ms:        100,
      select_ms:             150,
      backspace_ms_per_char: 30,
      scroll_ms:             100,
    }
  }
}

/// Pacing applied by the replay engine at playback time.
///
/// Every scheduled delay is divided by `speed * pacing_divisor`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct PlaybackConfig {
  pub pacing_divisor:        f64,
  pub default_speed:         f64,
  pub speed_presets:         Vec<f64>,
  /// Per-character delay while typing ordinary characters.
  pub type_char_ms:          u64,
  /// Per-character delay while typing spaces and line breaks.
  pub type_whitespace_ms:    u64,
  pub backspace_char_ms:     u64,
  pub scroll_settle_ms:      u64,
  pub cursor_settle_ms:      u64,
  pub select_settle_ms:      u64,
  /// Pause before playing again from the start of a finished record.
  pub restart_delay_ms:      u64,
  /// Used in place of an action's `delay_ms` when that is zero.
  pub fallback_delay_ms:     u64,
  /// Wait between a finished record and the next one in a playlist.
  pub advance_settle_ms:     u64,
  /// Playing time after which "previous" restarts the current file.
  pub previous_threshold_ms: u64,
}

impl Default for PlaybackConfig {
  fn default() -> Self {
    Self {
      pacing_divisor:        0.7,
      default_speed:         1.0,
      speed_presets:         vec![1.0, 2.0, 4.0, 8.0],
      type_char_ms:          30,
      type_whitespace_ms:    10,
      backspace_char_ms:     20,
      scroll_settle_ms:      200,
      cursor_settle_ms:      50,
      select_settle_ms:      50,
      restart_delay_ms:      100,
      fallback_delay_ms:     100,
      advance_settle_ms:     500,
      previous_threshold_ms: 2000,
    }
  }
}

impl PlaybackConfig {
  /// Replaces non-positive or non-finite multipliers with their defaults.
  pub fn validated(mut self) -> Self {
    let defaults = Self::default();
    if !is_positive(self.pacing_divisor) {
      log::warn!(
        "invalid pacing-divisor {}, using {}",
        self.pacing_divisor,
        defaults.pacing_divisor
      );
      self.pacing_divisor = defaults.pacing_divisor;
    }
    if !is_positive(self.default_speed) {
      log::warn!(
        "invalid default-speed {}, using {}",
        self.default_speed,
        defaults.default_speed
      );
      self.default_speed = defaults.default_speed;
    }
    self.speed_presets.retain(|speed| is_positive(*speed));
    if self.speed_presets.is_empty() {
      self.speed_presets = defaults.speed_presets;
    }
    self
  }

  /// The preset following `speed`, wrapping around to the first one.
  pub fn next_preset(&self, speed: f64) -> f64 {
    self
      .speed_presets
      .iter()
      .copied()
      .find(|preset| *preset > speed)
      .or_else(|| self.speed_presets.first().copied())
      .unwrap_or(self.default_speed)
  }
}

#[inline]
pub fn is_positive(value: f64) -> bool {
  value.is_finite() && value > 0.0
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
  pub timing:   TimingConfig,
  pub playback: PlaybackConfig,
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
  #[error("bad config: {0}")]
  BadConfig(#[from] TomlError),
  #[error(transparent)]
  Error(#[from] IOError),
}

impl Config {
  pub fn load(
    global: Result<String, ConfigLoadError>,
    local: Result<String, ConfigLoadError>,
  ) -> Result<Config, ConfigLoadError> {
    let global_config: Result<toml::Value, ConfigLoadError> =
      global.and_then(|file| toml::from_str(&file).map_err(ConfigLoadError::BadConfig));
    let local_config: Result<toml::Value, ConfigLoadError> =
      local.and_then(|file| toml::from_str(&file).map_err(ConfigLoadError::BadConfig));

    let value = match (global_config, local_config) {
      (Ok(global), Ok(local)) => merge_toml_values(global, local, 3),
      (_, Err(ConfigLoadError::BadConfig(err))) | (Err(ConfigLoadError::BadConfig(err)), _) => {
        return Err(ConfigLoadError::BadConfig(err));
      },
      (Ok(config), Err(_)) | (Err(_), Ok(config)) => config,
      (Err(err), Err(_)) => return Err(err),
    };

    let mut config: Config = value.try_into().map_err(ConfigLoadError::BadConfig)?;
    config.playback = config.playback.validated();
    Ok(config)
  }

  /// Load the user config from the config directory merged with the
  /// workspace's `.mimicflow/config.toml`.
  pub fn load_user() -> Result<Config, ConfigLoadError> {
    let global_config =
      fs::read_to_string(mimic_loader::config_file()).map_err(ConfigLoadError::Error);
    let local_config = fs::read_to_string(mimic_loader::workspace_config_file())
      .map_err(ConfigLoadError::Error);
    Self::load(global_config, local_config)
  }
}

#[cfg(test)]
mod test {
  use std::io::ErrorKind;

  use super::*;

  fn missing() -> Result<String, ConfigLoadError> {
    Err(ConfigLoadError::Error(IOError::from(ErrorKind::NotFound)))
  }

  #[test]
  fn empty_file_gives_defaults() {
    let config = Config::load(Ok(String::new()), missing()).unwrap();
    assert_eq!(config, Config::default());
  }

  #[test]
  fn workspace_overrides_global() {
    let global = r#"
      [timing]
      typing-ms-per-char = 40
      select-ms = 120

      [playback]
      default-speed = 2.0
    "#;
    let local = r#"
      [timing]
      select-ms = 200
    "#;
    let config = Config::load(Ok(global.into()), Ok(local.into())).unwrap();
    assert_eq!(config.timing.typing_ms_per_char, 40);
    assert_eq!(config.timing.select_ms, 200);
    assert_eq!(config.timing.scroll_ms, TimingConfig::default().scroll_ms);
    assert_eq!(config.playback.default_speed, 2.0);
  }

  #[test]
  fn unknown_keys_are_rejected() {
    let err = Config::load(Ok("[timing]\ntypo = 1".into()), missing()).unwrap_err();
    assert!(matches!(err, ConfigLoadError::BadConfig(_)));
  }

  #[test]
  fn bad_local_file_wins_over_good_global() {
    let err = Config::load(Ok(String::new()), Ok("not toml [".into())).unwrap_err();
    assert!(matches!(err, ConfigLoadError::BadConfig(_)));
  }

  #[test]
  fn both_missing_is_an_io_error() {
    let err = Config::load(missing(), missing()).unwrap_err();
    assert!(matches!(err, ConfigLoadError::Error(_)));
  }

  #[test]
  fn invalid_multipliers_fall_back() {
    let config = Config::load(
      Ok("[playback]\npacing-divisor = 0.0\ndefault-speed = -1.0\nspeed-presets = [0.0]".into()),
      missing(),
    )
    .unwrap();
    let defaults = PlaybackConfig::default();
    assert_eq!(config.playback.pacing_divisor, defaults.pacing_divisor);
    assert_eq!(config.playback.default_speed, defaults.default_speed);
    assert_eq!(config.playback.speed_presets, defaults.speed_presets);
  }

  #[test]
  fn presets_cycle() {
    let playback = PlaybackConfig::default();
    assert_eq!(playback.next_preset(1.0), 2.0);
    assert_eq!(playback.next_preset(4.0), 8.0);
    assert_eq!(playback.next_preset(8.0), 1.0);
    assert_eq!(playback.next_preset(0.5), 1.0);
  }
}
