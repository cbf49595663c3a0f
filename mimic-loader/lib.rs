//! Filesystem locations used by mimicflow: configuration and cache
//! directories, the config and log files, and workspace discovery.

use std::{
  env,
  fs,
  path::{
    Path,
    PathBuf,
  },
  sync::OnceLock,
};

use etcetera::base_strategy::{
  BaseStrategy,
  choose_base_strategy,
};

const APP_DIR: &str = "mimicflow";

/// Per-workspace folder holding local configuration.
pub const WORKSPACE_DIR: &str = ".mimicflow";

/// Directories that mark the root of a workspace.
const WORKSPACE_MARKERS: [&str; 3] = [".git", ".jj", WORKSPACE_DIR];

static CONFIG_FILE: OnceLock<PathBuf> = OnceLock::new();
static LOG_FILE: OnceLock<PathBuf> = OnceLock::new();

/// Pins the config file for the rest of the process. Without an explicit
/// path the default location is used. Later calls have no effect.
pub fn initialize_config_file(path: Option<PathBuf>) {
  pin(&CONFIG_FILE, path.unwrap_or_else(|| config_dir().join("config.toml")));
}

/// Pins the log file, see [`initialize_config_file`].
pub fn initialize_log_file(path: Option<PathBuf>) {
  pin(&LOG_FILE, path.unwrap_or_else(default_log_file));
}

fn pin(cell: &OnceLock<PathBuf>, path: PathBuf) {
  create_parent_dir(&path);
  if cell.set(path).is_err() {
    log::debug!("path already initialized, keeping the first one");
  }
}

pub fn config_file() -> PathBuf {
  CONFIG_FILE
    .get_or_init(|| {
      let path = config_dir().join("config.toml");
      create_parent_dir(&path);
      path
    })
    .clone()
}

pub fn log_file() -> PathBuf {
  LOG_FILE
    .get_or_init(|| {
      let path = default_log_file();
      create_parent_dir(&path);
      path
    })
    .clone()
}

pub fn default_log_file() -> PathBuf {
  cache_dir().join("mimicflow.log")
}

/// `$MIMICFLOW_CONFIG_DIR`, or `mimicflow` under the platform config dir.
pub fn config_dir() -> PathBuf {
  app_dir("MIMICFLOW_CONFIG_DIR", BaseDir::Config)
}

/// `$MIMICFLOW_CACHE_DIR`, or `mimicflow` under the platform cache dir.
pub fn cache_dir() -> PathBuf {
  app_dir("MIMICFLOW_CACHE_DIR", BaseDir::Cache)
}

#[derive(Clone, Copy)]
enum BaseDir {
  Config,
  Cache,
}

fn app_dir(override_var: &str, kind: BaseDir) -> PathBuf {
  if let Some(dir) = env::var_os(override_var) {
    return PathBuf::from(dir);
  }
  match choose_base_strategy() {
    Ok(strategy) => {
      let base = match kind {
        BaseDir::Config => strategy.config_dir(),
        BaseDir::Cache => strategy.cache_dir(),
      };
      base.join(APP_DIR)
    },
    Err(err) => {
      log::warn!("no base directory for {APP_DIR}: {err}");
      PathBuf::from(".").join(APP_DIR)
    },
  }
}

/// `.mimicflow/config.toml` in the workspace around the current directory.
pub fn workspace_config_file() -> PathBuf {
  let cwd = env::current_dir().unwrap_or_default();
  find_workspace_root(&cwd)
    .unwrap_or(cwd)
    .join(WORKSPACE_DIR)
    .join("config.toml")
}

/// Closest ancestor of `dir` (itself included) holding one of the
/// workspace markers.
pub fn find_workspace_root(dir: &Path) -> Option<PathBuf> {
  dir
    .ancestors()
    .find(|ancestor| {
      WORKSPACE_MARKERS
        .iter()
        .any(|marker| ancestor.join(marker).exists())
    })
    .map(Path::to_path_buf)
}

/// Merges `overlay` onto `base`.
///
/// Tables are merged key by key down to `depth` levels; below that, and for
/// every other kind of value including arrays, `overlay` wins. For example
/// with a depth of 3:
///
/// ```toml
/// # base
/// [timing]
/// typing-ms-per-char = 40
/// select-ms = 120
///
/// # overlay
/// [timing]
/// select-ms = 200
///
/// # merged
/// [timing]
/// typing-ms-per-char = 40
/// select-ms = 200
/// ```
pub fn merge_toml_values(base: toml::Value, overlay: toml::Value, depth: usize) -> toml::Value {
  use toml::Value;

  match (base, overlay) {
    (Value::Table(mut base), Value::Table(overlay)) if depth > 0 => {
      for (key, value) in overlay {
        let merged = match base.remove(&key) {
          Some(existing) => merge_toml_values(existing, value, depth - 1),
          None => value,
        };
        base.insert(key, merged);
      }
      Value::Table(base)
    },
    (_, overlay) => overlay,
  }
}

fn create_parent_dir(path: &Path) {
  let Some(parent) = path.parent() else {
    return;
  };
  if !parent.as_os_str().is_empty()
    && !parent.exists()
    && let Err(err) = fs::create_dir_all(parent)
  {
    log::warn!("failed to create {}: {err}", parent.display());
  }
}
