//! Layered configuration: TOML file, `ROMHOARD_`-prefixed environment
//! variables, then command-line flags, later layers winning.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use romhoard_core::config::{
  IdentityPolicy, MatchConfig, PriorityConfig, RunPolicy,
};
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "~/.romhoard/config.toml";

/// Shape of the config file. Every field is optional; the `[priority]`,
/// `[match]`, `[identity]` and `[run]` tables deserialize straight into the
/// core configuration structs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// Store root: `cache.db`, the media tree, and the default locations of
  /// the import directory and alias table.
  pub store_root:   PathBuf,
  /// Default input directory for scrape/vacuum/export.
  pub input_dir:    Option<PathBuf>,
  /// Default platform name, e.g. "snes".
  pub platform:     Option<String>,
  pub import_dir:   Option<PathBuf>,
  pub aliases_file: Option<PathBuf>,
  pub priority:     PriorityConfig,
  #[serde(rename = "match")]
  pub matching:     MatchConfig,
  pub identity:     IdentityPolicy,
  pub run:          RunPolicy,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      store_root:   PathBuf::from("~/.romhoard"),
      input_dir:    None,
      platform:     None,
      import_dir:   None,
      aliases_file: None,
      priority:     PriorityConfig::default(),
      matching:     MatchConfig::default(),
      identity:     IdentityPolicy::default(),
      run:          RunPolicy::default(),
    }
  }
}

impl Settings {
  /// Load the config file (missing file is fine), overlay `ROMHOARD_` env
  /// vars, then apply the global flag overrides.
  pub fn load(
    config_path: Option<&Path>,
    store_override: Option<PathBuf>,
  ) -> Result<Self> {
    let path = config_path
      .map(expand_tilde)
      .unwrap_or_else(|| expand_tilde(Path::new(DEFAULT_CONFIG_PATH)));

    let raw = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("ROMHOARD"))
      .build()
      .context("failed to read configuration")?;
    let mut settings: Settings = raw
      .try_deserialize()
      .context("failed to deserialise configuration")?;

    if let Some(store) = store_override {
      settings.store_root = store;
    }
    settings.store_root = expand_tilde(&settings.store_root);
    Ok(settings)
  }

  pub fn import_root(&self) -> PathBuf {
    self
      .import_dir
      .as_deref()
      .map(expand_tilde)
      .unwrap_or_else(|| self.store_root.join("import"))
  }

  pub fn aliases_path(&self) -> PathBuf {
    self
      .aliases_file
      .as_deref()
      .map(expand_tilde)
      .unwrap_or_else(|| self.store_root.join("aliases.toml"))
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
