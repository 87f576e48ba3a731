//! User configuration loaded from `config.yml`

use crate::audio::DEFAULT_CHUNK_SIZE;
use crate::player::{clamp_volume, PlayerWorkerConfig, PAUSE_POLL_INTERVAL};
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_CONFIG_DIR: &str = "tunestream";
const FILE_NAME: &str = "config.yml";
const DEFAULT_LOG_FILE: &str = "tunestream.log";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UserConfig {
  /// Gain at startup, 0.0-2.0
  pub initial_volume: f32,
  pub log_file: PathBuf,
  /// Output device name; the host default when unset
  pub audio_device: Option<String>,
  pub fetch_timeout_secs: u64,
  /// How long a superseded session gets to stop before it is detached
  pub cancel_grace_ms: u64,
  /// Bytes of PCM per decoded chunk
  pub chunk_size: usize,
  /// Chunks buffered ahead of the output device
  pub sink_queue_chunks: usize,
}

impl Default for UserConfig {
  fn default() -> Self {
    Self {
      initial_volume: 1.0,
      log_file: PathBuf::from(DEFAULT_LOG_FILE),
      audio_device: None,
      fetch_timeout_secs: 30,
      cancel_grace_ms: 250,
      chunk_size: DEFAULT_CHUNK_SIZE,
      sink_queue_chunks: 8,
    }
  }
}

impl UserConfig {
  /// Default config path: `<config dir>/tunestream/config.yml`
  pub fn default_path() -> Result<PathBuf> {
    let config_dir =
      dirs::config_dir().ok_or_else(|| anyhow!("No config directory found"))?;
    Ok(config_dir.join(APP_CONFIG_DIR).join(FILE_NAME))
  }

  /// Load `path`, or the default path when none is given.
  ///
  /// A missing file at the default location means defaults; a missing file
  /// that was asked for explicitly is an error.
  pub fn load(path: Option<&Path>) -> Result<Self> {
    let (path, explicit) = match path {
      Some(path) => (path.to_path_buf(), true),
      None => match Self::default_path() {
        Ok(path) => (path, false),
        Err(e) => {
          log::debug!("{}, using default config", e);
          return Ok(Self::default());
        }
      },
    };

    if !explicit && !path.exists() {
      return Ok(Self::default());
    }
    let text = fs::read_to_string(&path)
      .with_context(|| format!("could not read config {}", path.display()))?;
    Self::parse(&text).with_context(|| format!("invalid config {}", path.display()))
  }

  pub fn parse(text: &str) -> Result<Self> {
    // An empty file deserializes to null rather than an empty mapping
    if text.trim().is_empty() {
      return Ok(Self::default());
    }
    let mut config: UserConfig = serde_yaml::from_str(text)?;
    config.initial_volume = clamp_volume(config.initial_volume);
    if config.chunk_size < 2 {
      return Err(anyhow!("chunk_size must be at least 2 bytes"));
    }
    if config.sink_queue_chunks == 0 {
      return Err(anyhow!("sink_queue_chunks must be at least 1"));
    }
    Ok(config)
  }

  pub fn fetch_timeout(&self) -> Duration {
    Duration::from_secs(self.fetch_timeout_secs)
  }

  pub fn worker_config(&self) -> PlayerWorkerConfig {
    PlayerWorkerConfig {
      cancel_grace: Duration::from_millis(self.cancel_grace_ms),
      // Whole frames only
      chunk_size: self.chunk_size & !1,
      pause_poll: PAUSE_POLL_INTERVAL,
    }
  }
}
