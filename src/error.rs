//! Errors a single playback session can end with
//!
//! None of these cross the command path: the session reports them as a
//! `Failed` outcome and the worker logs them and goes idle.

use thiserror::Error;

/// Per-track playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
  /// The track could not be retrieved (network, HTTP status, missing file)
  #[error("could not fetch {location}: {message}")]
  Fetch { location: String, message: String },

  /// The encoded stream is malformed or uses an unsupported codec
  #[error("decode error: {0}")]
  Decode(String),

  /// The output device rejected a chunk
  #[error("output write failed: {0}")]
  SinkWrite(String),

  /// The output device could not be opened
  #[error("output device unavailable: {0}")]
  OutputDevice(String),

  /// Seeking or reading the buffered source failed
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
}

impl PlaybackError {
  pub fn fetch(location: impl Into<String>, message: impl ToString) -> Self {
    Self::Fetch {
      location: location.into(),
      message: message.to_string(),
    }
  }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
