//! Events emitted by the player worker
//!
//! These events are sent from the player worker thread to the UI thread
//! to communicate playback state changes.

/// Events emitted by the player worker
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
  /// A new session has started
  TrackStarted {
    /// Playlist index of the track
    index: usize,
    /// Display name of the track
    name: String,
    /// Encoded-stream position playback resumes from
    resume_offset: u64,
  },

  /// Playback has been paused
  Paused {
    /// Playlist index of the paused track
    index: usize,
  },

  /// Paused playback has been resumed
  Resumed {
    /// Playlist index of the resumed track
    index: usize,
  },

  /// Playback has stopped
  Stopped,

  /// Current track reached the end of its stream
  TrackEnded {
    /// Playlist index of the track that ended
    index: usize,
  },

  /// Volume has changed
  VolumeChanged {
    /// New gain (0.0-2.0)
    volume: f32,
  },

  /// A track could not be played
  Error {
    /// Playlist index of the failed track
    index: usize,
    /// Error message
    message: String,
  },

  /// Player worker has shut down
  Shutdown,
}
