//! Playback state shared between the worker and the running session

use super::volume::{clamp_volume, step_volume, volume_percent};
use std::sync::{Mutex, MutexGuard};

/// Where the engine is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineStatus {
  /// No session is running
  #[default]
  Idle,
  /// A session is delivering chunks
  Playing,
  /// A session is alive but holding back chunks
  Paused,
  /// The previous session was cancelled and the next one is not started yet
  Transitioning,
}

#[derive(Debug)]
struct Fields {
  current_index: usize,
  offset: u64,
  paused: bool,
  volume: f32,
  status: EngineStatus,
}

/// The single playback state instance
///
/// Every read and write takes the one lock, but only for the field access
/// itself; the session never holds it across a decode or a sink write.
#[derive(Debug)]
pub struct PlaybackState {
  fields: Mutex<Fields>,
}

impl PlaybackState {
  pub fn new(initial_volume: f32) -> Self {
    Self {
      fields: Mutex::new(Fields {
        current_index: 0,
        offset: 0,
        paused: false,
        volume: clamp_volume(initial_volume),
        status: EngineStatus::Idle,
      }),
    }
  }

  fn lock(&self) -> MutexGuard<'_, Fields> {
    // Fields stay consistent even if a holder panicked; every write is a
    // single assignment.
    self.fields.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  pub fn current_index(&self) -> usize {
    self.lock().current_index
  }

  pub fn offset(&self) -> u64 {
    self.lock().offset
  }

  pub fn is_paused(&self) -> bool {
    self.lock().paused
  }

  pub fn volume(&self) -> f32 {
    self.lock().volume
  }

  pub fn status(&self) -> EngineStatus {
    self.lock().status
  }

  /// Select a track. Selecting a different track drops the saved offset.
  pub(super) fn select(&self, index: usize) {
    let mut fields = self.lock();
    if fields.current_index != index {
      fields.offset = 0;
    }
    fields.current_index = index;
  }

  pub(super) fn set_offset(&self, offset: u64) {
    self.lock().offset = offset;
  }

  pub(super) fn set_paused(&self, paused: bool) {
    self.lock().paused = paused;
  }

  /// Flip the pause flag and return the new value
  pub(super) fn toggle_paused(&self) -> bool {
    let mut fields = self.lock();
    fields.paused = !fields.paused;
    fields.paused
  }

  pub(super) fn set_status(&self, status: EngineStatus) {
    self.lock().status = status;
  }

  /// Move the volume by `steps` increments and return the clamped result
  pub(super) fn adjust_volume(&self, steps: i32) -> f32 {
    let mut fields = self.lock();
    fields.volume = step_volume(fields.volume, steps);
    fields.volume
  }

  #[cfg(test)]
  pub(super) fn set_volume(&self, volume: f32) -> f32 {
    let mut fields = self.lock();
    fields.volume = clamp_volume(volume);
    fields.volume
  }

  /// Consistent copy of the state for display
  pub fn snapshot(&self, track_name: impl FnOnce(usize) -> Option<String>) -> PlaybackSnapshot {
    let (index, status, volume, paused) = {
      let fields = self.lock();
      (fields.current_index, fields.status, fields.volume, fields.paused)
    };
    let track_name = match status {
      EngineStatus::Idle => None,
      _ => track_name(index),
    };
    PlaybackSnapshot {
      status,
      track_index: index,
      track_name,
      paused,
      volume_percent: volume_percent(volume),
    }
  }
}

impl Default for PlaybackState {
  fn default() -> Self {
    Self::new(1.0)
  }
}

/// Read-only view of the playback state for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlaybackSnapshot {
  pub status: EngineStatus,
  pub track_index: usize,
  /// Display name of the track being played, `None` when idle
  pub track_name: Option<String>,
  pub paused: bool,
  pub volume_percent: u32,
}

impl PlaybackSnapshot {
  pub fn is_playing(&self) -> bool {
    self.status == EngineStatus::Playing
  }
}
