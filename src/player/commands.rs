//! Commands for controlling the player
//!
//! These commands are sent from the UI thread to the player worker thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Marks a command as in flight until the worker has finished with it
///
/// The flag is raised by the dispatcher before sending and lowered when the
/// worker drops the command after handling it (or when the send fails and
/// the command is dropped with the error).
#[derive(Debug)]
pub struct InFlight(Arc<AtomicBool>);

impl InFlight {
  /// Raise `flag`, or return `None` if it is already raised
  pub fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
    if flag.swap(true, Ordering::AcqRel) {
      None
    } else {
      Some(Self(Arc::clone(flag)))
    }
  }
}

impl Drop for InFlight {
  fn drop(&mut self) {
    self.0.store(false, Ordering::Release);
  }
}

/// Commands that can be sent to the player worker
#[derive(Debug)]
pub enum PlayerCommand {
  /// Play the track at this playlist index
  PlayIndex(usize),

  /// Skip to the next track, wrapping at the end
  Next,

  /// Go back to the previous track, wrapping at the start
  Previous,

  /// Stop playback and forget the position
  Stop,

  /// Pause if playing, resume if paused
  TogglePause(InFlight),

  /// Raise the volume by one step
  VolumeUp,

  /// Lower the volume by one step
  VolumeDown,

  /// Shutdown the player worker
  Shutdown,
}
