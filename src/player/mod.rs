//! Sequential playback engine
//!
//! This module plays a playlist one track at a time: each track runs in its
//! own session (fetch, decode, volume, output) on a blocking thread, while a
//! worker thread reacts to user commands and session outcomes.

mod commands;
mod dispatcher;
mod events;
mod session;
mod state;
mod volume;
mod worker;

#[cfg(test)]
mod testing;

pub use commands::PlayerCommand;
pub use dispatcher::CommandDispatcher;
pub use events::PlayerEvent;
pub use session::PAUSE_POLL_INTERVAL;
pub use state::{EngineStatus, PlaybackSnapshot};
pub use volume::clamp_volume;
pub use worker::{PlayerBackend, PlayerWorkerConfig};

use crate::playlist::Playlist;
use state::PlaybackState;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use worker::spawn_player_worker;

/// Handle for controlling the player from the main application
pub struct PlayerHandle {
  /// Sends commands to the player worker thread
  pub dispatcher: CommandDispatcher,
  /// Receives events from the player worker thread
  event_rx: mpsc::Receiver<PlayerEvent>,
  state: Arc<PlaybackState>,
  playlist: Arc<Playlist>,
  worker: Option<JoinHandle<()>>,
}

impl PlayerHandle {
  /// Start the worker thread and return a handle to it
  pub fn spawn(
    playlist: Arc<Playlist>,
    initial_volume: f32,
    backend: PlayerBackend,
    config: PlayerWorkerConfig,
  ) -> std::io::Result<Self> {
    let state = Arc::new(PlaybackState::new(initial_volume));
    let (command_tx, event_rx, worker) =
      spawn_player_worker(Arc::clone(&playlist), Arc::clone(&state), backend, config)?;

    Ok(Self {
      dispatcher: CommandDispatcher::new(command_tx),
      event_rx,
      state,
      playlist,
      worker: Some(worker),
    })
  }

  /// Try to receive an event from the player worker (non-blocking)
  pub fn try_recv_event(&self) -> Option<PlayerEvent> {
    self.event_rx.try_recv().ok()
  }

  /// Current playback state, as the display should show it
  pub fn snapshot(&self) -> PlaybackSnapshot {
    let playlist = &self.playlist;
    self
      .state
      .snapshot(|index| playlist.get(index).map(|t| t.display_name().to_string()))
  }

  /// Stop playback and wait for the worker thread to exit
  pub fn shutdown(&mut self) {
    if self.dispatcher.shutdown().is_err() {
      log::debug!("player worker already gone");
    }
    if let Some(worker) = self.worker.take() {
      if worker.join().is_err() {
        log::error!("player worker panicked");
      }
    }
  }
}

impl Drop for PlayerHandle {
  fn drop(&mut self) {
    self.shutdown();
  }
}
