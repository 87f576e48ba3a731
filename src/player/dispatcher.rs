//! Translates user intents into worker commands

use super::commands::{InFlight, PlayerCommand};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{error::SendError, UnboundedSender};

/// Sends commands to the player worker in the order they are issued
///
/// Sending never blocks, so this is safe to call from the UI thread.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
  command_tx: UnboundedSender<PlayerCommand>,
  toggle_in_flight: Arc<AtomicBool>,
}

impl CommandDispatcher {
  pub fn new(command_tx: UnboundedSender<PlayerCommand>) -> Self {
    Self {
      command_tx,
      toggle_in_flight: Arc::new(AtomicBool::new(false)),
    }
  }

  /// Send a command to the player worker
  pub fn send_command(&self, cmd: PlayerCommand) -> Result<(), SendError<PlayerCommand>> {
    self.command_tx.send(cmd)
  }

  pub fn play_index(&self, index: usize) -> Result<(), SendError<PlayerCommand>> {
    self.send_command(PlayerCommand::PlayIndex(index))
  }

  pub fn next(&self) -> Result<(), SendError<PlayerCommand>> {
    self.send_command(PlayerCommand::Next)
  }

  pub fn previous(&self) -> Result<(), SendError<PlayerCommand>> {
    self.send_command(PlayerCommand::Previous)
  }

  pub fn stop(&self) -> Result<(), SendError<PlayerCommand>> {
    self.send_command(PlayerCommand::Stop)
  }

  pub fn volume_up(&self) -> Result<(), SendError<PlayerCommand>> {
    self.send_command(PlayerCommand::VolumeUp)
  }

  pub fn volume_down(&self) -> Result<(), SendError<PlayerCommand>> {
    self.send_command(PlayerCommand::VolumeDown)
  }

  pub fn shutdown(&self) -> Result<(), SendError<PlayerCommand>> {
    self.send_command(PlayerCommand::Shutdown)
  }

  /// Toggle pause, unless a previous toggle is still being handled.
  ///
  /// Returns `Ok(false)` when the toggle was dropped as a repeat.
  pub fn toggle_pause(&self) -> Result<bool, SendError<PlayerCommand>> {
    let Some(guard) = InFlight::acquire(&self.toggle_in_flight) else {
      log::debug!("toggle pause already in flight, ignoring repeat");
      return Ok(false);
    };
    self.send_command(PlayerCommand::TogglePause(guard))?;
    Ok(true)
  }

  /// Whether a toggle-pause is waiting for the worker
  pub fn toggle_pending(&self) -> bool {
    self.toggle_in_flight.load(Ordering::Acquire)
  }
}
