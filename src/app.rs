use crate::player::{CommandDispatcher, PlaybackSnapshot, PlayerCommand, PlayerEvent};
use crate::playlist::Playlist;
use std::sync::Arc;
use tokio::sync::mpsc::error::SendError;

pub struct App {
  pub playlist: Arc<Playlist>,
  /// Highlighted row in the playlist
  pub selected_index: usize,
  /// Last state read from the player
  pub snapshot: PlaybackSnapshot,
  /// Last error or notice shown under the now-playing panel
  pub status_message: Option<String>,
  pub should_quit: bool,
  dispatcher: CommandDispatcher,
}

impl App {
  pub fn new(playlist: Arc<Playlist>, dispatcher: CommandDispatcher) -> App {
    App {
      playlist,
      selected_index: 0,
      snapshot: PlaybackSnapshot::default(),
      status_message: None,
      should_quit: false,
      dispatcher,
    }
  }

  pub fn dispatcher(&self) -> &CommandDispatcher {
    &self.dispatcher
  }

  /// Report a command the player can no longer receive
  pub fn handle_dispatch_result<T>(&mut self, result: Result<T, SendError<PlayerCommand>>) {
    if let Err(e) = result {
      log::error!("player unavailable, dropped {:?}", e.0);
      self.status_message = Some("Player has stopped".to_string());
    }
  }

  pub fn play_selected(&mut self) {
    let result = self.dispatcher.play_index(self.selected_index);
    self.handle_dispatch_result(result);
  }

  pub fn update_snapshot(&mut self, snapshot: PlaybackSnapshot) {
    self.snapshot = snapshot;
  }

  pub fn handle_player_event(&mut self, event: PlayerEvent) {
    match event {
      PlayerEvent::TrackStarted { index, .. } => {
        // Follow the player on auto-advance and next/previous
        self.selected_index = index;
        self.status_message = None;
      }
      PlayerEvent::Error { message, .. } => {
        self.status_message = Some(message);
      }
      PlayerEvent::Stopped => {
        self.status_message = None;
      }
      PlayerEvent::Shutdown => {
        self.should_quit = true;
      }
      PlayerEvent::Paused { .. }
      | PlayerEvent::Resumed { .. }
      | PlayerEvent::TrackEnded { .. }
      | PlayerEvent::VolumeChanged { .. } => {}
    }
  }

  /// Text for the now-playing panel
  pub fn now_playing(&self) -> String {
    match &self.snapshot.track_name {
      Some(name) if self.snapshot.paused => format!("Paused: {}", name),
      Some(name) => format!("Now Playing: {}", name),
      None => "Now Playing: None".to_string(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::player::EngineStatus;
  use crate::playlist::Track;
  use tokio::sync::mpsc::unbounded_channel;

  fn app() -> App {
    let (tx, _rx) = unbounded_channel();
    let playlist = Playlist::new(vec![Track::new("a.mp3"), Track::new("b.mp3")]);
    App::new(Arc::new(playlist), CommandDispatcher::new(tx))
  }

  #[test]
  fn now_playing_text() {
    let mut app = app();
    assert_eq!(app.now_playing(), "Now Playing: None");

    app.update_snapshot(PlaybackSnapshot {
      status: EngineStatus::Playing,
      track_index: 1,
      track_name: Some("b.mp3".to_string()),
      paused: false,
      volume_percent: 100,
    });
    assert_eq!(app.now_playing(), "Now Playing: b.mp3");

    app.snapshot.paused = true;
    app.snapshot.status = EngineStatus::Paused;
    assert_eq!(app.now_playing(), "Paused: b.mp3");
  }

  #[test]
  fn selection_follows_started_track() {
    let mut app = app();
    app.handle_player_event(PlayerEvent::TrackStarted {
      index: 1,
      name: "b.mp3".to_string(),
      resume_offset: 0,
    });
    assert_eq!(app.selected_index, 1);
  }

  #[test]
  fn errors_are_shown_until_the_next_track() {
    let mut app = app();
    app.handle_player_event(PlayerEvent::Error {
      index: 0,
      message: "a.mp3: decode error".to_string(),
    });
    assert_eq!(app.status_message.as_deref(), Some("a.mp3: decode error"));

    app.handle_player_event(PlayerEvent::TrackStarted {
      index: 1,
      name: "b.mp3".to_string(),
      resume_offset: 0,
    });
    assert_eq!(app.status_message, None);
  }

  #[test]
  fn closed_player_is_reported() {
    let mut app = app();
    // The receiver in `app()` is already dropped
    app.play_selected();
    assert_eq!(app.status_message.as_deref(), Some("Player has stopped"));
  }
}
