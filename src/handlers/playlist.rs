use super::{super::app::App, common_key_events};
use crate::event::Key;

pub fn handler(key: Key, app: &mut App) {
  let tracks = app.playlist.tracks();
  match key {
    k if common_key_events::down_event(k) => {
      app.selected_index =
        common_key_events::on_down_press_handler(tracks, Some(app.selected_index));
    }
    k if common_key_events::up_event(k) => {
      app.selected_index =
        common_key_events::on_up_press_handler(tracks, Some(app.selected_index));
    }
    k if common_key_events::high_event(k) => {
      app.selected_index = common_key_events::on_high_press_handler();
    }
    k if common_key_events::middle_event(k) => {
      app.selected_index = common_key_events::on_middle_press_handler(tracks);
    }
    k if common_key_events::low_event(k) => {
      app.selected_index = common_key_events::on_low_press_handler(tracks);
    }
    Key::Enter => {
      if !app.playlist.is_empty() {
        app.play_selected();
      }
    }
    _ => {}
  };
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::player::{CommandDispatcher, PlayerCommand};
  use crate::playlist::{Playlist, Track};
  use std::sync::Arc;
  use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

  fn app_with_tracks(count: usize) -> (App, UnboundedReceiver<PlayerCommand>) {
    let (tx, rx) = unbounded_channel();
    let tracks = (0..count).map(|i| Track::new(format!("{}.mp3", i))).collect();
    let app = App::new(Arc::new(Playlist::new(tracks)), CommandDispatcher::new(tx));
    (app, rx)
  }

  #[test]
  fn selection_wraps() {
    let (mut app, _rx) = app_with_tracks(3);
    handler(Key::Up, &mut app);
    assert_eq!(app.selected_index, 2);
    handler(Key::Char('j'), &mut app);
    assert_eq!(app.selected_index, 0);
    handler(Key::Down, &mut app);
    assert_eq!(app.selected_index, 1);
  }

  #[test]
  fn jumps_to_top_middle_and_bottom() {
    let (mut app, _rx) = app_with_tracks(5);
    handler(Key::Char('L'), &mut app);
    assert_eq!(app.selected_index, 4);
    handler(Key::Char('M'), &mut app);
    assert_eq!(app.selected_index, 2);
    handler(Key::Char('H'), &mut app);
    assert_eq!(app.selected_index, 0);
  }

  #[test]
  fn enter_plays_the_selected_track() {
    let (mut app, mut rx) = app_with_tracks(3);
    app.selected_index = 2;
    handler(Key::Enter, &mut app);
    assert!(matches!(rx.try_recv().unwrap(), PlayerCommand::PlayIndex(2)));
  }

  #[test]
  fn enter_on_empty_playlist_does_nothing() {
    let (mut app, mut rx) = app_with_tracks(0);
    handler(Key::Enter, &mut app);
    assert!(rx.try_recv().is_err());
  }
}
