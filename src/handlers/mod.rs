mod common_key_events;
mod playlist;

use super::app::App;
use crate::event::Key;

/// Keys that act on the player wherever the cursor is
pub fn handle_app(key: Key, app: &mut App) {
  match key {
    Key::Esc | Key::Char('q') | Key::Ctrl('c') => {
      app.should_quit = true;
    }
    Key::Char('n') => {
      let result = app.dispatcher().next();
      app.handle_dispatch_result(result);
    }
    Key::Char('p') => {
      let result = app.dispatcher().previous();
      app.handle_dispatch_result(result);
    }
    Key::Char('s') => {
      let result = app.dispatcher().stop();
      app.handle_dispatch_result(result);
    }
    Key::Char('x') | Key::Char(' ') => {
      let result = app.dispatcher().toggle_pause();
      app.handle_dispatch_result(result);
    }
    Key::Char('>') | Key::Char('+') => {
      let result = app.dispatcher().volume_up();
      app.handle_dispatch_result(result);
    }
    Key::Char('<') | Key::Char('-') => {
      let result = app.dispatcher().volume_down();
      app.handle_dispatch_result(result);
    }
    _ => playlist::handler(key, app),
  }
}
