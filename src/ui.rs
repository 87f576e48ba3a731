use crate::app::App;
use crate::player::EngineStatus;
use ratatui::{
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
  Frame,
};

const HELP: &str =
  "Enter play  n next  p prev  s stop  x pause  > vol+  < vol-  j/k move  Esc quit";

pub fn draw_main_layout(f: &mut Frame, app: &App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Min(3),
      Constraint::Length(4),
      Constraint::Length(1),
    ])
    .split(f.size());

  draw_playlist(f, app, chunks[0]);
  draw_now_playing(f, app, chunks[1]);
  draw_help(f, chunks[2]);
}

fn draw_playlist(f: &mut Frame, app: &App, layout_chunk: Rect) {
  let marked_index = match app.snapshot.status {
    EngineStatus::Idle => None,
    _ => Some(app.snapshot.track_index),
  };
  let marker = if app.snapshot.is_playing() { "▶ " } else { "‖ " };

  let items: Vec<ListItem> = app
    .playlist
    .tracks()
    .iter()
    .enumerate()
    .map(|(i, track)| {
      let marker = if Some(i) == marked_index { marker } else { "  " };
      ListItem::new(format!("{}[{}] {}", marker, i + 1, track.display_name()))
    })
    .collect();

  let title = format!("Playlist ({})", app.playlist.len());
  let list = List::new(items)
    .block(Block::default().borders(Borders::ALL).title(title))
    .highlight_style(
      Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD),
    );

  let mut state = ListState::default();
  if !app.playlist.is_empty() {
    state.select(Some(app.selected_index));
  }
  f.render_stateful_widget(list, layout_chunk, &mut state);
}

fn draw_now_playing(f: &mut Frame, app: &App, layout_chunk: Rect) {
  let status_style = match app.snapshot.status {
    EngineStatus::Playing => Style::default().fg(Color::Green),
    EngineStatus::Paused => Style::default().fg(Color::Yellow),
    EngineStatus::Transitioning | EngineStatus::Idle => Style::default(),
  };

  let mut lines = vec![Line::from(vec![
    Span::styled(app.now_playing(), status_style),
    Span::raw(format!("   Volume: {}%", app.snapshot.volume_percent)),
  ])];
  if let Some(message) = &app.status_message {
    lines.push(Line::from(Span::styled(
      message.as_str(),
      Style::default().fg(Color::Red),
    )));
  }

  let paragraph =
    Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Player"));
  f.render_widget(paragraph, layout_chunk);
}

fn draw_help(f: &mut Frame, layout_chunk: Rect) {
  let help = Paragraph::new(HELP).style(Style::default().fg(Color::DarkGray));
  f.render_widget(help, layout_chunk);
}
