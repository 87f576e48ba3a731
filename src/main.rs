mod app;
mod audio;
mod config;
mod error;
mod event;
mod handlers;
mod player;
mod playlist;
mod ui;

use crate::app::App;
use crate::audio::{CpalSink, CpalSinkConfig, HttpFetcher, SinkLease, SymphoniaDecoderFactory};
use crate::config::UserConfig;
use crate::event::{Event, Events};
use crate::player::{clamp_volume, PlayerBackend, PlayerHandle};
use crate::playlist::Playlist;
use anyhow::{anyhow, Context, Result};
use backtrace::Backtrace;
use clap::Parser;
use crossterm::{
  cursor::MoveTo,
  execute,
  terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
  fs::OpenOptions,
  io::{self, stdout},
  panic,
  path::{Path, PathBuf},
  sync::Arc,
};

const TICK_RATE_MS: u64 = 100;

/// A terminal playlist player
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
  /// Playlist file with one track location (URL or path) per line
  playlist: PathBuf,

  /// Config file to use instead of the default location
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Where to write the log
  #[arg(long, value_name = "FILE")]
  log_file: Option<PathBuf>,

  /// Initial volume, 0.0 to 2.0
  #[arg(long, value_name = "LEVEL")]
  volume: Option<f32>,
}

fn close_application() -> Result<()> {
  disable_raw_mode()?;
  let mut stdout = io::stdout();
  execute!(stdout, LeaveAlternateScreen)?;
  Ok(())
}

fn panic_hook(info: &panic::PanicInfo<'_>) {
  if cfg!(debug_assertions) {
    let location = info
      .location()
      .map(ToString::to_string)
      .unwrap_or_default();

    let msg = match info.payload().downcast_ref::<&'static str>() {
      Some(s) => *s,
      None => match info.payload().downcast_ref::<String>() {
        Some(s) => &s[..],
        None => "Box<Any>",
      },
    };

    let stacktrace: String = format!("{:?}", Backtrace::new()).replace('\n', "\n\r");

    let _ = disable_raw_mode();
    let _ = execute!(
      io::stdout(),
      LeaveAlternateScreen,
      crossterm::style::Print(format!(
        "thread '<unnamed>' panicked at '{}', {}\n\r{}",
        msg, location, stacktrace
      )),
    );
  } else {
    let _ = close_application();
    eprintln!("{}", info);
  }
}

fn setup_logging(path: &Path) -> Result<()> {
  let file = OpenOptions::new()
    .create(true)
    .append(true)
    .open(path)
    .with_context(|| format!("could not open log file {}", path.display()))?;

  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
    .target(env_logger::Target::Pipe(Box::new(file)))
    .format_timestamp_millis()
    .try_init()
    .map_err(|e| anyhow!("could not initialise logging: {}", e))
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let mut user_config = UserConfig::load(cli.config.as_deref())?;
  if let Some(volume) = cli.volume {
    user_config.initial_volume = clamp_volume(volume);
  }
  if let Some(log_file) = cli.log_file {
    user_config.log_file = log_file;
  }
  setup_logging(&user_config.log_file)?;

  let playlist = Arc::new(Playlist::load(&cli.playlist)?);
  log::info!(
    "loaded {} tracks from {}",
    playlist.len(),
    cli.playlist.display()
  );
  if playlist.is_empty() {
    log::warn!("playlist {} has no tracks", cli.playlist.display());
  }

  let sink = CpalSink::open(CpalSinkConfig {
    device_name: user_config.audio_device.clone(),
    queue_chunks: user_config.sink_queue_chunks,
  })
  .context("could not open the audio output")?;

  let backend = PlayerBackend {
    fetcher: Arc::new(HttpFetcher::new(user_config.fetch_timeout())),
    decoders: Arc::new(SymphoniaDecoderFactory),
    sink: Arc::new(SinkLease::new(Box::new(sink))),
  };
  let mut player = PlayerHandle::spawn(
    Arc::clone(&playlist),
    user_config.initial_volume,
    backend,
    user_config.worker_config(),
  )
  .context("could not start the player")?;

  panic::set_hook(Box::new(|info| {
    panic_hook(info);
  }));

  enable_raw_mode()?;
  let mut stdout = stdout();
  execute!(stdout, EnterAlternateScreen)?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend)?;
  terminal.hide_cursor()?;

  let mut app = App::new(playlist, player.dispatcher.clone());
  let result = run_ui(&mut terminal, &mut app, &player);

  player.shutdown();
  terminal.show_cursor()?;
  execute!(terminal.backend_mut(), MoveTo(0, 0))?;
  close_application()?;
  log::info!("exiting");

  result
}

fn run_ui(
  terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
  app: &mut App,
  player: &PlayerHandle,
) -> Result<()> {
  let events = Events::new(TICK_RATE_MS);

  loop {
    while let Some(event) = player.try_recv_event() {
      app.handle_player_event(event);
    }
    app.update_snapshot(player.snapshot());

    terminal.draw(|f| ui::draw_main_layout(f, app))?;

    match events.next()? {
      Event::Input(key) => handlers::handle_app(key, app),
      Event::Tick => {}
    }

    if app.should_quit {
      break;
    }
  }

  Ok(())
}
