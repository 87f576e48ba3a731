//! Player worker: the playback engine's control loop
//!
//! The worker owns the running session (at most one), reacts to commands
//! from the UI and to outcomes reported by sessions, and decides when to
//! advance to the next track.

use super::commands::PlayerCommand;
use super::events::PlayerEvent;
use super::session::{
  self, PlaybackSession, SessionContext, SessionHandle, SessionOutcome, SessionReport,
  PAUSE_POLL_INTERVAL,
};
use super::state::{EngineStatus, PlaybackState};
use crate::audio::{AudioFetcher, DecoderFactory, SinkLease, DEFAULT_CHUNK_SIZE};
use crate::playlist::Playlist;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Configuration for the player worker
#[derive(Debug, Clone)]
pub struct PlayerWorkerConfig {
  /// How long to wait for a cancelled session to report before detaching it
  pub cancel_grace: Duration,
  /// Bytes of PCM decoded per chunk
  pub chunk_size: usize,
  /// Sleep between pause checks inside a session
  pub pause_poll: Duration,
}

impl Default for PlayerWorkerConfig {
  fn default() -> Self {
    Self {
      cancel_grace: Duration::from_millis(250),
      chunk_size: DEFAULT_CHUNK_SIZE,
      pause_poll: PAUSE_POLL_INTERVAL,
    }
  }
}

/// The audio collaborators sessions are built from
#[derive(Clone)]
pub struct PlayerBackend {
  pub fetcher: Arc<dyn AudioFetcher>,
  pub decoders: Arc<dyn DecoderFactory>,
  pub sink: Arc<SinkLease>,
}

/// The worker that runs the playback state machine
pub struct PlayerWorker {
  /// Channel to receive commands from the UI thread
  command_rx: UnboundedReceiver<PlayerCommand>,
  /// Channel to send events to the UI thread
  event_tx: mpsc::Sender<PlayerEvent>,
  /// Sessions report their outcome here
  report_tx: UnboundedSender<SessionReport>,
  report_rx: UnboundedReceiver<SessionReport>,
  playlist: Arc<Playlist>,
  state: Arc<PlaybackState>,
  ctx: SessionContext,
  config: PlayerWorkerConfig,
  /// The one live session, if any
  active: Option<SessionHandle>,
  last_generation: u64,
}

impl PlayerWorker {
  /// Create a new player worker
  pub fn new(
    command_rx: UnboundedReceiver<PlayerCommand>,
    event_tx: mpsc::Sender<PlayerEvent>,
    playlist: Arc<Playlist>,
    state: Arc<PlaybackState>,
    backend: PlayerBackend,
    config: PlayerWorkerConfig,
  ) -> Self {
    let (report_tx, report_rx) = unbounded_channel();
    let mut ctx = SessionContext::new(
      backend.fetcher,
      backend.decoders,
      backend.sink,
      Arc::clone(&state),
    );
    ctx.chunk_size = config.chunk_size;
    ctx.pause_poll = config.pause_poll;

    Self {
      command_rx,
      event_tx,
      report_tx,
      report_rx,
      playlist,
      state,
      ctx,
      config,
      active: None,
      last_generation: 0,
    }
  }

  fn emit(&self, event: PlayerEvent) {
    let _ = self.event_tx.send(event);
  }

  fn track_name(&self, index: usize) -> String {
    self
      .playlist
      .get(index)
      .map(|t| t.display_name().to_string())
      .unwrap_or_default()
  }

  /// Run the player worker event loop
  pub async fn run(&mut self) {
    log::info!("player worker started with {} tracks", self.playlist.len());

    loop {
      tokio::select! {
        cmd = self.command_rx.recv() => match cmd {
          Some(cmd) => {
            if self.handle_command(cmd).await {
              break;
            }
          }
          None => {
            log::debug!("command channel closed, exiting");
            break;
          }
        },
        Some(report) = self.report_rx.recv() => self.handle_report(report).await,
      }
    }

    self.retire_active().await;
    self.state.set_status(EngineStatus::Idle);
    self.emit(PlayerEvent::Shutdown);
    log::info!("player worker stopped");
  }

  /// Apply one command. Returns true when the worker should shut down.
  pub async fn handle_command(&mut self, cmd: PlayerCommand) -> bool {
    log::debug!("command: {:?}", cmd);
    match cmd {
      PlayerCommand::PlayIndex(index) => self.play(index).await,
      PlayerCommand::Next => {
        let next = self.playlist.next_index(self.state.current_index());
        self.play(next).await;
      }
      PlayerCommand::Previous => {
        let previous = self.playlist.previous_index(self.state.current_index());
        self.play(previous).await;
      }
      PlayerCommand::Stop => self.stop().await,
      // The in-flight guard is released when the command drops at the end
      // of this arm
      PlayerCommand::TogglePause(_guard) => {
        if self.active.is_some() {
          let paused = self.state.toggle_paused();
          self.announce_pause(paused);
        } else {
          log::debug!("no session to pause or resume");
        }
      }
      PlayerCommand::VolumeUp => {
        let volume = self.state.adjust_volume(1);
        self.emit(PlayerEvent::VolumeChanged { volume });
      }
      PlayerCommand::VolumeDown => {
        let volume = self.state.adjust_volume(-1);
        self.emit(PlayerEvent::VolumeChanged { volume });
      }
      PlayerCommand::Shutdown => return true,
    }
    false
  }

  /// Apply a session outcome, ignoring outcomes from superseded sessions
  pub async fn handle_report(&mut self, report: SessionReport) {
    match &self.active {
      Some(active) if active.generation() == report.generation => {}
      _ => {
        log::debug!(
          "ignoring outcome of superseded session {} (track {})",
          report.generation,
          report.track_index
        );
        return;
      }
    }
    self.active = None;

    match report.outcome {
      SessionOutcome::Completed => {
        log::info!("finished {}", self.track_name(report.track_index));
        self.emit(PlayerEvent::TrackEnded {
          index: report.track_index,
        });
        self.state.set_offset(0);
        let next = self.playlist.next_index(report.track_index);
        self.play(next).await;
      }
      SessionOutcome::Cancelled { offset } => {
        // Only the worker cancels, and it always detaches first; keep the
        // position in case the same track is played again.
        self.state.set_offset(offset);
        self.state.set_status(EngineStatus::Idle);
      }
      SessionOutcome::Failed(e) => {
        let name = self.track_name(report.track_index);
        log::error!("could not play {}: {}", name, e);
        self.state.set_offset(0);
        self.state.set_paused(false);
        self.state.set_status(EngineStatus::Idle);
        self.emit(PlayerEvent::Error {
          index: report.track_index,
          message: format!("{}: {}", name, e),
        });
      }
    }
  }

  /// Start playing `index`, replacing any running session
  async fn play(&mut self, index: usize) {
    if self.playlist.is_empty() {
      log::warn!("playlist is empty, nothing to play");
      return;
    }
    let index = self.playlist.clamp_index(index);

    let retired = self.retire_active().await;
    self.state.select(index);
    if let Some((old_index, Some(offset))) = retired {
      if old_index == index {
        self.state.set_offset(offset);
      }
    }
    self.state.set_paused(false);
    self.start_session(index);
  }

  fn start_session(&mut self, index: usize) {
    let Some(track) = self.playlist.get(index) else {
      return;
    };
    self.last_generation += 1;
    let generation = self.last_generation;
    let resume_offset = self.state.offset();

    // Waits out any write still in progress, then locks the old session out
    self.ctx.sink.grant(generation);
    let session = PlaybackSession::new(
      generation,
      index,
      track.location(),
      resume_offset,
      self.ctx.clone(),
    );
    self.active = Some(session::spawn(session, self.report_tx.clone()));
    self.state.set_status(EngineStatus::Playing);

    log::info!(
      "playing {} (track {}, offset {})",
      track.display_name(),
      index,
      resume_offset
    );
    self.emit(PlayerEvent::TrackStarted {
      index,
      name: track.display_name().to_string(),
      resume_offset,
    });
  }

  async fn stop(&mut self) {
    self.retire_active().await;
    self.state.set_offset(0);
    self.state.set_paused(false);
    self.state.set_status(EngineStatus::Idle);
    self.emit(PlayerEvent::Stopped);
  }

  fn announce_pause(&self, paused: bool) {
    let index = self.state.current_index();
    if paused {
      self.state.set_status(EngineStatus::Paused);
      self.emit(PlayerEvent::Paused { index });
    } else {
      self.state.set_status(EngineStatus::Playing);
      self.emit(PlayerEvent::Resumed { index });
    }
  }

  /// Cancel the live session and wait, at most `cancel_grace`, for its outcome.
  ///
  /// Returns the retired session's track and, if it reported in time, the
  /// offset to resume that track from.
  async fn retire_active(&mut self) -> Option<(usize, Option<u64>)> {
    let handle = self.active.take()?;
    handle.cancel();
    self.state.set_status(EngineStatus::Transitioning);

    let generation = handle.generation();
    let grace = self.config.cancel_grace;
    let reports = &mut self.report_rx;
    let wait = async {
      while let Some(report) = reports.recv().await {
        if report.generation == generation {
          return Some(report.outcome);
        }
        log::debug!("dropping stale outcome of session {}", report.generation);
      }
      None
    };

    let offset = match tokio::time::timeout(grace, wait).await {
      Ok(Some(SessionOutcome::Cancelled { offset })) => Some(offset),
      Ok(Some(SessionOutcome::Completed)) => Some(0),
      Ok(Some(SessionOutcome::Failed(e))) => {
        log::warn!("superseded session {} failed: {}", generation, e);
        None
      }
      Ok(None) => None,
      Err(_) => {
        log::warn!(
          "session {} did not stop within {:?}, detaching it",
          generation,
          grace
        );
        None
      }
    };
    Some((handle.track_index(), offset))
  }
}

/// Spawn the player worker on its own thread
/// Returns the command sender, the event receiver and the thread handle
pub fn spawn_player_worker(
  playlist: Arc<Playlist>,
  state: Arc<PlaybackState>,
  backend: PlayerBackend,
  config: PlayerWorkerConfig,
) -> std::io::Result<(
  UnboundedSender<PlayerCommand>,
  mpsc::Receiver<PlayerEvent>,
  std::thread::JoinHandle<()>,
)> {
  let (cmd_tx, cmd_rx) = unbounded_channel();
  let (event_tx, event_rx) = mpsc::channel();

  let grace = config.cancel_grace;
  let mut worker = PlayerWorker::new(cmd_rx, event_tx, playlist, state, backend, config);

  let handle = std::thread::Builder::new()
    .name("player-worker".to_string())
    .spawn(move || {
      let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
      {
        Ok(rt) => rt,
        Err(e) => {
          log::error!("failed to create runtime for player worker: {}", e);
          return;
        }
      };

      rt.block_on(worker.run());
      // A session stuck in a fetch never sees its cancel flag; leave it behind
      // instead of waiting for it
      rt.shutdown_timeout(grace);
    })?;

  Ok((cmd_tx, event_rx, handle))
}
