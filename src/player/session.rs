//! One attempt to fetch, decode and render a single track

use super::state::PlaybackState;
use super::volume;
use crate::audio::{AudioFetcher, DecoderFactory, SinkLease, DEFAULT_CHUNK_SIZE};
use crate::error::PlaybackError;
use std::io::{Seek, SeekFrom};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// How long a paused session sleeps before checking the state again
pub const PAUSE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How a session ended
#[derive(Debug)]
pub enum SessionOutcome {
  /// The decoder reached the end of the stream
  Completed,
  /// Cancellation was observed between chunks
  Cancelled {
    /// Encoded-stream position to resume the same track from
    offset: u64,
  },
  /// Fetching, decoding or writing failed
  Failed(PlaybackError),
}

/// Outcome sent back to the worker, tagged with the session that produced it
#[derive(Debug)]
pub struct SessionReport {
  pub generation: u64,
  pub track_index: usize,
  pub outcome: SessionOutcome,
}

/// Everything a session needs besides its track
#[derive(Clone)]
pub struct SessionContext {
  pub fetcher: Arc<dyn AudioFetcher>,
  pub decoders: Arc<dyn DecoderFactory>,
  pub sink: Arc<SinkLease>,
  pub state: Arc<PlaybackState>,
  pub chunk_size: usize,
  pub pause_poll: Duration,
}

impl SessionContext {
  pub fn new(
    fetcher: Arc<dyn AudioFetcher>,
    decoders: Arc<dyn DecoderFactory>,
    sink: Arc<SinkLease>,
    state: Arc<PlaybackState>,
  ) -> Self {
    Self {
      fetcher,
      decoders,
      sink,
      state,
      chunk_size: DEFAULT_CHUNK_SIZE,
      pause_poll: PAUSE_POLL_INTERVAL,
    }
  }
}

/// A single track playback attempt, run on a blocking thread
pub struct PlaybackSession {
  generation: u64,
  track_index: usize,
  location: String,
  resume_offset: u64,
  cancel: Arc<AtomicBool>,
  ctx: SessionContext,
}

impl PlaybackSession {
  pub fn new(
    generation: u64,
    track_index: usize,
    location: impl Into<String>,
    resume_offset: u64,
    ctx: SessionContext,
  ) -> Self {
    Self {
      generation,
      track_index,
      location: location.into(),
      resume_offset,
      cancel: Arc::new(AtomicBool::new(false)),
      ctx,
    }
  }

  fn is_cancelled(&self) -> bool {
    self.cancel.load(Ordering::Acquire)
  }

  /// Play the track until it ends, fails or is cancelled
  pub fn run(&self) -> SessionOutcome {
    let mut source = match self.ctx.fetcher.fetch(&self.location) {
      Ok(source) => source,
      Err(e) => return SessionOutcome::Failed(e),
    };
    if self.resume_offset > 0 {
      if let Err(e) = source.seek(SeekFrom::Start(self.resume_offset)) {
        return SessionOutcome::Failed(e.into());
      }
    }
    if self.is_cancelled() {
      return SessionOutcome::Cancelled {
        offset: self.resume_offset,
      };
    }

    let mut decoder = match self.ctx.decoders.open(source, self.resume_offset) {
      Ok(decoder) => decoder,
      Err(e) => return SessionOutcome::Failed(e),
    };
    let mut chunk = vec![0u8; self.ctx.chunk_size.max(2)];

    loop {
      // Cancellation is only observed here, between chunks
      if self.is_cancelled() {
        return SessionOutcome::Cancelled {
          offset: decoder.stream_position(),
        };
      }
      if self.ctx.state.is_paused() {
        thread::sleep(self.ctx.pause_poll);
        continue;
      }

      let n = match decoder.read_chunk(&mut chunk) {
        Ok(0) => return SessionOutcome::Completed,
        Ok(n) => n,
        Err(e) => return SessionOutcome::Failed(e),
      };
      let pcm = &mut chunk[..n];
      volume::scale(pcm, self.ctx.state.volume());

      match self.ctx.sink.write(self.generation, pcm) {
        Ok(true) => {}
        // The sink now belongs to a newer session
        Ok(false) => {
          return SessionOutcome::Cancelled {
            offset: decoder.stream_position(),
          }
        }
        Err(e) => return SessionOutcome::Failed(e),
      }
    }
  }
}

/// The worker's handle on the running session
#[derive(Debug)]
pub struct SessionHandle {
  generation: u64,
  track_index: usize,
  cancel: Arc<AtomicBool>,
}

impl SessionHandle {
  pub fn generation(&self) -> u64 {
    self.generation
  }

  pub fn track_index(&self) -> usize {
    self.track_index
  }

  /// Ask the session to stop at its next chunk boundary
  pub fn cancel(&self) {
    self.cancel.store(true, Ordering::Release);
  }
}

/// Run `session` on the blocking pool and report its outcome on `reports`
pub fn spawn(session: PlaybackSession, reports: UnboundedSender<SessionReport>) -> SessionHandle {
  let generation = session.generation;
  let track_index = session.track_index;
  let cancel = Arc::clone(&session.cancel);

  // Detached; the outcome comes back through `reports`
  tokio::task::spawn_blocking(move || {
    let outcome = session.run();
    session.ctx.sink.release(session.generation);
    let _ = reports.send(SessionReport {
      generation: session.generation,
      track_index: session.track_index,
      outcome,
    });
  });

  SessionHandle {
    generation,
    track_index,
    cancel,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::player::testing::{pattern, Backend, Faults};

  fn session(backend: &Backend, location: &str, resume_offset: u64) -> PlaybackSession {
    backend.ctx.sink.grant(1);
    PlaybackSession::new(1, 0, location, resume_offset, backend.ctx.clone())
  }

  #[test]
  fn plays_the_whole_track_then_completes() {
    let backend = Backend::new(&[("a", pattern(1000))]);
    let outcome = session(&backend, "a", 0).run();
    assert!(matches!(outcome, SessionOutcome::Completed));
    assert_eq!(backend.written(), pattern(1000));
  }

  #[test]
  fn resumes_from_the_given_offset() {
    let backend = Backend::new(&[("a", pattern(1000))]);
    let outcome = session(&backend, "a", 600).run();
    assert!(matches!(outcome, SessionOutcome::Completed));
    assert_eq!(backend.written(), pattern(1000)[600..].to_vec());
  }

  #[test]
  fn applies_the_current_volume_to_each_chunk() {
    let backend = Backend::new(&[("a", vec![0x04, 0x00, 0x08, 0x00])]);
    backend.ctx.state.set_volume(0.5);
    session(&backend, "a", 0).run();
    assert_eq!(backend.written(), vec![0x02, 0x00, 0x04, 0x00]);
  }

  #[test]
  fn cancelled_session_reports_its_offset() {
    let backend = Backend::new(&[("a", pattern(1000))]);
    let session = session(&backend, "a", 100);
    session.cancel.store(true, Ordering::Release);
    match session.run() {
      SessionOutcome::Cancelled { offset } => assert_eq!(offset, 100),
      other => panic!("unexpected outcome {:?}", other),
    }
    assert!(backend.written().is_empty());
  }

  #[test]
  fn losing_the_sink_counts_as_cancellation() {
    let backend = Backend::new(&[("a", pattern(1000))]);
    let session = session(&backend, "a", 0);
    backend.ctx.sink.grant(2);
    match session.run() {
      SessionOutcome::Cancelled { offset } => assert_eq!(offset, 64),
      other => panic!("unexpected outcome {:?}", other),
    }
    assert!(backend.written().is_empty());
  }

  #[test]
  fn fetch_failure_is_reported_not_raised() {
    let backend = Backend::new(&[]);
    let outcome = session(&backend, "missing", 0).run();
    assert!(matches!(
      outcome,
      SessionOutcome::Failed(PlaybackError::Fetch { .. })
    ));
  }

  #[test]
  fn decode_error_mid_track_fails_the_session() {
    let backend = Backend::with_faults(
      &[("a", pattern(1000))],
      Faults {
        decode_fails_after: Some(2),
        ..Faults::default()
      },
    );
    let outcome = session(&backend, "a", 0).run();
    assert!(matches!(
      outcome,
      SessionOutcome::Failed(PlaybackError::Decode(_))
    ));
    // The two good chunks were played before the failure
    assert_eq!(backend.written(), pattern(1000)[..128].to_vec());
  }

  #[test]
  fn sink_write_error_fails_the_session() {
    let backend = Backend::with_faults(
      &[("a", pattern(1000))],
      Faults {
        writes_fail: true,
        ..Faults::default()
      },
    );
    let outcome = session(&backend, "a", 0).run();
    assert!(matches!(
      outcome,
      SessionOutcome::Failed(PlaybackError::SinkWrite(_))
    ));
    assert!(backend.written().is_empty());
  }

  #[test]
  fn paused_session_holds_back_chunks() {
    let backend = Backend::new(&[("a", pattern(1000))]);
    backend.ctx.state.set_paused(true);
    let session = Arc::new(session(&backend, "a", 0));

    let runner = {
      let session = Arc::clone(&session);
      thread::spawn(move || session.run())
    };
    thread::sleep(Duration::from_millis(50));
    assert!(backend.written().is_empty());

    backend.ctx.state.set_paused(false);
    let outcome = runner.join().unwrap();
    assert!(matches!(outcome, SessionOutcome::Completed));
    assert_eq!(backend.written(), pattern(1000));
  }
}
