//! In-memory collaborators for session and worker tests

use super::session::SessionContext;
use super::state::PlaybackState;
use crate::audio::{AudioFetcher, ChunkDecoder, DecoderFactory, MediaSource, OutputSink, SinkLease};
use crate::error::{PlaybackError, Result};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

pub const TEST_CHUNK_SIZE: usize = 64;

/// `len` bytes of a recognisable, non-repeating-per-chunk byte pattern
pub fn pattern(len: usize) -> Vec<u8> {
  (0..len).map(|i| (i % 251) as u8).collect()
}

/// Knobs for making the fake collaborators slow or broken
#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
  /// Sleep before every fetch returns
  pub fetch_delay: Duration,
  /// Sleep inside every sink write
  pub write_delay: Duration,
  /// Decoders return an error instead of their chunk after this many chunks
  pub decode_fails_after: Option<usize>,
  /// Every sink write fails
  pub writes_fail: bool,
}

pub struct MemoryFetcher {
  tracks: HashMap<String, Vec<u8>>,
  delay: Duration,
}

impl AudioFetcher for MemoryFetcher {
  fn fetch(&self, location: &str) -> Result<Box<dyn MediaSource>> {
    if !self.delay.is_zero() {
      thread::sleep(self.delay);
    }
    self
      .tracks
      .get(location)
      .map(|bytes| Box::new(Cursor::new(bytes.clone())) as Box<dyn MediaSource>)
      .ok_or_else(|| PlaybackError::fetch(location, "not found"))
  }
}

/// Passes the source bytes straight through as PCM
pub struct RawDecoderFactory {
  live: Arc<AtomicUsize>,
  fails_after: Option<usize>,
}

impl DecoderFactory for RawDecoderFactory {
  fn open(&self, source: Box<dyn MediaSource>, start_offset: u64) -> Result<Box<dyn ChunkDecoder>> {
    self.live.fetch_add(1, Ordering::SeqCst);
    Ok(Box::new(RawDecoder {
      source,
      position: start_offset,
      live: Arc::clone(&self.live),
      chunks_left: self.fails_after,
    }))
  }
}

struct RawDecoder {
  source: Box<dyn MediaSource>,
  position: u64,
  live: Arc<AtomicUsize>,
  chunks_left: Option<usize>,
}

impl ChunkDecoder for RawDecoder {
  fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
    match &mut self.chunks_left {
      Some(0) => return Err(PlaybackError::Decode("corrupt frame".to_string())),
      Some(left) => *left -= 1,
      None => {}
    }
    let n = self.source.read(buf)?;
    self.position += n as u64;
    Ok(n)
  }

  fn stream_position(&self) -> u64 {
    self.position
  }
}

impl Drop for RawDecoder {
  fn drop(&mut self) {
    self.live.fetch_sub(1, Ordering::SeqCst);
  }
}

/// Records every chunk, optionally sleeping per write to mimic a device
struct RecordingSink {
  written: Arc<Mutex<Vec<u8>>>,
  delay: Duration,
  fail: bool,
}

impl OutputSink for RecordingSink {
  fn write(&mut self, chunk: &[u8]) -> Result<()> {
    if self.fail {
      return Err(PlaybackError::SinkWrite("device unplugged".to_string()));
    }
    if !self.delay.is_zero() {
      thread::sleep(self.delay);
    }
    self.written.lock().unwrap().extend_from_slice(chunk);
    Ok(())
  }
}

/// A full set of fake collaborators sharing one playback state
pub struct Backend {
  pub ctx: SessionContext,
  written: Arc<Mutex<Vec<u8>>>,
  live: Arc<AtomicUsize>,
}

impl Backend {
  pub fn new(tracks: &[(&str, Vec<u8>)]) -> Self {
    Self::with_write_delay(tracks, Duration::ZERO)
  }

  pub fn with_write_delay(tracks: &[(&str, Vec<u8>)], delay: Duration) -> Self {
    Self::with_faults(
      tracks,
      Faults {
        write_delay: delay,
        ..Faults::default()
      },
    )
  }

  pub fn with_faults(tracks: &[(&str, Vec<u8>)], faults: Faults) -> Self {
    let written = Arc::new(Mutex::new(Vec::new()));
    let live = Arc::new(AtomicUsize::new(0));
    let fetcher = MemoryFetcher {
      tracks: tracks
        .iter()
        .map(|(location, bytes)| (location.to_string(), bytes.clone()))
        .collect(),
      delay: faults.fetch_delay,
    };
    let sink = RecordingSink {
      written: Arc::clone(&written),
      delay: faults.write_delay,
      fail: faults.writes_fail,
    };
    let mut ctx = SessionContext::new(
      Arc::new(fetcher),
      Arc::new(RawDecoderFactory {
        live: Arc::clone(&live),
        fails_after: faults.decode_fails_after,
      }),
      Arc::new(SinkLease::new(Box::new(sink))),
      Arc::new(PlaybackState::default()),
    );
    ctx.chunk_size = TEST_CHUNK_SIZE;
    ctx.pause_poll = Duration::from_millis(5);
    Self { ctx, written, live }
  }

  pub fn written(&self) -> Vec<u8> {
    self.written.lock().unwrap().clone()
  }

  pub fn written_len(&self) -> usize {
    self.written.lock().unwrap().len()
  }

  pub fn clear_written(&self) {
    self.written.lock().unwrap().clear();
  }

  /// Decoders currently open, i.e. sessions that have not exited yet
  pub fn live_decoders(&self) -> usize {
    self.live.load(Ordering::SeqCst)
  }
}
