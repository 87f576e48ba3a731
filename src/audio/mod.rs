//! Audio collaborators used by playback sessions
//!
//! The playback engine only sees the traits in this module. The concrete
//! implementations buffer tracks over HTTP (or from disk), decode MP3 with
//! symphonia and render through cpal.

mod decoder;
mod fetch;
mod output;

pub use decoder::{Mp3ChunkDecoder, SymphoniaDecoderFactory};
pub use fetch::HttpFetcher;
pub use output::{CpalSink, CpalSinkConfig, SinkLease};

use crate::error::Result;
use std::io::{Read, Seek};

/// Output sample rate every decoder produces
pub const SAMPLE_RATE: u32 = 44_100;
/// Output channel count (interleaved stereo)
pub const CHANNELS: u16 = 2;
/// 16-bit signed samples
pub const BYTES_PER_SAMPLE: usize = 2;
/// Default size of one decoded chunk handed to the volume stage
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// A seekable byte source for one track
pub trait MediaSource: Read + Seek + Send + Sync {}

impl<T: Read + Seek + Send + Sync> MediaSource for T {}

/// Retrieves the encoded bytes for a track location
pub trait AudioFetcher: Send + Sync {
  fn fetch(&self, location: &str) -> Result<Box<dyn MediaSource>>;
}

/// Decodes an encoded stream into fixed-format PCM chunks
pub trait ChunkDecoder: Send {
  /// Fill `buf` with interleaved 16-bit little-endian samples.
  ///
  /// Returns the number of bytes written; `0` means end of stream.
  fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize>;

  /// Byte position in the encoded source of the first frame whose PCM has
  /// not been handed out yet
  fn stream_position(&self) -> u64;
}

/// Builds a decoder over a source already positioned at the resume offset
pub trait DecoderFactory: Send + Sync {
  fn open(&self, source: Box<dyn MediaSource>, start_offset: u64) -> Result<Box<dyn ChunkDecoder>>;
}

/// PCM output device accepting chunks with a blocking write
pub trait OutputSink: Send {
  fn write(&mut self, chunk: &[u8]) -> Result<()>;
}
