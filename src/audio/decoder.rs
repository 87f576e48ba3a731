//! MP3 decoding with symphonia into fixed-format 16-bit stereo chunks

use super::{ChunkDecoder, DecoderFactory, MediaSource, CHANNELS, SAMPLE_RATE};
use crate::error::{PlaybackError, Result};
use std::io::{self, Read, Seek, SeekFrom};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Packets that fail to decode in a row before the stream is declared broken.
/// A resumed stream usually starts mid-frame, so the first packet or two may
/// not decode.
const MAX_CONSECUTIVE_DECODE_ERRORS: usize = 8;

/// Exposes `inner` shifted by `base` bytes, so a resumed stream looks like it
/// starts at zero
struct OffsetSource {
  inner: Box<dyn MediaSource>,
  base: u64,
}

impl Read for OffsetSource {
  fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
    self.inner.read(buf)
  }
}

impl Seek for OffsetSource {
  fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
    let pos = match pos {
      SeekFrom::Start(n) => SeekFrom::Start(self.base + n),
      other => other,
    };
    let absolute = self.inner.seek(pos)?;
    Ok(absolute.saturating_sub(self.base))
  }
}

impl symphonia::core::io::MediaSource for OffsetSource {
  fn is_seekable(&self) -> bool {
    true
  }

  fn byte_len(&self) -> Option<u64> {
    None
  }
}

/// Opens symphonia MP3 decoders
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaDecoderFactory;

impl DecoderFactory for SymphoniaDecoderFactory {
  fn open(&self, source: Box<dyn MediaSource>, start_offset: u64) -> Result<Box<dyn ChunkDecoder>> {
    Mp3ChunkDecoder::open(source, start_offset).map(|d| Box::new(d) as Box<dyn ChunkDecoder>)
  }
}

/// Streaming decoder state for one track
pub struct Mp3ChunkDecoder {
  format: Box<dyn FormatReader>,
  decoder: Box<dyn Decoder>,
  track_id: u32,
  /// Encoded bytes whose PCM has been handed out in full
  delivered: u64,
  /// Encoded size of the packet behind `pending`
  pending_packet_len: u64,
  /// Converted PCM not yet handed out
  pending: Vec<u8>,
  pending_pos: usize,
  warned_format: bool,
}

impl Mp3ChunkDecoder {
  /// Detect the format of `source`, which is already positioned at `start_offset`
  pub fn open(mut source: Box<dyn MediaSource>, start_offset: u64) -> Result<Self> {
    // Format detection skips a leading ID3v2 tag without producing a packet for it
    let delivered = if start_offset == 0 {
      id3v2_len(source.as_mut())?
    } else {
      start_offset
    };
    let wrapped = OffsetSource {
      inner: source,
      base: start_offset,
    };
    let mss = MediaSourceStream::new(Box::new(wrapped), MediaSourceStreamOptions::default());

    let mut hint = Hint::new();
    hint.with_extension("mp3");

    let detected = symphonia::default::get_probe()
      .format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
      )
      .map_err(|e| PlaybackError::Decode(format!("unrecognised stream: {}", e)))?;

    let format = detected.format;
    let track = format
      .default_track()
      .ok_or_else(|| PlaybackError::Decode("no audio track found".to_string()))?;
    let track_id = track.id;

    let decoder = symphonia::default::get_codecs()
      .make(&track.codec_params, &DecoderOptions::default())
      .map_err(|e| PlaybackError::Decode(format!("failed to create decoder: {}", e)))?;

    Ok(Self {
      format,
      decoder,
      track_id,
      delivered,
      pending_packet_len: 0,
      pending: Vec::new(),
      pending_pos: 0,
      warned_format: false,
    })
  }

  /// Decode the next packet into `pending`. Returns false at end of stream.
  fn decode_next(&mut self) -> Result<bool> {
    // A packet that decoded to no samples is never drained in `read_chunk`
    self.delivered += std::mem::take(&mut self.pending_packet_len);
    let mut failures = 0;
    loop {
      let packet = match self.format.next_packet() {
        Ok(packet) => packet,
        Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
          return Ok(false);
        }
        Err(e) => return Err(PlaybackError::Decode(e.to_string())),
      };
      let packet_len = packet.buf().len() as u64;
      if packet.track_id() != self.track_id {
        self.delivered += packet_len;
        continue;
      }

      let decoded = match self.decoder.decode(&packet) {
        Ok(decoded) => decoded,
        Err(SymphoniaError::DecodeError(msg)) => {
          self.delivered += packet_len;
          failures += 1;
          if failures >= MAX_CONSECUTIVE_DECODE_ERRORS {
            return Err(PlaybackError::Decode(msg.to_string()));
          }
          log::debug!("skipping undecodable packet: {}", msg);
          continue;
        }
        Err(e) => return Err(PlaybackError::Decode(e.to_string())),
      };

      let spec = *decoded.spec();
      let mismatched = spec.rate != SAMPLE_RATE || spec.channels.count() != CHANNELS as usize;
      if !self.warned_format && mismatched {
        log::warn!(
          "stream is {} Hz / {} channels, output expects {} Hz / {} channels",
          spec.rate,
          spec.channels.count(),
          SAMPLE_RATE,
          CHANNELS
        );
        self.warned_format = true;
      }

      let mut samples = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
      samples.copy_interleaved_ref(decoded);

      self.pending.clear();
      self.pending_pos = 0;
      self.pending_packet_len = packet_len;
      interleave_stereo(samples.samples(), spec.channels.count(), &mut self.pending);
      return Ok(true);
    }
  }
}

impl ChunkDecoder for Mp3ChunkDecoder {
  fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
    let mut written = 0;
    while written < buf.len() {
      if self.pending_pos >= self.pending.len() && !self.decode_next()? {
        break;
      }
      let available = &self.pending[self.pending_pos..];
      let n = available.len().min(buf.len() - written);
      buf[written..written + n].copy_from_slice(&available[..n]);
      self.pending_pos += n;
      written += n;
      if self.pending_pos >= self.pending.len() {
        self.delivered += std::mem::take(&mut self.pending_packet_len);
      }
    }
    Ok(written)
  }

  /// Always a packet boundary, so a resume replays at most one partly
  /// played packet
  fn stream_position(&self) -> u64 {
    self.delivered
  }
}

/// Size of the ID3v2 tag at the start of `source`, or 0 when there is none.
/// Leaves `source` rewound to the start.
fn id3v2_len(source: &mut dyn MediaSource) -> Result<u64> {
  let mut header = [0u8; 10];
  let len = match source.read_exact(&mut header) {
    Ok(()) if &header[..3] == b"ID3" => {
      // Synchsafe: seven bits per byte
      let size = header[6..10]
        .iter()
        .fold(0u64, |acc, b| (acc << 7) | u64::from(b & 0x7f));
      let footer = if header[5] & 0x10 != 0 { 10 } else { 0 };
      10 + size + footer
    }
    Ok(()) => 0,
    Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => 0,
    Err(e) => return Err(e.into()),
  };
  source.seek(SeekFrom::Start(0))?;
  Ok(len)
}

/// Append `samples` (with `channels` per frame) to `out` as little-endian
/// stereo: mono is duplicated, extra channels are dropped.
fn interleave_stereo(samples: &[i16], channels: usize, out: &mut Vec<u8>) {
  if channels == 0 {
    return;
  }
  out.reserve(samples.len() / channels * 4);
  for frame in samples.chunks_exact(channels) {
    let left = frame[0];
    let right = if channels > 1 { frame[1] } else { frame[0] };
    out.extend_from_slice(&left.to_le_bytes());
    out.extend_from_slice(&right.to_le_bytes());
  }
}
