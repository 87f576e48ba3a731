//! cpal output sink and the lease that keeps it single-writer

use super::{OutputSink, BYTES_PER_SAMPLE, CHANNELS, SAMPLE_RATE};
use crate::error::{PlaybackError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, StreamConfig};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::{mpsc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

/// Configuration for the cpal sink
#[derive(Debug, Clone)]
pub struct CpalSinkConfig {
  /// Output device name (None for the host default)
  pub device_name: Option<String>,
  /// Chunks that may wait in the queue before `write` blocks
  pub queue_chunks: usize,
}

impl Default for CpalSinkConfig {
  fn default() -> Self {
    Self {
      device_name: None,
      queue_chunks: 8,
    }
  }
}

/// Output sink rendering through cpal
///
/// cpal streams are not `Send` on every platform, so the stream lives on a
/// dedicated audio thread. `write` hands samples to that thread through a
/// bounded channel and blocks while the channel is full.
pub struct CpalSink {
  sample_tx: Option<Sender<Vec<i16>>>,
  shutdown_tx: Option<mpsc::Sender<()>>,
  audio_thread: Option<JoinHandle<()>>,
}

impl CpalSink {
  /// Open the output device and start the stream
  pub fn open(config: CpalSinkConfig) -> Result<Self> {
    let (sample_tx, sample_rx) = bounded::<Vec<i16>>(config.queue_chunks.max(1));
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
    let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();

    let audio_thread = thread::Builder::new()
      .name("audio-output".to_string())
      .spawn(move || {
        let stream = match build_stream(config.device_name.as_deref(), sample_rx) {
          Ok(stream) => stream,
          Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
          }
        };
        if let Err(e) = stream.play() {
          let _ = ready_tx.send(Err(PlaybackError::OutputDevice(e.to_string())));
          return;
        }
        let _ = ready_tx.send(Ok(()));
        // Keep the stream alive until shutdown or until the sink is dropped
        let _ = shutdown_rx.recv();
        drop(stream);
      })
      .map_err(|e| PlaybackError::OutputDevice(e.to_string()))?;

    ready_rx.recv().map_err(|_| {
      PlaybackError::OutputDevice("audio thread exited during startup".to_string())
    })??;

    Ok(Self {
      sample_tx: Some(sample_tx),
      shutdown_tx: Some(shutdown_tx),
      audio_thread: Some(audio_thread),
    })
  }
}

impl OutputSink for CpalSink {
  fn write(&mut self, chunk: &[u8]) -> Result<()> {
    let samples: Vec<i16> = chunk
      .chunks_exact(BYTES_PER_SAMPLE)
      .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
      .collect();
    let sender = self
      .sample_tx
      .as_ref()
      .ok_or_else(|| PlaybackError::SinkWrite("output closed".to_string()))?;
    sender
      .send(samples)
      .map_err(|_| PlaybackError::SinkWrite("audio thread stopped".to_string()))
  }
}

impl Drop for CpalSink {
  fn drop(&mut self) {
    self.sample_tx.take();
    if let Some(tx) = self.shutdown_tx.take() {
      let _ = tx.send(());
    }
    if let Some(handle) = self.audio_thread.take() {
      let _ = handle.join();
    }
  }
}

fn find_device(host: &cpal::Host, name: Option<&str>) -> Result<Device> {
  match name {
    Some(name) => host
      .output_devices()
      .map_err(|e| PlaybackError::OutputDevice(e.to_string()))?
      .find(|device| device.name().map(|n| n == name).unwrap_or(false))
      .ok_or_else(|| PlaybackError::OutputDevice(format!("no output device named '{}'", name))),
    None => host
      .default_output_device()
      .ok_or_else(|| PlaybackError::OutputDevice("no default output device".to_string())),
  }
}

fn build_stream(device_name: Option<&str>, sample_rx: Receiver<Vec<i16>>) -> Result<cpal::Stream> {
  let host = cpal::default_host();
  let device = find_device(&host, device_name)?;
  log::info!(
    "opening output device {}",
    device.name().unwrap_or_else(|_| "<unnamed>".to_string())
  );

  // Prefer a native format that already matches the fixed PCM layout
  let sample_format = device
    .supported_output_configs()
    .map_err(|e| PlaybackError::OutputDevice(e.to_string()))?
    .find(|range| {
      range.channels() == CHANNELS
        && range.min_sample_rate().0 <= SAMPLE_RATE
        && range.max_sample_rate().0 >= SAMPLE_RATE
    })
    .map(|range| range.sample_format())
    .ok_or_else(|| {
      PlaybackError::OutputDevice(format!(
        "device does not support {} Hz with {} channels",
        SAMPLE_RATE, CHANNELS
      ))
    })?;

  let config = StreamConfig {
    channels: CHANNELS,
    sample_rate: cpal::SampleRate(SAMPLE_RATE),
    buffer_size: cpal::BufferSize::Default,
  };

  match sample_format {
    SampleFormat::I16 => stream_with::<i16>(&device, &config, sample_rx),
    SampleFormat::U16 => stream_with::<u16>(&device, &config, sample_rx),
    SampleFormat::I32 => stream_with::<i32>(&device, &config, sample_rx),
    SampleFormat::F32 => stream_with::<f32>(&device, &config, sample_rx),
    other => Err(PlaybackError::OutputDevice(format!(
      "unsupported sample format {:?}",
      other
    ))),
  }
}

fn stream_with<T>(
  device: &Device,
  config: &StreamConfig,
  sample_rx: Receiver<Vec<i16>>,
) -> Result<cpal::Stream>
where
  T: SizedSample + FromSample<i16>,
{
  let mut current: Vec<i16> = Vec::new();
  let mut pos = 0;

  device
    .build_output_stream(
      config,
      move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
        for out in data.iter_mut() {
          if pos >= current.len() {
            match sample_rx.try_recv() {
              Ok(next) => {
                current = next;
                pos = 0;
              }
              Err(_) => {
                // Underrun or idle: play silence
                *out = T::from_sample(0i16);
                continue;
              }
            }
          }
          match current.get(pos) {
            Some(&sample) => {
              *out = T::from_sample(sample);
              pos += 1;
            }
            None => *out = T::from_sample(0i16),
          }
        }
      },
      |err| log::error!("output stream error: {}", err),
      None,
    )
    .map_err(|e| PlaybackError::OutputDevice(e.to_string()))
}

struct LeaseSlot {
  holder: Option<u64>,
  sink: Box<dyn OutputSink>,
}

/// Shared access to the output sink, owned by one session generation at a time
///
/// A write only goes through while the writer's generation holds the lease,
/// and the check happens under the same lock as the write. Granting the lease
/// to a new session therefore waits for any in-progress write of the old one
/// and shuts it out from then on.
pub struct SinkLease {
  slot: Mutex<LeaseSlot>,
}

impl SinkLease {
  pub fn new(sink: Box<dyn OutputSink>) -> Self {
    Self {
      slot: Mutex::new(LeaseSlot { holder: None, sink }),
    }
  }

  fn lock(&self) -> MutexGuard<'_, LeaseSlot> {
    self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  /// Hand the sink to `generation`, revoking any previous holder
  pub fn grant(&self, generation: u64) {
    self.lock().holder = Some(generation);
  }

  /// Release the sink if `generation` still holds it
  pub fn release(&self, generation: u64) {
    let mut slot = self.lock();
    if slot.holder == Some(generation) {
      slot.holder = None;
    }
  }

  #[cfg(test)]
  pub fn holder(&self) -> Option<u64> {
    self.lock().holder
  }

  /// Write `chunk` on behalf of `generation`.
  ///
  /// Returns `Ok(false)` without writing when the lease has moved on.
  pub fn write(&self, generation: u64, chunk: &[u8]) -> Result<bool> {
    let mut slot = self.lock();
    if slot.holder != Some(generation) {
      return Ok(false);
    }
    slot.sink.write(chunk)?;
    Ok(true)
  }
}
