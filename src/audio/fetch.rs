//! Track retrieval: whole-track buffering over HTTP or from disk

use super::{AudioFetcher, MediaSource};
use crate::error::{PlaybackError, Result};
use std::io::{Cursor, Read};
use std::path::Path;
use std::time::Duration;

/// Fetches a track completely into memory so the session can seek freely
#[derive(Debug, Clone)]
pub struct HttpFetcher {
  timeout: Duration,
}

impl HttpFetcher {
  pub fn new(timeout: Duration) -> Self {
    Self { timeout }
  }

  fn fetch_remote(&self, location: &str) -> Result<Vec<u8>> {
    // The blocking client owns a runtime of its own, so it is built and
    // dropped here on the session's blocking thread.
    let client = reqwest::blocking::Client::builder()
      .timeout(self.timeout)
      .build()
      .map_err(|e| PlaybackError::fetch(location, e))?;

    let mut response = client
      .get(location)
      .send()
      .map_err(|e| PlaybackError::fetch(location, e))?;

    if !response.status().is_success() {
      return Err(PlaybackError::fetch(
        location,
        format!("HTTP status {}", response.status()),
      ));
    }

    let mut bytes = Vec::with_capacity(response.content_length().unwrap_or(0) as usize);
    response
      .read_to_end(&mut bytes)
      .map_err(|e| PlaybackError::fetch(location, e))?;
    Ok(bytes)
  }

  fn fetch_local(location: &str) -> Result<Vec<u8>> {
    let path = location.strip_prefix("file://").unwrap_or(location);
    std::fs::read(Path::new(path)).map_err(|e| PlaybackError::fetch(location, e))
  }
}

impl Default for HttpFetcher {
  fn default() -> Self {
    Self::new(Duration::from_secs(30))
  }
}

impl AudioFetcher for HttpFetcher {
  fn fetch(&self, location: &str) -> Result<Box<dyn MediaSource>> {
    let bytes = if is_remote(location) {
      self.fetch_remote(location)?
    } else {
      Self::fetch_local(location)?
    };
    log::debug!("buffered {} bytes for {}", bytes.len(), location);
    Ok(Box::new(Cursor::new(bytes)))
  }
}

fn is_remote(location: &str) -> bool {
  let lower = location.to_ascii_lowercase();
  lower.starts_with("http://") || lower.starts_with("https://")
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::{Seek, SeekFrom, Write};

  #[test]
  fn detects_remote_locations() {
    assert!(is_remote("http://example.com/a.mp3"));
    assert!(is_remote("HTTPS://example.com/a.mp3"));
    assert!(!is_remote("/music/a.mp3"));
    assert!(!is_remote("file:///music/a.mp3"));
  }

  #[test]
  fn buffers_local_files() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"mock audio data").unwrap();

    let fetcher = HttpFetcher::default();
    let mut source = fetcher.fetch(file.path().to_str().unwrap()).unwrap();

    source.seek(SeekFrom::Start(5)).unwrap();
    let mut rest = String::new();
    source.read_to_string(&mut rest).unwrap();
    assert_eq!(rest, "audio data");
  }

  #[test]
  fn accepts_file_urls() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"abc").unwrap();
    let location = format!("file://{}", file.path().display());

    let mut source = HttpFetcher::default().fetch(&location).unwrap();
    let mut bytes = Vec::new();
    source.read_to_end(&mut bytes).unwrap();
    assert_eq!(bytes, b"abc");
  }

  #[test]
  fn missing_file_is_a_fetch_error() {
    let err = HttpFetcher::default()
      .fetch("/definitely/not/here.mp3")
      .err()
      .unwrap();
    assert!(matches!(err, PlaybackError::Fetch { .. }));
  }
}
