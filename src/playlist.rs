//! Playlist loading: one track location per line

use anyhow::{Context, Result};
use std::path::Path;

/// One playable item, identified by its position in the playlist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
  location: String,
}

impl Track {
  pub fn new(location: impl Into<String>) -> Self {
    Self {
      location: location.into(),
    }
  }

  pub fn location(&self) -> &str {
    &self.location
  }

  /// Last path segment of the location, without any query string
  pub fn display_name(&self) -> &str {
    let without_query = self
      .location
      .split(['?', '#'])
      .next()
      .unwrap_or(&self.location);
    without_query
      .trim_end_matches('/')
      .rsplit(['/', '\\'])
      .next()
      .filter(|name| !name.is_empty())
      .unwrap_or(&self.location)
  }
}

/// The ordered, immutable list of tracks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Playlist {
  tracks: Vec<Track>,
}

impl Playlist {
  pub fn new(tracks: Vec<Track>) -> Self {
    Self { tracks }
  }

  /// Parse playlist text: trimmed lines, blanks and `#` comments skipped
  pub fn parse(text: &str) -> Self {
    let tracks = text
      .lines()
      .map(str::trim)
      .filter(|line| !line.is_empty() && !line.starts_with('#'))
      .map(Track::new)
      .collect();
    Self { tracks }
  }

  /// Load a playlist file
  pub fn load(path: &Path) -> Result<Self> {
    let text = std::fs::read_to_string(path)
      .with_context(|| format!("could not read playlist {}", path.display()))?;
    Ok(Self::parse(&text))
  }

  pub fn len(&self) -> usize {
    self.tracks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tracks.is_empty()
  }

  pub fn get(&self, index: usize) -> Option<&Track> {
    self.tracks.get(index)
  }

  pub fn tracks(&self) -> &[Track] {
    &self.tracks
  }

  /// Index after `index`, wrapping to the start
  pub fn next_index(&self, index: usize) -> usize {
    if self.tracks.is_empty() {
      0
    } else {
      (index + 1) % self.tracks.len()
    }
  }

  /// Index before `index`, wrapping to the end
  pub fn previous_index(&self, index: usize) -> usize {
    let len = self.tracks.len();
    if len == 0 {
      0
    } else {
      (index % len + len - 1) % len
    }
  }

  /// Clamp `index` into the playlist range
  pub fn clamp_index(&self, index: usize) -> usize {
    index.min(self.tracks.len().saturating_sub(1))
  }
}
