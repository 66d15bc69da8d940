use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Artist shown when the tags do not carry one.
pub const UNKNOWN_ARTIST: &str = "Unknown";

/// Stable, unique identifier of a track.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque reference a transport knows how to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceHandle(PathBuf);

impl SourceHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    /// `Duration::ZERO` until metadata or the transport reports it.
    pub duration: Duration,
    pub source: SourceHandle,
    pub favorite: bool,
    pub display: String,
}

impl Track {
    /// Build a track for `path`; the id is derived from the path so it stays
    /// stable across rescans.
    pub fn new(path: impl Into<PathBuf>, title: impl Into<String>, artist: Option<String>) -> Self {
        let path = path.into();
        let title = title.into();
        let artist = artist
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());
        let display = make_display(&title, &artist);
        Self {
            id: TrackId::new(path.to_string_lossy()),
            title,
            artist,
            album: None,
            duration: Duration::ZERO,
            source: SourceHandle::new(path),
            favorite: false,
            display,
        }
    }

    pub fn duration_known(&self) -> bool {
        !self.duration.is_zero()
    }
}

pub(crate) fn make_display(title: &str, artist: &str) -> String {
    let artist = artist.trim();
    if artist.is_empty() || artist == UNKNOWN_ARTIST {
        title.to_string()
    } else {
        format!("{} - {}", artist, title)
    }
}

/// Ordered, duplicate-free sequence of tracks.
#[derive(Debug, Clone, Default)]
pub struct Playlist {
    tracks: Vec<Track>,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a playlist keeping the first occurrence of every id.
    pub fn from_tracks(tracks: Vec<Track>) -> Self {
        let mut playlist = Self::new();
        for track in tracks {
            playlist.push(track);
        }
        playlist
    }

    /// Append `track`; returns false (and drops it) when its id is already present.
    pub fn push(&mut self, track: Track) -> bool {
        if self.contains(&track.id) {
            return false;
        }
        self.tracks.push(track);
        true
    }

    pub fn remove(&mut self, id: &TrackId) -> Option<Track> {
        let pos = self.position(id)?;
        Some(self.tracks.remove(pos))
    }

    pub fn position(&self, id: &TrackId) -> Option<usize> {
        self.tracks.iter().position(|t| &t.id == id)
    }

    pub fn contains(&self, id: &TrackId) -> bool {
        self.position(id).is_some()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn track(&self, id: &TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| &t.id == id)
    }

    pub fn track_mut(&mut self, id: &TrackId) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| &t.id == id)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
