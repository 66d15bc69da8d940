use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::audio::TransportState;
use crate::config::{PlaybackSettings, RepeatSetting, state_dir};
use crate::error::SessionError;
use crate::library::TrackId;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RepeatMode {
    #[default]
    Off,
    One,
    All,
}

impl RepeatMode {
    /// Off -> All -> One -> Off, the order the `r` key walks.
    pub fn next(self) -> Self {
        match self {
            Self::Off => Self::All,
            Self::All => Self::One,
            Self::One => Self::Off,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::One => "one",
            Self::All => "all",
        }
    }
}

impl From<RepeatSetting> for RepeatMode {
    fn from(value: RepeatSetting) -> Self {
        match value {
            RepeatSetting::Off => Self::Off,
            RepeatSetting::One => Self::One,
            RepeatSetting::All => Self::All,
        }
    }
}

/// State of the one player instance.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    pub current: Option<TrackId>,
    /// Lifecycle of the current transport; playing/paused/loading derive from it.
    pub status: TransportState,
    elapsed: Duration,
    /// Duration of the current track, `ZERO` while unknown.
    duration: Duration,
    volume: f32,
    muted: bool,
    pub shuffle: bool,
    pub repeat: RepeatMode,
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self::new(&PlaybackSettings::default())
    }
}

impl PlaybackSession {
    pub fn new(settings: &PlaybackSettings) -> Self {
        Self {
            current: None,
            status: TransportState::Empty,
            elapsed: Duration::ZERO,
            duration: Duration::ZERO,
            volume: clamp_level(settings.volume),
            muted: false,
            shuffle: settings.shuffle,
            repeat: settings.repeat.into(),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.status.is_playing()
    }

    pub fn is_loading(&self) -> bool {
        self.status.is_loading()
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Store `elapsed`, clamped into `[0, duration]` once the duration is known.
    pub fn set_elapsed(&mut self, elapsed: Duration) -> Duration {
        self.elapsed = self.clamp_position(elapsed);
        self.elapsed
    }

    pub fn clamp_position(&self, position: Duration) -> Duration {
        if self.duration.is_zero() {
            position
        } else {
            position.min(self.duration)
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        (!self.duration.is_zero()).then_some(self.duration)
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration = duration;
        self.elapsed = self.clamp_position(self.elapsed);
    }

    /// Forget position and duration for a newly selected track.
    pub fn reset_position(&mut self) {
        self.elapsed = Duration::ZERO;
        self.duration = Duration::ZERO;
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Clamp into [0, 1] and store. Zero volume does not imply mute.
    pub fn set_volume(&mut self, level: f32) -> f32 {
        self.volume = clamp_level(level);
        self.volume
    }

    pub fn muted(&self) -> bool {
        self.muted
    }

    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        self.muted
    }

    /// Level that should reach the output.
    pub fn effective_volume(&self) -> f32 {
        if self.muted { 0.0 } else { self.volume }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            current_track_id: self.current.clone(),
            elapsed_seconds: self.elapsed.as_secs_f64(),
            volume: self.volume,
            shuffle: self.shuffle,
            repeat_mode: self.repeat,
        }
    }
}

fn clamp_level(level: f32) -> f32 {
    if level.is_nan() {
        0.0
    } else {
        level.clamp(0.0, 1.0)
    }
}

/// Persisted key/value view of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_track_id: Option<TrackId>,
    #[serde(default)]
    pub elapsed_seconds: f64,
    pub volume: f32,
    #[serde(default)]
    pub shuffle: bool,
    #[serde(default)]
    pub repeat_mode: RepeatMode,
}

impl SessionSnapshot {
    /// `$XDG_STATE_HOME/resonate/session.toml` (or the `~/.local/state` fallback).
    pub fn default_path() -> Option<PathBuf> {
        state_dir().map(|d| d.join("session.toml"))
    }

    /// Saved position. Values that do not fit a `Duration` read as zero.
    pub fn elapsed(&self) -> Duration {
        if self.elapsed_seconds > 0.0 {
            Duration::try_from_secs_f64(self.elapsed_seconds).unwrap_or(Duration::ZERO)
        } else {
            Duration::ZERO
        }
    }

    /// `Ok(None)` when no snapshot was saved yet.
    pub fn load(path: &Path) -> Result<Option<Self>, SessionError> {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot = toml::from_str(&text)?;
        Ok(Some(snapshot))
    }

    pub fn save(&self, path: &Path) -> Result<(), SessionError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        debug!(path = ?path, "session saved");
        Ok(())
    }
}
