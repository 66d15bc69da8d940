use serde::Deserialize;

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/resonate/config.toml` or `~/.config/resonate/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `RESONATE__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub analyser: AnalyserSettings,
    pub visual: VisualSettings,
    pub playback: PlaybackSettings,
    pub library: LibrarySettings,
    pub ui: UiSettings,
}

/// Parameters fixed when the audio graph is constructed.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyserSettings {
    /// FFT window length; a power of two in 32..=32768. Bin count is half of it.
    pub fft_size: usize,
    /// Temporal smoothing of bin magnitudes in [0, 1).
    pub smoothing: f32,
    /// Magnitude mapped to byte 0.
    pub min_decibels: f32,
    /// Magnitude mapped to byte 255.
    pub max_decibels: f32,
    /// Keep the graph context suspended until the first play gesture.
    pub start_suspended: bool,
    /// Time constant of the gain ramp applied on volume changes (milliseconds).
    pub volume_time_constant_ms: u64,
}

impl Default for AnalyserSettings {
    fn default() -> Self {
        Self {
            fft_size: 512,
            smoothing: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
            start_suspended: true,
            volume_time_constant_ms: 15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VisualSettings {
    /// Initial visualization: "bars", "wave" or "circular".
    pub strategy: String,
    /// Target render ticks per second.
    pub fps: u32,
}

impl Default for VisualSettings {
    fn default() -> Self {
        Self {
            strategy: "bars".to_string(),
            fps: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Whether shuffle starts enabled.
    pub shuffle: bool,
    /// Default repeat mode.
    pub repeat: RepeatSetting,
    /// Initial volume in [0, 1].
    pub volume: f32,
    /// Restore the last session (track, position, volume, modes) on start.
    pub restore_session: bool,
    /// Number of seconds to scrub when pressing `H` / `L`.
    pub seek_seconds: u64,
    /// Volume change per `+` / `-` key press.
    pub volume_step: f32,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            shuffle: false,
            repeat: RepeatSetting::Off,
            volume: 0.8,
            restore_session: true,
            seek_seconds: 5,
            volume_step: 0.05,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RepeatSetting {
    #[serde(alias = "none", alias = "no-loop", alias = "no_loop")]
    Off,
    #[serde(alias = "repeat-one", alias = "repeat_one", alias = "loop-one")]
    One,
    #[serde(
        alias = "repeat-all",
        alias = "repeat_all",
        alias = "loop-all",
        alias = "loop-around"
    )]
    All,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// File extensions to treat as audio (case-insensitive, without dot).
    pub extensions: Vec<String>,
    /// Whether to follow symlinks during scanning.
    pub follow_links: bool,
    /// Whether to include hidden files/directories (dotfiles).
    pub include_hidden: bool,
    /// Whether to recurse into subdirectories.
    pub recursive: bool,
    /// Optional cap on directory recursion depth.
    pub max_depth: Option<usize>,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            extensions: vec!["mp3".into(), "flac".into(), "wav".into(), "ogg".into()],
            follow_links: true,
            include_hidden: true,
            recursive: true,
            max_depth: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// Whether the cursor starts in "follow playback" mode.
    pub follow_playback: bool,
    /// The text rendered inside the top header box.
    pub header_text: String,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            follow_playback: true,
            header_text: " ~ resonate ~ ".to_string(),
        }
    }
}
