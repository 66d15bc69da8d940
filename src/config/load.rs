use std::{env, path::PathBuf};

use super::schema::Settings;

/// Configuration loading helpers.
///
/// `Settings::load` reads an optional config file, then overlays environment
/// variables (prefix `RESONATE__`), and falls back to struct defaults.
impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("RESONATE")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<(), String> {
        let a = &self.analyser;
        if !a.fft_size.is_power_of_two() || !(32..=32768).contains(&a.fft_size) {
            return Err(format!(
                "analyser.fft_size must be a power of two in 32..=32768, got {}",
                a.fft_size
            ));
        }
        if !(0.0..1.0).contains(&a.smoothing) {
            return Err("analyser.smoothing must be in [0, 1)".to_string());
        }
        if a.min_decibels >= a.max_decibels {
            return Err("analyser.min_decibels must be below analyser.max_decibels".to_string());
        }
        if self.visual.fps == 0 {
            return Err("visual.fps must be >= 1".to_string());
        }
        Ok(())
    }
}

/// Resolve the config path from `RESONATE_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("RESONATE_CONFIG_PATH") {
        return Some(PathBuf::from(p));
    }
    default_config_path()
}

/// Compute the default config path under `$XDG_CONFIG_HOME/resonate/config.toml`
/// or `~/.config/resonate/config.toml` when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    xdg_dir("XDG_CONFIG_HOME", ".config").map(|d| d.join("resonate").join("config.toml"))
}

/// Directory holding the session snapshot and the log file:
/// `$XDG_STATE_HOME/resonate` or `~/.local/state/resonate`.
pub fn state_dir() -> Option<PathBuf> {
    xdg_dir("XDG_STATE_HOME", ".local/state").map(|d| d.join("resonate"))
}

fn xdg_dir(var: &str, home_fallback: &str) -> Option<PathBuf> {
    if let Some(xdg) = env::var_os(var) {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(home_fallback))
    }
}
