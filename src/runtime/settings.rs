use tracing::warn;

use crate::config;

/// Load settings, falling back to defaults when the file is unreadable or
/// fails validation. Config is optional and never blocks startup.
pub fn load_settings() -> config::Settings {
    match config::Settings::load() {
        Ok(s) => {
            if let Err(msg) = s.validate() {
                warn!(%msg, "invalid config, using defaults");
                config::Settings::default()
            } else {
                s
            }
        }
        Err(e) => {
            warn!(error = %e, "failed to load config, using defaults");
            config::Settings::default()
        }
    }
}
