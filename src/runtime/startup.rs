use std::path::Path;

use tracing::warn;

use crate::audio::RodioTransportFactory;
use crate::config::Settings;
use crate::library::{Playlist, scan};
use crate::playback::SessionSnapshot;
use crate::visual::FrameClock;

use super::AppPlayer;

/// Scan `dir`, open the default output and build the player around both.
pub fn build_player(
    settings: &Settings,
    dir: &str,
) -> Result<AppPlayer, Box<dyn std::error::Error>> {
    let tracks = scan(Path::new(dir), &settings.library);

    let factory = RodioTransportFactory::open_default()?;
    let clock = FrameClock::new(settings.visual.fps);
    let mut player = AppPlayer::new(settings, Playlist::from_tracks(tracks), factory, clock);

    if settings.playback.restore_session {
        restore_session(&mut player);
    }
    Ok(player)
}

fn restore_session(player: &mut AppPlayer) {
    let Some(path) = SessionSnapshot::default_path() else {
        return;
    };
    match SessionSnapshot::load(&path) {
        Ok(Some(snapshot)) => player.restore(&snapshot),
        Ok(None) => {}
        Err(e) => warn!(error = %e, path = ?path, "ignoring unreadable session"),
    }
}

/// Persist the session for the next start. Failures are logged only.
pub fn save_session(player: &AppPlayer, settings: &Settings) {
    if !settings.playback.restore_session {
        return;
    }
    let Some(path) = SessionSnapshot::default_path() else {
        return;
    };
    if let Err(e) = player.snapshot().save(&path) {
        warn!(error = %e, path = ?path, "failed to save session");
    }
}
