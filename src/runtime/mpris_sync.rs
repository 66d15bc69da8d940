use crate::audio::TransportState;
use crate::library::TrackId;
use crate::mpris::{MprisHandle, PlaybackStatus};
use crate::playback::RepeatMode;

use super::AppPlayer;

/// What MPRIS last saw; a change triggers a full metadata refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct MprisView {
    track: Option<TrackId>,
    status: TransportState,
    shuffle: bool,
    repeat: RepeatMode,
}

impl MprisView {
    pub fn of(player: &AppPlayer) -> Self {
        let session = player.session();
        Self {
            track: session.current.clone(),
            status: session.status,
            shuffle: session.shuffle,
            repeat: session.repeat,
        }
    }
}

pub fn update_mpris(mpris: &MprisHandle, player: &AppPlayer) {
    let session = player.session();
    let track = player.current_track();
    let index = track.and_then(|t| player.playlist().position(&t.id));
    mpris.set_track_metadata(index, track);
    mpris.set_playback(PlaybackStatus::of(session));
    mpris.set_modes(session.shuffle, session.repeat);
    mpris.set_position(session.elapsed());
}
