use super::*;
use std::sync::mpsc;
use std::time::Duration;

use crate::audio::TransportState;
use crate::library::TrackId;

fn make_track() -> Track {
    let mut track = Track::new(
        "/tmp/music/test.mp3",
        "Test Title",
        Some("Test Artist".to_string()),
    );
    track.album = Some("Test Album".to_string());
    track.duration = Duration::from_micros(1_234_567);
    track
}

fn iface(state: &Arc<Mutex<SharedState>>) -> (PlayerIface, mpsc::Receiver<ControlCmd>) {
    let (tx, rx) = mpsc::channel();
    (
        PlayerIface {
            tx,
            state: state.clone(),
        },
        rx,
    )
}

#[test]
fn set_track_metadata_sets_and_clears_shared_state() {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let handle = MprisHandle {
        state: state.clone(),
    };

    let track = make_track();
    handle.set_track_metadata(Some(7), Some(&track));

    {
        let s = state.lock().unwrap();
        assert_eq!(s.title.as_deref(), Some("Test Title"));
        assert_eq!(s.artist, vec!["Test Artist".to_string()]);
        assert_eq!(s.album.as_deref(), Some("Test Album"));
        assert!(s.url.as_deref().unwrap().contains("/tmp/music/test.mp3"));
        assert_eq!(s.length_micros, Some(1_234_567));
        assert_eq!(
            s.track_id.as_ref().map(|p| p.as_str()),
            Some("/org/mpris/MediaPlayer2/track/7")
        );
    }

    handle.set_track_metadata(None, None);
    {
        let s = state.lock().unwrap();
        assert_eq!(s.title, None);
        assert!(s.artist.is_empty());
        assert_eq!(s.album, None);
        assert_eq!(s.url, None);
        assert_eq!(s.length_micros, None);
        assert!(s.track_id.is_none());
    }
}

#[test]
fn unknown_duration_is_not_published() {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let handle = MprisHandle {
        state: state.clone(),
    };
    let track = Track::new("/tmp/a.ogg", "A", None);
    handle.set_track_metadata(Some(0), Some(&track));
    assert_eq!(state.lock().unwrap().length_micros, None);
}

#[test]
fn playback_status_follows_the_session() {
    let mut session = PlaybackSession::default();
    assert_eq!(PlaybackStatus::of(&session), PlaybackStatus::Stopped);

    session.current = Some(TrackId::new("/tmp/a.ogg"));
    session.status = TransportState::Playing;
    assert_eq!(PlaybackStatus::of(&session), PlaybackStatus::Playing);

    session.status = TransportState::Paused;
    assert_eq!(PlaybackStatus::of(&session), PlaybackStatus::Paused);

    session.status = TransportState::Ended;
    assert_eq!(PlaybackStatus::of(&session), PlaybackStatus::Stopped);
}

#[test]
fn properties_reflect_shared_state() {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let (iface, _rx) = iface(&state);
    let handle = MprisHandle {
        state: state.clone(),
    };

    assert_eq!(iface.playback_status(), "Stopped");
    assert_eq!(iface.loop_status(), "None");

    handle.set_playback(PlaybackStatus::Playing);
    handle.set_modes(true, RepeatMode::One);
    handle.set_position(Duration::from_millis(1500));

    assert_eq!(iface.playback_status(), "Playing");
    assert_eq!(iface.loop_status(), "Track");
    assert!(iface.shuffle());
    assert_eq!(iface.position(), 1_500_000);

    handle.set_modes(false, RepeatMode::All);
    assert_eq!(iface.loop_status(), "Playlist");
}

#[test]
fn metadata_includes_expected_keys_when_present() {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let (iface, _rx) = iface(&state);
    let handle = MprisHandle {
        state: state.clone(),
    };

    assert!(iface.metadata().is_empty());

    handle.set_track_metadata(Some(1), Some(&make_track()));
    let map = iface.metadata();
    for k in [
        "mpris:trackid",
        "xesam:title",
        "xesam:artist",
        "xesam:album",
        "xesam:url",
        "mpris:length",
    ] {
        assert!(map.contains_key(k), "missing key: {k}");
    }
}

#[test]
fn methods_forward_control_commands() {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let (iface, rx) = iface(&state);

    iface.play_pause();
    iface.next();
    iface.previous();
    iface.seek(-5_000_000);

    let got: Vec<ControlCmd> = rx.try_iter().collect();
    assert_eq!(
        got,
        vec![
            ControlCmd::PlayPause,
            ControlCmd::Next,
            ControlCmd::Prev,
            ControlCmd::Seek(-5_000_000)
        ]
    );
}
