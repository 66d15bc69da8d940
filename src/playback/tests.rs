use std::collections::HashSet;
use std::sync::mpsc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::audio::TransportState;
use crate::config::{PlaybackSettings, RepeatSetting};
use crate::error::SessionError;
use crate::library::{Playlist, Track, TrackId};

use super::*;

fn playlist(names: &[&str]) -> Playlist {
    Playlist::from_tracks(
        names
            .iter()
            .map(|n| Track::new(format!("/music/{n}.mp3"), *n, None))
            .collect(),
    )
}

fn id(name: &str) -> TrackId {
    TrackId::new(format!("/music/{name}.mp3"))
}

fn session_at(name: Option<&str>, shuffle: bool, repeat: RepeatMode) -> PlaybackSession {
    let mut s = PlaybackSession::default();
    s.current = name.map(id);
    s.shuffle = shuffle;
    s.repeat = repeat;
    s
}

fn traversal() -> (Traversal<StdRng>, mpsc::Receiver<TrackIntent>) {
    let (tx, rx) = mpsc::channel();
    let mut t = Traversal::with_rng(StdRng::seed_from_u64(7));
    t.set_sink(tx);
    (t, rx)
}

fn changed_to(decision: &Decision) -> Option<usize> {
    match decision {
        Decision::Change { index, .. } => Some(*index),
        _ => None,
    }
}

#[test]
fn natural_next_wraps_around() {
    let list = playlist(&["a", "b", "c", "d"]);
    let (mut t, _rx) = traversal();
    for (i, name) in ["a", "b", "c", "d"].iter().enumerate() {
        let s = session_at(Some(name), false, RepeatMode::Off);
        let d = t.advance(AdvanceReason::UserSkipNext, &s, &list);
        assert_eq!(changed_to(&d), Some((i + 1) % 4));
    }
}

#[test]
fn previous_steps_back_and_wraps_to_last() {
    let list = playlist(&["a", "b", "c"]);
    let (mut t, _rx) = traversal();

    let s = session_at(Some("b"), false, RepeatMode::One);
    assert_eq!(
        changed_to(&t.advance(AdvanceReason::UserSkipPrevious, &s, &list)),
        Some(0)
    );

    let s = session_at(Some("a"), false, RepeatMode::Off);
    assert_eq!(
        changed_to(&t.advance(AdvanceReason::UserSkipPrevious, &s, &list)),
        Some(2)
    );

    let s = session_at(Some("gone"), false, RepeatMode::Off);
    assert_eq!(
        changed_to(&t.advance(AdvanceReason::UserSkipPrevious, &s, &list)),
        Some(2)
    );
}

#[test]
fn missing_current_track_falls_back_to_first_on_next() {
    let list = playlist(&["a", "b", "c"]);
    let (mut t, _rx) = traversal();
    for reason in [AdvanceReason::UserSkipNext, AdvanceReason::TrackEnded] {
        let s = session_at(Some("removed"), false, RepeatMode::Off);
        assert_eq!(changed_to(&t.advance(reason, &s, &list)), Some(0));
        let s = session_at(None, false, RepeatMode::Off);
        assert_eq!(changed_to(&t.advance(reason, &s, &list)), Some(0));
    }
}

#[test]
fn repeat_one_restarts_on_end_and_manual_next() {
    let list = playlist(&["a", "b", "c"]);
    let (mut t, rx) = traversal();
    let s = session_at(Some("b"), true, RepeatMode::One);

    assert_eq!(
        t.advance(AdvanceReason::TrackEnded, &s, &list),
        Decision::Restart
    );
    assert_eq!(
        t.advance(AdvanceReason::UserSkipNext, &s, &list),
        Decision::Restart
    );
    assert_eq!(rx.try_recv().unwrap(), TrackIntent::Restart);
    assert_eq!(rx.try_recv().unwrap(), TrackIntent::Restart);
}

#[test]
fn end_of_playlist_stops_without_repeat_all() {
    let list = playlist(&["a", "b", "c"]);
    let (mut t, rx) = traversal();
    let s = session_at(Some("c"), false, RepeatMode::Off);

    assert_eq!(t.advance(AdvanceReason::TrackEnded, &s, &list), Decision::Stop);
    assert_eq!(rx.try_recv().unwrap(), TrackIntent::Stop);

    // A manual skip at the end still wraps.
    assert_eq!(
        changed_to(&t.advance(AdvanceReason::UserSkipNext, &s, &list)),
        Some(0)
    );
}

#[test]
fn repeat_all_wraps_and_keeps_playing() {
    let list = playlist(&["a", "b", "c"]);
    let (mut t, rx) = traversal();
    let s = session_at(Some("c"), false, RepeatMode::All);

    let d = t.advance(AdvanceReason::TrackEnded, &s, &list);
    assert_eq!(
        d,
        Decision::Change {
            index: 0,
            track: id("a"),
            autoplay: true
        }
    );
    assert_eq!(
        rx.try_recv().unwrap(),
        TrackIntent::Change {
            track: id("a"),
            autoplay: true
        }
    );
}

#[test]
fn shuffle_draws_uniformly_including_current() {
    let list = playlist(&["a", "b", "c"]);
    let (mut t, _rx) = traversal();
    let s = session_at(Some("a"), true, RepeatMode::Off);

    let mut seen = HashSet::new();
    for _ in 0..200 {
        let idx = changed_to(&t.decide(AdvanceReason::TrackEnded, &s, &list)).unwrap();
        assert!(idx < 3);
        seen.insert(idx);
    }
    assert_eq!(seen.len(), 3);

    let single = playlist(&["a"]);
    let d = t.decide(AdvanceReason::UserSkipNext, &s, &single);
    assert_eq!(changed_to(&d), Some(0));
}

#[test]
fn shuffle_at_last_index_never_stops() {
    let list = playlist(&["a", "b"]);
    let (mut t, _rx) = traversal();
    let s = session_at(Some("b"), true, RepeatMode::Off);
    for _ in 0..50 {
        assert!(changed_to(&t.decide(AdvanceReason::TrackEnded, &s, &list)).is_some());
    }
}

#[test]
fn empty_playlist_or_missing_sink_is_a_noop() {
    let empty = Playlist::new();
    let (mut t, rx) = traversal();
    let s = session_at(Some("a"), false, RepeatMode::All);
    assert_eq!(
        t.advance(AdvanceReason::UserSkipNext, &s, &empty),
        Decision::NoOp(NoOpReason::EmptyPlaylist)
    );
    assert!(rx.try_recv().is_err());

    let list = playlist(&["a", "b"]);
    let mut unwired: Traversal<StdRng> = Traversal::with_rng(StdRng::seed_from_u64(1));
    assert_eq!(
        unwired.advance(AdvanceReason::UserSkipNext, &s, &list),
        Decision::NoOp(NoOpReason::NoSink)
    );
}

#[test]
fn dropped_receiver_turns_advance_into_noop() {
    let list = playlist(&["a", "b"]);
    let (mut t, rx) = traversal();
    drop(rx);
    let s = session_at(Some("a"), false, RepeatMode::Off);
    assert_eq!(
        t.advance(AdvanceReason::UserSkipNext, &s, &list),
        Decision::NoOp(NoOpReason::NoSink)
    );
}

#[test]
fn volume_is_clamped_and_never_implies_mute() {
    let mut s = PlaybackSession::default();
    assert_eq!(s.set_volume(1.4), 1.0);
    assert_eq!(s.volume(), 1.0);
    assert_eq!(s.set_volume(-0.2), 0.0);
    assert!(!s.muted());
    assert_eq!(s.set_volume(f32::NAN), 0.0);

    s.set_volume(0.6);
    assert!(s.toggle_mute());
    assert_eq!(s.effective_volume(), 0.0);
    assert_eq!(s.volume(), 0.6);
    assert!(!s.toggle_mute());
    assert_eq!(s.effective_volume(), 0.6);
}

#[test]
fn elapsed_is_clamped_once_duration_is_known() {
    let mut s = PlaybackSession::default();
    assert_eq!(
        s.set_elapsed(Duration::from_secs(500)),
        Duration::from_secs(500)
    );
    s.set_duration(Duration::from_secs(120));
    assert_eq!(s.elapsed(), Duration::from_secs(120));
    assert_eq!(
        s.set_elapsed(Duration::from_secs(121)),
        Duration::from_secs(120)
    );
    s.reset_position();
    assert_eq!(s.duration(), None);
    assert_eq!(s.elapsed(), Duration::ZERO);
}

#[test]
fn session_starts_from_settings() {
    let settings = PlaybackSettings {
        shuffle: true,
        repeat: RepeatSetting::All,
        volume: 3.0,
        ..PlaybackSettings::default()
    };
    let s = PlaybackSession::new(&settings);
    assert!(s.shuffle);
    assert_eq!(s.repeat, RepeatMode::All);
    assert_eq!(s.volume(), 1.0);
    assert_eq!(s.status, TransportState::Empty);
    assert!(!s.is_playing());
}

#[test]
fn repeat_mode_cycles() {
    assert_eq!(RepeatMode::Off.next(), RepeatMode::All);
    assert_eq!(RepeatMode::All.next(), RepeatMode::One);
    assert_eq!(RepeatMode::One.next(), RepeatMode::Off);
}

#[test]
fn snapshot_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("session.toml");

    let mut s = session_at(Some("b"), true, RepeatMode::One);
    s.set_volume(0.3);
    s.set_elapsed(Duration::from_millis(42_500));
    let snapshot = s.snapshot();
    snapshot.save(&path).unwrap();

    let loaded = SessionSnapshot::load(&path).unwrap().unwrap();
    assert_eq!(loaded, snapshot);
    assert_eq!(loaded.elapsed(), Duration::from_millis(42_500));

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("repeat_mode = \"one\""));
}

#[test]
fn snapshot_load_handles_missing_and_malformed_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.toml");
    assert!(SessionSnapshot::load(&path).unwrap().is_none());

    std::fs::write(&path, "volume = \"loud\"").unwrap();
    assert!(matches!(
        SessionSnapshot::load(&path),
        Err(SessionError::Parse(_))
    ));
}

#[test]
fn snapshot_with_out_of_range_position_restores_at_start() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.toml");

    std::fs::write(&path, "volume = 0.5\nelapsed_seconds = 1e20\n").unwrap();
    let snapshot = SessionSnapshot::load(&path).unwrap().unwrap();
    assert_eq!(snapshot.elapsed(), Duration::ZERO);

    std::fs::write(&path, "volume = 0.5\nelapsed_seconds = -3.0\n").unwrap();
    let snapshot = SessionSnapshot::load(&path).unwrap().unwrap();
    assert_eq!(snapshot.elapsed(), Duration::ZERO);

    std::fs::write(&path, "volume = 0.5\nelapsed_seconds = 42.5\n").unwrap();
    let snapshot = SessionSnapshot::load(&path).unwrap().unwrap();
    assert_eq!(snapshot.elapsed(), Duration::from_millis(42_500));
}
