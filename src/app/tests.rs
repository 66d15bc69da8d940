use super::*;

#[test]
fn next_and_prev_wrap_around() {
    let mut app = App::new(false);
    app.next(3);
    assert_eq!(app.selected, 1);
    app.next(3);
    app.next(3);
    assert_eq!(app.selected, 0);

    app.prev(3);
    assert_eq!(app.selected, 2);
    app.prev(3);
    assert_eq!(app.selected, 1);
}

#[test]
fn empty_list_pins_cursor_to_zero() {
    let mut app = App::new(false);
    app.selected = 4;
    app.next(0);
    assert_eq!(app.selected, 0);
    app.prev(0);
    assert_eq!(app.selected, 0);
    app.select_last(0);
    assert_eq!(app.selected, 0);
}

#[test]
fn stale_cursor_is_pulled_back_into_range() {
    let mut app = App::new(false);
    app.selected = 10;
    app.next(3);
    assert_eq!(app.selected, 0);

    app.selected = 10;
    app.clamp_selection(4);
    assert_eq!(app.selected, 3);
}

#[test]
fn follow_mode_tracks_the_playing_row() {
    let mut app = App::new(true);
    app.sync_with_playing(Some(5));
    assert_eq!(app.selected, 5);

    app.sync_with_playing(None);
    assert_eq!(app.selected, 5);

    app.follow_playback_off();
    app.sync_with_playing(Some(1));
    assert_eq!(app.selected, 5);

    app.follow_playback_on();
    app.sync_with_playing(Some(1));
    assert_eq!(app.selected, 1);
}

#[test]
fn metadata_window_toggles() {
    let mut app = App::default();
    assert!(app.follow_playback);
    assert!(!app.metadata_window);
    app.toggle_metadata_window();
    assert!(app.metadata_window);
    app.toggle_metadata_window();
    assert!(!app.metadata_window);
}
