use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{Terminal, backend::CrosstermBackend, layout::Rect};
use tracing::debug;

use crate::app::App;
use crate::config;
use crate::mpris::{ControlCmd, MprisHandle};
use crate::runtime::mpris_sync::{MprisView, update_mpris};
use crate::ui;

use super::AppPlayer;

/// Longest wait for input when no frame is due.
const IDLE_POLL: Duration = Duration::from_millis(50);

/// State tracked by the runtime event loop across iterations.
pub struct EventLoopState {
    /// Last view published to MPRIS.
    pub last_mpris: MprisView,
    /// Surface size handed to the player, in braille dots.
    pub surface: Option<(f64, f64)>,
}

impl EventLoopState {
    pub fn new(player: &AppPlayer) -> Self {
        Self {
            last_mpris: MprisView::of(player),
            surface: None,
        }
    }
}

/// Main terminal event loop: pumps the player, drives render frames, draws
/// the UI and handles input. Returns `Ok(())` when shutdown is requested.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    app: &mut App,
    player: &mut AppPlayer,
    mpris: &MprisHandle,
    control_rx: &mpsc::Receiver<ControlCmd>,
    state: &mut EventLoopState,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        player.pump();

        let len = player.playlist().len();
        let playing = player
            .current_track()
            .and_then(|t| player.playlist().position(&t.id));
        app.sync_with_playing(playing);
        app.clamp_selection(len);

        // Media keys and auto-advance change state behind the UI's back.
        let view = MprisView::of(player);
        if view != state.last_mpris {
            update_mpris(mpris, player);
            state.last_mpris = view;
        } else {
            mpris.set_position(player.session().elapsed());
        }

        sync_surface(terminal, player, state)?;

        if let Some(frame) = player.scheduler_mut().poll(Instant::now()) {
            player.on_frame(frame);
        }

        terminal.draw(|f| ui::draw(f, app, player, settings))?;

        while let Ok(cmd) = control_rx.try_recv() {
            if handle_control_cmd(cmd, app, player) {
                return Ok(());
            }
        }

        let wait = player
            .scheduler_mut()
            .time_until_due(Instant::now())
            .map_or(IDLE_POLL, |d| d.min(IDLE_POLL));
        if event::poll(wait)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key_event(key, settings, app, player) {
                    return Ok(());
                }
            }
        }
    }
}

/// Attach the render surface on the first pass and track terminal resizes.
fn sync_surface(
    terminal: &Terminal<CrosstermBackend<std::io::Stdout>>,
    player: &mut AppPlayer,
    state: &mut EventLoopState,
) -> Result<(), Box<dyn std::error::Error>> {
    let size = terminal.size()?;
    let inner = ui::visualizer_area(Rect::new(0, 0, size.width, size.height));
    let dots = ui::surface_size(inner);
    match state.surface {
        None => {
            player.attach_surface(dots.0, dots.1);
            state.surface = Some(dots);
        }
        Some(prev) if prev != dots => {
            debug!(width = dots.0, height = dots.1, "visualizer resized");
            player.resize_surface(dots.0, dots.1);
            state.surface = Some(dots);
        }
        Some(_) => {}
    }
    Ok(())
}

/// Apply one MPRIS command. Returns true when the app should quit.
fn handle_control_cmd(cmd: ControlCmd, app: &mut App, player: &mut AppPlayer) -> bool {
    match cmd {
        ControlCmd::Quit => return true,
        ControlCmd::Play => player.play(),
        ControlCmd::Pause => player.pause(),
        ControlCmd::PlayPause => player.toggle_play(),
        ControlCmd::Stop => player.stop(),
        ControlCmd::Next => {
            player.next();
        }
        ControlCmd::Prev => {
            player.previous();
        }
        ControlCmd::Seek(offset_micros) => player.seek_by_micros(offset_micros),
    }
    app.follow_playback_on();
    false
}

/// Apply one key press. Returns true when the app should quit.
fn handle_key_event(
    key: KeyEvent,
    settings: &config::Settings,
    app: &mut App,
    player: &mut AppPlayer,
) -> bool {
    let len = player.playlist().len();
    let seek = i64::try_from(settings.playback.seek_seconds).unwrap_or(i64::MAX);
    let step = settings.playback.volume_step;

    if key.code != KeyCode::Char('g') {
        app.pending_gg = false;
    }

    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('g') => {
            if app.pending_gg {
                app.pending_gg = false;
                app.follow_playback_off();
                app.select_first();
            } else {
                app.pending_gg = true;
            }
        }
        KeyCode::Char('G') => {
            app.follow_playback_off();
            app.select_last(len);
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.follow_playback_off();
            app.next(len);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.follow_playback_off();
            app.prev(len);
        }
        KeyCode::Enter => {
            if let Some(id) = player.playlist().get(app.selected).map(|t| t.id.clone()) {
                app.follow_playback_on();
                player.play_track(&id);
            }
        }
        KeyCode::Char(' ') | KeyCode::Char('p') => {
            app.follow_playback_on();
            player.toggle_play();
        }
        KeyCode::Char('l') => {
            app.follow_playback_on();
            player.next();
        }
        KeyCode::Char('h') => {
            app.follow_playback_on();
            player.previous();
        }
        KeyCode::Char('L') => player.seek_by(seek),
        KeyCode::Char('H') => player.seek_by(-seek),
        KeyCode::Char('+') | KeyCode::Char('=') => {
            player.adjust_volume(step);
        }
        KeyCode::Char('-') => {
            player.adjust_volume(-step);
        }
        KeyCode::Char('m') => {
            player.toggle_mute();
        }
        KeyCode::Char('s') => {
            player.toggle_shuffle();
        }
        KeyCode::Char('r') => {
            player.cycle_repeat();
        }
        KeyCode::Char('v') => {
            player.cycle_strategy();
        }
        KeyCode::Char('f') => {
            player.toggle_favorite();
        }
        KeyCode::Char('K') => app.toggle_metadata_window(),
        _ => {}
    }
    false
}
