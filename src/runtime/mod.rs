use std::env;
use std::sync::mpsc;

use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::info;

use crate::app::App;
use crate::audio::RodioTransportFactory;
use crate::mpris::ControlCmd;
use crate::player::Player;
use crate::visual::FrameClock;

mod event_loop;
mod mpris_sync;
mod panic_log;
mod settings;
mod startup;

/// The player as the terminal front-end runs it.
pub type AppPlayer = Player<RodioTransportFactory, FrameClock>;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = settings::load_settings();

    let dir = env::args().nth(1).unwrap_or_else(|| {
        std::env::current_dir()
            .ok()
            .and_then(|p| p.to_str().map(|s| s.to_string()))
            .unwrap_or_else(|| "Music".to_string())
    });

    let mut player = startup::build_player(&settings, &dir)?;
    let mut app = App::new(settings.ui.follow_playback);
    app.set_current_dir(dir.clone());
    if let Some(idx) = player
        .current_track()
        .and_then(|t| player.playlist().position(&t.id))
    {
        app.selected = idx;
    }

    let (control_tx, control_rx) = mpsc::channel::<ControlCmd>();
    let mpris = crate::mpris::spawn_mpris(control_tx);
    mpris_sync::update_mpris(&mpris, &player);

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let panic_log = panic_log::PanicLog::install();

    let run_result: Result<(), Box<dyn std::error::Error>> = (|| {
        let mut state = event_loop::EventLoopState::new(&player);
        event_loop::run(
            &mut terminal,
            &settings,
            &mut app,
            &mut player,
            &mpris,
            &control_rx,
            &mut state,
        )
    })();

    startup::save_session(&player, &settings);
    player.detach_surface();
    player.dispose();
    info!("shutting down");

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    drop(panic_log);

    run_result
}
