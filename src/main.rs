use std::fs::{self, File};
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

mod app;
mod audio;
mod config;
mod error;
mod library;
mod mpris;
mod playback;
mod player;
mod runtime;
mod ui;
mod visual;

/// Log to `$XDG_STATE_HOME/resonate/resonate.log`; the terminal belongs to
/// the UI. Filter with `RUST_LOG`, default `info`.
fn init_tracing() {
    let Some(dir) = config::state_dir() else {
        return;
    };
    if fs::create_dir_all(&dir).is_err() {
        return;
    }
    let Ok(file) = File::create(dir.join("resonate.log")) else {
        return;
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    runtime::run()
}
