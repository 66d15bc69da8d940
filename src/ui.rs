//! UI rendering helpers for the terminal user interface.
//!
//! The visualizer pane is a braille `Canvas`; each terminal cell holds 2x4
//! dots, so the render surface is sized in dots and the canvas bounds match
//! it one to one.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::Marker,
    widgets::{
        Block, Borders, Clear, List, ListItem, ListState, Padding, Paragraph, Wrap,
        canvas::{Canvas, Line},
    },
};
use std::{collections::BTreeMap, sync::LazyLock, time::Duration};

use crate::app::App;
use crate::audio::{GraphStatus, TransportFactory};
use crate::config::Settings;
use crate::player::Player;
use crate::visual::{DrawCommand, FrameScheduler, Surface};

const DOTS_PER_COL: u16 = 2;
const DOTS_PER_ROW: u16 = 4;

static CONTROLS_MAP: LazyLock<BTreeMap<&'static str, &'static str>> = LazyLock::new(|| {
    BTreeMap::from([
        ("j/k", "up/down"),
        ("gg/G", "top/bottom"),
        ("enter", "play selected"),
        ("space/p", "play/pause"),
        ("h/l", "prev/next"),
        ("+/-", "volume"),
        ("m", "mute"),
        ("s", "shuffle"),
        ("r", "repeat"),
        ("v", "visualizer"),
        ("f", "favorite"),
        ("K", "metadata"),
        ("q", "quit"),
    ])
});

/// Render the controls help text, incorporating the seek step.
fn controls_text(seek_seconds: u64) -> String {
    let order = [
        "j/k", "h/l", "H/L", "enter", "space/p", "+/-", "m", "s", "r", "v", "f", "gg/G", "K",
        "q",
    ];
    order
        .iter()
        .filter_map(|k| {
            if *k == "H/L" {
                Some(format!("[H/L] seek -/+{}s", seek_seconds))
            } else {
                CONTROLS_MAP.get(*k).map(|v| format!("[{}] {}", k, v))
            }
        })
        .collect::<Vec<String>>()
        .join(" | ")
}

/// Format a `Duration` as `MM:SS`.
fn format_mmss(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Duration rounded up to whole seconds, `-` while unknown.
fn format_duration_mmss_ceil(d: Duration) -> String {
    if d.is_zero() {
        return "-".to_string();
    }
    let mut total_secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        total_secs = total_secs.saturating_add(1);
    }
    format!("{}:{:02} ({}s)", total_secs / 60, total_secs % 60, total_secs)
}

/// Compute a centered rectangle with given size constrained to `r`.
fn centered_rect_sized(mut width: u16, mut height: u16, r: Rect) -> Rect {
    width = width.min(r.width.saturating_sub(2)).max(10);
    height = height.min(r.height.saturating_sub(2)).max(5);

    let x = r.x + (r.width.saturating_sub(width) / 2);
    let y = r.y + (r.height.saturating_sub(height) / 2);
    Rect {
        x,
        y,
        width,
        height,
    }
}

/// Ten-cell meter for a level in [0, 1].
fn meter(level: f32) -> String {
    let filled = (level.clamp(0.0, 1.0) * 10.0).round() as usize;
    format!("{}{}", "▮".repeat(filled), "▯".repeat(10 - filled))
}

/// Blue through green to red as `level` rises.
fn level_color(level: u8) -> Color {
    let t = f32::from(level) / 255.0;
    let (r, g, b) = if t < 0.5 {
        let k = t * 2.0;
        (0.0, 80.0 + 175.0 * k, 255.0 * (1.0 - k))
    } else {
        let k = (t - 0.5) * 2.0;
        (255.0 * k, 255.0 * (1.0 - k) + 60.0 * k, 0.0)
    };
    Color::Rgb(r as u8, g as u8, b as u8)
}

struct Areas {
    header: Rect,
    status: Rect,
    list: Rect,
    visualizer: Rect,
    footer: Rect,
}

fn split(area: Rect) -> Areas {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Min(1),
            Constraint::Length(4),
        ])
        .split(area);
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(rows[2]);
    Areas {
        header: rows[0],
        status: rows[1],
        list: body[0],
        visualizer: body[1],
        footer: rows[3],
    }
}

/// Inner cells of the visualizer pane for a terminal of `area`.
pub fn visualizer_area(area: Rect) -> Rect {
    Block::default()
        .borders(Borders::ALL)
        .inner(split(area).visualizer)
}

/// Surface size in braille dots for a pane of `inner` cells.
pub fn surface_size(inner: Rect) -> (f64, f64) {
    (
        f64::from(inner.width * DOTS_PER_COL),
        f64::from(inner.height * DOTS_PER_ROW),
    )
}

fn status_text<F: TransportFactory, S: FrameScheduler>(app: &App, player: &Player<F, S>) -> String {
    let session = player.session();
    let mut parts: Vec<String> = Vec::new();

    if app.follow_playback {
        parts.push(" CURSOR: Follow".to_string());
    } else {
        parts.push(" CURSOR: Free-roam".to_string());
    }

    parts.push(format!("REPEAT: {}", session.repeat.label()));
    parts.push(format!(
        "Shuffle: {}",
        if session.shuffle { "ON" } else { "OFF" }
    ));

    match player.current_track() {
        Some(track) => {
            let state = if session.is_playing() {
                "Playing"
            } else if session.is_loading() {
                "Loading"
            } else {
                "Paused"
            };
            let time = match session.duration() {
                Some(total) => format!("{}/{}", format_mmss(session.elapsed()), format_mmss(total)),
                None => format_mmss(session.elapsed()),
            };
            let star = if track.favorite { " ★" } else { "" };
            parts.push(format!("Song: {}{} [{}]", track.display, star, time));
            parts.push(state.to_string());
        }
        None => parts.push("Stopped".to_string()),
    }

    if session.muted() {
        parts.push("Vol: muted".to_string());
    } else {
        parts.push(format!("Vol: {:.0}%", session.volume() * 100.0));
    }

    let bands = player.surface().bands();
    parts.push(format!(
        "B {} M {} T {}",
        meter(bands.bass),
        meter(bands.mid),
        meter(bands.treble)
    ));

    if let Some(dir) = &app.current_dir {
        parts.push(format!("Dir: {}", dir));
    }

    if let Some(notice) = player.notice() {
        parts.push(format!("! {}", notice));
    }

    parts.join(" • ")
}

/// Visualizer title suffix for graphs that cannot feed the analyser.
fn graph_note(status: GraphStatus, degraded_reason: Option<&str>) -> String {
    match (status, degraded_reason) {
        (GraphStatus::Degraded, Some(reason)) => format!(" (unavailable: {})", reason),
        (GraphStatus::Degraded, None) => " (unavailable)".to_string(),
        (GraphStatus::Suspended, _) => " (waiting)".to_string(),
        _ => String::new(),
    }
}

fn draw_visualizer(frame: &mut Frame, area: Rect, surface: &Surface, title: String) {
    let block = Block::default().borders(Borders::ALL).title(title);
    let Some(size) = surface.size() else {
        frame.render_widget(block, area);
        return;
    };

    let canvas = Canvas::default()
        .block(block)
        .marker(Marker::Braille)
        .x_bounds([0.0, size.width])
        .y_bounds([0.0, size.height])
        .paint(|ctx| {
            for cmd in surface.commands() {
                let color = level_color(cmd.level());
                match *cmd {
                    DrawCommand::Bar {
                        x, width, height, ..
                    } => {
                        if height <= 0.0 {
                            continue;
                        }
                        let mut col = x;
                        while col < x + width - 0.5 {
                            ctx.draw(&Line::new(col, 0.0, col, height, color));
                            col += 1.0;
                        }
                    }
                    DrawCommand::Segment { x1, y1, x2, y2, .. } => {
                        ctx.draw(&Line::new(x1, y1, x2, y2, color));
                    }
                }
            }
        });
    frame.render_widget(canvas, area);
}

/// Render the entire UI into the provided `frame`.
pub fn draw<F: TransportFactory, S: FrameScheduler>(
    frame: &mut Frame,
    app: &App,
    player: &Player<F, S>,
    settings: &Settings,
) {
    let areas = split(frame.area());

    let header = Paragraph::new(settings.ui.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" resonate ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, areas.header);

    let status_par = Paragraph::new(status_text(app, player))
        .block(
            Block::bordered()
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                })
                .title(" status "),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(status_par, areas.status);

    // Track list, windowed around the cursor so only visible rows are built.
    let tracks = player.playlist().tracks();
    let playing = player.current_track().map(|t| &t.id);
    {
        let total = tracks.len();
        let list_height = areas.list.height.saturating_sub(2) as usize;
        let sel_pos = app.selected.min(total.saturating_sub(1));
        let (start, end) = if total <= list_height || list_height == 0 {
            (0, total)
        } else {
            let half = list_height / 2;
            let mut start = sel_pos.saturating_sub(half);
            if start + list_height > total {
                start = total - list_height;
            }
            (start, start + list_height)
        };

        let visible_items: Vec<ListItem> = tracks[start..end]
            .iter()
            .map(|t| {
                let marker = if Some(&t.id) == playing { "♪ " } else { "  " };
                let star = if t.favorite { " ★" } else { "" };
                let item = ListItem::new(format!("{}{}{}", marker, t.display, star));
                if Some(&t.id) == playing {
                    item.bold()
                } else {
                    item
                }
            })
            .collect();

        let list = List::new(visible_items)
            .block(Block::default().borders(Borders::ALL).title(" tracks "))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ListState::default();
        if total > 0 {
            state.select(Some(sel_pos - start));
        }
        frame.render_stateful_widget(list, areas.list, &mut state);
    }

    let note = graph_note(player.graph_status(), player.graph().degraded_reason());
    draw_visualizer(
        frame,
        areas.visualizer,
        player.surface(),
        format!(" {}{} ", player.strategy(), note),
    );

    if app.metadata_window {
        let popup_area = centered_rect_sized(72, 9, areas.list);
        frame.render_widget(Clear, popup_area);

        let meta = match tracks.get(app.selected) {
            Some(track) => format!(
                "Title: {}\nArtist: {}\nAlbum: {}\nDuration: {}\nPath: {}",
                track.title,
                track.artist,
                track.album.as_deref().unwrap_or("-"),
                format_duration_mmss_ceil(track.duration),
                track.source.path().display()
            ),
            None => "No track selected".to_string(),
        };
        let meta_paragraph = Paragraph::new(meta)
            .block(
                Block::default()
                    .padding(Padding {
                        left: 1,
                        right: 0,
                        top: 0,
                        bottom: 0,
                    })
                    .borders(Borders::ALL)
                    .title(" metadata (K closes) "),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(meta_paragraph, popup_area);
    }

    let footer = Paragraph::new(controls_text(settings.playback.seek_seconds))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                }),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, areas.footer);
}
