//! Application model: cursor and view flags of the track list.
//!
//! The playlist itself is owned by the `Player`; `App` only tracks what the
//! user is looking at.

/// Presentation state of the terminal UI.
#[derive(Debug, Clone)]
pub struct App {
    pub selected: usize,
    pub follow_playback: bool,
    pub metadata_window: bool,
    pub current_dir: Option<String>,
    /// First `g` of a `gg` chord was pressed.
    pub pending_gg: bool,
}

impl Default for App {
    fn default() -> Self {
        Self::new(true)
    }
}

impl App {
    pub fn new(follow_playback: bool) -> Self {
        Self {
            selected: 0,
            follow_playback,
            metadata_window: false,
            current_dir: None,
            pending_gg: false,
        }
    }

    pub fn set_current_dir(&mut self, dir: String) {
        self.current_dir = Some(dir);
    }

    pub fn toggle_metadata_window(&mut self) {
        self.metadata_window = !self.metadata_window;
    }

    pub fn follow_playback_on(&mut self) {
        self.follow_playback = true;
    }

    pub fn follow_playback_off(&mut self) {
        self.follow_playback = false;
    }

    /// Move the cursor down one row, wrapping to the top.
    pub fn next(&mut self, len: usize) {
        if len == 0 {
            self.selected = 0;
            return;
        }
        self.selected = (self.selected.min(len - 1) + 1) % len;
    }

    /// Move the cursor up one row, wrapping to the bottom.
    pub fn prev(&mut self, len: usize) {
        if len == 0 {
            self.selected = 0;
            return;
        }
        self.selected = match self.selected.min(len - 1) {
            0 => len - 1,
            i => i - 1,
        };
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self, len: usize) {
        self.selected = len.saturating_sub(1);
    }

    /// Put the cursor on the playing row while following playback.
    pub fn sync_with_playing(&mut self, playing: Option<usize>) {
        if !self.follow_playback {
            return;
        }
        if let Some(idx) = playing {
            self.selected = idx;
        }
    }

    /// Keep the cursor inside a list of `len` rows.
    pub fn clamp_selection(&mut self, len: usize) {
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }
}
