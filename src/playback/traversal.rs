use std::sync::mpsc::Sender;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::library::{Playlist, TrackId};

use super::session::{PlaybackSession, RepeatMode};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AdvanceReason {
    UserSkipNext,
    UserSkipPrevious,
    TrackEnded,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NoOpReason {
    EmptyPlaylist,
    NoSink,
}

/// Outcome of one traversal step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Switch to the track at `index`.
    Change {
        index: usize,
        track: TrackId,
        autoplay: bool,
    },
    /// Play the current track again from 0.
    Restart,
    /// End of playlist: stop and keep the current track.
    Stop,
    /// Nothing to do. Not an error.
    NoOp(NoOpReason),
}

/// What the player should do next, as emitted to the intent sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackIntent {
    Change { track: TrackId, autoplay: bool },
    Restart,
    Stop,
}

/// Playlist traversal: shuffle, repeat-one, repeat-all and natural order.
///
/// `decide` is a pure function of the session, the playlist and the random
/// source; `advance` additionally forwards the decision to the registered
/// intent sink.
pub struct Traversal<R: Rng = StdRng> {
    rng: R,
    sink: Option<Sender<TrackIntent>>,
}

impl Traversal<StdRng> {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl Default for Traversal<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> Traversal<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng, sink: None }
    }

    pub fn set_sink(&mut self, sink: Sender<TrackIntent>) {
        self.sink = Some(sink);
    }

    pub fn clear_sink(&mut self) {
        self.sink = None;
    }

    /// Decide and emit. Without a sink or with an empty playlist this is a
    /// logged no-op.
    pub fn advance(
        &mut self,
        reason: AdvanceReason,
        session: &PlaybackSession,
        playlist: &Playlist,
    ) -> Decision {
        if self.sink.is_none() {
            debug!(?reason, "traversal no-op: no intent sink");
            return Decision::NoOp(NoOpReason::NoSink);
        }

        let decision = self.decide(reason, session, playlist);
        let intent = match &decision {
            Decision::Change {
                track, autoplay, ..
            } => TrackIntent::Change {
                track: track.clone(),
                autoplay: *autoplay,
            },
            Decision::Restart => TrackIntent::Restart,
            Decision::Stop => TrackIntent::Stop,
            Decision::NoOp(why) => {
                debug!(?reason, ?why, "traversal no-op");
                return decision;
            }
        };

        debug!(?reason, ?decision, "traversal decided");
        let delivered = self.sink.as_ref().is_some_and(|s| s.send(intent).is_ok());
        if !delivered {
            debug!("intent receiver dropped");
            self.sink = None;
            return Decision::NoOp(NoOpReason::NoSink);
        }
        decision
    }

    pub fn decide(
        &mut self,
        reason: AdvanceReason,
        session: &PlaybackSession,
        playlist: &Playlist,
    ) -> Decision {
        let len = playlist.len();
        if len == 0 {
            return Decision::NoOp(NoOpReason::EmptyPlaylist);
        }
        let current = session.current.as_ref().and_then(|id| playlist.position(id));

        match reason {
            AdvanceReason::UserSkipPrevious => {
                let index = match current {
                    Some(i) if i > 0 => i - 1,
                    _ => len - 1,
                };
                change(playlist, index)
            }
            AdvanceReason::UserSkipNext => {
                if session.repeat == RepeatMode::One && session.current.is_some() {
                    Decision::Restart
                } else if session.shuffle {
                    change(playlist, self.rng.gen_range(0..len))
                } else {
                    change(playlist, natural_next(current, len))
                }
            }
            AdvanceReason::TrackEnded => {
                if session.repeat == RepeatMode::One && session.current.is_some() {
                    Decision::Restart
                } else if session.shuffle {
                    change(playlist, self.rng.gen_range(0..len))
                } else if current == Some(len - 1) && session.repeat != RepeatMode::All {
                    Decision::Stop
                } else {
                    change(playlist, natural_next(current, len))
                }
            }
        }
    }
}

/// Index after `current`, wrapping; a missing current track counts as -1.
fn natural_next(current: Option<usize>, len: usize) -> usize {
    current.map_or(0, |i| (i + 1) % len)
}

/// Every traversal change keeps playing: skips are user gestures and natural
/// advancement continues an already audible session.
fn change(playlist: &Playlist, index: usize) -> Decision {
    match playlist.get(index) {
        Some(track) => Decision::Change {
            index,
            track: track.id.clone(),
            autoplay: true,
        },
        None => Decision::NoOp(NoOpReason::EmptyPlaylist),
    }
}
