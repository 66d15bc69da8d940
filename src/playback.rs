//! Playback module: the session state and the playlist traversal machine.
//!
//! `PlaybackSession` is the single source of truth the UI and the traversal
//! machine read. `Traversal` decides what plays next and emits the decision as
//! a `TrackIntent`; it never touches a transport itself.

mod session;
mod traversal;

pub use session::*;
pub use traversal::*;

#[cfg(test)]
mod tests;
