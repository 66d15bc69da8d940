//! Library module: track model, the ordered playlist and directory scanning.
//!
//! Tracks are produced by `scan` and handed to the player as a `Playlist`.
//! Playlist order defines "next" and "previous" when shuffle is off.

mod model;
mod scan;

pub use model::*;
pub use scan::scan;
