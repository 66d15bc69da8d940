//! Error taxonomy shared by the playback and visualization subsystems.
//!
//! Each subsystem fails on its own: graph errors disable visualization only,
//! playback rejections leave the session paused, and none of them halt the
//! render loop.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::audio::TransportId;

/// Failures of the audio graph (context, gain and analysis nodes).
#[derive(Debug, Error)]
pub enum GraphError {
    /// The graph could not be built (invalid analyser parameters, no engine).
    #[error("cannot construct audio graph: {0}")]
    Construction(String),
    /// A source could not be wired into the graph.
    #[error("cannot bind source to audio graph: {0}")]
    Binding(BindingError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    #[error("the graph context has been closed")]
    ContextClosed,
    #[error("no graph has been constructed yet")]
    NoGraph,
    #[error("transport {0} already handed out its source node")]
    SourceTaken(TransportId),
    #[error("source node of transport {0} belongs to another graph")]
    ForeignGraph(TransportId),
}

impl From<BindingError> for GraphError {
    fn from(value: BindingError) -> Self {
        Self::Binding(value)
    }
}

/// The transport refused to start audible output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackRejected {
    #[error("nothing is loaded")]
    NotLoaded,
    #[error("source cannot be played: {0}")]
    Unsupported(String),
}

/// Load-time failures of a transport. They surface as `TransportEvent::Error`.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode {path:?}: {reason}")]
    Decode { path: PathBuf, reason: String },
}

/// Reading or writing the persisted session snapshot.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session file: {0}")]
    Io(#[from] io::Error),
    #[error("malformed session file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("cannot serialize session: {0}")]
    Serialize(#[from] toml::ser::Error),
}
