//! The transport boundary: one playable media element per `Transport`.
//!
//! Transports report their lifecycle asynchronously through an event channel.
//! `TransportState` turns that event stream into an explicit state machine so
//! that combinations such as "playing while loading" cannot be represented.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::error::{GraphError, PlaybackRejected};
use crate::library::SourceHandle;

use super::nodes::SourceNode;

static NEXT_TRANSPORT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one transport instance. Never reused within a process.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TransportId(u64);

impl TransportId {
    pub fn next() -> Self {
        Self(NEXT_TRANSPORT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TransportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    LoadStart,
    /// Metadata is known and playback may start. `duration` is `None` when
    /// the decoder cannot tell.
    Ready { duration: Option<Duration> },
    Playing,
    Paused,
    TimeUpdate(Duration),
    Ended,
    Error(String),
}

/// An event tagged with the transport that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedEvent {
    pub transport: TransportId,
    pub event: TransportEvent,
}

/// Sending half handed to a transport at construction.
#[derive(Debug, Clone)]
pub struct EventSink {
    id: TransportId,
    tx: Sender<TaggedEvent>,
}

impl EventSink {
    pub fn new(id: TransportId, tx: Sender<TaggedEvent>) -> Self {
        Self { id, tx }
    }

    pub fn id(&self) -> TransportId {
        self.id
    }

    pub fn emit(&self, event: TransportEvent) {
        let tagged = TaggedEvent {
            transport: self.id,
            event,
        };
        if self.tx.send(tagged).is_err() {
            debug!(transport = %self.id, "event receiver dropped");
        }
    }
}

/// Operations the player needs from a media element.
///
/// Calls return once the request is issued; completion is reported through
/// the transport's `EventSink` (`Ready`, `Playing`, `Ended`, ...).
pub trait Transport {
    fn id(&self) -> TransportId;
    fn load(&mut self, source: &SourceHandle);
    fn play(&mut self) -> Result<(), PlaybackRejected>;
    fn pause(&mut self);
    fn seek(&mut self, position: Duration);
    fn set_volume(&mut self, level: f32);
    /// Hand out the element's source node. Succeeds at most once per transport.
    fn create_source_node(&mut self) -> Result<SourceNode, GraphError>;
    /// Drive time updates and end-of-stream detection.
    fn poll(&mut self);
    /// Stop output and release decoding resources.
    fn shutdown(&mut self);
}

/// Builds a fresh transport for every track change.
pub trait TransportFactory {
    type Transport: Transport;

    fn create(&mut self, events: Sender<TaggedEvent>) -> Self::Transport;
}

/// Lifecycle of the current transport as seen by the session.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum TransportState {
    #[default]
    Empty,
    Loading,
    Ready,
    Playing,
    Paused,
    Ended,
    Errored,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("illegal transport transition: {event:?} while {from:?}")]
pub struct IllegalTransition {
    pub from: TransportState,
    pub event: TransportEvent,
}

impl TransportState {
    /// Transition table. Errors and a new load are accepted from any state;
    /// everything else must match the current state.
    pub fn on(self, event: &TransportEvent) -> Result<TransportState, IllegalTransition> {
        use TransportEvent as E;
        use TransportState as S;

        let next = match (self, event) {
            (_, E::LoadStart) => S::Loading,
            (_, E::Error(_)) => S::Errored,

            (S::Loading, E::Ready { .. }) => S::Ready,

            (S::Ready | S::Paused | S::Ended | S::Playing, E::Playing) => S::Playing,

            (S::Playing | S::Paused, E::Paused) => S::Paused,
            (S::Ready, E::Paused) => S::Ready,
            (S::Ended, E::Paused) => S::Ended,

            (S::Ready | S::Playing | S::Paused | S::Ended, E::TimeUpdate(_)) => self,

            (S::Playing | S::Paused, E::Ended) => S::Ended,

            _ => {
                return Err(IllegalTransition {
                    from: self,
                    event: event.clone(),
                });
            }
        };
        Ok(next)
    }

    pub fn is_playing(self) -> bool {
        self == Self::Playing
    }

    pub fn is_loading(self) -> bool {
        self == Self::Loading
    }

    /// A source is loaded and can accept play/seek requests.
    pub fn is_loaded(self) -> bool {
        matches!(self, Self::Ready | Self::Playing | Self::Paused | Self::Ended)
    }
}
