//! Audio module: transports, the processing graph and the frequency sampler.
//!
//! A `Transport` plays one source at a time and reports its lifecycle as
//! `TransportEvent`s. The `AudioGraphManager` routes the transport's samples
//! through a gain node and an analyser; the `FrequencySampler` reads the
//! analyser once per render tick.

mod graph;
mod nodes;
mod rodio_transport;
mod sampler;
mod transport;

pub use graph::{AudioGraphManager, GraphStatus};
pub use nodes::{AnalyserConfig, AnalyserNode, ContextState, GraphContext, SourceNode};
pub use rodio_transport::{RodioTransport, RodioTransportFactory};
pub use sampler::{BandSummary, FrequencySample, FrequencySampler, average_level, band_summary};
pub use transport::{
    EventSink, IllegalTransition, TaggedEvent, Transport, TransportEvent, TransportFactory,
    TransportId, TransportState,
};

#[cfg(test)]
pub(crate) mod testing;
