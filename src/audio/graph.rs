use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::AnalyserSettings;
use crate::error::{BindingError, GraphError};

use super::nodes::{AnalyserConfig, AnalyserNode, GainNode, GraphContext, Route, SourceNode};
use super::transport::{Transport, TransportId};

/// Externally visible condition of the graph.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GraphStatus {
    /// Never constructed.
    Absent,
    /// Constructed, waiting for a user gesture to resume the context.
    Suspended,
    /// Constructed and running; the analyser produces data.
    Ready,
    /// Construction failed. Playback continues without visualization.
    Degraded,
    /// Closed; only a fresh `ensure_graph` brings it back.
    Closed,
}

struct Graph {
    context: Arc<GraphContext>,
    gain: Arc<GainNode>,
    analyser: Arc<AnalyserNode>,
    source: Option<SourceNode>,
}

impl Graph {
    fn route(&self) -> Route {
        Route {
            context: Arc::clone(&self.context),
            gain: Arc::clone(&self.gain),
            analyser: Arc::clone(&self.analyser),
        }
    }
}

/// Owns the single `source -> gain -> analyser -> output` graph of a player.
///
/// The graph is built lazily on first use and rebound on every track change.
/// Analyser parameters are fixed at construction; changing them means closing
/// and building a new graph.
pub struct AudioGraphManager {
    config: AnalyserConfig,
    start_suspended: bool,
    time_constant: Duration,
    volume: f32,
    /// A user gesture has happened; contexts may run.
    unlocked: bool,
    graph: Option<Graph>,
    closed: bool,
    degraded: Option<String>,
}

impl AudioGraphManager {
    pub fn new(settings: &AnalyserSettings) -> Self {
        Self {
            config: AnalyserConfig::from(settings),
            start_suspended: settings.start_suspended,
            time_constant: Duration::from_millis(settings.volume_time_constant_ms),
            volume: 1.0,
            unlocked: false,
            graph: None,
            closed: false,
            degraded: None,
        }
    }

    pub fn config(&self) -> &AnalyserConfig {
        &self.config
    }

    /// Build the graph if needed and bind it to `transport`.
    ///
    /// Calling it again for the bound transport is a no-op apart from resuming
    /// a suspended context once a gesture has unlocked audio. A construction
    /// failure leaves the manager degraded; the transport is untouched.
    pub fn ensure_graph<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
    ) -> Result<(), GraphError> {
        if self.graph.is_none() {
            let graph = self.construct().inspect_err(|e| {
                warn!(error = %e, "visualization disabled");
                self.degraded = Some(e.to_string());
                self.closed = false;
            })?;
            self.graph = Some(graph);
            self.closed = false;
            self.degraded = None;
        }

        if self.bound_transport() != Some(transport.id()) {
            self.rebind(transport)?;
        }

        if self.unlocked {
            self.resume();
        }
        Ok(())
    }

    fn construct(&self) -> Result<Graph, GraphError> {
        let analyser = AnalyserNode::new(self.config)?;
        let context = GraphContext::new(self.start_suspended && !self.unlocked);
        info!(
            context = context.id(),
            fft_size = self.config.fft_size,
            smoothing = self.config.smoothing,
            "audio graph constructed"
        );
        Ok(Graph {
            context: Arc::new(context),
            gain: Arc::new(GainNode::new(self.volume, self.time_constant)),
            analyser: Arc::new(analyser),
            source: None,
        })
    }

    /// Swap the graph's source for the one of `transport`.
    ///
    /// The old source is disconnected first; a failed disconnect is expected
    /// on a track switch and only logged.
    pub fn rebind<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<(), GraphError> {
        if self.closed {
            return Err(BindingError::ContextClosed.into());
        }
        let graph = self.graph.as_mut().ok_or(BindingError::NoGraph)?;

        if let Some(old) = graph.source.take() {
            if !old.disconnect() {
                debug!(transport = %old.transport(), "source already disconnected");
            }
        }

        let node = transport.create_source_node()?;
        node.connect(graph.route())?;
        debug!(transport = %node.transport(), "source bound to graph");
        graph.source = Some(node);
        Ok(())
    }

    /// Disconnect the current source so no stale transport feeds the graph.
    pub fn detach_source(&mut self) {
        if let Some(source) = self.graph.as_mut().and_then(|g| g.source.take()) {
            if !source.disconnect() {
                debug!(transport = %source.transport(), "source already disconnected");
            }
        }
    }

    pub fn bound_transport(&self) -> Option<TransportId> {
        self.graph
            .as_ref()
            .and_then(|g| g.source.as_ref())
            .map(SourceNode::transport)
    }

    /// Clamp `level` to [0, 1] and make it the gain target. Returns the
    /// stored level.
    pub fn set_volume(&mut self, level: f32) -> f32 {
        let level = if level.is_nan() { 0.0 } else { level.clamp(0.0, 1.0) };
        self.volume = level;
        if let Some(graph) = &self.graph {
            graph.gain.set_target(level);
        }
        level
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Record a user gesture. Audio contexts may run from now on.
    pub fn unlock(&mut self) {
        self.unlocked = true;
        self.resume();
    }

    fn resume(&mut self) {
        if let Some(graph) = &self.graph {
            if !graph.context.is_running() && graph.context.resume() {
                debug!(context = graph.context.id(), "audio context resumed");
            }
        }
    }

    /// Tear the graph down. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(mut graph) = self.graph.take() {
            if let Some(source) = graph.source.take() {
                let _ = source.disconnect();
            }
            graph.context.close();
            info!(
                context = graph.context.id(),
                clock = ?graph.context.current_time(),
                "audio graph closed"
            );
        }
        self.closed = true;
    }

    pub fn status(&self) -> GraphStatus {
        match &self.graph {
            Some(g) if g.context.is_running() => GraphStatus::Ready,
            Some(_) => GraphStatus::Suspended,
            None if self.closed => GraphStatus::Closed,
            None if self.degraded.is_some() => GraphStatus::Degraded,
            None => GraphStatus::Absent,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status() == GraphStatus::Ready
    }

    /// Reason of the last construction failure, while degraded.
    pub fn degraded_reason(&self) -> Option<&str> {
        self.degraded.as_deref()
    }

    /// The analyser, while the graph is running.
    pub fn analyser(&self) -> Option<&AnalyserNode> {
        self.graph
            .as_ref()
            .filter(|g| g.context.is_running())
            .map(|g| g.analyser.as_ref())
    }

    pub fn context(&self) -> Option<&GraphContext> {
        self.graph.as_ref().map(|g| g.context.as_ref())
    }

    #[cfg(test)]
    pub(crate) fn gain_target(&self) -> Option<f32> {
        self.graph.as_ref().map(|g| g.gain.target())
    }
}

impl Drop for AudioGraphManager {
    fn drop(&mut self) {
        self.close();
    }
}
