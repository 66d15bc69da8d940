//! `Transport` backed by a rodio `Sink` on the default output stream.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use rodio::mixer::Mixer;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source, StreamError};
use tracing::{debug, info, warn};

use crate::error::{BindingError, GraphError, PlaybackRejected, TransportError};
use crate::library::SourceHandle;

use super::nodes::{RouteSlot, SourceNode, TappedSource};
use super::transport::{
    EventSink, TaggedEvent, Transport, TransportEvent, TransportFactory, TransportId,
};

const TIME_UPDATE_INTERVAL: Duration = Duration::from_millis(250);

/// Owns the output stream; every transport mixes into it.
pub struct RodioTransportFactory {
    stream: OutputStream,
}

impl RodioTransportFactory {
    pub fn open_default() -> Result<Self, StreamError> {
        let mut stream = OutputStreamBuilder::open_default_stream()?;
        // rodio logs to stderr when the stream is dropped, which garbles the TUI.
        stream.log_on_drop(false);
        info!("audio output stream opened");
        Ok(Self { stream })
    }
}

impl TransportFactory for RodioTransportFactory {
    type Transport = RodioTransport;

    fn create(&mut self, events: Sender<TaggedEvent>) -> RodioTransport {
        RodioTransport::new(self.stream.mixer().clone(), events)
    }
}

pub struct RodioTransport {
    events: EventSink,
    mixer: Mixer,
    route: Arc<RouteSlot>,
    source_taken: bool,
    path: Option<PathBuf>,
    sink: Option<Sink>,
    duration: Option<Duration>,
    volume: f32,
    failed: Option<String>,
    playing: bool,
    ended: bool,
    /// Start position of the current sink when it was built with `skip_duration`.
    offset: Duration,
    last_update: Option<Instant>,
}

impl RodioTransport {
    fn new(mixer: Mixer, events: Sender<TaggedEvent>) -> Self {
        Self {
            events: EventSink::new(TransportId::next(), events),
            mixer,
            route: Arc::new(RouteSlot::default()),
            source_taken: false,
            path: None,
            sink: None,
            duration: None,
            volume: 1.0,
            failed: None,
            playing: false,
            ended: false,
            offset: Duration::ZERO,
            last_update: None,
        }
    }

    fn position(&self) -> Duration {
        self.sink
            .as_ref()
            .map_or(Duration::ZERO, |s| self.offset + s.get_pos())
    }

    fn rebuild_at(&mut self, start_at: Duration) -> Result<(), TransportError> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };
        if let Some(old) = self.sink.take() {
            old.stop();
        }
        let (sink, _) = create_sink_at(&self.mixer, &path, &self.route, start_at)?;
        sink.set_volume(self.volume);
        if self.playing {
            sink.play();
        }
        self.sink = Some(sink);
        self.offset = start_at;
        self.ended = false;
        Ok(())
    }
}

/// Open and decode `path` into a paused sink positioned at `start_at`.
fn create_sink_at(
    mixer: &Mixer,
    path: &Path,
    route: &Arc<RouteSlot>,
    start_at: Duration,
) -> Result<(Sink, Option<Duration>), TransportError> {
    let file = File::open(path).map_err(|source| TransportError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let decoder = Decoder::new(BufReader::new(file)).map_err(|e| TransportError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let duration = decoder.total_duration();

    // `skip_duration` is the fallback seeking primitive; Duration::ZERO is fine.
    let source = TappedSource::new(decoder.skip_duration(start_at), Arc::clone(route));

    let sink = Sink::connect_new(mixer);
    sink.append(source);
    sink.pause();
    Ok((sink, duration))
}

impl Transport for RodioTransport {
    fn id(&self) -> TransportId {
        self.events.id()
    }

    fn load(&mut self, source: &SourceHandle) {
        self.shutdown();
        self.events.emit(TransportEvent::LoadStart);
        self.path = Some(source.path().to_path_buf());
        self.failed = None;
        self.offset = Duration::ZERO;

        match create_sink_at(&self.mixer, source.path(), &self.route, Duration::ZERO) {
            Ok((sink, duration)) => {
                sink.set_volume(self.volume);
                self.sink = Some(sink);
                self.duration = duration;
                debug!(transport = %self.id(), path = ?source.path(), ?duration, "loaded");
                self.events.emit(TransportEvent::Ready { duration });
            }
            Err(e) => {
                warn!(transport = %self.id(), error = %e, "load failed");
                self.failed = Some(e.to_string());
                self.events.emit(TransportEvent::Error(e.to_string()));
            }
        }
    }

    fn play(&mut self) -> Result<(), PlaybackRejected> {
        if let Some(reason) = &self.failed {
            return Err(PlaybackRejected::Unsupported(reason.clone()));
        }
        if self.sink.is_none() {
            return Err(PlaybackRejected::NotLoaded);
        }
        if self.ended {
            self.rebuild_at(Duration::ZERO)
                .map_err(|e| PlaybackRejected::Unsupported(e.to_string()))?;
        }
        if let Some(sink) = &self.sink {
            sink.play();
        }
        self.playing = true;
        self.last_update = Some(Instant::now());
        self.events.emit(TransportEvent::Playing);
        Ok(())
    }

    fn pause(&mut self) {
        let Some(sink) = &self.sink else {
            return;
        };
        sink.pause();
        self.playing = false;
        self.events.emit(TransportEvent::Paused);
    }

    fn seek(&mut self, position: Duration) {
        let position = match self.duration {
            Some(d) => position.min(d),
            None => position,
        };
        let Some(sink) = &self.sink else {
            return;
        };
        // A drained sink reports success without moving; decode the track
        // again instead.
        if !self.ended && !sink.empty() {
            match sink.try_seek(position) {
                Ok(()) => {
                    self.offset = Duration::ZERO;
                    self.events.emit(TransportEvent::TimeUpdate(position));
                    return;
                }
                Err(e) => {
                    debug!(transport = %self.id(), error = %e, "seek unsupported, rebuilding sink");
                }
            }
        }
        if let Err(e) = self.rebuild_at(position) {
            warn!(transport = %self.id(), error = %e, "seek failed");
            return;
        }
        self.events.emit(TransportEvent::TimeUpdate(position));
    }

    fn set_volume(&mut self, level: f32) {
        self.volume = level.clamp(0.0, 1.0);
        if let Some(sink) = &self.sink {
            sink.set_volume(self.volume);
        }
    }

    fn create_source_node(&mut self) -> Result<SourceNode, GraphError> {
        if self.source_taken {
            return Err(BindingError::SourceTaken(self.id()).into());
        }
        self.source_taken = true;
        Ok(SourceNode::new(self.id(), Arc::clone(&self.route)))
    }

    fn poll(&mut self) {
        if !self.playing {
            return;
        }
        let Some(sink) = &self.sink else {
            return;
        };
        if sink.empty() {
            self.playing = false;
            self.ended = true;
            self.events.emit(TransportEvent::Ended);
            return;
        }
        let due = self
            .last_update
            .is_none_or(|t| t.elapsed() >= TIME_UPDATE_INTERVAL);
        if due {
            self.last_update = Some(Instant::now());
            self.events.emit(TransportEvent::TimeUpdate(self.position()));
        }
    }

    fn shutdown(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.playing = false;
        self.ended = false;
    }
}

impl Drop for RodioTransport {
    fn drop(&mut self) {
        self.shutdown();
    }
}
