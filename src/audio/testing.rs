//! Scripted transport doubles shared by the audio and player tests.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::time::Duration;

use rodio::Source;

use crate::error::{BindingError, GraphError, PlaybackRejected};
use crate::library::SourceHandle;

use super::nodes::{RouteSlot, SourceNode, TappedSource};
use super::transport::{
    EventSink, TaggedEvent, Transport, TransportEvent, TransportFactory, TransportId,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Load(PathBuf),
    Play,
    Pause,
    Seek(Duration),
    Volume(f32),
    Shutdown,
}

/// Shared knobs and call log of every transport a factory created.
#[derive(Debug)]
pub(crate) struct Script {
    pub calls: Vec<(TransportId, Call)>,
    pub sinks: Vec<EventSink>,
    pub reject_play: bool,
    pub fail_load: bool,
    /// Leave `Ready` to the test instead of emitting it from `load`.
    pub defer_ready: bool,
    pub ready_duration: Option<Duration>,
}

pub(crate) type ScriptHandle = Rc<RefCell<Script>>;

pub(crate) fn script() -> ScriptHandle {
    Rc::new(RefCell::new(Script {
        calls: Vec::new(),
        sinks: Vec::new(),
        reject_play: false,
        fail_load: false,
        defer_ready: false,
        ready_duration: Some(Duration::from_secs(180)),
    }))
}

impl Script {
    pub fn current(&self) -> Option<TransportId> {
        self.sinks.last().map(EventSink::id)
    }

    /// Emit `event` as if the most recently created transport fired it.
    pub fn emit(&self, event: TransportEvent) {
        if let Some(sink) = self.sinks.last() {
            sink.emit(event);
        }
    }

    pub fn calls_of(&self, id: TransportId) -> Vec<Call> {
        self.calls
            .iter()
            .filter(|(t, _)| *t == id)
            .map(|(_, c)| c.clone())
            .collect()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls.iter().filter(|(_, c)| c == call).count()
    }
}

pub(crate) struct ScriptedTransport {
    events: EventSink,
    route: Arc<RouteSlot>,
    source_taken: bool,
    loaded: bool,
    script: ScriptHandle,
}

impl ScriptedTransport {
    pub fn new(events: Sender<TaggedEvent>, script: ScriptHandle) -> Self {
        let events = EventSink::new(TransportId::next(), events);
        script.borrow_mut().sinks.push(events.clone());
        Self {
            events,
            route: Arc::new(RouteSlot::default()),
            source_taken: false,
            loaded: false,
            script,
        }
    }

    /// Wrap `source` the way a real transport routes its decoder output.
    pub fn tap<S: Source>(&self, source: S) -> TappedSource<S> {
        TappedSource::new(source, Arc::clone(&self.route))
    }

    fn record(&self, call: Call) {
        self.script.borrow_mut().calls.push((self.events.id(), call));
    }
}

impl Transport for ScriptedTransport {
    fn id(&self) -> TransportId {
        self.events.id()
    }

    fn load(&mut self, source: &SourceHandle) {
        self.record(Call::Load(source.path().to_path_buf()));
        self.events.emit(TransportEvent::LoadStart);
        let (fail, defer, duration) = {
            let s = self.script.borrow();
            (s.fail_load, s.defer_ready, s.ready_duration)
        };
        if fail {
            self.events
                .emit(TransportEvent::Error("unsupported format".to_string()));
            return;
        }
        self.loaded = true;
        if !defer {
            self.events.emit(TransportEvent::Ready { duration });
        }
    }

    fn play(&mut self) -> Result<(), PlaybackRejected> {
        self.record(Call::Play);
        if self.script.borrow().reject_play {
            return Err(PlaybackRejected::Unsupported("no user gesture".to_string()));
        }
        if !self.loaded {
            return Err(PlaybackRejected::NotLoaded);
        }
        self.events.emit(TransportEvent::Playing);
        Ok(())
    }

    fn pause(&mut self) {
        self.record(Call::Pause);
        self.events.emit(TransportEvent::Paused);
    }

    fn seek(&mut self, position: Duration) {
        self.record(Call::Seek(position));
        self.events.emit(TransportEvent::TimeUpdate(position));
    }

    fn set_volume(&mut self, level: f32) {
        self.record(Call::Volume(level));
    }

    fn create_source_node(&mut self) -> Result<SourceNode, GraphError> {
        if self.source_taken {
            return Err(BindingError::SourceTaken(self.id()).into());
        }
        self.source_taken = true;
        Ok(SourceNode::new(self.id(), Arc::clone(&self.route)))
    }

    fn poll(&mut self) {}

    fn shutdown(&mut self) {
        self.record(Call::Shutdown);
    }
}

pub(crate) struct ScriptedFactory {
    script: ScriptHandle,
}

impl ScriptedFactory {
    pub fn new(script: ScriptHandle) -> Self {
        Self { script }
    }
}

impl TransportFactory for ScriptedFactory {
    type Transport = ScriptedTransport;

    fn create(&mut self, events: Sender<TaggedEvent>) -> ScriptedTransport {
        ScriptedTransport::new(events, Rc::clone(&self.script))
    }
}
