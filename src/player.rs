//! Player: coordinates the session, the transport, the audio graph, the
//! render loop and playlist traversal.
//!
//! Everything runs on the caller's thread. Transport events and traversal
//! intents arrive over channels and are applied by `pump`, which the runtime
//! calls once per loop iteration.

use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::audio::{
    AudioGraphManager, FrequencySampler, GraphStatus, TaggedEvent, Transport, TransportEvent,
    TransportFactory, TransportState,
};
use crate::config::Settings;
use crate::library::{Playlist, Track, TrackId};
use crate::playback::{
    AdvanceReason, Decision, PlaybackSession, RepeatMode, SessionSnapshot, TrackIntent, Traversal,
};
use crate::visual::{FrameId, FrameScheduler, RenderLoop, Surface, VisualStrategy};

pub struct Player<F: TransportFactory, S: FrameScheduler> {
    playlist: Playlist,
    session: PlaybackSession,
    factory: F,
    transport: Option<F::Transport>,
    events_tx: Sender<TaggedEvent>,
    events_rx: Receiver<TaggedEvent>,
    graph: AudioGraphManager,
    sampler: FrequencySampler,
    render: RenderLoop,
    surface: Surface,
    scheduler: S,
    traversal: Traversal,
    intents_tx: Sender<TrackIntent>,
    intents_rx: Receiver<TrackIntent>,
    /// Start playing as soon as the transport reports `Ready`.
    autoplay_pending: bool,
    /// Position to apply once the transport reports `Ready`.
    pending_seek: Option<Duration>,
    notice: Option<String>,
}

impl<F: TransportFactory, S: FrameScheduler> Player<F, S> {
    pub fn new(settings: &Settings, playlist: Playlist, factory: F, scheduler: S) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        let (intents_tx, intents_rx) = mpsc::channel();
        let graph = AudioGraphManager::new(&settings.analyser);
        let sampler = FrequencySampler::new(graph.config());
        let strategy = VisualStrategy::from_name(&settings.visual.strategy).unwrap_or_else(|| {
            warn!(name = %settings.visual.strategy, "unknown visualization, using bars");
            VisualStrategy::Bars
        });

        let mut traversal = Traversal::new();
        traversal.set_sink(intents_tx.clone());

        let mut player = Self {
            playlist,
            session: PlaybackSession::new(&settings.playback),
            factory,
            transport: None,
            events_tx,
            events_rx,
            graph,
            sampler,
            render: RenderLoop::new(strategy),
            surface: Surface::default(),
            scheduler,
            traversal,
            intents_tx,
            intents_rx,
            autoplay_pending: false,
            pending_seek: None,
            notice: None,
        };
        player.apply_volume();
        player
    }

    /// Replace the traversal machine (e.g. with a seeded one) and wire it to
    /// this player's intent channel.
    #[cfg(test)]
    pub(crate) fn set_traversal(&mut self, mut traversal: Traversal) {
        traversal.set_sink(self.intents_tx.clone());
        self.traversal = traversal;
    }

    // ---- user intents -------------------------------------------------

    /// An explicit user action happened; audio output may start from now on.
    pub fn user_gesture(&mut self) {
        self.graph.unlock();
        self.sync_render();
    }

    /// Select `id` and start it. Returns false when the playlist lacks it.
    pub fn play_track(&mut self, id: &TrackId) -> bool {
        self.user_gesture();
        if !self.playlist.contains(id) {
            warn!(track = %id, "cannot play unknown track");
            return false;
        }
        self.change_track(id.clone(), true);
        true
    }

    pub fn play(&mut self) {
        self.user_gesture();

        if self.transport.is_none() {
            let target = self
                .session
                .current
                .clone()
                .filter(|id| self.playlist.contains(id))
                .or_else(|| self.playlist.get(0).map(|t| t.id.clone()));
            let Some(id) = target else {
                debug!("play requested with an empty playlist");
                return;
            };
            let resume_at = if self.session.current.as_ref() == Some(&id) {
                self.session.elapsed()
            } else {
                Duration::ZERO
            };
            self.change_track(id, true);
            if !resume_at.is_zero() {
                self.pending_seek = Some(resume_at);
            }
            return;
        }

        match self.session.status {
            TransportState::Playing => {}
            TransportState::Loading | TransportState::Empty => self.autoplay_pending = true,
            TransportState::Ready | TransportState::Paused | TransportState::Ended => {
                self.start_playback();
            }
            TransportState::Errored => {
                self.notice = Some("current track cannot be played".to_string());
            }
        }
    }

    /// Pause output. The render loop is cancelled before this returns.
    pub fn pause(&mut self) {
        self.autoplay_pending = false;
        self.render.stop(&mut self.scheduler);
        let Some(transport) = self.transport.as_mut() else {
            return;
        };
        transport.pause();
        if self.session.status.is_playing() {
            self.session.status = TransportState::Paused;
        }
    }

    pub fn toggle_play(&mut self) {
        if self.session.is_playing() || self.autoplay_pending {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Pause and rewind to the start of the current track.
    pub fn stop(&mut self) {
        self.pause();
        if let Some(transport) = self.transport.as_mut() {
            if self.session.status.is_loaded() {
                transport.seek(Duration::ZERO);
            }
        }
        self.session.set_elapsed(Duration::ZERO);
    }

    pub fn next(&mut self) -> Decision {
        self.user_gesture();
        self.advance(AdvanceReason::UserSkipNext)
    }

    pub fn previous(&mut self) -> Decision {
        self.user_gesture();
        self.advance(AdvanceReason::UserSkipPrevious)
    }

    fn advance(&mut self, reason: AdvanceReason) -> Decision {
        let decision = self
            .traversal
            .advance(reason, &self.session, &self.playlist);
        self.drain();
        decision
    }

    /// Seek the current track; clamped into `[0, duration]` once known.
    pub fn seek(&mut self, position: Duration) {
        let Some(transport) = self.transport.as_mut() else {
            return;
        };
        let position = self.session.clamp_position(position);
        match self.session.status {
            s if s.is_loaded() => {
                transport.seek(position);
                self.session.set_elapsed(position);
            }
            TransportState::Loading => self.pending_seek = Some(position),
            _ => {}
        }
    }

    pub fn seek_by(&mut self, seconds: i64) {
        self.seek_by_micros(seconds.saturating_mul(1_000_000));
    }

    /// Relative seek in microseconds, the MPRIS `Seek` unit.
    pub fn seek_by_micros(&mut self, micros: i64) {
        let elapsed = self.session.elapsed();
        let delta = Duration::from_micros(micros.unsigned_abs());
        let target = if micros < 0 {
            elapsed.saturating_sub(delta)
        } else {
            elapsed.saturating_add(delta)
        };
        self.seek(target);
    }

    pub fn set_volume(&mut self, level: f32) -> f32 {
        let stored = self.session.set_volume(level);
        self.apply_volume();
        stored
    }

    pub fn adjust_volume(&mut self, delta: f32) -> f32 {
        self.set_volume(self.session.volume() + delta)
    }

    pub fn toggle_mute(&mut self) -> bool {
        let muted = self.session.toggle_mute();
        self.apply_volume();
        muted
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        self.session.shuffle = !self.session.shuffle;
        self.session.shuffle
    }

    pub fn set_repeat(&mut self, mode: RepeatMode) {
        self.session.repeat = mode;
    }

    pub fn cycle_repeat(&mut self) -> RepeatMode {
        let next = self.session.repeat.next();
        self.set_repeat(next);
        next
    }

    /// Flip the favorite flag of the current track.
    pub fn toggle_favorite(&mut self) -> Option<bool> {
        let id = self.session.current.clone()?;
        let track = self.playlist.track_mut(&id)?;
        track.favorite = !track.favorite;
        Some(track.favorite)
    }

    // ---- visualization surface ----------------------------------------

    pub fn attach_surface(&mut self, width: f64, height: f64) {
        self.surface.attach(width, height);
        self.sync_render();
    }

    pub fn resize_surface(&mut self, width: f64, height: f64) {
        self.surface.resize(width, height);
    }

    pub fn detach_surface(&mut self) {
        self.render.stop(&mut self.scheduler);
        self.surface.detach();
    }

    /// Select a visualization by name. Unknown names are ignored.
    pub fn set_strategy(&mut self, name: &str) -> bool {
        match VisualStrategy::from_name(name) {
            Some(strategy) => {
                self.render.set_strategy(strategy);
                true
            }
            None => false,
        }
    }

    pub fn cycle_strategy(&mut self) -> VisualStrategy {
        let next = self.render.strategy().next();
        self.render.set_strategy(next);
        next
    }

    /// Handle a frame delivered by the scheduler.
    pub fn on_frame(&mut self, frame: FrameId) -> bool {
        self.render.tick(
            frame,
            &mut self.sampler,
            &self.graph,
            &mut self.surface,
            &mut self.scheduler,
        )
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    // ---- event pump ---------------------------------------------------

    /// Poll the transport and apply every pending event and intent.
    pub fn pump(&mut self) {
        if let Some(transport) = self.transport.as_mut() {
            transport.poll();
        }
        self.drain();
    }

    fn drain(&mut self) {
        loop {
            let mut progressed = false;
            while let Ok(tagged) = self.events_rx.try_recv() {
                progressed = true;
                self.handle_event(tagged);
            }
            while let Ok(intent) = self.intents_rx.try_recv() {
                progressed = true;
                self.apply_intent(intent);
            }
            if !progressed {
                break;
            }
        }
        self.sync_render();
    }

    fn handle_event(&mut self, tagged: TaggedEvent) {
        let current = self.transport.as_ref().map(|t| t.id());
        if current != Some(tagged.transport) {
            debug!(transport = %tagged.transport, event = ?tagged.event, "dropping stale transport event");
            return;
        }

        match self.session.status.on(&tagged.event) {
            Ok(next) => self.session.status = next,
            Err(e) => {
                warn!(error = %e, "ignoring transport event");
                return;
            }
        }

        match tagged.event {
            TransportEvent::LoadStart | TransportEvent::Paused => {}
            TransportEvent::Ready { duration } => self.on_ready(duration),
            TransportEvent::Playing => self.notice = None,
            TransportEvent::TimeUpdate(position) => {
                self.session.set_elapsed(position);
            }
            TransportEvent::Ended => {
                if let Some(d) = self.session.duration() {
                    self.session.set_elapsed(d);
                }
                self.traversal
                    .advance(AdvanceReason::TrackEnded, &self.session, &self.playlist);
            }
            TransportEvent::Error(reason) => {
                self.autoplay_pending = false;
                self.pending_seek = None;
                warn!(transport = %tagged.transport, %reason, "transport error");
                self.notice = Some(format!("cannot play: {reason}"));
            }
        }
    }

    fn on_ready(&mut self, duration: Option<Duration>) {
        if let Some(d) = duration.filter(|d| !d.is_zero()) {
            self.session.set_duration(d);
            if let Some(track) = self
                .session
                .current
                .as_ref()
                .and_then(|id| self.playlist.track_mut(id))
            {
                if track.duration.is_zero() {
                    track.duration = d;
                }
            }
        }
        if let Some(position) = self.pending_seek.take() {
            let position = self.session.clamp_position(position);
            if let Some(transport) = self.transport.as_mut() {
                transport.seek(position);
            }
            self.session.set_elapsed(position);
        }
        if std::mem::take(&mut self.autoplay_pending) {
            self.start_playback();
        }
    }

    fn apply_intent(&mut self, intent: TrackIntent) {
        match intent {
            TrackIntent::Change { track, autoplay } => self.change_track(track, autoplay),
            TrackIntent::Restart => {
                if let Some(transport) = self.transport.as_mut() {
                    transport.seek(Duration::ZERO);
                }
                self.session.set_elapsed(Duration::ZERO);
                self.start_playback();
            }
            TrackIntent::Stop => {
                info!("end of playlist");
                self.autoplay_pending = false;
                self.render.stop(&mut self.scheduler);
            }
        }
    }

    /// Ask the transport to start. A rejection leaves the session paused and
    /// is surfaced as a notice.
    fn start_playback(&mut self) {
        let Some(transport) = self.transport.as_mut() else {
            return;
        };
        if let Err(e) = transport.play() {
            warn!(error = %e, "playback rejected");
            self.notice = Some(e.to_string());
        }
    }

    /// Tear down the current transport and graph binding, then build both for
    /// `id`. The old source is disconnected before the new one is created.
    fn change_track(&mut self, id: TrackId, autoplay: bool) {
        let Some(track) = self.playlist.track(&id) else {
            warn!(track = %id, "track vanished from playlist");
            return;
        };
        let source = track.source.clone();
        let known_duration = track.duration;

        self.render.stop(&mut self.scheduler);
        if let Some(mut old) = self.transport.take() {
            old.shutdown();
        }
        self.graph.detach_source();

        self.session.current = Some(id.clone());
        self.session.status = TransportState::Empty;
        self.session.reset_position();
        if !known_duration.is_zero() {
            self.session.set_duration(known_duration);
        }
        self.autoplay_pending = autoplay;
        self.pending_seek = None;
        self.notice = None;

        let mut transport = self.factory.create(self.events_tx.clone());
        if let Err(e) = self.graph.ensure_graph(&mut transport) {
            warn!(error = %e, "playing without visualization");
        }
        route_volume(&mut self.graph, &mut transport, self.session.effective_volume());
        transport.load(&source);
        info!(track = %id, transport = %transport.id(), "track selected");
        self.transport = Some(transport);
    }

    fn apply_volume(&mut self) {
        let level = self.session.effective_volume();
        match self.transport.as_mut() {
            Some(transport) => route_volume(&mut self.graph, transport, level),
            None => {
                self.graph.set_volume(level);
            }
        }
    }

    /// Run the render loop exactly while playing with a ready graph and an
    /// attached surface.
    fn sync_render(&mut self) {
        if self.session.is_playing() && self.graph.is_ready() && self.surface.is_attached() {
            self.render.start(&mut self.scheduler);
        } else {
            self.render.stop(&mut self.scheduler);
        }
    }

    // ---- persistence and teardown -------------------------------------

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    /// Apply a saved session. Never starts playback; the next `play` resumes
    /// the restored track at the restored position.
    pub fn restore(&mut self, snapshot: &SessionSnapshot) {
        self.session.set_volume(snapshot.volume);
        self.session.shuffle = snapshot.shuffle;
        self.session.repeat = snapshot.repeat_mode;

        if let Some(track) = snapshot
            .current_track_id
            .as_ref()
            .and_then(|id| self.playlist.track(id))
        {
            self.session.current = Some(track.id.clone());
            self.session.reset_position();
            if !track.duration.is_zero() {
                self.session.set_duration(track.duration);
            }
            self.session.set_elapsed(snapshot.elapsed());
        }
        self.apply_volume();
        info!(current = ?self.session.current, "session restored");
    }

    /// Stop everything and release the graph.
    pub fn dispose(&mut self) {
        self.render.stop(&mut self.scheduler);
        if let Some(mut transport) = self.transport.take() {
            transport.shutdown();
        }
        self.graph.close();
        self.traversal.clear_sink();
        self.session.status = TransportState::Empty;
    }

    // ---- read access for the presentation layer -----------------------

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.session
            .current
            .as_ref()
            .and_then(|id| self.playlist.track(id))
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn graph(&self) -> &AudioGraphManager {
        &self.graph
    }

    pub fn graph_status(&self) -> GraphStatus {
        self.graph.status()
    }

    pub fn strategy(&self) -> VisualStrategy {
        self.render.strategy()
    }

    #[cfg(test)]
    pub(crate) fn is_rendering(&self) -> bool {
        self.render.is_running()
    }

    /// Last user-visible problem (rejected playback, load error).
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }
}

/// The gain node carries the level while the graph holds the transport's
/// source; otherwise the transport's own volume does.
fn route_volume<T: Transport + ?Sized>(graph: &mut AudioGraphManager, transport: &mut T, level: f32) {
    graph.set_volume(level);
    if graph.bound_transport() == Some(transport.id()) {
        transport.set_volume(1.0);
    } else {
        transport.set_volume(level);
    }
}
