use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::{Duration, Instant};

use tracing::{debug, error};

use crate::audio::{
    AudioGraphManager, FrequencySample, FrequencySampler, average_level, band_summary,
};

use super::strategy::{DrawCommand, VisualStrategy};
use super::surface::{Surface, SurfaceSize};

/// Handle of one requested frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FrameId(u64);

impl FrameId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// The host's per-frame callback primitive.
pub trait FrameScheduler {
    /// Ask for one callback on the next frame.
    fn request_frame(&mut self) -> FrameId;
    /// Withdraw a request. Unknown or already delivered ids are ignored.
    fn cancel_frame(&mut self, id: FrameId);
}

/// Frame scheduler for the terminal: one pending frame, due a fixed interval
/// after it was requested. The event loop polls it.
#[derive(Debug)]
pub struct FrameClock {
    interval: Duration,
    next_id: u64,
    pending: Option<(FrameId, Instant)>,
}

impl FrameClock {
    pub fn new(fps: u32) -> Self {
        Self {
            interval: Duration::from_secs(1) / fps.max(1),
            next_id: 1,
            pending: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Deliver the pending frame if it is due.
    pub fn poll(&mut self, now: Instant) -> Option<FrameId> {
        match self.pending {
            Some((id, due)) if due <= now => {
                self.pending = None;
                Some(id)
            }
            _ => None,
        }
    }

    /// How long until the pending frame is due; `None` when nothing is pending.
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.pending
            .map(|(_, due)| due.saturating_duration_since(now))
    }
}

impl FrameScheduler for FrameClock {
    fn request_frame(&mut self) -> FrameId {
        let id = FrameId(self.next_id);
        self.next_id += 1;
        self.pending = Some((id, Instant::now() + self.interval));
        id
    }

    fn cancel_frame(&mut self, id: FrameId) {
        if self.pending.is_some_and(|(p, _)| p == id) {
            self.pending = None;
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum LoopState {
    Idle,
    Running { pending: FrameId },
}

/// Cooperative per-frame redraw: sample, draw, reschedule.
#[derive(Debug)]
pub struct RenderLoop {
    state: LoopState,
    strategy: VisualStrategy,
    glitches: u64,
}

impl RenderLoop {
    pub fn new(strategy: VisualStrategy) -> Self {
        Self {
            state: LoopState::Idle,
            strategy,
            glitches: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, LoopState::Running { .. })
    }

    pub fn strategy(&self) -> VisualStrategy {
        self.strategy
    }

    pub fn set_strategy(&mut self, strategy: VisualStrategy) {
        self.strategy = strategy;
    }

    /// Draw calls that panicked so far.
    pub fn glitches(&self) -> u64 {
        self.glitches
    }

    /// Idle -> running. No-op when already running.
    pub fn start<S: FrameScheduler + ?Sized>(&mut self, scheduler: &mut S) {
        if self.is_running() {
            return;
        }
        let pending = scheduler.request_frame();
        self.state = LoopState::Running { pending };
        debug!(strategy = %self.strategy, "render loop started");
    }

    /// Running -> idle, cancelling the pending frame before returning.
    /// No-op when already idle.
    pub fn stop<S: FrameScheduler + ?Sized>(&mut self, scheduler: &mut S) {
        if let LoopState::Running { pending } = self.state {
            scheduler.cancel_frame(pending);
            self.state = LoopState::Idle;
            debug!("render loop stopped");
        }
    }

    /// Handle a delivered frame. Returns whether a frame was drawn.
    pub fn tick<S: FrameScheduler + ?Sized>(
        &mut self,
        frame: FrameId,
        sampler: &mut FrequencySampler,
        graph: &AudioGraphManager,
        surface: &mut Surface,
        scheduler: &mut S,
    ) -> bool {
        self.tick_with(frame, sampler, graph, surface, scheduler, |strategy, sample, size| {
            strategy.draw(sample, size)
        })
    }

    pub(crate) fn tick_with<S, D>(
        &mut self,
        frame: FrameId,
        sampler: &mut FrequencySampler,
        graph: &AudioGraphManager,
        surface: &mut Surface,
        scheduler: &mut S,
        draw: D,
    ) -> bool
    where
        S: FrameScheduler + ?Sized,
        D: FnOnce(VisualStrategy, &FrequencySample, SurfaceSize) -> Vec<DrawCommand>,
    {
        match self.state {
            LoopState::Running { pending } if pending == frame => {}
            _ => return false,
        }

        let Some(size) = surface.size() else {
            self.state = LoopState::Idle;
            debug!("surface detached, render loop stopped");
            return false;
        };

        let sample = sampler.sample(graph);
        let strategy = self.strategy;
        let drawn = catch_unwind(AssertUnwindSafe(|| draw(strategy, sample, size)));
        let ok = match drawn {
            Ok(commands) => {
                surface.present(commands, band_summary(sample), average_level(sample));
                true
            }
            Err(_) => {
                self.glitches += 1;
                error!(strategy = %strategy, "visualization draw panicked, frame skipped");
                false
            }
        };

        self.state = LoopState::Running {
            pending: scheduler.request_frame(),
        };
        ok
    }
}
