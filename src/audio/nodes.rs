//! Processing nodes of the audio graph.
//!
//! Decoded samples flow `source -> gain -> analyser -> output`. The source
//! side is a [`TappedSource`] wrapped around the transport's decoder; it runs
//! on rodio's mixer thread and reaches the gain and analyser nodes through a
//! [`RouteSlot`] that the graph manager fills and clears.

use std::f32::consts::PI;
use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use realfft::{RealFftPlanner, RealToComplex, num_complex::Complex32};
use rodio::source::SeekError;
use rodio::{ChannelCount, Sample, SampleRate, Source};
use tracing::warn;

use crate::config::AnalyserSettings;
use crate::error::{BindingError, GraphError};

use super::transport::TransportId;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Samples processed between two route refreshes / analyser flushes.
const TAP_BLOCK: usize = 256;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ContextState {
    Suspended,
    Running,
    Closed,
}

impl ContextState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Closed,
            _ => Self::Suspended,
        }
    }
}

/// Execution context of one graph: run state plus a sample clock.
#[derive(Debug)]
pub struct GraphContext {
    id: u64,
    state: AtomicU8,
    sample_rate: AtomicU32,
    frames: AtomicU64,
}

impl GraphContext {
    pub(crate) fn new(start_suspended: bool) -> Self {
        let state = if start_suspended {
            ContextState::Suspended
        } else {
            ContextState::Running
        };
        Self {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            state: AtomicU8::new(state as u8),
            sample_rate: AtomicU32::new(44_100),
            frames: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> ContextState {
        ContextState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.state() == ContextState::Running
    }

    /// Returns false when the context is already closed.
    pub(crate) fn resume(&self) -> bool {
        self.state
            .compare_exchange(
                ContextState::Suspended as u8,
                ContextState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
            || self.is_running()
    }

    pub(crate) fn close(&self) {
        self.state
            .store(ContextState::Closed as u8, Ordering::Release);
    }

    /// Time of the last processed frame on the context clock.
    pub fn current_time(&self) -> Duration {
        let rate = u64::from(self.sample_rate.load(Ordering::Relaxed).max(1));
        let frames = self.frames.load(Ordering::Relaxed);
        Duration::from_secs(frames / rate)
            + Duration::from_nanos((frames % rate) * 1_000_000_000 / rate)
    }

    fn advance(&self, frames: u64, sample_rate: u32) {
        self.sample_rate.store(sample_rate, Ordering::Relaxed);
        self.frames.fetch_add(frames, Ordering::Relaxed);
    }
}

/// Output gain with a per-sample exponential approach to its target.
#[derive(Debug)]
pub struct GainNode {
    target: AtomicU32,
    time_constant: Duration,
}

impl GainNode {
    pub(crate) fn new(initial: f32, time_constant: Duration) -> Self {
        Self {
            target: AtomicU32::new(initial.clamp(0.0, 1.0).to_bits()),
            time_constant,
        }
    }

    /// Schedule `value` as the new target; the ramp starts with the next block
    /// processed on the context clock.
    pub fn set_target(&self, value: f32) {
        self.target
            .store(value.clamp(0.0, 1.0).to_bits(), Ordering::Release);
    }

    pub fn target(&self) -> f32 {
        f32::from_bits(self.target.load(Ordering::Acquire))
    }

    /// Fraction of the remaining distance covered per sample.
    fn ramp_coefficient(&self, sample_rate: u32) -> f32 {
        let tau = self.time_constant.as_secs_f32();
        if tau <= 0.0 || sample_rate == 0 {
            return 1.0;
        }
        1.0 - (-1.0 / (tau * sample_rate as f32)).exp()
    }
}

/// Sampling parameters of the analyser, fixed at graph construction.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AnalyserConfig {
    pub fft_size: usize,
    pub smoothing: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
}

impl AnalyserConfig {
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    pub fn validate(&self) -> Result<(), GraphError> {
        if !self.fft_size.is_power_of_two() || !(32..=32768).contains(&self.fft_size) {
            return Err(GraphError::Construction(format!(
                "fft size {} is not a power of two in 32..=32768",
                self.fft_size
            )));
        }
        if !(0.0..=1.0).contains(&self.smoothing) {
            return Err(GraphError::Construction(format!(
                "smoothing {} outside [0, 1]",
                self.smoothing
            )));
        }
        if self.min_decibels >= self.max_decibels {
            return Err(GraphError::Construction(
                "min_decibels must be below max_decibels".to_string(),
            ));
        }
        Ok(())
    }
}

impl From<&AnalyserSettings> for AnalyserConfig {
    fn from(s: &AnalyserSettings) -> Self {
        Self {
            fft_size: s.fft_size,
            smoothing: s.smoothing,
            min_decibels: s.min_decibels,
            max_decibels: s.max_decibels,
        }
    }
}

struct AnalyserState {
    ring: Vec<f32>,
    write: usize,
    window: Vec<f32>,
    plan: Arc<dyn RealToComplex<f32>>,
    input: Vec<f32>,
    spectrum: Vec<Complex32>,
    scratch: Vec<Complex32>,
    smoothed: Vec<f32>,
}

/// Keeps the last `fft_size` mono samples and turns them into byte spectra
/// and waveforms without altering the signal.
pub struct AnalyserNode {
    config: AnalyserConfig,
    state: Mutex<AnalyserState>,
}

impl AnalyserNode {
    pub fn new(config: AnalyserConfig) -> Result<Self, GraphError> {
        config.validate()?;
        let n = config.fft_size;
        let plan = RealFftPlanner::<f32>::new().plan_fft_forward(n);
        let state = AnalyserState {
            ring: vec![0.0; n],
            write: 0,
            window: blackman_window(n),
            input: plan.make_input_vec(),
            spectrum: plan.make_output_vec(),
            scratch: plan.make_scratch_vec(),
            smoothed: vec![0.0; config.bin_count()],
            plan,
        };
        Ok(Self {
            config,
            state: Mutex::new(state),
        })
    }

    #[cfg(test)]
    pub(crate) fn config(&self) -> &AnalyserConfig {
        &self.config
    }

    pub(crate) fn push(&self, block: &[f32]) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        let n = state.ring.len();
        for &s in block {
            let w = state.write;
            state.ring[w] = s;
            state.write = (w + 1) % n;
        }
    }

    /// Fill `out` with smoothed magnitudes mapped linearly from
    /// `[min_decibels, max_decibels]` onto `[0, 255]`. Slots past the bin
    /// count are zeroed.
    pub fn byte_frequency_data(&self, out: &mut [u8]) {
        let Ok(mut guard) = self.state.lock() else {
            out.fill(0);
            return;
        };
        let st = &mut *guard;
        let n = self.config.fft_size;

        for i in 0..n {
            let s = st.ring[(st.write + i) % n];
            st.input[i] = s * st.window[i];
        }
        if let Err(e) = st
            .plan
            .process_with_scratch(&mut st.input, &mut st.spectrum, &mut st.scratch)
        {
            warn!(error = %e, "analyser fft failed");
            out.fill(0);
            return;
        }

        let tau = self.config.smoothing;
        let min = self.config.min_decibels;
        let range = self.config.max_decibels - min;
        let scale = 1.0 / n as f32;

        for (k, slot) in out.iter_mut().enumerate() {
            if k >= st.smoothed.len() {
                *slot = 0;
                continue;
            }
            let magnitude = st.spectrum[k].norm() * scale;
            let mut smoothed = tau * st.smoothed[k] + (1.0 - tau) * magnitude;
            if !smoothed.is_finite() {
                smoothed = 0.0;
            }
            st.smoothed[k] = smoothed;

            let db = if smoothed > 0.0 {
                20.0 * smoothed.log10()
            } else {
                f32::NEG_INFINITY
            };
            *slot = ((db - min) / range * 255.0).clamp(0.0, 255.0) as u8;
        }
    }

    /// Fill `out` with the most recent samples as bytes centred on 128.
    pub fn byte_time_domain_data(&self, out: &mut [u8]) {
        let Ok(state) = self.state.lock() else {
            out.fill(128);
            return;
        };
        let n = state.ring.len();
        let len = out.len().min(n);
        let start = state.write + n - len;
        for (i, slot) in out.iter_mut().enumerate() {
            if i >= len {
                *slot = 128;
                continue;
            }
            let s = state.ring[(start + i) % n];
            *slot = (128.0 * (1.0 + s)).clamp(0.0, 255.0) as u8;
        }
    }
}

impl fmt::Debug for AnalyserNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyserNode")
            .field("config", &self.config)
            .finish()
    }
}

fn blackman_window(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| {
            let x = i as f32 / n as f32;
            0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
        })
        .collect()
}

/// Downstream chain a source node feeds.
#[derive(Debug, Clone)]
pub(crate) struct Route {
    pub context: Arc<GraphContext>,
    pub gain: Arc<GainNode>,
    pub analyser: Arc<AnalyserNode>,
}

/// Connection point shared between a transport's sample stream and the graph.
#[derive(Debug, Default)]
pub(crate) struct RouteSlot {
    route: Mutex<Option<Route>>,
    /// Context id the source was first connected to; 0 while never connected.
    owner: AtomicU64,
}

impl RouteSlot {
    fn current(&self) -> Option<Route> {
        self.route.lock().ok().and_then(|r| r.clone())
    }
}

/// The graph-side handle of one transport's sample stream.
#[derive(Debug)]
pub struct SourceNode {
    transport: TransportId,
    slot: Arc<RouteSlot>,
}

impl SourceNode {
    pub(crate) fn new(transport: TransportId, slot: Arc<RouteSlot>) -> Self {
        Self { transport, slot }
    }

    pub fn transport(&self) -> TransportId {
        self.transport
    }

    /// Connect into `route`. A source node belongs to the first graph it is
    /// connected to for its whole lifetime.
    pub(crate) fn connect(&self, route: Route) -> Result<(), GraphError> {
        let ctx = route.context.id();
        match self
            .slot
            .owner
            .compare_exchange(0, ctx, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {}
            Err(owner) if owner == ctx => {}
            Err(_) => return Err(BindingError::ForeignGraph(self.transport).into()),
        }
        let mut slot = self
            .slot
            .route
            .lock()
            .map_err(|_| GraphError::Binding(BindingError::ForeignGraph(self.transport)))?;
        *slot = Some(route);
        Ok(())
    }

    /// Returns whether the node was connected.
    pub(crate) fn disconnect(&self) -> bool {
        match self.slot.route.lock() {
            Ok(mut slot) => slot.take().is_some(),
            Err(_) => false,
        }
    }
}

/// Rodio source adapter: applies the graph gain and feeds the analyser.
///
/// While no route is connected samples pass through untouched, so playback
/// never depends on the graph.
pub struct TappedSource<S> {
    inner: S,
    slot: Arc<RouteSlot>,
    route: Option<Route>,
    gain: f32,
    target: f32,
    coeff: f32,
    channels: usize,
    sample_rate: u32,
    frame_sum: f32,
    frame_fill: usize,
    mono: Vec<f32>,
    until_refresh: usize,
}

impl<S: Source> TappedSource<S> {
    pub(crate) fn new(inner: S, slot: Arc<RouteSlot>) -> Self {
        let mut tapped = Self {
            inner,
            slot,
            route: None,
            gain: 1.0,
            target: 1.0,
            coeff: 1.0,
            channels: 1,
            sample_rate: 44_100,
            frame_sum: 0.0,
            frame_fill: 0,
            mono: Vec::with_capacity(TAP_BLOCK),
            until_refresh: 0,
        };
        tapped.refresh();
        tapped
    }

    fn refresh(&mut self) {
        if let Some(route) = &self.route {
            if route.context.is_running() && !self.mono.is_empty() {
                route.analyser.push(&self.mono);
                route
                    .context
                    .advance(self.mono.len() as u64, self.sample_rate);
            }
        }
        self.mono.clear();

        self.channels = usize::from(u16::from(self.inner.channels())).max(1);
        self.sample_rate = u32::from(self.inner.sample_rate());

        let was_routed = self.route.is_some();
        self.route = self.slot.current();
        match &self.route {
            Some(route) => {
                self.target = route.gain.target();
                self.coeff = route.gain.ramp_coefficient(self.sample_rate);
                if !was_routed {
                    self.gain = self.target;
                }
            }
            None => {
                self.gain = 1.0;
                self.target = 1.0;
            }
        }
        self.until_refresh = TAP_BLOCK;
    }
}

impl<S: Source> Iterator for TappedSource<S> {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        if self.until_refresh == 0 {
            self.refresh();
        }
        self.until_refresh -= 1;

        let sample = self.inner.next()?;
        if self.route.is_none() {
            return Some(sample);
        }

        self.gain += (self.target - self.gain) * self.coeff;
        let out = sample * self.gain;

        self.frame_sum += out;
        self.frame_fill += 1;
        if self.frame_fill >= self.channels {
            self.mono.push(self.frame_sum / self.channels as f32);
            self.frame_sum = 0.0;
            self.frame_fill = 0;
        }
        Some(out)
    }
}

impl<S: Source> Source for TappedSource<S> {
    fn current_span_len(&self) -> Option<usize> {
        self.inner.current_span_len()
    }

    fn channels(&self) -> ChannelCount {
        self.inner.channels()
    }

    fn sample_rate(&self) -> SampleRate {
        self.inner.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        self.inner.total_duration()
    }

    fn try_seek(&mut self, pos: Duration) -> Result<(), SeekError> {
        self.frame_sum = 0.0;
        self.frame_fill = 0;
        self.inner.try_seek(pos)
    }
}
