use std::time::{Duration, Instant};

use crate::audio::{AudioGraphManager, FrequencySample, FrequencySampler};
use crate::config::AnalyserSettings;

use super::testing::ManualScheduler;
use super::*;

fn fixture() -> (AudioGraphManager, FrequencySampler, Surface, ManualScheduler) {
    let graph = AudioGraphManager::new(&AnalyserSettings::default());
    let sampler = FrequencySampler::new(graph.config());
    let mut surface = Surface::default();
    surface.attach(64.0, 32.0);
    (graph, sampler, surface, ManualScheduler::default())
}

fn ramp_sample(bins: usize) -> FrequencySample {
    FrequencySample {
        bins: (0..bins).map(|i| (i * 255 / bins.max(1)) as u8).collect(),
        waveform: (0..bins * 2).map(|i| if i % 2 == 0 { 0 } else { 255 }).collect(),
    }
}

#[test]
fn strategy_names_round_trip() {
    for s in VisualStrategy::ALL {
        assert_eq!(VisualStrategy::from_name(s.name()), Some(s));
    }
    assert_eq!(
        VisualStrategy::from_name(" Oscilloscope "),
        Some(VisualStrategy::Wave)
    );
    assert_eq!(VisualStrategy::from_name("plasma"), None);
}

#[test]
fn strategy_next_cycles_through_all() {
    let mut s = VisualStrategy::Bars;
    let mut seen = Vec::new();
    for _ in 0..3 {
        seen.push(s);
        s = s.next();
    }
    assert_eq!(s, VisualStrategy::Bars);
    assert_eq!(seen, VisualStrategy::ALL.to_vec());
}

#[test]
fn bars_span_the_surface_and_scale_with_level() {
    let sample = ramp_sample(256);
    let cmds = VisualStrategy::Bars.draw(&sample, SurfaceSize::new(64.0, 32.0));
    assert_eq!(cmds.len(), 32);

    let mut right_edge: f64 = 0.0;
    for cmd in &cmds {
        let DrawCommand::Bar {
            x,
            width,
            height,
            level,
        } = *cmd
        else {
            panic!("bars strategy produced {cmd:?}");
        };
        assert!(height <= 32.0);
        assert!((height - f64::from(level) / 255.0 * 32.0).abs() < 1e-9);
        right_edge = right_edge.max(x + width);
    }
    assert!((right_edge - 64.0).abs() < 1e-9);
    assert!(cmds.first().unwrap().level() < cmds.last().unwrap().level());
}

#[test]
fn wave_stays_inside_the_surface() {
    let sample = ramp_sample(256);
    let size = SurfaceSize::new(100.0, 40.0);
    let cmds = VisualStrategy::Wave.draw(&sample, size);
    assert_eq!(cmds.len(), 99);
    for cmd in cmds {
        let DrawCommand::Segment { x1, y1, x2, y2, .. } = cmd else {
            panic!("wave strategy produced {cmd:?}");
        };
        for (x, y) in [(x1, y1), (x2, y2)] {
            assert!((0.0..=100.0).contains(&x));
            assert!((0.0..=40.0).contains(&y));
        }
    }
}

#[test]
fn circular_spokes_start_on_the_inner_ring() {
    let sample = ramp_sample(192);
    let size = SurfaceSize::new(80.0, 80.0);
    let cmds = VisualStrategy::Circular.draw(&sample, size);
    assert_eq!(cmds.len(), 96);
    for cmd in cmds {
        let DrawCommand::Segment { x1, y1, x2, y2, .. } = cmd else {
            panic!("circular strategy produced {cmd:?}");
        };
        let r1 = ((x1 - 40.0).powi(2) + (y1 - 40.0).powi(2)).sqrt();
        let r2 = ((x2 - 40.0).powi(2) + (y2 - 40.0).powi(2)).sqrt();
        assert!((r1 - 16.0).abs() < 1e-9);
        assert!(r2 >= r1 - 1e-9 && r2 <= 40.0 + 1e-9);
    }
}

#[test]
fn empty_surface_or_sample_draws_nothing() {
    let sample = ramp_sample(64);
    for s in VisualStrategy::ALL {
        assert!(s.draw(&sample, SurfaceSize::new(0.0, 10.0)).is_empty());
        assert!(
            s.draw(&FrequencySample::silent(0, 0), SurfaceSize::new(10.0, 10.0))
                .is_empty()
        );
    }
}

#[test]
fn start_and_stop_are_idempotent() {
    let mut sched = ManualScheduler::default();
    let mut render = RenderLoop::new(VisualStrategy::Bars);

    render.stop(&mut sched);
    assert!(sched.cancelled.is_empty());

    render.start(&mut sched);
    render.start(&mut sched);
    assert!(render.is_running());
    assert_eq!(sched.requested, 1);

    render.stop(&mut sched);
    render.stop(&mut sched);
    assert!(!render.is_running());
    assert_eq!(sched.cancelled.len(), 1);
    assert!(sched.pending.is_empty());
}

#[test]
fn tick_draws_and_reschedules() {
    let (graph, mut sampler, mut surface, mut sched) = fixture();
    let mut render = RenderLoop::new(VisualStrategy::Bars);
    render.start(&mut sched);

    for expected in 1..=3 {
        let frame = sched.deliver().unwrap();
        assert!(render.tick(frame, &mut sampler, &graph, &mut surface, &mut sched));
        assert_eq!(surface.frames(), expected);
        assert_eq!(sched.pending.len(), 1);
    }
    // No graph bound: every bar is flat.
    assert!(surface.commands().iter().all(|c| c.level() == 0));
    assert_eq!(surface.level(), 0.0);
}

#[test]
fn stale_frame_after_stop_is_ignored() {
    let (graph, mut sampler, mut surface, mut sched) = fixture();
    let mut render = RenderLoop::new(VisualStrategy::Bars);
    render.start(&mut sched);
    let in_flight = sched.pending[0];

    render.stop(&mut sched);
    assert!(!render.tick(in_flight, &mut sampler, &graph, &mut surface, &mut sched));
    assert_eq!(surface.frames(), 0);
    assert!(sched.pending.is_empty());
}

#[test]
fn detached_surface_stops_the_loop() {
    let (graph, mut sampler, mut surface, mut sched) = fixture();
    let mut render = RenderLoop::new(VisualStrategy::Wave);
    render.start(&mut sched);
    surface.detach();

    let frame = sched.deliver().unwrap();
    assert!(!render.tick(frame, &mut sampler, &graph, &mut surface, &mut sched));
    assert!(!render.is_running());
    assert!(sched.pending.is_empty());
}

#[test]
fn panicking_draw_is_contained_and_loop_continues() {
    let (graph, mut sampler, mut surface, mut sched) = fixture();
    let mut render = RenderLoop::new(VisualStrategy::Bars);
    render.start(&mut sched);

    let frame = sched.deliver().unwrap();
    let drawn = render.tick_with(
        frame,
        &mut sampler,
        &graph,
        &mut surface,
        &mut sched,
        |_, _, _| panic!("broken strategy"),
    );
    assert!(!drawn);
    assert_eq!(render.glitches(), 1);
    assert!(render.is_running());

    let frame = sched.deliver().unwrap();
    assert!(render.tick(frame, &mut sampler, &graph, &mut surface, &mut sched));
    assert_eq!(surface.frames(), 1);
}

#[test]
fn resize_takes_effect_on_next_tick() {
    let (graph, mut sampler, mut surface, mut sched) = fixture();
    let mut render = RenderLoop::new(VisualStrategy::Bars);
    render.start(&mut sched);

    let frame = sched.deliver().unwrap();
    render.tick(frame, &mut sampler, &graph, &mut surface, &mut sched);
    assert_eq!(surface.commands().len(), 32);

    surface.resize(20.0, 10.0);
    assert_eq!(surface.commands().len(), 32);
    let frame = sched.deliver().unwrap();
    render.tick(frame, &mut sampler, &graph, &mut surface, &mut sched);
    assert_eq!(surface.commands().len(), 10);
}

#[test]
fn frame_clock_delivers_once_when_due() {
    let mut clock = FrameClock::new(50);
    let start = Instant::now();
    assert_eq!(clock.poll(start), None);
    assert_eq!(clock.time_until_due(start), None);

    let id = clock.request_frame();
    assert!(clock.time_until_due(start).unwrap() > Duration::ZERO);
    let later = Instant::now() + Duration::from_millis(25);
    assert_eq!(clock.poll(later), Some(id));
    assert_eq!(clock.poll(later), None);

    let id = clock.request_frame();
    clock.cancel_frame(id);
    assert_eq!(clock.poll(later + Duration::from_secs(1)), None);
}
