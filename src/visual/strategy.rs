use std::f64::consts::TAU;
use std::fmt;

use crate::audio::FrequencySample;

use super::surface::SurfaceSize;

/// Horizontal room per bar, in surface units.
const BAR_PITCH: f64 = 2.0;
const MAX_SPOKES: usize = 96;

/// Primitive produced by a strategy. Coordinates have their origin at the
/// bottom-left corner of the surface.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum DrawCommand {
    /// Bottom-anchored column.
    Bar {
        x: f64,
        width: f64,
        height: f64,
        level: u8,
    },
    Segment {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        level: u8,
    },
}

impl DrawCommand {
    pub fn level(&self) -> u8 {
        match *self {
            Self::Bar { level, .. } | Self::Segment { level, .. } => level,
        }
    }
}

/// The fixed set of visualizations.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum VisualStrategy {
    #[default]
    Bars,
    Wave,
    Circular,
}

impl VisualStrategy {
    pub const ALL: [VisualStrategy; 3] = [Self::Bars, Self::Wave, Self::Circular];

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "bars" | "spectrum" => Some(Self::Bars),
            "wave" | "waveform" | "oscilloscope" => Some(Self::Wave),
            "circular" | "radial" => Some(Self::Circular),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Bars => "bars",
            Self::Wave => "wave",
            Self::Circular => "circular",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Bars => Self::Wave,
            Self::Wave => Self::Circular,
            Self::Circular => Self::Bars,
        }
    }

    /// Turn one sample into draw commands for a surface of `size`.
    pub fn draw(self, sample: &FrequencySample, size: SurfaceSize) -> Vec<DrawCommand> {
        if size.is_empty() {
            return Vec::new();
        }
        match self {
            Self::Bars => bars(&sample.bins, size),
            Self::Wave => wave(&sample.waveform, size),
            Self::Circular => circular(&sample.bins, size),
        }
    }
}

impl fmt::Display for VisualStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Average `bins` down to at most `groups` contiguous levels.
fn grouped(bins: &[u8], groups: usize) -> Vec<u8> {
    let groups = groups.min(bins.len());
    if groups == 0 {
        return Vec::new();
    }
    (0..groups)
        .map(|g| {
            let start = g * bins.len() / groups;
            let end = ((g + 1) * bins.len() / groups).max(start + 1);
            let slice = &bins[start..end];
            let sum: u32 = slice.iter().map(|&b| u32::from(b)).sum();
            (sum / slice.len() as u32) as u8
        })
        .collect()
}

fn bars(bins: &[u8], size: SurfaceSize) -> Vec<DrawCommand> {
    let columns = ((size.width / BAR_PITCH) as usize).max(1);
    let levels = grouped(bins, columns);
    if levels.is_empty() {
        return Vec::new();
    }
    let width = size.width / levels.len() as f64;
    levels
        .iter()
        .enumerate()
        .map(|(i, &level)| DrawCommand::Bar {
            x: i as f64 * width,
            width,
            height: f64::from(level) / 255.0 * size.height,
            level,
        })
        .collect()
}

fn wave(waveform: &[u8], size: SurfaceSize) -> Vec<DrawCommand> {
    if waveform.len() < 2 {
        return Vec::new();
    }
    let points = waveform.len().min((size.width as usize).max(2));
    let step = waveform.len() as f64 / points as f64;
    let point = |i: usize| {
        let idx = ((i as f64 * step) as usize).min(waveform.len() - 1);
        let b = waveform[idx];
        let x = i as f64 / (points - 1) as f64 * size.width;
        let y = f64::from(b) / 255.0 * size.height;
        (x, y, b)
    };

    (1..points)
        .map(|i| {
            let (x1, y1, _) = point(i - 1);
            let (x2, y2, b) = point(i);
            let deviation = (i16::from(b) - 128).unsigned_abs() * 2;
            DrawCommand::Segment {
                x1,
                y1,
                x2,
                y2,
                level: deviation.min(255) as u8,
            }
        })
        .collect()
}

fn circular(bins: &[u8], size: SurfaceSize) -> Vec<DrawCommand> {
    let levels = grouped(bins, MAX_SPOKES);
    let (cx, cy) = (size.width / 2.0, size.height / 2.0);
    let reach = size.width.min(size.height) / 2.0;
    let inner = reach * 0.4;
    let span = reach - inner;
    let spokes = levels.len() as f64;

    levels
        .iter()
        .enumerate()
        .map(|(k, &level)| {
            let angle = TAU * k as f64 / spokes;
            let (sin, cos) = angle.sin_cos();
            let outer = inner + f64::from(level) / 255.0 * span;
            DrawCommand::Segment {
                x1: cx + inner * cos,
                y1: cy + inner * sin,
                x2: cx + outer * cos,
                y2: cy + outer * sin,
                level,
            }
        })
        .collect()
}
