use crate::audio::BandSummary;

use super::strategy::DrawCommand;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SurfaceSize {
    pub width: f64,
    pub height: f64,
}

impl SurfaceSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// 2-D output the render loop draws into.
///
/// The presentation layer attaches it with its current size and reads back
/// the last frame's commands. A resize only changes what the next tick
/// computes.
#[derive(Debug, Default)]
pub struct Surface {
    size: Option<SurfaceSize>,
    commands: Vec<DrawCommand>,
    bands: BandSummary,
    level: f32,
    frames: u64,
}

impl Surface {
    pub fn attach(&mut self, width: f64, height: f64) {
        self.size = Some(SurfaceSize::new(width, height));
    }

    /// Ignored while detached.
    pub fn resize(&mut self, width: f64, height: f64) {
        if self.size.is_some() {
            self.size = Some(SurfaceSize::new(width, height));
        }
    }

    pub fn detach(&mut self) {
        self.size = None;
        self.clear();
    }

    pub fn is_attached(&self) -> bool {
        self.size.is_some()
    }

    pub fn size(&self) -> Option<SurfaceSize> {
        self.size
    }

    pub(crate) fn present(&mut self, commands: Vec<DrawCommand>, bands: BandSummary, level: f32) {
        self.commands = commands;
        self.bands = bands;
        self.level = level;
        self.frames += 1;
    }

    /// Drop the last frame, leaving an idle presentation.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.bands = BandSummary::default();
        self.level = 0.0;
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn bands(&self) -> BandSummary {
        self.bands
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    /// Number of frames presented since creation.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}
