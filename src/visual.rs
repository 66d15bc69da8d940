//! Visual module: strategies, the drawing surface and the render loop.
//!
//! The render loop pulls one `FrequencySample` per frame, hands it to the
//! active `VisualStrategy` and stores the resulting draw commands on the
//! `Surface`, where the UI picks them up.

mod render_loop;
mod strategy;
mod surface;

pub use render_loop::{FrameClock, FrameId, FrameScheduler, RenderLoop};
pub use strategy::{DrawCommand, VisualStrategy};
pub use surface::{Surface, SurfaceSize};

#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
mod tests;
