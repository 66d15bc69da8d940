//! Frame scheduler double: frames are delivered only when a test says so.

use super::render_loop::{FrameId, FrameScheduler};

#[derive(Debug, Default)]
pub(crate) struct ManualScheduler {
    next: u64,
    pub pending: Vec<FrameId>,
    pub cancelled: Vec<FrameId>,
    pub requested: usize,
}

impl ManualScheduler {
    /// The oldest outstanding frame, removed from the queue.
    pub fn deliver(&mut self) -> Option<FrameId> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.pending.remove(0))
        }
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) -> FrameId {
        self.next += 1;
        self.requested += 1;
        let id = FrameId::new(self.next);
        self.pending.push(id);
        id
    }

    fn cancel_frame(&mut self, id: FrameId) {
        self.pending.retain(|p| *p != id);
        self.cancelled.push(id);
    }
}
