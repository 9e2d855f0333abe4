use crate::host::Scheduler;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameId(pub u64);

/// Event-loop stand-in that only records what was requested.
///
/// The embedder decides when a tick or a frame "happens" and calls back into
/// the controller itself.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    microtasks: usize,
    next_frame: u64,
    frames: BTreeSet<FrameId>,
    cancelled: usize,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Microtasks queued since the last call.
    pub fn take_microtasks(&mut self) -> usize {
        std::mem::take(&mut self.microtasks)
    }

    pub fn pending_microtasks(&self) -> usize {
        self.microtasks
    }

    /// Frames requested and not cancelled since the last call.
    pub fn take_frames(&mut self) -> Vec<FrameId> {
        std::mem::take(&mut self.frames).into_iter().collect()
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn cancelled_frames(&self) -> usize {
        self.cancelled
    }
}

impl Scheduler for ManualScheduler {
    fn queue_microtask(&mut self) {
        self.microtasks += 1;
    }

    fn request_animation_frame(&mut self) -> FrameId {
        self.next_frame += 1;
        let frame = FrameId(self.next_frame);
        self.frames.insert(frame);
        frame
    }

    fn cancel_animation_frame(&mut self, frame: FrameId) {
        if self.frames.remove(&frame) {
            self.cancelled += 1;
        }
    }
}
