//! Freeze / resume with deferred-reference replay.
//!
//! A frozen process holds no frames. References routed to it while frozen
//! are queued with their arrival time and replayed, in arrival order, when
//! the process is resumed.

use std::collections::VecDeque;

use crate::process::Process;

#[derive(Debug, Clone, Default)]
pub struct Suspension {
    frozen: bool,
    deferred: VecDeque<(usize, usize)>,
}

/// What happened while replaying a deferred queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Replay {
    pub references: usize,
    pub faults: usize,
}

impl Suspension {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    #[inline]
    pub fn deferred_count(&self) -> usize {
        self.deferred.len()
    }

    /// Queue a reference that arrived while frozen
    pub fn defer(&mut self, page: usize, time: usize) {
        debug_assert!(self.frozen, "deferring a reference for a running process");
        self.deferred.push_back((page, time));
    }

    /// Take every frame from `process`, returning how many were reclaimed
    pub fn freeze(&mut self, process: &mut Process) -> usize {
        self.frozen = true;
        self.deferred.clear();
        process.release_frames()
    }

    /// Give `process` `capacity` frames and replay its deferred references
    /// through the normal dispatch path, each at its original arrival time.
    pub fn resume(&mut self, process: &mut Process, capacity: usize) -> Replay {
        self.frozen = false;
        process.assign_capacity(capacity);

        let mut replay = Replay::default();
        for (page, time) in self.deferred.drain(..) {
            replay.references += 1;
            if process.dispatch(page, time).is_fault() {
                replay.faults += 1;
            }
        }
        replay
    }
}
