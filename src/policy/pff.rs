//! Page-Fault-Frequency control.
//!
//! Starts from the proportional split. Every `window` references each
//! process's fault rate over the window is compared with three thresholds:
//! quiet processes give a frame back to a shared pool, busy ones take a frame
//! from it, and a process above the critical rate with an empty pool is frozen
//! until the pool can restore its original share.

use log::{debug, trace};
use rand::RngCore;

use super::{
    AllocationPolicy, PolicyKind, PolicyOutcome, Snapshot, apply_shares, collect_faults, prepare,
    proportional_shares,
};
use crate::constants::{PFF_CRITICAL, PFF_HIGH, PFF_LOW, PFF_WINDOW};
use crate::error::{Result, SimError};
use crate::partition;
use crate::process::Process;
use crate::suspend::Suspension;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PffConfig {
    /// References between evaluation passes
    pub window: usize,
    pub low: f64,
    pub high: f64,
    pub critical: f64,
}

impl Default for PffConfig {
    fn default() -> Self {
        PffConfig {
            window: PFF_WINDOW,
            low: PFF_LOW,
            high: PFF_HIGH,
            critical: PFF_CRITICAL,
        }
    }
}

impl PffConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window == 0 {
            return Err(SimError::InvalidConfig(
                "PFF window must be at least 1".to_string(),
            ));
        }
        if !(0.0 <= self.low && self.low < self.high && self.high < self.critical) {
            return Err(SimError::InvalidConfig(format!(
                "PFF thresholds must satisfy 0 <= low < high < critical, got {} / {} / {}",
                self.low, self.high, self.critical
            )));
        }
        Ok(())
    }

    // Rate for a process that saw no references; triggers neither branch
    fn neutral_rate(&self) -> f64 {
        (self.high + self.low) / 2.0
    }
}

/// Reference and fault counts since the last evaluation pass
#[derive(Debug, Clone, Copy, Default)]
struct FaultWindow {
    references: u64,
    faults: u64,
}

impl FaultWindow {
    fn rate(&self) -> Option<f64> {
        (self.references != 0).then(|| self.faults as f64 / self.references as f64)
    }
}

/// Mutable state of one PFF run
struct PffState {
    original: Vec<usize>,
    suspensions: Vec<Suspension>,
    windows: Vec<FaultWindow>,
    free_frames: usize,
    thrashing: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PageFaultFrequency {
    config: PffConfig,
}

impl PageFaultFrequency {
    pub fn new(config: PffConfig) -> Self {
        PageFaultFrequency { config }
    }

    pub fn config(&self) -> &PffConfig {
        &self.config
    }

    fn evaluate(
        &self,
        time: usize,
        processes: &mut [Process],
        state: &mut PffState,
        rng: &mut dyn RngCore,
    ) {
        for (index, process) in processes.iter_mut().enumerate() {
            let rate = state.windows[index]
                .rate()
                .unwrap_or_else(|| self.config.neutral_rate());
            let suspension = &mut state.suspensions[index];

            if suspension.is_frozen() {
                let share = state.original[index];
                if state.free_frames >= share {
                    state.free_frames -= share;
                    let replay = suspension.resume(process, share);
                    trace!(
                        "t={} resume process {} with {} frames, replayed {} ({} faults)",
                        time, index, share, replay.references, replay.faults
                    );
                }
            } else if rate <= self.config.low && process.capacity() > 1 {
                process.shrink_capacity(1, rng);
                state.free_frames += 1;
                trace!("t={} process {} rate {:.3}: shrink", time, index, rate);
            } else if rate >= self.config.high {
                if state.free_frames > 0 {
                    process.add_capacity(1);
                    state.free_frames -= 1;
                    trace!("t={} process {} rate {:.3}: grow", time, index, rate);
                } else if rate >= self.config.critical {
                    state.free_frames += suspension.freeze(process);
                    state.thrashing += 1;
                    trace!("t={} process {} rate {:.3}: freeze", time, index, rate);
                }
            }
        }

        state.windows.fill(FaultWindow::default());
    }
}

impl AllocationPolicy for PageFaultFrequency {
    fn kind(&self) -> PolicyKind {
        PolicyKind::PageFaultFrequency
    }

    fn run_observed(
        &self,
        processes: &mut [Process],
        trace: &[usize],
        frame_budget: usize,
        rng: &mut dyn RngCore,
        observer: &mut dyn FnMut(&Snapshot),
    ) -> Result<PolicyOutcome> {
        self.config.validate()?;
        partition::validate(processes)?;
        let original = proportional_shares(processes, frame_budget, rng)?;
        let owners = prepare(processes, trace)?;
        apply_shares(processes, &original);
        debug!("{}: initial capacities {:?}", self.kind(), original);

        let count = processes.len();
        let mut state = PffState {
            original,
            suspensions: vec![Suspension::new(); count],
            windows: vec![FaultWindow::default(); count],
            free_frames: 0,
            thrashing: 0,
        };
        observer(&Snapshot::capture(0, processes, &state.suspensions, 0));

        for (time, (&page, &owner)) in trace.iter().zip(&owners).enumerate() {
            if time != 0 && time % self.config.window == 0 {
                self.evaluate(time, processes, &mut state, rng);
                observer(&Snapshot::capture(
                    time,
                    processes,
                    &state.suspensions,
                    state.free_frames,
                ));
            }

            let suspension = &mut state.suspensions[owner];
            if suspension.is_frozen() {
                suspension.defer(page, time);
                continue;
            }

            let window = &mut state.windows[owner];
            window.references += 1;
            if processes[owner].dispatch(page, time).is_fault() {
                window.faults += 1;
            }
        }

        let page_faults = collect_faults(processes);
        debug!(
            "{}: {} faults, {} thrashing events",
            self.kind(),
            page_faults.iter().sum::<u64>(),
            state.thrashing
        );
        Ok(PolicyOutcome {
            policy: self.kind(),
            page_faults,
            thrashing: Some(state.thrashing),
        })
    }
}
