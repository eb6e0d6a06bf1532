//! Working-set (zone) control.
//!
//! Each process's demand is estimated as the number of distinct pages among
//! its most recent `scope` references. Every `period` references the policy
//! resumes frozen processes the free pool can satisfy, freezes the largest
//! holders while total demand exceeds the frame budget, and tops running
//! processes up towards their demand.

use std::cmp::Reverse;
use std::collections::{BTreeSet, VecDeque};

use log::{debug, trace};
use rand::RngCore;

use super::{
    AllocationPolicy, PolicyKind, PolicyOutcome, Snapshot, apply_shares, collect_faults, prepare,
    proportional_shares,
};
use crate::constants::{ZONE_PERIOD, ZONE_RESAMPLE_WINDOWS, ZONE_SCOPE};
use crate::error::{Result, SimError};
use crate::partition;
use crate::process::Process;
use crate::suspend::Suspension;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneConfig {
    /// Number of a process's own recent references its working set spans
    pub scope: usize,
    /// References between evaluation passes
    pub period: usize,
    /// Clear the working-set windows of running processes on ticks that are
    /// multiples of `scope`
    pub resample_windows: bool,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        ZoneConfig {
            scope: ZONE_SCOPE,
            period: ZONE_PERIOD,
            resample_windows: ZONE_RESAMPLE_WINDOWS,
        }
    }
}

impl ZoneConfig {
    pub fn validate(&self) -> Result<()> {
        if self.scope == 0 || self.period == 0 {
            return Err(SimError::InvalidConfig(format!(
                "zone scope and period must be at least 1, got {} / {}",
                self.scope, self.period
            )));
        }
        Ok(())
    }

    fn is_tick(&self, time: usize) -> bool {
        time >= self.scope && time % self.period == 0
    }
}

/// A process's most recent references, bounded to `span` entries
#[derive(Debug, Clone)]
struct WorkingSetWindow {
    pages: VecDeque<usize>,
    span: usize,
}

impl WorkingSetWindow {
    fn new(span: usize) -> Self {
        WorkingSetWindow {
            pages: VecDeque::with_capacity(span),
            span,
        }
    }

    fn record(&mut self, page: usize) {
        if self.pages.len() == self.span {
            self.pages.pop_front();
        }
        self.pages.push_back(page);
    }

    fn distinct(&self) -> usize {
        self.pages.iter().collect::<BTreeSet<_>>().len()
    }

    fn clear(&mut self) {
        self.pages.clear();
    }
}

#[derive(Debug)]
struct ZoneState {
    frame_budget: usize,
    suspensions: Vec<Suspension>,
    windows: Vec<WorkingSetWindow>,
    free_frames: usize,
}

impl ZoneState {
    fn new(count: usize, frame_budget: usize, scope: usize) -> Self {
        ZoneState {
            frame_budget,
            suspensions: vec![Suspension::new(); count],
            windows: vec![WorkingSetWindow::new(scope); count],
            free_frames: 0,
        }
    }

    /// Working-set size of every process, capped at the frame budget
    fn working_set_sizes(&self) -> Vec<usize> {
        self.windows
            .iter()
            .map(|w| w.distinct().min(self.frame_budget))
            .collect()
    }

    fn tick(&mut self, time: usize, processes: &mut [Process], config: &ZoneConfig) {
        let wss = self.working_set_sizes();
        debug_assert!(wss.iter().all(|&size| size <= self.frame_budget));

        self.resume_pass(time, processes, &wss);
        self.resolve_deficit(time, processes, &wss);
        self.grow(processes, &wss);

        if config.resample_windows && time % config.scope == 0 {
            self.resample();
        }
    }

    /// Resume frozen processes in order until one cannot be satisfied or the
    /// pool runs dry
    fn resume_pass(&mut self, time: usize, processes: &mut [Process], wss: &[usize]) {
        for (index, process) in processes.iter_mut().enumerate() {
            let suspension = &mut self.suspensions[index];
            if !suspension.is_frozen() {
                continue;
            }
            if self.free_frames == 0 || self.free_frames < wss[index] {
                break;
            }
            self.free_frames -= wss[index];
            let replay = suspension.resume(process, wss[index]);
            trace!(
                "t={} resume process {} with {} frames, replayed {} ({} faults)",
                time, index, wss[index], replay.references, replay.faults
            );
        }
    }

    /// Freeze the largest running holder while running demand exceeds the budget
    fn resolve_deficit(&mut self, time: usize, processes: &mut [Process], wss: &[usize]) {
        loop {
            let running: Vec<usize> = (0..processes.len())
                .filter(|&i| !self.suspensions[i].is_frozen())
                .collect();
            let demand: usize = running.iter().map(|&i| wss[i]).sum();
            if demand <= self.frame_budget {
                return;
            }

            // min_by_key keeps the first of equal keys
            let Some(&victim) = running
                .iter()
                .min_by_key(|&&i| Reverse(processes[i].capacity()))
            else {
                return;
            };
            self.free_frames += self.suspensions[victim].freeze(&mut processes[victim]);
            trace!(
                "t={} demand {} over budget, freeze process {}",
                time, demand, victim
            );
        }
    }

    fn grow(&mut self, processes: &mut [Process], wss: &[usize]) {
        for (index, process) in processes.iter_mut().enumerate() {
            if self.suspensions[index].is_frozen() {
                continue;
            }
            if self.free_frames > 0 && process.capacity() < wss[index] {
                let grant = self.free_frames.min(wss[index] - process.capacity());
                process.add_capacity(grant);
                self.free_frames -= grant;
            }
        }
    }

    fn resample(&mut self) {
        for (window, suspension) in self.windows.iter_mut().zip(&self.suspensions) {
            if !suspension.is_frozen() {
                window.clear();
            }
        }
    }

    /// Bring every frozen process back at its working-set size
    fn force_resume(&mut self, processes: &mut [Process]) {
        let wss = self.working_set_sizes();
        for (index, process) in processes.iter_mut().enumerate() {
            let suspension = &mut self.suspensions[index];
            if suspension.is_frozen() {
                suspension.resume(process, wss[index]);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WorkingSetZones {
    config: ZoneConfig,
}

impl WorkingSetZones {
    pub fn new(config: ZoneConfig) -> Self {
        WorkingSetZones { config }
    }

    pub fn config(&self) -> &ZoneConfig {
        &self.config
    }
}

impl AllocationPolicy for WorkingSetZones {
    fn kind(&self) -> PolicyKind {
        PolicyKind::WorkingSetZones
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
        let shares = proportional_shares(processes, frame_budget, rng)?;
        let owners = prepare(processes, trace)?;
        apply_shares(processes, &shares);
        debug!("{}: initial capacities {:?}", self.kind(), shares);

        let mut state = ZoneState::new(processes.len(), frame_budget, self.config.scope);
        observer(&Snapshot::capture(0, processes, &state.suspensions, 0));

        for (time, (&page, &owner)) in trace.iter().zip(&owners).enumerate() {
            if self.config.is_tick(time) {
                state.tick(time, processes, &self.config);
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
            state.windows[owner].record(page);
            processes[owner].dispatch(page, time);
        }

        state.force_resume(processes);

        let page_faults = collect_faults(processes);
        debug!(
            "{}: {} faults",
            self.kind(),
            page_faults.iter().sum::<u64>()
        );
        Ok(PolicyOutcome {
            policy: self.kind(),
            page_faults,
            thrashing: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn policy(scope: usize, period: usize, resample_windows: bool) -> WorkingSetZones {
        WorkingSetZones::new(ZoneConfig {
            scope,
            period,
            resample_windows,
        })
    }

    #[test]
    fn test_config_validation() {
        assert!(ZoneConfig::default().validate().is_ok());
        assert!(ZoneConfig { scope: 0, ..ZoneConfig::default() }.validate().is_err());
        assert!(ZoneConfig { period: 0, ..ZoneConfig::default() }.validate().is_err());
    }

    #[test]
    fn test_ticks_start_at_scope() {
        let config = ZoneConfig {
            scope: 10,
            period: 4,
            resample_windows: false,
        };
        assert!(!config.is_tick(0));
        assert!(!config.is_tick(8));
        assert!(config.is_tick(12));
        assert!(!config.is_tick(13));
    }

    #[test]
    fn test_window_keeps_most_recent_references() {
        let mut window = WorkingSetWindow::new(3);
        for page in [1, 2, 2, 3, 4] {
            window.record(page);
        }
        // Holds 2, 3, 4
        assert_eq!(window.distinct(), 3);
        window.record(4);
        window.record(4);
        assert_eq!(window.distinct(), 1);
        window.clear();
        assert_eq!(window.distinct(), 0);
    }

    #[test]
    fn test_working_set_size_capped_at_budget() {
        let mut state = ZoneState::new(1, 2, 10);
        for page in 0..5 {
            state.windows[0].record(page);
        }
        assert_eq!(state.working_set_sizes(), vec![2]);
    }

    #[test]
    fn test_deficit_freezes_largest_holder() {
        let mut rng = StdRng::seed_from_u64(1);
        // Proportional split of 6 frames over 10 and 5 pages: [4, 2]
        let mut processes = vec![Process::new(0, 9), Process::new(10, 14)];
        let trace = [0, 1, 10, 11, 12, 13, 14, 10, 0];
        let mut snapshots = Vec::new();

        let outcome = policy(8, 8, false)
            .run_observed(&mut processes, &trace, 6, &mut rng, &mut |s| {
                snapshots.push(s.clone())
            })
            .unwrap();

        assert_eq!(snapshots[0].capacities, vec![4, 2]);
        // t=8: demand 2 + 5 > 6. Process 0 holds more frames, so it freezes
        // even though its working set is smaller; process 1 grows to 5.
        assert_eq!(snapshots[1].frozen, vec![true, false]);
        assert_eq!(snapshots[1].capacities, vec![0, 5]);
        assert_eq!(snapshots[1].free_frames, 1);
        // The deferred reference to page 0 faults when flushed at the end
        assert_eq!(outcome.page_faults, vec![3, 6]);
        assert_eq!(outcome.thrashing, None);
    }

    #[test]
    fn test_deficit_tie_freezes_first_holder() {
        let mut processes = vec![Process::new(0, 9), Process::new(10, 19)];
        processes[0].add_capacity(2);
        processes[1].add_capacity(2);
        let mut state = ZoneState::new(2, 4, 8);

        // Demand 6 over a budget of 4, both hold 2 frames
        state.resolve_deficit(8, &mut processes, &[3, 3]);
        assert!(state.suspensions[0].is_frozen());
        assert!(!state.suspensions[1].is_frozen());
        assert_eq!(processes[0].capacity(), 0);
        assert_eq!(processes[1].capacity(), 2);
        assert_eq!(state.free_frames, 2);
    }

    #[test]
    fn test_resume_pass_stops_at_first_unsatisfiable() {
        let mut processes = vec![Process::new(0, 9), Process::new(10, 19)];
        let mut state = ZoneState::new(2, 10, 8);
        state.suspensions[0].freeze(&mut processes[0]);
        state.suspensions[1].freeze(&mut processes[1]);
        state.free_frames = 2;

        // Process 0 needs 3, process 1 would fit in 1 but is not considered
        state.resume_pass(0, &mut processes, &[3, 1]);
        assert!(state.suspensions[0].is_frozen());
        assert!(state.suspensions[1].is_frozen());
        assert_eq!(state.free_frames, 2);

        state.resume_pass(0, &mut processes, &[2, 1]);
        assert!(!state.suspensions[0].is_frozen());
        assert_eq!(processes[0].capacity(), 2);
        // The pool ran dry before process 1
        assert!(state.suspensions[1].is_frozen());
        assert_eq!(state.free_frames, 0);
    }

    #[test]
    fn test_resume_pass_replays_deferred_references() {
        let mut processes = vec![Process::new(0, 9)];
        let mut state = ZoneState::new(1, 4, 8);
        state.suspensions[0].freeze(&mut processes[0]);
        state.suspensions[0].defer(3, 5);
        state.suspensions[0].defer(3, 6);
        state.free_frames = 4;

        state.resume_pass(7, &mut processes, &[2]);
        assert_eq!(processes[0].capacity(), 2);
        assert_eq!(processes[0].page_faults(), 1);
        assert_eq!(processes[0].last_use(3), Some(6));
        assert_eq!(state.free_frames, 2);
    }

    #[test]
    fn test_grow_limited_by_pool() {
        let mut processes = vec![Process::new(0, 9), Process::new(10, 19)];
        processes[0].add_capacity(1);
        processes[1].add_capacity(1);
        let mut state = ZoneState::new(2, 10, 8);
        state.free_frames = 3;

        state.grow(&mut processes, &[3, 4]);
        assert_eq!(processes[0].capacity(), 3);
        assert_eq!(processes[1].capacity(), 2);
        assert_eq!(state.free_frames, 0);
    }

    #[test]
    fn test_resample_toggle() {
        let config = |resample_windows| ZoneConfig {
            scope: 4,
            period: 4,
            resample_windows,
        };
        let mut processes = vec![Process::new(0, 9)];
        processes[0].add_capacity(4);

        let mut state = ZoneState::new(1, 4, 4);
        state.windows[0].record(1);
        state.windows[0].record(2);
        state.tick(4, &mut processes, &config(true));
        assert_eq!(state.windows[0].distinct(), 0);

        let mut state = ZoneState::new(1, 4, 4);
        state.windows[0].record(1);
        state.windows[0].record(2);
        state.tick(4, &mut processes, &config(false));
        assert_eq!(state.windows[0].distinct(), 2);
    }

    #[test]
    fn test_resample_only_on_scope_multiples() {
        let config = ZoneConfig {
            scope: 4,
            period: 2,
            resample_windows: true,
        };
        let mut processes = vec![Process::new(0, 9)];
        processes[0].add_capacity(4);
        let mut state = ZoneState::new(1, 4, 4);
        state.windows[0].record(1);
        state.windows[0].record(2);

        assert!(config.is_tick(6));
        state.tick(6, &mut processes, &config);
        assert_eq!(state.windows[0].distinct(), 2);

        state.tick(8, &mut processes, &config);
        assert_eq!(state.windows[0].distinct(), 0);
    }

    #[test]
    fn test_frames_conserved_between_ticks() {
        let mut rng = StdRng::seed_from_u64(17);
        let mut processes = vec![
            Process::new(0, 9),
            Process::new(10, 14),
            Process::new(15, 29),
        ];
        let trace: Vec<usize> = (0..2000).map(|t| (t * 31 + (t / 50) * 7) % 30).collect();
        let mut snapshots = Vec::new();

        policy(50, 25, true)
            .run_observed(&mut processes, &trace, 9, &mut rng, &mut |s| {
                snapshots.push(s.clone())
            })
            .unwrap();

        assert!(snapshots.len() > 1);
        for snapshot in &snapshots {
            assert!(snapshot.running_capacity() <= 9);
            assert_eq!(snapshot.running_capacity() + snapshot.free_frames, 9);
        }
    }
}
