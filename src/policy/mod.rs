//! Frame allocation policies.
//!
//! Every policy assigns capacities to a partition of processes, replays a
//! reference trace through them and reports per-process fault counts. The
//! processes are reset afterwards so the same partition can be replayed by
//! the next policy.

mod equal;
mod pff;
mod proportional;
mod zone;

pub use equal::EqualDistribution;
pub use pff::{PageFaultFrequency, PffConfig};
pub use proportional::ProportionalDistribution;
pub use zone::{WorkingSetZones, ZoneConfig};

use log::debug;
use rand::{Rng, RngCore};

use crate::error::{Result, SimError};
use crate::partition;
use crate::process::Process;
use crate::suspend::Suspension;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    Equal,
    Proportional,
    PageFaultFrequency,
    WorkingSetZones,
}

impl std::fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PolicyKind::Equal => "equal",
            PolicyKind::Proportional => "proportional",
            PolicyKind::PageFaultFrequency => "page-fault-frequency",
            PolicyKind::WorkingSetZones => "working-set-zones",
        };
        f.write_str(name)
    }
}

/// Result of one policy run over a trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyOutcome {
    pub policy: PolicyKind,
    /// Fault counts in process order
    pub page_faults: Vec<u64>,
    /// Freeze events; only the PFF policy tracks thrashing
    pub thrashing: Option<u64>,
}

impl PolicyOutcome {
    pub fn total_faults(&self) -> u64 {
        self.page_faults.iter().sum()
    }
}

/// Capacity picture handed to observers after the initial assignment and
/// after every evaluation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Trace position the snapshot was taken before
    pub time: usize,
    pub capacities: Vec<usize>,
    pub frozen: Vec<bool>,
    /// References queued for each frozen process, not yet counted
    pub deferred: Vec<usize>,
    pub free_frames: usize,
    pub page_faults: Vec<u64>,
}

impl Snapshot {
    /// `suspensions` may be empty for policies that never freeze
    pub(crate) fn capture(
        time: usize,
        processes: &[Process],
        suspensions: &[Suspension],
        free_frames: usize,
    ) -> Self {
        let suspension = |index: usize| suspensions.get(index);
        Snapshot {
            time,
            capacities: processes.iter().map(Process::capacity).collect(),
            frozen: (0..processes.len())
                .map(|i| suspension(i).is_some_and(Suspension::is_frozen))
                .collect(),
            deferred: (0..processes.len())
                .map(|i| suspension(i).map_or(0, Suspension::deferred_count))
                .collect(),
            free_frames,
            page_faults: processes.iter().map(Process::page_faults).collect(),
        }
    }

    /// Frames held by processes that are not frozen
    pub fn running_capacity(&self) -> usize {
        self.capacities
            .iter()
            .zip(&self.frozen)
            .filter(|&(_, &frozen)| !frozen)
            .map(|(&capacity, _)| capacity)
            .sum()
    }
}

pub trait AllocationPolicy {
    fn kind(&self) -> PolicyKind;

    fn run_observed(
        &self,
        processes: &mut [Process],
        trace: &[usize],
        frame_budget: usize,
        rng: &mut dyn RngCore,
        observer: &mut dyn FnMut(&Snapshot),
    ) -> Result<PolicyOutcome>;

    fn run(
        &self,
        processes: &mut [Process],
        trace: &[usize],
        frame_budget: usize,
        rng: &mut dyn RngCore,
    ) -> Result<PolicyOutcome> {
        self.run_observed(processes, trace, frame_budget, rng, &mut |_| {})
    }
}

/// Resolve every reference of a validated partition to its owner and clear
/// any state left by a previous run. Nothing is mutated when this fails.
///
/// Policies validate the partition and compute their shares before calling
/// this, so every precondition error leaves the processes untouched.
pub(crate) fn prepare(processes: &mut [Process], trace: &[usize]) -> Result<Vec<usize>> {
    let owners = partition::route_trace(processes, trace)?;
    processes.iter_mut().for_each(Process::reset);
    Ok(owners)
}

/// Read out fault counts and reset every process for the next run
pub(crate) fn collect_faults(processes: &mut [Process]) -> Vec<u64> {
    let faults = processes.iter().map(Process::page_faults).collect();
    processes.iter_mut().for_each(Process::reset);
    faults
}

pub(crate) fn apply_shares(processes: &mut [Process], shares: &[usize]) {
    for (process, &share) in processes.iter_mut().zip(shares) {
        process.add_capacity(share);
    }
}

/// Single pass over the trace with fixed capacities
pub(crate) fn run_static(
    kind: PolicyKind,
    processes: &mut [Process],
    trace: &[usize],
    owners: &[usize],
    shares: &[usize],
    observer: &mut dyn FnMut(&Snapshot),
) -> PolicyOutcome {
    apply_shares(processes, shares);
    debug!("{}: capacities {:?}", kind, shares);
    observer(&Snapshot::capture(0, processes, &[], 0));

    for (time, (&page, &owner)) in trace.iter().zip(owners).enumerate() {
        processes[owner].dispatch(page, time);
    }

    let page_faults = collect_faults(processes);
    debug!("{}: {} faults", kind, page_faults.iter().sum::<u64>());
    PolicyOutcome {
        policy: kind,
        page_faults,
        thrashing: None,
    }
}

fn ensure_enough_frames(count: usize, frame_budget: usize) -> Result<()> {
    if count == 0 {
        return Err(SimError::EmptyProcessList);
    }
    if frame_budget < count {
        return Err(SimError::InsufficientFrames {
            frames: frame_budget,
            processes: count,
        });
    }
    Ok(())
}

/// `frame_budget / n` frames each, with the remainder handed one apiece to
/// the first processes in order.
pub fn equal_shares(count: usize, frame_budget: usize) -> Result<Vec<usize>> {
    ensure_enough_frames(count, frame_budget)?;

    let base = frame_budget / count;
    let remainder = frame_budget - base * count;
    Ok((0..count)
        .map(|index| if index < remainder { base + 1 } else { base })
        .collect())
}

/// Shares proportional to page count, at least one frame each, corrected to
/// sum exactly to `frame_budget`.
///
/// Rounding is half-up. Overshoot is removed one frame at a time from a
/// uniformly random process holding more than one frame; undershoot is
/// filled one frame at a time to a uniformly random process.
pub fn proportional_shares<R: Rng + ?Sized>(
    processes: &[Process],
    frame_budget: usize,
    rng: &mut R,
) -> Result<Vec<usize>> {
    ensure_enough_frames(processes.len(), frame_budget)?;

    let total_pages = partition::total_pages(processes);
    let mut shares: Vec<usize> = processes
        .iter()
        .map(|p| {
            let rounded = (2 * frame_budget * p.page_count() + total_pages) / (2 * total_pages);
            rounded.max(1)
        })
        .collect();

    let mut assigned: usize = shares.iter().sum();
    debug!(
        "proportional rounding assigned {} of {} frames",
        assigned, frame_budget
    );

    while assigned > frame_budget {
        let donors: Vec<usize> = (0..shares.len()).filter(|&i| shares[i] > 1).collect();
        // frame_budget >= n guarantees a donor while over budget
        let donor = donors[rng.gen_range(0..donors.len())];
        shares[donor] -= 1;
        assigned -= 1;
    }
    while assigned < frame_budget {
        let receiver = rng.gen_range(0..shares.len());
        shares[receiver] += 1;
        assigned += 1;
    }

    Ok(shares)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn with_sizes(sizes: &[usize]) -> Vec<Process> {
        let mut first = 0;
        sizes
            .iter()
            .map(|&size| {
                let process = Process::new(first, first + size - 1);
                first += size;
                process
            })
            .collect()
    }

    #[test]
    fn test_equal_shares_with_remainder() {
        // 23 frames over 5 processes: 4 each, first 3 get one more
        assert_eq!(equal_shares(5, 23).unwrap(), vec![5, 5, 5, 4, 4]);
    }

    #[test]
    fn test_equal_shares_exact() {
        assert_eq!(equal_shares(2, 4).unwrap(), vec![2, 2]);
    }

    #[test]
    fn test_equal_shares_preconditions() {
        assert!(matches!(equal_shares(0, 4), Err(SimError::EmptyProcessList)));
        assert!(matches!(
            equal_shares(5, 4),
            Err(SimError::InsufficientFrames { frames: 4, processes: 5 })
        ));
    }

    #[test]
    fn test_proportional_shares_exact_split() {
        let mut rng = StdRng::seed_from_u64(3);
        let processes = with_sizes(&[10, 30, 60]);
        assert_eq!(
            proportional_shares(&processes, 10, &mut rng).unwrap(),
            vec![1, 3, 6]
        );
    }

    #[test]
    fn test_proportional_shares_minimum_one() {
        let mut rng = StdRng::seed_from_u64(3);
        // The small process rounds to zero but is floored to one frame
        let processes = with_sizes(&[2, 98]);
        let shares = proportional_shares(&processes, 10, &mut rng).unwrap();
        assert_eq!(shares, vec![1, 9]);
    }

    #[test]
    fn test_proportional_shares_corrects_overshoot() {
        let mut rng = StdRng::seed_from_u64(11);
        // Each rounds 1.5 up to 2, so 8 are assigned for a budget of 6
        let processes = with_sizes(&[2, 2, 2, 2]);
        let shares = proportional_shares(&processes, 6, &mut rng).unwrap();
        assert_eq!(shares.iter().sum::<usize>(), 6);
        assert!(shares.iter().all(|&s| s >= 1));
    }

    #[test]
    fn test_proportional_shares_corrects_undershoot() {
        let mut rng = StdRng::seed_from_u64(5);
        // Three equal processes, 10 frames: each rounds 3.33 down to 3
        let processes = with_sizes(&[4, 4, 4]);
        let shares = proportional_shares(&processes, 10, &mut rng).unwrap();
        assert_eq!(shares.iter().sum::<usize>(), 10);
        assert!(shares.iter().all(|&s| s == 3 || s == 4));
    }

    #[test]
    fn test_proportional_shares_precondition() {
        let mut rng = StdRng::seed_from_u64(5);
        let processes = with_sizes(&[4, 4, 4]);
        assert!(matches!(
            proportional_shares(&processes, 2, &mut rng),
            Err(SimError::InsufficientFrames { .. })
        ));
    }

    #[test]
    fn test_snapshot_running_capacity_skips_frozen() {
        let snapshot = Snapshot {
            time: 0,
            capacities: vec![3, 0, 5],
            frozen: vec![false, true, false],
            deferred: vec![0, 4, 0],
            free_frames: 2,
            page_faults: vec![0, 0, 0],
        };
        assert_eq!(snapshot.running_capacity(), 8);
    }
}
