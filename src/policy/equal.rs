use rand::RngCore;

use super::{AllocationPolicy, PolicyKind, PolicyOutcome, Snapshot, equal_shares, prepare, run_static};
use crate::error::Result;
use crate::partition;
use crate::process::Process;

/// Every process gets the same number of frames for the whole run
#[derive(Debug, Clone, Copy, Default)]
pub struct EqualDistribution;

impl AllocationPolicy for EqualDistribution {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Equal
    }

    fn run_observed(
        &self,
        processes: &mut [Process],
        trace: &[usize],
        frame_budget: usize,
        _rng: &mut dyn RngCore,
        observer: &mut dyn FnMut(&Snapshot),
    ) -> Result<PolicyOutcome> {
        partition::validate(processes)?;
        let shares = equal_shares(processes.len(), frame_budget)?;
        let owners = prepare(processes, trace)?;
        Ok(run_static(self.kind(), processes, trace, &owners, &shares, observer))
    }
}
