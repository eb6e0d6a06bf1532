use rand::RngCore;

use super::{
    AllocationPolicy, PolicyKind, PolicyOutcome, Snapshot, prepare, proportional_shares,
    run_static,
};
use crate::error::Result;
use crate::partition;
use crate::process::Process;

/// Frames split by page count, fixed for the whole run
#[derive(Debug, Clone, Copy, Default)]
pub struct ProportionalDistribution;

impl AllocationPolicy for ProportionalDistribution {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Proportional
    }

    fn run_observed(
        &self,
        processes: &mut [Process],
        trace: &[usize],
        frame_budget: usize,
        rng: &mut dyn RngCore,
        observer: &mut dyn FnMut(&Snapshot),
    ) -> Result<PolicyOutcome> {
        partition::validate(processes)?;
        let shares = proportional_shares(processes, frame_budget, rng)?;
        let owners = prepare(processes, trace)?;
        Ok(run_static(self.kind(), processes, trace, &owners, &shares, observer))
    }
}
