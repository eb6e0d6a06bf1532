//! Runs every allocation policy over one partition and trace.

use log::info;
use rand::RngCore;

use crate::constants::DEFAULT_FRAME_BUDGET;
use crate::error::{Result, SimError};
use crate::partition;
use crate::policy::{
    AllocationPolicy, EqualDistribution, PageFaultFrequency, PffConfig, PolicyOutcome,
    ProportionalDistribution, WorkingSetZones, ZoneConfig,
};
use crate::process::Process;
use crate::workload::{self, WorkloadConfig};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationConfig {
    pub frame_budget: usize,
    pub pff: PffConfig,
    pub zone: ZoneConfig,
    pub workload: WorkloadConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            frame_budget: DEFAULT_FRAME_BUDGET,
            pff: PffConfig::default(),
            zone: ZoneConfig::default(),
            workload: WorkloadConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.frame_budget == 0 {
            return Err(SimError::InvalidConfig(
                "frame budget must be at least 1".to_string(),
            ));
        }
        self.pff.validate()?;
        self.zone.validate()
    }

    /// The four policies in reporting order
    pub fn policies(&self) -> Vec<Box<dyn AllocationPolicy>> {
        vec![
            Box::new(EqualDistribution),
            Box::new(ProportionalDistribution),
            Box::new(PageFaultFrequency::new(self.pff)),
            Box::new(WorkingSetZones::new(self.zone)),
        ]
    }
}

/// A partition and trace that every policy is replayed against
#[derive(Debug, Clone)]
pub struct Simulation {
    processes: Vec<Process>,
    trace: Vec<usize>,
}

impl Simulation {
    pub fn new(processes: Vec<Process>, trace: Vec<usize>) -> Result<Self> {
        partition::validate(&processes)?;
        partition::route_trace(&processes, &trace)?;
        Ok(Simulation { processes, trace })
    }

    /// Build a synthetic workload
    pub fn generate(config: &WorkloadConfig, rng: &mut dyn RngCore) -> Result<Self> {
        let processes = workload::generate_partition(config, rng)?;
        let trace = workload::generate_trace(&processes, config, rng)?;
        Ok(Simulation { processes, trace })
    }

    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    pub fn trace(&self) -> &[usize] {
        &self.trace
    }

    /// Run every policy in turn; processes are reset between runs
    pub fn run_all(
        &mut self,
        config: &SimulationConfig,
        rng: &mut dyn RngCore,
    ) -> Result<Report> {
        config.validate()?;
        info!(
            "simulating {} processes, {} pages, {} references, {} frames",
            self.processes.len(),
            partition::total_pages(&self.processes),
            self.trace.len(),
            config.frame_budget
        );

        let mut outcomes = Vec::new();
        for policy in config.policies() {
            let outcome = policy.run(&mut self.processes, &self.trace, config.frame_budget, rng)?;
            info!("{}: {} page faults", outcome.policy, outcome.total_faults());
            outcomes.push(outcome);
        }
        Ok(Report { outcomes })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub outcomes: Vec<PolicyOutcome>,
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for outcome in &self.outcomes {
            let faults: Vec<String> = outcome.page_faults.iter().map(u64::to_string).collect();
            write!(
                f,
                "{:<22} total {:>8}  [{}]",
                outcome.policy.to_string(),
                outcome.total_faults(),
                faults.join(" ")
            )?;
            if let Some(thrashing) = outcome.thrashing {
                write!(f, "  thrashing {}", thrashing)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PolicyKind;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_new_rejects_unmapped_trace() {
        let processes = vec![Process::new(0, 4)];
        assert!(matches!(
            Simulation::new(processes, vec![1, 5]),
            Err(SimError::UnmappedPage(5))
        ));
    }

    #[test]
    fn test_run_all_reports_every_policy() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut simulation =
            Simulation::new(vec![Process::new(0, 4), Process::new(5, 9)], vec![
                0, 0, 1, 2, 3, 5, 5, 6, 7, 8,
            ])
            .unwrap();
        let config = SimulationConfig {
            frame_budget: 4,
            ..SimulationConfig::default()
        };

        let report = simulation.run_all(&config, &mut rng).unwrap();
        let kinds: Vec<PolicyKind> = report.outcomes.iter().map(|o| o.policy).collect();
        assert_eq!(kinds, vec![
            PolicyKind::Equal,
            PolicyKind::Proportional,
            PolicyKind::PageFaultFrequency,
            PolicyKind::WorkingSetZones,
        ]);
        assert_eq!(report.outcomes[0].page_faults, vec![4, 4]);
        // Equal page counts make the proportional split identical
        assert_eq!(report.outcomes[1].page_faults, vec![4, 4]);
        assert_eq!(report.outcomes[2].thrashing, Some(0));
    }

    #[test]
    fn test_report_display() {
        let report = Report {
            outcomes: vec![PolicyOutcome {
                policy: PolicyKind::PageFaultFrequency,
                page_faults: vec![3, 4],
                thrashing: Some(2),
            }],
        };
        let text = report.to_string();
        assert!(text.starts_with("page-fault-frequency"));
        assert!(text.contains("total        7"));
        assert!(text.contains("[3 4]"));
        assert!(text.contains("thrashing 2"));
    }

    #[test]
    fn test_invalid_budget_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut simulation = Simulation::new(vec![Process::new(0, 4)], vec![0]).unwrap();
        let config = SimulationConfig {
            frame_budget: 0,
            ..SimulationConfig::default()
        };
        assert!(matches!(
            simulation.run_all(&config, &mut rng),
            Err(SimError::InvalidConfig(_))
        ));
    }
}
