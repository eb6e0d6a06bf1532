//! Frame allocation simulator - Main Entry Point
//!
//! Replays one reference trace under four frame allocation policies (equal,
//! proportional, page-fault-frequency and working-set zones) and prints the
//! page faults each process suffered under each of them.
//!
//! The partition and trace are generated from `--seed` unless both
//! `--partition` and `--trace` files are given.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::LevelFilter;
use rand::SeedableRng;
use rand::rngs::StdRng;

use frame_alloc_sim::io::{read_partition, read_trace};
use frame_alloc_sim::policy::{PffConfig, ZoneConfig};
use frame_alloc_sim::workload::WorkloadConfig;
use frame_alloc_sim::{Result, SimError, Simulation, SimulationConfig, constants::*};

#[derive(Parser, Debug)]
#[command(name = "frame-alloc-sim")]
#[command(about = "Compare frame allocation policies under demand paging")]
#[command(version)]
struct Cli {
    /// Physical frames shared by all processes
    #[arg(short, long, default_value_t = DEFAULT_FRAME_BUDGET)]
    frames: usize,

    /// Number of processes to generate
    #[arg(short, long, default_value_t = DEFAULT_PROCESS_COUNT)]
    processes: usize,

    /// Size of the generated page space
    #[arg(long, default_value_t = DEFAULT_PAGE_COUNT)]
    pages: usize,

    /// Random seed for reproducible runs
    #[arg(short, long)]
    seed: Option<u64>,

    /// Partition file of `first-last` page ranges (requires --trace)
    #[arg(long, requires = "trace")]
    partition: Option<PathBuf>,

    /// Trace file of page numbers (requires --partition)
    #[arg(long, requires = "partition")]
    trace: Option<PathBuf>,

    /// References between PFF evaluations
    #[arg(long, default_value_t = PFF_WINDOW)]
    pff_window: usize,

    #[arg(long, default_value_t = PFF_LOW)]
    pff_low: f64,

    #[arg(long, default_value_t = PFF_HIGH)]
    pff_high: f64,

    #[arg(long, default_value_t = PFF_CRITICAL)]
    pff_critical: f64,

    /// Recent references per process that make up its working set
    #[arg(long, default_value_t = ZONE_SCOPE)]
    zone_scope: usize,

    /// References between zone evaluations
    #[arg(long, default_value_t = ZONE_PERIOD)]
    zone_period: usize,

    /// Keep working-set windows instead of clearing them every scope
    #[arg(long)]
    no_resample: bool,

    /// Print the generated partition
    #[arg(long)]
    show_partition: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn config(&self) -> SimulationConfig {
        SimulationConfig {
            frame_budget: self.frames,
            pff: PffConfig {
                window: self.pff_window,
                low: self.pff_low,
                high: self.pff_high,
                critical: self.pff_critical,
            },
            zone: ZoneConfig {
                scope: self.zone_scope,
                period: self.zone_period,
                resample_windows: !self.no_resample,
            },
            workload: WorkloadConfig {
                process_count: self.processes,
                page_count: self.pages,
                ..WorkloadConfig::default()
            },
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Run the simulation and handle any errors
    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

/// Main logic separated from main() for cleaner error handling
fn run(cli: &Cli) -> Result<()> {
    let config = cli.config();
    config.validate()?;

    let seed = cli.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut simulation = match (&cli.partition, &cli.trace) {
        (Some(partition), Some(trace)) => {
            Simulation::new(read_partition(partition)?, read_trace(trace)?)?
        }
        (None, None) => Simulation::generate(&config.workload, &mut rng)?,
        _ => {
            return Err(SimError::InvalidConfig(
                "--partition and --trace must be given together".to_string(),
            ));
        }
    };

    println!("Seed:       {}", seed);
    println!("Frames:     {}", config.frame_budget);
    println!("Processes:  {}", simulation.processes().len());
    println!("References: {}", simulation.trace().len());
    if cli.show_partition {
        for (index, process) in simulation.processes().iter().enumerate() {
            println!("  process {:>3}: pages {}", index, process.range());
        }
    }
    println!();

    let report = simulation.run_all(&config, &mut rng)?;
    print!("{}", report);
    Ok(())
}
