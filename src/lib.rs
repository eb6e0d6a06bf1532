pub mod constants;
pub mod error;
pub mod io;
pub mod partition;
pub mod policy;
pub mod process;
pub mod simulation;
pub mod suspend;
pub mod workload;

// Re-export commonly used items for convenience
pub use error::{Result, SimError};
pub use policy::{AllocationPolicy, PolicyKind, PolicyOutcome, Snapshot};
pub use process::{Access, PageRange, Process};
pub use simulation::{Report, Simulation, SimulationConfig};
