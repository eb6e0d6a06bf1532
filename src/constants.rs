pub const DEFAULT_FRAME_BUDGET: usize = 40;

pub const DEFAULT_PROCESS_COUNT: usize = 10;
pub const DEFAULT_PAGE_COUNT: usize = 100;
pub const MIN_PAGES_PER_PROCESS: usize = 2;

// Each process emits roughly this many references per page it owns
pub const REFERENCES_PER_PAGE_MIN: usize = 850;
pub const REFERENCES_PER_PAGE_MAX: usize = 1150;

pub const LOCALITY_BASE_CHANCE: u32 = 5;
pub const LOCALITY_GAIN: u32 = 2;
pub const LOCALITY_MINIMAL_LENGTH: usize = 20;
pub const LOCALITY_MAXIMAL_LENGTH: usize = 200;
pub const LOCALITY_MIN_SCOPE: f64 = 0.3;
pub const LOCALITY_MAX_SCOPE: f64 = 0.4;

pub const PFF_WINDOW: usize = 100;
pub const PFF_LOW: f64 = 0.1;
pub const PFF_HIGH: f64 = 0.4;
pub const PFF_CRITICAL: f64 = 0.7;

pub const ZONE_SCOPE: usize = 200;
pub const ZONE_PERIOD: usize = 100;
pub const ZONE_RESAMPLE_WINDOWS: bool = true;
