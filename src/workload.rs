//! Synthetic workloads: a random page partition and a reference trace with
//! locality bursts.

use rand::Rng;
use rand::seq::{SliceRandom, index};

use crate::constants::*;
use crate::error::{Result, SimError};
use crate::process::{PageRange, Process};

/// Shape of the locality bursts each process emits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalityConfig {
    /// Percent chance of starting a burst; each process draws its own base
    /// from `0..=2 * base_chance`
    pub base_chance: u32,
    /// Per-reference increase of the burst chance; drawn from `1..=2 * gain`
    pub gain: u32,
    pub minimal_length: usize,
    pub maximal_length: usize,
    /// Fraction of a process's pages a burst is confined to
    pub min_scope: f64,
    pub max_scope: f64,
}

impl Default for LocalityConfig {
    fn default() -> Self {
        LocalityConfig {
            base_chance: LOCALITY_BASE_CHANCE,
            gain: LOCALITY_GAIN,
            minimal_length: LOCALITY_MINIMAL_LENGTH,
            maximal_length: LOCALITY_MAXIMAL_LENGTH,
            min_scope: LOCALITY_MIN_SCOPE,
            max_scope: LOCALITY_MAX_SCOPE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkloadConfig {
    pub process_count: usize,
    pub page_count: usize,
    pub references_per_page_min: usize,
    pub references_per_page_max: usize,
    pub locality: LocalityConfig,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        WorkloadConfig {
            process_count: DEFAULT_PROCESS_COUNT,
            page_count: DEFAULT_PAGE_COUNT,
            references_per_page_min: REFERENCES_PER_PAGE_MIN,
            references_per_page_max: REFERENCES_PER_PAGE_MAX,
            locality: LocalityConfig::default(),
        }
    }
}

impl WorkloadConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Err(SimError::InvalidConfig(reason));

        if self.process_count == 0 {
            return invalid("process count must be at least 1".to_string());
        }
        // Every process needs its minimum pages plus a distinct division point
        let needed = self.process_count * (MIN_PAGES_PER_PROCESS + 1) - MIN_PAGES_PER_PROCESS;
        if self.page_count < needed {
            return invalid(format!(
                "{} pages cannot be split among {} processes (need at least {})",
                self.page_count, self.process_count, needed
            ));
        }
        if self.references_per_page_min == 0
            || self.references_per_page_min > self.references_per_page_max
        {
            return invalid(format!(
                "references per page range {}..={} is empty",
                self.references_per_page_min, self.references_per_page_max
            ));
        }

        let locality = &self.locality;
        if locality.minimal_length == 0 || locality.minimal_length > locality.maximal_length {
            return invalid(format!(
                "locality length range {}..={} is empty",
                locality.minimal_length, locality.maximal_length
            ));
        }
        if !(0.0 <= locality.min_scope
            && locality.min_scope <= locality.max_scope
            && locality.max_scope < 1.0)
        {
            return invalid(format!(
                "locality scope {}..{} must lie within [0, 1)",
                locality.min_scope, locality.max_scope
            ));
        }
        Ok(())
    }
}

/// Split `page_count` pages among `process_count` processes, each getting at
/// least two pages, at `process_count - 1` distinct random division points.
pub fn generate_partition<R: Rng + ?Sized>(
    config: &WorkloadConfig,
    rng: &mut R,
) -> Result<Vec<Process>> {
    config.validate()?;

    let count = config.process_count;
    let spare = config.page_count - MIN_PAGES_PER_PROCESS * count;
    let mut division_points = index::sample(rng, spare + 1, count - 1).into_vec();
    division_points.sort_unstable();
    division_points.push(spare);

    let mut processes = Vec::with_capacity(count);
    let mut first = 0;
    let mut previous_point = 0;
    for point in division_points {
        let pages = point - previous_point + MIN_PAGES_PER_PROCESS;
        processes.push(Process::new(first, first + pages - 1));
        first += pages;
        previous_point = point;
    }
    Ok(processes)
}

/// Per-process reference source with randomly timed locality bursts
#[derive(Debug, Clone)]
struct LocalityStream {
    range: PageRange,
    base_chance: u32,
    gain: u32,
    current_chance: u32,
    min_scope: usize,
    max_scope: usize,
    min_length: usize,
    max_length: usize,
    burst: Option<PageRange>,
    burst_left: usize,
}

impl LocalityStream {
    fn new<R: Rng + ?Sized>(range: PageRange, config: &LocalityConfig, rng: &mut R) -> Self {
        let base_chance = rng.gen_range(0..=2 * config.base_chance);
        let min_length = rng.gen_range(config.minimal_length..=2 * config.minimal_length);
        let max_length = rng
            .gen_range(config.maximal_length / 2..=2 * config.maximal_length)
            .max(min_length);

        LocalityStream {
            range,
            base_chance,
            gain: rng.gen_range(1..=2 * config.gain.max(1)),
            current_chance: base_chance,
            min_scope: (config.min_scope * range.len() as f64) as usize,
            max_scope: (config.max_scope * range.len() as f64) as usize,
            min_length,
            max_length,
            burst: None,
            burst_left: 0,
        }
    }

    fn next_page<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        if self.burst.is_none() {
            if rng.gen_range(0..100) < self.current_chance {
                self.start_burst(rng);
            } else {
                self.current_chance = (self.current_chance + self.gain).min(100);
                return rng.gen_range(self.range.first()..=self.range.last());
            }
        }

        let Some(burst) = self.burst else {
            return self.range.first();
        };
        let page = rng.gen_range(burst.first()..=burst.last());
        self.burst_left -= 1;
        if self.burst_left == 0 {
            self.burst = None;
            self.current_chance = self.base_chance;
        }
        page
    }

    fn start_burst<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let scope = rng.gen_range(self.min_scope..=self.max_scope);
        let start = self.range.first() + rng.gen_range(0..self.range.len() - scope);
        self.burst = Some(PageRange::new(start, start + scope));
        self.burst_left = rng.gen_range(self.min_length..=self.max_length);
    }
}

/// Interleave every process's references into one trace. Each process emits
/// a random multiple of its page count, in random order with the others.
pub fn generate_trace<R: Rng + ?Sized>(
    processes: &[Process],
    config: &WorkloadConfig,
    rng: &mut R,
) -> Result<Vec<usize>> {
    config.validate()?;

    let mut streams: Vec<LocalityStream> = processes
        .iter()
        .map(|p| LocalityStream::new(p.range(), &config.locality, rng))
        .collect();

    let mut slots = Vec::new();
    for (index, process) in processes.iter().enumerate() {
        let per_page =
            rng.gen_range(config.references_per_page_min..=config.references_per_page_max);
        slots.extend(std::iter::repeat_n(index, per_page * process.page_count()));
    }
    slots.shuffle(rng);

    Ok(slots
        .into_iter()
        .map(|owner| streams[owner].next_page(rng))
        .collect())
}
