use std::collections::BTreeMap;

use rand::Rng;

/// Contiguous, inclusive range of pages owned by one process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    first: usize,
    last: usize,
}

impl PageRange {
    pub fn new(first: usize, last: usize) -> Self {
        PageRange { first, last }
    }

    #[inline]
    pub fn first(&self) -> usize {
        self.first
    }

    #[inline]
    pub fn last(&self) -> usize {
        self.last
    }

    /// Number of pages in the range; 0 when `first > last`
    #[inline]
    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.last - self.first + 1
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.first > self.last
    }

    #[inline]
    pub fn contains(&self, page: usize) -> bool {
        self.first <= page && page <= self.last
    }
}

impl std::fmt::Display for PageRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}..{}]", self.first, self.last)
    }
}

/// Outcome of routing one reference through a process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Hit,
    /// The page was not resident; `evicted` is the LRU victim, if one was needed
    Fault { evicted: Option<usize> },
}

impl Access {
    #[inline]
    pub fn is_fault(&self) -> bool {
        matches!(self, Access::Fault { .. })
    }
}

/// Per-process paging state shared by every allocation policy.
///
/// The resident set maps page -> last access time (position in the trace).
/// Its size never exceeds `capacity`.
#[derive(Debug, Clone)]
pub struct Process {
    range: PageRange,
    capacity: usize,
    resident: BTreeMap<usize, usize>,
    page_faults: u64,
}

impl Process {
    /// Create a process owning pages `first..=last`, with no frames
    pub fn new(first: usize, last: usize) -> Self {
        Process {
            range: PageRange::new(first, last),
            capacity: 0,
            resident: BTreeMap::new(),
            page_faults: 0,
        }
    }

    #[inline]
    pub fn range(&self) -> PageRange {
        self.range
    }

    #[inline]
    pub fn page_count(&self) -> usize {
        self.range.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn page_faults(&self) -> u64 {
        self.page_faults
    }

    #[inline]
    pub fn resident_count(&self) -> usize {
        self.resident.len()
    }

    #[inline]
    pub fn is_resident(&self, page: usize) -> bool {
        self.resident.contains_key(&page)
    }

    /// Last access time of a resident page
    pub fn last_use(&self, page: usize) -> Option<usize> {
        self.resident.get(&page).copied()
    }

    /// Resident pages with their last access times, in page order
    pub fn resident_pages(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.resident.iter().map(|(&page, &time)| (page, time))
    }

    /// Reference `page` at logical time `time`.
    ///
    /// A hit refreshes the timestamp. A fault evicts the least recently used
    /// page when the resident set is full, then loads `page`. With zero
    /// capacity the fault is counted but nothing can be loaded.
    pub fn dispatch(&mut self, page: usize, time: usize) -> Access {
        if let Some(last_use) = self.resident.get_mut(&page) {
            *last_use = time;
            return Access::Hit;
        }

        self.page_faults += 1;
        if self.capacity == 0 {
            return Access::Fault { evicted: None };
        }

        let evicted = if self.resident.len() >= self.capacity {
            self.least_recently_used().inspect(|victim| {
                self.resident.remove(victim);
            })
        } else {
            None
        };
        self.resident.insert(page, time);
        Access::Fault { evicted }
    }

    /// Grow capacity; never evicts
    pub fn add_capacity(&mut self, delta: usize) {
        self.capacity += delta;
    }

    /// Shrink capacity (floored at zero), evicting uniformly random resident
    /// pages until the resident set fits. Returns the number of pages evicted.
    pub fn shrink_capacity<R: Rng + ?Sized>(&mut self, delta: usize, rng: &mut R) -> usize {
        self.capacity = self.capacity.saturating_sub(delta);

        let mut evicted = 0;
        while self.resident.len() > self.capacity {
            let index = rng.gen_range(0..self.resident.len());
            if let Some(&victim) = self.resident.keys().nth(index) {
                self.resident.remove(&victim);
                evicted += 1;
            }
        }
        evicted
    }

    /// Drop every frame and resident page, returning the frames released
    pub(crate) fn release_frames(&mut self) -> usize {
        let released = self.capacity;
        self.capacity = 0;
        self.resident.clear();
        released
    }

    /// Set capacity directly; only valid while the resident set is empty
    pub(crate) fn assign_capacity(&mut self, capacity: usize) {
        debug_assert!(self.resident.len() <= capacity);
        self.capacity = capacity;
    }

    /// Return to the freshly constructed state, keeping the page range
    pub fn reset(&mut self) {
        self.capacity = 0;
        self.resident.clear();
        self.page_faults = 0;
    }

    // First minimum in page order wins ties
    fn least_recently_used(&self) -> Option<usize> {
        self.resident
            .iter()
            .min_by_key(|&(_, &time)| time)
            .map(|(&page, _)| page)
    }
}
