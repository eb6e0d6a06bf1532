//! Page space partition: validation and page -> process routing.

use crate::error::{Result, SimError};
use crate::process::Process;

/// Check that the processes cover `[0, total)` with disjoint, contiguous
/// ranges in ascending order.
pub fn validate(processes: &[Process]) -> Result<()> {
    if processes.is_empty() {
        return Err(SimError::EmptyProcessList);
    }

    let mut expected_first = 0;
    for (index, process) in processes.iter().enumerate() {
        let range = process.range();
        if range.is_empty() {
            return Err(SimError::InvalidPartition(format!(
                "process {} has an empty range {}",
                index, range
            )));
        }
        if range.first() != expected_first {
            return Err(SimError::InvalidPartition(format!(
                "process {} starts at page {}, expected {}",
                index,
                range.first(),
                expected_first
            )));
        }
        expected_first = range.last() + 1;
    }
    Ok(())
}

/// Total number of pages covered by a validated partition
pub fn total_pages(processes: &[Process]) -> usize {
    processes.iter().map(Process::page_count).sum()
}

/// Index of the process owning `page`.
///
/// Ranges are sorted and disjoint, so this is a binary search.
pub fn locate(processes: &[Process], page: usize) -> Result<usize> {
    let index = processes.partition_point(|p| p.range().last() < page);
    match processes.get(index) {
        Some(process) if process.range().contains(page) => Ok(index),
        _ => Err(SimError::UnmappedPage(page)),
    }
}

/// Resolve every reference of a trace to its owner up front
pub fn route_trace(processes: &[Process], trace: &[usize]) -> Result<Vec<usize>> {
    trace.iter().map(|&page| locate(processes, page)).collect()
}
