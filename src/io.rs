use std::fs;
use std::path::Path;

use crate::error::{Result, SimError};
use crate::partition;
use crate::process::Process;

/// Read a whitespace-separated list of page numbers
pub fn read_trace<P: AsRef<Path>>(path: P) -> Result<Vec<usize>> {
    let content = fs::read_to_string(path.as_ref())?;
    parse_trace(&content)
}

pub fn parse_trace(content: &str) -> Result<Vec<usize>> {
    content
        .split_whitespace()
        .map(|token| {
            token
                .parse()
                .map_err(|_| SimError::Parse(format!("Invalid page number: {}", token)))
        })
        .collect()
}

/// Read a partition file: whitespace-separated `first-last` page ranges,
/// one per process, in ascending order
pub fn read_partition<P: AsRef<Path>>(path: P) -> Result<Vec<Process>> {
    let content = fs::read_to_string(path.as_ref())?;
    parse_partition(&content)
}

pub fn parse_partition(content: &str) -> Result<Vec<Process>> {
    let processes = content
        .split_whitespace()
        .map(parse_range)
        .collect::<Result<Vec<_>>>()?;

    partition::validate(&processes)?;
    Ok(processes)
}

fn parse_range(token: &str) -> Result<Process> {
    let (first, last) = token
        .split_once('-')
        .ok_or_else(|| SimError::Parse(format!("Expected first-last range, got: {}", token)))?;
    let first: usize = first
        .parse()
        .map_err(|_| SimError::Parse(format!("Invalid first page in range: {}", token)))?;
    let last: usize = last
        .parse()
        .map_err(|_| SimError::Parse(format!("Invalid last page in range: {}", token)))?;
    Ok(Process::new(first, last))
}
