use thiserror::Error;

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("No processes to allocate frames to")]
    EmptyProcessList,

    #[error("Frame budget {frames} is smaller than process count {processes}")]
    InsufficientFrames { frames: usize, processes: usize },

    #[error("Page {0} is not owned by any process")]
    UnmappedPage(usize),

    #[error("Invalid partition: {0}")]
    InvalidPartition(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse input: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
