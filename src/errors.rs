use std::io;

use thiserror::Error;

/// Error type for dataset configuration, loading, and feature failures.
///
/// All failures are fail-fast: a dataset that returned an error during
/// construction or feature loading is left unusable and must be rebuilt.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// Invalid alphabet, split portions, or feature configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Loaded data violates a dataset-wide invariant (shapes, counts).
    #[error("data consistency error: {0}")]
    DataConsistency(String),
    /// Malformed numeric or header fields in an input file.
    #[error("parse error: {0}")]
    Parse(String),
    /// Underlying I/O failure while reading an input file.
    #[error(transparent)]
    Io(#[from] io::Error),
}
