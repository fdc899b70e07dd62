#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Alphabet validation and one-hot codecs.
pub mod alphabet;
/// Batch options and the restartable batch stream.
pub mod batch;
/// Centralized constants used across parsing, features, and splits.
pub mod constants;
/// Dataset loading, ownership, and accessors.
pub mod dataset;
/// FASTA-style block parsing and gzip-aware text input.
pub mod fasta;
/// Auxiliary per-record feature blocks.
pub mod features;
/// Label matrix construction and per-class statistics.
pub mod labels;
/// Deterministic random number generation.
pub mod rng;
/// Train/validation/test partitioning of record indices.
pub mod splits;
/// Shared type aliases.
pub mod types;

mod errors;

pub use alphabet::{Alphabet, AlphabetJoiner, OneHotEncoder};
pub use batch::{Batch, BatchOptions, BatchStream};
pub use dataset::{AlphabetSpec, Dataset, LoadOptions, StructureFormat};
pub use errors::DatasetError;
pub use fasta::{open_text, parse_blocks, FastaBlock};
pub use features::{AuxFeatureStore, FeatureBlock, FeatureKind};
pub use rng::DeterministicRng;
pub use splits::{split_indices, Group, SplitAssignment};
pub use types::{CategoryLevel, ClassIndex, LabelList, RecordIndex};
