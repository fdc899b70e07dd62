//! Train/validation/test partitioning of record indices.
//!
//! A [`SplitAssignment`] is derived data: it can be discarded and rebuilt at
//! any time without touching records or labels. Partitioning shuffles the
//! full index range with an explicitly seeded generator and cuts the
//! permutation into three contiguous slices.

use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::DatasetError;

/// Named subset of record indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Group {
    /// Training records.
    Train,
    /// Validation records.
    Val,
    /// Test records.
    Test,
    /// Every record, in original load order. Never stored, always computed.
    All,
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Group::Train => "train",
            Group::Val => "val",
            Group::Test => "test",
            Group::All => "all",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Group {
    type Err = DatasetError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "train" => Ok(Group::Train),
            "val" => Ok(Group::Val),
            "test" => Ok(Group::Test),
            "all" => Ok(Group::All),
            other => Err(DatasetError::Configuration(format!(
                "unknown group \"{other}\" (expected train, val, test, or all)"
            ))),
        }
    }
}

/// Disjoint, collectively exhaustive partition of the record index range.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SplitAssignment {
    /// Indices assigned to training.
    pub train: Vec<usize>,
    /// Indices assigned to validation.
    pub val: Vec<usize>,
    /// Indices assigned to testing.
    pub test: Vec<usize>,
}

impl SplitAssignment {
    /// Total number of partitioned records.
    pub fn num_records(&self) -> usize {
        self.train.len() + self.val.len() + self.test.len()
    }

    /// Resolve a group name into its record indices.
    ///
    /// [`Group::All`] yields `0..num_records` in original load order; the
    /// other groups yield a copy of their stored slice.
    pub fn resolve(&self, group: Group) -> Vec<usize> {
        match group {
            Group::Train => self.train.clone(),
            Group::Val => self.val.clone(),
            Group::Test => self.test.clone(),
            Group::All => (0..self.num_records()).collect(),
        }
    }
}

/// Partition `0..num_records` into train/val/test by the given portions.
///
/// The test portion is implicit: `1 - portion_train - portion_val`, which
/// must not be negative. The permutation is cut at
/// `floor(n * portion_train)` and `floor(n * (portion_train + portion_val))`.
pub fn split_indices<R: Rng>(
    num_records: usize,
    portion_train: f64,
    portion_val: f64,
    rng: &mut R,
) -> Result<SplitAssignment, DatasetError> {
    if !(0.0..=1.0).contains(&portion_train) || !(0.0..=1.0).contains(&portion_val) {
        return Err(DatasetError::Configuration(format!(
            "split portions must lie in [0, 1], got train={portion_train} val={portion_val}"
        )));
    }
    if portion_train + portion_val > 1.0 {
        return Err(DatasetError::Configuration(format!(
            "train portion {portion_train} and validation portion {portion_val} \
             leave no room for the test portion"
        )));
    }
    let mut order: Vec<usize> = (0..num_records).collect();
    order.shuffle(rng);
    let break_train = (num_records as f64 * portion_train).floor() as usize;
    let break_val = (num_records as f64 * (portion_train + portion_val)).floor() as usize;
    let test = order.split_off(break_val);
    let val = order.split_off(break_train);
    Ok(SplitAssignment {
        train: order,
        val,
        test,
    })
}
