//! Auxiliary per-record feature blocks.
//!
//! Each call to [`AuxFeatureStore::load_block`] appends one block holding a
//! scalar, z-scored scalar, or one-hot categorical value per record. At batch
//! time the per-record values of every block are concatenated in the order
//! the blocks were added.

use std::io::BufRead;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::constants::features::MAX_CATEGORIES;
use crate::errors::DatasetError;
use crate::fasta::open_text;
use crate::types::{CategoryLevel, RecordIndex};

/// Kind of auxiliary feature carried by one block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureKind {
    /// One float per record.
    Numeric {
        /// Z-score the block over all records after loading.
        standardize: bool,
    },
    /// One string token per record, one-hot encoded over observed levels.
    Categorical,
}

#[derive(Clone, Debug)]
enum BlockValues {
    Numeric(Vec<f32>),
    Categorical {
        levels: Vec<CategoryLevel>,
        codes: Vec<usize>,
    },
}

/// One loaded feature block, index-aligned with the record list.
#[derive(Clone, Debug)]
pub struct FeatureBlock {
    values: BlockValues,
}

impl FeatureBlock {
    /// Number of per-record values.
    pub fn len(&self) -> usize {
        match &self.values {
            BlockValues::Numeric(values) => values.len(),
            BlockValues::Categorical { codes, .. } => codes.len(),
        }
    }

    /// Whether the block holds no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Width this block contributes to a concatenated feature vector:
    /// 1 for numeric, the level count for categorical.
    pub fn width(&self) -> usize {
        match &self.values {
            BlockValues::Numeric(_) => 1,
            BlockValues::Categorical { levels, .. } => levels.len(),
        }
    }

    /// Observed categorical levels in first-appearance order, if any.
    pub fn levels(&self) -> Option<&[CategoryLevel]> {
        match &self.values {
            BlockValues::Numeric(_) => None,
            BlockValues::Categorical { levels, .. } => Some(levels),
        }
    }

    fn extend_vector(&self, index: RecordIndex, out: &mut Vec<f32>) {
        match &self.values {
            BlockValues::Numeric(values) => out.push(values[index]),
            BlockValues::Categorical { levels, codes } => {
                let code = codes[index];
                for level in 0..levels.len() {
                    out.push(if level == code { 1.0 } else { 0.0 });
                }
            }
        }
    }
}

/// Ordered collection of feature blocks added by sequential load calls.
#[derive(Clone, Debug, Default)]
pub struct AuxFeatureStore {
    blocks: Vec<FeatureBlock>,
}

impl AuxFeatureStore {
    /// Load one feature block from `files`, validating line counts against
    /// the per-file record counts of the owning dataset.
    pub fn load_block<P: AsRef<Path>>(
        &mut self,
        files: &[P],
        kind: FeatureKind,
        expected_counts: &[usize],
    ) -> Result<(), DatasetError> {
        if files.len() != expected_counts.len() {
            return Err(DatasetError::Configuration(format!(
                "feature file count ({}) must match the class file count ({})",
                files.len(),
                expected_counts.len()
            )));
        }
        let mut lines = Vec::new();
        for (file, &expected) in files.iter().zip(expected_counts) {
            let path = file.as_ref();
            let mut file_lines = 0usize;
            for line in open_text(path)?.lines() {
                let line = line?;
                lines.push(line.trim_end().to_string());
                file_lines += 1;
            }
            if file_lines != expected {
                return Err(DatasetError::DataConsistency(format!(
                    "feature file {} has {file_lines} values but its class \
                     holds {expected} records",
                    path.display()
                )));
            }
        }
        let block = match kind {
            FeatureKind::Numeric { standardize } => build_numeric(&lines, standardize)?,
            FeatureKind::Categorical => build_categorical(lines)?,
        };
        self.blocks.push(block);
        Ok(())
    }

    /// Concatenate the record's value from every block in addition order.
    pub fn feature_vector(&self, index: RecordIndex) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.width());
        for block in &self.blocks {
            block.extend_vector(index, &mut out);
        }
        out
    }

    /// Total width of a concatenated feature vector.
    pub fn width(&self) -> usize {
        self.blocks.iter().map(FeatureBlock::width).sum()
    }

    /// Number of loaded blocks.
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Whether no blocks have been loaded.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The loaded blocks in addition order.
    pub fn blocks(&self) -> &[FeatureBlock] {
        &self.blocks
    }
}

fn build_numeric(lines: &[String], standardize: bool) -> Result<FeatureBlock, DatasetError> {
    let mut values = Vec::with_capacity(lines.len());
    for (row, line) in lines.iter().enumerate() {
        let value: f64 = line.trim().parse().map_err(|_| {
            DatasetError::Parse(format!(
                "feature value \"{line}\" at record {row} is not a number"
            ))
        })?;
        values.push(value);
    }
    if standardize {
        values = zscore(&values);
    }
    Ok(FeatureBlock {
        values: BlockValues::Numeric(values.into_iter().map(|v| v as f32).collect()),
    })
}

fn build_categorical(lines: Vec<String>) -> Result<FeatureBlock, DatasetError> {
    let mut interner: IndexMap<CategoryLevel, usize> = IndexMap::new();
    let mut codes = Vec::with_capacity(lines.len());
    for line in lines {
        let next_code = interner.len();
        let code = *interner.entry(line).or_insert(next_code);
        codes.push(code);
    }
    if interner.len() > MAX_CATEGORIES {
        return Err(DatasetError::Configuration(format!(
            "too many categories ({}); a maximum of {MAX_CATEGORIES} are supported",
            interner.len()
        )));
    }
    let levels: Vec<CategoryLevel> = interner.into_keys().collect();
    Ok(FeatureBlock {
        values: BlockValues::Categorical { levels, codes },
    })
}

/// Z-score over the full vector; a zero-variance vector maps to all zeros.
fn zscore(values: &[f64]) -> Vec<f64> {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();
    if std == 0.0 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - mean) / std).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_lines(dir: &TempDir, name: &str, lines: &[&str]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        path
    }

    #[test]
    fn numeric_block_parses_and_concatenates() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_lines(&dir, "a.txt", &["0.5", "1.5"]);
        let b = write_lines(&dir, "b.txt", &["2.5"]);
        let mut store = AuxFeatureStore::default();
        store
            .load_block(&[a, b], FeatureKind::Numeric { standardize: false }, &[2, 1])
            .unwrap();
        assert_eq!(store.width(), 1);
        assert_eq!(store.feature_vector(0), vec![0.5]);
        assert_eq!(store.feature_vector(2), vec![2.5]);
    }

    #[test]
    fn numeric_block_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_lines(&dir, "bad.txt", &["0.5", "abc"]);
        let mut store = AuxFeatureStore::default();
        let err = store
            .load_block(&[path], FeatureKind::Numeric { standardize: false }, &[2])
            .unwrap_err();
        assert!(matches!(err, DatasetError::Parse(_)));
    }

    #[test]
    fn standardized_block_is_zero_mean_unit_std() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_lines(&dir, "z.txt", &["1.0", "2.0", "3.0", "4.0"]);
        let mut store = AuxFeatureStore::default();
        store
            .load_block(&[path], FeatureKind::Numeric { standardize: true }, &[4])
            .unwrap();
        let values: Vec<f32> = (0..4).map(|i| store.feature_vector(i)[0]).collect();
        let mean: f32 = values.iter().sum::<f32>() / 4.0;
        assert!(mean.abs() < 1e-6);
        assert!((values[3] + values[0]).abs() < 1e-6);
    }

    #[test]
    fn constant_block_standardizes_to_zeros() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_lines(&dir, "flat.txt", &["5.0", "5.0"]);
        let mut store = AuxFeatureStore::default();
        store
            .load_block(&[path], FeatureKind::Numeric { standardize: true }, &[2])
            .unwrap();
        assert_eq!(store.feature_vector(0), vec![0.0]);
        assert_eq!(store.feature_vector(1), vec![0.0]);
    }

    #[test]
    fn categorical_levels_follow_first_appearance() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_lines(&dir, "cat.txt", &["exon", "intron", "exon", "utr"]);
        let mut store = AuxFeatureStore::default();
        store
            .load_block(&[path], FeatureKind::Categorical, &[4])
            .unwrap();
        let block = &store.blocks()[0];
        assert_eq!(block.levels().unwrap(), ["exon", "intron", "utr"]);
        assert_eq!(block.width(), 3);
        assert_eq!(store.feature_vector(0), vec![1.0, 0.0, 0.0]);
        assert_eq!(store.feature_vector(1), vec![0.0, 1.0, 0.0]);
        assert_eq!(store.feature_vector(2), vec![1.0, 0.0, 0.0]);
        assert_eq!(store.feature_vector(3), vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn categorical_level_cap_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let values: Vec<String> = (0..MAX_CATEGORIES + 1).map(|i| format!("cat_{i}")).collect();
        let refs: Vec<&str> = values.iter().map(String::as_str).collect();
        let path = write_lines(&dir, "many.txt", &refs);
        let mut store = AuxFeatureStore::default();
        let err = store
            .load_block(&[path], FeatureKind::Categorical, &[MAX_CATEGORIES + 1])
            .unwrap_err();
        assert!(matches!(err, DatasetError::Configuration(_)));
    }

    #[test]
    fn line_count_mismatch_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_lines(&dir, "short.txt", &["1.0", "2.0"]);
        let mut store = AuxFeatureStore::default();
        let err = store
            .load_block(&[path], FeatureKind::Numeric { standardize: false }, &[3])
            .unwrap_err();
        assert!(matches!(err, DatasetError::DataConsistency(_)));
    }

    #[test]
    fn blocks_concatenate_in_addition_order() {
        let dir = tempfile::tempdir().unwrap();
        let numeric = write_lines(&dir, "n.txt", &["0.25", "0.75"]);
        let categorical = write_lines(&dir, "c.txt", &["yes", "no"]);
        let mut store = AuxFeatureStore::default();
        store
            .load_block(&[numeric], FeatureKind::Numeric { standardize: false }, &[2])
            .unwrap();
        store
            .load_block(&[categorical], FeatureKind::Categorical, &[2])
            .unwrap();
        assert_eq!(store.num_blocks(), 2);
        assert_eq!(store.width(), 3);
        assert_eq!(store.feature_vector(1), vec![0.75, 0.0, 1.0]);
    }
}
