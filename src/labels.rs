//! Label matrix construction and per-class statistics.
//!
//! Raw per-record label-index lists become one fixed-width binary membership
//! matrix once the whole dataset is loaded. The matrix is built exactly once
//! and never mutated afterward.

use ndarray::Array2;

use crate::errors::DatasetError;
use crate::splits::SplitAssignment;
use crate::types::LabelList;

/// Build the `(records, classes)` membership matrix from raw label lists.
///
/// The class count is `1 + ` the largest index listed by any record; each
/// row carries a 1 at every listed index (multi-label records carry several).
pub fn build_label_matrix(raw_labels: &[LabelList]) -> Result<Array2<u8>, DatasetError> {
    let num_classes = raw_labels
        .iter()
        .flat_map(|list| list.iter().copied())
        .max()
        .map(|max_index| max_index + 1)
        .ok_or_else(|| {
            DatasetError::DataConsistency(
                "cannot build label vectors without any listed class index".to_string(),
            )
        })?;
    let mut labels = Array2::zeros((raw_labels.len(), num_classes));
    for (row, list) in raw_labels.iter().enumerate() {
        for &class in list {
            labels[[row, class]] = 1;
        }
    }
    Ok(labels)
}

/// Per-class record counts over the given record indices.
pub fn class_counts(labels: &Array2<u8>, indices: &[usize]) -> Vec<u64> {
    let mut counts = vec![0u64; labels.ncols()];
    for &index in indices {
        for (class, value) in labels.row(index).iter().enumerate() {
            if *value != 0 {
                counts[class] += 1;
            }
        }
    }
    counts
}

/// Per-class weights: total record count over per-class count, normalized so
/// the most frequent class gets weight 1. A class with no records gets an
/// infinite weight.
pub fn class_weights(labels: &Array2<u8>) -> Vec<f64> {
    let all: Vec<usize> = (0..labels.nrows()).collect();
    let counts = class_counts(labels, &all);
    let total = labels.nrows() as f64;
    let raw: Vec<f64> = counts
        .iter()
        .map(|&count| {
            if count == 0 {
                f64::INFINITY
            } else {
                total / count as f64
            }
        })
        .collect();
    let minimum = raw.iter().copied().fold(f64::INFINITY, f64::min);
    raw.iter().map(|weight| weight / minimum).collect()
}

/// Format a per-group, per-class record count table for human inspection.
pub fn summary_table(labels: &Array2<u8>, splits: &SplitAssignment) -> String {
    let train = class_counts(labels, &splits.train);
    let val = class_counts(labels, &splits.val);
    let test = class_counts(labels, &splits.test);
    let all: Vec<u64> = train
        .iter()
        .zip(&val)
        .zip(&test)
        .map(|((a, b), c)| a + b + c)
        .collect();

    let format_row = |cells: &[String]| {
        cells
            .iter()
            .map(|cell| format!("{cell:>9}"))
            .collect::<Vec<_>>()
            .join("  ")
    };
    let names: Vec<String> = (0..labels.ncols())
        .map(|class| format!("class_{class}"))
        .collect();
    let counts_row = |counts: &[u64]| {
        format_row(&counts.iter().map(|c| c.to_string()).collect::<Vec<_>>())
    };

    let mut summary = String::new();
    summary.push_str(&format!("            {}\n", format_row(&names)));
    summary.push_str(&format!("all data:   {}\n", counts_row(&all)));
    summary.push_str(&format!("training:   {}\n", counts_row(&train)));
    summary.push_str(&format!("validation: {}\n", counts_row(&val)));
    summary.push_str(&format!("test:       {}", counts_row(&test)));
    summary
}
