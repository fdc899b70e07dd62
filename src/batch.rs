//! Restartable batch streaming over a resolved record group.
//!
//! A [`BatchStream`] walks the group's (possibly shuffled) index sequence in
//! fixed-size windows forever; the caller decides how many batches to take.
//! The stream borrows the dataset immutably, so records, labels, and splits
//! cannot change mid-iteration.

use ndarray::{s, Array1, Array2, Array3};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::errors::DatasetError;
use crate::rng::DeterministicRng;
use crate::splits::Group;

/// Options controlling batch assembly.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchOptions {
    /// Number of records per batch; the final window of a pass may be short.
    pub batch_size: usize,
    /// Re-permute the index order at the start of every pass.
    pub shuffle: bool,
    /// Bundle label vectors with each batch.
    pub include_labels: bool,
    /// Bundle concatenated auxiliary feature vectors, when any are loaded.
    pub include_aux: bool,
    /// Restrict iteration to these positions within the group's index array.
    pub select: Option<Vec<usize>>,
    /// Seed for the shuffle generator. A seeded stream re-seeds at every
    /// wraparound, so every pass uses the same permutation.
    pub seed: Option<u64>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: 32,
            shuffle: true,
            include_labels: true,
            include_aux: true,
            select: None,
            seed: None,
        }
    }
}

impl BatchOptions {
    /// Set the batch size.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Enable or disable per-pass shuffling.
    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Enable or disable bundled labels.
    pub fn include_labels(mut self, include_labels: bool) -> Self {
        self.include_labels = include_labels;
        self
    }

    /// Enable or disable bundled auxiliary features.
    pub fn include_aux(mut self, include_aux: bool) -> Self {
        self.include_aux = include_aux;
        self
    }

    /// Restrict iteration to positions within the group's index array.
    pub fn select(mut self, select: Vec<usize>) -> Self {
        self.select = Some(select);
        self
    }

    /// Seed the shuffle generator.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// One training-ready batch.
#[derive(Clone, Debug)]
pub struct Batch {
    /// Encoded records, shape `(batch, length, alphabet)`.
    pub inputs: Array3<f32>,
    /// Concatenated auxiliary feature vectors, shape `(batch, width)`.
    pub aux: Option<Array2<f32>>,
    /// Label vectors, shape `(batch, classes)`.
    pub labels: Option<Array2<u8>>,
}

impl Batch {
    /// Number of records in the batch.
    pub fn len(&self) -> usize {
        self.inputs.shape()[0]
    }

    /// Whether the batch holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Infinite, restartable iterator over a group's batches.
#[derive(Debug)]
pub struct BatchStream<'a> {
    dataset: &'a Dataset,
    indices: Vec<usize>,
    cursor: usize,
    batch_size: usize,
    shuffle: bool,
    seed: Option<u64>,
    rng: DeterministicRng,
    include_labels: bool,
    include_aux: bool,
}

impl<'a> BatchStream<'a> {
    pub(crate) fn new(
        dataset: &'a Dataset,
        group: Group,
        options: BatchOptions,
    ) -> Result<Self, DatasetError> {
        if options.batch_size == 0 {
            return Err(DatasetError::Configuration(
                "batch size must be at least 1".to_string(),
            ));
        }
        let base = dataset.group_indices(group);
        let indices = match &options.select {
            Some(select) => {
                let mut restricted = Vec::with_capacity(select.len());
                for &position in select {
                    let index = base.get(position).copied().ok_or_else(|| {
                        DatasetError::Configuration(format!(
                            "select position {position} is out of range for \
                             group \"{group}\" of size {}",
                            base.len()
                        ))
                    })?;
                    restricted.push(index);
                }
                restricted
            }
            None => base,
        };
        Ok(Self {
            dataset,
            indices,
            cursor: 0,
            batch_size: options.batch_size,
            shuffle: options.shuffle,
            seed: options.seed,
            rng: DeterministicRng::from_seed_or_entropy(options.seed),
            include_labels: options.include_labels,
            include_aux: options.include_aux,
        })
    }

    /// Number of record indices the stream cycles over.
    pub fn num_indices(&self) -> usize {
        self.indices.len()
    }

    fn assemble(&self, window: &[usize]) -> Batch {
        let (length, width) = self.dataset.shape();
        let records = self.dataset.records();
        let mut inputs = Array3::zeros((window.len(), length, width));
        for (slot, &index) in window.iter().enumerate() {
            inputs.slice_mut(s![slot, .., ..]).assign(&records[index]);
        }

        let labels = if self.include_labels {
            let matrix = self.dataset.label_matrix();
            let mut labels = Array2::zeros((window.len(), matrix.ncols()));
            for (slot, &index) in window.iter().enumerate() {
                labels.row_mut(slot).assign(&matrix.row(index));
            }
            Some(labels)
        } else {
            None
        };

        let aux_width = self.dataset.aux_width();
        let aux = if self.include_aux && aux_width > 0 {
            let mut aux = Array2::zeros((window.len(), aux_width));
            for (slot, &index) in window.iter().enumerate() {
                aux.row_mut(slot)
                    .assign(&Array1::from(self.dataset.feature_vector(index)));
            }
            Some(aux)
        } else {
            None
        };

        Batch { inputs, aux, labels }
    }
}

impl Iterator for BatchStream<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if self.indices.is_empty() {
            return None;
        }
        if self.cursor == 0 && self.shuffle {
            if let Some(seed) = self.seed {
                self.rng = DeterministicRng::new(seed);
            }
            self.indices.shuffle(&mut self.rng);
        }
        let end = (self.cursor + self.batch_size).min(self.indices.len());
        let batch = self.assemble(&self.indices[self.cursor..end]);
        self.cursor = if end >= self.indices.len() { 0 } else { end };
        Some(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{AlphabetSpec, LoadOptions};
    use std::io::Write;

    fn tiny_dataset() -> Dataset {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("class_0.fasta");
        let mut file = std::fs::File::create(&path).unwrap();
        for i in 0..7 {
            writeln!(file, ">{i}\nACGT").unwrap();
        }
        let mut dataset = Dataset::from_class_files(
            &[path],
            &AlphabetSpec::Sequence("ACGT".to_string()),
            LoadOptions { seed: Some(1) },
        )
        .unwrap();
        dataset.train_val_test_split(1.0, 0.0, Some(1)).unwrap();
        dataset
    }

    #[test]
    fn windows_are_contiguous_and_final_one_is_short() {
        let dataset = tiny_dataset();
        let options = BatchOptions::default().batch_size(3).shuffle(false);
        let stream = dataset.batches(Group::Train, options).unwrap();
        let sizes: Vec<usize> = stream.take(6).map(|batch| batch.len()).collect();
        // 7 records in windows of 3: 3, 3, 1, then the stream wraps around.
        assert_eq!(sizes, vec![3, 3, 1, 3, 3, 1]);
    }

    #[test]
    fn unshuffled_stream_preserves_group_order() {
        let dataset = tiny_dataset();
        let options = BatchOptions::default()
            .batch_size(7)
            .shuffle(false)
            .include_labels(false);
        let batch = dataset
            .batches(Group::Train, options)
            .unwrap()
            .next()
            .unwrap();
        assert!(batch.labels.is_none());
        assert!(batch.aux.is_none());
        assert_eq!(batch.inputs.dim(), (7, 4, 4));
    }

    #[test]
    fn seeded_stream_repeats_the_same_permutation_each_pass() {
        let dataset = tiny_dataset();
        let options = BatchOptions::default().batch_size(7).seed(42);
        let mut stream = dataset.batches(Group::Train, options).unwrap();
        let first_pass = stream.next().unwrap();
        let second_pass = stream.next().unwrap();
        assert_eq!(first_pass.inputs, second_pass.inputs);
        assert_eq!(first_pass.labels, second_pass.labels);
    }

    #[test]
    fn select_restricts_to_positions_in_the_index_array() {
        let dataset = tiny_dataset();
        let options = BatchOptions::default()
            .batch_size(10)
            .shuffle(false)
            .select(vec![0, 2, 4]);
        let stream = dataset.batches(Group::Train, options).unwrap();
        assert_eq!(stream.num_indices(), 3);
        let err = dataset
            .batches(
                Group::Train,
                BatchOptions::default().select(vec![99]),
            )
            .unwrap_err();
        assert!(matches!(err, DatasetError::Configuration(_)));
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let dataset = tiny_dataset();
        let err = dataset
            .batches(Group::Train, BatchOptions::default().batch_size(0))
            .unwrap_err();
        assert!(matches!(err, DatasetError::Configuration(_)));
    }
}
