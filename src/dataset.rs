//! Dataset loading, encoding, and ownership.
//!
//! A [`Dataset`] reads one or more FASTA-style files, repairs and one-hot
//! encodes every record, derives the label matrix, and partitions records
//! into train/val/test groups. It owns the record tensors, label matrix,
//! and auxiliary feature blocks for its entire lifetime; the split
//! assignment is derived data and can be rebuilt at any time.

use std::path::Path;

use ndarray::{s, Array2, Array3, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::alphabet::{Alphabet, AlphabetJoiner, OneHotEncoder};
use crate::batch::{BatchOptions, BatchStream};
use crate::constants::fasta::MULTILABEL_SEPARATOR;
use crate::constants::splits::{DEFAULT_PORTION_TRAIN, DEFAULT_PORTION_VAL};
use crate::errors::DatasetError;
use crate::fasta::{open_text, parse_blocks, FastaBlock};
use crate::features::{AuxFeatureStore, FeatureKind};
use crate::labels;
use crate::rng::DeterministicRng;
use crate::splits::{split_indices, Group, SplitAssignment};
use crate::types::{ClassIndex, LabelList};

/// Alphabet declaration for a dataset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlphabetSpec {
    /// Sequence-only records over a single alphabet.
    Sequence(String),
    /// Position-paired sequence and structure records over two disjoint
    /// alphabets, encoded into their joint product alphabet.
    SequenceStructure {
        /// Sequence alphabet symbols.
        sequence: String,
        /// Structure alphabet symbols.
        structure: String,
        /// How structure information is written in the input files.
        format: StructureFormat,
    },
}

/// How structure information is written in dual-alphabet files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StructureFormat {
    /// One structure string line per record.
    Strings,
    /// `|structure alphabet|` lines of per-position probabilities per record.
    Pwm,
}

/// Options for dataset loading.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Seed for the repair draws and the initial split; process entropy
    /// when `None`.
    pub seed: Option<u64>,
}

/// Encoder selected by the alphabet declaration.
#[derive(Debug)]
enum Codec {
    Single(OneHotEncoder),
    Paired { joiner: AlphabetJoiner, pwm: bool },
}

impl Codec {
    fn from_spec(spec: &AlphabetSpec) -> Result<Self, DatasetError> {
        match spec {
            AlphabetSpec::Sequence(alphabet) => {
                Ok(Codec::Single(OneHotEncoder::from_spec(alphabet)?))
            }
            AlphabetSpec::SequenceStructure {
                sequence,
                structure,
                format,
            } => Ok(Codec::Paired {
                joiner: AlphabetJoiner::new(sequence, structure)?,
                pwm: *format == StructureFormat::Pwm,
            }),
        }
    }

    /// Encode one FASTA block; returns the record tensor and the number of
    /// out-of-alphabet characters that were repaired.
    fn encode_block(
        &self,
        block: &FastaBlock,
        rng: &mut DeterministicRng,
    ) -> Result<(Array2<f32>, usize), DatasetError> {
        match self {
            Codec::Single(encoder) => {
                if block.lines.is_empty() {
                    return Err(DatasetError::DataConsistency(format!(
                        "record \"{}\" has no sequence line",
                        block.header
                    )));
                }
                let raw = block.lines.concat().to_uppercase();
                let alphabet = encoder.alphabet();
                let repaired = count_foreign(&raw, alphabet);
                let sequence = alphabet.repair(&raw, rng);
                Ok((encoder.encode(&sequence)?, repaired))
            }
            Codec::Paired { joiner, pwm: false } => {
                if block.lines.len() < 2 {
                    return Err(DatasetError::DataConsistency(format!(
                        "record \"{}\" is missing its structure line",
                        block.header
                    )));
                }
                let raw_seq = block.lines[0].to_uppercase();
                let repaired_seq = count_foreign(&raw_seq, joiner.primary());
                let sequence = joiner.primary().repair(&raw_seq, rng);
                // Trailing annotations after the structure string are dropped.
                let raw_struct = block.lines[1]
                    .split_whitespace()
                    .next()
                    .unwrap_or("")
                    .to_uppercase();
                let repaired_struct = count_foreign(&raw_struct, joiner.secondary());
                let structure = joiner.secondary().repair(&raw_struct, rng);
                Ok((
                    joiner.encode_pair(&sequence, &structure)?,
                    repaired_seq + repaired_struct,
                ))
            }
            Codec::Paired { joiner, pwm: true } => {
                let rows = joiner.secondary().len();
                if block.lines.len() < rows + 1 {
                    return Err(DatasetError::DataConsistency(format!(
                        "record \"{}\" has {} lines, PWM mode needs a sequence \
                         line plus {rows} matrix rows",
                        block.header,
                        block.lines.len()
                    )));
                }
                let raw_seq = block.lines[0].to_uppercase();
                let repaired = count_foreign(&raw_seq, joiner.primary());
                let sequence = joiner.primary().repair(&raw_seq, rng);
                let pwm = parse_pwm_rows(
                    &block.lines[1..=rows],
                    sequence.chars().count(),
                    rows,
                    &block.header,
                )?;
                Ok((joiner.encode_pwm(&sequence, &pwm)?, repaired))
            }
        }
    }
}

fn count_foreign(text: &str, alphabet: &Alphabet) -> usize {
    text.chars().filter(|ch| !alphabet.contains(*ch)).count()
}

/// Parse the PWM rows of one record into a `(length, |secondary|)` matrix.
///
/// Input rows are per-structure-symbol, columns are sequence positions;
/// the result is transposed to position-major order.
fn parse_pwm_rows(
    lines: &[String],
    sequence_len: usize,
    num_symbols: usize,
    header: &str,
) -> Result<Array2<f32>, DatasetError> {
    let mut pwm = Array2::zeros((sequence_len, num_symbols));
    for (symbol, line) in lines.iter().enumerate() {
        let mut positions = 0usize;
        for (position, token) in line.split_whitespace().enumerate() {
            let value: f32 = token.parse().map_err(|_| {
                DatasetError::Parse(format!(
                    "record \"{header}\": \"{token}\" in PWM row {symbol} is \
                     not a number"
                ))
            })?;
            if position >= sequence_len {
                return Err(DatasetError::DataConsistency(format!(
                    "record \"{header}\": PWM row {symbol} has more than \
                     {sequence_len} values"
                )));
            }
            pwm[[position, symbol]] = value;
            positions += 1;
        }
        if positions != sequence_len {
            return Err(DatasetError::DataConsistency(format!(
                "record \"{header}\": PWM row {symbol} has {positions} values \
                 for a sequence of length {sequence_len}"
            )));
        }
    }
    Ok(pwm)
}

fn parse_label_header(header: &str) -> Result<LabelList, DatasetError> {
    let mut classes = Vec::new();
    for part in header.split(MULTILABEL_SEPARATOR) {
        let class = part.trim().parse::<usize>().map_err(|_| {
            DatasetError::Parse(format!(
                "multi-label header \"{header}\" must be a comma-separated \
                 list of class indices"
            ))
        })?;
        classes.push(class);
    }
    Ok(classes)
}

/// In-memory dataset of encoded records, labels, splits, and features.
#[derive(Debug)]
pub struct Dataset {
    codec: Codec,
    records: Vec<Array2<f32>>,
    labels: Array2<u8>,
    file_counts: Vec<usize>,
    splits: SplitAssignment,
    features: AuxFeatureStore,
    multilabel: bool,
}

impl Dataset {
    /// Load a single-label dataset: one file per class, class id given by
    /// file position, headers ignored.
    ///
    /// Loading uppercases each sequence, replaces out-of-alphabet characters
    /// with uniform random draws from the alphabet, encodes every record,
    /// verifies that all records share one shape, builds the label matrix,
    /// and applies an initial 70/15/15 split.
    pub fn from_class_files<P: AsRef<Path>>(
        class_files: &[P],
        spec: &AlphabetSpec,
        options: LoadOptions,
    ) -> Result<Self, DatasetError> {
        Self::load(class_files, spec, options, false)
    }

    /// Load a multi-label dataset from a single file whose headers list
    /// class indices (e.g. `>0,2`).
    pub fn from_multilabel_file<P: AsRef<Path>>(
        file: P,
        spec: &AlphabetSpec,
        options: LoadOptions,
    ) -> Result<Self, DatasetError> {
        Self::load(&[file], spec, options, true)
    }

    fn load<P: AsRef<Path>>(
        files: &[P],
        spec: &AlphabetSpec,
        options: LoadOptions,
        multilabel: bool,
    ) -> Result<Self, DatasetError> {
        let codec = Codec::from_spec(spec)?;
        let mut rng = DeterministicRng::from_seed_or_entropy(options.seed);
        let mut records: Vec<Array2<f32>> = Vec::new();
        let mut raw_labels: Vec<LabelList> = Vec::new();
        let mut file_counts = Vec::with_capacity(files.len());
        let mut repaired_total = 0usize;

        for (class_id, file) in files.iter().enumerate() {
            let path = file.as_ref();
            let blocks = parse_blocks(open_text(path)?)?;
            let loaded_before = records.len();
            for block in &blocks {
                let (tensor, repaired) = codec.encode_block(block, &mut rng)?;
                repaired_total += repaired;
                records.push(tensor);
                raw_labels.push(if multilabel {
                    parse_label_header(&block.header)?
                } else {
                    vec![class_id]
                });
            }
            let loaded = records.len() - loaded_before;
            debug!(file = %path.display(), records = loaded, "loaded class file");
            file_counts.push(loaded);
        }

        if records.is_empty() {
            return Err(DatasetError::DataConsistency(
                "no records found in the input files".to_string(),
            ));
        }
        let shape = records[0].dim();
        for (index, record) in records.iter().enumerate() {
            if record.dim() != shape {
                return Err(DatasetError::DataConsistency(format!(
                    "record {index} encodes to shape {:?} while record 0 has \
                     {shape:?}; all sequences must have the same length",
                    record.dim()
                )));
            }
        }
        if repaired_total > 0 {
            debug!(
                replaced = repaired_total,
                "repaired out-of-alphabet characters"
            );
        }

        let labels = labels::build_label_matrix(&raw_labels)?;
        let mut dataset = Self {
            codec,
            records,
            labels,
            file_counts,
            splits: SplitAssignment::default(),
            features: AuxFeatureStore::default(),
            multilabel,
        };
        dataset.train_val_test_split(DEFAULT_PORTION_TRAIN, DEFAULT_PORTION_VAL, options.seed)?;
        Ok(dataset)
    }

    /// Randomly re-partition all records into train/val/test groups,
    /// overwriting the previous assignment.
    ///
    /// The test portion is implicit (`1 - portion_train - portion_val`).
    /// Pass a seed for a reproducible partition.
    pub fn train_val_test_split(
        &mut self,
        portion_train: f64,
        portion_val: f64,
        seed: Option<u64>,
    ) -> Result<(), DatasetError> {
        let mut rng = DeterministicRng::from_seed_or_entropy(seed);
        self.splits = split_indices(self.records.len(), portion_train, portion_val, &mut rng)?;
        debug!(
            train = self.splits.train.len(),
            val = self.splits.val.len(),
            test = self.splits.test.len(),
            "re-partitioned records"
        );
        Ok(())
    }

    /// Append one auxiliary feature block.
    ///
    /// `files` must mirror the original input files: one feature file per
    /// class file (single-label) or exactly one (multi-label), each with one
    /// value per record of the matching file.
    pub fn load_features<P: AsRef<Path>>(
        &mut self,
        files: &[P],
        kind: FeatureKind,
    ) -> Result<(), DatasetError> {
        if files.len() != self.file_counts.len() {
            return Err(DatasetError::Configuration(format!(
                "feature file count ({}) must match the number of original \
                 input files ({})",
                files.len(),
                self.file_counts.len()
            )));
        }
        self.features.load_block(files, kind, &self.file_counts)
    }

    /// Stream batches for a group. The stream is infinite; callers decide
    /// how many batches to take.
    pub fn batches(
        &self,
        group: Group,
        options: BatchOptions,
    ) -> Result<BatchStream<'_>, DatasetError> {
        BatchStream::new(self, group, options)
    }

    /// Record indices of a group; `Group::All` is the full range in load
    /// order.
    pub fn group_indices(&self, group: Group) -> Vec<usize> {
        self.splits.resolve(group)
    }

    /// Label matrix rows for a group, shape `(group size, classes)`.
    pub fn labels(&self, group: Group) -> Array2<u8> {
        let indices = self.splits.resolve(group);
        self.labels.select(Axis(0), &indices)
    }

    /// Stacked record tensors and labels for a group, shapes
    /// `(group size, length, alphabet)` and `(group size, classes)`.
    pub fn data(&self, group: Group) -> (Array3<f32>, Array2<u8>) {
        let indices = self.splits.resolve(group);
        let (length, width) = self.shape();
        let mut inputs = Array3::zeros((indices.len(), length, width));
        for (slot, &record) in indices.iter().enumerate() {
            inputs
                .slice_mut(s![slot, .., ..])
                .assign(&self.records[record]);
        }
        (inputs, self.labels.select(Axis(0), &indices))
    }

    /// Decoded sequences of a class within a group (sequence-only datasets).
    pub fn sequences(&self, class_id: ClassIndex, group: Group) -> Result<Vec<String>, DatasetError> {
        let encoder = match &self.codec {
            Codec::Single(encoder) => encoder,
            Codec::Paired { .. } => {
                return Err(DatasetError::Configuration(
                    "sequences() applies to sequence-only datasets; use \
                     sequence_structure_pairs() for dual-alphabet data"
                        .to_string(),
                ));
            }
        };
        Ok(self
            .class_members(class_id, group)?
            .into_iter()
            .map(|index| encoder.decode(self.records[index].view()))
            .collect())
    }

    /// Decoded `(sequence, structure)` pairs of a class within a group
    /// (dual-alphabet string datasets; PWM-encoded records cannot be decoded
    /// back to discrete structure strings).
    pub fn sequence_structure_pairs(
        &self,
        class_id: ClassIndex,
        group: Group,
    ) -> Result<Vec<(String, String)>, DatasetError> {
        let joiner = match &self.codec {
            Codec::Paired { joiner, pwm: false } => joiner,
            Codec::Single(_) => {
                return Err(DatasetError::Configuration(
                    "sequence_structure_pairs() applies to dual-alphabet \
                     datasets"
                        .to_string(),
                ));
            }
            Codec::Paired { pwm: true, .. } => {
                return Err(DatasetError::Configuration(
                    "PWM-encoded structures cannot be decoded back to strings"
                        .to_string(),
                ));
            }
        };
        Ok(self
            .class_members(class_id, group)?
            .into_iter()
            .map(|index| joiner.decode_pair(self.records[index].view()))
            .collect())
    }

    fn class_members(
        &self,
        class_id: ClassIndex,
        group: Group,
    ) -> Result<Vec<usize>, DatasetError> {
        if class_id >= self.num_classes() {
            return Err(DatasetError::Configuration(format!(
                "class {class_id} does not exist; the dataset has {} classes",
                self.num_classes()
            )));
        }
        Ok(self
            .splits
            .resolve(group)
            .into_iter()
            .filter(|&index| self.labels[[index, class_id]] != 0)
            .collect())
    }

    /// Per-group, per-class record count table for human inspection.
    pub fn summary(&self) -> String {
        labels::summary_table(&self.labels, &self.splits)
    }

    /// Per-class weights proportional to `total / count`, normalized so the
    /// most frequent class gets 1.
    pub fn class_weights(&self) -> Vec<f64> {
        labels::class_weights(&self.labels)
    }

    /// Shape `(length, alphabet)` shared by every record tensor.
    pub fn shape(&self) -> (usize, usize) {
        self.records[0].dim()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset holds no records (never true after loading).
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of classes (1 + the largest class index seen at load time).
    pub fn num_classes(&self) -> usize {
        self.labels.ncols()
    }

    /// Whether records carry header-listed multi-label memberships.
    pub fn multilabel(&self) -> bool {
        self.multilabel
    }

    /// The encoded record tensors in load order.
    pub fn records(&self) -> &[Array2<f32>] {
        &self.records
    }

    /// The full label matrix, shape `(records, classes)`.
    pub fn label_matrix(&self) -> &Array2<u8> {
        &self.labels
    }

    /// The current split assignment.
    pub fn splits(&self) -> &SplitAssignment {
        &self.splits
    }

    /// The loaded auxiliary feature blocks.
    pub fn features(&self) -> &AuxFeatureStore {
        &self.features
    }

    /// Concatenated auxiliary feature vector of one record (empty when no
    /// blocks are loaded).
    pub fn feature_vector(&self, index: usize) -> Vec<f32> {
        self.features.feature_vector(index)
    }

    /// Total width of the concatenated auxiliary feature vector.
    pub fn aux_width(&self) -> usize {
        self.features.width()
    }
}
