//! Alphabet-aware one-hot encoding of sequence and structure strings.
//!
//! An [`Alphabet`] is an ordered, deduplicated set of symbols. The
//! [`OneHotEncoder`] maps strings over one alphabet to `(length, |alphabet|)`
//! matrices, and the [`AlphabetJoiner`] pairs a sequence alphabet with a
//! structure alphabet into a joint product alphabet so that a
//! `(sequence, structure)` pair encodes into a single one-hot stream.

use std::collections::HashMap;
use std::fmt;

use ndarray::{s, Array2, ArrayView1, ArrayView2};
use rand::seq::IndexedRandom;
use rand::Rng;

use crate::constants::alphabet::SUPPORTED_PUNCTUATION;
use crate::errors::DatasetError;

/// Ordered, deduplicated sequence of single symbols.
///
/// Supported symbols are ASCII uppercase alphanumerics plus the punctuation
/// set `()[]{}<>,.|*`. Construction fails on anything else.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alphabet {
    symbols: Vec<char>,
    index: HashMap<char, usize>,
}

impl Alphabet {
    /// Build an alphabet from a symbol string, deduplicating while
    /// preserving first-appearance order.
    pub fn new(spec: &str) -> Result<Self, DatasetError> {
        let mut symbols = Vec::new();
        let mut index = HashMap::new();
        for ch in spec.chars() {
            if !is_supported_symbol(ch) {
                return Err(DatasetError::Configuration(format!(
                    "unsupported alphabet character '{ch}' (allowed: uppercase \
                     alphanumerics and \"{SUPPORTED_PUNCTUATION}\")"
                )));
            }
            if !index.contains_key(&ch) {
                index.insert(ch, symbols.len());
                symbols.push(ch);
            }
        }
        if symbols.is_empty() {
            return Err(DatasetError::Configuration(
                "alphabet must contain at least one symbol".to_string(),
            ));
        }
        Ok(Self { symbols, index })
    }

    /// Number of symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether the alphabet has no symbols (never true for a constructed one).
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Whether `symbol` belongs to the alphabet.
    pub fn contains(&self, symbol: char) -> bool {
        self.index.contains_key(&symbol)
    }

    /// Column index of `symbol`, if present.
    pub fn index_of(&self, symbol: char) -> Option<usize> {
        self.index.get(&symbol).copied()
    }

    /// Symbol at column `index`.
    ///
    /// # Panics
    /// Panics if `index >= self.len()`.
    pub fn symbol(&self, index: usize) -> char {
        self.symbols[index]
    }

    /// The symbols in column order.
    pub fn symbols(&self) -> &[char] {
        &self.symbols
    }

    /// Whether the two alphabets share no symbols.
    pub fn is_disjoint(&self, other: &Alphabet) -> bool {
        self.symbols.iter().all(|ch| !other.contains(*ch))
    }

    /// Replace every character of `text` that is not in the alphabet with a
    /// symbol drawn independently and uniformly at random.
    ///
    /// This is the lossy repair step applied by the loader; in-alphabet
    /// characters pass through untouched.
    pub fn repair<R: Rng>(&self, text: &str, rng: &mut R) -> String {
        text.chars()
            .map(|ch| {
                if self.contains(ch) {
                    ch
                } else {
                    *self
                        .symbols
                        .choose(rng)
                        .expect("alphabet is non-empty by construction")
                }
            })
            .collect()
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ch in &self.symbols {
            write!(f, "{ch}")?;
        }
        Ok(())
    }
}

fn is_supported_symbol(ch: char) -> bool {
    (ch.is_ascii_uppercase() || ch.is_ascii_digit()) || SUPPORTED_PUNCTUATION.contains(ch)
}

/// Index of the first maximum entry in a row.
fn argmax(row: ArrayView1<'_, f32>) -> usize {
    let mut best = 0;
    let mut best_value = f32::NEG_INFINITY;
    for (idx, value) in row.iter().enumerate() {
        if *value > best_value {
            best = idx;
            best_value = *value;
        }
    }
    best
}

/// One-hot codec over a single alphabet.
#[derive(Clone, Debug)]
pub struct OneHotEncoder {
    alphabet: Alphabet,
}

impl OneHotEncoder {
    /// Wrap an existing alphabet.
    pub fn new(alphabet: Alphabet) -> Self {
        Self { alphabet }
    }

    /// Build the alphabet from a symbol string and wrap it.
    pub fn from_spec(spec: &str) -> Result<Self, DatasetError> {
        Alphabet::new(spec).map(Self::new)
    }

    /// The underlying alphabet.
    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    /// Encode `sequence` into a `(length, |alphabet|)` one-hot matrix.
    ///
    /// Every character must belong to the alphabet; the loader repairs
    /// out-of-alphabet characters before calling this.
    pub fn encode(&self, sequence: &str) -> Result<Array2<f32>, DatasetError> {
        let chars: Vec<char> = sequence.chars().collect();
        let mut encoded = Array2::zeros((chars.len(), self.alphabet.len()));
        for (row, ch) in chars.iter().enumerate() {
            let column = self.alphabet.index_of(*ch).ok_or_else(|| {
                DatasetError::DataConsistency(format!(
                    "cannot encode character '{ch}' outside alphabet \"{}\"",
                    self.alphabet
                ))
            })?;
            encoded[[row, column]] = 1.0;
        }
        Ok(encoded)
    }

    /// Decode a one-hot matrix back into a string, taking the argmax of each
    /// row when a row is not strictly one-hot.
    pub fn decode(&self, encoded: ArrayView2<'_, f32>) -> String {
        encoded
            .rows()
            .into_iter()
            .map(|row| self.alphabet.symbol(argmax(row)))
            .collect()
    }
}

/// Codec over the Cartesian product of a sequence and a structure alphabet.
///
/// The joint alphabet has `|primary| * |secondary|` columns; a position
/// carrying sequence symbol `p` and structure symbol `s` maps to column
/// `index_of(p) * |secondary| + index_of(s)`.
#[derive(Clone, Debug)]
pub struct AlphabetJoiner {
    primary: Alphabet,
    secondary: Alphabet,
}

impl AlphabetJoiner {
    /// Build the joint codec from two symbol strings.
    ///
    /// The alphabets must not share characters; the loader relies on
    /// disjointness to tell sequence and structure symbols apart.
    pub fn new(primary: &str, secondary: &str) -> Result<Self, DatasetError> {
        let primary = Alphabet::new(primary)?;
        let secondary = Alphabet::new(secondary)?;
        if !primary.is_disjoint(&secondary) {
            return Err(DatasetError::Configuration(format!(
                "sequence alphabet \"{primary}\" and structure alphabet \
                 \"{secondary}\" must not share characters"
            )));
        }
        Ok(Self { primary, secondary })
    }

    /// The sequence alphabet.
    pub fn primary(&self) -> &Alphabet {
        &self.primary
    }

    /// The structure alphabet.
    pub fn secondary(&self) -> &Alphabet {
        &self.secondary
    }

    /// Size of the joint alphabet.
    pub fn joint_len(&self) -> usize {
        self.primary.len() * self.secondary.len()
    }

    /// Encode a position-paired `(sequence, structure)` string pair into a
    /// `(length, joint_len)` one-hot matrix.
    pub fn encode_pair(
        &self,
        sequence: &str,
        structure: &str,
    ) -> Result<Array2<f32>, DatasetError> {
        let seq_chars: Vec<char> = sequence.chars().collect();
        let struct_chars: Vec<char> = structure.chars().collect();
        if seq_chars.len() != struct_chars.len() {
            return Err(DatasetError::DataConsistency(format!(
                "sequence length {} does not match structure length {}",
                seq_chars.len(),
                struct_chars.len()
            )));
        }
        let mut encoded = Array2::zeros((seq_chars.len(), self.joint_len()));
        for (row, (seq_ch, struct_ch)) in seq_chars.iter().zip(&struct_chars).enumerate() {
            encoded[[row, self.joint_index(*seq_ch, *struct_ch)?]] = 1.0;
        }
        Ok(encoded)
    }

    /// Decode a joint one-hot matrix back into its `(sequence, structure)`
    /// pair, taking the argmax of each row.
    pub fn decode_pair(&self, encoded: ArrayView2<'_, f32>) -> (String, String) {
        let mut sequence = String::new();
        let mut structure = String::new();
        for row in encoded.rows() {
            let column = argmax(row);
            sequence.push(self.primary.symbol(column / self.secondary.len()));
            structure.push(self.secondary.symbol(column % self.secondary.len()));
        }
        (sequence, structure)
    }

    /// Encode a sequence whose structure is a position-weight matrix of
    /// shape `(length, |secondary|)`.
    ///
    /// Each output row carries the PWM row in the column slice belonging to
    /// that position's sequence symbol; all other slices stay zero. PWM rows
    /// are expected to sum to 1, but this is a documented precondition and
    /// is not enforced.
    pub fn encode_pwm(
        &self,
        sequence: &str,
        pwm: &Array2<f32>,
    ) -> Result<Array2<f32>, DatasetError> {
        let seq_chars: Vec<char> = sequence.chars().collect();
        if pwm.nrows() != seq_chars.len() {
            return Err(DatasetError::DataConsistency(format!(
                "position-weight matrix has {} rows for a sequence of length {}",
                pwm.nrows(),
                seq_chars.len()
            )));
        }
        if pwm.ncols() != self.secondary.len() {
            return Err(DatasetError::DataConsistency(format!(
                "position-weight matrix has {} columns, structure alphabet \
                 \"{}\" needs {}",
                pwm.ncols(),
                self.secondary,
                self.secondary.len()
            )));
        }
        let span = self.secondary.len();
        let mut encoded = Array2::zeros((seq_chars.len(), self.joint_len()));
        for (row, seq_ch) in seq_chars.iter().enumerate() {
            let base = self.primary_offset(*seq_ch)?;
            encoded
                .slice_mut(s![row, base..base + span])
                .assign(&pwm.row(row));
        }
        Ok(encoded)
    }

    fn joint_index(&self, seq_symbol: char, struct_symbol: char) -> Result<usize, DatasetError> {
        let offset = self.primary_offset(seq_symbol)?;
        let struct_idx = self.secondary.index_of(struct_symbol).ok_or_else(|| {
            DatasetError::DataConsistency(format!(
                "cannot encode structure character '{struct_symbol}' outside \
                 alphabet \"{}\"",
                self.secondary
            ))
        })?;
        Ok(offset + struct_idx)
    }

    fn primary_offset(&self, seq_symbol: char) -> Result<usize, DatasetError> {
        let seq_idx = self.primary.index_of(seq_symbol).ok_or_else(|| {
            DatasetError::DataConsistency(format!(
                "cannot encode sequence character '{seq_symbol}' outside \
                 alphabet \"{}\"",
                self.primary
            ))
        })?;
        Ok(seq_idx * self.secondary.len())
    }
}
