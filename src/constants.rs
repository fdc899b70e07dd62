/// Constants governing alphabet validation.
pub mod alphabet {
    /// Punctuation characters allowed in alphabets besides ASCII uppercase
    /// alphanumerics.
    pub const SUPPORTED_PUNCTUATION: &str = "()[]{}<>,.|*";
}

/// Constants governing FASTA-style input parsing.
pub mod fasta {
    /// Marker character that starts a header line.
    pub const HEADER_MARKER: char = '>';
    /// File extension treated as gzip-compressed input.
    pub const GZIP_EXTENSION: &str = "gz";
    /// Separator between class indices in a multi-label header.
    pub const MULTILABEL_SEPARATOR: char = ',';
}

/// Constants governing auxiliary feature loading.
pub mod features {
    /// Maximum number of distinct levels a categorical feature may carry.
    pub const MAX_CATEGORIES: usize = 256;
}

/// Constants governing train/val/test partitioning.
pub mod splits {
    /// Portion of records assigned to training by the loader's initial split.
    pub const DEFAULT_PORTION_TRAIN: f64 = 0.7;
    /// Portion of records assigned to validation by the loader's initial split.
    pub const DEFAULT_PORTION_VAL: f64 = 0.15;
}
