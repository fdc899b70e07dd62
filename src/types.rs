/// Index of a class within the label space.
/// Example: `0` for the first class file passed to the loader.
pub type ClassIndex = usize;
/// Position of a record in the global record list.
/// Example: `17` addresses the 18th loaded FASTA entry.
pub type RecordIndex = usize;
/// Raw per-record class membership as listed in headers or implied by file
/// position. Example: `vec![0, 2]` for a header `>0,2`.
pub type LabelList = Vec<ClassIndex>;
/// Distinct value of a categorical auxiliary feature.
/// Examples: `exon`, `intron`, `utr`
pub type CategoryLevel = String;
