//! FASTA-style block parsing and transparent text input.
//!
//! Input files use a single-line FASTA variant: a header line starting with
//! `>`, followed by the record's content lines (sequence, and in dual mode a
//! structure line or several PWM rows). The parser groups lines into blocks
//! and leaves interpretation to the loader.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::constants::fasta::{GZIP_EXTENSION, HEADER_MARKER};
use crate::errors::DatasetError;

/// One FASTA entry: the header text (marker stripped) and the raw content
/// lines up to the next header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FastaBlock {
    /// Header text without the leading marker, trimmed.
    pub header: String,
    /// Content lines belonging to this entry, in file order.
    pub lines: Vec<String>,
}

/// Open a text file for buffered reading, decompressing transparently when
/// the path carries a `.gz` extension.
pub fn open_text(path: &Path) -> Result<Box<dyn BufRead>, DatasetError> {
    let file = File::open(path)?;
    let is_gzip = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(GZIP_EXTENSION))
        .unwrap_or(false);
    if is_gzip {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Parse an open text handle into FASTA blocks.
///
/// Blank lines are skipped; content before the first header is a parse
/// error.
pub fn parse_blocks<R: BufRead>(reader: R) -> Result<Vec<FastaBlock>, DatasetError> {
    let mut blocks: Vec<FastaBlock> = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(header) = trimmed.strip_prefix(HEADER_MARKER) {
            blocks.push(FastaBlock {
                header: header.trim().to_string(),
                lines: Vec::new(),
            });
        } else {
            match blocks.last_mut() {
                Some(block) => block.lines.push(trimmed.to_string()),
                None => {
                    return Err(DatasetError::Parse(format!(
                        "content line \"{trimmed}\" appears before the first \
                         '{HEADER_MARKER}' header"
                    )));
                }
            }
        }
    }
    Ok(blocks)
}
