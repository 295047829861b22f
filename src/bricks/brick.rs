//! Basic part records and the streaming reader for the registry's FASTA dump
//!
//! The dump is a sequence of blocks:
//!
//! ```text
//! >BBa_B0034 Released 151 RBS "RBS (Elowitz 1999) -- defines RBSs"
//! aaagaggagaaa
//!
//! >BBa_B0010 Released 187 Terminator "T1 from E. coli rrnB"
//! ccaggcatcaaataaaacgaaaggctcagtcgaaagactgggcctttcgttttatctgttgtttgtcggtgaacgctctc
//! ```
//!
//! The header carries the abstract (`name status id type "description"`),
//! every following non-empty line is part of the sequence.

use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use std::io::BufRead;

/// Marker starting every header line
pub const HEADER_PREFIX: char = '>';

/// One catalog entry, as found in the bulk dump
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Biobrick {
    pub part_name: String,
    pub status: String,
    pub id: i64,
    #[serde(rename = "type")]
    pub part_type: String,
    pub description: String,
    pub sequence: String,
}

/// Header fields of a block, before the sequence is read
struct Abstract {
    part_name: String,
    status: String,
    id: i64,
    part_type: String,
    description: String,
}

impl Abstract {
    fn parse(text: &str, line: usize) -> Result<Self, ParseError> {
        let parts: Vec<&str> = text.splitn(5, ' ').collect();
        if parts.len() < 5 {
            return Err(ParseError::TooFewFields {
                line,
                found: parts.len(),
                text: text.to_string(),
            });
        }

        let id = parts[2].parse::<i64>().map_err(|_| ParseError::InvalidId {
            line,
            value: parts[2].to_string(),
        })?;

        let quoted = parts[4];
        let description = quoted.strip_prefix('"').unwrap_or(quoted);
        let description = description.strip_suffix('"').unwrap_or(description);

        Ok(Self {
            part_name: parts[0].to_string(),
            status: parts[1].to_string(),
            id,
            part_type: parts[3].to_string(),
            description: description.to_string(),
        })
    }
}

/// Forward-only reader producing one [`Biobrick`] per block.
///
/// Restart by constructing a new reader over a re-opened stream.
pub struct BiobrickReader<R> {
    inner: R,
    line: usize,
    buf: Vec<u8>,
    failed: bool,
}

impl<R: BufRead> BiobrickReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line: 0,
            buf: Vec::new(),
            failed: false,
        }
    }

    /// Line number of the last line consumed (1-based)
    pub fn line(&self) -> usize {
        self.line
    }

    /// Read the next record.
    ///
    /// Returns `Ok(None)` at a clean end of stream.
    pub fn read(&mut self) -> Result<Option<Biobrick>, ParseError> {
        // Blank lines between blocks are tolerated
        let header = loop {
            match self.next_line()? {
                None => return Ok(None),
                Some(text) if text.is_empty() => continue,
                Some(text) => break text,
            }
        };

        let header_line = self.line;
        let text = header
            .strip_prefix(HEADER_PREFIX)
            .ok_or(ParseError::MissingPrefix { line: header_line })?;
        let abstract_ = Abstract::parse(text, header_line)?;

        let mut sequence = String::new();
        while let Some(text) = self.next_line()? {
            if text.is_empty() {
                break;
            }
            sequence.push_str(&text);
        }

        Ok(Some(Biobrick {
            part_name: abstract_.part_name,
            status: abstract_.status,
            id: abstract_.id,
            part_type: abstract_.part_type,
            description: abstract_.description,
            sequence,
        }))
    }

    /// Bytes that are not valid UTF-8 are replaced, never rejected
    fn next_line(&mut self) -> Result<Option<String>, ParseError> {
        self.buf.clear();
        if self.inner.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        self.line += 1;
        while matches!(self.buf.last(), Some(b'\n' | b'\r')) {
            self.buf.pop();
        }
        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }
}

impl<R: BufRead> Iterator for BiobrickReader<R> {
    type Item = Result<Biobrick, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.read() {
            Ok(Some(brick)) => Some(Ok(brick)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
