//! The reader collaborator contract.
//!
//! Binary/debug-info readers (DWARF, CTF, BTF, ELF-only) live outside this crate;
//! what lives here is the contract they implement: produce a [`Corpus`] plus a
//! [`ReadStatus`] bitmask describing how complete the extraction was. Missing
//! debug info is a status, not an error; the diff engine runs on whatever corpus
//! was producible and the caller decides whether a given status is fatal.
//!
//! [`ArtificialReader`] is the one in-tree implementation: it hands out a corpus
//! that was assembled programmatically, which is what tests and batch-comparison
//! tasks use.

use bitflags::bitflags;

use crate::ir::Corpus;
use crate::Result;

bitflags! {
    /// Outcome bitmask of a corpus read. The empty mask means the outcome is
    /// unknown.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ReadStatus: u32 {
        /// The read succeeded
        const OK = 1;
        /// The main debug info could not be located
        const DEBUG_INFO_NOT_FOUND = 1 << 1;
        /// The alternate (split) debug info could not be located
        const ALT_DEBUG_INFO_NOT_FOUND = 1 << 2;
        /// No ELF symbols were found in the binary
        const NO_SYMBOLS_FOUND = 1 << 3;
    }
}

impl ReadStatus {
    /// Whether the read produced a usable corpus.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.contains(ReadStatus::OK) && !self.contains(ReadStatus::NO_SYMBOLS_FOUND)
    }
}

/// A producer of ABI corpora.
///
/// Readers must populate translation units, the ELF symbol tables (with
/// defined/public flags), soname, needed-library list and architecture string.
/// Partial failures are reported through the status mask, not through `Err`;
/// `Err` is reserved for conditions that prevented producing any corpus at all.
pub trait CorpusReader {
    /// Produce the corpus and the status of its extraction.
    fn read_corpus(&mut self) -> Result<(Corpus, ReadStatus)>;
}

/// A reader over a corpus that was already assembled in memory.
pub struct ArtificialReader {
    corpus: Option<Corpus>,
}

impl ArtificialReader {
    /// Wrap an assembled corpus.
    #[must_use]
    pub fn new(corpus: Corpus) -> Self {
        ArtificialReader { corpus: Some(corpus) }
    }
}

impl CorpusReader for ArtificialReader {
    fn read_corpus(&mut self) -> Result<(Corpus, ReadStatus)> {
        let corpus = self
            .corpus
            .take()
            .ok_or_else(|| crate::Error::Error("artificial corpus already consumed".to_string()))?;
        let mut status = ReadStatus::OK;
        if corpus.require_symbols().is_err() {
            status |= ReadStatus::NO_SYMBOLS_FOUND;
        }
        Ok((corpus, status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Corpus, CorpusOrigin};
    use crate::test::factories::TestEnv;

    #[test]
    fn test_empty_corpus_reports_no_symbols() {
        let env = TestEnv::new();
        let corpus = Corpus::new(env.env_rc(), CorpusOrigin::Artificial, "empty.so");
        let mut reader = ArtificialReader::new(corpus);

        let (_, status) = reader.read_corpus().unwrap();
        assert!(status.contains(ReadStatus::NO_SYMBOLS_FOUND));
        assert!(!status.is_usable());
    }

    #[test]
    fn test_reader_consumed_once() {
        let env = TestEnv::new();
        let corpus = Corpus::new(env.env_rc(), CorpusOrigin::Artificial, "empty.so");
        let mut reader = ArtificialReader::new(corpus);
        let _ = reader.read_corpus().unwrap();
        assert!(reader.read_corpus().is_err());
    }
}
