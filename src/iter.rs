//! An `Iterator`-flavored sugar layer over each reader's `next()`.
//!
//! `next()` returns views borrowed from the reader, which Rust's `Iterator`
//! trait cannot express directly (no stable lending iterators). `.records()`
//! instead yields owned records, stopping at the first `Ok(None)` or the
//! first `Err` — iteration cannot be restarted after either.

use crate::bam::{BamReader, BamRecord};
use crate::bcf::{BcfReader, BcfRecord};
use crate::error::Result;
use crate::fasta::{FastaReader, FastaRecord};
use crate::fastq::{FastqReader, FastqRecord};
use crate::source::ByteSource;
use crate::vcf::{VcfReader, VcfRecord};

/// Implemented by every reader in this crate; bridges its borrowed `next()`
/// to the owned item type `.records()` yields.
pub trait RecordSource {
    type Owned;
    fn next_owned(&mut self) -> Result<Option<Self::Owned>>;
}

impl<S: ByteSource> RecordSource for FastaReader<S> {
    type Owned = FastaRecord;
    fn next_owned(&mut self) -> Result<Option<FastaRecord>> {
        Ok(self.next()?.map(|view| view.to_owned()))
    }
}

impl<S: ByteSource> RecordSource for FastqReader<S> {
    type Owned = FastqRecord;
    fn next_owned(&mut self) -> Result<Option<FastqRecord>> {
        Ok(self.next()?.map(|view| view.to_owned()))
    }
}

impl<S: ByteSource> RecordSource for VcfReader<S> {
    type Owned = VcfRecord;
    fn next_owned(&mut self) -> Result<Option<VcfRecord>> {
        Ok(self.next()?.map(|view| view.to_owned()))
    }
}

impl<S: ByteSource> RecordSource for BamReader<S> {
    type Owned = BamRecord;
    fn next_owned(&mut self) -> Result<Option<BamRecord>> {
        Ok(self.next()?.map(|view| view.to_owned()))
    }
}

impl<S: ByteSource> RecordSource for BcfReader<S> {
    type Owned = BcfRecord;
    fn next_owned(&mut self) -> Result<Option<BcfRecord>> {
        Ok(self.next()?.map(|view| view.to_owned()))
    }
}

/// A single-pass, non-restartable sequence of owned records, produced by
/// [`IntoRecords::records`].
pub struct Records<'r, T> {
    source: &'r mut T,
    done: bool,
}

impl<'r, T: RecordSource> Iterator for Records<'r, T> {
    type Item = Result<T::Owned>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.source.next_owned() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Extension trait adding `.records()` to every [`RecordSource`] reader.
pub trait IntoRecords: RecordSource + Sized {
    fn records(&mut self) -> Records<'_, Self> {
        Records {
            source: self,
            done: false,
        }
    }
}

impl<T: RecordSource> IntoRecords for T {}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::SeqioError;

    #[test]
    fn fasta_records_stops_at_end() -> anyhow::Result<()> {
        let mut r = FastaReader::new(std::io::Cursor::new(b">a\nAC\n>b\nGT\n".to_vec()));
        let ids: Vec<Vec<u8>> = r.records().collect::<Result<Vec<_>>>()?.into_iter().map(|rec| rec.id).collect();
        assert_eq!(ids, vec![b"a".to_vec(), b"b".to_vec()]);
        Ok(())
    }

    #[test]
    fn fastq_records_propagates_error_then_stops() {
        let mut r = FastqReader::new(std::io::Cursor::new(b"@r\nAC\n+\n!\n".to_vec()));
        let results: Vec<_> = r.records().collect();
        assert_eq!(results.len(), 1);
        match &results[0] {
            Err(SeqioError::Malformed(_)) => {}
            other => panic!("expected Malformed seq/qual mismatch, got {other:?}"),
        }
    }
}
