/// Provides a trait and implementation for reading coordinate-sorted BAM files
/// as a seekable stream of records using the `rust-htslib` crate.
///
/// # Overview
/// - Defines the `AlignmentReader` trait, a cursor over BAM records that can
///   report and restore its position as a BGZF virtual offset.
/// - Implements `AlignmentReader` for `HtslibAlignmentReader`, a wrapper around
///   `rust_htslib::bam::Reader`.
/// - Defines `RecordSpan`, the (reference, start, end) key of a record used by
///   the index and the depth counter.
/// - Includes a mock implementation for testing purposes.
///
/// # Testing
/// Includes a `MockAlignmentReader` for unit testing code that depends on the
/// `AlignmentReader` trait. Its offsets are record indices.
///
/// # Example
/// ```ignore
/// use crate::bam::{next_span, AlignmentReader, HtslibAlignmentReader};
/// let mut reader = HtslibAlignmentReader::from_path(&bam_path)?;
/// let mut record = Record::new();
/// while let Some(span) = next_span(&mut reader, &mut record)? {
///     // process span
/// }
/// ```
use crate::errors::Result;
use crate::reference::GenomicCoordinate;
use rust_htslib::bam::{self, HeaderView, Read, Record};
use std::path::Path;

/// A trait for reading BAM files as a seekable, coordinate-ordered stream.
///
/// # Required Methods
/// - `header(&self) -> &HeaderView`: Returns a reference to the BAM header.
/// - `tell(&self) -> u64`: Offset of the next record to be read.
/// - `seek(&mut self, offset)`: Moves the cursor to an offset obtained from `tell`.
/// - `read(&mut self, record)`: Reads the next record, `None` at end of file.
/// - `set_threads(&mut self, n)`: Sets the number of decompression threads.
pub trait AlignmentReader {
    /// Returns a reference to the BAM header
    fn header(&self) -> &HeaderView;

    /// Returns the offset of the next record
    fn tell(&self) -> u64;

    /// Moves the cursor to an offset previously returned by `tell`
    fn seek(&mut self, offset: u64) -> std::result::Result<(), rust_htslib::errors::Error>;

    /// Reads the next record into `record`
    fn read(
        &mut self,
        record: &mut Record,
    ) -> Option<std::result::Result<(), rust_htslib::errors::Error>>;

    /// Sets the number of threads to use for reading
    fn set_threads(&mut self, n: usize) -> std::result::Result<(), rust_htslib::errors::Error>;
}

/// BAM reader implementation using rust-htslib's sequential Reader. Offsets
/// are BGZF virtual offsets.
pub struct HtslibAlignmentReader {
    reader: bam::Reader,
}

impl HtslibAlignmentReader {
    /// Create a new HtslibAlignmentReader from a file path
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = bam::Reader::from_path(path)?;
        Ok(Self { reader })
    }
}

impl AlignmentReader for HtslibAlignmentReader {
    fn header(&self) -> &HeaderView {
        self.reader.header()
    }

    fn tell(&self) -> u64 {
        self.reader.tell() as u64
    }

    fn seek(&mut self, offset: u64) -> std::result::Result<(), rust_htslib::errors::Error> {
        self.reader.seek(offset as i64)
    }

    fn read(
        &mut self,
        record: &mut Record,
    ) -> Option<std::result::Result<(), rust_htslib::errors::Error>> {
        Read::read(&mut self.reader, record)
    }

    fn set_threads(&mut self, n: usize) -> std::result::Result<(), rust_htslib::errors::Error> {
        self.reader.set_threads(n)
    }
}

/// The ordering key of a record together with the end of its alignment.
///
/// `end` is exclusive and always greater than `pos`, so records without an
/// alignment still cover their own start position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSpan {
    pub tid: u32,
    pub pos: u64,
    pub end: u64,
}

impl RecordSpan {
    /// Returns `None` for records without a reference (the unmapped tail of a
    /// sorted file).
    pub fn from_record(record: &Record) -> Option<Self> {
        if record.tid() < 0 || record.pos() < 0 {
            return None;
        }
        let pos = record.pos() as u64;
        let end = record.cigar().end_pos().max(record.pos() + 1) as u64;
        Some(Self {
            tid: record.tid() as u32,
            pos,
            end,
        })
    }

    pub fn key(&self) -> GenomicCoordinate {
        GenomicCoordinate::new(self.tid, self.pos)
    }

    /// True when the record covers `target` or starts after it.
    pub fn reaches(&self, target: &GenomicCoordinate) -> bool {
        self.tid > target.tid || (self.tid == target.tid && self.end > target.pos)
    }
}

/// Reads the next placed record from `reader`.
///
/// Returns `Ok(None)` at end of file and at the first unplaced record, which
/// in a coordinate sorted file marks the end of the mapped content.
pub fn next_span<R: AlignmentReader>(
    reader: &mut R,
    record: &mut Record,
) -> Result<Option<RecordSpan>> {
    match reader.read(record) {
        None => Ok(None),
        Some(result) => {
            result?;
            Ok(RecordSpan::from_record(record))
        }
    }
}

/// Mock implementation of `AlignmentReader` for testing purposes.
///
/// This struct simulates a coordinate-sorted BAM file held in memory. The
/// offset of each record is its index in the vector, which keeps offsets
/// monotonic like BGZF virtual offsets.
///
/// # Example
/// ```ignore
/// use crate::bam::{create_mock_record, MockAlignmentReader};
///
/// let records = vec![create_mock_record(0, 10, 5, "read1")];
/// let mut reader = MockAlignmentReader::new(records, &[("chr1", 100)]);
/// ```
#[cfg(test)]
pub struct MockAlignmentReader {
    records: Vec<Record>,
    header: HeaderView,
    cursor: usize,
}

#[cfg(test)]
impl MockAlignmentReader {
    /// Create a new MockAlignmentReader from records and (name, length) pairs
    pub fn new(records: Vec<Record>, references: &[(&str, u64)]) -> Self {
        Self {
            records,
            header: HeaderView::from_header(&mock_header(references)),
            cursor: 0,
        }
    }
}

#[cfg(test)]
impl AlignmentReader for MockAlignmentReader {
    fn header(&self) -> &HeaderView {
        &self.header
    }

    fn tell(&self) -> u64 {
        self.cursor as u64
    }

    fn seek(&mut self, offset: u64) -> std::result::Result<(), rust_htslib::errors::Error> {
        if offset as usize > self.records.len() {
            return Err(rust_htslib::errors::Error::Fetch);
        }
        self.cursor = offset as usize;
        Ok(())
    }

    fn read(
        &mut self,
        record: &mut Record,
    ) -> Option<std::result::Result<(), rust_htslib::errors::Error>> {
        let next = self.records.get(self.cursor)?;
        *record = next.clone();
        self.cursor += 1;
        Some(Ok(()))
    }

    /// Mock set_threads does nothing and always returns Ok
    fn set_threads(&mut self, _n: usize) -> std::result::Result<(), rust_htslib::errors::Error> {
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn mock_header(references: &[(&str, u64)]) -> bam::Header {
    let mut header = bam::Header::new();
    for (name, len) in references {
        let mut sq = bam::header::HeaderRecord::new(b"SQ");
        sq.push_tag(b"SN", &name.to_string());
        sq.push_tag(b"LN", &len.to_string());
        header.push_record(&sq);
    }
    header
}

#[cfg(test)]
pub(crate) fn create_mock_record(tid: i32, pos: i64, len: u32, qname: &str) -> Record {
    let mut record = Record::new();
    let cigar_string =
        rust_htslib::bam::record::CigarString(vec![rust_htslib::bam::record::Cigar::Match(len)]);
    let seq = vec![b'A'; len as usize];
    let qual = vec![30u8; len as usize];
    record.set(qname.as_bytes(), Some(&cigar_string), &seq, &qual);
    record.set_tid(tid);
    record.set_pos(pos);
    record.set_mtid(-1);
    record.set_mpos(-1);
    record.set_mapq(60);
    record.unset_unmapped();
    record
}

/// Records stacked `depth` deep at every position of every reference, each
/// covering a single base.
#[cfg(test)]
pub(crate) fn uniform_records(references: &[(&str, u64)], depth: usize) -> Vec<Record> {
    let mut records = Vec::new();
    for (tid, (_, len)) in references.iter().enumerate() {
        for pos in 0..*len {
            for i in 0..depth {
                let qname = format!("r{tid}_{pos}_{i}");
                records.push(create_mock_record(tid as i32, pos as i64, 1, &qname));
            }
        }
    }
    records
}
