//! # Index Module
//!
//! A coarse spatial index over a coordinate sorted BAM file.
//!
//! The file is cut into blocks of consecutive records that never span two
//! references. Each block becomes an `IndexNode` in a flat arena holding the
//! offset of the block's first record and the largest alignment end seen so
//! far on the reference, in the manner of an augmented interval list's
//! running `max_ends`. Because that running maximum never decreases, the
//! first block that may hold a record overlapping a position is found by
//! binary search.
use crate::bam::{next_span, AlignmentReader, RecordSpan};
use crate::errors::{Error, Result};
use rust_htslib::bam::Record;
use std::ops::Range;

/// Default number of records per index block.
pub const DEFAULT_BLOCK_SIZE: usize = 64;

/// Maps a query interval to a file offset.
pub trait SpatialIndex {
    /// Offset at or before the first record that could overlap the half-open
    /// interval `[beg, end)` on reference `tid`. A degenerate interval with
    /// `beg == end` queries the single position `beg`.
    ///
    /// Returns `None` when no indexed record on `tid` reaches `beg`.
    fn coarse_offset(&self, tid: u32, beg: u64, end: u64) -> Option<u64>;
}

/// One block of records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexNode {
    /// Offset of the first record in the block.
    pub offset: u64,
    /// Start of the first record in the block.
    pub start: u64,
    /// Largest alignment end of any record on this reference up to and
    /// including this block.
    pub max_end: u64,
}

#[derive(Debug, Clone, Default)]
pub struct IntervalIndex {
    nodes: Vec<IndexNode>,
    references: Vec<Range<usize>>,
    records: u64,
}

impl IntervalIndex {
    /// Builds the index in one forward pass from the reader's current
    /// position, stopping at end of file or at the unplaced tail.
    ///
    /// # Errors
    /// - `Unsorted` if the records are not in coordinate order.
    pub fn build<R: AlignmentReader>(reader: &mut R, block_size: usize) -> Result<Self> {
        let block_size = block_size.max(1);
        let mut builder = IndexBuilder::new(block_size);
        let mut record = Record::new();
        loop {
            let offset = reader.tell();
            match next_span(reader, &mut record)? {
                Some(span) => builder.push(offset, span)?,
                None => break,
            }
        }
        Ok(builder.finish())
    }

    /// Number of blocks in the index.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of records seen while building.
    pub fn record_count(&self) -> u64 {
        self.records
    }

    /// The blocks of reference `tid` in file order.
    pub fn nodes(&self, tid: u32) -> &[IndexNode] {
        match self.references.get(tid as usize) {
            Some(range) => &self.nodes[range.clone()],
            None => &[],
        }
    }
}

impl SpatialIndex for IntervalIndex {
    fn coarse_offset(&self, tid: u32, beg: u64, _end: u64) -> Option<u64> {
        let nodes = self.nodes(tid);
        let i = nodes.partition_point(|node| node.max_end <= beg);
        nodes.get(i).map(|node| node.offset)
    }
}

struct IndexBuilder {
    block_size: usize,
    nodes: Vec<IndexNode>,
    references: Vec<Range<usize>>,
    records: u64,
    in_block: usize,
    last: Option<RecordSpan>,
}

impl IndexBuilder {
    fn new(block_size: usize) -> Self {
        Self {
            block_size,
            nodes: Vec::new(),
            references: Vec::new(),
            records: 0,
            in_block: 0,
            last: None,
        }
    }

    fn push(&mut self, offset: u64, span: RecordSpan) -> Result<()> {
        let new_reference = match self.last {
            Some(prev) if span.key() < prev.key() => {
                return Err(Error::Unsorted {
                    tid: span.tid,
                    pos: span.pos,
                    prev_tid: prev.tid,
                    prev_pos: prev.pos,
                });
            }
            Some(prev) => prev.tid != span.tid,
            None => true,
        };

        if new_reference {
            // references without records keep an empty range
            let start = self.nodes.len();
            self.references.resize(span.tid as usize, start..start);
            self.references.push(start..start);
        }

        if new_reference || self.in_block == self.block_size {
            let max_end = match self.nodes.last() {
                Some(node) if !new_reference => node.max_end.max(span.end),
                _ => span.end,
            };
            self.nodes.push(IndexNode {
                offset,
                start: span.pos,
                max_end,
            });
            self.in_block = 0;
        } else if let Some(node) = self.nodes.last_mut() {
            node.max_end = node.max_end.max(span.end);
        }

        if let Some(range) = self.references.last_mut() {
            range.end = self.nodes.len();
        }
        self.in_block += 1;
        self.records += 1;
        self.last = Some(span);
        Ok(())
    }

    fn finish(self) -> IntervalIndex {
        IntervalIndex {
            nodes: self.nodes,
            references: self.references,
            records: self.records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bam::{create_mock_record, uniform_records, MockAlignmentReader};

    #[test]
    fn test_build_empty() {
        let mut reader = MockAlignmentReader::new(vec![], &[("chr1", 100)]);
        let index = IntervalIndex::build(&mut reader, 4).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.coarse_offset(0, 10, 10), None);
    }

    #[test]
    fn test_blocks_split_on_size_and_reference() {
        let records = uniform_records(&[("chr1", 5), ("chr2", 3)], 1);
        let mut reader = MockAlignmentReader::new(records, &[("chr1", 5), ("chr2", 3)]);
        let index = IntervalIndex::build(&mut reader, 2).unwrap();
        assert_eq!(index.record_count(), 8);
        let offsets: Vec<u64> = index.nodes(0).iter().map(|n| n.offset).collect();
        assert_eq!(offsets, vec![0, 2, 4]);
        let offsets: Vec<u64> = index.nodes(1).iter().map(|n| n.offset).collect();
        assert_eq!(offsets, vec![5, 7]);
        assert_eq!(index.len(), 5);
    }

    #[test]
    fn test_running_max_end() {
        let records = vec![
            create_mock_record(0, 0, 50, "long"),
            create_mock_record(0, 1, 1, "a"),
            create_mock_record(0, 10, 1, "b"),
            create_mock_record(0, 11, 1, "c"),
        ];
        let mut reader = MockAlignmentReader::new(records, &[("chr1", 100)]);
        let index = IntervalIndex::build(&mut reader, 2).unwrap();
        let max_ends: Vec<u64> = index.nodes(0).iter().map(|n| n.max_end).collect();
        assert_eq!(max_ends, vec![50, 50]);
        // the long read in the first block still overlaps position 20
        assert_eq!(index.coarse_offset(0, 20, 20), Some(0));
        assert_eq!(index.coarse_offset(0, 50, 50), None);
    }

    #[test]
    fn test_coarse_offset_never_after_first_overlap() {
        let records = uniform_records(&[("chr1", 20)], 2);
        let mut reader = MockAlignmentReader::new(records, &[("chr1", 20)]);
        let index = IntervalIndex::build(&mut reader, 3).unwrap();
        for pos in 0..20u64 {
            let offset = index.coarse_offset(0, pos, pos).unwrap();
            // the first record covering `pos` sits at offset 2 * pos
            assert!(offset <= 2 * pos, "pos {pos} offset {offset}");
            assert!(2 * pos - offset < 3);
        }
    }

    #[test]
    fn test_reference_without_records() {
        let records = vec![
            create_mock_record(0, 5, 1, "a"),
            create_mock_record(2, 5, 1, "b"),
        ];
        let references = [("chr1", 10), ("chr2", 10), ("chr3", 10)];
        let mut reader = MockAlignmentReader::new(records, &references);
        let index = IntervalIndex::build(&mut reader, 4).unwrap();
        assert!(index.nodes(1).is_empty());
        assert_eq!(index.coarse_offset(1, 5, 5), None);
        assert_eq!(index.coarse_offset(2, 0, 0), Some(1));
        assert_eq!(index.coarse_offset(3, 0, 0), None);
    }

    #[test]
    fn test_unsorted_records() {
        let records = vec![
            create_mock_record(0, 50, 1, "a"),
            create_mock_record(0, 10, 1, "b"),
        ];
        let mut reader = MockAlignmentReader::new(records, &[("chr1", 100)]);
        let err = IntervalIndex::build(&mut reader, 4).unwrap_err();
        assert!(err
            .to_string()
            .contains("records are not coordinate sorted: 0:10 follows 0:50"));
    }

    #[test]
    fn test_zero_block_size_is_clamped() {
        let records = uniform_records(&[("chr1", 3)], 1);
        let mut reader = MockAlignmentReader::new(records, &[("chr1", 3)]);
        let index = IntervalIndex::build(&mut reader, 0).unwrap();
        assert_eq!(index.len(), 3);
    }
}
