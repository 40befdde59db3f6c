//! # Reference Module
//!
//! Types describing where a depth sample is taken.
//!
//! - `GenomicCoordinate`: a single 0-based base position on a reference,
//!   ordered by (reference id, position) like records in a sorted BAM file.
//! - `ReferenceSpace`: the reference names and lengths from a BAM header,
//!   indexed by reference id. This is the universe positions are sampled from.
use crate::errors::{Error, Result};
use rust_htslib::bam::HeaderView;
use std::fmt;

/// A base position on a reference sequence.
///
/// Ordering is lexicographic on `(tid, pos)`, matching the sort order of a
/// coordinate sorted BAM file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GenomicCoordinate {
    pub tid: u32,
    pub pos: u64,
}

impl GenomicCoordinate {
    pub fn new(tid: u32, pos: u64) -> Self {
        Self { tid, pos }
    }
}

impl fmt::Display for GenomicCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.tid, self.pos)
    }
}

/// A named reference sequence and its length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub name: String,
    pub length: u64,
}

/// The ordered reference sequences of a BAM file. The reference id of a
/// sequence is its index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSpace {
    references: Vec<Reference>,
}

impl ReferenceSpace {
    /// Builds a reference space from (name, length) pairs.
    ///
    /// # Errors
    /// - `EmptyReferenceSpace` if `references` is empty.
    /// - `InvalidReference` if any reference has length 0.
    pub fn new(references: Vec<Reference>) -> Result<Self> {
        if references.is_empty() {
            return Err(Error::EmptyReferenceSpace);
        }
        if let Some(empty) = references.iter().find(|r| r.length == 0) {
            return Err(Error::InvalidReference {
                name: empty.name.clone(),
            });
        }
        Ok(Self { references })
    }

    /// Reads the reference names and lengths from a BAM header.
    pub fn from_header(header: &HeaderView) -> Result<Self> {
        let mut references = Vec::with_capacity(header.target_count() as usize);
        for tid in 0..header.target_count() {
            let name = std::str::from_utf8(header.tid2name(tid))?.to_owned();
            let length = header.target_len(tid).unwrap_or(0);
            references.push(Reference { name, length });
        }
        Self::new(references)
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    pub fn get(&self, tid: u32) -> Option<&Reference> {
        self.references.get(tid as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reference> {
        self.references.iter()
    }

    /// Sum of all reference lengths.
    pub fn total_length(&self) -> u64 {
        self.references.iter().map(|r| r.length).sum()
    }

    /// Whether `coordinate` lies on a known reference and within its length.
    pub fn contains(&self, coordinate: &GenomicCoordinate) -> bool {
        self.get(coordinate.tid)
            .is_some_and(|r| coordinate.pos < r.length)
    }

    /// The reference name for `coordinate`, falling back to its numeric id.
    pub fn name(&self, coordinate: &GenomicCoordinate) -> String {
        self.get(coordinate.tid)
            .map(|r| r.name.clone())
            .unwrap_or_else(|| coordinate.tid.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bam::mock_header;

    fn reference(name: &str, length: u64) -> Reference {
        Reference {
            name: name.to_owned(),
            length,
        }
    }

    #[test]
    fn coordinate_ordering() {
        let a = GenomicCoordinate::new(0, 500);
        let b = GenomicCoordinate::new(1, 0);
        let c = GenomicCoordinate::new(1, 10);
        assert!(a < b);
        assert!(b < c);
        assert!(c <= GenomicCoordinate::new(1, 10));
    }

    #[test]
    fn display_coordinate() {
        assert_eq!(GenomicCoordinate::new(2, 42).to_string(), "2:42");
    }

    #[test]
    fn from_header() {
        let header = HeaderView::from_header(&mock_header(&[("chr1", 100), ("chr2", 50)]));
        let space = ReferenceSpace::from_header(&header).unwrap();
        assert_eq!(space.len(), 2);
        assert_eq!(space.get(0), Some(&reference("chr1", 100)));
        assert_eq!(space.get(1), Some(&reference("chr2", 50)));
        assert_eq!(space.total_length(), 150);
    }

    #[test]
    fn from_empty_header() {
        let header = HeaderView::from_header(&mock_header(&[]));
        let err = ReferenceSpace::from_header(&header).unwrap_err();
        assert!(matches!(err, Error::EmptyReferenceSpace));
    }

    #[test]
    fn zero_length_reference() {
        let err = ReferenceSpace::new(vec![reference("chr1", 10), reference("chrM", 0)]).unwrap_err();
        assert_eq!(err.to_string(), "reference chrM has length 0");
    }

    #[test]
    fn contains_and_name() {
        let space = ReferenceSpace::new(vec![reference("chr1", 10)]).unwrap();
        assert!(space.contains(&GenomicCoordinate::new(0, 9)));
        assert!(!space.contains(&GenomicCoordinate::new(0, 10)));
        assert!(!space.contains(&GenomicCoordinate::new(1, 0)));
        assert_eq!(space.name(&GenomicCoordinate::new(0, 3)), "chr1");
        assert_eq!(space.name(&GenomicCoordinate::new(4, 3)), "4");
    }
}
