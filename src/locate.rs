//! Resolution of a sampled coordinate to the file offset a depth scan starts at.
use crate::bam::{next_span, AlignmentReader};
use crate::errors::{Error, Result};
use crate::index::SpatialIndex;
use crate::reference::GenomicCoordinate;
use rust_htslib::bam::Record;

/// Moves from a coarse index offset to the offset of the first record that
/// covers `target` or starts after it.
///
/// Index blocks hold many records, so the coarse offset usually points at
/// records that end before `target`; those are skipped. Returns `Ok(None)` if
/// the file ends before any such record is found.
pub fn refine<R: AlignmentReader>(
    reader: &mut R,
    coarse: u64,
    target: &GenomicCoordinate,
) -> Result<Option<u64>> {
    reader.seek(coarse)?;
    let mut record = Record::new();
    loop {
        let offset = reader.tell();
        match next_span(reader, &mut record)? {
            Some(span) if span.reaches(target) => return Ok(Some(offset)),
            Some(_) => continue,
            None => return Ok(None),
        }
    }
}

/// Finds the offset a depth scan for `target` starts from.
///
/// # Errors
/// - `Localization` if the index has nothing at or after `target` on its
///   reference, or refinement runs off the end of the file.
/// - Any read or seek error from `reader`.
pub fn locate<R, I>(reader: &mut R, index: &I, target: &GenomicCoordinate) -> Result<u64>
where
    R: AlignmentReader,
    I: SpatialIndex + ?Sized,
{
    let localization = || Error::Localization {
        tid: target.tid,
        pos: target.pos,
    };
    let coarse = index
        .coarse_offset(target.tid, target.pos, target.pos)
        .ok_or_else(localization)?;
    refine(reader, coarse, target)?.ok_or_else(localization)
}
