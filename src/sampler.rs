//! Random selection of the genomic positions at which depth is measured.
use crate::errors::{Error, Result};
use crate::reference::{GenomicCoordinate, ReferenceSpace};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// How a reference is chosen for each draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplingStrategy {
    /// Pick a reference uniformly by id, then a position uniformly within it.
    ///
    /// Positions on short references are over-represented when reference
    /// lengths differ.
    #[default]
    PerReference,
    /// Pick a position uniformly over the concatenation of all references, so
    /// every base of the genome is equally likely.
    LengthWeighted,
}

/// Draws random coordinates from a `ReferenceSpace`.
///
/// A single `Pcg32` generator is used for every draw, so a fixed seed gives
/// the same coordinates in the same order.
pub struct PositionSampler {
    rng: Pcg32,
    strategy: SamplingStrategy,
}

impl PositionSampler {
    /// Seeds the generator from `seed`, or from the thread-local entropy
    /// source when no seed is given.
    pub fn new(seed: Option<u64>, strategy: SamplingStrategy) -> Self {
        let rng = match seed {
            Some(seed) => Pcg32::seed_from_u64(seed),
            None => Pcg32::from_rng(&mut rand::rng()),
        };
        Self { rng, strategy }
    }

    /// Draws `n` coordinates.
    ///
    /// # Errors
    /// - `SampleSizeInvalid` if `n` is 0.
    pub fn sample(
        &mut self,
        references: &ReferenceSpace,
        n: usize,
    ) -> Result<Vec<GenomicCoordinate>> {
        if n == 0 {
            return Err(Error::SampleSizeInvalid);
        }
        if references.is_empty() {
            return Err(Error::EmptyReferenceSpace);
        }
        let coordinates = match self.strategy {
            SamplingStrategy::PerReference => (0..n)
                .map(|_| self.draw_per_reference(references))
                .collect(),
            SamplingStrategy::LengthWeighted => {
                let ends = cumulative_ends(references);
                (0..n).map(|_| self.draw_weighted(&ends)).collect()
            }
        };
        Ok(coordinates)
    }

    fn draw_per_reference(&mut self, references: &ReferenceSpace) -> GenomicCoordinate {
        let tid = self.rng.random_range(0..references.len()) as u32;
        let length = references.get(tid).map_or(1, |r| r.length);
        let pos = self.rng.random_range(0..length);
        GenomicCoordinate::new(tid, pos)
    }

    fn draw_weighted(&mut self, ends: &[u64]) -> GenomicCoordinate {
        let total = ends.last().copied().unwrap_or(1);
        let offset = self.rng.random_range(0..total);
        // first reference whose cumulative end lies beyond the offset
        let tid = ends.partition_point(|&end| end <= offset);
        let start = if tid == 0 { 0 } else { ends[tid - 1] };
        GenomicCoordinate::new(tid as u32, offset - start)
    }
}

/// Exclusive end of each reference in the concatenated genome.
fn cumulative_ends(references: &ReferenceSpace) -> Vec<u64> {
    references
        .iter()
        .scan(0u64, |acc, r| {
            *acc += r.length;
            Some(*acc)
        })
        .collect()
}
