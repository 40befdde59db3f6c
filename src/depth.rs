//! # Depth Module
//!
//! Sampled read depth estimation.
//!
//! For each sampled coordinate the file is positioned with [`locate`] and
//! scanned forward, counting records whose `(reference, start)` key is at or
//! before the coordinate. The scan stops at the first record past the
//! coordinate, so the work per sample is bounded by the local depth rather
//! than the size of the file.
//!
//! The count is the number of records starting between the first record that
//! reaches the coordinate and the coordinate itself. Records that start in
//! that window but end before the coordinate are included, so this is an
//! approximation of coverage depth rather than an exact pileup.
use crate::bam::{next_span, AlignmentReader, HtslibAlignmentReader};
use crate::errors::{Error, Result};
use crate::index::{IntervalIndex, SpatialIndex};
use crate::locate::locate;
use crate::reference::{GenomicCoordinate, ReferenceSpace};
use crate::sampler::{PositionSampler, SamplingStrategy};
use crate::stats::{write_samples_csv, EstimationResult, OutputFormat};
use log::{debug, info, warn};
use rayon::prelude::*;
use rust_htslib::bam::Record;
use std::path::PathBuf;

/// Parameters of one estimation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EstimateOptions {
    /// Number of coordinates to sample.
    pub sample_size: usize,
    /// Seed for the position sampler. `None` draws a seed from entropy.
    pub seed: Option<u64>,
    pub strategy: SamplingStrategy,
}

impl Default for EstimateOptions {
    fn default() -> Self {
        Self {
            sample_size: 1000,
            seed: None,
            strategy: SamplingStrategy::PerReference,
        }
    }
}

/// The depth observed at one sampled coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthSample {
    pub coordinate: GenomicCoordinate,
    pub depth: u64,
    /// False when the coordinate could not be placed in the file, in which
    /// case `depth` is 0.
    pub localized: bool,
}

/// Counts records from `offset` onwards whose key is at or before `target`.
pub fn count_depth<R: AlignmentReader>(
    reader: &mut R,
    offset: u64,
    target: &GenomicCoordinate,
) -> Result<u64> {
    reader.seek(offset)?;
    let mut record = Record::new();
    let mut depth = 0;
    while let Some(span) = next_span(reader, &mut record)? {
        if span.key() > *target {
            break;
        }
        depth += 1;
    }
    Ok(depth)
}

/// Locates and counts the depth at `target`.
///
/// A coordinate that cannot be localized yields a depth of 0 instead of an
/// error. Read and seek errors are returned.
pub fn sample_depth<R, I>(
    reader: &mut R,
    index: &I,
    target: &GenomicCoordinate,
) -> Result<DepthSample>
where
    R: AlignmentReader,
    I: SpatialIndex + ?Sized,
{
    match locate(reader, index, target) {
        Ok(offset) => Ok(DepthSample {
            coordinate: *target,
            depth: count_depth(reader, offset, target)?,
            localized: true,
        }),
        Err(Error::Localization { tid, pos }) => {
            debug!("no records reach {tid}:{pos}, recording depth 0");
            Ok(DepthSample {
                coordinate: *target,
                depth: 0,
                localized: false,
            })
        }
        Err(err) => Err(err),
    }
}

fn draw_coordinates(
    references: &ReferenceSpace,
    options: &EstimateOptions,
) -> Result<Vec<GenomicCoordinate>> {
    if options.sample_size == 0 {
        return Err(Error::SampleSizeInvalid);
    }
    let mut sampler = PositionSampler::new(options.seed, options.strategy);
    let coordinates = sampler.sample(references, options.sample_size)?;
    info!(
        "sampling depth at {} positions across {} references",
        coordinates.len(),
        references.len()
    );
    Ok(coordinates)
}

/// Measures depth at `options.sample_size` random coordinates using a single
/// reader.
pub fn sample_depths<R, I>(
    reader: &mut R,
    references: &ReferenceSpace,
    index: &I,
    options: &EstimateOptions,
) -> Result<Vec<DepthSample>>
where
    R: AlignmentReader,
    I: SpatialIndex + ?Sized,
{
    let coordinates = draw_coordinates(references, options)?;
    coordinates
        .iter()
        .map(|coordinate| sample_depth(reader, index, coordinate))
        .collect()
}

/// Measures depth at `options.sample_size` random coordinates in parallel.
///
/// htslib readers cannot be shared between threads, so the coordinates are
/// split into one chunk per worker and `open` is called once per chunk to
/// give it its own reader. Coordinates are drawn before any work is
/// scheduled, so the samples match [`sample_depths`] for the same seed.
pub fn sample_depths_par<R, I, F>(
    open: F,
    references: &ReferenceSpace,
    index: &I,
    options: &EstimateOptions,
) -> Result<Vec<DepthSample>>
where
    R: AlignmentReader,
    I: SpatialIndex + Sync + ?Sized,
    F: Fn() -> Result<R> + Sync,
{
    let coordinates = draw_coordinates(references, options)?;
    let chunk_size = coordinates
        .len()
        .div_ceil(rayon::current_num_threads())
        .max(1);
    let chunks = coordinates
        .par_chunks(chunk_size)
        .map(|chunk| {
            let mut reader = open()?;
            chunk
                .iter()
                .map(|coordinate| sample_depth(&mut reader, index, coordinate))
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(chunks.into_iter().flatten().collect())
}

/// Estimates the read depth distribution of the file behind `reader`.
///
/// # Errors
/// - `SampleSizeInvalid` if `options.sample_size` is 0.
/// - Any read or seek error from `reader`.
pub fn estimate_depth<R, I>(
    reader: &mut R,
    references: &ReferenceSpace,
    index: &I,
    options: &EstimateOptions,
) -> Result<EstimationResult>
where
    R: AlignmentReader,
    I: SpatialIndex + ?Sized,
{
    let samples = sample_depths(reader, references, index, options)?;
    Ok(summarize(&samples))
}

/// Parallel form of [`estimate_depth`]; see [`sample_depths_par`].
pub fn estimate_depth_par<R, I, F>(
    open: F,
    references: &ReferenceSpace,
    index: &I,
    options: &EstimateOptions,
) -> Result<EstimationResult>
where
    R: AlignmentReader,
    I: SpatialIndex + Sync + ?Sized,
    F: Fn() -> Result<R> + Sync,
{
    let samples = sample_depths_par(open, references, index, options)?;
    Ok(summarize(&samples))
}

/// Reduces samples to summary statistics.
pub fn summarize(samples: &[DepthSample]) -> EstimationResult {
    let depths = samples.iter().map(|s| s.depth).collect();
    let mut result = EstimationResult::from_depths(depths);
    result.failed = samples.iter().filter(|s| !s.localized).count();
    info!(
        "sampled {} positions ({} not localized)",
        result.samples, result.failed
    );
    result
}

#[derive(Debug, PartialEq, Eq)]
pub struct DepthArgs {
    pub bam_path: PathBuf,
    pub options: EstimateOptions,
    /// Worker threads. More than one selects the parallel sampler.
    pub threads: usize,
    /// Records per index block.
    pub block_size: usize,
    pub format: OutputFormat,
    /// Optional CSV file receiving every sampled position and its depth.
    pub samples_path: Option<PathBuf>,
}

pub fn run(args: &DepthArgs) -> Result<()> {
    if args.options.sample_size == 0 {
        return Err(Error::SampleSizeInvalid);
    }
    let mut reader = HtslibAlignmentReader::from_path(&args.bam_path)?;
    let references = ReferenceSpace::from_header(reader.header())?;

    if args.threads > 1 {
        reader.set_threads(args.threads)?;
    }
    info!("indexing {}", args.bam_path.display());
    let index = IntervalIndex::build(&mut reader, args.block_size)?;
    info!(
        "indexed {} records in {} blocks",
        index.record_count(),
        index.len()
    );

    let samples = if args.threads > 1 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(args.threads)
            .build()?;
        pool.install(|| {
            sample_depths_par(
                || HtslibAlignmentReader::from_path(&args.bam_path),
                &references,
                &index,
                &args.options,
            )
        })?
    } else {
        sample_depths(&mut reader, &references, &index, &args.options)?
    };

    let result = summarize(&samples);
    if result.failed > 0 {
        warn!(
            "{} of {} sampled positions had no records in reach and were counted as depth 0",
            result.failed, result.samples
        );
    }
    if let Some(path) = &args.samples_path {
        let file = std::fs::File::create(path)?;
        write_samples_csv(&samples, &references, std::io::BufWriter::new(file))?;
    }
    result.write(args.format, std::io::stdout())
}
