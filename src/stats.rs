//! Summary statistics over sampled depths and their textual and CSV output.
use crate::depth::DepthSample;
use crate::errors::Result;
use crate::reference::ReferenceSpace;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;

/// Output format of an [`EstimationResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// One labeled line per statistic
    #[default]
    Text,
    /// A header row and a single value row
    Csv,
}

/// Summary of the depths observed at the sampled positions.
///
/// `sd` is the sample standard deviation (n - 1 denominator). Quartiles are
/// the medians of the lower and upper halves of the sorted depths, leaving out
/// the middle value when the number of samples is odd.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimationResult {
    /// Number of sampled positions.
    pub samples: usize,
    /// Number of positions that could not be localized and were counted as 0.
    pub failed: usize,
    pub mean: f64,
    pub median: f64,
    /// Most frequent depth, the smallest one when several are equally frequent.
    pub mode: u64,
    pub sd: f64,
    pub iqr: f64,
}

impl EstimationResult {
    /// Computes the summary from unsorted depths.
    pub fn from_depths(mut depths: Vec<u64>) -> Self {
        depths.sort_unstable();
        let n = depths.len();
        let mean = mean(&depths);
        Self {
            samples: n,
            failed: 0,
            mean,
            median: median(&depths),
            mode: mode(&depths),
            sd: sample_sd(&depths, mean),
            iqr: iqr(&depths),
        }
    }

    /// Write the result in `format`.
    pub fn write<W: Write>(&self, format: OutputFormat, mut dest: W) -> Result<()> {
        match format {
            OutputFormat::Text => writeln!(dest, "{self}")?,
            OutputFormat::Csv => self.write_csv(dest)?,
        }
        Ok(())
    }

    /// Write the result as a CSV header and a single row.
    pub fn write_csv<W: Write>(&self, dest: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(dest);
        wtr.write_record(["samples", "failed", "mean", "median", "mode", "sd", "iqr"])?;
        wtr.write_record([
            self.samples.to_string(),
            self.failed.to_string(),
            format!("{:.2}", self.mean),
            format!("{:.2}", self.median),
            self.mode.to_string(),
            format!("{:.2}", self.sd),
            format!("{:.2}", self.iqr),
        ])?;
        wtr.flush()?;
        Ok(())
    }
}

impl fmt::Display for EstimationResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Samples: {}", self.samples)?;
        writeln!(f, "Unlocalized: {}", self.failed)?;
        writeln!(f, "Mean: {:.2}", self.mean)?;
        writeln!(f, "Median: {:.2}", self.median)?;
        writeln!(f, "Mode: {}", self.mode)?;
        writeln!(f, "SD: {:.2}", self.sd)?;
        write!(f, "IQR: {:.2}", self.iqr)
    }
}

/// Write one CSV row per sampled position.
pub fn write_samples_csv<W: Write>(
    samples: &[DepthSample],
    references: &ReferenceSpace,
    dest: W,
) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(dest);
    wtr.write_record(["chrom", "pos", "depth", "localized"])?;
    for sample in samples {
        wtr.write_record([
            references.name(&sample.coordinate),
            sample.coordinate.pos.to_string(),
            sample.depth.to_string(),
            sample.localized.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn mean(depths: &[u64]) -> f64 {
    if depths.is_empty() {
        return 0.0;
    }
    let total = depths.par_iter().map(|&d| d as u128).sum::<u128>();
    total as f64 / depths.len() as f64
}

fn median(sorted: &[u64]) -> f64 {
    let n = sorted.len();
    match n {
        0 => 0.0,
        _ if n % 2 == 0 => (sorted[n / 2 - 1] as f64 + sorted[n / 2] as f64) / 2.0,
        _ => sorted[n / 2] as f64,
    }
}

fn mode(sorted: &[u64]) -> u64 {
    let mut histogram: BTreeMap<u64, usize> = BTreeMap::new();
    for &depth in sorted {
        *histogram.entry(depth).or_default() += 1;
    }
    let mut best = (0, 0);
    for (depth, count) in histogram {
        if count > best.1 {
            best = (depth, count);
        }
    }
    best.0
}

fn sample_sd(depths: &[u64], mean: f64) -> f64 {
    let n = depths.len();
    if n < 2 {
        return 0.0;
    }
    let variance = depths
        .iter()
        .map(|&d| {
            let diff = d as f64 - mean;
            diff * diff
        })
        .sum::<f64>()
        / (n - 1) as f64;
    variance.sqrt()
}

fn iqr(sorted: &[u64]) -> f64 {
    let n = sorted.len();
    if n < 2 {
        return 0.0;
    }
    let lower = &sorted[..n / 2];
    let upper = &sorted[n.div_ceil(2)..];
    median(upper) - median(lower)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{GenomicCoordinate, Reference};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_mean() {
        let result = EstimationResult::from_depths(vec![1, 2, 3, 4]);
        assert_eq!(result.mean, 2.5);
    }

    #[test]
    fn test_median_even() {
        let result = EstimationResult::from_depths(vec![4, 1, 3, 2]);
        assert_eq!(result.median, 2.5);
    }

    #[test]
    fn test_median_odd() {
        let result = EstimationResult::from_depths(vec![5, 1, 4, 2, 3]);
        assert_eq!(result.median, 3.0);
    }

    #[test]
    fn test_mode_is_value_not_count() {
        let result = EstimationResult::from_depths(vec![2, 2, 2, 5, 7]);
        assert_eq!(result.mode, 2);
    }

    #[test]
    fn test_mode_tie_takes_smallest() {
        let result = EstimationResult::from_depths(vec![3, 3, 1, 1, 9]);
        assert_eq!(result.mode, 1);
    }

    #[test]
    fn test_single_sample() {
        let result = EstimationResult::from_depths(vec![7]);
        assert_eq!(result.samples, 1);
        assert_eq!(result.mean, 7.0);
        assert_eq!(result.median, 7.0);
        assert_eq!(result.mode, 7);
        assert_eq!(result.sd, 0.0);
        assert_eq!(result.iqr, 0.0);
    }

    #[test]
    fn test_empty() {
        let result = EstimationResult::from_depths(vec![]);
        assert_eq!(result.samples, 0);
        assert_eq!(result.mean, 0.0);
        assert_eq!(result.median, 0.0);
        assert_eq!(result.mode, 0);
    }

    #[test]
    fn test_sample_sd() {
        let result = EstimationResult::from_depths(vec![1, 2, 3, 4]);
        assert!(approx(result.sd, (5.0f64 / 3.0).sqrt()));
        let result = EstimationResult::from_depths(vec![3, 3, 3]);
        assert_eq!(result.sd, 0.0);
    }

    #[test]
    fn test_iqr() {
        // lower half [1, 2] upper half [3, 4]
        assert_eq!(EstimationResult::from_depths(vec![1, 2, 3, 4]).iqr, 2.0);
        // odd: median 2 left out, lower [2, 2] upper [5, 7]
        assert_eq!(EstimationResult::from_depths(vec![2, 2, 2, 5, 7]).iqr, 4.0);
        assert_eq!(EstimationResult::from_depths(vec![1, 9]).iqr, 8.0);
    }

    #[test]
    fn test_large_depths_do_not_overflow() {
        let result = EstimationResult::from_depths(vec![u64::MAX, u64::MAX]);
        assert_eq!(result.mean, u64::MAX as f64);
    }

    #[test]
    fn test_median_and_mode_from_present_values() {
        let depths = vec![0, 4, 4, 9, 12, 30, 4];
        let result = EstimationResult::from_depths(depths.clone());
        assert!(depths.contains(&result.mode));
        assert!(depths.contains(&(result.median as u64)));
    }

    #[test]
    fn test_display() {
        let mut result = EstimationResult::from_depths(vec![1, 2, 3, 4]);
        result.failed = 1;
        let expected = "\
Samples: 4
Unlocalized: 1
Mean: 2.50
Median: 2.50
Mode: 1
SD: 1.29
IQR: 2.00";
        assert_eq!(result.to_string(), expected);
    }

    #[test]
    fn test_write_text() {
        let result = EstimationResult::from_depths(vec![3]);
        let mut output = Vec::new();
        assert!(result.write(OutputFormat::Text, &mut output).is_ok());
        let output = String::from_utf8(output).unwrap();
        assert!(output.starts_with("Samples: 1\n"));
        assert!(output.ends_with("IQR: 0.00\n"));
    }

    #[test]
    fn test_write_csv() {
        let result = EstimationResult::from_depths(vec![2, 2, 2, 5, 7]);
        let mut output = Vec::new();
        assert!(result.write_csv(&mut output).is_ok());
        let expected = "\
samples,failed,mean,median,mode,sd,iqr
5,0,3.60,2.00,2,2.30,4.00";
        assert_eq!(String::from_utf8(output).unwrap().trim(), expected);
    }

    #[test]
    fn test_write_samples_csv() {
        let references = ReferenceSpace::new(vec![
            Reference {
                name: "chr1".to_owned(),
                length: 100,
            },
            Reference {
                name: "chr2".to_owned(),
                length: 50,
            },
        ])
        .unwrap();
        let samples = vec![
            DepthSample {
                coordinate: GenomicCoordinate::new(1, 10),
                depth: 3,
                localized: true,
            },
            DepthSample {
                coordinate: GenomicCoordinate::new(0, 99),
                depth: 0,
                localized: false,
            },
        ];
        let mut output = Vec::new();
        assert!(write_samples_csv(&samples, &references, &mut output).is_ok());
        let expected = "\
chrom,pos,depth,localized
chr2,10,3,true
chr1,99,0,false";
        assert_eq!(String::from_utf8(output).unwrap().trim(), expected);
    }
}
