use anyhow::Result;
use bamsample::depth::{self, DepthArgs as RunArgs, EstimateOptions};
use bamsample::index::DEFAULT_BLOCK_SIZE;
use bamsample::sampler::SamplingStrategy;
use bamsample::stats::OutputFormat;
use clap::{ArgAction, Args, Parser, Subcommand};
use log::LevelFilter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(version = env!("GIT_VERSION"))]
pub struct App {
    /// Increase logging verbosity (-v info, -vv debug). RUST_LOG overrides this.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
pub struct DepthArgs {
    /// Number of random positions to sample
    #[arg(short = 'n', long, default_value_t = 1000)]
    sample_size: usize,

    /// Random seed; a fresh seed is drawn when omitted
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of worker threads
    #[arg(short = '@', long, default_value_t = 1)]
    threads: usize,

    /// Number of records per index block
    #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: usize,

    /// Weight the choice of reference by its length instead of picking each
    /// reference with equal probability
    #[arg(short, long, default_value_t = false)]
    weighted: bool,

    /// Output format of the summary
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Write every sampled position and its depth to this CSV file
    #[arg(long)]
    samples: Option<PathBuf>,

    /// Coordinate sorted BAM file
    path: PathBuf,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Estimate the read depth distribution by random sampling
    #[command(arg_required_else_help = true)]
    Depth(DepthArgs),
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    pretty_env_logger::formatted_builder()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() -> Result<()> {
    let args = App::parse();
    init_logging(args.verbose);
    match args.command {
        Commands::Depth(args) => {
            let strategy = if args.weighted {
                SamplingStrategy::LengthWeighted
            } else {
                SamplingStrategy::PerReference
            };
            depth::run(&RunArgs {
                bam_path: args.path,
                options: EstimateOptions {
                    sample_size: args.sample_size,
                    seed: args.seed,
                    strategy,
                },
                threads: args.threads,
                block_size: args.block_size,
                format: args.format,
                samples_path: args.samples,
            })?
        }
    };
    Ok(())
}
