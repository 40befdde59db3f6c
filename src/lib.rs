pub mod errors;
pub use errors::{Error, Result};
pub mod bam;
pub mod depth;
pub mod index;
pub mod locate;
pub mod reference;
pub mod sampler;
pub mod stats;

pub use depth::{estimate_depth, estimate_depth_par, EstimateOptions};
pub use stats::EstimationResult;
