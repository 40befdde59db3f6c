use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("BAM header contains no reference sequences")]
    EmptyReferenceSpace,

    #[error("sample size must be at least 1")]
    SampleSizeInvalid,

    #[error("reference {name} has length 0")]
    InvalidReference { name: String },

    #[error("unable to locate records for {tid}:{pos}")]
    Localization { tid: u32, pos: u64 },

    #[error("records are not coordinate sorted: {tid}:{pos} follows {prev_tid}:{prev_pos}")]
    Unsorted {
        tid: u32,
        pos: u64,
        prev_tid: u32,
        prev_pos: u64,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTSlib error: {0}")]
    Hts(#[from] rust_htslib::errors::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("UTF-8 error: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),
}

pub type Result<T> = std::result::Result<T, Error>;
