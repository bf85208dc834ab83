//! External stitcher contract.
//!
//! Registration and global alignment are delegated to an external program.
//! This module validates the parameters, builds the invocation, and reports
//! failures verbatim so the pipeline can skip the affected region.

mod params;
mod stitcher;

pub use params::{
    StitchParams, DEFAULT_ALIGN_CHANNEL, DEFAULT_FILENAME_FORMAT, DEFAULT_FILTER_SIGMA,
    DEFAULT_MAXIMUM_SHIFT,
};
pub use stitcher::{
    filename_format_regex, natural_cmp, natural_sort, AshlarStitcher, StitchOutput, Stitcher,
    DEFAULT_STITCHER_PROGRAM,
};
