//! End-to-end preprocessing pipeline.
//!
//! [`OutputLayout::ensure`] creates the output tree once; the [`Pipeline`]
//! then runs each stage over it with per-unit error isolation.

mod layout;
mod runner;

pub use layout::{OutputLayout, MOSAIC_DIR, PREPROCESSING_DIR, RETILE_DIR, STITCHED_DIR};
pub use runner::{open_adapter, AdapterOptions, Pipeline, RunReport, UnitFailure};
