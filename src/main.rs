//! mosaic-prep - Microscopy tile preprocessing.
//!
//! This binary parses the command line and drives the pipeline stages.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mosaic_prep::{
    config::{Cli, Command, MosaicConfig, RetileConfig, RunConfig, StitchConfig},
    open_adapter, AshlarStitcher, OutputLayout, Pipeline, RetileReport, Retiler, RunReport,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.into_command() {
        Command::Mosaic(config) => run_mosaic(config).await,
        Command::Stitch(config) => run_stitch(config).await,
        Command::Retile(config) => run_retile(config).await,
        Command::Run(config) => run_all(config).await,
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "mosaic_prep=debug"
    } else {
        "mosaic_prep=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Map a run report to the process exit code.
fn finish(report: &RunReport) -> ExitCode {
    for failure in &report.failures {
        warn!("  {} failed: {}", failure.unit, failure.error);
    }
    for retiled in &report.retiled {
        for (name, e) in &retiled.failures {
            warn!("  {} failed: {}", name, e);
        }
    }

    if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

// =============================================================================
// Mosaic Command
// =============================================================================

async fn run_mosaic(config: MosaicConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let adapter = match open_adapter(
        config.source.vendor.layout(),
        &config.source.inputs,
        config.source.adapter_options(),
    )
    .await
    {
        Ok(adapter) => adapter,
        Err(e) => {
            error!("Cannot read source: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let (pipeline, cycles) = match Pipeline::prepare(&config.output, adapter.as_ref()).await {
        Ok(prepared) => prepared,
        Err(e) => {
            error!("Cannot prepare {}: {}", config.output.display(), e);
            return ExitCode::FAILURE;
        }
    };
    let pipeline = pipeline.with_sidecar(config.source.sidecar);

    let mut report = RunReport::default();
    pipeline
        .run_mosaics(adapter.as_ref(), &cycles, &mut report)
        .await;

    info!(
        "Wrote {} of {} mosaics under {}",
        report.mosaics.len(),
        cycles.len(),
        config.output.display()
    );
    finish(&report)
}

// =============================================================================
// Stitch Command
// =============================================================================

async fn run_stitch(config: StitchConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let layout = match OutputLayout::scan(&config.output).await {
        Ok(layout) => layout,
        Err(e) => {
            error!("Cannot read output root: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = layout.ensure().await {
        error!("Cannot prepare {}: {}", config.output.display(), e);
        return ExitCode::FAILURE;
    }

    let stitcher = AshlarStitcher::new(&config.stitch.stitcher);
    let mut report = RunReport::default();
    Pipeline::new(layout)
        .run_stitch(&stitcher, &config.params(), &mut report)
        .await;

    finish(&report)
}

// =============================================================================
// Retile Command
// =============================================================================

async fn run_retile(config: RetileConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let retiler = match Retiler::new(config.tile_size()) {
        Ok(retiler) => retiler
            .with_fill(config.retile.fill)
            .with_naming(config.retile.canvas_naming.naming()),
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match retiler
        .retile_directory(&config.canvases, &config.output)
        .await
    {
        Ok(retiled) => {
            log_grid(&retiled);
            finish(&RunReport {
                retiled: vec![retiled],
                ..Default::default()
            })
        }
        Err(e) => {
            error!("Retiling failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn log_grid(report: &RetileReport) {
    if let Some(grid) = report.grid {
        info!(
            "Grid {} x {} of {}px tiles, padded {} bottom and {} right",
            grid.rows(),
            grid.cols(),
            grid.tile_size,
            grid.pad_bottom(),
            grid.pad_right()
        );
    }
}

// =============================================================================
// Run Command
// =============================================================================

async fn run_all(config: RunConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let retiler = match Retiler::new(config.tile_size()) {
        Ok(retiler) => retiler
            .with_fill(config.retile.fill)
            .with_naming(config.retile.canvas_naming.naming()),
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let adapter = match open_adapter(
        config.source.vendor.layout(),
        &config.source.inputs,
        config.source.adapter_options(),
    )
    .await
    {
        Ok(adapter) => adapter,
        Err(e) => {
            error!("Cannot read source: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let (pipeline, cycles) = match Pipeline::prepare(&config.output, adapter.as_ref()).await {
        Ok(prepared) => prepared,
        Err(e) => {
            error!("Cannot prepare {}: {}", config.output.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let stitcher = AshlarStitcher::new(&config.stitch.stitcher);
    let report = pipeline
        .with_sidecar(config.source.sidecar)
        .run_all(
            adapter.as_ref(),
            &cycles,
            &stitcher,
            &config.params(),
            &retiler,
        )
        .await;

    report.retiled.iter().for_each(log_grid);
    finish(&report)
}
