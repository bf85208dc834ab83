//! Sequential pipeline runner.
//!
//! Every unit of work (cycle, region) either completes or is recorded as a
//! failure in the [`RunReport`]; one failing unit never stops the others.

use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::error::{FormatError, MosaicError, PipelineError};
use crate::format::{
    detect_vendor, Calibration, CycleId, FormatAdapter, LeicaExportAdapter, StageCalibration,
    VendorLayout, ZenExportAdapter,
};
use crate::manifest::build_manifest;
use crate::mosaic::{MosaicOutput, MosaicWriter};
use crate::plane::PlaneShape;
use crate::retile::{RetileReport, Retiler};
use crate::stitch::{natural_sort, StitchOutput, StitchParams, Stitcher};

use super::layout::OutputLayout;

/// Suffix of the containers handed to the stitcher.
const MOSAIC_SUFFIX: &str = ".ome.tif";

// =============================================================================
// Adapter selection
// =============================================================================

/// Settings shared by the TIFF export adapters.
#[derive(Debug, Clone, Copy)]
pub struct AdapterOptions {
    pub calibration: Calibration,
    pub stage: StageCalibration,

    /// Shape used for zero-filled planes when nothing can be probed
    pub plane_shape: PlaneShape,
}

/// Build the adapter for a set of input directories.
///
/// With `layout = None` the layout is detected from the first directory.
/// ZEN exports keep every cycle in one directory; Leica exports take one
/// directory per cycle, in cycle order.
pub async fn open_adapter(
    layout: Option<VendorLayout>,
    inputs: &[PathBuf],
    options: AdapterOptions,
) -> Result<Box<dyn FormatAdapter>, PipelineError> {
    let first = inputs.first().ok_or_else(|| FormatError::UnsupportedLayout {
        reason: "no input directories given".to_string(),
    })?;

    let layout = match layout {
        Some(layout) => layout,
        None => {
            let detected = detect_vendor(first).await?;
            info!("Detected {} layout in {}", detected.name(), first.display());
            detected
        }
    };

    match layout.leica_naming() {
        None => {
            if inputs.len() > 1 {
                warn!(
                    "ZEN export reads one directory, ignoring {} extra inputs",
                    inputs.len() - 1
                );
            }
            Ok(Box::new(
                ZenExportAdapter::new(first, options.calibration)
                    .with_default_shape(options.plane_shape),
            ))
        }
        Some(naming) => Ok(Box::new(
            LeicaExportAdapter::new(inputs.to_vec(), naming, options.stage, options.calibration)
                .with_default_shape(options.plane_shape),
        )),
    }
}

// =============================================================================
// RunReport
// =============================================================================

/// A unit of work that did not complete.
#[derive(Debug, Clone)]
pub struct UnitFailure {
    /// Cycle or region description
    pub unit: String,
    pub error: PipelineError,
}

/// Outputs and failures of a run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub mosaics: Vec<MosaicOutput>,
    pub stitched: Vec<StitchOutput>,
    pub retiled: Vec<RetileReport>,
    pub failures: Vec<UnitFailure>,
}

impl RunReport {
    /// True when no unit failed, including individual canvases.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.retiled.iter().all(RetileReport::is_clean)
    }

    fn fail(&mut self, unit: String, error: impl Into<PipelineError>) {
        let error = error.into();
        error!("Skipping {}: {}", unit, error);
        self.failures.push(UnitFailure { unit, error });
    }
}

fn region_label(region: Option<u32>) -> String {
    match region {
        Some(region) => format!("region {}", region),
        None => "stitching".to_string(),
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Runs mosaic assembly, stitching and retiling over an [`OutputLayout`].
#[derive(Debug, Clone)]
pub struct Pipeline {
    layout: OutputLayout,
    sidecar: bool,
}

impl Pipeline {
    pub fn new(layout: OutputLayout) -> Self {
        Self {
            layout,
            sidecar: false,
        }
    }

    /// Also write the `TileScanInfo` sidecar next to each container.
    pub fn with_sidecar(mut self, enabled: bool) -> Self {
        self.sidecar = enabled;
        self
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Discover the cycles of `adapter` and create the output tree once.
    pub async fn prepare(
        root: impl Into<PathBuf>,
        adapter: &dyn FormatAdapter,
    ) -> Result<(Self, Vec<CycleId>), PipelineError> {
        let cycles = adapter.discover().await?;
        info!(
            "Found {} cycles in {} source",
            cycles.len(),
            adapter.vendor().name()
        );

        let layout = OutputLayout::for_cycles(root, &cycles);
        layout.ensure().await?;
        Ok((Self::new(layout), cycles))
    }

    /// Write one mosaic container per cycle.
    pub async fn run_mosaics(
        &self,
        adapter: &dyn FormatAdapter,
        cycles: &[CycleId],
        report: &mut RunReport,
    ) {
        for &cycle in cycles {
            match self.mosaic_cycle(adapter, cycle).await {
                Ok(output) => report.mosaics.push(output),
                Err(e) => report.fail(cycle.to_string(), e),
            }
        }
    }

    async fn mosaic_cycle(
        &self,
        adapter: &dyn FormatAdapter,
        cycle: CycleId,
    ) -> Result<MosaicOutput, PipelineError> {
        info!("Assembling mosaic for {}", cycle);
        let acquisition = adapter.load_cycle(cycle).await?;
        let manifest = build_manifest(acquisition).map_err(MosaicError::from)?;

        let writer =
            MosaicWriter::new(self.layout.mosaic_dir(cycle.region)).with_sidecar(self.sidecar);
        Ok(writer.write_cycle(&manifest).await?)
    }

    /// Stitch the containers of every region.
    ///
    /// A stitcher failure skips its region only.
    pub async fn run_stitch(
        &self,
        stitcher: &dyn Stitcher,
        params: &StitchParams,
        report: &mut RunReport,
    ) {
        for region in self.layout.regions() {
            let unit = region_label(region);
            let inputs = match self.mosaic_inputs(region).await {
                Ok(inputs) => inputs,
                Err(e) => {
                    report.fail(unit, e);
                    continue;
                }
            };

            info!(
                "Stitching {} with {} ({} mosaics)",
                unit,
                stitcher.name(),
                inputs.len()
            );
            match stitcher
                .stitch(&inputs, &self.layout.stitched_dir(region), params)
                .await
            {
                Ok(output) => report.stitched.push(output),
                Err(e) => report.fail(unit, e),
            }
        }
    }

    /// Containers of one region in natural filename order.
    pub async fn mosaic_inputs(&self, region: Option<u32>) -> Result<Vec<PathBuf>, PipelineError> {
        let dir = self.layout.mosaic_dir(region);
        let mut inputs: Vec<PathBuf> = crate::format::list_file_names(&dir)
            .await?
            .into_iter()
            .filter(|name| name.ends_with(MOSAIC_SUFFIX))
            .map(|name| dir.join(name))
            .collect();
        natural_sort(&mut inputs);
        Ok(inputs)
    }

    /// Retile the stitched canvases of every region.
    pub async fn run_retile(&self, retiler: &Retiler, report: &mut RunReport) {
        for region in self.layout.regions() {
            let canvases = self.layout.stitched_dir(region);
            let output = self.layout.retile_dir(region);
            match retiler.retile_directory(&canvases, &output).await {
                Ok(retiled) => report.retiled.push(retiled),
                Err(e) => report.fail(format!("retiling {}", canvases.display()), e),
            }
        }
    }

    /// Mosaic, stitch and retile in sequence.
    pub async fn run_all(
        &self,
        adapter: &dyn FormatAdapter,
        cycles: &[CycleId],
        stitcher: &dyn Stitcher,
        params: &StitchParams,
        retiler: &Retiler,
    ) -> RunReport {
        let mut report = RunReport::default();
        self.run_mosaics(adapter, cycles, &mut report).await;
        self.run_stitch(stitcher, params, &mut report).await;
        self.run_retile(retiler, &mut report).await;

        info!(
            "Run finished: {} mosaics, {} stitched, {} retiled, {} failures",
            report.mosaics.len(),
            report.stitched.len(),
            report.retiled.len(),
            report.failures.len()
        );
        report
    }
}
