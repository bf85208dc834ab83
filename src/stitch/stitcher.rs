//! External stitcher invocation.

use std::cmp::Ordering;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info};

use crate::error::{IoError, StitchError};

use super::params::StitchParams;

/// Default stitcher executable.
pub const DEFAULT_STITCHER_PROGRAM: &str = "ashlar";

/// Canvases produced by one stitcher run.
#[derive(Debug, Clone, Default)]
pub struct StitchOutput {
    pub output_dir: PathBuf,
    pub canvases: Vec<PathBuf>,
}

/// Global alignment of mosaic containers into stitched canvases.
///
/// The registration algorithm itself lives outside this crate.
#[async_trait]
pub trait Stitcher: Send + Sync {
    /// Name for logs.
    fn name(&self) -> &str;

    /// Stitch the given mosaics (one per cycle, in cycle order).
    async fn stitch(
        &self,
        inputs: &[PathBuf],
        output_dir: &Path,
        params: &StitchParams,
    ) -> Result<StitchOutput, StitchError>;
}

// =============================================================================
// Natural ordering
// =============================================================================

/// Compare strings treating digit runs as numbers (`cycle_2` < `cycle_10`).
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();

    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let na = take_number(&mut a);
                let nb = take_number(&mut b);
                let ord = na
                    .trim_start_matches('0')
                    .len()
                    .cmp(&nb.trim_start_matches('0').len())
                    .then_with(|| na.trim_start_matches('0').cmp(nb.trim_start_matches('0')))
                    .then_with(|| na.len().cmp(&nb.len()));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                a.next();
                b.next();
            }
        }
    }
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
        digits.push(c);
        chars.next();
    }
    digits
}

/// Sort paths by natural order of their file names.
pub fn natural_sort(paths: &mut [PathBuf]) {
    paths.sort_by(|a, b| {
        let a = a.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        let b = b.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        natural_cmp(&a, &b)
    });
}

/// Regex matching file names produced by a `{cycle}`/`{channel}` pattern.
pub fn filename_format_regex(format: &str) -> Option<Regex> {
    let pattern = regex::escape(format)
        .replace(r"\{cycle\}", r"(?P<cycle>\d+)")
        .replace(r"\{channel\}", r"(?P<channel>\d+)");
    Regex::new(&format!("^{}$", pattern)).ok()
}

// =============================================================================
// AshlarStitcher
// =============================================================================

/// Runs the `ashlar` command-line stitcher.
#[derive(Debug, Clone)]
pub struct AshlarStitcher {
    program: PathBuf,
}

impl AshlarStitcher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Build the argument list for one run.
    pub fn command_args(
        &self,
        inputs: &[PathBuf],
        output_dir: &Path,
        params: &StitchParams,
    ) -> Vec<OsString> {
        let mut sorted = inputs.to_vec();
        natural_sort(&mut sorted);

        let mut args: Vec<OsString> = sorted.into_iter().map(PathBuf::into_os_string).collect();
        args.push("-o".into());
        args.push(output_dir.as_os_str().to_owned());
        args.push("--align-channel".into());
        args.push(params.align_channel.to_string().into());
        if params.flip_x {
            args.push("--flip-x".into());
        }
        if params.flip_y {
            args.push("--flip-y".into());
        }
        args.push("-m".into());
        args.push(params.maximum_shift.to_string().into());
        args.push("--filter-sigma".into());
        args.push(params.filter_sigma.to_string().into());
        args.push("-f".into());
        args.push(params.filename_format.clone().into());
        if !params.output_channels.is_empty() {
            args.push("--output-channels".into());
            args.extend(params.output_channels.iter().map(|c| c.to_string().into()));
        }
        if params.pyramid {
            args.push("--pyramid".into());
            if let Some(tile_size) = params.tile_size {
                args.push("--tile-size".into());
                args.push(tile_size.to_string().into());
            }
        }
        if !params.flat_field.is_empty() {
            args.push("--ffp".into());
            args.extend(params.flat_field.iter().map(|p| p.as_os_str().to_owned()));
        }
        if !params.dark_field.is_empty() {
            args.push("--dfp".into());
            args.extend(params.dark_field.iter().map(|p| p.as_os_str().to_owned()));
        }
        args
    }

    async fn collect_canvases(
        &self,
        output_dir: &Path,
        params: &StitchParams,
    ) -> Result<Vec<PathBuf>, StitchError> {
        let pattern = filename_format_regex(&params.filename_format);

        let mut entries = tokio::fs::read_dir(output_dir)
            .await
            .map_err(|e| IoError::read(output_dir, e))?;
        let mut canvases = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| IoError::read(output_dir, e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            let matched = match &pattern {
                Some(re) => re.is_match(&name),
                None => name.ends_with(".tif") || name.ends_with(".tiff"),
            };
            if matched {
                canvases.push(entry.path());
            }
        }

        natural_sort(&mut canvases);
        Ok(canvases)
    }
}

impl Default for AshlarStitcher {
    fn default() -> Self {
        Self::new(DEFAULT_STITCHER_PROGRAM)
    }
}

#[async_trait]
impl Stitcher for AshlarStitcher {
    fn name(&self) -> &str {
        "ashlar"
    }

    async fn stitch(
        &self,
        inputs: &[PathBuf],
        output_dir: &Path,
        params: &StitchParams,
    ) -> Result<StitchOutput, StitchError> {
        if inputs.is_empty() {
            return Err(StitchError::NoInputs(output_dir.display().to_string()));
        }
        params.validate(inputs.len(), None)?;

        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|e| IoError::create_dir(output_dir, e))?;

        let args = self.command_args(inputs, output_dir, params);
        info!(
            "Stitching {} mosaics into {} with {}",
            inputs.len(),
            output_dir.display(),
            self.program.display()
        );
        debug!("Stitcher arguments: {:?}", args);

        let output = tokio::process::Command::new(&self.program)
            .args(&args)
            .output()
            .await
            .map_err(|e| StitchError::Launch {
                program: self.program.display().to_string(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(StitchError::ExternalFailure {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let canvases = self.collect_canvases(output_dir, params).await?;
        info!("Stitcher produced {} canvases", canvases.len());

        Ok(StitchOutput {
            output_dir: output_dir.to_path_buf(),
            canvases,
        })
    }
}
