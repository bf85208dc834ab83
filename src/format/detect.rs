//! Vendor layout detection for acquisition directories.
//!
//! A directory is classified by the filename grammar its plane files follow:
//!
//! - **ZEN export**: `Base_{cycle}_c{channel}m{tile}*.tif`
//! - **Leica navigator**: `{region}--Stage{tile}--Z{z}--C{channel}.tif`
//! - **Leica exported**: `{region}_s{tile}_z{z}_ch{channel}.tif`
//!
//! The grammar with the most matching files wins; ties are resolved in the
//! order listed above. A directory with no matching file is unsupported.

use std::path::Path;

use tracing::debug;

use crate::error::FormatError;

use super::adapter::{list_file_names, VendorFormat};
use super::grammar::{parse_zen_name, LeicaNaming};

// =============================================================================
// VendorLayout
// =============================================================================

/// Detected on-disk layout of a TIFF export directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VendorLayout {
    /// ZEN export with `Base_{cycle}_info.xml` metadata
    Zen,

    /// Leica navigator naming
    LeicaNavigator,

    /// Leica exported naming
    LeicaExported,
}

impl VendorLayout {
    /// Get a human-readable name for the layout.
    pub const fn name(&self) -> &'static str {
        match self {
            VendorLayout::Zen => "ZEN export",
            VendorLayout::LeicaNavigator => LeicaNaming::Navigator.name(),
            VendorLayout::LeicaExported => LeicaNaming::Exported.name(),
        }
    }

    /// The vendor convention this layout belongs to.
    pub const fn vendor(&self) -> VendorFormat {
        match self {
            VendorLayout::Zen => VendorFormat::ZenExport,
            VendorLayout::LeicaNavigator | VendorLayout::LeicaExported => VendorFormat::LeicaExport,
        }
    }

    /// Leica filename grammar, if this is a Leica layout.
    pub const fn leica_naming(&self) -> Option<LeicaNaming> {
        match self {
            VendorLayout::Zen => None,
            VendorLayout::LeicaNavigator => Some(LeicaNaming::Navigator),
            VendorLayout::LeicaExported => Some(LeicaNaming::Exported),
        }
    }
}

// =============================================================================
// Detection
// =============================================================================

/// Classify a list of file names.
///
/// Returns `None` when no name matches any known grammar.
pub fn classify_names<S: AsRef<str>>(names: &[S]) -> Option<VendorLayout> {
    let candidates = [
        (
            VendorLayout::Zen,
            count_matches(names, |n| parse_zen_name(n).is_some()),
        ),
        (
            VendorLayout::LeicaNavigator,
            count_matches(names, |n| LeicaNaming::Navigator.parse(n).is_some()),
        ),
        (
            VendorLayout::LeicaExported,
            count_matches(names, |n| LeicaNaming::Exported.parse(n).is_some()),
        ),
    ];

    let mut best: Option<(VendorLayout, usize)> = None;
    for (layout, matches) in candidates {
        if matches == 0 {
            continue;
        }
        match best {
            Some((_, best_matches)) if best_matches >= matches => {}
            _ => best = Some((layout, matches)),
        }
    }

    best.map(|(layout, _)| layout)
}

fn count_matches<S: AsRef<str>>(names: &[S], pred: impl Fn(&str) -> bool) -> usize {
    names.iter().filter(|n| pred(n.as_ref())).count()
}

/// Detect the vendor layout of an acquisition directory.
///
/// # Errors
///
/// * `FormatError::Io` - the directory cannot be listed
/// * `FormatError::UnsupportedLayout` - no file follows a known grammar
pub async fn detect_vendor(dir: &Path) -> Result<VendorLayout, FormatError> {
    let names = list_file_names(dir).await?;

    let layout = classify_names(&names).ok_or_else(|| FormatError::UnsupportedLayout {
        reason: format!(
            "no plane files in {} match a ZEN or Leica naming convention",
            dir.display()
        ),
    })?;

    debug!("Detected {} layout in {}", layout.name(), dir.display());
    Ok(layout)
}
