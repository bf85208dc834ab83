//! File names used by the retiling pass.

/// Ledger file written at the retile root.
pub const LEDGER_FILE_NAME: &str = "tilepos.csv";

/// Cycle and channel (both 0-based) encoded in a stitched canvas name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanvasId {
    pub cycle: u32,
    pub channel: u32,
}

impl CanvasId {
    /// Directory holding this canvas's tiles.
    pub fn tile_dir_name(&self) -> String {
        format!("Base_{}_stitched-{}", self.cycle + 1, self.channel + 1)
    }

    /// Checkpoint file for this canvas's cycle.
    pub fn checkpoint_file_name(&self) -> String {
        format!("Base_{}.checkpoint.json", self.cycle + 1)
    }
}

fn digits(token: &str) -> Option<u32> {
    let digits: String = token.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Stitched canvas file name grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CanvasNaming {
    /// `Round{cycle}_{channel}.tif`, both 0-based
    #[default]
    Round,

    /// `Base_{cycle}_stitched-{channel}.tif`, both 1-based
    LegacyStitched,
}

/// Parse a stitched canvas name under `naming`.
///
/// `Round`: the cycle is the digits of the first `_`-separated token, the
/// channel the digits of the second one (extension excluded).
/// `LegacyStitched`: the cycle is the digits of the second `_`-separated
/// token and the channel the digits after the first `-`; both are shifted
/// to 0-based, so a `0` token is rejected.
pub fn parse_canvas_name(name: &str, naming: CanvasNaming) -> Option<CanvasId> {
    let lower = name.to_ascii_lowercase();
    if !(lower.ends_with(".tif") || lower.ends_with(".tiff")) {
        return None;
    }
    let stem = name.split_once('.').map(|(stem, _)| stem)?;
    match naming {
        CanvasNaming::Round => {
            let mut parts = stem.split('_');
            let cycle = digits(parts.next()?)?;
            let channel = digits(parts.next()?)?;
            Some(CanvasId { cycle, channel })
        }
        CanvasNaming::LegacyStitched => {
            let cycle = digits(stem.split('_').nth(1)?)?.checked_sub(1)?;
            let channel = digits(stem.split_once('-')?.1)?.checked_sub(1)?;
            Some(CanvasId { cycle, channel })
        }
    }
}

/// Tile file name for a 1-based raster index.
pub fn tile_file_name(index: usize) -> String {
    format!("tile{}.tif", index)
}
