//! Tile position ledger.
//!
//! Plain text, no header, one `x,y` pair per line. Line `n` is tile `n`.

use std::path::Path;

use crate::error::{IoError, RetileError};
use crate::manifest::PixelOffset;

/// Render offsets as ledger text.
pub fn format_ledger(offsets: &[PixelOffset]) -> String {
    offsets
        .iter()
        .map(|o| format!("{},{}\n", o.x, o.y))
        .collect()
}

/// Parse ledger text back into offsets.
pub fn parse_ledger(text: &str, source_id: &str) -> Result<Vec<PixelOffset>, RetileError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(number, line)| {
            let parsed = line
                .split_once(',')
                .and_then(|(x, y)| Some(PixelOffset::new(x.trim().parse().ok()?, y.trim().parse().ok()?)));
            parsed.ok_or_else(|| {
                RetileError::Io(IoError::Read {
                    path: source_id.to_string(),
                    message: format!("line {}: expected x,y, got {:?}", number + 1, line),
                })
            })
        })
        .collect()
}

/// Write the ledger atomically.
pub async fn write_ledger(path: &Path, offsets: &[PixelOffset]) -> Result<(), RetileError> {
    let tmp = path.with_extension("csv.tmp");
    tokio::fs::write(&tmp, format_ledger(offsets))
        .await
        .map_err(|e| IoError::write(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| IoError::write(path, e))?;
    Ok(())
}

/// Read a ledger file.
pub async fn read_ledger(path: &Path) -> Result<Vec<PixelOffset>, RetileError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| IoError::read(path, e))?;
    parse_ledger(&text, &path.display().to_string())
}
