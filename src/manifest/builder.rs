//! Validation and ordering of one cycle's tile records.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::error::ManifestError;
use crate::format::{Acquisition, Calibration, CycleId, PixelPosition, TileRecord, VendorFormat};

use super::position::{PixelOffset, PositionTable};

/// A validated cycle, ready for the mosaic writer.
///
/// Records are sorted by channel, then tile. Tile indices are dense and
/// follow acquisition order; channel indices are dense and follow the
/// sorted channel tokens.
#[derive(Debug, Clone)]
pub struct TileManifest {
    pub id: CycleId,
    pub vendor: VendorFormat,
    pub calibration: Calibration,
    pub channel_count: usize,
    pub tile_count: usize,
    pub records: Vec<TileRecord>,
    pub positions: PositionTable,
}

impl TileManifest {
    /// Look up the record for one (tile, channel).
    pub fn record(&self, tile: usize, channel: usize) -> Option<&TileRecord> {
        if tile >= self.tile_count || channel >= self.channel_count {
            return None;
        }
        // Sorted by (channel, tile) with every pair present
        self.records.get(channel * self.tile_count + tile)
    }

    /// Records of one tile in channel order.
    pub fn tile_records(&self, tile: usize) -> impl Iterator<Item = &TileRecord> + '_ {
        (0..self.channel_count).filter_map(move |channel| self.record(tile, channel))
    }

    pub fn offset(&self, tile: usize) -> Option<PixelOffset> {
        self.positions.get(tile)
    }
}

/// Validate an acquisition and derive its position table.
///
/// # Errors
///
/// * `ManifestError::EmptyAcquisition` - no records
/// * `ManifestError::DuplicateRecord` - a (tile, channel) appears twice
/// * `ManifestError::ChannelCountMismatch` - a tile lacks channels other tiles have
pub fn build_manifest(acquisition: Acquisition) -> Result<TileManifest, ManifestError> {
    let Acquisition {
        id,
        vendor,
        calibration,
        records,
    } = acquisition;

    if records.is_empty() {
        return Err(ManifestError::EmptyAcquisition { cycle: id });
    }

    // Dense tile indices by first appearance, with that record's position
    let mut tile_index: HashMap<usize, usize> = HashMap::new();
    let mut raw_positions: Vec<PixelPosition> = Vec::new();
    for record in &records {
        tile_index.entry(record.tile).or_insert_with(|| {
            raw_positions.push(record.position);
            raw_positions.len() - 1
        });
    }
    let tile_count = raw_positions.len();

    let channel_tokens: BTreeSet<usize> = records.iter().map(|r| r.channel).collect();
    let channel_index: BTreeMap<usize, usize> = channel_tokens
        .iter()
        .enumerate()
        .map(|(rank, token)| (*token, rank))
        .collect();
    let channel_count = channel_index.len();

    let mut seen = HashSet::new();
    let mut per_tile = vec![0usize; tile_count];
    let mut ordered = Vec::with_capacity(records.len());
    for mut record in records {
        record.tile = tile_index[&record.tile];
        record.channel = channel_index[&record.channel];
        if !seen.insert((record.tile, record.channel)) {
            return Err(ManifestError::DuplicateRecord {
                cycle: id,
                tile: record.tile,
                channel: record.channel,
            });
        }
        per_tile[record.tile] += 1;
        ordered.push(record);
    }

    if let Some((tile, &actual)) = per_tile
        .iter()
        .enumerate()
        .find(|&(_, &count)| count != channel_count)
    {
        return Err(ManifestError::ChannelCountMismatch {
            cycle: id,
            tile,
            expected: channel_count,
            actual,
        });
    }

    ordered.sort_by_key(|r| (r.channel, r.tile));
    let positions = PositionTable::normalize(&raw_positions);

    debug!(
        "Manifest for {}: {} tiles x {} channels",
        id, tile_count, channel_count
    );

    Ok(TileManifest {
        id,
        vendor,
        calibration,
        channel_count,
        tile_count,
        records: ordered,
        positions,
    })
}
