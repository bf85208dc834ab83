//! Tile Manifest Builder.
//!
//! Turns one cycle's raw [`Acquisition`](crate::format::Acquisition) into a
//! [`TileManifest`]:
//!
//! 1. tiles get dense indices in acquisition order (never spatial order)
//! 2. every tile must carry the full channel set, otherwise the cycle is
//!    rejected with `ChannelCountMismatch`
//! 3. positions are origin-normalized into a [`PositionTable`]
//! 4. records are sorted by channel, then tile

mod builder;
mod position;

pub use builder::{build_manifest, TileManifest};
pub use position::{PixelOffset, PositionTable};
