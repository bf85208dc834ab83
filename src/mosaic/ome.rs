//! OME-XML description for mosaic containers.
//!
//! The description lives in the first IFD's `ImageDescription`. Each tile
//! is one OME `Image` whose channels map to consecutive IFDs:
//!
//! ```text
//! IFD 0 .. C-1        tile 0, channels 0..C
//! IFD C .. 2C-1       tile 1, channels 0..C
//! ...
//! ```
//!
//! TIFF ASCII tags cannot carry UTF-8, so every non-ASCII character is
//! written as a numeric character reference.

use std::fmt::Write as _;

use crate::format::metadata::escape;
use crate::format::Calibration;
use crate::manifest::TileManifest;
use crate::plane::PlaneShape;

const OME_NAMESPACE: &str = "http://www.openmicroscopy.org/Schemas/OME/2016-06";
const OME_SCHEMA_LOCATION: &str =
    "http://www.openmicroscopy.org/Schemas/OME/2016-06 http://www.openmicroscopy.org/Schemas/OME/2016-06/ome.xsd";

/// Replace every non-ASCII character with an XML character reference.
pub fn ascii_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let _ = write!(out, "&#{};", c as u32);
        }
    }
    out
}

/// Format a physical quantity without trailing float noise.
fn physical(value: f64) -> String {
    let text = format!("{:.6}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text.is_empty() || text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// Generate the OME-XML description for a cycle's mosaic container.
///
/// # Example
///
/// ```ignore
/// let xml = generate_ome_xml(&manifest, PlaneShape::new(2048, 2048));
/// assert!(xml.contains("DimensionOrder=\"XYCZT\""));
/// ```
pub fn generate_ome_xml(manifest: &TileManifest, shape: PlaneShape) -> String {
    let calibration: Calibration = manifest.calibration;
    let unit = ascii_xml(&escape(calibration.unit()));
    let size = physical(calibration.pixel_size_um);
    let channels = manifest.channel_count;

    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = writeln!(
        xml,
        "<OME xmlns=\"{}\" xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" xsi:schemaLocation=\"{}\" Creator=\"mosaic-prep {}\">",
        OME_NAMESPACE,
        OME_SCHEMA_LOCATION,
        env!("CARGO_PKG_VERSION")
    );

    for (tile, offset) in manifest.positions.iter() {
        let _ = writeln!(
            xml,
            "  <Image ID=\"Image:{tile}\" Name=\"{stem}_tile{tile}\">",
            tile = tile,
            stem = manifest.id.file_stem()
        );
        let _ = writeln!(
            xml,
            "    <Pixels ID=\"Pixels:{tile}\" DimensionOrder=\"XYCZT\" Type=\"uint16\" SizeX=\"{w}\" SizeY=\"{h}\" SizeC=\"{c}\" SizeZ=\"1\" SizeT=\"1\" PhysicalSizeX=\"{size}\" PhysicalSizeXUnit=\"{unit}\" PhysicalSizeY=\"{size}\" PhysicalSizeYUnit=\"{unit}\">",
            tile = tile,
            w = shape.width,
            h = shape.height,
            c = channels,
            size = size,
            unit = unit
        );
        for channel in 0..channels {
            let _ = writeln!(
                xml,
                "      <Channel ID=\"Channel:{}:{}\" SamplesPerPixel=\"1\"/>",
                tile, channel
            );
        }
        let _ = writeln!(
            xml,
            "      <TiffData IFD=\"{}\" PlaneCount=\"{}\"/>",
            tile * channels,
            channels
        );

        let x = physical(calibration.to_physical_um(offset.x));
        let y = physical(calibration.to_physical_um(offset.y));
        for channel in 0..channels {
            let _ = writeln!(
                xml,
                "      <Plane TheC=\"{}\" TheZ=\"0\" TheT=\"0\" PositionX=\"{}\" PositionXUnit=\"{}\" PositionY=\"{}\" PositionYUnit=\"{}\"/>",
                channel, x, unit, y, unit
            );
        }
        xml.push_str("    </Pixels>\n");
        xml.push_str("  </Image>\n");
    }

    xml.push_str("</OME>\n");
    xml
}
