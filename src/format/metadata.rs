//! Stage-position metadata parsing.
//!
//! Vendor metadata files are small XML documents where every value of
//! interest sits in element attributes. Rather than building a DOM, the
//! scanner below finds the start tags of one element name and reads their
//! attributes.
//!
//! Two documents are understood:
//!
//! - **ExportDocument** (ZEN): `<Bounds StartX=".." StartY=".." StartM=".."/>`
//!   with positions already in pixels.
//! - **TileScanInfo** (Leica): `<Tile FieldX=".." FieldY=".." PosX=".." PosY=".."/>`
//!   with positions in metres.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::FormatError;

fn attribute_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([A-Za-z_][\w:.-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
            .expect("valid XML attribute regex")
    })
}

/// Attributes of one start tag, in document order of the element.
pub type Attributes = HashMap<String, String>;

/// Find every `<tag ...>` start tag and return its attributes, in document order.
pub fn find_elements(xml: &str, tag: &str) -> Vec<Attributes> {
    let needle = format!("<{tag}");
    let mut found = Vec::new();
    let mut rest = xml;

    while let Some(pos) = rest.find(&needle) {
        let after = &rest[pos + needle.len()..];

        // Reject longer names sharing the prefix (e.g. <Tiles> for <Tile>)
        let boundary = after.chars().next();
        let is_match = matches!(boundary, Some(c) if c.is_whitespace() || c == '/' || c == '>');
        let Some(end) = after.find('>') else {
            break;
        };

        if is_match {
            let body = &after[..end];
            let attrs = attribute_regex()
                .captures_iter(body)
                .map(|caps| {
                    let value = caps
                        .get(2)
                        .or_else(|| caps.get(3))
                        .map(|m| m.as_str())
                        .unwrap_or_default();
                    (caps[1].to_string(), unescape(value))
                })
                .collect();
            found.push(attrs);
        }

        rest = &after[end..];
    }

    found
}

fn unescape(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Escape a value for use inside a double-quoted XML attribute or text node.
pub fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn required_f64(attrs: &Attributes, key: &str, source_id: &str) -> Result<f64, FormatError> {
    let raw = attrs
        .get(key)
        .ok_or_else(|| FormatError::InvalidMetadata {
            source_id: source_id.to_string(),
            message: format!("missing attribute {key}"),
        })?;
    raw.trim()
        .parse::<f64>()
        .map_err(|e| FormatError::InvalidMetadata {
            source_id: source_id.to_string(),
            message: format!("attribute {key}={raw:?}: {e}"),
        })
}

// =============================================================================
// ExportDocument (ZEN)
// =============================================================================

/// One `Bounds` entry of a ZEN export document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportBounds {
    /// `StartM` tile index
    pub tile: usize,
    pub x: f64,
    pub y: f64,
}

/// Parse every `Bounds` element of a ZEN `ExportDocument`.
pub fn parse_export_bounds(xml: &str, source_id: &str) -> Result<Vec<ExportBounds>, FormatError> {
    find_elements(xml, "Bounds")
        .iter()
        .map(|attrs| {
            let tile = required_f64(attrs, "StartM", source_id)?;
            Ok(ExportBounds {
                tile: tile as usize,
                x: required_f64(attrs, "StartX", source_id)?,
                y: required_f64(attrs, "StartY", source_id)?,
            })
        })
        .collect()
}

/// Collapse export bounds to one position per distinct `StartM`, keeping
/// the first occurrence and document order.
pub fn distinct_tile_positions(bounds: &[ExportBounds]) -> Vec<ExportBounds> {
    let mut seen = std::collections::HashSet::new();
    bounds
        .iter()
        .filter(|b| seen.insert(b.tile))
        .copied()
        .collect()
}

// =============================================================================
// TileScanInfo (Leica)
// =============================================================================

/// One `Tile` entry of a Leica tile-scan attachment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileScanEntry {
    pub field_x: Option<i64>,
    pub field_y: Option<i64>,

    /// Stage X in metres
    pub pos_x: f64,

    /// Stage Y in metres
    pub pos_y: f64,
}

/// Parse every `Tile` element of a Leica `TileScanInfo` document.
pub fn parse_tile_scan(xml: &str, source_id: &str) -> Result<Vec<TileScanEntry>, FormatError> {
    find_elements(xml, "Tile")
        .iter()
        .map(|attrs| {
            Ok(TileScanEntry {
                field_x: attrs.get("FieldX").and_then(|v| v.trim().parse().ok()),
                field_y: attrs.get("FieldY").and_then(|v| v.trim().parse().ok()),
                pos_x: required_f64(attrs, "PosX", source_id)?,
                pos_y: required_f64(attrs, "PosY", source_id)?,
            })
        })
        .collect()
}
