//! Filename token grammars for vendor TIFF exports.
//!
//! | Convention | Pattern |
//! |---|---|
//! | ZEN export | `Base_{cycle}_c{channel}m{tile}[_suffix].tif` |
//! | Leica navigator | `{region}--Stage{tile}[--Z{z}]--C{channel}.tif` |
//! | Leica exported | `{region}_s{tile}[_z{z}]_ch{channel}.tif` |
//!
//! Numeric tokens are kept both as parsed numbers (for ordering) and as the
//! original text (for rebuilding names).

use std::sync::OnceLock;

use regex::Regex;

fn zen_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^Base_(?P<cycle>\d+)_c(?P<channel>\d+)m(?P<tile>\d+)(?:_[^.]*)?\.tiff?$")
            .expect("valid ZEN filename regex")
    })
}

fn leica_navigator_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?P<region>.+?)--Stage(?P<tile>\d+)(?:--Z(?P<z>\d+))?--C(?P<channel>\d+)\.tiff?$",
        )
        .expect("valid Leica navigator filename regex")
    })
}

fn leica_exported_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?P<region>[^_]+)_s(?P<tile>\d+)(?:_z(?P<z>\d+))?_ch(?P<channel>\d+)\.tiff?$",
        )
        .expect("valid Leica exported filename regex")
    })
}

/// Tokens of a ZEN export plane filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZenName {
    pub cycle: u32,
    pub channel: u32,
    pub tile: u32,
    pub tile_token: String,
}

/// Parse `Base_{cycle}_c{channel}m{tile}[_suffix].tif`.
pub fn parse_zen_name(name: &str) -> Option<ZenName> {
    let caps = zen_regex().captures(name)?;
    let tile_token = caps["tile"].to_string();
    Some(ZenName {
        cycle: caps["cycle"].parse().ok()?,
        channel: caps["channel"].parse().ok()?,
        tile: tile_token.parse().ok()?,
        tile_token,
    })
}

/// Which Leica filename grammar a directory uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeicaNaming {
    /// `{region}--Stage{tile}--Z{z}--C{channel}.tif`
    Navigator,

    /// `{region}_s{tile}_z{z}_ch{channel}.tif`
    Exported,
}

impl LeicaNaming {
    pub const fn name(&self) -> &'static str {
        match self {
            LeicaNaming::Navigator => "Leica navigator",
            LeicaNaming::Exported => "Leica exported",
        }
    }

    /// Parse a filename with this grammar.
    ///
    /// Deconvolved outputs (`dw` in the name) never match.
    pub fn parse(&self, name: &str) -> Option<LeicaName> {
        if name.contains("dw") {
            return None;
        }
        let re = match self {
            LeicaNaming::Navigator => leica_navigator_regex(),
            LeicaNaming::Exported => leica_exported_regex(),
        };
        let caps = re.captures(name)?;
        Some(LeicaName {
            region: caps["region"].to_string(),
            tile: caps["tile"].parse().ok()?,
            z: match caps.name("z") {
                Some(z) => z.as_str().parse().ok()?,
                None => 0,
            },
            channel: caps["channel"].parse().ok()?,
        })
    }
}

/// Tokens of a Leica export plane filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeicaName {
    pub region: String,
    pub tile: u32,
    pub z: u32,
    pub channel: u32,
}
