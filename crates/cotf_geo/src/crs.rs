//! Coordinate reference systems.
//!
//! A [`Crs`] is an authority id (`EPSG:4326`) plus the proj definition used to build
//! projections. Two systems are the same when their authority ids match, regardless of
//! how their definitions are spelled.

use std::fmt;
use std::hash::{Hash, Hasher};

/// WGS84 geographic (longitude/latitude in degrees).
pub const EPSG_WGS84: u32 = 4326;
/// Spherical Web Mercator.
pub const EPSG_WEB_MERCATOR: u32 = 3857;
/// ETRS89 geographic.
pub const EPSG_ETRS89: u32 = 4258;
/// SIRGAS 2000 geographic.
pub const EPSG_SIRGAS_2000: u32 = 4674;

/// A coordinate reference system.
#[derive(Debug, Clone)]
pub struct Crs {
    auth_id: String,
    definition: String,
    geographic: bool,
}

impl Crs {
    /// Look up a built-in EPSG definition.
    ///
    /// Covers the common geographic systems, Web Mercator and every WGS84 UTM zone
    /// (326xx north, 327xx south).
    pub fn epsg(code: u32) -> Option<Self> {
        let definition = epsg_definition(code)?;
        Some(Self::custom(format!("EPSG:{code}"), definition))
    }

    /// WGS84 longitude/latitude.
    pub fn wgs84() -> Self {
        Self::custom(
            format!("EPSG:{EPSG_WGS84}"),
            "+proj=longlat +datum=WGS84 +no_defs",
        )
    }

    /// Spherical Web Mercator.
    pub fn web_mercator() -> Self {
        Self::custom(
            format!("EPSG:{EPSG_WEB_MERCATOR}"),
            "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +nadgrids=@null +no_defs",
        )
    }

    /// Build a system from an explicit proj definition.
    ///
    /// The definition is not validated here; an unusable definition surfaces as a
    /// transform error the first time a bridge is built from it.
    pub fn custom(auth_id: impl Into<String>, definition: impl Into<String>) -> Self {
        let definition = definition.into();
        let geographic =
            definition.contains("+proj=longlat") || definition.contains("+proj=latlong");
        Self {
            auth_id: auth_id.into(),
            definition,
            geographic,
        }
    }

    /// Parse an authority id such as `EPSG:32723` (case-insensitive prefix).
    pub fn from_auth_id(auth_id: &str) -> Option<Self> {
        let (authority, code) = auth_id.trim().split_once(':')?;
        if !authority.eq_ignore_ascii_case("EPSG") {
            return None;
        }
        Self::epsg(code.trim().parse().ok()?)
    }

    pub fn auth_id(&self) -> &str {
        &self.auth_id
    }

    pub fn definition(&self) -> &str {
        &self.definition
    }

    /// Whether coordinates are expressed in degrees.
    pub fn is_geographic(&self) -> bool {
        self.geographic
    }
}

impl PartialEq for Crs {
    fn eq(&self, other: &Self) -> bool {
        self.auth_id.eq_ignore_ascii_case(&other.auth_id)
    }
}

impl Eq for Crs {}

impl Hash for Crs {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.auth_id.to_ascii_uppercase().hash(state);
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.auth_id)
    }
}

fn epsg_definition(code: u32) -> Option<String> {
    let definition = match code {
        EPSG_WGS84 => "+proj=longlat +datum=WGS84 +no_defs".to_string(),
        EPSG_WEB_MERCATOR => Crs::web_mercator().definition,
        EPSG_ETRS89 | EPSG_SIRGAS_2000 => {
            "+proj=longlat +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +no_defs".to_string()
        }
        32601..=32660 => format!(
            "+proj=utm +zone={} +datum=WGS84 +units=m +no_defs",
            code - 32600
        ),
        32701..=32760 => format!(
            "+proj=utm +zone={} +south +datum=WGS84 +units=m +no_defs",
            code - 32700
        ),
        _ => return None,
    };
    Some(definition)
}
