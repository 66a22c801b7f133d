//! Reprojection between a canvas coordinate system and a layer coordinate system.
//!
//! When both systems are the same the bridge is an identity and never touches proj.

use geo::{Coord, LineString, MultiPolygon, Polygon};
use proj4rs::proj::Proj;
use proj4rs::transform::transform;

use crate::crs::Crs;
use crate::error::{CoordinateTransformError, Result};
use crate::extent::{self, Extent, Footprint};

/// Segments sampled on each side of an extent before reprojecting it.
pub const EXTENT_DENSIFY_SEGMENTS: usize = 20;

/// Latitude limit of spherical Mercator, in degrees.
pub const MERCATOR_MAX_LATITUDE: f64 = 85.051_128_779_806_6;

enum Strategy {
    Identity,
    Proj { source: Box<Proj>, target: Box<Proj> },
}

/// A one-way transform from `from` to `to`.
pub struct CoordinateBridge {
    from: Crs,
    to: Crs,
    strategy: Strategy,
}

impl std::fmt::Debug for CoordinateBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinateBridge")
            .field("from", &self.from.auth_id())
            .field("to", &self.to.auth_id())
            .field("identity", &self.is_identity())
            .finish()
    }
}

impl CoordinateBridge {
    /// Build a bridge between two systems.
    ///
    /// # Errors
    /// Returns [`CoordinateTransformError::UnsupportedCrs`] when either definition cannot
    /// be turned into a projection.
    pub fn new(from: &Crs, to: &Crs) -> Result<Self> {
        if from == to {
            return Ok(Self {
                from: from.clone(),
                to: to.clone(),
                strategy: Strategy::Identity,
            });
        }

        let source = build_proj(from)?;
        let target = build_proj(to)?;
        log::trace!("Coordinate bridge {} -> {}", from, to);
        Ok(Self {
            from: from.clone(),
            to: to.clone(),
            strategy: Strategy::Proj {
                source: Box::new(source),
                target: Box::new(target),
            },
        })
    }

    /// Bridge going the other way.
    pub fn reverse(&self) -> Result<Self> {
        Self::new(&self.to, &self.from)
    }

    pub fn is_identity(&self) -> bool {
        matches!(self.strategy, Strategy::Identity)
    }

    pub fn from_crs(&self) -> &Crs {
        &self.from
    }

    pub fn to_crs(&self) -> &Crs {
        &self.to
    }

    /// Transform a single coordinate.
    pub fn transform_coord(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        let (source, target) = match &self.strategy {
            Strategy::Identity => return Ok(coord),
            Strategy::Proj { source, target } => (source, target),
        };

        let (x, y) = if self.from.is_geographic() {
            (coord.x.to_radians(), coord.y.to_radians())
        } else {
            (coord.x, coord.y)
        };
        let mut point = (x, y, 0.0);
        transform(source, target, &mut point).map_err(|e| self.failure(format!("{e:?}")))?;

        let (x, y) = if self.to.is_geographic() {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };
        if !x.is_finite() || !y.is_finite() {
            return Err(self.failure(format!(
                "({}, {}) has no finite image",
                coord.x, coord.y
            )));
        }
        Ok(Coord { x, y })
    }

    /// Transform an extent, returning the bounding box of its densified boundary.
    ///
    /// Geographic latitudes are clamped to the Mercator limit before projecting and
    /// samples without a finite image are skipped. The transform only fails when no
    /// sample survives.
    pub fn transform_extent(&self, extent: &Extent) -> Result<Extent> {
        if self.is_identity() {
            return Ok(*extent);
        }
        let clamp = self.from.is_geographic() && !self.to.is_geographic();
        let mut last_error = None;
        let projected: Vec<Coord<f64>> = extent::boundary_samples(extent, EXTENT_DENSIFY_SEGMENTS)
            .into_iter()
            .map(|c| {
                if clamp {
                    Coord {
                        x: c.x,
                        y: c.y.clamp(-MERCATOR_MAX_LATITUDE, MERCATOR_MAX_LATITUDE),
                    }
                } else {
                    c
                }
            })
            .filter_map(|c| match self.transform_coord(c) {
                Ok(p) => Some(p),
                Err(e) => {
                    last_error = Some(e);
                    None
                }
            })
            .collect();

        if let Some(e) = &last_error {
            log::debug!("Skipped boundary samples outside the target domain: {}", e);
        }
        match extent::extent_of(&projected) {
            Some(out) => Ok(out),
            None => Err(last_error.unwrap_or_else(|| self.failure("empty extent".to_string()))),
        }
    }

    /// Transform every vertex of a footprint.
    pub fn transform_footprint(&self, footprint: &Footprint) -> Result<Footprint> {
        if self.is_identity() {
            return Ok(footprint.clone());
        }
        let polygons = footprint
            .0
            .iter()
            .map(|polygon| {
                let exterior = self.transform_ring(polygon.exterior())?;
                let interiors = polygon
                    .interiors()
                    .iter()
                    .map(|ring| self.transform_ring(ring))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Polygon::new(exterior, interiors))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(MultiPolygon(polygons))
    }

    fn transform_ring(&self, ring: &LineString<f64>) -> Result<LineString<f64>> {
        ring.coords()
            .map(|c| self.transform_coord(*c))
            .collect::<Result<Vec<_>>>()
            .map(LineString::new)
    }

    fn failure(&self, reason: String) -> CoordinateTransformError {
        CoordinateTransformError::Projection {
            from: self.from.auth_id().to_string(),
            to: self.to.auth_id().to_string(),
            reason,
        }
    }
}

fn build_proj(crs: &Crs) -> Result<Proj> {
    Proj::from_proj_string(crs.definition()).map_err(|e| {
        CoordinateTransformError::UnsupportedCrs {
            auth_id: crs.auth_id().to_string(),
            reason: format!("{e:?}"),
        }
    })
}
