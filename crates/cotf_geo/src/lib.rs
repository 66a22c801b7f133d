//! Geometry layer for catalog-on-the-fly.
//!
//! Coordinate systems, extent/footprint helpers, the reprojection bridge and the
//! per-recompute spatial index. Nothing here knows about hosts or catalogs.

pub mod bridge;
pub mod crs;
pub mod error;
pub mod extent;
pub mod index;

pub use bridge::CoordinateBridge;
pub use crs::Crs;
pub use error::{CoordinateTransformError, Result};
pub use extent::{Extent, Footprint};
pub use index::GeometryIndex;
