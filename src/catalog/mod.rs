//! Catalog engine.
//!
//! A catalog is a polygon layer whose features each reference a raster (local path
//! or URL) and a capture date. For every bound catalog a [`CatalogController`] keeps
//! a tree group holding exactly the rasters whose footprint intersects the canvas,
//! most recent first, and tracks one active feature for highlighting and zooming.
//! The [`CatalogRegistry`] discovers catalogs and routes table toggles to them.

mod controller;
mod detect;
mod entries;
mod highlight;
mod registry;

#[cfg(test)]
mod tests;

pub use controller::{CatalogBinding, CatalogController, Modes, SharedController};
pub use detect::{detect_catalog_fields, CatalogFields};
pub use entries::{sort_by_recency, ImageEntries, ImageEntry};
pub use highlight::FeatureHighlight;
pub use registry::CatalogRegistry;
