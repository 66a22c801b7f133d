//! Catalog On The Fly - raster catalogs that follow the map canvas.
//!
//! A catalog is a polygon layer whose features carry an image source and a capture
//! date. For every enabled catalog, a controller keeps a layer-tree group holding
//! exactly the images whose footprints intersect the canvas, most recent first.
//!
//! The engine is host agnostic: the canvas, the layer store, the layer tree and the
//! raster loader are injected through the traits in [`host`]. [`host::MemoryHost`]
//! implements all of them in memory.

pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod fetch;
pub mod host;
pub mod message;
pub mod model;
pub mod scenario;
pub mod table;

pub use catalog::{CatalogController, CatalogRegistry, SharedController};
pub use config::{CatalogConfig, ConfigError, ControllerSettings, LogLevel};
pub use error::CatalogError;
pub use event::{Publisher, Subscription};
pub use fetch::{HttpFetcher, TileCache};
pub use host::{HostContext, ImageRasterLoader, MemoryHost};
pub use message::{CatalogEvent, HostEvent, MessageLevel, ToggleKind};
pub use scenario::{Scenario, ScenarioError};
pub use table::CatalogTableView;
