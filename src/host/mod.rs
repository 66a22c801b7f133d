//! Interfaces to the map host.
//!
//! The catalog engine never reaches for globals: everything it needs from the desktop
//! host (canvas, feature store, layer tree, raster loading, network, message bar) comes
//! in through these traits, bundled as a [`HostContext`].
//!
//! All methods take `&self`; implementations use interior mutability and must not hold
//! internal borrows while emitting on [`HostContext::events`], because handlers call
//! straight back into the host.

mod image_loader;
mod memory;

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use cotf_geo::{Crs, Extent, Footprint};
use thiserror::Error;

use crate::event::Publisher;
use crate::message::{HostEvent, MessageLevel};
use crate::model::{Feature, FeatureId, FeatureRequest, HighlightId, LayerId, LayerInfo, NodeId, TreeLayer};

pub use image_loader::{ImageRaster, ImageRasterLoader};
pub use memory::{MemoryHost, MemoryRaster, MemoryRasterLoader, PostedMessage};

/// Canvas state and overlays.
pub trait ViewProvider {
    /// Visible extent, in [`ViewProvider::crs`].
    fn extent(&self) -> Extent;

    fn crs(&self) -> Crs;

    /// Move the canvas. Hosts emit [`HostEvent::ExtentChanged`] synchronously.
    fn set_extent(&self, extent: Extent);

    fn refresh(&self);

    /// Create a (hidden) outline overlay.
    fn add_highlight(&self, request: HighlightRequest) -> HighlightId;

    fn set_highlight_visible(&self, id: HighlightId, visible: bool);

    fn remove_highlight(&self, id: HighlightId);
}

/// Outline overlay for one feature.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightRequest {
    /// Layer the geometry belongs to; the host draws it in that layer's CRS.
    pub layer_id: LayerId,
    pub geometry: Footprint,
    pub width: u32,
}

/// Layer catalogue and feature access.
pub trait LayerStore {
    fn layers(&self) -> Vec<LayerInfo>;

    fn layer(&self, layer_id: &str) -> Option<LayerInfo>;

    /// Lazily iterate features matching `request`. Unknown layers yield nothing.
    fn get_features<'a>(
        &'a self,
        layer_id: &str,
        request: &FeatureRequest,
    ) -> Box<dyn Iterator<Item = Feature> + 'a>;

    fn selected_ids(&self, layer_id: &str) -> BTreeSet<FeatureId>;
}

/// The host's layer tree.
pub trait LayerTree {
    fn root(&self) -> NodeId;

    /// Top-level group named `name`.
    fn find_group(&self, name: &str) -> Option<NodeId>;

    /// Append a top-level group.
    fn add_group(&self, name: &str) -> NodeId;

    /// Remove a node (and its children) from wherever it sits.
    fn remove_node(&self, node: NodeId);

    fn node_name(&self, node: NodeId) -> Option<String>;

    /// Tree node showing the given map layer.
    fn find_layer_node(&self, layer_id: &str) -> Option<NodeId>;

    /// Register a raster with the project and append it to `group`.
    fn add_raster(&self, group: NodeId, raster: Box<dyn RasterHandle>, name: &str) -> Option<TreeLayer>;

    fn remove_all_children(&self, group: NodeId);

    /// Layer nodes directly under `group`, in tree order.
    fn layers_in(&self, group: NodeId) -> Vec<TreeLayer>;

    fn layer_node(&self, node: NodeId) -> Option<TreeLayer>;

    fn set_visible(&self, node: NodeId, visible: bool);

    /// Layer currently selected in the tree view.
    fn current_layer(&self) -> Option<TreeLayer>;

    /// Select a layer node without activating it.
    fn set_current(&self, node: NodeId);
}

/// A raster could not be turned into a displayable layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct InvalidResource {
    pub reason: String,
}

impl InvalidResource {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Turns local files into raster layers.
pub trait RasterLoader {
    fn load(&self, path: &Path, display_name: &str) -> Result<Box<dyn RasterHandle>, InvalidResource>;
}

/// Pixel value rendered transparent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransparentPixel {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub percent_transparent: f64,
}

impl TransparentPixel {
    /// Pure black treated as "no data".
    pub const BLACK_NO_DATA: TransparentPixel = TransparentPixel {
        red: 0.0,
        green: 0.0,
        blue: 0.0,
        percent_transparent: 100.0,
    };

    pub fn matches(&self, r: u8, g: u8, b: u8) -> bool {
        f64::from(r) == self.red && f64::from(g) == self.green && f64::from(b) == self.blue
    }
}

/// A loaded raster layer.
pub trait RasterHandle: fmt::Debug {
    /// Local path the raster was loaded from.
    fn source(&self) -> &str;

    fn display_name(&self) -> &str;

    fn set_transparent_pixels(&mut self, pixels: Vec<TransparentPixel>);

    fn transparent_pixels(&self) -> &[TransparentPixel];
}

/// Network access for remote catalog sources.
pub trait RemoteFetcher {
    /// Whether the URL answers successfully.
    fn exists(&self, url: &str) -> bool;

    /// Download `url` into `destination`.
    fn fetch_to(&self, url: &str, destination: &Path) -> Result<u64, String>;
}

/// User-visible diagnostics (the host's message bar).
pub trait MessageSink {
    fn push_message(&self, level: MessageLevel, text: &str, duration: Duration);
}

/// Everything a controller needs from the host.
#[derive(Clone)]
pub struct HostContext {
    pub view: Rc<dyn ViewProvider>,
    pub store: Rc<dyn LayerStore>,
    pub tree: Rc<dyn LayerTree>,
    pub loader: Rc<dyn RasterLoader>,
    pub fetcher: Rc<dyn RemoteFetcher>,
    pub messages: Rc<dyn MessageSink>,
    pub events: Publisher<HostEvent>,
}

impl HostContext {
    /// Log a diagnostic and show it to the user.
    pub fn report(&self, level: MessageLevel, text: &str, duration: Duration) {
        match level {
            MessageLevel::Info => log::info!("{}", text),
            MessageLevel::Warning => log::warn!("{}", text),
            MessageLevel::Critical => log::error!("{}", text),
        }
        self.messages.push_message(level, text, duration);
    }
}

impl fmt::Debug for HostContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostContext")
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}
