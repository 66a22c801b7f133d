//! The active feature of a catalog: its outline overlay and zoom target.

use std::rc::Rc;
use std::time::Duration;

use cotf_geo::{extent, CoordinateBridge, Crs, Footprint};
use web_time::Instant;

use super::entries::ImageEntries;
use crate::error::{CatalogError, Result};
use crate::host::{HighlightRequest, HostContext, LayerStore, ViewProvider};
use crate::model::{FeatureId, FeatureRequest, HighlightId, LayerId, LayerInfo};

#[derive(Debug)]
struct ActiveFeature {
    image: String,
    fid: FeatureId,
    geometry: Footprint,
    overlay: HighlightId,
}

/// Holds at most one active feature per catalog.
///
/// The overlay is created hidden when a feature is bound. [`FeatureHighlight::highlight`]
/// shows it until a deadline; the owner calls [`FeatureHighlight::poll`] from its event
/// loop to hide it once the deadline passes.
pub struct FeatureHighlight {
    view: Rc<dyn ViewProvider>,
    store: Rc<dyn LayerStore>,
    layer_id: LayerId,
    layer_name: String,
    layer_crs: Crs,
    width: u32,
    active: Option<ActiveFeature>,
    hide_at: Option<Instant>,
}

impl FeatureHighlight {
    pub fn new(ctx: &HostContext, layer: &LayerInfo, width: u32) -> Self {
        Self {
            view: Rc::clone(&ctx.view),
            store: Rc::clone(&ctx.store),
            layer_id: layer.id.clone(),
            layer_name: layer.name.clone(),
            layer_crs: layer.crs.clone(),
            width,
            active: None,
            hide_at: None,
        }
    }

    /// Image identifier of the active feature.
    pub fn image(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.image.as_str())
    }

    pub fn feature_id(&self) -> Option<FeatureId> {
        self.active.as_ref().map(|a| a.fid)
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_none()
    }

    /// Whether the overlay is currently shown (deadline not yet polled away).
    pub fn is_highlighted(&self) -> bool {
        self.active.is_some() && self.hide_at.is_some()
    }

    pub fn set_layer_name(&mut self, name: &str) {
        self.layer_name = name.to_string();
    }

    /// Make the feature behind `image` the active one.
    ///
    /// Binding the image that is already active does nothing. On error the previous
    /// state is kept.
    pub fn bind(&mut self, image: &str, entries: &ImageEntries) -> Result<()> {
        if self.image() == Some(image) {
            return Ok(());
        }

        let entry = entries
            .get(image)
            .ok_or_else(|| CatalogError::NotACatalogImage {
                image: image.to_string(),
                layer: self.layer_name.clone(),
            })?;

        let request = FeatureRequest::by_id(entry.fid).no_attributes().limit(1);
        let geometry = self
            .store
            .get_features(&self.layer_id, &request)
            .next()
            .and_then(|f| f.footprint().cloned())
            .ok_or_else(|| CatalogError::GeometryInvalid {
                fid: entry.fid,
                layer: self.layer_name.clone(),
            })?;

        self.clear();
        let overlay = self.view.add_highlight(HighlightRequest {
            layer_id: self.layer_id.clone(),
            geometry: geometry.clone(),
            width: self.width,
        });
        self.active = Some(ActiveFeature {
            image: image.to_string(),
            fid: entry.fid,
            geometry,
            overlay,
        });
        log::debug!("Active image of '{}' is now {}", self.layer_name, image);
        Ok(())
    }

    /// Drop the active feature and its overlay. Idempotent.
    pub fn clear(&mut self) {
        self.hide_at = None;
        if let Some(active) = self.active.take() {
            self.view.remove_highlight(active.overlay);
            self.view.refresh();
        }
    }

    /// Show the outline for `duration`. Calling again restarts the countdown.
    pub fn highlight(&mut self, duration: Duration) {
        self.highlight_at(duration, Instant::now());
    }

    pub fn highlight_at(&mut self, duration: Duration, now: Instant) {
        let Some(active) = &self.active else {
            return;
        };
        self.view.set_highlight_visible(active.overlay, true);
        self.view.refresh();
        self.hide_at = Some(now + duration);
    }

    /// Hide the outline if its deadline has passed. Returns true when it was hidden.
    pub fn poll(&mut self) -> bool {
        self.poll_at(Instant::now())
    }

    pub fn poll_at(&mut self, now: Instant) -> bool {
        match (self.hide_at, &self.active) {
            (Some(deadline), Some(active)) if now >= deadline => {
                self.view.set_highlight_visible(active.overlay, false);
                self.view.refresh();
                self.hide_at = None;
                true
            }
            _ => false,
        }
    }

    /// Move the canvas onto the active feature's bounding box.
    ///
    /// The canvas answers with an extent-changed notification, so callers must have
    /// their own extent handler muted around this call.
    pub fn zoom_to_feature(&self) -> Result<()> {
        let Some(active) = &self.active else {
            return Ok(());
        };
        let Some(bbox) = extent::footprint_bounds(&active.geometry) else {
            return Ok(());
        };

        let bridge = CoordinateBridge::new(&self.layer_crs, &self.view.crs())?;
        let target = bridge.transform_extent(&bbox)?;
        self.view.set_extent(target);
        self.view.refresh();
        Ok(())
    }
}

impl std::fmt::Debug for FeatureHighlight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureHighlight")
            .field("layer_id", &self.layer_id)
            .field("active", &self.active)
            .field("hide_at", &self.hide_at)
            .finish_non_exhaustive()
    }
}
