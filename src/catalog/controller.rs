//! Catalog controller: keeps one catalog group in step with the canvas.

use std::cell::RefCell;
use std::path::Path;
use std::rc::{Rc, Weak};
use std::time::Duration;

use cotf_geo::{extent, CoordinateBridge, GeometryIndex};
use web_time::Instant;

use super::detect::CatalogFields;
use super::entries::{sort_by_recency, ImageEntries, ImageEntry};
use super::highlight::FeatureHighlight;
use crate::config::ControllerSettings;
use crate::constants::{
    group_name, CRITICAL_MESSAGE_SECS, DATE_FORMAT, LOAD_FAILURE_MESSAGE_SECS,
    WARNING_MESSAGE_SECS,
};
use crate::error::{CatalogError, Result};
use crate::event::{Publisher, Subscription, Suppressed};
use crate::fetch::{basename, TileCache};
use crate::host::{HostContext, TransparentPixel};
use crate::message::{CatalogEvent, HostEvent, MessageLevel};
use crate::model::{FeatureRequest, LayerId, LayerInfo, NodeId, TreeLayer};

/// A polygon layer bound as a catalog.
#[derive(Debug)]
pub struct CatalogBinding {
    layer: LayerInfo,
    fields: CatalogFields,
    entries: ImageEntries,
    active: FeatureHighlight,
}

impl CatalogBinding {
    pub fn layer(&self) -> &LayerInfo {
        &self.layer
    }

    pub fn fields(&self) -> &CatalogFields {
        &self.fields
    }

    pub fn entries(&self) -> &ImageEntries {
        &self.entries
    }
}

/// Per-catalog mode toggles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modes {
    /// Restrict the query region to the selected features.
    pub selected: bool,
    /// Flash the active feature after activation and view changes.
    pub highlight: bool,
    /// Zoom to the active feature on activation.
    pub zoom: bool,
}

/// Shared handle to a controller. Host event handlers hold it weakly.
pub type SharedController = Rc<RefCell<CatalogController>>;

/// Owns the binding, the catalog group and the active feature of one catalog layer.
pub struct CatalogController {
    ctx: HostContext,
    settings: ControllerSettings,
    tiles: TileCache,
    events: Publisher<CatalogEvent>,
    this: Weak<RefCell<CatalogController>>,
    binding: Option<CatalogBinding>,
    group: Option<NodeId>,
    group_name: Option<String>,
    subscription: Option<Subscription>,
    modes: Modes,
    recomputes: usize,
}

impl CatalogController {
    pub fn new(
        ctx: HostContext,
        settings: ControllerSettings,
        events: Publisher<CatalogEvent>,
    ) -> SharedController {
        let tiles = TileCache::new(settings.scratch_dir.clone(), Rc::clone(&ctx.fetcher));
        Rc::new_cyclic(|this| {
            RefCell::new(Self {
                ctx,
                settings,
                tiles,
                events,
                this: this.clone(),
                binding: None,
                group: None,
                group_name: None,
                subscription: None,
                modes: Modes::default(),
                recomputes: 0,
            })
        })
    }

    pub fn binding(&self) -> Option<&CatalogBinding> {
        self.binding.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// Whether view changes are being followed.
    pub fn is_enabled(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn layer_id(&self) -> Option<&str> {
        self.binding.as_ref().map(|b| b.layer.id.as_str())
    }

    pub fn entries(&self) -> Option<&ImageEntries> {
        self.binding.as_ref().map(|b| &b.entries)
    }

    /// The catalog group node, while enabled.
    pub fn group(&self) -> Option<NodeId> {
        self.group
    }

    pub fn modes(&self) -> Modes {
        self.modes
    }

    /// Image identifier of the active feature.
    pub fn active_image(&self) -> Option<&str> {
        self.binding.as_ref().and_then(|b| b.active.image())
    }

    pub fn is_highlighted(&self) -> bool {
        self.binding
            .as_ref()
            .is_some_and(|b| b.active.is_highlighted())
    }

    /// Number of visible-set computations run so far.
    pub fn recompute_count(&self) -> usize {
        self.recomputes
    }

    /// Bind `layer` as this controller's catalog and scan its images.
    pub fn bind(&mut self, layer: LayerInfo, fields: CatalogFields) {
        if self.binding.is_some() {
            self.unbind();
        }

        let entries = ImageEntries::build(self.ctx.store.as_ref(), &layer, &fields);
        let active = FeatureHighlight::new(&self.ctx, &layer, self.settings.highlight_width);
        log::info!(
            "Catalog '{}' bound with {} images (source = {}, date = {})",
            layer.name,
            entries.len(),
            fields.source,
            fields.date
        );

        let event = CatalogEvent::Bound {
            layer_id: layer.id.clone(),
            layer_name: layer.name.clone(),
        };
        self.binding = Some(CatalogBinding {
            layer,
            fields,
            entries,
            active,
        });
        self.events.emit(&event);
    }

    /// Tear the binding down and remove the catalog group.
    pub fn unbind(&mut self) {
        self.subscription = None;
        let Some(mut binding) = self.binding.take() else {
            return;
        };

        binding.active.clear();
        if let Some(group) = self.group.take() {
            self.ctx.tree.remove_node(group);
        }
        self.group_name = None;
        log::info!("Catalog '{}' unbound", binding.layer.name);

        self.events.emit(&CatalogEvent::Removed {
            layer_id: binding.layer.id,
        });
    }

    /// Start or stop following the canvas.
    ///
    /// Enabling locates (or creates) the catalog group, subscribes to host events and
    /// recomputes right away. Disabling only unsubscribes.
    pub fn enable(&mut self, on: bool) -> Result<()> {
        if !on {
            if self.subscription.take().is_some() {
                log::info!("Catalog {:?} disabled", self.layer_id());
            }
            return Ok(());
        }

        let binding = self.binding.as_ref().ok_or(CatalogError::NotBound)?;
        let layer_id = binding.layer.id.clone();
        let name = group_name(&binding.layer.name);

        let group = match self.ctx.tree.find_group(&name) {
            Some(group) => group,
            None => self.ctx.tree.add_group(&name),
        };
        self.group = Some(group);
        self.group_name = self.ctx.tree.node_name(group);
        self.events.emit(&CatalogEvent::GroupRenamed {
            layer_id,
            name: self.group_name.clone(),
        });

        if self.subscription.is_none() {
            let this = self.this.clone();
            self.subscription = Some(self.ctx.events.subscribe(move |event: &HostEvent| {
                let Some(controller) = this.upgrade() else {
                    return;
                };
                match controller.try_borrow_mut() {
                    Ok(mut controller) => controller.handle(event),
                    Err(_) => log::warn!("Ignoring re-entrant {:?}", event),
                };
            }));
        }
        log::info!("Catalog group '{}' enabled", name);

        self.on_view_changed();
        Ok(())
    }

    /// Toggle zoom mode; turning it on zooms to the current catalog raster, if any.
    pub fn enable_zoom(&mut self, on: bool) {
        self.modes.zoom = on;
        if on && self.activate_current() {
            self.zoom_and_recompute();
        }
    }

    /// Toggle highlight mode; turning it on flashes the current catalog raster, if any.
    pub fn enable_highlight(&mut self, on: bool) {
        self.modes.highlight = on;
        if on && self.activate_current() {
            self.flash();
        }
    }

    /// Toggle selection-only mode and recompute.
    pub fn enable_selected(&mut self, on: bool) {
        self.modes.selected = on;
        if self.is_enabled() {
            self.recompute_visible_set();
        }
    }

    /// Hide an expired highlight. Returns true when something was hidden.
    pub fn poll(&mut self) -> bool {
        self.poll_at(Instant::now())
    }

    pub fn poll_at(&mut self, now: Instant) -> bool {
        self.binding
            .as_mut()
            .is_some_and(|b| b.active.poll_at(now))
    }

    fn handle(&mut self, event: &HostEvent) {
        match event {
            HostEvent::ExtentChanged | HostEvent::CrsChanged | HostEvent::UnitsChanged => {
                self.on_view_changed()
            }
            HostEvent::SelectionChanged { layer_id } => {
                if self.layer_id() == Some(layer_id.as_str()) {
                    self.on_selection_changed();
                }
            }
            HostEvent::NodeActivated { node } => self.on_activated(*node),
            HostEvent::DataChanged { node } => self.on_data_changed(*node),
            HostEvent::ChildrenAboutToBeRemoved { parent, removed } => {
                self.on_group_removed(*parent, removed)
            }
            HostEvent::LayersAboutToBeRemoved { .. } => {}
        }
    }

    /// Canvas extent, CRS or units changed.
    pub fn on_view_changed(&mut self) {
        if self.binding.is_none() {
            self.report(MessageLevel::Warning, &CatalogError::NotBound.to_string());
            return;
        }
        self.recompute_visible_set();
        if self.modes.highlight {
            self.flash();
        }
    }

    pub fn on_selection_changed(&mut self) {
        if self.modes.selected {
            self.recompute_visible_set();
        }
    }

    /// A tree node was activated. Catalog rasters become the active feature.
    pub fn on_activated(&mut self, node: NodeId) {
        if self.binding.is_none() {
            self.report(MessageLevel::Warning, &CatalogError::NotBound.to_string());
            return;
        }
        let Some(layer) = self.ctx.tree.layer_node(node) else {
            return;
        };

        if let Some(binding) = self.binding.as_mut() {
            binding.active.clear();
        }
        if !self.activate(&layer) {
            return;
        }
        if self.modes.zoom {
            self.zoom_and_recompute();
        }
        if self.modes.highlight {
            self.flash();
        }
    }

    /// Bound layers were removed from the project. Returns true if this catalog's
    /// layer was among them and the binding is gone.
    pub fn on_external_layer_removed(&mut self, layer_ids: &[LayerId]) -> bool {
        let hit = self
            .layer_id()
            .is_some_and(|id| layer_ids.iter().any(|removed| removed == id));
        if hit {
            self.unbind();
        }
        hit
    }

    /// The catalog group was removed from the tree by someone else.
    pub fn on_group_removed(&mut self, parent: NodeId, removed: &[NodeId]) {
        let Some(group) = self.group else {
            return;
        };
        if parent == group || !removed.contains(&group) {
            return;
        }

        log::info!("Catalog group {} removed from the tree", group);
        self.subscription = None;
        self.group = None;
        self.group_name = None;
        if let Some(layer_id) = self.layer_id().map(str::to_string) {
            self.events.emit(&CatalogEvent::GroupRenamed {
                layer_id,
                name: None,
            });
        }
    }

    /// Track renames of the catalog group and of the catalog layer.
    pub fn on_data_changed(&mut self, node: NodeId) {
        let Some(binding) = self.binding.as_mut() else {
            return;
        };
        let layer_id = binding.layer.id.clone();

        if Some(node) == self.group {
            let name = self.ctx.tree.node_name(node);
            if name.is_some() && name != self.group_name {
                self.group_name = name.clone();
                self.events.emit(&CatalogEvent::GroupRenamed { layer_id, name });
            }
        } else if self.ctx.tree.find_layer_node(&layer_id) == Some(node) {
            let Some(name) = self.ctx.store.layer(&layer_id).map(|l| l.name) else {
                return;
            };
            if name != binding.layer.name {
                binding.layer.name = name.clone();
                binding.active.set_layer_name(&name);
                self.events
                    .emit(&CatalogEvent::LayerRenamed { layer_id, name });
            }
        }
    }

    /// Recompute which images intersect the canvas and rebuild the catalog group.
    pub fn recompute_visible_set(&mut self) {
        self.recomputes += 1;
        let (Some(binding), Some(group)) = (self.binding.as_ref(), self.group) else {
            return;
        };

        let targets = match self.visible_images(binding) {
            Ok(targets) => targets,
            Err(e) => {
                self.report(MessageLevel::Critical, &e.to_string());
                let _quiet = self.mute();
                self.ctx.tree.remove_all_children(group);
                return;
            }
        };
        log::debug!(
            "Catalog '{}': {} images in view",
            binding.layer.name,
            targets.len()
        );

        let _quiet = self.mute();
        let previous = self.current_status(group);
        self.ctx.tree.remove_all_children(group);

        let mut failed = Vec::new();
        for entry in &targets {
            if let Err(e) = self.add_image(group, entry) {
                log::error!("{}", e);
                failed.push(entry.image.clone());
            }
        }

        if let Some(image) = binding.active.image() {
            self.restore_current(group, image, previous);
        }

        let layer_id = binding.layer.id.clone();
        let count = targets.len();
        if failed.is_empty() {
            self.events
                .emit(&CatalogEvent::TotalChanged { layer_id, count });
        } else {
            let text = format!("Images invalid:\n{}", failed.join("\n"));
            self.report_for(
                MessageLevel::Critical,
                &text,
                Duration::from_secs(LOAD_FAILURE_MESSAGE_SECS),
            );
        }
    }

    /// Entries whose footprint really intersects the canvas, most recent first.
    fn visible_images<'b>(&self, binding: &'b CatalogBinding) -> Result<Vec<&'b ImageEntry>> {
        let layer = &binding.layer;
        let bridge = CoordinateBridge::new(&self.ctx.view.crs(), &layer.crs)?;
        let canvas = bridge.transform_extent(&self.ctx.view.extent())?;

        let request = if self.modes.selected {
            let selected = self.ctx.store.selected_ids(&layer.id);
            if selected.is_empty() {
                return Ok(Vec::new());
            }
            FeatureRequest::by_ids(selected)
        } else {
            let full = self.ctx.store.layer(&layer.id).and_then(|l| l.extent);
            match full {
                Some(full) if extent::intersects(&full, &canvas) => FeatureRequest::all(),
                _ => return Ok(Vec::new()),
            }
        };
        let request = request.no_attributes();

        let index = GeometryIndex::build(
            self.ctx
                .store
                .get_features(&layer.id, &request)
                .filter_map(|f| f.geometry.map(|g| (f.id, g))),
        );
        if self.modes.selected
            && !index
                .bounds()
                .is_some_and(|region| extent::intersects(&region, &canvas))
        {
            return Ok(Vec::new());
        }

        let mut targets: Vec<&ImageEntry> = index
            .query(&canvas)
            .into_iter()
            .filter_map(|fid| binding.entries.for_feature(fid))
            .collect();
        sort_by_recency(&mut targets);
        Ok(targets)
    }

    fn add_image(&self, group: NodeId, entry: &ImageEntry) -> Result<TreeLayer> {
        let path = self.tiles.resolve(&entry.source)?;
        let display = file_stem(&path);
        let mut raster = self
            .ctx
            .loader
            .load(&path, &display)
            .map_err(|e| CatalogError::invalid_resource(&entry.image, e.reason))?;
        if !self.settings.is_descriptor(&path) {
            raster.set_transparent_pixels(vec![TransparentPixel::BLACK_NO_DATA]);
        }

        let name = format!("{} ({})", entry.date.format(DATE_FORMAT), entry.image);
        let node = self
            .ctx
            .tree
            .add_raster(group, raster, &name)
            .ok_or_else(|| CatalogError::invalid_resource(&entry.image, "catalog group is gone"))?;
        self.ctx.tree.set_visible(node.node, false);
        Ok(node)
    }

    /// Source and visibility of the current node, if it is one of this catalog's rasters.
    fn current_status(&self, group: NodeId) -> Option<(String, bool)> {
        let current = self.ctx.tree.current_layer()?;
        self.ctx
            .tree
            .layers_in(group)
            .iter()
            .any(|l| l.node == current.node)
            .then_some((current.source, current.visible))
    }

    fn restore_current(&self, group: NodeId, image: &str, previous: Option<(String, bool)>) {
        let Some(layer) = self
            .ctx
            .tree
            .layers_in(group)
            .into_iter()
            .find(|l| basename(&l.source) == image)
        else {
            return;
        };

        self.ctx.tree.set_current(layer.node);
        if let Some((source, visible)) = previous {
            if source == layer.source {
                self.ctx.tree.set_visible(layer.node, visible);
            }
        }
    }

    /// Bind the active feature to `layer` if it belongs to this catalog group.
    ///
    /// Returns false when it does not, or when binding failed (already reported).
    fn activate(&mut self, layer: &TreeLayer) -> bool {
        let (Some(binding), Some(group)) = (self.binding.as_mut(), self.group) else {
            return false;
        };
        if !self
            .ctx
            .tree
            .layers_in(group)
            .iter()
            .any(|l| l.node == layer.node)
        {
            return false;
        }

        let image = basename(&layer.source);
        let result = if binding.entries.contains(image) {
            binding.active.bind(image, &binding.entries)
        } else {
            Err(CatalogError::NotACatalogImage {
                image: image.to_string(),
                layer: binding.layer.name.clone(),
            })
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                self.report(MessageLevel::Critical, &e.to_string());
                false
            }
        }
    }

    fn activate_current(&mut self) -> bool {
        match self.ctx.tree.current_layer() {
            Some(layer) => self.activate(&layer),
            None => false,
        }
    }

    fn zoom_and_recompute(&mut self) {
        let zoomed = {
            let _quiet = self.mute();
            match self.binding.as_ref() {
                Some(binding) => binding.active.zoom_to_feature(),
                None => return,
            }
        };
        if let Err(e) = zoomed {
            self.report(MessageLevel::Critical, &e.to_string());
            return;
        }
        self.recompute_visible_set();
    }

    fn flash(&mut self) {
        let duration = self.settings.highlight_duration;
        if let Some(binding) = self.binding.as_mut() {
            binding.active.highlight(duration);
        }
    }

    /// Mute this controller's host subscription for the guard's lifetime.
    fn mute(&self) -> Option<Suppressed> {
        self.subscription.as_ref().map(Subscription::suppress)
    }

    fn report(&self, level: MessageLevel, text: &str) {
        let secs = match level {
            MessageLevel::Warning => WARNING_MESSAGE_SECS,
            _ => CRITICAL_MESSAGE_SECS,
        };
        self.report_for(level, text, Duration::from_secs(secs));
    }

    fn report_for(&self, level: MessageLevel, text: &str, duration: Duration) {
        self.ctx.report(level, text, duration);
    }
}

impl std::fmt::Debug for CatalogController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogController")
            .field("layer_id", &self.layer_id())
            .field("group", &self.group)
            .field("enabled", &self.is_enabled())
            .field("modes", &self.modes)
            .finish_non_exhaustive()
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
