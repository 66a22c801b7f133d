//! In-memory host.
//!
//! A complete host that keeps layers, the layer tree and the canvas in memory and
//! emits [`HostEvent`]s synchronously, the way a desktop host does from inside its own
//! setters. The headless driver and the tests run the catalog engine against it.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use cotf_geo::{extent, Crs, Extent};

use super::{
    HighlightRequest, HostContext, InvalidResource, LayerStore, LayerTree, MessageSink,
    RasterHandle, RasterLoader, RemoteFetcher, TransparentPixel, ViewProvider,
};
use crate::event::Publisher;
use crate::message::{HostEvent, MessageLevel};
use crate::model::{
    AttributeValue, Feature, FeatureId, FeatureRequest, HighlightId, LayerId, LayerInfo, NodeId,
    TreeLayer,
};

const ROOT: NodeId = NodeId(0);

/// A message pushed to the in-memory message bar.
#[derive(Debug, Clone, PartialEq)]
pub struct PostedMessage {
    pub level: MessageLevel,
    pub text: String,
    pub duration: Duration,
}

struct VectorLayer {
    info: LayerInfo,
    features: Vec<Feature>,
    selected: BTreeSet<FeatureId>,
}

enum NodeKind {
    Group {
        name: String,
        children: Vec<NodeId>,
    },
    Layer {
        layer_id: LayerId,
        name: String,
        visible: bool,
        source: String,
        raster: Option<Box<dyn RasterHandle>>,
    },
}

struct TreeNode {
    parent: Option<NodeId>,
    kind: NodeKind,
}

struct Highlight {
    request: HighlightRequest,
    visible: bool,
}

struct HostState {
    canvas_crs: Crs,
    canvas_extent: Extent,
    layers: Vec<VectorLayer>,
    nodes: BTreeMap<NodeId, TreeNode>,
    current: Option<NodeId>,
    highlights: BTreeMap<HighlightId, Highlight>,
    messages: Vec<PostedMessage>,
    next_node: u64,
    next_raster: u64,
    next_highlight: u64,
}

impl HostState {
    fn node_id(&mut self) -> NodeId {
        self.next_node += 1;
        NodeId(self.next_node)
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        match self.nodes.get(&node).map(|n| &n.kind) {
            Some(NodeKind::Group { children, .. }) => children,
            _ => &[],
        }
    }

    fn attach(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.node_id();
        self.nodes.insert(
            id,
            TreeNode {
                parent: Some(parent),
                kind,
            },
        );
        if let Some(NodeKind::Group { children, .. }) =
            self.nodes.get_mut(&parent).map(|n| &mut n.kind)
        {
            children.push(id);
        }
        id
    }

    fn detach_subtree(&mut self, node: NodeId) {
        let parent = self.nodes.get(&node).and_then(|n| n.parent);
        if let Some(NodeKind::Group { children, .. }) =
            parent.and_then(|p| self.nodes.get_mut(&p)).map(|n| &mut n.kind)
        {
            children.retain(|c| *c != node);
        }

        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            stack.extend_from_slice(self.children(id));
            self.nodes.remove(&id);
            if self.current == Some(id) {
                self.current = None;
            }
        }
    }

    fn tree_layer(&self, node: NodeId) -> Option<TreeLayer> {
        match &self.nodes.get(&node)?.kind {
            NodeKind::Layer {
                layer_id,
                name,
                visible,
                source,
                ..
            } => Some(TreeLayer {
                node,
                layer_id: layer_id.clone(),
                name: name.clone(),
                source: source.clone(),
                visible: *visible,
            }),
            NodeKind::Group { .. } => None,
        }
    }

    fn vector(&self, layer_id: &str) -> Option<&VectorLayer> {
        self.layers.iter().find(|l| l.info.id == layer_id)
    }
}

/// Host keeping everything in memory.
pub struct MemoryHost {
    state: RefCell<HostState>,
    events: Publisher<HostEvent>,
    extent_requests: Cell<usize>,
}

impl std::fmt::Debug for MemoryHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryHost")
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

impl MemoryHost {
    pub fn new(canvas_crs: Crs, canvas_extent: Extent) -> Rc<Self> {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            ROOT,
            TreeNode {
                parent: None,
                kind: NodeKind::Group {
                    name: String::new(),
                    children: Vec::new(),
                },
            },
        );
        Rc::new(Self {
            state: RefCell::new(HostState {
                canvas_crs,
                canvas_extent,
                layers: Vec::new(),
                nodes,
                current: None,
                highlights: BTreeMap::new(),
                messages: Vec::new(),
                next_node: 0,
                next_raster: 0,
                next_highlight: 0,
            }),
            events: Publisher::new(),
            extent_requests: Cell::new(0),
        })
    }

    /// Bundle this host with a loader and a fetcher.
    pub fn context(
        self: &Rc<Self>,
        loader: Rc<dyn RasterLoader>,
        fetcher: Rc<dyn RemoteFetcher>,
    ) -> HostContext {
        HostContext {
            view: Rc::clone(self) as Rc<dyn ViewProvider>,
            store: Rc::clone(self) as Rc<dyn LayerStore>,
            tree: Rc::clone(self) as Rc<dyn LayerTree>,
            loader,
            fetcher,
            messages: Rc::clone(self) as Rc<dyn MessageSink>,
            events: self.events.clone(),
        }
    }

    pub fn events(&self) -> Publisher<HostEvent> {
        self.events.clone()
    }

    /// Load a vector layer and show it at the top level of the tree.
    ///
    /// A missing extent is computed from the features.
    pub fn add_vector_layer(&self, mut info: LayerInfo, features: Vec<Feature>) -> NodeId {
        if info.extent.is_none() {
            info.extent = extent::combined_bounds(features.iter().filter_map(|f| f.footprint()));
        }
        let mut state = self.state.borrow_mut();
        let node = state.attach(
            ROOT,
            NodeKind::Layer {
                layer_id: info.id.clone(),
                name: info.name.clone(),
                visible: true,
                source: format!("memory:{}", info.id),
                raster: None,
            },
        );
        state.layers.push(VectorLayer {
            info,
            features,
            selected: BTreeSet::new(),
        });
        node
    }

    /// Replace a layer's selection.
    pub fn select(&self, layer_id: &str, ids: impl IntoIterator<Item = FeatureId>) {
        {
            let mut state = self.state.borrow_mut();
            let Some(layer) = state.layers.iter_mut().find(|l| l.info.id == layer_id) else {
                return;
            };
            layer.selected = ids.into_iter().collect();
        }
        self.events.emit(&HostEvent::SelectionChanged {
            layer_id: layer_id.to_string(),
        });
    }

    pub fn set_canvas_crs(&self, crs: Crs) {
        self.state.borrow_mut().canvas_crs = crs;
        self.events.emit(&HostEvent::CrsChanged);
    }

    /// User activation of a tree node (double click / enter).
    pub fn activate(&self, node: NodeId) {
        self.state.borrow_mut().current = Some(node);
        self.events.emit(&HostEvent::NodeActivated { node });
    }

    /// Rename a tree node; renaming a vector layer's node renames the layer.
    pub fn rename_node(&self, node: NodeId, new_name: &str) {
        {
            let mut state = self.state.borrow_mut();
            let mut renamed_layer = None;
            match state.nodes.get_mut(&node).map(|n| &mut n.kind) {
                Some(NodeKind::Group { name, .. }) => *name = new_name.to_string(),
                Some(NodeKind::Layer { name, layer_id, .. }) => {
                    *name = new_name.to_string();
                    renamed_layer = Some(layer_id.clone());
                }
                None => return,
            }
            if let Some(layer_id) = renamed_layer {
                if let Some(layer) = state.layers.iter_mut().find(|l| l.info.id == layer_id) {
                    layer.info.name = new_name.to_string();
                }
            }
        }
        self.events.emit(&HostEvent::DataChanged { node });
    }

    /// Remove map layers from the project, announcing it first.
    pub fn remove_layers(&self, layer_ids: &[LayerId]) {
        self.events.emit(&HostEvent::LayersAboutToBeRemoved {
            layer_ids: layer_ids.to_vec(),
        });
        for layer_id in layer_ids {
            if let Some(node) = self.find_layer_node(layer_id) {
                self.remove_node(node);
            }
            self.state
                .borrow_mut()
                .layers
                .retain(|l| &l.info.id != layer_id);
        }
    }

    pub fn messages(&self) -> Vec<PostedMessage> {
        self.state.borrow().messages.clone()
    }

    pub fn clear_messages(&self) {
        self.state.borrow_mut().messages.clear();
    }

    pub fn highlight_count(&self) -> usize {
        self.state.borrow().highlights.len()
    }

    pub fn visible_highlights(&self) -> Vec<HighlightId> {
        self.state
            .borrow()
            .highlights
            .iter()
            .filter(|(_, h)| h.visible)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Number of `set_extent` calls received.
    pub fn extent_requests(&self) -> usize {
        self.extent_requests.get()
    }

    /// Names of the top-level groups, in tree order.
    pub fn group_names(&self) -> Vec<String> {
        let state = self.state.borrow();
        state
            .children(ROOT)
            .iter()
            .filter_map(|id| match &state.nodes.get(id)?.kind {
                NodeKind::Group { name, .. } => Some(name.clone()),
                NodeKind::Layer { .. } => None,
            })
            .collect()
    }

    /// Transparent-pixel list of the raster shown by `node`.
    pub fn raster_transparency(&self, node: NodeId) -> Option<Vec<TransparentPixel>> {
        match &self.state.borrow().nodes.get(&node)?.kind {
            NodeKind::Layer {
                raster: Some(raster),
                ..
            } => Some(raster.transparent_pixels().to_vec()),
            _ => None,
        }
    }
}

impl ViewProvider for MemoryHost {
    fn extent(&self) -> Extent {
        self.state.borrow().canvas_extent
    }

    fn crs(&self) -> Crs {
        self.state.borrow().canvas_crs.clone()
    }

    fn set_extent(&self, extent: Extent) {
        self.extent_requests.set(self.extent_requests.get() + 1);
        self.state.borrow_mut().canvas_extent = extent;
        self.events.emit(&HostEvent::ExtentChanged);
    }

    fn refresh(&self) {
        log::trace!("Canvas refresh");
    }

    fn add_highlight(&self, request: HighlightRequest) -> HighlightId {
        let mut state = self.state.borrow_mut();
        state.next_highlight += 1;
        let id = HighlightId(state.next_highlight);
        state.highlights.insert(
            id,
            Highlight {
                request,
                visible: false,
            },
        );
        id
    }

    fn set_highlight_visible(&self, id: HighlightId, visible: bool) {
        if let Some(h) = self.state.borrow_mut().highlights.get_mut(&id) {
            h.visible = visible;
            log::trace!(
                "Highlight {:?} on {} visible = {}",
                id,
                h.request.layer_id,
                visible
            );
        }
    }

    fn remove_highlight(&self, id: HighlightId) {
        self.state.borrow_mut().highlights.remove(&id);
    }
}

impl LayerStore for MemoryHost {
    fn layers(&self) -> Vec<LayerInfo> {
        self.state
            .borrow()
            .layers
            .iter()
            .map(|l| l.info.clone())
            .collect()
    }

    fn layer(&self, layer_id: &str) -> Option<LayerInfo> {
        self.state.borrow().vector(layer_id).map(|l| l.info.clone())
    }

    fn get_features<'a>(
        &'a self,
        layer_id: &str,
        request: &FeatureRequest,
    ) -> Box<dyn Iterator<Item = Feature> + 'a> {
        let state = self.state.borrow();
        let Some(layer) = state.vector(layer_id) else {
            return Box::new(std::iter::empty());
        };

        let wanted: Vec<bool> = layer
            .info
            .fields
            .iter()
            .map(|f| request.wants_attribute(&f.name))
            .collect();
        let limit = request.limit.unwrap_or(usize::MAX);

        let features: Vec<Feature> = layer
            .features
            .iter()
            .filter(|f| request.filter.accepts(f.id))
            .take(limit)
            .map(|f| Feature {
                id: f.id,
                geometry: if request.with_geometry {
                    f.geometry.clone()
                } else {
                    None
                },
                attributes: f
                    .attributes
                    .iter()
                    .zip(wanted.iter())
                    .map(|(value, keep)| if *keep { value.clone() } else { AttributeValue::Null })
                    .collect(),
            })
            .collect();
        Box::new(features.into_iter())
    }

    fn selected_ids(&self, layer_id: &str) -> BTreeSet<FeatureId> {
        self.state
            .borrow()
            .vector(layer_id)
            .map(|l| l.selected.clone())
            .unwrap_or_default()
    }
}

impl LayerTree for MemoryHost {
    fn root(&self) -> NodeId {
        ROOT
    }

    fn find_group(&self, name: &str) -> Option<NodeId> {
        let state = self.state.borrow();
        state.children(ROOT).iter().copied().find(|id| {
            matches!(
                state.nodes.get(id).map(|n| &n.kind),
                Some(NodeKind::Group { name: n, .. }) if n == name
            )
        })
    }

    fn add_group(&self, name: &str) -> NodeId {
        self.state.borrow_mut().attach(
            ROOT,
            NodeKind::Group {
                name: name.to_string(),
                children: Vec::new(),
            },
        )
    }

    fn remove_node(&self, node: NodeId) {
        let parent = match self.state.borrow().nodes.get(&node) {
            Some(TreeNode {
                parent: Some(parent),
                ..
            }) => *parent,
            _ => return,
        };
        self.events.emit(&HostEvent::ChildrenAboutToBeRemoved {
            parent,
            removed: vec![node],
        });
        self.state.borrow_mut().detach_subtree(node);
    }

    fn node_name(&self, node: NodeId) -> Option<String> {
        match &self.state.borrow().nodes.get(&node)?.kind {
            NodeKind::Group { name, .. } | NodeKind::Layer { name, .. } => Some(name.clone()),
        }
    }

    fn find_layer_node(&self, layer_id: &str) -> Option<NodeId> {
        self.state.borrow().nodes.iter().find_map(|(id, node)| match &node.kind {
            NodeKind::Layer { layer_id: l, .. } if l == layer_id => Some(*id),
            _ => None,
        })
    }

    fn add_raster(&self, group: NodeId, raster: Box<dyn RasterHandle>, name: &str) -> Option<TreeLayer> {
        let mut state = self.state.borrow_mut();
        if !matches!(state.nodes.get(&group).map(|n| &n.kind), Some(NodeKind::Group { .. })) {
            return None;
        }
        state.next_raster += 1;
        let layer_id = format!("raster_{}", state.next_raster);
        let source = raster.source().to_string();
        let node = state.attach(
            group,
            NodeKind::Layer {
                layer_id,
                name: name.to_string(),
                visible: true,
                source,
                raster: Some(raster),
            },
        );
        state.tree_layer(node)
    }

    fn remove_all_children(&self, group: NodeId) {
        let removed = self.state.borrow().children(group).to_vec();
        if removed.is_empty() {
            return;
        }
        self.events.emit(&HostEvent::ChildrenAboutToBeRemoved {
            parent: group,
            removed: removed.clone(),
        });
        let mut state = self.state.borrow_mut();
        for node in removed {
            state.detach_subtree(node);
        }
    }

    fn layers_in(&self, group: NodeId) -> Vec<TreeLayer> {
        let state = self.state.borrow();
        state
            .children(group)
            .iter()
            .filter_map(|id| state.tree_layer(*id))
            .collect()
    }

    fn layer_node(&self, node: NodeId) -> Option<TreeLayer> {
        self.state.borrow().tree_layer(node)
    }

    fn set_visible(&self, node: NodeId, visible: bool) {
        if let Some(NodeKind::Layer { visible: v, .. }) =
            self.state.borrow_mut().nodes.get_mut(&node).map(|n| &mut n.kind)
        {
            *v = visible;
        }
    }

    fn current_layer(&self) -> Option<TreeLayer> {
        let state = self.state.borrow();
        state.current.and_then(|node| state.tree_layer(node))
    }

    fn set_current(&self, node: NodeId) {
        let mut state = self.state.borrow_mut();
        if state.nodes.contains_key(&node) {
            state.current = Some(node);
        }
    }
}

impl MessageSink for MemoryHost {
    fn push_message(&self, level: MessageLevel, text: &str, duration: Duration) {
        self.state.borrow_mut().messages.push(PostedMessage {
            level,
            text: text.to_string(),
            duration,
        });
    }
}

/// Raster handle produced by [`MemoryRasterLoader`].
#[derive(Debug, Clone)]
pub struct MemoryRaster {
    source: String,
    name: String,
    transparency: Vec<TransparentPixel>,
}

impl RasterHandle for MemoryRaster {
    fn source(&self) -> &str {
        &self.source
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn set_transparent_pixels(&mut self, pixels: Vec<TransparentPixel>) {
        self.transparency = pixels;
    }

    fn transparent_pixels(&self) -> &[TransparentPixel] {
        &self.transparency
    }
}

/// Loader that accepts any path except the file names it was told to reject.
#[derive(Debug, Default)]
pub struct MemoryRasterLoader {
    rejected: RefCell<BTreeSet<String>>,
    loads: Cell<usize>,
}

impl MemoryRasterLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every future load of a file with this name.
    pub fn reject(&self, file_name: impl Into<String>) {
        self.rejected.borrow_mut().insert(file_name.into());
    }

    pub fn load_count(&self) -> usize {
        self.loads.get()
    }
}

impl RasterLoader for MemoryRasterLoader {
    fn load(&self, path: &Path, display_name: &str) -> Result<Box<dyn RasterHandle>, InvalidResource> {
        self.loads.set(self.loads.get() + 1);
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.rejected.borrow().contains(&file_name) {
            return Err(InvalidResource::new(format!(
                "Raster layer {} is not valid",
                path.display()
            )));
        }
        Ok(Box::new(MemoryRaster {
            source: path.display().to_string(),
            name: display_name.to_string(),
            transparency: Vec::new(),
        }))
    }
}
