//! Event and intent types exchanged between the host, the controllers and the table.

use serde::{Deserialize, Serialize};

use crate::model::{LayerId, NodeId};

/// Notifications delivered by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// The canvas extent changed (pan/zoom).
    ExtentChanged,
    /// The canvas destination CRS changed.
    CrsChanged,
    /// The canvas map units changed.
    UnitsChanged,
    /// Feature selection changed on a vector layer.
    SelectionChanged { layer_id: LayerId },
    /// The user activated a node in the layer tree.
    NodeActivated { node: NodeId },
    /// A tree node's data (name, check state) changed.
    DataChanged { node: NodeId },
    /// Children of `parent` are about to be removed from the tree.
    ChildrenAboutToBeRemoved { parent: NodeId, removed: Vec<NodeId> },
    /// Map layers are about to be removed from the project.
    LayersAboutToBeRemoved { layer_ids: Vec<LayerId> },
}

/// Notifications emitted by catalog controllers for the table view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEvent {
    /// A polygon layer was bound as a catalog.
    Bound { layer_id: LayerId, layer_name: String },
    /// The catalog layer went away.
    Removed { layer_id: LayerId },
    /// The catalog layer was renamed.
    LayerRenamed { layer_id: LayerId, name: String },
    /// The catalog group got a (new) name, or `None` once it no longer exists.
    GroupRenamed {
        layer_id: LayerId,
        name: Option<String>,
    },
    /// Number of images materialized by the last successful reconciliation.
    TotalChanged { layer_id: LayerId, count: usize },
}

impl CatalogEvent {
    pub fn layer_id(&self) -> &str {
        match self {
            CatalogEvent::Bound { layer_id, .. }
            | CatalogEvent::Removed { layer_id }
            | CatalogEvent::LayerRenamed { layer_id, .. }
            | CatalogEvent::GroupRenamed { layer_id, .. }
            | CatalogEvent::TotalChanged { layer_id, .. } => layer_id,
        }
    }
}

/// Which per-catalog toggle the user flipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleKind {
    /// Materialize the catalog at all.
    Enable,
    /// Restrict the query region to the selected features.
    Select,
    /// Flash the active feature's outline.
    Highlight,
    /// Zoom the canvas to the active feature.
    Zoom,
}

impl ToggleKind {
    /// Column header used by the table view.
    pub fn name(&self) -> &'static str {
        match self {
            ToggleKind::Enable => "Layer",
            ToggleKind::Select => "Select",
            ToggleKind::Highlight => "Highlight",
            ToggleKind::Zoom => "Zoom",
        }
    }

    pub fn all() -> &'static [ToggleKind] {
        &[
            ToggleKind::Enable,
            ToggleKind::Select,
            ToggleKind::Highlight,
            ToggleKind::Zoom,
        ]
    }

    /// Mode toggles only make sense while the catalog is enabled.
    pub fn is_mode(&self) -> bool {
        !matches!(self, ToggleKind::Enable)
    }
}

/// A toggle the user asked for, routed from the table to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleIntent {
    pub layer_id: LayerId,
    pub kind: ToggleKind,
    pub on: bool,
}

/// Severity of a user-visible diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessageLevel {
    Info,
    Warning,
    Critical,
}
