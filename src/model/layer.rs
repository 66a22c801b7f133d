//! Layers and layer-tree nodes.

use std::fmt;

use cotf_geo::{Crs, Extent};
use serde::{Deserialize, Serialize};

use super::feature::Field;

/// Host identifier of a map layer.
pub type LayerId = String;

/// Identifier of a node in the host's layer tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Identifier of a highlight overlay drawn by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HighlightId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryType {
    Point,
    Line,
    Polygon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Vector(GeometryType),
    Raster,
}

/// Description of a layer loaded in the host.
#[derive(Debug, Clone)]
pub struct LayerInfo {
    pub id: LayerId,
    pub name: String,
    pub kind: LayerKind,
    pub crs: Crs,
    /// Full extent in the layer's own CRS, `None` when the layer is empty.
    pub extent: Option<Extent>,
    pub fields: Vec<Field>,
}

impl LayerInfo {
    pub fn is_polygon(&self) -> bool {
        self.kind == LayerKind::Vector(GeometryType::Polygon)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// A map layer node as seen through the layer tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLayer {
    pub node: NodeId,
    pub layer_id: LayerId,
    pub name: String,
    /// Data source the layer was loaded from.
    pub source: String,
    pub visible: bool,
}
