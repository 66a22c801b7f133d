//! Data model shared by the host interfaces and the catalog engine.

mod feature;
mod layer;

pub use feature::{AttributeValue, Feature, FeatureFilter, FeatureId, FeatureRequest, Field, FieldKind};
pub use layer::{GeometryType, HighlightId, LayerId, LayerInfo, LayerKind, NodeId, TreeLayer};
