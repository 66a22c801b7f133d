//! JSON scenarios for the headless driver.
//!
//! A scenario describes a canvas, the vector layers loaded in the project, an
//! optional selection, the table toggles to apply once catalogs have been found
//! and a list of extents to pan through afterwards.

use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

use chrono::NaiveDate;
use cotf_geo::{Crs, Extent, Footprint};
use geo::{coord, LineString, MultiPolygon, Polygon, Rect};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::constants::DATE_FORMAT;
use crate::host::MemoryHost;
use crate::message::ToggleKind;
use crate::model::{
    AttributeValue, Feature, FeatureId, Field, FieldKind, GeometryType, LayerId, LayerInfo,
    LayerKind,
};

/// Errors raised while reading or loading a scenario.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// I/O error while reading the scenario file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A CRS identifier that is not known
    #[error("Unknown CRS '{0}'")]
    UnknownCrs(String),

    /// An extent with non-finite coordinates
    #[error("Invalid extent {0:?}")]
    InvalidExtent([f64; 4]),

    /// A layer whose features do not match its fields
    #[error("Layer '{layer}': {message}")]
    InvalidLayer {
        /// Layer id
        layer: String,
        /// What is wrong with it
        message: String,
    },
}

impl ScenarioError {
    fn invalid_layer(layer: &str, message: impl Into<String>) -> Self {
        Self::InvalidLayer {
            layer: layer.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScenarioError>;

/// A complete headless run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub canvas: CanvasEntry,

    #[serde(default)]
    pub layers: Vec<LayerEntry>,

    /// Selected feature ids per layer id
    #[serde(default)]
    pub selection: BTreeMap<LayerId, Vec<u64>>,

    #[serde(default)]
    pub toggles: Vec<ToggleEntry>,

    /// Extents (`[xmin, ymin, xmax, ymax]`) visited after the toggles
    #[serde(default)]
    pub pans: Vec<[f64; 4]>,
}

/// Canvas state at start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasEntry {
    /// Authority id such as `EPSG:4326`
    pub crs: String,
    /// `[xmin, ymin, xmax, ymax]`
    pub extent: [f64; 4],
}

/// A vector layer and its features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerEntry {
    pub id: LayerId,
    pub name: String,

    #[serde(default = "default_crs")]
    pub crs: String,

    #[serde(default = "default_geometry")]
    pub geometry: GeometryType,

    pub fields: Vec<FieldEntry>,

    #[serde(default)]
    pub features: Vec<FeatureEntry>,
}

fn default_crs() -> String {
    "EPSG:4326".to_string()
}

fn default_geometry() -> GeometryType {
    GeometryType::Polygon
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldEntry {
    pub name: String,
    pub kind: FieldKind,
}

/// One feature: attribute values in field order plus an optional shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureEntry {
    pub id: u64,

    #[serde(default)]
    pub shape: Option<ShapeEntry>,

    #[serde(default)]
    pub attributes: Vec<Value>,
}

/// Feature footprints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ShapeEntry {
    /// Axis-aligned rectangle.
    #[serde(rename = "bbox")]
    BoundingBox {
        xmin: f64,
        ymin: f64,
        xmax: f64,
        ymax: f64,
    },

    /// Polygon given by its exterior ring followed by any holes.
    #[serde(rename = "polygon")]
    Polygon { rings: Vec<Vec<(f64, f64)>> },
}

impl ShapeEntry {
    pub fn to_footprint(&self) -> Footprint {
        match self {
            ShapeEntry::BoundingBox {
                xmin,
                ymin,
                xmax,
                ymax,
            } => {
                let rect = Rect::new(coord! { x: *xmin, y: *ymin }, coord! { x: *xmax, y: *ymax });
                MultiPolygon(vec![rect.to_polygon()])
            }
            ShapeEntry::Polygon { rings } => {
                let mut rings = rings.iter().map(|ring| LineString::from(ring.clone()));
                match rings.next() {
                    Some(exterior) => MultiPolygon(vec![Polygon::new(exterior, rings.collect())]),
                    None => MultiPolygon(Vec::new()),
                }
            }
        }
    }
}

/// A table checkbox click.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleEntry {
    pub layer: LayerId,
    pub kind: ToggleKind,
    #[serde(default = "default_on")]
    pub on: bool,
}

fn default_on() -> bool {
    true
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let scenario = Self::from_json(&json)?;
        log::info!(
            "Loaded scenario {:?} ({} layers, {} toggles)",
            path,
            scenario.layers.len(),
            scenario.toggles.len()
        );
        Ok(scenario)
    }

    pub fn canvas_crs(&self) -> Result<Crs> {
        parse_crs(&self.canvas.crs)
    }

    pub fn canvas_extent(&self) -> Result<Extent> {
        parse_extent(self.canvas.extent)
    }

    /// The pan extents, validated.
    pub fn pan_extents(&self) -> Result<Vec<Extent>> {
        self.pans.iter().copied().map(parse_extent).collect()
    }

    /// Build a memory host holding the scenario's layers and selection.
    pub fn build_host(&self) -> Result<Rc<MemoryHost>> {
        let host = MemoryHost::new(self.canvas_crs()?, self.canvas_extent()?);
        for entry in &self.layers {
            let (info, features) = entry.to_layer()?;
            log::debug!("Adding layer '{}' with {} features", info.name, features.len());
            host.add_vector_layer(info, features);
        }
        for (layer_id, ids) in &self.selection {
            host.select(layer_id, ids.iter().copied().map(FeatureId));
        }
        Ok(host)
    }
}

impl LayerEntry {
    /// Layer description and features, with attributes typed by their fields.
    pub fn to_layer(&self) -> Result<(LayerInfo, Vec<Feature>)> {
        let fields: Vec<Field> = self
            .fields
            .iter()
            .map(|f| Field::new(f.name.clone(), f.kind))
            .collect();

        let mut features = Vec::with_capacity(self.features.len());
        for entry in &self.features {
            if entry.attributes.len() > fields.len() {
                return Err(ScenarioError::invalid_layer(
                    &self.id,
                    format!("feature {} has more attributes than fields", entry.id),
                ));
            }
            let attributes = fields
                .iter()
                .enumerate()
                .map(|(i, field)| {
                    attribute_value(field, entry.attributes.get(i).unwrap_or(&Value::Null))
                        .map_err(|message| {
                            ScenarioError::invalid_layer(
                                &self.id,
                                format!("feature {}: {}", entry.id, message),
                            )
                        })
                })
                .collect::<Result<Vec<_>>>()?;

            features.push(Feature {
                id: FeatureId(entry.id),
                geometry: entry.shape.as_ref().map(ShapeEntry::to_footprint),
                attributes,
            });
        }

        let info = LayerInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            kind: LayerKind::Vector(self.geometry),
            crs: parse_crs(&self.crs)?,
            extent: None,
            fields,
        };
        Ok((info, features))
    }
}

fn attribute_value(field: &Field, value: &Value) -> std::result::Result<AttributeValue, String> {
    if value.is_null() {
        return Ok(AttributeValue::Null);
    }
    let mismatch = || format!("field '{}' expects {:?}, got {}", field.name, field.kind, value);
    match field.kind {
        FieldKind::Text => value
            .as_str()
            .map(AttributeValue::from)
            .ok_or_else(mismatch),
        FieldKind::Date => {
            let text = value.as_str().ok_or_else(mismatch)?;
            NaiveDate::parse_from_str(text, DATE_FORMAT)
                .map(AttributeValue::Date)
                .map_err(|e| format!("field '{}': bad date '{}': {}", field.name, text, e))
        }
        FieldKind::Integer => value
            .as_i64()
            .map(AttributeValue::Integer)
            .ok_or_else(mismatch),
        FieldKind::Real => value
            .as_f64()
            .map(AttributeValue::Real)
            .ok_or_else(mismatch),
    }
}

fn parse_crs(auth_id: &str) -> Result<Crs> {
    Crs::from_auth_id(auth_id).ok_or_else(|| ScenarioError::UnknownCrs(auth_id.to_string()))
}

fn parse_extent(extent: [f64; 4]) -> Result<Extent> {
    if extent.iter().any(|v| !v.is_finite()) {
        return Err(ScenarioError::InvalidExtent(extent));
    }
    let [xmin, ymin, xmax, ymax] = extent;
    Ok(Rect::new(
        coord! { x: xmin, y: ymin },
        coord! { x: xmax, y: ymax },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{LayerStore, ViewProvider};
    use crate::model::FeatureRequest;

    const SAMPLE: &str = r#"{
        "canvas": { "crs": "EPSG:4326", "extent": [0, 0, 10, 10] },
        "layers": [
            {
                "id": "scenes",
                "name": "Scenes",
                "fields": [
                    { "name": "path", "kind": "text" },
                    { "name": "day", "kind": "date" },
                    { "name": "cloud", "kind": "real" }
                ],
                "features": [
                    {
                        "id": 1,
                        "shape": { "type": "bbox", "xmin": 1, "ymin": 1, "xmax": 3, "ymax": 3 },
                        "attributes": ["/data/a.tif", "2020-01-01", 0.25]
                    },
                    {
                        "id": 2,
                        "shape": { "type": "polygon", "rings": [[[5, 5], [7, 5], [7, 7], [5, 5]]] },
                        "attributes": ["/data/b.tif", null]
                    }
                ]
            }
        ],
        "selection": { "scenes": [2] },
        "toggles": [
            { "layer": "scenes", "kind": "enable" },
            { "layer": "scenes", "kind": "highlight", "on": false }
        ],
        "pans": [[20, 20, 30, 30]]
    }"#;

    #[test]
    fn test_parse_sample() {
        let scenario = Scenario::from_json(SAMPLE).unwrap();
        assert_eq!(scenario.layers.len(), 1);
        assert_eq!(scenario.layers[0].geometry, GeometryType::Polygon);
        assert_eq!(scenario.toggles[0].kind, ToggleKind::Enable);
        assert!(scenario.toggles[0].on);
        assert!(!scenario.toggles[1].on);
        assert_eq!(scenario.pan_extents().unwrap().len(), 1);
    }

    #[test]
    fn test_build_host() {
        let scenario = Scenario::from_json(SAMPLE).unwrap();
        let host = scenario.build_host().unwrap();

        assert_eq!(host.crs(), Crs::wgs84());
        let layer = host.layer("scenes").unwrap();
        assert!(layer.is_polygon());
        assert_eq!(layer.extent.map(|e| e.max().x), Some(7.0));
        assert_eq!(host.selected_ids("scenes").len(), 1);

        let features: Vec<Feature> = host
            .get_features("scenes", &FeatureRequest::all())
            .collect();
        assert_eq!(
            features[0].attributes[1],
            AttributeValue::Date(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())
        );
        assert_eq!(features[0].attributes[2], AttributeValue::Real(0.25));
        assert_eq!(features[1].attributes[1], AttributeValue::Null);
        assert_eq!(features[1].attributes[2], AttributeValue::Null);
    }

    #[test]
    fn test_bad_date_rejected() {
        let json = SAMPLE.replace("2020-01-01", "01/01/2020");
        let scenario = Scenario::from_json(&json).unwrap();
        let err = scenario.build_host().unwrap_err();
        assert!(matches!(err, ScenarioError::InvalidLayer { .. }));
        assert!(err.to_string().contains("bad date"));
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let json = SAMPLE.replace("0.25", "\"cloudy\"");
        let scenario = Scenario::from_json(&json).unwrap();
        assert!(matches!(
            scenario.build_host(),
            Err(ScenarioError::InvalidLayer { .. })
        ));
    }

    #[test]
    fn test_unknown_crs() {
        let json = SAMPLE.replace("EPSG:4326", "EPSG:0");
        let scenario = Scenario::from_json(&json).unwrap();
        assert!(matches!(
            scenario.canvas_crs(),
            Err(ScenarioError::UnknownCrs(_))
        ));
    }

    #[test]
    fn test_non_finite_extent() {
        assert!(matches!(
            parse_extent([0.0, f64::NAN, 1.0, 1.0]),
            Err(ScenarioError::InvalidExtent(_))
        ));
    }
}
