//! Features, attributes and feature requests.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use cotf_geo::Footprint;
use serde::{Deserialize, Serialize};

/// Identifier of a feature within its layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureId(pub u64);

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declared type of an attribute field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Date,
    Integer,
    Real,
}

/// An attribute field of a vector layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Date)
    }
}

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AttributeValue {
    #[default]
    Null,
    Text(String),
    Date(NaiveDate),
    Integer(i64),
    Real(f64),
}

impl AttributeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            AttributeValue::Date(d) => Some(*d),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<NaiveDate> for AttributeValue {
    fn from(value: NaiveDate) -> Self {
        AttributeValue::Date(value)
    }
}

/// A feature as returned by the feature store.
///
/// `attributes` is aligned with the layer's field list; fields left out of a request's
/// attribute subset come back as [`AttributeValue::Null`].
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: FeatureId,
    pub geometry: Option<Footprint>,
    pub attributes: Vec<AttributeValue>,
}

impl Feature {
    pub fn attribute(&self, index: usize) -> &AttributeValue {
        const NULL: &AttributeValue = &AttributeValue::Null;
        self.attributes.get(index).unwrap_or(NULL)
    }

    /// Geometry, treating an empty multipolygon as missing.
    pub fn footprint(&self) -> Option<&Footprint> {
        self.geometry.as_ref().filter(|g| !g.0.is_empty())
    }
}

/// Which features a request selects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FeatureFilter {
    #[default]
    All,
    Id(FeatureId),
    Ids(BTreeSet<FeatureId>),
}

impl FeatureFilter {
    pub fn accepts(&self, id: FeatureId) -> bool {
        match self {
            FeatureFilter::All => true,
            FeatureFilter::Id(only) => *only == id,
            FeatureFilter::Ids(ids) => ids.contains(&id),
        }
    }
}

/// Request passed to [`crate::host::LayerStore::get_features`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureRequest {
    pub filter: FeatureFilter,
    /// `None` fetches every attribute.
    pub attributes: Option<Vec<String>>,
    pub with_geometry: bool,
    pub limit: Option<usize>,
}

impl Default for FeatureRequest {
    fn default() -> Self {
        Self {
            filter: FeatureFilter::All,
            attributes: None,
            with_geometry: true,
            limit: None,
        }
    }
}

impl FeatureRequest {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_id(id: FeatureId) -> Self {
        Self {
            filter: FeatureFilter::Id(id),
            ..Self::default()
        }
    }

    pub fn by_ids(ids: impl IntoIterator<Item = FeatureId>) -> Self {
        Self {
            filter: FeatureFilter::Ids(ids.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Fetch only the named attributes.
    pub fn subset<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.attributes = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Skip attributes entirely.
    pub fn no_attributes(mut self) -> Self {
        self.attributes = Some(Vec::new());
        self
    }

    pub fn no_geometry(mut self) -> Self {
        self.with_geometry = false;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether the attribute named `name` is part of the request.
    pub fn wants_attribute(&self, name: &str) -> bool {
        self.attributes
            .as_ref()
            .is_none_or(|names| names.iter().any(|n| n == name))
    }
}
