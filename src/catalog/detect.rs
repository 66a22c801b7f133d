//! Catalog field detection.

use crate::fetch::SourceProbe;
use crate::host::LayerStore;
use crate::model::{FeatureRequest, FieldKind, LayerInfo};

/// The attribute pair that makes a polygon layer a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogFields {
    /// Text field holding a local path or URL.
    pub source: String,
    /// Date field holding the capture date.
    pub date: String,
}

/// Find the source and date fields of a polygon layer from its first feature.
///
/// The first text field whose value exists (reachable URL or local file) and the first
/// date field with a value win. `None` means "not a catalog"; a sample feature that
/// happens to be atypical is enough to reject the layer.
pub fn detect_catalog_fields(
    store: &dyn LayerStore,
    probe: &SourceProbe,
    layer: &LayerInfo,
) -> Option<CatalogFields> {
    if !layer.is_polygon() {
        return None;
    }

    let request = FeatureRequest::all().no_geometry().limit(1);
    let first = store.get_features(&layer.id, &request).next()?;

    let mut source = None;
    let mut date = None;
    for (index, field) in layer.fields.iter().enumerate() {
        let value = first.attribute(index);
        match field.kind {
            FieldKind::Text if source.is_none() => {
                if value.as_text().is_some_and(|v| probe.exists(v)) {
                    source = Some(field.name.clone());
                }
            }
            FieldKind::Date if date.is_none() => {
                if value.as_date().is_some() {
                    date = Some(field.name.clone());
                }
            }
            _ => {}
        }
        if source.is_some() && date.is_some() {
            break;
        }
    }

    match (source, date) {
        (Some(source), Some(date)) => {
            log::debug!(
                "Layer '{}' looks like a catalog (source = {}, date = {})",
                layer.name,
                source,
                date
            );
            Some(CatalogFields { source, date })
        }
        _ => None,
    }
}
