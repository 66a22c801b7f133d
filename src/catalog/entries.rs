//! Image entries of a bound catalog layer.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::fetch::basename;
use crate::host::LayerStore;
use crate::model::{Feature, FeatureId, FeatureRequest, LayerInfo};

use super::detect::CatalogFields;

/// One raster referenced by a catalog feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    /// Basename of the source, unique within a catalog.
    pub image: String,
    /// Local path or URL.
    pub source: String,
    /// Capture date.
    pub date: NaiveDate,
    /// Feature the image belongs to.
    pub fid: FeatureId,
}

/// Lookup from image identifier to entry, and from feature to image identifier.
///
/// Always built whole and swapped in; never patched while in use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageEntries {
    by_image: HashMap<String, ImageEntry>,
    by_feature: HashMap<FeatureId, String>,
}

impl ImageEntries {
    /// Scan the layer's source and date attributes (no geometry).
    pub fn build(store: &dyn LayerStore, layer: &LayerInfo, fields: &CatalogFields) -> Self {
        let (Some(source_idx), Some(date_idx)) = (
            layer.field_index(&fields.source),
            layer.field_index(&fields.date),
        ) else {
            log::warn!(
                "Layer '{}' lacks field '{}' or '{}'",
                layer.name,
                fields.source,
                fields.date
            );
            return Self::default();
        };

        let request = FeatureRequest::all()
            .subset([fields.source.as_str(), fields.date.as_str()])
            .no_geometry();
        Self::from_features(store.get_features(&layer.id, &request), source_idx, date_idx)
    }

    /// Collect entries from features, skipping those without a source or a date.
    pub fn from_features(
        features: impl IntoIterator<Item = Feature>,
        source_idx: usize,
        date_idx: usize,
    ) -> Self {
        let mut entries = Self::default();
        for feature in features {
            let (Some(source), Some(date)) = (
                feature.attribute(source_idx).as_text(),
                feature.attribute(date_idx).as_date(),
            ) else {
                log::debug!("Feature {} has no source or date, skipped", feature.id);
                continue;
            };

            let image = basename(source).to_string();
            let entry = ImageEntry {
                image: image.clone(),
                source: source.to_string(),
                date,
                fid: feature.id,
            };
            if let Some(previous) = entries.by_image.insert(image.clone(), entry) {
                log::warn!(
                    "Image '{}' of feature {} shadows feature {}",
                    image,
                    feature.id,
                    previous.fid
                );
                entries.by_feature.remove(&previous.fid);
            }
            entries.by_feature.insert(feature.id, image);
        }
        entries
    }

    pub fn get(&self, image: &str) -> Option<&ImageEntry> {
        self.by_image.get(image)
    }

    pub fn contains(&self, image: &str) -> bool {
        self.by_image.contains_key(image)
    }

    /// Entry of the image owned by `fid`.
    pub fn for_feature(&self, fid: FeatureId) -> Option<&ImageEntry> {
        self.by_feature
            .get(&fid)
            .and_then(|image| self.by_image.get(image))
    }

    pub fn len(&self) -> usize {
        self.by_image.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_image.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageEntry> {
        self.by_image.values()
    }
}

/// Order entries most recent first; ties by image identifier.
pub fn sort_by_recency(entries: &mut [&ImageEntry]) {
    entries.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.image.cmp(&b.image)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AttributeValue;

    fn date(y: i32, m: u32, d: u32) -> AttributeValue {
        AttributeValue::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn feature(id: u64, source: AttributeValue, date: AttributeValue) -> Feature {
        Feature {
            id: FeatureId(id),
            geometry: None,
            attributes: vec![source, date],
        }
    }

    #[test]
    fn test_keyed_by_basename() {
        let entries = ImageEntries::from_features(
            vec![
                feature(1, AttributeValue::Text("/data/a.tif".into()), date(2020, 1, 1)),
                feature(
                    2,
                    AttributeValue::Text("http://host/wms/b.xml".into()),
                    date(2021, 6, 15),
                ),
            ],
            0,
            1,
        );
        assert_eq!(entries.len(), 2);
        assert_eq!(entries.get("a.tif").unwrap().fid, FeatureId(1));
        assert_eq!(
            entries.for_feature(FeatureId(2)).unwrap().source,
            "http://host/wms/b.xml"
        );
    }

    #[test]
    fn test_null_attributes_skipped() {
        let entries = ImageEntries::from_features(
            vec![
                feature(1, AttributeValue::Null, date(2020, 1, 1)),
                feature(2, AttributeValue::Text("/data/b.tif".into()), AttributeValue::Null),
            ],
            0,
            1,
        );
        assert!(entries.is_empty());
    }

    #[test]
    fn test_duplicate_basename_last_wins() {
        let entries = ImageEntries::from_features(
            vec![
                feature(1, AttributeValue::Text("/x/a.tif".into()), date(2020, 1, 1)),
                feature(2, AttributeValue::Text("/y/a.tif".into()), date(2020, 1, 2)),
            ],
            0,
            1,
        );
        assert_eq!(entries.len(), 1);
        assert_eq!(entries.get("a.tif").unwrap().fid, FeatureId(2));
        assert!(entries.for_feature(FeatureId(1)).is_none());
    }

    #[test]
    fn test_sort_by_recency() {
        let entries = ImageEntries::from_features(
            vec![
                feature(1, AttributeValue::Text("c.tif".into()), date(2019, 1, 1)),
                feature(2, AttributeValue::Text("b.tif".into()), date(2021, 6, 15)),
                feature(3, AttributeValue::Text("a.tif".into()), date(2021, 6, 15)),
            ],
            0,
            1,
        );
        let mut ordered: Vec<&ImageEntry> = entries.iter().collect();
        sort_by_recency(&mut ordered);
        let images: Vec<&str> = ordered.iter().map(|e| e.image.as_str()).collect();
        assert_eq!(images, vec!["a.tif", "b.tif", "c.tif"]);
    }
}
