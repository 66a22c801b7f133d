//! Spatial index over catalog footprints.
//!
//! Built fresh for every recompute from the (already filtered) feature set. Queries
//! run in two passes: an R-tree envelope lookup, then an exact intersection test
//! against each candidate's footprint.

use std::collections::BTreeSet;

use geo::{BoundingRect, Intersects};
use rstar::{RTree, RTreeObject, AABB};

use crate::extent::{self, Extent, Footprint};

struct IndexedFootprint<K> {
    key: K,
    envelope: AABB<[f64; 2]>,
    footprint: Footprint,
}

impl<K> RTreeObject for IndexedFootprint<K> {
    type Envelope = AABB<[f64; 2]>;

    #[inline]
    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// R-tree of footprints keyed by feature id.
pub struct GeometryIndex<K> {
    tree: RTree<IndexedFootprint<K>>,
    bounds: Option<Extent>,
}

impl<K: Copy + Ord> GeometryIndex<K> {
    /// Bulk-load an index. Features with an empty footprint are skipped.
    pub fn build<I>(features: I) -> Self
    where
        I: IntoIterator<Item = (K, Footprint)>,
    {
        let mut bounds: Option<Extent> = None;
        let items: Vec<_> = features
            .into_iter()
            .filter_map(|(key, footprint)| {
                let rect = footprint.bounding_rect()?;
                if ![rect.min().x, rect.min().y, rect.max().x, rect.max().y]
                    .iter()
                    .all(|v| v.is_finite())
                {
                    return None;
                }
                bounds = Some(match bounds {
                    Some(b) => extent::union(&b, &rect),
                    None => rect,
                });
                Some(IndexedFootprint {
                    key,
                    envelope: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                    footprint,
                })
            })
            .collect();

        Self {
            tree: RTree::bulk_load(items),
            bounds,
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Extent covering every indexed footprint.
    pub fn bounds(&self) -> Option<Extent> {
        self.bounds
    }

    /// Keys whose bounding boxes touch `region`. Conservative.
    pub fn candidates(&self, region: &Extent) -> BTreeSet<K> {
        if !self.covers_region(region) {
            return BTreeSet::new();
        }
        self.tree
            .locate_in_envelope_intersecting(&to_envelope(region))
            .map(|item| item.key)
            .collect()
    }

    /// Keys whose footprints truly intersect `region`.
    ///
    /// Degenerate regions and regions outside the indexed footprint yield an empty set.
    pub fn query(&self, region: &Extent) -> BTreeSet<K> {
        if !self.covers_region(region) {
            return BTreeSet::new();
        }
        let probe = region.to_polygon();
        self.tree
            .locate_in_envelope_intersecting(&to_envelope(region))
            .filter(|item| item.footprint.intersects(&probe))
            .map(|item| item.key)
            .collect()
    }

    fn covers_region(&self, region: &Extent) -> bool {
        if extent::is_degenerate(region) {
            return false;
        }
        self.bounds
            .as_ref()
            .is_some_and(|b| extent::intersects(b, region))
    }
}

fn to_envelope(region: &Extent) -> AABB<[f64; 2]> {
    AABB::from_corners(
        [region.min().x, region.min().y],
        [region.max().x, region.max().y],
    )
}
