//! Extent and footprint helpers.

use geo::{BoundingRect, Coord, MultiPolygon, Rect};

/// Axis-aligned extent in some coordinate system.
pub type Extent = Rect<f64>;

/// Polygon footprint of a catalog feature.
pub type Footprint = MultiPolygon<f64>;

/// True when the extent cannot describe an area: non-finite corners or zero size.
pub fn is_degenerate(extent: &Extent) -> bool {
    let min = extent.min();
    let max = extent.max();
    let finite = [min.x, min.y, max.x, max.y].iter().all(|v| v.is_finite());
    !finite || extent.width() <= 0.0 || extent.height() <= 0.0
}

/// Closed-interval overlap test (touching edges count).
pub fn intersects(a: &Extent, b: &Extent) -> bool {
    a.min().x <= b.max().x
        && b.min().x <= a.max().x
        && a.min().y <= b.max().y
        && b.min().y <= a.max().y
}

/// Smallest extent covering both inputs.
pub fn union(a: &Extent, b: &Extent) -> Extent {
    Rect::new(
        Coord {
            x: a.min().x.min(b.min().x),
            y: a.min().y.min(b.min().y),
        },
        Coord {
            x: a.max().x.max(b.max().x),
            y: a.max().y.max(b.max().y),
        },
    )
}

/// Bounding box of a footprint, `None` for an empty one.
pub fn footprint_bounds(footprint: &Footprint) -> Option<Extent> {
    footprint.bounding_rect()
}

/// Bounding box of many footprints.
pub fn combined_bounds<'a>(footprints: impl IntoIterator<Item = &'a Footprint>) -> Option<Extent> {
    footprints
        .into_iter()
        .filter_map(footprint_bounds)
        .reduce(|acc, b| union(&acc, &b))
}

/// Points along the boundary of an extent, `per_edge` segments on each side.
///
/// Reprojecting only the four corners under-estimates curved edges, so extents
/// are transformed through these samples.
pub fn boundary_samples(extent: &Extent, per_edge: usize) -> Vec<Coord<f64>> {
    let per_edge = per_edge.max(1);
    let (min, max) = (extent.min(), extent.max());
    let mut samples = Vec::with_capacity(per_edge * 4);
    for i in 0..per_edge {
        let t = i as f64 / per_edge as f64;
        let x = min.x + (max.x - min.x) * t;
        let y = min.y + (max.y - min.y) * t;
        samples.push(Coord { x, y: min.y });
        samples.push(Coord { x: max.x, y });
        samples.push(Coord {
            x: max.x - (max.x - min.x) * t,
            y: max.y,
        });
        samples.push(Coord {
            x: min.x,
            y: max.y - (max.y - min.y) * t,
        });
    }
    samples
}

/// Extent spanned by a set of coordinates.
pub fn extent_of(coords: &[Coord<f64>]) -> Option<Extent> {
    let first = coords.first()?;
    let (mut min, mut max) = (*first, *first);
    for c in &coords[1..] {
        min.x = min.x.min(c.x);
        min.y = min.y.min(c.y);
        max.x = max.x.max(c.x);
        max.y = max.y.max(c.y);
    }
    Some(Rect::new(min, max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Extent {
        Rect::new(Coord { x: x0, y: y0 }, Coord { x: x1, y: y1 })
    }

    #[test]
    fn test_degenerate() {
        assert!(!is_degenerate(&rect(0.0, 0.0, 1.0, 1.0)));
        assert!(is_degenerate(&rect(0.0, 0.0, 0.0, 1.0)));
        assert!(is_degenerate(&rect(0.0, 0.0, f64::NAN, 1.0)));
        assert!(is_degenerate(&rect(0.0, 0.0, f64::INFINITY, 1.0)));
    }

    #[test]
    fn test_intersects_and_union() {
        let a = rect(0.0, 0.0, 2.0, 2.0);
        assert!(intersects(&a, &rect(1.0, 1.0, 3.0, 3.0)));
        assert!(intersects(&a, &rect(2.0, 0.0, 3.0, 1.0)));
        assert!(!intersects(&a, &rect(2.5, 0.0, 3.0, 1.0)));
        assert_eq!(union(&a, &rect(-1.0, 1.0, 1.0, 5.0)), rect(-1.0, 0.0, 2.0, 5.0));
    }

    #[test]
    fn test_combined_bounds() {
        let a: Footprint = MultiPolygon(vec![polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)]]);
        let b: Footprint = MultiPolygon(vec![polygon![(x: 5.0, y: 5.0), (x: 6.0, y: 5.0), (x: 6.0, y: 7.0)]]);
        assert_eq!(combined_bounds([&a, &b]), Some(rect(0.0, 0.0, 6.0, 7.0)));
        assert_eq!(combined_bounds(std::iter::empty()), None);
    }

    #[test]
    fn test_boundary_samples_cover_corners() {
        let e = rect(0.0, 0.0, 4.0, 2.0);
        let samples = boundary_samples(&e, 4);
        assert_eq!(samples.len(), 16);
        assert_eq!(extent_of(&samples), Some(e));
    }
}
