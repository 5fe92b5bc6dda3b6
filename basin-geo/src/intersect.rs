//! Geometry intersection test and attribute extraction primitives.

use crate::layer::Feature;
use geo::Intersects;

/// True when the two features' geometries share at least one point
/// (interiors overlap or boundaries touch).
///
/// Bounding rectangles are compared first; the exact predicate only runs for
/// candidates whose rectangles meet. Empty geometries never intersect.
pub fn overlaps(a: &Feature, b: &Feature) -> bool {
    match (a.bounds(), b.bounds()) {
        (Some(ra), Some(rb)) => ra.intersects(&rb) && a.geometry().intersects(b.geometry()),
        _ => false,
    }
}

/// Identity string of one attribute field, `None` when absent or null.
pub fn extract_field(feature: &Feature, field: &str) -> Option<String> {
    feature.attribute(field).and_then(|value| value.as_key())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::AttributeValue;
    use geo::{point, polygon, Geometry, GeometryCollection};
    use std::collections::BTreeMap;

    fn feature(geometry: Geometry<f64>) -> Feature {
        Feature::new(0, geometry, BTreeMap::new())
    }

    #[test]
    fn test_overlapping_polygons() {
        let a = feature(polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0)].into());
        let b = feature(polygon![(x: 1.0, y: 1.0), (x: 3.0, y: 1.0), (x: 3.0, y: 3.0), (x: 1.0, y: 3.0)].into());
        let c = feature(polygon![(x: 5.0, y: 5.0), (x: 6.0, y: 5.0), (x: 6.0, y: 6.0), (x: 5.0, y: 6.0)].into());
        assert!(overlaps(&a, &b));
        assert!(!overlaps(&a, &c));
    }

    #[test]
    fn test_bounding_boxes_meet_but_shapes_do_not() {
        // Triangle in the lower-left half of the unit square and a point in the upper-right half.
        let triangle = feature(polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 0.0, y: 1.0)].into());
        let well = feature(point!(x: 0.9, y: 0.9).into());
        assert!(!overlaps(&triangle, &well));
        let inside = feature(point!(x: 0.1, y: 0.1).into());
        assert!(overlaps(&triangle, &inside));
    }

    #[test]
    fn test_empty_geometry_never_overlaps() {
        let empty = feature(Geometry::GeometryCollection(GeometryCollection(Vec::new())));
        let square = feature(polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)].into());
        assert!(!overlaps(&empty, &square));
    }

    #[test]
    fn test_extract_field() {
        let f = Feature::new(
            3,
            point!(x: 0.0, y: 0.0).into(),
            BTreeMap::from([
                ("GRID".to_string(), AttributeValue::Number(21.0)),
                ("NOTE".to_string(), AttributeValue::Null),
            ]),
        );
        assert_eq!(extract_field(&f, "GRID").as_deref(), Some("21"));
        assert_eq!(extract_field(&f, "NOTE"), None);
        assert_eq!(extract_field(&f, "MISSING"), None);
    }
}
