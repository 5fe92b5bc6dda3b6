//! Shapefile reader producing [`Layer`]s.
//!
//! Reads the `.shp` geometry, the `.dbf` attribute table and the `.prj`
//! sidecar (if any). Only 2D shapes are supported; a feature whose shape
//! cannot be converted keeps its position with an empty geometry so that
//! positional basin identities stay stable.

use crate::{
    crs::Crs,
    error::Result,
    layer::{AttributeValue, Feature, Layer},
};
use geo::{Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use log::{info, warn};
use shapefile::{
    dbase::{self, FieldValue},
    PolygonRing, Reader, Shape,
};
use std::{collections::BTreeMap, path::Path};

/// Load a shapefile as an in-memory layer named after the file stem.
pub fn read_shapefile<P: AsRef<Path>>(path: P) -> Result<Layer> {
    let path = path.as_ref();
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let crs = Crs::from_sidecar(path)?;
    let fields = read_dbf_fields(&path.with_extension("dbf"))?;
    let mut reader = Reader::from_path(path)?;

    let mut features = Vec::new();
    for (index, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result?;
        let attributes = record
            .into_iter()
            .map(|(field, value)| (field, attribute_from_field(value)))
            .collect::<BTreeMap<String, AttributeValue>>();
        let geometry = shape_to_geometry(shape).unwrap_or_else(|| {
            warn!("{name} feature {index}: unsupported or null shape, treated as empty");
            Geometry::GeometryCollection(GeometryCollection(Vec::new()))
        });
        features.push(Feature::new(index, geometry, attributes));
    }

    info!(
        "read {} features with fields {:?} from {}",
        features.len(),
        fields,
        path.display()
    );
    Ok(Layer::new(&name, crs, fields, features))
}

/// Field names declared in a `.dbf` header, in column order. Available even
/// when the table holds no records.
fn read_dbf_fields(path: &Path) -> Result<Vec<String>> {
    let reader = dbase::Reader::from_path(path)?;
    Ok(reader
        .fields()
        .iter()
        .map(|field| field.name().to_string())
        // Internal deletion marker, not a table column.
        .filter(|name| name != "DeletionFlag")
        .collect())
}

fn attribute_from_field(value: FieldValue) -> AttributeValue {
    match value {
        FieldValue::Character(Some(s)) => AttributeValue::Text(s),
        FieldValue::Memo(s) => AttributeValue::Text(s),
        FieldValue::Numeric(Some(n)) => AttributeValue::Number(n),
        FieldValue::Float(Some(f)) => AttributeValue::Number(f64::from(f)),
        FieldValue::Double(d) => AttributeValue::Number(d),
        FieldValue::Currency(c) => AttributeValue::Number(c),
        FieldValue::Integer(i) => AttributeValue::Integer(i64::from(i)),
        FieldValue::Logical(Some(b)) => AttributeValue::Boolean(b),
        _ => AttributeValue::Null,
    }
}

fn coord(p: &shapefile::Point) -> Coord<f64> {
    Coord { x: p.x, y: p.y }
}

fn shape_to_geometry(shape: Shape) -> Option<Geometry<f64>> {
    match shape {
        Shape::Point(p) => Some(Geometry::Point(Point::new(p.x, p.y))),
        Shape::Multipoint(multipoint) => Some(Geometry::MultiPoint(MultiPoint::new(
            multipoint
                .points()
                .iter()
                .map(|p| Point::new(p.x, p.y))
                .collect(),
        ))),
        Shape::Polyline(polyline) => Some(Geometry::MultiLineString(MultiLineString::new(
            polyline
                .parts()
                .iter()
                .map(|part| part.iter().map(coord).collect::<LineString<f64>>())
                .collect(),
        ))),
        Shape::Polygon(polygon) => Some(Geometry::MultiPolygon(rings_to_multipolygon(
            polygon.rings(),
        ))),
        _ => None,
    }
}

/// Group each outer ring with the inner rings that follow it.
fn rings_to_multipolygon(rings: &[PolygonRing<shapefile::Point>]) -> MultiPolygon<f64> {
    let mut polygons = Vec::new();
    let mut exterior: Option<LineString<f64>> = None;
    let mut interiors: Vec<LineString<f64>> = Vec::new();
    for ring in rings {
        let line = ring.points().iter().map(coord).collect::<LineString<f64>>();
        match ring {
            PolygonRing::Outer(_) => {
                if let Some(outer) = exterior.take() {
                    polygons.push(Polygon::new(outer, std::mem::take(&mut interiors)));
                }
                exterior = Some(line);
            }
            PolygonRing::Inner(_) => interiors.push(line),
        }
    }
    if let Some(outer) = exterior {
        polygons.push(Polygon::new(outer, interiors));
    }
    MultiPolygon::new(polygons)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        join::{join, JoinMatch},
        layer::FeatureLayer,
    };
    use geo::Intersects;

    /// Main file header shared by `.shp` and `.shx`: polygon type, no shapes.
    fn empty_shape_header() -> Vec<u8> {
        let mut bytes = Vec::with_capacity(100);
        bytes.extend_from_slice(&9994i32.to_be_bytes());
        bytes.extend_from_slice(&[0u8; 20]);
        // File length in 16-bit words.
        bytes.extend_from_slice(&50i32.to_be_bytes());
        bytes.extend_from_slice(&1000i32.to_le_bytes());
        bytes.extend_from_slice(&5i32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 64]);
        bytes
    }

    /// dBase III table with one character field and no records.
    fn empty_dbf(field: &str, width: u8) -> Vec<u8> {
        let mut bytes = vec![0x03, 124, 1, 1];
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&(32u16 + 32 + 1).to_le_bytes());
        bytes.extend_from_slice(&(1u16 + u16::from(width)).to_le_bytes());
        bytes.extend_from_slice(&[0u8; 20]);
        let mut name = [0u8; 11];
        name[..field.len()].copy_from_slice(field.as_bytes());
        bytes.extend_from_slice(&name);
        bytes.push(b'C');
        bytes.extend_from_slice(&[0u8; 4]);
        bytes.push(width);
        bytes.push(0);
        bytes.extend_from_slice(&[0u8; 14]);
        bytes.push(0x0D);
        bytes.push(0x1A);
        bytes
    }

    #[test]
    fn test_empty_layer_keeps_schema() {
        let dir = tempfile::tempdir().unwrap();
        let shp = dir.path().join("grid.shp");
        std::fs::write(&shp, empty_shape_header()).unwrap();
        std::fs::write(dir.path().join("grid.shx"), empty_shape_header()).unwrap();
        std::fs::write(dir.path().join("grid.dbf"), empty_dbf("GRID_ID", 10)).unwrap();

        let grid = read_shapefile(&shp).unwrap();
        assert!(grid.is_empty());
        assert_eq!(grid.fields(), &["GRID_ID".to_string()][..]);

        let basins = Layer::from_geometries(
            "basins",
            Crs::Unknown,
            vec![(
                Geometry::Point(Point::new(1.0, 1.0)),
                BTreeMap::new(),
            )],
        );
        let result = join(&basins, &grid, "GRID_ID", None).unwrap();
        assert_eq!(result.get("0"), Some(&JoinMatch::NoMatch));
    }

    fn ring(points: &[(f64, f64)]) -> Vec<shapefile::Point> {
        points
            .iter()
            .map(|(x, y)| shapefile::Point::new(*x, *y))
            .collect()
    }

    #[test]
    fn test_polygon_with_hole() {
        let rings = vec![
            PolygonRing::Outer(ring(&[(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0), (0.0, 0.0)])),
            PolygonRing::Inner(ring(&[(4.0, 4.0), (6.0, 4.0), (6.0, 6.0), (4.0, 6.0), (4.0, 4.0)])),
        ];
        let multipolygon = rings_to_multipolygon(&rings);
        assert_eq!(multipolygon.0.len(), 1);
        assert_eq!(multipolygon.0[0].interiors().len(), 1);
        assert!(!multipolygon.intersects(&Point::new(5.0, 5.0)));
        assert!(multipolygon.intersects(&Point::new(2.0, 2.0)));
    }

    #[test]
    fn test_two_outer_rings() {
        let rings = vec![
            PolygonRing::Outer(ring(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0), (0.0, 0.0)])),
            PolygonRing::Outer(ring(&[(5.0, 5.0), (5.0, 6.0), (6.0, 6.0), (6.0, 5.0), (5.0, 5.0)])),
        ];
        assert_eq!(rings_to_multipolygon(&rings).0.len(), 2);
    }

    #[test]
    fn test_attribute_conversion() {
        assert_eq!(
            attribute_from_field(FieldValue::Numeric(Some(21.0))).as_key().as_deref(),
            Some("21")
        );
        assert_eq!(
            attribute_from_field(FieldValue::Character(Some("01234500".to_string()))),
            AttributeValue::Text("01234500".to_string())
        );
        assert_eq!(attribute_from_field(FieldValue::Numeric(None)), AttributeValue::Null);
    }
}
