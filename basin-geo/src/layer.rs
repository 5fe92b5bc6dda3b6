use crate::{
    crs::Crs,
    error::{GeoError, Result},
};
use geo::{BoundingRect, Geometry, Rect};
use std::{collections::BTreeMap, collections::BTreeSet, fmt};

/// A single attribute value read from a layer's attribute table.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Text(String),
    Number(f64),
    Integer(i64),
    Boolean(bool),
    Null,
}

impl AttributeValue {
    /// Render the value as a feature identity.
    ///
    /// Integral numbers render without a fractional part so that a numeric
    /// `31.0` and a text `"31"` produce the same key. Null, blank text and NaN
    /// have no identity.
    pub fn as_key(&self) -> Option<String> {
        match self {
            AttributeValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            AttributeValue::Number(v) if v.is_nan() => None,
            AttributeValue::Number(v) if v.fract() == 0.0 && v.abs() < 1e15 => {
                Some(format!("{}", *v as i64))
            }
            AttributeValue::Number(v) => Some(v.to_string()),
            AttributeValue::Integer(i) => Some(i.to_string()),
            AttributeValue::Boolean(b) => Some(b.to_string()),
            AttributeValue::Null => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_key() {
            Some(key) => write!(f, "{key}"),
            None => write!(f, "NULL"),
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

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Integer(i64::from(value))
    }
}

/// A point or polygon feature: positional index, geometry and attributes.
///
/// Features are immutable once built; the bounding rectangle is computed up
/// front for the intersection prefilter.
#[derive(Debug, Clone)]
pub struct Feature {
    index: usize,
    geometry: Geometry<f64>,
    bounds: Option<Rect<f64>>,
    attributes: BTreeMap<String, AttributeValue>,
}

impl Feature {
    pub fn new(
        index: usize,
        geometry: Geometry<f64>,
        attributes: BTreeMap<String, AttributeValue>,
    ) -> Feature {
        let bounds = geometry.bounding_rect();
        Feature {
            index,
            geometry,
            bounds,
            attributes,
        }
    }

    /// Position of the feature within its layer.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn geometry(&self) -> &Geometry<f64> {
        &self.geometry
    }

    /// Bounding rectangle, `None` for an empty geometry.
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.bounds
    }

    pub fn attribute(&self, field: &str) -> Option<&AttributeValue> {
        self.attributes.get(field)
    }

    pub fn attributes(&self) -> &BTreeMap<String, AttributeValue> {
        &self.attributes
    }
}

/// Any vector-feature source the spatial join can read.
pub trait FeatureLayer {
    /// Human-readable layer name used in diagnostics.
    fn name(&self) -> &str;
    fn crs(&self) -> &Crs;
    /// Attribute schema (field names).
    fn fields(&self) -> &[String];
    /// Features in layer iteration order.
    fn features(&self) -> &[Feature];

    fn has_field(&self, field: &str) -> bool {
        self.fields().iter().any(|f| f == field)
    }

    /// Fail with a schema error unless `field` is part of the layer schema.
    fn require_field(&self, field: &str) -> Result<()> {
        if self.has_field(field) {
            Ok(())
        } else {
            Err(GeoError::MissingField {
                layer: self.name().to_string(),
                field: field.to_string(),
            })
        }
    }
}

/// In-memory layer: an ordered collection of features sharing one CRS and schema.
#[derive(Debug, Clone)]
pub struct Layer {
    name: String,
    crs: Crs,
    fields: Vec<String>,
    features: Vec<Feature>,
}

impl Layer {
    pub fn new(name: &str, crs: Crs, fields: Vec<String>, features: Vec<Feature>) -> Layer {
        Layer {
            name: name.to_string(),
            crs,
            fields,
            features,
        }
    }

    /// Build a layer from geometries and attribute maps, assigning positional
    /// indices and deriving the schema from the union of attribute names.
    pub fn from_geometries<I>(name: &str, crs: Crs, items: I) -> Layer
    where
        I: IntoIterator<Item = (Geometry<f64>, BTreeMap<String, AttributeValue>)>,
    {
        let features = items
            .into_iter()
            .enumerate()
            .map(|(index, (geometry, attributes))| Feature::new(index, geometry, attributes))
            .collect::<Vec<_>>();
        let fields = features
            .iter()
            .flat_map(|f| f.attributes().keys().cloned())
            .collect::<BTreeSet<String>>()
            .into_iter()
            .collect();
        Layer::new(name, crs, fields, features)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl FeatureLayer for Layer {
    fn name(&self) -> &str {
        &self.name
    }

    fn crs(&self) -> &Crs {
        &self.crs
    }

    fn fields(&self) -> &[String] {
        &self.fields
    }

    fn features(&self) -> &[Feature] {
        &self.features
    }
}
