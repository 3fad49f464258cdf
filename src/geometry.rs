//! Municipality geometry.
//!
//! The collection is kept as the original GeoJSON document so every source
//! property survives a save/load round trip. The only addition is the
//! derived canonical key stored next to the original name.

use std::fs;
use std::path::Path;

use geo::{Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{ObservatoryError, Result};
use crate::normalize::normalize;

/// Property holding the municipality name in the IBGE mesh.
pub const NAME_PROPERTY: &str = "NM_MUN";
/// Derived property holding the canonical key.
pub const KEY_PROPERTY: &str = "NM_MUN_NORMALIZADO";

#[derive(Debug, Clone, PartialEq)]
pub struct GeoFeatureCollection {
    document: Value,
}

impl GeoFeatureCollection {
    pub fn from_value(document: Value) -> Result<Self> {
        match document.get("features") {
            Some(Value::Array(_)) => Ok(Self { document }),
            _ => Err(ObservatoryError::geometry(
                "document has no 'features' array",
            )),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| ObservatoryError::data_source(path, e))?;
        let document: Value =
            serde_json::from_str(&text).map_err(|e| ObservatoryError::data_source(path, e))?;
        Self::from_value(document).map_err(|e| ObservatoryError::data_source(path, e))
    }

    pub fn as_value(&self) -> &Value {
        &self.document
    }

    pub fn features(&self) -> &[Value] {
        self.document
            .get("features")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.features().len()
    }

    pub fn is_empty(&self) -> bool {
        self.features().is_empty()
    }

    /// Stamp every feature that has a name with its canonical key.
    /// The original name property is left untouched. Returns how many
    /// features were keyed.
    pub fn attach_canonical_keys(&mut self) -> usize {
        let Some(features) = self
            .document
            .get_mut("features")
            .and_then(Value::as_array_mut)
        else {
            return 0;
        };
        let mut keyed = 0;
        for feature in features.iter_mut() {
            let Some(props) = feature.get_mut("properties").and_then(Value::as_object_mut) else {
                continue;
            };
            let key = match props.get(NAME_PROPERTY).and_then(Value::as_str) {
                Some(name) if !name.is_empty() => normalize(Some(name)),
                _ => continue,
            };
            props.insert(KEY_PROPERTY.to_string(), Value::String(key));
            keyed += 1;
        }
        debug!(keyed, total = features.len(), "attached canonical keys to features");
        keyed
    }

    /// Canonical key and parsed geometry of every feature that has both.
    /// Features without a geometry are skipped silently; features whose
    /// geometry cannot be read are skipped with a warning.
    pub fn keyed_geometries(&self) -> Vec<(String, Geometry<f64>)> {
        let mut out = Vec::new();
        for feature in self.features() {
            let Some(key) = feature_key(feature) else {
                continue;
            };
            match feature.get("geometry") {
                None | Some(Value::Null) => continue,
                Some(geometry) => match geometry_from_geojson(geometry) {
                    Ok(g) => out.push((key, g)),
                    Err(e) => warn!(municipio = %key, error = %e, "skipping unreadable geometry"),
                },
            }
        }
        out
    }
}

/// Canonical key of a feature: the derived property when present,
/// otherwise computed from the name on the fly.
fn feature_key(feature: &Value) -> Option<String> {
    let props = feature.get("properties").and_then(Value::as_object)?;
    if let Some(key) = props.get(KEY_PROPERTY).and_then(Value::as_str) {
        return Some(key.to_string());
    }
    props
        .get(NAME_PROPERTY)
        .and_then(Value::as_str)
        .map(|name| normalize(Some(name)))
}

/// Convert a GeoJSON geometry object into a `geo` geometry.
pub fn geometry_from_geojson(value: &Value) -> Result<Geometry<f64>> {
    let obj = value
        .as_object()
        .ok_or_else(|| ObservatoryError::geometry("geometry is not an object"))?;
    let kind = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| ObservatoryError::geometry("geometry without 'type'"))?;
    if kind == "GeometryCollection" {
        let members = obj
            .get("geometries")
            .and_then(Value::as_array)
            .ok_or_else(|| ObservatoryError::geometry("collection without 'geometries'"))?;
        let parsed = members
            .iter()
            .map(geometry_from_geojson)
            .collect::<Result<Vec<_>>>()?;
        return Ok(Geometry::GeometryCollection(parsed.into()));
    }
    let coords = obj
        .get("coordinates")
        .ok_or_else(|| ObservatoryError::geometry(format!("{kind} without 'coordinates'")))?;
    let geometry = match kind {
        "Point" => Geometry::Point(Point::from(position(coords)?)),
        "MultiPoint" => Geometry::MultiPoint(MultiPoint::new(
            positions(coords)?.into_iter().map(Point::from).collect(),
        )),
        "LineString" => Geometry::LineString(LineString::new(positions(coords)?)),
        "MultiLineString" => Geometry::MultiLineString(MultiLineString::new(
            array(coords)?
                .iter()
                .map(|line| positions(line).map(LineString::new))
                .collect::<Result<Vec<_>>>()?,
        )),
        "Polygon" => Geometry::Polygon(polygon(coords)?),
        "MultiPolygon" => Geometry::MultiPolygon(MultiPolygon::new(
            array(coords)?
                .iter()
                .map(polygon)
                .collect::<Result<Vec<_>>>()?,
        )),
        other => {
            return Err(ObservatoryError::geometry(format!(
                "unsupported geometry type '{other}'"
            )))
        }
    };
    Ok(geometry)
}

fn array(value: &Value) -> Result<&Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| ObservatoryError::geometry("expected a coordinate array"))
}

fn position(value: &Value) -> Result<Coord<f64>> {
    let pair = array(value)?;
    match (
        pair.first().and_then(Value::as_f64),
        pair.get(1).and_then(Value::as_f64),
    ) {
        (Some(x), Some(y)) => Ok(Coord { x, y }),
        _ => Err(ObservatoryError::geometry("position needs two numbers")),
    }
}

fn positions(value: &Value) -> Result<Vec<Coord<f64>>> {
    array(value)?.iter().map(position).collect()
}

fn polygon(value: &Value) -> Result<Polygon<f64>> {
    let mut rings = array(value)?
        .iter()
        .map(|ring| positions(ring).map(LineString::new));
    let exterior = rings
        .next()
        .transpose()?
        .ok_or_else(|| ObservatoryError::geometry("polygon without exterior ring"))?;
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

/// A bare `Feature` carrying only the name property.
pub fn named_feature(name: &str, geometry: Option<Value>) -> Value {
    let mut props = Map::new();
    props.insert(NAME_PROPERTY.to_string(), Value::String(name.to_string()));
    let mut obj = Map::new();
    obj.insert("type".to_string(), Value::String("Feature".to_string()));
    obj.insert("properties".to_string(), Value::Object(props));
    obj.insert("geometry".to_string(), geometry.unwrap_or(Value::Null));
    Value::Object(obj)
}
