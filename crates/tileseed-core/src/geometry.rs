//! GeoJSON geometry model
//!
//! Positions are longitude/latitude pairs in degrees (EPSG:4326); a third
//! altitude ordinate is accepted on input and dropped. A `Feature` or
//! `FeatureCollection` is accepted where a geometry is expected and reduced
//! to its geometry; properties are discarded.

use serde::{Deserialize, Serialize};

/// A longitude/latitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Position {
    /// Longitude in degrees
    pub lon: f64,
    /// Latitude in degrees
    pub lat: f64,
}

impl Position {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl TryFrom<Vec<f64>> for Position {
    type Error = String;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        match values.as_slice() {
            [lon, lat] | [lon, lat, _] => Ok(Self::new(*lon, *lat)),
            other => Err(format!(
                "a position needs 2 or 3 ordinates, got {}",
                other.len()
            )),
        }
    }
}

impl From<Position> for Vec<f64> {
    fn from(position: Position) -> Self {
        vec![position.lon, position.lat]
    }
}

/// A GeoJSON geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", from = "GeoJsonObject")]
pub enum Geometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    GeometryCollection { geometries: Vec<Geometry> },
}

/// Any GeoJSON object that carries geometry
#[derive(Deserialize)]
#[serde(tag = "type")]
enum GeoJsonObject {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    GeometryCollection { geometries: Vec<Geometry> },
    Feature { geometry: Option<Geometry> },
    FeatureCollection { features: Vec<FeatureGeometry> },
}

#[derive(Deserialize)]
struct FeatureGeometry {
    geometry: Option<Geometry>,
}

impl From<GeoJsonObject> for Geometry {
    fn from(object: GeoJsonObject) -> Self {
        match object {
            GeoJsonObject::Point { coordinates } => Self::Point { coordinates },
            GeoJsonObject::MultiPoint { coordinates } => Self::MultiPoint { coordinates },
            GeoJsonObject::LineString { coordinates } => Self::LineString { coordinates },
            GeoJsonObject::MultiLineString { coordinates } => Self::MultiLineString { coordinates },
            GeoJsonObject::Polygon { coordinates } => Self::Polygon { coordinates },
            GeoJsonObject::MultiPolygon { coordinates } => Self::MultiPolygon { coordinates },
            GeoJsonObject::GeometryCollection { geometries } => {
                Self::GeometryCollection { geometries }
            }
            // a null feature geometry is an empty collection
            GeoJsonObject::Feature { geometry } => geometry.unwrap_or(Self::GeometryCollection {
                geometries: Vec::new(),
            }),
            GeoJsonObject::FeatureCollection { features } => Self::GeometryCollection {
                geometries: features.into_iter().filter_map(|f| f.geometry).collect(),
            },
        }
    }
}

impl Geometry {
    /// GeoJSON type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Point { .. } => "Point",
            Self::MultiPoint { .. } => "MultiPoint",
            Self::LineString { .. } => "LineString",
            Self::MultiLineString { .. } => "MultiLineString",
            Self::Polygon { .. } => "Polygon",
            Self::MultiPolygon { .. } => "MultiPolygon",
            Self::GeometryCollection { .. } => "GeometryCollection",
        }
    }

    /// All positions of the geometry, rings flattened
    pub fn positions(&self) -> Vec<Position> {
        match self {
            Self::Point { coordinates } => vec![*coordinates],
            Self::MultiPoint { coordinates } | Self::LineString { coordinates } => {
                coordinates.clone()
            }
            Self::MultiLineString { coordinates } | Self::Polygon { coordinates } => {
                coordinates.iter().flatten().copied().collect()
            }
            Self::MultiPolygon { coordinates } => {
                coordinates.iter().flatten().flatten().copied().collect()
            }
            Self::GeometryCollection { geometries } => {
                geometries.iter().flat_map(Geometry::positions).collect()
            }
        }
    }

    /// Minimal rectangle enclosing the geometry, `None` when it has no positions
    pub fn bbox(&self) -> Option<BoundingBox> {
        BoundingBox::enclosing(&self.positions())
    }

    /// Serialize as compact GeoJSON
    pub fn to_geojson(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Axis-aligned lon/lat rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Rectangle enclosing all positions
    pub fn enclosing(positions: &[Position]) -> Option<Self> {
        let first = positions.first()?;
        let init = Self {
            min_lon: first.lon,
            min_lat: first.lat,
            max_lon: first.lon,
            max_lat: first.lat,
        };
        Some(positions.iter().fold(init, |bbox, p| Self {
            min_lon: bbox.min_lon.min(p.lon),
            min_lat: bbox.min_lat.min(p.lat),
            max_lon: bbox.max_lon.max(p.lon),
            max_lat: bbox.max_lat.max(p.lat),
        }))
    }

    /// Whether the rectangle has zero width or zero height
    pub fn is_degenerate(&self) -> bool {
        self.max_lon <= self.min_lon || self.max_lat <= self.min_lat
    }

    /// Whether `other` lies within this rectangle
    pub fn contains(&self, other: &BoundingBox) -> bool {
        self.min_lon <= other.min_lon
            && self.min_lat <= other.min_lat
            && self.max_lon >= other.max_lon
            && self.max_lat >= other.max_lat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Geometry {
        Geometry::Polygon {
            coordinates: vec![vec![
                Position::new(35.079988132, 32.479045006),
                Position::new(35.149688132, 32.479045006),
                Position::new(35.149688132, 32.424145006),
                Position::new(35.079988132, 32.424145006),
                Position::new(35.079988132, 32.479045006),
            ]],
        }
    }

    #[test]
    fn test_deserialize_polygon() {
        let json = r#"{"type":"Polygon","coordinates":[[[1.0,2.0],[3.0,2.0],[3.0,4.0],[1.0,2.0]]]}"#;
        let geometry: Geometry = serde_json::from_str(json).unwrap();
        assert_eq!(geometry.type_name(), "Polygon");
        assert_eq!(geometry.positions().len(), 4);
    }

    #[test]
    fn test_deserialize_position_with_altitude() {
        let json = r#"{"type":"Point","coordinates":[1.5,2.5,100.0]}"#;
        let geometry: Geometry = serde_json::from_str(json).unwrap();
        assert_eq!(
            geometry,
            Geometry::Point {
                coordinates: Position::new(1.5, 2.5)
            }
        );
    }

    #[test]
    fn test_deserialize_rejects_short_position() {
        let json = r#"{"type":"Point","coordinates":[1.5]}"#;
        assert!(serde_json::from_str::<Geometry>(json).is_err());
    }

    #[test]
    fn test_deserialize_feature_unwraps_geometry() {
        let json = r#"{"type":"Feature","properties":{"name":"area"},"geometry":{"type":"MultiPoint","coordinates":[[1.0,2.0],[3.0,4.0]]}}"#;
        let geometry: Geometry = serde_json::from_str(json).unwrap();
        assert_eq!(
            geometry,
            Geometry::MultiPoint {
                coordinates: vec![Position::new(1.0, 2.0), Position::new(3.0, 4.0)]
            }
        );
    }

    #[test]
    fn test_deserialize_feature_collection() {
        let json = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{},"geometry":{"type":"MultiLineString","coordinates":[[[0.0,0.0],[1.0,1.0]]]}},
            {"type":"Feature","properties":{},"geometry":null}
        ]}"#;
        let geometry: Geometry = serde_json::from_str(json).unwrap();

        let Geometry::GeometryCollection { geometries } = &geometry else {
            panic!("expected collection, got {}", geometry.type_name());
        };
        assert_eq!(geometries.len(), 1);
        assert_eq!(geometries[0].type_name(), "MultiLineString");
        assert_eq!(geometry.positions().len(), 2);
    }

    #[test]
    fn test_collection_serializes_as_geometry() {
        let collection = Geometry::GeometryCollection {
            geometries: vec![square()],
        };
        let json = collection.to_geojson().unwrap();
        assert!(json.starts_with(r#"{"type":"GeometryCollection","geometries":[{"type":"Polygon""#));
        assert_eq!(serde_json::from_str::<Geometry>(&json).unwrap(), collection);
    }

    #[test]
    fn test_to_geojson_keeps_type_first() {
        let json = square().to_geojson().unwrap();
        assert!(json.starts_with(r#"{"type":"Polygon","coordinates":[[[35.079988132,32.479045006]"#));
    }

    #[test]
    fn test_bbox() {
        let bbox = square().bbox().unwrap();
        assert_eq!(bbox.min_lon, 35.079988132);
        assert_eq!(bbox.max_lat, 32.479045006);
        assert!(!bbox.is_degenerate());
    }

    #[test]
    fn test_point_bbox_is_degenerate() {
        let point = Geometry::Point {
            coordinates: Position::new(1.0, 1.0),
        };
        assert!(point.bbox().unwrap().is_degenerate());
    }

    #[test]
    fn test_empty_geometry_has_no_bbox() {
        let empty = Geometry::LineString {
            coordinates: Vec::new(),
        };
        assert!(empty.bbox().is_none());
    }
}
