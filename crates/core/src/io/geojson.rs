//! GeoJSON reading/writing for feature collections
//!
//! Covers the subset needed to move line features in and out of SpeedField:
//! `FeatureCollection` and `Feature` documents with any of the seven RFC 7946
//! geometry types. Coordinates beyond the second (elevation) are dropped.

use crate::error::{Error, Result};
use crate::vector::{AttributeValue, Feature, FeatureCollection};
use geo_types::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

type Position = Vec<f64>;

fn feature_kind() -> String {
    "Feature".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum RawDocument {
    FeatureCollection { features: Vec<RawFeature> },
    Feature(RawFeature),
}

#[derive(Debug, Serialize)]
struct RawFeatureCollection {
    #[serde(rename = "type")]
    kind: &'static str,
    features: Vec<RawFeature>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawFeature {
    #[serde(rename = "type", skip_deserializing, default = "feature_kind")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<Value>,
    geometry: Option<RawGeometry>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
enum RawGeometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    GeometryCollection { geometries: Vec<RawGeometry> },
}

/// Read a GeoJSON file into a FeatureCollection
pub fn read_geojson<P: AsRef<Path>>(path: P) -> Result<FeatureCollection> {
    let file = File::open(path.as_ref())?;
    decode_geojson(BufReader::new(file))
}

/// Parse a GeoJSON document held in memory
pub fn read_geojson_from_str(data: &str) -> Result<FeatureCollection> {
    decode_geojson(data.as_bytes())
}

/// Write a FeatureCollection to a GeoJSON file
pub fn write_geojson<P: AsRef<Path>>(features: &FeatureCollection, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    encode_geojson(features, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Serialize a FeatureCollection to a GeoJSON string
pub fn write_geojson_to_string(features: &FeatureCollection) -> Result<String> {
    let mut buf = Vec::new();
    encode_geojson(features, &mut buf)?;
    String::from_utf8(buf).map_err(|e| Error::Other(e.to_string()))
}

fn decode_geojson<R: Read>(reader: R) -> Result<FeatureCollection> {
    let doc: RawDocument = serde_json::from_reader(reader)?;
    let raw_features = match doc {
        RawDocument::FeatureCollection { features } => features,
        RawDocument::Feature(f) => vec![f],
    };
    raw_features.into_iter().map(feature_from_raw).collect()
}

fn encode_geojson<W: Write>(features: &FeatureCollection, writer: W) -> Result<()> {
    let raw = RawFeatureCollection {
        kind: "FeatureCollection",
        features: features.iter().map(feature_to_raw).collect::<Result<_>>()?,
    };
    serde_json::to_writer(writer, &raw)?;
    Ok(())
}

fn feature_from_raw(raw: RawFeature) -> Result<Feature> {
    let geometry = raw.geometry.map(geometry_from_raw).transpose()?;
    let properties = raw
        .properties
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, attribute_from_json(v)))
        .collect();
    let id = raw.id.map(|v| match v {
        Value::String(s) => s,
        other => other.to_string(),
    });
    Ok(Feature { geometry, properties, id })
}

fn feature_to_raw(feature: &Feature) -> Result<RawFeature> {
    let geometry = feature.geometry.as_ref().map(geometry_to_raw).transpose()?;
    let properties = feature
        .properties
        .iter()
        .map(|(k, v)| -> Result<(String, Value)> { Ok((k.clone(), serde_json::to_value(v)?)) })
        .collect::<Result<Map<_, _>>>()?;
    Ok(RawFeature {
        kind: feature_kind(),
        id: feature.id.clone().map(Value::String),
        geometry,
        properties: Some(properties),
    })
}

fn attribute_from_json(v: Value) -> AttributeValue {
    match v {
        Value::Null => AttributeValue::Null,
        Value::Bool(b) => AttributeValue::Bool(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => AttributeValue::Int(i),
            None => AttributeValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => AttributeValue::String(s),
        nested => AttributeValue::String(nested.to_string()),
    }
}

fn coord_from_position(p: &Position) -> Result<Coord<f64>> {
    match p.as_slice() {
        [x, y, ..] => Ok(Coord { x: *x, y: *y }),
        _ => Err(Error::InvalidGeoJson(format!(
            "position needs at least 2 values, got {}",
            p.len()
        ))),
    }
}

fn line_from_positions(ps: &[Position]) -> Result<LineString<f64>> {
    ps.iter()
        .map(coord_from_position)
        .collect::<Result<Vec<_>>>()
        .map(LineString::new)
}

fn polygon_from_rings(rings: &[Vec<Position>]) -> Result<Polygon<f64>> {
    let mut rings = rings.iter().map(|r| line_from_positions(r));
    let exterior = match rings.next() {
        Some(ring) => ring?,
        None => LineString::new(vec![]),
    };
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn geometry_from_raw(raw: RawGeometry) -> Result<Geometry<f64>> {
    let geom: Geometry<f64> = match raw {
        RawGeometry::Point { coordinates } => Point(coord_from_position(&coordinates)?).into(),
        RawGeometry::MultiPoint { coordinates } => MultiPoint::new(
            coordinates
                .iter()
                .map(|p| coord_from_position(p).map(Point))
                .collect::<Result<_>>()?,
        )
        .into(),
        RawGeometry::LineString { coordinates } => line_from_positions(&coordinates)?.into(),
        RawGeometry::MultiLineString { coordinates } => MultiLineString::new(
            coordinates
                .iter()
                .map(|l| line_from_positions(l))
                .collect::<Result<_>>()?,
        )
        .into(),
        RawGeometry::Polygon { coordinates } => polygon_from_rings(&coordinates)?.into(),
        RawGeometry::MultiPolygon { coordinates } => MultiPolygon::new(
            coordinates
                .iter()
                .map(|p| polygon_from_rings(p))
                .collect::<Result<_>>()?,
        )
        .into(),
        RawGeometry::GeometryCollection { geometries } => {
            Geometry::GeometryCollection(GeometryCollection(
                geometries
                    .into_iter()
                    .map(geometry_from_raw)
                    .collect::<Result<_>>()?,
            ))
        }
    };
    Ok(geom)
}

fn positions_of(line: &LineString<f64>) -> Vec<Position> {
    line.coords().map(|c| vec![c.x, c.y]).collect()
}

fn rings_of(polygon: &Polygon<f64>) -> Vec<Vec<Position>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(positions_of)
        .collect()
}

fn geometry_to_raw(geom: &Geometry<f64>) -> Result<RawGeometry> {
    let raw = match geom {
        Geometry::Point(p) => RawGeometry::Point {
            coordinates: vec![p.x(), p.y()],
        },
        Geometry::MultiPoint(mp) => RawGeometry::MultiPoint {
            coordinates: mp.iter().map(|p| vec![p.x(), p.y()]).collect(),
        },
        Geometry::Line(l) => RawGeometry::LineString {
            coordinates: vec![vec![l.start.x, l.start.y], vec![l.end.x, l.end.y]],
        },
        Geometry::LineString(ls) => RawGeometry::LineString {
            coordinates: positions_of(ls),
        },
        Geometry::MultiLineString(mls) => RawGeometry::MultiLineString {
            coordinates: mls.iter().map(positions_of).collect(),
        },
        Geometry::Polygon(p) => RawGeometry::Polygon {
            coordinates: rings_of(p),
        },
        Geometry::MultiPolygon(mp) => RawGeometry::MultiPolygon {
            coordinates: mp.iter().map(rings_of).collect(),
        },
        Geometry::Rect(r) => RawGeometry::Polygon {
            coordinates: rings_of(&r.to_polygon()),
        },
        Geometry::Triangle(t) => RawGeometry::Polygon {
            coordinates: rings_of(&t.to_polygon()),
        },
        Geometry::GeometryCollection(gc) => RawGeometry::GeometryCollection {
            geometries: gc.iter().map(geometry_to_raw).collect::<Result<_>>()?,
        },
    };
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "id": 7,
                "geometry": {"type": "LineString", "coordinates": [[5.37, 43.29], [5.38, 43.30, 12.0]]},
                "properties": {"Vitesse": 42.5, "Sens": -1, "name": "Canebière", "tags": ["a"]}
            },
            {
                "type": "Feature",
                "geometry": null,
                "properties": {"Vitesse": "30"}
            },
            {
                "type": "Feature",
                "geometry": {
                    "type": "GeometryCollection",
                    "geometries": [
                        {"type": "MultiLineString", "coordinates": [[[0, 0], [1, 1]], [[2, 2], [3, 3]]]},
                        {"type": "Point", "coordinates": [0.5, 0.5]}
                    ]
                },
                "properties": null
            }
        ]
    }"#;

    #[test]
    fn test_read_feature_collection() {
        let fc = read_geojson_from_str(SAMPLE).unwrap();
        assert_eq!(fc.len(), 3);

        let first = &fc.features[0];
        assert_eq!(first.id.as_deref(), Some("7"));
        assert_eq!(first.get_property("Vitesse"), Some(&AttributeValue::Float(42.5)));
        assert_eq!(first.get_property("Sens"), Some(&AttributeValue::Int(-1)));
        assert_eq!(
            first.get_property("tags"),
            Some(&AttributeValue::String("[\"a\"]".to_string()))
        );
        match first.geometry.as_ref().unwrap() {
            Geometry::LineString(ls) => {
                assert_eq!(ls.0.len(), 2);
                assert_eq!(ls.0[1], Coord { x: 5.38, y: 43.30 });
            }
            other => panic!("expected LineString, got {:?}", other),
        }

        assert!(fc.features[1].geometry.is_none());
        assert!(fc.features[2].properties.is_empty());
        match fc.features[2].geometry.as_ref().unwrap() {
            Geometry::GeometryCollection(gc) => assert_eq!(gc.len(), 2),
            other => panic!("expected GeometryCollection, got {:?}", other),
        }
    }

    #[test]
    fn test_read_single_feature() {
        let doc = r#"{"type": "Feature", "geometry": {"type": "Point", "coordinates": [1, 2]}, "properties": {}}"#;
        let fc = read_geojson_from_str(doc).unwrap();
        assert_eq!(fc.len(), 1);
    }

    #[test]
    fn test_read_nested_geometry_collection() {
        let doc = r#"{"type": "Feature", "properties": {}, "geometry": {
            "type": "GeometryCollection",
            "geometries": [
                {"type": "LineString", "coordinates": [[0, 0], [1, 0]]},
                {"type": "GeometryCollection", "geometries": [
                    {"type": "Point", "coordinates": [2, 2]}
                ]}
            ]
        }}"#;
        let fc = read_geojson_from_str(doc).unwrap();
        let Some(Geometry::GeometryCollection(gc)) = &fc.features[0].geometry else {
            panic!("expected GeometryCollection");
        };
        assert_eq!(gc.len(), 2);
        assert!(matches!(gc.0[0], Geometry::LineString(_)));
        match &gc.0[1] {
            Geometry::GeometryCollection(inner) => {
                assert_eq!(inner.0, vec![Geometry::Point(Point::new(2.0, 2.0))]);
            }
            other => panic!("expected nested GeometryCollection, got {:?}", other),
        }
    }

    #[test]
    fn test_short_position_rejected() {
        let doc = r#"{"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[1], [2, 3]]}, "properties": {}}"#;
        assert!(matches!(read_geojson_from_str(doc), Err(Error::InvalidGeoJson(_))));
    }

    #[test]
    fn test_unknown_geometry_type_is_json_error() {
        let doc = r#"{"type": "Feature", "geometry": {"type": "Circle", "radius": 3}, "properties": {}}"#;
        assert!(matches!(read_geojson_from_str(doc), Err(Error::Json(_))));
    }

    #[test]
    fn test_write_preserves_properties_and_geometry() {
        let fc = read_geojson_from_str(SAMPLE).unwrap();
        let text = write_geojson_to_string(&fc).unwrap();
        let back = read_geojson_from_str(&text).unwrap();

        assert_eq!(back.len(), fc.len());
        assert_eq!(back.features[0].properties, fc.features[0].properties);
        assert_eq!(back.features[0].geometry, fc.features[0].geometry);
        assert_eq!(back.features[2].geometry, fc.features[2].geometry);
        assert!(back.features[1].geometry.is_none());
    }

    #[test]
    fn test_write_to_file() {
        let path = std::env::temp_dir().join("speedfield_geojson_write_test.geojson");
        let fc: FeatureCollection = vec![Feature::new(
            LineString::from(vec![(0.0, 0.0), (1.0, 0.0)]).into(),
        )
        .with_property("speed", 13.9)]
        .into_iter()
        .collect();

        write_geojson(&fc, &path).unwrap();
        let back = read_geojson(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(back.features[0].get_property("speed"), Some(&AttributeValue::Float(13.9)));
    }
}
