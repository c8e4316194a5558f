use geo_types::{Coordinate, Geometry, MultiPolygon, Point, Polygon, Rect};
use log::warn;
use serde::Serialize;
use serde_derive::*;
use std::fmt;

/// A [longitude, latitude] position
pub type Coord = Point<f64>;

#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct ZoneId {
    pub index: u64,
}

impl ZoneId {
    /// The reserved id of the zone covering the whole municipality.
    /// It is never stored, it always denotes the municipal boundary.
    pub const WHOLE_MUNICIPALITY: ZoneId = ZoneId { index: 0 };

    pub fn new(index: u64) -> Self {
        ZoneId { index }
    }

    pub fn is_whole_municipality(self) -> bool {
        self == Self::WHOLE_MUNICIPALITY
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index)
    }
}

/// A named geometric region documents can be attached to.
///
/// The zone `0` wraps the municipal boundary, it can be a multipolygon.
/// All the other zones are simple polygons drawn by the planners.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Zone {
    pub id: ZoneId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(
        serialize_with = "serialize_as_geojson",
        deserialize_with = "deserialize_as_multipolygon",
        rename = "geometry"
    )]
    pub boundary: MultiPolygon<f64>,
    // derived from the boundary, it is what the map displays for a document
    // attached to this zone
    #[serde(
        serialize_with = "serialize_as_geojson",
        deserialize_with = "deserialize_as_coord"
    )]
    pub center: Coord,
    #[serde(
        serialize_with = "serialize_bbox_as_geojson",
        deserialize_with = "deserialize_as_rect",
        default
    )]
    pub bbox: Option<Rect<f64>>,
}

impl Zone {
    pub fn is_whole_municipality(&self) -> bool {
        self.id.is_whole_municipality()
    }

    /// the polygon of a drawn zone, `None` if the zone is made of several polygons
    pub fn polygon(&self) -> Option<&Polygon<f64>> {
        match self.boundary.0.as_slice() {
            [p] => Some(p),
            _ => None,
        }
    }
}

fn serialize_as_geojson<'a, S, T>(geom: &'a T, serializer: S) -> Result<S::Ok, S::Error>
where
    geojson::Value: From<&'a T>,
    S: serde::Serializer,
{
    use geojson::{GeoJson, Geometry, Value};

    GeoJson::Geometry(Geometry::new(Value::from(geom))).serialize(serializer)
}

fn deserialize_geom<'de, D>(d: D) -> Result<Option<Geometry<f64>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;
    use std::convert::TryInto;

    Option::<geojson::GeoJson>::deserialize(d).map(|option| {
        option.and_then(|geojson| match geojson {
            geojson::GeoJson::Geometry(geojson_geom) => {
                let geo_geom: Result<Geometry<f64>, _> = geojson_geom.value.try_into();
                match geo_geom {
                    Ok(g) => Some(g),
                    Err(e) => {
                        warn!("Error deserializing geometry: {}", e);
                        None
                    }
                }
            }
            _ => None,
        })
    })
}

fn deserialize_as_multipolygon<'de, D>(d: D) -> Result<MultiPolygon<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match deserialize_geom(d)? {
        Some(Geometry::MultiPolygon(geo_multi_polygon)) => Ok(geo_multi_polygon),
        // a zone drawn on the map is often stored as a plain polygon
        Some(Geometry::Polygon(p)) => Ok(MultiPolygon(vec![p])),
        None => Err(serde::de::Error::custom("a zone must have a geometry")),
        Some(_) => Err(serde::de::Error::custom(
            "invalid geometry type, should be a polygon or a multipolygon",
        )),
    }
}

fn deserialize_as_coord<'de, D>(d: D) -> Result<Coord, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match deserialize_geom(d)? {
        Some(Geometry::Point(p)) => Ok(p),
        None => Err(serde::de::Error::custom("a zone must have a center")),
        Some(_) => Err(serde::de::Error::custom(
            "invalid geometry type, should be a point",
        )),
    }
}

fn serialize_bbox_as_geojson<S>(bbox: &Option<Rect<f64>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use geojson::Bbox as GeojsonBbox;
    match bbox {
        Some(b) => {
            // RFC 7946 bounding box: [min_lon, min_lat, max_lon, max_lat]
            let geojson_bbox: GeojsonBbox = vec![b.min().x, b.min().y, b.max().x, b.max().y];
            geojson_bbox.serialize(serializer)
        }
        None => serializer.serialize_none(),
    }
}

fn deserialize_as_rect<'de, D>(d: D) -> Result<Option<Rect<f64>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;
    match Option::<Vec<f64>>::deserialize(d)? {
        Some(b) if b.len() == 4 => Ok(Some(Rect::new(
            Coordinate { x: b[0], y: b[1] },
            Coordinate { x: b[2], y: b[3] },
        ))),
        Some(b) => Err(serde::de::Error::invalid_length(
            b.len(),
            &"a bbox with 4 values",
        )),
        None => Ok(None),
    }
}

impl Serialize for ZoneId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.index)
    }
}

impl<'de> serde::Deserialize<'de> for ZoneId {
    fn deserialize<D>(deserializer: D) -> Result<ZoneId, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_u64(ZoneIdVisitor)
    }
}

struct ZoneIdVisitor;

impl<'de> serde::de::Visitor<'de> for ZoneIdVisitor {
    type Value = ZoneId;

    fn visit_u64<E>(self, data: u64) -> Result<ZoneId, E>
    where
        E: serde::de::Error,
    {
        Ok(ZoneId { index: data })
    }

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a non negative zone id")
    }
}
