use crate::zone::{Coord, ZoneId};
use failure_derive::Fail;
use geo_types::Coordinate;
use serde_derive::*;
use std::convert::TryFrom;

/// The location payload of a document creation or update, as sent by the client.
///
/// Exactly one location mode must be filled:
/// * `zoneID` (`0` being the whole municipality),
/// * `coordinates`, a ring of `[longitude, latitude]` pairs,
/// * `latitude` and `longitude`, a single point.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct GeoreferenceRequest {
    #[serde(rename = "zoneID", default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<ZoneId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Vec<[f64; 2]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

#[derive(Debug, Fail, Clone, Copy, PartialEq)]
#[fail(display = "exactly one of zoneID, coordinates or latitude/longitude must be given")]
pub struct InconsistentGeoreference;

/// A location request with exactly one location mode
#[derive(Debug, Clone, PartialEq)]
pub enum GeoreferenceInput {
    WholeMunicipality,
    Zone(ZoneId),
    /// a custom area, the ring does not need to be closed
    Area(Vec<Coordinate<f64>>),
    Point(Coord),
}

impl GeoreferenceInput {
    pub fn zone(id: ZoneId) -> Self {
        if id.is_whole_municipality() {
            GeoreferenceInput::WholeMunicipality
        } else {
            GeoreferenceInput::Zone(id)
        }
    }

    pub fn area(coordinates: &[[f64; 2]]) -> Self {
        GeoreferenceInput::Area(
            coordinates
                .iter()
                .map(|&[x, y]| Coordinate { x, y })
                .collect(),
        )
    }

    pub fn point(latitude: f64, longitude: f64) -> Self {
        GeoreferenceInput::Point(Coord::new(longitude, latitude))
    }

    pub fn mode(&self) -> &'static str {
        match self {
            GeoreferenceInput::WholeMunicipality => "whole_municipality",
            GeoreferenceInput::Zone(_) => "zone",
            GeoreferenceInput::Area(_) => "area",
            GeoreferenceInput::Point(_) => "point",
        }
    }
}

impl TryFrom<GeoreferenceRequest> for GeoreferenceInput {
    type Error = InconsistentGeoreference;

    fn try_from(request: GeoreferenceRequest) -> Result<Self, Self::Error> {
        match request {
            GeoreferenceRequest {
                zone_id: Some(id),
                coordinates: None,
                latitude: None,
                longitude: None,
            } => Ok(GeoreferenceInput::zone(id)),
            GeoreferenceRequest {
                zone_id: None,
                coordinates: Some(coordinates),
                latitude: None,
                longitude: None,
            } => Ok(GeoreferenceInput::area(&coordinates)),
            GeoreferenceRequest {
                zone_id: None,
                coordinates: None,
                latitude: Some(latitude),
                longitude: Some(longitude),
            } => Ok(GeoreferenceInput::point(latitude, longitude)),
            _ => Err(InconsistentGeoreference),
        }
    }
}

impl From<GeoreferenceInput> for GeoreferenceRequest {
    fn from(input: GeoreferenceInput) -> Self {
        match input {
            GeoreferenceInput::WholeMunicipality => GeoreferenceRequest {
                zone_id: Some(ZoneId::WHOLE_MUNICIPALITY),
                ..Default::default()
            },
            GeoreferenceInput::Zone(id) => GeoreferenceRequest {
                zone_id: Some(id),
                ..Default::default()
            },
            GeoreferenceInput::Area(ring) => GeoreferenceRequest {
                coordinates: Some(ring.iter().map(|c| [c.x, c.y]).collect()),
                ..Default::default()
            },
            GeoreferenceInput::Point(p) => GeoreferenceRequest {
                latitude: Some(p.y()),
                longitude: Some(p.x()),
                ..Default::default()
            },
        }
    }
}

/// The validated location attached to a document.
///
/// When `zone_id` is set, the point is the centroid of the zone, never a value
/// given by the client. Otherwise it is the point given by the client.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct GeoreferenceResult {
    #[serde(rename = "zoneID")]
    pub zone_id: Option<ZoneId>,
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoreferenceResult {
    pub fn in_zone(zone_id: ZoneId, center: Coord) -> Self {
        GeoreferenceResult {
            zone_id: Some(zone_id),
            latitude: center.y(),
            longitude: center.x(),
        }
    }

    pub fn at_point(point: Coord) -> Self {
        GeoreferenceResult {
            zone_id: None,
            latitude: point.y(),
            longitude: point.x(),
        }
    }

    pub fn point(&self) -> Coord {
        Coord::new(self.longitude, self.latitude)
    }
}
