use crate::geometry::GeometryError;
use crate::zone_catalog::StoreError;
use failure_derive::Fail;
use georef_model::{InconsistentGeoreference, ZoneId};

/// Why a location was refused.
///
/// The caller maps each kind to its own transport status, none of them is transient.
#[derive(Debug, Fail, Clone, PartialEq)]
pub enum GeoreferenceError {
    #[fail(display = "exactly one of zoneID, coordinates or latitude/longitude must be given")]
    InconsistentGeoreference,
    #[fail(display = "zone {} does not exist", _0)]
    ZoneNotFound(ZoneId),
    #[fail(display = "the location is outside of the municipality")]
    OutOfBounds,
    #[fail(display = "an identical zone already exists: zone {}", _0)]
    DuplicateZone(ZoneId),
    #[fail(display = "malformed polygon: {}", _0)]
    MalformedPolygon(String),
    #[fail(display = "zone storage failure: {}", _0)]
    Storage(String),
}

impl GeoreferenceError {
    pub fn kind(&self) -> &'static str {
        match *self {
            GeoreferenceError::InconsistentGeoreference => "inconsistent_georeference",
            GeoreferenceError::ZoneNotFound(_) => "zone_not_found",
            GeoreferenceError::OutOfBounds => "out_of_bounds",
            GeoreferenceError::DuplicateZone(_) => "duplicate_zone",
            GeoreferenceError::MalformedPolygon(_) => "malformed_polygon",
            GeoreferenceError::Storage(_) => "storage",
        }
    }
}

impl From<InconsistentGeoreference> for GeoreferenceError {
    fn from(_: InconsistentGeoreference) -> Self {
        GeoreferenceError::InconsistentGeoreference
    }
}

impl From<GeometryError> for GeoreferenceError {
    fn from(e: GeometryError) -> Self {
        match e {
            GeometryError::MalformedPolygon(reason) => GeoreferenceError::MalformedPolygon(reason),
        }
    }
}

impl From<StoreError> for GeoreferenceError {
    fn from(e: StoreError) -> Self {
        match e {
            // two identical zones inserted concurrently, the store kept the first one
            StoreError::UniqueViolation { existing } => GeoreferenceError::DuplicateZone(existing),
            StoreError::Unavailable(reason) => GeoreferenceError::Storage(reason),
        }
    }
}
