use crate::zone_catalog::{ZoneCatalog, ZoneStore};
use crate::GeoreferenceError;
use geo_types::{Coordinate, LineString, Polygon};
use georef_model::{GeoreferenceInput, GeoreferenceRequest, GeoreferenceResult, ZoneId};
use std::convert::TryFrom;

/// The outcome of a location update
#[derive(Debug, Clone, PartialEq)]
pub struct GeoreferenceUpdate {
    pub result: GeoreferenceResult,
    /// the drawn zone the document was attached to before the update, if the new
    /// location does not use it anymore. It might now be unused.
    pub released_zone: Option<ZoneId>,
}

/// Turns a location request into a validated location.
///
/// The resolver keeps no state between calls, the only side effect is the creation of
/// a zone when a new area is drawn. It can be shared between request handlers.
pub struct GeoreferenceResolver<S> {
    catalog: ZoneCatalog<S>,
}

impl<S: ZoneStore> GeoreferenceResolver<S> {
    pub fn new(catalog: ZoneCatalog<S>) -> Self {
        GeoreferenceResolver { catalog }
    }

    pub fn catalog(&self) -> &ZoneCatalog<S> {
        &self.catalog
    }

    /// Check that the request has exactly one location mode, then resolve it
    pub fn resolve_request(
        &self,
        request: GeoreferenceRequest,
    ) -> Result<GeoreferenceResult, GeoreferenceError> {
        self.resolve(GeoreferenceInput::try_from(request)?)
    }

    pub fn resolve(&self, input: GeoreferenceInput) -> Result<GeoreferenceResult, GeoreferenceError> {
        debug!("resolving a {} location", input.mode());
        let boundary = self.catalog.boundary();
        match input {
            GeoreferenceInput::WholeMunicipality => Ok(GeoreferenceResult::in_zone(
                ZoneId::WHOLE_MUNICIPALITY,
                boundary.center(),
            )),
            GeoreferenceInput::Zone(id) => {
                let zone = self.catalog.get_zone(id)?;
                Ok(GeoreferenceResult::in_zone(zone.id, zone.center))
            }
            GeoreferenceInput::Area(ring) => self.resolve_area(ring),
            GeoreferenceInput::Point(point) => {
                if boundary.covers_point(&point) {
                    Ok(GeoreferenceResult::at_point(point))
                } else {
                    debug!("point {:?} is outside of {}", point, boundary.name());
                    Err(GeoreferenceError::OutOfBounds)
                }
            }
        }
    }

    fn resolve_area(&self, ring: Vec<Coordinate<f64>>) -> Result<GeoreferenceResult, GeoreferenceError> {
        let polygon = Polygon::new(LineString(ring), vec![]);

        // redrawing the whole municipality is a duplicate of the zone 0 too,
        // the zone 0 can only be chosen explicitly
        if let Some(existing) = self.catalog.find_by_coordinates(&polygon)? {
            debug!("the drawn area is already zone {}", existing.id);
            return Err(GeoreferenceError::DuplicateZone(existing.id));
        }
        if !self.catalog.boundary().covers_polygon(&polygon) {
            return Err(GeoreferenceError::OutOfBounds);
        }
        let zone = self.catalog.insert_zone(&polygon)?;
        Ok(GeoreferenceResult::in_zone(zone.id, zone.center))
    }

    /// Resolve the new location of an already located document.
    ///
    /// The resolution is the same as for a new document, `previous` is only used to
    /// tell which drawn zone the document leaves.
    pub fn resolve_update(
        &self,
        previous: Option<&GeoreferenceResult>,
        input: GeoreferenceInput,
    ) -> Result<GeoreferenceUpdate, GeoreferenceError> {
        let result = self.resolve(input)?;
        let released_zone = previous
            .and_then(|p| p.zone_id)
            .filter(|id| !id.is_whole_municipality() && Some(*id) != result.zone_id);
        Ok(GeoreferenceUpdate {
            result,
            released_zone,
        })
    }
}
