use crate::boundary::MunicipalBoundary;
use crate::geometry::CanonicalRing;
use crate::GeoreferenceError;
use failure::Error;
use failure_derive::Fail;
use geo::algorithm::bounding_rect::BoundingRect;
use geo_types::{MultiPolygon, Polygon, Rect};
use georef_model::{Coord, Zone, ZoneId};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Fail, Clone, PartialEq)]
pub enum StoreError {
    #[fail(display = "the polygon is already stored as zone {}", existing)]
    UniqueViolation { existing: ZoneId },
    #[fail(display = "{}", _0)]
    Unavailable(String),
}

/// A zone about to be stored, the store gives it its id
#[derive(Debug, Clone)]
pub struct NewZone {
    pub name: Option<String>,
    pub boundary: MultiPolygon<f64>,
    pub center: Coord,
    pub bbox: Option<Rect<f64>>,
}

impl NewZone {
    fn with_id(self, id: ZoneId) -> Zone {
        Zone {
            id,
            name: self.name,
            boundary: self.boundary,
            center: self.center,
            bbox: self.bbox,
        }
    }
}

/// Durable storage of the drawn zones.
///
/// The store must keep the canonical polygon key unique: `insert` checks the key and
/// stores the zone atomically, and reports an already used key as
/// `StoreError::UniqueViolation`. This is what prevents two concurrent requests from
/// creating the same zone twice.
pub trait ZoneStore: Send + Sync {
    fn get(&self, id: ZoneId) -> Result<Option<Zone>, StoreError>;

    fn find_by_key(&self, key: &str) -> Result<Option<Zone>, StoreError>;

    fn insert(&self, key: String, zone: NewZone) -> Result<Zone, StoreError>;

    /// all the stored zones, sorted by id
    fn zones(&self) -> Result<Vec<Zone>, StoreError>;
}

#[derive(Default)]
struct Tables {
    zones: BTreeMap<ZoneId, Zone>,
    by_key: HashMap<String, ZoneId>,
}

/// In memory `ZoneStore`, with a unique index on the canonical polygon key
#[derive(Default)]
pub struct MemoryZoneStore {
    tables: RwLock<Tables>,
}

impl MemoryZoneStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from persisted zones.
    ///
    /// The key, center and bbox of each zone are derived again from its polygon.
    /// The zone `0`, zones made of several polygons, duplicated polygons and zones
    /// not inside `boundary` are refused.
    pub fn from_zones(
        zones: impl IntoIterator<Item = Zone>,
        boundary: &MunicipalBoundary,
    ) -> Result<Self, Error> {
        let mut tables = Tables::default();
        for zone in zones {
            if zone.is_whole_municipality() {
                return Err(failure::err_msg(
                    "the zone 0 is the whole municipality, it cannot be stored",
                ));
            }
            let polygon = zone.polygon().ok_or_else(|| {
                failure::err_msg(format!("zone {} must be a single polygon", zone.id))
            })?;
            let ring = CanonicalRing::from_polygon(polygon)?;
            let key = ring.key();
            if boundary.canonical_key() == Some(key.as_str()) {
                return Err(failure::err_msg(format!(
                    "zone {} is the whole municipality",
                    zone.id
                )));
            }
            if !boundary.covers_polygon(polygon) {
                return Err(failure::err_msg(format!(
                    "zone {} is not inside {}",
                    zone.id,
                    boundary.name()
                )));
            }
            if let Some(existing) = tables.by_key.get(&key) {
                return Err(failure::err_msg(format!(
                    "zones {} and {} have the same polygon",
                    existing, zone.id
                )));
            }
            if tables.zones.contains_key(&zone.id) {
                return Err(failure::err_msg(format!("zone {} is defined twice", zone.id)));
            }
            let id = zone.id;
            let new_zone = new_zone(zone.name, &ring);
            tables.by_key.insert(key, id);
            tables.zones.insert(id, new_zone.with_id(id));
        }
        Ok(MemoryZoneStore {
            tables: RwLock::new(tables),
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Unavailable("the zone tables are poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Unavailable("the zone tables are poisoned".into()))
    }
}

impl ZoneStore for MemoryZoneStore {
    fn get(&self, id: ZoneId) -> Result<Option<Zone>, StoreError> {
        Ok(self.read()?.zones.get(&id).cloned())
    }

    fn find_by_key(&self, key: &str) -> Result<Option<Zone>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .by_key
            .get(key)
            .and_then(|id| tables.zones.get(id))
            .cloned())
    }

    fn insert(&self, key: String, zone: NewZone) -> Result<Zone, StoreError> {
        let mut tables = self.write()?;
        if let Some(existing) = tables.by_key.get(&key) {
            return Err(StoreError::UniqueViolation {
                existing: *existing,
            });
        }
        // ids start at 1, 0 is the whole municipality
        let id = ZoneId::new(
            tables
                .zones
                .keys()
                .next_back()
                .map_or(1, |last| last.index + 1),
        );
        let zone = zone.with_id(id);
        tables.by_key.insert(key, id);
        tables.zones.insert(id, zone.clone());
        Ok(zone)
    }

    fn zones(&self) -> Result<Vec<Zone>, StoreError> {
        Ok(self.read()?.zones.values().cloned().collect())
    }
}

fn new_zone(name: Option<String>, ring: &CanonicalRing) -> NewZone {
    let boundary = MultiPolygon(vec![ring.to_polygon()]);
    NewZone {
        name,
        center: ring.centroid(),
        bbox: boundary.bounding_rect(),
        boundary,
    }
}

/// The reusable zones documents can be attached to.
///
/// The catalog only deduplicates and stores zones, checking that a zone is inside the
/// municipality is the job of its caller.
pub struct ZoneCatalog<S> {
    store: S,
    boundary: Arc<MunicipalBoundary>,
}

impl<S: ZoneStore> ZoneCatalog<S> {
    pub fn new(store: S, boundary: Arc<MunicipalBoundary>) -> Self {
        ZoneCatalog { store, boundary }
    }

    pub fn boundary(&self) -> &MunicipalBoundary {
        &self.boundary
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn get_zone(&self, id: ZoneId) -> Result<Zone, GeoreferenceError> {
        if id.is_whole_municipality() {
            return Ok(self.boundary.as_zone());
        }
        self.store
            .get(id)?
            .ok_or(GeoreferenceError::ZoneNotFound(id))
    }

    /// Find a zone with the same polygon, whatever the starting vertex or the
    /// orientation of the ring. The whole municipality is one of the candidates.
    pub fn find_by_coordinates(
        &self,
        polygon: &Polygon<f64>,
    ) -> Result<Option<Zone>, GeoreferenceError> {
        let key = CanonicalRing::from_polygon(polygon)?.key();
        if self.boundary.canonical_key() == Some(key.as_str()) {
            return Ok(Some(self.boundary.as_zone()));
        }
        Ok(self.store.find_by_key(&key)?)
    }

    /// Store a new zone. `find_by_coordinates` must have been checked before, a
    /// polygon stored in the meantime is reported as `DuplicateZone`.
    pub fn insert_zone(&self, polygon: &Polygon<f64>) -> Result<Zone, GeoreferenceError> {
        let ring = CanonicalRing::from_polygon(polygon)?;
        let zone = self.store.insert(ring.key(), new_zone(None, &ring))?;
        info!("zone {} created, center {:?}", zone.id, zone.center);
        Ok(zone)
    }

    /// All the zones, starting with the whole municipality
    pub fn zones(&self) -> Result<Vec<Zone>, GeoreferenceError> {
        let mut zones = vec![self.boundary.as_zone()];
        zones.extend(self.store.zones()?);
        Ok(zones)
    }
}
