#[macro_use]
extern crate log;
#[cfg(test)]
#[macro_use]
extern crate approx;

pub mod boundary;
pub mod document;
mod error;
pub mod geometry;
pub mod resolver;
pub mod zone_catalog;

pub use crate::boundary::{load_boundary, MunicipalBoundary};
pub use crate::error::GeoreferenceError;
pub use crate::resolver::{GeoreferenceResolver, GeoreferenceUpdate};
pub use crate::zone_catalog::{MemoryZoneStore, NewZone, StoreError, ZoneCatalog, ZoneStore};
pub use georef_model::{
    file_format, CatalogMetadata, CatalogStats, Coord, GeoreferenceInput, GeoreferenceRequest,
    GeoreferenceResult, Zone, ZoneCatalogFile, ZoneId,
};

use failure::{Error, ResultExt};
use std::path::Path;
use std::sync::Arc;

/// Load the zones persisted in a catalog file, they must all be inside `boundary`
pub fn load_zone_store(
    zones_path: impl AsRef<Path>,
    boundary: &MunicipalBoundary,
) -> Result<MemoryZoneStore, Error> {
    let zones_path = zones_path.as_ref();
    info!("reading the zone catalog {}", zones_path.display());
    let zones = georef_model::read_zones_from_file(zones_path)
        .context(format!("impossible to read the zones of {}", zones_path.display()))?
        .collect::<Result<Vec<_>, _>>()
        .context(format!("invalid zone in {}", zones_path.display()))?;
    info!("{} zones read", zones.len());
    Ok(MemoryZoneStore::from_zones(zones, boundary)
        .context(format!("inconsistent zone catalog {}", zones_path.display()))?)
}

/// Build a resolver from a municipal boundary file and an optional zone catalog file.
///
/// A catalog file that does not exist yet is an empty catalog.
pub fn build_resolver(
    boundary_path: impl AsRef<Path>,
    zones_path: Option<&Path>,
) -> Result<GeoreferenceResolver<MemoryZoneStore>, Error> {
    let boundary = load_boundary(boundary_path)?;
    let store = match zones_path {
        Some(path) if path.exists() => load_zone_store(path, &boundary)?,
        Some(path) => {
            info!("no zone catalog at {}, starting empty", path.display());
            MemoryZoneStore::new()
        }
        None => MemoryZoneStore::new(),
    };
    Ok(GeoreferenceResolver::new(ZoneCatalog::new(
        store,
        Arc::new(boundary),
    )))
}

/// The drawn zones of a catalog, ready to be persisted
pub fn catalog_file<S: ZoneStore>(catalog: &ZoneCatalog<S>) -> Result<ZoneCatalogFile, Error> {
    let zones = catalog.store().zones()?;
    Ok(ZoneCatalogFile {
        meta: CatalogMetadata {
            municipality: catalog.boundary().name().to_string(),
            stats: zones.iter().collect(),
        },
        zones,
    })
}
