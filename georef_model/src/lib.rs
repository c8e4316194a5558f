pub mod file_format;
mod georeference;
mod model;
mod read;
mod zone;

pub use georeference::{
    GeoreferenceInput, GeoreferenceRequest, GeoreferenceResult, InconsistentGeoreference,
};
pub use model::{CatalogMetadata, CatalogStats, ZoneCatalogFile};
pub use read::{load_catalog, load_catalog_from_file, read_zones_from_file};
pub use zone::{Coord, Zone, ZoneId};
