use crate::zone::Zone;
use serde_derive::*;
use std::fmt;

/// A persisted zone catalog, the zone `0` is never part of it
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ZoneCatalogFile {
    pub zones: Vec<Zone>,
    #[serde(default)]
    pub meta: CatalogMetadata,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct CatalogMetadata {
    pub municipality: String,
    #[serde(default)]
    pub stats: CatalogStats,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct CatalogStats {
    pub zone_count: usize,
    pub vertex_count: usize,
    pub multipolygon_count: usize,
}

impl CatalogStats {
    pub fn process(&mut self, zone: &Zone) {
        self.zone_count += 1;
        self.vertex_count += zone
            .boundary
            .0
            .iter()
            .map(|p| p.exterior().0.len().saturating_sub(1))
            .sum::<usize>();
        if zone.boundary.0.len() > 1 {
            self.multipolygon_count += 1;
        }
    }
}

impl<'a> std::iter::FromIterator<&'a Zone> for CatalogStats {
    fn from_iter<I: IntoIterator<Item = &'a Zone>>(zones: I) -> Self {
        let mut stats = CatalogStats::default();
        for z in zones {
            stats.process(z);
        }
        stats
    }
}

impl fmt::Display for CatalogStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} zones", self.zone_count)?;
        writeln!(f, "    {} vertices", self.vertex_count)?;
        if self.multipolygon_count > 0 {
            writeln!(f, "    {} made of several polygons", self.multipolygon_count)?;
        }
        Ok(())
    }
}
