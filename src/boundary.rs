use crate::geometry::{self, CanonicalRing, GeometryError};
use failure::{Error, ResultExt};
use geo::algorithm::bounding_rect::BoundingRect;
use geo_types::{Geometry, MultiPolygon, Polygon, Rect};
use geojson::GeoJson;
use georef_model::{Coord, Zone, ZoneId};
use std::convert::TryInto;
use std::path::Path;

/// The outer boundary of the municipality.
///
/// Loaded once at startup and never modified, every location is validated against it.
/// It is given to the catalog and the resolver at construction so tests can use a
/// synthetic boundary.
#[derive(Debug, Clone)]
pub struct MunicipalBoundary {
    name: String,
    geometry: MultiPolygon<f64>,
    center: Coord,
    bbox: Rect<f64>,
    key: Option<String>,
}

impl MunicipalBoundary {
    pub fn new(name: impl Into<String>, geometry: MultiPolygon<f64>) -> Result<Self, GeometryError> {
        let rings = geometry
            .0
            .iter()
            .map(CanonicalRing::from_polygon)
            .collect::<Result<Vec<_>, _>>()?;

        if rings.is_empty() {
            return Err(GeometryError::MalformedPolygon(
                "the municipal boundary has no polygon".into(),
            ));
        }
        let center = geometry::representative_point(&geometry).ok_or_else(|| {
            GeometryError::MalformedPolygon("the municipal boundary has no area".into())
        })?;

        let bbox = geometry.bounding_rect().ok_or_else(|| {
            GeometryError::MalformedPolygon("the municipal boundary is empty".into())
        })?;

        // only a simple polygon can be redrawn by a planner, and thus be a duplicate
        let key = match (rings.as_slice(), geometry.0.as_slice()) {
            ([ring], [p]) if p.interiors().is_empty() => Some(ring.key()),
            _ => None,
        };

        Ok(MunicipalBoundary {
            name: name.into(),
            geometry,
            center,
            bbox,
            key,
        })
    }

    /// Read the boundary from a GeoJSON document.
    ///
    /// The document can be a geometry, a feature or a feature collection, all the
    /// polygons it holds are merged. The `name` property of the first feature
    /// having one names the municipality.
    pub fn from_geojson(geojson: &str) -> Result<Self, Error> {
        let geojson = geojson
            .parse::<GeoJson>()
            .map_err(|e| failure::err_msg(e.to_string()))?;

        let mut name = None;
        let mut geometries = vec![];
        let features = match geojson {
            GeoJson::Geometry(g) => {
                geometries.push(g);
                vec![]
            }
            GeoJson::Feature(f) => vec![f],
            GeoJson::FeatureCollection(fc) => fc.features,
        };
        for f in features {
            if name.is_none() {
                name = f
                    .properties
                    .as_ref()
                    .and_then(|p| p.get("name"))
                    .and_then(|n| n.as_str())
                    .map(|n| n.to_string());
            }
            geometries.extend(f.geometry);
        }

        let mut polygons: Vec<Polygon<f64>> = vec![];
        for g in geometries {
            let geom: Result<Geometry<f64>, _> = g.value.try_into();
            match geom.map_err(|e| failure::err_msg(e.to_string()))? {
                Geometry::Polygon(p) => polygons.push(p),
                Geometry::MultiPolygon(mp) => polygons.extend(mp.0),
                _ => warn!("the municipal boundary has a non polygonal geometry, it is ignored"),
            }
        }

        Ok(Self::new(
            name.unwrap_or_default(),
            MultiPolygon(polygons),
        )?)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    /// a point of the boundary, its centroid when covered, displayed for documents
    /// covering the whole municipality
    pub fn center(&self) -> Coord {
        self.center
    }

    pub fn bbox(&self) -> Rect<f64> {
        self.bbox
    }

    /// canonical key of the boundary, if a planner could draw it as a zone
    pub fn canonical_key(&self) -> Option<&str> {
        self.key.as_ref().map(|k| k.as_str())
    }

    pub fn covers_point(&self, point: &Coord) -> bool {
        let (min, max) = (self.bbox.min(), self.bbox.max());
        let in_bbox =
            point.x() >= min.x && point.x() <= max.x && point.y() >= min.y && point.y() <= max.y;
        in_bbox && geometry::point_in_multipolygon(point, &self.geometry)
    }

    pub fn covers_polygon(&self, polygon: &Polygon<f64>) -> bool {
        geometry::polygon_contained(polygon, &self.geometry)
    }

    /// the zone `0`, it is synthesized and never stored
    pub fn as_zone(&self) -> Zone {
        Zone {
            id: ZoneId::WHOLE_MUNICIPALITY,
            name: Some(self.name.clone()).filter(|n| !n.is_empty()),
            boundary: self.geometry.clone(),
            center: self.center,
            bbox: Some(self.bbox),
        }
    }
}

/// Load the municipal boundary from a GeoJSON file
pub fn load_boundary(path: impl AsRef<Path>) -> Result<MunicipalBoundary, Error> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .context(format!("impossible to read the boundary file {}", path.display()))?;
    let mut boundary = MunicipalBoundary::from_geojson(&content)
        .context(format!("invalid municipal boundary in {}", path.display()))?;
    if boundary.name.is_empty() {
        boundary.name = path
            .file_stem()
            .and_then(|f| f.to_str())
            .unwrap_or("municipality")
            .to_string();
    }
    info!(
        "municipal boundary {} loaded: {} polygon(s), center {:?}",
        boundary.name,
        boundary.geometry.0.len(),
        boundary.center
    );
    Ok(boundary)
}
