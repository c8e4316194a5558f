// Planar predicates on [longitude, latitude] polygons.
// Boundaries are always inclusive: a point on an edge is inside.

use failure_derive::Fail;
use geo::algorithm::area::Area;
use geo::algorithm::centroid::Centroid;
use geo::algorithm::contains::Contains;
use geo::algorithm::winding_order::Winding;
use geo_types::{Coordinate, Line, LineString, MultiPolygon, Point, Polygon};
use georef_model::Coord;
use itertools::Itertools;
use std::cmp::Ordering;

const EPSILON: f64 = 1e-12;

#[derive(Debug, Fail, Clone, PartialEq)]
pub enum GeometryError {
    #[fail(display = "malformed polygon: {}", _0)]
    MalformedPolygon(String),
}

/// A ring in canonical form.
///
/// The ring has no closing vertex and no consecutive duplicates, it starts at its
/// smallest vertex and is walked in the direction giving the smallest vertex sequence.
/// Two descriptions of the same ring, whatever their starting vertex or their
/// orientation, have the same canonical form.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRing(Vec<Coordinate<f64>>);

impl CanonicalRing {
    pub fn new(coords: &[Coordinate<f64>]) -> Result<Self, GeometryError> {
        if let Some(c) = coords.iter().find(|c| !c.x.is_finite() || !c.y.is_finite()) {
            return Err(GeometryError::MalformedPolygon(format!(
                "non finite coordinate ({}, {})",
                c.x, c.y
            )));
        }
        let mut ring: Vec<Coordinate<f64>> = coords
            .iter()
            .map(|c| Coordinate {
                x: positive_zero(c.x),
                y: positive_zero(c.y),
            })
            .dedup()
            .collect();
        while ring.len() > 1 && ring.first() == ring.last() {
            ring.pop();
        }

        let nb_distinct = {
            let mut sorted = ring.clone();
            sorted.sort_by(cmp_coord);
            sorted.dedup();
            sorted.len()
        };
        if nb_distinct < 3 {
            return Err(GeometryError::MalformedPolygon(format!(
                "a ring needs at least 3 distinct vertices, got {}",
                nb_distinct
            )));
        }

        let forward = smallest_rotation(&ring);
        ring.reverse();
        let backward = smallest_rotation(&ring);
        Ok(match cmp_sequence(&forward, &backward) {
            Ordering::Greater => CanonicalRing(backward),
            _ => CanonicalRing(forward),
        })
    }

    pub fn from_polygon(polygon: &Polygon<f64>) -> Result<Self, GeometryError> {
        Self::new(&polygon.exterior().0)
    }

    pub fn vertices(&self) -> &[Coordinate<f64>] {
        &self.0
    }

    /// the textual key used to detect identical zones
    pub fn key(&self) -> String {
        self.0.iter().map(|c| format!("{} {}", c.x, c.y)).join(",")
    }

    pub fn to_polygon(&self) -> Polygon<f64> {
        Polygon::new(LineString(self.0.clone()), vec![])
    }

    /// The point displayed for the ring.
    ///
    /// The area weighted centroid when it lies in the ring, an inside point of the ring
    /// otherwise (see `interior_point`). It is computed on the canonical ring so the
    /// result does not depend on how the ring was drawn. A zero area ring falls back
    /// to the mean of its vertices.
    pub fn centroid(&self) -> Coord {
        let polygon = self.to_polygon();
        if polygon.exterior().winding_order().is_none() {
            return self.vertex_average();
        }
        interior_point(&polygon).unwrap_or_else(|| self.vertex_average())
    }

    fn vertex_average(&self) -> Coord {
        let (x, y) = self
            .0
            .iter()
            .fold((0., 0.), |(x, y), c| (x + c.x, y + c.y));
        let n = self.0.len() as f64;
        Coord::new(x / n, y / n)
    }
}

fn positive_zero(v: f64) -> f64 {
    // -0.0 and 0.0 must produce the same key
    if v == 0. {
        0.
    } else {
        v
    }
}

fn cmp_coord(a: &Coordinate<f64>, b: &Coordinate<f64>) -> Ordering {
    a.x.partial_cmp(&b.x)
        .unwrap_or(Ordering::Equal)
        .then(a.y.partial_cmp(&b.y).unwrap_or(Ordering::Equal))
}

fn cmp_sequence(a: &[Coordinate<f64>], b: &[Coordinate<f64>]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| cmp_coord(x, y))
        .find(|o| *o != Ordering::Equal)
        .unwrap_or_else(|| a.len().cmp(&b.len()))
}

fn smallest_rotation(ring: &[Coordinate<f64>]) -> Vec<Coordinate<f64>> {
    let smallest = match ring.iter().min_by(|a, b| cmp_coord(a, b)) {
        Some(s) => *s,
        None => return vec![],
    };
    // a vertex can be visited several times, each visit is a candidate start
    (0..ring.len())
        .filter(|&i| ring[i] == smallest)
        .map(|start| {
            ring[start..]
                .iter()
                .chain(&ring[..start])
                .cloned()
                .collect::<Vec<_>>()
        })
        .min_by(|a, b| cmp_sequence(a, b))
        .unwrap_or_default()
}

/// Order and direction insensitive key of a polygon's exterior ring
pub fn canonicalize(polygon: &Polygon<f64>) -> Result<String, GeometryError> {
    CanonicalRing::from_polygon(polygon).map(|r| r.key())
}

/// Point displayed for a polygon's exterior ring, see `CanonicalRing::centroid`
pub fn centroid(polygon: &Polygon<f64>) -> Result<Coord, GeometryError> {
    CanonicalRing::from_polygon(polygon).map(|r| r.centroid())
}

/// A point of the polygon, holes excluded.
///
/// The centroid of a concave polygon can be outside of it. In this case the point is
/// the middle of the widest inside span of the horizontal line through the centroid.
pub fn interior_point(polygon: &Polygon<f64>) -> Option<Coord> {
    let c = polygon.centroid()?;
    if point_in_polygon(&c, polygon) {
        return Some(c);
    }
    let y = c.y();
    let mut crossings: Vec<f64> = std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .flat_map(|r| r.lines())
        .filter(|l| (l.start.y > y) != (l.end.y > y))
        .map(|l| l.start.x + (y - l.start.y) * (l.end.x - l.start.x) / (l.end.y - l.start.y))
        .collect();
    crossings.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    crossings
        .chunks(2)
        .filter_map(|span| match *span {
            [x0, x1] => Some((x0, x1)),
            _ => None,
        })
        .fold(None, |widest: Option<(f64, f64)>, (x0, x1)| match widest {
            Some((w0, w1)) if w1 - w0 >= x1 - x0 => Some((w0, w1)),
            _ => Some((x0, x1)),
        })
        .map(|(x0, x1)| Coord::new((x0 + x1) / 2., y))
}

/// Point displayed for a multipolygon: its centroid when covered, otherwise an
/// inside point of its largest polygon
pub fn representative_point(multi_polygon: &MultiPolygon<f64>) -> Option<Coord> {
    match multi_polygon.centroid() {
        Some(c) if point_in_multipolygon(&c, multi_polygon) => Some(c),
        _ => multi_polygon
            .0
            .iter()
            .filter(|p| p.exterior().winding_order().is_some())
            .fold(None, |largest: Option<&Polygon<f64>>, p| match largest {
                Some(l) if l.signed_area().abs() >= p.signed_area().abs() => Some(l),
                _ => Some(p),
            })
            .and_then(interior_point),
    }
}

fn sub(a: Coordinate<f64>, b: Coordinate<f64>) -> Coordinate<f64> {
    Coordinate {
        x: a.x - b.x,
        y: a.y - b.y,
    }
}

fn cross(a: Coordinate<f64>, b: Coordinate<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

fn dot(a: Coordinate<f64>, b: Coordinate<f64>) -> f64 {
    a.x * b.x + a.y * b.y
}

fn on_segment(p: Coordinate<f64>, line: &Line<f64>) -> bool {
    let (a, b) = (line.start, line.end);
    cross(sub(b, a), sub(p, a)).abs() <= EPSILON
        && p.x >= a.x.min(b.x) - EPSILON
        && p.x <= a.x.max(b.x) + EPSILON
        && p.y >= a.y.min(b.y) - EPSILON
        && p.y <= a.y.max(b.y) + EPSILON
}

fn on_ring(p: Coordinate<f64>, ring: &LineString<f64>) -> bool {
    ring.lines().any(|l| on_segment(p, &l))
}

pub fn point_in_polygon(point: &Coord, polygon: &Polygon<f64>) -> bool {
    let c = point.0;
    if !c.x.is_finite() || !c.y.is_finite() {
        return false;
    }
    if on_ring(c, polygon.exterior()) || polygon.interiors().iter().any(|r| on_ring(c, r)) {
        return true;
    }
    polygon.contains(point)
}

pub fn point_in_multipolygon(point: &Coord, multi_polygon: &MultiPolygon<f64>) -> bool {
    multi_polygon.0.iter().any(|p| point_in_polygon(point, p))
}

/// positions (as a fraction of the segment p -> p2) where the segment meets q -> q2
fn intersection_params(p: Coordinate<f64>, p2: Coordinate<f64>, other: &Line<f64>) -> Vec<f64> {
    let (q, q2) = (other.start, other.end);
    let r = sub(p2, p);
    let s = sub(q2, q);
    let qp = sub(q, p);
    let denom = cross(r, s);
    let in_unit = |t: f64| t >= -EPSILON && t <= 1. + EPSILON;

    if denom.abs() > EPSILON {
        let t = cross(qp, s) / denom;
        let u = cross(qp, r) / denom;
        if in_unit(t) && in_unit(u) {
            vec![t.max(0.).min(1.)]
        } else {
            vec![]
        }
    } else if cross(qp, r).abs() <= EPSILON && dot(r, r) > 0. {
        // collinear segments, the overlap ends are the cuts
        let rr = dot(r, r);
        vec![dot(qp, r) / rr, dot(sub(q2, p), r) / rr]
            .into_iter()
            .filter(|t| in_unit(*t))
            .map(|t| t.max(0.).min(1.))
            .collect()
    } else {
        vec![]
    }
}

fn edge_inside(edge: &Line<f64>, outer_edges: &[Line<f64>], outer: &MultiPolygon<f64>) -> bool {
    let mut cuts = vec![0., 1.];
    for o in outer_edges {
        cuts.extend(intersection_params(edge.start, edge.end, o));
    }
    cuts.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    cuts.dedup_by(|a, b| (*a - *b).abs() < EPSILON);

    // between two cuts the edge is either fully inside or fully outside,
    // a sample in the middle of each piece is enough
    let (a, b) = (edge.start, edge.end);
    cuts.iter().tuple_windows().all(|(t0, t1)| {
        let t = (t0 + t1) / 2.;
        let sample = Coord::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t);
        point_in_multipolygon(&sample, outer)
    })
}

/// Check that `inner` lies entirely in `outer`, boundaries included.
///
/// Checking the vertices is not enough, an edge can leave `outer` between two
/// vertices that are inside. Zero area rings are never contained.
pub fn polygon_contained(inner: &Polygon<f64>, outer: &MultiPolygon<f64>) -> bool {
    let inner = match CanonicalRing::from_polygon(inner) {
        Ok(r) => r.to_polygon(),
        Err(e) => {
            debug!("containment check on an invalid polygon: {}", e);
            return false;
        }
    };
    if inner.exterior().winding_order().is_none() {
        debug!("containment check on a zero area polygon");
        return false;
    }

    let vertices = &inner.exterior().0;
    if !vertices
        .iter()
        .all(|c| point_in_multipolygon(&Point(*c), outer))
    {
        return false;
    }

    let outer_edges: Vec<Line<f64>> = outer
        .0
        .iter()
        .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors()))
        .flat_map(|r| r.lines())
        .collect();
    if !inner
        .exterior()
        .lines()
        .all(|e| edge_inside(&e, &outer_edges, outer))
    {
        return false;
    }

    // no hole of the outer polygon can be inside the inner polygon
    let swallows_hole = outer
        .0
        .iter()
        .flat_map(|p| p.interiors())
        .any(|hole| hole.0.iter().any(|c| inner.contains(&Point(*c))));
    !swallows_hole
}
