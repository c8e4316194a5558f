#[macro_use]
extern crate approx;
use geo_types::{LineString, Polygon};
use georef::geometry::{canonicalize, centroid, point_in_polygon, polygon_contained};
use georef::{
    build_resolver, catalog_file, load_boundary, GeoreferenceError, GeoreferenceInput,
    GeoreferenceRequest, GeoreferenceResolver, MemoryZoneStore, ZoneCatalog, ZoneId, ZoneStore,
};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::{Arc, Barrier};

const BOUNDARY: &str = "./tests/data/kiruna_boundary.geojson";

const A: [f64; 2] = [20.0, 67.8];
const B: [f64; 2] = [20.4, 67.8];
const C: [f64; 2] = [20.2, 68.0];

fn boundary_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(BOUNDARY)
}

fn resolver() -> GeoreferenceResolver<MemoryZoneStore> {
    build_resolver(boundary_path(), None).unwrap()
}

fn out_file(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("georef_test_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}

fn launch_command_line(args: Vec<&str>) -> Output {
    Command::new(env!("CARGO_BIN_EXE_georef"))
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .args(&args)
        .output()
        .expect("command failed")
}

fn triangle() -> Polygon<f64> {
    let ring: LineString<f64> = vec![(A[0], A[1]), (B[0], B[1]), (C[0], C[1])].into();
    Polygon::new(ring, vec![])
}

#[test]
fn whole_municipality() {
    let resolver = resolver();
    let result = resolver
        .resolve_request(GeoreferenceRequest {
            zone_id: Some(ZoneId::new(0)),
            ..Default::default()
        })
        .unwrap();

    assert_eq!(result.zone_id, Some(ZoneId::WHOLE_MUNICIPALITY));
    let center = resolver.catalog().boundary().center();
    assert_relative_eq!(result.longitude, center.x());
    assert_relative_eq!(result.latitude, center.y());
    // area weighted centroid of the boundary
    assert_relative_eq!(result.longitude, 20.445_244_6, epsilon = 1e-6);
    assert_relative_eq!(result.latitude, 67.793_163_2, epsilon = 1e-6);
    assert!(resolver.catalog().boundary().covers_point(&center));
}

#[test]
fn unknown_zone() {
    let resolver = resolver();
    assert_eq!(
        resolver.resolve(GeoreferenceInput::zone(ZoneId::new(7))),
        Err(GeoreferenceError::ZoneNotFound(ZoneId::new(7)))
    );
}

#[test]
fn point_inside_kiruna() {
    let resolver = resolver();
    let result = resolver
        .resolve_request(GeoreferenceRequest {
            latitude: Some(67.85),
            longitude: Some(20.22),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(result.zone_id, None);
    assert_eq!(result.latitude, 67.85);
    assert_eq!(result.longitude, 20.22);
}

#[test]
fn point_far_away() {
    let resolver = resolver();
    assert_eq!(
        resolver.resolve(GeoreferenceInput::point(0., 0.)),
        Err(GeoreferenceError::OutOfBounds)
    );
}

#[test]
fn new_triangle_then_rotated_duplicate() {
    let resolver = resolver();
    let result = resolver
        .resolve(GeoreferenceInput::area(&[A, B, C, A]))
        .unwrap();
    let zone_id = result.zone_id.unwrap();
    assert!(!zone_id.is_whole_municipality());
    assert_relative_eq!(result.longitude, 20.2, epsilon = 1e-9);
    assert_relative_eq!(result.latitude, 67.866_666_666, epsilon = 1e-6);

    assert_eq!(
        resolver.resolve(GeoreferenceInput::area(&[B, C, A, B])),
        Err(GeoreferenceError::DuplicateZone(zone_id))
    );
    // the other winding is the same zone too
    assert_eq!(
        resolver.resolve(GeoreferenceInput::area(&[C, B, A])),
        Err(GeoreferenceError::DuplicateZone(zone_id))
    );
    assert_eq!(resolver.catalog().store().zones().unwrap().len(), 1);

    // and it can now be chosen by id
    assert_eq!(resolver.resolve(GeoreferenceInput::zone(zone_id)), Ok(result));
}

#[test]
fn several_modes_are_inconsistent() {
    let resolver = resolver();
    let request = GeoreferenceRequest {
        zone_id: Some(ZoneId::new(1)),
        coordinates: Some(vec![A, B, C]),
        ..Default::default()
    };
    assert_eq!(
        resolver.resolve_request(request),
        Err(GeoreferenceError::InconsistentGeoreference)
    );

    let request = GeoreferenceRequest {
        latitude: Some(67.85),
        ..Default::default()
    };
    assert_eq!(
        resolver.resolve_request(request),
        Err(GeoreferenceError::InconsistentGeoreference)
    );
    assert!(resolver.catalog().store().zones().unwrap().is_empty());
}

#[test]
fn request_from_json() {
    let resolver = resolver();
    let request: GeoreferenceRequest = serde_json::from_str(r#"{"zoneID": 0}"#).unwrap();
    let result = resolver.resolve_request(request).unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["zoneID"], 0);
    assert!(json["latitude"].is_number());
    assert!(json["longitude"].is_number());

    let request: GeoreferenceRequest =
        serde_json::from_str(r#"{"latitude": 67.85, "longitude": 20.22}"#).unwrap();
    let json = serde_json::to_value(resolver.resolve_request(request).unwrap()).unwrap();
    assert!(json["zoneID"].is_null());
}

#[test]
fn canonical_key_ignores_rotation_and_winding() {
    let key = canonicalize(&triangle()).unwrap();
    let rotations = vec![vec![B, C, A], vec![C, A, B], vec![A, C, B], vec![C, B, A, C]];
    for r in rotations {
        let ring: LineString<f64> = r.iter().map(|c| (c[0], c[1])).collect::<Vec<_>>().into();
        let polygon = Polygon::new(ring, vec![]);
        assert_eq!(canonicalize(&polygon).unwrap(), key);
        assert_eq!(centroid(&polygon).unwrap(), centroid(&triangle()).unwrap());
    }
}

#[test]
fn containment_is_monotonic() {
    let boundary = load_boundary(boundary_path()).unwrap();
    let inner: LineString<f64> = vec![(20.1, 67.85), (20.3, 67.85), (20.2, 67.95)].into();
    let inner = Polygon::new(inner, vec![]);

    assert!(polygon_contained(&inner, &triangle().into()));
    assert!(boundary.covers_polygon(&triangle()));
    assert!(boundary.covers_polygon(&inner));

    // a triangle going out of the boundary by its north vertex
    let outside: LineString<f64> = vec![(20.0, 67.8), (20.4, 67.8), (20.2, 69.0)].into();
    let outside = Polygon::new(outside, vec![]);
    assert!(!boundary.covers_polygon(&outside));

    // a contained zone has its displayed point in the boundary, even when concave
    let two_arms: LineString<f64> = vec![
        (19.6, 67.95),
        (19.8, 67.95),
        (19.7, 67.6),
        (20.3, 67.6),
        (20.2, 67.95),
        (20.4, 67.95),
        (20.4, 67.55),
        (19.6, 67.55),
    ]
    .into();
    let two_arms = Polygon::new(two_arms, vec![]);
    assert!(boundary.covers_polygon(&two_arms));
    for p in &[triangle(), inner, two_arms] {
        let center = centroid(p).unwrap();
        assert!(point_in_polygon(&center, p));
        assert!(boundary.covers_point(&center));
    }
}

#[test]
fn area_partly_outside() {
    let resolver = resolver();
    assert_eq!(
        resolver.resolve(GeoreferenceInput::area(&[[17., 67.], [20., 67.5], [19., 68.]])),
        Err(GeoreferenceError::OutOfBounds)
    );
    assert!(resolver.catalog().store().zones().unwrap().is_empty());
}

#[test]
fn concurrent_identical_areas_create_one_zone() {
    let resolver = Arc::new(resolver());
    let nb_workers = 8;
    let barrier = Arc::new(Barrier::new(nb_workers));

    let workers: Vec<_> = (0..nb_workers)
        .map(|i| {
            let resolver = resolver.clone();
            let barrier = barrier.clone();
            // every worker draws the same triangle from another starting vertex
            let mut ring = vec![A, B, C];
            ring.rotate_left(i % 3);
            std::thread::spawn(move || {
                barrier.wait();
                resolver.resolve(GeoreferenceInput::area(&ring))
            })
        })
        .collect();
    let results: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();

    let created: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(created.len(), 1);
    let zone_id = created[0].zone_id.unwrap();
    for r in results.iter().filter(|r| r.is_err()) {
        assert_eq!(r, &Err(GeoreferenceError::DuplicateZone(zone_id)));
    }
    assert_eq!(resolver.catalog().store().zones().unwrap().len(), 1);
}

#[test]
fn concurrent_inserts_are_deduplicated_by_the_store() {
    // insert without the lookup, only the unique index of the store stands in the way
    let boundary = Arc::new(load_boundary(boundary_path()).unwrap());
    let catalog = Arc::new(ZoneCatalog::new(MemoryZoneStore::new(), boundary));
    let nb_workers = 16;
    let barrier = Arc::new(Barrier::new(nb_workers));

    let workers: Vec<_> = (0..nb_workers)
        .map(|_| {
            let catalog = catalog.clone();
            let barrier = barrier.clone();
            std::thread::spawn(move || {
                barrier.wait();
                catalog.insert_zone(&triangle())
            })
        })
        .collect();
    let results: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results.iter().all(|r| match r {
        Ok(_) => true,
        Err(GeoreferenceError::DuplicateZone(id)) => *id == ZoneId::new(1),
        Err(_) => false,
    }));
    assert_eq!(catalog.store().zones().unwrap().len(), 1);
}

#[test]
fn persisted_zone_outside_the_boundary_is_refused() {
    let resolver = resolver();
    resolver
        .resolve(GeoreferenceInput::area(&[A, B, C]))
        .unwrap();
    let mut file = catalog_file(resolver.catalog()).unwrap();
    let far: LineString<f64> = vec![(0., 0.), (1., 0.), (1., 1.)].into();
    file.zones[0].boundary = Polygon::new(far, vec![]).into();

    let path = out_file("catalog_outside.json");
    serde_json::to_writer(std::fs::File::create(&path).unwrap(), &file).unwrap();
    assert!(build_resolver(boundary_path(), Some(&path)).is_err());
}

#[test]
fn catalog_round_trip() {
    let resolver = resolver();
    resolver
        .resolve(GeoreferenceInput::area(&[A, B, C]))
        .unwrap();
    let file = catalog_file(resolver.catalog()).unwrap();
    assert_eq!(file.meta.municipality, "Kiruna");
    assert_eq!(file.meta.stats.zone_count, 1);
    assert_eq!(file.meta.stats.vertex_count, 3);

    let path = out_file("catalog_round_trip.json");
    serde_json::to_writer(std::fs::File::create(&path).unwrap(), &file).unwrap();

    let reloaded = build_resolver(boundary_path(), Some(&path)).unwrap();
    assert_eq!(
        reloaded.catalog().store().zones().unwrap(),
        resolver.catalog().store().zones().unwrap()
    );
    assert_eq!(
        reloaded.resolve(GeoreferenceInput::area(&[C, A, B])),
        Err(GeoreferenceError::DuplicateZone(ZoneId::new(1)))
    );
}

#[test]
fn test_cmd_resolves_requests() {
    let output_file = out_file("georeferences.jsonl");
    let zones_file = out_file("zones.jsonl.gz");
    let output = launch_command_line(vec![
        "-b",
        BOUNDARY,
        "-i",
        "./tests/data/requests.jsonl",
        "-o",
        output_file.to_str().unwrap(),
        "-z",
        zones_file.to_str().unwrap(),
    ]);
    assert!(output.status.success());

    let lines: Vec<serde_json::Value> = std::io::BufReader::new(std::fs::File::open(&output_file).unwrap())
        .lines()
        .map(|l| serde_json::from_str(&l.unwrap()).unwrap())
        .collect();
    assert_eq!(lines.len(), 7);
    assert_eq!(lines[0]["result"]["zoneID"], 0);
    assert!(lines[1]["result"]["zoneID"].is_null());
    assert_eq!(lines[2]["document"], 3);
    assert_eq!(lines[2]["result"]["zoneID"], 1);
    assert_eq!(lines[3]["error"]["kind"], "out_of_bounds");
    assert_eq!(lines[4]["error"]["kind"], "zone_not_found");
    assert_eq!(lines[5]["error"]["kind"], "inconsistent_georeference");
    assert_eq!(lines[6]["error"]["kind"], "invalid_request");

    let zones: Vec<_> = georef_model::read_zones_from_file(&zones_file)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(zones.len(), 1);
}

#[test]
fn test_cmd_with_json_gz_catalog() {
    let zones_file = out_file("zones.json.gz");
    let output = launch_command_line(vec![
        "-b",
        BOUNDARY,
        "-i",
        "./tests/data/requests.jsonl",
        "-o",
        out_file("georeferences_gz.jsonl").to_str().unwrap(),
        "-z",
        zones_file.to_str().unwrap(),
        "--no-stats",
    ]);
    assert!(output.status.success());

    let catalog = georef_model::load_catalog_from_file(&zones_file).unwrap();
    assert_eq!(catalog.zones.len(), 1);
    assert_eq!(catalog.meta.municipality, "Kiruna");
    assert_eq!(catalog.meta.stats.zone_count, 1);
}

#[test]
fn test_cmd_with_unknown_catalog_format() {
    let output = launch_command_line(vec![
        "-b",
        BOUNDARY,
        "-i",
        "./tests/data/requests.jsonl",
        "-o",
        out_file("unused.jsonl").to_str().unwrap(),
        "-z",
        "zones.yaml",
    ]);
    assert!(!output.status.success());
}
