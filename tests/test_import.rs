use flightlog::core::{ElementCatalog, ImportMode, Importer};
use flightlog::{Category, FlightError, Geometry};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const MISSION: &str = "QGC WPL 110
0\t1\t0\t16\t0\t0\t0\t0\t-34.600000\t-58.380000\t100.000000\t1
1\t0\t3\t178\t0\t5.0\t0\t0\t0\t0\t0\t1
2\t0\t3\t16\t0\t0\t0\t0\t-34.600000\t-58.380000\t20.000000\t1
3\t0\t3\t16\t0\t0\t0\t0\t-34.610000\t-58.380000\t20.000000\t1
";

const POLYGON: &str = "#saved by Mission Planner
-34.60 -58.39
-34.60 -58.37
-34.62 -58.37
-34.62 -58.39
";

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Survey folder with one file of every kind plus an unrelated text file
fn survey_folder() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let root = dir.path();
    fs::create_dir_all(root.join("fotos/extra")).unwrap();
    fs::create_dir_all(root.join("logs")).unwrap();
    fs::create_dir_all(root.join("odm")).unwrap();

    fs::write(root.join("fotos/DJI_0001.JPG"), b"no metadata here").unwrap();
    fs::write(root.join("fotos/extra/DJI_0002.jpg"), b"no metadata here").unwrap();
    fs::write(root.join("logs/2021-06-01 10-15-42.tlog"), [0u8; 16]).unwrap();
    fs::write(root.join("mision.waypoints"), MISSION).unwrap();
    fs::write(root.join("lote.poly"), POLYGON).unwrap();
    fs::write(root.join("odm/odm_orthophoto.tif"), b"II*\0").unwrap();
    fs::write(root.join("notas.txt"), "ignore me").unwrap();
    dir
}

#[test]
fn test_directory_import_catalogues_classified_files() {
    init_logging();
    let dir = survey_folder();
    let importer = Importer::new(dir.path());
    let mut catalog = ElementCatalog::new();

    let report = importer
        .import(&mut catalog, dir.path(), ImportMode::Skip)
        .expect("Failed to import folder");

    println!("imported: {:?}", report.imported);
    assert!(report.any_imported());
    assert_eq!(report.imported.len(), 6);
    assert_eq!(report.skipped.len(), 1);
    assert!(report.failed.is_empty());
    assert_eq!(catalog.len(), 6);

    let photo = catalog.get("DJI_0002.jpg", "fotos/extra").expect("nested photo missing");
    assert_eq!(photo.category, Category::Image);
    assert_eq!(photo.latitude, None);
    assert_eq!(photo.geometry, None);

    let log = catalog.get("2021-06-01 10-15-42.tlog", "logs").unwrap();
    assert_eq!(log.size, 16);
    assert_eq!(log.timestamp.unwrap().to_string(), "2021-06-01 10:15:42");

    assert_eq!(catalog.get("odm_orthophoto.tif", "odm").unwrap().category, Category::Raster);
}

#[test]
fn test_visit_order_is_lexicographic_depth_first() {
    let dir = survey_folder();
    let order: Vec<String> = Importer::visit_order(dir.path())
        .unwrap()
        .iter()
        .map(|p| {
            p.strip_prefix(dir.path())
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    assert_eq!(
        order,
        [
            "fotos/DJI_0001.JPG",
            "fotos/extra/DJI_0002.jpg",
            "logs/2021-06-01 10-15-42.tlog",
            "lote.poly",
            "mision.waypoints",
            "notas.txt",
            "odm/odm_orthophoto.tif",
        ]
    );
}

#[test]
fn test_reimport_without_replace_changes_nothing() {
    let dir = survey_folder();
    let importer = Importer::new(dir.path());
    let mut catalog = ElementCatalog::new();
    importer.import(&mut catalog, dir.path(), ImportMode::Skip).unwrap();
    let before = catalog.clone();

    let report = importer.import(&mut catalog, dir.path(), ImportMode::Skip).unwrap();
    assert!(!report.any_imported());
    assert_eq!(catalog, before);
}

#[test]
fn test_replace_overwrites_in_place() {
    let dir = survey_folder();
    let importer = Importer::new(dir.path());
    let mut catalog = ElementCatalog::new();
    importer.import(&mut catalog, dir.path(), ImportMode::Skip).unwrap();

    fs::write(dir.path().join("lote.poly"), "-1 -2\n-1 -3\n-2 -3\n").unwrap();
    let poly = dir.path().join("lote.poly");
    assert!(!importer.import_file(&mut catalog, &poly, ImportMode::Skip).unwrap());
    assert!(importer.import_file(&mut catalog, &poly, ImportMode::Replace).unwrap());

    assert_eq!(catalog.len(), 6);
    match &catalog.get("lote.poly", ".").unwrap().geometry {
        Some(Geometry::Polygon(vertices)) => assert_eq!(vertices.len(), 3),
        other => panic!("unexpected geometry: {:?}", other),
    }
}

#[test]
fn test_flight_plan_and_polygon_coordinates() {
    let dir = survey_folder();
    let importer = Importer::new(dir.path());
    let mut catalog = ElementCatalog::new();
    importer.import(&mut catalog, dir.path(), ImportMode::Skip).unwrap();

    let plan = catalog.get("mision.waypoints", ".").unwrap();
    let details = plan.flight_plan_details().unwrap();
    assert_eq!(details.home_altitude, 100.0);
    assert_eq!(details.speed, Some(5.0));
    assert_eq!(plan.altitude, Some(100.0));
    approx::assert_relative_eq!(plan.latitude.unwrap(), -34.605, epsilon = 1e-9);
    approx::assert_relative_eq!(plan.longitude.unwrap(), -58.38, epsilon = 1e-9);
    match &plan.geometry {
        Some(Geometry::Path(points)) => {
            assert_eq!(points.len(), 2);
            assert_eq!(points[0].alt, 120.0);
        }
        other => panic!("unexpected geometry: {:?}", other),
    }

    let polygon = catalog.get("lote.poly", ".").unwrap();
    approx::assert_relative_eq!(polygon.latitude.unwrap(), -34.61, epsilon = 1e-9);
    approx::assert_relative_eq!(polygon.longitude.unwrap(), -58.38, epsilon = 1e-9);
}

#[test]
fn test_malformed_files_are_reported_not_fatal() {
    init_logging();
    let dir = survey_folder();
    fs::write(dir.path().join("roto.waypoints"), "QGC WPL 110\n0 1 0 16 0 0\n").unwrap();
    let importer = Importer::new(dir.path());
    let mut catalog = ElementCatalog::new();

    let report = importer.import(&mut catalog, dir.path(), ImportMode::Skip).unwrap();
    assert_eq!(report.failed.len(), 1);
    let (path, error) = &report.failed[0];
    assert!(path.ends_with("roto.waypoints"));
    assert!(matches!(error, FlightError::Parse { line: 2, .. }));
    assert_eq!(catalog.len(), 6);
    assert!(!catalog.contains("roto.waypoints", "."));
}

#[test]
fn test_missing_and_unclassified_paths() {
    let dir = survey_folder();
    let importer = Importer::new(dir.path());
    let mut catalog = ElementCatalog::new();

    let report = importer
        .import(&mut catalog, dir.path().join("does-not-exist"), ImportMode::Skip)
        .unwrap();
    assert!(!report.any_imported());
    assert!(!importer
        .import_file(&mut catalog, dir.path().join("notas.txt"), ImportMode::Skip)
        .unwrap());
    assert!(!importer
        .import_file(&mut catalog, Path::new("/nonexistent/x.jpg"), ImportMode::Skip)
        .unwrap());
    assert!(catalog.is_empty());
}

#[test]
fn test_grid_plans_are_catalogued_without_geometry() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("survey.grid"), "{\"not\": \"parsed\"}").unwrap();
    let importer = Importer::new(dir.path());
    let mut catalog = ElementCatalog::new();
    importer.import(&mut catalog, dir.path(), ImportMode::Skip).unwrap();

    let grid = catalog.get("survey.grid", ".").unwrap();
    assert_eq!(grid.category, Category::FlightPlan);
    assert!(grid.geometry.is_none());
}
