use flightlog::io::{ImageTagReader, ImageTags, NoGeocoder, Place, PlaceTable};
use flightlog::{FlightConfig, FlightRecord, FlightResult, ImportMode, RECORD_VERSION};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Tags keyed by file stem, standing in for real EXIF blocks
struct SurveyTags;

impl ImageTagReader for SurveyTags {
    fn read_tags(&self, path: &Path) -> FlightResult<Option<ImageTags>> {
        let stem = path.file_stem().unwrap().to_string_lossy().into_owned();
        let tags = |time: &str, gps: Option<([f64; 3], [f64; 3], f64)>| ImageTags {
            datetime_original: Some(time.to_string()),
            make: Some("DJI".into()),
            model: Some("FC3170".into()),
            exposure_time: Some("1/800".into()),
            iso_speed: Some(100),
            gps_latitude: gps.map(|g| g.0),
            gps_latitude_ref: Some("S".into()),
            gps_longitude: gps.map(|g| g.1),
            gps_longitude_ref: Some("W".into()),
            gps_altitude: gps.map(|g| g.2),
            ..Default::default()
        };
        Ok(match stem.as_str() {
            "IMG_0001" => Some(tags("2022:03:14 09:00:00", None)),
            "IMG_0002" => Some(tags("2022:03:14 09:01:00", Some(([34.0, 36.0, 0.0], [58.0, 24.0, 0.0], 80.0)))),
            "IMG_0003" => Some(tags("2022:03:14 09:02:00", Some(([34.0, 37.0, 0.0], [58.0, 24.0, 0.0], 95.0)))),
            _ => None,
        })
    }
}

/// Rewrite files one after another so their modification times are ordered
fn touch_in_order(paths: &[&Path]) {
    for path in paths {
        let content = fs::read(path).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        fs::write(path, content).unwrap();
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn places() -> PlaceTable {
    PlaceTable::from_places(vec![
        Place {
            lat: -34.61315,
            lon: -58.37723,
            name: "Buenos Aires".into(),
            admin1: "Buenos Aires F.D.".into(),
            cc: "AR".into(),
        },
        Place {
            lat: -31.4135,
            lon: -64.18105,
            name: "Cordoba".into(),
            admin1: "Cordoba".into(),
            cc: "AR".into(),
        },
    ])
}

fn survey() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp directory");
    for name in ["IMG_0001.jpg", "IMG_0002.jpg", "IMG_0003.jpg"] {
        fs::write(dir.path().join(name), b"jpeg").unwrap();
    }
    fs::write(dir.path().join("2022-03-14 08-55-10.tlog"), b"log").unwrap();
    dir
}

#[test]
fn test_georeferenced_subset_drives_summary() {
    init_logging();
    let dir = survey();
    let mut record = FlightRecord::new(dir.path(), FlightConfig::default())
        .with_tag_reader(Box::new(SurveyTags));
    record.set_name("Lote 12");
    record.import(dir.path(), ImportMode::Skip).unwrap();
    assert_eq!(record.catalog().len(), 4);

    let summary = record.aggregate(&places()).clone();
    println!("{:#?}", summary);

    assert_eq!(summary.image_count, Some(2));
    assert_eq!(summary.images.as_deref(), Some("IMG_0002.jpg - IMG_0003.jpg"));
    assert_eq!(summary.camera.as_deref(), Some("DJI - FC3170"));
    assert_eq!(summary.exposure.as_deref(), Some("1/800"));
    assert_eq!(summary.iso, Some(100));
    assert_eq!(summary.time.unwrap().to_string(), "09:01:00");
    assert_eq!(summary.altitude, Some(95.0));
    approx::assert_relative_eq!(summary.latitude.unwrap(), -(34.0 + 36.5 / 60.0), epsilon = 1e-9);
    approx::assert_relative_eq!(summary.longitude.unwrap(), -58.4, epsilon = 1e-9);
    assert_eq!(summary.covered_area, Some(0.0));
    assert_eq!(summary.telemetry_logs, ["2022-03-14 08-55-10.tlog"]);
    assert_eq!(summary.place.as_deref(), Some("Buenos Aires, Buenos Aires F.D., AR"));
    assert_eq!(summary.name.as_deref(), Some("Lote 12"));
    assert_eq!(summary.version.as_deref(), Some(RECORD_VERSION));
    assert_eq!(record.suggested_description(), "2022-03-14, 09:01, Buenos Aires");
}

#[test]
fn test_aggregation_is_deterministic() {
    let dir = survey();
    let mut record = FlightRecord::new(dir.path(), FlightConfig::default())
        .with_tag_reader(Box::new(SurveyTags));
    record.import(dir.path(), ImportMode::Skip).unwrap();

    let table = places();
    let first = record.aggregate(&table).clone();
    let second = record.aggregate(&table).clone();
    assert_eq!(first, second);
}

#[test]
fn test_later_polygon_supplies_position() {
    let dir = TempDir::new().unwrap();
    let early = dir.path().join("a_early.poly");
    let late = dir.path().join("b_late.poly");
    fs::write(&late, "-31.40 -64.20\n-31.40 -64.16\n-31.42 -64.16\n-31.42 -64.20\n").unwrap();
    fs::write(&early, "-34.60 -58.39\n-34.60 -58.37\n-34.62 -58.37\n-34.62 -58.39\n").unwrap();
    touch_in_order(&[&early, &late]);

    let mut record = FlightRecord::new(dir.path(), FlightConfig::default());
    record.import(dir.path(), ImportMode::Skip).unwrap();
    let summary = record.aggregate(&places());

    approx::assert_relative_eq!(summary.latitude.unwrap(), -31.41, epsilon = 1e-9);
    approx::assert_relative_eq!(summary.longitude.unwrap(), -64.18, epsilon = 1e-9);
    assert_eq!(summary.polygons, ["a_early.poly", "b_late.poly"]);
    assert_eq!(summary.place.as_deref(), Some("Cordoba, Cordoba, AR"));
    assert_eq!(summary.image_count, None);
}

#[test]
fn test_flight_plan_is_reparsed_for_altitude_and_speed() {
    let dir = TempDir::new().unwrap();
    let mission = dir.path().join("mision.waypoints");
    fs::write(
        &mission,
        "QGC WPL 110
0\t1\t0\t16\t0\t0\t0\t0\t-34.6\t-58.38\t100\t1
1\t0\t3\t178\t0\t5.0\t0\t0\t0\t0\t0\t1
2\t0\t3\t16\t0\t0\t0\t0\t-34.6\t-58.38\t20\t1
",
    )
    .unwrap();

    let mut record = FlightRecord::new(dir.path(), FlightConfig::default());
    record.import(dir.path(), ImportMode::Skip).unwrap();

    fs::write(
        &mission,
        "QGC WPL 110
0\t1\t0\t16\t0\t0\t0\t0\t-34.6\t-58.38\t100\t1
1\t0\t3\t178\t0\t7.5\t0\t0\t0\t0\t0\t1
2\t0\t3\t16\t0\t0\t0\t0\t-34.6\t-58.38\t45\t1
",
    )
    .unwrap();

    let summary = record.aggregate(&NoGeocoder);
    assert_eq!(summary.flight_plans, ["mision.waypoints"]);
    assert_eq!(summary.flight_altitude, Some(45.0));
    assert_eq!(summary.flight_speed, Some(7.5));
    assert_eq!(summary.altitude, Some(100.0));
    assert_eq!(summary.place, None);
}
