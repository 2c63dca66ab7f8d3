use flightlog::io::{LabelTable, NoGeocoder};
use flightlog::{FlightConfig, FlightRecord, ImportMode, SummaryKey};
use std::fs;
use tempfile::TempDir;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn survey() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp directory");
    fs::write(
        dir.path().join("lote.poly"),
        "#boundary\n-34.60 -58.39\n-34.60 -58.37\n-34.62 -58.37\n-34.62 -58.39\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("mision.waypoints"),
        "QGC WPL 110
0\t1\t0\t16\t0\t0\t0\t0\t-34.6\t-58.38\t100\t1
1\t0\t3\t178\t0\t5.0\t0\t0\t0\t0\t0\t1
2\t0\t3\t16\t0\t0\t0\t0\t-34.605\t-58.385\t30\t1
3\t0\t3\t16\t0\t0\t0\t0\t-34.615\t-58.375\t30\t1
",
    )
    .unwrap();
    fs::write(dir.path().join("2022-03-14 08-55-10.tlog"), b"log").unwrap();
    dir
}

fn small_config() -> FlightConfig {
    let mut config = FlightConfig {
        write_kmz: true,
        ..Default::default()
    };
    config.map.size = 120;
    config
}

#[test]
fn test_save_writes_every_report() {
    init_logging();
    let dir = survey();
    let mut record = FlightRecord::new(dir.path(), small_config());
    record.set_name("Lote 3");
    record.import(dir.path(), ImportMode::Skip).unwrap();
    record.aggregate(&NoGeocoder);
    record.render_map().expect("Failed to render map");

    let written = record.save(&LabelTable::default()).expect("Failed to save");
    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["flightlog.png", "flightlog.csv", "flightlog.kml", "flightlog.kmz"]);

    let csv = fs::read_to_string(dir.path().join("flightlog.csv")).unwrap();
    println!("{}", csv);
    assert_eq!(csv.lines().count(), SummaryKey::ALL.len());
    assert!(csv.starts_with("1,Nombre,Lote 3\n"));
    assert!(csv.contains("10,Altitud de vuelo (m),30\n"));
    assert!(csv.contains("11,Velocidad de vuelo (m/s),5\n"));

    let kml = fs::read_to_string(dir.path().join("flightlog.kml")).unwrap();
    assert!(kml.contains("<name>Lote 3</name>"));
    assert!(kml.contains("<name>mision.waypoints</name>"));
    assert!(kml.contains("<name>lote.poly</name>"));
    assert!(!kml.contains("tlog"));
}

#[test]
fn test_open_restores_saved_summary_and_map() {
    let dir = survey();
    let saved = {
        let mut record = FlightRecord::new(dir.path(), small_config());
        record.set_name("Lote 3");
        record.set_language("en");
        record.import(dir.path(), ImportMode::Skip).unwrap();
        record.aggregate(&NoGeocoder);
        let description = record.suggested_description();
        record.set_description(description);
        record.render_map().unwrap();
        record.save(&LabelTable::default()).unwrap();
        record.summary().clone()
    };
    assert_eq!(saved.description.as_deref(), Some("2022-03-14, 08:55"));

    let reopened = FlightRecord::open(dir.path(), small_config()).expect("Failed to open record");
    assert_eq!(reopened.summary(), &saved);
    assert!(reopened.catalog().is_empty());
    let map = reopened.preview().expect("preview should be loaded");
    assert_eq!((map.width(), map.height()), (120, 120));

    let csv = fs::read_to_string(dir.path().join("flightlog.csv")).unwrap();
    assert!(csv.starts_with("1,Name,Lote 3\n"));
}

#[test]
fn test_open_without_saved_files() {
    let dir = TempDir::new().unwrap();
    let record = FlightRecord::open(dir.path(), FlightConfig::default()).unwrap();
    assert!(record.preview().is_none());
    assert_eq!(record.summary().language.as_deref(), Some("es"));
    assert_eq!(record.summary().name, None);
}

#[test]
fn test_reset_then_reimport() {
    let dir = survey();
    let mut record = FlightRecord::new(dir.path(), small_config());
    record.import(dir.path(), ImportMode::Skip).unwrap();
    record.aggregate(&NoGeocoder);
    record.render_map().unwrap();
    assert_eq!(record.catalog().len(), 3);

    record.reset();
    assert!(record.catalog().is_empty());
    assert!(record.preview().is_none());
    assert!(record.summary().polygons.is_empty());

    let report = record.import(dir.path(), ImportMode::Skip).unwrap();
    assert_eq!(report.imported.len(), 3);
}
