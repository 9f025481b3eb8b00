use std::fs;

use nightplan::astro::{Equatorial, parse_utc, utc_to_julian_date};
use nightplan::config::ObservatoryConfig;
use nightplan::scheduler::{FixedClock, RequestId};
use nightplan::session::{RunError, Session, export_plan};
use nightplan::store::{RequestStore, RowError, StoreError};

const STORE: &str = "\
Directory Name,Priority,RA,Dec,Start Time,End Time,Obs Duration,Exposure Time,Filter,Binning,Completion
Polaris,2,37.95,89.26,2025:01:16:00:00,2025:01:16:10:00,30,10,1,1,0
Broken,not-a-number,10.0,10.0,2025:01:16:00:00,2025:01:16:10:00,30,10,1,1,0
NGC 3172,5,159.5,89.1,2025:01:16:00:00,2025:01:16:10:00,45,60,2,2,0
Short,3,120.0,85.0,2025:01:16:00:00,2025:01:16:10:00,0,60,2,2,0
";

fn session() -> Session {
    Session::new(ObservatoryConfig::default(), Equatorial::new(200.0, -30.0))
}

fn clock() -> FixedClock {
    FixedClock(utc_to_julian_date(&parse_utc("2025:01:16:02:00").unwrap()))
}

#[test]
fn malformed_row_is_skipped_and_the_rest_are_planned() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("requests.csv");
    fs::write(&path, STORE).unwrap();
    let store = RequestStore::new(&path);

    let report = session().schedule(&store, clock()).unwrap();
    assert_eq!(report.skipped.len(), 1);
    assert!(matches!(
        report.skipped[0],
        RowError::MalformedRow { row: RequestId(2), .. }
    ));

    let ids: Vec<usize> = report.plan.entries.iter().map(|e| e.request.id.0).collect();
    assert_eq!(ids.len(), 3);
    assert_eq!(ids[0], 3);
    let short = report
        .plan
        .entries
        .iter()
        .find(|e| e.request.id == RequestId(4))
        .unwrap();
    assert_eq!(short.request.duration_min, 5.0);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(&path)
        .unwrap();
    assert_eq!(reader.headers().unwrap().get(11), Some("Score"));
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 4);
    assert_eq!(&rows[1][1], "not-a-number");
    assert!(!rows[0][11].is_empty());
    assert!(!rows[2][11].is_empty());
    assert_ne!(&rows[2][4], "2025:01:16:00:00", "allocated start written back");
}

#[test]
fn second_run_reloads_written_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("requests.csv");
    fs::write(&path, STORE).unwrap();
    let store = RequestStore::new(&path);

    session().schedule(&store, clock()).unwrap();
    let reloaded = store.load_pending().unwrap();
    assert_eq!(reloaded.pending.len(), 3);
    assert!(reloaded.pending.iter().all(|r| r.score.is_none()));
}

#[test]
fn written_back_windows_stay_inside_the_night() {
    let header = STORE.lines().next().unwrap();
    for day in 10..=19 {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("requests.csv");
        fs::write(
            &path,
            format!(
                "{header}\nPolaris,2,37.95,89.26,2025:01:{day:02}:23:45,2025:01:{next:02}:10:00,30,10,1,1,0\n",
                next = day + 1
            ),
        )
        .unwrap();
        let store = RequestStore::new(&path);
        let now = utc_to_julian_date(&parse_utc(&format!("2025:01:{:02}:02:00", day + 1)).unwrap());

        let report = session().schedule(&store, FixedClock(now)).unwrap();
        assert_eq!(report.plan.entries.len(), 1, "day {day}");
        let night = report.plan.entries[0].night;

        let reloaded = store.load_pending().unwrap().pending.remove(0);
        let window = reloaded.window();
        assert!(
            window.start_jd() >= night.sunset_jd,
            "day {day}: start {} before sunset {}",
            window.start_jd(),
            night.sunset_jd
        );
        assert!(window.end_jd() <= night.sunrise_jd, "day {day}");
        assert!((window.start_jd() - night.sunset_jd) * 86_400.0 < 1.0, "day {day}");
    }
}

#[test]
fn failed_write_back_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("requests.csv");
    fs::write(&path, STORE).unwrap();
    fs::create_dir(dir.path().join("requests.csv.tmp")).unwrap();

    let result = session().schedule(&RequestStore::new(&path), clock());
    assert!(matches!(
        result,
        Err(RunError::Store(StoreError::StorePersistFailure { .. }))
    ));
    assert_eq!(fs::read_to_string(&path).unwrap(), STORE);
}

#[test]
fn export_writes_plan_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("requests.csv");
    fs::write(&path, STORE).unwrap();
    let report = session()
        .schedule(&RequestStore::new(&path), clock())
        .unwrap();

    let output = dir.path().join("plan.csv");
    let summary_path = export_plan(&report.plan, &output).unwrap().unwrap();

    let mut reader = csv::Reader::from_path(&output).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(headers.len(), 14);
    assert_eq!(&headers[10], "Night");
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), report.plan.entries.len());
    assert_eq!(&rows[0][0], "NGC 3172");

    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(summary_path).unwrap()).unwrap();
    assert_eq!(summary["candidates"], 3);
    assert_eq!(summary["scheduled"], 3);
    assert_eq!(summary["nights"][0]["index"], 0);
    let hours = summary["nights"][0]["length_hours"].as_f64().unwrap();
    assert!((11.0..14.0).contains(&hours));
}

#[test]
fn version_is_exposed() {
    assert_eq!(nightplan::version(), env!("CARGO_PKG_VERSION"));
}

#[test]
fn bundled_configuration_matches_defaults() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("configs/observatory.toml");
    let config = nightplan::config::load_config(path).unwrap();
    assert_eq!(config, ObservatoryConfig::default());
}
