use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use anyhow::Result;
use chrono::{TimeZone, Utc};

use atmocat_core::error::{CatalogError, EntityKind};
use atmocat_core::timerange::TimeRange;
use atmocat_core::Laboratory;

const CO2_JAN: &str = r#""TOA5","WBB","CR1000X","1049","CR1000X.Std.03.02","co2_wbb.cr1x","58234","Data"
"TIMESTAMP","RECORD","CO2_ppm","QAQC_Flag"
"TS","RN","ppm",""
"","","Smp","Smp"
"2020-01-01 00:00:00",1,412.31,1
"2020-01-01 08:00:00",2,413.05,1
"2020-01-01 23:59:00",3,412.88,1
"#;

// A February dump whose first row repeats the last January timestamp with a
// conflicting reading.
const CO2_FEB: &str = r#""TOA5","WBB","CR1000X","1049","CR1000X.Std.03.02","co2_wbb.cr1x","58234","Data"
"TIMESTAMP","RECORD","CO2_ppm","QAQC_Flag"
"TS","RN","ppm",""
"","","Smp","Smp"
"2020-01-01 23:59:00",3,999.99,1
"2020-02-01 00:00:00",4,414.20,1
"#;

const PICARRO_2020: &str = "DATE       TIME            EPOCH_TIME      CO2_dry      CH4_dry
2020-01-01 00:00:02.000    1577836802.00   411.870      1.91200
2020-01-01 00:00:07.000    1577836807.00   411.901      1.91210
";

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

fn set_mtime(path: &Path, time: SystemTime) -> Result<()> {
    let file = fs::OpenOptions::new().append(true).open(path)?;
    file.set_modified(time)?;
    Ok(())
}

fn catalog(data_root: &Path) -> Result<Laboratory> {
    let manifest = format!(
        r#"
[[sites]]
code = "wbb"
name = "William Browning Building"
latitude = 40.766
longitude = -111.847
elevation_m = 1436.0
timezone = "America/Denver"

  [[sites.instruments]]
  code = "co2"
  group = "atmos"
  variables = ["co2_concentration", "ch4_concentration"]

  [[sites.instruments]]
  code = "picarro"
  group = "gaslab"
  variables = ["co2_concentration", "ch4_concentration"]

[[groups]]
code = "atmos"
root = "{root}/atmos"

[[groups]]
code = "gaslab"
root = "{root}/gaslab"
"#,
        root = data_root.display()
    );
    Ok(Laboratory::from_toml_str(&manifest)?)
}

fn january() -> TimeRange {
    TimeRange::new(
        Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()),
        Some(Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap()),
    )
    .unwrap()
}

fn jan_through_feb() -> TimeRange {
    TimeRange::new(
        Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()),
        Some(Utc.with_ymd_and_hms(2020, 2, 29, 0, 0, 0).unwrap()),
    )
    .unwrap()
}

#[test]
fn read_data_standardizes_a_single_file() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    write_file(
        &tmp.path().join("atmos/wbb/co2/calibrated/WBB_co2_2020_01.dat"),
        CO2_JAN,
    )?;
    let lab = catalog(tmp.path())?;

    let table = lab.read_data("WBB", "atmos", "co2", &january())?;
    assert!(table.skipped.is_empty());
    assert_eq!(
        table.df.get_column_names(),
        ["time_utc", "co2_concentration", "ch4_concentration", "qaqc_flag"]
    );
    assert_eq!(table.height(), 3);

    let co2 = table.df.column("co2_concentration")?.f64()?;
    assert_eq!(co2.get(0), Some(412.31));
    assert_eq!(co2.get(1), Some(413.05));
    assert_eq!(co2.get(2), Some(412.88));

    // no CH4 column in the raw file: mapped target is null-filled
    let ch4 = table.df.column("ch4_concentration")?;
    assert_eq!(ch4.null_count(), 3);

    // nothing on January 2nd; the file simply ends
    let times = table.df.column("time_utc")?.datetime()?;
    let jan2 = Utc
        .with_ymd_and_hms(2020, 1, 2, 0, 0, 0)
        .unwrap()
        .timestamp_micros();
    for idx in 0..table.height() {
        assert!(times.get(idx).unwrap() < jan2);
    }
    Ok(())
}

#[test]
fn empty_archive_returns_the_canonical_schema() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let lab = catalog(tmp.path())?;

    let table = lab.read_data("wbb", "atmos", "co2", &january())?;
    assert!(table.is_empty());
    assert!(table.skipped.is_empty());
    assert_eq!(
        table.df.get_column_names(),
        ["time_utc", "co2_concentration", "ch4_concentration", "qaqc_flag"]
    );
    Ok(())
}

#[test]
fn read_data_is_idempotent_on_an_unchanged_tree() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    write_file(
        &tmp.path().join("atmos/wbb/co2/calibrated/WBB_co2_2020_01.dat"),
        CO2_JAN,
    )?;
    let lab = catalog(tmp.path())?;

    let first = lab.read_data("wbb", "atmos", "co2", &january())?;
    let second = lab.read_data("wbb", "atmos", "co2", &january())?;
    assert!(first.df.equals_missing(&second.df));
    Ok(())
}

#[test]
fn duplicate_timestamps_prefer_the_newer_source_file() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let jan = tmp.path().join("atmos/wbb/co2/calibrated/WBB_co2_2020_01.dat");
    let feb = tmp.path().join("atmos/wbb/co2/calibrated/WBB_co2_2020_02.dat");
    write_file(&jan, CO2_JAN)?;
    write_file(&feb, CO2_FEB)?;

    let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
    set_mtime(&jan, base)?;
    set_mtime(&feb, base + Duration::from_secs(3600))?;

    let lab = catalog(tmp.path())?;
    let table = lab.read_data("wbb", "atmos", "co2", &jan_through_feb())?;

    // four distinct timestamps, one row each
    assert_eq!(table.height(), 4);
    let times = table.df.column("time_utc")?.datetime()?;
    let mut previous = i64::MIN;
    for idx in 0..table.height() {
        let t = times.get(idx).unwrap();
        assert!(t > previous, "timestamps must be strictly increasing");
        previous = t;
    }

    // the overlapping 23:59 reading comes from the newer February dump
    let co2 = table.df.column("co2_concentration")?.f64()?;
    assert_eq!(co2.get(2), Some(999.99));
    Ok(())
}

#[test]
fn duplicate_timestamps_with_equal_mtimes_keep_the_first_seen_row() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let jan = tmp.path().join("atmos/wbb/co2/calibrated/WBB_co2_2020_01.dat");
    let feb = tmp.path().join("atmos/wbb/co2/calibrated/WBB_co2_2020_02.dat");
    write_file(&jan, CO2_JAN)?;
    write_file(&feb, CO2_FEB)?;

    let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
    set_mtime(&jan, base)?;
    set_mtime(&feb, base)?;

    let lab = catalog(tmp.path())?;
    let table = lab.read_data("wbb", "atmos", "co2", &jan_through_feb())?;

    assert_eq!(table.height(), 4);
    // resolution order is chronological, so the January file is first-seen
    let co2 = table.df.column("co2_concentration")?.f64()?;
    assert_eq!(co2.get(2), Some(412.88));
    Ok(())
}

#[test]
fn corrupt_files_are_skipped_and_reported() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    write_file(
        &tmp.path().join("atmos/wbb/co2/calibrated/WBB_co2_2020_01.dat"),
        CO2_JAN,
    )?;
    write_file(
        &tmp.path().join("atmos/wbb/co2/calibrated/WBB_co2_2020_02.dat"),
        "this is not a datalogger file\n",
    )?;

    let lab = catalog(tmp.path())?;
    let table = lab.read_data("wbb", "atmos", "co2", &jan_through_feb())?;

    assert_eq!(table.skipped.len(), 1);
    assert!(table.skipped[0]
        .path
        .to_string_lossy()
        .ends_with("WBB_co2_2020_02.dat"));
    // the good file still contributes every row
    assert_eq!(table.height(), 3);
    Ok(())
}

#[test]
fn leveled_archives_serve_the_highest_available_level() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    // identical period, diverging values: calibrated must win over raw
    let raw = CO2_JAN.replace("412.31", "400.00");
    write_file(
        &tmp.path().join("atmos/wbb/co2/raw/WBB_co2_2020_01.dat"),
        &raw,
    )?;
    write_file(
        &tmp.path().join("atmos/wbb/co2/calibrated/WBB_co2_2020_01.dat"),
        CO2_JAN,
    )?;

    let lab = catalog(tmp.path())?;
    let table = lab.read_data("wbb", "atmos", "co2", &january())?;
    let co2 = table.df.column("co2_concentration")?.f64()?;
    assert_eq!(co2.get(0), Some(412.31));
    Ok(())
}

#[test]
fn wildcard_layouts_read_epoch_keyed_analyzer_files() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    write_file(
        &tmp.path().join("gaslab/picarro/WBB_CFADS2046_2020.dat"),
        PICARRO_2020,
    )?;

    let lab = catalog(tmp.path())?;
    let table = lab.read_data("wbb", "gaslab", "picarro", &january())?;

    assert_eq!(table.height(), 2);
    let times = table.df.column("time_utc")?.datetime()?;
    assert_eq!(times.get(0), Some(1_577_836_802_000_000));
    let co2 = table.df.column("co2_concentration")?.f64()?;
    assert_eq!(co2.get(0), Some(411.870));
    let ch4 = table.df.column("ch4_concentration")?.f64()?;
    assert_eq!(ch4.get(1), Some(1.91210));
    Ok(())
}

#[test]
fn instrument_queried_under_the_wrong_group_is_unknown() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let lab = catalog(tmp.path())?;

    let err = lab
        .read_data("wbb", "gaslab", "co2", &january())
        .unwrap_err();
    assert!(matches!(
        err,
        CatalogError::UnknownEntity {
            kind: EntityKind::Instrument,
            ..
        }
    ));
    Ok(())
}

#[test]
fn unknown_group_fails_immediately() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let lab = catalog(tmp.path())?;

    let err = lab
        .read_data("wbb", "mystery", "co2", &january())
        .unwrap_err();
    assert!(matches!(
        err,
        CatalogError::UnknownEntity {
            kind: EntityKind::Group,
            ..
        }
    ));
    Ok(())
}
