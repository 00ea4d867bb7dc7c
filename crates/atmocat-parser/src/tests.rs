use std::fs;
use std::path::PathBuf;

use crate::errors::ParserError;
use crate::formats::{MesonetCsvParser, PicarroDatParser, Toa5Parser};
use crate::parse_raw_file;
use crate::registry::RawFileParser;

fn fixture(path: &str) -> String {
    let base = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let full_path = base.join("tests/data").join(path);
    fs::read_to_string(&full_path)
        .unwrap_or_else(|err| panic!("failed to read fixture {}: {}", full_path.display(), err))
}

#[test]
fn parses_toa5_datalogger_file() {
    let content = fixture("WBB_co2_2020_01.dat");
    let parsed = parse_raw_file(&content).expect("TOA5 parse failed");

    assert_eq!(parsed.file_metadata.file_format, "TOA5");
    assert_eq!(parsed.file_metadata.station_name.as_deref(), Some("WBB"));
    assert_eq!(parsed.file_metadata.logger_type.as_deref(), Some("CR1000X"));
    assert_eq!(parsed.file_metadata.table_name.as_deref(), Some("Data"));

    assert_eq!(
        parsed.df.get_column_names(),
        ["TIMESTAMP", "RECORD", "CO2_ppm", "H2O_ppt", "BattV_Min"]
    );
    assert_eq!(parsed.df.height(), 4);

    let co2 = parsed
        .df
        .column("CO2_ppm")
        .expect("CO2_ppm column missing")
        .f64()
        .expect("CO2_ppm not float");
    assert_eq!(co2.get(0), Some(412.31));
    // -9999 sentinel becomes a null
    assert_eq!(co2.get(2), None);
}

#[test]
fn toa5_timestamp_column_is_datetime() {
    use polars::prelude::{DataType, TimeUnit};

    let content = fixture("WBB_co2_2020_01.dat");
    let parsed = Toa5Parser.parse(&content).expect("TOA5 parse failed");

    let ts = parsed.df.column("TIMESTAMP").expect("TIMESTAMP missing");
    assert_eq!(
        ts.dtype(),
        &DataType::Datetime(TimeUnit::Microseconds, None)
    );

    let micros = ts.datetime().expect("not datetime").get(1);
    // 2020-01-01 00:01:00 UTC
    assert_eq!(micros, Some(1_577_836_860_000_000));
}

#[test]
fn parses_mesonet_csv_file() {
    let content = fixture("wbb_20200101.csv");
    let parsed = parse_raw_file(&content).expect("mesonet parse failed");

    assert_eq!(parsed.file_metadata.file_format, "MESONET_CSV");
    assert_eq!(parsed.df.height(), 3);

    let station = parsed
        .df
        .column("Station_ID")
        .expect("Station_ID missing")
        .str()
        .expect("Station_ID not string");
    assert_eq!(station.get(0), Some("WBB"));

    let time = parsed
        .df
        .column("Date_Time")
        .expect("Date_Time missing")
        .str()
        .expect("Date_Time not string");
    assert_eq!(time.get(0), Some("2020-01-01 00:00"));

    let pm25 = parsed
        .df
        .column("PM_25_concentration")
        .expect("PM_25_concentration missing")
        .f64()
        .expect("PM_25_concentration not float");
    assert_eq!(pm25.get(1), None);
}

#[test]
fn parses_picarro_dat_file() {
    let content = fixture("WBB_CFADS2046_2020.dat");
    let parsed = parse_raw_file(&content).expect("picarro parse failed");

    assert_eq!(parsed.file_metadata.file_format, "PICARRO_DAT");
    assert_eq!(parsed.df.height(), 3);

    let epoch = parsed
        .df
        .column("EPOCH_TIME")
        .expect("EPOCH_TIME missing")
        .f64()
        .expect("EPOCH_TIME not float");
    assert_eq!(epoch.get(0), Some(1_577_836_802.00));

    let co2 = parsed
        .df
        .column("CO2_dry")
        .expect("CO2_dry missing")
        .f64()
        .expect("CO2_dry not float");
    assert_eq!(co2.get(2), None);

    let date = parsed
        .df
        .column("DATE")
        .expect("DATE missing")
        .str()
        .expect("DATE not string");
    assert_eq!(date.get(0), Some("2020-01-01"));
}

#[test]
fn unrecognized_content_reports_all_attempts() {
    let err = parse_raw_file("not,a,known\nformat,at,all\n").unwrap_err();
    match err {
        ParserError::NoMatchingParser { attempts } => {
            assert_eq!(attempts.len(), 3);
        }
        other => panic!("expected NoMatchingParser, got {other}"),
    }
}

#[test]
fn toa5_rejects_truncated_header() {
    let content = "\"TOA5\",\"WBB\"\n";
    let err = Toa5Parser.parse(content).unwrap_err();
    assert!(matches!(err, ParserError::FormatMismatch { .. }));
}

#[test]
fn toa5_rejects_ragged_data_row() {
    let content = fixture("WBB_co2_2020_01.dat");
    let ragged = format!("{content}\"2020-01-01 00:04:00\",1005,412.90\n");
    let err = Toa5Parser.parse(&ragged).unwrap_err();
    assert!(matches!(err, ParserError::DataRow { .. }));
}

#[test]
fn mesonet_rejects_headerless_numbers() {
    let err = MesonetCsvParser.parse("1,2,3\n4,5,6\n").unwrap_err();
    assert!(matches!(err, ParserError::FormatMismatch { .. }));
}

#[test]
fn picarro_empty_data_is_an_error() {
    let err = PicarroDatParser
        .parse("DATE TIME EPOCH_TIME CO2_dry\n")
        .unwrap_err();
    assert!(matches!(err, ParserError::EmptyData { .. }));
}
