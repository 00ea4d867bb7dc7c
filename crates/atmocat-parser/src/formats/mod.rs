mod common;
mod mesonet;
mod picarro;
mod toa5;

pub use mesonet::MesonetCsvParser;
pub use picarro::PicarroDatParser;
pub use toa5::Toa5Parser;

pub(crate) use common::{
    build_raw_dataframe, parse_optional_f64, parse_timestamp_micros, ColumnData, ColumnValues,
};
