use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Header metadata recovered from a raw archive file. Only the TOA5 format
/// carries the full set; the flat CSV formats leave most fields empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
    pub file_format: String,
    pub station_name: Option<String>,
    pub logger_type: Option<String>,
    pub program_name: Option<String>,
    pub table_name: Option<String>,
}

impl FileMetadata {
    pub fn new(
        file_format: impl Into<String>,
        station_name: Option<String>,
        logger_type: Option<String>,
        program_name: Option<String>,
        table_name: Option<String>,
    ) -> Self {
        Self {
            file_format: file_format.into(),
            station_name,
            logger_type,
            program_name,
            table_name,
        }
    }

    pub fn bare(file_format: impl Into<String>) -> Self {
        Self::new(file_format, None, None, None, None)
    }
}

/// One parsed archive file. Column names are exactly the names used in the
/// file; no renaming or unit conversion happens at this layer.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub file_metadata: FileMetadata,
    pub df: DataFrame,
}
