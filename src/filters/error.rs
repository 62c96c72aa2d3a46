use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Filter encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}
