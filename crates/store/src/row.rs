//! Column layout and row decoding.

use csv::StringRecord;
use nightplan_astro::{Equatorial, parse_utc};
use nightplan_scheduler::{ObservationRequest, ObservationWindow, RequestId};
use thiserror::Error;

pub const HEADER: [&str; 11] = [
    "Directory Name",
    "Priority",
    "RA",
    "Dec",
    "Start Time",
    "End Time",
    "Obs Duration",
    "Exposure Time",
    "Filter",
    "Binning",
    "Completion",
];
pub const SCORE_HEADER: &str = "Score";

pub const FIELD_COUNT: usize = HEADER.len();

pub(crate) const NAME: usize = 0;
pub(crate) const PRIORITY: usize = 1;
pub(crate) const RA: usize = 2;
pub(crate) const DEC: usize = 3;
pub(crate) const START: usize = 4;
pub(crate) const END: usize = 5;
pub(crate) const DURATION: usize = 6;
pub(crate) const EXPOSURE: usize = 7;
pub(crate) const FILTER: usize = 8;
pub(crate) const BINNING: usize = 9;
pub(crate) const COMPLETION: usize = 10;
pub(crate) const SCORE: usize = 11;

/// A data row that could not be turned into a request.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RowError {
    #[error("row {row}: {reason}")]
    MalformedRow { row: RequestId, reason: String },
    #[error("row {row}: invalid time `{input}`, expected YYYY:MM:DD:HH:mm[:ss]")]
    InvalidTimeFormat { row: RequestId, input: String },
}

impl RowError {
    pub fn row(&self) -> RequestId {
        match self {
            RowError::MalformedRow { row, .. } | RowError::InvalidTimeFormat { row, .. } => *row,
        }
    }
}

fn malformed(row: RequestId, reason: impl Into<String>) -> RowError {
    RowError::MalformedRow {
        row,
        reason: reason.into(),
    }
}

fn number(record: &StringRecord, index: usize, row: RequestId) -> Result<f64, RowError> {
    let raw = record.get(index).unwrap_or("").trim();
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| malformed(row, format!("{} `{raw}` is not a number", HEADER[index])))
}

fn text(record: &StringRecord, index: usize) -> &str {
    record.get(index).unwrap_or("").trim()
}

/// Decode one data row. Completion is reported on the returned request.
pub fn parse_row(row: RequestId, record: &StringRecord) -> Result<ObservationRequest, RowError> {
    if record.len() != FIELD_COUNT && record.len() != FIELD_COUNT + 1 {
        return Err(malformed(
            row,
            format!("expected {FIELD_COUNT} fields, found {}", record.len()),
        ));
    }

    let priority = number(record, PRIORITY, row)?;
    if priority <= 0.0 {
        return Err(malformed(row, format!("priority {priority} is not positive")));
    }
    let ra_deg = number(record, RA, row)?;
    let dec_deg = number(record, DEC, row)?;

    let timestamp = |index: usize| {
        let raw = text(record, index);
        parse_utc(raw).map_err(|_| RowError::InvalidTimeFormat {
            row,
            input: raw.to_string(),
        })
    };
    let start = timestamp(START)?;
    let end = timestamp(END)?;
    let window = ObservationWindow::from_utc(start, end)
        .ok_or_else(|| malformed(row, "end time precedes start time"))?;

    let duration_min = number(record, DURATION, row)?;
    let exposure_sec = number(record, EXPOSURE, row)?;
    let completed = match text(record, COMPLETION) {
        "1" => true,
        "0" | "" => false,
        other => return Err(malformed(row, format!("completion flag `{other}` is not 0 or 1"))),
    };

    let mut request = ObservationRequest::new(
        row,
        text(record, NAME),
        Equatorial::new(ra_deg, dec_deg),
        window,
    )
    .with_priority(priority)
    .with_duration_min(duration_min)
    .with_exposure(exposure_sec, text(record, FILTER), text(record, BINNING));
    request.completed = completed;
    Ok(request)
}
