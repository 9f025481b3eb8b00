//! Validation of new requests before they are appended to the store.

use csv::StringRecord;
use nightplan_astro::parse_utc;
use thiserror::Error;

/// A request as entered by a user.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub directory_name: String,
    pub priority: i64,
    pub ra_deg: f64,
    pub dec_deg: f64,
    pub start: String,
    pub end: String,
    pub duration_min: i64,
    pub exposure_sec: f64,
    pub filter: u8,
    pub binning: u8,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SubmissionError {
    #[error("directory name must not be empty")]
    EmptyDirectoryName,
    #[error("{field} = {value} is outside {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{field}: invalid time `{input}`, expected YYYY:MM:DD:HH:mm[:ss]")]
    InvalidTime { field: &'static str, input: String },
    #[error("end time precedes start time")]
    InvertedWindow,
    #[error("observation duration must be a positive number of minutes, got {0}")]
    NonPositiveDuration(i64),
    #[error("exposure time must not be negative, got {0}")]
    NegativeExposure(f64),
    #[error("filter must be 1, 2 or 3, got {0}")]
    UnknownFilter(u8),
    #[error("binning must be 1 or 2, got {0}")]
    UnknownBinning(u8),
}

fn within(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), SubmissionError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(SubmissionError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

impl Submission {
    pub fn validate(&self) -> Result<(), SubmissionError> {
        if self.directory_name.trim().is_empty() {
            return Err(SubmissionError::EmptyDirectoryName);
        }
        within("priority", self.priority as f64, 1.0, 10.0)?;
        within("ra", self.ra_deg, 0.0, 360.0)?;
        within("dec", self.dec_deg, -90.0, 90.0)?;

        let start = parse_utc(&self.start).map_err(|_| SubmissionError::InvalidTime {
            field: "start",
            input: self.start.clone(),
        })?;
        let end = parse_utc(&self.end).map_err(|_| SubmissionError::InvalidTime {
            field: "end",
            input: self.end.clone(),
        })?;
        if end < start {
            return Err(SubmissionError::InvertedWindow);
        }

        if self.duration_min <= 0 {
            return Err(SubmissionError::NonPositiveDuration(self.duration_min));
        }
        if self.exposure_sec < 0.0 || self.exposure_sec.is_nan() {
            return Err(SubmissionError::NegativeExposure(self.exposure_sec));
        }
        if !(1..=3).contains(&self.filter) {
            return Err(SubmissionError::UnknownFilter(self.filter));
        }
        if !(1..=2).contains(&self.binning) {
            return Err(SubmissionError::UnknownBinning(self.binning));
        }
        Ok(())
    }

    /// Store row for this submission, marked pending.
    pub fn to_record(&self) -> StringRecord {
        StringRecord::from(vec![
            self.directory_name.trim().to_string(),
            self.priority.to_string(),
            self.ra_deg.to_string(),
            self.dec_deg.to_string(),
            self.start.trim().to_string(),
            self.end.trim().to_string(),
            self.duration_min.to_string(),
            self.exposure_sec.to_string(),
            self.filter.to_string(),
            self.binning.to_string(),
            "0".to_string(),
        ])
    }
}
