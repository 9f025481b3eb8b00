//! Civil UTC <-> Julian Date conversion.
//!
//! Timestamps exchanged with the request store use the `YYYY:MM:DD:HH:mm`
//! layout with an optional trailing `:ss`.

use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use nightplan_core::constants::{GREGORIAN_START_JDN, SECONDS_PER_DAY, UNIX_EPOCH_JD};

use crate::AstroError;

const STORE_FORMAT: &str = "%Y:%m:%d:%H:%M";
const STORE_FORMAT_SECONDS: &str = "%Y:%m:%d:%H:%M:%S";

/// Parse a store timestamp (`YYYY:MM:DD:HH:mm[:ss]`).
pub fn parse_utc(input: &str) -> Result<NaiveDateTime, AstroError> {
    let trimmed = input.trim();
    NaiveDateTime::parse_from_str(trimmed, STORE_FORMAT_SECONDS)
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, STORE_FORMAT))
        .map_err(|_| AstroError::InvalidTimeFormat {
            input: input.to_string(),
        })
}

/// Format a timestamp in the store layout, rounded to the nearest minute.
pub fn format_utc(utc: &NaiveDateTime) -> String {
    let rounded = *utc + TimeDelta::seconds(30);
    rounded.format(STORE_FORMAT).to_string()
}

/// Format a timestamp in the store layout with seconds.
pub fn format_utc_seconds(utc: &NaiveDateTime) -> String {
    utc.format(STORE_FORMAT_SECONDS).to_string()
}

/// Convert a civil UTC timestamp to a Julian Date.
///
/// Uses the standard calendar formula: January and February count as months
/// 13 and 14 of the previous year, and the Gregorian correction applies from
/// 1582-10-15 onwards (earlier dates are read as Julian-calendar labels).
pub fn utc_to_julian_date(utc: &NaiveDateTime) -> f64 {
    let (mut year, mut month) = (utc.year() as f64, utc.month() as f64);
    if month <= 2.0 {
        year -= 1.0;
        month += 12.0;
    }
    let day = utc.day() as f64;

    let gregorian = (utc.year(), utc.month(), utc.day()) >= (1582, 10, 15);
    let correction = if gregorian {
        let century = (year / 100.0).floor();
        2.0 - century + (century / 4.0).floor()
    } else {
        0.0
    };

    let day_number = (365.25 * (year + 4716.0)).floor() + (30.6001 * (month + 1.0)).floor() + day
        - 1524.5
        + correction;

    let seconds = utc.num_seconds_from_midnight() as f64 + utc.nanosecond() as f64 * 1e-9;
    day_number + seconds / SECONDS_PER_DAY
}

/// Convert a Julian Date back to a civil UTC timestamp, rounded to the second.
pub fn julian_date_to_utc(jd: f64) -> Result<NaiveDateTime, AstroError> {
    let unrepresentable = || AstroError::UnrepresentableJulianDate { jd };
    if !jd.is_finite() || jd < 0.0 {
        return Err(unrepresentable());
    }

    let shifted = jd + 0.5;
    let z = shifted.floor();
    let fraction = shifted - z;

    let a = if z < GREGORIAN_START_JDN {
        z
    } else {
        let alpha = ((z - 1_867_216.25) / 36_524.25).floor();
        z + 1.0 + alpha - (alpha / 4.0).floor()
    };
    let b = a + 1524.0;
    let c = ((b - 122.1) / 365.25).floor();
    let d = (365.25 * c).floor();
    let e = ((b - d) / 30.6001).floor();

    let day = b - d - (30.6001 * e).floor();
    let month = if e < 14.0 { e - 1.0 } else { e - 13.0 };
    let year = if month > 2.0 { c - 4716.0 } else { c - 4715.0 };

    let midnight = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(unrepresentable)?;
    let seconds = (fraction * SECONDS_PER_DAY).round() as i64;
    Ok(midnight + TimeDelta::seconds(seconds))
}

/// Whole-second timestamp at or after `jd`.
pub fn julian_date_to_utc_ceil(jd: f64) -> Result<NaiveDateTime, AstroError> {
    let utc = julian_date_to_utc(jd)?;
    if utc_to_julian_date(&utc) < jd {
        Ok(utc + TimeDelta::seconds(1))
    } else {
        Ok(utc)
    }
}

/// Whole-second timestamp at or before `jd`.
pub fn julian_date_to_utc_floor(jd: f64) -> Result<NaiveDateTime, AstroError> {
    let utc = julian_date_to_utc(jd)?;
    if utc_to_julian_date(&utc) > jd {
        Ok(utc - TimeDelta::seconds(1))
    } else {
        Ok(utc)
    }
}

/// Julian Date for a Unix timestamp in (fractional) seconds.
#[inline]
pub fn jd_from_unix_seconds(seconds: f64) -> f64 {
    seconds / SECONDS_PER_DAY + UNIX_EPOCH_JD
}
