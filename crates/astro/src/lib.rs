//! Pure astronomy helpers used by every scheduling stage.
//!
//! Everything in this crate is deterministic and free of I/O: civil time to
//! Julian Date conversion, Local Sidereal Time, target altitude, angular
//! separation, airmass, and the sunrise-equation twilight approximation.

use thiserror::Error;

pub mod coords;
pub mod time;
pub mod twilight;

pub use coords::{
    Equatorial, Site, airmass, altitude_deg, angular_separation_deg, local_sidereal_time_hours,
};
pub use time::{
    format_utc, format_utc_seconds, jd_from_unix_seconds, julian_date_to_utc,
    julian_date_to_utc_ceil, julian_date_to_utc_floor, parse_utc, utc_to_julian_date,
};
pub use twilight::{NAUTICAL_TWILIGHT_DEG, TwilightTimes, twilight_times, twilight_times_at};

/// Errors surfaced by time parsing and geometry evaluation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AstroError {
    #[error("invalid time `{input}`: expected YYYY:MM:DD:HH:mm")]
    InvalidTimeFormat { input: String },
    #[error("Julian Date {jd} cannot be represented as a civil timestamp")]
    UnrepresentableJulianDate { jd: f64 },
    #[error("geometry domain error in {context}: argument {value} outside [-1, 1]")]
    GeometryDomain { context: &'static str, value: f64 },
}
