//! Core constants, unit helpers, and shared primitives for the nightplan workspace.

/// Astronomical epochs and calendar constants.
pub mod constants {
    /// Julian Date of the J2000.0 epoch (2000-01-01T12:00:00).
    pub const J2000_JD: f64 = 2_451_545.0;
    /// Julian Date of the Unix epoch (1970-01-01T00:00:00 UTC).
    pub const UNIX_EPOCH_JD: f64 = 2_440_587.5;
    /// Days per Julian century.
    pub const DAYS_PER_JULIAN_CENTURY: f64 = 36_525.0;
    /// First Julian Day Number of the Gregorian calendar (1582-10-15).
    pub const GREGORIAN_START_JDN: f64 = 2_299_161.0;
    /// Seconds per day.
    pub const SECONDS_PER_DAY: f64 = 86_400.0;
    /// Minutes per day.
    pub const MINUTES_PER_DAY: f64 = 1_440.0;
    /// Sidereal hours per full turn.
    pub const HOURS_PER_TURN: f64 = 24.0;
    /// Degrees of right ascension per sidereal hour.
    pub const DEGREES_PER_HOUR: f64 = 15.0;
}

/// Basic unit conversion helpers.
pub mod units {
    use super::constants::HOURS_PER_TURN;

    /// Wrap an angle in degrees into `[0, 360)`.
    #[inline]
    pub fn normalize_degrees(v: f64) -> f64 {
        let wrapped = v.rem_euclid(360.0);
        // rem_euclid can return exactly 360.0 for tiny negative inputs
        if wrapped >= 360.0 { 0.0 } else { wrapped }
    }

    /// Wrap a time-of-day in hours into `[0, 24)`.
    #[inline]
    pub fn normalize_hours(v: f64) -> f64 {
        let wrapped = v.rem_euclid(HOURS_PER_TURN);
        if wrapped >= HOURS_PER_TURN { 0.0 } else { wrapped }
    }
}

/// Lightweight time utilities shared across crates.
pub mod time {
    use super::constants::MINUTES_PER_DAY;

    /// Convert minutes to fractional days.
    #[inline]
    pub fn minutes_to_days(minutes: f64) -> f64 {
        minutes / MINUTES_PER_DAY
    }

    /// Convert fractional days to minutes.
    #[inline]
    pub fn days_to_minutes(days: f64) -> f64 {
        days * MINUTES_PER_DAY
    }
}

#[cfg(test)]
mod tests {
    use super::time::{days_to_minutes, minutes_to_days};
    use super::units::{normalize_degrees, normalize_hours};

    #[test]
    fn minutes_and_days_are_inverse() {
        assert!((minutes_to_days(1_440.0) - 1.0).abs() < 1e-12);
        assert!((days_to_minutes(minutes_to_days(37.0)) - 37.0).abs() < 1e-9);
    }

    #[test]
    fn wrapping_stays_in_range() {
        assert_eq!(normalize_degrees(-30.0), 330.0);
        assert_eq!(normalize_degrees(720.0), 0.0);
        assert_eq!(normalize_hours(25.5), 1.5);
        assert!((0.0..24.0).contains(&normalize_hours(-1e-18)));
    }
}
