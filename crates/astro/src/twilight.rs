//! Sunrise-equation approximation of twilight crossings.
//!
//! See <https://en.wikipedia.org/wiki/Sunrise_equation>. Accuracy is on the
//! order of a minute.

use nightplan_core::constants::J2000_JD;

use crate::AstroError;

/// Nominal solar altitude (degrees) delimiting the dark-sky window.
pub const NAUTICAL_TWILIGHT_DEG: f64 = -12.0;

const OBLIQUITY_DEG: f64 = 23.44;
const PERIHELION_ARGUMENT_DEG: f64 = 102.9372;

/// Morning and evening twilight crossings of one solar day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwilightTimes {
    /// Morning crossing (end of the previous night).
    pub sunrise_jd: f64,
    /// Evening crossing (start of the coming night).
    pub sunset_jd: f64,
}

/// Twilight crossings at the nominal −12° altitude for the solar day containing `jd`.
pub fn twilight_times(
    jd: f64,
    latitude_deg: f64,
    longitude_deg: f64,
) -> Result<TwilightTimes, AstroError> {
    twilight_times_at(jd, latitude_deg, longitude_deg, NAUTICAL_TWILIGHT_DEG)
}

/// Twilight crossings for an arbitrary solar altitude threshold.
///
/// Fails with [`AstroError::GeometryDomain`] when the Sun never crosses the
/// threshold that day (polar day or polar night).
pub fn twilight_times_at(
    jd: f64,
    latitude_deg: f64,
    longitude_deg: f64,
    sun_altitude_deg: f64,
) -> Result<TwilightTimes, AstroError> {
    let day_index = (jd - J2000_JD + 0.0008).floor();
    let mean_solar_time = day_index - longitude_deg / 360.0;

    let anomaly = (357.5291 + 0.985_600_28 * mean_solar_time).rem_euclid(360.0);
    let m = anomaly.to_radians();
    let center = 1.9148 * m.sin() + 0.02 * (2.0 * m).sin() + 0.0003 * (3.0 * m).sin();
    let ecliptic_longitude =
        (anomaly + center + 180.0 + PERIHELION_ARGUMENT_DEG).rem_euclid(360.0);
    let lambda = ecliptic_longitude.to_radians();

    let transit = J2000_JD + mean_solar_time + 0.0053 * m.sin() - 0.0069 * (2.0 * lambda).sin();

    let sin_dec = lambda.sin() * OBLIQUITY_DEG.to_radians().sin();
    let lat = latitude_deg.to_radians();
    let cos_hour_angle = (sun_altitude_deg.to_radians().sin() - lat.sin() * sin_dec)
        / (lat.cos() * sin_dec.asin().cos());

    if !cos_hour_angle.is_finite() || !(-1.0..=1.0).contains(&cos_hour_angle) {
        return Err(AstroError::GeometryDomain {
            context: "twilight hour angle",
            value: cos_hour_angle,
        });
    }

    let half_arc_days = cos_hour_angle.acos().to_degrees() / 360.0;
    Ok(TwilightTimes {
        sunrise_jd: transit - half_arc_days,
        sunset_jd: transit + half_arc_days,
    })
}
