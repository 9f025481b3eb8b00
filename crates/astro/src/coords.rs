//! Sidereal time, horizontal altitude, angular separation, and airmass.

use nightplan_core::constants::{DAYS_PER_JULIAN_CENTURY, DEGREES_PER_HOUR, J2000_JD};
use nightplan_core::units::{normalize_degrees, normalize_hours};

/// Altitude floor used by [`airmass`] so targets at the horizon stay finite.
pub const MIN_AIRMASS_ALTITUDE_DEG: f64 = 1.0;

/// Equatorial position in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Equatorial {
    pub ra_deg: f64,
    pub dec_deg: f64,
}

impl Equatorial {
    pub fn new(ra_deg: f64, dec_deg: f64) -> Self {
        Self { ra_deg, dec_deg }
    }

    /// Angular distance to another position in degrees.
    pub fn separation_deg(&self, other: &Equatorial) -> f64 {
        angular_separation_deg(self.ra_deg, self.dec_deg, other.ra_deg, other.dec_deg)
    }
}

/// Geographic location of the observing site (east longitude positive).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Site {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
}

impl Site {
    pub fn new(latitude_deg: f64, longitude_deg: f64) -> Self {
        Self {
            latitude_deg,
            longitude_deg,
        }
    }

    /// Local Sidereal Time at this site in hours.
    pub fn lst_hours(&self, jd: f64) -> f64 {
        local_sidereal_time_hours(jd, self.longitude_deg)
    }

    /// Altitude of `target` at the given Julian Date.
    pub fn altitude_of(&self, target: &Equatorial, jd: f64) -> f64 {
        altitude_deg(
            target.ra_deg,
            target.dec_deg,
            self.latitude_deg,
            self.lst_hours(jd),
        )
    }
}

/// Local Sidereal Time in hours, normalized to `[0, 24)`.
///
/// GMST from the IAU 1982 polynomial in Julian centuries since J2000, shifted
/// by the site longitude.
pub fn local_sidereal_time_hours(jd: f64, longitude_deg: f64) -> f64 {
    let days = jd - J2000_JD;
    let t = days / DAYS_PER_JULIAN_CENTURY;
    let gmst_deg = 280.460_618_37 + 360.985_647_366_29 * days + 0.000_387_933 * t * t
        - t * t * t / 38_710_000.0;
    normalize_hours(normalize_degrees(gmst_deg + longitude_deg) / DEGREES_PER_HOUR)
}

/// Altitude above the horizon in degrees for hour angle `LST - RA`.
pub fn altitude_deg(ra_deg: f64, dec_deg: f64, latitude_deg: f64, lst_hours: f64) -> f64 {
    let hour_angle = (lst_hours * DEGREES_PER_HOUR - ra_deg).to_radians();
    let dec = dec_deg.to_radians();
    let lat = latitude_deg.to_radians();
    let sin_alt = dec.sin() * lat.sin() + dec.cos() * lat.cos() * hour_angle.cos();
    sin_alt.clamp(-1.0, 1.0).asin().to_degrees()
}

/// Great-circle distance between two equatorial positions in degrees.
///
/// The cosine is clamped before `acos`; identical positions can otherwise
/// round to slightly above one.
pub fn angular_separation_deg(ra1_deg: f64, dec1_deg: f64, ra2_deg: f64, dec2_deg: f64) -> f64 {
    let (dec1, dec2) = (dec1_deg.to_radians(), dec2_deg.to_radians());
    let delta_ra = (ra1_deg - ra2_deg).to_radians();
    let cos_sep = dec1.sin() * dec2.sin() + dec1.cos() * dec2.cos() * delta_ra.cos();
    cos_sep.clamp(-1.0, 1.0).acos().to_degrees()
}

/// Plane-parallel airmass `1 / cos(zenith angle)`.
pub fn airmass(altitude_deg: f64) -> f64 {
    let altitude = altitude_deg.clamp(MIN_AIRMASS_ALTITUDE_DEG, 90.0);
    let zenith = (90.0 - altitude).to_radians();
    1.0 / zenith.cos()
}
