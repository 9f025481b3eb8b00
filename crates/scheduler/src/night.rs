//! Night windows and the sources that supply them.

use nightplan_astro::{AstroError, Site, twilight_times_at};

/// Dark interval between evening and morning twilight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NightWindow {
    /// 0 for the current (or upcoming) night, 1 for the next one, ...
    pub index: usize,
    pub sunset_jd: f64,
    pub sunrise_jd: f64,
}

impl NightWindow {
    pub fn length_days(&self) -> f64 {
        self.sunrise_jd - self.sunset_jd
    }

    /// Whether `[start_jd, end_jd]` lies within the night.
    pub fn contains(&self, start_jd: f64, end_jd: f64) -> bool {
        self.sunset_jd <= start_jd && end_jd <= self.sunrise_jd
    }
}

/// Supplies night `k` relative to the run's reference time.
pub trait NightSource {
    fn night(&self, index: usize) -> Result<NightWindow, AstroError>;
}

/// Nights derived from the sunrise-equation twilight at a site.
#[derive(Debug, Clone, Copy)]
pub struct TwilightNights {
    site: Site,
    twilight_altitude_deg: f64,
    /// A Julian Date inside the solar day whose evening opens night 0.
    first_evening_jd: f64,
}

impl TwilightNights {
    /// Locate the night that is in progress at `now_jd`, or the next one if it
    /// is daytime.
    pub fn locate(site: Site, twilight_altitude_deg: f64, now_jd: f64) -> Result<Self, AstroError> {
        for offset in [-1.0, 0.0] {
            let candidate = Self {
                site,
                twilight_altitude_deg,
                first_evening_jd: now_jd + offset,
            };
            if candidate.night(0)?.sunrise_jd > now_jd {
                return Ok(candidate);
            }
        }
        Ok(Self {
            site,
            twilight_altitude_deg,
            first_evening_jd: now_jd + 1.0,
        })
    }

    pub fn site(&self) -> Site {
        self.site
    }
}

impl NightSource for TwilightNights {
    fn night(&self, index: usize) -> Result<NightWindow, AstroError> {
        let evening_jd = self.first_evening_jd + index as f64;
        let evening = twilight_times_at(
            evening_jd,
            self.site.latitude_deg,
            self.site.longitude_deg,
            self.twilight_altitude_deg,
        )?;
        let morning = twilight_times_at(
            evening_jd + 1.0,
            self.site.latitude_deg,
            self.site.longitude_deg,
            self.twilight_altitude_deg,
        )?;
        Ok(NightWindow {
            index,
            sunset_jd: evening.sunset_jd,
            sunrise_jd: morning.sunrise_jd,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nightplan_astro::{parse_utc, utc_to_julian_date};

    fn jd(text: &str) -> f64 {
        utc_to_julian_date(&parse_utc(text).unwrap())
    }

    fn site() -> Site {
        Site::new(43.0, -81.0)
    }

    #[test]
    fn evening_run_uses_tonight() {
        let now = jd("2025:01:16:01:00");
        let nights = TwilightNights::locate(site(), -12.0, now).unwrap();
        let night = nights.night(0).unwrap();
        assert!(night.sunset_jd < now && now < night.sunrise_jd);
        assert!((11.0..14.0).contains(&(night.length_days() * 24.0)));
    }

    #[test]
    fn daytime_run_uses_the_coming_night() {
        let now = jd("2025:01:15:16:00");
        let night = TwilightNights::locate(site(), -12.0, now)
            .unwrap()
            .night(0)
            .unwrap();
        assert!(night.sunset_jd > now);
        assert!(night.sunset_jd - now < 0.5);
    }

    #[test]
    fn consecutive_nights_are_one_day_apart() {
        let now = jd("2025:01:15:23:30");
        let nights = TwilightNights::locate(site(), -12.0, now).unwrap();
        let first = nights.night(0).unwrap();
        let second = nights.night(1).unwrap();
        assert_eq!(second.index, 1);
        assert!(second.sunset_jd > first.sunrise_jd);
        assert!((second.sunset_jd - first.sunset_jd - 1.0).abs() < 0.01);
    }

    #[test]
    fn polar_day_surfaces_geometry_error() {
        let now = jd("2025:06:21:12:00");
        let err = TwilightNights::locate(Site::new(89.0, 0.0), -12.0, now).unwrap_err();
        assert!(matches!(err, AstroError::GeometryDomain { .. }));
    }

    #[test]
    fn containment_is_inclusive() {
        let night = NightWindow {
            index: 0,
            sunset_jd: 10.0,
            sunrise_jd: 10.5,
        };
        assert!(night.contains(10.0, 10.5));
        assert!(!night.contains(9.99, 10.2));
        assert!(!night.contains(10.1, 10.51));
    }
}
