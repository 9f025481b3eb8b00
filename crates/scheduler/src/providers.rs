//! Host-supplied time, site, and Moon position.

use chrono::Utc;
use nightplan_astro::{Equatorial, Site, jd_from_unix_seconds};

/// Source of the current Julian Date.
pub trait Clock {
    fn now_jd(&self) -> f64;
}

/// Wall clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_jd(&self) -> f64 {
        let millis = Utc::now().timestamp_millis();
        jd_from_unix_seconds(millis as f64 / 1_000.0)
    }
}

/// Clock frozen at a given Julian Date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub f64);

impl Clock for FixedClock {
    fn now_jd(&self) -> f64 {
        self.0
    }
}

/// Observing site and Moon position.
pub trait SkyProvider {
    fn site(&self) -> Site;
    fn moon_at(&self, jd: f64) -> Equatorial;
}

/// Fixed site and a Moon position taken as constant over the run.
#[derive(Debug, Clone, Copy)]
pub struct StaticSky {
    pub site: Site,
    pub moon: Equatorial,
}

impl StaticSky {
    pub fn new(site: Site, moon: Equatorial) -> Self {
        Self { site, moon }
    }
}

impl SkyProvider for StaticSky {
    fn site(&self) -> Site {
        self.site
    }

    fn moon_at(&self, _jd: f64) -> Equatorial {
        self.moon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_after_2020() {
        // 2020-01-01T00:00:00Z
        assert!(SystemClock.now_jd() > 2_458_849.5);
    }

    #[test]
    fn static_sky_ignores_time() {
        let sky = StaticSky::new(Site::new(43.0, -81.0), Equatorial::new(10.0, 5.0));
        assert_eq!(sky.moon_at(0.0), sky.moon_at(1e6));
        assert_eq!(sky.site().latitude_deg, 43.0);
        assert_eq!(FixedClock(2_460_000.0).now_jd(), 2_460_000.0);
    }
}
