//! Time-window and visibility filters over the candidate set.

use nightplan_astro::{Equatorial, Site, altitude_deg};
use nightplan_config::ConstraintsConfig;
use nightplan_core::time::minutes_to_days;
use tracing::debug;

use crate::night::NightWindow;
use crate::request::ObservationRequest;

/// Altitude and Moon-distance thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityLimits {
    pub elevation_limit_deg: f64,
    pub min_moon_offset_deg: f64,
}

impl Default for VisibilityLimits {
    fn default() -> Self {
        Self::from(&ConstraintsConfig::default())
    }
}

impl From<&ConstraintsConfig> for VisibilityLimits {
    fn from(config: &ConstraintsConfig) -> Self {
        Self {
            elevation_limit_deg: config.elevation_limit_deg,
            min_moon_offset_deg: config.min_moon_offset_deg,
        }
    }
}

/// Geometry of a target at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Visibility {
    pub altitude_deg: f64,
    pub moon_angle_deg: f64,
}

impl VisibilityLimits {
    pub fn evaluate(
        &self,
        target: &Equatorial,
        site: &Site,
        moon: &Equatorial,
        lst_hours: f64,
    ) -> Visibility {
        Visibility {
            altitude_deg: altitude_deg(target.ra_deg, target.dec_deg, site.latitude_deg, lst_hours),
            moon_angle_deg: target.separation_deg(moon),
        }
    }

    /// Strictly above the elevation limit and strictly beyond the Moon offset.
    pub fn admits(&self, visibility: &Visibility) -> bool {
        visibility.altitude_deg > self.elevation_limit_deg
            && visibility.moon_angle_deg > self.min_moon_offset_deg
    }
}

/// Whether the request's declared window allows starting it now, tonight.
pub fn is_time_feasible(request: &ObservationRequest, now_jd: f64, night: &NightWindow) -> bool {
    let window = request.window();
    let (start, end) = (window.start_jd(), window.end_jd());
    let in_window = start <= now_jd && now_jd <= end;
    let finishes_before_sunrise = now_jd + minutes_to_days(request.duration_min) <= night.sunrise_jd;
    let start_in_night = night.sunset_jd <= start && start <= night.sunrise_jd;
    let end_in_night = night.sunset_jd <= end && end <= night.sunrise_jd;
    in_window && finishes_before_sunrise && start_in_night && end_in_night
}

/// Keep requests whose declared window is compatible with `now_jd` and `night`.
pub fn filter_by_time(
    requests: Vec<ObservationRequest>,
    now_jd: f64,
    night: &NightWindow,
) -> Vec<ObservationRequest> {
    requests
        .into_iter()
        .filter(|request| {
            let keep = is_time_feasible(request, now_jd, night);
            if !keep {
                debug!(id = %request.id, name = %request.directory_name, "outside its time window");
            }
            keep
        })
        .collect()
}

/// Keep requests that are high enough and far enough from the Moon at
/// `lst_hours`; survivors carry the computed altitude and Moon angle.
pub fn filter_by_astronomy(
    requests: Vec<ObservationRequest>,
    site: &Site,
    moon: &Equatorial,
    lst_hours: f64,
    limits: &VisibilityLimits,
) -> Vec<ObservationRequest> {
    requests
        .into_iter()
        .filter_map(|mut request| {
            let visibility = limits.evaluate(&request.target, site, moon, lst_hours);
            if !limits.admits(&visibility) {
                debug!(
                    id = %request.id,
                    altitude = visibility.altitude_deg,
                    moon_angle = visibility.moon_angle_deg,
                    "not visible"
                );
                return None;
            }
            request.altitude_deg = Some(visibility.altitude_deg);
            request.moon_angle_deg = Some(visibility.moon_angle_deg);
            Some(request)
        })
        .collect()
}
