//! The observation request value type and its execution window.

use std::fmt;

use chrono::NaiveDateTime;
use nightplan_astro::{AstroError, Equatorial, julian_date_to_utc, utc_to_julian_date};

/// Stable identity of a request: its 1-based data-row index in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub usize);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Execution window held simultaneously as civil UTC and Julian Date.
///
/// Both views are produced by the constructors, so they always describe the
/// same interval and `start <= end` holds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObservationWindow {
    start_utc: NaiveDateTime,
    end_utc: NaiveDateTime,
    start_jd: f64,
    end_jd: f64,
}

impl ObservationWindow {
    /// Build a window from civil timestamps. Returns `None` when `end < start`.
    pub fn from_utc(start_utc: NaiveDateTime, end_utc: NaiveDateTime) -> Option<Self> {
        if end_utc < start_utc {
            return None;
        }
        Some(Self {
            start_utc,
            end_utc,
            start_jd: utc_to_julian_date(&start_utc),
            end_jd: utc_to_julian_date(&end_utc),
        })
    }

    /// Build a window from Julian Dates; the civil view is rounded to the second.
    /// Reversed endpoints are swapped.
    pub fn from_jd(start_jd: f64, end_jd: f64) -> Result<Self, AstroError> {
        let (start_jd, end_jd) = if end_jd < start_jd {
            (end_jd, start_jd)
        } else {
            (start_jd, end_jd)
        };
        Ok(Self {
            start_utc: julian_date_to_utc(start_jd)?,
            end_utc: julian_date_to_utc(end_jd)?,
            start_jd,
            end_jd,
        })
    }

    pub fn start_utc(&self) -> NaiveDateTime {
        self.start_utc
    }

    pub fn end_utc(&self) -> NaiveDateTime {
        self.end_utc
    }

    pub fn start_jd(&self) -> f64 {
        self.start_jd
    }

    pub fn end_jd(&self) -> f64 {
        self.end_jd
    }

    pub fn duration_days(&self) -> f64 {
        self.end_jd - self.start_jd
    }
}

/// A pending observation request.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRequest {
    pub id: RequestId,
    pub directory_name: String,
    /// Positive; higher is more valuable.
    pub priority: f64,
    pub target: Equatorial,
    window: ObservationWindow,
    pub duration_min: f64,
    pub exposure_sec: f64,
    pub filter: String,
    pub binning: String,
    /// Last computed altitude, not authoritative.
    pub altitude_deg: Option<f64>,
    /// Last computed Moon separation, not authoritative.
    pub moon_angle_deg: Option<f64>,
    pub score: Option<f64>,
    pub completed: bool,
}

impl ObservationRequest {
    /// New pending request with priority 1, a duration covering the whole
    /// window, and empty pass-through fields.
    pub fn new(
        id: RequestId,
        directory_name: impl Into<String>,
        target: Equatorial,
        window: ObservationWindow,
    ) -> Self {
        Self {
            id,
            directory_name: directory_name.into(),
            priority: 1.0,
            target,
            window,
            duration_min: nightplan_core::time::days_to_minutes(window.duration_days()),
            exposure_sec: 0.0,
            filter: String::new(),
            binning: String::new(),
            altitude_deg: None,
            moon_angle_deg: None,
            score: None,
            completed: false,
        }
    }

    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_duration_min(mut self, duration_min: f64) -> Self {
        self.duration_min = duration_min;
        self
    }

    pub fn with_exposure(mut self, exposure_sec: f64, filter: &str, binning: &str) -> Self {
        self.exposure_sec = exposure_sec;
        self.filter = filter.to_string();
        self.binning = binning.to_string();
        self
    }

    pub fn window(&self) -> &ObservationWindow {
        &self.window
    }

    /// Replace the execution window (both views at once).
    pub fn set_window(&mut self, window: ObservationWindow) {
        self.window = window;
    }

    /// Forget everything computed by a previous run.
    pub fn reset_run_state(&mut self) {
        self.altitude_deg = None;
        self.moon_angle_deg = None;
        self.score = None;
    }

    /// Replace a non-positive duration with `min_duration_min`.
    ///
    /// Returns `true` when the duration was replaced.
    pub fn enforce_min_duration(&mut self, min_duration_min: f64) -> bool {
        if self.duration_min > 0.0 && self.duration_min.is_finite() {
            return false;
        }
        self.duration_min = min_duration_min;
        true
    }
}
