//! End-to-end nightly planning: filter, score, allocate, validate.

use nightplan_config::ObservatoryConfig;
use tracing::{info, warn};

use crate::SchedulerError;
use crate::allocator::{InfeasibleRequest, ScheduledEntry, WindowAllocator};
use crate::filter::{VisibilityLimits, filter_by_astronomy, filter_by_time};
use crate::night::{NightSource, NightWindow, TwilightNights};
use crate::providers::{Clock, SkyProvider};
use crate::request::ObservationRequest;
use crate::scoring::{rank, score_all};
use crate::validator::Validator;

/// Tunables for one planning run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerSettings {
    pub limits: VisibilityLimits,
    pub twilight_altitude_deg: f64,
    pub slew_allowance_min: f64,
    pub max_nights: usize,
    pub max_deferrals: usize,
    pub min_duration_min: f64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self::from(&ObservatoryConfig::default())
    }
}

impl From<&ObservatoryConfig> for SchedulerSettings {
    fn from(config: &ObservatoryConfig) -> Self {
        Self {
            limits: VisibilityLimits::from(&config.constraints),
            twilight_altitude_deg: config.site.twilight_altitude_deg,
            slew_allowance_min: config.allocation.slew_allowance_min,
            max_nights: config.allocation.max_nights,
            max_deferrals: config.allocation.max_deferrals,
            min_duration_min: config.allocation.min_duration_min,
        }
    }
}

/// How many requests each stage let through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterCounts {
    pub candidates: usize,
    pub dropped_by_time: usize,
    pub dropped_by_astronomy: usize,
}

/// Result of a planning run.
#[derive(Debug, Clone, PartialEq)]
pub struct NightPlan {
    pub now_jd: f64,
    /// Night 0 followed by every later night the plan uses.
    pub nights: Vec<NightWindow>,
    /// Ordered by execution.
    pub entries: Vec<ScheduledEntry>,
    pub infeasible: Vec<InfeasibleRequest>,
    pub deferred: Vec<ObservationRequest>,
    pub counts: FilterCounts,
    pub requeued: usize,
}

impl NightPlan {
    pub fn first_night(&self) -> Option<&NightWindow> {
        self.nights.first()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Planner bound to a clock and a sky provider.
pub struct NightScheduler<C, S> {
    clock: C,
    sky: S,
    settings: SchedulerSettings,
}

impl<C: Clock, S: SkyProvider> NightScheduler<C, S> {
    pub fn new(clock: C, sky: S, settings: SchedulerSettings) -> Self {
        Self {
            clock,
            sky,
            settings,
        }
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Plan the current (or coming) night from the clock's time.
    pub fn plan(&self, requests: Vec<ObservationRequest>) -> Result<NightPlan, SchedulerError> {
        let now_jd = self.clock.now_jd();
        let nights =
            TwilightNights::locate(self.sky.site(), self.settings.twilight_altitude_deg, now_jd)?;
        self.plan_with(&nights, now_jd, requests)
    }

    /// Plan against an explicit night source.
    pub fn plan_with<N: NightSource + ?Sized>(
        &self,
        nights: &N,
        now_jd: f64,
        mut requests: Vec<ObservationRequest>,
    ) -> Result<NightPlan, SchedulerError> {
        let settings = &self.settings;
        for request in &mut requests {
            request.reset_run_state();
            if request.enforce_min_duration(settings.min_duration_min) {
                warn!(
                    id = %request.id,
                    minutes = settings.min_duration_min,
                    "non-positive duration replaced by the minimum"
                );
            }
        }

        let tonight = nights.night(0)?;
        let candidates = requests.len();

        let timely = filter_by_time(requests, now_jd, &tonight);
        let dropped_by_time = candidates - timely.len();

        let site = self.sky.site();
        let moon = self.sky.moon_at(now_jd);
        let timely_count = timely.len();
        let mut visible =
            filter_by_astronomy(timely, &site, &moon, site.lst_hours(now_jd), &settings.limits);
        let dropped_by_astronomy = timely_count - visible.len();

        score_all(&mut visible);
        rank(&mut visible);

        let allocator =
            WindowAllocator::new(nights, settings.slew_allowance_min, settings.max_nights);
        let allocation = allocator.allocate(visible)?;
        let validator = Validator::new(allocator, &self.sky, settings.limits, settings.max_deferrals);
        let validated = validator.validate(allocation)?;

        let mut used: Vec<NightWindow> = vec![tonight];
        for entry in &validated.entries {
            if !used.iter().any(|night| night.index == entry.night.index) {
                used.push(entry.night);
            }
        }
        used.sort_by_key(|night| night.index);

        let counts = FilterCounts {
            candidates,
            dropped_by_time,
            dropped_by_astronomy,
        };
        info!(
            candidates,
            dropped_by_time,
            dropped_by_astronomy,
            scheduled = validated.entries.len(),
            infeasible = validated.infeasible.len(),
            deferred = validated.deferred.len(),
            "night plan ready"
        );

        Ok(NightPlan {
            now_jd,
            nights: used,
            entries: validated.entries,
            infeasible: validated.infeasible,
            deferred: validated.deferred,
            counts,
            requeued: validated.requeued,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::tests::{BASE_JD, FixedNights, request};
    use crate::providers::{FixedClock, StaticSky};
    use nightplan_astro::{Equatorial, Site};

    fn scheduler() -> NightScheduler<FixedClock, StaticSky> {
        let site = Site::new(43.0, -81.0);
        let moon_ra = (site.lst_hours(BASE_JD) * 15.0 + 180.0).rem_euclid(360.0);
        NightScheduler::new(
            FixedClock(BASE_JD + 0.001),
            StaticSky::new(site, Equatorial::new(moon_ra, -60.0)),
            SchedulerSettings::default(),
        )
    }

    fn overhead(id: usize, priority: f64, duration_min: f64) -> ObservationRequest {
        let site = Site::new(43.0, -81.0);
        let mut r = request(id, duration_min).with_priority(priority);
        r.target = Equatorial::new(site.lst_hours(BASE_JD) * 15.0, 43.0);
        r
    }

    #[test]
    fn higher_priority_goes_first() {
        let s = scheduler();
        let plan = s
            .plan_with(&FixedNights, BASE_JD + 0.001, vec![overhead(1, 1.0, 20.0), overhead(2, 5.0, 20.0)])
            .unwrap();
        assert_eq!(plan.entries[0].request.id.0, 2);
        assert_eq!(plan.entries[1].request.id.0, 1);
        assert!(plan.entries[0].request.score.unwrap() > plan.entries[1].request.score.unwrap());
        assert_eq!(plan.nights.len(), 1);
    }

    #[test]
    fn zero_duration_gets_minimum() {
        let plan = scheduler()
            .plan_with(&FixedNights, BASE_JD + 0.001, vec![overhead(1, 1.0, 0.0)])
            .unwrap();
        let entry = &plan.entries[0];
        assert_eq!(entry.request.duration_min, 5.0);
        assert!((entry.end_jd() - entry.start_jd() - 5.0 / 1_440.0).abs() < 1e-8);
    }

    #[test]
    fn counts_report_each_filter() {
        let mut late = overhead(1, 1.0, 20.0);
        late.set_window(
            crate::request::ObservationWindow::from_jd(BASE_JD + 0.2, BASE_JD + 0.4).unwrap(),
        );
        let mut low = overhead(2, 1.0, 20.0);
        low.target = Equatorial::new(low.target.ra_deg, -60.0);
        let plan = scheduler()
            .plan_with(&FixedNights, BASE_JD + 0.001, vec![late, low, overhead(3, 1.0, 20.0)])
            .unwrap();
        assert_eq!(
            plan.counts,
            FilterCounts {
                candidates: 3,
                dropped_by_time: 1,
                dropped_by_astronomy: 1,
            }
        );
        assert_eq!(plan.entries.len(), 1);
    }

    #[test]
    fn stale_scores_are_cleared() {
        let mut r = overhead(1, 1.0, 60.0);
        r.score = Some(1e9);
        let plan = scheduler().plan_with(&FixedNights, BASE_JD + 0.001, vec![r]).unwrap();
        assert!(plan.entries[0].request.score.unwrap() < 2.0);
    }

    #[test]
    fn empty_pool_gives_empty_plan() {
        let plan = scheduler().plan_with(&FixedNights, BASE_JD + 0.001, Vec::new()).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.first_night().unwrap().index, 0);
    }
}
