use chrono::{NaiveDate, TimeDelta};
use nightplan::astro::{
    Equatorial, Site, altitude_deg, angular_separation_deg, julian_date_to_utc, parse_utc,
    twilight_times, utc_to_julian_date,
};
use nightplan::scheduler::{
    FixedClock, NightScheduler, ObservationRequest, ObservationWindow, RequestId,
    SchedulerSettings, StaticSky, score,
};

/// Small deterministic generator so the pools are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next_unit(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }

    fn range(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_unit()
    }
}

#[test]
fn julian_date_round_trips_within_a_second() {
    let mut t = NaiveDate::from_ymd_opt(1600, 3, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let end = NaiveDate::from_ymd_opt(2100, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let step = TimeDelta::days(37) + TimeDelta::seconds(3_907);
    while t < end {
        let back = julian_date_to_utc(utc_to_julian_date(&t)).unwrap();
        let drift = (back - t).num_milliseconds().abs();
        assert!(drift <= 1_000, "{t} came back as {back}");
        t += step;
    }
}

#[test]
fn score_is_monotonic_in_priority_and_altitude() {
    for duration in [10.0, 30.0, 90.0] {
        for altitude in [5.0, 20.0, 45.0, 80.0] {
            for priority in 1..10 {
                let p = priority as f64;
                assert!(score(duration, p + 1.0, altitude) > score(duration, p, altitude));
                // higher altitude, lower airmass
                assert!(score(duration, p, altitude + 5.0) > score(duration, p, altitude));
            }
        }
    }
}

fn random_pool(rng: &mut Lcg, sunset: f64, sunrise: f64, count: usize) -> Vec<ObservationRequest> {
    let window = ObservationWindow::from_jd(sunset, sunrise).unwrap();
    (1..=count)
        .map(|id| {
            let target = Equatorial::new(rng.range(0.0, 360.0), rng.range(-20.0, 85.0));
            ObservationRequest::new(RequestId(id), format!("field-{id}"), target, window)
                .with_priority(rng.range(1.0, 10.0).round())
                .with_duration_min(rng.range(10.0, 90.0).round())
        })
        .collect()
}

#[test]
fn plans_respect_packing_containment_and_visibility() {
    let site = Site::new(43.0, -81.0);
    let settings = SchedulerSettings::default();
    let slew = settings.slew_allowance_min / 1_440.0;
    let mut rng = Lcg(0x5eed);

    for day in ["2025:01:15", "2025:03:20", "2025:06:21", "2025:10:02"] {
        let afternoon = utc_to_julian_date(&parse_utc(&format!("{day}:18:00")).unwrap());
        let sunset = twilight_times(afternoon, 43.0, -81.0).unwrap().sunset_jd;
        let sunrise = twilight_times(afternoon + 1.0, 43.0, -81.0).unwrap().sunrise_jd;
        let moon = Equatorial::new(rng.range(0.0, 360.0), rng.range(-25.0, 25.0));
        let scheduler = NightScheduler::new(
            FixedClock(sunset + 2.0 / 1_440.0),
            StaticSky::new(site, moon),
            settings,
        );
        let plan = scheduler
            .plan(random_pool(&mut rng, sunset, sunrise, 40))
            .unwrap();
        assert!(!plan.entries.is_empty(), "nothing scheduled on {day}");

        for entry in &plan.entries {
            let (start, end) = (entry.start_jd(), entry.end_jd());
            assert!(start <= end);
            assert!(entry.night.contains(start, end), "{} escapes its night", entry.request.id);
            for jd in [start, end] {
                let target = entry.request.target;
                let altitude = altitude_deg(
                    target.ra_deg,
                    target.dec_deg,
                    site.latitude_deg,
                    site.lst_hours(jd),
                );
                let moon_angle =
                    angular_separation_deg(target.ra_deg, target.dec_deg, moon.ra_deg, moon.dec_deg);
                assert!(altitude > settings.limits.elevation_limit_deg);
                assert!(moon_angle > settings.limits.min_moon_offset_deg);
            }
        }
        for pair in plan.entries.windows(2) {
            assert!(pair[1].night.index >= pair[0].night.index);
            if pair[1].night.index == pair[0].night.index {
                assert!(pair[1].start_jd() - pair[0].end_jd() >= slew - 1e-8);
            }
        }

        let accounted = plan.entries.len()
            + plan.infeasible.len()
            + plan.deferred.len()
            + plan.counts.dropped_by_time
            + plan.counts.dropped_by_astronomy;
        assert_eq!(accounted, plan.counts.candidates);
    }
}
