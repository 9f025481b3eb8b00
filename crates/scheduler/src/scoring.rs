//! Request scoring and ranking.

use nightplan_astro::airmass;

use crate::request::ObservationRequest;

/// `(duration / 60) * priority / airmass(altitude)`.
pub fn score(duration_min: f64, priority: f64, altitude_deg: f64) -> f64 {
    (duration_min / 60.0) * priority / airmass(altitude_deg)
}

/// Score every request from its filter-time altitude.
///
/// A request without a computed altitude is scored as if on the horizon.
pub fn score_all(requests: &mut [ObservationRequest]) {
    for request in requests {
        let altitude = request.altitude_deg.unwrap_or(0.0);
        request.score = Some(score(request.duration_min, request.priority, altitude));
    }
}

/// Stable sort, highest score first. Ties keep input order.
pub fn rank(requests: &mut [ObservationRequest]) {
    requests.sort_by(|a, b| {
        let a = a.score.unwrap_or(f64::NEG_INFINITY);
        let b = b.score.unwrap_or(f64::NEG_INFINITY);
        b.total_cmp(&a)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{ObservationWindow, RequestId};
    use nightplan_astro::Equatorial;

    fn scored(id: usize, value: f64) -> ObservationRequest {
        let mut r = ObservationRequest::new(
            RequestId(id),
            format!("r{id}"),
            Equatorial::new(0.0, 0.0),
            ObservationWindow::from_jd(2_460_000.5, 2_460_000.9).unwrap(),
        );
        r.score = Some(value);
        r
    }

    #[test]
    fn zenith_hour_scores_priority() {
        assert!((score(60.0, 4.0, 90.0) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn score_grows_with_priority_and_altitude() {
        assert!(score(30.0, 5.0, 45.0) > score(30.0, 1.0, 45.0));
        assert!(score(30.0, 1.0, 60.0) > score(30.0, 1.0, 20.0));
    }

    #[test]
    fn horizon_score_stays_finite() {
        let s = score(30.0, 1.0, -5.0);
        assert!(s.is_finite() && s > 0.0);
    }

    #[test]
    fn rank_is_descending_and_stable() {
        let mut requests = vec![scored(1, 1.0), scored(2, 3.0), scored(3, 1.0), scored(4, 2.0)];
        rank(&mut requests);
        let ids: Vec<usize> = requests.iter().map(|r| r.id.0).collect();
        assert_eq!(ids, vec![2, 4, 1, 3]);
    }

    #[test]
    fn score_all_uses_recorded_altitude() {
        let mut requests = vec![scored(1, 0.0)];
        requests[0].altitude_deg = Some(90.0);
        requests[0].priority = 2.0;
        requests[0].duration_min = 30.0;
        score_all(&mut requests);
        assert!((requests[0].score.unwrap() - 1.0).abs() < 1e-12);
    }
}
