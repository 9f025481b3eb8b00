//! Second pass: re-check visibility at the allocated slot endpoints.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::SchedulerError;
use crate::allocator::{Allocation, AllocatorState, InfeasibleRequest, ScheduledEntry, WindowAllocator};
use crate::filter::{Visibility, VisibilityLimits};
use crate::night::NightSource;
use crate::providers::SkyProvider;
use crate::request::{ObservationRequest, RequestId};

/// Allocation that passed endpoint validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedPlan {
    pub entries: Vec<ScheduledEntry>,
    pub infeasible: Vec<InfeasibleRequest>,
    /// Requests that ran out of deferrals; they stay pending for a future run.
    pub deferred: Vec<ObservationRequest>,
    /// Number of times a failing request was moved to the tail and retried.
    pub requeued: usize,
}

/// Endpoint validator wrapping the allocator used for re-windowing.
pub struct Validator<'a, N: ?Sized, S: ?Sized> {
    allocator: WindowAllocator<'a, N>,
    sky: &'a S,
    limits: VisibilityLimits,
    max_deferrals: usize,
}

impl<'a, N, S> Validator<'a, N, S>
where
    N: NightSource + ?Sized,
    S: SkyProvider + ?Sized,
{
    pub fn new(
        allocator: WindowAllocator<'a, N>,
        sky: &'a S,
        limits: VisibilityLimits,
        max_deferrals: usize,
    ) -> Self {
        Self {
            allocator,
            sky,
            limits,
            max_deferrals,
        }
    }

    /// Geometry of the request's target at the start and end of its window.
    pub fn endpoints(&self, request: &ObservationRequest) -> [Visibility; 2] {
        let site = self.sky.site();
        let window = request.window();
        [window.start_jd(), window.end_jd()].map(|jd| {
            let moon = self.sky.moon_at(jd);
            self.limits
                .evaluate(&request.target, &site, &moon, site.lst_hours(jd))
        })
    }

    pub fn passes(&self, entry: &ScheduledEntry) -> bool {
        self.endpoints(&entry.request)
            .iter()
            .all(|visibility| self.limits.admits(visibility))
    }

    /// Validate until every entry passes at both endpoints.
    ///
    /// The first failing entry's slot is treated as consumed: everything
    /// after it is re-allocated from the end of that slot, with the failing
    /// request queued at the tail while it has deferrals left.
    pub fn validate(&self, allocation: Allocation) -> Result<ValidatedPlan, SchedulerError> {
        let Allocation {
            mut entries,
            mut infeasible,
            ..
        } = allocation;
        let mut deferred = Vec::new();
        let mut deferral_counts: HashMap<RequestId, usize> = HashMap::new();
        let mut requeued = 0;
        let mut verified = 0;

        while let Some(offset) = entries[verified..].iter().position(|entry| !self.passes(entry)) {
            let index = verified + offset;
            let mut rest = entries.split_off(index).into_iter();
            let Some(failed) = rest.next() else {
                break;
            };
            let resume = AllocatorState::resume_after(failed.night, failed.end_jd());
            let mut remainder: Vec<ObservationRequest> = rest.map(|entry| entry.request).collect();

            let count = deferral_counts.entry(failed.request.id).or_insert(0);
            if *count < self.max_deferrals {
                *count += 1;
                requeued += 1;
                info!(id = %failed.request.id, attempt = *count, "not visible in its slot, retrying later tonight");
                remainder.push(failed.request);
            } else {
                warn!(id = %failed.request.id, name = %failed.request.directory_name, "deferred to a future run");
                deferred.push(failed.request);
            }

            let reallocated = self.allocator.allocate_from(resume, remainder)?;
            entries.extend(reallocated.entries);
            infeasible.extend(reallocated.infeasible);
            verified = index;
        }

        for entry in &mut entries {
            let [start, _] = self.endpoints(&entry.request);
            entry.request.altitude_deg = Some(start.altitude_deg);
            entry.request.moon_angle_deg = Some(start.moon_angle_deg);
        }

        Ok(ValidatedPlan {
            entries,
            infeasible,
            deferred,
            requeued,
        })
    }
}
