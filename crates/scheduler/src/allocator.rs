//! Sequential window allocation with rollover into later nights.
//!
//! The allocator walks the ranked requests once. Each request is anchored at
//! sunset when it opens a night, otherwise one slew allowance after the
//! previous slot. A slot that would not finish by sunrise rolls the cursor over
//! to the next night and the same request is tried again, up to the night cap.

use nightplan_core::time::minutes_to_days;
use tracing::{debug, warn};

use crate::SchedulerError;
use crate::night::{NightSource, NightWindow};
use crate::request::{ObservationRequest, ObservationWindow};

/// Allocator state machine phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationPhase {
    /// Next slot starts exactly at the current night's sunset.
    AwaitingSunset,
    /// Next slot starts one slew allowance after the cursor.
    Allocating,
    /// The current night cannot hold the pending request.
    NightExhausted,
    Done,
}

/// Cursor over the nights available to the allocator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllocatorState {
    pub phase: AllocationPhase,
    pub night: NightWindow,
    /// End of the last allocated slot, or sunset when awaiting it.
    pub cursor_jd: f64,
}

impl AllocatorState {
    pub fn at_sunset(night: NightWindow) -> Self {
        Self {
            phase: AllocationPhase::AwaitingSunset,
            night,
            cursor_jd: night.sunset_jd,
        }
    }

    /// Continue after a slot ending at `cursor_jd` on `night`.
    pub fn resume_after(night: NightWindow, cursor_jd: f64) -> Self {
        Self {
            phase: AllocationPhase::Allocating,
            night,
            cursor_jd,
        }
    }
}

/// A request with its allocated window and the night it falls in.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledEntry {
    /// The window of this request is the allocated one.
    pub request: ObservationRequest,
    pub night: NightWindow,
}

impl ScheduledEntry {
    pub fn start_jd(&self) -> f64 {
        self.request.window().start_jd()
    }

    pub fn end_jd(&self) -> f64 {
        self.request.window().end_jd()
    }
}

/// A request the allocator could not place.
#[derive(Debug, Clone, PartialEq)]
pub struct InfeasibleRequest {
    pub request: ObservationRequest,
    pub error: SchedulerError,
}

/// Output of one allocation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Allocation {
    pub entries: Vec<ScheduledEntry>,
    pub infeasible: Vec<InfeasibleRequest>,
    /// Allocator state after the last request, in phase `Done`.
    pub final_state: Option<AllocatorState>,
}

/// Greedy sequential allocator over a [`NightSource`].
#[derive(Debug)]
pub struct WindowAllocator<'a, N: ?Sized> {
    nights: &'a N,
    slew_days: f64,
    max_nights: usize,
}

impl<'a, N: NightSource + ?Sized> WindowAllocator<'a, N> {
    pub fn new(nights: &'a N, slew_allowance_min: f64, max_nights: usize) -> Self {
        Self {
            nights,
            slew_days: minutes_to_days(slew_allowance_min),
            max_nights: max_nights.max(1),
        }
    }

    /// Allocate `ranked` starting at the sunset of night 0.
    pub fn allocate(&self, ranked: Vec<ObservationRequest>) -> Result<Allocation, SchedulerError> {
        if ranked.is_empty() {
            return Ok(Allocation::default());
        }
        let first = self.nights.night(0)?;
        self.allocate_from(AllocatorState::at_sunset(first), ranked)
    }

    /// Allocate `ranked` continuing from an existing state.
    pub fn allocate_from(
        &self,
        mut state: AllocatorState,
        ranked: Vec<ObservationRequest>,
    ) -> Result<Allocation, SchedulerError> {
        let mut allocation = Allocation::default();
        for mut request in ranked {
            match self.place(&mut state, &request) {
                Ok((night, start_jd, end_jd)) => {
                    request.set_window(ObservationWindow::from_jd(start_jd, end_jd)?);
                    debug!(id = %request.id, night = night.index, start_jd, end_jd, "allocated");
                    allocation.entries.push(ScheduledEntry { request, night });
                }
                Err(error @ SchedulerError::SchedulingInfeasible { .. }) => {
                    warn!(id = %request.id, name = %request.directory_name, "{error}");
                    allocation.infeasible.push(InfeasibleRequest { request, error });
                }
                Err(other) => return Err(other),
            }
        }
        state.phase = AllocationPhase::Done;
        allocation.final_state = Some(state);
        Ok(allocation)
    }

    /// Find the slot for one request. On infeasibility the state is left as
    /// it was before the attempt.
    fn place(
        &self,
        state: &mut AllocatorState,
        request: &ObservationRequest,
    ) -> Result<(NightWindow, f64, f64), SchedulerError> {
        let before = *state;
        let duration = minutes_to_days(request.duration_min);
        loop {
            let start_jd = match state.phase {
                AllocationPhase::AwaitingSunset => state.cursor_jd,
                _ => state.cursor_jd + self.slew_days,
            };
            let end_jd = start_jd + duration;

            if start_jd > state.night.sunrise_jd || end_jd > state.night.sunrise_jd {
                state.phase = AllocationPhase::NightExhausted;
                let next = state.night.index + 1;
                if next >= self.max_nights {
                    *state = before;
                    return Err(SchedulerError::SchedulingInfeasible {
                        id: request.id,
                        duration_min: request.duration_min,
                        max_nights: self.max_nights,
                    });
                }
                let night = self.nights.night(next)?;
                debug!(id = %request.id, night = next, "rolling over to next night");
                *state = AllocatorState::at_sunset(night);
                continue;
            }

            state.phase = AllocationPhase::Allocating;
            state.cursor_jd = end_jd;
            return Ok((state.night, start_jd, end_jd));
        }
    }
}
