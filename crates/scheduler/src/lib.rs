//! Nightly observation planning.
//!
//! Requests flow through [`filter`], [`scoring`], [`allocator`] and
//! [`validator`]; [`plan::NightScheduler`] runs the whole pipeline against an
//! injected [`providers::Clock`] and [`providers::SkyProvider`].

use nightplan_astro::AstroError;
use thiserror::Error;

pub mod allocator;
pub mod filter;
pub mod night;
pub mod plan;
pub mod providers;
pub mod request;
pub mod scoring;
pub mod validator;

pub use allocator::{
    Allocation, AllocationPhase, AllocatorState, InfeasibleRequest, ScheduledEntry,
    WindowAllocator,
};
pub use filter::{Visibility, VisibilityLimits, filter_by_astronomy, filter_by_time};
pub use night::{NightSource, NightWindow, TwilightNights};
pub use plan::{FilterCounts, NightPlan, NightScheduler, SchedulerSettings};
pub use providers::{Clock, FixedClock, SkyProvider, StaticSky, SystemClock};
pub use request::{ObservationRequest, ObservationWindow, RequestId};
pub use scoring::{rank, score, score_all};
pub use validator::{ValidatedPlan, Validator};

/// Errors raised while planning.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchedulerError {
    #[error(transparent)]
    Astro(#[from] AstroError),
    #[error(
        "request {id} ({duration_min} min) does not fit in the first {max_nights} night(s)"
    )]
    SchedulingInfeasible {
        id: RequestId,
        duration_min: f64,
        max_nights: usize,
    },
}
