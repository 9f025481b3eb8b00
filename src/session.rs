//! One scheduling run against a request store.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use nightplan_astro::{AstroError, Equatorial, Site, format_utc, julian_date_to_utc};
use nightplan_config::ObservatoryConfig;
use nightplan_export::plan::{self as plan_csv, Record};
use nightplan_export::summary::{self as export_summary, ExcludedRequest, NightSummary, PlanSummary};
use nightplan_scheduler::{
    Clock, NightPlan, NightScheduler, ObservationRequest, SchedulerError, SchedulerSettings,
    StaticSky,
};
use nightplan_store::{RequestStore, RowError, StoreError};
use thiserror::Error;
use tracing::info;

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error(transparent)]
    Astro(#[from] AstroError),
    #[error("failed to export plan: {0}")]
    Export(#[from] io::Error),
}

/// Outcome of [`Session::schedule`].
#[derive(Debug, Clone)]
pub struct ScheduleReport {
    pub plan: NightPlan,
    pub skipped: Vec<RowError>,
}

/// Observatory configuration plus the Moon position for the run.
#[derive(Debug, Clone)]
pub struct Session {
    config: ObservatoryConfig,
    moon: Equatorial,
}

impl Session {
    pub fn new(config: ObservatoryConfig, moon: Equatorial) -> Self {
        Self { config, moon }
    }

    pub fn site(&self) -> Site {
        Site::new(self.config.site.latitude_deg, self.config.site.longitude_deg)
    }

    /// Load pending requests, plan the night, and write the allocation back.
    pub fn schedule<C: Clock>(
        &self,
        store: &RequestStore,
        clock: C,
    ) -> Result<ScheduleReport, RunError> {
        let loaded = store.load_pending()?;
        let scheduler = NightScheduler::new(
            clock,
            StaticSky::new(self.site(), self.moon),
            SchedulerSettings::from(&self.config),
        );
        let plan = scheduler.plan(loaded.pending)?;
        store.persist(&plan)?;
        Ok(ScheduleReport {
            plan,
            skipped: loaded.skipped,
        })
    }
}

fn utc_label(jd: f64) -> Result<String, AstroError> {
    Ok(format_utc(&julian_date_to_utc(jd)?))
}

fn excluded(request: &ObservationRequest, reason: String) -> ExcludedRequest {
    ExcludedRequest {
        id: request.id.0,
        directory_name: request.directory_name.clone(),
        reason,
    }
}

/// JSON summary of a plan.
pub fn plan_summary(plan: &NightPlan) -> Result<PlanSummary, AstroError> {
    let nights = plan
        .nights
        .iter()
        .map(|night| -> Result<NightSummary, AstroError> {
            Ok(NightSummary {
                index: night.index,
                sunset_jd: night.sunset_jd,
                sunrise_jd: night.sunrise_jd,
                sunset_utc: utc_label(night.sunset_jd)?,
                sunrise_utc: utc_label(night.sunrise_jd)?,
                length_hours: night.length_days() * 24.0,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PlanSummary {
        generated_jd: plan.now_jd,
        generated_utc: utc_label(plan.now_jd)?,
        nights,
        candidates: plan.counts.candidates,
        dropped_by_time: plan.counts.dropped_by_time,
        dropped_by_astronomy: plan.counts.dropped_by_astronomy,
        scheduled: plan.entries.len(),
        requeued: plan.requeued,
        infeasible: plan
            .infeasible
            .iter()
            .map(|item| excluded(&item.request, item.error.to_string()))
            .collect(),
        deferred: plan
            .deferred
            .iter()
            .map(|request| excluded(request, "not visible in its slot".to_string()))
            .collect(),
    })
}

/// Write the ordered plan CSV to `output` (`-` for stdout) and, for a file
/// target, the JSON summary next to it. Returns the summary path.
pub fn export_plan(plan: &NightPlan, output: &Path) -> Result<Option<PathBuf>, RunError> {
    let labels: Vec<(String, String)> = plan
        .entries
        .iter()
        .map(|entry| {
            let window = entry.request.window();
            (format_utc(&window.start_utc()), format_utc(&window.end_utc()))
        })
        .collect();
    let records: Vec<Record<'_>> = plan
        .entries
        .iter()
        .zip(&labels)
        .map(|(entry, (start, end))| {
            let request = &entry.request;
            Record {
                directory_name: &request.directory_name,
                priority: request.priority,
                ra_deg: request.target.ra_deg,
                dec_deg: request.target.dec_deg,
                start_utc: start,
                end_utc: end,
                duration_min: request.duration_min,
                exposure_sec: request.exposure_sec,
                filter: &request.filter,
                binning: &request.binning,
                night: entry.night.index,
                altitude_deg: request.altitude_deg,
                moon_angle_deg: request.moon_angle_deg,
                score: request.score,
            }
        })
        .collect();

    let mut writer = plan_csv::writer_for_path(output)?;
    plan_csv::write_plan(writer.as_mut(), &records)?;
    writer.flush()?;

    if output == Path::new("-") {
        return Ok(None);
    }
    let summary = plan_summary(plan)?;
    let path = export_summary::write_sidecar(output, &summary)?;
    info!(plan = %output.display(), summary = %path.display(), "plan exported");
    Ok(Some(path))
}
