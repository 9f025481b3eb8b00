//! Export helpers for CSV and JSON artifacts.

pub mod plan {
    use std::fs::{self, File};
    use std::io::{self, BufWriter, Write};
    use std::path::Path;

    pub const HEADER: [&str; 14] = [
        "Directory Name",
        "Priority",
        "RA",
        "Dec",
        "Start Time",
        "End Time",
        "Obs Duration",
        "Exposure Time",
        "Filter",
        "Binning",
        "Night",
        "Altitude",
        "Moon Angle",
        "Score",
    ];

    /// Create a writer for the target path, handling stdout (`-`) by convention.
    pub fn writer_for_path(path: &Path) -> io::Result<Box<dyn Write>> {
        if path == Path::new("-") {
            return Ok(Box::new(BufWriter::new(io::stdout())));
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        Ok(Box::new(BufWriter::new(file)))
    }

    /// One scheduled slot in execution order.
    #[derive(Debug, Clone)]
    pub struct Record<'a> {
        pub directory_name: &'a str,
        pub priority: f64,
        pub ra_deg: f64,
        pub dec_deg: f64,
        pub start_utc: &'a str,
        pub end_utc: &'a str,
        pub duration_min: f64,
        pub exposure_sec: f64,
        pub filter: &'a str,
        pub binning: &'a str,
        pub night: usize,
        pub altitude_deg: Option<f64>,
        pub moon_angle_deg: Option<f64>,
        pub score: Option<f64>,
    }

    fn optional(value: Option<f64>, precision: usize) -> String {
        value
            .map(|v| format!("{v:.precision$}"))
            .unwrap_or_default()
    }

    impl Record<'_> {
        fn fields(&self) -> [String; 14] {
            [
                self.directory_name.to_string(),
                self.priority.to_string(),
                format!("{:.4}", self.ra_deg),
                format!("{:.4}", self.dec_deg),
                self.start_utc.to_string(),
                self.end_utc.to_string(),
                self.duration_min.to_string(),
                self.exposure_sec.to_string(),
                self.filter.to_string(),
                self.binning.to_string(),
                self.night.to_string(),
                optional(self.altitude_deg, 2),
                optional(self.moon_angle_deg, 2),
                optional(self.score, 4),
            ]
        }
    }

    /// Write the header and every record, in order.
    pub fn write_plan(writer: &mut dyn Write, records: &[Record<'_>]) -> io::Result<()> {
        let mut out = csv::Writer::from_writer(writer);
        out.write_record(HEADER)?;
        for record in records {
            out.write_record(record.fields())?;
        }
        out.flush()
    }
}

pub mod summary {
    use serde::Serialize;
    use serde_json::to_writer_pretty;
    use std::fs::{self, File};
    use std::io;
    use std::path::{Path, PathBuf};

    /// Twilight bounds of one night used by the plan.
    #[derive(Debug, Clone, Serialize)]
    pub struct NightSummary {
        pub index: usize,
        pub sunset_jd: f64,
        pub sunrise_jd: f64,
        pub sunset_utc: String,
        pub sunrise_utc: String,
        pub length_hours: f64,
    }

    /// A request left out of the plan and why.
    #[derive(Debug, Clone, Serialize)]
    pub struct ExcludedRequest {
        pub id: usize,
        pub directory_name: String,
        pub reason: String,
    }

    /// Run-level summary written next to the plan CSV.
    #[derive(Debug, Clone, Serialize)]
    pub struct PlanSummary {
        pub generated_jd: f64,
        pub generated_utc: String,
        pub nights: Vec<NightSummary>,
        pub candidates: usize,
        pub dropped_by_time: usize,
        pub dropped_by_astronomy: usize,
        pub scheduled: usize,
        pub requeued: usize,
        pub infeasible: Vec<ExcludedRequest>,
        pub deferred: Vec<ExcludedRequest>,
    }

    /// `<dir>/<stem>_summary.json` for a plan written to `output`.
    pub fn sidecar_path(output: &Path) -> PathBuf {
        let parent = output.parent().unwrap_or_else(|| Path::new("."));
        let stem = output
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("plan");
        parent.join(format!("{}_summary.json", stem))
    }

    /// Write the JSON sidecar for `output` and return its path.
    pub fn write_sidecar(output: &Path, summary: &PlanSummary) -> io::Result<PathBuf> {
        let path = sidecar_path(output);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        to_writer_pretty(File::create(&path)?, summary)?;
        Ok(path)
    }
}
