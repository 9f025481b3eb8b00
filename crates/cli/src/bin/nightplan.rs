use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use nightplan::astro::{Equatorial, format_utc, julian_date_to_utc, parse_utc, utc_to_julian_date};
use nightplan::config::{ObservatoryConfig, load_config};
use nightplan::scheduler::{FixedClock, NightPlan, RequestId, SystemClock};
use nightplan::session::{ScheduleReport, Session, export_plan};
use nightplan::store::{RequestStore, Submission};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Plan a night of observations from a CSV request store.
#[derive(Parser, Debug)]
#[command(author, version, about = "Nightly observation scheduler")]
struct Cli {
    /// Observatory configuration (TOML or YAML); built-in defaults when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Plan the current night and write the allocated windows back to the store
    Schedule(ScheduleArgs),
    /// Validate a new request and append it to the store
    Submit(SubmitArgs),
    /// Count total and pending requests
    Status {
        /// Request store (CSV)
        #[arg(long)]
        requests: PathBuf,
    },
    /// Mark a request (1-based data row) as completed
    Complete {
        /// Request store (CSV)
        #[arg(long)]
        requests: PathBuf,
        id: usize,
    },
}

#[derive(Args, Debug)]
struct ScheduleArgs {
    /// Request store (CSV)
    #[arg(long)]
    requests: PathBuf,

    /// Current time as YYYY:MM:DD:HH:mm UTC (defaults to the system clock)
    #[arg(long)]
    now: Option<String>,

    /// Moon right ascension in degrees
    #[arg(long, allow_negative_numbers = true)]
    moon_ra: f64,

    /// Moon declination in degrees
    #[arg(long, allow_negative_numbers = true)]
    moon_dec: f64,

    /// Write the ordered plan CSV here (`-` for stdout) with a JSON summary alongside
    #[arg(long)]
    plan: Option<PathBuf>,

    /// Site latitude in degrees (overrides configuration)
    #[arg(long, allow_negative_numbers = true)]
    latitude: Option<f64>,

    /// Site east longitude in degrees (overrides configuration)
    #[arg(long, allow_negative_numbers = true)]
    longitude: Option<f64>,

    /// Minimum target altitude in degrees (overrides configuration)
    #[arg(long, allow_negative_numbers = true)]
    elevation_limit: Option<f64>,

    /// Minimum Moon separation in degrees (overrides configuration)
    #[arg(long)]
    min_moon_offset: Option<f64>,

    /// Slew allowance between targets in minutes (overrides configuration)
    #[arg(long)]
    slew: Option<f64>,

    /// Number of nights the plan may span (overrides configuration)
    #[arg(long)]
    max_nights: Option<usize>,
}

#[derive(Args, Debug)]
struct SubmitArgs {
    /// Request store (CSV); created with a header when missing
    #[arg(long)]
    requests: PathBuf,

    #[arg(long)]
    name: String,

    /// Integer priority 1-10
    #[arg(long, allow_negative_numbers = true)]
    priority: i64,

    /// Right ascension in degrees
    #[arg(long, allow_negative_numbers = true)]
    ra: f64,

    /// Declination in degrees
    #[arg(long, allow_negative_numbers = true)]
    dec: f64,

    /// Window start, YYYY:MM:DD:HH:mm UTC
    #[arg(long)]
    start: String,

    /// Window end, YYYY:MM:DD:HH:mm UTC
    #[arg(long)]
    end: String,

    /// Observation duration in minutes
    #[arg(long, allow_negative_numbers = true)]
    duration: i64,

    /// Exposure time in seconds
    #[arg(long, allow_negative_numbers = true)]
    exposure: f64,

    /// Filter slot (1-3)
    #[arg(long, default_value_t = 1)]
    filter: u8,

    /// Binning (1 or 2)
    #[arg(long, default_value_t = 1)]
    binning: u8,
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => ObservatoryConfig::default(),
    };

    match cli.command {
        Command::Schedule(args) => schedule(config, args),
        Command::Submit(args) => submit(args),
        Command::Status { requests } => {
            let status = RequestStore::new(&requests).status()?;
            println!("Requests  : {}", status.total);
            println!("Pending   : {}", status.pending);
            println!("Completed : {}", status.completed);
            if status.malformed > 0 {
                println!("Malformed : {}", status.malformed);
            }
            Ok(())
        }
        Command::Complete { requests, id } => {
            RequestStore::new(&requests).mark_completed(RequestId(id))?;
            println!("Request {} marked completed", RequestId(id));
            Ok(())
        }
    }
}

fn schedule(mut config: ObservatoryConfig, args: ScheduleArgs) -> anyhow::Result<()> {
    if let Some(latitude) = args.latitude {
        config.site.latitude_deg = latitude;
    }
    if let Some(longitude) = args.longitude {
        config.site.longitude_deg = longitude;
    }
    if let Some(limit) = args.elevation_limit {
        config.constraints.elevation_limit_deg = limit;
    }
    if let Some(offset) = args.min_moon_offset {
        config.constraints.min_moon_offset_deg = offset;
    }
    if let Some(slew) = args.slew {
        config.allocation.slew_allowance_min = slew;
    }
    if let Some(nights) = args.max_nights {
        config.allocation.max_nights = nights;
    }
    config.validate()?;

    let store = RequestStore::new(&args.requests);
    let session = Session::new(config, Equatorial::new(args.moon_ra, args.moon_dec));
    let report = match &args.now {
        Some(now) => {
            let now_jd = utc_to_julian_date(&parse_utc(now)?);
            session.schedule(&store, FixedClock(now_jd))?
        }
        None => session.schedule(&store, SystemClock)?,
    };
    info!(store = %args.requests.display(), "schedule written back");

    print_report(&report)?;

    if let Some(output) = &args.plan {
        if let Some(summary) = export_plan(&report.plan, output)? {
            eprintln!("Summary written to {}", summary.display());
        }
    }
    Ok(())
}

fn utc(jd: f64) -> anyhow::Result<String> {
    Ok(format_utc(&julian_date_to_utc(jd)?))
}

fn print_nights(plan: &NightPlan) -> anyhow::Result<()> {
    for night in &plan.nights {
        let minutes = (night.length_days() * 1_440.0).round() as i64;
        println!("=== Night {} ===", night.index);
        println!("Sunset  : {} UTC (JD {:.5})", utc(night.sunset_jd)?, night.sunset_jd);
        println!("Sunrise : {} UTC (JD {:.5})", utc(night.sunrise_jd)?, night.sunrise_jd);
        println!("Length  : {}h {:02}m", minutes / 60, minutes % 60);
    }
    Ok(())
}

fn print_report(report: &ScheduleReport) -> anyhow::Result<()> {
    let plan = &report.plan;
    print_nights(plan)?;

    println!("=== Plan ===");
    if plan.entries.is_empty() {
        println!("(nothing to observe)");
    }
    for (position, entry) in plan.entries.iter().enumerate() {
        let request = &entry.request;
        println!(
            "{:>3}. {:<20} {} -> {}  night {}  alt {:>5.1}  score {:.4}",
            position + 1,
            request.directory_name,
            format_utc(&request.window().start_utc()),
            format_utc(&request.window().end_utc()),
            entry.night.index,
            request.altitude_deg.unwrap_or(f64::NAN),
            request.score.unwrap_or_default(),
        );
    }

    let counts = &plan.counts;
    println!(
        "Candidates: {}, outside window: {}, not visible: {}",
        counts.candidates, counts.dropped_by_time, counts.dropped_by_astronomy
    );
    for item in &plan.infeasible {
        println!("Infeasible: {} ({})", item.request.directory_name, item.error);
    }
    for request in &plan.deferred {
        println!("Deferred  : {} {}", request.id, request.directory_name);
    }
    for skipped in &report.skipped {
        println!("Skipped   : {skipped}");
    }
    Ok(())
}

fn submit(args: SubmitArgs) -> anyhow::Result<()> {
    let submission = Submission {
        directory_name: args.name,
        priority: args.priority,
        ra_deg: args.ra,
        dec_deg: args.dec,
        start: args.start,
        end: args.end,
        duration_min: args.duration,
        exposure_sec: args.exposure,
        filter: args.filter,
        binning: args.binning,
    };
    let id = RequestStore::new(&args.requests).submit(&submission)?;
    println!("Request {} added to {}", id, args.requests.display());
    Ok(())
}
