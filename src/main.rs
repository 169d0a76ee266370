use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod chart;
mod dates;
mod db;
mod models;
mod persona;
mod report;
mod rollup;
mod source;
mod timeline;

use chart::ChartSeries;
use dates::NormalizedDate;
use models::{
    Diagnostics, Intervention, MemberProfile, PersonaMetric, StaffActivityRecord, StaffMetric,
};
use persona::{PersonaScorer, PlaceholderScorer};
use source::RecordSource;

const DEFAULT_SEED: u64 = 2025;

#[derive(Parser)]
#[command(name = "elyx-journey")]
#[command(about = "Member journey aggregation for the Elyx dashboard", long_about = None)]
struct Cli {
    /// Read CSV exports from this directory instead of Postgres
    #[arg(long, global = true)]
    csv_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Emit the journey timeline chart as JSON
    Timeline {
        #[arg(long)]
        member_id: i64,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Emit monthly staff hours as JSON
    StaffHours {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Emit placeholder persona metrics as JSON
    Persona {
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Emit every chart plus diagnostics as one JSON bundle
    Dashboard {
        #[arg(long)]
        member_id: i64,
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Generate a markdown journey report
    Report {
        #[arg(long)]
        member_id: i64,
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
        #[arg(long, default_value_t = 10)]
        communications: usize,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[derive(Serialize)]
struct PersonaOutput {
    metrics: Vec<PersonaMetric>,
    chart: ChartSeries,
}

#[derive(Serialize)]
struct ProfileOutput {
    #[serde(flatten)]
    profile: MemberProfile,
    age: Option<u32>,
}

#[derive(Serialize)]
struct DashboardOutput {
    member_id: i64,
    profile: Option<ProfileOutput>,
    timeline: ChartSeries,
    staff_hours: ChartSeries,
    persona: PersonaOutput,
    staff_metrics: Vec<StaffMetric>,
    timeline_diagnostics: Diagnostics,
    staff_diagnostics: Diagnostics,
    /// Staff activity rows with no staff name; counted but not charted.
    unattributed_staff_activity: usize,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn open_source(csv_dir: Option<PathBuf>) -> anyhow::Result<RecordSource> {
    if let Some(dir) = csv_dir {
        info!(dir = %dir.display(), "reading journey records from csv exports");
        return Ok(RecordSource::CsvDir(dir));
    }

    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set when --csv-dir is not given")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(RecordSource::Postgres(pool))
}

fn persona_output(seed: u64) -> anyhow::Result<PersonaOutput> {
    let metrics = PlaceholderScorer::new(seed).score();
    let chart = chart::persona_chart(&metrics)?;
    Ok(PersonaOutput { metrics, chart })
}

fn build_dashboard(
    member_id: i64,
    seed: u64,
    interventions: &[Intervention],
    activity: &[StaffActivityRecord],
    profile: Option<MemberProfile>,
    as_of: NormalizedDate,
) -> anyhow::Result<DashboardOutput> {
    let journey = timeline::aggregate(interventions);
    let staff = rollup::rollup(activity);

    Ok(DashboardOutput {
        member_id,
        profile: profile.map(|profile| ProfileOutput {
            age: profile.age_on(as_of),
            profile,
        }),
        timeline: journey.chart()?,
        staff_hours: staff.chart()?,
        persona: persona_output(seed)?,
        staff_metrics: rollup::staff_metrics(activity),
        timeline_diagnostics: journey.diagnostics,
        staff_diagnostics: staff.diagnostics,
        unattributed_staff_activity: staff.unattributed,
    })
}

fn warn_if_empty(chart: &ChartSeries) {
    if chart.is_empty() {
        warn!(title = %chart.title, "no data for chart");
    }
}

fn emit_json<T: Serialize>(value: &T, out: Option<&Path>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Wrote {}.", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let source = open_source(cli.csv_dir).await?;

    match cli.command {
        Commands::Timeline { member_id, out } => {
            let interventions = source.interventions(member_id).await?;
            let chart = timeline::aggregate(&interventions).chart()?;
            warn_if_empty(&chart);
            emit_json(&chart, out.as_deref())?;
        }
        Commands::StaffHours { out } => {
            let activity = source.staff_activity().await?;
            let chart = rollup::rollup(&activity).chart()?;
            warn_if_empty(&chart);
            emit_json(&chart, out.as_deref())?;
        }
        Commands::Persona { seed, out } => {
            emit_json(&persona_output(seed)?, out.as_deref())?;
        }
        Commands::Dashboard {
            member_id,
            seed,
            out,
        } => {
            let interventions = source.interventions(member_id).await?;
            let activity = source.staff_activity().await?;
            let profile = source.member_profile(member_id).await?;

            let dashboard = build_dashboard(
                member_id,
                seed,
                &interventions,
                &activity,
                profile,
                NormalizedDate::today(),
            )?;
            warn_if_empty(&dashboard.timeline);
            warn_if_empty(&dashboard.staff_hours);
            emit_json(&dashboard, out.as_deref())?;
        }
        Commands::Report {
            member_id,
            seed,
            communications,
            out,
        } => {
            let interventions = source.interventions(member_id).await?;
            let activity = source.staff_activity().await?;
            let messages = source.communications(member_id, communications).await?;
            let profile = source.member_profile(member_id).await?;

            let journey = timeline::aggregate(&interventions);
            let staff = rollup::rollup(&activity);
            let metrics = rollup::staff_metrics(&activity);
            let persona = PlaceholderScorer::new(seed).score();

            let report = report::build_report(&report::JourneyReport {
                member_id,
                as_of: NormalizedDate::today(),
                profile: profile.as_ref(),
                interventions: &interventions,
                timeline: &journey,
                staff: &staff,
                staff_metrics: &metrics,
                persona: &persona,
                communications: &messages,
            });
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
