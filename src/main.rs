use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use tracing::info;

use daily_open_court::analytics::{within_range, AnalyticsSnapshot};
use daily_open_court::config::AppConfig;
use daily_open_court::models::{apply_update, ApplicationRecord, Feedback, RecordUpdate, Status};
use daily_open_court::normalize::{distinct_values, GroupField};
use daily_open_court::pipeline::{
    active_filter_count, run_query, FilterSet, QueryState, SortDirection, SortSpec,
};
use daily_open_court::video::{filter_videos, review_video, video_feedback_stats, VideoVerdict};
use daily_open_court::{export, import, logging, report, source, staff, validation};

#[derive(Parser)]
#[command(name = "open-court")]
#[command(about = "Table and analytics tooling for the Daily Open Court register", long_about = None)]
struct Cli {
    /// JSON dump of applications (array or paged listing)
    #[arg(long, global = true)]
    input: Option<PathBuf>,
    /// Extra configuration file layered over the defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FilterArgs {
    #[arg(long)]
    police_station: Option<String>,
    #[arg(long)]
    division: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    status: Option<Status>,
    #[arg(long)]
    feedback: Option<Feedback>,
    #[arg(long)]
    marked_to: Option<String>,
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    from: Option<NaiveDate>,
    #[arg(long)]
    to: Option<NaiveDate>,
}

impl FilterArgs {
    fn into_filters(self) -> FilterSet {
        FilterSet {
            police_station: self.police_station,
            division: self.division,
            category: self.category,
            status: self.status,
            feedback: self.feedback,
            marked_to: self.marked_to,
            search: self.search,
            from: self.from,
            to: self.to,
        }
    }
}

#[derive(Args)]
struct SortArgs {
    /// Column to sort by, e.g. sr_no, name, date
    #[arg(long)]
    sort: Option<String>,
    #[arg(long)]
    dir: Option<SortDirection>,
}

impl SortArgs {
    fn into_spec(self) -> SortSpec {
        match (self.sort, self.dir) {
            (Some(key), dir) => SortSpec::new(key, dir.unwrap_or_default()),
            (None, Some(dir)) => SortSpec {
                direction: dir,
                ..SortSpec::default()
            },
            (None, None) => SortSpec::default(),
        }
    }
}

#[derive(Args)]
struct ScopeArgs {
    #[arg(long)]
    from: Option<NaiveDate>,
    #[arg(long)]
    to: Option<NaiveDate>,
    /// Reference date for the daily window and pending ages (defaults to today)
    #[arg(long)]
    today: Option<NaiveDate>,
}

impl ScopeArgs {
    fn label(&self) -> String {
        match (self.from, self.to) {
            (None, None) => "all dates".to_string(),
            (Some(from), None) => format!("applications since {from}"),
            (None, Some(to)) => format!("applications up to {to}"),
            (Some(from), Some(to)) => format!("applications from {from} to {to}"),
        }
    }

    fn snapshot(&self, records: &[ApplicationRecord], config: &AppConfig) -> AnalyticsSnapshot {
        let scoped = within_range(records, self.from, self.to);
        let today = self.today.unwrap_or_else(|| Local::now().date_naive());
        AnalyticsSnapshot::compute(&scoped, &config.analytics, today)
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    /// Table columns as shown on screen
    Table,
    /// Full spreadsheet layout with N/A placeholders
    Sheet,
}

#[derive(Subcommand)]
enum Commands {
    /// Print one page of the filtered, sorted application table
    Table {
        #[command(flatten)]
        filters: FilterArgs,
        #[command(flatten)]
        sort: SortArgs,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long)]
        page_size: Option<usize>,
    },
    /// Export the filtered, sorted table as CSV
    Export {
        #[command(flatten)]
        filters: FilterArgs,
        #[command(flatten)]
        sort: SortArgs,
        #[arg(long, value_enum, default_value_t = ExportFormat::Table)]
        format: ExportFormat,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Compute every dashboard aggregate and print it as JSON
    Analytics {
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// List the distinct values of a grouping field
    Distinct {
        #[arg(long)]
        field: GroupField,
    },
    /// Merge an upload sheet (CSV) into the application set
    Import {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Change the status or feedback of one application
    #[command(group(
        ArgGroup::new("change")
            .args(["status", "feedback"])
            .required(true)
            .multiple(false)
    ))]
    Update {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        status: Option<Status>,
        #[arg(long)]
        feedback: Option<Feedback>,
        #[arg(long, default_value = "")]
        remarks: String,
        #[arg(long)]
        out: PathBuf,
    },
    /// Check every application for missing required fields
    Validate,
    /// List staff accounts
    Staff {
        #[arg(long)]
        staff: PathBuf,
        #[arg(long)]
        search: Option<String>,
    },
    /// Show video feedback counts and list submissions
    Videos {
        #[arg(long)]
        videos: PathBuf,
        #[arg(long)]
        status: Option<VideoVerdict>,
        #[arg(long)]
        search: Option<String>,
    },
    /// Record an admin verdict (LIKE or DISLIKE) on one video
    ReviewVideo {
        #[arg(long)]
        videos: PathBuf,
        #[arg(long)]
        id: i64,
        #[arg(long)]
        feedback: VideoVerdict,
        #[arg(long, default_value = "")]
        remarks: String,
        #[arg(long, default_value = "admin")]
        reviewer: String,
        #[arg(long)]
        out: PathBuf,
    },
}

fn load_input(input: Option<&Path>) -> anyhow::Result<Vec<ApplicationRecord>> {
    let path = input.context("--input is required for this command")?;
    source::load_records(path).with_context(|| format!("failed to read {}", path.display()))
}

fn print_table(records: &[&ApplicationRecord]) {
    println!(
        "{:>6}  {:<10}  {:<24}  {:<18}  {:<18}  {:<8}  {:<10}",
        "Sr.No", "Dairy No", "Name", "Police Station", "Category", "Status", "Date"
    );
    for record in records {
        println!(
            "{:>6}  {:<10}  {:<24}  {:<18}  {:<18}  {:<8}  {:<10}",
            record.sr_no.map(|v| v.to_string()).unwrap_or_default(),
            record.dairy_no,
            record.name,
            record.police_station,
            record.category,
            record.status.code(),
            record.date.as_deref().unwrap_or("-")
        );
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config =
        AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if cli.log_json {
        config.logging.json = true;
    }
    logging::init_logging(&config.logging).context("failed to initialize logging")?;

    let input = cli.input.as_deref();

    match cli.command {
        Commands::Table {
            filters,
            sort,
            page,
            page_size,
        } => {
            let records = load_input(input)?;
            let filters = filters.into_filters();
            info!(active_filters = active_filter_count(&filters), "running table query");
            let state = QueryState::default()
                .with_filters(filters)
                .with_sort(sort.into_spec())
                .with_page_size(config.page_size(page_size)?)
                .with_page(page);
            let view = run_query(&records, &state);
            let current = view.current_page();

            if current.total_count == 0 {
                println!("No applications match these filters.");
                return Ok(());
            }

            print_table(current.items);
            println!(
                "Showing {}-{} of {} (page {} of {})",
                current.first_index(),
                current.last_index(),
                current.total_count,
                current.page,
                current.total_pages
            );
        }
        Commands::Export {
            filters,
            sort,
            format,
            out,
        } => {
            let records = load_input(input)?;
            let state = QueryState::default()
                .with_filters(filters.into_filters())
                .with_sort(sort.into_spec());
            let view = run_query(&records, &state);

            let written = match &out {
                Some(path) => {
                    let file = File::create(path)
                        .with_context(|| format!("failed to create {}", path.display()))?;
                    write_export(BufWriter::new(file), format, &view.rows)?
                }
                None => write_export(io::stdout().lock(), format, &view.rows)?,
            };
            if let Some(path) = out {
                println!("Exported {written} applications to {}.", path.display());
            }
        }
        Commands::Analytics { scope } => {
            let records = load_input(input)?;
            let snapshot = scope.snapshot(&records, &config);
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Commands::Report { scope, out } => {
            let records = load_input(input)?;
            let snapshot = scope.snapshot(&records, &config);
            let report = report::build_report(&snapshot, &scope.label());
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Distinct { field } => {
            let records = load_input(input)?;
            let values = distinct_values(&records, field);
            info!(field = field.name(), values = values.len(), "listed distinct values");
            for value in values {
                println!("{value}");
            }
        }
        Commands::Import { csv, out } => {
            let mut records = match input {
                Some(_) => load_input(input)?,
                None => Vec::new(),
            };
            let file =
                File::open(&csv).with_context(|| format!("failed to open {}", csv.display()))?;
            let summary = import::import_sheet(file, &mut records)
                .with_context(|| format!("failed to import {}", csv.display()))?;
            source::write_listing(&out, &records)
                .with_context(|| format!("failed to write {}", out.display()))?;

            println!(
                "Imported {} applications ({} created, {} updated) into {}.",
                summary.processed(),
                summary.created,
                summary.updated,
                out.display()
            );
            for error in &summary.errors {
                println!("- {error}");
            }
        }
        Commands::Update {
            id,
            status,
            feedback,
            remarks,
            out,
        } => {
            let mut records = load_input(input)?;
            let update = match (status, feedback) {
                (Some(status), _) => RecordUpdate::Status(status),
                (None, Some(feedback)) => RecordUpdate::Feedback { feedback, remarks },
                (None, None) => anyhow::bail!("either --status or --feedback is required"),
            };
            let updated = apply_update(&mut records, id, &update)?;
            println!(
                "Application {} is now {} with {} feedback.",
                id,
                updated.status.label(),
                updated.feedback.label()
            );
            source::write_listing(&out, &records)
                .with_context(|| format!("failed to write {}", out.display()))?;
        }
        Commands::Validate => {
            let records = load_input(input)?;
            let mut invalid = 0usize;
            for (index, record) in records.iter().enumerate() {
                if let Err(err) = validation::validate_application(record) {
                    invalid += 1;
                    let label = record
                        .sr_no
                        .map_or_else(|| format!("#{}", index + 1), |sr| format!("Sr.No {sr}"));
                    println!("- {label}: {err}");
                }
            }
            println!("{invalid} of {} applications have problems.", records.len());
        }
        Commands::Staff { staff: path, search } => {
            let accounts = source::load_staff(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let matches = staff::search_staff(&accounts, search.as_deref().unwrap_or_default());

            if matches.is_empty() {
                println!("No staff accounts match.");
                return Ok(());
            }
            for account in matches {
                let flag = match validation::validate_staff(account, false) {
                    Ok(()) => String::new(),
                    Err(err) => format!(" [{err}]"),
                };
                println!(
                    "- {} ({}, {}){}",
                    account.username,
                    account.full_name(),
                    account.police_station,
                    flag
                );
            }
        }
        Commands::Videos {
            videos: path,
            status,
            search,
        } => {
            let videos = source::load_videos(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let stats = video_feedback_stats(&videos);
            println!(
                "{} videos: {} pending, {} liked, {} disliked",
                stats.total, stats.pending, stats.liked, stats.disliked
            );
            for video in filter_videos(&videos, status, search.as_deref().unwrap_or_default()) {
                println!(
                    "- #{} {} by {} [{}]{}",
                    video.id.map(|id| id.to_string()).unwrap_or_default(),
                    video.title,
                    video.user_name,
                    video.admin_feedback,
                    video
                        .reviewed_by_name
                        .as_deref()
                        .map(|name| format!(" reviewed by {name}"))
                        .unwrap_or_default()
                );
            }
        }
        Commands::ReviewVideo {
            videos: path,
            id,
            feedback,
            remarks,
            reviewer,
            out,
        } => {
            let mut videos = source::load_videos(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let reviewed_at = Local::now().to_rfc3339();
            let video = review_video(&mut videos, id, feedback, &remarks, &reviewer, &reviewed_at)?;
            println!("Video {id} marked {}.", video.admin_feedback);
            source::write_listing(&out, &videos)
                .with_context(|| format!("failed to write {}", out.display()))?;
        }
    }

    Ok(())
}

fn write_export<W: io::Write>(
    writer: W,
    format: ExportFormat,
    rows: &[&ApplicationRecord],
) -> anyhow::Result<usize> {
    let written = match format {
        ExportFormat::Table => export::write_table_csv(writer, rows)?,
        ExportFormat::Sheet => export::write_sheet_csv(writer, rows)?,
    };
    Ok(written)
}
