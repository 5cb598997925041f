//! CLI entry point for the rake transit analysis tool.
//!
//! Loads cleaned rake sheets and prints the grouped analysis table, per-source
//! outlier detail, trailing series and dataset summaries.

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rake_transit::analyzers::analyzer::{
    Dataset, analyze, drilldown, series_report, summary_report,
};
use rake_transit::analyzers::series::SeriesKind;
use rake_transit::config::AnalysisConfig;
use rake_transit::filter::{RecordFilter, distinct_values};
use rake_transit::output::{render_table, write_json, write_series_csv, write_text};
use rake_transit::record::Dimension;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "rake_transit")]
#[command(about = "Transit-time analytics for delivered rakes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grouped table of recent periods, best windows and outlier share
    Table {
        #[command(flatten)]
        common: CommonArgs,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Outlier detail for a single source
    Outliers {
        #[command(flatten)]
        common: CommonArgs,

        /// Source station to drill into
        #[arg(long = "of")]
        of: String,

        /// Days ending on the anchor date to classify (defaults to the configured horizon)
        #[arg(long, value_parser = clap::value_parser!(i64).range(1..))]
        days: Option<i64>,
    },
    /// One trailing series as JSON
    Series {
        #[command(flatten)]
        common: CommonArgs,

        #[arg(long, value_enum, default_value_t = SeriesKind::Last30Days)]
        kind: SeriesKind,
    },
    /// One trailing series as CSV
    Export {
        #[command(flatten)]
        common: CommonArgs,

        #[arg(long, value_enum, default_value_t = SeriesKind::Last30Days)]
        kind: SeriesKind,
    },
    /// Dataset overview, per-dimension means and slowest lanes
    Summary {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Distinct values of one dimension
    Values {
        #[command(flatten)]
        common: CommonArgs,

        #[arg(value_enum)]
        dimension: Dimension,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Text,
}

#[derive(Args)]
struct CommonArgs {
    /// CSV sheet or directory of sheets (`.csv` / `.csv.gz`)
    #[arg(value_name = "PATH", default_value = "data")]
    input: PathBuf,

    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reference instant, `YYYY-MM-DD` or `YYYY-MM-DD HH:MM` (defaults to now)
    #[arg(long, value_parser = parse_instant)]
    as_of: Option<NaiveDateTime>,

    #[arg(long)]
    source: Option<String>,

    #[arg(long)]
    destination: Option<String>,

    #[arg(long)]
    commodity: Option<String>,

    #[arg(long)]
    rake_type: Option<String>,

    /// Earliest `received_at` to include
    #[arg(long, value_parser = parse_instant)]
    from: Option<NaiveDateTime>,

    /// `received_at` bound to stop before
    #[arg(long, value_parser = parse_instant)]
    until: Option<NaiveDateTime>,

    /// File to write to instead of stdout (`.gz` compresses)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl CommonArgs {
    fn filter(&self) -> RecordFilter {
        RecordFilter {
            source: self.source.clone(),
            destination: self.destination.clone(),
            commodity: self.commodity.clone(),
            rake_type: self.rake_type.clone(),
            received_from: self.from,
            received_until: self.until,
        }
    }

    fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    fn load(&self) -> Result<(AnalysisConfig, Dataset)> {
        let config_path = self
            .config
            .clone()
            .or_else(|| std::env::var_os("RAKE_TRANSIT_CONFIG").map(PathBuf::from));
        let config = AnalysisConfig::load_or_default(config_path.as_deref())?;
        let dataset = Dataset::load(&self.input, &config, self.as_of)
            .with_context(|| format!("failed to load '{}'", self.input.display()))?;
        Ok((config, dataset))
    }
}

fn parse_instant(value: &str) -> Result<NaiveDateTime> {
    for format in ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(ts);
        }
    }
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(date) => Ok(date.and_time(chrono::NaiveTime::MIN)),
        Err(_) => bail!("expected YYYY-MM-DD or YYYY-MM-DD HH:MM, got '{value}'"),
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/rake_transit.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("rake_transit.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Table { common, format } => {
            let (config, dataset) = common.load()?;
            let table = analyze(&dataset, &common.filter(), &config.table);
            match format {
                Format::Json => write_json(common.output(), &table)?,
                Format::Text => write_text(common.output(), &render_table(&table))?,
            }
        }
        Commands::Outliers { common, of, days } => {
            let (config, dataset) = common.load()?;
            let days = days.unwrap_or(config.table.outlier_horizon_days);
            let detail = drilldown(&dataset, &common.filter(), &of, days);
            write_json(common.output(), &detail)?;
        }
        Commands::Series { common, kind } => {
            let (_, dataset) = common.load()?;
            let report = series_report(&dataset, &common.filter(), kind);
            write_json(common.output(), &report)?;
        }
        Commands::Export { common, kind } => {
            let (_, dataset) = common.load()?;
            let report = series_report(&dataset, &common.filter(), kind);
            write_series_csv(common.output(), &report.buckets)?;
            info!(kind = kind.name(), buckets = report.buckets.len(), "Series exported");
        }
        Commands::Summary { common } => {
            let (config, dataset) = common.load()?;
            let summary = summary_report(&dataset, &common.filter(), config.bottleneck_limit);
            write_json(common.output(), &summary)?;
        }
        Commands::Values { common, dimension } => {
            let (_, dataset) = common.load()?;
            let values = distinct_values(&dataset.select(&common.filter()), dimension);
            write_json(common.output(), &values)?;
        }
    }

    Ok(())
}
