//! Data types produced by the aggregation pipeline.

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::analyzers::grade::OutlierTier;

/// Bucketing unit for period windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Day,
    Week,
    /// Derived unit of 14 consecutive days; never calendar-aligned on its own.
    Fortnight,
    Month,
}

/// One time slice with inclusive calendar-date boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeriodWindow {
    pub granularity: Granularity,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PeriodWindow {
    /// Builds the window that starts on `start`, spanning one unit of `granularity`.
    pub fn starting_at(granularity: Granularity, start: NaiveDate) -> Self {
        let end = match granularity {
            Granularity::Day => start,
            Granularity::Week => start + Duration::days(6),
            Granularity::Fortnight => start + Duration::days(13),
            Granularity::Month => last_day_of_month(start),
        };
        Self {
            granularity,
            start,
            end,
        }
    }

    /// Whether `ts` falls on a date inside the window.
    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        let date = ts.date();
        self.start <= date && date <= self.end
    }

    /// The window immediately after this one.
    pub fn next(&self) -> Self {
        Self::starting_at(self.granularity, self.end + Duration::days(1))
    }

    /// The window immediately before this one.
    pub fn previous(&self) -> Self {
        let start = match self.granularity {
            Granularity::Day => self.start - Duration::days(1),
            Granularity::Week => self.start - Duration::days(7),
            Granularity::Fortnight => self.start - Duration::days(14),
            Granularity::Month => self.start - Months::new(1),
        };
        Self::starting_at(self.granularity, start)
    }

    /// Display label, e.g. `Dec'25`, `20-26 Dec` or `23-Jan`.
    pub fn label(&self) -> String {
        match self.granularity {
            Granularity::Month => self.start.format("%b'%y").to_string(),
            Granularity::Week | Granularity::Fortnight => format!(
                "{:02}-{:02} {}",
                self.start.day(),
                self.end.day(),
                self.end.format("%b")
            ),
            Granularity::Day => self.start.format("%d-%b").to_string(),
        }
    }
}

fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let first = date.with_day(1).unwrap_or(date);
    first + Months::new(1) - Duration::days(1)
}

/// Aggregate over the records whose `received_at` falls in one window.
///
/// `mean_hours` is `None` when the bucket is empty; it is never zero-filled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodBucket {
    pub granularity: Granularity,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub label: String,
    pub mean_hours: Option<f64>,
    pub count: usize,
}

/// Best (lowest-mean) window of a benchmark horizon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestBenchmark {
    pub mean_hours: f64,
    pub count: usize,
    pub window_label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Benchmark kinds with their fixed lookback horizons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkSpec {
    BestMonth,
    BestFortnight,
    BestWeek,
}

impl BenchmarkSpec {
    pub const ALL: [BenchmarkSpec; 3] = [
        BenchmarkSpec::BestMonth,
        BenchmarkSpec::BestFortnight,
        BenchmarkSpec::BestWeek,
    ];

    pub fn granularity(&self) -> Granularity {
        match self {
            BenchmarkSpec::BestMonth => Granularity::Month,
            BenchmarkSpec::BestFortnight => Granularity::Fortnight,
            BenchmarkSpec::BestWeek => Granularity::Week,
        }
    }

    /// Lookback horizon in calendar months.
    pub fn horizon_months(&self) -> u32 {
        match self {
            BenchmarkSpec::BestMonth => 12,
            BenchmarkSpec::BestFortnight => 6,
            BenchmarkSpec::BestWeek => 3,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            BenchmarkSpec::BestMonth => "Best month (12M)",
            BenchmarkSpec::BestFortnight => "Best fortnight (6M)",
            BenchmarkSpec::BestWeek => "Best week (3M)",
        }
    }
}

/// A "last N periods" column group in the analysis table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentWindowSpec {
    pub granularity: Granularity,
    pub count: usize,
}

impl RecentWindowSpec {
    pub fn defaults() -> Vec<RecentWindowSpec> {
        vec![
            RecentWindowSpec {
                granularity: Granularity::Month,
                count: 4,
            },
            RecentWindowSpec {
                granularity: Granularity::Week,
                count: 8,
            },
            RecentWindowSpec {
                granularity: Granularity::Day,
                count: 4,
            },
        ]
    }
}

/// Column headers shared by every row of one table.
#[derive(Debug, Clone, Serialize)]
pub struct RecentHeader {
    pub spec: RecentWindowSpec,
    pub windows: Vec<PeriodWindow>,
}

/// Benchmark horizon shared by every row of one table.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkHeader {
    pub spec: BenchmarkSpec,
    pub windows: Vec<PeriodWindow>,
}

/// Outlier count over a row's recent records.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutlierSummary {
    pub outliers: usize,
    pub total: usize,
    /// Percentage rounded to one decimal; `None` when there were no records.
    pub percentage: Option<f64>,
    pub tier: Option<OutlierTier>,
}

/// One `(commodity, destination, source)` row of the analysis table.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRow {
    pub commodity: String,
    pub destination: String,
    pub source: String,
    pub record_count: usize,
    pub recent: Vec<Vec<PeriodBucket>>,
    pub benchmarks: Vec<Option<BestBenchmark>>,
    pub outliers: OutlierSummary,
}

/// Full analysis table consumed by the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisTable {
    pub as_of: NaiveDateTime,
    pub anchor: NaiveDate,
    pub recent_headers: Vec<RecentHeader>,
    pub benchmark_headers: Vec<BenchmarkHeader>,
    pub outlier_horizon_days: i64,
    pub rows: Vec<AnalysisRow>,
}
