use crate::analyzers::aggregate::{TableLayout, build_analysis_table, source_drilldown};
use crate::analyzers::clock::AnalysisClock;
use crate::analyzers::outlier::{OutlierBounds, detect_outliers};
use crate::analyzers::series::{SeriesKind, series};
use crate::analyzers::summary::{DatasetSummary, summarize};
use crate::analyzers::types::{AnalysisTable, OutlierSummary, PeriodBucket};
use crate::config::AnalysisConfig;
use crate::filter::RecordFilter;
use crate::parser::load_path;
use crate::record::TransitRecord;
use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// A loaded record collection together with the clock of the current request.
///
/// The clock is anchored on the whole collection, before any filter, so every
/// view built from one dataset shares its period boundaries.
pub struct Dataset {
    pub records: Vec<TransitRecord>,
    pub clock: AnalysisClock,
}

impl Dataset {
    /// Loads and cleans the sheets at `path`. When `as_of` is absent the
    /// current time in the configured offset is read once, here.
    pub fn load(path: &Path, config: &AnalysisConfig, as_of: Option<NaiveDateTime>) -> Result<Self> {
        let as_of = match as_of {
            Some(as_of) => as_of,
            None => AnalysisClock::now_in(config.reference_offset()?),
        };
        let outcome = load_path(path, &config.ingest)?;
        Ok(Self::from_records(outcome.records, as_of))
    }

    pub fn from_records(records: Vec<TransitRecord>, as_of: NaiveDateTime) -> Self {
        let clock = AnalysisClock::new(as_of, &records);
        info!(records = records.len(), as_of = %clock.as_of, anchor = %clock.anchor, "Dataset ready");
        Self { records, clock }
    }

    pub fn select(&self, filter: &RecordFilter) -> Vec<TransitRecord> {
        filter.apply(&self.records)
    }
}

/// Builds the grouped analysis table over the filtered records.
pub fn analyze(dataset: &Dataset, filter: &RecordFilter, layout: &TableLayout) -> AnalysisTable {
    build_analysis_table(&dataset.select(filter), layout, &dataset.clock)
}

/// Outlier detail for one source.
#[derive(Debug, Serialize)]
pub struct SourceOutliers {
    pub source: String,
    pub as_of: NaiveDateTime,
    pub anchor: NaiveDate,
    pub horizon_days: i64,
    pub bounds: Option<OutlierBounds>,
    pub summary: OutlierSummary,
    /// Flagged records, slowest first.
    pub outliers: Vec<TransitRecord>,
}

/// Re-runs outlier detection on one source's records over the last `days` days.
#[tracing::instrument(skip(dataset, filter))]
pub fn drilldown(dataset: &Dataset, filter: &RecordFilter, source: &str, days: i64) -> SourceOutliers {
    let subset = source_drilldown(&dataset.select(filter), source, &dataset.clock, days);
    let report = detect_outliers(&subset);
    let summary = report.summary();
    info!(
        total = summary.total,
        outliers = summary.outliers,
        percentage = ?summary.percentage,
        "Source outliers classified"
    );

    SourceOutliers {
        source: source.to_string(),
        as_of: dataset.clock.as_of,
        anchor: dataset.clock.anchor,
        horizon_days: days,
        bounds: report.bounds,
        summary,
        outliers: report.outliers().into_iter().map(|c| c.record.clone()).collect(),
    }
}

/// One preset trailing series.
#[derive(Debug, Serialize)]
pub struct SeriesReport {
    pub kind: SeriesKind,
    pub as_of: NaiveDateTime,
    pub anchor: NaiveDate,
    pub buckets: Vec<PeriodBucket>,
}

pub fn series_report(dataset: &Dataset, filter: &RecordFilter, kind: SeriesKind) -> SeriesReport {
    SeriesReport {
        kind,
        as_of: dataset.clock.as_of,
        anchor: dataset.clock.anchor,
        buckets: series(&dataset.select(filter), kind, &dataset.clock),
    }
}

pub fn summary_report(dataset: &Dataset, filter: &RecordFilter, limit: usize) -> DatasetSummary {
    summarize(&dataset.select(filter), limit)
}
