use crate::analyzers::benchmark::{best_window_in, horizon_windows};
use crate::analyzers::clock::AnalysisClock;
use crate::analyzers::outlier::detect_outliers;
use crate::analyzers::period::{bucketize, trailing_windows};
use crate::analyzers::types::{
    AnalysisRow, AnalysisTable, BenchmarkHeader, BenchmarkSpec, RecentHeader, RecentWindowSpec,
};
use crate::record::TransitRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Default span of the per-row outlier summary.
pub const OUTLIER_HORIZON_DAYS: i64 = 30;

/// Column groups of an analysis table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableLayout {
    pub recent: Vec<RecentWindowSpec>,
    pub benchmarks: Vec<BenchmarkSpec>,
    pub outlier_horizon_days: i64,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            recent: RecentWindowSpec::defaults(),
            benchmarks: BenchmarkSpec::ALL.to_vec(),
            outlier_horizon_days: OUTLIER_HORIZON_DAYS,
        }
    }
}

type GroupKey = (String, String, String);

/// Builds one row per `(commodity, destination, source)` present in `records`.
///
/// Period and benchmark windows are derived once from the clock and shared by
/// every row. Rows come out in lexicographic key order.
#[tracing::instrument(skip_all, fields(records = records.len(), anchor = %clock.anchor))]
pub fn build_analysis_table(
    records: &[TransitRecord],
    layout: &TableLayout,
    clock: &AnalysisClock,
) -> AnalysisTable {
    let recent_headers: Vec<RecentHeader> = layout
        .recent
        .iter()
        .map(|spec| RecentHeader {
            spec: *spec,
            windows: trailing_windows(spec.granularity, clock.anchor, spec.count),
        })
        .collect();

    let benchmark_headers: Vec<BenchmarkHeader> = layout
        .benchmarks
        .iter()
        .map(|spec| BenchmarkHeader {
            spec: *spec,
            windows: horizon_windows(*spec, clock.anchor),
        })
        .collect();

    let mut groups: BTreeMap<GroupKey, Vec<TransitRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry((
                record.commodity.clone(),
                record.destination.clone(),
                record.source.clone(),
            ))
            .or_default()
            .push(record.clone());
    }

    let rows: Vec<AnalysisRow> = groups
        .into_iter()
        .map(|((commodity, destination, source), group)| {
            let recent = recent_headers
                .iter()
                .map(|h| bucketize(&group, &h.windows))
                .collect();
            let benchmarks = benchmark_headers
                .iter()
                .map(|h| best_window_in(&group, &h.windows))
                .collect();
            let latest = recent_subset(&group, clock, layout.outlier_horizon_days);
            let outliers = detect_outliers(&latest).summary();

            debug!(
                %commodity, %destination, %source,
                records = group.len(),
                recent = latest.len(),
                outliers = outliers.outliers,
                "Built analysis row"
            );

            AnalysisRow {
                commodity,
                destination,
                source,
                record_count: group.len(),
                recent,
                benchmarks,
                outliers,
            }
        })
        .collect();

    info!(rows = rows.len(), "Analysis table built");

    AnalysisTable {
        as_of: clock.as_of,
        anchor: clock.anchor,
        recent_headers,
        benchmark_headers,
        outlier_horizon_days: layout.outlier_horizon_days,
        rows,
    }
}

/// Records received within the `days` calendar days ending on the anchor.
pub fn recent_subset(records: &[TransitRecord], clock: &AnalysisClock, days: i64) -> Vec<TransitRecord> {
    let start = clock.trailing_days_start(days);
    records
        .iter()
        .filter(|r| {
            let date = r.received_at.date();
            start <= date && date <= clock.anchor
        })
        .cloned()
        .collect()
}

/// Records of one source over the outlier horizon, for per-source drill-down.
pub fn source_drilldown(
    records: &[TransitRecord],
    source: &str,
    clock: &AnalysisClock,
    days: i64,
) -> Vec<TransitRecord> {
    let mut subset = recent_subset(records, clock, days);
    subset.retain(|r| r.source == source);
    subset
}
