//! Output formatting for analysis results.
//!
//! Supports JSON, CSV series export and a plain-text table. Paths ending in
//! `.gz` are gzip-compressed; no path means stdout.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::debug;

use crate::analyzers::types::{AnalysisTable, BestBenchmark, OutlierSummary, PeriodBucket};
use crate::analyzers::utility::round2;

/// Placeholder rendered for buckets and benchmarks without data.
pub const MISSING: &str = "-";

/// Formats an optional mean in hours, or the missing-data dash.
pub fn fmt_hours(hours: Option<f64>) -> String {
    match hours {
        Some(h) => format!("{h:.1}"),
        None => MISSING.to_string(),
    }
}

fn fmt_benchmark(best: Option<&BestBenchmark>) -> String {
    match best {
        Some(b) => format!("{:.1} ({}, n={})", b.mean_hours, b.window_label, b.count),
        None => MISSING.to_string(),
    }
}

fn fmt_outliers(summary: &OutlierSummary) -> String {
    match (summary.percentage, summary.tier) {
        (Some(pct), Some(tier)) => format!(
            "{}/{} ({pct:.1}%, {})",
            summary.outliers,
            summary.total,
            tier.label()
        ),
        _ => MISSING.to_string(),
    }
}

fn write_to(path: Option<&Path>, body: impl FnOnce(&mut dyn Write) -> Result<()>) -> Result<()> {
    let Some(path) = path else {
        let mut stdout = io::stdout().lock();
        body(&mut stdout)?;
        stdout.flush()?;
        return Ok(());
    };

    debug!(path = %path.display(), "Writing output");
    let file = File::create(path).with_context(|| format!("failed to create '{}'", path.display()))?;
    if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        let mut encoder = GzEncoder::new(file, Compression::default());
        body(&mut encoder)?;
        encoder.finish()?;
    } else {
        let mut writer = BufWriter::new(file);
        body(&mut writer)?;
        writer.flush()?;
    }
    Ok(())
}

/// Writes `value` as pretty-printed JSON to `path`, or stdout.
pub fn write_json(path: Option<&Path>, value: &impl Serialize) -> Result<()> {
    write_to(path, |w| {
        serde_json::to_writer_pretty(&mut *w, value)?;
        writeln!(w)?;
        Ok(())
    })
}

/// Writes plain text to `path`, or stdout.
pub fn write_text(path: Option<&Path>, text: &str) -> Result<()> {
    write_to(path, |w| Ok(w.write_all(text.as_bytes())?))
}

#[derive(Serialize)]
struct SeriesRow<'a> {
    label: &'a str,
    start: NaiveDate,
    end: NaiveDate,
    count: usize,
    mean_hours: Option<f64>,
}

/// Writes one row per bucket; empty buckets leave `mean_hours` blank.
pub fn write_series_csv(path: Option<&Path>, buckets: &[PeriodBucket]) -> Result<()> {
    write_to(path, |w| {
        let mut writer = WriterBuilder::new().has_headers(true).from_writer(w);
        for bucket in buckets {
            writer.serialize(SeriesRow {
                label: &bucket.label,
                start: bucket.start,
                end: bucket.end,
                count: bucket.count,
                mean_hours: bucket.mean_hours.map(round2),
            })?;
        }
        writer.flush()?;
        Ok(())
    })
}

/// Renders the analysis table as `|`-separated text, one line per row.
pub fn render_table(table: &AnalysisTable) -> String {
    let mut header = vec![
        "Commodity".to_string(),
        "Destination".to_string(),
        "Source".to_string(),
    ];
    for group in &table.recent_headers {
        header.extend(group.windows.iter().map(|w| w.label()));
    }
    header.extend(table.benchmark_headers.iter().map(|h| h.spec.title().to_string()));
    header.push(format!("Outliers ({}d)", table.outlier_horizon_days));

    let mut lines = vec![header.join(" | ")];
    for row in &table.rows {
        let mut cells = vec![row.commodity.clone(), row.destination.clone(), row.source.clone()];
        for buckets in &row.recent {
            cells.extend(buckets.iter().map(|b| fmt_hours(b.mean_hours)));
        }
        cells.extend(row.benchmarks.iter().map(|b| fmt_benchmark(b.as_ref())));
        cells.push(fmt_outliers(&row.outliers));
        lines.push(cells.join(" | "));
    }

    let mut text = lines.join("\n");
    text.push('\n');
    text
}
