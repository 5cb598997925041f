//! Whole-dataset summaries: per-dimension means, slowest lanes and a
//! dataset overview.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::analyzers::utility::mean;
use crate::record::{Dimension, TransitRecord};

/// Default number of lanes reported by [`bottlenecks`].
pub const BOTTLENECK_LIMIT: usize = 10;

/// Mean transit time for one value of a dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionMean {
    pub key: String,
    pub mean_hours: f64,
    pub count: usize,
}

/// Mean transit time for one `(source, destination)` lane.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaneMean {
    pub source: String,
    pub destination: String,
    pub mean_hours: f64,
    pub count: usize,
}

/// Size and time span of a record collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetOverview {
    pub total: usize,
    pub earliest: Option<NaiveDateTime>,
    pub latest: Option<NaiveDateTime>,
    /// Record count per destination, largest first.
    pub per_destination: Vec<(String, usize)>,
}

/// Groups `records` by `dimension` and averages each group, sorted by key.
pub fn mean_by(records: &[TransitRecord], dimension: Dimension) -> Vec<DimensionMean> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for record in records {
        groups
            .entry(dimension.key(record))
            .or_default()
            .push(record.transit_hours);
    }

    groups
        .into_iter()
        .filter_map(|(key, hours)| {
            Some(DimensionMean {
                key: key.to_string(),
                mean_hours: mean(&hours)?,
                count: hours.len(),
            })
        })
        .collect()
}

/// The `limit` slowest lanes by mean transit time.
pub fn bottlenecks(records: &[TransitRecord], limit: usize) -> Vec<LaneMean> {
    let mut lanes: BTreeMap<(&str, &str), Vec<f64>> = BTreeMap::new();
    for record in records {
        lanes
            .entry((&record.source, &record.destination))
            .or_default()
            .push(record.transit_hours);
    }

    let mut ranked: Vec<LaneMean> = lanes
        .into_iter()
        .filter_map(|((source, destination), hours)| {
            Some(LaneMean {
                source: source.to_string(),
                destination: destination.to_string(),
                mean_hours: mean(&hours)?,
                count: hours.len(),
            })
        })
        .collect();

    ranked.sort_by(|a, b| b.mean_hours.total_cmp(&a.mean_hours));
    ranked.truncate(limit);
    ranked
}

/// Everything the summary view shows for one record collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub overview: DatasetOverview,
    pub by_commodity: Vec<DimensionMean>,
    pub by_source: Vec<DimensionMean>,
    pub by_destination: Vec<DimensionMean>,
    pub by_rake_type: Vec<DimensionMean>,
    pub bottlenecks: Vec<LaneMean>,
}

/// Builds every summary of `records`, keeping the `limit` slowest lanes.
pub fn summarize(records: &[TransitRecord], limit: usize) -> DatasetSummary {
    DatasetSummary {
        overview: DatasetOverview::from_records(records),
        by_commodity: mean_by(records, Dimension::Commodity),
        by_source: mean_by(records, Dimension::Source),
        by_destination: mean_by(records, Dimension::Destination),
        by_rake_type: mean_by(records, Dimension::RakeType),
        bottlenecks: bottlenecks(records, limit),
    }
}

impl DatasetOverview {
    pub fn from_records(records: &[TransitRecord]) -> Self {
        let mut per_destination: HashMap<&str, usize> = HashMap::new();
        for record in records {
            *per_destination.entry(&record.destination).or_default() += 1;
        }

        let mut per_destination: Vec<(String, usize)> = per_destination
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        per_destination.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Self {
            total: records.len(),
            earliest: records.iter().map(|r| r.received_at).min(),
            latest: records.iter().map(|r| r.received_at).max(),
            per_destination,
        }
    }
}
