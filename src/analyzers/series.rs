//! Single-series views of the dashboard: one trailing run of buckets.

use serde::Serialize;

use crate::analyzers::clock::AnalysisClock;
use crate::analyzers::period::aggregate;
use crate::analyzers::types::{Granularity, PeriodBucket};
use crate::record::TransitRecord;

/// Preset trailing views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    #[value(name = "last30days")]
    Last30Days,
    Weekly,
    Fortnightly,
    Monthly,
}

impl SeriesKind {
    /// Bucket unit and number of buckets shown by this view.
    pub fn shape(&self) -> (Granularity, usize) {
        match self {
            SeriesKind::Last30Days => (Granularity::Day, 30),
            SeriesKind::Weekly => (Granularity::Week, 13),
            SeriesKind::Fortnightly => (Granularity::Fortnight, 8),
            SeriesKind::Monthly => (Granularity::Month, 12),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SeriesKind::Last30Days => "last30days",
            SeriesKind::Weekly => "weekly",
            SeriesKind::Fortnightly => "fortnightly",
            SeriesKind::Monthly => "monthly",
        }
    }
}

/// Buckets `records` for the preset `kind` ending at the clock's anchor.
pub fn series(records: &[TransitRecord], kind: SeriesKind, clock: &AnalysisClock) -> Vec<PeriodBucket> {
    let (granularity, count) = kind.shape();
    aggregate(records, granularity, count, clock)
}
