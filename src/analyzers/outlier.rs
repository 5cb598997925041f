//! Quartile-fence outlier classification.
//!
//! Quartiles use linear interpolation between order statistics: for the
//! ascending values `v[0..n]`, the `p` quantile sits at rank `h = p * (n - 1)`
//! and equals `v[floor(h)] + (h - floor(h)) * (v[ceil(h)] - v[floor(h)])`.
//! A record is an outlier iff its transit time lies strictly outside
//! `[Q1 - 1.5 * IQR, Q3 + 1.5 * IQR]`.
//!
//! With a zero IQR the fences collapse onto a single point, so every value
//! that differs from it is flagged. Small or uniform samples can therefore
//! report 0% or 100% outliers.

use serde::Serialize;

use crate::analyzers::grade::tier;
use crate::analyzers::types::OutlierSummary;
use crate::analyzers::utility::{pct, round1};
use crate::record::TransitRecord;

const FENCE_FACTOR: f64 = 1.5;

/// Quartiles and fences computed once per record collection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutlierBounds {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl OutlierBounds {
    /// Computes the fences for `values`. Returns `None` for empty input.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let q1 = quantile_sorted(&sorted, 0.25)?;
        let q3 = quantile_sorted(&sorted, 0.75)?;
        let iqr = q3 - q1;

        Some(Self {
            q1,
            q3,
            iqr,
            lower_bound: q1 - FENCE_FACTOR * iqr,
            upper_bound: q3 + FENCE_FACTOR * iqr,
        })
    }

    pub fn is_outlier(&self, hours: f64) -> bool {
        hours < self.lower_bound || hours > self.upper_bound
    }
}

/// Linearly interpolated `p` quantile of ascending `sorted` values.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let rank = p.clamp(0.0, 1.0) * last as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}

/// A record together with its classification.
#[derive(Debug, Clone, Serialize)]
pub struct Classified<'a> {
    #[serde(flatten)]
    pub record: &'a TransitRecord,
    pub is_outlier: bool,
}

/// Classification of every record of one collection.
#[derive(Debug, Clone, Serialize)]
pub struct OutlierReport<'a> {
    /// `None` only when the collection was empty.
    pub bounds: Option<OutlierBounds>,
    pub classified: Vec<Classified<'a>>,
}

impl<'a> OutlierReport<'a> {
    /// Flagged records, slowest first.
    pub fn outliers(&self) -> Vec<&Classified<'a>> {
        let mut flagged: Vec<_> = self.classified.iter().filter(|c| c.is_outlier).collect();
        flagged.sort_by(|a, b| b.record.transit_hours.total_cmp(&a.record.transit_hours));
        flagged
    }

    pub fn outlier_count(&self) -> usize {
        self.classified.iter().filter(|c| c.is_outlier).count()
    }

    pub fn summary(&self) -> OutlierSummary {
        OutlierSummary::from_counts(self.outlier_count(), self.classified.len())
    }
}

impl OutlierSummary {
    pub fn from_counts(outliers: usize, total: usize) -> Self {
        let share = pct(outliers, total);
        Self {
            outliers,
            total,
            percentage: share.map(round1),
            tier: share.map(tier),
        }
    }
}

/// Classifies each record of `records` as normal or outlier.
pub fn detect_outliers(records: &[TransitRecord]) -> OutlierReport<'_> {
    let hours: Vec<f64> = records.iter().map(|r| r.transit_hours).collect();
    let bounds = OutlierBounds::from_values(&hours);

    let classified = records
        .iter()
        .map(|record| Classified {
            record,
            is_outlier: bounds.is_some_and(|b| b.is_outlier(record.transit_hours)),
        })
        .collect();

    OutlierReport { bounds, classified }
}
