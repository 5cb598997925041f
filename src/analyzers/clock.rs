use chrono::{Duration, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

use crate::record::TransitRecord;

/// The single "as of" instant of one analysis request.
///
/// `anchor` is the date every trailing window and benchmark horizon ends on.
/// It comes from the broader, unfiltered dataset so that differently filtered
/// rows of one table share the same headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnalysisClock {
    pub as_of: NaiveDateTime,
    pub anchor: NaiveDate,
}

impl AnalysisClock {
    /// Anchors on the latest `received_at` in `context`, falling back to `as_of`.
    pub fn new(as_of: NaiveDateTime, context: &[TransitRecord]) -> Self {
        let anchor = context
            .iter()
            .map(|r| r.received_at)
            .max()
            .map(|ts| ts.date())
            .unwrap_or_else(|| as_of.date());
        Self { as_of, anchor }
    }

    /// Anchors directly on `as_of`, ignoring any dataset.
    pub fn at(as_of: NaiveDateTime) -> Self {
        Self {
            as_of,
            anchor: as_of.date(),
        }
    }

    /// Returns the current wall-clock time in the reference offset.
    pub fn now_in(offset: FixedOffset) -> NaiveDateTime {
        Utc::now().with_timezone(&offset).naive_local()
    }

    /// First date of the `days`-long span that ends on the anchor (inclusive).
    pub fn trailing_days_start(&self, days: i64) -> NaiveDate {
        self.anchor - Duration::days(days.max(1) - 1)
    }
}
