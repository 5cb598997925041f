//! In-memory record selection by categorical and time predicates.

use chrono::NaiveDateTime;
use std::collections::BTreeSet;

use crate::record::{Dimension, TransitRecord};

/// Predicates a record must satisfy. Unset predicates match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub source: Option<String>,
    pub destination: Option<String>,
    pub commodity: Option<String>,
    pub rake_type: Option<String>,
    /// Inclusive lower bound on `received_at`.
    pub received_from: Option<NaiveDateTime>,
    /// Exclusive upper bound on `received_at`.
    pub received_until: Option<NaiveDateTime>,
}

impl RecordFilter {
    pub fn matches(&self, record: &TransitRecord) -> bool {
        fn eq(want: &Option<String>, have: &str) -> bool {
            want.as_deref().is_none_or(|w| w == have)
        }

        eq(&self.source, &record.source)
            && eq(&self.destination, &record.destination)
            && eq(&self.commodity, &record.commodity)
            && eq(&self.rake_type, &record.rake_type)
            && self.received_from.is_none_or(|from| record.received_at >= from)
            && self.received_until.is_none_or(|until| record.received_at < until)
    }

    /// Copies the matching records out of `records`.
    pub fn apply(&self, records: &[TransitRecord]) -> Vec<TransitRecord> {
        records.iter().filter(|r| self.matches(r)).cloned().collect()
    }
}

/// Sorted distinct values of `dimension`, e.g. for filter option lists.
pub fn distinct_values(records: &[TransitRecord], dimension: Dimension) -> Vec<String> {
    records
        .iter()
        .map(|r| dimension.key(r))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}
