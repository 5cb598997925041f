//! The transit record consumed by every analysis.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One completed rake delivery.
///
/// Timestamps are wall-clock values in the configured reference offset.
/// Records are read-only for the lifetime of an analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitRecord {
    pub sr_no: String,
    pub received_at: NaiveDateTime,
    pub dispatched_at: NaiveDateTime,
    pub transit_hours: f64,
    pub source: String,
    pub destination: String,
    pub commodity: String,
    pub rake_type: String,
    pub units: Option<u32>,
}

/// Categorical columns a record can be grouped or filtered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Source,
    Destination,
    Commodity,
    RakeType,
}

impl Dimension {
    /// Returns the value of this dimension for `record`.
    pub fn key<'a>(&self, record: &'a TransitRecord) -> &'a str {
        match self {
            Dimension::Source => &record.source,
            Dimension::Destination => &record.destination,
            Dimension::Commodity => &record.commodity,
            Dimension::RakeType => &record.rake_type,
        }
    }
}

/// Identity of a delivery: arrival, lane, commodity, rake type and dispatch.
pub type DedupKey = (NaiveDateTime, String, String, String, String, NaiveDateTime);

impl TransitRecord {
    /// Key used to drop duplicate deliveries on ingestion.
    pub fn dedup_key(&self) -> DedupKey {
        (
            self.received_at,
            self.source.clone(),
            self.destination.clone(),
            self.commodity.clone(),
            self.rake_type.clone(),
            self.dispatched_at,
        )
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::TransitRecord;
    use chrono::{NaiveDate, NaiveDateTime};

    pub fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    /// Builds a record received at `received_at` with the given transit time.
    pub fn record(received_at: NaiveDateTime, transit_hours: f64) -> TransitRecord {
        TransitRecord {
            sr_no: "1".into(),
            received_at,
            dispatched_at: received_at - chrono::Duration::minutes((transit_hours * 60.0) as i64),
            transit_hours,
            source: "BSPX".into(),
            destination: "BSP".into(),
            commodity: "COAL".into(),
            rake_type: "BOXN".into(),
            units: Some(58),
        }
    }

    pub fn keyed(
        commodity: &str,
        destination: &str,
        source: &str,
        received_at: NaiveDateTime,
        transit_hours: f64,
    ) -> TransitRecord {
        TransitRecord {
            commodity: commodity.into(),
            destination: destination.into(),
            source: source.into(),
            ..record(received_at, transit_hours)
        }
    }
}
