//! Analysis configuration.
//!
//! Stored as an optional JSON file; every field falls back to its default:
//! ```json
//! {
//!   "utc_offset_minutes": 330,
//!   "table": {
//!     "recent": [{ "granularity": "month", "count": 4 }],
//!     "benchmarks": ["best_month", "best_week"],
//!     "outlier_horizon_days": 30
//!   },
//!   "ingest": { "commodity_aliases": { "IOST": "IORE" } }
//! }
//! ```

use anyhow::{Context, Result, anyhow, bail};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::analyzers::aggregate::TableLayout;
use crate::analyzers::summary::BOTTLENECK_LIMIT;

/// Offset of the source data's wall-clock timestamps (UTC+05:30).
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 330;

/// Upper bound on the buckets of one recent-window column group.
pub const MAX_RECENT_WINDOWS: usize = 366;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Fixed offset every timestamp is interpreted in.
    pub utc_offset_minutes: i32,
    pub table: TableLayout,
    pub bottleneck_limit: usize,
    pub ingest: IngestConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
            table: TableLayout::default(),
            bottleneck_limit: BOTTLENECK_LIMIT,
            ingest: IngestConfig::default(),
        }
    }
}

/// Cleaning rules applied to uploaded rake sheets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub timestamp_format: String,
    /// Accepted destination codes mapped to the unit they report under.
    /// Rows whose destination is not a key here are dropped.
    pub destinations: BTreeMap<String, String>,
    pub commodity_aliases: BTreeMap<String, String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        let pairs = |items: &[(&str, &str)]| {
            items
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>()
        };
        Self {
            timestamp_format: "%d-%m-%Y %H:%M".to_string(),
            destinations: pairs(&[
                ("BSCS", "BSL"),
                ("BSPC", "BSP"),
                ("DSEY", "DSP"),
                ("IISD", "ISP"),
                ("BCME", "ISP"),
                ("HSPG", "RSP"),
                ("NHSB", "RSP"),
            ]),
            commodity_aliases: pairs(&[("IOST", "IORE")]),
        }
    }
}

impl AnalysisConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("invalid config '{}'", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the analysis cannot honour.
    pub fn validate(&self) -> Result<()> {
        self.reference_offset()?;
        if self.table.outlier_horizon_days < 1 {
            bail!(
                "outlier_horizon_days must be at least 1, got {}",
                self.table.outlier_horizon_days
            );
        }
        for spec in &self.table.recent {
            if spec.count > MAX_RECENT_WINDOWS {
                bail!(
                    "recent {:?} count {} exceeds {MAX_RECENT_WINDOWS}",
                    spec.granularity,
                    spec.count
                );
            }
        }
        Ok(())
    }

    /// Loads `path` when given, otherwise returns the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn reference_offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .ok_or_else(|| anyhow!("utc_offset_minutes out of range: {}", self.utc_offset_minutes))
    }
}
