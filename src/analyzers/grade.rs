use serde::Serialize;

/// Interpretation tier for the share of outlier rakes in a group.
///
/// | Outlier %     | Tier              |
/// |---------------|-------------------|
/// | < 5           | Normal            |
/// | 5 to < 10     | Worth monitoring  |
/// | 10 to 20      | Moderate concern  |
/// | > 20          | High alert        |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierTier {
    Normal,
    WorthMonitoring,
    ModerateConcern,
    HighAlert,
}

impl OutlierTier {
    pub fn label(&self) -> &'static str {
        match self {
            OutlierTier::Normal => "normal",
            OutlierTier::WorthMonitoring => "worth monitoring",
            OutlierTier::ModerateConcern => "moderate concern",
            OutlierTier::HighAlert => "high alert",
        }
    }
}

/// Maps an outlier percentage (0.0–100.0) to its tier.
pub fn tier(pct: f64) -> OutlierTier {
    match pct {
        p if p > 20.0 => OutlierTier::HighAlert,
        p if p >= 10.0 => OutlierTier::ModerateConcern,
        p if p >= 5.0 => OutlierTier::WorthMonitoring,
        _ => OutlierTier::Normal,
    }
}
