//! Transit aggregation and outlier analysis.
//!
//! This module buckets rake records into calendar-aligned periods, finds the
//! best historical window per benchmark horizon, flags quartile-fence
//! outliers, and composes them into a grouped analysis table.

pub mod aggregate;
pub mod analyzer;
pub mod benchmark;
pub mod clock;
pub mod grade;
pub mod outlier;
pub mod period;
pub mod series;
pub mod summary;
pub mod types;
pub mod utility;
