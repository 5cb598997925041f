//! Calendar-aligned period bucketing.
//!
//! Weeks start on Monday, months on the 1st. A trailing fortnight is the
//! Monday-aligned week containing the anchor plus the week before it.

use chrono::{Datelike, Duration, NaiveDate};
use tracing::debug;

use crate::analyzers::clock::AnalysisClock;
use crate::analyzers::types::{Granularity, PeriodBucket, PeriodWindow};
use crate::analyzers::utility::mean;
use crate::record::TransitRecord;

/// Returns the window of `granularity` that contains `date`.
pub fn window_containing(granularity: Granularity, date: NaiveDate) -> PeriodWindow {
    let start = match granularity {
        Granularity::Day => date,
        Granularity::Week => week_start(date),
        Granularity::Fortnight => week_start(date) - Duration::days(7),
        Granularity::Month => date.with_day(1).unwrap_or(date),
    };
    PeriodWindow::starting_at(granularity, start)
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// The `count` most recent windows ending with the one containing `anchor`,
/// oldest first.
pub fn trailing_windows(
    granularity: Granularity,
    anchor: NaiveDate,
    count: usize,
) -> Vec<PeriodWindow> {
    let mut windows = Vec::new();
    if count == 0 {
        return windows;
    }

    let mut window = window_containing(granularity, anchor);
    windows.push(window);
    for _ in 1..count {
        window = window.previous();
        windows.push(window);
    }
    windows.reverse();
    windows
}

/// Buckets `records` into precomputed `windows`.
///
/// `windows` must be ascending and non-overlapping. Records outside every
/// window are not counted. One bucket is emitted per window, empty or not.
pub fn bucketize(records: &[TransitRecord], windows: &[PeriodWindow]) -> Vec<PeriodBucket> {
    let mut series: Vec<Vec<f64>> = vec![Vec::new(); windows.len()];

    for record in records {
        let date = record.received_at.date();
        let idx = windows.partition_point(|w| w.end < date);
        if let Some(window) = windows.get(idx) {
            if window.contains(record.received_at) {
                series[idx].push(record.transit_hours);
            }
        }
    }

    windows
        .iter()
        .zip(series)
        .map(|(window, hours)| PeriodBucket {
            granularity: window.granularity,
            start: window.start,
            end: window.end,
            label: window.label(),
            mean_hours: mean(&hours),
            count: hours.len(),
        })
        .collect()
}

/// Aggregates `records` into the last `count` periods of `granularity`
/// ending at the clock's anchor.
pub fn aggregate(
    records: &[TransitRecord],
    granularity: Granularity,
    count: usize,
    clock: &AnalysisClock,
) -> Vec<PeriodBucket> {
    let windows = trailing_windows(granularity, clock.anchor, count);
    let buckets = bucketize(records, &windows);
    debug!(
        ?granularity,
        count,
        anchor = %clock.anchor,
        records = records.len(),
        counted = buckets.iter().map(|b| b.count).sum::<usize>(),
        "Aggregated period buckets"
    );
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fixtures::{at, record};
    use approx::assert_relative_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn assert_contiguous(buckets: &[PeriodBucket]) {
        for pair in buckets.windows(2) {
            assert_eq!(pair[0].end + Duration::days(1), pair[1].start);
        }
    }

    #[test]
    fn test_week_window_starts_monday() {
        // 2026-01-29 is a Thursday
        let w = window_containing(Granularity::Week, date(2026, 1, 29));
        assert_eq!(w.start, date(2026, 1, 26));
        assert_eq!(w.end, date(2026, 2, 1));
        assert_eq!(w.label(), "26-01 Feb");
    }

    #[test]
    fn test_fortnight_window_covers_previous_week() {
        let w = window_containing(Granularity::Fortnight, date(2026, 1, 29));
        assert_eq!(w.start, date(2026, 1, 19));
        assert_eq!(w.end, date(2026, 2, 1));
    }

    #[test]
    fn test_exactly_n_contiguous_buckets_for_every_granularity() {
        let clock = AnalysisClock::at(at(2026, 3, 3, 10));
        for granularity in [
            Granularity::Day,
            Granularity::Week,
            Granularity::Fortnight,
            Granularity::Month,
        ] {
            let buckets = aggregate(&[], granularity, 7, &clock);
            assert_eq!(buckets.len(), 7);
            assert_contiguous(&buckets);
            assert!(buckets.last().unwrap().start <= clock.anchor);
            assert!(buckets.last().unwrap().end >= clock.anchor);
        }
    }

    #[test]
    fn test_zero_count_returns_no_buckets() {
        let clock = AnalysisClock::at(at(2026, 3, 3, 10));
        assert!(aggregate(&[], Granularity::Month, 0, &clock).is_empty());
    }

    #[test]
    fn test_empty_input_yields_absent_means_labelled_from_as_of() {
        let clock = AnalysisClock::new(at(2026, 1, 23, 8), &[]);
        let buckets = aggregate(&[], Granularity::Day, 3, &clock);
        let labels: Vec<_> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["21-Jan", "22-Jan", "23-Jan"]);
        assert!(buckets.iter().all(|b| b.count == 0 && b.mean_hours.is_none()));
    }

    #[test]
    fn test_monthly_four_full_months() {
        let mut records = Vec::new();
        for (y, m) in [(2025, 10), (2025, 11), (2025, 12), (2026, 1)] {
            for day in 1..=10 {
                records.push(record(at(y, m, day, 6), 40.0 + day as f64));
            }
        }
        let clock = AnalysisClock::new(at(2026, 1, 27, 12), &records);
        let buckets = aggregate(&records, Granularity::Month, 4, &clock);

        let labels: Vec<_> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["Oct'25", "Nov'25", "Dec'25", "Jan'26"]);
        for bucket in &buckets {
            assert_eq!(bucket.count, 10);
            assert_relative_eq!(bucket.mean_hours.unwrap(), 45.5);
        }
    }

    #[test]
    fn test_records_outside_window_are_excluded() {
        let records = vec![
            record(at(2026, 1, 26, 0), 10.0),
            record(at(2026, 1, 27, 23), 20.0),
            record(at(2026, 1, 20, 0), 99.0),
            record(at(2026, 1, 28, 1), 99.0),
        ];
        let clock = AnalysisClock::at(at(2026, 1, 27, 12));
        let buckets = aggregate(&records, Granularity::Day, 2, &clock);

        assert_eq!(buckets.iter().map(|b| b.count).sum::<usize>(), 2);
        assert_eq!(buckets[0].mean_hours, Some(10.0));
        assert_eq!(buckets[1].mean_hours, Some(20.0));
    }

    #[test]
    fn test_sparse_history_keeps_leading_empty_buckets() {
        let records = vec![record(at(2026, 1, 5, 0), 30.0)];
        let clock = AnalysisClock::new(at(2026, 1, 27, 0), &records);
        let buckets = aggregate(&records, Granularity::Month, 4, &clock);
        assert_eq!(buckets.len(), 4);
        assert_eq!(buckets[0].label, "Oct'25");
        assert!(buckets[..3].iter().all(|b| b.mean_hours.is_none()));
        assert_eq!(buckets[3].count, 1);
    }

    #[test]
    fn test_bucketize_reuses_shared_windows() {
        let windows = trailing_windows(Granularity::Week, date(2026, 1, 27), 2);
        let row_a = vec![record(at(2026, 1, 20, 0), 12.0)];
        let row_b = vec![record(at(2026, 1, 27, 0), 18.0)];
        let a = bucketize(&row_a, &windows);
        let b = bucketize(&row_b, &windows);
        assert_eq!(a[0].label, b[0].label);
        assert_eq!(a[0].count, 1);
        assert_eq!(b[1].count, 1);
        assert_eq!(a[1].mean_hours, None);
    }
}
