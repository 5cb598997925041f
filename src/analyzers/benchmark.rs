//! Best historical window search.
//!
//! A window belongs to a benchmark horizon iff its start date lies in
//! `[anchor - horizon + 1 day, anchor]`. Months and weeks reuse the calendar
//! boundaries of [`crate::analyzers::period`]; fortnights are consecutive
//! 14-day windows starting on the first day of the horizon.

use chrono::{Duration, Months, NaiveDate};
use tracing::debug;

use crate::analyzers::clock::AnalysisClock;
use crate::analyzers::period::{bucketize, window_containing};
use crate::analyzers::types::{BenchmarkSpec, BestBenchmark, Granularity, PeriodWindow};
use crate::record::TransitRecord;

/// First date covered by the horizon of `spec` ending on `anchor`.
pub fn horizon_start(spec: BenchmarkSpec, anchor: NaiveDate) -> NaiveDate {
    anchor
        .checked_sub_months(Months::new(spec.horizon_months()))
        .map(|d| d + Duration::days(1))
        .unwrap_or(anchor)
}

/// Non-overlapping windows of the benchmark's granularity covering its horizon,
/// oldest first.
pub fn horizon_windows(spec: BenchmarkSpec, anchor: NaiveDate) -> Vec<PeriodWindow> {
    let start = horizon_start(spec, anchor);
    let mut window = match spec.granularity() {
        Granularity::Fortnight => PeriodWindow::starting_at(Granularity::Fortnight, start),
        granularity => {
            let w = window_containing(granularity, start);
            if w.start < start { w.next() } else { w }
        }
    };

    let mut windows = Vec::new();
    while window.start <= anchor {
        windows.push(window);
        window = window.next();
    }
    windows
}

/// Picks the lowest-mean window among those holding at least one record.
///
/// Ties go to the most recent window. Returns `None` when every window is empty.
pub fn best_window_in(records: &[TransitRecord], windows: &[PeriodWindow]) -> Option<BestBenchmark> {
    let mut best: Option<BestBenchmark> = None;

    for bucket in bucketize(records, windows) {
        let Some(mean_hours) = bucket.mean_hours else {
            continue;
        };
        if best.as_ref().is_some_and(|b| mean_hours > b.mean_hours) {
            continue;
        }
        best = Some(BestBenchmark {
            mean_hours,
            count: bucket.count,
            window_label: bucket.label,
            start: bucket.start,
            end: bucket.end,
        });
    }

    best
}

/// Finds the best window for `spec` over its fixed horizon ending at the clock's anchor.
pub fn best_window(
    records: &[TransitRecord],
    spec: BenchmarkSpec,
    clock: &AnalysisClock,
) -> Option<BestBenchmark> {
    let windows = horizon_windows(spec, clock.anchor);
    let best = best_window_in(records, &windows);
    debug!(
        ?spec,
        windows = windows.len(),
        found = best.is_some(),
        "Scanned benchmark horizon"
    );
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fixtures::{at, record};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_horizon_has_twelve_windows() {
        for anchor in [date(2026, 1, 27), date(2026, 1, 1), date(2026, 1, 31)] {
            let windows = horizon_windows(BenchmarkSpec::BestMonth, anchor);
            assert_eq!(windows.len(), 12);
            assert_eq!(windows[0].label(), "Feb'25");
            assert_eq!(windows[11].label(), "Jan'26");
        }
    }

    #[test]
    fn test_week_horizon_windows_are_monday_aligned() {
        let windows = horizon_windows(BenchmarkSpec::BestWeek, date(2026, 1, 27));
        assert_eq!(windows.first().unwrap().start, date(2025, 11, 3));
        assert_eq!(windows.last().unwrap().start, date(2026, 1, 26));
        assert_eq!(windows.len(), 13);
        for pair in windows.windows(2) {
            assert_eq!(pair[0].end + Duration::days(1), pair[1].start);
        }
    }

    #[test]
    fn test_fortnights_anchor_on_horizon_start() {
        let anchor = date(2026, 1, 27);
        let windows = horizon_windows(BenchmarkSpec::BestFortnight, anchor);
        assert_eq!(windows[0].start, date(2025, 7, 28));
        assert_eq!(windows[0].end, date(2025, 8, 10));
        assert_eq!(windows[1].start, date(2025, 8, 11));
        assert!(windows.last().unwrap().start <= anchor);
        assert!(windows.last().unwrap().end >= anchor);
    }

    #[test]
    fn test_empty_horizon_is_absent() {
        let clock = AnalysisClock::at(at(2026, 1, 27, 0));
        for spec in BenchmarkSpec::ALL {
            assert!(best_window(&[], spec, &clock).is_none());
        }

        let stale = vec![record(at(2023, 5, 1, 0), 12.0)];
        assert!(best_window(&stale, BenchmarkSpec::BestMonth, &clock).is_none());
    }

    #[test]
    fn test_best_month_is_minimum_mean() {
        let records = vec![
            record(at(2025, 10, 3, 0), 50.0),
            record(at(2025, 10, 9, 0), 54.0),
            record(at(2025, 11, 2, 0), 41.0),
            record(at(2025, 11, 20, 0), 45.0),
            record(at(2026, 1, 2, 0), 48.0),
        ];
        let clock = AnalysisClock::new(at(2026, 1, 27, 0), &records);
        let best = best_window(&records, BenchmarkSpec::BestMonth, &clock).unwrap();

        assert_eq!(best.window_label, "Nov'25");
        assert_eq!(best.mean_hours, 43.0);
        assert_eq!(best.count, 2);
    }

    #[test]
    fn test_tie_goes_to_latest_window() {
        let records = vec![
            record(at(2025, 11, 4, 0), 40.0),
            record(at(2025, 12, 4, 0), 40.0),
            record(at(2025, 10, 4, 0), 40.0),
        ];
        let clock = AnalysisClock::at(at(2026, 1, 27, 0));
        let best = best_window(&records, BenchmarkSpec::BestMonth, &clock).unwrap();
        assert_eq!(best.window_label, "Dec'25");
    }

    #[test]
    fn test_best_fortnight_tie_goes_to_latest() {
        let anchor = date(2026, 1, 27);
        let windows = horizon_windows(BenchmarkSpec::BestFortnight, anchor);
        let records = vec![
            record(windows[2].start.and_hms_opt(6, 0, 0).unwrap(), 20.0),
            record(windows[5].start.and_hms_opt(6, 0, 0).unwrap(), 20.0),
            record(windows[7].end.and_hms_opt(6, 0, 0).unwrap(), 25.0),
        ];
        let clock = AnalysisClock::at(at(2026, 1, 27, 0));
        let best = best_window(&records, BenchmarkSpec::BestFortnight, &clock).unwrap();

        assert_eq!(windows[5].start, date(2025, 10, 6));
        assert_eq!(best.start, windows[5].start);
        assert_eq!(best.end, windows[5].end);
        assert_eq!(best.mean_hours, 20.0);
        assert_eq!(best.count, 1);
    }

    #[test]
    fn test_fortnight_counts_record_on_horizon_start() {
        let anchor = date(2026, 1, 27);
        let start = horizon_start(BenchmarkSpec::BestFortnight, anchor);
        assert_eq!(start, date(2025, 7, 28));

        let records = vec![record(start.and_hms_opt(0, 0, 0).unwrap(), 18.0)];
        let clock = AnalysisClock::at(at(2026, 1, 27, 0));
        let best = best_window(&records, BenchmarkSpec::BestFortnight, &clock).unwrap();
        let windows = horizon_windows(BenchmarkSpec::BestFortnight, anchor);
        assert_eq!(best.start, windows[0].start);
        assert_eq!(best.count, 1);
    }

    #[test]
    fn test_calendar_horizons_drop_partial_leading_window() {
        let anchor = date(2026, 1, 27);
        let clock = AnalysisClock::at(at(2026, 1, 27, 0));

        let month_start = horizon_start(BenchmarkSpec::BestMonth, anchor);
        assert_eq!(month_start, date(2025, 1, 28));
        let records = vec![record(month_start.and_hms_opt(12, 0, 0).unwrap(), 10.0)];
        assert!(best_window(&records, BenchmarkSpec::BestMonth, &clock).is_none());

        let week_start = horizon_start(BenchmarkSpec::BestWeek, anchor);
        assert_eq!(week_start, date(2025, 10, 28));
        let records = vec![record(week_start.and_hms_opt(12, 0, 0).unwrap(), 10.0)];
        assert!(best_window(&records, BenchmarkSpec::BestWeek, &clock).is_none());
    }

    #[test]
    fn test_best_week_ignores_records_before_horizon() {
        let records = vec![
            record(at(2025, 9, 1, 0), 5.0),
            record(at(2026, 1, 13, 0), 30.0),
            record(at(2026, 1, 20, 0), 25.0),
        ];
        let clock = AnalysisClock::at(at(2026, 1, 27, 0));
        let best = best_window(&records, BenchmarkSpec::BestWeek, &clock).unwrap();
        assert_eq!(best.mean_hours, 25.0);
        assert_eq!(best.window_label, "19-25 Jan");
        assert_eq!(best.count, 1);
    }
}
