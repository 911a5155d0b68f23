//! Reading calendar (heatmap) and streak computation.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// One reading session, reduced to what the calendar needs.
#[derive(Debug, Clone)]
pub struct LogFacts {
    pub date: NaiveDate,
    pub pages_read: i64,
    pub minutes: Option<i64>,
}

/// Activity for a single day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct CalendarDay {
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,
    pub pages: i64,
    pub minutes: i64,
    pub sessions: u32,
    pub books_finished: u32,
}

/// Current and longest run of consecutive reading days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct Streaks {
    pub current: u32,
    pub longest: u32,
}

/// Build the heatmap for `year`: one entry per day with any activity,
/// ordered by date. Logs and finish dates outside the year are ignored.
pub fn build_calendar(year: i32, logs: &[LogFacts], finished: &[NaiveDate]) -> Vec<CalendarDay> {
    let mut days: BTreeMap<NaiveDate, CalendarDay> = BTreeMap::new();

    for log in logs.iter().filter(|l| l.date.year() == year) {
        let day = day_mut(&mut days, log.date);
        day.pages += log.pages_read;
        day.minutes += log.minutes.unwrap_or(0);
        day.sessions += 1;
    }

    for date in finished.iter().filter(|d| d.year() == year) {
        day_mut(&mut days, *date).books_finished += 1;
    }

    days.into_values().collect()
}

fn day_mut(days: &mut BTreeMap<NaiveDate, CalendarDay>, date: NaiveDate) -> &mut CalendarDay {
    days.entry(date).or_insert_with(|| CalendarDay {
        date,
        pages: 0,
        minutes: 0,
        sessions: 0,
        books_finished: 0,
    })
}

/// Compute reading streaks from activity dates (duplicates allowed).
///
/// The current streak counts back from `today`, or from yesterday when
/// nothing has been logged yet today, so a streak is not lost mid-day.
pub fn compute_streaks(dates: &[NaiveDate], today: NaiveDate) -> Streaks {
    let mut sorted: Vec<NaiveDate> = dates.iter().copied().filter(|d| *d <= today).collect();
    sorted.sort_unstable();
    sorted.dedup();

    let Some(&last) = sorted.last() else {
        return Streaks::default();
    };

    let mut longest = 1u32;
    let mut run = 1u32;
    for pair in sorted.windows(2) {
        if pair[1].signed_duration_since(pair[0]).num_days() == 1 {
            run += 1;
        } else {
            run = 1;
        }
        longest = longest.max(run);
    }

    let gap = today.signed_duration_since(last).num_days();
    let current = if gap <= 1 { run } else { 0 };

    Streaks { current, longest }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn log(date: &str, pages: i64) -> LogFacts {
        LogFacts {
            date: d(date),
            pages_read: pages,
            minutes: Some(30),
        }
    }

    #[test]
    fn calendar_groups_by_day() {
        let logs = vec![
            log("2024-03-01", 20),
            log("2024-03-01", 15),
            log("2024-03-05", 40),
            log("2023-12-31", 99),
        ];
        let finished = vec![d("2024-03-05"), d("2024-04-10")];
        let days = build_calendar(2024, &logs, &finished);

        assert_eq!(days.len(), 3);
        assert_eq!(days[0].date, d("2024-03-01"));
        assert_eq!(days[0].pages, 35);
        assert_eq!(days[0].sessions, 2);
        assert_eq!(days[0].minutes, 60);
        assert_eq!(days[1].books_finished, 1);
        assert_eq!(days[1].pages, 40);
        assert_eq!(days[2].date, d("2024-04-10"));
        assert_eq!(days[2].sessions, 0);
    }

    #[test]
    fn empty_streaks() {
        assert_eq!(compute_streaks(&[], d("2024-01-01")), Streaks::default());
    }

    #[test]
    fn current_streak_ending_today() {
        let dates = [d("2024-05-08"), d("2024-05-09"), d("2024-05-10")];
        let s = compute_streaks(&dates, d("2024-05-10"));
        assert_eq!(s, Streaks { current: 3, longest: 3 });
    }

    #[test]
    fn current_streak_survives_until_end_of_today() {
        let dates = [d("2024-05-08"), d("2024-05-09")];
        let s = compute_streaks(&dates, d("2024-05-10"));
        assert_eq!(s.current, 2);
    }

    #[test]
    fn broken_streak() {
        let dates = [
            d("2024-01-01"),
            d("2024-01-02"),
            d("2024-01-03"),
            d("2024-01-04"),
            d("2024-02-01"),
        ];
        let s = compute_streaks(&dates, d("2024-02-10"));
        assert_eq!(s, Streaks { current: 0, longest: 4 });
    }

    #[test]
    fn duplicates_and_future_dates_ignored() {
        let dates = [
            d("2024-06-01"),
            d("2024-06-01"),
            d("2024-06-02"),
            d("2030-01-01"),
        ];
        let s = compute_streaks(&dates, d("2024-06-02"));
        assert_eq!(s, Streaks { current: 2, longest: 2 });
    }

    #[test]
    fn streak_across_month_boundary() {
        let dates = [d("2024-02-28"), d("2024-02-29"), d("2024-03-01")];
        assert_eq!(compute_streaks(&dates, d("2024-03-01")).longest, 3);
    }
}
