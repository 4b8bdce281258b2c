//! Calendar-aware span between two dates, rendered as
//! "X years, Y months, Z days".
//!
//! chrono has no year/month/day difference, so day and month underflow are
//! borrowed by hand using the length of the month before `end`.

use std::fmt;

use chrono::{Datelike, Months, NaiveDate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CalendarSpan {
    pub years: u32,
    pub months: u32,
    pub days: u32,
}

impl CalendarSpan {
    /// Span from `start` to `end`. An `end` before `start` is an empty span.
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        if end <= start {
            return Self::default();
        }

        let mut years = end.year() - start.year();
        let mut months = end.month() as i32 - start.month() as i32;
        let mut days = end.day() as i32 - start.day() as i32;

        if days < 0 {
            months -= 1;
            days += days_in_month_before(end) as i32;
        }
        if months < 0 {
            years -= 1;
            months += 12;
        }

        Self {
            years: years.max(0) as u32,
            months: months as u32,
            days: days as u32,
        }
    }
}

impl fmt::Display for CalendarSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} year{}, {} month{}, {} day{}",
            self.years,
            plural(self.years),
            self.months,
            plural(self.months),
            self.days,
            plural(self.days)
        )
    }
}

fn plural(n: u32) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// Length of the calendar month preceding `date`'s month.
fn days_in_month_before(date: NaiveDate) -> u32 {
    let first_of_month = date.with_day(1);
    let first_of_previous = first_of_month.and_then(|d| d.checked_sub_months(Months::new(1)));
    match (first_of_previous, first_of_month) {
        (Some(prev), Some(this)) => (this - prev).num_days() as u32,
        _ => 30,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn whole_years() {
        let span = CalendarSpan::between(date(2020, 6, 14), date(2024, 6, 14));
        assert_eq!(span.to_string(), "4 years, 0 months, 0 days");
    }

    #[test]
    fn borrows_days_from_previous_month() {
        // March 3 minus Jan 31: borrow February (leap year, 29 days).
        let span = CalendarSpan::between(date(2024, 1, 31), date(2024, 3, 3));
        assert_eq!(
            span,
            CalendarSpan {
                years: 0,
                months: 1,
                days: 1
            }
        );
        assert_eq!(span.to_string(), "0 years, 1 month, 1 day");
    }

    #[test]
    fn borrows_months_from_years() {
        let span = CalendarSpan::between(date(2022, 11, 20), date(2024, 2, 10));
        assert_eq!(span.to_string(), "1 year, 2 months, 21 days");
    }

    #[test]
    fn january_borrows_from_december() {
        assert_eq!(days_in_month_before(date(2024, 1, 5)), 31);
        assert_eq!(days_in_month_before(date(2023, 3, 1)), 28);
    }

    #[test]
    fn reversed_range_is_empty() {
        let span = CalendarSpan::between(date(2024, 5, 1), date(2024, 4, 1));
        assert_eq!(span, CalendarSpan::default());
    }
}
