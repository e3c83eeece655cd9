/*! Date range iteration for the scan drivers. */

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Every date in the closed range `[start, end]`.
pub fn daily(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = vec![];

    let mut date = start;
    while date <= end {
        dates.push(date);
        date += Duration::days(1);
    }

    dates
}

/// The Sundays falling inside the closed range `[start, end]`.
pub fn weekly(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut date = start;
    while date.weekday() != Weekday::Sun && date <= end {
        date += Duration::days(1);
    }

    let mut dates = vec![];
    while date <= end {
        dates.push(date);
        date += Duration::days(7);
    }

    dates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_includes_both_endpoints() {
        let start = NaiveDate::from_ymd_opt(2022, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2022, 6, 5).unwrap();

        let dates = daily(start, end);
        assert_eq!(dates.len(), 5);
        assert_eq!(dates[0], start);
        assert_eq!(dates[4], end);
    }

    #[test]
    fn daily_single_day_range() {
        let day = NaiveDate::from_ymd_opt(2022, 6, 1).unwrap();
        assert_eq!(daily(day, day), vec![day]);
    }

    #[test]
    fn daily_empty_when_reversed() {
        let start = NaiveDate::from_ymd_opt(2022, 6, 5).unwrap();
        let end = NaiveDate::from_ymd_opt(2022, 6, 1).unwrap();
        assert!(daily(start, end).is_empty());
    }

    #[test]
    fn weekly_yields_only_sundays() {
        // 2022-06-01 is a Wednesday, the first Sunday in range is 2022-06-05.
        let start = NaiveDate::from_ymd_opt(2022, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2022, 8, 31).unwrap();

        let dates = weekly(start, end);
        assert_eq!(dates[0], NaiveDate::from_ymd_opt(2022, 6, 5).unwrap());
        assert!(dates.iter().all(|d| d.weekday() == Weekday::Sun));
        assert_eq!(dates.len(), 13);
        assert_eq!(*dates.last().unwrap(), NaiveDate::from_ymd_opt(2022, 8, 28).unwrap());
    }

    #[test]
    fn weekly_starting_on_a_sunday_keeps_it() {
        let start = NaiveDate::from_ymd_opt(2022, 6, 5).unwrap();
        let dates = weekly(start, NaiveDate::from_ymd_opt(2022, 6, 19).unwrap());
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2022, 6, 5).unwrap(),
                NaiveDate::from_ymd_opt(2022, 6, 12).unwrap(),
                NaiveDate::from_ymd_opt(2022, 6, 19).unwrap(),
            ]
        );
    }

    #[test]
    fn weekly_empty_when_no_sunday_in_range() {
        let start = NaiveDate::from_ymd_opt(2022, 6, 6).unwrap(); // Monday
        let end = NaiveDate::from_ymd_opt(2022, 6, 10).unwrap(); // Friday
        assert!(weekly(start, end).is_empty());
    }
}
