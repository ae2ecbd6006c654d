//! Recurring calendar rules
//!
//! Policies carry standard five-field cron expressions
//! (`minute hour day-of-month month day-of-week`). The `cron` crate expects a
//! leading seconds field and numbers weekdays from 1 (Sunday), so expressions
//! are normalized before parsing: seconds are pinned to zero and numeric
//! weekdays are rewritten as names.
//!
//! When both day-of-month and day-of-week are restricted, standard cron fires
//! on days matching either field while the `cron` crate requires both. Such
//! rules are split into one schedule per day field and their firings merged.

use crate::error::DecisionError;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use cron::Schedule;
use std::str::FromStr;

const WEEKDAY_NAMES: [&str; 8] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];

/// A parsed recurrence expression
#[derive(Debug, Clone)]
pub struct RecurringRule {
    expression: String,
    /// One schedule, or two whose firings are unioned
    schedules: Vec<Schedule>,
}

impl RecurringRule {
    pub fn parse(expression: &str) -> Result<Self, DecisionError> {
        let schedules = normalize(expression)?
            .iter()
            .map(|normalized| {
                Schedule::from_str(normalized).map_err(|e| DecisionError::schedule(expression, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            expression: expression.to_string(),
            schedules,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First firing at or after `now`
    pub fn next_firing(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let from = now - ChronoDuration::seconds(1);
        self.schedules
            .iter()
            .filter_map(|schedule| schedule.after(&from).find(|firing| *firing >= now))
            .min()
    }

    /// Last firing on the same UTC calendar day as `first`, starting from `first`.
    ///
    /// Returns `first` when it is the only firing left that day, or when it
    /// already lies on a later day.
    pub fn last_firing_same_day(&self, first: DateTime<Utc>) -> DateTime<Utc> {
        let day = first.date_naive();
        self.schedules
            .iter()
            .filter_map(|schedule| {
                schedule
                    .after(&first)
                    .take_while(|firing| firing.date_naive() == day)
                    .last()
            })
            .fold(first, |latest, firing| latest.max(firing))
    }
}

/// `*` and `?` leave a day field unrestricted
fn is_restricted(field: &str) -> bool {
    !matches!(field, "*" | "?")
}

/// Turn a five-field expression into the six-field form(s) the parser expects
fn normalize(expression: &str) -> Result<Vec<String>, DecisionError> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(DecisionError::schedule(
            expression,
            format!("expected 5 fields, found {}", fields.len()),
        ));
    }

    let (minute, hour, day_of_month, month) = (fields[0], fields[1], fields[2], fields[3]);
    let day_of_week = normalize_weekdays(fields[4])
        .ok_or_else(|| DecisionError::schedule(expression, "day-of-week out of range"))?;
    let six_field = |day_of_month: &str, day_of_week: &str| {
        format!("0 {} {} {} {} {}", minute, hour, day_of_month, month, day_of_week)
    };

    if is_restricted(day_of_month) && is_restricted(&day_of_week) {
        Ok(vec![six_field(day_of_month, "*"), six_field("*", &day_of_week)])
    } else {
        Ok(vec![six_field(day_of_month, &day_of_week)])
    }
}

/// Rewrite numeric weekdays (0-7, Sunday = 0 or 7) as names; steps are left alone
fn normalize_weekdays(field: &str) -> Option<String> {
    let items = field
        .split(',')
        .map(|item| {
            let (range, step) = match item.split_once('/') {
                Some((range, step)) => (range, Some(step)),
                None => (item, None),
            };
            let range = range
                .split('-')
                .map(|part| match part.parse::<usize>() {
                    Ok(day) => WEEKDAY_NAMES.get(day).map(|name| name.to_string()),
                    Err(_) => Some(part.to_string()),
                })
                .collect::<Option<Vec<_>>>()?
                .join("-");
            Some(match step {
                Some(step) => format!("{}/{}", range, step),
                None => range,
            })
        })
        .collect::<Option<Vec<_>>>()?;

    Some(items.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike, Weekday};

    fn at(d: u32, h: u32, m: u32, s: u32) -> DateTime<Utc> {
        // March 2024: the 1st is a Friday
        Utc.with_ymd_and_hms(2024, 3, d, h, m, s).unwrap()
    }

    #[test]
    fn test_normalize_prepends_seconds() {
        assert_eq!(normalize("30 9 * * *").unwrap(), vec!["0 30 9 * * *"]);
    }

    #[test]
    fn test_normalize_splits_restricted_day_fields() {
        assert_eq!(
            normalize("38 12 1 * 1").unwrap(),
            vec!["0 38 12 1 * *", "0 38 12 * * MON"]
        );
        assert_eq!(normalize("0 9 1 * *").unwrap(), vec!["0 0 9 1 * *"]);
        assert_eq!(normalize("0 9 ? * 1-5").unwrap(), vec!["0 0 9 ? * MON-FRI"]);
    }

    #[test]
    fn test_normalize_rewrites_numeric_weekdays() {
        assert_eq!(normalize_weekdays("1-5").unwrap(), "MON-FRI");
        assert_eq!(normalize_weekdays("0,6").unwrap(), "SUN,SAT");
        assert_eq!(normalize_weekdays("7").unwrap(), "SUN");
        assert_eq!(normalize_weekdays("*/2").unwrap(), "*/2");
        assert_eq!(normalize_weekdays("MON-FRI").unwrap(), "MON-FRI");
        assert!(normalize_weekdays("8").is_none());
    }

    #[test]
    fn test_wrong_field_count_is_rejected() {
        assert!(matches!(
            RecurringRule::parse("0 30 9 * * *"),
            Err(DecisionError::ScheduleParse { .. })
        ));
        assert!(RecurringRule::parse("").is_err());
    }

    #[test]
    fn test_malformed_field_is_rejected() {
        assert!(matches!(
            RecurringRule::parse("61 * * * *"),
            Err(DecisionError::ScheduleParse { .. })
        ));
        assert!(RecurringRule::parse("not a cron line").is_err());
    }

    #[test]
    fn test_next_firing_includes_now() {
        let rule = RecurringRule::parse("30 9 * * *").unwrap();
        assert_eq!(rule.next_firing(at(1, 9, 30, 0)), Some(at(1, 9, 30, 0)));
        assert_eq!(rule.next_firing(at(1, 9, 30, 1)), Some(at(2, 9, 30, 0)));
    }

    #[test]
    fn test_weekday_numbers_follow_standard_cron() {
        let rule = RecurringRule::parse("0 12 * * 1").unwrap();
        let next = rule.next_firing(at(1, 0, 0, 0)).unwrap();
        assert_eq!(next.weekday(), Weekday::Mon);
        assert_eq!(next.day(), 4);
    }

    #[test]
    fn test_last_firing_same_day() {
        let rule = RecurringRule::parse("* 9-10 * * *").unwrap();
        let first = rule.next_firing(at(1, 9, 15, 0)).unwrap();
        let last = rule.last_firing_same_day(first);
        assert_eq!((last.hour(), last.minute()), (10, 59));
        assert_eq!(last.day(), 1);
    }

    #[test]
    fn test_last_firing_single_occurrence() {
        let rule = RecurringRule::parse("0 0 * * *").unwrap();
        let first = rule.next_firing(at(1, 23, 59, 30)).unwrap();
        assert_eq!(first, at(2, 0, 0, 0));
        assert_eq!(rule.last_firing_same_day(first), first);
    }

    #[test]
    fn test_day_of_month_or_day_of_week_fires() {
        let rule = RecurringRule::parse("38 12 1 * 1").unwrap();

        // Monday the 4th matches the weekday only
        assert_eq!(rule.next_firing(at(4, 12, 37, 30)), Some(at(4, 12, 38, 0)));
        // Friday the 1st matches the day of month only
        assert_eq!(rule.next_firing(at(1, 12, 0, 0)), Some(at(1, 12, 38, 0)));
        // Tuesday the 5th waits for the next Monday
        assert_eq!(rule.next_firing(at(5, 0, 0, 0)), Some(at(11, 12, 38, 0)));
    }

    #[test]
    fn test_last_firing_same_day_merges_split_schedules() {
        let rule = RecurringRule::parse("0,30 9 1 * 5").unwrap();
        let first = rule.next_firing(at(1, 8, 59, 30)).unwrap();

        assert_eq!(first, at(1, 9, 0, 0));
        assert_eq!(rule.last_firing_same_day(first), at(1, 9, 30, 0));
    }
}
