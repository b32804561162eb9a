//! Five-field cron expressions: minute, hour, day-of-month, month, day-of-week.
//!
//! Each field accepts `*`, a number, a range `a-b`, a step `*/n`, `a/n` or
//! `a-b/n`, and comma-separated lists of those. Day-of-week runs 0-7 where
//! both 0 and 7 are Sunday. When day-of-month and day-of-week are both
//! restricted, a day matches if either does.

use crate::error::{CrmError, Result};
use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike};

/// Upper bound for the forward search; every valid expression fires within
/// a leap-year cycle.
const SEARCH_LIMIT_MINUTES: i64 = 4 * 366 * 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    expr: String,
    minutes: u64,
    hours: u64,
    days_of_month: u64,
    months: u64,
    days_of_week: u64,
    dom_restricted: bool,
    dow_restricted: bool,
}

impl CronSchedule {
    pub fn parse(expr: &str) -> Result<Self> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(schedule_error(expr, format!("expected 5 fields, found {}", fields.len())));
        }

        let minutes = parse_field(expr, fields[0], 0, 59)?;
        let hours = parse_field(expr, fields[1], 0, 23)?;
        let days_of_month = parse_field(expr, fields[2], 1, 31)?;
        let months = parse_field(expr, fields[3], 1, 12)?;
        let mut days_of_week = parse_field(expr, fields[4], 0, 7)?;
        if days_of_week & (1 << 7) != 0 {
            days_of_week = (days_of_week & !(1 << 7)) | 1;
        }

        Ok(Self {
            expr: expr.to_string(),
            minutes,
            hours,
            days_of_month,
            months,
            days_of_week,
            dom_restricted: !fields[2].starts_with('*'),
            dow_restricted: !fields[4].starts_with('*'),
        })
    }

    pub fn expr(&self) -> &str {
        &self.expr
    }

    pub fn matches<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> bool {
        let dom = bit(self.days_of_month, at.day());
        let dow = bit(self.days_of_week, at.weekday().num_days_from_sunday());
        let day = if self.dom_restricted && self.dow_restricted {
            dom || dow
        } else {
            dom && dow
        };
        day && bit(self.minutes, at.minute())
            && bit(self.hours, at.hour())
            && bit(self.months, at.month())
    }

    /// The first whole minute strictly after `after` that matches.
    ///
    /// Truncation to the minute is done on the absolute instant, so an
    /// ambiguous or skipped local time never stops the search.
    pub fn next_after<Tz: TimeZone>(&self, after: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let mut candidate = after.clone()
            - Duration::seconds(i64::from(after.second()))
            - Duration::nanoseconds(i64::from(after.nanosecond()))
            + Duration::minutes(1);
        for _ in 0..SEARCH_LIMIT_MINUTES {
            if self.matches(&candidate) {
                return Some(candidate);
            }
            candidate = candidate + Duration::minutes(1);
        }
        None
    }
}

fn bit(mask: u64, value: u32) -> bool {
    mask & (1u64 << value) != 0
}

fn schedule_error(expr: &str, reason: impl Into<String>) -> CrmError {
    CrmError::Schedule { expr: expr.to_string(), reason: reason.into() }
}

fn parse_field(expr: &str, field: &str, min: u32, max: u32) -> Result<u64> {
    let mut mask = 0u64;
    for part in field.split(',') {
        let (range, step) = match part.split_once('/') {
            Some((range, step)) => {
                let step: u32 = step
                    .parse()
                    .map_err(|_| schedule_error(expr, format!("invalid step in '{}'", part)))?;
                if step == 0 {
                    return Err(schedule_error(expr, format!("zero step in '{}'", part)));
                }
                (range, Some(step))
            }
            None => (part, None),
        };

        let (start, end) = if range == "*" {
            (min, max)
        } else if let Some((a, b)) = range.split_once('-') {
            (parse_value(expr, a, min, max)?, parse_value(expr, b, min, max)?)
        } else {
            let value = parse_value(expr, range, min, max)?;
            // `a/n` runs from a to the end of the field
            if step.is_some() {
                (value, max)
            } else {
                (value, value)
            }
        };
        if start > end {
            return Err(schedule_error(expr, format!("descending range '{}'", range)));
        }

        let step = step.unwrap_or(1) as usize;
        for value in (start..=end).step_by(step) {
            mask |= 1u64 << value;
        }
    }
    Ok(mask)
}

fn parse_value(expr: &str, raw: &str, min: u32, max: u32) -> Result<u32> {
    let value: u32 = raw
        .parse()
        .map_err(|_| schedule_error(expr, format!("invalid value '{}'", raw)))?;
    if value < min || value > max {
        return Err(schedule_error(
            expr,
            format!("value {} outside {}-{}", value, min, max),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants;
    use chrono::{Local, Utc};

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn every_five_minutes() {
        let schedule = CronSchedule::parse(constants::HEARTBEAT_CRON).unwrap();
        assert_eq!(
            schedule.next_after(&at("2024-03-01T10:02:30Z")),
            Some(at("2024-03-01T10:05:00Z"))
        );
        assert_eq!(
            schedule.next_after(&at("2024-03-01T10:05:00Z")),
            Some(at("2024-03-01T10:10:00Z"))
        );
    }

    #[test]
    fn twice_a_day_on_the_hour() {
        let schedule = CronSchedule::parse(constants::LOW_STOCK_CRON).unwrap();
        assert_eq!(
            schedule.next_after(&at("2024-03-01T00:00:00Z")),
            Some(at("2024-03-01T12:00:00Z"))
        );
        assert_eq!(
            schedule.next_after(&at("2024-03-01T13:00:00Z")),
            Some(at("2024-03-02T00:00:00Z"))
        );
    }

    #[test]
    fn monday_morning_report() {
        let schedule = CronSchedule::parse(constants::WEEKLY_REPORT_CRON).unwrap();
        // 2024-03-01 is a Friday
        assert_eq!(
            schedule.next_after(&at("2024-03-01T09:00:00Z")),
            Some(at("2024-03-04T06:00:00Z"))
        );
    }

    #[test]
    fn sunday_is_zero_or_seven() {
        let zero = CronSchedule::parse("0 0 * * 0").unwrap();
        let seven = CronSchedule::parse("0 0 * * 7").unwrap();
        assert_eq!(zero.days_of_week, seven.days_of_week);
        assert_eq!(
            seven.next_after(&at("2024-03-01T00:00:00Z")),
            Some(at("2024-03-03T00:00:00Z"))
        );
    }

    #[test]
    fn restricted_day_fields_combine_with_or() {
        // The 15th, or any Monday
        let schedule = CronSchedule::parse("0 0 15 * 1").unwrap();
        assert!(schedule.matches(&at("2024-03-04T00:00:00Z")));
        assert!(schedule.matches(&at("2024-03-15T00:00:00Z")));
        assert!(!schedule.matches(&at("2024-03-05T00:00:00Z")));
    }

    #[test]
    fn lists_ranges_and_steps() {
        let schedule = CronSchedule::parse("0,30 9-17/4 * * 1-5").unwrap();
        assert!(schedule.matches(&at("2024-03-01T09:30:00Z")));
        assert!(schedule.matches(&at("2024-03-01T17:00:00Z")));
        assert!(!schedule.matches(&at("2024-03-01T11:00:00Z")));
        assert!(!schedule.matches(&at("2024-03-02T09:00:00Z")));
    }

    #[test]
    fn rejects_malformed_expressions() {
        for expr in ["* * * *", "60 * * * *", "*/0 * * * *", "5-1 * * * *", "a * * * *", "0 0 0 * *"] {
            assert!(
                matches!(CronSchedule::parse(expr), Err(CrmError::Schedule { .. })),
                "{expr} should be rejected"
            );
        }
    }

    #[test]
    fn repeated_local_hour_still_has_a_next_run() {
        // 01:30 happens twice in New York on 2024-11-03
        std::env::set_var("TZ", "America/New_York");
        let after = Local
            .with_ymd_and_hms(2024, 11, 3, 1, 30, 0)
            .earliest()
            .unwrap();
        let schedule = CronSchedule::parse(constants::HEARTBEAT_CRON).unwrap();
        let next = schedule.next_after(&after).unwrap();
        assert_eq!(next - after, Duration::minutes(5));
        assert_eq!((next.hour(), next.minute()), (1, 35));
    }

    #[test]
    fn truncates_seconds_and_nanos_before_stepping() {
        let schedule = CronSchedule::parse("* * * * *").unwrap();
        let after = at("2024-03-01T10:02:59.999Z");
        assert_eq!(schedule.next_after(&after), Some(at("2024-03-01T10:03:00Z")));
    }

    #[test]
    fn impossible_date_never_fires() {
        let schedule = CronSchedule::parse("0 0 30 2 *").unwrap();
        assert_eq!(schedule.next_after(&at("2024-01-01T00:00:00Z")), None);
    }
}
