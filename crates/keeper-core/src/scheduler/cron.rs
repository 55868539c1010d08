//! Five-field cron expressions (`minute hour day-of-month month day-of-week`)
//! and the `@` descriptors.
//!
//! Supported field syntax: `*`, `?`, `N`, `N-M`, `*/S`, `N-M/S`, `N/S`
//! (meaning `N-max/S`), comma lists, and three-letter month and weekday
//! names. Day-of-week accepts 0-7 with both 0 and 7 meaning Sunday. When
//! both day fields are restricted a day matches if either one does.

use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveDate, NaiveDateTime, TimeZone, Timelike};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

const MONTH_NAMES: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];
const DAY_NAMES: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

/// Give up searching after this many years without a match (e.g. `0 0 30 2 *`).
const SEARCH_YEARS: i32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CronParseError {
    #[error("empty schedule expression")]
    Empty,

    #[error("expected 5 fields (minute hour day month weekday), found {0}")]
    FieldCount(usize),

    #[error("invalid {field} value {value:?}")]
    InvalidValue { field: &'static str, value: String },

    #[error("{field} value {value} out of range {min}-{max}")]
    OutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    #[error("invalid step in {field}: {value:?}")]
    InvalidStep { field: &'static str, value: String },

    #[error("unknown descriptor {0:?}")]
    UnknownDescriptor(String),

    #[error("invalid @every duration {0:?}")]
    InvalidDuration(String),
}

#[derive(Debug, Clone, Copy)]
struct FieldSpec {
    name: &'static str,
    min: u32,
    max: u32,
    names: &'static [&'static str],
}

const MINUTE: FieldSpec = FieldSpec { name: "minute", min: 0, max: 59, names: &[] };
const HOUR: FieldSpec = FieldSpec { name: "hour", min: 0, max: 23, names: &[] };
const DAY_OF_MONTH: FieldSpec = FieldSpec { name: "day-of-month", min: 1, max: 31, names: &[] };
const MONTH: FieldSpec = FieldSpec { name: "month", min: 1, max: 12, names: &MONTH_NAMES };
const DAY_OF_WEEK: FieldSpec = FieldSpec { name: "day-of-week", min: 0, max: 7, names: &DAY_NAMES };

/// Set of allowed values for one field, as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CronField {
    bits: u64,
    /// Field was a bare `*` or `?`. Matters for the day-of-month/day-of-week rule.
    any: bool,
}

impl CronField {
    pub fn contains(&self, value: u32) -> bool {
        value < 64 && self.bits & (1 << value) != 0
    }

    pub fn is_any(&self) -> bool {
        self.any
    }

    fn parse(expr: &str, spec: FieldSpec) -> Result<Self, CronParseError> {
        let mut field = CronField { bits: 0, any: false };
        for part in expr.split(',') {
            field.parse_part(part, spec)?;
        }
        Ok(field)
    }

    fn parse_part(&mut self, part: &str, spec: FieldSpec) -> Result<(), CronParseError> {
        let (range, step) = match part.split_once('/') {
            Some((r, s)) => {
                let step: u32 = s.parse().map_err(|_| CronParseError::InvalidStep {
                    field: spec.name,
                    value: part.to_string(),
                })?;
                if step == 0 {
                    return Err(CronParseError::InvalidStep {
                        field: spec.name,
                        value: part.to_string(),
                    });
                }
                (r, Some(step))
            }
            None => (part, None),
        };

        let (start, end) = if range == "*" || range == "?" {
            if step.unwrap_or(1) == 1 {
                self.any = true;
            }
            (spec.min, spec.max)
        } else if let Some((lo, hi)) = range.split_once('-') {
            (parse_value(lo, spec)?, parse_value(hi, spec)?)
        } else {
            let start = parse_value(range, spec)?;
            // `N/S` runs from N to the end of the range.
            (start, if step.is_some() { spec.max } else { start })
        };
        if start > end {
            return Err(CronParseError::InvalidValue {
                field: spec.name,
                value: part.to_string(),
            });
        }

        let step = step.unwrap_or(1) as usize;
        for v in (start..=end).step_by(step) {
            self.bits |= 1 << v;
        }
        Ok(())
    }
}

fn parse_value(s: &str, spec: FieldSpec) -> Result<u32, CronParseError> {
    let lower = s.to_ascii_lowercase();
    if let Some(idx) = spec.names.iter().position(|n| *n == lower) {
        return Ok(idx as u32 + spec.min);
    }
    let value: u32 = s.parse().map_err(|_| CronParseError::InvalidValue {
        field: spec.name,
        value: s.to_string(),
    })?;
    if value < spec.min || value > spec.max {
        return Err(CronParseError::OutOfRange {
            field: spec.name,
            value,
            min: spec.min,
            max: spec.max,
        });
    }
    Ok(value)
}

/// Parse `@every` durations such as `90s`, `15m`, `1h30m`.
fn parse_every(s: &str) -> Result<Duration, CronParseError> {
    let err = || CronParseError::InvalidDuration(s.to_string());
    let mut total = 0u64;
    let mut digits = String::new();
    let mut saw_unit = false;
    for c in s.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let n: u64 = digits.parse().map_err(|_| err())?;
        digits.clear();
        let secs = match c {
            'h' => n.checked_mul(3600),
            'm' => n.checked_mul(60),
            's' => Some(n),
            _ => None,
        }
        .ok_or_else(err)?;
        total = total.checked_add(secs).ok_or_else(err)?;
        saw_unit = true;
    }
    if !digits.is_empty() || !saw_unit || total == 0 {
        return Err(err());
    }
    Ok(Duration::from_secs(total))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Schedule {
    Fields {
        minute: CronField,
        hour: CronField,
        day_of_month: CronField,
        month: CronField,
        day_of_week: CronField,
    },
    Every(Duration),
}

/// A parsed schedule expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpr {
    source: String,
    schedule: Schedule,
}

impl fmt::Display for CronExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for CronExpr {
    type Err = CronParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl CronExpr {
    pub fn parse(expr: &str) -> Result<Self, CronParseError> {
        let trimmed = expr.trim();
        if trimmed.is_empty() {
            return Err(CronParseError::Empty);
        }

        let fields_src = if let Some(descriptor) = trimmed.strip_prefix('@') {
            if let Some(dur) = descriptor.strip_prefix("every ") {
                return Ok(Self {
                    source: trimmed.to_string(),
                    schedule: Schedule::Every(parse_every(dur.trim())?),
                });
            }
            match descriptor {
                "yearly" | "annually" => "0 0 1 1 *",
                "monthly" => "0 0 1 * *",
                "weekly" => "0 0 * * 0",
                "daily" | "midnight" => "0 0 * * *",
                "hourly" => "0 * * * *",
                _ => return Err(CronParseError::UnknownDescriptor(trimmed.to_string())),
            }
        } else {
            trimmed
        };

        let parts: Vec<&str> = fields_src.split_whitespace().collect();
        if parts.len() != 5 {
            return Err(CronParseError::FieldCount(parts.len()));
        }
        let mut day_of_week = CronField::parse(parts[4], DAY_OF_WEEK)?;
        // 7 is an alias for Sunday.
        if day_of_week.contains(7) {
            day_of_week.bits = (day_of_week.bits & !(1 << 7)) | 1;
        }

        Ok(Self {
            source: trimmed.to_string(),
            schedule: Schedule::Fields {
                minute: CronField::parse(parts[0], MINUTE)?,
                hour: CronField::parse(parts[1], HOUR)?,
                day_of_month: CronField::parse(parts[2], DAY_OF_MONTH)?,
                month: CronField::parse(parts[3], MONTH)?,
                day_of_week,
            },
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// First occurrence strictly after `after`, in `after`'s time zone.
    ///
    /// Wall-clock times skipped by a DST transition never fire; repeated ones
    /// fire once, at the earlier instant.
    pub fn next_after<Tz: TimeZone>(&self, after: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        match &self.schedule {
            Schedule::Every(every) => Some(after.clone() + ChronoDuration::from_std(*every).ok()?),
            Schedule::Fields {
                minute,
                hour,
                day_of_month,
                month,
                day_of_week,
            } => {
                let tz = after.timezone();
                let start = after.naive_local().with_second(0)?.with_nanosecond(0)?
                    + ChronoDuration::minutes(1);
                let limit = start.year() + SEARCH_YEARS;
                let mut t = start;

                while t.year() <= limit {
                    if !month.contains(t.month()) {
                        t = first_of_next_month(t)?;
                        continue;
                    }
                    if !day_matches(t.date(), day_of_month, day_of_week) {
                        t = t.date().succ_opt()?.and_hms_opt(0, 0, 0)?;
                        continue;
                    }
                    if !hour.contains(t.hour()) {
                        t = t.date().and_hms_opt(t.hour(), 0, 0)? + ChronoDuration::hours(1);
                        continue;
                    }
                    if !minute.contains(t.minute()) {
                        t += ChronoDuration::minutes(1);
                        continue;
                    }
                    match tz.from_local_datetime(&t).earliest() {
                        Some(found) => return Some(found),
                        None => t += ChronoDuration::minutes(1),
                    }
                }
                None
            }
        }
    }
}

fn day_matches(date: NaiveDate, dom: &CronField, dow: &CronField) -> bool {
    let dom_ok = dom.contains(date.day());
    let dow_ok = dow.contains(date.weekday().num_days_from_sunday());
    if dom.is_any() || dow.is_any() {
        dom_ok && dow_ok
    } else {
        dom_ok || dow_ok
    }
}

fn first_of_next_month(t: NaiveDateTime) -> Option<NaiveDateTime> {
    let (y, m) = if t.month() == 12 {
        (t.year() + 1, 1)
    } else {
        (t.year(), t.month() + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1)?.and_hms_opt(0, 0, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn next(expr: &str, from: DateTime<Utc>) -> DateTime<Utc> {
        CronExpr::parse(expr).unwrap().next_after(&from).unwrap()
    }

    #[test]
    fn daily_at_three() {
        assert_eq!(next("0 3 * * *", at(2024, 5, 1, 2, 59)), at(2024, 5, 1, 3, 0));
        assert_eq!(next("0 3 * * *", at(2024, 5, 1, 3, 0)), at(2024, 5, 2, 3, 0));
    }

    #[test]
    fn step_and_list() {
        assert_eq!(next("*/15 * * * *", at(2024, 5, 1, 10, 16)), at(2024, 5, 1, 10, 30));
        assert_eq!(next("5,35 * * * *", at(2024, 5, 1, 10, 6)), at(2024, 5, 1, 10, 35));
        assert_eq!(next("10/20 * * * *", at(2024, 5, 1, 10, 31)), at(2024, 5, 1, 10, 50));
    }

    #[test]
    fn month_rollover_and_names() {
        // 2024-05-01 is a Wednesday.
        assert_eq!(next("30 4 1 jan *", at(2024, 5, 1, 0, 0)), at(2025, 1, 1, 4, 30));
        assert_eq!(next("0 9 * * MON-FRI", at(2024, 5, 3, 10, 0)), at(2024, 5, 6, 9, 0));
    }

    #[test]
    fn sunday_is_zero_or_seven() {
        let a = next("0 0 * * 0", at(2024, 5, 1, 0, 0));
        let b = next("0 0 * * 7", at(2024, 5, 1, 0, 0));
        assert_eq!(a, b);
        assert_eq!(a, at(2024, 5, 5, 0, 0));
    }

    #[test]
    fn restricted_dom_and_dow_are_ored() {
        // Day 15 or any Monday; from Wed May 1 the next is Mon May 6.
        assert_eq!(next("0 0 15 * 1", at(2024, 5, 1, 0, 0)), at(2024, 5, 6, 0, 0));
        // With weekday unrestricted only the 15th matches.
        assert_eq!(next("0 0 15 * *", at(2024, 5, 1, 0, 0)), at(2024, 5, 15, 0, 0));
    }

    #[test]
    fn leap_day() {
        assert_eq!(next("0 0 29 2 *", at(2025, 1, 1, 0, 0)), at(2028, 2, 29, 0, 0));
    }

    #[test]
    fn impossible_date_gives_none() {
        let expr = CronExpr::parse("0 0 30 2 *").unwrap();
        assert!(expr.next_after(&at(2024, 1, 1, 0, 0)).is_none());
    }

    #[test]
    fn descriptors() {
        assert_eq!(next("@daily", at(2024, 5, 1, 12, 0)), at(2024, 5, 2, 0, 0));
        assert_eq!(next("@hourly", at(2024, 5, 1, 12, 0)), at(2024, 5, 1, 13, 0));
        assert_eq!(next("@weekly", at(2024, 5, 1, 12, 0)), at(2024, 5, 5, 0, 0));
        assert_eq!(next("@monthly", at(2024, 5, 1, 12, 0)), at(2024, 6, 1, 0, 0));
        assert_eq!(next("@yearly", at(2024, 5, 1, 12, 0)), at(2025, 1, 1, 0, 0));
    }

    #[test]
    fn every_duration() {
        let from = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(next("@every 1h30m", from), at(2024, 5, 1, 13, 30));
        assert_eq!(next("@every 90s", from), Utc.with_ymd_and_hms(2024, 5, 1, 12, 1, 30).unwrap());
    }

    #[test]
    fn parse_errors() {
        assert_eq!(CronExpr::parse("  "), Err(CronParseError::Empty));
        assert_eq!(CronExpr::parse("* * *"), Err(CronParseError::FieldCount(3)));
        assert!(matches!(
            CronExpr::parse("60 * * * *"),
            Err(CronParseError::OutOfRange { field: "minute", value: 60, .. })
        ));
        assert!(matches!(CronExpr::parse("*/0 * * * *"), Err(CronParseError::InvalidStep { .. })));
        assert!(matches!(CronExpr::parse("a * * * *"), Err(CronParseError::InvalidValue { .. })));
        assert!(matches!(CronExpr::parse("5-1 * * * *"), Err(CronParseError::InvalidValue { .. })));
        assert!(matches!(CronExpr::parse("@fortnightly"), Err(CronParseError::UnknownDescriptor(_))));
        assert!(matches!(CronExpr::parse("@every 0s"), Err(CronParseError::InvalidDuration(_))));
        assert!(matches!(CronExpr::parse("@every 10"), Err(CronParseError::InvalidDuration(_))));
        assert!(matches!(CronExpr::parse("not a cron"), Err(CronParseError::FieldCount(3))));
    }

    #[test]
    fn display_keeps_source() {
        let expr: CronExpr = " 0 3 * * * ".parse().unwrap();
        assert_eq!(expr.to_string(), "0 3 * * *");
    }
}
