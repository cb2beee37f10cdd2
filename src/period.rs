//! Symbolic period keys ("today", "7d", ...) resolved to concrete ranges
//! relative to a reference instant.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// A concrete (start, end) instant pair used to pre-populate date filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Every key accepted by [`resolve`].
pub const PERIOD_KEYS: &[&str] = &[
    "today",
    "24h",
    "this_week",
    "7d",
    "this_month",
    "30d",
    "this_year",
    "1y",
];

#[derive(Debug)]
pub enum PeriodError {
    UnknownKey { key: String },
    BadDate { value: String },
}

impl std::fmt::Display for PeriodError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeriodError::UnknownKey { key } => {
                write!(
                    f,
                    "invalid period {key:?}, must be one of: {}",
                    PERIOD_KEYS.join(", ")
                )
            }
            PeriodError::BadDate { value } => {
                write!(
                    f,
                    "invalid date {value:?}, expected YYYY-MM-DD[ HH:MM], YYYY-MM or YYYY"
                )
            }
        }
    }
}

impl std::error::Error for PeriodError {}

/// Resolve a period key against `now`. Weeks start on Sunday.
pub fn resolve(key: &str, now: NaiveDateTime) -> Result<PeriodRange, PeriodError> {
    let start_of_day = now.date().and_time(NaiveTime::MIN);
    let end_of_day = start_of_day + Duration::days(1) - Duration::seconds(1);
    let start_of_week =
        start_of_day - Duration::days(i64::from(now.date().weekday().num_days_from_sunday()));
    let end_of_week = start_of_week + Duration::days(7) - Duration::seconds(1);
    let start_of_month = now
        .date()
        .with_day(1)
        .unwrap_or(now.date())
        .and_time(NaiveTime::MIN);
    let start_of_year = NaiveDate::from_ymd_opt(now.year(), 1, 1)
        .unwrap_or(now.date())
        .and_time(NaiveTime::MIN);
    // Feb 29 has no previous-year counterpart; fall back to 365 days.
    let year_ago = now
        .with_year(now.year() - 1)
        .unwrap_or(now - Duration::days(365));

    let range = match key {
        "today" => PeriodRange {
            start: start_of_day,
            end: end_of_day,
        },
        "24h" => PeriodRange {
            start: now - Duration::days(1),
            end: now,
        },
        "this_week" => PeriodRange {
            start: start_of_week,
            end: end_of_week,
        },
        "7d" => PeriodRange {
            start: now - Duration::days(7),
            end: now,
        },
        "this_month" => PeriodRange {
            start: start_of_month,
            end: now,
        },
        "30d" => PeriodRange {
            start: now - Duration::days(30),
            end: now,
        },
        "this_year" => PeriodRange {
            start: start_of_year,
            end: now,
        },
        "1y" => PeriodRange {
            start: year_ago,
            end: now,
        },
        _ => {
            return Err(PeriodError::UnknownKey {
                key: key.to_string(),
            })
        }
    };

    Ok(range)
}

/// Parse a user-supplied date, accepting progressively coarser forms:
/// `YYYY-MM-DD HH:MM`, `YYYY-MM-DD`, `YYYY-MM`, `YYYY`. Coarser forms resolve
/// to the start of the period they name.
pub fn parse_date(raw: &str) -> Result<NaiveDateTime, PeriodError> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M") {
        return Ok(dt);
    }
    let padded = match raw.len() {
        10 => raw.to_string(),
        7 => format!("{raw}-01"),
        4 => format!("{raw}-01-01"),
        _ => raw.to_string(),
    };
    NaiveDate::parse_from_str(&padded, "%Y-%m-%d")
        .map(|d| d.and_time(NaiveTime::MIN))
        .map_err(|_| PeriodError::BadDate {
            value: raw.to_string(),
        })
}
