//! Composable predicates narrowing a record collection.
//!
//! Predicates are pure: they read a collection and produce a new, narrower
//! one. A pipeline applies them sequentially — each predicate consumes the
//! previous predicate's output. The date window is inclusive at the lower
//! bound and exclusive at the upper one (`start <= t < end`).

use crate::parser::DATE_FORMAT;
use crate::period::{self, PeriodError};
use crate::record::RecordCollection;
use chrono::{Duration, NaiveDateTime};
use regex::Regex;

/// Widest supported window, and the lookback used when no start date is
/// given: 900 days (~2.5 years).
pub const MAX_SPAN_DAYS: i64 = 900;

/// Most authors a single plot can carry.
pub const MAX_AUTHORS: usize = 3;

#[derive(Debug)]
pub enum FilterError {
    /// A user-supplied author token failed to compile as a regex.
    BadAuthorPattern {
        pattern: String,
        source: regex::Error,
    },
    /// No author token was supplied where at least one is required.
    NoAuthors,
    /// More author tokens than [`MAX_AUTHORS`].
    TooManyAuthors { count: usize },
    /// An author token was empty or whitespace-only.
    BlankAuthor,
    /// A period key was combined with an explicit start or end date.
    PeriodWithDates { period: String },
    /// Start is not strictly before end.
    InvertedRange {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    /// The window exceeds [`MAX_SPAN_DAYS`].
    SpanTooLarge {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    /// The date window matched no records.
    EmptyDateWindow {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    /// The author tokens matched no records.
    EmptyAuthorMatch { tokens: Vec<String> },
    /// An invalid period key or date string.
    Period(PeriodError),
}

impl std::fmt::Display for FilterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterError::BadAuthorPattern { pattern, source } => {
                write!(f, "author {pattern:?} is not a valid regex: {source}")
            }
            FilterError::NoAuthors => write!(f, "at least one author must be provided"),
            FilterError::TooManyAuthors { count } => {
                write!(f, "only up to {MAX_AUTHORS} authors are supported, got {count}")
            }
            FilterError::BlankAuthor => write!(f, "author cannot be empty"),
            FilterError::PeriodWithDates { period } => {
                write!(f, "period {period:?} cannot be combined with explicit dates")
            }
            FilterError::InvertedRange { start, end } => {
                write!(
                    f,
                    "start date {} must be before end date {}",
                    start.format(DATE_FORMAT),
                    end.format(DATE_FORMAT)
                )
            }
            FilterError::SpanTooLarge { start, end } => {
                write!(
                    f,
                    "window from {} to {} exceeds the {MAX_SPAN_DAYS}-day maximum",
                    start.format(DATE_FORMAT),
                    end.format(DATE_FORMAT)
                )
            }
            FilterError::EmptyDateWindow { start, end } => {
                write!(
                    f,
                    "no records found between {} and {}",
                    start.format(DATE_FORMAT),
                    end.format(DATE_FORMAT)
                )
            }
            FilterError::EmptyAuthorMatch { tokens } => {
                write!(f, "no records found for authors {}", tokens.join(", "))
            }
            FilterError::Period(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for FilterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FilterError::BadAuthorPattern { source, .. } => Some(source),
            FilterError::Period(source) => Some(source),
            _ => None,
        }
    }
}

impl From<PeriodError> for FilterError {
    fn from(e: PeriodError) -> Self {
        FilterError::Period(e)
    }
}

/// A pure predicate from a collection to a narrower one.
pub type Predicate = Box<dyn Fn(&RecordCollection) -> Result<RecordCollection, FilterError>>;

/// Apply predicates as a sequential pipeline: each one consumes the previous
/// predicate's output.
pub fn apply(
    collection: &RecordCollection,
    predicates: &[Predicate],
) -> Result<RecordCollection, FilterError> {
    let mut current = collection.clone();
    for predicate in predicates {
        current = predicate(&current)?;
    }
    Ok(current)
}

/// Default window against `now`: the maximum lookback. Starts one second
/// after the span boundary so the window itself never exceeds
/// [`MAX_SPAN_DAYS`].
fn default_window(now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    (
        now - Duration::days(MAX_SPAN_DAYS) + Duration::seconds(1),
        now,
    )
}

/// Keep records with `start <= timestamp < end`.
///
/// Missing bounds default to the maximum lookback window ending now. An empty
/// result is an error, never a silent success.
pub fn with_date(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Predicate {
    Box::new(move |collection| {
        let (default_start, default_end) = default_window(chrono::Local::now().naive_local());
        let start = start.unwrap_or(default_start);
        let end = end.unwrap_or(default_end);

        let kept: RecordCollection = collection
            .iter()
            .filter(|r| r.date() >= start && r.date() < end)
            .cloned()
            .collect();

        if kept.is_empty() {
            return Err(FilterError::EmptyDateWindow { start, end });
        }
        Ok(kept)
    })
}

/// Keep records whose author composite matches any of the supplied tokens,
/// each treated as a case-insensitive regex.
pub fn with_authors(tokens: Vec<String>) -> Predicate {
    Box::new(move |collection| {
        let patterns = compile_tokens(&tokens)?;

        let kept: RecordCollection = collection
            .iter()
            .filter(|r| patterns.iter().any(|p| p.is_match(r.author())))
            .cloned()
            .collect();

        if kept.is_empty() {
            return Err(FilterError::EmptyAuthorMatch {
                tokens: tokens.clone(),
            });
        }
        Ok(kept)
    })
}

/// Rewrite matching authors to the canonical alias text, via a copy.
///
/// One case-insensitive alternation is built from the aliases; a record whose
/// author matches has its author replaced by the alias equal (ignoring case)
/// to the matched text. Non-matching records pass through unchanged, and zero
/// rewrites is not an error.
pub fn with_merge_authors(aliases: Vec<String>) -> Predicate {
    Box::new(move |collection| {
        let joined = aliases.join("|");
        let alternation =
            Regex::new(&format!("(?i)({joined})")).map_err(|source| FilterError::BadAuthorPattern {
                pattern: joined.clone(),
                source,
            })?;

        let merged: RecordCollection = collection
            .iter()
            .map(|r| {
                let Some(caps) = alternation.captures(r.author()) else {
                    return r.clone();
                };
                let matched = &caps[1];
                match aliases.iter().find(|a| a.eq_ignore_ascii_case(matched)) {
                    Some(alias) => r.with_author(alias.clone()),
                    None => r.clone(),
                }
            })
            .collect();

        Ok(merged)
    })
}

fn compile_tokens(tokens: &[String]) -> Result<Vec<Regex>, FilterError> {
    tokens
        .iter()
        .map(|t| {
            Regex::new(&format!("(?i){t}")).map_err(|source| FilterError::BadAuthorPattern {
                pattern: t.clone(),
                source,
            })
        })
        .collect()
}

/// Validated filter parameters for a plot run: a resolved date window plus
/// author tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOptions {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub authors: Vec<String>,
}

impl FilterOptions {
    /// Validate and resolve user input against `now`.
    ///
    /// Rejects: empty/blank/too-many author lists, a period key combined with
    /// explicit dates, an unknown period key, an inverted or empty window,
    /// and a window wider than [`MAX_SPAN_DAYS`].
    pub fn build(
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
        period: Option<&str>,
        authors: Vec<String>,
        now: NaiveDateTime,
    ) -> Result<Self, FilterError> {
        if authors.is_empty() {
            return Err(FilterError::NoAuthors);
        }
        if authors.len() > MAX_AUTHORS {
            return Err(FilterError::TooManyAuthors {
                count: authors.len(),
            });
        }
        if authors.iter().any(|a| a.trim().is_empty()) {
            return Err(FilterError::BlankAuthor);
        }

        let (start, end) = match period {
            Some(key) => {
                if start.is_some() || end.is_some() {
                    return Err(FilterError::PeriodWithDates {
                        period: key.to_string(),
                    });
                }
                let range = period::resolve(key, now)?;
                (range.start, range.end)
            }
            None => {
                let (default_start, default_end) = default_window(now);
                (start.unwrap_or(default_start), end.unwrap_or(default_end))
            }
        };

        if start >= end {
            return Err(FilterError::InvertedRange { start, end });
        }
        if end - start > Duration::days(MAX_SPAN_DAYS) {
            return Err(FilterError::SpanTooLarge { start, end });
        }

        Ok(Self {
            start,
            end,
            authors,
        })
    }

    /// The standard plot pipeline: date window, author match, author merge.
    pub fn predicates(&self) -> Vec<Predicate> {
        vec![
            with_date(Some(self.start), Some(self.end)),
            with_authors(self.authors.clone()),
            with_merge_authors(self.authors.clone()),
        ]
    }
}
