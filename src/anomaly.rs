//! Scanning a persisted report for suspiciously large changes.

use crate::filter::{self, FilterError};
use crate::record::{ChangeRecord, RecordCollection};
use chrono::NaiveDateTime;

/// Added-line count above which a change is flagged, unless overridden.
pub const DEFAULT_THRESHOLD: i64 = 3_000;

#[derive(Debug)]
pub enum AnomalyError {
    /// The threshold must be positive.
    BadThreshold { quantity: i64 },
    /// No author token was supplied.
    NoAuthors,
    /// Narrowing the report to the window and authors failed.
    Filter(FilterError),
}

impl std::fmt::Display for AnomalyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnomalyError::BadThreshold { quantity } => {
                write!(f, "quantity must be greater than 0, got {quantity}")
            }
            AnomalyError::NoAuthors => write!(f, "at least one author must be provided"),
            AnomalyError::Filter(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for AnomalyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AnomalyError::Filter(source) => Some(source),
            _ => None,
        }
    }
}

impl From<FilterError> for AnomalyError {
    fn from(e: FilterError) -> Self {
        AnomalyError::Filter(e)
    }
}

/// Validated anomaly scan parameters.
#[derive(Debug, Clone)]
pub struct AnomalyOptions {
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
    quantity: i64,
    authors: Vec<String>,
}

impl AnomalyOptions {
    pub fn build(
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
        quantity: i64,
        authors: Vec<String>,
    ) -> Result<Self, AnomalyError> {
        if quantity <= 0 {
            return Err(AnomalyError::BadThreshold { quantity });
        }
        if authors.is_empty() {
            return Err(AnomalyError::NoAuthors);
        }
        Ok(Self {
            start,
            end,
            quantity,
            authors,
        })
    }
}

/// Narrow the collection to the window and authors, then return every record
/// whose added lines exceed the threshold (strictly).
///
/// Missing window bounds fall back to the date predicate's defaults. Matching
/// no anomalies is an empty result, not an error; matching no records at all
/// in the window or for the authors is the usual filter error.
pub fn scan(
    collection: &RecordCollection,
    opts: &AnomalyOptions,
) -> Result<Vec<ChangeRecord>, AnomalyError> {
    let narrowed = filter::apply(
        collection,
        &[
            filter::with_date(opts.start, opts.end),
            filter::with_authors(opts.authors.clone()),
        ],
    )?;

    Ok(narrowed
        .iter()
        .filter(|r| r.plus() > opts.quantity)
        .cloned()
        .collect())
}
