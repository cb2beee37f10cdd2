//! Stateful parser turning raw `git log --numstat` output into change records.
//!
//! Line shapes (see [`crate::gitlog`] for the command that produces them):
//!   - Header: `'<YYYY-MM-DD HH:MM>',<email>,<name>` — starts a pending record.
//!   - Numstat: `<added>\t<removed>\t...` — sets counts on the pending record.
//!   - Path: `<added>\t<removed>\t<path>` — finalizes one record and resets
//!     the pending one, carrying forward timestamp and author only.
//!
//! Blank separators and anything else (binary-file `-\t-\t` lines included)
//! are ignored. The only fatal condition is a header whose date does not
//! parse; every other anomaly degrades to zeroed counts.

use crate::record::{author_composite, ChangeRecord, RecordCollection};
use regex::Regex;
use std::sync::LazyLock;

/// Timestamp format emitted by the git invocation. Naive: no offset.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^'(\d{4}-\d{2}-\d{2} \d{2}:\d{2})',(.*),(.*)").unwrap());
static NUMSTAT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)\t(\d+)\t").unwrap());
static PATH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\t\d+\t(.*)").unwrap());

/// A single file change this large is suspicious (vendored code, generated
/// files); worth flagging, never worth failing on.
const ANOMALY_LINES: i64 = 3_000;

#[derive(Debug)]
pub enum ParseError {
    /// A header line carried a date that does not match [`DATE_FORMAT`].
    BadHeaderDate {
        value: String,
        source: chrono::ParseError,
    },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::BadHeaderDate { value, source } => {
                write!(f, "unparseable commit date {value:?}: {source}")
            }
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::BadHeaderDate { source, .. } => Some(source),
        }
    }
}

/// Parse ordered raw log lines into a sorted collection.
///
/// A commit with k path lines yields exactly k records sharing one timestamp
/// and author, each with its own counts.
pub fn parse(lines: &[String]) -> Result<RecordCollection, ParseError> {
    let mut collection = RecordCollection::new();
    let mut pending: Option<ChangeRecord> = None;

    for line in lines {
        if let Some(caps) = HEADER_RE.captures(line) {
            let raw = &caps[1];
            let date = chrono::NaiveDateTime::parse_from_str(raw, DATE_FORMAT).map_err(
                |source| ParseError::BadHeaderDate {
                    value: raw.to_string(),
                    source,
                },
            )?;
            pending = Some(ChangeRecord::new(date, author_composite(&caps[3], &caps[2])));
            continue;
        }

        if let Some(caps) = NUMSTAT_RE.captures(line) {
            if let Some(record) = pending.as_mut() {
                // Non-numeric stats stay at zero rather than aborting.
                let plus = caps[1].parse().unwrap_or(0);
                let minus = caps[2].parse().unwrap_or(0);
                record.set_counts(plus, minus);
            }
        }

        if let Some(caps) = PATH_RE.captures(line) {
            if let Some(mut done) = pending.take() {
                done.set_path(&caps[1]);
                if done.plus() > ANOMALY_LINES || done.minus() > ANOMALY_LINES {
                    tracing::warn!(
                        plus = done.plus(),
                        minus = done.minus(),
                        path = done.path(),
                        author = done.author(),
                        "possible anomaly in line stats"
                    );
                }
                pending = Some(ChangeRecord::new(done.date(), done.author().to_string()));
                collection.push(done);
            }
        }
    }

    collection.sort();
    Ok(collection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_minimal_commit_with_defaulted_author() {
        let parsed = parse(&lines(&["'2022-01-20 01:46',,", "1\t0\ta.go"])).unwrap();

        assert_eq!(parsed.len(), 1);
        let r = &parsed.records()[0];
        assert_eq!(r.author(), "Unknown Name (Unknown Email)");
        assert_eq!(
            r.date(),
            NaiveDate::from_ymd_opt(2022, 1, 20)
                .unwrap()
                .and_hms_opt(1, 46, 0)
                .unwrap()
        );
        assert_eq!(r.plus(), 1);
        assert_eq!(r.minus(), 0);
        assert_eq!(r.diff(), 1);
        assert_eq!(r.path(), "a.go");
    }

    #[test]
    fn one_commit_many_files_shares_identity_with_independent_counts() {
        let parsed = parse(&lines(&[
            "'2023-04-01 09:30',alice@x.com,Alice",
            "10\t2\tsrc/lib.rs",
            "3\t7\tsrc/main.rs",
            "0\t1\tREADME.md",
        ]))
        .unwrap();

        assert_eq!(parsed.len(), 3);
        for r in parsed.iter() {
            assert_eq!(r.author(), "Alice (alice@x.com)");
            assert_eq!(r.diff(), r.plus() - r.minus());
        }
        let by_path: Vec<_> = parsed.iter().map(|r| (r.path(), r.plus(), r.minus())).collect();
        // Output is sorted by path within the shared author/date.
        assert_eq!(
            by_path,
            vec![("README.md", 0, 1), ("src/lib.rs", 10, 2), ("src/main.rs", 3, 7)]
        );
    }

    #[test]
    fn blank_and_binary_lines_are_ignored() {
        let parsed = parse(&lines(&[
            "'2023-04-01 09:30',alice@x.com,Alice",
            "",
            "-\t-\timage.png",
            "5\t0\tsrc/lib.rs",
            "",
        ]))
        .unwrap();

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.records()[0].path(), "src/lib.rs");
    }

    #[test]
    fn stat_lines_before_any_header_are_ignored() {
        let parsed = parse(&lines(&["1\t2\torphan.rs", "'2023-04-01 09:30',a@x.com,A"])).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn rename_marker_is_preserved_in_path() {
        let parsed = parse(&lines(&[
            "'2023-04-01 09:30',alice@x.com,Alice",
            "4\t4\tsrc/{old => new}/mod.rs",
        ]))
        .unwrap();
        assert_eq!(parsed.records()[0].path(), "src/{old => new}/mod.rs");
    }

    #[test]
    fn second_header_resets_pending_counts() {
        let parsed = parse(&lines(&[
            "'2023-04-01 09:30',alice@x.com,Alice",
            "10\t0\ta.rs",
            "'2023-04-02 10:00',bob@x.com,Bob",
            "2\t1\tb.rs",
        ]))
        .unwrap();

        assert_eq!(parsed.len(), 2);
        let bob = parsed.iter().find(|r| r.author().starts_with("Bob")).unwrap();
        assert_eq!((bob.plus(), bob.minus(), bob.path()), (2, 1, "b.rs"));
    }

    #[test]
    fn bad_header_date_is_fatal() {
        let err = parse(&lines(&["'2023-13-45 99:99',a@x.com,A", "1\t0\ta.rs"])).unwrap_err();
        assert!(matches!(err, ParseError::BadHeaderDate { .. }));
        assert!(err.to_string().contains("2023-13-45"));
    }

    #[test]
    fn output_is_sorted_across_commits() {
        let parsed = parse(&lines(&[
            "'2023-04-02 10:00',bob@x.com,Bob",
            "1\t0\tz.rs",
            "'2023-04-01 09:30',alice@x.com,Alice",
            "1\t0\ta.rs",
        ]))
        .unwrap();

        let authors: Vec<_> = parsed.iter().map(|r| r.author().to_string()).collect();
        assert_eq!(authors, vec!["Alice (alice@x.com)", "Bob (bob@x.com)"]);
    }

    #[test]
    fn empty_input_yields_empty_collection() {
        assert!(parse(&[]).unwrap().is_empty());
    }
}
