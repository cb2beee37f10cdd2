//! Pure reducers grouping a filtered collection into chart-ready data.
//!
//! The core never touches a rendering library: each reducer emits a
//! [`ChartData`] value (a tagged chart kind plus labels and series of
//! added-line sums) and an external renderer switches on the kind.

use crate::record::{ChangeRecord, RecordCollection};
use chrono::{Datelike, NaiveDate, Timelike};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Monthly,
    Weekday,
    TimeOfDay,
    TopLanguages,
    TopAuthors,
}

impl ChartKind {
    /// Stable name used in output file templates.
    pub fn name(&self) -> &'static str {
        match self {
            ChartKind::Monthly => "monthly",
            ChartKind::Weekday => "weekday",
            ChartKind::TimeOfDay => "time_of_day",
            ChartKind::TopLanguages => "top_languages",
            ChartKind::TopAuthors => "top_authors",
        }
    }
}

/// One named series, with one value per label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Series {
    pub name: String,
    pub values: Vec<i64>,
}

/// Label/series data for one chart, ready for an external renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartData {
    pub kind: ChartKind,
    pub title: String,
    pub labels: Vec<String>,
    pub series: Vec<Series>,
}

/// Group records by calendar month (`YYYY-MM`), summing added lines per
/// author. Labels are ordered chronologically by parsed value.
pub fn monthly(collection: &RecordCollection) -> ChartData {
    let groups = accumulate(collection, |r| r.date().format("%Y-%m").to_string());

    let mut labels: Vec<String> = groups.keys().cloned().collect();
    labels.sort_by_key(|label| {
        NaiveDate::parse_from_str(&format!("{label}-01"), "%Y-%m-%d").unwrap_or(NaiveDate::MIN)
    });

    build(ChartKind::Monthly, "Monthly Report", labels, &groups)
}

const WEEKDAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Group records by weekday, Sunday first.
pub fn weekday(collection: &RecordCollection) -> ChartData {
    let groups = accumulate(collection, |r| {
        WEEKDAYS[r.date().weekday().num_days_from_sunday() as usize].to_string()
    });
    let labels = WEEKDAYS.iter().map(|d| d.to_string()).collect();
    build(ChartKind::Weekday, "Weekday Report", labels, &groups)
}

const TIME_BANDS: [&str; 4] = ["Midnight", "Morning", "Afternoon", "Night"];

/// Band for an hour of day: [0,6) Midnight, [6,12) Morning, [12,19)
/// Afternoon, [19,24) Night. Anything out of range falls back to Midnight.
fn time_band(hour: u32) -> &'static str {
    match hour {
        0..=5 => TIME_BANDS[0],
        6..=11 => TIME_BANDS[1],
        12..=18 => TIME_BANDS[2],
        19..=23 => TIME_BANDS[3],
        _ => TIME_BANDS[0],
    }
}

/// Group records into four fixed time-of-day bands.
pub fn time_of_day(collection: &RecordCollection) -> ChartData {
    let groups = accumulate(collection, |r| time_band(r.date().hour()).to_string());
    let labels = TIME_BANDS.iter().map(|b| b.to_string()).collect();
    build(ChartKind::TimeOfDay, "Time of Day Report", labels, &groups)
}

/// Group records by file-extension-derived language, labels alphabetical.
pub fn top_languages(collection: &RecordCollection) -> ChartData {
    let groups = accumulate(collection, |r| language_for_path(r.path()).to_string());
    let labels: Vec<String> = groups.keys().cloned().collect();
    build(
        ChartKind::TopLanguages,
        "Top Languages Report",
        labels,
        &groups,
    )
}

/// Total added lines per author, most productive first. Single series.
pub fn top_authors(collection: &RecordCollection) -> ChartData {
    let mut totals: BTreeMap<String, i64> = BTreeMap::new();
    for r in collection.iter() {
        *totals.entry(r.author().to_string()).or_insert(0) += r.plus();
    }

    let mut entries: Vec<(String, i64)> = totals.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let labels: Vec<String> = entries.iter().map(|(author, _)| author.clone()).collect();
    let values: Vec<i64> = entries.iter().map(|(_, total)| *total).collect();

    ChartData {
        kind: ChartKind::TopAuthors,
        title: "Top Authors Report".to_string(),
        labels,
        series: vec![Series {
            name: "Authors".to_string(),
            values,
        }],
    }
}

/// Sum added lines into `label -> author -> total`.
fn accumulate(
    collection: &RecordCollection,
    key_fn: impl Fn(&ChangeRecord) -> String,
) -> BTreeMap<String, BTreeMap<String, i64>> {
    let mut groups: BTreeMap<String, BTreeMap<String, i64>> = BTreeMap::new();
    for r in collection.iter() {
        *groups
            .entry(key_fn(r))
            .or_default()
            .entry(r.author().to_string())
            .or_insert(0) += r.plus();
    }
    groups
}

/// One series per author seen anywhere in the groups, values aligned to
/// `labels` with zero fill.
fn build(
    kind: ChartKind,
    title: &str,
    labels: Vec<String>,
    groups: &BTreeMap<String, BTreeMap<String, i64>>,
) -> ChartData {
    let authors: BTreeSet<&String> = groups.values().flat_map(|g| g.keys()).collect();

    let series = authors
        .into_iter()
        .map(|author| Series {
            name: author.clone(),
            values: labels
                .iter()
                .map(|label| {
                    groups
                        .get(label)
                        .and_then(|g| g.get(author))
                        .copied()
                        .unwrap_or(0)
                })
                .collect(),
        })
        .collect();

    ChartData {
        kind,
        title: title.to_string(),
        labels,
        series,
    }
}

/// Language derived from a path's extension; unknown extensions are "Others".
pub fn language_for_path(path: &str) -> &'static str {
    let ext = std::path::Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some(ext) => language_for_ext(ext).unwrap_or("Others"),
        None => "Others",
    }
}

fn language_for_ext(ext: &str) -> Option<&'static str> {
    let lang = match ext {
        "go" => "Go",
        "py" => "Python",
        "js" => "JavaScript",
        "ts" => "TypeScript",
        "rs" => "Rust",
        "html" => "HTML",
        "css" => "CSS",
        "sh" => "Shell",
        "sql" => "SQL",
        "c" => "C",
        "cpp" => "C++",
        "h" => "C header",
        "hpp" => "C++ header",
        "java" => "Java",
        "cs" => "C#",
        "rb" => "Ruby",
        "php" => "PHP",
        "pl" => "Perl",
        "m" => "Objective-C",
        "swift" => "Swift",
        "kt" => "Kotlin",
        "lua" => "Lua",
        "r" => "R",
        "f" => "Fortran",
        "f90" => "Fortran 90",
        "p" => "Pascal",
        "pas" => "Pascal",
        "jl" => "Julia",
        "dart" => "Dart",
        "scala" => "Scala",
        "groovy" => "Groovy",
        "clj" => "Clojure",
        "cljs" => "ClojureScript",
        "el" => "Emacs Lisp",
        "hs" => "Haskell",
        "asm" => "Assembly",
        "erl" => "Erlang",
        "ex" => "Elixir",
        "cob" => "COBOL",
        "vb" => "Visual Basic",
        "fs" => "F#",
        "ml" => "OCaml",
        "pro" => "Prolog",
        "tcl" => "Tcl",
        _ => return None,
    };
    Some(lang)
}
