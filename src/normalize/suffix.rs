// src/normalize/suffix.rs
//
// Visit-type markers that staff typed into the booking name field.

use once_cell::sync::Lazy;
use regex::Regex;

/// Checked in order; the first suffix that ends the name is removed.
const VISIT_SUFFIXES: &[&str] = &[
    " 방문시타",
    " 방문",
    " 방문AS",
    " 방문 A/S",
    "AS",
    "as",
    " A/S",
    " a/s",
];

/// Strip a trailing visit marker (`김철수 방문시타` → `김철수`).
///
/// Returns the trimmed base name and the suffix that was removed, or the
/// name unchanged and `None`.
pub fn remove_visit_suffix(name: &str) -> (String, Option<&'static str>) {
    VISIT_SUFFIXES
        .iter()
        .find(|suffix| name.ends_with(*suffix))
        .map(|suffix| {
            let base = &name[..name.len() - suffix.len()];
            (base.trim().to_string(), Some(*suffix))
        })
        .unwrap_or_else(|| (name.to_string(), None))
}

fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("AS marker pattern should compile"))
        .collect()
}

/// `AS김용율`, `A/S 노태율`
static LEADING_AS: Lazy<Vec<Regex>> = Lazy::new(|| compile_all(&[r"(?i)^AS\s*", r"(?i)^A/S\s*"]));

/// `이태성 AS 찾으러옴`, `정윤호A/S 방문`, `이동열 방문AS 시타채수거`
static AS_WITH_TRAILER: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_all(&[
        r"(?i)\s+AS\s+.*$",
        r"(?i)\s+A/S\s+.*$",
        r"(?i)A/S\s+.*$",
        r"(?i)방문AS\s+.*$",
        r"(?i)AS\s+.*$",
    ])
});

/// Hangul name glued to the marker; only the Hangul run survives.
static HANGUL_THEN_AS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_all(&[r"(?i)([가-힣]+)A/S\s+.*$", r"(?i)([가-힣]+)AS\s+.*$"])
});

/// `김인섭AS`, `형남길 a/s`
static TRAILING_AS: Lazy<Vec<Regex>> =
    Lazy::new(|| compile_all(&[r"(?i)AS\s*$", r"(?i)\s*A/S$"]));

/// Outcome of [`remove_as_marker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsCleaned {
    pub base_name: String,
    pub has_as: bool,
}

fn strip_first(name: &str, patterns: &[Regex]) -> Option<String> {
    patterns
        .iter()
        .find(|re| re.is_match(name))
        .map(|re| re.replace(name, "").trim().to_string())
}

/// Remove an after-sales ("AS" / "A/S") marker from a booking name.
///
/// Passes run in sequence, each removing at most one marker: leading
/// marker, marker followed by free text (dropped with it), Hangul name glued
/// to a marker and text, trailing marker.
pub fn remove_as_marker(name: &str) -> AsCleaned {
    let mut base = name.trim().to_string();
    let mut has_as = false;

    for pass in [&*LEADING_AS, &*AS_WITH_TRAILER] {
        if let Some(stripped) = strip_first(&base, pass) {
            base = stripped;
            has_as = true;
        }
    }

    if let Some(hangul) = HANGUL_THEN_AS
        .iter()
        .find_map(|re| re.captures(&base).map(|caps| caps[1].trim().to_string()))
    {
        base = hangul;
        has_as = true;
    }

    if let Some(stripped) = strip_first(&base, &TRAILING_AS) {
        base = stripped;
        has_as = true;
    }

    AsCleaned {
        base_name: base,
        has_as,
    }
}
