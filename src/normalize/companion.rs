// src/normalize/companion.rs

use once_cell::sync::Lazy;
use regex::Regex;

use super::notes::append_note;

/// `김민수(여자)`, `김민수 (여자손님 모시고 옴)`
static PARENTHESIZED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?)\(([^)]+)\)$").expect("parenthesized annotation pattern should compile")
});

/// `조영택외 1명`, `조영택 외2명`, `조영택 외 1명 `
static SUFFIX_COUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?)\s*외\s*([0-9]+)명\s*$").expect("suffix count pattern should compile")
});

/// A companion annotation lifted off a booking name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Companion {
    /// Trailing `(...)`; holds the text between the parentheses.
    Parenthesized(String),
    /// Trailing `외 N명`; holds N's digits as typed.
    Counted(String),
}

impl Companion {
    /// The annotation as it should be kept for reference: `(여자)` or `외 1명`.
    pub fn info(&self) -> String {
        match self {
            Companion::Parenthesized(text) => format!("({})", text),
            Companion::Counted(digits) => format!("외 {}명", digits),
        }
    }

    /// Number of companions, when the annotation states one explicitly.
    pub fn count(&self) -> Option<u64> {
        match self {
            Companion::Parenthesized(_) => None,
            Companion::Counted(digits) => digits.parse().ok(),
        }
    }

    /// Human-readable note, e.g. `여자 동반 방문` or `3인 동반 방문`.
    ///
    /// Checked in order: mentions 여자, mentions 2인/외1, explicit count
    /// (party size is companions plus the booker), free text.
    pub fn note_text(&self) -> String {
        let text = self.info().replace(['(', ')'], "");
        let text = text.trim();

        if text.contains("여자") {
            "여자 동반 방문".to_string()
        } else if text.contains("2인") || text.contains("외1") {
            "2인 동반 방문".to_string()
        } else if let Some(n) = self.count() {
            format!("{}인 동반 방문", n.saturating_add(1))
        } else {
            format!("{} 동반 방문", text)
        }
    }
}

/// Result of splitting a raw booking name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub base_name: Option<String>,
    pub companion: Option<Companion>,
}

impl ParsedName {
    pub fn companion_info(&self) -> Option<String> {
        self.companion.as_ref().map(Companion::info)
    }

    pub fn companion_count(&self) -> Option<u64> {
        self.companion.as_ref().and_then(Companion::count)
    }
}

/// One annotation style: recognizes it and splits it off the base name.
trait AnnotationMatcher: Sync {
    fn extract(&self, name: &str) -> Option<(String, Companion)>;
}

struct ParenthesizedAnnotation;

impl AnnotationMatcher for ParenthesizedAnnotation {
    fn extract(&self, name: &str) -> Option<(String, Companion)> {
        let caps = PARENTHESIZED.captures(name)?;
        Some((
            caps[1].trim().to_string(),
            Companion::Parenthesized(caps[2].to_string()),
        ))
    }
}

struct SuffixCountAnnotation;

impl AnnotationMatcher for SuffixCountAnnotation {
    fn extract(&self, name: &str) -> Option<(String, Companion)> {
        let caps = SUFFIX_COUNT.captures(name)?;
        Some((
            caps[1].trim().to_string(),
            Companion::Counted(caps[2].to_string()),
        ))
    }
}

/// Tried in order; the first match wins.
static MATCHERS: [&dyn AnnotationMatcher; 2] = [&ParenthesizedAnnotation, &SuffixCountAnnotation];

/// Split a raw booking name into a clean base name and its companion annotation.
///
/// Unrecognized, empty and missing names come back unchanged with no
/// companion. Never fails.
pub fn parse_companion_annotation(name: Option<&str>) -> ParsedName {
    let unchanged = || ParsedName {
        base_name: name.map(str::to_string),
        companion: None,
    };

    let raw = match name {
        Some(raw) if !raw.is_empty() => raw,
        _ => return unchanged(),
    };

    MATCHERS
        .iter()
        .find_map(|m| m.extract(raw))
        .map(|(base, companion)| ParsedName {
            base_name: Some(base),
            companion: Some(companion),
        })
        .unwrap_or_else(unchanged)
}

/// Restate `companion` as a bracketed note appended to `existing_notes`.
/// Re-applying with the same companion leaves the notes unchanged.
pub fn format_companion_note(companion: &Companion, existing_notes: Option<&str>) -> String {
    append_note(existing_notes, &companion.note_text())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> ParsedName {
        parse_companion_annotation(Some(s))
    }

    #[test]
    fn splits_suffix_count() {
        let p = parse("조영택외 1명");
        assert_eq!(p.base_name.as_deref(), Some("조영택"));
        assert_eq!(p.companion_count(), Some(1));
        assert_eq!(p.companion_info().as_deref(), Some("외 1명"));

        for raw in ["조영택 외 2명", "조영택외2명", "조영택 외2명 "] {
            let p = parse(raw);
            assert_eq!(p.base_name.as_deref(), Some("조영택"), "{raw}");
            assert_eq!(p.companion, Some(Companion::Counted("2".into())), "{raw}");
        }
    }

    #[test]
    fn count_digits_kept_as_typed() {
        let p = parse("조영택 외 01명");
        assert_eq!(p.base_name.as_deref(), Some("조영택"));
        assert_eq!(p.companion_info().as_deref(), Some("외 01명"));
        assert_eq!(p.companion_count(), Some(1));

        // wider than any integer type, still an annotation
        let digits = "99999999999999999999999";
        let p = parse(&format!("조영택 외 {}명", digits));
        assert_eq!(p.base_name.as_deref(), Some("조영택"));
        assert_eq!(p.companion_info(), Some(format!("외 {}명", digits)));
        assert_eq!(p.companion_count(), None);
    }

    #[test]
    fn splits_parenthesized() {
        let p = parse("김민수(여자)");
        assert_eq!(p.base_name.as_deref(), Some("김민수"));
        assert_eq!(p.companion_info().as_deref(), Some("(여자)"));
        assert_eq!(p.companion_count(), None);

        let p = parse("이정희 (여자손님 모시고 옴)");
        assert_eq!(p.base_name.as_deref(), Some("이정희"));
        assert_eq!(p.companion_info().as_deref(), Some("(여자손님 모시고 옴)"));
    }

    #[test]
    fn leaves_plain_names_alone() {
        let p = parse("박지훈");
        assert_eq!(p.base_name.as_deref(), Some("박지훈"));
        assert_eq!(p.companion, None);

        // parenthetical not at the end
        let p = parse("박지훈(VIP) 고객");
        assert_eq!(p.base_name.as_deref(), Some("박지훈(VIP) 고객"));
        assert_eq!(p.companion, None);

        // annotation with nothing in front of it
        assert_eq!(parse("(여자)").companion, None);
    }

    #[test]
    fn null_and_empty_are_identity() {
        assert_eq!(
            parse_companion_annotation(None),
            ParsedName {
                base_name: None,
                companion: None
            }
        );
        assert_eq!(parse("").base_name.as_deref(), Some(""));
        assert_eq!(parse("").companion, None);
    }

    #[test]
    fn parenthesized_takes_priority() {
        let p = parse("홍길동 외 1명(여자)");
        assert_eq!(p.base_name.as_deref(), Some("홍길동 외 1명"));
        assert_eq!(p.companion, Some(Companion::Parenthesized("여자".into())));

        let p = parse("홍길동(여자) 외 2명");
        assert_eq!(p.base_name.as_deref(), Some("홍길동(여자)"));
        assert_eq!(p.companion, Some(Companion::Counted("2".into())));
    }

    #[test]
    fn base_never_keeps_the_annotation() {
        for raw in ["김민수(2인)", "김민수(외1)", "조영택 외 3명", "최(친구)"] {
            let p = parse(raw);
            let base = p.base_name.unwrap();
            let info = p.companion.unwrap().info();
            assert!(!base.contains(&info), "{raw}: {base} / {info}");
            assert!(raw.contains(&info) || raw.replace(' ', "").contains(&info.replace(' ', "")));
        }
    }

    #[test]
    fn note_classification() {
        let note = |c: Companion| c.note_text();
        assert_eq!(note(Companion::Parenthesized("여자".into())), "여자 동반 방문");
        assert_eq!(
            note(Companion::Parenthesized("여자손님 모시고 옴".into())),
            "여자 동반 방문"
        );
        assert_eq!(note(Companion::Parenthesized("2인".into())), "2인 동반 방문");
        assert_eq!(note(Companion::Parenthesized("외1".into())), "2인 동반 방문");
        assert_eq!(note(Companion::Parenthesized("친구".into())), "친구 동반 방문");
        assert_eq!(note(Companion::Counted("1".into())), "2인 동반 방문");
        assert_eq!(note(Companion::Counted("3".into())), "4인 동반 방문");
        assert_eq!(note(Companion::Counted("01".into())), "2인 동반 방문");
    }

    #[test]
    fn note_append_is_idempotent() {
        let c = Companion::Counted("2".into());
        let first = format_companion_note(&c, Some("오전 타석"));
        assert_eq!(first, "오전 타석\n[3인 동반 방문]");
        let second = format_companion_note(&c, Some(&first));
        assert_eq!(second, first);

        let c = Companion::Parenthesized("여자".into());
        assert_eq!(format_companion_note(&c, None), "[여자 동반 방문]");
        let again = format_companion_note(&c, Some("[여자 동반 방문]"));
        assert_eq!(again.matches("여자 동반 방문").count(), 1);
    }
}
