// src/normalize/phone.rs

/// Characters dropped before a phone number is interpreted.
fn is_phone_formatting(c: char) -> bool {
    c.is_whitespace() || matches!(c, '-' | '+' | '(' | ')' | ',')
}

/// Remove whitespace, hyphens, plus signs, parentheses and commas.
pub fn strip_phone_formatting(raw: &str) -> String {
    raw.chars().filter(|&c| !is_phone_formatting(c)).collect()
}

/// Canonicalize a Korean mobile number to the 11-digit `010XXXXXXXX` form.
///
/// Handles the shapes that show up in booking imports:
///  - `010-4245-0013`, `010 4245 0013`
///  - `+82 10 4245 0013` / `821042450013` (country code)
///  - `0142450013` (ten digits with the middle `0` dropped)
///  - `1042450013` (ten digits with the leading `0` dropped)
///
/// Returns `None` for empty input or anything that does not end up as
/// `010` followed by exactly eight digits.
pub fn normalize_phone(phone: Option<&str>) -> Option<String> {
    let raw = phone?;
    if raw.is_empty() {
        return None;
    }

    let mut cleaned = strip_phone_formatting(raw);

    if let Some(rest) = cleaned.strip_prefix("82") {
        cleaned = format!("0{}", rest);
    }

    if cleaned.starts_with("01") && cleaned.len() == 10 {
        cleaned = format!("010{}", &cleaned[2..]);
    }

    if cleaned.starts_with("10") && cleaned.len() == 10 {
        cleaned.insert(0, '0');
    }

    is_canonical(&cleaned).then_some(cleaned)
}

/// `010` followed by exactly eight ASCII digits.
pub fn is_canonical(phone: &str) -> bool {
    phone.len() == 11
        && phone.starts_with("010")
        && phone.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(s: &str) -> Option<String> {
        normalize_phone(Some(s))
    }

    #[test]
    fn strips_hyphens_and_spaces() {
        assert_eq!(norm("010-4245-0013").as_deref(), Some("01042450013"));
        assert_eq!(norm(" 010 4245 0013 ").as_deref(), Some("01042450013"));
        assert_eq!(norm("(010)4245,0013").as_deref(), Some("01042450013"));
    }

    #[test]
    fn rewrites_country_code() {
        assert_eq!(norm("+82 10 4245 0013").as_deref(), Some("01042450013"));
        assert_eq!(norm("82-10-4245-0013").as_deref(), Some("01042450013"));
    }

    #[test]
    fn repairs_truncated_prefixes() {
        assert_eq!(norm("0142450013").as_deref(), Some("01042450013"));
        assert_eq!(norm("1042450013").as_deref(), Some("01042450013"));
    }

    #[test]
    fn canonical_input_is_a_fixed_point() {
        let canonical = "01042450013";
        assert_eq!(norm(canonical).as_deref(), Some(canonical));
        let twice = norm(&norm("+82 10-4245-0013").unwrap());
        assert_eq!(twice.as_deref(), Some(canonical));
    }

    #[test]
    fn variants_agree() {
        let variants = [
            "010-4245-0013",
            "01042450013",
            "+82 10 4245 0013",
            "0142450013",
            "10-4245-0013",
        ];
        for v in variants {
            assert_eq!(norm(v), norm("01042450013"), "variant {v}");
        }
    }

    #[test]
    fn rejects_unusable_values() {
        assert_eq!(norm("123"), None);
        assert_eq!(norm("02-123-4567"), None);
        assert_eq!(norm("010-1234-567a"), None);
        assert_eq!(norm("010-1234-56789"), None);
        assert_eq!(norm("없음"), None);
    }

    #[test]
    fn null_and_empty_are_none() {
        assert_eq!(normalize_phone(None), None);
        assert_eq!(norm(""), None);
        assert_eq!(norm("   "), None);
    }
}
