//! Run booking names and phones through the normalizers without touching
//! the database.
//!
//! Reads `name<TAB>phone` lines (either side may be empty) from stdin and
//! prints one JSON object per line.

use anyhow::{Context, Result};
use masgolf_repair::normalize::{
    format_companion_note, normalize_phone, parse_companion_annotation, remove_as_marker,
    remove_visit_suffix,
};
use serde_json::json;
use std::io::{self, BufRead, Write};
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

fn check_line(line: &str) -> serde_json::Value {
    let (name, phone) = line.split_once('\t').unwrap_or((line, ""));
    let name = Some(name.trim()).filter(|n| !n.is_empty());
    let phone = Some(phone.trim()).filter(|p| !p.is_empty());

    let parsed = parse_companion_annotation(name);
    let cleaned = name.map(remove_as_marker);
    json!({
        "name": name,
        "base_name": parsed.base_name,
        "companion_info": parsed.companion_info(),
        "companion_count": parsed.companion_count(),
        "note": parsed.companion.as_ref().map(|c| format_companion_note(c, None)),
        "visit_suffix": name.and_then(|n| remove_visit_suffix(n).1).map(str::trim),
        "as_visit": cleaned.as_ref().map(|c| c.has_as),
        "phone": phone,
        "canonical_phone": normalize_phone(phone),
    })
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut lines = 0usize;

    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        serde_json::to_writer(&mut out, &check_line(&line)).context("writing JSON")?;
        writeln!(out)?;
        lines += 1;
    }

    debug!(lines, "done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_name_and_phone() {
        let v = check_line("조영택외 1명\t+82 10 4245 0013");
        assert_eq!(v["base_name"], "조영택");
        assert_eq!(v["companion_info"], "외 1명");
        assert_eq!(v["companion_count"], 1);
        assert_eq!(v["note"], "[2인 동반 방문]");
        assert_eq!(v["canonical_phone"], "01042450013");
        assert_eq!(v["as_visit"], false);
    }

    #[test]
    fn name_only_and_bad_phone() {
        let v = check_line("김인섭AS");
        assert_eq!(v["base_name"], "김인섭AS");
        assert!(v["companion_info"].is_null());
        assert!(v["canonical_phone"].is_null());
        assert_eq!(v["as_visit"], true);

        let v = check_line("\t123");
        assert!(v["name"].is_null());
        assert!(v["canonical_phone"].is_null());
    }
}
