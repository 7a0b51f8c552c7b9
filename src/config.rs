// src/config.rs

use anyhow::{anyhow, Context, Result};
use std::{env, path::PathBuf};
use tracing::debug;
use url::Url;

use crate::store::DEFAULT_PAGE_SIZE;

/// Env files read (if present) before the process environment is consulted.
/// Variables already set in the environment win.
const ENV_FILES: &[&str] = &[".env.local", ".env"];

#[derive(Debug, Clone)]
pub struct Config {
    /// Project base URL, always ending in `/`.
    pub supabase_url: Url,
    pub service_role_key: String,
    pub page_size: usize,
    /// Where run reports are written as JSON; no report file when unset.
    pub report_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        for file in ENV_FILES {
            match dotenvy::from_filename(file) {
                Ok(path) => debug!(path = %path.display(), "loaded env file"),
                Err(e) if e.not_found() => {}
                Err(e) => return Err(e).with_context(|| format!("reading {}", file)),
            }
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let raw_url = get("NEXT_PUBLIC_SUPABASE_URL")
            .or_else(|| get("SUPABASE_URL"))
            .ok_or_else(|| anyhow!("NEXT_PUBLIC_SUPABASE_URL (or SUPABASE_URL) is not set"))?;
        let mut supabase_url = Url::parse(raw_url.trim())
            .with_context(|| format!("parsing Supabase URL {:?}", raw_url))?;
        if !supabase_url.path().ends_with('/') {
            let path = format!("{}/", supabase_url.path());
            supabase_url.set_path(&path);
        }

        let service_role_key = get("SUPABASE_SERVICE_ROLE_KEY")
            .ok_or_else(|| anyhow!("SUPABASE_SERVICE_ROLE_KEY is not set"))?;

        let page_size = match get("REPAIR_PAGE_SIZE") {
            Some(v) => v
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| anyhow!("REPAIR_PAGE_SIZE must be a positive integer, got {:?}", v))?,
            None => DEFAULT_PAGE_SIZE,
        };

        Ok(Self {
            supabase_url,
            service_role_key,
            page_size,
            report_dir: get("REPAIR_REPORT_DIR").map(PathBuf::from),
        })
    }
}
