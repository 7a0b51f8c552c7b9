// src/repair/report.rs

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

use super::{Job, RunMode};

/// How many entries of each list the log summary prints.
const SAMPLE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Bookings,
    Customers,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Bookings => "bookings",
            Table::Customers => "customers",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Update,
    Insert,
    Delete,
}

/// One row-level change, written or (in a dry run) planned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    pub table: Table,
    /// `None` for a customer that a dry run would have inserted.
    pub id: Option<i64>,
    pub action: Action,
    pub field: &'static str,
    pub before: Option<String>,
    pub after: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Change {
    pub fn update(
        table: Table,
        id: i64,
        field: &'static str,
        before: Option<&str>,
        after: Option<&str>,
    ) -> Self {
        Self {
            table,
            id: Some(id),
            action: Action::Update,
            field,
            before: before.map(str::to_string),
            after: after.map(str::to_string),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoPhone,
    InvalidPhone,
    NoCustomer,
}

impl SkipReason {
    /// Why a phone could not be used: missing/blank, or present but not canonicalizable.
    pub fn for_phone(raw: Option<&str>) -> Self {
        match raw {
            Some(p) if !p.trim().is_empty() => SkipReason::InvalidPhone,
            _ => SkipReason::NoPhone,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Skip {
    pub table: Table,
    pub id: i64,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub table: Table,
    pub id: i64,
    pub name: Option<String>,
    pub error: String,
}

/// Everything a single job run did, planned, skipped or failed on.
#[derive(Debug, Clone, Serialize)]
pub struct RepairReport {
    pub job: Job,
    pub mode: RunMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Rows the job looked at.
    pub scanned: usize,
    pub changes: Vec<Change>,
    pub skipped: Vec<Skip>,
    pub errors: Vec<Failure>,
}

impl RepairReport {
    pub fn new(job: Job, mode: RunMode) -> Self {
        Self {
            job,
            mode,
            started_at: Utc::now(),
            finished_at: None,
            scanned: 0,
            changes: Vec::new(),
            skipped: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn change(&mut self, change: Change) {
        self.changes.push(change);
    }

    pub fn skip(
        &mut self,
        table: Table,
        id: i64,
        name: Option<&str>,
        phone: Option<&str>,
        reason: SkipReason,
    ) {
        self.skipped.push(Skip {
            table,
            id,
            name: name.map(str::to_string),
            phone: phone.map(str::to_string),
            reason,
        });
    }

    pub fn fail(&mut self, table: Table, id: i64, name: Option<&str>, error: &anyhow::Error) {
        warn!(table = table.as_str(), id, error = %error, "record failed");
        self.errors.push(Failure {
            table,
            id,
            name: name.map(str::to_string),
            error: format!("{:#}", error),
        });
    }

    pub fn changes_for(&self, table: Table, action: Action) -> impl Iterator<Item = &Change> {
        self.changes
            .iter()
            .filter(move |c| c.table == table && c.action == action)
    }

    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.skipped.iter().filter(|s| s.reason == reason).count()
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn log_summary(&self) {
        info!(
            job = %self.job,
            mode = %self.mode,
            scanned = self.scanned,
            changes = self.changes.len(),
            skipped = self.skipped.len(),
            errors = self.errors.len(),
            "run summary"
        );
        for (i, c) in self.changes.iter().take(SAMPLE).enumerate() {
            info!(
                "  {}. {} {:?} {:?}.{}: {:?} → {:?}{}",
                i + 1,
                c.table.as_str(),
                c.action,
                c.id,
                c.field,
                c.before.as_deref().unwrap_or(""),
                c.after.as_deref().unwrap_or(""),
                c.detail
                    .as_deref()
                    .map(|d| format!(" ({})", d))
                    .unwrap_or_default()
            );
        }
        if self.changes.len() > SAMPLE {
            info!("  ... and {} more", self.changes.len() - SAMPLE);
        }
        for reason in [
            SkipReason::NoPhone,
            SkipReason::InvalidPhone,
            SkipReason::NoCustomer,
        ] {
            let n = self.skipped_for(reason);
            if n > 0 {
                info!(reason = ?reason, count = n, "skipped");
            }
        }
        for e in &self.errors {
            warn!(table = e.table.as_str(), id = e.id, name = ?e.name, error = %e.error, "failed");
        }
        if self.mode == RunMode::DryRun {
            info!("dry run: nothing was written; re-run with --apply to write these changes");
        }
    }

    /// Write the report as pretty JSON under `dir`, creating it if needed.
    pub fn write_json(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir).with_context(|| format!("creating report directory {:?}", dir))?;
        let file_name = format!(
            "{}-{}-{}.json",
            self.job,
            self.mode,
            self.started_at.format("%Y%m%dT%H%M%S%.3f")
        );
        let path = dir.join(file_name);
        let json = serde_json::to_string_pretty(self).context("serializing run report")?;
        fs::write(&path, json).with_context(|| format!("writing report {:?}", path))?;
        Ok(path)
    }
}
