// src/repair/mod.rs
//
// Batch repair jobs over the bookings and customers tables. Each job loads
// what it needs up front, then walks the rows one at a time.

use anyhow::{bail, Result};
use serde::Serialize;
use std::{fmt, str::FromStr};
use tracing::info;

use crate::store::Store;

pub mod companions;
pub mod customers;
pub mod link;
pub mod names;
pub mod phones;
pub mod report;
pub mod suffixes;

pub use customers::CustomerIndex;
pub use report::{Action, Change, Failure, RepairReport, Skip, SkipReason, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    DryRun,
    Apply,
}

impl RunMode {
    pub fn is_apply(self) -> bool {
        self == RunMode::Apply
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunMode::DryRun => "dry-run",
            RunMode::Apply => "apply",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Job {
    Phones,
    Link,
    Companions,
    Suffixes,
    AsVisits,
    SyncNames,
}

impl Job {
    /// Order used by `all`. Phones go first so later jobs match on clean
    /// keys; AS markers are flagged before the visit-suffix pass strips them.
    pub const ALL: [Job; 6] = [
        Job::Phones,
        Job::Link,
        Job::Companions,
        Job::AsVisits,
        Job::Suffixes,
        Job::SyncNames,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Job::Phones => "phones",
            Job::Link => "link",
            Job::Companions => "companions",
            Job::Suffixes => "suffixes",
            Job::AsVisits => "as-visits",
            Job::SyncNames => "sync-names",
        }
    }

    /// Linking touches every orphaned booking, so it previews unless asked.
    pub fn default_mode(&self) -> RunMode {
        match self {
            Job::Link => RunMode::DryRun,
            _ => RunMode::Apply,
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Job {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match Job::ALL.iter().find(|job| job.name() == s) {
            Some(job) => Ok(*job),
            None => bail!(
                "unknown job {:?}; expected one of: {}",
                s,
                Job::ALL.map(|j| j.name()).join(", ")
            ),
        }
    }
}

pub const USAGE: &str =
    "usage: masgolf-repair <phones|link|companions|as-visits|suffixes|sync-names|all> [--dry-run|--apply]";

/// A parsed command line: the jobs to run and the mode flag, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub jobs: Vec<Job>,
    pub mode: Option<RunMode>,
}

impl Invocation {
    /// Exactly one job name (or `all`) and at most one of `--dry-run` /
    /// `--apply`. Anything else is rejected.
    pub fn parse<I, A>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = A>,
        A: AsRef<str>,
    {
        let mut jobs = None;
        let mut mode = None;

        for arg in args {
            let arg = arg.as_ref();
            let flag = match arg {
                "--dry-run" => Some(RunMode::DryRun),
                "--apply" => Some(RunMode::Apply),
                _ if arg.starts_with('-') => bail!("unknown option {:?}\n{}", arg, USAGE),
                _ => None,
            };
            match flag {
                Some(flag) if mode.is_some_and(|m| m != flag) => {
                    bail!("--dry-run and --apply are mutually exclusive\n{}", USAGE)
                }
                Some(flag) => mode = Some(flag),
                None if jobs.is_some() => bail!("unexpected argument {:?}\n{}", arg, USAGE),
                None if arg == "all" => jobs = Some(Job::ALL.to_vec()),
                None => jobs = Some(vec![arg.parse::<Job>()?]),
            }
        }

        let Some(jobs) = jobs else {
            bail!("no job given\n{}", USAGE);
        };
        Ok(Self { jobs, mode })
    }

    /// The explicit flag, else the job's own default.
    pub fn mode_for(&self, job: Job) -> RunMode {
        self.mode.unwrap_or_else(|| job.default_mode())
    }
}

/// Run one job to completion and return its report.
///
/// Only table loads abort the run; a failed row write lands in
/// `report.errors` and the job moves on.
pub async fn run<S: Store>(
    job: Job,
    store: &S,
    mode: RunMode,
    page_size: usize,
) -> Result<RepairReport> {
    info!(job = %job, mode = %mode, "starting");
    let report = match job {
        Job::Phones => phones::fix_phones(store, mode, page_size).await?,
        Job::Link => link::link_bookings(store, mode, page_size).await?,
        Job::Companions => companions::fix_companions(store, mode, page_size).await?,
        Job::Suffixes => suffixes::fix_visit_suffixes(store, mode, page_size).await?,
        Job::AsVisits => suffixes::fix_as_visits(store, mode, page_size).await?,
        Job::SyncNames => names::sync_booking_names(store, mode, page_size).await?,
    };
    Ok(report.finish())
}

#[cfg(test)]
pub(crate) fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
