use anyhow::{bail, Context, Result};
use masgolf_repair::{
    config::Config,
    repair::{self, Invocation},
    store::SupabaseStore,
};
use std::env;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(filter).init();

    // ─── 2) parse args ───────────────────────────────────────────────
    let invocation = Invocation::parse(env::args().skip(1))?;

    // ─── 3) connect ──────────────────────────────────────────────────
    let config = Config::from_env()?;
    info!(url = %config.supabase_url, page_size = config.page_size, "startup");
    let store = SupabaseStore::new(&config)?;

    // ─── 4) run jobs in order ────────────────────────────────────────
    let mut failed_records = 0usize;
    for &job in &invocation.jobs {
        let mode = invocation.mode_for(job);
        let report = repair::run(job, &store, mode, config.page_size)
            .await
            .with_context(|| format!("job {} aborted", job))?;
        report.log_summary();
        failed_records += report.errors.len();

        if let Some(dir) = &config.report_dir {
            match report.write_json(dir) {
                Ok(path) => info!(path = %path.display(), "report written"),
                Err(e) => error!(error = %e, "could not write report"),
            }
        }
    }

    if failed_records > 0 {
        bail!("{} record(s) failed; see the log above", failed_records);
    }
    info!("done");
    Ok(())
}
