use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;

use crate::config::RuntimePaths;
use crate::ingest::{IngestPlan, run_ingest};

#[derive(Debug, Clone, Args)]
pub struct IngestArgs {
    #[arg(long, value_name = "PATH")]
    pub messages: Option<PathBuf>,

    #[arg(long, value_name = "PATH")]
    pub managers: Option<PathBuf>,

    #[arg(long, value_name = "PATH")]
    pub supervisors: Option<PathBuf>,

    /// Empty all three tables before loading.
    #[arg(long, default_value_t = false)]
    pub replace: bool,
}

pub fn run(args: &IngestArgs, runtime_paths: &RuntimePaths) -> Result<()> {
    let resolve =
        |path: Option<&Path>| path.map(|path| runtime_paths.resolve_input(path)).transpose();
    let plan = IngestPlan {
        messages_path: resolve(args.messages.as_deref())?,
        managers_path: resolve(args.managers.as_deref())?,
        supervisors_path: resolve(args.supervisors.as_deref())?,
        database_path: runtime_paths.database_path.clone(),
        replace: args.replace,
    };
    eprintln!(
        "ingest: start db={} replace={}",
        plan.database_path.display(),
        plan.replace
    );

    let report = run_ingest(&plan)?;
    eprintln!(
        "ingest: complete messages={} managers={} supervisors={} batches={}",
        report.write.messages_written,
        report.write.managers_written,
        report.write.supervisors_written,
        report.write.batches_committed
    );
    println!("{}", serde_json::to_string(&report)?);

    Ok(())
}
