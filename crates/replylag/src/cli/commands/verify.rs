use anyhow::Result;
use clap::Args;

use crate::cli::app::SettingsArgs;
use crate::config::RuntimePaths;
use crate::sqlite::{open_sqlite_read_only, verify_report_parity};

#[derive(Debug, Clone, Args)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub settings: SettingsArgs,
}

#[derive(Debug)]
pub struct ParityCommandFailure {
    pub mismatches: usize,
    pub first_mismatch: Option<String>,
}

impl std::fmt::Display for ParityCommandFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "pipeline and sql report disagree on {} row(s).",
            self.mismatches
        )?;
        if let Some(mismatch) = &self.first_mismatch {
            write!(f, " first: {mismatch}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParityCommandFailure {}

pub fn run(args: &VerifyArgs, runtime_paths: &RuntimePaths) -> Result<()> {
    let settings = args.settings.resolve()?;
    eprintln!("verify: start db={}", runtime_paths.database_path.display());

    let connection = open_sqlite_read_only(&runtime_paths.database_path)?;
    let report = verify_report_parity(&connection, &settings)?;
    println!("{}", serde_json::to_string(&report)?);

    if !report.is_match() {
        eprintln!(
            "verify: failed mismatches={} pipeline_rows={} sql_rows={}",
            report.mismatches.len(),
            report.pipeline_rows,
            report.sql_rows
        );
        return Err(ParityCommandFailure {
            mismatches: report.mismatches.len(),
            first_mismatch: report
                .mismatches
                .first()
                .and_then(|mismatch| serde_json::to_string(mismatch).ok()),
        }
        .into());
    }

    eprintln!(
        "verify: complete rows={} mismatches=0",
        report.pipeline_rows
    );
    Ok(())
}
