use anyhow::{Error, Result};
use clap::Args;
use serde_json::json;

use crate::cli::app::SettingsArgs;
use crate::config::RuntimePaths;
use crate::models::{CommandEnvelope, EnvelopeCommandFailure};
use crate::report::{
    build_report_artifact, render_stats_line, render_text_report, write_report_artifact,
};
use crate::sqlite::{load_report_inputs, open_sqlite_read_only};
use crate::utils::time::format_utc_offset;

#[derive(Debug, Clone, Args)]
pub struct ReportArgs {
    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Print a JSON envelope instead of a table.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Print at most this many rows (the artifact keeps all of them).
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Also write `report.json` into the output directory.
    #[arg(long, default_value_t = false)]
    pub write_artifact: bool,
}

pub fn run(args: &ReportArgs, runtime_paths: &RuntimePaths) -> Result<()> {
    let result = run_inner(args, runtime_paths);
    match result {
        Err(error) if args.json => {
            let code = classify_report_error(&error);
            let envelope = CommandEnvelope::error("report", code, "report failed")
                .with_meta(
                    "database_path",
                    json!(runtime_paths.database_path.display().to_string()),
                )
                .with_error_details(json!({ "cause": format!("{error:#}") }));
            Err(Error::new(EnvelopeCommandFailure::new(envelope)))
        }
        other => other,
    }
}

fn run_inner(args: &ReportArgs, runtime_paths: &RuntimePaths) -> Result<()> {
    let settings = args.settings.resolve()?;
    eprintln!(
        "report: start db={} business_start={} utc_offset={}",
        runtime_paths.database_path.display(),
        settings.window.business_start,
        format_utc_offset(settings.utc_offset)
    );

    let connection = open_sqlite_read_only(&runtime_paths.database_path)?;
    let inputs = load_report_inputs(&connection)?;
    let outcome = crate::pipeline::run_report(
        &inputs.messages,
        &inputs.managers,
        &inputs.supervisors,
        &settings,
    )?;
    let artifact = build_report_artifact(&outcome, &settings);

    if args.write_artifact {
        let artifact_path = runtime_paths.report_artifact_path();
        write_report_artifact(&artifact_path, &artifact)?;
        eprintln!("report: artifact path={}", artifact_path.display());
    }

    let shown = match args.limit {
        Some(limit) => &artifact.rows[..artifact.rows.len().min(limit)],
        None => &artifact.rows[..],
    };
    let truncated = shown.len() < artifact.rows.len();

    if args.json {
        let mut envelope = CommandEnvelope::ok("report", json!({ "rows": shown }))
            .with_meta("stats", json!(artifact.stats))
            .with_meta("business_start", json!(artifact.business_start))
            .with_meta("day_end", json!(artifact.day_end))
            .with_meta("utc_offset", json!(artifact.utc_offset))
            .with_meta("truncated", json!(truncated));
        if artifact.stats.averages_without_reference > 0 {
            envelope = envelope.with_warning(
                "unresolved_managers",
                "some managers had no manager or supervisor reference and were left out",
                Some(json!({ "count": artifact.stats.averages_without_reference })),
            );
        }
        println!("{}", envelope.to_json_line()?);
    } else {
        println!("{}", render_text_report(shown));
    }

    eprintln!("report: complete {}", render_stats_line(&artifact.stats));
    Ok(())
}

fn classify_report_error(error: &Error) -> &'static str {
    let message = format!("{error:#}");
    if message.contains("does not exist") {
        "report_database_missing"
    } else if message.contains("is not numeric") || message.contains("is not an integer") {
        "report_reference_id_invalid"
    } else if message.contains("clock time")
        || message.contains("utc offset")
        || message.contains("business start")
    {
        "report_settings_invalid"
    } else if message.contains("sqlite") {
        "report_sqlite_failure"
    } else {
        "report_failed"
    }
}
