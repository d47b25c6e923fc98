use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use super::commands::{
    ingest::IngestArgs, report::ReportArgs, schema::SchemaArgs, trace::TraceArgs,
    verify::VerifyArgs,
};

#[derive(Debug, Parser)]
#[command(
    name = "replylag",
    version,
    about = "Manager response latency over chat deal conversations"
)]
pub struct Cli {
    #[command(flatten)]
    pub runtime: RuntimeArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Args)]
pub struct RuntimeArgs {
    #[arg(long, global = true, value_name = "PATH")]
    pub home_dir: Option<PathBuf>,

    #[arg(long, global = true, value_name = "PATH")]
    pub cwd: Option<PathBuf>,

    #[arg(long, global = true, value_name = "PATH")]
    pub out_dir: Option<PathBuf>,

    /// SQLite database holding messages, managers and supervisors.
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,
}

/// Off-hours window and calendar settings shared by the computing commands.
#[derive(Debug, Clone, Args)]
pub struct SettingsArgs {
    /// End of the off-hours window, HH:MM[:SS].
    #[arg(long, value_name = "TIME")]
    pub business_start: Option<String>,

    /// Fixed offset used to decide calendar days, e.g. +03:00.
    #[arg(long, value_name = "OFFSET", allow_hyphen_values = true)]
    pub utc_offset: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load JSONL files into the database.
    Ingest(IngestArgs),
    /// Average response time per manager.
    Report(ReportArgs),
    /// Intermediate rows for one conversation.
    Trace(TraceArgs),
    /// Compare the in-process pipeline with the SQL query.
    Verify(VerifyArgs),
    /// JSON Schemas of import records and the report artifact.
    Schema(SchemaArgs),
}
