#![forbid(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Parser;
use clap::error::ErrorKind;
use replylag::cli::app::{Cli, Command, RuntimeArgs};
use replylag::cli::commands;
use replylag::config::RuntimePaths;
use replylag::models::EnvelopeCommandFailure;

const EXIT_SUCCESS: i32 = 0;
const EXIT_RUNTIME_FAILURE: i32 = 1;
const EXIT_PARITY_FAILURE: i32 = 2;
const EXIT_USAGE_ERROR: i32 = 64;

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => return exit_code_for_parse_error(error),
    };
    init_logging();

    let command_name = command_name(&cli.command);
    eprintln!("replylag: starting `{command_name}`");

    match execute(cli) {
        Ok(()) => {
            eprintln!("replylag: completed `{command_name}` (exit_code={EXIT_SUCCESS})");
            EXIT_SUCCESS
        }
        Err(error) => {
            let exit_code = classify_runtime_error(&error);
            eprintln!("replylag: failed `{command_name}` (exit_code={exit_code})");
            match error.downcast_ref::<EnvelopeCommandFailure>() {
                Some(failure) => println!("{failure}"),
                None => eprintln!("{error:#}"),
            }
            exit_code
        }
    }
}

fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .try_init();
}

fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Schema(args) => commands::schema::run(&args),
        Command::Ingest(args) => {
            let runtime_paths = resolve_runtime_paths(&cli.runtime)?;
            commands::ingest::run(&args, &runtime_paths)
        }
        Command::Report(args) => {
            let runtime_paths = resolve_runtime_paths(&cli.runtime)?;
            commands::report::run(&args, &runtime_paths)
        }
        Command::Trace(args) => {
            let runtime_paths = resolve_runtime_paths(&cli.runtime)?;
            commands::trace::run(&args, &runtime_paths)
        }
        Command::Verify(args) => {
            let runtime_paths = resolve_runtime_paths(&cli.runtime)?;
            commands::verify::run(&args, &runtime_paths)
        }
    }
}

fn classify_runtime_error(error: &anyhow::Error) -> i32 {
    if error
        .downcast_ref::<commands::verify::ParityCommandFailure>()
        .is_some()
    {
        EXIT_PARITY_FAILURE
    } else {
        EXIT_RUNTIME_FAILURE
    }
}

fn exit_code_for_parse_error(error: clap::Error) -> i32 {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = error.print();
            EXIT_SUCCESS
        }
        _ => {
            let _ = error.print();
            EXIT_USAGE_ERROR
        }
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Ingest(_) => "ingest",
        Command::Report(_) => "report",
        Command::Trace(_) => "trace",
        Command::Verify(_) => "verify",
        Command::Schema(_) => "schema",
    }
}

fn resolve_runtime_paths(args: &RuntimeArgs) -> Result<RuntimePaths> {
    let home_dir = match &args.home_dir {
        Some(path) => path.clone(),
        None => std::env::var_os("HOME")
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("HOME is not set; pass --home-dir"))?,
    };

    let cwd = match &args.cwd {
        Some(path) => path.clone(),
        None => std::env::current_dir()?,
    };

    replylag::config::resolve_runtime_paths(
        &home_dir,
        &cwd,
        args.out_dir.as_deref(),
        args.db.as_deref(),
    )
}
