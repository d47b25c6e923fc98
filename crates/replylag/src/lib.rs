#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod sqlite;
pub mod utils;

pub use cli::app::{Cli, Command};
