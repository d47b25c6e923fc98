use anyhow::{Context, Result};
use clap::Args;

#[derive(Debug, Clone, Args)]
pub struct SchemaArgs {
    #[arg(long, default_value_t = false)]
    pub compact: bool,
}

pub fn run(args: &SchemaArgs) -> Result<()> {
    let schemas = crate::models::json_schemas();
    let encoded = if args.compact {
        serde_json::to_string(&schemas)
    } else {
        serde_json::to_string_pretty(&schemas)
    }
    .context("failed to encode json schemas")?;
    println!("{encoded}");
    Ok(())
}
