use clap::{Parser, Subcommand, ValueEnum};
use mds_sync::ReplaceMode;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "mds-runner")]
#[command(about = "Metadata catalog snapshot sync and change report")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Fetch the metadata catalog and replace a collection with it.
    Sync(SyncCommand),
    /// Compare two snapshot collections and write a CSV change report.
    Diff(DiffCommand),
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, clap::Args)]
pub struct SyncCommand {
    #[arg(long, env = "MDS_ENDPOINT")]
    pub endpoint: Option<String>,
    #[arg(long, env = "MONGODB_ATLAS_SRV", hide_env_values = true)]
    pub store_uri: Option<String>,
    #[arg(long, env = "MONGODB_DB_NAME")]
    pub database: Option<String>,
    #[arg(long, env = "MONGODB_DB_COLLECTION")]
    pub collection: Option<String>,
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub replace_mode: Option<ReplaceMode>,
    #[arg(long)]
    pub timeout_ms: Option<u64>,
    /// Log fetch/store failures and report zero written instead of exiting non-zero.
    #[arg(long, default_value_t = false)]
    pub soft_fail: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, clap::Args)]
pub struct DiffCommand {
    #[arg(long, env = "MONGODB_ATLAS_SRV", hide_env_values = true)]
    pub store_uri: Option<String>,
    #[arg(long, env = "MONGODB_DB_NAME")]
    pub database: Option<String>,
    #[arg(long, env = "MONGODB_COLLECTION_BEFORE")]
    pub before: Option<String>,
    #[arg(long, env = "MONGODB_COLLECTION_AFTER")]
    pub after: Option<String>,
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long, env = "MDS_APPL_ID_PATH")]
    pub appl_id_path: Option<String>,
    #[arg(long, env = "MDS_DIFF_OUTPUT")]
    pub output: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
