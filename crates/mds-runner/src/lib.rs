mod cli;
mod config;
mod run;

pub use cli::{Cli, Commands, DiffCommand, OutputFormat, SyncCommand};
pub use config::{
    load_runner_config, resolve_diff_settings, resolve_sync_settings, ConfigError, DiffFileConfig,
    DiffSettings, MissingSetting, RunnerConfig, StoreFileConfig, SyncFileConfig, SyncSettings,
};
pub use run::{execute_diff, execute_sync, finish_sync, run_diff, RunnerError};
