use crate::cli::{DiffCommand, SyncCommand};
use mds_core::FieldPath;
use mds_diff::{CompareRequest, DEFAULT_APPL_ID_PATH, DEFAULT_REPORT_PATH};
use mds_sync::{
    CatalogEndpoint, ReplaceMode, SyncRequest, DEFAULT_CATALOG_ENDPOINT, DEFAULT_FETCH_TIMEOUT_MS,
};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Optional settings file; every value may reference `${ENV_VAR}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    #[serde(default = "default_runner_schema")]
    pub schema: String,
    #[serde(default)]
    pub store: StoreFileConfig,
    #[serde(default)]
    pub sync: SyncFileConfig,
    #[serde(default)]
    pub diff: DiffFileConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            schema: default_runner_schema(),
            store: StoreFileConfig::default(),
            sync: SyncFileConfig::default(),
            diff: DiffFileConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StoreFileConfig {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SyncFileConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub replace_mode: Option<ReplaceMode>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DiffFileConfig {
    #[serde(default)]
    pub collection_before: Option<String>,
    #[serde(default)]
    pub collection_after: Option<String>,
    #[serde(default)]
    pub appl_id_path: Option<String>,
    #[serde(default)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    pub request: SyncRequest,
    pub soft_fail: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffSettings {
    pub store_uri: String,
    pub database: String,
    pub request: CompareRequest,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingSetting {
    pub setting: &'static str,
    pub env: &'static str,
}

impl Display for MissingSetting {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (set {} or --{})", self.setting, self.env, self.setting.replace('_', "-"))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("read runner config failed `{path}`: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("runner config parse failed: {0}")]
    Parse(String),
    #[error("unsupported runner config schema `{found}` (expected `{expected}`)")]
    UnsupportedSchema { found: String, expected: String },
    #[error("missing required configuration: {}", join_missing(.0))]
    Missing(Vec<MissingSetting>),
    #[error("invalid {setting}: {reason}")]
    Invalid { setting: &'static str, reason: String },
}

fn join_missing(missing: &[MissingSetting]) -> String {
    missing
        .iter()
        .map(MissingSetting::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn load_runner_config(path: &Path) -> Result<RunnerConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    let expanded = expand_env_placeholders(raw.as_str()).map_err(ConfigError::Parse)?;
    let config: RunnerConfig = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(expanded.as_str())
            .map_err(|error| ConfigError::Parse(format!("json decode error: {error}")))?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(expanded.as_str())
            .map_err(|error| ConfigError::Parse(format!("yaml decode error: {error}")))?,
        _ => serde_yaml::from_str(expanded.as_str())
            .or_else(|_| serde_json::from_str(expanded.as_str()))
            .map_err(|error| ConfigError::Parse(error.to_string()))?,
    };
    if config.schema != default_runner_schema() {
        return Err(ConfigError::UnsupportedSchema {
            found: config.schema,
            expected: default_runner_schema(),
        });
    }
    Ok(config)
}

/// Flag (or its environment variable, bound by clap) wins over the config file.
pub fn resolve_sync_settings(command: &SyncCommand) -> Result<SyncSettings, ConfigError> {
    let file = load_optional(command.config.as_deref())?;
    let mut missing = Vec::<MissingSetting>::new();
    let store_uri = required(&mut missing, command.store_uri.as_ref(), file.store.uri.as_ref(), "store_uri", "MONGODB_ATLAS_SRV");
    let database = required(&mut missing, command.database.as_ref(), file.store.database.as_ref(), "database", "MONGODB_DB_NAME");
    let collection = required(&mut missing, command.collection.as_ref(), file.sync.collection.as_ref(), "collection", "MONGODB_DB_COLLECTION");
    if !missing.is_empty() {
        return Err(ConfigError::Missing(missing));
    }

    let url = first_present(command.endpoint.as_ref(), file.sync.endpoint.as_ref())
        .unwrap_or_else(|| DEFAULT_CATALOG_ENDPOINT.to_string());
    let timeout_ms = command
        .timeout_ms
        .or(file.sync.timeout_ms)
        .unwrap_or(DEFAULT_FETCH_TIMEOUT_MS);
    let endpoint = CatalogEndpoint::new(url)
        .and_then(|endpoint| endpoint.with_timeout_ms(timeout_ms))
        .map_err(|error| ConfigError::Invalid {
            setting: "endpoint",
            reason: error.to_string(),
        })?;

    let replace_mode = command.replace_mode.or(file.sync.replace_mode).unwrap_or_default();
    Ok(SyncSettings {
        request: SyncRequest::new(
            endpoint,
            store_uri.unwrap_or_default(),
            database.unwrap_or_default(),
            collection.unwrap_or_default(),
        )
        .with_replace_mode(replace_mode),
        soft_fail: command.soft_fail,
    })
}

pub fn resolve_diff_settings(command: &DiffCommand) -> Result<DiffSettings, ConfigError> {
    let file = load_optional(command.config.as_deref())?;
    let mut missing = Vec::<MissingSetting>::new();
    let store_uri = required(&mut missing, command.store_uri.as_ref(), file.store.uri.as_ref(), "store_uri", "MONGODB_ATLAS_SRV");
    let database = required(&mut missing, command.database.as_ref(), file.store.database.as_ref(), "database", "MONGODB_DB_NAME");
    let before = required(&mut missing, command.before.as_ref(), file.diff.collection_before.as_ref(), "before", "MONGODB_COLLECTION_BEFORE");
    let after = required(&mut missing, command.after.as_ref(), file.diff.collection_after.as_ref(), "after", "MONGODB_COLLECTION_AFTER");
    if !missing.is_empty() {
        return Err(ConfigError::Missing(missing));
    }

    let appl_id_path = first_present(command.appl_id_path.as_ref(), file.diff.appl_id_path.as_ref())
        .unwrap_or_else(|| DEFAULT_APPL_ID_PATH.to_string());
    let appl_id_path = FieldPath::from_str(appl_id_path.as_str()).map_err(|error| ConfigError::Invalid {
        setting: "appl_id_path",
        reason: format!("`{appl_id_path}`: {error}"),
    })?;
    let output = command
        .output
        .clone()
        .or(file.diff.output)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_PATH));

    Ok(DiffSettings {
        store_uri: store_uri.unwrap_or_default(),
        database: database.unwrap_or_default(),
        request: CompareRequest::new(before.unwrap_or_default(), after.unwrap_or_default())
            .with_appl_id_path(appl_id_path),
        output,
    })
}

fn load_optional(path: Option<&Path>) -> Result<RunnerConfig, ConfigError> {
    match path {
        Some(path) => load_runner_config(path),
        None => Ok(RunnerConfig::default()),
    }
}

fn first_present(flag: Option<&String>, file: Option<&String>) -> Option<String> {
    [flag, file]
        .into_iter()
        .flatten()
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

// Blank values count as missing so an unset variable never becomes an empty connection string.
fn required(
    missing: &mut Vec<MissingSetting>,
    flag: Option<&String>,
    file: Option<&String>,
    setting: &'static str,
    env: &'static str,
) -> Option<String> {
    let value = first_present(flag, file);
    if value.is_none() {
        missing.push(MissingSetting { setting, env });
    }
    value
}

fn default_runner_schema() -> String {
    "mds-runner/0.0.1".to_string()
}

fn expand_env_placeholders(input: &str) -> Result<String, String> {
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0;
    while let Some(start_offset) = input[cursor..].find("${") {
        let start = cursor + start_offset;
        out.push_str(&input[cursor..start]);
        let var_start = start + 2;
        let Some(end_offset) = input[var_start..].find('}') else {
            return Err("unterminated env placeholder `${...`".to_string());
        };
        let end = var_start + end_offset;
        let key = &input[var_start..end];
        if key.is_empty() {
            return Err("empty env placeholder `${}`".to_string());
        }
        let value = std::env::var(key)
            .map_err(|_| format!("missing env var for placeholder `${{{key}}}`"))?;
        out.push_str(value.as_str());
        cursor = end + 1;
    }
    out.push_str(&input[cursor..]);
    Ok(out)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
