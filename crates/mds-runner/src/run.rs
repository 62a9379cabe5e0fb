use crate::cli::{DiffCommand, OutputFormat, SyncCommand};
use crate::config::{resolve_diff_settings, resolve_sync_settings, ConfigError, DiffSettings};
use mds_diff::{DiffError, DiffEvent, DiffReport};
use mds_store::{DocumentStore, MongoStore, StoreError};
use mds_sync::{SyncError, SyncOutcome, SyncReport};
use serde_json::json;
use std::io::Write;
use tracing::warn;

const BANNER_WIDTH: usize = 80;

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Diff(#[from] DiffError),
    #[error("write console output failed: {0}")]
    Console(#[source] std::io::Error),
    #[error("json encode failed: {0}")]
    JsonEncode(#[from] serde_json::Error),
}

pub fn execute_sync(command: &SyncCommand) -> Result<String, RunnerError> {
    let settings = resolve_sync_settings(command)?;
    finish_sync(mds_sync::sync(&settings.request), settings.soft_fail, command.format)
}

/// Turns a sync result into console output. With `soft_fail` a failure is logged and
/// reported as zero records written instead of being returned as an error.
pub fn finish_sync(
    result: Result<SyncReport, SyncError>,
    soft_fail: bool,
    format: OutputFormat,
) -> Result<String, RunnerError> {
    let outcome = match result {
        Err(error) if !soft_fail => return Err(RunnerError::Sync(error)),
        result => SyncOutcome::from_result(result),
    };
    if let SyncOutcome::Failed { kind, message } = &outcome {
        warn!(?kind, error = message.as_str(), "sync failed, continuing with zero records written");
    }

    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Text => Ok(match &outcome {
            SyncOutcome::Written { report } | SyncOutcome::Skipped { report } => format!(
                "{} records written to {} ({} fetched, fingerprint {})",
                report.written, report.collection, report.fetched, report.fingerprint
            ),
            SyncOutcome::Failed { message, .. } => format!("0 records written ({message})"),
        }),
    }
}

pub fn execute_diff(command: &DiffCommand) -> Result<String, RunnerError> {
    let settings = resolve_diff_settings(command)?;
    let stdout = std::io::stdout();
    let mut console = stdout.lock();
    run_diff(
        || MongoStore::connect(settings.store_uri.as_str(), settings.database.as_str()),
        &settings,
        &mut console,
        command.format,
    )
}

/// Runs the diff job, printing per-document changes to `console` as they are found.
pub fn run_diff<S, F>(
    connect: F,
    settings: &DiffSettings,
    console: &mut dyn Write,
    format: OutputFormat,
) -> Result<String, RunnerError>
where
    S: DocumentStore,
    F: FnOnce() -> Result<S, StoreError>,
{
    let mut console_error: Option<std::io::Error> = None;
    let report = mds_diff::diff(connect, &settings.request, settings.output.as_path(), &mut |event| {
        if console_error.is_some() || format == OutputFormat::Json {
            return;
        }
        if let Err(error) = print_event(console, event) {
            console_error = Some(error);
        }
    })?;
    if let Some(error) = console_error {
        return Err(RunnerError::Console(error));
    }
    render_diff_summary(&report, settings, format)
}

fn print_event(console: &mut dyn Write, event: &DiffEvent<'_>) -> std::io::Result<()> {
    match event {
        DiffEvent::DocumentMissing { doc_id } => writeln!(
            console,
            "Document with _id {doc_id} exists in old collection but not in new collection."
        ),
        DiffEvent::DocumentChanged { doc_id, appl_id, diff } => {
            writeln!(console, "{}", "#".repeat(BANNER_WIDTH))?;
            writeln!(console, "### Changes for document with _id {doc_id}")?;
            if *appl_id == mds_core::SENTINEL {
                writeln!(console, "No appl_id found.")?;
            } else {
                writeln!(console, "### appl_id {appl_id}")?;
            }
            for (kind, path, detail) in diff.iter() {
                let detail = serde_json::to_string_pretty(detail).map_err(std::io::Error::other)?;
                writeln!(console, "{}: ** {path}:\n{detail}", kind.label())?;
            }
            Ok(())
        }
    }
}

fn render_diff_summary(report: &DiffReport, settings: &DiffSettings, format: OutputFormat) -> Result<String, RunnerError> {
    let output = settings.output.display().to_string();
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&json!({
            "collection_before": report.collection_before,
            "collection_after": report.collection_after,
            "summary": report.summary,
            "output": output,
        }))?),
        OutputFormat::Text => {
            let summary = &report.summary;
            Ok(format!(
                "{} documents compared: {} changed, {} missing, {} unchanged\nChanges saved to {output}",
                summary.documents_visited,
                summary.documents_changed,
                summary.documents_missing,
                summary.documents_unchanged
            ))
        }
    }
}

#[cfg(test)]
#[path = "run_test.rs"]
mod tests;
