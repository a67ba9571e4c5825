use std::path::{Path, PathBuf};

use storage::dto::submission::{SubmitCompetitionRequest, ValidatedSubmission};
use tracing::{error, info, warn};

use crate::context::ImportContext;
use crate::validator::{SubmissionValidator, ValidationReport};
use crate::Result;

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

/// JSON files directly under `directory` and one level of subdirectories,
/// sorted by path.
pub async fn discover_json_files(directory: &Path) -> Result<Vec<PathBuf>> {
    let mut json_files = Vec::new();
    let mut entries = tokio::fs::read_dir(directory).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.is_dir() {
            let mut sub_entries = tokio::fs::read_dir(&path).await?;
            while let Some(sub_entry) = sub_entries.next_entry().await? {
                let sub_path = sub_entry.path();
                if is_json(&sub_path) {
                    json_files.push(sub_path);
                }
            }
        } else if is_json(&path) {
            json_files.push(path);
        }
    }

    json_files.sort();
    Ok(json_files)
}

pub async fn load_submission(path: &Path) -> Result<(ValidatedSubmission, ValidationReport)> {
    let json_content = tokio::fs::read_to_string(path).await?;
    let request: SubmitCompetitionRequest = serde_json::from_str(&json_content)?;
    SubmissionValidator::validate(request)
}

/// Validates one file and, given a context, stores it.
pub async fn import_file(path: &Path, context: Option<&ImportContext>) -> Result<()> {
    let (submission, report) = load_submission(path).await?;
    report.log_warnings();

    let Some(context) = context else {
        return Ok(());
    };

    let outcome = context.submit(&submission).await?;
    info!(
        competition_id = %outcome.competition.competition_id,
        results = outcome.result_count,
        baseline = ?outcome.baseline,
        "Imported {}",
        path.display()
    );
    Ok(())
}

#[derive(Debug, Default)]
pub struct BulkImportSummary {
    pub succeeded: usize,
    pub failed: Vec<(PathBuf, String)>,
}

impl BulkImportSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed.len()
    }
}

/// Processes every discovered file, continuing past failures.
pub async fn import_directory(
    directory: &Path,
    context: Option<&ImportContext>,
) -> Result<BulkImportSummary> {
    let json_files = discover_json_files(directory).await?;
    let mut summary = BulkImportSummary::default();

    if json_files.is_empty() {
        warn!("No JSON files found in {}", directory.display());
        return Ok(summary);
    }

    info!("Found {} submission file(s)", json_files.len());

    for (idx, file_path) in json_files.iter().enumerate() {
        info!("[{}/{}] Processing: {}", idx + 1, json_files.len(), file_path.display());

        match import_file(file_path, context).await {
            Ok(()) => summary.succeeded += 1,
            Err(e) => {
                error!("  Error: {}", e);
                summary.failed.push((file_path.clone(), e.to_string()));
            }
        }
    }

    info!(
        "Summary: {} succeeded, {} failed",
        summary.succeeded,
        summary.failed.len()
    );

    Ok(summary)
}
