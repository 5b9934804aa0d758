use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::dedup::latest_per_epc;
use crate::error::PipelineError;
use crate::parse::{read_records, DroppedRow};
use crate::reconcile::missing_epcs;
use crate::reference::{load_reference, ReferenceFormat};
use crate::upload::Uploader;
use crate::writer::{dispose_path, write_records};

/// Result string of a run where every batch was accepted.
pub const SUCCESS: &str = "上传成功";
/// Prefix of the result string when the reference lists EPCs the export lacks.
pub const MISSING_PREFIX: &str = "缺失EPC: ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Every record was accepted by the upload endpoint.
    Uploaded { records: usize, batches: usize },
    /// The reference set lists EPCs the export lacks. Nothing was uploaded.
    Incomplete { missing: Vec<String> },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Uploaded { .. })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Uploaded { .. } => f.write_str(SUCCESS),
            Outcome::Incomplete { missing } => write!(f, "{MISSING_PREFIX}{}", missing.join(",")),
        }
    }
}

#[derive(Debug)]
pub struct Report {
    pub outcome: Outcome,
    /// Where the deduplicated records were written.
    pub output_path: PathBuf,
    /// Rows of the input that were skipped while parsing.
    pub dropped: Vec<DroppedRow>,
}

fn ensure_exists(path: &Path) -> Result<(), PipelineError> {
    if path.exists() {
        Ok(())
    } else {
        Err(PipelineError::MissingInputFile(path.to_path_buf()))
    }
}

/// Run one dispose pass: parse `input`, keep the latest record per EPC, write the dispose
/// file next to `input`, check the result against `reference` and, only if nothing is
/// missing, upload it.
pub async fn run(
    input: &Path,
    reference: &Path,
    uploader: &Uploader,
) -> Result<Report, PipelineError> {
    ensure_exists(input)?;
    ensure_exists(reference)?;
    // Reject an unsupported reference before anything is written.
    ReferenceFormat::from_path(reference)?;

    let parsed = read_records(input)?;
    if !parsed.dropped.is_empty() {
        warn!(
            dropped = parsed.dropped.len(),
            input = %input.display(),
            "skipped malformed rows"
        );
    }
    let parsed_count = parsed.records.len();

    let records = latest_per_epc(parsed.records);
    let output_path = dispose_path(input);
    write_records(&output_path, &records)?;
    info!(
        parsed = parsed_count,
        kept = records.len(),
        output = %output_path.display(),
        "wrote deduplicated records"
    );

    let expected = load_reference(reference)?;
    let missing = missing_epcs(&expected, &records);
    let outcome = if missing.is_empty() {
        let batches = uploader.upload(&records).await?;
        info!(records = records.len(), batches, "upload complete");
        Outcome::Uploaded {
            records: records.len(),
            batches,
        }
    } else {
        warn!(
            missing = missing.len(),
            expected = expected.len(),
            "reference lists epcs missing from export, skipping upload"
        );
        Outcome::Incomplete { missing }
    };

    Ok(Report {
        outcome,
        output_path,
        dropped: parsed.dropped,
    })
}
