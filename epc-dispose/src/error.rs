use std::path::PathBuf;

use http::StatusCode;
use thiserror::Error;

/// Enumeration of errors that abort a dispose run.
///
/// Missing identifiers are not part of this enum: an incomplete run is reported through
/// `pipeline::Outcome::Incomplete` instead.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("input file does not exist: {0}")]
    MissingInputFile(PathBuf),
    #[error("unsupported reference file format {extension:?}: {path}")]
    UnsupportedFormat { path: PathBuf, extension: String },
    #[error("an io error occurred")]
    Io(#[from] std::io::Error),
    #[error("a delimited file could not be read or written")]
    Csv(#[from] csv::Error),
    #[error("failed to read spreadsheet {path}: {reason}")]
    Spreadsheet { path: PathBuf, reason: String },
    #[error(transparent)]
    Upload(#[from] UploadError),
}

/// Enumeration of errors related to delivering batches to the upload endpoint.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("error parsing upload url")]
    ParseUrl(#[source] url::ParseError),
    #[error("api key is not a valid header value")]
    ApiKey(#[source] http::header::InvalidHeaderValue),
    #[error("failed to construct http client for uploader")]
    ClientBuild(#[source] reqwest::Error),
    #[error("failed to serialize batch starting at epc {first_epc}")]
    Serialize {
        first_epc: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("batch starting at epc {first_epc} was rejected twice, last status {status}")]
    Rejected {
        first_epc: String,
        status: StatusCode,
    },
    #[error("batch starting at epc {first_epc} could not be delivered twice")]
    Transport {
        first_epc: String,
        #[source]
        source: reqwest::Error,
    },
}

impl UploadError {
    /// The first tag identifier of the batch that failed, if the error is tied to a batch.
    pub fn first_epc(&self) -> Option<&str> {
        match self {
            UploadError::ParseUrl(_) | UploadError::ApiKey(_) | UploadError::ClientBuild(_) => {
                None
            }
            UploadError::Serialize { first_epc, .. }
            | UploadError::Rejected { first_epc, .. }
            | UploadError::Transport { first_epc, .. } => Some(first_epc),
        }
    }
}
