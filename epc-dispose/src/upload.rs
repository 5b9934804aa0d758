use std::num::NonZeroUsize;
use std::time;

use http::StatusCode;
use reqwest::header;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::{Config, SourceTimezone};
use crate::error::UploadError;
use crate::record::EventRecord;

/// Largest number of records sent in one request.
pub const MAX_BATCH_SIZE: usize = 500;
pub const SUPPLIER_ID: u32 = 22;
pub const DEVICE_SERIAL_NUMBER: &str = "TKZ01";

const API_KEY_HEADER: &str = "itx-apiKey";
const ENCODING_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// One element of the JSON array posted for a batch.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TagPayload<'a> {
    pub epc_hex: &'a str,
    pub access_password_hex: &'a str,
    pub encoding_date: String,
    pub supplier_id: u32,
    pub device_serial_number: &'static str,
    pub tid_hex: &'a str,
}

impl<'a> TagPayload<'a> {
    pub fn new(record: &'a EventRecord, timezone: SourceTimezone) -> Self {
        Self {
            epc_hex: &record.epc,
            access_password_hex: &record.access_password,
            encoding_date: timezone
                .to_utc(&record.timestamp)
                .format(ENCODING_DATE_FORMAT)
                .to_string(),
            supplier_id: SUPPLIER_ID,
            device_serial_number: DEVICE_SERIAL_NUMBER,
            tid_hex: &record.tid,
        }
    }
}

/// Where a batch is in its send-once, retry-once lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchState {
    Sent,
    Retrying,
}

/// Posts records to the tag endpoint in fixed-size batches, one request in flight at a time.
pub struct Uploader {
    client: reqwest::Client,
    url: reqwest::Url,
    api_key: header::HeaderValue,
    batch_size: usize,
    timezone: SourceTimezone,
}

impl Uploader {
    pub fn new(
        url: &str,
        api_key: &str,
        request_timeout: time::Duration,
        timezone: SourceTimezone,
    ) -> Result<Self, UploadError> {
        let url: reqwest::Url = url.parse().map_err(UploadError::ParseUrl)?;
        let mut api_key =
            header::HeaderValue::from_str(api_key).map_err(UploadError::ApiKey)?;
        api_key.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent("epc-dispose uploader")
            .timeout(request_timeout)
            .build()
            .map_err(UploadError::ClientBuild)?;

        Ok(Self {
            client,
            url,
            api_key,
            batch_size: MAX_BATCH_SIZE,
            timezone,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, UploadError> {
        Ok(Self::new(
            config.upload_url.as_str(),
            config.api_key.as_str(),
            config.request_timeout.0,
            config.source_timezone,
        )?
        .with_batch_size(config.batch_size))
    }

    /// Override the batch size. Values above [`MAX_BATCH_SIZE`] are capped.
    pub fn with_batch_size(mut self, batch_size: NonZeroUsize) -> Self {
        self.batch_size = batch_size.get().min(MAX_BATCH_SIZE);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Upload all `records` in order, batch by batch. The first batch that fails twice
    /// aborts the upload and no later batch is sent.
    ///
    /// Returns the number of batches sent.
    pub async fn upload(&self, records: &[EventRecord]) -> Result<usize, UploadError> {
        let mut sent = 0;
        for (index, batch) in records.chunks(self.batch_size).enumerate() {
            self.upload_batch(index, batch).await?;
            sent += 1;
        }
        Ok(sent)
    }

    async fn upload_batch(&self, index: usize, batch: &[EventRecord]) -> Result<(), UploadError> {
        let first_epc = batch
            .first()
            .map(|r| r.epc.clone())
            .unwrap_or_default();

        let payload: Vec<TagPayload> = batch
            .iter()
            .map(|record| TagPayload::new(record, self.timezone))
            .collect();
        let body = serde_json::to_vec(&payload).map_err(|source| UploadError::Serialize {
            first_epc: first_epc.clone(),
            source,
        })?;

        let mut state = BatchState::Sent;
        loop {
            let result = self.post(body.clone()).await;
            if matches!(result, Ok(status) if status == StatusCode::MULTI_STATUS) {
                info!(batch = index, records = batch.len(), %first_epc, "batch uploaded");
                return Ok(());
            }

            match state {
                BatchState::Sent => {
                    match &result {
                        Ok(status) => {
                            warn!(batch = index, %first_epc, %status, "batch rejected, retrying")
                        }
                        Err(e) => {
                            warn!(batch = index, %first_epc, error = %e, "batch not delivered, retrying")
                        }
                    }
                    state = BatchState::Retrying;
                }
                BatchState::Retrying => {
                    let error = match result {
                        Ok(status) => UploadError::Rejected { first_epc, status },
                        Err(source) => UploadError::Transport { first_epc, source },
                    };
                    error!(batch = index, "{}", error);
                    return Err(error);
                }
            }
        }
    }

    async fn post(&self, body: Vec<u8>) -> Result<StatusCode, reqwest::Error> {
        let response = self
            .client
            .post(self.url.clone())
            .header(API_KEY_HEADER, self.api_key.clone())
            .body(body)
            .send()
            .await?;

        Ok(response.status())
    }
}
