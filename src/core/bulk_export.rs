//! Bulk export workflow: create job → poll → download → unzip → continue by cursor.

use crate::domain::model::Table;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Zoho needs roughly a minute to prepare an export; checking every 30s is enough.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Pause between classic report pages to stay under the API rate limit.
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(3500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkJob {
    /// `.../report/{view}/read` URL the job was created on.
    pub url: String,
    pub job_id: String,
    /// Cursor the job was created with; `None` for the first batch.
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkJobState {
    Scheduled,
    InProgress,
    Completed,
    Failed,
    Other(String),
}

impl BulkJobState {
    pub fn parse(raw: &str) -> Self {
        let normalized: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "scheduled" | "queued" => BulkJobState::Scheduled,
            "inprogress" | "running" => BulkJobState::InProgress,
            "completed" => BulkJobState::Completed,
            "failed" => BulkJobState::Failed,
            _ => BulkJobState::Other(raw.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BulkJobState::Completed | BulkJobState::Failed)
    }
}

impl fmt::Display for BulkJobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BulkJobState::Scheduled => write!(f, "Scheduled"),
            BulkJobState::InProgress => write!(f, "In-progress"),
            BulkJobState::Completed => write!(f, "Completed"),
            BulkJobState::Failed => write!(f, "Failed"),
            BulkJobState::Other(raw) => write!(f, "{}", raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkJobStatus {
    pub job_id: String,
    pub state: BulkJobState,
    pub download_url: Option<String>,
    pub record_cursor: Option<String>,
}

impl BulkJobStatus {
    /// Parse `{"details": {"status": ..., "result": {"download_url": ..., "record_cursor": ...}}}`.
    pub fn from_response(job_id: &str, response: &Value) -> Result<Self> {
        let state = response
            .pointer("/details/status")
            .and_then(Value::as_str)
            .map(BulkJobState::parse)
            .ok_or_else(|| EtlError::ProcessingError {
                message: format!("bulk job {} status response has no details.status: {}", job_id, response),
            })?;

        let text = |path: &str| {
            response
                .pointer(path)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Ok(Self {
            job_id: job_id.to_string(),
            state,
            download_url: text("/details/result/download_url"),
            record_cursor: text("/details/result/record_cursor"),
        })
    }
}

#[derive(Debug, Clone)]
pub struct BulkPage {
    pub table: Table,
    /// Cursor for the next batch; `None` once the report is exhausted.
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    /// Upper bound on status checks per job; `None` polls until a terminal status.
    pub max_polls: Option<u32>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_polls: Some(120),
        }
    }
}

#[async_trait]
pub trait BulkReadApi: Send + Sync {
    async fn create_bulk_read_job(
        &self,
        app_name: &str,
        view_name: &str,
        cursor: Option<&str>,
    ) -> Result<BulkJob>;

    async fn check_bulk_job(&self, job: &BulkJob) -> Result<BulkJobStatus>;

    async fn download_data(&self, download_url: &str) -> Result<Vec<u8>>;
}

#[async_trait]
pub trait ReportApi: Send + Sync {
    async fn get_view(&self, app_name: &str, view_name: &str, start: usize) -> Result<Value>;
}

pub struct BulkExportWorkflow<A: BulkReadApi> {
    api: Arc<A>,
    polling: PollSettings,
}

impl<A: BulkReadApi> BulkExportWorkflow<A> {
    pub fn new(api: Arc<A>, polling: PollSettings) -> Self {
        Self { api, polling }
    }

    /// Wait for `job` to finish, then download and parse its export file.
    pub async fn download_workflow(&self, job: &BulkJob) -> Result<BulkPage> {
        let mut polls: u32 = 1;
        let mut status = self.api.check_bulk_job(job).await?;

        loop {
            match status.state {
                BulkJobState::Completed => {
                    tracing::info!("📥 Downloading compressed file for job {}...", job.job_id);
                    let download_url =
                        status
                            .download_url
                            .as_deref()
                            .ok_or_else(|| EtlError::ProcessingError {
                                message: format!("completed job {} has no download_url", job.job_id),
                            })?;
                    let bytes = self.api.download_data(download_url).await?;
                    let table = Table::from_zip_bytes(&bytes)?;
                    tracing::info!(
                        "📦 Job {} returned {} rows (next cursor: {})",
                        job.job_id,
                        table.len(),
                        status.record_cursor.as_deref().unwrap_or("none")
                    );
                    return Ok(BulkPage {
                        table,
                        cursor: status.record_cursor,
                    });
                }
                BulkJobState::Failed => {
                    return Err(EtlError::BulkJobError {
                        job_id: job.job_id.clone(),
                        status: status.state.to_string(),
                    });
                }
                _ => {}
            }

            if let Some(max_polls) = self.polling.max_polls {
                if polls >= max_polls {
                    return Err(EtlError::BulkJobError {
                        job_id: job.job_id.clone(),
                        status: format!("{} after {} status checks", status.state, polls),
                    });
                }
            }

            tracing::info!(
                "⏳ Waiting for file status of job {} ({}), checking again in {:?}",
                job.job_id,
                status.state,
                self.polling.interval
            );
            tokio::time::sleep(self.polling.interval).await;

            status = self.api.check_bulk_job(job).await?;
            polls += 1;
            tracing::debug!("Job {} status: {:?}", job.job_id, status);
        }
    }

    /// Export the whole report, following record cursors until none is returned.
    pub async fn download_all(&self, app_name: &str, view_name: &str) -> Result<Table> {
        let mut job = self
            .api
            .create_bulk_read_job(app_name, view_name, None)
            .await?;
        let mut collector = Table::default();
        let mut page = 1;

        loop {
            tracing::info!(
                "📄 Page: {} Cursor: {}",
                page,
                job.cursor.as_deref().unwrap_or("init")
            );
            let BulkPage { table, cursor } = self.download_workflow(&job).await?;
            collector.append(table);

            let Some(cursor) = cursor else {
                break;
            };
            if job.cursor.as_deref() == Some(cursor.as_str()) {
                return Err(EtlError::ProcessingError {
                    message: format!("record cursor '{}' did not advance after job {}", cursor, job.job_id),
                });
            }

            job = self
                .api
                .create_bulk_read_job(app_name, view_name, Some(&cursor))
                .await?;
            page += 1;
        }

        let dropped = collector.drop_duplicates();
        tracing::info!(
            "✅ Bulk export of {}/{} finished: {} pages, {} rows ({} duplicates dropped)",
            app_name,
            view_name,
            page,
            collector.len(),
            dropped
        );
        Ok(collector)
    }
}

/// Read a report page by page through the classic v2 endpoint.
///
/// Stops on body code `3100` (no records) or an empty page.
pub async fn paginate_view<R: ReportApi + ?Sized>(
    api: &R,
    app_name: &str,
    view_name: &str,
    page_delay: Duration,
) -> Result<Table> {
    use crate::adapters::creator::{NO_RECORDS_CODE, VIEW_PAGE_SIZE};

    let mut collector = Table::default();
    let mut start = 0;

    loop {
        let data = api.get_view(app_name, view_name, start).await?;
        if data.get("code").and_then(Value::as_i64) == Some(NO_RECORDS_CODE) {
            break;
        }

        let records = data
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| EtlError::ProcessingError {
                message: format!("report page at {} has no data array: {}", start, data),
            })?;
        if records.is_empty() {
            break;
        }

        tracing::debug!("📄 {} rows from {}/{} starting at {}", records.len(), app_name, view_name, start);
        collector.append(Table::from_json_records(records)?);

        start += VIEW_PAGE_SIZE;
        tokio::time::sleep(page_delay).await;
    }

    Ok(collector)
}
