//! Scheduler-facing units of work.
//!
//! An operator is a [`Pipeline`] with a name. `execute` runs it once through
//! the [`EtlEngine`] for a given scheduler run and returns the task summary.

use crate::adapters::inventory::{InventoryClient, InventoryResource};
use crate::core::bulk_export::{paginate_view, BulkExportWorkflow, BulkReadApi, PollSettings, ReportApi, DEFAULT_PAGE_DELAY};
use crate::core::etl::EtlEngine;
use crate::domain::model::{Table, TransformResult};
use crate::domain::ports::{Pipeline, Storage};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Run metadata handed over by the scheduler.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub run_id: String,
    pub logical_date: DateTime<Utc>,
}

impl TaskContext {
    pub fn new(run_id: impl Into<String>, logical_date: DateTime<Utc>) -> Self {
        Self {
            run_id: run_id.into(),
            logical_date,
        }
    }

    /// 手動執行 (CLI) 時使用
    pub fn manual() -> Self {
        let now = Utc::now();
        Self::new(format!("manual__{}", now.format("%Y-%m-%dT%H:%M:%S")), now)
    }
}

#[async_trait]
pub trait Operator: Pipeline {
    fn task_id(&self) -> &str;

    /// One-line summary logged at start and returned from `execute`.
    fn describe(&self) -> String;

    fn monitor_enabled(&self) -> bool {
        false
    }

    async fn execute(&self, context: &TaskContext) -> Result<String> {
        let message = self.describe();
        tracing::info!(
            "▶️ [{}] run {} ({}) {}",
            self.task_id(),
            context.run_id,
            context.logical_date.to_rfc3339(),
            message
        );

        let output = EtlEngine::new_with_monitoring(self, self.monitor_enabled())
            .run()
            .await?;

        tracing::info!("✅ [{}] finished, output: {}", self.task_id(), output);
        Ok(message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum ExtractMode {
    /// Bulk Read job (create, poll, download ZIP, follow cursor)
    #[default]
    Bulk,
    /// Classic report endpoint, 200 records per page
    Paginate,
}

impl fmt::Display for ExtractMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractMode::Bulk => f.write_str("bulk"),
            ExtractMode::Paginate => f.write_str("paginate"),
        }
    }
}

impl FromStr for ExtractMode {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bulk" => Ok(ExtractMode::Bulk),
            "paginate" => Ok(ExtractMode::Paginate),
            other => Err(EtlError::invalid_operation("creator extract", other, "expected bulk or paginate")),
        }
    }
}

/// Where a Creator report lands.
#[derive(Debug, Clone)]
pub struct CreatorTask {
    pub dataset: String,
    pub app_name: String,
    pub view_name: String,
    pub table_name: String,
    pub bucket_name: String,
}

fn dedupe_to_csv(mut table: Table) -> Result<TransformResult> {
    let duplicates_dropped = table.drop_duplicates();
    if duplicates_dropped > 0 {
        tracing::debug!("🧹 Dropped {} duplicate rows", duplicates_dropped);
    }
    let csv_output = table.to_csv()?;
    Ok(TransformResult {
        table,
        csv_output,
        duplicates_dropped,
    })
}

/// Extracts one Creator report into `{bucket}/{dataset}/{table}.csv`.
pub struct CreatorExtractOperator<S: Storage, A> {
    task_id: String,
    task: CreatorTask,
    api: Arc<A>,
    storage: S,
    mode: ExtractMode,
    polling: PollSettings,
    page_delay: Duration,
    monitor: bool,
}

impl<S, A> CreatorExtractOperator<S, A>
where
    S: Storage,
    A: BulkReadApi + ReportApi + 'static,
{
    pub fn new(task_id: impl Into<String>, task: CreatorTask, api: Arc<A>, storage: S) -> Self {
        Self {
            task_id: task_id.into(),
            task,
            api,
            storage,
            mode: ExtractMode::default(),
            polling: PollSettings::default(),
            page_delay: DEFAULT_PAGE_DELAY,
            monitor: false,
        }
    }

    pub fn with_mode(mut self, mode: ExtractMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_polling(mut self, polling: PollSettings) -> Self {
        self.polling = polling;
        self
    }

    pub fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }

    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor = enabled;
        self
    }

    pub fn output_path(&self) -> String {
        format!(
            "{}/{}/{}.csv",
            self.task.bucket_name, self.task.dataset, self.task.table_name
        )
    }
}

#[async_trait]
impl<S, A> Pipeline for CreatorExtractOperator<S, A>
where
    S: Storage,
    A: BulkReadApi + ReportApi + 'static,
{
    async fn extract(&self) -> Result<Table> {
        let CreatorTask {
            app_name, view_name, ..
        } = &self.task;

        match self.mode {
            ExtractMode::Bulk => {
                BulkExportWorkflow::new(self.api.clone(), self.polling)
                    .download_all(app_name, view_name)
                    .await
            }
            ExtractMode::Paginate => {
                paginate_view(self.api.as_ref(), app_name, view_name, self.page_delay).await
            }
        }
    }

    async fn transform(&self, data: Table) -> Result<TransformResult> {
        dedupe_to_csv(data)
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let path = self.output_path();
        self.storage
            .write_file(&path, result.csv_output.as_bytes())
            .await?;
        Ok(path)
    }
}

#[async_trait]
impl<S, A> Operator for CreatorExtractOperator<S, A>
where
    S: Storage,
    A: BulkReadApi + ReportApi + 'static,
{
    fn task_id(&self) -> &str {
        &self.task_id
    }

    fn describe(&self) -> String {
        format!(
            "App_Name:: {}, View Name:: {}, Table Name:: {}",
            self.task.app_name, self.task.view_name, self.task.table_name
        )
    }

    fn monitor_enabled(&self) -> bool {
        self.monitor
    }
}

/// Lists every record of one Inventory collection into `{bucket}/{dataset}/{table}.csv`.
pub struct InventoryExtractOperator<S: Storage> {
    task_id: String,
    resource: InventoryResource,
    client: Arc<InventoryClient>,
    storage: S,
    bucket_name: String,
    dataset: String,
    table_name: String,
    monitor: bool,
}

impl<S: Storage> InventoryExtractOperator<S> {
    pub fn new(
        task_id: impl Into<String>,
        resource: InventoryResource,
        client: Arc<InventoryClient>,
        storage: S,
        bucket_name: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            resource,
            client,
            storage,
            bucket_name: bucket_name.into(),
            dataset: "inventory".to_string(),
            table_name: resource.path().to_string(),
            monitor: false,
        }
    }

    pub fn with_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = dataset.into();
        self
    }

    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor = enabled;
        self
    }

    pub fn output_path(&self) -> String {
        format!("{}/{}/{}.csv", self.bucket_name, self.dataset, self.table_name)
    }
}

#[async_trait]
impl<S: Storage> Pipeline for InventoryExtractOperator<S> {
    async fn extract(&self) -> Result<Table> {
        let records = self.client.list_all(self.resource).await?;
        Table::from_json_records(&records)
    }

    async fn transform(&self, data: Table) -> Result<TransformResult> {
        dedupe_to_csv(data)
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let path = self.output_path();
        self.storage
            .write_file(&path, result.csv_output.as_bytes())
            .await?;
        Ok(path)
    }
}

#[async_trait]
impl<S: Storage> Operator for InventoryExtractOperator<S> {
    fn task_id(&self) -> &str {
        &self.task_id
    }

    fn describe(&self) -> String {
        format!(
            "Organization:: {}, Resource:: {}, Table Name:: {}",
            self.client.endpoints().organization_id,
            self.resource,
            self.table_name
        )
    }

    fn monitor_enabled(&self) -> bool {
        self.monitor
    }
}
