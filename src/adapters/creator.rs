//! Zoho Creator REST (v2) and Bulk Read API client.

use crate::adapters::http::{ApiClient, RequestPlan};
use crate::core::bulk_export::{BulkJob, BulkJobStatus, BulkReadApi, ReportApi};
use crate::domain::model::Table;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Largest batch the Bulk Read API accepts per job.
pub const BULK_MAX_RECORDS: u64 = 200_000;

/// Records per page of the classic report endpoint.
pub const VIEW_PAGE_SIZE: usize = 200;

/// Body code of a report page with no more records.
pub const NO_RECORDS_CODE: i64 = 3100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreatorEndpoints {
    pub api_endpoint: String,
    pub bulk_endpoint: String,
    pub download_host: String,
    /// Account name that owns the applications (first path segment).
    pub owner: String,
    pub max_records: u64,
}

impl Default for CreatorEndpoints {
    fn default() -> Self {
        Self {
            api_endpoint: "https://creator.zoho.eu/api/v2/".to_string(),
            bulk_endpoint: "https://creator.zoho.eu/api/bulk/v2".to_string(),
            download_host: "https://creator.zoho.eu".to_string(),
            owner: "username_of_report_creator".to_string(),
            max_records: BULK_MAX_RECORDS,
        }
    }
}

impl CreatorEndpoints {
    fn app_url(&self, app_name: &str) -> String {
        format!(
            "{}/{}/{}",
            self.api_endpoint.trim_end_matches('/'),
            self.owner,
            app_name
        )
    }

    fn bulk_read_url(&self, app_name: &str, view_name: &str) -> String {
        format!(
            "{}/{}/{}/report/{}/read",
            self.bulk_endpoint.trim_end_matches('/'),
            self.owner,
            app_name,
            view_name
        )
    }

    fn download_url(&self, download_url: &str) -> String {
        if download_url.starts_with("http://") || download_url.starts_with("https://") {
            download_url.to_string()
        } else {
            format!("{}{}", self.download_host.trim_end_matches('/'), download_url)
        }
    }
}

pub struct CreatorClient {
    api: ApiClient,
    endpoints: CreatorEndpoints,
}

impl CreatorClient {
    pub fn new(api: ApiClient, endpoints: CreatorEndpoints) -> Self {
        Self { api, endpoints }
    }

    pub fn endpoints(&self) -> &CreatorEndpoints {
        &self.endpoints
    }

    pub async fn create_bulk_read_job(
        &self,
        app_name: &str,
        view_name: &str,
        cursor: Option<&str>,
    ) -> Result<BulkJob> {
        let url = self.endpoints.bulk_read_url(app_name, view_name);

        let mut query = json!({ "max_records": self.endpoints.max_records });
        if let Some(cursor) = cursor {
            query["record_cursor"] = Value::String(cursor.to_string());
        }

        let plan = RequestPlan::post(&url)
            .header("scope", "ZohoCreator.bulk.CREATE")
            .json_body(json!({ "query": query }));
        let response = self.api.send_json(&plan).await?;

        let job_id = match response.pointer("/details/id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => {
                return Err(EtlError::ProcessingError {
                    message: format!("bulk read job response has no details.id: {}", response),
                })
            }
        };

        tracing::info!("🧾 Zoho Creator Bulk Read Job Id: {}", job_id);
        Ok(BulkJob {
            url,
            job_id,
            cursor: cursor.map(str::to_string),
        })
    }

    pub async fn check_bulk_job(&self, job: &BulkJob) -> Result<BulkJobStatus> {
        let plan = RequestPlan::get(format!("{}/{}", job.url, job.job_id))
            .header("scope", "ZohoCreator.bulk.READ");
        let response = self.api.send_json(&plan).await?;
        BulkJobStatus::from_response(&job.job_id, &response)
    }

    pub async fn download_data(&self, download_url: &str) -> Result<Vec<u8>> {
        let plan = RequestPlan::get(self.endpoints.download_url(download_url))
            .header("scope", "ZohoCreator.bulk.READ")
            .raw();
        self.api.send(&plan).await?.into_bytes()
    }

    pub async fn get_view(&self, app_name: &str, view_name: &str, start: usize) -> Result<Value> {
        let plan = RequestPlan::get(format!(
            "{}/report/{}",
            self.endpoints.app_url(app_name),
            view_name
        ))
        .header("scope", "ZohoCreator.report.READ")
        .param("from", start)
        .param("limit", VIEW_PAGE_SIZE)
        .allow_code(NO_RECORDS_CODE);

        self.api.send_json(&plan).await
    }

    pub async fn get_apps(&self) -> Result<Table> {
        let plan = RequestPlan::get(format!(
            "{}/applications",
            self.endpoints.api_endpoint.trim_end_matches('/')
        ))
        .header("scope", "ZohoCreator.dashboard.READ");
        let response = self.api.send_json(&plan).await?;

        let apps = array_field(&response, "applications")?;
        Table::from_json_records(apps)
    }

    pub async fn get_forms(&self, app_name: &str) -> Result<Table> {
        self.component_listing(app_name, "forms").await
    }

    pub async fn get_reports(&self, app_name: &str) -> Result<Table> {
        self.component_listing(app_name, "reports").await
    }

    async fn component_listing(&self, app_name: &str, kind: &str) -> Result<Table> {
        let plan = RequestPlan::get(format!("{}/{}", self.endpoints.app_url(app_name), kind))
            .header("scope", "ZohoCreator.meta.application.READ");
        let response = self.api.send_json(&plan).await?;

        let mut table = Table::new(vec![
            "App".to_string(),
            "display_name".to_string(),
            "link_name".to_string(),
        ]);
        for entry in array_field(&response, kind)? {
            table.push_row(vec![
                app_name.to_string(),
                string_field(entry, "display_name"),
                string_field(entry, "link_name"),
            ])?;
        }
        Ok(table)
    }

    pub async fn create_record(&self, app_name: &str, form_name: &str, data: Value) -> Result<Value> {
        let plan = RequestPlan::post(format!(
            "{}/form/{}",
            self.endpoints.app_url(app_name),
            form_name
        ))
        .header("scope", "ZohoCreator.form.CREATE")
        .json_body(json!({ "data": data }));
        let response = self.api.send_json(&plan).await?;
        tracing::info!("📝 Created record in {}/{}: {}", app_name, form_name, message_of(&response));
        Ok(response)
    }

    pub async fn update_record(
        &self,
        app_name: &str,
        report_name: &str,
        record_id: &str,
        data: Value,
    ) -> Result<Value> {
        let plan = RequestPlan::patch(format!(
            "{}/report/{}",
            self.endpoints.app_url(app_name),
            report_name
        ))
        .header("scope", "ZohoCreator.report.UPDATE")
        .json_body(json!({ "criteria": format!("ID = {}", record_id), "data": data }));
        let response = self.api.send_json(&plan).await?;
        tracing::info!("📝 Updated record {}: {}", record_id, message_of(&response));
        Ok(response)
    }

    pub async fn delete_record(&self, app_name: &str, report_name: &str, record_id: &str) -> Result<Value> {
        let plan = RequestPlan::delete(format!(
            "{}/report/{}",
            self.endpoints.app_url(app_name),
            report_name
        ))
        .header("scope", "ZohoCreator.report.DELETE")
        .json_body(json!({ "criteria": format!("ID = {}", record_id) }));
        let response = self.api.send_json(&plan).await?;
        tracing::info!("🗑️ Deleted record {}: {}", record_id, message_of(&response));
        Ok(response)
    }
}

#[async_trait]
impl BulkReadApi for CreatorClient {
    async fn create_bulk_read_job(
        &self,
        app_name: &str,
        view_name: &str,
        cursor: Option<&str>,
    ) -> Result<BulkJob> {
        CreatorClient::create_bulk_read_job(self, app_name, view_name, cursor).await
    }

    async fn check_bulk_job(&self, job: &BulkJob) -> Result<BulkJobStatus> {
        CreatorClient::check_bulk_job(self, job).await
    }

    async fn download_data(&self, download_url: &str) -> Result<Vec<u8>> {
        CreatorClient::download_data(self, download_url).await
    }
}

#[async_trait]
impl ReportApi for CreatorClient {
    async fn get_view(&self, app_name: &str, view_name: &str, start: usize) -> Result<Value> {
        CreatorClient::get_view(self, app_name, view_name, start).await
    }
}

fn array_field<'a>(response: &'a Value, key: &str) -> Result<&'a [Value]> {
    response
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or_else(|| EtlError::ProcessingError {
            message: format!("response has no '{}' array: {}", key, response),
        })
}

fn string_field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn message_of(response: &Value) -> &str {
    response
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("no message")
}
