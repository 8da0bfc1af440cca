//! Authenticated request dispatch with retry on rejected tokens.

use crate::adapters::auth::TokenManager;
use crate::utils::error::{EtlError, Result};
use crate::utils::retry::{RetryDecision, RetryPolicy};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::sync::Arc;

/// Zoho body codes meaning the request was not authorised / denied.
pub const AUTH_FAILURE_CODES: [i64; 2] = [2, 57];

#[derive(Debug, Clone)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// HTTP verb, URL, query parameters and payload of one API call.
#[derive(Debug, Clone)]
pub struct RequestPlan {
    pub method: Method,
    pub url: String,
    pub params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub json: Option<Value>,
    pub file: Option<FilePart>,
    /// Return the body as bytes instead of parsing JSON (PDFs, images, exports).
    pub raw: bool,
    /// Body codes that are valid answers even on a non-2xx status.
    pub allowed_codes: Vec<i64>,
}

impl RequestPlan {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            params: Vec::new(),
            headers: Vec::new(),
            json: None,
            file: None,
            raw: false,
            allowed_codes: Vec::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::PATCH, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json_body(mut self, body: Value) -> Self {
        self.json = Some(body);
        self
    }

    pub fn file(mut self, file: FilePart) -> Self {
        self.file = Some(file);
        self
    }

    pub fn raw(mut self) -> Self {
        self.raw = true;
        self
    }

    pub fn allow_code(mut self, code: i64) -> Self {
        self.allowed_codes.push(code);
        self
    }

    pub fn param_value(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub enum ApiResponse {
    Json(Value),
    Raw {
        status: u16,
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
}

impl ApiResponse {
    pub fn into_json(self) -> Result<Value> {
        match self {
            ApiResponse::Json(value) => Ok(value),
            ApiResponse::Raw { bytes, .. } => Ok(serde_json::from_slice(&bytes)?),
        }
    }

    pub fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            ApiResponse::Raw { bytes, .. } => Ok(bytes),
            ApiResponse::Json(value) => Ok(serde_json::to_vec(&value)?),
        }
    }
}

enum Attempt {
    Done(ApiResponse),
    AuthRejected(String),
}

/// Sends [`RequestPlan`]s with the bearer token of one API.
pub struct ApiClient {
    client: Client,
    tokens: Arc<TokenManager>,
    retry: RetryPolicy,
}

impl ApiClient {
    pub fn new(client: Client, tokens: Arc<TokenManager>, retry: RetryPolicy) -> Self {
        Self {
            client,
            tokens,
            retry,
        }
    }

    pub async fn send(&self, plan: &RequestPlan) -> Result<ApiResponse> {
        let mut attempt = 1;
        loop {
            match self.send_once(plan).await? {
                Attempt::Done(response) => return Ok(response),
                Attempt::AuthRejected(reason) => {
                    self.tokens.invalidate().await;
                    match self.retry.after_auth_failure(attempt) {
                        RetryDecision::Retry {
                            delay,
                            next_attempt,
                        } => {
                            tracing::warn!(
                                "🔁 {} {} rejected ({}), retrying in {:?} (attempt {}/{})",
                                plan.method,
                                plan.url,
                                reason,
                                delay,
                                next_attempt,
                                self.retry.max_attempts
                            );
                            tokio::time::sleep(delay).await;
                            attempt = next_attempt;
                        }
                        RetryDecision::GiveUp => {
                            return Err(EtlError::AuthError {
                                message: format!("{} after {} attempt(s)", reason, attempt),
                            });
                        }
                    }
                }
            }
        }
    }

    pub async fn send_json(&self, plan: &RequestPlan) -> Result<Value> {
        self.send(plan).await?.into_json()
    }

    async fn send_once(&self, plan: &RequestPlan) -> Result<Attempt> {
        let authorization = self.tokens.authorization_header().await?;

        let mut request = self
            .client
            .request(plan.method.clone(), &plan.url)
            .header(AUTHORIZATION, authorization);

        if !plan.params.is_empty() {
            request = request.query(&plan.params);
        }
        for (key, value) in &plan.headers {
            request = request.header(key.as_str(), value.as_str());
        }
        if let Some(body) = &plan.json {
            request = request.json(body);
        }
        if let Some(file) = &plan.file {
            let part = Part::bytes(file.bytes.clone())
                .file_name(file.file_name.clone())
                .mime_str(&file.mime)?;
            request = request.multipart(Form::new().part(file.field.clone(), part));
        }

        tracing::debug!("➡️ {} {} params={:?}", plan.method, plan.url, redact(&plan.params));

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("⬅️ {} {} -> {}", plan.method, plan.url, status);

        if status == StatusCode::UNAUTHORIZED {
            return Ok(Attempt::AuthRejected(format!("HTTP 401 from {}", plan.url)));
        }

        if plan.raw {
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let bytes = response.bytes().await?.to_vec();
            if !status.is_success() {
                return Err(EtlError::ApiResponseError {
                    status: status.as_u16(),
                    code: None,
                    message: String::from_utf8_lossy(&bytes).into_owned(),
                });
            }
            return Ok(Attempt::Done(ApiResponse::Raw {
                status: status.as_u16(),
                content_type,
                bytes,
            }));
        }

        let text = response.text().await?;
        let body: Value = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(e) if status.is_success() => return Err(e.into()),
            Err(_) => {
                return Err(EtlError::ApiResponseError {
                    status: status.as_u16(),
                    code: None,
                    message: text,
                })
            }
        };

        let code = body.get("code").and_then(Value::as_i64);
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        if let Some(code) = code {
            if AUTH_FAILURE_CODES.contains(&code) {
                return Ok(Attempt::AuthRejected(format!("code {}: {}", code, message)));
            }
        }

        let allowed = code.is_some_and(|c| plan.allowed_codes.contains(&c));
        if !status.is_success() && !allowed {
            return Err(EtlError::ApiResponseError {
                status: status.as_u16(),
                code,
                message,
            });
        }

        Ok(Attempt::Done(ApiResponse::Json(body)))
    }
}

/// Write payloads can carry customer data; only log parameter names for them.
fn redact(params: &[(String, String)]) -> Vec<(&str, &str)> {
    params
        .iter()
        .map(|(k, v)| {
            if k == "JSONString" {
                (k.as_str(), "<payload>")
            } else {
                (k.as_str(), v.as_str())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plan_builder() {
        let plan = RequestPlan::post("https://inventory.zoho.eu/api/v1/items")
            .param("organization_id", "123")
            .param("page", 2)
            .header("scope", "ZohoInventory.items.CREATE")
            .json_body(json!({"name": "Widget"}));

        assert_eq!(plan.method, Method::POST);
        assert_eq!(plan.param_value("organization_id"), Some("123"));
        assert_eq!(plan.param_value("page"), Some("2"));
        assert_eq!(plan.param_value("missing"), None);
        assert_eq!(plan.headers.len(), 1);
        assert!(!plan.raw);
    }

    #[test]
    fn test_redact_hides_payload() {
        let params = vec![
            ("organization_id".to_string(), "123".to_string()),
            ("JSONString".to_string(), "{\"email\":\"a@b.c\"}".to_string()),
        ];
        assert_eq!(
            redact(&params),
            vec![("organization_id", "123"), ("JSONString", "<payload>")]
        );
    }

    #[test]
    fn test_response_conversions() {
        let json = ApiResponse::Json(json!({"code": 0}));
        assert_eq!(json.into_json().unwrap()["code"], 0);

        let raw = ApiResponse::Raw {
            status: 200,
            content_type: Some("application/pdf".to_string()),
            bytes: b"%PDF".to_vec(),
        };
        assert_eq!(raw.into_bytes().unwrap(), b"%PDF");
    }
}
