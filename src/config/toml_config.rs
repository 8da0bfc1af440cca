use crate::adapters::auth::{OAuthCredentials, RefreshTokenGrant, StoredTokenFile, TokenSource};
use crate::adapters::creator::CreatorEndpoints;
use crate::adapters::inventory::InventoryEndpoints;
use crate::core::bulk_export::{PollSettings, DEFAULT_PAGE_DELAY, DEFAULT_POLL_INTERVAL};
use crate::utils::error::{EtlError, Result};
use crate::utils::retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};
use crate::utils::validation::{self, Validate};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_TOKEN_URL: &str = "https://accounts.zoho.eu/oauth/v2/token";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub creator: Option<CreatorEndpoints>,
    pub inventory: Option<InventoryEndpoints>,
    #[serde(default)]
    pub connections: ConnectionsConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionsConfig {
    pub creator: Option<ConnectionConfig>,
    pub inventory: Option<ConnectionConfig>,
}

/// OAuth self-client of one API, or an exported token file.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    /// 外部憑證庫匯出的 token 檔 (JSON)，設定後不使用 refresh token
    pub token_file: Option<String>,
    /// 到期前多少秒就視為過期
    pub refresh_margin_seconds: Option<i64>,
}

fn default_token_url() -> String {
    DEFAULT_TOKEN_URL.to_string()
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "***"))
            .field("token_url", &self.token_url)
            .field("token_file", &self.token_file)
            .field("refresh_margin_seconds", &self.refresh_margin_seconds)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay_seconds: DEFAULT_RETRY_DELAY.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_seconds: u64,
    /// 0 表示不設上限，一直輪詢到工作結束
    pub max_polls: Option<u32>,
    pub page_delay_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_seconds: DEFAULT_POLL_INTERVAL.as_secs(),
            max_polls: PollSettings::default().max_polls,
            page_delay_ms: DEFAULT_PAGE_DELAY.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub output_path: String,
    /// 輸出路徑的第一層 (對應原本的 bucket)
    pub bucket_name: String,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            output_path: "./output".to_string(),
            bucket_name: "zoho".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub json_logs: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${ZOHO_CLIENT_SECRET})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: format!("invalid placeholder pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.into_owned())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_secs(self.retry.delay_seconds),
        )
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(self.polling.interval_seconds),
            max_polls: self.polling.max_polls.filter(|&polls| polls > 0),
        }
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.polling.page_delay_ms)
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().is_some_and(|m| m.enabled)
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.json_logs)
            .unwrap_or(false)
    }
}

impl ConnectionConfig {
    fn validate_named(&self, name: &str) -> Result<()> {
        validation::validate_url(&format!("connections.{}.token_url", name), &self.token_url)?;

        if let Some(file) = &self.token_file {
            validation::validate_no_placeholder(&format!("connections.{}.token_file", name), file)?;
            return validation::validate_path(&format!("connections.{}.token_file", name), file);
        }

        let fields = [
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("refresh_token", &self.refresh_token),
        ];
        for (field, value) in fields {
            let field = format!("connections.{}.{}", name, field);
            match value {
                Some(value) => {
                    validation::validate_no_placeholder(&field, value)?;
                    validation::validate_non_empty_string(&field, value)?;
                }
                None => return Err(EtlError::MissingConfigError { field }),
            }
        }
        Ok(())
    }

    /// Build the token source this connection describes.
    pub fn token_source(&self, client: Client) -> Result<Arc<dyn TokenSource>> {
        if let Some(file) = &self.token_file {
            return Ok(Arc::new(StoredTokenFile::new(file)));
        }

        let credential = |field: &str, value: &Option<String>| {
            value.clone().ok_or_else(|| EtlError::MissingConfigError {
                field: format!("connection.{}", field),
            })
        };
        let credentials = OAuthCredentials {
            client_id: credential("client_id", &self.client_id)?,
            client_secret: credential("client_secret", &self.client_secret)?,
            refresh_token: credential("refresh_token", &self.refresh_token)?,
        };
        Ok(Arc::new(RefreshTokenGrant::new(
            client,
            self.token_url.clone(),
            credentials,
        )))
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        if self.creator.is_none() && self.inventory.is_none() {
            return Err(EtlError::MissingConfigError {
                field: "creator or inventory".to_string(),
            });
        }

        if let Some(creator) = &self.creator {
            validation::validate_url("creator.api_endpoint", &creator.api_endpoint)?;
            validation::validate_url("creator.bulk_endpoint", &creator.bulk_endpoint)?;
            validation::validate_url("creator.download_host", &creator.download_host)?;
            validation::validate_non_empty_string("creator.owner", &creator.owner)?;
            validation::validate_positive_number("creator.max_records", creator.max_records as usize, 1)?;
            match &self.connections.creator {
                Some(connection) => connection.validate_named("creator")?,
                None => {
                    return Err(EtlError::MissingConfigError {
                        field: "connections.creator".to_string(),
                    })
                }
            }
        }

        if let Some(inventory) = &self.inventory {
            validation::validate_url("inventory.api_endpoint", &inventory.api_endpoint)?;
            validation::validate_no_placeholder("inventory.organization_id", &inventory.organization_id)?;
            validation::validate_non_empty_string("inventory.organization_id", &inventory.organization_id)?;
            match &self.connections.inventory {
                Some(connection) => connection.validate_named("inventory")?,
                None => {
                    return Err(EtlError::MissingConfigError {
                        field: "connections.inventory".to_string(),
                    })
                }
            }
        }

        validation::validate_positive_number("retry.max_attempts", self.retry.max_attempts as usize, 1)?;
        validation::validate_duration_range(
            "polling.interval_seconds",
            Duration::from_secs(self.polling.interval_seconds),
            Duration::from_secs(1),
            Duration::from_secs(3600),
        )?;
        validation::validate_path("load.output_path", &self.load.output_path)?;
        validation::validate_non_empty_string("load.bucket_name", &self.load.bucket_name)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[creator]
owner = "ops_admin"

[connections.creator]
client_id = "1000.ABC"
client_secret = "secret"
refresh_token = "1000.refresh"

[inventory]
organization_id = "20071234"

[connections.inventory]
token_file = "/var/run/zoho/inventory_token.json"
refresh_margin_seconds = 300

[polling]
interval_seconds = 5
"#;

    #[test]
    fn test_parse_sample_with_defaults() {
        let config = TomlConfig::from_toml_str(SAMPLE).unwrap();

        let creator = config.creator.as_ref().unwrap();
        assert_eq!(creator.owner, "ops_admin");
        assert_eq!(creator.bulk_endpoint, "https://creator.zoho.eu/api/bulk/v2");
        assert_eq!(creator.max_records, 200_000);

        let inventory = config.inventory.as_ref().unwrap();
        assert_eq!(inventory.api_endpoint, "https://inventory.zoho.eu/api/v1/");

        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry_policy().delay, Duration::from_secs(300));
        assert_eq!(config.poll_settings().interval, Duration::from_secs(5));
        assert_eq!(config.poll_settings().max_polls, Some(120));
        assert_eq!(config.page_delay(), Duration::from_millis(3500));
        assert_eq!(config.load.output_path, "./output");
        assert!(!config.monitoring_enabled());

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_max_polls_means_unbounded() {
        let content = format!("{}max_polls = 0\n", SAMPLE);
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.poll_settings().max_polls, None);

        let content = format!("{}max_polls = 10\n", SAMPLE);
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.poll_settings().max_polls, Some(10));
    }

    #[test]
    fn test_monitoring_section() {
        let config = TomlConfig::from_toml_str(SAMPLE).unwrap();
        assert!(!config.json_logs());

        let content = format!("{}\n[monitoring]\nenabled = true\njson_logs = true\n", SAMPLE);
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert!(config.monitoring_enabled());
        assert!(config.json_logs());
    }

    #[test]
    fn test_env_substitution() {
        std::env::set_var("ZOHO_ETL_TEST_SECRET", "from-env");
        let content = "[connections.creator]\nclient_secret = \"${ZOHO_ETL_TEST_SECRET}\"\nrefresh_token = \"${ZOHO_ETL_TEST_UNSET_VAR}\"\n";

        let config = TomlConfig::from_toml_str(content).unwrap();
        let creator = config.connections.creator.unwrap();

        assert_eq!(creator.client_secret.as_deref(), Some("from-env"));
        assert_eq!(creator.refresh_token.as_deref(), Some("${ZOHO_ETL_TEST_UNSET_VAR}"));
    }

    #[test]
    fn test_unresolved_placeholder_fails_validation() {
        let content = SAMPLE.replace("\"secret\"", "\"${ZOHO_ETL_TEST_NEVER_SET}\"");
        let config = TomlConfig::from_toml_str(&content).unwrap();

        let err = config.validate().unwrap_err();
        assert!(matches!(err, EtlError::MissingConfigError { .. }));
    }

    #[test]
    fn test_missing_connection_fails_validation() {
        let config = TomlConfig::from_toml_str("[creator]\nowner = \"me\"\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("connections.creator"));
    }

    #[test]
    fn test_empty_config_fails_validation() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_connection_debug_hides_secrets() {
        let config = TomlConfig::from_toml_str(SAMPLE).unwrap();
        let debug = format!("{:?}", config.connections.creator.unwrap());
        assert!(debug.contains("1000.ABC"));
        assert!(!debug.contains("1000.refresh"));
        assert!(!debug.contains("\"secret\""));
    }
}
