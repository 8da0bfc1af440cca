//! Builds API clients from a loaded [`TomlConfig`].

use crate::adapters::auth::TokenManager;
use crate::adapters::creator::CreatorClient;
use crate::adapters::http::ApiClient;
use crate::adapters::inventory::InventoryClient;
use crate::config::toml_config::{ConnectionConfig, TomlConfig};
use crate::utils::error::{EtlError, Result};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Creator tokens are refreshed only once expired.
pub const CREATOR_REFRESH_MARGIN_SECS: i64 = 0;

/// Inventory tokens are refreshed five minutes before they expire.
pub const INVENTORY_REFRESH_MARGIN_SECS: i64 = 300;

pub fn http_client() -> Result<Client> {
    Ok(Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("zoho-etl/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

fn connection<'a>(connection: Option<&'a ConnectionConfig>, name: &str) -> Result<&'a ConnectionConfig> {
    connection.ok_or_else(|| EtlError::MissingConfigError {
        field: format!("connections.{}", name),
    })
}

fn api_client(
    http: &Client,
    config: &TomlConfig,
    name: &str,
    connection: &ConnectionConfig,
    default_margin_secs: i64,
) -> Result<ApiClient> {
    let source = connection.token_source(http.clone())?;
    let margin_secs = connection
        .refresh_margin_seconds
        .unwrap_or(default_margin_secs);
    let margin = chrono::TimeDelta::try_seconds(margin_secs)
        .filter(|margin| *margin >= chrono::TimeDelta::zero())
        .ok_or_else(|| EtlError::InvalidConfigValueError {
            field: format!("connections.{}.refresh_margin_seconds", name),
            value: margin_secs.to_string(),
            reason: "must be a non-negative number of seconds".to_string(),
        })?;
    let tokens = Arc::new(TokenManager::new(name, source, margin));
    Ok(ApiClient::new(http.clone(), tokens, config.retry_policy()))
}

pub fn creator_client(config: &TomlConfig, http: &Client) -> Result<CreatorClient> {
    let endpoints = config
        .creator
        .clone()
        .ok_or_else(|| EtlError::MissingConfigError {
            field: "creator".to_string(),
        })?;
    let conn = connection(config.connections.creator.as_ref(), "creator")?;
    let api = api_client(http, config, "creator", conn, CREATOR_REFRESH_MARGIN_SECS)?;
    Ok(CreatorClient::new(api, endpoints))
}

pub fn inventory_client(config: &TomlConfig, http: &Client) -> Result<InventoryClient> {
    let endpoints = config
        .inventory
        .clone()
        .ok_or_else(|| EtlError::MissingConfigError {
            field: "inventory".to_string(),
        })?;
    let conn = connection(config.connections.inventory.as_ref(), "inventory")?;
    let api = api_client(http, config, "inventory", conn, INVENTORY_REFRESH_MARGIN_SECS)?;
    Ok(InventoryClient::new(api, endpoints))
}
