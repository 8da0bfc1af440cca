use anyhow::Result;
use httpmock::prelude::*;
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use tempfile::{NamedTempFile, TempDir};
use zoho_etl::app::{factory, CreatorTask, ExtractMode};
use zoho_etl::utils::validation::Validate;
use zoho_etl::{CreatorExtractOperator, LocalStorage, Operator, Table, TaskContext, TomlConfig};

fn write_config(server: &MockServer, output: &std::path::Path) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    write!(
        file,
        r#"
[creator]
api_endpoint = "{api}"
bulk_endpoint = "{bulk}"
download_host = "{host}"
owner = "ops_admin"

[connections.creator]
client_id = "1000.CLIENT"
client_secret = "${{ZOHO_ETL_IT_CLIENT_SECRET}}"
refresh_token = "1000.refresh"
token_url = "{token}"

[retry]
max_attempts = 2
delay_seconds = 0

[polling]
interval_seconds = 1
page_delay_ms = 0

[load]
output_path = "{output}"
bucket_name = "lake"
"#,
        api = server.url("/api/v2/"),
        bulk = server.url("/api/bulk/v2"),
        host = server.base_url(),
        token = server.url("/oauth/v2/token"),
        output = output.display().to_string().replace('\\', "/"),
    )?;
    Ok(file)
}

#[tokio::test]
async fn test_creator_operator_from_config_file() -> Result<()> {
    std::env::set_var("ZOHO_ETL_IT_CLIENT_SECRET", "from-env-secret");

    let server = MockServer::start_async().await;
    let output = TempDir::new()?;

    let token = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/oauth/v2/token")
                .query_param("client_secret", "from-env-secret");
            then.status(200)
                .json_body(json!({"access_token": "1000.live", "expires_in": 3600}));
        })
        .await;
    let first_page = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v2/ops_admin/order-desk/report/All_Orders")
                .header("Authorization", "Zoho-oauthtoken 1000.live")
                .query_param("from", "0");
            then.status(200).json_body(json!({"code": 3000, "data": [
                {"ID": "1", "Status": "Open"},
                {"ID": "2", "Status": "Closed"},
                {"ID": "2", "Status": "Closed"}
            ]}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v2/ops_admin/order-desk/report/All_Orders")
                .query_param("from", "200");
            then.status(200)
                .json_body(json!({"code": 3100, "message": "No Data Available"}));
        })
        .await;

    let config_file = write_config(&server, output.path())?;
    let config = TomlConfig::from_file(config_file.path())?;
    config.validate()?;

    let http = factory::http_client()?;
    let client = Arc::new(factory::creator_client(&config, &http)?);
    let operator = CreatorExtractOperator::new(
        "orders_task",
        CreatorTask {
            dataset: "sales".to_string(),
            app_name: "order-desk".to_string(),
            view_name: "All_Orders".to_string(),
            table_name: "orders".to_string(),
            bucket_name: config.load.bucket_name.clone(),
        },
        client,
        LocalStorage::new(config.load.output_path.clone()),
    )
    .with_mode(ExtractMode::Paginate)
    .with_polling(config.poll_settings())
    .with_page_delay(config.page_delay());

    let message = operator.execute(&TaskContext::manual()).await?;

    assert_eq!(
        message,
        "App_Name:: order-desk, View Name:: All_Orders, Table Name:: orders"
    );
    token.assert_async().await;
    first_page.assert_async().await;

    let written = std::fs::read(output.path().join("lake/sales/orders.csv"))?;
    let table = Table::from_csv_reader(written.as_slice())?;
    assert_eq!(table.len(), 2);
    assert_eq!(table.get(1, "Status"), Some("Closed"));
    Ok(())
}

#[test]
fn test_unset_secret_fails_validation() -> Result<()> {
    let server = MockServer::start();
    let output = TempDir::new()?;
    let config_file = write_config(&server, output.path())?;

    let content = std::fs::read_to_string(config_file.path())?
        .replace("ZOHO_ETL_IT_CLIENT_SECRET", "ZOHO_ETL_IT_NEVER_SET");
    let config = TomlConfig::from_toml_str(&content)?;

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("connections.creator.client_secret"));
    Ok(())
}
