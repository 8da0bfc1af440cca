use clap::Parser;
use std::sync::Arc;
use zoho_etl::app::{factory, CreatorTask};
use zoho_etl::config::Command;
use zoho_etl::core::Storage;
use zoho_etl::utils::error::ErrorSeverity;
use zoho_etl::utils::{logger, validation::Validate};
use zoho_etl::{
    Cli, CreatorExtractOperator, EtlError, InventoryExtractOperator, LocalStorage, Operator, Table,
    TaskContext, TomlConfig,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // 先讀設定檔，日誌格式可由 [monitoring] json_logs 決定
    let config = TomlConfig::from_file(&cli.config);

    // 初始化日誌
    if cli.use_json_logs(config.as_ref().ok()) {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting zoho-etl");
    if cli.verbose {
        tracing::debug!("CLI args: {:?}", cli);
    }

    if let Err(e) = run(cli, config).await {
        // 記錄詳細錯誤信息
        tracing::error!(
            "❌ zoho-etl failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

async fn run(cli: Cli, config: Result<TomlConfig, EtlError>) -> Result<(), EtlError> {
    let mut config = config?;
    if let Some(output_path) = &cli.output_path {
        config.load.output_path = output_path.clone();
    }

    // 驗證配置
    config.validate()?;
    tracing::info!("✅ Configuration {} is valid", cli.config);

    let monitor = cli.monitor || config.monitoring_enabled();
    if monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    if matches!(cli.command, Command::Validate) {
        println!("✅ {} is valid", cli.config);
        return Ok(());
    }
    if cli.dry_run {
        tracing::info!("🧪 Dry run: would execute {:?}", cli.command);
        println!("🧪 Dry run, nothing executed: {:?}", cli.command);
        return Ok(());
    }

    let http = factory::http_client()?;
    let storage = LocalStorage::new(config.load.output_path.clone());
    let bucket = config.load.bucket_name.clone();

    match cli.command {
        Command::CreatorExport {
            app,
            view,
            table,
            dataset,
            mode,
        } => {
            let client = Arc::new(factory::creator_client(&config, &http)?);
            let task = CreatorTask {
                dataset,
                app_name: app,
                view_name: view,
                table_name: table,
                bucket_name: bucket,
            };
            let operator = CreatorExtractOperator::new("creator_export", task, client, storage)
                .with_mode(mode)
                .with_polling(config.poll_settings())
                .with_page_delay(config.page_delay())
                .with_monitoring(monitor);

            let message = operator.execute(&TaskContext::manual()).await?;
            println!("✅ {}", message);
            println!("📁 Output saved to: {}", storage_path(&config, &operator.output_path()));
        }
        Command::CreatorApps => {
            let client = factory::creator_client(&config, &http)?;
            let apps = client.get_apps().await?;
            write_listing(&storage, &bucket, "applications", &apps).await?;
        }
        Command::CreatorReports { app } => {
            let client = factory::creator_client(&config, &http)?;
            let reports = client.get_reports(&app).await?;
            write_listing(&storage, &bucket, &format!("{}_reports", app), &reports).await?;
        }
        Command::CreatorForms { app } => {
            let client = factory::creator_client(&config, &http)?;
            let forms = client.get_forms(&app).await?;
            write_listing(&storage, &bucket, &format!("{}_forms", app), &forms).await?;
        }
        Command::InventoryExport {
            resource,
            dataset,
            table,
        } => {
            let client = Arc::new(factory::inventory_client(&config, &http)?);
            let mut operator =
                InventoryExtractOperator::new("inventory_export", resource, client, storage, bucket)
                    .with_dataset(dataset)
                    .with_monitoring(monitor);
            if let Some(table) = table {
                operator = operator.with_table_name(table);
            }

            let message = operator.execute(&TaskContext::manual()).await?;
            println!("✅ {}", message);
            println!("📁 Output saved to: {}", storage_path(&config, &operator.output_path()));
        }
        Command::Validate => {}
    }

    Ok(())
}

fn storage_path(config: &TomlConfig, relative: &str) -> String {
    std::path::Path::new(&config.load.output_path)
        .join(relative)
        .display()
        .to_string()
}

async fn write_listing(storage: &LocalStorage, bucket: &str, name: &str, table: &Table) -> Result<(), EtlError> {
    let path = format!("{}/creator_meta/{}.csv", bucket, name);
    storage.write_file(&path, table.to_csv()?.as_bytes()).await?;
    tracing::info!("📋 {} rows written to {}", table.len(), path);
    println!("📁 Output saved to: {}", storage.full_path(&path).display());
    Ok(())
}
