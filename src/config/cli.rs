use crate::adapters::inventory::InventoryResource;
use crate::app::ExtractMode;
use crate::config::TomlConfig;
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "zoho-etl")]
#[command(about = "Extract Zoho Creator reports and Zoho Inventory collections to CSV")]
pub struct Cli {
    /// TOML 設定檔路徑
    #[arg(long, short, env = "ZOHO_ETL_CONFIG", default_value = "zoho-etl.toml", global = true)]
    pub config: String,

    /// Override `load.output_path`
    #[arg(long, global = true)]
    pub output_path: Option<String>,

    #[arg(long, short, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[arg(long, global = true, help = "Log process CPU/memory per phase")]
    pub monitor: bool,

    #[arg(long, global = true, help = "Validate config and show what would run")]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// `--json-logs` 或設定檔 `[monitoring] json_logs = true` 任一開啟即輸出 JSON
    pub fn use_json_logs(&self, config: Option<&TomlConfig>) -> bool {
        self.json_logs || config.is_some_and(TomlConfig::json_logs)
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Export one Creator report to `{bucket}/{dataset}/{table}.csv`
    CreatorExport {
        #[arg(long)]
        app: String,
        #[arg(long)]
        view: String,
        #[arg(long)]
        table: String,
        #[arg(long, default_value = "creator")]
        dataset: String,
        #[arg(long, value_enum, default_value_t = ExtractMode::Bulk)]
        mode: ExtractMode,
    },
    /// List Creator applications
    CreatorApps,
    /// List the reports of a Creator application
    CreatorReports {
        #[arg(long)]
        app: String,
    },
    /// List the forms of a Creator application
    CreatorForms {
        #[arg(long)]
        app: String,
    },
    /// Export every record of an Inventory collection
    InventoryExport {
        #[arg(long, value_parser = parse_resource)]
        resource: InventoryResource,
        #[arg(long, default_value = "inventory")]
        dataset: String,
        #[arg(long)]
        table: Option<String>,
    },
    /// Validate the configuration file and exit
    Validate,
}

fn parse_resource(raw: &str) -> Result<InventoryResource, String> {
    raw.parse().map_err(|e: crate::utils::error::EtlError| e.to_string())
}
