pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::Cli;
pub use config::{LocalStorage, TomlConfig};

pub use adapters::creator::CreatorClient;
pub use adapters::inventory::InventoryClient;
pub use app::{CreatorExtractOperator, InventoryExtractOperator, Operator, TaskContext};
pub use core::{bulk_export::BulkExportWorkflow, etl::EtlEngine};
pub use domain::model::Table;
pub use utils::error::{EtlError, Result};
