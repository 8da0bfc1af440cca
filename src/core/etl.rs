use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// Runs one pipeline through extract, transform and load.
pub struct EtlEngine<'a, P: Pipeline + ?Sized> {
    pipeline: &'a P,
    monitor: SystemMonitor,
}

impl<'a, P: Pipeline + ?Sized> EtlEngine<'a, P> {
    pub fn new(pipeline: &'a P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: &'a P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("🚀 Starting extraction");
        self.monitor.log_stats("start");

        // Extract
        let table = self.pipeline.extract().await?;
        tracing::info!("📥 Extracted {} rows ({} columns)", table.len(), table.columns().len());
        self.monitor.log_stats("extract");

        // Transform
        let result = self.pipeline.transform(table).await?;
        tracing::info!(
            "🔄 Transformed {} rows, dropped {} duplicates",
            result.table.len(),
            result.duplicates_dropped
        );
        self.monitor.log_stats("transform");

        // Load
        let output_path = self.pipeline.load(result).await?;
        tracing::info!("💾 Output saved to: {}", output_path);
        self.monitor.log_stats("load");

        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Table, TransformResult};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingPipeline {
        loaded: Mutex<Option<String>>,
    }

    #[async_trait]
    impl Pipeline for RecordingPipeline {
        async fn extract(&self) -> Result<Table> {
            let mut table = Table::new(vec!["ID".to_string()]);
            table.push_row(vec!["1".to_string()])?;
            table.push_row(vec!["1".to_string()])?;
            Ok(table)
        }

        async fn transform(&self, mut data: Table) -> Result<TransformResult> {
            let duplicates_dropped = data.drop_duplicates();
            let csv_output = data.to_csv()?;
            Ok(TransformResult {
                table: data,
                csv_output,
                duplicates_dropped,
            })
        }

        async fn load(&self, result: TransformResult) -> Result<String> {
            *self.loaded.lock().unwrap() = Some(result.csv_output);
            Ok("memory://out.csv".to_string())
        }
    }

    #[tokio::test]
    async fn test_run_passes_data_through_phases() {
        let pipeline = RecordingPipeline {
            loaded: Mutex::new(None),
        };
        let engine = EtlEngine::new(&pipeline);

        let path = engine.run().await.unwrap();

        assert_eq!(path, "memory://out.csv");
        assert_eq!(pipeline.loaded.lock().unwrap().as_deref(), Some("ID\n1\n"));
    }
}
