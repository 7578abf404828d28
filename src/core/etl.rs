use crate::core::{InventoryExtracts, Pipeline, ReconciliationSummary};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub output_path: String,
    pub summary: ReconciliationSummary,
}

pub struct ReconEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> ReconEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<RunOutcome> {
        tracing::info!("🚀 Starting reconciliation");
        self.monitor.log_stats("Start");

        // Extract
        tracing::info!("📥 Reading extracts...");
        let extracts = self.pipeline.extract().await?;
        tracing::info!(
            "📥 Read {} ERP rows, {} WMS rows, {} adjustment rows",
            extracts.erp.rows.len(),
            extracts.wms.rows.len(),
            extracts.adjustments.as_ref().map(|a| a.rows.len()).unwrap_or(0)
        );
        self.monitor.log_stats("Extract");

        // Transform
        tracing::info!("🔄 Reconciling...");
        let report = self.pipeline.transform(extracts).await?;
        let summary = report.summary.clone();
        tracing::info!(
            "🔄 {} of {} SKUs matched ({:.1}%)",
            summary.matched,
            summary.total_skus,
            summary.match_rate
        );
        self.monitor.log_stats("Transform");

        // Load
        tracing::info!("📤 Writing report...");
        let output_path = self.pipeline.load(report).await?;
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();

        Ok(RunOutcome {
            output_path,
            summary,
        })
    }

    /// Runs extract only, for `--dry-run`.
    pub async fn preview(&self) -> Result<InventoryExtracts> {
        let extracts = self.pipeline.extract().await?;
        self.monitor.log_final_stats();
        Ok(extracts)
    }
}
