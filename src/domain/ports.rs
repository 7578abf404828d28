use crate::domain::model::{InventoryExtracts, ReconcileSettings, ReconciliationReport};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn erp_source(&self) -> &str;
    fn wms_source(&self) -> &str;
    fn adjustments_source(&self) -> Option<&str>;
    fn output_path(&self) -> &str;
    fn report_name(&self) -> &str;
    fn output_formats(&self) -> &[String];
    fn settings(&self) -> ReconcileSettings;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<InventoryExtracts>;
    async fn transform(&self, data: InventoryExtracts) -> Result<ReconciliationReport>;
    async fn load(&self, report: ReconciliationReport) -> Result<String>;
}
