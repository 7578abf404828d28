pub mod etl;
pub mod pipeline;
pub mod report;

pub use crate::domain::model::{
    InventoryExtracts, ParsedExtract, ReconciliationReport, ReconciliationSummary,
};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
