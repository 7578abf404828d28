pub mod aggregation;
pub mod headers;
pub mod parser;
pub mod reconciliation;
pub mod summary;
