pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{LocalStorage, SourceReader};
#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

pub use crate::core::{
    etl::{ReconEngine, RunOutcome},
    pipeline::ReconcilePipeline,
};
pub use utils::error::{ReconError, Result};
