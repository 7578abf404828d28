// Adapters layer: concrete implementations for external systems (filesystem, http).

pub mod source;
pub mod storage;

pub use source::SourceReader;
pub use storage::LocalStorage;
