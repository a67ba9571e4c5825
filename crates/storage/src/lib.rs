pub mod capability;
pub mod database;
pub mod dto;
pub mod error;
pub mod memory;
pub mod models;
pub mod query;
pub mod repository;
pub mod services;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use capability::{OptionalColumn, SchemaProbe};
pub use database::Database;
pub use error::{Result, StorageError};
pub use memory::MemoryStore;
pub use store::StatsStore;
