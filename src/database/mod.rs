pub mod manager;
pub mod memory;
pub mod models;
pub mod pg_store;
pub mod query_builder;
pub mod repository;
pub mod store;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryStore;
pub use pg_store::PgStore;
pub use store::StoreError;
