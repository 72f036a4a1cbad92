pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod repository;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryRepository;
pub use postgres::{PgRecord, PgRepository};
pub use repository::{FieldValue, Lookup, Record, RecordId, Repository, StoreError, StoreResult, UniqueKey};
