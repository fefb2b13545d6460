#![forbid(unsafe_code)]

pub mod local_state;
pub mod repository;
pub mod sqlite;

pub use local_state::{LocalState, MigrationOutcome, migrate_legacy};
pub use repository::{
    InMemoryRepository, LocalStore, NewResultRecord, ResultRepository, Storage, StorageError,
    StoredResult,
};
pub use sqlite::{SqliteInitError, SqliteRepository};
