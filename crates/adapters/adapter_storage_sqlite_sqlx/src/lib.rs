//! # miotac-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement `ConfigEntryRepository` from `miotac-app::ports::storage`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (sqlx embedded migrations)
//! - Map between config entries and database rows
//!
//! ## Dependency rule
//! Depends on `miotac-app` (for port traits) and `miotac-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod config_entry_repo;
mod error;
mod pool;

pub use config_entry_repo::SqliteConfigEntryRepository;
pub use error::StorageError;
pub use pool::{Config, Database};
