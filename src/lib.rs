//! Staged-change table sessions over a single SQLite database file.
//!
//! # Intention
//!
//! - Load a table's rows into memory, edit, add and remove them locally.
//! - Write the accumulated changes back as one atomic transaction
//!   (DELETE, then UPDATE, then INSERT).
//!
//! # Architectural Boundaries
//!
//! - Storage access goes through [`StorageExecutor`]; nothing above it
//!   touches rusqlite directly.
//! - No schema definition or migration: tables must already exist.
//! - Updates and deletions need a single-column primary key.
//!
//! ```no_run
//! use sqlite_rows::{params, DatabaseManager, SqliteConfig};
//!
//! # fn main() -> sqlite_rows::Result<()> {
//! let db = DatabaseManager::open(&SqliteConfig::new("app.db"))?;
//! let mut users = db.table("users");
//! users.filter("age > ?", params![30]).order_by("name").retrieve()?;
//! users.set_first("email", "new@example.com")?;
//! let index = users.add_row();
//! users.set(index, "name", "Ada")?;
//! users.save()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod manager;
pub mod query;
pub mod row;
pub mod save;
pub mod table;
pub mod value;

pub use config::SqliteConfig;
pub use error::{Error, Result};
pub use executor::{ColumnInfo, RecordSet, SqliteExecutor, StorageExecutor, Transaction};
pub use manager::DatabaseManager;
pub use query::{Params, QueryOperator, SqlQuery};
pub use row::Row;
pub use save::{SaveSummary, WriteOperation};
pub use table::TableSession;
pub use value::Value;
