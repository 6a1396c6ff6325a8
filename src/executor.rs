//! Storage executor: the thin I/O layer under table sessions.
//!
//! Everything above this module talks to storage through [`StorageExecutor`],
//! so sessions can be driven by the bundled [`SqliteExecutor`] or by any other
//! implementation (tests wrap it to record statements).

use rusqlite::{params_from_iter, Connection, OptionalExtension};

use crate::config::SqliteConfig;
use crate::error::{Error, Result};
use crate::query::SqlQuery;
use crate::value::Value;

/// One column as reported by `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub cid: i64,
    pub name: String,
    pub decl_type: String,
    pub not_null: bool,
    pub default_value: Option<String>,
    /// 1-based position inside the primary key, 0 when not part of it.
    pub pk: i64,
}

/// Rows returned by a SELECT, positional against `columns`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RecordSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl RecordSet {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Value of `column` (case-insensitive) in row `index`.
    pub fn value(&self, index: usize, column: &str) -> Option<&Value> {
        let position = self
            .columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))?;
        self.rows.get(index)?.get(position)
    }
}

/// Capability to run statements against one database.
pub trait StorageExecutor {
    /// Run a statement that returns no rows; yields the affected row count.
    fn execute(&self, query: &SqlQuery) -> Result<usize>;

    /// Run a statement that returns rows.
    fn select(&self, query: &SqlQuery) -> Result<RecordSet>;

    fn begin(&self) -> Result<()>;

    fn commit(&self) -> Result<()>;

    fn rollback(&self) -> Result<()>;

    /// Column metadata of `table`; empty when the table does not exist.
    fn table_info(&self, table: &str) -> Result<Vec<ColumnInfo>>;

    /// Whether rows of `table` can be addressed by rowid.
    fn has_rowid(&self, _table: &str) -> Result<bool> {
        Ok(false)
    }

    /// Rowid generated by the most recent successful INSERT, if known.
    fn last_insert_rowid(&self) -> Option<i64> {
        None
    }
}

/// [`StorageExecutor`] over a single rusqlite connection.
pub struct SqliteExecutor {
    connection: Connection,
    path: String,
}

impl SqliteExecutor {
    pub fn open(config: &SqliteConfig) -> Result<Self> {
        let connection_error = |source| Error::Connection {
            path: config.db_path.clone(),
            source,
        };

        let connection = Connection::open(&config.db_path).map_err(connection_error)?;
        connection
            .pragma_update(None, "foreign_keys", config.foreign_keys)
            .map_err(connection_error)?;
        if let Some(timeout) = config.busy_timeout {
            connection.busy_timeout(timeout).map_err(connection_error)?;
        }

        tracing::debug!(path = %config.db_path, "opened sqlite database");
        Ok(Self {
            connection,
            path: config.db_path.clone(),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open(&SqliteConfig::in_memory())
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    fn transaction_control(&self, statement: &str) -> Result<()> {
        tracing::debug!(sql = statement, "transaction control");
        self.connection
            .execute_batch(statement)
            .map_err(|source| Error::Transaction {
                message: format!("{statement} failed"),
                source: Some(source),
            })
    }
}

impl StorageExecutor for SqliteExecutor {
    fn execute(&self, query: &SqlQuery) -> Result<usize> {
        tracing::debug!(sql = %query.statement, params = ?query.params.values, "executing statement");
        self.connection
            .execute(&query.statement, params_from_iter(query.params.values.iter()))
            .map_err(|source| Error::Statement {
                statement: query.statement.clone(),
                source,
            })
    }

    fn select(&self, query: &SqlQuery) -> Result<RecordSet> {
        tracing::debug!(sql = %query.statement, params = ?query.params.values, "executing select");
        let query_error = |source| Error::Query {
            statement: query.statement.clone(),
            source,
        };

        let mut stmt = self
            .connection
            .prepare(&query.statement)
            .map_err(query_error)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt
            .query(params_from_iter(query.params.values.iter()))
            .map_err(query_error)?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().map_err(query_error)? {
            let record = (0..columns.len())
                .map(|i| row.get::<_, Value>(i))
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(query_error)?;
            records.push(record);
        }

        Ok(RecordSet {
            columns,
            rows: records,
        })
    }

    fn begin(&self) -> Result<()> {
        self.transaction_control("BEGIN")
    }

    fn commit(&self) -> Result<()> {
        self.transaction_control("COMMIT")
    }

    fn rollback(&self) -> Result<()> {
        self.transaction_control("ROLLBACK")
    }

    fn table_info(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let query = SqlQuery::new(
            "SELECT cid, name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?1)",
        )
        .with_params(Value::from(table));
        tracing::debug!(sql = %query.statement, table, "reading table metadata");
        let query_error = |source| Error::Query {
            statement: query.statement.clone(),
            source,
        };

        let mut stmt = self
            .connection
            .prepare(&query.statement)
            .map_err(query_error)?;
        let columns = stmt
            .query_map(params_from_iter(query.params.values.iter()), |row| {
                Ok(ColumnInfo {
                    cid: row.get(0)?,
                    name: row.get(1)?,
                    decl_type: row.get(2)?,
                    not_null: row.get(3)?,
                    default_value: row.get(4)?,
                    pk: row.get(5)?,
                })
            })
            .map_err(query_error)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(query_error)?;
        Ok(columns)
    }

    fn has_rowid(&self, table: &str) -> Result<bool> {
        let statement = "SELECT wr FROM pragma_table_list(?1) WHERE schema = 'main'";
        tracing::debug!(sql = statement, table, "checking rowid storage");
        let without_rowid: Option<bool> = self
            .connection
            .query_row(statement, [table], |row| row.get(0))
            .optional()
            .map_err(|source| Error::Query {
                statement: statement.to_string(),
                source,
            })?;
        Ok(without_rowid == Some(false))
    }

    fn last_insert_rowid(&self) -> Option<i64> {
        Some(self.connection.last_insert_rowid())
    }
}

/// Open transaction on an executor; rolls back when dropped uncommitted.
pub struct Transaction<'a, E: StorageExecutor + ?Sized> {
    executor: &'a E,
    active: bool,
}

impl<'a, E: StorageExecutor + ?Sized> Transaction<'a, E> {
    pub fn begin(executor: &'a E) -> Result<Self> {
        executor.begin()?;
        Ok(Self {
            executor,
            active: true,
        })
    }

    pub fn commit(mut self) -> Result<()> {
        self.executor.commit()?;
        self.active = false;
        Ok(())
    }
}

impl<E: StorageExecutor + ?Sized> Drop for Transaction<'_, E> {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        tracing::warn!("rolling back uncommitted transaction");
        if let Err(err) = self.executor.rollback() {
            tracing::warn!(error = %err, "rollback failed");
        }
    }
}
