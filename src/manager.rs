use crate::config::SqliteConfig;
use crate::error::Result;
use crate::executor::{RecordSet, SqliteExecutor, StorageExecutor};
use crate::query::{Params, SqlQuery};
use crate::table::TableSession;

/// Entry point: owns the storage executor and hands out table sessions.
pub struct DatabaseManager<E: StorageExecutor = SqliteExecutor> {
    executor: E,
}

impl DatabaseManager<SqliteExecutor> {
    /// Open (or create) the database described by `config`
    pub fn open(config: &SqliteConfig) -> Result<Self> {
        tracing::info!(path = %config.db_path, "opening database");
        Ok(Self::with_executor(SqliteExecutor::open(config)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open(&SqliteConfig::in_memory())
    }
}

impl<E: StorageExecutor> DatabaseManager<E> {
    pub fn with_executor(executor: E) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// A session on `table_name`; nothing is loaded until `retrieve`.
    pub fn table(&self, table_name: &str) -> TableSession<'_, E> {
        TableSession::new(&self.executor, table_name)
    }

    /// A session on `table_name` with every row already retrieved.
    pub fn retrieve_table(&self, table_name: &str) -> Result<TableSession<'_, E>> {
        let mut table = self.table(table_name);
        table.retrieve()?;
        Ok(table)
    }

    /// Run a single write statement outside any table session.
    pub fn execute(&self, sql: &str, params: impl Into<Params>) -> Result<usize> {
        self.executor
            .execute(&SqlQuery::new(sql).with_params(params))
    }

    /// Run a SELECT outside any table session.
    pub fn select(&self, sql: &str, params: impl Into<Params>) -> Result<RecordSet> {
        self.executor.select(&SqlQuery::new(sql).with_params(params))
    }
}
