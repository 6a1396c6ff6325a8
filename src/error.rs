use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by rows, table sessions and the storage executor.
#[derive(Debug, Error)]
pub enum Error {
    /// A column was read that is neither retrieved nor staged.
    #[error("column not found: {column}")]
    ColumnNotFound { column: String },

    /// A row index outside the session's rows.
    #[error("row index {index} out of range (rows: {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// A SELECT (or metadata query) failed.
    #[error("query failed: {statement}")]
    Query {
        statement: String,
        #[source]
        source: rusqlite::Error,
    },

    /// The table has no usable single-column primary key.
    #[error("schema error on table `{table}`: {message}")]
    Schema { table: String, message: String },

    /// An INSERT, UPDATE or DELETE failed.
    #[error("statement failed: {statement}")]
    Statement {
        statement: String,
        #[source]
        source: rusqlite::Error,
    },

    /// BEGIN, COMMIT or ROLLBACK failed.
    #[error("transaction error: {message}")]
    Transaction {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    /// The database file could not be opened or configured.
    #[error("failed to open database at {path}")]
    Connection {
        path: String,
        #[source]
        source: rusqlite::Error,
    },
}

impl Error {
    pub(crate) fn column_not_found(column: &str) -> Self {
        Error::ColumnNotFound {
            column: column.to_string(),
        }
    }

    pub(crate) fn schema(table: &str, message: impl Into<String>) -> Self {
        Error::Schema {
            table: table.to_string(),
            message: message.into(),
        }
    }

    /// True for errors raised while writing staged changes.
    pub fn is_statement_error(&self) -> bool {
        matches!(self, Error::Statement { .. })
    }
}
