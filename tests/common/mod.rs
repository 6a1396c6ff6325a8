#![allow(dead_code)]

use std::cell::RefCell;

use sqlite_rows::{
    ColumnInfo, DatabaseManager, RecordSet, Result, SqlQuery, SqliteExecutor, StorageExecutor,
};

pub const SCHEMA: &str = r#"
    CREATE TABLE users (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT UNIQUE NOT NULL,
        age INTEGER
    );
    CREATE INDEX idx_users_email ON users(email);

    CREATE TABLE logs (
        message TEXT,
        level INTEGER
    );

    CREATE TABLE memberships (
        user_id INTEGER,
        group_id INTEGER,
        role TEXT,
        PRIMARY KEY (user_id, group_id)
    );

    CREATE TABLE tags (
        code TEXT PRIMARY KEY,
        label TEXT
    );

    CREATE TABLE docs (
        code TEXT PRIMARY KEY DEFAULT (lower(hex(randomblob(4)))),
        body TEXT
    );

    CREATE TABLE items (
        id INTEGER PRIMARY KEY,
        "order" INTEGER,
        "unit price" REAL
    );

    CREATE TABLE settings (
        key TEXT PRIMARY KEY,
        value TEXT
    ) WITHOUT ROWID;

    INSERT INTO users (id, name, email, age) VALUES
        (1, 'Alpha', 'alpha@example.com', 30),
        (2, 'Beta', 'beta@example.com', 40),
        (3, 'Gamma', 'gamma@example.com', NULL);

    INSERT INTO logs (message, level) VALUES ('boot', 1), ('ready', 2);

    INSERT INTO memberships (user_id, group_id, role) VALUES (1, 1, 'owner');

    INSERT INTO items (id, "order", "unit price") VALUES (1, 1, 2.5);
"#;

/// Seed `connection` with the test schema.
pub fn initialize_schema(executor: &SqliteExecutor) {
    executor
        .connection()
        .execute_batch(SCHEMA)
        .expect("schema should apply");
}

/// In-memory database with the test schema.
pub fn create_test_db() -> DatabaseManager {
    let db = DatabaseManager::open_in_memory().expect("in-memory database");
    initialize_schema(db.executor());
    db
}

/// In-memory database that records every statement it runs.
pub fn create_recording_db() -> DatabaseManager<RecordingExecutor> {
    DatabaseManager::with_executor(RecordingExecutor::new())
}

/// Wraps [`SqliteExecutor`] and keeps a log of executed statements.
pub struct RecordingExecutor {
    inner: SqliteExecutor,
    log: RefCell<Vec<SqlQuery>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        let inner = SqliteExecutor::open_in_memory().expect("in-memory database");
        initialize_schema(&inner);
        Self {
            inner,
            log: RefCell::new(Vec::new()),
        }
    }

    /// Statements recorded so far, in order.
    pub fn statements(&self) -> Vec<String> {
        self.log.borrow().iter().map(|q| q.statement.clone()).collect()
    }

    pub fn queries(&self) -> Vec<SqlQuery> {
        self.log.borrow().clone()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }

    fn record(&self, statement: impl Into<String>) {
        self.log.borrow_mut().push(SqlQuery::new(statement));
    }
}

impl StorageExecutor for RecordingExecutor {
    fn execute(&self, query: &SqlQuery) -> Result<usize> {
        self.log.borrow_mut().push(query.clone());
        self.inner.execute(query)
    }

    fn select(&self, query: &SqlQuery) -> Result<RecordSet> {
        self.log.borrow_mut().push(query.clone());
        self.inner.select(query)
    }

    fn begin(&self) -> Result<()> {
        self.record("BEGIN");
        self.inner.begin()
    }

    fn commit(&self) -> Result<()> {
        self.record("COMMIT");
        self.inner.commit()
    }

    fn rollback(&self) -> Result<()> {
        self.record("ROLLBACK");
        self.inner.rollback()
    }

    fn table_info(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        self.inner.table_info(table)
    }

    fn has_rowid(&self, table: &str) -> Result<bool> {
        self.inner.has_rowid(table)
    }

    fn last_insert_rowid(&self) -> Option<i64> {
        self.inner.last_insert_rowid()
    }
}

/// Number of rows in `table` according to storage.
pub fn count_rows<E: StorageExecutor>(db: &DatabaseManager<E>, table: &str) -> i64 {
    let records = db
        .select(&format!("SELECT COUNT(*) AS n FROM {table}"), ())
        .expect("count query");
    records
        .value(0, "n")
        .and_then(|v| v.as_i64())
        .expect("count value")
}
