use std::time::Duration;

/// Path used by SQLite for a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// SQLite connection configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SqliteConfig {
    /// Path to the SQLite database file
    pub db_path: String,
    /// Enforce foreign key constraints (`PRAGMA foreign_keys`)
    pub foreign_keys: bool,
    /// How long to wait on a locked database before failing
    pub busy_timeout: Option<Duration>,
}

impl SqliteConfig {
    /// Create a new SQLite config for the database file at `db_path`
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            foreign_keys: true,
            busy_timeout: None,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(IN_MEMORY)
    }

    pub fn with_foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = Some(timeout);
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.db_path == IN_MEMORY
    }
}
