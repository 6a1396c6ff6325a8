//! Per-table session: retrieved rows, filter state and pending deletions.
//!
//! Filters added with [`TableSession::filter`] and [`TableSession::filter_by`]
//! are AND-combined; they are kept after [`TableSession::retrieve`] so the
//! same selection can be refreshed. Use [`TableSession::clear_filter`] to
//! start over.

use std::slice;

use crate::error::{Error, Result};
use crate::executor::{SqliteExecutor, StorageExecutor};
use crate::query::{self, Filter, Params, QueryOperator};
use crate::row::{normalize, Row};
use crate::value::Value;

/// Primary key of the session's table, as resolved from metadata.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PrimaryKey {
    pub(crate) column: String,
}

/// Rows of one table held in memory, with staged changes.
pub struct TableSession<'db, E: StorageExecutor + ?Sized = SqliteExecutor> {
    pub(crate) executor: &'db E,
    pub(crate) table_name: String,
    pub(crate) primary_key: Option<PrimaryKey>,
    has_rowid: Option<bool>,
    filter: Filter,
    order_by: Option<String>,
    columns: Vec<String>,
    pub(crate) rows: Vec<Row>,
    pub(crate) pending_deletes: Vec<Row>,
}

impl<'db, E: StorageExecutor + ?Sized> TableSession<'db, E> {
    pub fn new(executor: &'db E, table_name: impl Into<String>) -> Self {
        Self {
            executor,
            table_name: table_name.into(),
            primary_key: None,
            has_rowid: None,
            filter: Filter::new(),
            order_by: None,
            columns: Vec::new(),
            rows: Vec::new(),
            pending_deletes: Vec::new(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Add a WHERE fragment with its bound parameters.
    pub fn filter(&mut self, clause: impl Into<String>, params: impl Into<Params>) -> &mut Self {
        self.filter.and(clause, params);
        self
    }

    /// Add a typed condition on `column`.
    pub fn filter_by(&mut self, column: &str, op: QueryOperator) -> &mut Self {
        self.filter.and_condition(column, &op);
        self
    }

    pub fn clear_filter(&mut self) -> &mut Self {
        self.filter.clear();
        self
    }

    /// Set or replace the ORDER BY clause.
    pub fn order_by(&mut self, clause: impl Into<String>) -> &mut Self {
        self.order_by = Some(clause.into());
        self
    }

    /// Load the selected records, replacing local rows and dropping
    /// pending deletions.
    #[tracing::instrument(level = "debug", skip(self), fields(table = %self.table_name))]
    pub fn retrieve(&mut self) -> Result<&mut Self> {
        let select = query::select_all(&self.table_name, &self.filter, self.order_by.as_deref());
        let records = self.executor.select(&select)?;

        self.columns = records.columns.iter().map(|c| normalize(c)).collect();
        self.rows = records
            .rows
            .into_iter()
            .map(|values| Row::from_record(records.columns.as_slice(), values))
            .collect();
        self.pending_deletes.clear();

        tracing::debug!(rows = self.rows.len(), "retrieved rows");
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Lowercased column names of the last retrieval, in storage order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn iter(&self) -> slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// Rows removed locally whose deletion waits for the next save.
    pub fn pending_deletes(&self) -> &[Row] {
        &self.pending_deletes
    }

    pub fn row(&self, index: usize) -> Result<&Row> {
        let len = self.rows.len();
        self.rows
            .get(index)
            .ok_or(Error::IndexOutOfRange { index, len })
    }

    pub fn row_mut(&mut self, index: usize) -> Result<&mut Row> {
        let len = self.rows.len();
        self.rows
            .get_mut(index)
            .ok_or(Error::IndexOutOfRange { index, len })
    }

    /// Append a new, unsaved row and return its index.
    pub fn add_row(&mut self) -> usize {
        self.rows.push(Row::new());
        self.rows.len() - 1
    }

    /// Remove a row locally. Persisted rows are deleted from storage on the
    /// next save; new rows are simply dropped.
    pub fn remove_row(&mut self, index: usize) -> Result<()> {
        self.row(index)?;
        let row = self.rows.remove(index);
        if !row.is_new() {
            self.pending_deletes.push(row);
        }
        Ok(())
    }

    pub fn remove_all(&mut self) {
        self.pending_deletes
            .extend(self.rows.drain(..).filter(|row| !row.is_new()));
    }

    pub fn get(&self, index: usize, column: &str) -> Result<&Value> {
        self.row(index)?.get(column)
    }

    pub fn set(&mut self, index: usize, column: &str, value: impl Into<Value>) -> Result<()> {
        self.row_mut(index)?.set(column, value);
        Ok(())
    }

    pub fn get_first(&self, column: &str) -> Result<&Value> {
        self.get(0, column)
    }

    pub fn set_first(&mut self, column: &str, value: impl Into<Value>) -> Result<()> {
        self.set(0, column, value)
    }

    /// Resolve (once) the single-column primary key of the table.
    pub(crate) fn resolve_primary_key(&mut self) -> Result<PrimaryKey> {
        if let Some(pk) = &self.primary_key {
            return Ok(pk.clone());
        }

        let info = self.executor.table_info(&self.table_name)?;
        if info.is_empty() {
            return Err(Error::schema(&self.table_name, "table not found"));
        }
        let mut keys = info.iter().filter(|c| c.pk > 0);
        let pk = match (keys.next(), keys.next()) {
            (Some(column), None) => PrimaryKey {
                column: normalize(&column.name),
            },
            (None, _) => return Err(Error::schema(&self.table_name, "no primary key")),
            (Some(_), Some(_)) => {
                return Err(Error::schema(
                    &self.table_name,
                    "composite primary keys are not supported",
                ))
            }
        };

        tracing::debug!(table = %self.table_name, primary_key = %pk.column, "resolved primary key");
        self.primary_key = Some(pk.clone());
        Ok(pk)
    }

    /// Whether the table stores a rowid (false for `WITHOUT ROWID` tables).
    pub(crate) fn has_rowid(&mut self) -> Result<bool> {
        if let Some(has_rowid) = self.has_rowid {
            return Ok(has_rowid);
        }
        let has_rowid = self.executor.has_rowid(&self.table_name)?;
        self.has_rowid = Some(has_rowid);
        Ok(has_rowid)
    }

    /// Column name of the primary key, resolving it if needed.
    pub fn primary_key(&mut self) -> Result<String> {
        Ok(self.resolve_primary_key()?.column)
    }
}

impl<'a, 'db, E: StorageExecutor + ?Sized> IntoIterator for &'a TableSession<'db, E> {
    type Item = &'a Row;
    type IntoIter = slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
