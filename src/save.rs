//! Writing staged changes back to storage.
//!
//! A save is planned as a list of [`WriteOperation`]s and replayed inside one
//! transaction, in this order:
//! - DELETE every pending deletion (frees keys a new row may reuse)
//! - UPDATE every existing row with staged edits, keyed by its original PK
//! - INSERT every new row with only the columns it staged, then read it back
//!   by rowid so defaults and generated keys reach the local row
//!
//! Local state is only touched after COMMIT succeeds.

use crate::error::{Error, Result};
use crate::executor::{RecordSet, StorageExecutor, Transaction};
use crate::query::{quote_identifier, Params, QueryOperator, SqlQuery};
use crate::row::Row;
use crate::table::{PrimaryKey, TableSession};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteOperation {
    pub table: String,
    pub key_column: String,
    pub key: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOperation {
    pub table: String,
    /// Index of the row in the session.
    pub row: usize,
    pub key_column: String,
    /// Primary key value before any staged edit.
    pub key: Value,
    pub updates: Vec<(String, Value)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateOperation {
    pub table: String,
    /// Index of the row in the session.
    pub row: usize,
    pub data: Vec<(String, Value)>,
}

/// One statement of a save plan.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOperation {
    Delete(DeleteOperation),
    Update(UpdateOperation),
    Create(CreateOperation),
}

impl WriteOperation {
    pub fn to_query(&self) -> SqlQuery {
        match self {
            WriteOperation::Delete(op) => {
                let (predicate, params) = key_predicate(&op.key_column, &op.key);
                SqlQuery::new(format!(
                    "DELETE FROM {} WHERE {predicate}",
                    quote_identifier(&op.table)
                ))
                .with_params(params)
            }
            WriteOperation::Update(op) => {
                let assignments = op
                    .updates
                    .iter()
                    .map(|(column, _)| format!("{} = ?", quote_identifier(column)))
                    .collect::<Vec<_>>()
                    .join(", ");
                let (predicate, key_params) = key_predicate(&op.key_column, &op.key);
                let mut params = Params::from(
                    op.updates
                        .iter()
                        .map(|(_, value)| value.clone())
                        .collect::<Vec<_>>(),
                );
                params.extend(key_params);
                SqlQuery::new(format!(
                    "UPDATE {} SET {assignments} WHERE {predicate}",
                    quote_identifier(&op.table)
                ))
                .with_params(params)
            }
            WriteOperation::Create(op) if op.data.is_empty() => {
                SqlQuery::new(format!(
                    "INSERT INTO {} DEFAULT VALUES",
                    quote_identifier(&op.table)
                ))
            }
            WriteOperation::Create(op) => {
                let columns = op
                    .data
                    .iter()
                    .map(|(column, _)| quote_identifier(column))
                    .collect::<Vec<_>>()
                    .join(", ");
                let placeholders = vec!["?"; op.data.len()].join(", ");
                SqlQuery::new(format!(
                    "INSERT INTO {} ({columns}) VALUES ({placeholders})",
                    quote_identifier(&op.table)
                ))
                .with_params(
                    op.data
                        .iter()
                        .map(|(_, value)| value.clone())
                        .collect::<Vec<_>>(),
                )
            }
        }
    }
}

/// `pk = ?`, or `pk IS NULL` since `= NULL` never matches.
fn key_predicate(column: &str, key: &Value) -> (String, Params) {
    if key.is_null() {
        QueryOperator::IsNull.render(&quote_identifier(column))
    } else {
        QueryOperator::Equal(key.clone()).render(&quote_identifier(column))
    }
}

/// `SELECT *` of the row stored under `rowid`.
fn select_by_rowid(table: &str, rowid: i64) -> SqlQuery {
    SqlQuery::new(format!(
        "SELECT * FROM {} WHERE rowid = ?",
        quote_identifier(table)
    ))
    .with_params(Value::Integer(rowid))
}

/// Statement counts of a committed save.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SaveSummary {
    pub deleted: usize,
    pub updated: usize,
    pub inserted: usize,
}

impl SaveSummary {
    pub fn total(&self) -> usize {
        self.deleted + self.updated + self.inserted
    }
}

impl<'db, E: StorageExecutor + ?Sized> TableSession<'db, E> {
    /// True when a save would issue at least one statement.
    pub fn has_pending_changes(&self) -> bool {
        !self.pending_deletes.is_empty()
            || self.rows.iter().any(|row| row.is_new() || row.has_changes())
    }

    /// Compute the statements the next save would run, without running them.
    pub fn plan(&mut self) -> Result<Vec<WriteOperation>> {
        let primary_key = self.primary_key_for_save()?;
        self.build_plan(primary_key.as_ref())
    }

    /// Persist pending deletions, edits and new rows in one transaction.
    ///
    /// On failure the transaction is rolled back and local rows are left as
    /// they were, so the save can be retried after fixing the offending edit.
    #[tracing::instrument(level = "info", skip(self), fields(table = %self.table_name))]
    pub fn save(&mut self) -> Result<SaveSummary> {
        let primary_key = self.primary_key_for_save()?;
        let plan = self.build_plan(primary_key.as_ref())?;
        if plan.is_empty() {
            tracing::debug!("nothing to save");
            return Ok(SaveSummary::default());
        }

        let read_back = plan.iter().any(|op| matches!(op, WriteOperation::Create(_)))
            && self.has_rowid()?;
        let mut summary = SaveSummary::default();
        let mut stored_rows = Vec::new();

        let tx = Transaction::begin(self.executor)?;
        for op in &plan {
            let affected = self.executor.execute(&op.to_query())?;
            match op {
                WriteOperation::Delete(_) => summary.deleted += 1,
                WriteOperation::Update(update) => {
                    if affected == 0 {
                        tracing::warn!(row = update.row, key = %update.key, "update matched no rows");
                    }
                    summary.updated += 1;
                }
                WriteOperation::Create(create) => {
                    if let Some(rowid) = self.executor.last_insert_rowid().filter(|_| read_back) {
                        let RecordSet { columns, rows } =
                            self.executor.select(&select_by_rowid(&self.table_name, rowid))?;
                        if let Some(values) = rows.into_iter().next() {
                            stored_rows.push((create.row, Row::from_record(columns.as_slice(), values)));
                        }
                    }
                    summary.inserted += 1;
                }
            }
        }
        tx.commit()?;

        self.pending_deletes.clear();
        for (index, stored) in stored_rows {
            self.rows[index] = stored;
        }
        for row in &mut self.rows {
            if row.is_new() || row.has_changes() {
                row.apply_edits();
            }
        }

        tracing::info!(
            deleted = summary.deleted,
            updated = summary.updated,
            inserted = summary.inserted,
            "save committed"
        );
        Ok(summary)
    }

    /// The primary key is only required once a delete or update is pending.
    fn primary_key_for_save(&mut self) -> Result<Option<PrimaryKey>> {
        let needs_key = !self.pending_deletes.is_empty()
            || self.rows.iter().any(|row| !row.is_new() && row.has_changes());
        if needs_key {
            self.resolve_primary_key().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Primary key value the row was stored under.
    fn stored_key(&self, row: &Row, pk: &PrimaryKey) -> Result<Value> {
        row.original(&pk.column).cloned().map_err(|_| {
            Error::schema(
                &self.table_name,
                format!("row has no stored value for primary key `{}`", pk.column),
            )
        })
    }

    fn build_plan(&self, primary_key: Option<&PrimaryKey>) -> Result<Vec<WriteOperation>> {
        let mut plan = Vec::new();
        let table = &self.table_name;

        if let Some(pk) = primary_key {
            for row in &self.pending_deletes {
                plan.push(WriteOperation::Delete(DeleteOperation {
                    table: table.clone(),
                    key_column: pk.column.clone(),
                    key: self.stored_key(row, pk)?,
                }));
            }

            for (index, row) in self.rows.iter().enumerate() {
                if row.is_new() || !row.has_changes() {
                    continue;
                }
                plan.push(WriteOperation::Update(UpdateOperation {
                    table: table.clone(),
                    row: index,
                    key_column: pk.column.clone(),
                    key: self.stored_key(row, pk)?,
                    updates: row.edits().iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                }));
            }
        }

        for (index, row) in self.rows.iter().enumerate().filter(|(_, row)| row.is_new()) {
            plan.push(WriteOperation::Create(CreateOperation {
                table: table.clone(),
                row: index,
                data: row.edits().iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            }));
        }

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_renders_is_null_for_null_key() {
        let op = WriteOperation::Delete(DeleteOperation {
            table: "test_table".into(),
            key_column: "id".into(),
            key: Value::Null,
        });
        let query = op.to_query();
        assert_eq!(query.statement, r#"DELETE FROM "test_table" WHERE "id" IS NULL"#);
        assert!(query.params.is_empty());
    }

    #[test]
    fn update_binds_values_then_original_key() {
        let op = WriteOperation::Update(UpdateOperation {
            table: "test_table".into(),
            row: 0,
            key_column: "id".into(),
            key: Value::Integer(1),
            updates: vec![
                ("id".into(), Value::Integer(10)),
                ("name".into(), Value::from("UpdatedAlpha")),
            ],
        });
        let query = op.to_query();
        assert_eq!(
            query.statement,
            r#"UPDATE "test_table" SET "id" = ?, "name" = ? WHERE "id" = ?"#
        );
        assert_eq!(
            query.params.values,
            vec![Value::Integer(10), Value::from("UpdatedAlpha"), Value::Integer(1)]
        );
    }

    #[test]
    fn insert_lists_only_staged_columns() {
        let op = WriteOperation::Create(CreateOperation {
            table: "test_table".into(),
            row: 2,
            data: vec![("name".into(), Value::from("NewUser")), ("value".into(), Value::Integer(500))],
        });
        let query = op.to_query();
        assert_eq!(
            query.statement,
            r#"INSERT INTO "test_table" ("name", "value") VALUES (?, ?)"#
        );
        assert_eq!(query.params.len(), 2);
    }

    #[test]
    fn insert_without_data_uses_defaults() {
        let op = WriteOperation::Create(CreateOperation {
            table: "t".into(),
            row: 0,
            data: Vec::new(),
        });
        assert_eq!(op.to_query().statement, r#"INSERT INTO "t" DEFAULT VALUES"#);
    }
}
