//! In-memory state of a single record.
//!
//! A [`Row`] keeps the values last read from (or written to) storage apart
//! from the edits staged since. Column names are lowercased once, when they
//! enter the row, so every lookup afterwards is a plain map access.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::value::Value;

/// Lowercase a column name for use as a map key.
pub(crate) fn normalize(column: &str) -> String {
    column.to_lowercase()
}

/// One record: original values plus an overlay of staged edits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: BTreeMap<String, Value>,
    edits: BTreeMap<String, Value>,
    is_new: bool,
}

impl Row {
    /// A row with no persisted counterpart yet.
    pub fn new() -> Self {
        Self {
            is_new: true,
            ..Self::default()
        }
    }

    /// Wrap a record read from storage. Columns without a value read as NULL.
    pub fn from_record<S: AsRef<str>>(columns: &[S], values: Vec<Value>) -> Self {
        let values = values.into_iter().chain(std::iter::repeat(Value::Null));
        let columns = columns
            .iter()
            .map(|c| normalize(c.as_ref()))
            .zip(values)
            .collect();
        Self {
            columns,
            edits: BTreeMap::new(),
            is_new: false,
        }
    }

    /// Effective value of `column`: the staged edit if any, else the original.
    pub fn get(&self, column: &str) -> Result<&Value> {
        let key = normalize(column);
        self.edits
            .get(&key)
            .or_else(|| self.columns.get(&key))
            .ok_or_else(|| Error::column_not_found(column))
    }

    /// Value of `column` as last read from storage, ignoring staged edits.
    pub fn original(&self, column: &str) -> Result<&Value> {
        self.columns
            .get(&normalize(column))
            .ok_or_else(|| Error::column_not_found(column))
    }

    /// Stage a value. Always recorded, even when equal to the original.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) {
        self.edits.insert(normalize(column), value.into());
    }

    pub fn has_changes(&self) -> bool {
        !self.edits.is_empty()
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn columns(&self) -> &BTreeMap<String, Value> {
        &self.columns
    }

    pub fn edits(&self) -> &BTreeMap<String, Value> {
        &self.edits
    }

    /// Original values overridden by staged edits.
    pub fn effective_row(&self) -> BTreeMap<String, Value> {
        let mut row = self.columns.clone();
        row.extend(self.edits.iter().map(|(k, v)| (k.clone(), v.clone())));
        row
    }

    /// JSON object of the original values; staged edits are not included.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.columns
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                .collect(),
        )
    }

    /// Fold staged edits into the original values once they are persisted.
    pub(crate) fn apply_edits(&mut self) {
        let edits = std::mem::take(&mut self.edits);
        self.columns.extend(edits);
        self.is_new = false;
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.columns.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        f.write_str("}")
    }
}
