//! Column-oriented tables produced from query results.

use serde::{Deserialize, Serialize};

use crate::db::Value;

/// Name given to every table built from a query result.
pub const TABLE_NAME: &str = "response";

/// A named column of values, one per record that carried the field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Field name.
    pub name: String,

    /// Values in record order.
    pub values: Vec<Value>,
}

impl Column {
    /// Creates a column with the given name and values.
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Number of values in the column.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the column holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The shaped form of one query result.
///
/// Columns may have different lengths when records carry different fields;
/// a missing field leaves a gap rather than a null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,

    /// Columns in first-seen field order.
    pub columns: Vec<Column>,
}

impl Table {
    /// Creates an empty table with the default name.
    pub fn new() -> Self {
        Self::with_columns(Vec::new())
    }

    /// Creates a table from columns.
    pub fn with_columns(columns: Vec<Column>) -> Self {
        Self {
            name: TABLE_NAME.to_string(),
            columns,
        }
    }

    /// Returns true if the table has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names in table order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Length of the longest column.
    pub fn row_count(&self) -> usize {
        self.columns.iter().map(Column::len).max().unwrap_or(0)
    }

    /// Returns true if the columns differ in length.
    pub fn is_ragged(&self) -> bool {
        let row_count = self.row_count();
        self.columns.iter().any(|c| c.len() != row_count)
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}
