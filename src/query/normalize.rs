//! Row-to-column normalization of raw query results.
//!
//! The database answers with a sequence of schema-less records. The
//! normalizer turns them into a [`Table`] with one column per distinct field:
//!
//! - columns appear in the order their field was first seen, walking records
//!   in order and each record's fields in the order the server sent them;
//! - a column holds one value per record that carried the field, so records
//!   with different fields produce columns of different lengths;
//! - values are kept as-is, nested objects included.

use std::collections::HashMap;

use super::{Column, Table};
use crate::db::{RawResult, Value, STATUS_OK};
use crate::error::{BridgeError, Result};

/// A record: field name/value pairs in server order.
type Record = Vec<(String, Value)>;

/// Shapes a raw result into a table.
///
/// Fails with a plugin error when the payload does not have the expected
/// envelope shape or reports a failed statement. An empty result set is a
/// table with no columns.
pub fn normalize(raw: RawResult) -> Result<Table> {
    let records = first_statement_records(raw.into_payload())?;

    let mut builder = ColumnBuilder::default();
    for record in records {
        for (field, value) in record {
            builder.push(field, value);
        }
    }

    Ok(builder.finish())
}

/// Accumulates values per field, remembering first-seen order.
#[derive(Default)]
struct ColumnBuilder {
    index: HashMap<String, usize>,
    columns: Vec<Column>,
}

impl ColumnBuilder {
    fn push(&mut self, field: String, value: Value) {
        match self.index.get(&field) {
            Some(&i) => self.columns[i].values.push(value),
            None => {
                self.index.insert(field.clone(), self.columns.len());
                self.columns.push(Column::new(field, vec![value]));
            }
        }
    }

    fn finish(self) -> Table {
        Table::with_columns(self.columns)
    }
}

/// Unwraps the statement envelope and returns the first statement's records.
fn first_statement_records(payload: Value) -> Result<Vec<Record>> {
    let statements = match payload {
        Value::Array(statements) => statements,
        other => {
            return Err(BridgeError::plugin(format!(
                "expected an array of statement results, got {}",
                other.type_name()
            )))
        }
    };

    let Some(statement) = statements.into_iter().next() else {
        return Ok(Vec::new());
    };

    let fields = match statement {
        Value::Object(fields) => fields,
        other => {
            return Err(BridgeError::plugin(format!(
                "expected a statement result object, got {}",
                other.type_name()
            )))
        }
    };

    let mut status = None;
    let mut result = None;
    let mut detail = None;
    for (key, value) in fields {
        match key.as_str() {
            "status" => status = Some(value),
            "result" => result = Some(value),
            "detail" => detail = Some(value),
            _ => {}
        }
    }

    match status {
        Some(Value::String(s)) if s == STATUS_OK => {}
        Some(Value::String(s)) => {
            let reason = detail
                .as_ref()
                .or(result.as_ref())
                .map(Value::to_display_string)
                .unwrap_or_default();
            return Err(BridgeError::plugin(format!(
                "statement returned status {s}: {reason}"
            )));
        }
        _ => return Err(BridgeError::plugin("statement result has no status")),
    }

    let rows = match result {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(rows)) => rows,
        Some(other) => {
            return Err(BridgeError::plugin(format!(
                "expected an array of records, got {}",
                other.type_name()
            )))
        }
    };

    rows.into_iter()
        .enumerate()
        .map(|(i, row)| match row {
            Value::Object(fields) => Ok(fields),
            other => Err(BridgeError::plugin(format!(
                "expected record {i} to be an object, got {}",
                other.type_name()
            ))),
        })
        .collect()
}
