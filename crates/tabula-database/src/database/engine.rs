use std::collections::VecDeque;

use super::DatabaseError;
use super::value::Value;

/// The connection primitives the statement builders run on.
///
/// Every call is synchronous and runs to completion before returning. Engine failures are
/// handed back untouched, nothing at this layer retries.
pub trait Engine {
    /// Run a statement that returns no rows.
    ///
    /// # Errors
    /// Will return `Err` if the engine rejects the statement.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<usize, DatabaseError>;

    /// Run an INSERT statement and return the generated row id.
    ///
    /// # Errors
    /// Will return `Err` if the engine rejects the statement, such as on a constraint violation.
    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64, DatabaseError>;

    /// Run a statement that returns rows.
    ///
    /// # Errors
    /// Will return `Err` if the engine rejects the statement.
    fn query(&self, sql: &str, params: &[Value]) -> Result<RowSet, DatabaseError>;

    /// Names of every user table currently in the database.
    ///
    /// # Errors
    /// Will return `Err` if the schema cannot be read.
    fn table_names(&self) -> Result<Vec<String>, DatabaseError>;

    /// Ordered column names of `table`, empty when the table does not exist.
    ///
    /// # Errors
    /// Will return `Err` if the schema cannot be read.
    fn column_names(&self, table: &str) -> Result<Vec<String>, DatabaseError>;

    /// The schema version stored in the database, 0 for a brand new database.
    ///
    /// # Errors
    /// Will return `Err` if the version cannot be read.
    fn user_version(&self) -> Result<u32, DatabaseError>;

    /// # Errors
    /// Will return `Err` if the version cannot be written.
    fn set_user_version(&self, version: u32) -> Result<(), DatabaseError>;

    /// Toggle enforcement of foreign keys on this connection.
    ///
    /// # Errors
    /// Will return `Err` if the engine rejects the change.
    fn set_foreign_keys(&self, enabled: bool) -> Result<(), DatabaseError>;
}

/// Forward-only cursor over the rows of a query.
///
/// A fresh `RowSet` is positioned before the first row, call [`RowSet::advance`] to move onto
/// it. Rows already passed cannot be revisited.
#[derive(Debug, Default)]
pub struct RowSet {
    columns: Vec<String>,
    rows: VecDeque<Vec<Value>>,
    current: Option<Vec<Value>>,
}

impl RowSet {
    #[must_use]
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows: rows.into(),
            current: None,
        }
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn column_name(&self, ordinal: usize) -> Option<&str> {
        self.columns.get(ordinal).map(String::as_str)
    }

    /// Ordinal of the column called `name`, compared case-insensitively.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.eq_ignore_ascii_case(name))
    }

    /// Move onto the next row, returns false once the rows are exhausted.
    pub fn advance(&mut self) -> bool {
        self.current = self.rows.pop_front();
        self.current.is_some()
    }

    /// Raw cell of the current row.
    #[must_use]
    pub fn get(&self, ordinal: usize) -> Option<&Value> {
        self.current.as_ref().and_then(|row| row.get(ordinal))
    }

    /// # Errors
    /// Will return `Err` if there is no such cell or it does not hold an integer.
    pub fn get_i64(&self, ordinal: usize) -> Result<i64, DatabaseError> {
        match self.cell(ordinal)? {
            Value::Integer(i) => Ok(*i),
            other => Err(self.mismatch(ordinal, "integer", other)),
        }
    }

    /// # Errors
    /// Will return `Err` if there is no such cell or it does not hold a number.
    pub fn get_f64(&self, ordinal: usize) -> Result<f64, DatabaseError> {
        match self.cell(ordinal)? {
            Value::Real(r) => Ok(*r),
            #[allow(clippy::cast_precision_loss)]
            Value::Integer(i) => Ok(*i as f64),
            other => Err(self.mismatch(ordinal, "real", other)),
        }
    }

    /// # Errors
    /// Will return `Err` if there is no such cell or it holds a blob.
    pub fn get_string(&self, ordinal: usize) -> Result<Option<String>, DatabaseError> {
        match self.cell(ordinal)? {
            Value::Null => Ok(None),
            Value::Blob(_) => Err(self.mismatch(ordinal, "text", &Value::Blob(Vec::new()))),
            other => Ok(Some(other.to_string())),
        }
    }

    /// # Errors
    /// Will return `Err` if there is no such cell.
    pub fn get_blob(&self, ordinal: usize) -> Result<Option<Vec<u8>>, DatabaseError> {
        match self.cell(ordinal)? {
            Value::Null => Ok(None),
            Value::Blob(b) => Ok(Some(b.clone())),
            Value::Text(t) => Ok(Some(t.clone().into_bytes())),
            other => Err(self.mismatch(ordinal, "blob", other)),
        }
    }

    /// Release the cursor. Dropping the `RowSet` has the same effect.
    pub fn close(self) {}

    fn cell(&self, ordinal: usize) -> Result<&Value, DatabaseError> {
        self.get(ordinal).ok_or_else(|| {
            DatabaseError::InvalidArgument(format!("no cell at ordinal {ordinal} on current row"))
        })
    }

    fn mismatch(&self, ordinal: usize, expected: &'static str, found: &Value) -> DatabaseError {
        DatabaseError::TypeMismatch {
            column: self.column_name(ordinal).unwrap_or_default().to_string(),
            expected,
            found: found.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> RowSet {
        RowSet::new(
            vec!["Id".into(), "Name".into()],
            vec![
                vec![Value::Integer(1), Value::Text("Baloteli".into())],
                vec![Value::Integer(2), Value::Null],
            ],
        )
    }

    #[test]
    fn test_forward_only() {
        let mut rows = rows();
        assert!(rows.get(0).is_none());

        assert!(rows.advance());
        assert_eq!(rows.get_i64(0).unwrap(), 1);
        assert_eq!(rows.get_string(1).unwrap().as_deref(), Some("Baloteli"));

        assert!(rows.advance());
        assert_eq!(rows.get_string(1).unwrap(), None);

        assert!(!rows.advance());
        assert!(!rows.advance());
        rows.close();
    }

    #[test]
    fn test_column_lookup() {
        let rows = rows();
        assert_eq!(rows.column_count(), 2);
        assert_eq!(rows.column_index("name"), Some(1));
        assert_eq!(rows.column_index("missing"), None);
        assert_eq!(rows.column_name(5), None);
    }

    #[test]
    fn test_typed_getter_mismatch() {
        let mut rows = rows();
        rows.advance();
        assert!(matches!(
            rows.get_i64(1),
            Err(DatabaseError::TypeMismatch { expected: "integer", found: "text", .. })
        ));
        assert!(matches!(rows.get_i64(7), Err(DatabaseError::InvalidArgument(_))));
    }
}
