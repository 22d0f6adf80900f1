use log::debug;

use super::SqlString;
use crate::database::value::Value;
use crate::database::{Database, DatabaseError};

/// Insert a new row into an existing table.
///
/// Holds the column list until [`InsertStatement::values`] supplies the matching values.
#[derive(Clone)]
pub struct InsertStatement<'db> {
    db: &'db Database,
    pub table: String,
    pub columns: Vec<String>,
}

impl SqlString for InsertStatement<'_> {
    fn to_sql(&self) -> String {
        if self.columns.is_empty() {
            return format!("INSERT INTO {} DEFAULT VALUES", self.table);
        }
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            self.columns.join(", "),
            vec!["?"; self.columns.len()].join(", ")
        )
    }
}

impl<'db> InsertStatement<'db> {
    /// Construct a new [`InsertStatement`]
    pub(crate) fn new(db: &'db Database, table: &str) -> Self {
        Self {
            db,
            table: table.to_string(),
            columns: Vec::new(),
        }
    }

    /// Specify which column to add to the insertion list.
    pub fn column(&mut self, column: &str) -> &mut Self {
        self.columns.push(column.to_string());
        self
    }

    /// Pair `values` with the columns by position and run the insert.
    ///
    /// Returns the id of the new row.
    ///
    /// # Errors
    /// Will return `Err` without touching the engine if the number of values differs from the
    /// number of columns, or the engine's error if it rejects the row.
    pub fn values(&self, values: Vec<Value>) -> Result<i64, DatabaseError> {
        if values.len() != self.columns.len() {
            return Err(DatabaseError::InvalidArgument(format!(
                "{} columns given {} values",
                self.columns.len(),
                values.len()
            )));
        }

        let sql = self.to_sql();
        debug!("insert: {sql}");
        self.db.engine()?.insert(&sql, &values)
    }
}
