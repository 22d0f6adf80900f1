use log::debug;

use super::SqlString;
use crate::database::value::Value;
use crate::database::{Database, DatabaseError};

/// Delete rows from a table
#[derive(Clone)]
pub struct DeleteStatement<'db> {
    db: &'db Database,
    pub table: String,
    pub r#where: Option<String>,
    pub params: Vec<Value>,
}

impl SqlString for DeleteStatement<'_> {
    /// Convert the [`DeleteStatement`] into a runnable SQL string.
    fn to_sql(&self) -> String {
        let mut sql = format!("DELETE FROM {}", self.table);
        if let Some(clause) = &self.r#where {
            sql.push_str(&format!(" WHERE {clause}"));
        }
        // Note: A DELETE statement without a WHERE clause is valid (deletes all rows),
        // but potentially dangerous. We allow it here, but usage should be cautious.
        sql
    }
}

impl<'db> DeleteStatement<'db> {
    /// Construct a new [`DeleteStatement`]
    pub(crate) fn new(db: &'db Database, table: &str) -> Self {
        Self {
            db,
            table: table.to_string(),
            r#where: None,
            params: Vec::new(),
        }
    }

    /// Restrict the delete with a condition that takes no parameters.
    pub fn filter(&mut self, condition: &str) -> &mut Self {
        self.filter_with(condition, Vec::new())
    }

    /// Restrict the delete, replacing any previous condition and its parameters.
    pub fn filter_with(&mut self, condition: &str, args: Vec<Value>) -> &mut Self {
        let condition = condition.trim();
        if condition.is_empty() {
            self.r#where = None;
            self.params.clear();
        } else {
            self.r#where = Some(condition.to_string());
            self.params = args;
        }
        self
    }

    /// Run the delete, returning the number of rows removed.
    ///
    /// # Errors
    /// Will return `Err` if the engine rejects the statement.
    pub fn execute(&self) -> Result<usize, DatabaseError> {
        let sql = self.to_sql();
        debug!("delete: {sql}");
        self.db.engine()?.execute(&sql, &self.params)
    }
}
