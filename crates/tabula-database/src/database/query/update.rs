use log::debug;

use super::SqlString;
use crate::database::value::Value;
use crate::database::{Database, DatabaseError};

/// Update existing rows in the table
///
/// Without a filter every row of the table is updated.
#[derive(Clone)]
pub struct UpdateStatement<'db> {
    db: &'db Database,
    pub table: String,
    pub columns: Vec<(String, Value)>,
    pub r#where: Option<String>,
    pub params: Vec<Value>,
}

impl SqlString for UpdateStatement<'_> {
    /// Convert the [`UpdateStatement`] into a runnable SQL string.
    fn to_sql(&self) -> String {
        let mut sql = String::new();
        sql.push_str(&format!("UPDATE {} SET", self.table));

        for (idx, (col, _)) in self.columns.iter().enumerate() {
            sql.push(' ');
            sql.push_str(&format!("{col} = ?"));

            if idx < self.columns.len() - 1 {
                sql.push(',');
            }
        }

        if let Some(clause) = &self.r#where {
            sql.push_str(&format!(" WHERE {clause}"));
        }
        sql
    }
}

impl<'db> UpdateStatement<'db> {
    /// Construct a new [`UpdateStatement`]
    pub(crate) fn new(db: &'db Database, table: &str) -> Self {
        Self {
            db,
            table: table.to_string(),
            columns: Vec::new(),
            r#where: None,
            params: Vec::new(),
        }
    }

    /// Specify a column to update and its new value.
    pub fn column(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.columns.push((column.to_string(), value.into()));
        self
    }

    /// Restrict the update with a condition that takes no parameters.
    pub fn filter(&mut self, condition: &str) -> &mut Self {
        self.filter_with(condition, Vec::new())
    }

    /// Restrict the update, replacing any previous condition and its parameters.
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

    /// Column values followed by the filter parameters, in marker order.
    #[must_use]
    pub fn bound_params(&self) -> Vec<Value> {
        self.columns
            .iter()
            .map(|(_, value)| value.clone())
            .chain(self.params.iter().cloned())
            .collect()
    }

    /// Run the update, returning the number of rows changed.
    ///
    /// # Errors
    /// Will return `Err` if no columns were given or the engine rejects the statement.
    pub fn execute(&self) -> Result<usize, DatabaseError> {
        if self.columns.is_empty() {
            return Err(DatabaseError::InvalidArgument(
                "an update needs at least one column".to_string(),
            ));
        }

        let sql = self.to_sql();
        debug!("update: {sql}");
        self.db.engine()?.execute(&sql, &self.bound_params())
    }
}

#[cfg(test)]
mod tests {
    use crate::args;
    use crate::database::DatabaseError;
    use crate::database::query::SqlString;
    use crate::database::value::Value;
    use crate::testing::{open_shop, recording_shop, seed_customers};

    #[test]
    fn test_to_sql() {
        let (db, _) = recording_shop();
        let query = db
            .get("Customers")
            .unwrap()
            .unwrap()
            .update(&[("Name", "Pirlo".into())])
            .column("Address", "Milan")
            .filter_with("Id = ?", args![4])
            .to_owned();

        assert_eq!(
            query.to_sql(),
            String::from("UPDATE Customers SET Name = ?, Address = ? WHERE Id = ?")
        );
        assert_eq!(
            query.bound_params(),
            vec![Value::from("Pirlo"), Value::from("Milan"), Value::Integer(4)]
        );
    }

    #[test]
    fn test_no_columns_rejected() {
        let (db, log) = recording_shop();
        let err = db.get("Customers").unwrap().unwrap().update(&[]).execute().unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidArgument(_)));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_update_without_filter_hits_every_row() {
        let db = open_shop();
        seed_customers(&db);
        let customers = db.get("Customers").unwrap().unwrap();

        let total = customers.count_all().unwrap();
        let changed = customers.update(&[("Address", "Spain".into())]).execute().unwrap();
        assert_eq!(i64::try_from(changed).unwrap(), total);
        assert_eq!(customers.count("Address = ?", args!["Spain"]).unwrap(), total);
    }

    #[test]
    fn test_update_with_filter() {
        let db = open_shop();
        seed_customers(&db);
        let customers = db.get("Customers").unwrap().unwrap();

        let changed = customers
            .update(&[("Address", "Milan".into())])
            .filter_with("Name = ?", args!["Pirlo"])
            .execute()
            .unwrap();
        assert_eq!(changed, 1);
        assert_eq!(customers.count("Address = 'Milan'", args![]).unwrap(), 1);
    }
}
