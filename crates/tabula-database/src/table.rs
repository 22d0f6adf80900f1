use log::debug;

use crate::database::query::{
    DeleteStatement, InsertStatement, JoinKind, JoinStatement, SelectStatement, Selectable,
    UpdateStatement,
};
use crate::database::value::Value;
use crate::database::{Database, DatabaseError};
use crate::entity::{Entity, entity_values};

/// Handle onto one table of an open [`Database`].
///
/// Handles are cheap and borrow the session, every statement built from one runs on the
/// session's engine.
#[derive(Clone)]
pub struct Table<'db> {
    db: &'db Database,
    name: String,
    alias: Option<String>,
}

impl<'db> Table<'db> {
    pub(crate) fn new(db: &'db Database, name: String, alias: Option<String>) -> Self {
        Self { db, name, alias }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    #[must_use]
    pub fn database(&self) -> &'db Database {
        self.db
    }

    /// Ordered column names as last read from the engine.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.db
            .lookup(&self.name)
            .map(|info| info.columns)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn has_column(&self, column: &str) -> bool {
        self.column_names()
            .iter()
            .any(|name| name.eq_ignore_ascii_case(column))
    }

    /// Select every row.
    #[must_use]
    pub fn select_all(&self) -> SelectStatement<'db> {
        self.selector(None, false)
    }

    /// Select the rows matching `condition`, a blank condition selects every row.
    #[must_use]
    pub fn select(&self, condition: &str) -> SelectStatement<'db> {
        self.select_with(condition, Vec::new())
    }

    #[must_use]
    pub fn select_with(&self, condition: &str, args: Vec<Value>) -> SelectStatement<'db> {
        let mut select = self.selector(None, false);
        select.filter_with(condition, args);
        select
    }

    /// Select at most `top` rows matching `condition`.
    #[must_use]
    pub fn select_top(&self, top: usize, condition: &str) -> SelectStatement<'db> {
        self.select_top_with(top, condition, Vec::new())
    }

    #[must_use]
    pub fn select_top_with(&self, top: usize, condition: &str, args: Vec<Value>) -> SelectStatement<'db> {
        let mut select = self.selector(Some(top), false);
        select.filter_with(condition, args);
        select
    }

    /// Select the row whose primary key is `id`.
    #[must_use]
    pub fn select_id(&self, id: i64) -> SelectStatement<'db> {
        self.select_with(&format!("{} = ?", self.id_column()), vec![Value::Integer(id)])
    }

    /// Select the rows whose primary key is one of `ids`.
    #[must_use]
    pub fn select_ids(&self, ids: &[i64]) -> SelectStatement<'db> {
        let (condition, args) = self.id_list(ids);
        self.select_with(&condition, args)
    }

    #[must_use]
    pub fn select_distinct_all(&self) -> SelectStatement<'db> {
        self.selector(None, true)
    }

    #[must_use]
    pub fn select_distinct(&self, condition: &str) -> SelectStatement<'db> {
        self.select_distinct_with(condition, Vec::new())
    }

    #[must_use]
    pub fn select_distinct_with(&self, condition: &str, args: Vec<Value>) -> SelectStatement<'db> {
        let mut select = self.selector(None, true);
        select.filter_with(condition, args);
        select
    }

    /// Primary key of the first row matching `condition`.
    ///
    /// # Errors
    /// Will return `Err` if the engine rejects the query.
    pub fn find_id(&self, condition: &str, args: Vec<Value>) -> Result<Option<i64>, DatabaseError> {
        let mut rows = self
            .select_top_with(1, condition, args)
            .columns(&[self.id_column()])
            .query()?;
        if rows.advance() {
            return Ok(Some(rows.get_i64(0)?));
        }
        Ok(None)
    }

    /// Number of rows matching `condition`.
    ///
    /// # Errors
    /// Will return `Err` if the engine rejects the query.
    pub fn count(&self, condition: &str, args: Vec<Value>) -> Result<i64, DatabaseError> {
        let mut rows = self
            .select_with(condition, args)
            .columns(&["COUNT(*)"])
            .query()?;
        if rows.advance() {
            return rows.get_i64(0);
        }
        Ok(0)
    }

    /// # Errors
    /// Will return `Err` if the engine rejects the query.
    pub fn count_all(&self) -> Result<i64, DatabaseError> {
        self.count("", Vec::new())
    }

    /// Start an insert into `columns`, finished by [`InsertStatement::values`].
    #[must_use]
    pub fn insert(&self, columns: &[&str]) -> InsertStatement<'db> {
        let mut insert = InsertStatement::new(self.db, &self.name);
        for column in columns {
            insert.column(column);
        }
        insert
    }

    /// Insert the bound fields of `entity` and hand it the new id.
    ///
    /// # Errors
    /// Will return `Err` if the engine rejects the row.
    pub fn insert_entity<E: Entity>(&self, entity: &mut E) -> Result<i64, DatabaseError> {
        let values = entity_values(entity, self.id_column());
        let columns: Vec<&str> = values.iter().map(|(column, _)| column.as_str()).collect();
        let id = self
            .insert(&columns)
            .values(values.iter().map(|(_, value)| value.clone()).collect())?;
        entity.set_id(id);
        debug!("inserted {} into {}", id, self.name);
        Ok(id)
    }

    /// Start an update setting `values`. Without a filter it updates every row.
    #[must_use]
    pub fn update(&self, values: &[(&str, Value)]) -> UpdateStatement<'db> {
        let mut update = UpdateStatement::new(self.db, &self.name);
        for (column, value) in values {
            update.column(column, value.clone());
        }
        update
    }

    /// # Errors
    /// Will return `Err` if the engine rejects the statement.
    pub fn update_id(&self, values: &[(&str, Value)], id: i64) -> Result<usize, DatabaseError> {
        self.update(values)
            .filter_with(&format!("{} = ?", self.id_column()), vec![Value::Integer(id)])
            .execute()
    }

    /// Write every bound field of `entity` back to its row.
    ///
    /// # Errors
    /// Will return `Err` if the entity has never been saved or the engine rejects the update.
    pub fn update_entity<E: Entity>(&self, entity: &mut E) -> Result<usize, DatabaseError> {
        let id = entity.id();
        if id < 1 {
            return Err(DatabaseError::InvalidArgument(format!(
                "cannot update an entity with id {id}, insert it first"
            )));
        }

        let values = entity_values(entity, self.id_column());
        let pairs: Vec<(&str, Value)> = values
            .iter()
            .map(|(column, value)| (column.as_str(), value.clone()))
            .collect();
        self.update_id(&pairs, id)
    }

    /// Start a delete. Without a filter it removes every row.
    #[must_use]
    pub fn delete(&self) -> DeleteStatement<'db> {
        DeleteStatement::new(self.db, &self.name)
    }

    /// # Errors
    /// Will return `Err` if the engine rejects the statement.
    pub fn delete_id(&self, id: i64) -> Result<usize, DatabaseError> {
        self.delete()
            .filter_with(&format!("{} = ?", self.id_column()), vec![Value::Integer(id)])
            .execute()
    }

    /// # Errors
    /// Will return `Err` if the engine rejects the statement.
    pub fn delete_ids(&self, ids: &[i64]) -> Result<usize, DatabaseError> {
        let (condition, args) = self.id_list(ids);
        self.delete().filter_with(&condition, args).execute()
    }

    /// # Errors
    /// Will return `Err` if the engine rejects the statement.
    pub fn delete_entity<E: Entity>(&self, entity: &E) -> Result<usize, DatabaseError> {
        self.delete_id(entity.id())
    }

    /// Join `partner` with an `INNER JOIN`. `on` may omit its leading `ON`.
    #[must_use]
    pub fn inner_join(&self, partner: &str, on: &str) -> JoinStatement<'db> {
        JoinStatement::new(self.clone(), JoinKind::Inner, partner, on)
    }

    /// Join `partner` with an outer join. `on` may omit its leading `ON`.
    #[must_use]
    pub fn outer_join(&self, partner: &str, on: &str) -> JoinStatement<'db> {
        JoinStatement::new(self.clone(), JoinKind::Outer, partner, on)
    }

    /// Drop the table from the database.
    ///
    /// # Errors
    /// Will return `Err` if the engine rejects the statement.
    pub fn drop_table(self) -> Result<(), DatabaseError> {
        self.db.exec_sql(&format!("DROP TABLE IF EXISTS {}", self.name), &[])?;
        Ok(())
    }

    fn id_column(&self) -> &'db str {
        self.db.config().id_column()
    }

    fn id_list(&self, ids: &[i64]) -> (String, Vec<Value>) {
        let markers = vec!["?"; ids.len()].join(", ");
        (
            format!("{} IN ({markers})", self.id_column()),
            ids.iter().copied().map(Value::Integer).collect(),
        )
    }

    fn selector(&self, top: Option<usize>, distinct: bool) -> SelectStatement<'db> {
        let source = match &self.alias {
            Some(alias) => format!("{} {alias}", self.name),
            None => self.name.clone(),
        };
        let mut select = SelectStatement::new(self.db, &source);
        if let Some(top) = top.filter(|top| *top > 0) {
            select.limit(top);
        }
        if distinct {
            select.distinct();
        }
        select
    }
}
