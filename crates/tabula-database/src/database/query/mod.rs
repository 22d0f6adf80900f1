use log::debug;

use super::engine::RowSet;
use super::value::Value;
use super::{Database, DatabaseError};
use crate::entity::{Entity, EntityList, map_row, reconcile};

pub use delete::DeleteStatement;
pub use insert::InsertStatement;
pub use join::{JoinClause, JoinKind, JoinStatement};
pub use paging::Paging;
pub use select::{Direction, Limit, OrderBy, SelectState, SelectStatement};
pub use update::UpdateStatement;

mod delete;
mod insert;
mod join;
mod paging;
mod select;
mod update;

/// Trait for all queries to implement to translate to a runnable SQL string.
pub trait SqlString {
    fn to_sql(&self) -> String;
}

/// Rendered statement text and the positional parameters bound to its `?` markers.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Shared surface of every SELECT shaped builder.
///
/// Each clause setter replaces the clause it targets. Nothing is appended or AND-ed onto
/// what was set before.
pub trait Selectable<'db> {
    fn database(&self) -> &'db Database;

    fn state(&self) -> &SelectState;

    fn state_mut(&mut self) -> &mut SelectState;

    /// Join clauses rendered after the source table.
    fn joins(&self) -> &[JoinClause] {
        &[]
    }

    /// Replace the projection. No columns selects `*`.
    fn columns(&mut self, columns: &[&str]) -> &mut Self
    where
        Self: Sized,
    {
        self.state_mut().set_columns(columns);
        self
    }

    /// Replace the WHERE clause with a condition that takes no parameters.
    fn filter(&mut self, condition: &str) -> &mut Self
    where
        Self: Sized,
    {
        self.state_mut().set_filter(condition, Vec::new());
        self
    }

    /// Replace the WHERE clause and its positional parameters.
    fn filter_with(&mut self, condition: &str, args: Vec<Value>) -> &mut Self
    where
        Self: Sized,
    {
        self.state_mut().set_filter(condition, args);
        self
    }

    /// Order ascending by `columns`, replacing any previous ordering.
    fn order_by(&mut self, columns: &[&str]) -> &mut Self
    where
        Self: Sized,
    {
        self.state_mut().set_order(columns, Direction::Asc);
        self
    }

    /// Order descending by `columns`, replacing any previous ordering.
    fn order_by_desc(&mut self, columns: &[&str]) -> &mut Self
    where
        Self: Sized,
    {
        self.state_mut().set_order(columns, Direction::Desc);
        self
    }

    fn distinct(&mut self) -> &mut Self
    where
        Self: Sized,
    {
        self.state_mut().distinct = true;
        self
    }

    /// Return at most `count` rows.
    fn limit(&mut self, count: usize) -> &mut Self
    where
        Self: Sized,
    {
        self.state_mut().limit = Some(Limit { count, offset: 0 });
        self
    }

    fn render(&self) -> Statement {
        Statement {
            sql: self.state().to_sql_with(self.joins()),
            params: self.state().params.clone(),
        }
    }

    /// Run the statement.
    ///
    /// # Errors
    /// Will return `Err` if the database is not open or the engine rejects the statement.
    fn query(&self) -> Result<RowSet, DatabaseError> {
        let statement = self.render();
        debug!("select: {}", statement.sql);
        self.database()
            .engine()?
            .query(&statement.sql, &statement.params)
    }

    /// Map the first row onto `entity`, returns false when there was no row.
    ///
    /// # Errors
    /// Will return `Err` if the query fails or a cell cannot be coerced into its field.
    fn query_entity<E: Entity>(&self, entity: &mut E) -> Result<bool, DatabaseError>
    where
        Self: Sized,
    {
        let mut rows = self.query()?;
        if !rows.advance() {
            return Ok(false);
        }
        map_row(&rows, entity)?;
        rows.close();
        Ok(true)
    }

    /// Reconcile every row with the entities already in `list`.
    ///
    /// # Errors
    /// Will return `Err` if the query fails or a cell cannot be coerced into its field.
    fn query_list<L: EntityList>(&self, list: &mut L) -> Result<(), DatabaseError>
    where
        Self: Sized,
    {
        let rows = self.query()?;
        reconcile(rows, list, self.database().config().id_column())
    }

    /// Page through the results `row_limit` rows at a time.
    ///
    /// # Errors
    /// Will return `Err` if `row_limit` is 0.
    fn paging(&self, row_limit: usize) -> Result<Paging<'db>, DatabaseError>
    where
        Self: Sized,
    {
        Paging::new(
            self.database(),
            self.state().clone(),
            self.joins().to_vec(),
            row_limit,
        )
    }
}
