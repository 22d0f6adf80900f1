use core::fmt;

use super::{JoinClause, Selectable, SqlString};
use crate::database::Database;
use crate::database::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "ASC"),
            Self::Desc => write!(f, "DESC"),
        }
    }
}

/// ORDER BY clause, the direction applies to the whole column list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub columns: Vec<String>,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub count: usize,
    pub offset: usize,
}

/// The clause fragments of a SELECT, independent of any session.
///
/// Cloning a `SelectState` takes a snapshot that later changes to the source never reach.
/// `r#where` and `params` always travel together.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct SelectState {
    pub distinct: bool,
    pub columns: Vec<String>,
    pub from: String,
    pub r#where: Option<String>,
    pub params: Vec<Value>,
    pub orderby: Option<OrderBy>,
    pub limit: Option<Limit>,
}

impl SelectState {
    /// Construct a `SELECT * FROM {from}` state.
    #[must_use]
    pub fn new(from: &str) -> Self {
        Self {
            from: from.to_string(),
            ..Self::default()
        }
    }

    pub fn set_columns(&mut self, columns: &[&str]) {
        self.columns = columns
            .iter()
            .map(|column| column.trim())
            .filter(|column| !column.is_empty())
            .map(ToString::to_string)
            .collect();
    }

    /// Replace the WHERE clause. A blank condition removes it along with its parameters.
    pub fn set_filter(&mut self, condition: &str, params: Vec<Value>) {
        let condition = condition.trim();
        if condition.is_empty() {
            self.r#where = None;
            self.params.clear();
        } else {
            self.r#where = Some(condition.to_string());
            self.params = params;
        }
    }

    /// Replace the ORDER BY clause. No columns removes it.
    pub fn set_order(&mut self, columns: &[&str], direction: Direction) {
        self.orderby = if columns.is_empty() {
            None
        } else {
            Some(OrderBy {
                columns: columns.iter().map(ToString::to_string).collect(),
                direction,
            })
        };
    }

    /// Render the statement with `joins` placed after the source table.
    #[must_use]
    pub fn to_sql_with(&self, joins: &[JoinClause]) -> String {
        let mut sql = String::new();
        sql.push_str("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }

        if self.columns.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.columns.join(", "));
        }

        sql.push_str(" FROM ");
        sql.push_str(&self.from);

        for join in joins {
            sql.push(' ');
            sql.push_str(&join.to_string());
        }

        if let Some(clause) = &self.r#where {
            sql.push_str(&format!(" WHERE {clause}"));
        }

        if let Some(OrderBy { columns, direction }) = &self.orderby {
            sql.push_str(&format!(" ORDER BY {} {direction}", columns.join(", ")));
        }

        if let Some(Limit { count, offset }) = self.limit {
            sql.push_str(&format!(" LIMIT {count}"));
            if offset > 0 {
                sql.push_str(&format!(" OFFSET {offset}"));
            }
        }

        sql
    }
}

/// Select rows from an existing table
#[derive(Clone)]
pub struct SelectStatement<'db> {
    db: &'db Database,
    state: SelectState,
}

impl<'db> SelectStatement<'db> {
    /// Construct a new [`SelectStatement`] over `from`.
    pub(crate) fn new(db: &'db Database, from: &str) -> Self {
        Self {
            db,
            state: SelectState::new(from),
        }
    }

    /// Take the fragment state out of this statement.
    #[must_use]
    pub fn into_state(self) -> SelectState {
        self.state
    }
}

impl<'db> Selectable<'db> for SelectStatement<'db> {
    fn database(&self) -> &'db Database {
        self.db
    }

    fn state(&self) -> &SelectState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut SelectState {
        &mut self.state
    }
}

impl SqlString for SelectStatement<'_> {
    /// Convert the [`SelectStatement`] into a runnable SQL string.
    fn to_sql(&self) -> String {
        self.state.to_sql_with(&[])
    }
}
