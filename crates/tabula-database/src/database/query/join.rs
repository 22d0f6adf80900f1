use core::fmt;

use super::{SelectState, SelectStatement, Selectable, SqlString};
use crate::database::Database;
use crate::database::value::Value;
use crate::table::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Outer,
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inner => write!(f, "INNER JOIN"),
            // sqlite only knows the LEFT flavour of outer joins
            Self::Outer => write!(f, "LEFT OUTER JOIN"),
        }
    }
}

/// One `<kind> <table> ON <clause>` entry of a join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinClause {
    pub kind: JoinKind,
    pub table: String,
    pub on: String,
}

impl JoinClause {
    /// `on` gets an `ON ` prefix unless it already starts with one (any case).
    #[must_use]
    pub fn new(kind: JoinKind, table: &str, on: &str) -> Self {
        let on = on.trim();
        let on = if on.get(..3).is_some_and(|prefix| prefix.eq_ignore_ascii_case("on ")) {
            on.to_string()
        } else {
            format!("ON {on}")
        };

        Self {
            kind,
            table: table.trim().to_string(),
            on,
        }
    }
}

impl fmt::Display for JoinClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.kind, self.table, self.on)
    }
}

/// A SELECT over a base table joined with one or more partner tables.
///
/// Every `select*` call builds a plain select on the base table and takes over its
/// projection, filter, ordering and limit wholesale. Clauses set directly on the join
/// before such a call are discarded, the last select wins.
#[derive(Clone)]
pub struct JoinStatement<'db> {
    table: Table<'db>,
    state: SelectState,
    joins: Vec<JoinClause>,
}

impl<'db> JoinStatement<'db> {
    pub(crate) fn new(table: Table<'db>, kind: JoinKind, partner: &str, on: &str) -> Self {
        let state = table.select_all().into_state();
        Self {
            table,
            state,
            joins: vec![JoinClause::new(kind, partner, on)],
        }
    }

    /// Add another `INNER JOIN` after the existing ones.
    pub fn inner_join(&mut self, partner: &str, on: &str) -> &mut Self {
        self.joins.push(JoinClause::new(JoinKind::Inner, partner, on));
        self
    }

    /// Add another outer join after the existing ones.
    pub fn outer_join(&mut self, partner: &str, on: &str) -> &mut Self {
        self.joins.push(JoinClause::new(JoinKind::Outer, partner, on));
        self
    }

    pub fn select_all(&mut self) -> &mut Self {
        let select = self.table.select_all();
        self.consume(select)
    }

    pub fn select(&mut self, condition: &str) -> &mut Self {
        let select = self.table.select(condition);
        self.consume(select)
    }

    pub fn select_with(&mut self, condition: &str, args: Vec<Value>) -> &mut Self {
        let select = self.table.select_with(condition, args);
        self.consume(select)
    }

    pub fn select_top(&mut self, top: usize, condition: &str) -> &mut Self {
        let select = self.table.select_top(top, condition);
        self.consume(select)
    }

    pub fn select_top_with(&mut self, top: usize, condition: &str, args: Vec<Value>) -> &mut Self {
        let select = self.table.select_top_with(top, condition, args);
        self.consume(select)
    }

    pub fn select_id(&mut self, id: i64) -> &mut Self {
        let select = self.table.select_id(id);
        self.consume(select)
    }

    pub fn select_ids(&mut self, ids: &[i64]) -> &mut Self {
        let select = self.table.select_ids(ids);
        self.consume(select)
    }

    pub fn select_distinct_all(&mut self) -> &mut Self {
        let select = self.table.select_distinct_all();
        self.consume(select)
    }

    pub fn select_distinct(&mut self, condition: &str) -> &mut Self {
        let select = self.table.select_distinct(condition);
        self.consume(select)
    }

    pub fn select_distinct_with(&mut self, condition: &str, args: Vec<Value>) -> &mut Self {
        let select = self.table.select_distinct_with(condition, args);
        self.consume(select)
    }

    /// Replace this join's select state with a snapshot of `select`.
    fn consume(&mut self, select: SelectStatement<'db>) -> &mut Self {
        self.state = select.into_state();
        self
    }
}

impl<'db> Selectable<'db> for JoinStatement<'db> {
    fn database(&self) -> &'db Database {
        self.table.database()
    }

    fn state(&self) -> &SelectState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut SelectState {
        &mut self.state
    }

    fn joins(&self) -> &[JoinClause] {
        &self.joins
    }
}

impl SqlString for JoinStatement<'_> {
    fn to_sql(&self) -> String {
        self.state.to_sql_with(&self.joins)
    }
}
