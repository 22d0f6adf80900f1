use log::debug;

use super::{JoinClause, Limit, SelectState, Statement};
use crate::database::engine::RowSet;
use crate::database::{Database, DatabaseError};
use crate::entity::{EntityList, reconcile};

/// Walks the results of a select one page of `row_limit` rows at a time.
///
/// Page numbers start at 1. Every page re-runs the underlying query with a LIMIT and OFFSET.
pub struct Paging<'db> {
    db: &'db Database,
    state: SelectState,
    joins: Vec<JoinClause>,
    row_limit: usize,
    page_number: i64,
}

impl<'db> Paging<'db> {
    pub(crate) fn new(
        db: &'db Database,
        state: SelectState,
        joins: Vec<JoinClause>,
        row_limit: usize,
    ) -> Result<Self, DatabaseError> {
        if row_limit == 0 {
            return Err(DatabaseError::InvalidArgument(
                "row limit must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            db,
            state,
            joins,
            row_limit,
            page_number: 1,
        })
    }

    /// Rows per page, fixed when the paging was created.
    #[must_use]
    pub fn row_limit(&self) -> usize {
        self.row_limit
    }

    /// The page the next [`Paging::query`] will return.
    #[must_use]
    pub fn page_number(&self) -> i64 {
        self.page_number
    }

    /// # Errors
    /// Will return `Err` if `page_number` is below 1.
    pub fn set_page_number(&mut self, page_number: i64) -> Result<(), DatabaseError> {
        if page_number < 1 {
            return Err(DatabaseError::InvalidArgument(format!(
                "page number must be 1 or greater, got {page_number}"
            )));
        }
        self.page_number = page_number;
        Ok(())
    }

    /// Number of pages the query spans.
    ///
    /// Runs a `SELECT COUNT(*)` over the whole filtered query on every call, which scans
    /// every matching row.
    ///
    /// # Errors
    /// Will return `Err` if the database is not open or the engine rejects the count.
    pub fn total_page(&self) -> Result<i64, DatabaseError> {
        let mut base = self.state.clone();
        base.limit = None;
        base.orderby = None;
        let sql = format!("SELECT COUNT(*) FROM ({})", base.to_sql_with(&self.joins));
        debug!("total_page: {sql}");

        let mut rows = self.db.engine()?.query(&sql, &base.params)?;
        let count = if rows.advance() { rows.get_i64(0)? } else { 0 };
        let row_limit = i64::try_from(self.row_limit)
            .map_err(|_| DatabaseError::InvalidArgument("row limit too large".to_string()))?;
        Ok((count + row_limit - 1) / row_limit)
    }

    /// Return the current page and move on to the next one.
    ///
    /// # Errors
    /// Will return `Err` if the database is not open or the engine rejects the query.
    pub fn query(&mut self) -> Result<RowSet, DatabaseError> {
        let rows = self.fetch(self.page_number)?;
        self.page_number = self.page_number.saturating_add(1);
        Ok(rows)
    }

    /// Return page `page_number`, which also becomes the current page.
    ///
    /// A page past the end comes back empty.
    ///
    /// # Errors
    /// Will return `Err` if `page_number` is below 1 or its offset is out of range, before
    /// anything reaches the engine.
    pub fn query_page(&mut self, page_number: i64) -> Result<RowSet, DatabaseError> {
        let rows = self.fetch(page_number)?;
        self.page_number = page_number;
        Ok(rows)
    }

    /// Reconcile the current page into `list` and move on to the next page.
    ///
    /// # Errors
    /// Will return `Err` if the query fails or a cell cannot be coerced into its field.
    pub fn query_list<L: EntityList>(&mut self, list: &mut L) -> Result<(), DatabaseError> {
        let rows = self.query()?;
        reconcile(rows, list, self.db.config().id_column())
    }

    /// The statement for `page_number`.
    ///
    /// # Errors
    /// Will return `Err` if `page_number` is below 1 or its offset does not fit a signed
    /// 64-bit integer.
    pub fn page_statement(&self, page_number: i64) -> Result<Statement, DatabaseError> {
        if page_number < 1 {
            return Err(DatabaseError::InvalidArgument(format!(
                "page number must be 1 or greater, got {page_number}"
            )));
        }

        // sqlite reads OFFSET as a signed 64-bit integer
        let offset = usize::try_from(page_number - 1)
            .ok()
            .and_then(|page| page.checked_mul(self.row_limit))
            .filter(|offset| i64::try_from(*offset).is_ok())
            .ok_or_else(|| {
                DatabaseError::InvalidArgument(format!(
                    "page {page_number} of {} rows is out of range",
                    self.row_limit
                ))
            })?;

        let mut state = self.state.clone();
        state.limit = Some(Limit {
            count: self.row_limit,
            offset,
        });
        Ok(Statement {
            sql: state.to_sql_with(&self.joins),
            params: state.params,
        })
    }

    fn fetch(&self, page_number: i64) -> Result<RowSet, DatabaseError> {
        let statement = self.page_statement(page_number)?;
        debug!("page {page_number}: {}", statement.sql);
        self.db.engine()?.query(&statement.sql, &statement.params)
    }
}
