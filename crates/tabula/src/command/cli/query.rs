use std::io::Write;

use clap::Parser;
use log::debug;
use tabula_database::database::query::Selectable;
use tabula_database::{DatabaseError, database::Database};

use super::write_rows;

#[derive(Debug, Parser)]
pub struct Cmd {
    /// Table to select from, `"Orders o"` gives it the alias `o`.
    table: String,

    /// Columns to return, all of them when omitted.
    #[arg(long, short, value_delimiter = ',')]
    columns: Vec<String>,

    /// Filter condition, written as a SQL expression.
    #[arg(long = "where", short = 'w')]
    condition: Option<String>,

    /// Columns to order by.
    #[arg(long, short, value_delimiter = ',')]
    order_by: Vec<String>,

    /// Order descending instead of ascending.
    #[arg(long, requires = "order_by")]
    desc: bool,

    /// Drop duplicate rows.
    #[arg(long)]
    distinct: bool,

    /// Only print this page of results, starting at 1.
    #[arg(long, short)]
    page: Option<i64>,

    /// Rows per page.
    #[arg(long, default_value_t = 20)]
    page_size: usize,
}

impl Cmd {
    pub fn run(self, db: &Database, out: &mut impl Write) -> Result<(), DatabaseError> {
        let Some(table) = db.get(&self.table)? else {
            return Err(DatabaseError::InvalidArgument(format!(
                "no table named {}",
                self.table
            )));
        };

        let condition = self.condition.as_deref().unwrap_or_default();
        let mut select = if self.distinct {
            table.select_distinct(condition)
        } else {
            table.select(condition)
        };

        let columns: Vec<&str> = self.columns.iter().map(String::as_str).collect();
        select.columns(&columns);
        let order: Vec<&str> = self.order_by.iter().map(String::as_str).collect();
        if self.desc {
            select.order_by_desc(&order);
        } else if !order.is_empty() {
            select.order_by(&order);
        }

        let rows = match self.page {
            Some(page) => {
                let mut paging = select.paging(self.page_size)?;
                let rows = paging.query_page(page)?;
                let total = paging.total_page()?;
                debug!("page {page} of {total}");
                rows
            }
            None => select.query()?,
        };
        let count = write_rows(out, rows)?;
        debug!("{count} rows from {}", table.name());
        Ok(())
    }
}
