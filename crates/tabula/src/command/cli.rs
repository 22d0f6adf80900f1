use std::io::Write;

use clap::Subcommand;
use tabula_database::database::engine::RowSet;
use tabula_database::{DatabaseError, database::Database};
mod exec;
mod query;
mod tables;

#[derive(Subcommand, Debug)]
#[command(infer_subcommands = true)]
pub enum Cmd {
    /// List the tables of the database with their columns.
    Tables(tables::Cmd),

    /// Select rows from a table.
    Query(query::Cmd),

    /// Run a raw SQL statement.
    Exec(exec::Cmd),
}

impl Cmd {
    pub fn run(self, db: &Database, out: &mut impl Write) -> Result<(), DatabaseError> {
        // CLI commands block the current thread until they resolve.
        match self {
            Self::Tables(tables) => tables.run(db, out),
            Self::Query(query) => query.run(db, out),
            Self::Exec(exec) => exec.run(db, out),
        }
    }
}

/// Write `rows` tab separated, a header line first. Returns the number of rows written.
fn write_rows(out: &mut impl Write, mut rows: RowSet) -> Result<usize, DatabaseError> {
    let header: Vec<&str> = (0..rows.column_count())
        .filter_map(|ordinal| rows.column_name(ordinal))
        .collect();
    writeln!(out, "{}", header.join("\t"))?;

    let mut count = 0;
    while rows.advance() {
        let cells: Vec<String> = (0..rows.column_count())
            .map(|ordinal| rows.get(ordinal).map(ToString::to_string).unwrap_or_default())
            .collect();
        writeln!(out, "{}", cells.join("\t"))?;
        count += 1;
    }
    Ok(count)
}
