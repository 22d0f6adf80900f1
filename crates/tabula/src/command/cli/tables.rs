use std::io::Write;

use clap::Parser;
use tabula_database::{DatabaseError, database::Database};

#[derive(Debug, Parser)]
pub struct Cmd {
    /// Only print table names.
    #[arg(long, short)]
    short: bool,
}

impl Cmd {
    pub fn run(self, db: &Database, out: &mut impl Write) -> Result<(), DatabaseError> {
        for name in db.table_names()? {
            if self.short {
                writeln!(out, "{name}")?;
                continue;
            }
            let columns = db
                .get(&name)?
                .map(|table| table.column_names())
                .unwrap_or_default();
            writeln!(out, "{name}\t{}", columns.join(", "))?;
        }
        Ok(())
    }
}
