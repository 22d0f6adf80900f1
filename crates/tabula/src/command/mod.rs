use std::io::Write;

use clap::Subcommand;
use tabula_database::{DatabaseError, database::Database};

mod cli;

#[derive(Subcommand)]
#[command(infer_subcommands = true)]
pub enum TabulaCmd {
    #[command(flatten)]
    Cli(cli::Cmd),
}

impl TabulaCmd {
    pub fn run(self, db: &Database, out: &mut impl Write) -> Result<(), DatabaseError> {
        match self {
            Self::Cli(cli) => cli.run(db, out),
        }
    }
}
