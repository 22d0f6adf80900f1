use std::io::Write;

use clap::Parser;
use log::debug;
use tabula_database::{DatabaseError, database::Database};

use super::write_rows;

#[derive(Debug, Parser)]
pub struct Cmd {
    /// The statement, words are joined with spaces.
    #[arg(required = true)]
    sql: Vec<String>,
}

impl Cmd {
    /// Statements that produce rows are printed like a query, anything else reports the
    /// number of affected rows.
    pub fn run(self, db: &Database, out: &mut impl Write) -> Result<(), DatabaseError> {
        let sql = self.sql.join(" ");
        let lowered = sql.trim_start().to_ascii_lowercase();
        debug!("exec: {sql}");

        if ["select", "with", "pragma", "values"]
            .iter()
            .any(|keyword| lowered.starts_with(keyword))
        {
            write_rows(out, db.raw(&sql, &[])?)?;
        } else {
            let affected = db.exec_sql(&sql, &[])?;
            writeln!(out, "{affected} rows affected")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tabula_common::config::{Config, DatabaseConfig};
    use tabula_database::database::Migration;
    use tabula_database::schema::Modeling;

    use super::*;
    use crate::command::cli::tests::{output, shop};

    fn exec(db: &Database, sql: &str) -> String {
        let mut out = Vec::new();
        Cmd {
            sql: sql.split(' ').map(String::from).collect(),
        }
        .run(db, &mut out)
        .unwrap();
        output(out)
    }

    #[test]
    fn test_exec_statement_and_select() {
        let db = shop();
        assert_eq!(exec(&db, "UPDATE Customers SET Address = 'Milan' WHERE Address = 'Italy'"), "2 rows affected\n");
        assert_eq!(exec(&db, "select count(*) AS n from Customers where Address = 'Milan'"), "n\n2\n");
    }

    #[test]
    fn test_exec_create_persists() {
        struct Empty;

        impl Migration for Empty {
            fn on_model_create(&mut self, _db: &Database, _modeling: &mut Modeling) -> Result<(), DatabaseError> {
                Ok(())
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let config = Config::builder()
            .database(DatabaseConfig::builder().database_path(dir.path()).build())
            .build();

        let mut db = Database::with_config("notes", config.clone());
        db.open(1, &mut Empty).unwrap();
        exec(&db, "CREATE TABLE Notes(Id INTEGER primary key, Body TEXT)");
        exec(&db, "INSERT INTO Notes (Body) VALUES ('first')");
        db.close();

        let mut db = Database::with_config("notes", config);
        db.open(1, &mut Empty).unwrap();
        assert!(dir.path().join("notes.db").exists());
        assert_eq!(exec(&db, "SELECT Body FROM Notes"), "Body\nfirst\n");
    }
}
