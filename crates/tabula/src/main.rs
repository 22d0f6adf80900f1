use std::fs::{self, File, OpenOptions};
use std::process::ExitCode;

use clap::Parser;
use command::TabulaCmd;
use env_logger::{Builder, Env, Target};
use log::{debug, error};
use tabula_common::utils::get_data_dir;
use tabula_database::database::{Database, DatabaseError, Migration};
use tabula_database::current_database;
use tabula_database::schema::Modeling;
mod command;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const LOG_FILE: &str = "tabula.log";
const LOG_ENV: &str = "TABULA_LOG";

static HELP_TEMPLATE: &str = "\
    {before-help} {name} {version}
    {author}
    {about}

    {usage-heading}
      {usage}


    {all-args}
    {after-help}";

#[derive(Parser)]
#[command(
    version = VERSION,
    about = "Inspect and query tabula sqlite databases",
    help_template(HELP_TEMPLATE),
)]
struct Tabula {
    /// Name of the database, the file is `<name>.db` unless configured otherwise.
    #[arg(long, short, global = true, default_value = "tabula")]
    name: String,

    /// Schema version to open the database at, the stored version when omitted.
    #[arg(long, global = true)]
    schema_version: Option<u32>,

    #[command(subcommand)]
    tabula: TabulaCmd,
}

/// The CLI never declares tables, it opens whatever schema is already there.
struct Existing;

impl Migration for Existing {
    fn on_model_create(&mut self, db: &Database, _modeling: &mut Modeling) -> Result<(), DatabaseError> {
        debug!("{} has no schema yet", db.name());
        Ok(())
    }
}

impl Tabula {
    fn run(self) -> ExitCode {
        let mut db = current_database(&self.name);
        debug!("config: {:?}", db.config());

        let opened = match self.schema_version {
            Some(version) => db.open(version, &mut Existing),
            None => db.open_existing(&mut Existing),
        };
        let result = opened.and_then(|()| self.tabula.run(&db, &mut std::io::stdout().lock()));
        db.close();

        match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                error!("{err}");
                eprintln!("{err}");
                ExitCode::FAILURE
            }
        }
    }
}

fn log_file() -> Option<File> {
    let _ = fs::create_dir_all(get_data_dir());
    let path = get_data_dir().join(LOG_FILE);
    if cfg!(debug_assertions) {
        // Debug builds keep appending so a session can be followed across runs.
        OpenOptions::new().create(true).append(true).open(path).ok()
    } else {
        File::create(path).ok()
    }
}

fn main() -> ExitCode {
    let default_level = if cfg!(debug_assertions) { "debug" } else { "error" };
    let env = Env::new().filter_or(LOG_ENV, default_level);
    let mut builder = Builder::from_env(env);
    if let Some(file) = log_file() {
        builder.target(Target::Pipe(Box::new(file)));
    }
    builder.init();

    Tabula::parse().run()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_version_defaults_to_stored() {
        let cli = Tabula::try_parse_from(["tabula", "tables"]).unwrap();
        assert_eq!(cli.schema_version, None);
        assert_eq!(cli.name, "tabula");

        let cli = Tabula::try_parse_from(["tabula", "tables", "--schema-version", "3"]).unwrap();
        assert_eq!(cli.schema_version, Some(3));
    }
}
