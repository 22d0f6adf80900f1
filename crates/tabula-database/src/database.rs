use std::cell::RefCell;

use log::{debug, error};
use tabula_common::config::Config;
use thiserror::Error;

use crate::schema::Modeling;
use crate::table::Table;
use engine::{Engine, RowSet};
use sqlite::Sqlite;
use value::Value;

pub mod engine;
pub mod query;
pub mod sqlite;
pub mod value;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A caller supplied argument was rejected before reaching the engine.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The database has not been opened, or has been closed.
    #[error("Database is not open, call Database::open first")]
    NotOpen,

    /// A cell could not be coerced into the field it is bound to.
    #[error("Column '{column}' holds {found}, which cannot be mapped into {expected}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Encountered a database error: {0}")]
    Engine(#[from] rusqlite::Error),

    #[error("Encountered an io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Schema lifecycle callbacks invoked while a [`Database`] is being opened.
///
/// Errors returned by any callback are handed to [`Migration::on_error`] and never abort
/// the open sequence.
pub trait Migration {
    /// Declare the tables of a brand new database.
    ///
    /// # Errors
    /// Any error is routed to [`Migration::on_error`].
    fn on_model_create(&mut self, db: &Database, modeling: &mut Modeling) -> Result<(), DatabaseError>;

    /// The stored version is older than the requested one. Return true to run
    /// [`Migration::on_model_create`] afterwards.
    ///
    /// # Errors
    /// Any error is routed to [`Migration::on_error`].
    fn on_upgrade(&mut self, _db: &Database, _old: u32, _new: u32) -> Result<bool, DatabaseError> {
        Ok(false)
    }

    /// The stored version is newer than the requested one. Return true to run
    /// [`Migration::on_model_create`] afterwards.
    ///
    /// # Errors
    /// Any error is routed to [`Migration::on_error`].
    fn on_downgrade(&mut self, _db: &Database, _old: u32, _new: u32) -> Result<bool, DatabaseError> {
        Ok(false)
    }

    fn on_error(&mut self, err: DatabaseError) {
        error!("schema callback failed: {err}");
    }
}

/// Registry entry for a table known to the open database.
#[derive(Debug, Clone)]
pub(crate) struct TableInfo {
    pub name: String,
    pub columns: Vec<String>,
}

/// A named database session.
///
/// Holds the engine while open along with the registry of its tables. Everything that
/// touches a table goes through a session, there is no global state. A session is meant
/// for one thread, the registry is not synchronized.
pub struct Database {
    name: String,
    version: u32,
    config: Config,
    engine: Option<Box<dyn Engine>>,
    tables: RefCell<Vec<TableInfo>>,
}

impl Database {
    /// Creates a closed [`Database`] with the default configuration.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self::with_config(name, Config::default())
    }

    #[must_use]
    pub fn with_config(name: &str, config: Config) -> Self {
        Self {
            name: name.to_string(),
            version: 0,
            config,
            engine: None,
            tables: RefCell::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The version the database was last opened with, 0 when never opened.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.engine.is_some()
    }

    /// Toggle foreign key enforcement, applied right away when the database is open.
    ///
    /// # Errors
    /// Will return `Err` if the engine rejects the change.
    pub fn set_foreign_key_support(&mut self, enabled: bool) -> Result<(), DatabaseError> {
        self.config.set_foreign_key_support(enabled);
        if let Some(engine) = &self.engine {
            engine.set_foreign_keys(enabled)?;
        }
        Ok(())
    }

    /// Open the sqlite database located by the configuration at `version`.
    ///
    /// Does nothing when the database is already open at the same version.
    ///
    /// # Errors
    /// Will return `Err` if `version` is 0 or the database file cannot be opened.
    pub fn open(&mut self, version: u32, migration: &mut impl Migration) -> Result<(), DatabaseError> {
        if self.is_open() && self.version == version {
            return Ok(());
        }
        if version == 0 {
            return Err(DatabaseError::InvalidArgument(
                "version must be 1 or greater".to_string(),
            ));
        }

        let location = self.config.database_location(&self.name);
        debug!("opening {} at {}", self.name, location.display());
        let engine = Sqlite::open(&location)?;
        self.open_engine(Box::new(engine), version, migration)
    }

    /// Open the sqlite database at whatever version it is stored with.
    ///
    /// A database that was never provisioned is created at version 1. Otherwise no
    /// [`Migration`] callback runs and the stored version is left untouched.
    ///
    /// # Errors
    /// Will return `Err` if the database file cannot be opened or its version read.
    pub fn open_existing(&mut self, migration: &mut impl Migration) -> Result<(), DatabaseError> {
        let location = self.config.database_location(&self.name);
        debug!("opening {} at {} as stored", self.name, location.display());
        let engine = Sqlite::open(&location)?;
        let version = engine.user_version()?.max(1);
        self.open_engine(Box::new(engine), version, migration)
    }

    /// Open the database over an already connected `engine`.
    ///
    /// Compares the version stored by the engine with `version` and runs the matching
    /// [`Migration`] callbacks, then loads the table registry.
    ///
    /// # Errors
    /// Will return `Err` if `version` is 0 or the engine fails outside of a callback.
    pub fn open_engine(
        &mut self,
        engine: Box<dyn Engine>,
        version: u32,
        migration: &mut impl Migration,
    ) -> Result<(), DatabaseError> {
        if version == 0 {
            return Err(DatabaseError::InvalidArgument(
                "version must be 1 or greater".to_string(),
            ));
        }

        self.close();
        engine.set_foreign_keys(self.config.foreign_key_support())?;
        let current = engine.user_version()?;
        self.engine = Some(engine);
        self.version = version;

        if current == 0 {
            debug!("creating {} at version {version}", self.name);
            self.create(migration);
        } else if current < version {
            debug!("upgrading {} from {current} to {version}", self.name);
            match migration.on_upgrade(self, current, version) {
                Ok(true) => self.create(migration),
                Ok(false) => {}
                Err(err) => migration.on_error(err),
            }
        } else if current > version {
            debug!("downgrading {} from {current} to {version}", self.name);
            match migration.on_downgrade(self, current, version) {
                Ok(true) => self.create(migration),
                Ok(false) => {}
                Err(err) => migration.on_error(err),
            }
        }

        let engine = self.engine()?;
        if current != version {
            engine.set_user_version(version)?;
        }
        self.refresh_tables()
    }

    /// Release the engine and forget every known table.
    pub fn close(&mut self) {
        if self.engine.take().is_some() {
            debug!("closed {}", self.name);
        }
        self.tables.borrow_mut().clear();
    }

    /// Fetch a table handle by name.
    ///
    /// A name of the form `"Orders o"` selects the table `Orders` under the alias `o`.
    /// Returns `Ok(None)` when no such table exists.
    ///
    /// # Errors
    /// Will return `Err` if the database is not open.
    pub fn get(&self, table_name: &str) -> Result<Option<Table<'_>>, DatabaseError> {
        let engine = self.engine()?;
        let (name, alias) = match table_name.trim().split_once(' ') {
            Some((name, alias)) => (name.trim(), Some(alias.trim().to_string())),
            None => (table_name.trim(), None),
        };

        if let Some(info) = self.lookup(name) {
            return Ok(Some(Table::new(self, info.name, alias)));
        }

        // the table may have been created after open, through raw sql
        if engine
            .table_names()?
            .iter()
            .any(|known| known.eq_ignore_ascii_case(name))
        {
            self.refresh_tables()?;
            if let Some(info) = self.lookup(name) {
                return Ok(Some(Table::new(self, info.name, alias)));
            }
        }
        Ok(None)
    }

    /// Names of every table in the open database.
    ///
    /// # Errors
    /// Will return `Err` if the database is not open.
    pub fn table_names(&self) -> Result<Vec<String>, DatabaseError> {
        self.engine()?;
        Ok(self
            .tables
            .borrow()
            .iter()
            .map(|info| info.name.clone())
            .collect())
    }

    /// Run a raw query.
    ///
    /// # Errors
    /// Will return `Err` if the database is not open or the engine rejects the query.
    pub fn raw(&self, sql: &str, args: &[Value]) -> Result<RowSet, DatabaseError> {
        self.engine()?.query(sql, args)
    }

    /// Run a raw statement, returning the number of affected rows.
    ///
    /// # Errors
    /// Will return `Err` if the database is not open or the engine rejects the statement.
    pub fn exec_sql(&self, sql: &str, args: &[Value]) -> Result<usize, DatabaseError> {
        let rows = self.engine()?.execute(sql, args)?;
        let lowered = sql.trim_start().to_ascii_lowercase();
        if lowered.starts_with("create") || lowered.starts_with("drop") || lowered.starts_with("alter") {
            self.refresh_tables()?;
        }
        Ok(rows)
    }

    /// # Errors
    /// Will return `Err` if the database is not open.
    pub(crate) fn engine(&self) -> Result<&dyn Engine, DatabaseError> {
        self.engine.as_deref().ok_or(DatabaseError::NotOpen)
    }

    pub(crate) fn refresh_tables(&self) -> Result<(), DatabaseError> {
        let engine = self.engine()?;
        let mut tables = Vec::new();
        for name in engine.table_names()? {
            let columns = engine.column_names(&name)?;
            tables.push(TableInfo { name, columns });
        }
        debug!("{} tables known in {}", tables.len(), self.name);
        *self.tables.borrow_mut() = tables;
        Ok(())
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<TableInfo> {
        self.tables
            .borrow()
            .iter()
            .find(|info| info.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Declare the schema through `migration` and materialize it.
    fn create(&self, migration: &mut impl Migration) {
        let mut modeling = Modeling::default();
        let result = migration
            .on_model_create(self, &mut modeling)
            .and_then(|()| {
                let engine = self.engine()?;
                for statement in modeling.statements(self.config.foreign_key_support()) {
                    engine.execute(&statement, &[])?;
                }
                Ok(())
            });

        if let Err(err) = result {
            migration.on_error(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::testing::{RecordingEngine, Shop, shop_config};

    #[test]
    fn test_not_open() {
        let db = Database::new("closed");
        assert!(matches!(db.get("Customers"), Err(DatabaseError::NotOpen)));
        assert!(matches!(db.raw("SELECT 1", &[]), Err(DatabaseError::NotOpen)));
        assert!(matches!(db.table_names(), Err(DatabaseError::NotOpen)));
    }

    #[test]
    fn test_version_zero_rejected() {
        let mut db = Database::with_config("shop", shop_config(false));
        let err = db.open(0, &mut Shop::default()).unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidArgument(_)));
        assert!(!db.is_open());
    }

    #[test]
    fn test_open_provisions_schema() {
        let mut db = Database::with_config("shop", shop_config(false));
        let mut shop = Shop::default();
        db.open(1, &mut shop).unwrap();

        assert_eq!(shop.created, 1);
        assert_eq!(db.version(), 1);
        assert_eq!(
            db.table_names().unwrap(),
            vec!["Customers".to_string(), "Products".into(), "Orders".into()]
        );
        let orders = db.get("orders").unwrap().unwrap();
        assert_eq!(orders.name(), "Orders");
        assert!(orders.has_column("customerid"));
    }

    #[test]
    fn test_unknown_table_is_none() {
        let mut db = Database::with_config("shop", shop_config(false));
        db.open(1, &mut Shop::default()).unwrap();
        assert!(db.get("Nope").unwrap().is_none());
    }

    #[test]
    fn test_alias() {
        let mut db = Database::with_config("shop", shop_config(false));
        db.open(1, &mut Shop::default()).unwrap();
        let orders = db.get("Orders o").unwrap().unwrap();
        assert_eq!(orders.name(), "Orders");
        assert_eq!(orders.alias(), Some("o"));
    }

    #[test]
    fn test_table_created_after_open() {
        let mut db = Database::with_config("shop", shop_config(false));
        db.open(1, &mut Shop::default()).unwrap();
        db.raw("CREATE TABLE Late(Id INTEGER, Note TEXT)", &[]).unwrap();

        let late = db.get("Late").unwrap().unwrap();
        assert_eq!(late.column_names(), vec!["Id".to_string(), "Note".into()]);
    }

    #[test]
    fn test_reopen_and_upgrade() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::builder()
            .database(
                tabula_common::config::DatabaseConfig::builder()
                    .database_path(dir.path())
                    .build(),
            )
            .build();

        let mut shop = Shop::default();
        let mut db = Database::with_config("shop", config.clone());
        db.open(1, &mut shop).unwrap();
        db.get("Customers")
            .unwrap()
            .unwrap()
            .insert(&["Name", "Address"])
            .values(args!["Pirlo", "Italy"])
            .unwrap();
        // same version, nothing happens
        db.open(1, &mut shop).unwrap();
        db.close();
        assert!(!db.is_open());

        let mut db = Database::with_config("shop", config);
        db.open(1, &mut shop).unwrap();
        assert_eq!(shop.created, 1);
        assert_eq!(db.get("Customers").unwrap().unwrap().count_all().unwrap(), 1);
        db.close();

        db.open(2, &mut shop).unwrap();
        assert_eq!(shop.upgrades, vec![(1, 2)]);
        assert_eq!(db.version(), 2);
        db.close();

        db.open(1, &mut shop).unwrap();
        assert_eq!(shop.downgrades, vec![(2, 1)]);
    }

    #[test]
    fn test_open_existing_keeps_stored_version() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::builder()
            .database(
                tabula_common::config::DatabaseConfig::builder()
                    .database_path(dir.path())
                    .build(),
            )
            .build();

        let mut shop = Shop::default();
        let mut db = Database::with_config("shop", config.clone());
        db.open(3, &mut shop).unwrap();
        db.close();

        let mut db = Database::with_config("shop", config.clone());
        db.open_existing(&mut shop).unwrap();
        assert_eq!(db.version(), 3);
        assert!(db.get("Orders").unwrap().is_some());
        db.close();

        assert_eq!(shop.created, 1);
        assert!(shop.upgrades.is_empty());
        assert!(shop.downgrades.is_empty());
        let stored = Sqlite::open(&config.database_location("shop")).unwrap();
        assert_eq!(stored.user_version().unwrap(), 3);
    }

    #[test]
    fn test_open_existing_provisions_new_database() {
        let mut db = Database::with_config("shop", shop_config(false));
        let mut shop = Shop::default();
        db.open_existing(&mut shop).unwrap();
        assert_eq!(db.version(), 1);
        assert_eq!(shop.created, 1);
        assert_eq!(db.table_names().unwrap().len(), 3);
    }

    #[test]
    fn test_callback_errors_reach_on_error() {
        struct Broken {
            errors: usize,
        }

        impl Migration for Broken {
            fn on_model_create(&mut self, _db: &Database, modeling: &mut Modeling) -> Result<(), DatabaseError> {
                modeling.declare_table("Bad").add_column("Name", "text");
                Err(DatabaseError::InvalidArgument("boom".into()))
            }

            fn on_error(&mut self, _err: DatabaseError) {
                self.errors += 1;
            }
        }

        let mut db = Database::with_config("broken", shop_config(false));
        let mut broken = Broken { errors: 0 };
        db.open(1, &mut broken).unwrap();

        assert_eq!(broken.errors, 1);
        assert!(db.is_open());
        assert!(db.get("Bad").unwrap().is_none());
    }

    #[test]
    fn test_open_engine_with_recording_engine() {
        let engine = RecordingEngine::default();
        let log = engine.log();
        let mut db = Database::with_config("rec", shop_config(false));
        db.open_engine(Box::new(engine), 1, &mut Shop::default()).unwrap();

        let statements = log.borrow();
        assert!(statements[0].0.starts_with("CREATE TABLE Customers("));
        assert!(statements.iter().all(|(sql, _)| !sql.contains("TRIGGER")));
    }

    #[test]
    fn test_foreign_key_enforced() {
        let mut db = Database::with_config("fk", shop_config(true));
        db.open(1, &mut Shop::default()).unwrap();

        let customers = db.get("Customers").unwrap().unwrap();
        let products = db.get("Products").unwrap().unwrap();
        customers.insert(&["Name", "Address"]).values(args!["Baloteli", "Italy"]).unwrap();
        products.insert(&["Name", "Price"]).values(args!["Computer", 1000]).unwrap();

        let cust_id = customers
            .find_id("Name = ?", args!["Baloteli"])
            .unwrap()
            .unwrap();
        let orders = db.get("Orders").unwrap().unwrap();

        let err = orders
            .insert(&["Quantity", "CustomerId", "ProductId"])
            .values(args![10, cust_id, 99999])
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Engine(_)));

        let id = orders
            .insert(&["Quantity", "CustomerId", "ProductId"])
            .values(args![10, cust_id, 1])
            .unwrap();
        assert!(id > 0);
    }
}
