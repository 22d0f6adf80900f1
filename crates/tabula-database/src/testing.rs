use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tabula_common::config::{Config, DatabaseConfig, MEMORY_DATABASE};
use typed_builder::TypedBuilder;

use crate::args;
use crate::database::engine::{Engine, RowSet};
use crate::database::value::Value;
use crate::database::{Database, DatabaseError, Migration};
use crate::entity::{Entity, EntityMapper};
use crate::schema::Modeling;

pub type StatementLog = Rc<RefCell<Vec<(String, Vec<Value>)>>>;

/// Engine that records every statement instead of running it.
///
/// Tables are tracked from the `CREATE TABLE` statements it sees, so a session opened over
/// it can hand out table handles.
#[derive(Default)]
pub struct RecordingEngine {
    log: StatementLog,
    tables: RefCell<Vec<(String, Vec<String>)>>,
    version: Cell<u32>,
}

impl RecordingEngine {
    pub fn log(&self) -> StatementLog {
        Rc::clone(&self.log)
    }

    fn record(&self, sql: &str, params: &[Value]) {
        self.log.borrow_mut().push((sql.to_string(), params.to_vec()));

        let Some(rest) = sql.strip_prefix("CREATE TABLE ") else {
            return;
        };
        let Some((name, columns)) = rest.split_once('(') else {
            return;
        };
        let columns = columns
            .trim_end_matches(')')
            .split(',')
            .filter_map(|column| column.split_whitespace().next())
            .map(String::from)
            .collect();
        self.tables.borrow_mut().push((name.trim().to_string(), columns));
    }
}

impl Engine for RecordingEngine {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<usize, DatabaseError> {
        self.record(sql, params);
        Ok(0)
    }

    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64, DatabaseError> {
        self.record(sql, params);
        Ok(1)
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<RowSet, DatabaseError> {
        self.record(sql, params);
        Ok(RowSet::default())
    }

    fn table_names(&self) -> Result<Vec<String>, DatabaseError> {
        Ok(self.tables.borrow().iter().map(|(name, _)| name.clone()).collect())
    }

    fn column_names(&self, table: &str) -> Result<Vec<String>, DatabaseError> {
        Ok(self
            .tables
            .borrow()
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(table))
            .map(|(_, columns)| columns.clone())
            .unwrap_or_default())
    }

    fn user_version(&self) -> Result<u32, DatabaseError> {
        Ok(self.version.get())
    }

    fn set_user_version(&self, version: u32) -> Result<(), DatabaseError> {
        self.version.set(version);
        Ok(())
    }

    fn set_foreign_keys(&self, _enabled: bool) -> Result<(), DatabaseError> {
        Ok(())
    }
}

/// Customers, products and the orders linking them.
#[derive(Default)]
pub struct Shop {
    pub created: usize,
    pub upgrades: Vec<(u32, u32)>,
    pub downgrades: Vec<(u32, u32)>,
}

impl Migration for Shop {
    fn on_model_create(&mut self, _db: &Database, modeling: &mut Modeling) -> Result<(), DatabaseError> {
        self.created += 1;
        modeling
            .declare_table("Customers")
            .add_primary_key("Id")
            .add_column("Name", "Text")
            .add_column("Address", "Text")
            .add_index(&["Name"]);
        modeling
            .declare_table("Products")
            .add_primary_key("Id")
            .add_column("Name", "text")
            .add_column("Price", "INTEGER")
            .add_index(&["Name"]);
        modeling
            .declare_table("Orders")
            .add_primary_key("Id")
            .add_column("Quantity", "Integer")
            .add_column("CustomerId", "Integer")
            .add_column("ProductId", "Integer")
            .add_index(&["CustomerId"])
            .add_index(&["ProductId"])
            .add_foreign_key("CustomerId", "Customers", "Id")
            .add_foreign_key("ProductId", "Products", "Id");
        Ok(())
    }

    fn on_upgrade(&mut self, _db: &Database, old: u32, new: u32) -> Result<bool, DatabaseError> {
        self.upgrades.push((old, new));
        Ok(false)
    }

    fn on_downgrade(&mut self, _db: &Database, old: u32, new: u32) -> Result<bool, DatabaseError> {
        self.downgrades.push((old, new));
        Ok(false)
    }
}

pub fn shop_config(foreign_key_support: bool) -> Config {
    Config::builder()
        .database(
            DatabaseConfig::builder()
                .database_file(MEMORY_DATABASE)
                .foreign_key_support(foreign_key_support)
                .build(),
        )
        .build()
}

/// In-memory sqlite shop at version 1.
pub fn open_shop() -> Database {
    let mut db = Database::with_config("shop", shop_config(false));
    db.open(1, &mut Shop::default()).unwrap();
    db
}

/// Shop opened over a [`RecordingEngine`], with the provisioning statements already cleared.
pub fn recording_shop() -> (Database, StatementLog) {
    let engine = RecordingEngine::default();
    let log = engine.log();
    let mut db = Database::with_config("shop", shop_config(false));
    db.open_engine(Box::new(engine), 1, &mut Shop::default()).unwrap();
    log.borrow_mut().clear();
    (db, log)
}

pub fn seed_customers(db: &Database) {
    let customers = db.get("Customers").unwrap().unwrap();
    for (name, address) in [("Baloteli", "Italy"), ("Pirlo", "Italy")] {
        customers
            .insert(&["Name", "Address"])
            .values(args![name, address])
            .unwrap();
    }
}

/// Customers 1 and 2, product 1, and three orders: 10 and 3 for customer 1, 20 for customer 2.
pub fn seed_orders(db: &Database) {
    seed_customers(db);
    db.get("Products")
        .unwrap()
        .unwrap()
        .insert(&["Name", "Price"])
        .values(args!["Computer", 1000])
        .unwrap();

    let orders = db.get("Orders").unwrap().unwrap();
    for (quantity, customer) in [(10, 1), (20, 2), (3, 1)] {
        orders
            .insert(&["Quantity", "CustomerId", "ProductId"])
            .values(args![quantity, customer, 1])
            .unwrap();
    }
}

#[derive(Debug, Clone, PartialEq, Default, TypedBuilder)]
pub struct Customer {
    #[builder(default)]
    pub id: i64,

    #[builder(setter(into))]
    pub name: String,

    #[builder(default)]
    pub address: Option<String>,

    /// Not bound to any column.
    #[builder(default)]
    pub marker: u32,
}

impl Entity for Customer {
    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn map<'a>(&'a mut self, mapper: &mut EntityMapper<'a>) {
        mapper
            .bind("Id", &mut self.id)
            .bind("Name", &mut self.name)
            .bind("Address", &mut self.address);
    }
}
