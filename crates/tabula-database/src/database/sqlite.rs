use std::fs;
use std::path::Path;

use log::debug;
use rusqlite::{Connection, OpenFlags, params_from_iter};
use tabula_common::config::MEMORY_DATABASE;

use super::DatabaseError;
use super::engine::{Engine, RowSet};
use super::value::Value;

/// Sqlite engine wrapper using rusqlite
pub struct Sqlite {
    pub conn: Connection,
}

impl Sqlite {
    const SQL_TABLE_NAMES: &str =
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY rowid";

    /// Opens the database file at `path`, creating it (and its directory) when missing.
    ///
    /// A `path` of `:memory:` opens a private in-memory database.
    ///
    /// # Errors
    /// Will return `Err` if the directory cannot be created or sqlite cannot open the file.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if path == Path::new(MEMORY_DATABASE) {
            return Self::memory();
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            conn: get_connection(path)?,
        })
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    /// Will return `Err` if sqlite cannot allocate the database.
    pub fn memory() -> Result<Self, DatabaseError> {
        debug!("Opened {MEMORY_DATABASE}");
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }
}

impl Engine for Sqlite {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<usize, DatabaseError> {
        debug!("execute: {sql} {params:?}");
        let rows = self.conn.execute(sql, params_from_iter(params.iter()))?;
        Ok(rows)
    }

    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64, DatabaseError> {
        debug!("insert: {sql} {params:?}");
        let mut stmt = self.conn.prepare(sql)?;
        let row_id = stmt.insert(params_from_iter(params.iter()))?;
        Ok(row_id)
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<RowSet, DatabaseError> {
        debug!("query: {sql} {params:?}");
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();
        let count = columns.len();

        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut buffered = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(count);
            for idx in 0..count {
                values.push(Value::from(row.get_ref(idx)?));
            }
            buffered.push(values);
        }

        Ok(RowSet::new(columns, buffered))
    }

    fn table_names(&self) -> Result<Vec<String>, DatabaseError> {
        let mut stmt = self.conn.prepare(Sqlite::SQL_TABLE_NAMES)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn column_names(&self, table: &str) -> Result<Vec<String>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
        let names = stmt
            .query_map([table], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn user_version(&self) -> Result<u32, DatabaseError> {
        let version: u32 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;
        Ok(version)
    }

    fn set_user_version(&self, version: u32) -> Result<(), DatabaseError> {
        debug!("set_user_version: {version}");
        self.conn.pragma_update(None, "user_version", version)?;
        Ok(())
    }

    fn set_foreign_keys(&self, enabled: bool) -> Result<(), DatabaseError> {
        debug!("set_foreign_keys: {enabled}");
        self.conn.pragma_update(None, "foreign_keys", enabled)?;
        Ok(())
    }
}

/// Attempt to open a connection to `path`.
///
/// Will initially try to open as RW, but if the file does not exist, this method will also
/// take care of creating the new database file. Provisioning the schema is left to the
/// session that owns the engine.
///
/// * `path`: Full path to the sqlite database file.
fn get_connection(path: &Path) -> Result<Connection, DatabaseError> {
    match Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE) {
        Ok(connection) => {
            debug!("Opened {}", path.display());
            Ok(connection)
        }
        Err(err) => {
            debug!("Could not open {}: {err}", path.display());
            let connection = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
            )?;
            debug!("Created {}", path.display());
            Ok(connection)
        }
    }
}
