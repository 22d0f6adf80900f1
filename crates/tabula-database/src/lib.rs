use database::Database;
use tabula_common::config::load_config;

pub mod database;
pub mod entity;
pub mod schema;
pub mod table;

#[cfg(test)]
mod testing;

pub use database::{DatabaseError, Migration};
pub use entity::{Entity, EntityList};
pub use table::Table;

#[must_use]
/// A closed [`Database`] called `name`, configured from the user's config file.
///
/// Falls back to the default configuration when the file is missing or unreadable.
pub fn current_database(name: &str) -> Database {
    let config = load_config().unwrap_or_default();
    Database::with_config(name, config)
}
