use std::path::{Path, PathBuf};

use serde::Deserialize;
use typed_builder::TypedBuilder;

use crate::utils::{get_config_dir, get_data_dir};
use log::debug;

/// Primary key column name used when the configuration does not name one.
pub const DEFAULT_ID_COLUMN: &str = "Id";

/// Database file name that opens a private in-memory database.
pub const MEMORY_DATABASE: &str = ":memory:";

/// Represents the main application configuration structure.
///
/// Holds settings related to different parts of the application.
#[derive(Deserialize, Debug, Default, Clone, TypedBuilder)]
pub struct Config {
    #[serde(default)]
    #[builder(default)]
    pub database: DatabaseConfig,
}

/// Configuration settings specific to the database.
///
/// * `database_path`: directory holding database files, defaults to the data dir.
/// * `database_file`: file name, defaults to `<name>.db`; `:memory:` stays in memory.
/// * `id_naming_convention`: name of the primary key column on every table.
/// * `foreign_key_support`: whether declared foreign keys are enforced.
#[derive(Deserialize, Debug, Default, Clone, TypedBuilder)]
pub struct DatabaseConfig {
    #[serde(default)]
    #[builder(default, setter(strip_option, into))]
    pub database_path: Option<PathBuf>,

    #[serde(default)]
    #[builder(default, setter(strip_option, into))]
    pub database_file: Option<String>,

    #[serde(default)]
    #[builder(default, setter(strip_option, into))]
    pub id_naming_convention: Option<String>,

    #[serde(default)]
    #[builder(default)]
    pub foreign_key_support: bool,
}

impl Config {
    /// Name of the primary key column.
    #[must_use]
    pub fn id_column(&self) -> &str {
        self.database
            .id_naming_convention
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(DEFAULT_ID_COLUMN)
    }

    /// Whether declared foreign keys are enforced.
    #[must_use]
    pub fn foreign_key_support(&self) -> bool {
        self.database.foreign_key_support
    }

    pub fn set_foreign_key_support(&mut self, enabled: bool) {
        self.database.foreign_key_support = enabled;
    }

    /// Location of the database file for a database called `name`.
    ///
    /// Returns `:memory:` unchanged when the configuration asks for an in-memory database.
    #[must_use]
    pub fn database_location(&self, name: &str) -> PathBuf {
        let file = self
            .database
            .database_file
            .clone()
            .unwrap_or_else(|| format!("{name}.db"));
        if file == MEMORY_DATABASE {
            return PathBuf::from(MEMORY_DATABASE);
        }

        let dir = self
            .database
            .database_path
            .clone()
            .unwrap_or_else(get_data_dir);
        dir.join(file)
    }
}

/// Loads the application configuration from a `config.toml` file.
///
/// The configuration file is expected to be located in the platform-specific
/// configuration directory retrieved via `get_config_dir()`.
/// If the configuration file is not found at the expected path, a default
/// `Config` instance is returned.
///
/// # Errors
/// - `Err(Box<dyn std::error::Error>)`: An error occurred during file reading or TOML parsing.
pub fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    load_config_from(&get_config_dir().join("config.toml"))
}

/// Loads the configuration from an explicit `config_path`.
///
/// # Errors
/// Will return `Err` if the file exists but cannot be read or parsed.
pub fn load_config_from(config_path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    let config_str = if config_path.exists() {
        std::fs::read_to_string(config_path)?
    } else {
        debug!("Could not find config at supported paths, using default config.");
        return Ok(Config::default());
    };

    debug!("loading config from {}", config_path.display());
    let config: Config = toml::from_str(&config_str)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.id_column(), "Id");
        assert!(!config.foreign_key_support());
    }

    #[test]
    fn test_parse_toml() {
        let config: Config = toml::from_str(concat!(
            "[database]\n",
            "database_file = \":memory:\"\n",
            "id_naming_convention = \"_id\"\n",
            "foreign_key_support = true\n",
        ))
        .unwrap();

        assert_eq!(config.id_column(), "_id");
        assert!(config.foreign_key_support());
        assert_eq!(config.database_location("app"), PathBuf::from(":memory:"));
    }

    #[test]
    fn test_blank_id_convention_falls_back() {
        let config = Config::builder()
            .database(DatabaseConfig::builder().id_naming_convention("  ").build())
            .build();
        assert_eq!(config.id_column(), DEFAULT_ID_COLUMN);
    }

    #[test]
    fn test_database_location() {
        let config = Config::builder()
            .database(DatabaseConfig::builder().database_path("/tmp/dbs").build())
            .build();
        assert_eq!(
            config.database_location("shop"),
            PathBuf::from("/tmp/dbs/shop.db")
        );
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = load_config_from(Path::new("/definitely/not/here/config.toml")).unwrap();
        assert!(config.database.database_file.is_none());
    }
}
