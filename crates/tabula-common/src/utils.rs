use std::path::PathBuf;

/// Fetch the home directory on unix systems via the $HOME env variable.
///
/// Falls back to the current directory when `$HOME` is not set.
#[must_use]
pub fn get_home_dir() -> PathBuf {
    std::env::var("HOME").map_or_else(|_| PathBuf::from("."), PathBuf::from)
}

/// Fetch the data directory for tabula to store database files.
///
/// Defaults to `$XDG_DATA_HOME` or `$HOME/.local/share/tabula` if `$XDG_DATA_HOME` cannot be found.
#[must_use]
pub fn get_data_dir() -> PathBuf {
    let data_dir = std::env::var("XDG_DATA_HOME").map_or_else(
        |_| get_home_dir().join(".local").join("share"),
        PathBuf::from,
    );
    data_dir.join("tabula")
}

/// Fetch the config directory for locating any user set tabula configuration.
///
/// Defaults to `$XDG_CONFIG_HOME` or `$HOME/.config/tabula` if `$XDG_CONFIG_HOME` cannot be found.
#[must_use]
pub fn get_config_dir() -> PathBuf {
    let data_dir = std::env::var("XDG_CONFIG_HOME")
        .map_or_else(|_| get_home_dir().join(".config"), PathBuf::from);
    data_dir.join("tabula")
}
