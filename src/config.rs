//! Sitebook configuration.
//!
//! Loaded from `~/.sitebook/config.toml`. A missing file is an empty
//! configuration.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::storage::Storage;

/// Overrides the configured database path.
pub const DATABASE_ENV: &str = "SITEBOOK_DB";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Path to the SQLite database.
    /// Defaults to `~/.sitebook/sitebook.sqlite`.
    pub database: Option<PathBuf>,

    /// Fallback caller identity, used when neither flags nor environment
    /// supply one.
    #[serde(default)]
    pub identity: IdentityConfig,
}

/// The `[identity]` table. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IdentityConfig {
    pub id: Option<i64>,
    pub role: Option<String>,
    pub username: Option<String>,
}

impl Config {
    /// Load config from `~/.sitebook/config.toml`.
    pub fn load() -> Result<Self, String> {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load config from `path`, treating a missing file as empty.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let contents = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(format!("failed to read {}: {e}", path.display())),
        };

        toml::from_str(&contents).map_err(|e| format!("invalid config at {}: {e}", path.display()))
    }

    /// The config file path: `~/.sitebook/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".sitebook").join("config.toml"))
    }

    /// Where the database lives: `SITEBOOK_DB`, then `database`, then the
    /// default under the home directory.
    pub fn database_path(&self) -> Option<PathBuf> {
        if let Ok(path) = env::var(DATABASE_ENV)
            && !path.is_empty()
        {
            return Some(PathBuf::from(path));
        }
        self.database.clone().or_else(Storage::default_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    #[test]
    fn missing_file_is_empty_config() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();

        assert!(config.database.is_none());
        assert!(config.identity.id.is_none());
    }

    #[test]
    fn parses_database_and_identity() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "database = \"/srv/sitebook.sqlite\"\n\n\
             [identity]\nid = 14\nrole = \"re\"\nusername = \"e2\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.database, Some(PathBuf::from("/srv/sitebook.sqlite")));
        assert_eq!(config.identity.id, Some(14));
        assert_eq!(config.identity.role.as_deref(), Some("re"));
        assert_eq!(config.identity.username.as_deref(), Some("e2"));
    }

    #[test]
    fn invalid_file_names_the_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "database = [").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.contains("config.toml"));
    }
}
