//! Configuration file management for mealplan.
//!
//! Provides a TOML-based config file at `~/.config/mealplan/config.toml` and
//! a resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub storage: StorageSection,
    pub user: UserSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StorageSection {
    /// Directory holding `recipes.json`, `history.jsonl`, and the stashed
    /// batch between `plan` and `choose`.
    pub data_dir: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserSection {
    /// Default user id for history-scoped commands.
    pub name: String,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the mealplan config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/mealplan` or
/// `~/.config/mealplan`. We intentionally ignore the platform-specific
/// `dirs::config_dir()` (which returns `~/Library/Application Support` on
/// macOS).
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("mealplan");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("mealplan")
}

/// Return the path to the mealplan config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Default data directory: `$XDG_DATA_HOME/mealplan` or
/// `~/.local/share/mealplan`.
pub fn default_data_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg).join("mealplan");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".local")
        .join("share")
        .join("mealplan")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct MealplanConfig {
    pub data_dir: PathBuf,
    pub user: String,
}

impl MealplanConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config
    /// file > default.
    ///
    /// - Data dir: `cli_data_dir` > `MEALPLAN_DATA_DIR` env >
    ///   `config_file.storage.data_dir` > XDG data dir
    /// - User: `cli_user` > `MEALPLAN_USER` env > `config_file.user.name` >
    ///   `"default"`
    pub fn resolve(cli_data_dir: Option<&str>, cli_user: Option<&str>) -> Result<Self> {
        let file_config = load_config().ok();

        let data_dir = if let Some(dir) = cli_data_dir {
            PathBuf::from(dir)
        } else if let Ok(dir) = std::env::var("MEALPLAN_DATA_DIR") {
            PathBuf::from(dir)
        } else if let Some(ref cfg) = file_config {
            PathBuf::from(&cfg.storage.data_dir)
        } else {
            default_data_dir()
        };

        let user = if let Some(user) = cli_user {
            user.to_string()
        } else if let Ok(user) = std::env::var("MEALPLAN_USER") {
            user
        } else if let Some(ref cfg) = file_config {
            cfg.user.name.clone()
        } else {
            "default".to_string()
        };

        Ok(Self { data_dir, user })
    }

    pub fn recipes_path(&self) -> PathBuf {
        self.data_dir.join("recipes.json")
    }

    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join("history.jsonl")
    }

    pub fn batch_path(&self) -> PathBuf {
        self.data_dir.join("last_batch.json")
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
