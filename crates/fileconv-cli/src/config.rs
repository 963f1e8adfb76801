//! Configuration file support.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Main configuration structure.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default CLI options.
    pub defaults: Defaults,
    /// Extra spellings for file types, e.g. `mdown = "md"`.
    pub aliases: HashMap<String, String>,
}

/// Default CLI options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Enable verbose output by default.
    pub verbose: bool,
    /// Enable quiet output by default.
    pub quiet: bool,
    /// Log level when neither flags nor `RUST_LOG` set one.
    pub log_level: Option<String>,
    /// Emit logs as JSON lines.
    pub json_logs: bool,
    /// Check input types against file content.
    pub sniff_content: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            verbose: false,
            quiet: false,
            log_level: None,
            json_logs: false,
            sniff_content: true,
        }
    }
}

impl Config {
    /// Load config from a specific path. A missing file yields defaults.
    pub fn load_from_path(path: Option<PathBuf>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Get the default config file path.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("fileconv").join("config.toml"))
    }

    /// Map a user-supplied type name onto a catalog suffix.
    ///
    /// User aliases win over built-in ones; anything unknown passes through
    /// for the catalog to judge.
    pub fn resolve_type(&self, name: &str) -> String {
        let key = name.trim().trim_start_matches('.').to_lowercase();
        if let Some(target) = self.aliases.get(&key) {
            return target.clone();
        }
        builtin_alias(&key).map(str::to_string).unwrap_or(key)
    }
}

/// Type names people reach for that aren't suffixes.
fn builtin_alias(name: &str) -> Option<&'static str> {
    match name {
        "text" | "plain" => Some("txt"),
        "markdown" => Some("md"),
        "excel" | "spreadsheet" => Some("xlsx"),
        "image" => Some("png"),
        "video" => Some("mp4"),
        "tif" => Some("tiff"),
        _ => None,
    }
}
