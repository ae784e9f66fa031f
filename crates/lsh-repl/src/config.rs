//! Configuration for the linux-shell REPL.
//!
//! Configuration is loaded from `~/.config/linux-shell/config.toml`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use lsh_kernel::{KernelConfig, DEFAULT_SHELL_NAME};
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "linux-shell";

/// Configuration for the interactive shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Shell name, used as the prefix of every diagnostic.
    #[serde(default = "default_name")]
    pub name: String,

    /// Prompt printed before each line.
    #[serde(default = "default_prompt")]
    pub prompt: String,

    /// Whether to load and save line history.
    #[serde(default = "default_history")]
    pub history: bool,

    /// History file. Defaults to `<data dir>/linux-shell/history.txt`.
    #[serde(default)]
    pub history_file: Option<PathBuf>,
}

fn default_name() -> String {
    DEFAULT_SHELL_NAME.to_string()
}

fn default_prompt() -> String {
    "$$ linux-shell ## ".to_string()
}

fn default_history() -> bool {
    true
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            prompt: default_prompt(),
            history: default_history(),
            history_file: None,
        }
    }
}

impl ShellConfig {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self> {
        let path = match Self::config_path() {
            Some(path) => path,
            None => {
                tracing::debug!("No config directory, using defaults");
                return Ok(Self::default());
            }
        };

        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Get the default config file path.
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Where history is kept, or `None` when history is disabled.
    pub fn history_path(&self) -> Option<PathBuf> {
        if !self.history {
            return None;
        }
        self.history_file.clone().or_else(|| {
            ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.data_dir().join("history.txt"))
        })
    }

    /// Kernel configuration derived from this shell configuration.
    pub fn kernel_config(&self) -> KernelConfig {
        KernelConfig::named(&self.name)
    }
}
