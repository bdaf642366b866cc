//! Global taskcal configuration.

use std::path::PathBuf;

use config::{Config, File};
use serde::{Deserialize, Serialize};

use crate::error::{TaskcalError, TaskcalResult};

static DEFAULT_DATA_PATH: &str = "~/.taskcal";
/// Fixed name of the dataset document in the remote store.
static DEFAULT_DOCUMENT_NAME: &str = "taskcal-data.json";
static DEFAULT_SCOPE: &str = "app-files";

fn default_data_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_PATH)
}

fn is_default_data_path(p: &PathBuf) -> bool {
    *p == default_data_path()
}

fn default_document_name() -> String {
    DEFAULT_DOCUMENT_NAME.to_string()
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}

/// Global configuration at ~/.config/taskcal/config.toml
#[derive(Serialize, Deserialize, Clone)]
pub struct TaskcalConfig {
    #[serde(default = "default_data_path", skip_serializing_if = "is_default_data_path")]
    pub data_dir: PathBuf,

    /// Document-store provider to sync with (binary `taskcal-provider-<name>`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    #[serde(default = "default_document_name")]
    pub document_name: String,

    /// Client identifier handed to the provider's sign-in flow.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(default = "default_scope")]
    pub scope: String,
}

impl Default for TaskcalConfig {
    fn default() -> Self {
        TaskcalConfig {
            data_dir: default_data_path(),
            provider: None,
            document_name: default_document_name(),
            client_id: None,
            scope: default_scope(),
        }
    }
}

impl TaskcalConfig {
    pub fn config_path() -> TaskcalResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| TaskcalError::Config("Could not determine config directory".into()))?
            .join("taskcal");

        Ok(config_dir.join("config.toml"))
    }

    pub fn load() -> TaskcalResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        let config: TaskcalConfig = Config::builder()
            .add_source(File::from(config_path).required(false))
            .build()
            .map_err(|e| TaskcalError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| TaskcalError::Config(e.to_string()))?;

        Ok(config)
    }

    /// Where local data lives, with `~` expanded.
    pub fn data_path(&self) -> PathBuf {
        let full_path_str = shellexpand::tilde(&self.data_dir.to_string_lossy()).into_owned();
        PathBuf::from(full_path_str)
    }

    /// Save the current config to ~/.config/taskcal/config.toml
    pub fn save(&self) -> TaskcalResult<()> {
        let config_path = Self::config_path()?;

        let content =
            toml::to_string_pretty(self).map_err(|e| TaskcalError::Config(e.to_string()))?;

        std::fs::write(&config_path, content)
            .map_err(|e| TaskcalError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &std::path::Path) -> TaskcalResult<()> {
        let contents = format!(
            "\
# taskcal configuration

# Where your task data lives:
# data_dir = \"{DEFAULT_DATA_PATH}\"

# Document-store provider for sync (binary taskcal-provider-<name>):
# provider = \"gdrive\"

# Name of the dataset document in the remote store:
# document_name = \"{DEFAULT_DOCUMENT_NAME}\"

# Client identifier for the provider's sign-in flow:
# client_id = \"\"

# Requested access scope:
# scope = \"{DEFAULT_SCOPE}\"
"
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                TaskcalError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| TaskcalError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}
