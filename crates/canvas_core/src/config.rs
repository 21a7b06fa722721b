use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::models::DEFAULT_MODEL;
use crate::paths;

pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_GATEWAY_URL: &str = "https://gateway.lighthouse.storage/ipfs";
pub const DEFAULT_UPLOAD_URL: &str = "https://node.lighthouse.storage/api/v0/add";

const CONFIG_FILE_PATH: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanvasConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    #[serde(default = "default_upload_url")]
    pub upload_url: String,
    #[serde(default)]
    pub storage_api_key: Option<String>,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_gateway_url() -> String {
    DEFAULT_GATEWAY_URL.to_string()
}

fn default_upload_url() -> String {
    DEFAULT_UPLOAD_URL.to_string()
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: None,
            default_model: default_model(),
            data_dir: None,
            gateway_url: default_gateway_url(),
            upload_url: default_upload_url(),
            storage_api_key: None,
        }
    }
}

impl CanvasConfig {
    /// Load from `~/.branchcanvas/config.json`, else `./config.toml`, then
    /// apply environment overrides.
    pub fn load() -> Self {
        let mut config = Self::from_files(&paths::config_json_path(), Path::new(CONFIG_FILE_PATH));
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    fn from_files(json_path: &Path, toml_path: &Path) -> Self {
        if json_path.exists() {
            match std::fs::read_to_string(json_path)
                .map_err(|e| e.to_string())
                .and_then(|content| {
                    serde_json::from_str::<CanvasConfig>(&content).map_err(|e| e.to_string())
                }) {
                Ok(config) => return config,
                Err(error) => tracing::warn!(
                    path = %json_path.display(),
                    %error,
                    "CanvasConfig: ignoring unreadable config"
                ),
            }
        }

        if toml_path.exists() {
            match std::fs::read_to_string(toml_path)
                .map_err(|e| e.to_string())
                .and_then(|content| {
                    toml::from_str::<CanvasConfig>(&content).map_err(|e| e.to_string())
                }) {
                Ok(config) => return config,
                Err(error) => tracing::warn!(
                    path = %toml_path.display(),
                    %error,
                    "CanvasConfig: ignoring unreadable config"
                ),
            }
        }

        Self::default()
    }

    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(api_base) = lookup("CANVAS_API_BASE") {
            self.api_base = api_base;
        }
        if let Some(api_key) = lookup("CANVAS_API_KEY") {
            self.api_key = Some(api_key);
        }
        if let Some(model) = lookup("CANVAS_MODEL") {
            self.default_model = model;
        }
        if let Some(dir) = lookup("CANVAS_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(url) = lookup("CANVAS_GATEWAY_URL") {
            self.gateway_url = url;
        }
        if let Some(url) = lookup("CANVAS_UPLOAD_URL") {
            self.upload_url = url;
        }
        if let Some(key) = lookup("CANVAS_STORAGE_KEY") {
            self.storage_api_key = Some(key);
        }
    }

    /// Data directory, defaulting to the canvas home directory.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(paths::canvas_dir)
    }
}
