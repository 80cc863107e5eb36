use anyhow::Context;
use blockpress_editor::EditorConfig;
use blockpress_model::BlockRegistry;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_CONFIG_NAME: &str = "blockpress.config.json";

/// Blockpress configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Editor tuning (history limit, autosave)
    #[serde(default)]
    pub editor: EditorConfig,

    /// JSON registry merged over the builtin block types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_path: Option<String>,

    /// Where rendered HTML goes
    #[serde(default = "default_out_dir")]
    pub out_dir: String,

    /// Pretty print HTML output
    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

fn default_out_dir() -> String {
    "dist".to_string()
}

fn default_pretty() -> bool {
    true
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("invalid {}", config_path.display()))?;
            Ok(config)
        } else {
            // Return default config if none exists
            Ok(Config::default())
        }
    }

    /// Get absolute path to output directory
    pub fn get_out_dir(&self, cwd: &str) -> PathBuf {
        PathBuf::from(cwd).join(&self.out_dir)
    }

    /// Builtin block types, with the configured registry file merged in
    pub fn load_registry(&self, cwd: &str) -> anyhow::Result<BlockRegistry> {
        let mut registry = BlockRegistry::builtin();
        if let Some(path) = &self.registry_path {
            let path = PathBuf::from(cwd).join(path);
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("cannot read registry {}", path.display()))?;
            registry.merge(BlockRegistry::from_json(&content)?);
        }
        Ok(registry)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            editor: EditorConfig::default(),
            registry_path: None,
            out_dir: default_out_dir(),
            pretty: default_pretty(),
        }
    }
}
