use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Editor tuning knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    /// Maximum number of undo snapshots kept
    pub history_limit: usize,

    /// Seconds of inactivity before an autosave fires
    pub autosave_delay_secs: u64,

    pub autosave_enabled: bool,
}

impl EditorConfig {
    pub fn autosave_delay(&self) -> Duration {
        Duration::from_secs(self.autosave_delay_secs)
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: 50,
            autosave_delay_secs: 30,
            autosave_enabled: true,
        }
    }
}
