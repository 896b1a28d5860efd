use crate::error::{ChatError, Result};
use crate::error_ext::ResultExt;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const GLOBAL_CONFIG: &str = ".concierge/config.toml";
const LOCAL_CONFIG: &str = ".concierge/config.local.toml";

/// Central configuration for the chat client
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub base_url: String,
    pub send_timeout_ms: u64,
    pub history_timeout_ms: u64,
    pub placeholder_interval_ms: u64,
    pub default_session_title: String,
    pub typing: TypingConfig,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            send_timeout_ms: 120_000,
            history_timeout_ms: 10_000,
            placeholder_interval_ms: 500,
            default_session_title: "New Chat".to_string(),
            typing: TypingConfig::default(),
        }
    }
}

impl ChatConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    pub fn history_timeout(&self) -> Duration {
        Duration::from_millis(self.history_timeout_ms)
    }

    pub fn placeholder_interval(&self) -> Duration {
        Duration::from_millis(self.placeholder_interval_ms.max(1))
    }

    pub fn validate(&self) -> Result<()> {
        if self.send_timeout_ms == 0 || self.history_timeout_ms == 0 {
            return Err(ChatError::Config(
                "send_timeout_ms and history_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.default_session_title.trim().is_empty() {
            return Err(ChatError::Config(
                "default_session_title must not be empty".to_string(),
            ));
        }
        self.typing.validate()
    }
}

/// Pacing of the progressive reply reveal
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct TypingConfig {
    pub min_interval_ms: u64,
    pub max_interval_ms: u64,
    /// Target duration spread over the whole reply before clamping.
    pub pacing_budget_ms: u64,
    pub long_reply_threshold: usize,
    pub long_reply_chunk: usize,
    pub safety_ceiling_ms: u64,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 10,
            max_interval_ms: 30,
            pacing_budget_ms: 2_000,
            long_reply_threshold: 500,
            long_reply_chunk: 3,
            safety_ceiling_ms: 10_000,
        }
    }
}

impl TypingConfig {
    /// Per-tick interval, shorter for longer replies.
    pub fn tick_interval(&self, chars: usize) -> Duration {
        let per_char = self.pacing_budget_ms / chars.max(1) as u64;
        let clamped = per_char
            .max(self.min_interval_ms)
            .min(self.max_interval_ms)
            .max(1);
        Duration::from_millis(clamped)
    }

    pub fn chunk_size(&self, chars: usize) -> usize {
        if chars > self.long_reply_threshold {
            self.long_reply_chunk.max(1)
        } else {
            1
        }
    }

    pub fn safety_ceiling(&self) -> Duration {
        Duration::from_millis(self.safety_ceiling_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.min_interval_ms > self.max_interval_ms {
            return Err(ChatError::Config(format!(
                "typing.min_interval_ms ({}) must not exceed typing.max_interval_ms ({})",
                self.min_interval_ms, self.max_interval_ms
            )));
        }
        if self.long_reply_chunk == 0 {
            return Err(ChatError::Config(
                "typing.long_reply_chunk must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load configuration from the global and workspace-local config files.
/// Local keys override global ones; missing files are skipped.
pub fn load_config(workspace: &Path) -> Result<ChatConfig> {
    let mut paths = Vec::new();
    if let Some(home) = std::env::var_os("HOME") {
        paths.push(PathBuf::from(home).join(GLOBAL_CONFIG));
    }
    paths.push(workspace.join(LOCAL_CONFIG));
    load_config_from(&paths)
}

pub fn load_config_from(paths: &[PathBuf]) -> Result<ChatConfig> {
    let mut merged = toml::Table::new();

    for path in paths {
        if !path.exists() {
            continue;
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let table: toml::Table = toml::from_str(&content)
            .map_err(|e| ChatError::Config(format!("Invalid TOML in {:?}: {}", path, e)))?;
        tracing::debug!(path = %path.display(), "Loaded config file");
        merge_tables(&mut merged, table);
    }

    let config: ChatConfig = toml::Value::Table(merged)
        .try_into()
        .map_err(|e| ChatError::Config(format!("Invalid configuration: {}", e)))?;
    config.validate()?;
    Ok(config)
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        if let toml::Value::Table(nested) = value {
            if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                merge_tables(existing, nested);
                continue;
            }
            base.insert(key, toml::Value::Table(nested));
        } else {
            base.insert(key, value);
        }
    }
}
