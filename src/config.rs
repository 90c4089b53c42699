//! Runtime configuration for mock-openai.
//!
//! Configuration is loaded from a JSON file or constructed programmatically.
//! All pacing knobs for the streaming emulator live here.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "mock-openai", about = "Mock OpenAI-compatible chat completion server")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// HTTP listen address. Overrides `server.listen` from the config file.
    #[arg(long)]
    pub listen: Option<String>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub json_logs: bool,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,

    /// Streaming emulator settings.
    pub streaming: StreamingConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address (e.g. "0.0.0.0:8080").
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Pacing of streamed completions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Delay after each role/content unit before the next one, in milliseconds.
    pub char_delay_ms: u64,

    /// Emit a `{role: "assistant"}` delta before the first content unit.
    pub announce_role: bool,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            char_delay_ms: 50,
            announce_role: true,
        }
    }
}

impl StreamingConfig {
    pub fn char_delay(&self) -> Duration {
        Duration::from_millis(self.char_delay_ms)
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults for missing fields.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&data)?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Resolve the listen address, letting the CLI win over the config file.
    pub fn listen_addr(&self, cli: &Cli) -> String {
        cli.listen
            .clone()
            .unwrap_or_else(|| self.server.listen.clone())
    }
}
