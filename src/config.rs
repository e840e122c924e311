use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub webrtc: WebRtcConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Path prefix for the exchange endpoints
    #[serde(default = "default_meeting_path")]
    pub meeting_path: String,
    /// Largest accepted publish body in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Settings handed to the meeting page, never used by the relay itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebRtcConfig {
    /// STUN servers for the participants' RTCPeerConnection
    #[serde(default = "default_stun_servers")]
    pub stun_servers: Vec<String>,
    /// How often the page polls for the counterpart's description
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_bind_address() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_meeting_path() -> String {
    "/meet".to_string()
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

fn default_stun_servers() -> Vec<String> {
    vec![
        "stun:stun.l.google.com:19302".to_string(),
        "stun:stun.cloudflare.com:3478".to_string(),
    ]
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            meeting_path: default_meeting_path(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for WebRtcConfig {
    fn default() -> Self {
        Self {
            stun_servers: default_stun_servers(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load config from ~/.tandem/config.toml, or create default if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(get_config_path())
    }

    /// Load config from `path`, writing the default there if the file is missing
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            let config = Config::default();
            config.save_to(path)?;
            config
        };

        config.validate()?;
        Ok(config)
    }

    /// Save config to file
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let path = &self.server.meeting_path;
        if !path.starts_with('/') || path.len() < 2 || path.ends_with('/') {
            bail!("server.meeting_path must look like /name, got {:?}", path);
        }
        if path == "/api" || path.starts_with("/api/") {
            bail!("server.meeting_path must not live under /api");
        }
        if self.server.max_body_bytes == 0 {
            bail!("server.max_body_bytes must be positive");
        }
        if self.webrtc.poll_interval_ms == 0 {
            bail!("webrtc.poll_interval_ms must be positive");
        }
        Ok(())
    }
}

/// Get the tandem directory (~/.tandem)
pub fn get_tandem_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tandem")
}

/// Get the config file path (~/.tandem/config.toml)
pub fn get_config_path() -> PathBuf {
    get_tandem_dir().join("config.toml")
}
