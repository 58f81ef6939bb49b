use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl DaemonConfig {
    /// Base URL the client uses to reach the daemon.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.bind_address, self.port)
    }
}

/// How the daemon finds and runs the image generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Interpreter to run the script with.  Looked up on PATH when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python: Option<PathBuf>,
    /// Generator script.  Looked up beside the executable when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<PathBuf>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_model_cache_dir")]
    pub model_cache_dir: PathBuf,
    /// Modules that must import cleanly before the environment counts as ready.
    #[serde(default = "default_required_modules")]
    pub required_modules: Vec<String>,
    /// Seconds between environment probes while not ready.
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathsConfig {
    /// Where "save to desktop" copies images.  Defaults to the user's desktop.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desktop_dir: Option<PathBuf>,
}

impl PathsConfig {
    pub fn resolved_desktop_dir(&self) -> Option<PathBuf> {
        self.desktop_dir.clone().or_else(platform::desktop_dir)
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            python: None,
            script: None,
            output_dir: default_output_dir(),
            model_cache_dir: default_model_cache_dir(),
            required_modules: default_required_modules(),
            probe_interval_secs: default_probe_interval_secs(),
        }
    }
}

fn default_bind_address() -> String {
    platform::DAEMON_HOST.to_string()
}

fn default_port() -> u16 {
    platform::DAEMON_PORT
}

fn default_output_dir() -> PathBuf {
    platform::temp_dir().join("CreatingImage")
}

fn default_model_cache_dir() -> PathBuf {
    platform::cache_dir().join("models")
}

fn default_required_modules() -> Vec<String> {
    ["torch", "transformers", "diffusers", "modelscope"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_probe_interval_secs() -> u64 {
    5
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        tracing::debug!("wrote config to {}", config_path.display());
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}
