// File: src/config.rs
// Purpose: Configuration parsing from trailhead.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use trailhead_router::RoutesOptions;

/// Default configuration file name
pub const CONFIG_FILE: &str = "trailhead.toml";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub project: ProjectConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub dev: DevConfig,
}

/// Project metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_version")]
    pub version: String,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

/// Routing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Directory holding route files (default: "app")
    #[serde(default = "default_app_dir")]
    pub app_dir: String,

    /// Rewrites, redirects and build flags
    #[serde(flatten)]
    pub options: RoutesOptions,
}

/// Build configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Export output; the manifest lives at `<output_dir>/_trailhead/routes.json`
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

/// Development configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevConfig {
    /// Render diagnostic error pages instead of bare 500s
    #[serde(default = "default_false")]
    pub enabled: bool,

    /// Filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default values
fn default_name() -> String {
    "trailhead-app".to_string()
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_app_dir() -> String {
    "app".to_string()
}

fn default_output_dir() -> String {
    "dist".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_false() -> bool {
    false
}

// Default implementations
impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            version: default_version(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            app_dir: default_app_dir(),
            options: RoutesOptions::default(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a trailhead.toml
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Missing file means defaults
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Load ./trailhead.toml, then apply `.env` and process environment overrides
    pub fn load_default() -> Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::load(CONFIG_FILE)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Applies `TRAILHEAD_PORT` and `TRAILHEAD_DEV` from `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(port) = lookup("TRAILHEAD_PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("TRAILHEAD_PORT is not a port number: {port:?}"))?;
        }

        if let Some(dev) = lookup("TRAILHEAD_DEV") {
            self.dev.enabled = matches!(dev.trim(), "1" | "true" | "yes" | "on");
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn manifest_path(&self) -> PathBuf {
        Path::new(&self.build.output_dir)
            .join("_trailhead")
            .join("routes.json")
    }
}
