//! Application configuration: `config/app.toml` plus environment overrides.
//!
//! Lookup order for the file:
//! 1) `$APP_CONFIG_PATH`
//! 2) `config/app.toml`
//! 3) built-in defaults

pub mod ai;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::audio::{PcmFormat, SPEECH_CHANNELS, SPEECH_SAMPLE_RATE};
use crate::parse::DEFAULT_SOURCES_PER_ITEM;
use crate::prompts::DEFAULT_ITEMS_PER_FETCH;

pub use ai::AiConfig;

pub const ENV_CONFIG_PATH: &str = "APP_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/app.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendSettings {
    #[serde(default = "default_items")]
    pub items_per_fetch: usize,
    #[serde(default = "default_sources_per_item")]
    pub sources_per_item: usize,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_channels")]
    pub channels: u16,
}

fn default_items() -> usize {
    DEFAULT_ITEMS_PER_FETCH
}
fn default_sources_per_item() -> usize {
    DEFAULT_SOURCES_PER_ITEM
}
fn default_sample_rate() -> u32 {
    SPEECH_SAMPLE_RATE
}
fn default_channels() -> u16 {
    SPEECH_CHANNELS
}

impl Default for TrendSettings {
    fn default() -> Self {
        Self {
            items_per_fetch: default_items(),
            sources_per_item: default_sources_per_item(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
        }
    }
}

impl TrendSettings {
    pub fn pcm_format(&self) -> PcmFormat {
        PcmFormat {
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }

    fn sanitize(&mut self) {
        if self.items_per_fetch == 0 {
            self.items_per_fetch = default_items();
        }
        if self.channels == 0 {
            self.channels = default_channels();
        }
        if self.sample_rate == 0 {
            self.sample_rate = default_sample_rate();
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub trends: TrendSettings,
}

impl AppConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let mut cfg = Self::from_toml_str(&data)
            .with_context(|| format!("parsing config {}", path.display()))?;
        cfg.finish();
        Ok(cfg)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Env path, then the default path, then defaults.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from_file(&pb);
        }
        let default = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default.exists() {
            return Self::load_from_file(&default);
        }
        let mut cfg = Self::default();
        cfg.finish();
        Ok(cfg)
    }

    fn finish(&mut self) {
        self.ai.resolve();
        self.trends.sanitize();
    }
}
