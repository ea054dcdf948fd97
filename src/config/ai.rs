// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::env;

pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_base_url() -> String {
    GEMINI_API_URL.to_string()
}
fn default_text_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_tts_model() -> String {
    "gemini-2.5-flash-preview-tts".to_string()
}
fn default_voice() -> String {
    "Kore".to_string()
}
fn default_daily_limit() -> u32 {
    200
}
fn default_connect_timeout() -> u64 {
    4
}
fn default_timeout() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Only "gemini" talks to a real backend.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// "ENV" means: read from GEMINI_API_KEY
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_text_model")]
    pub text_model: String,
    #[serde(default = "default_tts_model")]
    pub tts_model: String,
    /// Prebuilt voice: Kore, Puck, Charon, Fenrir, Zephyr.
    #[serde(default = "default_voice")]
    pub voice: String,
    /// Real backend calls allowed per UTC day.
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: default_provider(),
            api_key: default_api_key(),
            base_url: default_base_url(),
            text_model: default_text_model(),
            tts_model: default_tts_model(),
            voice: default_voice(),
            daily_limit: default_daily_limit(),
            connect_timeout_secs: default_connect_timeout(),
            timeout_secs: default_timeout(),
        }
    }
}

impl AiConfig {
    /// Normalize fields and resolve secrets from the environment.
    ///
    /// A missing key is not fatal: the client factory falls back to the
    /// disabled client and logs a warning.
    pub fn resolve(&mut self) {
        self.provider = self.provider.trim().to_lowercase();
        self.base_url = self.base_url.trim_end_matches('/').to_string();

        if let Ok(v) = env::var("AI_ENABLED") {
            self.enabled = matches!(v.trim(), "1" | "true" | "TRUE" | "yes");
        }

        if self.api_key.trim().eq_ignore_ascii_case("env") {
            self.api_key = env::var("GEMINI_API_KEY").unwrap_or_default();
        }

        if self.daily_limit == 0 {
            self.daily_limit = default_daily_limit();
        }
    }

    pub fn has_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}
