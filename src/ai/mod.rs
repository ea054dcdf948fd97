//! AI backend: client abstraction, providers and a daily call limit.

pub mod gemini;

use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{NaiveDate, Utc};
use metrics::counter;
use tracing::{info, warn};

use crate::config::AiConfig;
use crate::parse;
use crate::types::Source;

pub use gemini::GeminiProvider;

/// Text of a search-grounded answer plus the grounding links.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroundedText {
    pub text: String,
    pub sources: Vec<Source>,
}

/// One method per backend call the dashboard makes.
#[async_trait]
pub trait AiClient: Send + Sync {
    /// Text generation with web-search grounding enabled.
    async fn search_grounded(&self, prompt: &str) -> Result<GroundedText>;
    /// Plain text generation.
    async fn generate_text(&self, prompt: &str) -> Result<String>;
    /// Base64 raw PCM for `text`, `None` when the response carried no audio.
    async fn synthesize_speech(&self, text: &str) -> Result<Option<String>>;
    /// Provider name for diagnostics/logs.
    fn provider_name(&self) -> &'static str;
}

pub type DynAiClient = Arc<dyn AiClient>;

/// Factory: build a client according to config and environment variables.
///
/// * `AI_TEST_MODE=mock` returns the deterministic mock behind the daily limit.
/// * `AI_TEST_MODE=error` returns a client whose every call fails.
/// * Else disabled config, a missing key, or an unknown provider give [`DisabledClient`].
/// * Else the Gemini provider wrapped with the daily limit.
pub fn build_client_from_config(config: &AiConfig) -> DynAiClient {
    match std::env::var("AI_TEST_MODE").as_deref() {
        Ok("mock") => {
            return Arc::new(LimitedClient::new(MockProvider::default(), config.daily_limit));
        }
        Ok("error") => return Arc::new(FailingProvider),
        _ => {}
    }

    if !config.enabled {
        info!("AI backend disabled by config");
        return Arc::new(DisabledClient);
    }

    match config.provider.as_str() {
        "gemini" => {
            if !config.has_key() {
                warn!("GEMINI_API_KEY missing; AI backend disabled");
                return Arc::new(DisabledClient);
            }
            match GeminiProvider::new(config) {
                Ok(p) => {
                    info!(
                        text_model = %config.text_model,
                        tts_model = %config.tts_model,
                        daily_limit = config.daily_limit,
                        "gemini client ready"
                    );
                    Arc::new(LimitedClient::new(p, config.daily_limit))
                }
                Err(e) => {
                    warn!(error = ?e, "failed to build gemini client; AI backend disabled");
                    Arc::new(DisabledClient)
                }
            }
        }
        other => {
            warn!(provider = other, "unsupported AI provider; AI backend disabled");
            Arc::new(DisabledClient)
        }
    }
}

// ------------------------------------------------------------
// Stand-in providers
// ------------------------------------------------------------

/// Fails every call; used when AI is disabled or unconfigured.
pub struct DisabledClient;

#[async_trait]
impl AiClient for DisabledClient {
    async fn search_grounded(&self, _prompt: &str) -> Result<GroundedText> {
        bail!("AI backend disabled")
    }
    async fn generate_text(&self, _prompt: &str) -> Result<String> {
        bail!("AI backend disabled")
    }
    async fn synthesize_speech(&self, _text: &str) -> Result<Option<String>> {
        bail!("AI backend disabled")
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Simulates a provider outage.
pub struct FailingProvider;

#[async_trait]
impl AiClient for FailingProvider {
    async fn search_grounded(&self, _prompt: &str) -> Result<GroundedText> {
        bail!("simulated provider error")
    }
    async fn generate_text(&self, _prompt: &str) -> Result<String> {
        bail!("simulated provider error")
    }
    async fn synthesize_speech(&self, _text: &str) -> Result<Option<String>> {
        bail!("simulated provider error")
    }
    fn provider_name(&self) -> &'static str {
        "error"
    }
}

pub const MOCK_TRENDS_TEXT: &str = "Here are today's top stories.

### ITEM
Headline: Open-weight model tops coding benchmark
Summary: A new open model beat closed rivals on agentic coding. Developers on X are sharing side-by-side demos.
Hashtags: #OpenSource, #AI, #LLM
Score: 88

### ITEM
Headline: Chipmaker unveils 2nm roadmap
Summary: The company promised volume production next year.
Hashtags: Semiconductors, Chips
Score: 72

### ITEM
Summary: A segment the model forgot to title.
Score: 99

### ITEM
Headline: Browser ships on-device translation
Hashtags: Privacy, WebDev, Browsers
Score: unknown
";

/// Deterministic provider for tests and local runs.
#[derive(Clone)]
pub struct MockProvider {
    pub trends_text: String,
    pub sources: Vec<Source>,
    /// Little-endian 16-bit samples returned as speech.
    pub speech_samples: Vec<i16>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            trends_text: MOCK_TRENDS_TEXT.to_string(),
            sources: vec![
                Source {
                    title: "Tech Daily".into(),
                    uri: "https://news.example.com/a".into(),
                },
                Source {
                    title: "Reddit r/technology".into(),
                    uri: "https://reddit.example.com/b".into(),
                },
                Source {
                    title: "Threads post".into(),
                    uri: "https://threads.example.com/c".into(),
                },
            ],
            speech_samples: vec![0, 8192, 16384, 8192, 0, -8192, -16384, -8192],
        }
    }
}

#[async_trait]
impl AiClient for MockProvider {
    async fn search_grounded(&self, _prompt: &str) -> Result<GroundedText> {
        Ok(GroundedText {
            text: self.trends_text.clone(),
            sources: self.sources.clone(),
        })
    }

    async fn generate_text(&self, prompt: &str) -> Result<String> {
        let headline = parse::parse_segment(prompt)
            .map(|f| f.headline)
            .unwrap_or_else(|| "untitled".to_string());
        Ok(format!("[Visual: title card]\nMock draft about {headline}."))
    }

    async fn synthesize_speech(&self, text: &str) -> Result<Option<String>> {
        if text.is_empty() {
            return Ok(None);
        }
        let bytes: Vec<u8> = self
            .speech_samples
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        Ok(Some(STANDARD.encode(bytes)))
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Daily limit wrapper
// ------------------------------------------------------------

#[derive(Debug, Clone)]
struct DailyCounter {
    date: NaiveDate,
    count: u32,
}

impl DailyCounter {
    fn today() -> Self {
        Self {
            date: Utc::now().date_naive(),
            count: 0,
        }
    }

    fn roll_over(&mut self) {
        let today = Utc::now().date_naive();
        if self.date != today {
            self.date = today;
            self.count = 0;
        }
    }
}

/// Caps successful backend calls per UTC day. Counter lives in memory only.
pub struct LimitedClient<C: AiClient> {
    inner: C,
    daily_limit_max: u32,
    counter: Mutex<DailyCounter>,
}

impl<C: AiClient> LimitedClient<C> {
    pub fn new(inner: C, daily_limit_max: u32) -> Self {
        Self {
            inner,
            daily_limit_max,
            counter: Mutex::new(DailyCounter::today()),
        }
    }

    pub fn used_today(&self) -> u32 {
        let mut g = self.counter.lock().expect("poisoned counter");
        g.roll_over();
        g.count
    }

    fn check(&self) -> Result<()> {
        let mut g = self.counter.lock().expect("poisoned counter");
        g.roll_over();
        if g.count >= self.daily_limit_max {
            counter!("ai_limit_rejections_total").increment(1);
            bail!("daily AI call limit reached ({})", self.daily_limit_max);
        }
        Ok(())
    }

    fn record(&self) {
        let mut g = self.counter.lock().expect("poisoned counter");
        g.count = g.count.saturating_add(1);
    }
}

#[async_trait]
impl<C: AiClient> AiClient for LimitedClient<C> {
    async fn search_grounded(&self, prompt: &str) -> Result<GroundedText> {
        self.check()?;
        let out = self.inner.search_grounded(prompt).await?;
        self.record();
        Ok(out)
    }

    async fn generate_text(&self, prompt: &str) -> Result<String> {
        self.check()?;
        let out = self.inner.generate_text(prompt).await?;
        self.record();
        Ok(out)
    }

    async fn synthesize_speech(&self, text: &str) -> Result<Option<String>> {
        self.check()?;
        let out = self.inner.synthesize_speech(text).await?;
        self.record();
        Ok(out)
    }

    fn provider_name(&self) -> &'static str {
        self.inner.provider_name()
    }
}
