use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AiClient, GroundedText};
use crate::config::AiConfig;
use crate::types::Source;

/// Gemini `generateContent` over REST.
pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    text_model: String,
    tts_model: String,
    voice: String,
}

impl GeminiProvider {
    pub fn new(config: &AiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("trend-pulse/0.1")
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("building reqwest client")?;
        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            text_model: config.text_model.clone(),
            tts_model: config.tts_model.clone(),
            voice: config.voice.clone(),
        })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert("x-goog-api-key", HeaderValue::from_str(&self.api_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    async fn generate(&self, model: &str, body: &GenerateRequest<'_>) -> Result<GenerateResponse> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        debug!(%model, "gemini generateContent");

        let t0 = Instant::now();
        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(body)
            .send()
            .await
            .context("gemini request")?;
        histogram!("ai_request_ms", "model" => model.to_string())
            .record(t0.elapsed().as_secs_f64() * 1_000.0);

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini API error ({}): {}", status, error_text));
        }

        response.json().await.context("decoding gemini response")
    }
}

#[async_trait]
impl AiClient for GeminiProvider {
    async fn search_grounded(&self, prompt: &str) -> Result<GroundedText> {
        // responseMimeType must stay unset when the search tool is on
        let body = GenerateRequest {
            contents: vec![Content::text(prompt)],
            tools: Some(vec![Tool {
                google_search: GoogleSearch {},
            }]),
            generation_config: None,
        };
        let resp = self.generate(&self.text_model, &body).await?;
        Ok(GroundedText {
            text: response_text(&resp),
            sources: grounding_sources(&resp),
        })
    }

    async fn generate_text(&self, prompt: &str) -> Result<String> {
        let body = GenerateRequest {
            contents: vec![Content::text(prompt)],
            tools: None,
            generation_config: None,
        };
        let resp = self.generate(&self.text_model, &body).await?;
        Ok(response_text(&resp))
    }

    async fn synthesize_speech(&self, text: &str) -> Result<Option<String>> {
        let body = GenerateRequest {
            contents: vec![Content::text(text)],
            tools: None,
            generation_config: Some(GenerationConfig {
                response_modalities: vec!["AUDIO"],
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: &self.voice,
                        },
                    },
                },
            }),
        };
        let resp = self.generate(&self.tts_model, &body).await?;
        Ok(inline_audio(&resp))
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}

// ------------------------------------------------------------
// Wire types
// ------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<TextPart<'a>>,
}

impl<'a> Content<'a> {
    fn text(text: &'a str) -> Self {
        Self {
            parts: vec![TextPart { text }],
        }
    }
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Serialize)]
struct GoogleSearch {}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_modalities: Vec<&'a str>,
    speech_config: SpeechConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig<'a> {
    voice_config: VoiceConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig<'a> {
    prebuilt_voice_config: PrebuiltVoiceConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig<'a> {
    voice_name: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    #[serde(default)]
    data: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Default, Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebChunk>,
}

#[derive(Debug, Default, Deserialize)]
struct WebChunk {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

fn first_parts(resp: &GenerateResponse) -> &[Part] {
    resp.candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|c| c.parts.as_slice())
        .unwrap_or(&[])
}

/// All text parts of the first candidate, concatenated.
fn response_text(resp: &GenerateResponse) -> String {
    first_parts(resp)
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect()
}

/// Web grounding chunks that carry both a uri and a title.
fn grounding_sources(resp: &GenerateResponse) -> Vec<Source> {
    resp.candidates
        .first()
        .and_then(|c| c.grounding_metadata.as_ref())
        .map(|g| {
            g.grounding_chunks
                .iter()
                .filter_map(|chunk| chunk.web.as_ref())
                .filter_map(|web| match (web.uri.as_deref(), web.title.as_deref()) {
                    (Some(uri), Some(title)) if !uri.is_empty() && !title.is_empty() => {
                        Some(Source {
                            title: title.to_string(),
                            uri: uri.to_string(),
                        })
                    }
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Audio payload of the first part of the first candidate.
fn inline_audio(resp: &GenerateResponse) -> Option<String> {
    first_parts(resp)
        .first()
        .and_then(|p| p.inline_data.as_ref())
        .map(|d| d.data.clone())
        .filter(|d| !d.is_empty())
}
