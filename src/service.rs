//! Service layer: the three request functions behind the dashboard.
//!
//! Only `fetch_trending_news` returns an error; callers turn it into an empty
//! feed. Post generation degrades to a placeholder string and speech to `None`.

use anyhow::Result;
use chrono::{Local, Utc};
use metrics::counter;
use tracing::{info, warn};

use crate::ai::AiClient;
use crate::config::TrendSettings;
use crate::parse::{parse_trend_items, ParseContext};
use crate::prompts::{clean_for_speech, social_post_prompt, trends_prompt};
use crate::types::{Category, Platform, Region, TrendItem};

pub const POST_EMPTY_PLACEHOLDER: &str = "Failed to generate content.";
pub const POST_ERROR_PLACEHOLDER: &str = "Error generating content. Please try again.";

/// Short sha256 prefix so logs never carry raw text.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// One search-grounded call, parsed into cards.
pub async fn fetch_trending_news(
    ai: &dyn AiClient,
    settings: &TrendSettings,
    category: Category,
    region: Region,
) -> Result<Vec<TrendItem>> {
    counter!("trends_fetch_total").increment(1);
    let prompt = trends_prompt(category, region, settings.items_per_fetch);

    let grounded = match ai.search_grounded(&prompt).await {
        Ok(g) => g,
        Err(e) => {
            counter!("trends_fetch_errors_total").increment(1);
            warn!(error = ?e, %category, %region, provider = ai.provider_name(), "trend fetch failed");
            return Err(e);
        }
    };

    let ctx = ParseContext {
        category,
        sources: &grounded.sources,
        sources_per_item: settings.sources_per_item,
        fetched_at_ms: Utc::now().timestamp_millis(),
        timestamp: Local::now().format("%H:%M").to_string(),
    };
    let report = parse_trend_items(&grounded.text, &ctx);

    counter!("trends_items_parsed_total").increment(report.items.len() as u64);
    counter!("trends_segments_dropped_total").increment(report.dropped as u64);
    info!(
        %category,
        %region,
        items = report.items.len(),
        dropped = report.dropped,
        sources = grounded.sources.len(),
        "trend feed parsed"
    );

    Ok(report.items)
}

/// Draft copy for `platform`. Never fails: errors become a placeholder.
pub async fn generate_social_post(ai: &dyn AiClient, trend: &TrendItem, platform: Platform) -> String {
    let prompt = social_post_prompt(trend, platform);
    match ai.generate_text(&prompt).await {
        Ok(text) if !text.is_empty() => {
            counter!("posts_generated_total").increment(1);
            info!(trend = %trend.id, %platform, chars = text.len(), "post generated");
            text
        }
        Ok(_) => {
            counter!("posts_failed_total").increment(1);
            warn!(trend = %trend.id, %platform, "empty post response");
            POST_EMPTY_PLACEHOLDER.to_string()
        }
        Err(e) => {
            counter!("posts_failed_total").increment(1);
            warn!(error = ?e, trend = %trend.id, %platform, "post generation failed");
            POST_ERROR_PLACEHOLDER.to_string()
        }
    }
}

/// Base64 PCM for `text` with bracketed cues removed; `None` on any failure.
pub async fn generate_speech(ai: &dyn AiClient, text: &str) -> Option<String> {
    counter!("speech_requests_total").increment(1);
    let clean = clean_for_speech(text);
    let id = anon_hash(&clean);

    match ai.synthesize_speech(&clean).await {
        Ok(Some(b64)) => {
            info!(text = %id, payload_len = b64.len(), "speech synthesized");
            Some(b64)
        }
        Ok(None) => {
            counter!("speech_failed_total").increment(1);
            warn!(text = %id, "speech response carried no audio");
            None
        }
        Err(e) => {
            counter!("speech_failed_total").increment(1);
            warn!(error = ?e, text = %id, "speech generation failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{FailingProvider, GroundedText, MockProvider};
    use async_trait::async_trait;

    /// Returns the same draft text every time and never any audio.
    struct CannedText(&'static str);

    #[async_trait]
    impl AiClient for CannedText {
        async fn search_grounded(&self, _prompt: &str) -> Result<GroundedText> {
            Ok(GroundedText::default())
        }
        async fn generate_text(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
        async fn synthesize_speech(&self, _text: &str) -> Result<Option<String>> {
            Ok(None)
        }
        fn provider_name(&self) -> &'static str {
            "canned"
        }
    }

    fn trend() -> TrendItem {
        TrendItem {
            id: "trend-5-0".into(),
            category: Category::Tech,
            headline: "Robots learn to fold laundry".into(),
            summary: "s".into(),
            virality_score: 40,
            hashtags: vec![],
            sources: vec![],
            timestamp: "12:00".into(),
        }
    }

    #[tokio::test]
    async fn mock_fetch_parses_items_and_sources() {
        let items = fetch_trending_news(
            &MockProvider::default(),
            &TrendSettings::default(),
            Category::Tech,
            Region::Europe,
        )
        .await
        .unwrap();
        assert_eq!(items.len(), 3); // one segment has no headline
        assert!(items.iter().all(|i| i.category == Category::Tech));
        assert_eq!(items[0].virality_score, 88);
        assert_eq!(items[2].virality_score, 50);
        assert_eq!(items[2].summary, crate::parse::DEFAULT_SUMMARY);
        assert_eq!(items[0].sources.len(), 2);
        assert_eq!(items[0].sources, items[2].sources); // 3 sources, window of 2, modulus 1
        assert_eq!(items[0].timestamp.len(), 5);
    }

    #[tokio::test]
    async fn fetch_errors_propagate() {
        let r = fetch_trending_news(
            &FailingProvider,
            &TrendSettings::default(),
            Category::Tech,
            Region::Usa,
        )
        .await;
        assert!(r.is_err());
    }

    #[tokio::test]
    async fn post_placeholders() {
        assert_eq!(
            generate_social_post(&FailingProvider, &trend(), Platform::Twitter).await,
            POST_ERROR_PLACEHOLDER
        );
        assert_eq!(
            generate_social_post(&CannedText(""), &trend(), Platform::Twitter).await,
            POST_EMPTY_PLACEHOLDER
        );
        // only the exact empty string is replaced
        assert_eq!(
            generate_social_post(&CannedText("  \n"), &trend(), Platform::Twitter).await,
            "  \n"
        );
        let ok = generate_social_post(&MockProvider::default(), &trend(), Platform::TikTok).await;
        assert!(ok.contains("Robots learn to fold laundry"));
    }

    #[tokio::test]
    async fn speech_failures_become_none() {
        assert!(generate_speech(&FailingProvider, "hi").await.is_none());
        assert!(generate_speech(&CannedText(""), "hi").await.is_none());
        // only cues: cleaned text is empty, mock yields no audio
        assert!(generate_speech(&MockProvider::default(), "[Visual: x]").await.is_none());
        assert!(generate_speech(&MockProvider::default(), "Hello").await.is_some());
    }

    #[test]
    fn anon_hash_is_short_and_stable() {
        assert_eq!(anon_hash("abc"), anon_hash("abc"));
        assert_eq!(anon_hash("abc").len(), 12);
        assert_ne!(anon_hash("abc"), anon_hash("abd"));
    }
}
