//! Prompt construction for the three backend calls.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::parse::ITEM_MARKER;
use crate::types::{Category, Platform, Region, TrendItem};

pub const DEFAULT_ITEMS_PER_FETCH: usize = 15;

pub fn trends_prompt(category: Category, region: Region, count: usize) -> String {
    format!(
        r#"Act as an advanced trend algorithm. Find the top {count} most viral and important news stories right now for the category "{category}" specifically in the "{region}" region.

CRITICAL SOURCE INSTRUCTION:
You MUST analyze real-time trends from social platforms like X (formerly Twitter), Threads, and Reddit, alongside traditional news outlets. Look for high-engagement topics.

For each story, provide:
1. A catchy, short headline.
2. A concise summary (max 2 sentences).
3. A list of 3-5 trending hashtags currently being used for this topic.
4. An estimated 'virality score' from 1-100 based on social media momentum.

Format the output strictly as a list where each item starts with "{ITEM_MARKER}".
Inside each item, use lines starting with:
Headline: [Value]
Summary: [Value]
Hashtags: [Value]
Score: [Value]

Ensure you return exactly {count} items."#
    )
}

/// Format-specific instructions for each platform.
pub fn platform_brief(platform: Platform) -> &'static str {
    match platform {
        Platform::YouTube => {
            "Create a full Video Script for a YouTube video.
CRITICAL REQUIREMENT: The script must be approximately 3 minutes long when spoken at a normal pace (approx. 450-500 words).

Structure:
- [0:00-0:30] Hook & Intro: Grab attention immediately.
- [0:30-2:30] Main Body: Deep dive into the details, context, and implications. Break into 3 clear points.
- [2:30-3:00] Outro & CTA: Summary and ask to subscribe.

Include Visual Cues in brackets like [Visual: Show graph of...] but focus on the spoken narration."
        }
        Platform::TikTok => {
            "Create a viral TikTok script.
Style: Fast-paced, high energy, visual.
Duration: Under 60 seconds.
Structure:
- Visual Hook (Text overlay suggestions)
- The \"What Happened\" (Fast narration)
- The \"Why it Matters\"
- CTA (e.g., \"Follow for more\")"
        }
        Platform::Twitter => {
            "Create a thread of 3-5 tweets or a long-form post. Tone: Punchy, informative, uses line breaks."
        }
        Platform::LinkedIn => {
            "Create a professional thought-leadership post. Tone: Analytical, business-focused."
        }
        Platform::Instagram => {
            "Create a caption with a hook. Tone: Visual, lifestyle-oriented, engaging."
        }
    }
}

pub fn social_post_prompt(trend: &TrendItem, platform: Platform) -> String {
    format!(
        "Act as a world-class social media manager.
{brief}

News Story:
Headline: {headline}
Summary: {summary}
Context: {category}

Hashtags to use: {hashtags}

Return ONLY the content text/script.",
        brief = platform_brief(platform),
        headline = trend.headline,
        summary = trend.summary,
        category = trend.category,
        hashtags = trend.hashtags.join(", "),
    )
}

static RE_CUES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[.*?\]").expect("cue regex"));

/// Strip bracketed stage directions like `[Visual: ...]` before synthesis.
pub fn clean_for_speech(text: &str) -> String {
    RE_CUES.replace_all(text, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trend() -> TrendItem {
        TrendItem {
            id: "trend-1-0".into(),
            category: Category::Finance,
            headline: "Rates hold steady".into(),
            summary: "Central bank pauses.".into(),
            virality_score: 64,
            hashtags: vec!["Fed".into(), "Rates".into()],
            sources: vec![],
            timestamp: "08:00".into(),
        }
    }

    #[test]
    fn trends_prompt_names_inputs_and_format() {
        let p = trends_prompt(Category::Sports, Region::LatinAmerica, 15);
        assert!(p.contains("\"Sports & Football\""));
        assert!(p.contains("\"Latin America\""));
        assert!(p.contains("top 15"));
        assert!(p.contains("### ITEM"));
        for label in ["Headline:", "Summary:", "Hashtags:", "Score:"] {
            assert!(p.contains(label), "missing {label}");
        }
    }

    #[test]
    fn post_prompt_carries_trend_and_brief() {
        let p = social_post_prompt(&trend(), Platform::YouTube);
        assert!(p.contains("Headline: Rates hold steady"));
        assert!(p.contains("Context: Finance & Markets"));
        assert!(p.contains("Hashtags to use: Fed, Rates"));
        assert!(p.contains("450-500 words"));
        assert!(p.ends_with("Return ONLY the content text/script."));
    }

    #[test]
    fn every_platform_has_a_distinct_brief() {
        let mut briefs: Vec<_> = Platform::ALL.iter().map(|p| platform_brief(*p)).collect();
        briefs.sort();
        briefs.dedup();
        assert_eq!(briefs.len(), Platform::ALL.len());
    }

    #[test]
    fn cues_removed_for_speech() {
        let s = "  [Visual: chart] Markets rallied [0:30-2:30] today.  ";
        assert_eq!(clean_for_speech(s), "Markets rallied  today.");
        assert_eq!(clean_for_speech("[only cue]"), "");
    }
}
