//! Text-to-records parser for the trend feed.
//!
//! The model is asked to answer with repeated blocks that start with
//! [`ITEM_MARKER`] and carry four labeled lines:
//!
//! ```text
//! ### ITEM
//! Headline: ...
//! Summary: ...
//! Hashtags: a, b, c
//! Score: 87
//! ```
//!
//! Anything before the first marker is preamble and ignored. A block with no
//! `Headline:` line is dropped; the other three fields fall back to defaults.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{Category, Source, TrendItem};

pub const ITEM_MARKER: &str = "### ITEM";
pub const DEFAULT_SUMMARY: &str = "No summary available.";
pub const DEFAULT_SCORE: u32 = 50;
pub const DEFAULT_SOURCES_PER_ITEM: usize = 2;

static RE_HEADLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Headline:\s*(.*)").expect("headline regex"));
static RE_SUMMARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"Summary:\s*(.*)").expect("summary regex"));
static RE_HASHTAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"Hashtags:\s*(.*)").expect("hashtags regex"));
static RE_SCORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Score:\s*(\d+)").expect("score regex"));

/// Raw labeled fields of one segment, before defaults are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentFields {
    pub headline: String,
    pub summary: Option<String>,
    pub hashtags: Option<Vec<String>>,
    pub score: Option<u32>,
}

/// Everything a segment needs besides its own text.
#[derive(Debug, Clone)]
pub struct ParseContext<'a> {
    pub category: Category,
    /// Global grounding list; spread across items by index.
    pub sources: &'a [Source],
    pub sources_per_item: usize,
    /// Fetch time in unix millis, baked into every synthetic id.
    pub fetched_at_ms: i64,
    pub timestamp: String,
}

#[derive(Debug, Clone, Default)]
pub struct ParseReport {
    pub items: Vec<TrendItem>,
    pub segments: usize,
    pub dropped: usize,
}

/// Segments after the first marker. Empty when the marker never appears.
pub fn split_segments(text: &str) -> impl Iterator<Item = &str> {
    text.split(ITEM_MARKER).skip(1)
}

fn capture<'t>(re: &Regex, raw: &'t str) -> Option<&'t str> {
    re.captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

/// Extract the four labeled fields. `None` when the headline is missing.
pub fn parse_segment(raw: &str) -> Option<SegmentFields> {
    let headline = capture(&RE_HEADLINE, raw)?.to_string();
    let summary = capture(&RE_SUMMARY, raw).map(str::to_string);
    let hashtags = capture(&RE_HASHTAGS, raw).map(parse_hashtags);
    // digits that overflow u32 count as malformed
    let score = capture(&RE_SCORE, raw).and_then(|s| s.parse::<u32>().ok());

    Some(SegmentFields {
        headline,
        summary,
        hashtags,
        score,
    })
}

/// Comma-separated tags, trimmed, without a leading `#`, empties dropped.
pub fn parse_hashtags(line: &str) -> Vec<String> {
    line.split(',')
        .map(|t| t.trim().trim_start_matches('#').trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Sliding window over the global grounding list for the item at `index`.
pub fn sources_for_item(all: &[Source], index: usize, per_item: usize) -> Vec<Source> {
    let modulus = all.len().saturating_sub(per_item).max(1);
    let start = index % modulus;
    if start >= all.len() {
        return Vec::new();
    }
    let end = (start + per_item).min(all.len());
    all[start..end].to_vec()
}

pub fn synthetic_id(fetched_at_ms: i64, index: usize) -> String {
    format!("trend-{fetched_at_ms}-{index}")
}

/// Inverse of [`synthetic_id`], used for "latest first" ordering.
pub fn synthetic_id_parts(id: &str) -> Option<(i64, usize)> {
    let rest = id.strip_prefix("trend-")?;
    let (ts, idx) = rest.rsplit_once('-')?;
    Some((ts.parse().ok()?, idx.parse().ok()?))
}

pub fn parse_trend_items(text: &str, ctx: &ParseContext<'_>) -> ParseReport {
    let mut report = ParseReport::default();

    for (index, raw) in split_segments(text).enumerate() {
        report.segments += 1;
        let Some(fields) = parse_segment(raw) else {
            report.dropped += 1;
            continue;
        };

        report.items.push(TrendItem {
            id: synthetic_id(ctx.fetched_at_ms, index),
            category: ctx.category,
            headline: fields.headline,
            summary: fields.summary.unwrap_or_else(|| DEFAULT_SUMMARY.to_string()),
            virality_score: fields.score.unwrap_or(DEFAULT_SCORE),
            hashtags: fields.hashtags.unwrap_or_default(),
            sources: sources_for_item(ctx.sources, index, ctx.sources_per_item),
            timestamp: ctx.timestamp.clone(),
        });
    }

    report
}
