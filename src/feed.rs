//! Dashboard state: active selection, current feed, filter/sort and the
//! trend open in the editor.
//!
//! Fetches are not deduplicated or cancelled. Whichever fetch resolves last
//! replaces the feed.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::parse::synthetic_id_parts;
use crate::types::{Category, GeneratedContent, Region, TrendItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Score,
    Latest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeedFilter {
    /// 0 keeps everything.
    #[serde(default)]
    pub min_score: u32,
    #[serde(default)]
    pub sort: SortBy,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScorePreset {
    pub min_score: u32,
    pub label: &'static str,
}

pub static SCORE_PRESETS: [ScorePreset; 3] = [
    ScorePreset {
        min_score: 0,
        label: "All Trends",
    },
    ScorePreset {
        min_score: 50,
        label: "High Potential",
    },
    ScorePreset {
        min_score: 80,
        label: "Mega Viral",
    },
];

/// Newest first: fetch time, then segment index, both descending.
/// Ids that are not synthetic fall back to reverse lexical order.
fn latest_first(a: &TrendItem, b: &TrendItem) -> Ordering {
    match (synthetic_id_parts(&a.id), synthetic_id_parts(&b.id)) {
        (Some(pa), Some(pb)) => pb.cmp(&pa),
        _ => b.id.cmp(&a.id),
    }
}

/// Filter then sort a copy of `items`. Score sort is stable.
pub fn process(items: &[TrendItem], filter: &FeedFilter) -> Vec<TrendItem> {
    let mut out: Vec<TrendItem> = if filter.min_score > 0 {
        items
            .iter()
            .filter(|t| t.virality_score >= filter.min_score)
            .cloned()
            .collect()
    } else {
        items.to_vec()
    };

    match filter.sort {
        SortBy::Score => out.sort_by(|a, b| b.virality_score.cmp(&a.virality_score)),
        SortBy::Latest => out.sort_by(latest_first),
    }
    out
}

#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    pub category: Category,
    pub region: Region,
    pub trends: Vec<TrendItem>,
    pub filter: FeedFilter,
    pub loading: bool,
    pub fetched_at: Option<DateTime<Utc>>,
    pub selected: Option<String>,
    pub draft: Option<GeneratedContent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub category: Category,
    pub region: Region,
    pub filter: FeedFilter,
    pub loading: bool,
    pub fetched_at: Option<DateTime<Utc>>,
    pub total: usize,
    pub trends: Vec<TrendItem>,
    pub selected: Option<TrendItem>,
    pub draft: Option<GeneratedContent>,
}

impl Dashboard {
    /// Switch selection (if given) and clear the feed ahead of a fetch.
    pub fn begin_fetch(&mut self, category: Option<Category>, region: Option<Region>) -> (Category, Region) {
        if let Some(c) = category {
            self.category = c;
        }
        if let Some(r) = region {
            self.region = r;
        }
        self.trends.clear();
        self.loading = true;
        (self.category, self.region)
    }

    /// Store a fetch result. Errors arrive here as an empty list.
    pub fn finish_fetch(&mut self, items: Vec<TrendItem>) {
        self.trends = items;
        self.loading = false;
        self.fetched_at = Some(Utc::now());
    }

    pub fn find(&self, id: &str) -> Option<&TrendItem> {
        self.trends.iter().find(|t| t.id == id)
    }

    /// Open `id` in the editor; the previous draft is discarded.
    pub fn select(&mut self, id: &str) -> Option<TrendItem> {
        let item = self.find(id)?.clone();
        self.selected = Some(item.id.clone());
        self.draft = None;
        Some(item)
    }

    pub fn close_editor(&mut self) {
        self.selected = None;
        self.draft = None;
    }

    pub fn selected_item(&self) -> Option<&TrendItem> {
        self.selected.as_deref().and_then(|id| self.find(id))
    }

    pub fn visible(&self) -> Vec<TrendItem> {
        process(&self.trends, &self.filter)
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            category: self.category,
            region: self.region,
            filter: self.filter,
            loading: self.loading,
            fetched_at: self.fetched_at,
            total: self.trends.len(),
            trends: self.visible(),
            selected: self.selected_item().cloned(),
            draft: self.draft.clone(),
        }
    }
}
