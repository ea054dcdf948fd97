use std::sync::{Arc, RwLock};

use axum::{
    extract::{Path, Query, State},
    http::{header::CONTENT_TYPE, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::ai::DynAiClient;
use crate::audio::{self, AudioDeck, ClipInfo};
use crate::config::TrendSettings;
use crate::error::{ApiError, ApiResult};
use crate::feed::{self, Dashboard, DashboardSnapshot, FeedFilter, ScorePreset, SortBy, SCORE_PRESETS};
use crate::service;
use crate::types::{Category, GeneratedContent, Platform, Region, TrendItem};

const CLIP_ID_HEADER: HeaderName = HeaderName::from_static("x-clip-id");

#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<RwLock<Dashboard>>,
    pub ai: DynAiClient,
    pub deck: Arc<AudioDeck>,
    pub settings: Arc<TrendSettings>,
}

impl AppState {
    pub fn new(ai: DynAiClient, settings: TrendSettings) -> Self {
        Self {
            dashboard: Arc::new(RwLock::new(Dashboard::default())),
            ai,
            deck: Arc::new(AudioDeck::new()),
            settings: Arc::new(settings),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/catalog", get(catalog))
        .route("/dashboard", get(dashboard))
        .route("/dashboard/filter", put(update_filter))
        .route("/trends", get(list_trends))
        .route("/trends/refresh", post(refresh_trends))
        .route("/trends/{id}/select", post(select_trend))
        .route("/selection", delete(close_editor))
        .route("/generate", post(generate_post))
        .route("/speech", post(speech))
        .route("/speech/current", get(current_clip).delete(stop_clip))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct Catalog {
    categories: &'static [Category],
    regions: &'static [Region],
    platforms: &'static [Platform],
    score_presets: &'static [ScorePreset],
}

async fn catalog() -> Json<Catalog> {
    Json(Catalog {
        categories: Category::ALL,
        regions: Region::ALL,
        platforms: Platform::ALL,
        score_presets: &SCORE_PRESETS,
    })
}

async fn dashboard(State(state): State<AppState>) -> Json<DashboardSnapshot> {
    let d = state.dashboard.read().expect("rwlock poisoned");
    Json(d.snapshot())
}

#[derive(Deserialize)]
struct FilterUpdate {
    #[serde(default)]
    min_score: Option<u32>,
    #[serde(default)]
    sort: Option<SortBy>,
}

async fn update_filter(
    State(state): State<AppState>,
    Json(body): Json<FilterUpdate>,
) -> Json<DashboardSnapshot> {
    let mut d = state.dashboard.write().expect("rwlock poisoned");
    if let Some(m) = body.min_score {
        d.filter.min_score = m;
    }
    if let Some(s) = body.sort {
        d.filter.sort = s;
    }
    Json(d.snapshot())
}

#[derive(Deserialize)]
struct TrendsQuery {
    min_score: Option<u32>,
    sort: Option<SortBy>,
}

/// Current feed through the dashboard filter, optionally overridden per call.
async fn list_trends(
    State(state): State<AppState>,
    Query(q): Query<TrendsQuery>,
) -> Json<Vec<TrendItem>> {
    let d = state.dashboard.read().expect("rwlock poisoned");
    let filter = FeedFilter {
        min_score: q.min_score.unwrap_or(d.filter.min_score),
        sort: q.sort.unwrap_or(d.filter.sort),
    };
    Json(feed::process(&d.trends, &filter))
}

#[derive(Deserialize)]
struct RefreshQuery {
    category: Option<Category>,
    region: Option<Region>,
}

/// Clear the feed, fetch, and store whatever comes back. Failures store an
/// empty feed.
async fn refresh_trends(
    State(state): State<AppState>,
    Query(q): Query<RefreshQuery>,
) -> Json<DashboardSnapshot> {
    let (category, region) = state
        .dashboard
        .write()
        .expect("rwlock poisoned")
        .begin_fetch(q.category, q.region);

    let items = service::fetch_trending_news(state.ai.as_ref(), &state.settings, category, region)
        .await
        .unwrap_or_default();

    let mut d = state.dashboard.write().expect("rwlock poisoned");
    d.finish_fetch(items);
    Json(d.snapshot())
}

async fn select_trend(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<TrendItem>> {
    let item = state
        .dashboard
        .write()
        .expect("rwlock poisoned")
        .select(&id)
        .ok_or_else(|| ApiError::NotFound(format!("trend {id}")))?;
    state.deck.stop();
    Ok(Json(item))
}

async fn close_editor(State(state): State<AppState>) -> StatusCode {
    state.dashboard.write().expect("rwlock poisoned").close_editor();
    state.deck.stop();
    StatusCode::NO_CONTENT
}

#[derive(Deserialize)]
struct GenerateReq {
    #[serde(default)]
    platform: Option<Platform>,
    /// Defaults to the trend open in the editor.
    #[serde(default)]
    trend_id: Option<String>,
}

async fn generate_post(
    State(state): State<AppState>,
    Json(req): Json<GenerateReq>,
) -> ApiResult<Json<GeneratedContent>> {
    let trend = {
        let d = state.dashboard.read().expect("rwlock poisoned");
        match req.trend_id.as_deref() {
            Some(id) => d
                .find(id)
                .cloned()
                .ok_or_else(|| ApiError::NotFound(format!("trend {id}")))?,
            None => d
                .selected_item()
                .cloned()
                .ok_or_else(|| ApiError::Validation("no trend selected".into()))?,
        }
    };

    state.deck.stop();
    let platform = req.platform.unwrap_or_default();
    let content = service::generate_social_post(state.ai.as_ref(), &trend, platform).await;
    let draft = GeneratedContent { platform, content };

    {
        let mut d = state.dashboard.write().expect("rwlock poisoned");
        d.selected = Some(trend.id.clone());
        d.draft = Some(draft.clone());
    }
    Ok(Json(draft))
}

#[derive(Deserialize)]
struct SpeechReq {
    /// Defaults to the current draft.
    #[serde(default)]
    text: Option<String>,
}

fn wav_response(clip: &ClipInfo, wav: Vec<u8>) -> Response {
    (
        [
            (CONTENT_TYPE, "audio/wav".to_string()),
            (CLIP_ID_HEADER, clip.id.to_string()),
        ],
        wav,
    )
        .into_response()
}

fn draft_text(state: &AppState) -> Option<String> {
    let d = state.dashboard.read().expect("rwlock poisoned");
    d.draft
        .as_ref()
        .map(|g| g.content.clone())
        .filter(|t| !t.trim().is_empty())
}

/// Synthesize, decode and make the result the active clip. `204` when the
/// backend produced no usable audio.
/// A request without a JSON body voices the draft.
async fn speech(
    State(state): State<AppState>,
    body: Option<Json<SpeechReq>>,
) -> ApiResult<Response> {
    let text = body
        .and_then(|Json(req)| req.text)
        .filter(|t| !t.trim().is_empty())
        .or_else(|| draft_text(&state))
        .ok_or_else(|| ApiError::Validation("no content to voice".into()))?;

    state.deck.stop();
    let Some(payload) = service::generate_speech(state.ai.as_ref(), &text).await else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    let buffer = match audio::decode_speech(&payload, state.settings.pcm_format()) {
        Ok(b) => b,
        Err(e) => {
            counter!("speech_failed_total").increment(1);
            warn!(error = %e, "speech payload could not be decoded");
            return Ok(StatusCode::NO_CONTENT.into_response());
        }
    };

    let wav = buffer.to_wav();
    let clip = state.deck.play(buffer);
    info!(clip = clip.id, frames = clip.frames, secs = clip.duration_secs, "clip started");
    Ok(wav_response(&clip, wav))
}

async fn current_clip(State(state): State<AppState>) -> ApiResult<Response> {
    let (clip, buffer) = state
        .deck
        .current_buffer()
        .ok_or_else(|| ApiError::NotFound("no active clip".into()))?;
    Ok(wav_response(&clip, buffer.to_wav()))
}

#[derive(Serialize)]
struct StopResp {
    stopped: Option<u64>,
}

async fn stop_clip(State(state): State<AppState>) -> Json<StopResp> {
    Json(StopResp {
        stopped: state.deck.stop(),
    })
}
