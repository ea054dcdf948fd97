// tests/api_ai_negative.rs
//
// The dashboard must keep serving when the backend is down: empty feed on
// refresh, placeholder drafts, and no audio.

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt as _;

use trend_pulse::ai::{DisabledClient, DynAiClient, FailingProvider, MockProvider};
use trend_pulse::config::TrendSettings;
use trend_pulse::feed::Dashboard;
use trend_pulse::{router, AppState, TrendItem};

fn app_with(ai: DynAiClient) -> (Router, AppState) {
    let state = AppState::new(ai, TrendSettings::default());
    (router(state.clone()), state)
}

async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), 1 << 20).await.unwrap().to_vec();
    (status, bytes)
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Seed the dashboard with a card the way a previous good fetch would have.
fn seed(state: &AppState) -> String {
    let mock = MockProvider::default();
    let item = TrendItem {
        id: "trend-42-0".into(),
        category: Default::default(),
        headline: "Seeded story".into(),
        summary: "Seeded summary.".into(),
        virality_score: 77,
        hashtags: vec!["Seed".into()],
        sources: mock.sources[..1].to_vec(),
        timestamp: "09:30".into(),
    };
    let mut d = state.dashboard.write().unwrap();
    *d = Dashboard::default();
    d.finish_fetch(vec![item.clone()]);
    item.id
}

#[tokio::test]
async fn refresh_with_failing_backend_yields_empty_feed() {
    let (app, state) = app_with(Arc::new(FailingProvider));
    seed(&state);

    let (status, bytes) = call(&app, Request::post("/trends/refresh?category=crypto").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["category"], "Crypto & Web3");
    assert_eq!(v["total"], 0);
    assert_eq!(v["loading"], false);
    assert!(v["trends"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn generate_with_failing_backend_returns_placeholder() {
    let (app, state) = app_with(Arc::new(FailingProvider));
    let id = seed(&state);

    let (status, bytes) = call(&app, post_json("/generate", &format!(r#"{{"trend_id":"{id}","platform":"Twitter"}}"#))).await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["platform"], "Twitter");
    assert_eq!(v["content"], "Error generating content. Please try again.");

    // the placeholder still becomes the draft
    let d = state.dashboard.read().unwrap();
    assert_eq!(d.selected.as_deref(), Some(id.as_str()));
    assert!(d.draft.is_some());
}

#[tokio::test]
async fn speech_with_failing_backend_is_no_content() {
    let (app, state) = app_with(Arc::new(FailingProvider));
    let (status, bytes) = call(&app, post_json("/speech", r#"{"text":"Read this aloud"}"#)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(bytes.is_empty());
    assert!(state.deck.current().is_none());
}

#[tokio::test]
async fn empty_clip_plays_but_bad_format_is_no_content() {
    let mock = MockProvider {
        speech_samples: vec![],
        ..MockProvider::default()
    };
    let (app, state) = app_with(Arc::new(mock));
    // empty PCM decodes to a zero-length clip, which still plays
    let (status, _) = call(&app, post_json("/speech", r#"{"text":"x"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.deck.current().unwrap().frames, 0);

    let zero_channels = TrendSettings {
        channels: 0,
        ..TrendSettings::default()
    };
    let state = AppState::new(Arc::new(MockProvider::default()), zero_channels);
    let app = router(state.clone());
    let (status, _) = call(&app, post_json("/speech", r#"{"text":"x"}"#)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(state.deck.current().is_none());
}

#[tokio::test]
async fn disabled_backend_behaves_like_an_outage() {
    let (app, _) = app_with(Arc::new(DisabledClient));
    let (status, bytes) = call(&app, Request::post("/trends/refresh").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["total"], 0);

    let (status, _) = call(&app, post_json("/speech", r#"{"text":"hello"}"#)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
