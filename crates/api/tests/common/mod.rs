#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use andon_api::config::ServerConfig;
use andon_api::engine::LifecycleController;
use andon_api::router::build_app_router;
use andon_api::state::AppState;
use andon_api::ws::WsManager;
use andon_audio::{AnnouncementCoordinator, AudioScheduler, FallbackSpeaker, SpeechError, Utterance};
use andon_events::EventBus;
use andon_store::{CatalogStore, LocalStore, TicketStore};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

/// Build a test `ServerConfig` from defaults only.
pub fn test_config() -> ServerConfig {
    ServerConfig::from_lookup(|_| None).unwrap()
}

/// Fallback speaker that only records what it was asked to say.
#[derive(Default)]
pub struct SilentSpeaker {
    pub spoken: Mutex<Vec<String>>,
}

#[async_trait]
impl FallbackSpeaker for SilentSpeaker {
    async fn cancel(&self) {}

    async fn speak(&self, utterance: Utterance) -> Result<(), SpeechError> {
        self.spoken.lock().unwrap().push(utterance.text);
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub speaker: Arc<SilentSpeaker>,
    /// Keeps the local fallback directory alive for the test.
    pub dir: TempDir,
}

/// Local-only application on a fresh data directory, wired the way `main`
/// wires it, with the same middleware stack.
pub async fn build_test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config();

    let event_bus = Arc::new(EventBus::default());
    let local = LocalStore::new(dir.path());
    let tickets = Arc::new(TicketStore::new(local.clone(), None, Arc::clone(&event_bus), 50));
    tickets.load().await;
    let catalogs = Arc::new(CatalogStore::load(local, Arc::clone(&event_bus)).await);

    let speaker = Arc::new(SilentSpeaker::default());
    let scheduler = AudioScheduler::new(speaker.clone()).with_fallback_delay(Duration::ZERO);
    let coordinator = Arc::new(AnnouncementCoordinator::new(Arc::new(scheduler)));
    let controller = Arc::new(LifecycleController::new(
        Arc::clone(&tickets),
        Arc::clone(&coordinator),
    ));

    let state = AppState {
        config: Arc::new(config.clone()),
        ws_manager: Arc::new(WsManager::new()),
        event_bus,
        tickets,
        catalogs,
        controller,
        coordinator,
    };

    TestApp {
        router: build_app_router(state.clone(), &config),
        state,
        speaker,
        dir,
    }
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None).await
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
