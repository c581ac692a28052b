use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use fh_connector::StreamConnector;
use fh_core::{FirehoseConfig, FirehoseError, NewRule, Shutdown};
use fh_ingest::{IngestionCoordinator, StreamSupervisor, TweetQueries};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<FirehoseConfig>,
    pub coordinator: Arc<IngestionCoordinator>,
    pub queries: TweetQueries,
    pub connector: Arc<StreamConnector>,
    pub supervisor: Arc<Mutex<Option<StreamSupervisor>>>,
    pub shutdown: Shutdown,
}

impl AppState {
    /// Start the session loop unless one is already running.
    ///
    /// Returns false when a live supervisor was found.
    pub async fn start_stream(&self) -> bool {
        let mut slot = self.supervisor.lock().await;
        if let Some(existing) = slot.as_ref() {
            if !existing.is_finished() {
                return false;
            }
        }
        *slot = Some(StreamSupervisor::spawn(
            Arc::clone(&self.connector),
            &self.cfg,
            self.shutdown.clone(),
        ));
        true
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/tweets/latest", get(latest_tweets))
        .route("/tweets/old", get(old_tweets))
        .route("/rules/reset", post(reset_rules))
        .route("/rules", delete(remove_rules))
        .route("/stream/start", post(stream_start))
        .route("/stream/status", get(stream_status))
        .with_state(state)
}

// ═══════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════

pub struct ApiError(FirehoseError);

impl From<FirehoseError> for ApiError {
    fn from(e: FirehoseError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            FirehoseError::Validation(_) => StatusCode::BAD_REQUEST,
            FirehoseError::Remote { .. } => StatusCode::BAD_GATEWAY,
            FirehoseError::Transport(_) => StatusCode::SERVICE_UNAVAILABLE,
            FirehoseError::Cancelled(_) => StatusCode::CONFLICT,
        };
        let body = json!({
            "ok": false,
            "error": self.0.to_string(),
            "retryable": self.0.is_retryable(),
        });
        (status, Json(body)).into_response()
    }
}

// ═══════════════════════════════════════════════════════════════
// GET /tweets/latest
// ═══════════════════════════════════════════════════════════════

async fn latest_tweets(State(st): State<AppState>) -> impl IntoResponse {
    Json(st.queries.get_latest_tweet())
}

// ═══════════════════════════════════════════════════════════════
// GET /tweets/old?page=N
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
struct OldTweetsQuery {
    #[serde(default)]
    page: i64,
}

async fn old_tweets(
    State(st): State<AppState>,
    Query(q): Query<OldTweetsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(st.queries.get_old_tweets(q.page)?))
}

// ═══════════════════════════════════════════════════════════════
// POST /rules/reset
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
struct ResetRequest {
    add: Vec<NewRule>,
}

async fn reset_rules(
    State(st): State<AppState>,
    Json(req): Json<ResetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let created = st.coordinator.reset_rule(&req.add).await?;
    log::info!("Reset rules via API: {} active", created.len());
    Ok(Json(created))
}

// ═══════════════════════════════════════════════════════════════
// DELETE /rules
// ═══════════════════════════════════════════════════════════════

async fn remove_rules(State(st): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let removed = st.coordinator.remove_rules().await?;
    Ok(Json(json!({"ok": true, "removed": removed})))
}

// ═══════════════════════════════════════════════════════════════
// POST /stream/start, GET /stream/status
// ═══════════════════════════════════════════════════════════════

async fn stream_start(State(st): State<AppState>) -> impl IntoResponse {
    if st.start_stream().await {
        (StatusCode::ACCEPTED, Json(json!({"ok": true, "started": true})))
    } else {
        (StatusCode::OK, Json(json!({"ok": true, "started": false})))
    }
}

async fn stream_status(State(st): State<AppState>) -> impl IntoResponse {
    let supervisor = st.supervisor.lock().await.as_ref().map(|s| s.status());
    let state = st.connector.state().await;
    Json(json!({
        "ok": true,
        "state": state,
        "sessions": st.connector.session_count(),
        "supervisor": supervisor,
        "stored_records": st.queries.count(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header::CONTENT_TYPE, Request};
    use bytes::Bytes;
    use chrono::Utc;
    use fh_connector::{ByteStream, ConnectionState, ConnectorError, StreamSource};
    use fh_core::{FirehoseResult, Rule, RuleSet};
    use fh_rules::{RuleRegistry, RulesRequest, RulesTransport};
    use fh_store::{EventStore, MemoryEventStore};
    use futures_util::stream;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    /// Remote with no rules that creates whatever it is sent, or rejects it
    struct EmptyRemote {
        reject_adds: bool,
    }

    #[async_trait]
    impl RulesTransport for EmptyRemote {
        async fn get_rules(&self) -> FirehoseResult<RuleSet> {
            Ok(RuleSet::default())
        }

        async fn post_rules(&self, request: &RulesRequest) -> FirehoseResult<RuleSet> {
            match request {
                RulesRequest::Add(_) if self.reject_adds => {
                    Err(FirehoseError::remote(400, "invalid rule syntax"))
                }
                RulesRequest::Add(rules) => Ok(RuleSet::from_rules(
                    rules
                        .iter()
                        .enumerate()
                        .map(|(i, r)| Rule {
                            id: format!("{}", i + 1),
                            value: r.value.clone(),
                            tag: r.tag.clone(),
                        })
                        .collect(),
                )),
                RulesRequest::Delete(_) => Ok(RuleSet::default()),
            }
        }
    }

    /// Source whose response has no body
    struct SilentSource;

    #[async_trait]
    impl StreamSource for SilentSource {
        async fn open(&self) -> Result<Option<ByteStream>, ConnectorError> {
            Ok(None)
        }

        fn describe(&self) -> String {
            "silent".into()
        }
    }

    /// Source that stays connected without sending anything
    struct IdleSource;

    #[async_trait]
    impl StreamSource for IdleSource {
        async fn open(&self) -> Result<Option<ByteStream>, ConnectorError> {
            Ok(Some(Box::pin(stream::pending::<Result<Bytes, ConnectorError>>())))
        }

        fn describe(&self) -> String {
            "idle".into()
        }
    }

    fn state_with(
        store: Arc<MemoryEventStore>,
        source: Arc<dyn StreamSource>,
        reject_adds: bool,
    ) -> AppState {
        let cfg = Arc::new(FirehoseConfig::new("https://api.example.com/stream", "t"));
        let shutdown = Shutdown::new();
        AppState {
            coordinator: Arc::new(IngestionCoordinator::new(
                RuleRegistry::new(Arc::new(EmptyRemote { reject_adds })),
                store.clone(),
                &cfg,
                shutdown.clone(),
            )),
            queries: TweetQueries::new(store.clone(), &cfg),
            connector: Arc::new(
                StreamConnector::new(source, store, 4).with_shutdown(shutdown.clone()),
            ),
            supervisor: Arc::new(Mutex::new(None)),
            shutdown,
            cfg,
        }
    }

    fn state(store: Arc<MemoryEventStore>) -> AppState {
        state_with(store, Arc::new(SilentSource), false)
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn call(app: Router, method: &str, uri: &str) -> (StatusCode, Value) {
        send(
            app,
            Request::builder().method(method).uri(uri).body(Body::empty()).unwrap(),
        )
        .await
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        send(
            app,
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    #[tokio::test]
    async fn test_latest_tweets() {
        let store = Arc::new(MemoryEventStore::new());
        store.append("{\"data\":{\"id\":\"1\"}}", Utc::now()).unwrap();

        let (status, body) = call(router(state(store)), "GET", "/tweets/latest").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_negative_page_is_bad_request() {
        let store = Arc::new(MemoryEventStore::new());
        let (status, body) = call(router(state(store)), "GET", "/tweets/old?page=-1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
        assert_eq!(body["retryable"], false);
    }

    #[tokio::test]
    async fn test_old_tweets_default_page() {
        let store = Arc::new(MemoryEventStore::new());
        store.append("x", Utc::now()).unwrap();
        let (status, body) = call(router(state(store)), "GET", "/tweets/old").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["page_index"], 0);
        assert_eq!(body["page_size"], 20);
        assert_eq!(body["total_elements"], 1);
    }

    #[tokio::test]
    async fn test_remove_rules_on_empty_remote() {
        let store = Arc::new(MemoryEventStore::new());
        store.append("x", Utc::now()).unwrap();
        let (status, body) = call(router(state(store.clone())), "DELETE", "/rules").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["removed"], 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_reset_rules_returns_created() {
        let store = Arc::new(MemoryEventStore::new());
        store.append("stale", Utc::now()).unwrap();
        let app = router(state(store.clone()));

        let (status, body) = post_json(
            app,
            "/rules/reset",
            json!({"add": [{"value": "rust lang", "tag": "rust"}, {"value": "tokio"}]}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["value"], "rust lang");
        assert_eq!(body["data"][0]["tag"], "rust");
        assert_eq!(body["data"][1]["id"], "2");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_reset_rules_rejected_is_bad_request() {
        let store = Arc::new(MemoryEventStore::new());
        let app = router(state_with(store, Arc::new(SilentSource), true));

        let (status, body) = post_json(app, "/rules/reset", json!({"add": [{"value": "(("}]})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
        assert_eq!(body["retryable"], false);
        assert!(body["error"].as_str().unwrap().contains("invalid rule syntax"));
    }

    #[tokio::test]
    async fn test_stream_start_only_once_while_running() {
        let store = Arc::new(MemoryEventStore::new());
        let st = state_with(store, Arc::new(IdleSource), false);
        let app = router(st.clone());

        let (status, body) = call(app.clone(), "POST", "/stream/start").await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["started"], true);

        let (status, body) = call(app.clone(), "POST", "/stream/start").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["started"], false);

        for _ in 0..100 {
            if st.connector.state().await == ConnectionState::Streaming {
                break;
            }
            tokio::task::yield_now().await;
        }
        let (status, body) = call(app, "GET", "/stream/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "Streaming");
        assert_eq!(body["supervisor"]["running"], true);

        let supervisor = st.supervisor.lock().await.take().unwrap();
        let final_status = supervisor.stop().await;
        assert_eq!(final_status.sessions, 1);
        assert!(!final_status.running);
    }

    #[tokio::test]
    async fn test_stream_restarts_after_finish() {
        let store = Arc::new(MemoryEventStore::new());
        let st = state(store);
        st.shutdown.trigger();
        assert!(st.start_stream().await);

        // The loop exits at once because shutdown is already set
        for _ in 0..100 {
            if st.supervisor.lock().await.as_ref().is_some_and(|s| s.is_finished()) {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(st.start_stream().await);

        let (status, body) = call(router(st), "GET", "/stream/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["supervisor"]["sessions"], 0);
    }
}
