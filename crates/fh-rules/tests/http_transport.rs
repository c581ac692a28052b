//! HTTP rules transport against a local rules endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use fh_core::{FirehoseConfig, FirehoseError, NewRule};
use fh_rules::{HttpRulesTransport, RuleRegistry, RulesRequest, RulesTransport};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;

// ═══════════════════════════════════════════════════════════════════════════════
// LOCAL ENDPOINT
// ═══════════════════════════════════════════════════════════════════════════════

/// What the endpoint received: auth headers and POST bodies
#[derive(Clone, Default)]
struct Seen {
    auth: Arc<Mutex<Vec<String>>>,
    bodies: Arc<Mutex<Vec<Value>>>,
}

impl Seen {
    fn record_auth(&self, headers: &HeaderMap) {
        let auth = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        self.auth.lock().push(auth);
    }
}

/// Rule list without `data`, the shape of an empty remote
async fn list_empty(State(seen): State<Seen>, headers: HeaderMap) -> Json<Value> {
    seen.record_auth(&headers);
    Json(json!({"meta": {"sent": "2024-05-01T10:00:00.000Z", "result_count": 0}}))
}

async fn list_two(State(seen): State<Seen>, headers: HeaderMap) -> Json<Value> {
    seen.record_auth(&headers);
    Json(json!({
        "data": [
            {"id": "1", "value": "cats", "tag": "pets"},
            {"id": "2", "value": "dogs"}
        ],
        "meta": {"result_count": 2}
    }))
}

async fn mutate(State(seen): State<Seen>, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    seen.record_auth(&headers);
    seen.bodies.lock().push(body);
    Json(json!({"meta": {"summary": {"deleted": 1, "not_deleted": 0}}}))
}

async fn overloaded() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "upstream down")
}

async fn rejected() -> (StatusCode, &'static str) {
    (StatusCode::BAD_REQUEST, "{\"title\":\"Invalid Request\"}")
}

async fn blank() -> StatusCode {
    StatusCode::OK
}

async fn garbage() -> &'static str {
    "<html>not json</html>"
}

/// Serve the endpoints and return the server origin
async fn serve(seen: Seen) -> String {
    let app = Router::new()
        .route("/empty/stream/rules", get(list_empty).post(mutate))
        .route("/two/stream/rules", get(list_two).post(mutate))
        .route("/down/stream/rules", get(overloaded).post(overloaded))
        .route("/strict/stream/rules", get(list_empty).post(rejected))
        .route("/blank/stream/rules", get(blank))
        .route("/garbage/stream/rules", get(garbage))
        .with_state(seen);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn transport(origin: &str, prefix: &str) -> Arc<HttpRulesTransport> {
    let config = FirehoseConfig::new(&format!("{origin}/{prefix}/stream"), "tok");
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    Arc::new(HttpRulesTransport::with_client(client, &config))
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn missing_data_decodes_to_empty_set() {
    let seen = Seen::default();
    let origin = serve(seen.clone()).await;

    let rules = transport(&origin, "empty").get_rules().await.unwrap();
    assert!(rules.is_empty());
    assert_eq!(rules.meta.unwrap().result_count, Some(0));
    assert_eq!(seen.auth.lock().clone(), vec!["Bearer tok"]);
}

#[tokio::test]
async fn empty_success_body_is_empty_set() {
    let origin = serve(Seen::default()).await;
    let rules = transport(&origin, "blank").get_rules().await.unwrap();
    assert!(rules.is_empty());
}

#[tokio::test]
async fn undecodable_body_is_remote_error() {
    let origin = serve(Seen::default()).await;
    let err = transport(&origin, "garbage").get_rules().await.unwrap_err();
    assert!(matches!(err, FirehoseError::Remote { status: 200, .. }));
}

#[tokio::test]
async fn delete_posts_ids_wire_shape() {
    let seen = Seen::default();
    let origin = serve(seen.clone()).await;

    let response = transport(&origin, "two")
        .post_rules(&RulesRequest::delete(vec!["1".into()]))
        .await
        .unwrap();
    assert_eq!(response.summary().map(|s| s.deleted), Some(1));
    assert_eq!(seen.bodies.lock().clone(), vec![json!({"delete": {"ids": ["1"]}})]);
    assert_eq!(seen.auth.lock().clone(), vec!["Bearer tok"]);
}

#[tokio::test]
async fn server_error_is_retryable_remote() {
    let origin = serve(Seen::default()).await;

    let err = transport(&origin, "down")
        .post_rules(&RulesRequest::add(vec![NewRule::new("x")]))
        .await
        .unwrap_err();
    match &err {
        FirehoseError::Remote { status, body } => {
            assert_eq!(*status, 500);
            assert_eq!(body, "upstream down");
        }
        other => panic!("Expected Remote, got {other:?}"),
    }
    assert!(err.is_retryable());
}

#[tokio::test]
async fn registry_reset_over_http() {
    let seen = Seen::default();
    let origin = serve(seen.clone()).await;
    let registry = RuleRegistry::new(transport(&origin, "two"));

    registry
        .reset_all_rules(&[NewRule::new("rust").with_tag("lang")])
        .await
        .unwrap();

    assert_eq!(
        seen.bodies.lock().clone(),
        vec![
            json!({"delete": {"ids": ["1", "2"]}}),
            json!({"add": [{"value": "rust", "tag": "lang"}]}),
        ]
    );
    assert_eq!(seen.auth.lock().len(), 3);
}

#[tokio::test]
async fn bad_request_on_add_is_validation() {
    let origin = serve(Seen::default()).await;
    let registry = RuleRegistry::new(transport(&origin, "strict"));

    let err = registry.add_rules(&[NewRule::new("((")]).await.unwrap_err();
    match err {
        FirehoseError::Validation(msg) => assert!(msg.contains("Invalid Request")),
        other => panic!("Expected Validation, got {other:?}"),
    }
}
