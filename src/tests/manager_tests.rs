use crate::api::KnowledgeClient;
use crate::model::{ClientConfig, KnowledgeEntity};
use crate::orchestrator::{Applied, ViewStateManager, DETAIL_ERROR, INGEST_ERROR, LIST_ERROR};
use crate::store::View;
use anyhow::Result;
use axum::{
    extract::State,
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{
    net::TcpListener,
    sync::{Mutex, Notify},
};

#[derive(Clone)]
struct Canned {
    status: StatusCode,
    body: String,
    gate: Option<Arc<Notify>>,
}

/// Backend double keyed by `"<METHOD> <path?query>"`. Gated routes hold their
/// response until the test releases them, which lets tests pick arrival order.
#[derive(Clone, Default)]
struct MockBackend {
    routes: Arc<Mutex<HashMap<String, Canned>>>,
    requests: Arc<Mutex<Vec<String>>>,
    bodies: Arc<Mutex<Vec<String>>>,
}

impl MockBackend {
    async fn route(&self, key: &str, status: StatusCode, body: impl Into<String>) {
        self.routes.lock().await.insert(
            key.to_string(),
            Canned {
                status,
                body: body.into(),
                gate: None,
            },
        );
    }

    async fn gated_route(
        &self,
        key: &str,
        status: StatusCode,
        body: impl Into<String>,
    ) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.routes.lock().await.insert(
            key.to_string(),
            Canned {
                status,
                body: body.into(),
                gate: Some(gate.clone()),
            },
        );
        gate
    }

    async fn requests(&self) -> Vec<String> {
        self.requests.lock().await.clone()
    }
}

async fn handle(
    State(backend): State<MockBackend>,
    method: Method,
    uri: Uri,
    body: String,
) -> Response {
    let key = format!("{method} {uri}");
    backend.requests.lock().await.push(key.clone());
    if !body.is_empty() {
        backend.bodies.lock().await.push(body);
    }
    let canned = backend.routes.lock().await.get(&key).cloned();
    match canned {
        Some(c) => {
            if let Some(gate) = c.gate {
                gate.notified().await;
            }
            (c.status, c.body).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn spawn_backend(backend: MockBackend) -> Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new().fallback(handle).with_state(backend);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

fn manager_for(base_url: &str, timeout: Duration) -> ViewStateManager {
    let client = KnowledgeClient::new(&ClientConfig {
        base_url: base_url.to_string(),
        request_timeout: timeout,
        user_agent: "knowledge-browser-tests".into(),
        recommendation_limit: None,
    })
    .expect("client");
    ViewStateManager::new(client)
}

async fn setup() -> (MockBackend, ViewStateManager) {
    let backend = MockBackend::default();
    let url = spawn_backend(backend.clone()).await.expect("spawn backend");
    (backend, manager_for(&url, Duration::from_secs(5)))
}

async fn settle(manager: &mut ViewStateManager) {
    tokio::time::timeout(Duration::from_secs(5), manager.settle())
        .await
        .expect("requests settled");
}

async fn next_applied(manager: &mut ViewStateManager) -> Applied {
    tokio::time::timeout(Duration::from_secs(5), manager.next())
        .await
        .expect("outcome arrived")
        .expect("outcome channel open")
}

fn entity(id: &str) -> KnowledgeEntity {
    KnowledgeEntity {
        id: id.into(),
        authors: vec![format!("Author {id}")],
        creation_date: Some(2020),
        issuer_id: Some("kpfu".into()),
        summary: format!("Summary of {id}"),
        title: format!("Document {id}"),
        kind: "article".into(),
    }
}

fn json<T: serde::Serialize>(v: &T) -> String {
    serde_json::to_string(v).expect("serialize")
}

#[tokio::test]
async fn start_loads_catalog_exactly_as_returned() {
    let (backend, mut manager) = setup().await;
    // Unsorted, with a duplicate: the client must not touch either.
    let items = vec![entity("3"), entity("1"), entity("3")];
    backend
        .route("GET /api/v1/knowledge", StatusCode::OK, json(&items))
        .await;

    manager.start();
    assert!(manager.state().is_loading);
    settle(&mut manager).await;

    let state = manager.state();
    assert_eq!(state.items, items);
    assert!(!state.is_loading);
    assert!(state.error.is_none());
    assert!(!state.shows_empty_placeholder());
}

#[tokio::test]
async fn empty_catalog_shows_placeholder() {
    let (backend, mut manager) = setup().await;
    backend
        .route("GET /api/v1/knowledge", StatusCode::OK, "[]")
        .await;

    manager.start();
    settle(&mut manager).await;
    assert!(manager.state().shows_empty_placeholder());
}

#[tokio::test]
async fn search_is_delegated_to_the_server() {
    let (backend, mut manager) = setup().await;
    backend
        .route(
            "GET /api/v1/knowledge?search=graph%20theory",
            StatusCode::OK,
            json(&vec![entity("9")]),
        )
        .await;

    manager.search("graph theory");
    settle(&mut manager).await;

    assert_eq!(manager.state().search_term, "graph theory");
    assert_eq!(manager.state().items, vec![entity("9")]);
    assert_eq!(
        backend.requests().await,
        vec!["GET /api/v1/knowledge?search=graph%20theory".to_string()]
    );
}

#[tokio::test]
async fn list_failure_keeps_previous_items() {
    let (backend, mut manager) = setup().await;
    backend
        .route("GET /api/v1/knowledge", StatusCode::OK, json(&vec![entity("1")]))
        .await;
    backend
        .route(
            "GET /api/v1/knowledge?search=x",
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error":"db down"}"#,
        )
        .await;

    manager.start();
    settle(&mut manager).await;
    manager.search("x");
    settle(&mut manager).await;

    let state = manager.state();
    assert_eq!(state.error.as_deref(), Some(LIST_ERROR));
    assert_eq!(state.items, vec![entity("1")]);
    assert!(!state.is_loading);
}

#[tokio::test]
async fn malformed_list_body_counts_as_failure() {
    let (backend, mut manager) = setup().await;
    backend
        .route("GET /api/v1/knowledge", StatusCode::OK, "<html>oops</html>")
        .await;

    manager.start();
    settle(&mut manager).await;
    assert_eq!(manager.state().error.as_deref(), Some(LIST_ERROR));
}

#[tokio::test]
async fn expired_request_counts_as_failure() {
    let backend = MockBackend::default();
    let url = spawn_backend(backend.clone()).await.expect("spawn backend");
    let mut manager = manager_for(&url, Duration::from_millis(200));
    let _never = backend
        .gated_route("GET /api/v1/knowledge", StatusCode::OK, "[]")
        .await;

    manager.start();
    settle(&mut manager).await;
    assert_eq!(manager.state().error.as_deref(), Some(LIST_ERROR));
    assert!(!manager.state().is_loading);
}

#[tokio::test]
async fn select_fetches_detail_then_recommendations() {
    let (backend, mut manager) = setup().await;
    backend
        .route("GET /api/v1/knowledge/A", StatusCode::OK, json(&entity("A")))
        .await;
    backend
        .route(
            "GET /api/v1/knowledge/A/recommendations",
            StatusCode::OK,
            json(&vec![entity("B"), entity("C")]),
        )
        .await;

    manager.select("A");
    settle(&mut manager).await;

    let state = manager.state();
    assert_eq!(state.view(), View::Viewing);
    assert_eq!(state.selected, Some(entity("A")));
    assert_eq!(state.recommendations, vec![entity("B"), entity("C")]);
    assert!(!state.is_loading_recommendations);
    assert_eq!(
        backend.requests().await,
        vec![
            "GET /api/v1/knowledge/A".to_string(),
            "GET /api/v1/knowledge/A/recommendations".to_string(),
        ]
    );
}

#[tokio::test]
async fn recommendations_apply_when_backend_normalizes_id() {
    let (backend, mut manager) = setup().await;
    backend
        .route("GET /api/v1/knowledge/ABC", StatusCode::OK, json(&entity("abc")))
        .await;
    backend
        .route(
            "GET /api/v1/knowledge/ABC/recommendations",
            StatusCode::OK,
            json(&vec![entity("R")]),
        )
        .await;

    manager.select("ABC");
    settle(&mut manager).await;

    let state = manager.state();
    assert_eq!(state.selected, Some(entity("abc")));
    assert_eq!(state.recommendations, vec![entity("R")]);
}

#[tokio::test]
async fn stale_recommendations_for_previous_selection_are_dropped() {
    let (backend, mut manager) = setup().await;
    backend
        .route("GET /api/v1/knowledge/A", StatusCode::OK, json(&entity("A")))
        .await;
    let gate_a = backend
        .gated_route(
            "GET /api/v1/knowledge/A/recommendations",
            StatusCode::OK,
            json(&vec![entity("X")]),
        )
        .await;
    backend
        .route("GET /api/v1/knowledge/B", StatusCode::OK, json(&entity("B")))
        .await;
    backend
        .route(
            "GET /api/v1/knowledge/B/recommendations",
            StatusCode::OK,
            json(&vec![entity("Y")]),
        )
        .await;

    manager.select("A");
    assert!(next_applied(&mut manager).await.changed);
    assert!(manager.state().is_loading_recommendations);

    manager.select("B");
    settle(&mut manager).await;
    assert_eq!(manager.state().selected, Some(entity("B")));
    assert_eq!(manager.state().recommendations, vec![entity("Y")]);

    gate_a.notify_one();
    assert!(!next_applied(&mut manager).await.changed);

    let state = manager.state();
    assert_eq!(state.selected, Some(entity("B")));
    assert_eq!(state.recommendations, vec![entity("Y")]);
    assert!(!state.is_loading_recommendations);
}

#[tokio::test]
async fn detail_loading_clears_before_recommendations_settle() {
    let (backend, mut manager) = setup().await;
    backend
        .route("GET /api/v1/knowledge/A", StatusCode::OK, json(&entity("A")))
        .await;
    let recs = backend
        .gated_route(
            "GET /api/v1/knowledge/A/recommendations",
            StatusCode::OK,
            json(&vec![entity("B")]),
        )
        .await;

    manager.select("A");
    assert!(next_applied(&mut manager).await.changed);
    assert!(!manager.state().is_loading);
    assert!(manager.state().is_loading_recommendations);

    recs.notify_one();
    settle(&mut manager).await;
    assert_eq!(manager.state().recommendations, vec![entity("B")]);
}

#[tokio::test]
async fn recommendation_failure_is_silent() {
    let (backend, mut manager) = setup().await;
    backend
        .route("GET /api/v1/knowledge/A", StatusCode::OK, json(&entity("A")))
        .await;
    backend
        .route(
            "GET /api/v1/knowledge/A/recommendations",
            StatusCode::INTERNAL_SERVER_ERROR,
            "boom",
        )
        .await;

    manager.select("A");
    settle(&mut manager).await;

    let state = manager.state();
    assert_eq!(state.selected, Some(entity("A")));
    assert!(state.recommendations.is_empty());
    assert!(state.error.is_none());
    assert!(!state.is_loading_recommendations);
}

#[tokio::test]
async fn detail_failure_keeps_current_selection() {
    let (backend, mut manager) = setup().await;
    backend
        .route("GET /api/v1/knowledge/A", StatusCode::OK, json(&entity("A")))
        .await;
    backend
        .route("GET /api/v1/knowledge/A/recommendations", StatusCode::OK, "[]")
        .await;

    manager.select("A");
    settle(&mut manager).await;
    // No route for "missing": the backend answers 404.
    manager.select("missing");
    settle(&mut manager).await;

    let state = manager.state();
    assert_eq!(state.error.as_deref(), Some(DETAIL_ERROR));
    assert_eq!(state.selected, Some(entity("A")));
}

#[tokio::test]
async fn back_keeps_items_and_search_term() {
    let (backend, mut manager) = setup().await;
    backend
        .route(
            "GET /api/v1/knowledge?search=graphs",
            StatusCode::OK,
            json(&vec![entity("A"), entity("B")]),
        )
        .await;
    backend
        .route("GET /api/v1/knowledge/A", StatusCode::OK, json(&entity("A")))
        .await;
    backend
        .route(
            "GET /api/v1/knowledge/A/recommendations",
            StatusCode::OK,
            json(&vec![entity("B")]),
        )
        .await;

    manager.search("graphs");
    settle(&mut manager).await;
    manager.select("A");
    settle(&mut manager).await;
    let before = manager.state().clone();
    let requests_before = backend.requests().await.len();

    manager.back();

    let state = manager.state();
    assert_eq!(state.view(), View::Listing);
    assert!(state.recommendations.is_empty());
    assert_eq!(state.items, before.items);
    assert_eq!(state.search_term, "graphs");
    assert_eq!(backend.requests().await.len(), requests_before);
}

#[tokio::test]
async fn late_detail_after_back_is_discarded() {
    let (backend, mut manager) = setup().await;
    let gate = backend
        .gated_route("GET /api/v1/knowledge/A", StatusCode::OK, json(&entity("A")))
        .await;

    manager.select("A");
    manager.back();
    assert!(!manager.state().is_loading);

    gate.notify_one();
    assert!(!next_applied(&mut manager).await.changed);
    assert_eq!(manager.state().view(), View::Listing);
}

#[tokio::test]
async fn select_race_keeps_latest_when_older_arrives_last() {
    let (backend, mut manager) = setup().await;
    let gate_a = backend
        .gated_route("GET /api/v1/knowledge/A", StatusCode::OK, json(&entity("A")))
        .await;
    backend
        .route(
            "GET /api/v1/knowledge/A/recommendations",
            StatusCode::OK,
            json(&vec![entity("X")]),
        )
        .await;
    backend
        .route("GET /api/v1/knowledge/B", StatusCode::OK, json(&entity("B")))
        .await;
    backend
        .route(
            "GET /api/v1/knowledge/B/recommendations",
            StatusCode::OK,
            json(&vec![entity("Y")]),
        )
        .await;

    manager.select("A");
    manager.select("B");
    settle(&mut manager).await;
    assert_eq!(manager.state().selected, Some(entity("B")));

    gate_a.notify_one();
    assert!(!next_applied(&mut manager).await.changed);

    let state = manager.state();
    assert_eq!(state.selected, Some(entity("B")));
    assert_eq!(state.recommendations, vec![entity("Y")]);
    assert!(!backend
        .requests()
        .await
        .contains(&"GET /api/v1/knowledge/A/recommendations".to_string()));
}

#[tokio::test]
async fn select_race_keeps_latest_when_older_arrives_first() {
    let (backend, mut manager) = setup().await;
    backend
        .route("GET /api/v1/knowledge/A", StatusCode::OK, json(&entity("A")))
        .await;
    let gate_b = backend
        .gated_route("GET /api/v1/knowledge/B", StatusCode::OK, json(&entity("B")))
        .await;
    backend
        .route(
            "GET /api/v1/knowledge/B/recommendations",
            StatusCode::OK,
            json(&vec![entity("Y")]),
        )
        .await;

    manager.select("A");
    manager.select("B");

    assert!(!next_applied(&mut manager).await.changed);
    assert!(manager.state().selected.is_none());
    assert!(manager.state().is_loading);

    gate_b.notify_one();
    settle(&mut manager).await;
    assert_eq!(manager.state().selected, Some(entity("B")));
    assert_eq!(manager.state().recommendations, vec![entity("Y")]);
    assert!(!manager.state().is_loading);
}

#[tokio::test]
async fn search_race_keeps_latest_results() {
    let (backend, mut manager) = setup().await;
    let gate_old = backend
        .gated_route(
            "GET /api/v1/knowledge?search=old",
            StatusCode::OK,
            json(&vec![entity("old")]),
        )
        .await;
    backend
        .route(
            "GET /api/v1/knowledge?search=new",
            StatusCode::OK,
            json(&vec![entity("new")]),
        )
        .await;

    manager.search("old");
    manager.search("new");
    settle(&mut manager).await;

    gate_old.notify_one();
    assert!(!next_applied(&mut manager).await.changed);
    assert_eq!(manager.state().items, vec![entity("new")]);
    assert_eq!(manager.state().search_term, "new");
}

#[tokio::test]
async fn create_success_resets_search_and_reloads_full_catalog() {
    let (backend, mut manager) = setup().await;
    backend
        .route(
            "GET /api/v1/knowledge?search=graphs",
            StatusCode::OK,
            json(&vec![entity("A")]),
        )
        .await;
    backend
        .route("POST /api/v1/knowledge", StatusCode::CREATED, json(&entity("N")))
        .await;
    backend
        .route(
            "GET /api/v1/knowledge",
            StatusCode::OK,
            json(&vec![entity("A"), entity("N")]),
        )
        .await;

    manager.search("graphs");
    settle(&mut manager).await;

    let url = "https://dspace.kpfu.ru/xmlui/handle/net/1";
    assert!(manager.create_from_url(url));
    assert!(manager.state().is_loading);
    let applied = next_applied(&mut manager).await;
    assert_eq!(applied.created.as_deref(), Some(url));
    assert_eq!(manager.state().search_term, "");
    settle(&mut manager).await;

    let state = manager.state();
    assert_eq!(state.items, vec![entity("A"), entity("N")]);
    assert!(state.error.is_none());
    assert_eq!(
        backend.requests().await.last().map(String::as_str),
        Some("GET /api/v1/knowledge")
    );
    let bodies = backend.bodies.lock().await.clone();
    let posted: serde_json::Value = serde_json::from_str(&bodies[0]).expect("json body");
    assert_eq!(posted, serde_json::json!({ "url": url }));
}

#[tokio::test]
async fn create_failure_with_json_error_surfaces_field() {
    let (backend, mut manager) = setup().await;
    backend
        .route(
            "POST /api/v1/knowledge",
            StatusCode::BAD_REQUEST,
            r#"{"error":"bad url"}"#,
        )
        .await;

    assert!(manager.create_from_url("nonsense"));
    let applied = next_applied(&mut manager).await;
    assert!(applied.created.is_none());
    assert_eq!(manager.state().error.as_deref(), Some("bad url"));
    assert!(!manager.state().is_loading);
}

#[tokio::test]
async fn create_failure_with_plain_text_surfaces_body() {
    let (backend, mut manager) = setup().await;
    backend
        .route(
            "POST /api/v1/knowledge",
            StatusCode::SERVICE_UNAVAILABLE,
            "server down",
        )
        .await;

    manager.create_from_url("https://example.org/doc");
    settle(&mut manager).await;
    assert_eq!(manager.state().error.as_deref(), Some("server down"));
    assert_eq!(backend.requests().await.len(), 1);
}

#[tokio::test]
async fn create_failure_without_body_uses_generic_message() {
    let (backend, mut manager) = setup().await;
    backend
        .route("POST /api/v1/knowledge", StatusCode::INTERNAL_SERVER_ERROR, "")
        .await;

    manager.create_from_url("https://example.org/doc");
    settle(&mut manager).await;
    assert_eq!(manager.state().error.as_deref(), Some(INGEST_ERROR));
}

#[tokio::test]
async fn create_posts_url_as_typed() {
    let (backend, mut manager) = setup().await;
    backend
        .route(
            "POST /api/v1/knowledge",
            StatusCode::BAD_REQUEST,
            r#"{"error":"bad url"}"#,
        )
        .await;

    let typed = " https://example.org/doc ";
    assert!(manager.create_from_url(typed));
    settle(&mut manager).await;

    let bodies = backend.bodies.lock().await.clone();
    let posted: serde_json::Value = serde_json::from_str(&bodies[0]).expect("json body");
    assert_eq!(posted, serde_json::json!({ "url": typed }));
}

#[tokio::test]
async fn create_with_empty_url_sends_nothing() {
    let (backend, mut manager) = setup().await;

    assert!(!manager.create_from_url("   "));
    assert!(!manager.state().is_loading);
    assert!(backend.requests().await.is_empty());
}
