//! WebDriver and cloud clients against in-process axum mock servers.

use autopilot_tools::*;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[derive(Default)]
struct DriverState {
    url: Mutex<String>,
    page_load_timeout: Mutex<Option<u64>>,
    deleted: Mutex<Vec<String>>,
}

type Shared = Arc<DriverState>;

async fn new_session(Json(body): Json<Value>) -> Json<Value> {
    assert_eq!(body["capabilities"]["alwaysMatch"]["browserName"], "chrome");
    Json(json!({ "value": { "sessionId": "sess-1", "capabilities": {} } }))
}

async fn set_timeouts(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    *state.page_load_timeout.lock().unwrap() = body["pageLoad"].as_u64();
    Json(json!({ "value": null }))
}

async fn navigate(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    *state.url.lock().unwrap() = body["url"].as_str().unwrap_or_default().to_string();
    Json(json!({ "value": null }))
}

async fn current_url(State(state): State<Shared>) -> Json<Value> {
    Json(json!({ "value": state.url.lock().unwrap().clone() }))
}

async fn find_element(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    assert_eq!(body["using"], "css selector");
    if body["value"] == "h1" {
        (
            StatusCode::OK,
            Json(json!({ "value": { "element-6066-11e4-a52e-4f735466cecf": "el-1" } })),
        )
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({
                "value": { "error": "no such element", "message": "Unable to locate element" }
            })),
        )
    }
}

async fn element_text(Path((_session, element)): Path<(String, String)>) -> Json<Value> {
    assert_eq!(element, "el-1");
    Json(json!({ "value": "Example Domain" }))
}

async fn delete_session(State(state): State<Shared>, Path(session): Path<String>) -> Json<Value> {
    state.deleted.lock().unwrap().push(session);
    Json(json!({ "value": null }))
}

async fn webdriver_server() -> (String, Shared) {
    let state: Shared = Arc::new(DriverState::default());
    let app = Router::new()
        .route("/session", post(new_session))
        .route("/session/:id", axum::routing::delete(delete_session))
        .route("/session/:id/timeouts", post(set_timeouts))
        .route("/session/:id/url", post(navigate).get(current_url))
        .route("/session/:id/element", post(find_element))
        .route("/session/:id/element/:element/text", get(element_text))
        .with_state(state.clone());
    (spawn(app).await, state)
}

#[tokio::test]
async fn test_webdriver_session_lifecycle() {
    let (endpoint, state) = webdriver_server().await;
    let launcher = WebDriverLauncher::new(endpoint).with_navigation_timeout(2_000);

    let mut driver = launcher.launch().await.unwrap();
    assert_eq!(*state.page_load_timeout.lock().unwrap(), Some(2_000));

    driver.navigate("https://example.com").await.unwrap();
    assert_eq!(driver.current_url().await.unwrap(), "https://example.com");
    assert_eq!(driver.extract_text("h1").await.unwrap(), "Example Domain");

    driver.close().await.unwrap();
    assert_eq!(*state.deleted.lock().unwrap(), vec!["sess-1".to_string()]);
}

#[tokio::test]
async fn test_webdriver_missing_element() {
    let (endpoint, _state) = webdriver_server().await;
    let mut driver = WebDriverLauncher::new(endpoint).launch().await.unwrap();

    let result = driver.extract_text(".absent").await;
    assert!(matches!(result, Err(ToolError::ElementNotFound(selector)) if selector == ".absent"));
}

#[tokio::test]
async fn test_webdriver_unreachable_endpoint() {
    let result = WebDriverLauncher::new("http://127.0.0.1:9").launch().await;
    assert!(matches!(result, Err(ToolError::Browser(_))));
}

#[derive(Default)]
struct CloudState {
    requests: Mutex<Vec<(String, Value, Option<String>)>>,
}

async fn cloud_server() -> (String, Arc<CloudState>) {
    let state = Arc::new(CloudState::default());
    let app = Router::new()
        .route(
            "/functions",
            post(
                |State(state): State<Arc<CloudState>>,
                 headers: axum::http::HeaderMap,
                 Json(body): Json<Value>| async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    let name = body["function_name"].as_str().unwrap_or_default().to_string();
                    state
                        .requests
                        .lock()
                        .unwrap()
                        .push(("functions".into(), body, auth));
                    Json(json!({ "function_arn": format!("arn:mock:function:{}", name) }))
                },
            ),
        )
        .route(
            "/buckets",
            post(
                |State(state): State<Arc<CloudState>>, Json(body): Json<Value>| async move {
                    if body["bucket_name"] == "forbidden" {
                        return (StatusCode::FORBIDDEN, Json(json!({ "error": "access denied" })));
                    }
                    state
                        .requests
                        .lock()
                        .unwrap()
                        .push(("buckets".into(), body, None));
                    (StatusCode::CREATED, Json(json!({})))
                },
            ),
        )
        .with_state(state.clone());
    (spawn(app).await, state)
}

#[tokio::test]
async fn test_cloud_create_function_and_bucket() {
    let (endpoint, state) = cloud_server().await;
    let provider = HttpCloudProvider::new(endpoint, "ca-central-1").with_token(Some("secret".into()));

    let function = provider.create_function("ingest", "python3.9").await.unwrap();
    assert_eq!(function.function_arn, "arn:mock:function:ingest");
    assert_eq!(function.runtime, "python3.9");

    let bucket = provider.create_bucket("raw-data").await.unwrap();
    assert_eq!(bucket.region, "ca-central-1");

    let requests = state.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].1["region"], "ca-central-1");
    assert_eq!(requests[0].2.as_deref(), Some("Bearer secret"));
    assert_eq!(requests[1].0, "buckets");
}

#[tokio::test]
async fn test_cloud_error_status() {
    let (endpoint, _state) = cloud_server().await;
    let provider = HttpCloudProvider::new(endpoint, "ca-central-1");

    let result = provider.create_bucket("forbidden").await;
    match result {
        Err(ToolError::Cloud(message)) => {
            assert!(message.contains("403"));
            assert!(message.contains("access denied"));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}
