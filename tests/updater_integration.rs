//! ═══════════════════════════════════════════════════════════════════
//! 업데이터 통합 테스트
//! ═══════════════════════════════════════════════════════════════════
//!
//! 전체 업데이트 파이프라인을 테스트합니다:
//!
//! 1. **브리지 모킹** — 로컬 HTTP 서버로 네이티브 check/install 응답
//! 2. **BridgeTransport** — 성공/실패/HTTP 오류 매핑
//! 3. **UpdateEngine 전체 흐름** — 설정 파일 → JSON 저장소 → check → install
//! 4. **HTTP API** — Axum 라우터를 직접 호출
//!
//! 모든 테스트는 `tempdir`을 사용해 파일시스템을 격리합니다.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

use replugged_updater::{
    updater_router, BridgeTransport, Entity, EntityManifest, EntityType, MemoryDirectory,
    SettingsStore, JsonFileStore, UpdateEngine, UpdateTransport, UpdaterConfig,
    UpdaterDescriptor, STATE_NAMESPACE,
};

// ═══════════════════════════════════════════════════════
// 테스트 유틸리티
// ═══════════════════════════════════════════════════════

/// 모킹 브리지 상태: updater id → 원격 버전, 설치 요청 기록
#[derive(Clone, Default)]
struct MockBridge {
    versions: Arc<Mutex<HashMap<String, String>>>,
    installs: Arc<Mutex<Vec<Value>>>,
    fail_install: Arc<Mutex<bool>>,
}

async fn mock_check(State(bridge): State<MockBridge>, Json(body): Json<Value>) -> Json<Value> {
    let updater_id = body["id"].as_str().unwrap_or_default().to_string();
    let entity_id = body["entityId"].as_str().unwrap_or_default().to_string();
    let version = bridge.versions.lock().unwrap().get(&updater_id).cloned();
    match version {
        Some(v) => Json(json!({
            "success": true,
            "manifest": { "id": entity_id, "version": v },
            "url": format!("https://x/{}-{}", entity_id, v),
        })),
        None => Json(json!({
            "success": false,
            "error": format!("no release for {}", updater_id),
        })),
    }
}

async fn mock_install(State(bridge): State<MockBridge>, Json(body): Json<Value>) -> Json<Value> {
    if *bridge.fail_install.lock().unwrap() {
        return Json(json!({ "success": false, "error": "EBUSY: file in use" }));
    }
    bridge.installs.lock().unwrap().push(body);
    Json(json!({ "success": true }))
}

/// 로컬 모킹 브리지 서버 시작
/// 반환: (서버 주소, JoinHandle)
async fn start_mock_bridge(bridge: MockBridge) -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = Router::new()
        .route("/updater/check", post(mock_check))
        .route("/updater/install", post(mock_install))
        .route(
            "/broken/updater/check",
            post(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .with_state(bridge);

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, handle)
}

fn plugin(id: &str, version: &str) -> Entity {
    Entity::new(
        format!("/replugged/plugins/{}.asar", id),
        EntityManifest {
            id: id.to_string(),
            version: version.to_string(),
            kind: EntityType::Plugin,
            updater: Some(UpdaterDescriptor {
                kind: "github".to_string(),
                id: format!("replugged-org/{}", id),
            }),
        },
    )
}

fn engine_with_bridge(addr: SocketAddr, tmp: &TempDir, directory: Arc<MemoryDirectory>) -> UpdateEngine {
    let config = UpdaterConfig {
        settings_dir: tmp.path().join("settings"),
        bridge_url: format!("http://{}", addr),
        request_timeout_secs: 5,
    };
    UpdateEngine::from_config(&config, directory).unwrap()
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Value {
    let req = axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(
            body.map(|b| b.to_string()).unwrap_or_default(),
        ))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert!(resp.status().is_success());
    let body = axum::body::to_bytes(resp.into_body(), 1024 * 64).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

// ═══════════════════════════════════════════════════════
// 테스트 1: BridgeTransport
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_bridge_check_and_install() {
    let bridge = MockBridge::default();
    bridge
        .versions
        .lock()
        .unwrap()
        .insert("replugged-org/foo".into(), "1.1.0".into());
    let (addr, _handle) = start_mock_bridge(bridge.clone()).await;

    let transport = BridgeTransport::new(&format!("http://{}", addr), Duration::from_secs(5)).unwrap();

    let update = transport.check("github", "replugged-org/foo", "foo").await.unwrap();
    assert_eq!(update.manifest.version, "1.1.0");
    assert_eq!(update.url, "https://x/foo-1.1.0");

    let err = transport.check("github", "replugged-org/missing", "missing").await.unwrap_err();
    assert_eq!(err.to_string(), "no release for replugged-org/missing");

    transport
        .install(EntityType::Theme, Path::new("/replugged/themes/dark.asar"), "https://x/dark")
        .await
        .unwrap();
    let installs = bridge.installs.lock().unwrap().clone();
    assert_eq!(
        installs,
        vec![json!({
            "type": "replugged-theme",
            "path": "/replugged/themes/dark.asar",
            "url": "https://x/dark",
        })]
    );
}

#[tokio::test]
async fn test_bridge_http_errors_are_transport_failures() {
    let (addr, _handle) = start_mock_bridge(MockBridge::default()).await;

    let transport =
        BridgeTransport::new(&format!("http://{}/broken", addr), Duration::from_secs(5)).unwrap();
    let err = transport.check("github", "x", "x").await.unwrap_err();
    assert!(err.to_string().starts_with("HTTP 500"), "{}", err);

    // 아무도 듣지 않는 포트
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let dead = listener.local_addr().unwrap();
    drop(listener);
    let transport = BridgeTransport::new(&format!("http://{}", dead), Duration::from_secs(2)).unwrap();
    let err = transport.check("github", "x", "x").await.unwrap_err();
    assert!(err.to_string().starts_with("Request failed"), "{}", err);
}

// ═══════════════════════════════════════════════════════
// 테스트 2: 엔진 + JSON 저장소 + 브리지
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_full_pipeline_persists_to_disk() {
    let bridge = MockBridge::default();
    bridge
        .versions
        .lock()
        .unwrap()
        .insert("replugged-org/foo".into(), "1.1.0".into());
    let (addr, _handle) = start_mock_bridge(bridge.clone()).await;

    let tmp = TempDir::new().unwrap();
    let directory = Arc::new(MemoryDirectory::new());
    directory.insert(plugin("foo", "1.0.0"));

    let engine = engine_with_bridge(addr, &tmp, directory.clone());
    engine.check_update("foo", true).await;
    assert!(engine.install_update("foo", false, true).await);
    assert_eq!(bridge.installs.lock().unwrap().len(), 1);

    // 새 프로세스: 디스크에서 상태를 다시 읽음, 완료 목록은 비어 있음
    let store = JsonFileStore::new(tmp.path().join("settings"));
    let raw = store.get(STATE_NAMESPACE, "foo").unwrap();
    assert_eq!(raw["available"], json!(false));
    assert_eq!(raw["version"], json!("1.1.0"));
    assert_eq!(raw["url"], json!("https://x/foo-1.1.0"));
    assert!(raw["lastChecked"].is_i64());

    // 재시작 후 1.1.0이 로드됨
    directory.insert(plugin("foo", "1.1.0"));
    let restarted = engine_with_bridge(addr, &tmp, directory);
    assert!(restarted.completed_updates().is_empty());
    restarted.check_update("foo", false).await;
    assert_eq!(restarted.get_update_settings("foo").available, Some(false));
    assert!(restarted.get_available_updates().is_empty());
}

#[tokio::test]
async fn test_config_file_drives_wiring() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("updater.toml");
    std::fs::write(
        &path,
        format!(
            "[updater]\nsettings_dir = \"{}\"\nbridge_url = \"http://127.0.0.1:1\"\n",
            tmp.path().join("store").display().to_string().replace('\\', "/")
        ),
    )
    .unwrap();

    let config = UpdaterConfig::load(&path).unwrap();
    assert_eq!(config.request_timeout_secs, 30);

    let engine = UpdateEngine::from_config(&config, Arc::new(MemoryDirectory::new())).unwrap();
    assert_eq!(engine.get_main_updater_settings().check_interval, Some(3_600_000));
}

// ═══════════════════════════════════════════════════════
// 테스트 3: HTTP API
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_updater_api_round_trip() {
    let bridge = MockBridge::default();
    {
        let mut versions = bridge.versions.lock().unwrap();
        versions.insert("replugged-org/foo".into(), "1.1.0".into());
        versions.insert("replugged-org/bar".into(), "2.0.0".into());
    }
    let (addr, _handle) = start_mock_bridge(bridge.clone()).await;

    let tmp = TempDir::new().unwrap();
    let directory = Arc::new(MemoryDirectory::new());
    directory.insert(plugin("foo", "1.0.0"));
    directory.insert(plugin("bar", "2.0.0"));
    let app = updater_router(engine_with_bridge(addr, &tmp, directory));

    let settings = call(&app, "GET", "/api/updater/settings", None).await;
    assert_eq!(settings["settings"]["checkInterval"], json!(3_600_000));

    let checked = call(&app, "POST", "/api/updater/check", None).await;
    assert_eq!(checked["ok"], json!(true));
    assert_eq!(checked["available"], json!(1));
    assert!(checked["last_checked"].is_i64());

    let state = call(&app, "GET", "/api/updater/state/foo", None).await;
    assert_eq!(state["state"]["available"], json!(true));
    assert_eq!(state["state"]["version"], json!("1.1.0"));

    let available = call(&app, "GET", "/api/updater/available", None).await;
    assert_eq!(available["count"], json!(1));
    assert_eq!(available["updates"][0]["id"], json!("foo"));

    let installed = call(&app, "POST", "/api/updater/install", Some(json!({}))).await;
    assert_eq!(installed["ok"], json!(true));
    assert_eq!(installed["results"]["foo"], json!(true));

    // 이미 최신인 엔티티는 강제 없이 설치되지 않음
    let single = call(&app, "POST", "/api/updater/install/bar", None).await;
    assert_eq!(single["ok"], json!(false));

    let missing = call(&app, "POST", "/api/updater/check/ghost", Some(json!({ "verbose": false }))).await;
    assert_eq!(missing["ok"], json!(false));
    assert_eq!(missing["error"], json!("Entity ghost not found"));

    let bad = call(&app, "POST", "/api/updater/install/foo", Some(json!({ "force": "yes" }))).await;
    assert_eq!(bad["ok"], json!(false));
    assert!(bad["error"].as_str().unwrap().starts_with("Invalid request body"));
}

#[tokio::test]
async fn test_install_failure_reported_via_api() {
    let bridge = MockBridge::default();
    bridge
        .versions
        .lock()
        .unwrap()
        .insert("replugged-org/foo".into(), "1.1.0".into());
    *bridge.fail_install.lock().unwrap() = true;
    let (addr, _handle) = start_mock_bridge(bridge).await;

    let tmp = TempDir::new().unwrap();
    let directory = Arc::new(MemoryDirectory::new());
    directory.insert(plugin("foo", "1.0.0"));
    let app = updater_router(engine_with_bridge(addr, &tmp, directory));

    let checked = call(&app, "POST", "/api/updater/check/foo", None).await;
    assert_eq!(checked["ok"], json!(true));
    assert_eq!(checked["state"]["available"], json!(true));

    let result = call(&app, "POST", "/api/updater/install/foo", Some(json!({ "verbose": false }))).await;
    assert_eq!(result["ok"], json!(false));
    // 실패한 설치는 상태를 바꾸지 않으므로 재시도 가능
    assert_eq!(result["state"]["available"], json!(true));
    assert_eq!(result["state"]["url"], json!("https://x/foo-1.1.0"));
}
