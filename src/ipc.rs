//! 업데이터 HTTP API — `/api/updater/*`
//!
//! UI/자동화 계층이 엔진을 호출할 수 있도록 라이브러리 표면을 그대로 노출합니다.
//!
//! ## 엔드포인트
//! - `GET  /api/updater/settings`      — 메인 설정 조회
//! - `GET  /api/updater/state/:id`     — 엔티티 업데이트 레코드 조회
//! - `GET  /api/updater/available`     — 업데이트 가능 목록
//! - `POST /api/updater/check`         — 전체 확인
//! - `POST /api/updater/check/:id`     — 단일 확인
//! - `POST /api/updater/install`       — 전체 설치 (모든 결과를 기다림)
//! - `POST /api/updater/install/:id`   — 단일 설치

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::engine::UpdateEngine;

/// `/api/updater/*` 라우트를 포함하는 axum Router 생성
pub fn updater_router(engine: UpdateEngine) -> Router {
    Router::new()
        .route("/api/updater/settings", get(get_settings))
        .route("/api/updater/state/:id", get(get_state))
        .route("/api/updater/available", get(get_available))
        .route("/api/updater/check", post(check_all))
        .route("/api/updater/check/:id", post(check_one))
        .route("/api/updater/install", post(install_all))
        .route("/api/updater/install/:id", post(install_one))
        .with_state(engine)
}

/// check 요청 본문 (생략 가능)
#[derive(Debug, Default, Deserialize)]
struct CheckRequest {
    verbose: Option<bool>,
}

/// install 요청 본문 (생략 가능)
#[derive(Debug, Default, Deserialize)]
struct InstallRequest {
    #[serde(default)]
    force: bool,
    verbose: Option<bool>,
}

/// 빈 본문은 기본값으로
fn body_or_default<T: Default + for<'de> Deserialize<'de>>(body: &str) -> Result<T, String> {
    if body.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(body).map_err(|e| format!("Invalid request body: {}", e))
}

async fn get_settings(State(engine): State<UpdateEngine>) -> impl IntoResponse {
    Json(json!({
        "ok": true,
        "settings": engine.get_main_updater_settings(),
    }))
}

async fn get_state(
    State(engine): State<UpdateEngine>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    Json(json!({
        "ok": true,
        "id": id,
        "state": engine.get_update_settings(&id),
    }))
}

async fn get_available(State(engine): State<UpdateEngine>) -> impl IntoResponse {
    let updates = engine.get_available_updates();
    Json(json!({
        "ok": true,
        "count": updates.len(),
        "updates": updates,
    }))
}

async fn check_all(State(engine): State<UpdateEngine>, body: String) -> impl IntoResponse {
    let req: CheckRequest = match body_or_default(&body) {
        Ok(r) => r,
        Err(e) => return Json(json!({ "ok": false, "error": e })),
    };
    engine.check_all_updates(req.verbose.unwrap_or(false)).await;

    Json(json!({
        "ok": true,
        "last_checked": engine.get_main_updater_settings().last_checked,
        "available": engine.get_available_updates().len(),
    }))
}

async fn check_one(
    State(engine): State<UpdateEngine>,
    Path(id): Path<String>,
    body: String,
) -> impl IntoResponse {
    let req: CheckRequest = match body_or_default(&body) {
        Ok(r) => r,
        Err(e) => return Json(json!({ "ok": false, "error": e })),
    };

    match engine.check_and_log(&id, req.verbose.unwrap_or(true)).await {
        Ok(_) => Json(json!({
            "ok": true,
            "id": id,
            "state": engine.get_update_settings(&id),
        })),
        Err(e) => Json(json!({
            "ok": !e.is_failure(),
            "id": id,
            "error": e.to_string(),
            "state": engine.get_update_settings(&id),
        })),
    }
}

async fn install_all(State(engine): State<UpdateEngine>, body: String) -> impl IntoResponse {
    let req: InstallRequest = match body_or_default(&body) {
        Ok(r) => r,
        Err(e) => return Json(json!({ "ok": false, "error": e })),
    };

    let handles = engine.install_all_updates(req.force, req.verbose.unwrap_or(false));
    let mut results = Map::new();
    for (id, handle) in handles {
        let installed = match handle.await {
            Ok(installed) => installed,
            Err(e) => {
                tracing::error!("[Updater] Install task for {} aborted: {}", id, e);
                false
            }
        };
        results.insert(id, Value::Bool(installed));
    }

    Json(json!({
        "ok": results.values().all(|v| v == &Value::Bool(true)),
        "results": results,
    }))
}

async fn install_one(
    State(engine): State<UpdateEngine>,
    Path(id): Path<String>,
    body: String,
) -> impl IntoResponse {
    let req: InstallRequest = match body_or_default(&body) {
        Ok(r) => r,
        Err(e) => return Json(json!({ "ok": false, "error": e })),
    };

    let installed = engine
        .install_update(&id, req.force, req.verbose.unwrap_or(true))
        .await;
    Json(json!({
        "ok": installed,
        "id": id,
        "state": engine.get_update_settings(&id),
    }))
}
