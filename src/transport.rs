//! 네이티브 업데이트 트랜스포트
//!
//! 실제 원격 버전 확인과 번들 다운로드/교체는 프로세스 경계 너머의
//! 네이티브 측이 수행합니다. 이 모듈은 그 계약(`UpdateTransport`)과
//! HTTP 브리지 클라이언트(`BridgeTransport`)를 제공합니다.
//!
//! ## 브리지 엔드포인트
//! - `POST {base}/updater/check`   — `{ "type", "id", "entityId" }`
//! - `POST {base}/updater/install` — `{ "type", "path", "url" }`
//!
//! 응답은 `{ "success": true, ... }` 또는 `{ "success": false, "error": "..." }`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::entity::EntityType;
use crate::error::TransportError;

/// 원격 매니페스트 (버전만 사용)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteManifest {
    pub version: String,
}

/// 성공한 원격 확인 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUpdate {
    pub manifest: RemoteManifest,
    pub url: String,
}

/// 트랜스포트 계약
#[async_trait]
pub trait UpdateTransport: Send + Sync {
    async fn check(
        &self,
        updater_type: &str,
        updater_id: &str,
        entity_id: &str,
    ) -> Result<RemoteUpdate, TransportError>;

    async fn install(
        &self,
        kind: EntityType,
        installed_path: &Path,
        url: &str,
    ) -> Result<(), TransportError>;
}

// ═══════════════════════════════════════════════════════
// 와이어 타입
// ═══════════════════════════════════════════════════════

/// check 응답
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CheckResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<RemoteManifest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckResponse {
    pub fn into_result(self) -> Result<RemoteUpdate, TransportError> {
        if !self.success {
            return Err(TransportError::new(
                self.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        match (self.manifest, self.url) {
            (Some(manifest), Some(url)) => Ok(RemoteUpdate { manifest, url }),
            _ => Err(TransportError::new("malformed check response: missing manifest or url")),
        }
    }
}

/// install 응답
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InstallResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InstallResponse {
    pub fn into_result(self) -> Result<(), TransportError> {
        if self.success {
            Ok(())
        } else {
            Err(TransportError::new(
                self.error.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }
}

#[derive(Debug, Serialize)]
struct CheckRequest<'a> {
    #[serde(rename = "type")]
    updater_type: &'a str,
    id: &'a str,
    #[serde(rename = "entityId")]
    entity_id: &'a str,
}

#[derive(Debug, Serialize)]
struct InstallRequest<'a> {
    #[serde(rename = "type")]
    kind: EntityType,
    path: String,
    url: &'a str,
}

// ═══════════════════════════════════════════════════════
// BridgeTransport
// ═══════════════════════════════════════════════════════

/// 네이티브 브리지 HTTP 클라이언트
pub struct BridgeTransport {
    base_url: String,
    client: reqwest::Client,
}

impl BridgeTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent("replugged-updater/1.0")
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::new(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, TransportError>
    where
        B: Serialize + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::new(format!("Request failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(TransportError::new(format!("HTTP {}", resp.status())));
        }

        resp.json()
            .await
            .map_err(|e| TransportError::new(format!("Parse error: {}", e)))
    }
}

#[async_trait]
impl UpdateTransport for BridgeTransport {
    async fn check(
        &self,
        updater_type: &str,
        updater_id: &str,
        entity_id: &str,
    ) -> Result<RemoteUpdate, TransportError> {
        let req = CheckRequest {
            updater_type,
            id: updater_id,
            entity_id,
        };
        let resp: CheckResponse = self.post("/updater/check", &req).await?;
        resp.into_result()
    }

    async fn install(
        &self,
        kind: EntityType,
        installed_path: &Path,
        url: &str,
    ) -> Result<(), TransportError> {
        let req = InstallRequest {
            kind,
            path: installed_path.to_string_lossy().to_string(),
            url,
        };
        let resp: InstallResponse = self.post("/updater/install", &req).await?;
        resp.into_result()
    }
}
