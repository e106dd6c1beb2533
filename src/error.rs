//! 업데이터 에러 타입
//!
//! ## 분류
//! - 엔티티를 찾을 수 없음 / 업데이트 불가 엔티티
//! - 매니페스트에 업데이터 정보 없음
//! - 네이티브 트랜스포트 실패 (확인/설치)
//! - 불일치 상태 (업데이트 가능인데 URL 없음)
//! - 설정 저장소 오류
//!
//! 손상된 영속 레코드는 에러로 노출하지 않습니다 (`record::validate` 참조).

use thiserror::Error;

/// 설정 저장소 에러
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write namespace '{namespace}' to {path}: {source}")]
    Io {
        namespace: String,
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize namespace '{namespace}': {source}")]
    Serialize {
        namespace: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 네이티브 트랜스포트가 보고한 실패
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// 업데이트 엔진 에러
#[derive(Debug, Error)]
pub enum UpdaterError {
    #[error("Entity {id} not found")]
    NotFound { id: String },

    #[error("Entity {id} is not an ASAR file, cannot be updated")]
    NotUpdatable { id: String },

    #[error("Entity {id} has no updater info")]
    MissingUpdaterInfo { id: String },

    #[error("Entity {id} has no update available")]
    NotAvailable { id: String },

    #[error("Update {operation} for entity {id} failed: {source}")]
    Transport {
        id: String,
        operation: &'static str,
        #[source]
        source: TransportError,
    },

    #[error("Entity {id} has no update URL")]
    InconsistentState { id: String },

    #[error("Failed to persist update state for {id}: {source}")]
    Store {
        id: String,
        #[source]
        source: StoreError,
    },
}

impl UpdaterError {
    /// 호출자 쪽 버그나 외부 장애를 의미하는지 여부.
    /// false면 "할 일 없음"에 해당하는 정상적인 no-op.
    pub fn is_failure(&self) -> bool {
        !matches!(
            self,
            UpdaterError::NotUpdatable { .. } | UpdaterError::NotAvailable { .. }
        )
    }

    /// 분류별 로그 레벨로 출력. 정보성 분류만 `verbose`에 의해 억제됨
    pub fn log(&self, verbose: bool) {
        match self {
            UpdaterError::NotUpdatable { .. } | UpdaterError::NotAvailable { .. } => {
                if verbose {
                    tracing::info!("[Updater] {}", self);
                }
            }
            UpdaterError::MissingUpdaterInfo { .. } => {
                tracing::warn!("[Updater] {}", self);
            }
            UpdaterError::NotFound { .. }
            | UpdaterError::Transport { .. }
            | UpdaterError::InconsistentState { .. }
            | UpdaterError::Store { .. } => {
                tracing::error!("[Updater] {}", self);
            }
        }
    }
}
