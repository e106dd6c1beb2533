//! # Replugged 업데이터 라이브러리
//!
//! 플러그인/테마(ASAR 번들)의 새 버전 확인, 업데이트 가능 상태의 영속화,
//! 그리고 설치 오케스트레이션을 담당합니다.
//!
//! ## 동작 원리
//! - **확인**: 엔티티별로 기록된 원격 버전과 설치 버전을 비교하고,
//!   필요할 때만 네이티브 트랜스포트에 원격 확인을 요청
//! - **설치**: 업데이트 가능(또는 강제) 엔티티를 네이티브 트랜스포트로 교체하고
//!   이번 프로세스의 완료 목록에 추가 (리로드는 하지 않음)
//! - **일괄 처리**: 전체 엔티티를 동시에 확인/설치하며, 개별 실패는 서로 영향 없음
//!
//! ## 구성
//! - **record.rs**: 업데이트 레코드, 부분 병합, 스키마 검증
//! - **store.rs**: 네임스페이스 설정 저장소 (메모리 / JSON 파일)
//! - **entity.rs**: 엔티티와 디렉터리 계약
//! - **transport.rs**: 네이티브 트랜스포트 계약과 HTTP 브리지
//! - **engine.rs**: 업데이트 상태 엔진
//! - **scheduler.rs**: 확인 주기 판단
//! - **ipc.rs**: `/api/updater/*` HTTP 라우터
//!
//! ## 영속 상태
//! `dev.replugged.Updater.State` 네임스페이스에 엔티티 ID별로 저장됩니다:
//! ```json
//! {
//!   "dev.foo.bar": {
//!     "available": true,
//!     "version": "1.1.0",
//!     "url": "https://x/foo-1.1.0",
//!     "lastChecked": 1760000000000
//!   }
//! }
//! ```

// ══════════════════════════════════════════════════════
// 모듈
// ══════════════════════════════════════════════════════

pub mod completed;
pub mod config;
pub mod engine;
pub mod entity;
pub mod error;
pub mod ipc;
pub mod record;
pub mod scheduler;
pub mod store;
pub mod transport;


// Re-exports for convenience
pub use completed::CompletedUpdates;
pub use config::{MainUpdaterSettings, UpdaterConfig, SETTINGS_NAMESPACE, STATE_NAMESPACE};
pub use engine::{AvailableUpdate, CheckOutcome, UpdateEngine};
pub use entity::{Entity, EntityDirectory, EntityManifest, EntityType, MemoryDirectory, UpdaterDescriptor};
pub use error::{StoreError, TransportError, UpdaterError};
pub use ipc::updater_router;
pub use record::{RecordPatch, UpdateRecord};
pub use store::{JsonFileStore, MemoryStore, SettingsHandle, SettingsStore};
pub use transport::{BridgeTransport, RemoteManifest, RemoteUpdate, UpdateTransport};
