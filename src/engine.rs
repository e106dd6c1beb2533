//! 업데이트 상태 엔진
//!
//! 엔티티마다 세 가지 사실을 하나의 결정으로 합칩니다:
//! 로컬 설치 버전, 마지막으로 알려진 원격 버전, 그리고 "설치 완료 후 리로드 대기" 상태.
//!
//! ## 흐름
//! - **확인**: 디렉터리에서 엔티티 조회 → 영속 상태 조회 →
//!   로컬 불일치 단축 경로 또는 트랜스포트 확인 → 상태 기록
//! - **설치**: 영속 상태로 자격 확인 → 트랜스포트 설치 →
//!   `available = false` 기록 + 완료 목록 추가
//!
//! 같은 엔티티에 대한 동시 호출 사이에는 상호 배제가 없습니다.
//! 레코드 읽기/쓰기는 키 단위로만 원자적이며 마지막 쓰기가 이깁니다.

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::completed::CompletedUpdates;
use crate::config::{MainUpdaterSettings, UpdaterConfig, SETTINGS_NAMESPACE, STATE_NAMESPACE};
use crate::entity::{Entity, EntityDirectory};
use crate::error::UpdaterError;
use crate::record::{self, RecordPatch, UpdateRecord, Validation};
use crate::store::{self, JsonFileStore, SettingsHandle, SettingsStore};
use crate::transport::{BridgeTransport, UpdateTransport};

/// 단일 확인 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// 로컬 버전이 기록과 달라 원격 확인 없이 `available = true`로 표시
    ForcedAvailable,
    UpToDate { version: String },
    UpdateAvailable { version: String },
}

impl CheckOutcome {
    /// 결과 로그 문구. verbose가 아니면 업데이트 발견만 남김
    pub fn message(&self, id: &str, verbose: bool) -> Option<String> {
        match self {
            CheckOutcome::ForcedAvailable if verbose => Some(format!(
                "Entity {} version differs from previous, forcing new update",
                id
            )),
            CheckOutcome::UpToDate { .. } if verbose => {
                Some(format!("Entity {} is up to date", id))
            }
            CheckOutcome::UpdateAvailable { version } => {
                Some(format!("Entity {} has an update available ({})", id, version))
            }
            _ => None,
        }
    }
}

/// `get_available_updates` 항목
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableUpdate {
    pub id: String,
    #[serde(flatten)]
    pub record: UpdateRecord,
}

#[derive(Clone)]
pub struct UpdateEngine {
    directory: Arc<dyn EntityDirectory>,
    transport: Arc<dyn UpdateTransport>,
    settings: SettingsHandle,
    state: SettingsHandle,
    pub(crate) completed: CompletedUpdates,
}

impl UpdateEngine {
    pub fn new(
        store: Arc<dyn SettingsStore>,
        directory: Arc<dyn EntityDirectory>,
        transport: Arc<dyn UpdateTransport>,
    ) -> Self {
        Self {
            directory,
            transport,
            settings: store::init(
                store.clone(),
                SETTINGS_NAMESPACE,
                MainUpdaterSettings::defaults(),
            ),
            state: store::init(store, STATE_NAMESPACE, Map::new()),
            completed: CompletedUpdates::new(),
        }
    }

    /// 설정 파일 기준으로 `JsonFileStore` + `BridgeTransport` 배선
    pub fn from_config(
        config: &UpdaterConfig,
        directory: Arc<dyn EntityDirectory>,
    ) -> anyhow::Result<Self> {
        let store = Arc::new(JsonFileStore::new(config.settings_dir.clone()));
        let transport = BridgeTransport::new(&config.bridge_url, config.request_timeout())?;
        tracing::info!(
            "[Updater] Using settings at {} and bridge {}",
            store.dir().display(),
            transport.base_url()
        );
        Ok(Self::new(store, directory, Arc::new(transport)))
    }

    // ═══════════════════════════════════════════════════════
    // 상태 조회
    // ═══════════════════════════════════════════════════════

    /// 엔티티의 영속 레코드. 검증에 실패하면 빈 레코드
    pub fn get_update_settings(&self, id: &str) -> UpdateRecord {
        match record::validate(self.state.get(id).as_ref()) {
            Validation::Invalid(reason) => {
                tracing::debug!("[Updater] Discarding malformed state for {}: {}", id, reason);
                UpdateRecord::default()
            }
            v => v.into_record(),
        }
    }

    pub fn get_main_updater_settings(&self) -> MainUpdaterSettings {
        MainUpdaterSettings::from_map(&self.settings.all())
    }

    /// 이번 프로세스에서 설치를 마친 엔티티 ID 목록
    pub fn completed_updates(&self) -> Vec<String> {
        self.completed.snapshot()
    }

    /// `available = true`이거나 이번 프로세스에서 설치를 마친 엔티티 (ID 순)
    pub fn get_available_updates(&self) -> Vec<AvailableUpdate> {
        let mut records: BTreeMap<String, UpdateRecord> = self
            .state
            .all()
            .into_iter()
            .map(|(id, value)| (id, record::validate(Some(&value)).into_record()))
            .collect();
        for id in self.completed.snapshot() {
            records.entry(id).or_default();
        }

        records
            .into_iter()
            .filter(|(id, record)| record.is_available() || self.completed.contains(id))
            .map(|(id, mut record)| {
                // 항목 ID가 레코드 안의 `id` 키보다 우선
                record.extra.remove("id");
                AvailableUpdate { id, record }
            })
            .collect()
    }

    fn write_record(&self, id: &str, record: &UpdateRecord) -> Result<(), UpdaterError> {
        self.state
            .set(id, record.to_value())
            .map_err(|source| UpdaterError::Store {
                id: id.to_string(),
                source,
            })
    }

    /// 플러그인 레지스트리 우선, 없으면 테마 레지스트리
    async fn resolve(&self, id: &str) -> Option<Entity> {
        match self.directory.plugin(id) {
            Some(entity) => Some(entity),
            None => self.directory.theme(id).await,
        }
    }

    async fn resolve_updatable(&self, id: &str) -> Result<Entity, UpdaterError> {
        let entity = self
            .resolve(id)
            .await
            .ok_or_else(|| UpdaterError::NotFound { id: id.to_string() })?;
        if !entity.is_archive() {
            return Err(UpdaterError::NotUpdatable { id: id.to_string() });
        }
        Ok(entity)
    }

    // ═══════════════════════════════════════════════════════
    // 확인
    // ═══════════════════════════════════════════════════════

    /// 단일 엔티티 업데이트 확인
    pub async fn try_check_update(&self, id: &str) -> Result<CheckOutcome, UpdaterError> {
        let entity = self.resolve_updatable(id).await?;
        let installed_version = &entity.manifest.version;
        let updater = entity
            .manifest
            .updater
            .as_ref()
            .ok_or_else(|| UpdaterError::MissingUpdaterInfo { id: id.to_string() })?;

        let current = self.get_update_settings(id);

        // 기록된 버전과 설치 버전이 다르면 원격 확인 없이 업데이트 가능으로 표시.
        // 이번 프로세스에서 직접 설치한 엔티티는 제외
        let recorded_differs = current
            .version
            .as_deref()
            .map_or(false, |v| !v.is_empty() && v != installed_version.as_str());
        if recorded_differs && !current.is_available() && !self.completed.contains(id) {
            let record = record::merge(&current, RecordPatch::availability(true));
            self.write_record(id, &record)?;
            return Ok(CheckOutcome::ForcedAvailable);
        }

        let remote = self
            .transport
            .check(&updater.kind, &updater.id, id)
            .await
            .map_err(|source| UpdaterError::Transport {
                id: id.to_string(),
                operation: "check",
                source,
            })?;

        let version = remote.manifest.version;
        let available = &version != installed_version;
        let now = chrono::Utc::now().timestamp_millis();
        // 원격 확인 결과는 이전 레코드를 통째로 대체
        let record = record::merge(
            &UpdateRecord::default(),
            RecordPatch::checked(available, version.clone(), remote.url, now),
        );
        self.write_record(id, &record)?;

        Ok(if available {
            CheckOutcome::UpdateAvailable { version }
        } else {
            CheckOutcome::UpToDate { version }
        })
    }

    /// 단일 엔티티 확인 후 결과를 로그로 남기고 그대로 돌려줌
    pub async fn check_and_log(&self, id: &str, verbose: bool) -> Result<CheckOutcome, UpdaterError> {
        let result = self.try_check_update(id).await;
        match &result {
            Ok(outcome) => {
                if let Some(message) = outcome.message(id, verbose) {
                    tracing::info!("[Updater] {}", message);
                }
            }
            Err(e) => e.log(verbose),
        }
        result
    }

    /// 단일 엔티티 확인. 실패는 로그로만 남김
    pub async fn check_update(&self, id: &str, verbose: bool) {
        let _ = self.check_and_log(id, verbose).await;
    }

    /// 설치된 모든 플러그인/테마를 동시에 확인하고 `lastChecked` 갱신
    pub async fn check_all_updates(&self, verbose: bool) {
        let mut ids: Vec<String> = self
            .directory
            .plugins()
            .iter()
            .map(|e| e.id().to_string())
            .collect();
        ids.extend(self.directory.themes().await.iter().map(|e| e.id().to_string()));

        tracing::info!("[Updater] Checking for updates ({} entities)", ids.len());

        join_all(ids.iter().map(|id| self.check_update(id, verbose))).await;

        tracing::info!("[Updater] All updates checked");
        let now = chrono::Utc::now().timestamp_millis();
        if let Err(e) = self.settings.set("lastChecked", json!(now)) {
            tracing::error!("[Updater] Failed to record sweep time: {}", e);
        }
    }

    // ═══════════════════════════════════════════════════════
    // 설치
    // ═══════════════════════════════════════════════════════

    /// 단일 엔티티 설치. `force`면 `available` 여부와 무관하게 진행
    pub async fn try_install_update(&self, id: &str, force: bool) -> Result<(), UpdaterError> {
        let entity = self.resolve_updatable(id).await?;
        let current = self.get_update_settings(id);

        if !force && !current.is_available() {
            return Err(UpdaterError::NotAvailable { id: id.to_string() });
        }

        let url = current
            .download_url()
            .ok_or_else(|| UpdaterError::InconsistentState { id: id.to_string() })?;

        self.transport
            .install(entity.manifest.kind, &entity.path, url)
            .await
            .map_err(|source| UpdaterError::Transport {
                id: id.to_string(),
                operation: "install",
                source,
            })?;

        // 디스크의 번들은 이미 교체됐으므로 기록 실패와 상관없이 완료 처리
        self.completed.add(id);
        let record = record::merge(&current, RecordPatch::availability(false));
        self.write_record(id, &record)?;

        // TODO: 컴파일된 플러그인을 안전하게 리로드하는 방법이 정해지면 여기서 리로드
        Ok(())
    }

    /// 단일 엔티티 설치. 성공 여부만 반환하고 실패는 로그로 남김
    pub async fn install_update(&self, id: &str, force: bool, verbose: bool) -> bool {
        match self.try_install_update(id, force).await {
            Ok(()) => {
                tracing::info!("[Updater] Entity {} updated successfully", id);
                true
            }
            Err(e) => {
                e.log(verbose);
                false
            }
        }
    }

    /// 업데이트 가능 목록 전체를 동시에 설치.
    /// 완료를 기다리지 않고 엔티티별 핸들을 돌려줌.
    /// Tokio 런타임 밖에서 호출되면 아무것도 시작하지 않고 빈 맵을 돌려줌
    pub fn install_all_updates(&self, force: bool, verbose: bool) -> HashMap<String, JoinHandle<bool>> {
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::error!("[Updater] Cannot install updates outside an async runtime: {}", e);
                return HashMap::new();
            }
        };

        self.get_available_updates()
            .into_iter()
            .map(|update| {
                let engine = self.clone();
                let id = update.id;
                let task_id = id.clone();
                let handle =
                    runtime.spawn(async move { engine.install_update(&task_id, force, verbose).await });
                (id, handle)
            })
            .collect()
    }
}
