//! 설치된 플러그인/테마 엔티티와 엔티티 디렉터리 계약
//!
//! 엔티티 검색(디스크 스캔)과 번들 파싱은 호스트 측 책임이며,
//! 이 크레이트는 조회 인터페이스만 소비합니다.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

/// 업데이트 가능한 번들 파일 접미사
pub const ARCHIVE_SUFFIX: &str = ".asar";

/// 엔티티 패키지 타입
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EntityType {
    #[serde(rename = "replugged-plugin")]
    Plugin,
    #[serde(rename = "replugged-theme")]
    Theme,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Plugin => "replugged-plugin",
            EntityType::Theme => "replugged-theme",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 매니페스트의 업데이터 정보 (원격 소스 타입 + 식별자)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdaterDescriptor {
    /// 예: "github", "store"
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

/// 엔티티 매니페스트 (업데이트에 필요한 필드만)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntityManifest {
    pub id: String,
    pub version: String,
    #[serde(rename = "type")]
    pub kind: EntityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updater: Option<UpdaterDescriptor>,
}

/// 설치된 플러그인 또는 테마
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub path: PathBuf,
    pub manifest: EntityManifest,
}

impl Entity {
    pub fn new(path: impl Into<PathBuf>, manifest: EntityManifest) -> Self {
        Self {
            path: path.into(),
            manifest,
        }
    }

    pub fn id(&self) -> &str {
        &self.manifest.id
    }

    /// 단일 번들(ASAR)로 설치되었는지 여부. 이 형태만 제자리 업데이트 가능
    pub fn is_archive(&self) -> bool {
        self.path.to_string_lossy().ends_with(ARCHIVE_SUFFIX)
    }
}

/// 설치된 엔티티 레지스트리
///
/// 플러그인 레지스트리는 동기, 테마 레지스트리는 비동기로 조회됩니다.
#[async_trait]
pub trait EntityDirectory: Send + Sync {
    fn plugin(&self, id: &str) -> Option<Entity>;
    fn plugins(&self) -> Vec<Entity>;
    async fn theme(&self, id: &str) -> Option<Entity>;
    async fn themes(&self) -> Vec<Entity>;
}

/// 메모리 레지스트리. 호스트가 검색한 엔티티를 직접 등록할 때 사용
#[derive(Default)]
pub struct MemoryDirectory {
    plugins: RwLock<BTreeMap<String, Entity>>,
    themes: RwLock<BTreeMap<String, Entity>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, entity: Entity) {
        let registry = match entity.manifest.kind {
            EntityType::Plugin => &self.plugins,
            EntityType::Theme => &self.themes,
        };
        registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entity.manifest.id.clone(), entity);
    }

    pub fn remove(&self, id: &str) -> Option<Entity> {
        let plugin = self.plugins.write().unwrap_or_else(PoisonError::into_inner).remove(id);
        let theme = self.themes.write().unwrap_or_else(PoisonError::into_inner).remove(id);
        plugin.or(theme)
    }
}

#[async_trait]
impl EntityDirectory for MemoryDirectory {
    fn plugin(&self, id: &str) -> Option<Entity> {
        self.plugins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    fn plugins(&self) -> Vec<Entity> {
        self.plugins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    async fn theme(&self, id: &str) -> Option<Entity> {
        self.themes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    async fn themes(&self) -> Vec<Entity> {
        self.themes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}
