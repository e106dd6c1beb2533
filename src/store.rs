//! 네임스페이스 분리 키-값 설정 저장소
//!
//! 설정(`dev.replugged.Updater`)과 엔티티별 업데이트 상태
//! (`dev.replugged.Updater.State`)의 영속 백엔드입니다.
//! 읽기/쓰기는 동기이며 키 단위로 원자적입니다.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::error::StoreError;

/// 설정 저장소 계약
pub trait SettingsStore: Send + Sync {
    fn get(&self, namespace: &str, key: &str) -> Option<Value>;
    fn set(&self, namespace: &str, key: &str, value: Value) -> Result<(), StoreError>;
    fn all(&self, namespace: &str) -> Map<String, Value>;
}

/// 한 네임스페이스에 묶인 핸들. 키가 없으면 기본값을 돌려줌
#[derive(Clone)]
pub struct SettingsHandle {
    store: Arc<dyn SettingsStore>,
    namespace: String,
    defaults: Map<String, Value>,
}

/// 네임스페이스 핸들 생성
pub fn init(
    store: Arc<dyn SettingsStore>,
    namespace: &str,
    defaults: Map<String, Value>,
) -> SettingsHandle {
    SettingsHandle {
        store,
        namespace: namespace.to_string(),
        defaults,
    }
}

impl SettingsHandle {
    pub fn get(&self, key: &str) -> Option<Value> {
        self.store
            .get(&self.namespace, key)
            .or_else(|| self.defaults.get(key).cloned())
    }

    pub fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.store.set(&self.namespace, key, value)
    }

    /// 저장된 값 전체 (저장되지 않은 키는 기본값으로 채움)
    pub fn all(&self) -> Map<String, Value> {
        let mut all = self.defaults.clone();
        all.extend(self.store.all(&self.namespace));
        all
    }
}

// ═══════════════════════════════════════════════════════
// MemoryStore
// ═══════════════════════════════════════════════════════

/// 프로세스 메모리 저장소 (테스트/임시 사용)
#[derive(Default)]
pub struct MemoryStore {
    namespaces: RwLock<HashMap<String, Map<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, namespace: &str, key: &str) -> Option<Value> {
        let namespaces = self.namespaces.read().unwrap_or_else(PoisonError::into_inner);
        namespaces.get(namespace).and_then(|ns| ns.get(key).cloned())
    }

    fn set(&self, namespace: &str, key: &str, value: Value) -> Result<(), StoreError> {
        let mut namespaces = self.namespaces.write().unwrap_or_else(PoisonError::into_inner);
        namespaces
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    fn all(&self, namespace: &str) -> Map<String, Value> {
        let namespaces = self.namespaces.read().unwrap_or_else(PoisonError::into_inner);
        namespaces.get(namespace).cloned().unwrap_or_default()
    }
}

// ═══════════════════════════════════════════════════════
// JsonFileStore
// ═══════════════════════════════════════════════════════

/// 네임스페이스마다 `<dir>/<namespace>.json` 파일 하나를 쓰는 저장소.
/// 처음 접근할 때 읽어 캐시하고, `set`마다 해당 파일 전체를 다시 씀
pub struct JsonFileStore {
    dir: PathBuf,
    cache: Mutex<HashMap<String, Map<String, Value>>>,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn namespace_path(&self, namespace: &str) -> PathBuf {
        self.dir.join(format!("{}.json", namespace))
    }

    /// 파일에서 네임스페이스 로드. 없거나 손상된 파일은 빈 네임스페이스
    fn load_namespace(&self, namespace: &str) -> Map<String, Value> {
        let path = self.namespace_path(namespace);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Map::new(),
            Err(e) => {
                tracing::warn!("[Settings] Failed to read {}: {}", path.display(), e);
                return Map::new();
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                tracing::warn!("[Settings] {} is not a JSON object, ignoring", path.display());
                Map::new()
            }
            Err(e) => {
                tracing::warn!("[Settings] Failed to parse {}: {}", path.display(), e);
                Map::new()
            }
        }
    }

    fn with_namespace<R>(&self, namespace: &str, f: impl FnOnce(&mut Map<String, Value>) -> R) -> R {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if !cache.contains_key(namespace) {
            let loaded = self.load_namespace(namespace);
            cache.insert(namespace.to_string(), loaded);
        }
        let ns = cache.entry(namespace.to_string()).or_default();
        f(ns)
    }

    fn write_namespace(&self, namespace: &str, map: &Map<String, Value>) -> Result<(), StoreError> {
        let path = self.namespace_path(namespace);
        let io_err = |source| StoreError::Io {
            namespace: namespace.to_string(),
            path: path.display().to_string(),
            source,
        };

        std::fs::create_dir_all(&self.dir).map_err(io_err)?;

        let json = serde_json::to_string_pretty(map).map_err(|source| StoreError::Serialize {
            namespace: namespace.to_string(),
            source,
        })?;

        std::fs::write(&path, json).map_err(io_err)
    }
}

impl SettingsStore for JsonFileStore {
    fn get(&self, namespace: &str, key: &str) -> Option<Value> {
        self.with_namespace(namespace, |ns| ns.get(key).cloned())
    }

    fn set(&self, namespace: &str, key: &str, value: Value) -> Result<(), StoreError> {
        self.with_namespace(namespace, |ns| {
            let previous = ns.insert(key.to_string(), value);
            let result = self.write_namespace(namespace, ns);
            if result.is_err() {
                // 디스크에 반영되지 않은 값은 캐시에서도 되돌림
                match previous {
                    Some(v) => ns.insert(key.to_string(), v),
                    None => ns.remove(key),
                };
            }
            result
        })
    }

    fn all(&self, namespace: &str) -> Map<String, Value> {
        self.with_namespace(namespace, |ns| ns.clone())
    }
}
