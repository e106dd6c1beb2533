//! 업데이터 설정
//!
//! - `MainUpdaterSettings`: `dev.replugged.Updater` 네임스페이스에 저장되는 싱글톤
//! - `UpdaterConfig`: 임베더가 TOML로 제공하는 배선 설정 (저장소 위치, 브리지 주소)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 메인 설정 네임스페이스
pub const SETTINGS_NAMESPACE: &str = "dev.replugged.Updater";
/// 엔티티별 상태 네임스페이스
pub const STATE_NAMESPACE: &str = "dev.replugged.Updater.State";

/// 기본 확인 주기 (1시간, 밀리초)
pub const DEFAULT_CHECK_INTERVAL_MS: u64 = 60 * 60 * 1000;

/// 영속 메인 설정.
/// `check_interval`은 저장만 되며 이 크레이트가 타이머를 돌리지는 않음
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainUpdaterSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<i64>,
}

impl MainUpdaterSettings {
    /// 네임스페이스 기본값
    pub fn defaults() -> Map<String, Value> {
        let mut defaults = Map::new();
        defaults.insert("checkInterval".to_string(), json!(DEFAULT_CHECK_INTERVAL_MS));
        defaults
    }

    /// 저장소 값에서 읽음. 타입이 맞지 않는 필드는 무시
    pub fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            check_interval: map.get("checkInterval").and_then(Value::as_u64),
            last_checked: map.get("lastChecked").and_then(Value::as_i64),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.check_interval.unwrap_or(DEFAULT_CHECK_INTERVAL_MS))
    }
}

/// 임베더 배선 설정 (`updater.toml`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UpdaterConfig {
    /// `JsonFileStore`가 네임스페이스 파일을 두는 디렉터리
    pub settings_dir: PathBuf,
    /// 네이티브 브리지 주소
    pub bridge_url: String,
    /// 브리지 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            settings_dir: PathBuf::from("settings"),
            bridge_url: "http://127.0.0.1:57475".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl UpdaterConfig {
    /// TOML 파일 로드. 파일이 없으면 기본값, 빠진 키도 기본값으로 채움
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(
                "[Updater] No config at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// 문자열 파싱. 최상위 또는 `[updater]` 섹션 모두 허용
    pub fn parse(content: &str) -> Result<Self> {
        let value: toml::Value = content.parse()?;
        let section = value.get("updater").cloned().unwrap_or(value);
        Ok(section.try_into()?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_settings_default_interval_is_one_hour() {
        let settings = MainUpdaterSettings::from_map(&MainUpdaterSettings::defaults());
        assert_eq!(settings.check_interval, Some(3_600_000));
        assert_eq!(settings.last_checked, None);
        assert_eq!(settings.interval(), Duration::from_secs(3600));
    }

    #[test]
    fn config_parses_top_level_and_section() {
        let top = UpdaterConfig::parse("bridge_url = \"http://127.0.0.1:9000\"").unwrap();
        assert_eq!(top.bridge_url, "http://127.0.0.1:9000");
        assert_eq!(top.request_timeout_secs, 30);

        let section = UpdaterConfig::parse(
            "[updater]\nsettings_dir = \"/tmp/replugged\"\nrequest_timeout_secs = 5\n",
        )
        .unwrap();
        assert_eq!(section.settings_dir, PathBuf::from("/tmp/replugged"));
        assert_eq!(section.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn config_rejects_wrong_types() {
        assert!(UpdaterConfig::parse("request_timeout_secs = \"soon\"").is_err());
    }

    #[test]
    fn missing_config_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = UpdaterConfig::load(&dir.path().join("updater.toml")).unwrap();
        assert_eq!(cfg, UpdaterConfig::default());
    }
}
