//! 업데이트 확인 주기 — 원샷 체크 유틸리티
//!
//! 이 크레이트는 타이머를 돌리지 않습니다. 호스트(UI/자동화 계층)가
//! 원하는 시점에 `check_if_due`를 호출하면, 저장된 `checkInterval`이
//! 지났을 때만 전체 확인을 수행합니다.

use crate::config::MainUpdaterSettings;
use crate::engine::UpdateEngine;

/// `now_ms` 기준으로 전체 확인이 필요한지 판단.
/// 한 번도 확인하지 않았거나 마지막 확인 시각이 미래이면 필요
pub fn is_check_due(settings: &MainUpdaterSettings, now_ms: i64) -> bool {
    let Some(last) = settings.last_checked else {
        return true;
    };
    if last > now_ms {
        return true;
    }
    let interval = settings.interval().as_millis() as i64;
    now_ms - last >= interval
}

impl UpdateEngine {
    /// 주기가 지났으면 전체 확인. 확인을 수행했는지 반환
    pub async fn check_if_due(&self, verbose: bool) -> bool {
        let settings = self.get_main_updater_settings();
        let now = chrono::Utc::now().timestamp_millis();

        if !is_check_due(&settings, now) {
            if verbose {
                tracing::info!(
                    "[Updater] Skipping sweep, last check was {}s ago",
                    (now - settings.last_checked.unwrap_or(now)) / 1000
                );
            }
            return false;
        }

        self.check_all_updates(verbose).await;
        true
    }
}
