//! 이번 프로세스에서 설치를 마친 엔티티 추적
//!
//! 설치 후 리로드를 하지 않으므로, "설치 완료 후 재시작 대기"와 "업데이트 없음"을
//! 구분하는 데 사용합니다. 영속화하지 않으며 재시작 시 비워집니다.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Default)]
pub struct CompletedUpdates {
    ids: Arc<Mutex<BTreeSet<String>>>,
}

impl CompletedUpdates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, id: &str) {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string());
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }

    /// 정렬된 스냅샷
    pub fn snapshot(&self) -> Vec<String> {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}
