//! 엔티티별 업데이트 레코드
//!
//! 상태 네임스페이스(`dev.replugged.Updater.State`)에 엔티티 ID를 키로 저장됩니다.
//! 이 엔진 외부에서도 쓸 수 있는 값이므로 읽을 때마다 스키마 검증을 거치며,
//! 검증에 실패한 레코드는 "알려진 상태 없음"(빈 레코드)으로 취급합니다.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 영속 업데이트 레코드. 모든 필드가 비어 있으면 한 번도 확인되지 않은 엔티티
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecord {
    /// 설치되지 않은 새 원격 버전이 알려져 있는지 여부
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
    /// 마지막으로 관측한 원격 버전 (로컬 설치 버전이 아님)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// 현재 알려진 버전의 다운로드 위치
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// 마지막 원격 확인 시각 (epoch 밀리초)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<i64>,
    /// 엔진이 해석하지 않는 나머지 키 (`id` 등). 병합해도 그대로 남음
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UpdateRecord {
    pub fn is_empty(&self) -> bool {
        self == &UpdateRecord::default()
    }

    pub fn is_available(&self) -> bool {
        self.available.unwrap_or(false)
    }

    /// 비어 있지 않은 다운로드 URL
    pub fn download_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.is_empty())
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

/// 레코드 부분 갱신. `Some` 필드만 기존 값을 덮어씀
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPatch {
    pub available: Option<bool>,
    pub version: Option<String>,
    pub url: Option<String>,
    pub last_checked: Option<i64>,
}

impl RecordPatch {
    /// `available` 플래그만 바꾸는 패치
    pub fn availability(available: bool) -> Self {
        Self {
            available: Some(available),
            ..Default::default()
        }
    }

    /// 원격 확인 결과 전체를 기록하는 패치
    pub fn checked(available: bool, version: String, url: String, now: i64) -> Self {
        Self {
            available: Some(available),
            version: Some(version),
            url: Some(url),
            last_checked: Some(now),
        }
    }
}

/// 필드 단위 병합. 패치에 있는 필드가 우선하고, 없는 필드는 기존 값을 유지
pub fn merge(existing: &UpdateRecord, patch: RecordPatch) -> UpdateRecord {
    UpdateRecord {
        available: patch.available.or(existing.available),
        version: patch.version.or_else(|| existing.version.clone()),
        url: patch.url.or_else(|| existing.url.clone()),
        last_checked: patch.last_checked.or(existing.last_checked),
        extra: existing.extra.clone(),
    }
}

/// 검증 실패 사유
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidReason {
    NotAnObject,
    WrongType { field: &'static str, expected: &'static str },
}

impl std::fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidReason::NotAnObject => write!(f, "record is not an object"),
            InvalidReason::WrongType { field, expected } => {
                write!(f, "field '{}' is not a {}", field, expected)
            }
        }
    }
}

/// 스키마 검증 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// 저장된 값 없음
    Absent,
    Valid(UpdateRecord),
    Invalid(InvalidReason),
}

impl Validation {
    /// 공개 경계에서 사용: 유효하지 않으면 빈 레코드
    pub fn into_record(self) -> UpdateRecord {
        match self {
            Validation::Valid(record) => record,
            Validation::Absent | Validation::Invalid(_) => UpdateRecord::default(),
        }
    }
}

// 레코드 구조체 필드로 옮겨지는 키. 나머지는 `extra`로
const TYPED_FIELDS: &[&str] = &["available", "version", "url", "lastChecked"];

// (필드, 기대 타입, 검사 함수)
const FIELD_CHECKS: &[(&str, &str, fn(&Value) -> bool)] = &[
    ("available", "boolean", Value::is_boolean),
    ("id", "string", Value::is_string),
    ("version", "string", Value::is_string),
    ("url", "string", Value::is_string),
    ("lastChecked", "number", Value::is_number),
];

/// 영속 값 검증. 존재하는 필드는 모두 선언된 원시 타입이어야 함
pub fn validate(value: Option<&Value>) -> Validation {
    let obj = match value {
        None | Some(Value::Null) => return Validation::Absent,
        Some(Value::Object(obj)) => obj,
        Some(_) => return Validation::Invalid(InvalidReason::NotAnObject),
    };

    for (field, expected, check) in FIELD_CHECKS {
        if let Some(v) = obj.get(*field) {
            if !check(v) {
                return Validation::Invalid(InvalidReason::WrongType {
                    field: *field,
                    expected: *expected,
                });
            }
        }
    }

    Validation::Valid(UpdateRecord {
        available: obj.get("available").and_then(Value::as_bool),
        version: obj.get("version").and_then(Value::as_str).map(str::to_string),
        url: obj.get("url").and_then(Value::as_str).map(str::to_string),
        last_checked: obj
            .get("lastChecked")
            .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))),
        extra: obj
            .iter()
            .filter(|(k, _)| !TYPED_FIELDS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    })
}
