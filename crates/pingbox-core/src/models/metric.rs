//! 메트릭 레코드 모델.
//!
//! 저장 단위는 (메트릭 ID, 핑 이름, 레이블) 조합당 한 행이다.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// 메트릭 값 보존 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifetime {
    /// 핑 제출 시마다 초기화
    Ping,
    /// 제출과 무관하게 계속 유지
    User,
}

impl Lifetime {
    /// DB 저장용 문자열
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::User => "user",
        }
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lifetime {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ping" => Ok(Self::Ping),
            "user" => Ok(Self::User),
            other => Err(CoreError::validation(
                "lifetime",
                format!("알 수 없는 lifetime: {other}"),
            )),
        }
    }
}

/// 레이블 종류 (DB `label_kind` 컬럼)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelKind {
    /// 레이블 없음
    None,
    /// 단일 레이블
    Single,
    /// 키 + 카테고리 2차원 레이블
    Dual,
}

impl LabelKind {
    /// DB 저장용 문자열
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Single => "single",
            Self::Dual => "dual",
        }
    }
}

impl FromStr for LabelKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "single" => Ok(Self::Single),
            "dual" => Ok(Self::Dual),
            other => Err(CoreError::validation(
                "label_kind",
                format!("알 수 없는 레이블 종류: {other}"),
            )),
        }
    }
}

/// 메트릭 레이블
///
/// 2차원 레이블은 문자열 결합 대신 두 필드로 보관한다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
    /// 레이블 없는 메트릭
    None,
    /// 단일 레이블
    Single(String),
    /// 키 + 카테고리
    Dual {
        /// 첫 번째 차원
        key: String,
        /// 두 번째 차원
        category: String,
    },
}

impl Label {
    /// 단일 레이블 생성
    pub fn single(label: impl Into<String>) -> Self {
        Self::Single(label.into())
    }

    /// 2차원 레이블 생성
    pub fn dual(key: impl Into<String>, category: impl Into<String>) -> Self {
        Self::Dual {
            key: key.into(),
            category: category.into(),
        }
    }

    /// 레이블 종류
    pub fn kind(&self) -> LabelKind {
        match self {
            Self::None => LabelKind::None,
            Self::Single(_) => LabelKind::Single,
            Self::Dual { .. } => LabelKind::Dual,
        }
    }

    /// 첫 번째 차원 값 (없으면 빈 문자열)
    pub fn key_part(&self) -> &str {
        match self {
            Self::None => "",
            Self::Single(label) => label,
            Self::Dual { key, .. } => key,
        }
    }

    /// 두 번째 차원 값 (없으면 빈 문자열)
    pub fn category_part(&self) -> &str {
        match self {
            Self::Dual { category, .. } => category,
            _ => "",
        }
    }

    /// DB 컬럼 값으로부터 복원
    pub fn from_parts(kind: LabelKind, label: String, category: String) -> Self {
        match kind {
            LabelKind::None => Self::None,
            LabelKind::Single => Self::Single(label),
            LabelKind::Dual => Self::Dual {
                key: label,
                category,
            },
        }
    }
}

/// 레이블 차원 (카디널리티 집계 대상)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelDimension {
    /// 단일 레이블 또는 2차원 레이블의 키
    Key,
    /// 2차원 레이블의 카테고리
    Category,
}

/// 메트릭 행의 고유 키
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricKey {
    /// 메트릭 ID (예: "clicks")
    pub metric_id: String,
    /// 핑 이름 (예: "metrics")
    pub ping: String,
    /// 레이블
    pub label: Label,
}

impl MetricKey {
    /// 새 키 생성
    pub fn new(metric_id: impl Into<String>, ping: impl Into<String>, label: Label) -> Self {
        Self {
            metric_id: metric_id.into(),
            ping: ping.into(),
            label,
        }
    }
}

/// 저장된 메트릭 값 (카운터 정수 또는 문자열)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// 카운터 값
    Integer(i64),
    /// 문자열 값
    Text(String),
}

impl MetricValue {
    /// 정수 값이면 반환
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            Self::Text(_) => None,
        }
    }

    /// 문자열 값이면 반환
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            Self::Integer(_) => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for MetricValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for MetricValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// 기존 값에 적용할 갱신 규칙
///
/// 저장소는 현재 값을 읽은 같은 트랜잭션 안에서 이 규칙을 적용한다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateRule {
    /// 카운터 증가 (값이 없으면 0부터, 음수 허용)
    Increment(i64),
    /// 이전 값과 무관하게 교체
    Replace(String),
}

impl UpdateRule {
    /// 현재 값에 규칙을 적용해 새 값 계산
    pub fn apply(&self, current: Option<&MetricValue>) -> Result<MetricValue, CoreError> {
        match self {
            Self::Increment(amount) => {
                let base = match current {
                    None => 0,
                    Some(MetricValue::Integer(v)) => *v,
                    Some(MetricValue::Text(v)) => {
                        return Err(CoreError::validation(
                            "value",
                            format!("문자열 값에 카운터 증가 불가: {v}"),
                        ))
                    }
                };
                base.checked_add(*amount)
                    .map(MetricValue::Integer)
                    .ok_or_else(|| {
                        CoreError::validation("value", format!("카운터 오버플로: {base} + {amount}"))
                    })
            }
            Self::Replace(value) => Ok(MetricValue::Text(value.clone())),
        }
    }
}

/// 핑 조립용 조회 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricRow {
    /// 메트릭 ID
    pub metric_id: String,
    /// 레이블
    pub label: Label,
    /// 값
    pub value: MetricValue,
}
