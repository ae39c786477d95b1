//! 핑(리포트) 페이로드와 대기 핑 모델.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::metric::MetricValue;

/// 리포트 메타데이터
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportInfo {
    /// 핑 이름별 순번 (0부터 단조 증가)
    pub seq: i64,
    /// 집계 구간 시작
    pub start_time: DateTime<Utc>,
    /// 집계 구간 종료
    pub end_time: DateTime<Utc>,
}

/// 페이로드 안의 메트릭 하나
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricEntry {
    /// 레이블 없는 값
    Value(MetricValue),
    /// `{label: value}`
    Labeled(BTreeMap<String, MetricValue>),
    /// `{key: {category: value}}`
    DualLabeled(BTreeMap<String, BTreeMap<String, MetricValue>>),
}

/// 제출된 핑 페이로드 (전송 포맷)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingPayload {
    /// 리포트 메타데이터
    pub report_info: ReportInfo,
    /// 메트릭 ID → 값
    pub metrics: BTreeMap<String, MetricEntry>,
}

impl PingPayload {
    /// 메트릭 조회
    pub fn metric(&self, metric_id: &str) -> Option<&MetricEntry> {
        self.metrics.get(metric_id)
    }

    /// 레이블 없는 메트릭 값 조회
    pub fn value(&self, metric_id: &str) -> Option<&MetricValue> {
        match self.metrics.get(metric_id) {
            Some(MetricEntry::Value(value)) => Some(value),
            _ => None,
        }
    }

    /// 단일 레이블 메트릭 조회
    pub fn labeled(&self, metric_id: &str) -> Option<&BTreeMap<String, MetricValue>> {
        match self.metrics.get(metric_id) {
            Some(MetricEntry::Labeled(map)) => Some(map),
            _ => None,
        }
    }

    /// 2차원 레이블 메트릭 조회
    pub fn dual_labeled(
        &self,
        metric_id: &str,
    ) -> Option<&BTreeMap<String, BTreeMap<String, MetricValue>>> {
        match self.metrics.get(metric_id) {
            Some(MetricEntry::DualLabeled(map)) => Some(map),
            _ => None,
        }
    }
}

/// 업로드 메타데이터 (대기 핑과 함께 저장)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingMetadata {
    /// 업로드 경로 (예: "/submit/pingbox/metrics/1/<uuid>")
    pub path: String,
    /// 추가 HTTP 헤더
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// 제출 시각
    pub submitted_at: DateTime<Utc>,
}

/// 아웃박스에 새로 넣을 핑
#[derive(Debug, Clone)]
pub struct NewPendingPing {
    /// 문서 ID
    pub id: Uuid,
    /// 핑 이름
    pub ping: String,
    /// 직렬화된 페이로드 (JSON)
    pub payload: String,
    /// 업로드 메타데이터
    pub metadata: PingMetadata,
}

/// 아웃박스에서 점유(claim)한 핑
#[derive(Debug, Clone)]
pub struct ClaimedPing {
    /// 문서 ID
    pub id: Uuid,
    /// 핑 이름
    pub ping: String,
    /// 직렬화된 페이로드 (JSON)
    pub payload: String,
    /// 업로드 메타데이터
    pub metadata: PingMetadata,
    /// 이번 점유까지 포함한 시도 횟수
    pub try_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payload() -> PingPayload {
        let mut labeled = BTreeMap::new();
        labeled.insert("starts".to_string(), MetricValue::Integer(1));

        let mut inner = BTreeMap::new();
        inner.insert("cli".to_string(), MetricValue::Integer(2));
        let mut dual = BTreeMap::new();
        dual.insert("open".to_string(), inner);

        let mut metrics = BTreeMap::new();
        metrics.insert("clicks".to_string(), MetricEntry::Value(MetricValue::Integer(4)));
        metrics.insert("reason".to_string(), MetricEntry::Value("cli".into()));
        metrics.insert("errors".to_string(), MetricEntry::Labeled(labeled));
        metrics.insert("actions".to_string(), MetricEntry::DualLabeled(dual));

        PingPayload {
            report_info: ReportInfo {
                seq: 0,
                start_time: Utc::now(),
                end_time: Utc::now(),
            },
            metrics,
        }
    }

    #[test]
    fn payload_wire_shape() {
        let json = serde_json::to_value(sample_payload()).unwrap();

        assert_eq!(json["report_info"]["seq"], 0);
        assert!(json["report_info"]["start_time"].is_string());
        assert_eq!(json["metrics"]["clicks"], 4);
        assert_eq!(json["metrics"]["reason"], "cli");
        assert_eq!(json["metrics"]["errors"]["starts"], 1);
        assert_eq!(json["metrics"]["actions"]["open"]["cli"], 2);
    }

    #[test]
    fn payload_parses_back_into_entries() {
        let payload = sample_payload();
        let json = serde_json::to_string(&payload).unwrap();
        let parsed: PingPayload = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.value("clicks"), Some(&MetricValue::Integer(4)));
        assert!(parsed.labeled("errors").is_some());
        assert!(parsed.dual_labeled("actions").is_some());
        assert!(parsed.metric("missing").is_none());
    }
}
