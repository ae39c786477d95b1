//! 타입별 메트릭 핸들.
//!
//! 모든 핸들은 [`CommonMetricData`]와 레이블 해석 방식만 다르고
//! 같은 누적기를 통해 기록한다.

mod counter;
mod labeled;
mod string;

pub use counter::CounterMetric;
pub use labeled::{DualLabeledCounter, DualLabeledCounterEntry, LabeledCounter, LabeledCounterEntry};
pub use string::StringMetric;

use pingbox_core::config::DEFAULT_PING_NAME;
use pingbox_core::models::metric::Lifetime;

/// 메트릭 공통 정의
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonMetricData {
    /// 메트릭 ID
    pub name: String,
    /// 값을 보낼 핑 이름들
    pub send_in_pings: Vec<String>,
    /// 보존 정책
    pub lifetime: Lifetime,
}

impl CommonMetricData {
    /// 기본 핑(`metrics`)으로 보내는 메트릭 정의
    pub fn new(name: impl Into<String>, lifetime: Lifetime) -> Self {
        Self {
            name: name.into(),
            send_in_pings: vec![DEFAULT_PING_NAME.to_string()],
            lifetime,
        }
    }

    /// 보낼 핑 목록 교체
    pub fn with_pings<I, S>(mut self, pings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.send_in_pings = pings.into_iter().map(Into::into).collect();
        self
    }

    /// 조회 대상 핑 (지정하지 않으면 첫 번째 핑)
    pub(crate) fn ping_or_default<'a>(&'a self, ping: Option<&'a str>) -> &'a str {
        ping.or_else(|| self.send_in_pings.first().map(String::as_str))
            .unwrap_or(DEFAULT_PING_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_metrics_ping() {
        let meta = CommonMetricData::new("starts", Lifetime::User);
        assert_eq!(meta.send_in_pings, vec!["metrics".to_string()]);
        assert_eq!(meta.ping_or_default(None), "metrics");
    }

    #[test]
    fn explicit_ping_wins() {
        let meta = CommonMetricData::new("starts", Lifetime::User).with_pings(["baseline", "metrics"]);
        assert_eq!(meta.ping_or_default(None), "baseline");
        assert_eq!(meta.ping_or_default(Some("metrics")), "metrics");
    }
}
