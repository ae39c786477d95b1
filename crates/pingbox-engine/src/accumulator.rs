//! 메트릭 누적기.
//!
//! 메트릭이 속한 모든 핑에 대해 같은 갱신 규칙을 한 트랜잭션으로 적용한다.

use pingbox_core::error::CoreError;
use pingbox_core::models::metric::{Label, MetricKey, MetricValue, UpdateRule};
use pingbox_core::ports::storage::{MetricStore, TelemetryStore};

use crate::metrics::CommonMetricData;

/// 메트릭 값 기록
///
/// `send_in_pings`의 각 핑마다 `(메트릭 ID, 핑, 레이블)` 행에 `rule`을 적용한다.
/// 하나라도 실패하면 어떤 핑의 행도 바뀌지 않는다.
pub fn record(
    store: &dyn TelemetryStore,
    meta: &CommonMetricData,
    label: &Label,
    rule: &UpdateRule,
) -> Result<(), CoreError> {
    store.transaction(&mut |tx| {
        for ping in &meta.send_in_pings {
            let key = MetricKey::new(&meta.name, ping, label.clone());
            tx.upsert_accumulate(&key, meta.lifetime, rule)?;
        }
        Ok(())
    })
}

/// 저장된 값 조회 (변경 없음)
pub fn get_value<S: MetricStore + ?Sized>(
    store: &S,
    metric_id: &str,
    ping: &str,
    label: &Label,
) -> Result<Option<MetricValue>, CoreError> {
    store.get_value(&MetricKey::new(metric_id, ping, label.clone()))
}
