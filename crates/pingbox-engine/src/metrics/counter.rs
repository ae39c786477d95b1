//! 카운터 메트릭.

use pingbox_core::error::CoreError;
use pingbox_core::models::metric::{Label, UpdateRule};

use super::CommonMetricData;
use crate::accumulator;
use crate::context::Telemetry;

/// 정수 카운터
///
/// 음수 증가량도 그대로 기록한다.
#[derive(Debug, Clone)]
pub struct CounterMetric {
    meta: CommonMetricData,
}

impl CounterMetric {
    /// 새 카운터 핸들
    pub fn new(meta: CommonMetricData) -> Self {
        Self { meta }
    }

    /// 메트릭 정의
    pub fn meta(&self) -> &CommonMetricData {
        &self.meta
    }

    /// `amount`만큼 증가
    pub fn add(&self, ctx: &Telemetry, amount: i64) -> Result<(), CoreError> {
        accumulator::record(
            ctx.store(),
            &self.meta,
            &Label::None,
            &UpdateRule::Increment(amount),
        )
    }

    /// 1 증가
    pub fn add_one(&self, ctx: &Telemetry) -> Result<(), CoreError> {
        self.add(ctx, 1)
    }

    /// 현재 값 (`ping`이 None이면 첫 번째 핑)
    pub fn get_value(&self, ctx: &Telemetry, ping: Option<&str>) -> Result<Option<i64>, CoreError> {
        let value = accumulator::get_value(
            ctx.store(),
            &self.meta.name,
            self.meta.ping_or_default(ping),
            &Label::None,
        )?;
        Ok(value.and_then(|v| v.as_integer()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pingbox_core::models::metric::Lifetime;
    use pingbox_storage::sqlite::SqliteStorage;
    use std::sync::Arc;

    fn test_ctx() -> Telemetry {
        Telemetry::new(Arc::new(SqliteStorage::open_in_memory().unwrap()), "test")
    }

    #[test]
    fn add_twice_equals_add_sum() {
        let ctx = test_ctx();
        let split = CounterMetric::new(CommonMetricData::new("split", Lifetime::Ping));
        let whole = CounterMetric::new(CommonMetricData::new("whole", Lifetime::Ping));

        split.add(&ctx, 2).unwrap();
        split.add(&ctx, 2).unwrap();
        whole.add(&ctx, 4).unwrap();

        assert_eq!(split.get_value(&ctx, None).unwrap(), Some(4));
        assert_eq!(whole.get_value(&ctx, None).unwrap(), Some(4));
    }

    #[test]
    fn add_one_starts_from_zero() {
        let ctx = test_ctx();
        let counter = CounterMetric::new(CommonMetricData::new("starts", Lifetime::User));

        assert_eq!(counter.get_value(&ctx, None).unwrap(), None);
        counter.add_one(&ctx).unwrap();
        assert_eq!(counter.get_value(&ctx, None).unwrap(), Some(1));
    }

    #[test]
    fn negative_amount_accepted() {
        let ctx = test_ctx();
        let counter = CounterMetric::new(CommonMetricData::new("balance", Lifetime::Ping));

        counter.add(&ctx, 3).unwrap();
        counter.add(&ctx, -5).unwrap();
        assert_eq!(counter.get_value(&ctx, None).unwrap(), Some(-2));
    }

    #[test]
    fn value_per_ping() {
        let ctx = test_ctx();
        let counter = CounterMetric::new(
            CommonMetricData::new("clicks", Lifetime::Ping).with_pings(["metrics", "baseline"]),
        );

        counter.add(&ctx, 2).unwrap();
        assert_eq!(counter.get_value(&ctx, Some("baseline")).unwrap(), Some(2));
        assert_eq!(counter.get_value(&ctx, Some("events")).unwrap(), None);
    }
}
