//! 예제 시나리오.
//!
//! 사용자 lifetime 카운터, 핑 lifetime 카운터, 레이블 카운터, 문자열을
//! 기록하고 `metrics` 핑을 두 번 제출한다.

use anyhow::Result;
use pingbox_core::config::DEFAULT_PING_NAME;
use pingbox_core::models::metric::Lifetime;
use pingbox_engine::{
    CommonMetricData, CounterMetric, LabeledCounter, PingType, StringMetric, Telemetry,
};

use crate::commands::print_payload;

pub fn run(ctx: &Telemetry) -> Result<()> {
    let starts = CounterMetric::new(CommonMetricData::new("starts", Lifetime::User));
    let clicks = CounterMetric::new(CommonMetricData::new("clicks", Lifetime::Ping));
    let errors = LabeledCounter::new(CommonMetricData::new("errors", Lifetime::Ping));
    let reason = StringMetric::new(CommonMetricData::new("reason", Lifetime::Ping));
    let metrics_ping = PingType::new(DEFAULT_PING_NAME);

    starts.add_one(ctx)?;
    clicks.add(ctx, 2)?;
    clicks.add(ctx, 2)?;
    errors.get("starts").add_one(ctx)?;
    reason.set(ctx, "cli")?;

    print_payload(&metrics_ping.submit(ctx)?)?;

    clicks.add(ctx, 2)?;
    print_payload(&metrics_ping.submit(ctx)?)?;

    Ok(())
}
