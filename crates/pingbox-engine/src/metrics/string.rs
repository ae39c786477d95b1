//! 문자열 메트릭.

use pingbox_core::error::CoreError;
use pingbox_core::models::metric::{Label, UpdateRule};

use super::CommonMetricData;
use crate::accumulator;
use crate::context::Telemetry;

/// 마지막으로 설정한 문자열을 보관하는 메트릭
#[derive(Debug, Clone)]
pub struct StringMetric {
    meta: CommonMetricData,
}

impl StringMetric {
    /// 새 문자열 핸들
    pub fn new(meta: CommonMetricData) -> Self {
        Self { meta }
    }

    /// 값 설정 (이전 값 무시)
    pub fn set(&self, ctx: &Telemetry, value: impl Into<String>) -> Result<(), CoreError> {
        accumulator::record(
            ctx.store(),
            &self.meta,
            &Label::None,
            &UpdateRule::Replace(value.into()),
        )
    }

    /// 현재 값
    pub fn get_value(
        &self,
        ctx: &Telemetry,
        ping: Option<&str>,
    ) -> Result<Option<String>, CoreError> {
        let value = accumulator::get_value(
            ctx.store(),
            &self.meta.name,
            self.meta.ping_or_default(ping),
            &Label::None,
        )?;
        Ok(value.and_then(|v| v.as_text().map(str::to_string)))
    }
}
