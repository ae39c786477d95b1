//! 핑 조립과 제출.
//!
//! 제출은 한 트랜잭션 안에서 다음 순서로 진행된다.
//! 1. 핑에 속한 행을 읽어 `{metric_id: 값 | {label: 값} | {key: {category: 값}}}`로 변환
//! 2. `glean_ping_info`에 저장된 순번/시작 시각으로 리포트 메타데이터 계산 후 갱신
//! 3. `ping` lifetime 행 삭제
//! 4. 페이로드를 아웃박스에 추가

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use pingbox_core::config::PING_INFO_STORAGE;
use pingbox_core::error::CoreError;
use pingbox_core::models::metric::{
    Label, Lifetime, MetricKey, MetricRow, MetricValue, UpdateRule,
};
use pingbox_core::models::ping::{MetricEntry, PingPayload, ReportInfo};
use pingbox_core::ports::storage::{MetricStore, TelemetryStore};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::context::Telemetry;
use crate::outbox;

/// 핑별 순번 메트릭 ID
pub const SEQ_METRIC: &str = "ping_info.seq";
/// 다음 핑의 집계 시작 시각 메트릭 ID
pub const START_TIME_METRIC: &str = "ping_info.start_time";
/// 마지막 핑의 집계 종료 시각 메트릭 ID
pub const END_TIME_METRIC: &str = "ping_info.end_time";

/// 이름 있는 핑(리포트)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingType {
    name: String,
}

impl PingType {
    /// 새 핑 정의
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// 핑 이름
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 핑 조립, `ping` lifetime 메트릭 초기화, 아웃박스 추가
    ///
    /// 페이로드가 아웃박스에 들어간 뒤에만 반환한다. 저장소 오류가 나면
    /// 아무것도 바뀌지 않는다.
    pub fn submit(&self, ctx: &Telemetry) -> Result<PingPayload, CoreError> {
        self.validate()?;

        let mut submitted = None;
        ctx.store().transaction(&mut |tx| {
            let payload = assemble(tx, &self.name, ctx.start_time(), true)?;
            let cleared = tx.delete_rows(&self.name, Lifetime::Ping)?;
            let id = outbox::enqueue(tx, ctx.app_id(), &self.name, &payload)?;
            submitted = Some((payload, id, cleared));
            Ok(())
        })?;

        let (payload, id, cleared) = submitted
            .ok_or_else(|| CoreError::Internal(format!("핑 제출 결과 없음: {}", self.name)))?;

        info!(
            "핑 제출: {} #{} (메트릭 {}개, 초기화 {cleared}행) → {id}",
            self.name,
            payload.report_info.seq,
            payload.metrics.len()
        );
        Ok(payload)
    }

    /// 제출했을 때의 페이로드 미리보기 (저장소 변경 없음)
    pub fn collect(&self, ctx: &Telemetry) -> Result<PingPayload, CoreError> {
        self.validate()?;
        assemble(ctx.store(), &self.name, ctx.start_time(), false)
    }

    fn validate(&self) -> Result<(), CoreError> {
        if self.name.is_empty() {
            return Err(CoreError::validation("ping", "핑 이름이 비어 있습니다"));
        }
        if self.name == PING_INFO_STORAGE {
            return Err(CoreError::validation(
                "ping",
                format!("예약된 핑 이름: {PING_INFO_STORAGE}"),
            ));
        }
        Ok(())
    }
}

/// 페이로드 조립
///
/// `advance`가 true면 순번과 시작 시각을 다음 핑 기준으로 갱신한다.
fn assemble(
    store: &dyn TelemetryStore,
    ping: &str,
    process_start: DateTime<Utc>,
    advance: bool,
) -> Result<PingPayload, CoreError> {
    let metrics = reshape(ping, store.list_rows(ping)?);
    let report_info = report_info(store, ping, process_start, advance)?;

    Ok(PingPayload {
        report_info,
        metrics,
    })
}

/// 평평한 행을 메트릭 ID 기준 중첩 구조로 변환
///
/// 같은 메트릭 ID에 레이블 형태가 섞여 있으면 먼저 나온 형태를 유지한다.
fn reshape(ping: &str, rows: Vec<MetricRow>) -> BTreeMap<String, MetricEntry> {
    let mut metrics: BTreeMap<String, MetricEntry> = BTreeMap::new();

    for MetricRow {
        metric_id,
        label,
        value,
    } in rows
    {
        let slot = metrics
            .entry(metric_id.clone())
            .or_insert_with(|| empty_entry(&label));

        let merged = match (slot, label) {
            (MetricEntry::Value(current), Label::None) => {
                *current = value;
                true
            }
            (MetricEntry::Labeled(map), Label::Single(label)) => {
                map.insert(label, value);
                true
            }
            (MetricEntry::DualLabeled(map), Label::Dual { key, category }) => {
                map.entry(key).or_default().insert(category, value);
                true
            }
            _ => false,
        };

        if !merged {
            warn!("핑 {ping}: {metric_id} 레이블 형태 불일치, 값 무시");
        }
    }

    metrics
}

fn empty_entry(label: &Label) -> MetricEntry {
    match label {
        Label::None => MetricEntry::Value(MetricValue::Integer(0)),
        Label::Single(_) => MetricEntry::Labeled(BTreeMap::new()),
        Label::Dual { .. } => MetricEntry::DualLabeled(BTreeMap::new()),
    }
}

/// 리포트 메타데이터 계산 (필요 시 다음 핑 기준으로 갱신)
fn report_info(
    store: &dyn TelemetryStore,
    ping: &str,
    process_start: DateTime<Utc>,
    advance: bool,
) -> Result<ReportInfo, CoreError> {
    let seq_key = info_key(SEQ_METRIC, ping);
    let start_key = info_key(START_TIME_METRIC, ping);
    let end_key = info_key(END_TIME_METRIC, ping);

    let start_time = stored_time(store, &start_key)?.unwrap_or(process_start);
    // 저장 정밀도(마이크로초)에 맞춰 다음 핑의 시작 시각과 정확히 일치시킨다
    let end_time = Utc::now().trunc_subsecs(6);

    // 페이로드에는 증가 전 값이 들어간다 (첫 핑 = 0)
    let seq = if advance {
        let next = store.upsert_accumulate(&seq_key, Lifetime::User, &UpdateRule::Increment(1))?;
        next.as_integer().map(|n| n - 1)
    } else {
        store
            .get_value(&seq_key)?
            .map_or(Some(0), |v| v.as_integer())
    };
    let seq =
        seq.ok_or_else(|| CoreError::Storage(format!("핑 {ping}의 순번이 정수가 아닙니다")))?;

    if advance {
        let end = UpdateRule::Replace(end_time.to_rfc3339_opts(SecondsFormat::Micros, true));
        store.upsert_accumulate(&start_key, Lifetime::User, &end)?;
        store.upsert_accumulate(&end_key, Lifetime::User, &end)?;
    }

    Ok(ReportInfo {
        seq,
        start_time,
        end_time,
    })
}

/// `glean_ping_info`에 핑 이름을 레이블로 저장되는 키
fn info_key(metric_id: &str, ping: &str) -> MetricKey {
    MetricKey::new(metric_id, PING_INFO_STORAGE, Label::single(ping))
}

fn stored_time<S: MetricStore + ?Sized>(
    store: &S,
    key: &MetricKey,
) -> Result<Option<DateTime<Utc>>, CoreError> {
    let Some(value) = store.get_value(key)? else {
        return Ok(None);
    };

    let parsed = value
        .as_text()
        .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
        .map(|time| time.with_timezone(&Utc));

    if parsed.is_none() {
        warn!("잘못된 시각 값 무시: {} = {value}", key.metric_id);
    }
    Ok(parsed)
}
