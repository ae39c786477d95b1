//! 영속 저장소 포트.
//!
//! 구현: `pingbox-storage` crate (rusqlite)
//!
//! 엔진의 모든 연산은 하나의 저장소 작업으로 끝나므로 동기 trait로 둔다.
//! 트랜잭션 핸들은 스레드 간 공유할 수 없으므로 trait 자체에는
//! `Send + Sync`를 요구하지 않고, 공유 핸들은 [`SharedStore`]를 쓴다.

use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::metric::{
    LabelDimension, Lifetime, MetricKey, MetricRow, MetricValue, UpdateRule,
};
use crate::models::ping::{ClaimedPing, NewPendingPing};

/// 메트릭 값 저장소
pub trait MetricStore {
    /// 현재 값에 `rule`을 적용해 원자적으로 upsert하고 새 값을 반환
    ///
    /// 읽기와 쓰기 사이에 같은 키에 대한 다른 기록이 끼어들 수 없다.
    /// 실패 시 기존 행은 변경되지 않는다.
    fn upsert_accumulate(
        &self,
        key: &MetricKey,
        lifetime: Lifetime,
        rule: &UpdateRule,
    ) -> Result<MetricValue, CoreError>;

    /// 단일 값 조회 (없으면 None)
    fn get_value(&self, key: &MetricKey) -> Result<Option<MetricValue>, CoreError>;

    /// 메트릭 ID에 대해 저장된 레이블 값 집합 (모든 핑 대상)
    fn list_distinct_labels(
        &self,
        metric_id: &str,
        dimension: LabelDimension,
    ) -> Result<BTreeSet<String>, CoreError>;

    /// 핑에 속한 모든 행 조회
    fn list_rows(&self, ping: &str) -> Result<Vec<MetricRow>, CoreError>;

    /// 핑에 속하면서 `lifetime`이 일치하는 행 삭제
    fn delete_rows(&self, ping: &str, lifetime: Lifetime) -> Result<usize, CoreError>;
}

/// 대기 핑(아웃박스) 저장소
pub trait PendingPingStore {
    /// 시도 횟수 0으로 대기 핑 추가
    fn insert_pending(&self, ping: &NewPendingPing) -> Result<(), CoreError>;

    /// 가장 오래된 대기 핑 하나를 점유
    ///
    /// (갱신 시각, 시도 횟수) 순으로 고른 행의 시도 횟수를 올리고
    /// 갱신 시각을 새로 쓴 뒤, 같은 원자적 단계에서 반환한다.
    /// 동시 호출자가 같은 문서를 받는 일은 없다.
    fn claim_one_pending(&self) -> Result<Option<ClaimedPing>, CoreError>;

    /// 대기 핑 삭제 (존재했으면 true)
    fn delete_pending(&self, id: Uuid) -> Result<bool, CoreError>;

    /// 대기 핑 수
    fn pending_count(&self) -> Result<usize, CoreError>;
}

/// 트랜잭션을 지원하는 통합 저장소
pub trait TelemetryStore: MetricStore + PendingPingStore {
    /// `f`를 하나의 트랜잭션 안에서 실행
    ///
    /// `f`에 전달되는 핸들로 수행한 작업은 `f`가 `Ok`를 반환할 때만
    /// 커밋된다. 이미 트랜잭션 안이라면 같은 트랜잭션을 재사용한다.
    fn transaction(
        &self,
        f: &mut dyn FnMut(&dyn TelemetryStore) -> Result<(), CoreError>,
    ) -> Result<(), CoreError>;
}

/// 스레드 간 공유되는 저장소 핸들
pub type SharedStore = Arc<dyn TelemetryStore + Send + Sync>;
