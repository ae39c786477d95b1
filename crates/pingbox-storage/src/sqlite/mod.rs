//! SQLite 저장소 어댑터.
//!
//! `MetricStore` + `PendingPingStore` + `TelemetryStore` 포트 구현.
//!
//! # 모듈 구조
//! - `metrics`: 메트릭 값 upsert, 조회, 핑 단위 삭제
//! - `pending`: 대기 핑 저장, 점유, 삭제

mod metrics;
mod pending;

use chrono::{SecondsFormat, Utc};
use pingbox_core::error::CoreError;
use pingbox_core::models::metric::{
    LabelDimension, Lifetime, MetricKey, MetricRow, MetricValue, UpdateRule,
};
use pingbox_core::models::ping::{ClaimedPing, NewPendingPing};
use pingbox_core::ports::storage::{MetricStore, PendingPingStore, TelemetryStore};
use rusqlite::{Connection, TransactionBehavior};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::migration;

/// 다른 프로세스가 DB를 잠근 경우 대기 시간
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite 저장소: 저장소 포트 구현
///
/// 모든 쓰기 작업은 연결 뮤텍스를 잡은 상태에서 IMMEDIATE 트랜잭션으로
/// 실행된다.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// 파일 기반 SQLite 저장소 생성
    pub fn open(path: &Path) -> Result<Self, CoreError> {
        let conn = Connection::open(path)
            .map_err(|e| CoreError::Storage(format!("SQLite 열기 실패: {e}")))?;

        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA temp_store=MEMORY;
            ",
        )
        .map_err(|e| CoreError::Storage(format!("PRAGMA 설정 실패: {e}")))?;

        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| CoreError::Storage(format!("busy_timeout 설정 실패: {e}")))?;

        migration::run_migrations(&conn)
            .map_err(|e| CoreError::Storage(format!("마이그레이션 실패: {e}")))?;

        info!("SQLite 저장소 초기화: {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// 인메모리 SQLite 저장소 생성 (테스트용)
    pub fn open_in_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| CoreError::Storage(format!("인메모리 SQLite 생성 실패: {e}")))?;

        migration::run_migrations(&conn)
            .map_err(|e| CoreError::Storage(format!("마이그레이션 실패: {e}")))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// 저장된 메트릭과 대기 핑 전체 삭제
    pub fn clear_all(&self) -> Result<(), CoreError> {
        self.write(|conn| {
            conn.execute_batch("DELETE FROM telemetry; DELETE FROM pending_pings;")
                .map_err(storage_error("전체 삭제 실패"))
        })?;
        warn!("저장소 전체 초기화");
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CoreError> {
        self.conn
            .lock()
            .map_err(|e| CoreError::Internal(format!("잠금 획득 실패: {e}")))
    }

    /// 단일 쓰기 트랜잭션 안에서 `f` 실행
    ///
    /// `f`가 에러를 반환하면 트랜잭션은 커밋되지 않고 롤백된다.
    fn write<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(storage_error("트랜잭션 시작 실패"))?;

        let result = f(&tx)?;

        tx.commit().map_err(storage_error("트랜잭션 커밋 실패"))?;
        Ok(result)
    }

    /// 읽기 전용 작업
    fn read<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        let conn = self.lock()?;
        f(&conn)
    }
}

/// rusqlite 에러를 문맥과 함께 `CoreError::Storage`로 변환
pub(crate) fn storage_error(context: &'static str) -> impl FnOnce(rusqlite::Error) -> CoreError {
    move |e| CoreError::Storage(format!("{context}: {e}"))
}

/// 정렬 가능한 고정 폭 UTC 타임스탬프
pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl MetricStore for SqliteStorage {
    fn upsert_accumulate(
        &self,
        key: &MetricKey,
        lifetime: Lifetime,
        rule: &UpdateRule,
    ) -> Result<MetricValue, CoreError> {
        self.write(|conn| metrics::upsert_accumulate(conn, key, lifetime, rule))
    }

    fn get_value(&self, key: &MetricKey) -> Result<Option<MetricValue>, CoreError> {
        self.read(|conn| metrics::get_value(conn, key))
    }

    fn list_distinct_labels(
        &self,
        metric_id: &str,
        dimension: LabelDimension,
    ) -> Result<BTreeSet<String>, CoreError> {
        self.read(|conn| metrics::list_distinct_labels(conn, metric_id, dimension))
    }

    fn list_rows(&self, ping: &str) -> Result<Vec<MetricRow>, CoreError> {
        self.read(|conn| metrics::list_rows(conn, ping))
    }

    fn delete_rows(&self, ping: &str, lifetime: Lifetime) -> Result<usize, CoreError> {
        self.write(|conn| metrics::delete_rows(conn, ping, lifetime))
    }
}

impl PendingPingStore for SqliteStorage {
    fn insert_pending(&self, ping: &NewPendingPing) -> Result<(), CoreError> {
        self.write(|conn| pending::insert_pending(conn, ping))
    }

    fn claim_one_pending(&self) -> Result<Option<ClaimedPing>, CoreError> {
        self.write(pending::claim_one_pending)
    }

    fn delete_pending(&self, id: Uuid) -> Result<bool, CoreError> {
        self.write(|conn| pending::delete_pending(conn, id))
    }

    fn pending_count(&self) -> Result<usize, CoreError> {
        self.read(pending::pending_count)
    }
}

impl TelemetryStore for SqliteStorage {
    fn transaction(
        &self,
        f: &mut dyn FnMut(&dyn TelemetryStore) -> Result<(), CoreError>,
    ) -> Result<(), CoreError> {
        self.write(|conn| f(&TxStore { conn }))
    }
}

/// 열린 트랜잭션에 묶인 저장소 핸들
struct TxStore<'a> {
    conn: &'a Connection,
}

impl MetricStore for TxStore<'_> {
    fn upsert_accumulate(
        &self,
        key: &MetricKey,
        lifetime: Lifetime,
        rule: &UpdateRule,
    ) -> Result<MetricValue, CoreError> {
        metrics::upsert_accumulate(self.conn, key, lifetime, rule)
    }

    fn get_value(&self, key: &MetricKey) -> Result<Option<MetricValue>, CoreError> {
        metrics::get_value(self.conn, key)
    }

    fn list_distinct_labels(
        &self,
        metric_id: &str,
        dimension: LabelDimension,
    ) -> Result<BTreeSet<String>, CoreError> {
        metrics::list_distinct_labels(self.conn, metric_id, dimension)
    }

    fn list_rows(&self, ping: &str) -> Result<Vec<MetricRow>, CoreError> {
        metrics::list_rows(self.conn, ping)
    }

    fn delete_rows(&self, ping: &str, lifetime: Lifetime) -> Result<usize, CoreError> {
        metrics::delete_rows(self.conn, ping, lifetime)
    }
}

impl PendingPingStore for TxStore<'_> {
    fn insert_pending(&self, ping: &NewPendingPing) -> Result<(), CoreError> {
        pending::insert_pending(self.conn, ping)
    }

    fn claim_one_pending(&self) -> Result<Option<ClaimedPing>, CoreError> {
        pending::claim_one_pending(self.conn)
    }

    fn delete_pending(&self, id: Uuid) -> Result<bool, CoreError> {
        pending::delete_pending(self.conn, id)
    }

    fn pending_count(&self) -> Result<usize, CoreError> {
        pending::pending_count(self.conn)
    }
}

impl TelemetryStore for TxStore<'_> {
    fn transaction(
        &self,
        f: &mut dyn FnMut(&dyn TelemetryStore) -> Result<(), CoreError>,
    ) -> Result<(), CoreError> {
        // 중첩 트랜잭션은 바깥 트랜잭션에 합류
        f(self)
    }
}
