//! 메트릭 값 저장 (MetricStore 포트 구현 본체).
//!
//! 값은 SQLite 동적 타입 그대로 저장한다 (카운터는 INTEGER, 문자열은 TEXT).

use pingbox_core::error::CoreError;
use pingbox_core::models::metric::{
    Label, LabelDimension, LabelKind, Lifetime, MetricKey, MetricRow, MetricValue, UpdateRule,
};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeSet;
use tracing::debug;

use super::{now_timestamp, storage_error};

/// 기존 값 조회 → 규칙 적용 → upsert
///
/// 호출자가 연 트랜잭션 안에서 실행되어야 원자성이 보장된다.
pub(super) fn upsert_accumulate(
    conn: &Connection,
    key: &MetricKey,
    lifetime: Lifetime,
    rule: &UpdateRule,
) -> Result<MetricValue, CoreError> {
    let current = get_value(conn, key)?;
    let new_value = rule.apply(current.as_ref())?;

    conn.execute(
        "INSERT INTO telemetry (metric_id, ping, lifetime, label_kind, label, category, value, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(metric_id, ping, label_kind, label, category) DO UPDATE SET
             lifetime = excluded.lifetime,
             value = excluded.value,
             updated_at = excluded.updated_at",
        params![
            key.metric_id,
            key.ping,
            lifetime.as_str(),
            key.label.kind().as_str(),
            key.label.key_part(),
            key.label.category_part(),
            to_sql_value(&new_value),
            now_timestamp(),
        ],
    )
    .map_err(storage_error("메트릭 upsert 실패"))?;

    debug!(
        "메트릭 기록: {} [{}] {:?} = {new_value}",
        key.metric_id, key.ping, key.label
    );
    Ok(new_value)
}

/// 단일 값 조회
pub(super) fn get_value(conn: &Connection, key: &MetricKey) -> Result<Option<MetricValue>, CoreError> {
    conn.query_row(
        "SELECT value FROM telemetry
         WHERE metric_id = ?1 AND ping = ?2 AND label_kind = ?3 AND label = ?4 AND category = ?5",
        params![
            key.metric_id,
            key.ping,
            key.label.kind().as_str(),
            key.label.key_part(),
            key.label.category_part(),
        ],
        |row| value_from_ref(row.get_ref(0)?, 0),
    )
    .optional()
    .map_err(storage_error("메트릭 조회 실패"))
}

/// 메트릭 ID의 차원별 레이블 집합 (모든 핑 대상)
pub(super) fn list_distinct_labels(
    conn: &Connection,
    metric_id: &str,
    dimension: LabelDimension,
) -> Result<BTreeSet<String>, CoreError> {
    let sql = match dimension {
        LabelDimension::Key => {
            "SELECT DISTINCT label FROM telemetry WHERE metric_id = ?1 AND label_kind != 'none'"
        }
        LabelDimension::Category => {
            "SELECT DISTINCT category FROM telemetry WHERE metric_id = ?1 AND label_kind = 'dual'"
        }
    };

    let mut stmt = conn
        .prepare_cached(sql)
        .map_err(storage_error("쿼리 준비 실패"))?;

    let labels = stmt
        .query_map([metric_id], |row| row.get::<_, String>(0))
        .map_err(storage_error("레이블 조회 실패"))?
        .collect::<Result<BTreeSet<_>, _>>()
        .map_err(storage_error("레이블 행 읽기 실패"))?;

    Ok(labels)
}

/// 핑에 속한 모든 행
pub(super) fn list_rows(conn: &Connection, ping: &str) -> Result<Vec<MetricRow>, CoreError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT metric_id, label_kind, label, category, value FROM telemetry
             WHERE ping = ?1
             ORDER BY metric_id, label, category",
        )
        .map_err(storage_error("쿼리 준비 실패"))?;

    let rows = stmt
        .query_map([ping], |row| {
            let kind_str: String = row.get(1)?;
            let kind = kind_str.parse::<LabelKind>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    1,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;

            Ok(MetricRow {
                metric_id: row.get(0)?,
                label: Label::from_parts(kind, row.get(2)?, row.get(3)?),
                value: value_from_ref(row.get_ref(4)?, 4)?,
            })
        })
        .map_err(storage_error("메트릭 행 조회 실패"))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(storage_error("메트릭 행 읽기 실패"))?;

    Ok(rows)
}

/// 핑 + lifetime 조건으로 삭제
pub(super) fn delete_rows(conn: &Connection, ping: &str, lifetime: Lifetime) -> Result<usize, CoreError> {
    let deleted = conn
        .execute(
            "DELETE FROM telemetry WHERE ping = ?1 AND lifetime = ?2",
            params![ping, lifetime.as_str()],
        )
        .map_err(storage_error("메트릭 삭제 실패"))?;

    if deleted > 0 {
        debug!("핑 {ping}의 {lifetime} 메트릭 {deleted}개 삭제");
    }
    Ok(deleted)
}

fn to_sql_value(value: &MetricValue) -> Value {
    match value {
        MetricValue::Integer(v) => Value::Integer(*v),
        MetricValue::Text(v) => Value::Text(v.clone()),
    }
}

fn value_from_ref(value: ValueRef<'_>, idx: usize) -> rusqlite::Result<MetricValue> {
    match value {
        ValueRef::Integer(v) => Ok(MetricValue::Integer(v)),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => String::from_utf8(bytes.to_vec())
            .map(MetricValue::Text)
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(idx, value.data_type(), Box::new(e))
            }),
        other => Err(rusqlite::Error::InvalidColumnType(
            idx,
            "value".to_string(),
            other.data_type(),
        )),
    }
}
