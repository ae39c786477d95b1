//! 대기 핑 저장 (PendingPingStore 포트 구현 본체).

use pingbox_core::error::CoreError;
use pingbox_core::models::ping::{ClaimedPing, NewPendingPing, PingMetadata};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

use super::{now_timestamp, storage_error};

/// 대기 핑 추가 (시도 횟수 0)
pub(super) fn insert_pending(conn: &Connection, ping: &NewPendingPing) -> Result<(), CoreError> {
    let metadata = serde_json::to_string(&ping.metadata)?;

    conn.execute(
        "INSERT INTO pending_pings (id, ping, payload, metadata, try_count, updated_at)
         VALUES (?1, ?2, ?3, ?4, 0, ?5)",
        params![
            ping.id.to_string(),
            ping.ping,
            ping.payload,
            metadata,
            now_timestamp(),
        ],
    )
    .map_err(storage_error("대기 핑 저장 실패"))?;

    debug!("대기 핑 저장: {} ({})", ping.id, ping.ping);
    Ok(())
}

/// 가장 오래된 대기 핑 점유
///
/// 선택, 시도 횟수 증가, 반환을 `UPDATE … RETURNING` 한 문장으로 처리한다.
pub(super) fn claim_one_pending(conn: &Connection) -> Result<Option<ClaimedPing>, CoreError> {
    let claimed = conn
        .query_row(
            "UPDATE pending_pings
             SET try_count = try_count + 1, updated_at = ?1
             WHERE seq = (
                 SELECT seq FROM pending_pings
                 ORDER BY updated_at ASC, try_count ASC, seq ASC
                 LIMIT 1
             )
             RETURNING id, ping, payload, metadata, try_count",
            [now_timestamp()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            },
        )
        .optional()
        .map_err(storage_error("대기 핑 점유 실패"))?;

    let Some((id, ping, payload, metadata, try_count)) = claimed else {
        return Ok(None);
    };

    let id = Uuid::parse_str(&id)
        .map_err(|e| CoreError::Storage(format!("잘못된 대기 핑 ID {id}: {e}")))?;
    let metadata: PingMetadata = serde_json::from_str(&metadata)?;
    let try_count = u32::try_from(try_count)
        .map_err(|_| CoreError::Storage(format!("잘못된 시도 횟수: {try_count}")))?;

    debug!("대기 핑 점유: {id} ({ping}), 시도 {try_count}회");
    Ok(Some(ClaimedPing {
        id,
        ping,
        payload,
        metadata,
        try_count,
    }))
}

/// 대기 핑 삭제
pub(super) fn delete_pending(conn: &Connection, id: Uuid) -> Result<bool, CoreError> {
    let deleted = conn
        .execute(
            "DELETE FROM pending_pings WHERE id = ?1",
            [id.to_string()],
        )
        .map_err(storage_error("대기 핑 삭제 실패"))?;
    Ok(deleted > 0)
}

/// 대기 핑 수
pub(super) fn pending_count(conn: &Connection) -> Result<usize, CoreError> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM pending_pings", [], |row| row.get(0))
        .map_err(storage_error("대기 핑 수 조회 실패"))?;
    Ok(count.max(0) as usize)
}
