//! 스키마 마이그레이션.
//!
//! 버전 기반 SQLite 스키마 관리.

use rusqlite::Connection;
use tracing::{debug, info};

/// 현재 스키마 버전
const CURRENT_VERSION: u32 = 2;

/// 스키마 마이그레이션 실행
pub fn run_migrations(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current = get_version(conn)?;
    info!("현재 스키마 버전: {current}, 목표: {CURRENT_VERSION}");

    if current < 1 {
        migrate_v1(conn)?;
    }

    if current < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// 현재 스키마 버전 조회
fn get_version(conn: &Connection) -> Result<u32, rusqlite::Error> {
    let result: Result<u32, _> = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    );
    result.or(Ok(0))
}

/// V1: telemetry 테이블 생성
fn migrate_v1(conn: &Connection) -> Result<(), rusqlite::Error> {
    debug!("마이그레이션 V1 실행: telemetry 테이블");

    conn.execute_batch(
        "
        -- 메트릭 값 (메트릭 ID, 핑, 레이블 조합당 한 행)
        -- 레이블 컬럼은 NULL 불가 (ON CONFLICT 대상이므로)
        CREATE TABLE IF NOT EXISTS telemetry (
            metric_id TEXT NOT NULL,
            ping TEXT NOT NULL,
            lifetime TEXT NOT NULL,
            label_kind TEXT NOT NULL DEFAULT 'none',
            label TEXT NOT NULL DEFAULT '',
            category TEXT NOT NULL DEFAULT '',
            value BLOB NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(metric_id, ping, label_kind, label, category)
        );

        CREATE INDEX IF NOT EXISTS idx_telemetry_ping_lifetime ON telemetry(ping, lifetime);
        CREATE INDEX IF NOT EXISTS idx_telemetry_metric ON telemetry(metric_id);

        -- 버전 기록
        INSERT INTO schema_version (version) VALUES (1);
        ",
    )?;

    info!("마이그레이션 V1 완료");
    Ok(())
}

/// V2: pending_pings 테이블 생성 (업로드 아웃박스)
fn migrate_v2(conn: &Connection) -> Result<(), rusqlite::Error> {
    debug!("마이그레이션 V2 실행: pending_pings 테이블");

    conn.execute_batch(
        "
        -- 제출 후 업로드 대기 중인 핑
        CREATE TABLE IF NOT EXISTS pending_pings (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            ping TEXT NOT NULL,
            payload TEXT NOT NULL,
            metadata TEXT NOT NULL,
            try_count INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL,
            UNIQUE(id, ping)
        );

        CREATE INDEX IF NOT EXISTS idx_pending_claim_order ON pending_pings(updated_at, try_count);

        -- 버전 기록
        INSERT INTO schema_version (version) VALUES (2);
        ",
    )?;

    info!("마이그레이션 V2 완료");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                [name],
                |row| row.get(0),
            )
            .unwrap();
        count == 1
    }

    #[test]
    fn migration_creates_tables() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        assert!(table_exists(&conn, "telemetry"));
        assert!(table_exists(&conn, "pending_pings"));

        let version: u32 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn migration_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap(); // 두 번 실행해도 에러 없음

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(versions, 2);
    }
}
