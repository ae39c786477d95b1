//! 하위 명령 구현.

use anyhow::Result;
use pingbox_core::config::AppConfig;
use pingbox_core::models::ping::PingPayload;
use pingbox_engine::{Outbox, PingType, Telemetry};
use pingbox_network::http_uploader::HttpUploader;
use pingbox_storage::sqlite::SqliteStorage;
use tracing::info;

/// 페이로드를 보기 좋은 JSON으로 출력
pub fn print_payload(payload: &PingPayload) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(payload)?);
    Ok(())
}

/// 핑 제출
pub fn submit(ctx: &Telemetry, ping: &str) -> Result<()> {
    let payload = PingType::new(ping).submit(ctx)?;
    print_payload(&payload)
}

/// 페이로드 미리보기
pub fn inspect(ctx: &Telemetry, ping: &str) -> Result<()> {
    let payload = PingType::new(ping).collect(ctx)?;
    print_payload(&payload)
}

/// 대기 핑 전송
pub async fn upload(ctx: &Telemetry, config: &AppConfig) -> Result<()> {
    let uploader = HttpUploader::new(&config.upload.server_url, config.upload_timeout())?
        .with_gzip(config.upload.gzip);
    let outbox = Outbox::new(ctx);

    info!("업로드 시작: {}", config.upload.server_url);
    let report = outbox.process_pending(&uploader).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    println!("남은 대기 핑: {}", outbox.pending_count()?);
    Ok(())
}

/// 대기 핑 수 출력
pub fn status(ctx: &Telemetry) -> Result<()> {
    let outbox = Outbox::new(ctx);
    println!("대기 핑: {}", outbox.pending_count()?);
    Ok(())
}

/// 전체 초기화
pub fn reset(storage: &SqliteStorage) -> Result<()> {
    storage.clear_all()?;
    println!("저장소 초기화 완료");
    Ok(())
}
