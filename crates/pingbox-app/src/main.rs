//! # pingbox-app
//!
//! PINGBOX CLI 바이너리 진입점.
//! 설정 로드, 저장소 와이어링, 하위 명령 실행.

mod commands;
mod demo;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pingbox_core::config::{AppConfig, DEFAULT_PING_NAME};
use pingbox_core::config_manager::ConfigManager;
use pingbox_engine::Telemetry;
use pingbox_storage::sqlite::SqliteStorage;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 인메모리 DB를 뜻하는 `--db` 값
const IN_MEMORY_DB: &str = ":memory:";

/// PINGBOX 로컬 텔레메트리 엔진
///
/// 메트릭을 로컬 SQLite에 누적하고 핑 단위로 묶어 업로드한다.
#[derive(Parser, Debug)]
#[command(name = "pingbox")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리의 config.json)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// DB 파일 경로 (":memory:" 허용)
    #[arg(long, global = true)]
    db: Option<String>,

    /// 업로드 서버 URL 지정 (설정 파일보다 우선)
    #[arg(long, short = 's', global = true)]
    server: Option<String>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 예제 메트릭을 기록하고 `metrics` 핑을 두 번 제출
    Demo,
    /// 핑 조립 후 아웃박스에 추가
    Submit {
        /// 핑 이름
        #[arg(default_value = DEFAULT_PING_NAME)]
        ping: String,
    },
    /// 제출될 페이로드 미리보기 (변경 없음)
    Inspect {
        /// 핑 이름
        #[arg(default_value = DEFAULT_PING_NAME)]
        ping: String,
    },
    /// 아웃박스의 대기 핑 전송
    Upload,
    /// 대기 핑 수 출력
    Status,
    /// 저장된 메트릭과 대기 핑 전체 삭제
    Reset,
}

/// 설정 관리자 생성 (경로 지정 시 해당 파일 사용)
fn load_config(path: Option<PathBuf>) -> Result<AppConfig> {
    let manager = match path {
        Some(path) => ConfigManager::with_path(path)?,
        None => ConfigManager::new()?,
    };
    info!("설정 파일: {}", manager.config_path().display());
    Ok(manager.get()?)
}

/// 저장소 열기 (`--db` 인자 > 설정의 data_dir > 플랫폼 데이터 디렉토리)
///
/// # 플랫폼별 기본 경로:
/// - macOS: `~/Library/Application Support/io.pingbox.pingbox/telemetry.db`
/// - Windows: `%APPDATA%\pingbox\pingbox\data\telemetry.db`
/// - Linux: `~/.local/share/pingbox/telemetry.db`
fn open_storage(db: Option<&str>, config: &AppConfig) -> Result<SqliteStorage> {
    if db == Some(IN_MEMORY_DB) {
        return Ok(SqliteStorage::open_in_memory()?);
    }

    let path = match db {
        Some(path) => PathBuf::from(path),
        None => {
            let dir = match &config.storage.data_dir {
                Some(dir) => dir.clone(),
                None => ConfigManager::data_dir()?,
            };
            dir.join(&config.storage.database_file)
        }
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("데이터 디렉토리 생성 실패: {}", parent.display()))?;
    }

    Ok(SqliteStorage::open(&path)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_filter = format!(
        "pingbox={},pingbox_app={},pingbox_core={},pingbox_storage={},pingbox_engine={},pingbox_network={}",
        args.log_level, args.log_level, args.log_level, args.log_level, args.log_level, args.log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = load_config(args.config)?;
    if let Some(server_url) = args.server {
        config.upload.server_url = server_url;
    }
    config.validate()?;

    let storage = Arc::new(open_storage(args.db.as_deref(), &config)?);
    let ctx = Telemetry::new(storage.clone(), config.upload.app_id.clone());

    match args.command {
        Command::Demo => demo::run(&ctx)?,
        Command::Submit { ping } => commands::submit(&ctx, &ping)?,
        Command::Inspect { ping } => commands::inspect(&ctx, &ping)?,
        Command::Upload => commands::upload(&ctx, &config).await?,
        Command::Status => commands::status(&ctx)?,
        Command::Reset => commands::reset(&storage)?,
    }

    Ok(())
}
