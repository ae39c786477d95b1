//! 애플리케이션 설정 구조체와 고정 상수.
//!
//! 저장소 경로, 업로드 서버 등 런타임 설정을 정의한다.
//! 레이블 상한, 재시도 상한 같은 엔진 상수는 설정으로 바꿀 수 없다.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::CoreError;

/// 메트릭 차원(dimension)별 최대 레이블 수
pub const MAX_LABELS: usize = 16;

/// 레이블 상한 초과 시 사용되는 공용 버킷
pub const OTHER_LABEL: &str = "__other__";

/// 대기 핑 최대 시도 횟수 (초과 시 폐기)
pub const MAX_TRIES: u32 = 3;

/// 기본 핑 이름
pub const DEFAULT_PING_NAME: &str = "metrics";

/// 핑 메타데이터(seq, 시작/종료 시각) 저장용 예약 핑 이름
pub const PING_INFO_STORAGE: &str = "glean_ping_info";

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 로컬 저장소 설정
    #[serde(default)]
    pub storage: StorageConfig,
    /// 핑 업로드 설정
    #[serde(default)]
    pub upload: UploadConfig,
}

// ============================================================
// 저장소 설정
// ============================================================

/// 로컬 저장소 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// 데이터 디렉토리 (None이면 플랫폼 기본 경로)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// SQLite DB 파일 이름
    #[serde(default = "default_database_file")]
    pub database_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            database_file: default_database_file(),
        }
    }
}

// ============================================================
// 업로드 설정
// ============================================================

/// 핑 업로드 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// 수집 서버 기본 URL (예: "https://incoming.example.com")
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// 업로드 경로에 들어가는 애플리케이션 ID
    #[serde(default = "default_app_id")]
    pub app_id: String,
    /// 요청 타임아웃 (초)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// gzip 압축 전송 여부
    #[serde(default = "default_true")]
    pub gzip: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            app_id: default_app_id(),
            timeout_secs: default_timeout_secs(),
            gzip: true,
        }
    }
}

// ============================================================
// AppConfig impl
// ============================================================

impl AppConfig {
    /// 기본 설정값 반환
    pub fn default_config() -> Self {
        Self {
            storage: StorageConfig::default(),
            upload: UploadConfig::default(),
        }
    }

    /// 업로드 요청 타임아웃을 Duration으로 반환
    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload.timeout_secs)
    }

    /// 설정값 유효성 검증
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.upload.server_url.trim().is_empty() {
            return Err(CoreError::validation(
                "upload.server_url",
                "서버 URL이 비어 있습니다",
            ));
        }
        if self.upload.app_id.trim().is_empty() {
            return Err(CoreError::validation(
                "upload.app_id",
                "애플리케이션 ID가 비어 있습니다",
            ));
        }
        if self.upload.timeout_secs == 0 {
            return Err(CoreError::validation(
                "upload.timeout_secs",
                "타임아웃은 0보다 커야 합니다",
            ));
        }
        if self.storage.database_file.trim().is_empty() {
            return Err(CoreError::validation(
                "storage.database_file",
                "DB 파일 이름이 비어 있습니다",
            ));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

// ============================================================
// 기본값 함수
// ============================================================

fn default_true() -> bool {
    true
}
fn default_database_file() -> String {
    "telemetry.db".to_string()
}
fn default_server_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_app_id() -> String {
    "pingbox".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.upload.timeout_secs, 30);
        assert_eq!(config.storage.database_file, "telemetry.db");
        assert!(config.upload.gzip);
    }

    #[test]
    fn missing_sections_use_defaults() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.upload.app_id, "pingbox");
        assert!(config.storage.data_dir.is_none());
    }

    #[test]
    fn rejects_zero_timeout() {
        let mut config = AppConfig::default_config();
        config.upload.timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, CoreError::Validation { ref field, .. } if field == "upload.timeout_secs"));
    }

    #[test]
    fn rejects_blank_server_url() {
        let mut config = AppConfig::default_config();
        config.upload.server_url = "  ".to_string();
        assert!(config.validate().is_err());
    }
}
