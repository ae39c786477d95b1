//! PINGBOX 핵심 에러 타입.
//!
//! 모든 어댑터 crate는 자체 실패를 `CoreError`로 매핑해서 반환한다.
//! 업로드 실패는 에러가 아니라 `UploadResult::Failure` 값으로 전달된다.

use thiserror::Error;

/// 코어 레이어 에러.
/// 저장소, 직렬화, 설정, 유효성 검증 등 도메인 공통 에러를 정의한다.
#[derive(Debug, Error)]
pub enum CoreError {
    /// 저장소 트랜잭션 실패 (커밋되지 않음)
    #[error("저장소 에러: {0}")]
    Storage(String),

    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패 ({field}): {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),

    /// 네트워크 에러 (클라이언트 생성 실패 등)
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),
}

impl CoreError {
    /// 유효성 검증 에러 생성 헬퍼
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}
