//! 핑 업로더 포트.
//!
//! 구현: `pingbox-network` crate (reqwest)

use async_trait::async_trait;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::models::ping::ClaimedPing;

/// 업로드 요청
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// 문서 ID
    pub document_id: Uuid,
    /// 업로드 경로
    pub path: String,
    /// 본문 (JSON 페이로드)
    pub body: Vec<u8>,
    /// 추가 HTTP 헤더
    pub headers: BTreeMap<String, String>,
}

impl From<&ClaimedPing> for UploadRequest {
    fn from(ping: &ClaimedPing) -> Self {
        Self {
            document_id: ping.id,
            path: ping.metadata.path.clone(),
            body: ping.payload.as_bytes().to_vec(),
            headers: ping.metadata.headers.clone(),
        }
    }
}

/// 업로드 결과
///
/// 실패는 에러가 아니라 재시도 예산을 줄이는 정상 결과다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadResult {
    /// 전송 성공
    Success,
    /// 전송 실패 (서버 거부, 연결 실패 등)
    Failure {
        /// 실패 사유
        reason: String,
    },
}

impl UploadResult {
    /// 실패 결과 생성
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    /// 성공 여부
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// 핑 업로더
#[async_trait]
pub trait PingUploader: Send + Sync {
    /// 페이로드 하나를 전송
    async fn upload(&self, request: &UploadRequest) -> UploadResult;
}
