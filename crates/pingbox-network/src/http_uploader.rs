//! HTTP 핑 업로더.
//!
//! `PingUploader` 포트 구현. `POST {server_url}{path}`로 페이로드를 보낸다.
//! 2xx만 성공이며 그 외 상태 코드와 전송 오류는 모두 실패 결과로 돌려준다.

use async_trait::async_trait;
use pingbox_core::error::CoreError;
use pingbox_core::ports::uploader::{PingUploader, UploadRequest, UploadResult};
use std::time::Duration;
use tracing::{debug, warn};

use crate::compression;

/// HTTP 업로더: `PingUploader` 포트 구현
pub struct HttpUploader {
    client: reqwest::Client,
    server_url: String,
    gzip: bool,
}

impl HttpUploader {
    /// 새 HTTP 업로더 생성 (gzip 압축 사용)
    pub fn new(server_url: &str, timeout: Duration) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pingbox/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {e}")))?;

        Ok(Self {
            client,
            server_url: server_url.trim_end_matches('/').to_string(),
            gzip: true,
        })
    }

    /// gzip 압축 여부 설정
    pub fn with_gzip(mut self, gzip: bool) -> Self {
        self.gzip = gzip;
        self
    }

    /// 요청 전송 (2xx가 아니면 Err)
    async fn send(&self, request: &UploadRequest) -> Result<(), CoreError> {
        let url = format!("{}{}", self.server_url, request.path);

        let mut builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json; charset=utf-8");

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let body = if self.gzip {
            builder = builder.header("Content-Encoding", "gzip");
            compression::gzip(&request.body)?
        } else {
            request.body.clone()
        };

        let resp = builder
            .body(body)
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("업로드 요청 실패: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let text = resp.text().await.unwrap_or_else(|e| {
            warn!("응답 본문 읽기 실패: {e}");
            String::new()
        });
        Err(CoreError::Network(format!("업로드 거부 ({status}): {text}")))
    }
}

#[async_trait]
impl PingUploader for HttpUploader {
    async fn upload(&self, request: &UploadRequest) -> UploadResult {
        debug!(
            "핑 업로드: {} ({} bytes) → {}",
            request.document_id,
            request.body.len(),
            request.path
        );

        match self.send(request).await {
            Ok(()) => UploadResult::Success,
            Err(e) => {
                warn!("핑 업로드 실패: {} - {e}", request.document_id);
                UploadResult::failure(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn make_request(path: &str) -> UploadRequest {
        let mut headers = BTreeMap::new();
        headers.insert("Date".to_string(), "Mon, 1 Jan 2024 00:00:00 +0000".to_string());
        UploadRequest {
            document_id: Uuid::new_v4(),
            path: path.to_string(),
            body: br#"{"report_info":{"seq":0},"metrics":{}}"#.to_vec(),
            headers,
        }
    }

    #[tokio::test]
    async fn upload_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/submit/test/metrics/1/doc")
            .match_header("content-type", "application/json; charset=utf-8")
            .match_header("date", "Mon, 1 Jan 2024 00:00:00 +0000")
            .with_status(200)
            .create_async()
            .await;

        let uploader = HttpUploader::new(&server.url(), Duration::from_secs(5))
            .unwrap()
            .with_gzip(false);
        let result = uploader.upload(&make_request("/submit/test/metrics/1/doc")).await;

        assert_eq!(result, UploadResult::Success);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn upload_gzip_body() {
        let mut server = mockito::Server::new_async().await;
        let request = make_request("/submit/test/metrics/1/gz");
        let expected = compression::gzip(&request.body).unwrap();

        let mock = server
            .mock("POST", "/submit/test/metrics/1/gz")
            .match_header("content-encoding", "gzip")
            .match_body(expected)
            .with_status(202)
            .create_async()
            .await;

        let uploader = HttpUploader::new(&server.url(), Duration::from_secs(5)).unwrap();
        let result = uploader.upload(&request).await;

        assert!(result.is_success());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn plain_body_without_gzip() {
        let mut server = mockito::Server::new_async().await;
        let request = make_request("/submit/test/metrics/1/plain");

        let mock = server
            .mock("POST", "/submit/test/metrics/1/plain")
            .match_header("content-encoding", mockito::Matcher::Missing)
            .match_body(request.body.clone())
            .with_status(200)
            .create_async()
            .await;

        let uploader = HttpUploader::new(&server.url(), Duration::from_secs(5))
            .unwrap()
            .with_gzip(false);
        assert!(uploader.upload(&request).await.is_success());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_error_is_failure() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/submit/test/metrics/1/err")
            .with_status(500)
            .with_body("Internal Server Error")
            .create_async()
            .await;

        let uploader = HttpUploader::new(&server.url(), Duration::from_secs(5)).unwrap();
        let result = uploader.upload(&make_request("/submit/test/metrics/1/err")).await;

        match result {
            UploadResult::Failure { reason } => assert!(reason.contains("500")),
            UploadResult::Success => panic!("500 응답은 실패여야 함"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn connection_refused_is_failure() {
        // 사용되지 않는 포트
        let uploader =
            HttpUploader::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        let result = uploader.upload(&make_request("/submit/test/metrics/1/x")).await;
        assert!(!result.is_success());
    }

    #[test]
    fn trailing_slash_trimmed() {
        let uploader = HttpUploader::new("http://localhost:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(uploader.server_url, "http://localhost:8000");
    }
}
