//! # pingbox-network
//!
//! 핑 업로드 네트워크 어댑터.
//! 아웃박스에서 점유한 페이로드를 수집 서버에 HTTP POST로 전송하며
//! gzip 압축을 지원한다.
//!
//! ## 사용 예시
//!
//! ```rust,ignore
//! use pingbox_network::http_uploader::HttpUploader;
//!
//! let uploader = HttpUploader::new("https://incoming.example.com", timeout)?;
//! let report = outbox.process_pending(&uploader).await?;
//! ```

pub mod compression;
pub mod http_uploader;
