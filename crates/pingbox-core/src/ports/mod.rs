//! 포트 인터페이스 (trait).
//!
//! Hexagonal Architecture의 포트 레이어.
//! 각 어댑터 crate가 이 trait들을 구현하며,
//! `pingbox-app`에서 `Arc<dyn T>`로 와이어링한다.
//!
//! 저장소 포트는 동기 trait, 네트워크를 타는 업로더 포트만
//! `async_trait`을 사용한다.

pub mod storage;
pub mod uploader;
