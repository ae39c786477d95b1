//! 도메인 모델.
//!
//! - [`metric`]: 메트릭 키, 값, 갱신 규칙
//! - [`ping`]: 핑 페이로드, 대기 핑

pub mod metric;
pub mod ping;
