//! # pingbox-storage
//!
//! 로컬 저장소 어댑터.
//! SQLite 기반 메트릭 값 저장, 업로드 대기 핑(아웃박스),
//! 스키마 마이그레이션을 관리한다.
//!
//! ## 모듈
//! - `sqlite`: 저장소 (TelemetryStore 구현)
//! - `migration`: 스키마 마이그레이션

pub mod migration;
pub mod sqlite;
