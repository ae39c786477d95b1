//! # pingbox-engine
//!
//! 텔레메트리 엔진.
//! 타입별 메트릭 핸들로 값을 누적하고, 핑 단위로 조립해
//! 업로드 아웃박스에 넣은 뒤, 외부 업로더로 재시도 전송한다.
//!
//! ## 모듈
//! - `context`: 저장소 핸들과 프로세스 시작 시각을 묶은 컨텍스트
//! - `accumulator`: 메트릭 값 upsert (lifetime 포함)
//! - `labels`: 레이블 카디널리티 제한 (`__other__` 버킷)
//! - `metrics`: 카운터, 문자열, 레이블 카운터 핸들
//! - `ping`: 핑 조립과 제출
//! - `outbox`: 대기 핑 점유, 재시도, 삭제

pub mod accumulator;
pub mod context;
pub mod labels;
pub mod metrics;
pub mod outbox;
pub mod ping;

pub use context::Telemetry;
pub use labels::LabelPolicy;
pub use metrics::{
    CommonMetricData, CounterMetric, DualLabeledCounter, LabeledCounter, StringMetric,
};
pub use outbox::{DeliveryReport, Disposition, Outbox, OutboxStats};
pub use ping::PingType;
