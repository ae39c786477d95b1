//! 엔진 컨텍스트.
//!
//! 저장소 핸들과 프로세스 시작 시각을 한 번 만들어 모든 연산에 넘긴다.

use chrono::{DateTime, Utc};
use pingbox_core::ports::storage::{SharedStore, TelemetryStore};

/// 텔레메트리 컨텍스트
///
/// 복제해도 같은 저장소를 공유한다.
#[derive(Clone)]
pub struct Telemetry {
    store: SharedStore,
    app_id: String,
    start_time: DateTime<Utc>,
}

impl Telemetry {
    /// 새 컨텍스트 생성 (시작 시각 = 지금)
    pub fn new(store: SharedStore, app_id: impl Into<String>) -> Self {
        Self {
            store,
            app_id: app_id.into(),
            start_time: Utc::now(),
        }
    }

    /// 프로세스 시작 시각 지정
    pub fn with_start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = start_time;
        self
    }

    /// 저장소
    pub fn store(&self) -> &dyn TelemetryStore {
        &*self.store
    }

    /// 공유 저장소 핸들
    pub fn shared_store(&self) -> &SharedStore {
        &self.store
    }

    /// 업로드 경로에 쓰이는 애플리케이션 ID
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// 첫 핑의 집계 시작 시각
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }
}

impl std::fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Telemetry")
            .field("app_id", &self.app_id)
            .field("start_time", &self.start_time)
            .finish_non_exhaustive()
    }
}
