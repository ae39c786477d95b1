//! 업로드 아웃박스.
//!
//! 제출된 핑을 대기열에서 하나씩 점유해 외부 업로더로 넘긴다.
//! 성공하면 삭제하고, 실패하면 다음 점유를 기다린다.
//! 점유 횟수가 [`MAX_TRIES`]를 넘은 문서는 결과와 무관하게 삭제된다.

use chrono::Utc;
use pingbox_core::config::MAX_TRIES;
use pingbox_core::error::CoreError;
use pingbox_core::models::ping::{ClaimedPing, NewPendingPing, PingMetadata, PingPayload};
use pingbox_core::ports::storage::{PendingPingStore, SharedStore};
use pingbox_core::ports::uploader::{PingUploader, UploadRequest, UploadResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::context::Telemetry;

/// 업로드 경로
pub fn submission_path(app_id: &str, ping: &str, document_id: Uuid) -> String {
    format!("/submit/{app_id}/{ping}/1/{document_id}")
}

/// 페이로드를 대기 핑으로 저장
///
/// 핑 제출 트랜잭션 안에서 호출된다.
pub fn enqueue<S: PendingPingStore + ?Sized>(
    store: &S,
    app_id: &str,
    ping: &str,
    payload: &PingPayload,
) -> Result<Uuid, CoreError> {
    let id = Uuid::new_v4();
    let submitted_at = Utc::now();

    let mut headers = BTreeMap::new();
    headers.insert("Date".to_string(), submitted_at.to_rfc2822());

    store.insert_pending(&NewPendingPing {
        id,
        ping: ping.to_string(),
        payload: serde_json::to_string(payload)?,
        metadata: PingMetadata {
            path: submission_path(app_id, ping, id),
            headers,
            submitted_at,
        },
    })?;

    debug!("아웃박스 추가: {ping} → {id}");
    Ok(id)
}

/// 점유한 핑의 처리 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// 전송 성공, 삭제됨
    Delivered,
    /// 전송 실패, 다음 점유 대기
    Retained,
    /// 재시도 한도 초과, 전송 없이 삭제됨
    Dropped,
}

/// 누적 전송 통계 (프로세스 수명 동안)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutboxStats {
    /// 전송 성공 수
    pub delivered: u64,
    /// 실패한 전송 시도 수
    pub failed_attempts: u64,
    /// 한도 초과로 버린 핑 수
    pub dropped: u64,
}

/// 한 번의 대기열 처리 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    /// 점유한 횟수
    pub attempted: u64,
    /// 성공
    pub delivered: u64,
    /// 실패 후 남겨둔 수
    pub retained: u64,
    /// 버린 수
    pub dropped: u64,
}

impl DeliveryReport {
    fn count(&mut self, disposition: Disposition) {
        self.attempted += 1;
        match disposition {
            Disposition::Delivered => self.delivered += 1,
            Disposition::Retained => self.retained += 1,
            Disposition::Dropped => self.dropped += 1,
        }
    }
}

/// 업로드 아웃박스
pub struct Outbox {
    store: SharedStore,
    app_id: String,
    delivered: AtomicU64,
    failed_attempts: AtomicU64,
    dropped: AtomicU64,
}

impl Outbox {
    /// 컨텍스트의 저장소를 쓰는 아웃박스
    pub fn new(ctx: &Telemetry) -> Self {
        Self {
            store: ctx.shared_store().clone(),
            app_id: ctx.app_id().to_string(),
            delivered: AtomicU64::new(0),
            failed_attempts: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// 페이로드 추가
    pub fn enqueue(&self, ping: &str, payload: &PingPayload) -> Result<Uuid, CoreError> {
        enqueue(&*self.store, &self.app_id, ping, payload)
    }

    /// 가장 오래된 대기 핑 점유 (시도 횟수 증가)
    pub fn claim_next(&self) -> Result<Option<ClaimedPing>, CoreError> {
        self.store.claim_one_pending()
    }

    /// 전송 결과 반영
    pub fn report_outcome(
        &self,
        claimed: &ClaimedPing,
        result: &UploadResult,
    ) -> Result<Disposition, CoreError> {
        if result.is_success() {
            self.store.delete_pending(claimed.id)?;
            self.delivered.fetch_add(1, Ordering::Relaxed);
            debug!("핑 전송 완료: {} ({})", claimed.id, claimed.ping);
            return Ok(Disposition::Delivered);
        }

        self.failed_attempts.fetch_add(1, Ordering::Relaxed);

        if claimed.try_count > MAX_TRIES {
            self.store.delete_pending(claimed.id)?;
            self.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(
                "핑 재시도 한도 초과, 삭제: {} ({}) {}회 시도",
                claimed.id, claimed.ping, claimed.try_count
            );
            return Ok(Disposition::Dropped);
        }

        if let UploadResult::Failure { reason } = result {
            warn!(
                "핑 전송 실패 ({}/{}): {} - {reason}",
                claimed.try_count,
                MAX_TRIES + 1,
                claimed.id
            );
        }
        Ok(Disposition::Retained)
    }

    /// 대기열이 빌 때까지 점유 → 전송 → 결과 반영 반복
    ///
    /// 시도 사이에 대기하지 않는다. 실패한 문서는 같은 호출 안에서
    /// 재시도 한도에 도달할 때까지 다시 점유될 수 있다.
    pub async fn process_pending(
        &self,
        uploader: &dyn PingUploader,
    ) -> Result<DeliveryReport, CoreError> {
        let mut report = DeliveryReport::default();

        while let Some(claimed) = self.claim_next()? {
            let request = UploadRequest::from(&claimed);
            let result = uploader.upload(&request).await;
            let disposition = self.report_outcome(&claimed, &result)?;
            report.count(disposition);
        }

        if report.attempted > 0 {
            info!(
                "아웃박스 처리: 시도 {}, 성공 {}, 실패 {}, 삭제 {}",
                report.attempted, report.delivered, report.retained, report.dropped
            );
        }
        Ok(report)
    }

    /// 남은 대기 핑 수
    pub fn pending_count(&self) -> Result<usize, CoreError> {
        self.store.pending_count()
    }

    /// 누적 통계
    pub fn stats(&self) -> OutboxStats {
        OutboxStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            failed_attempts: self.failed_attempts.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{CommonMetricData, CounterMetric};
    use crate::ping::PingType;
    use async_trait::async_trait;
    use pingbox_core::models::metric::Lifetime;
    use pingbox_storage::sqlite::SqliteStorage;
    use std::sync::{Arc, Mutex};

    /// 결과를 고정해 두고 받은 요청을 기록하는 업로더
    struct MockUploader {
        succeed: bool,
        requests: Mutex<Vec<UploadRequest>>,
    }

    impl MockUploader {
        fn new(succeed: bool) -> Self {
            Self {
                succeed,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl PingUploader for MockUploader {
        async fn upload(&self, request: &UploadRequest) -> UploadResult {
            self.requests.lock().unwrap().push(request.clone());
            if self.succeed {
                UploadResult::Success
            } else {
                UploadResult::failure("서버 오류 500")
            }
        }
    }

    fn test_ctx() -> Telemetry {
        Telemetry::new(Arc::new(SqliteStorage::open_in_memory().unwrap()), "test")
    }

    fn submit_one(ctx: &Telemetry) -> PingPayload {
        CounterMetric::new(CommonMetricData::new("clicks", Lifetime::Ping))
            .add(ctx, 1)
            .unwrap();
        PingType::new("metrics").submit(ctx).unwrap()
    }

    #[test]
    fn path_format() {
        let id = Uuid::nil();
        assert_eq!(
            submission_path("pingbox", "metrics", id),
            "/submit/pingbox/metrics/1/00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn enqueue_then_claim() {
        let ctx = test_ctx();
        let outbox = Outbox::new(&ctx);
        let payload = submit_one(&ctx);

        let claimed = outbox.claim_next().unwrap().unwrap();
        assert_eq!(claimed.try_count, 1);
        assert_eq!(claimed.ping, "metrics");
        assert!(claimed.metadata.path.ends_with(&claimed.id.to_string()));
        assert!(claimed.metadata.headers.contains_key("Date"));

        let stored: PingPayload = serde_json::from_str(&claimed.payload).unwrap();
        assert_eq!(stored, payload);
    }

    #[test]
    fn claim_empty_returns_none() {
        let ctx = test_ctx();
        let outbox = Outbox::new(&ctx);
        assert!(outbox.claim_next().unwrap().is_none());
    }

    #[test]
    fn success_deletes() {
        let ctx = test_ctx();
        let outbox = Outbox::new(&ctx);
        submit_one(&ctx);

        let claimed = outbox.claim_next().unwrap().unwrap();
        let disposition = outbox
            .report_outcome(&claimed, &UploadResult::Success)
            .unwrap();

        assert_eq!(disposition, Disposition::Delivered);
        assert_eq!(outbox.pending_count().unwrap(), 0);
        assert_eq!(outbox.stats().delivered, 1);
    }

    #[test]
    fn failure_retains_until_limit() {
        let ctx = test_ctx();
        let outbox = Outbox::new(&ctx);
        submit_one(&ctx);
        let failure = UploadResult::failure("timeout");

        for attempt in 1..=MAX_TRIES {
            let claimed = outbox.claim_next().unwrap().unwrap();
            assert_eq!(claimed.try_count, attempt);
            let disposition = outbox.report_outcome(&claimed, &failure).unwrap();
            assert_eq!(disposition, Disposition::Retained);
        }

        let last = outbox.claim_next().unwrap().unwrap();
        assert_eq!(last.try_count, MAX_TRIES + 1);
        assert_eq!(
            outbox.report_outcome(&last, &failure).unwrap(),
            Disposition::Dropped
        );

        assert!(outbox.claim_next().unwrap().is_none());
        assert_eq!(
            outbox.stats(),
            OutboxStats {
                delivered: 0,
                failed_attempts: u64::from(MAX_TRIES + 1),
                dropped: 1,
            }
        );
    }

    #[test]
    fn success_on_last_try_still_delivered() {
        let ctx = test_ctx();
        let outbox = Outbox::new(&ctx);
        submit_one(&ctx);

        for _ in 0..MAX_TRIES {
            let claimed = outbox.claim_next().unwrap().unwrap();
            outbox
                .report_outcome(&claimed, &UploadResult::failure("offline"))
                .unwrap();
        }

        let last = outbox.claim_next().unwrap().unwrap();
        assert_eq!(
            outbox.report_outcome(&last, &UploadResult::Success).unwrap(),
            Disposition::Delivered
        );
    }

    #[tokio::test]
    async fn process_pending_delivers_all() {
        let ctx = test_ctx();
        let outbox = Outbox::new(&ctx);
        submit_one(&ctx);
        submit_one(&ctx);

        let uploader = MockUploader::new(true);
        let report = outbox.process_pending(&uploader).await.unwrap();

        assert_eq!(report.attempted, 2);
        assert_eq!(report.delivered, 2);
        assert_eq!(uploader.calls(), 2);
        assert_eq!(outbox.pending_count().unwrap(), 0);

        let requests = uploader.requests.lock().unwrap();
        assert!(requests[0].path.starts_with("/submit/test/metrics/1/"));
    }

    #[tokio::test]
    async fn always_failing_upload_dropped_after_fourth_claim() {
        let ctx = test_ctx();
        let outbox = Outbox::new(&ctx);
        submit_one(&ctx);

        let uploader = MockUploader::new(false);
        let report = outbox.process_pending(&uploader).await.unwrap();

        assert_eq!(uploader.calls(), (MAX_TRIES + 1) as usize);
        assert_eq!(report.retained, u64::from(MAX_TRIES));
        assert_eq!(report.dropped, 1);
        assert_eq!(report.delivered, 0);
        assert_eq!(outbox.pending_count().unwrap(), 0);
    }

    #[test]
    fn enqueue_direct() {
        let ctx = test_ctx();
        let outbox = Outbox::new(&ctx);
        let payload = PingType::new("metrics").collect(&ctx).unwrap();

        let id = outbox.enqueue("metrics", &payload).unwrap();
        let claimed = outbox.claim_next().unwrap().unwrap();
        assert_eq!(claimed.id, id);
    }
}
