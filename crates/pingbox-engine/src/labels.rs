//! 레이블 카디널리티 제한.
//!
//! 메트릭 ID당 차원별로 서로 다른 레이블 값을 최대 [`MAX_LABELS`]개까지
//! 허용하고, 그 이후의 새 값은 [`OTHER_LABEL`] 버킷으로 보낸다.
//! 2차원 레이블은 키와 카테고리를 각각 독립적으로 제한하므로
//! 저장되는 쌍의 수는 `MAX_LABELS × MAX_LABELS`까지 늘어날 수 있다.

use pingbox_core::config::{MAX_LABELS, OTHER_LABEL};
use pingbox_core::error::CoreError;
use pingbox_core::models::metric::{Label, LabelDimension};
use pingbox_core::ports::storage::MetricStore;
use std::collections::BTreeSet;
use tracing::debug;

/// 레이블 허용 정책
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LabelPolicy {
    /// 저장된 값 기준 동적 제한
    #[default]
    Dynamic,
    /// 고정 허용 목록 (목록 밖 값은 모두 `__other__`)
    Static(BTreeSet<String>),
}

impl LabelPolicy {
    /// 고정 허용 목록 생성
    pub fn fixed<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Static(labels.into_iter().map(Into::into).collect())
    }
}

/// 단일 레이블 해석
pub fn resolve_label<S: MetricStore + ?Sized>(
    store: &S,
    metric_id: &str,
    raw: &str,
    policy: &LabelPolicy,
) -> Result<Label, CoreError> {
    let label = resolve_dimension(store, metric_id, LabelDimension::Key, raw, policy)?;
    Ok(Label::Single(label))
}

/// 2차원 레이블 해석 (키와 카테고리를 독립적으로)
pub fn resolve_dual_label<S: MetricStore + ?Sized>(
    store: &S,
    metric_id: &str,
    key: &str,
    category: &str,
    key_policy: &LabelPolicy,
    category_policy: &LabelPolicy,
) -> Result<Label, CoreError> {
    let key = resolve_dimension(store, metric_id, LabelDimension::Key, key, key_policy)?;
    let category = resolve_dimension(
        store,
        metric_id,
        LabelDimension::Category,
        category,
        category_policy,
    )?;
    Ok(Label::Dual { key, category })
}

fn resolve_dimension<S: MetricStore + ?Sized>(
    store: &S,
    metric_id: &str,
    dimension: LabelDimension,
    raw: &str,
    policy: &LabelPolicy,
) -> Result<String, CoreError> {
    let allowed = match policy {
        LabelPolicy::Static(allowed) => allowed.contains(raw),
        LabelPolicy::Dynamic => {
            let existing = store.list_distinct_labels(metric_id, dimension)?;
            existing.contains(raw) || existing.len() < MAX_LABELS
        }
    };

    if allowed {
        Ok(raw.to_string())
    } else {
        debug!("레이블 한도 초과: {metric_id} {dimension:?} '{raw}' → {OTHER_LABEL}");
        Ok(OTHER_LABEL.to_string())
    }
}
