//! 레이블 카운터 (단일, 2차원).
//!
//! 레이블 해석과 기록은 같은 트랜잭션에서 실행되므로, 한 저장소 안에서는
//! 동시에 기록해도 차원별 한도를 넘지 않는다.

use pingbox_core::error::CoreError;
use pingbox_core::models::metric::{Label, UpdateRule};
use pingbox_core::ports::storage::TelemetryStore;

use super::CommonMetricData;
use crate::accumulator;
use crate::context::Telemetry;
use crate::labels::{self, LabelPolicy};

/// 레이블을 해석한 뒤 같은 트랜잭션에서 증가
fn add_resolved(
    store: &dyn TelemetryStore,
    meta: &CommonMetricData,
    amount: i64,
    resolve: &dyn Fn(&dyn TelemetryStore) -> Result<Label, CoreError>,
) -> Result<(), CoreError> {
    store.transaction(&mut |tx| {
        let label = resolve(tx)?;
        accumulator::record(tx, meta, &label, &UpdateRule::Increment(amount))
    })
}

// ============================================================
// 단일 레이블
// ============================================================

/// 단일 레이블 카운터
#[derive(Debug, Clone)]
pub struct LabeledCounter {
    meta: CommonMetricData,
    policy: LabelPolicy,
}

impl LabeledCounter {
    /// 동적 레이블 카운터
    pub fn new(meta: CommonMetricData) -> Self {
        Self {
            meta,
            policy: LabelPolicy::Dynamic,
        }
    }

    /// 고정 허용 목록 지정
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policy = LabelPolicy::fixed(labels);
        self
    }

    /// 레이블별 카운터
    pub fn get(&self, label: impl Into<String>) -> LabeledCounterEntry<'_> {
        LabeledCounterEntry {
            parent: self,
            label: label.into(),
        }
    }
}

/// [`LabeledCounter::get`]이 돌려주는 레이블 하나의 카운터
#[derive(Debug)]
pub struct LabeledCounterEntry<'a> {
    parent: &'a LabeledCounter,
    label: String,
}

impl LabeledCounterEntry<'_> {
    /// `amount`만큼 증가 (한도 초과 시 `__other__`에 기록)
    pub fn add(&self, ctx: &Telemetry, amount: i64) -> Result<(), CoreError> {
        let meta = &self.parent.meta;
        add_resolved(ctx.store(), meta, amount, &|tx| {
            labels::resolve_label(tx, &meta.name, &self.label, &self.parent.policy)
        })
    }

    /// 1 증가
    pub fn add_one(&self, ctx: &Telemetry) -> Result<(), CoreError> {
        self.add(ctx, 1)
    }

    /// 저장된 값 (레이블 그대로 조회)
    pub fn get_value(&self, ctx: &Telemetry, ping: Option<&str>) -> Result<Option<i64>, CoreError> {
        let meta = &self.parent.meta;
        let value = accumulator::get_value(
            ctx.store(),
            &meta.name,
            meta.ping_or_default(ping),
            &Label::single(self.label.as_str()),
        )?;
        Ok(value.and_then(|v| v.as_integer()))
    }
}

// ============================================================
// 2차원 레이블
// ============================================================

/// 키 + 카테고리 2차원 레이블 카운터
#[derive(Debug, Clone)]
pub struct DualLabeledCounter {
    meta: CommonMetricData,
    key_policy: LabelPolicy,
    category_policy: LabelPolicy,
}

impl DualLabeledCounter {
    /// 두 차원 모두 동적인 카운터
    pub fn new(meta: CommonMetricData) -> Self {
        Self {
            meta,
            key_policy: LabelPolicy::Dynamic,
            category_policy: LabelPolicy::Dynamic,
        }
    }

    /// 키 허용 목록 지정
    pub fn with_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_policy = LabelPolicy::fixed(keys);
        self
    }

    /// 카테고리 허용 목록 지정
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.category_policy = LabelPolicy::fixed(categories);
        self
    }

    /// 키 + 카테고리 카운터
    pub fn get(
        &self,
        key: impl Into<String>,
        category: impl Into<String>,
    ) -> DualLabeledCounterEntry<'_> {
        DualLabeledCounterEntry {
            parent: self,
            key: key.into(),
            category: category.into(),
        }
    }
}

/// [`DualLabeledCounter::get`]이 돌려주는 카운터
#[derive(Debug)]
pub struct DualLabeledCounterEntry<'a> {
    parent: &'a DualLabeledCounter,
    key: String,
    category: String,
}

impl DualLabeledCounterEntry<'_> {
    /// `amount`만큼 증가 (차원별 한도 초과 시 해당 차원만 `__other__`)
    pub fn add(&self, ctx: &Telemetry, amount: i64) -> Result<(), CoreError> {
        let parent = self.parent;
        add_resolved(ctx.store(), &parent.meta, amount, &|tx| {
            labels::resolve_dual_label(
                tx,
                &parent.meta.name,
                &self.key,
                &self.category,
                &parent.key_policy,
                &parent.category_policy,
            )
        })
    }

    /// 1 증가
    pub fn add_one(&self, ctx: &Telemetry) -> Result<(), CoreError> {
        self.add(ctx, 1)
    }

    /// 저장된 값 (레이블 그대로 조회)
    pub fn get_value(&self, ctx: &Telemetry, ping: Option<&str>) -> Result<Option<i64>, CoreError> {
        let meta = &self.parent.meta;
        let value = accumulator::get_value(
            ctx.store(),
            &meta.name,
            meta.ping_or_default(ping),
            &Label::dual(self.key.as_str(), self.category.as_str()),
        )?;
        Ok(value.and_then(|v| v.as_integer()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pingbox_core::config::{MAX_LABELS, OTHER_LABEL};
    use pingbox_core::models::metric::Lifetime;
    use pingbox_storage::sqlite::SqliteStorage;
    use std::sync::Arc;

    fn test_ctx() -> Telemetry {
        Telemetry::new(Arc::new(SqliteStorage::open_in_memory().unwrap()), "test")
    }

    #[test]
    fn twenty_labels_overflow_into_other() {
        let ctx = test_ctx();
        let errors = LabeledCounter::new(CommonMetricData::new("errors", Lifetime::Ping));

        for i in 0..20 {
            errors.get(format!("label_{i}")).add_one(&ctx).unwrap();
        }

        for i in 0..MAX_LABELS {
            let value = errors.get(format!("label_{i}")).get_value(&ctx, None).unwrap();
            assert_eq!(value, Some(1), "label_{i}");
        }
        assert_eq!(errors.get("label_16").get_value(&ctx, None).unwrap(), None);
        assert_eq!(errors.get(OTHER_LABEL).get_value(&ctx, None).unwrap(), Some(4));
    }

    #[test]
    fn allow_list_short_circuits() {
        let ctx = test_ctx();
        let errors = LabeledCounter::new(CommonMetricData::new("errors", Lifetime::Ping))
            .with_labels(["predefined"]);

        errors.get("predefined").add_one(&ctx).unwrap();
        errors.get("random").add_one(&ctx).unwrap();

        assert_eq!(errors.get("predefined").get_value(&ctx, None).unwrap(), Some(1));
        assert_eq!(errors.get(OTHER_LABEL).get_value(&ctx, None).unwrap(), Some(1));
        assert_eq!(errors.get("random").get_value(&ctx, None).unwrap(), None);
    }

    #[test]
    fn dual_keys_overflow_categories_intact() {
        let ctx = test_ctx();
        let actions = DualLabeledCounter::new(CommonMetricData::new("actions", Lifetime::Ping));

        for k in 0..20 {
            for c in 0..5 {
                actions
                    .get(format!("key_{k}"), format!("cat_{c}"))
                    .add_one(&ctx)
                    .unwrap();
            }
        }

        for c in 0..5 {
            let cat = format!("cat_{c}");
            assert_eq!(
                actions.get("key_0", cat.as_str()).get_value(&ctx, None).unwrap(),
                Some(1)
            );
            assert_eq!(
                actions.get(OTHER_LABEL, cat.as_str()).get_value(&ctx, None).unwrap(),
                Some(4)
            );
        }
        assert_eq!(
            actions.get("key_19", "cat_0").get_value(&ctx, None).unwrap(),
            None
        );
    }

    #[test]
    fn dual_allow_lists() {
        let ctx = test_ctx();
        let actions = DualLabeledCounter::new(CommonMetricData::new("actions", Lifetime::Ping))
            .with_keys(["open"])
            .with_categories(["cli"]);

        actions.get("open", "cli").add_one(&ctx).unwrap();
        actions.get("close", "gui").add(&ctx, 2).unwrap();

        assert_eq!(actions.get("open", "cli").get_value(&ctx, None).unwrap(), Some(1));
        assert_eq!(
            actions.get(OTHER_LABEL, OTHER_LABEL).get_value(&ctx, None).unwrap(),
            Some(2)
        );
    }
}
