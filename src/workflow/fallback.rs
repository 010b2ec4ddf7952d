//! 主 / 兜底流程 - 流程层
//!
//! 核心职责：定义"一个批次"的完整处理流程
//!
//! 流程顺序：
//! 1. 主服务处理整批 → 逐项质量校验 → 全部通过则结束
//! 2. 任意一项失败（调用错误、超时、缺失、校验不通过）→ 兜底服务重做整批
//! 3. 兜底服务的结果逐项判定，仍失败的项带着兜底服务的错误结束
//!
//! 没有第三层。

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::ProviderError;
use crate::models::{EnrichmentOutcome, OutcomeError, ProviderRole, TargetRequirements, WorkItem};
use crate::services::validator;
use crate::services::{ProviderAdapter, ProviderBatchResult};
use crate::workflow::batch_ctx::BatchCtx;

/// 默认主服务超时
pub const DEFAULT_PRIMARY_TIMEOUT: Duration = Duration::from_secs(60);
/// 默认兜底服务超时
pub const DEFAULT_SECONDARY_TIMEOUT: Duration = Duration::from_secs(30);

/// 一个批次的处理结果
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// 与输入顺序一一对应
    pub outcomes: Vec<EnrichmentOutcome>,
    /// 是否调用过兜底服务
    pub fallback_invoked: bool,
}

/// 主 / 兜底流程
///
/// - 持有两个适配器，构建时显式传入
/// - 只处理一个批次，不关心轮次和缓存
pub struct FallbackOrchestrator {
    primary: Arc<dyn ProviderAdapter>,
    secondary: Arc<dyn ProviderAdapter>,
    primary_timeout: Duration,
    secondary_timeout: Duration,
    fallback_delay: Duration,
}

type Slot = Option<Result<EnrichmentOutcome, OutcomeError>>;

impl FallbackOrchestrator {
    pub fn new(primary: Arc<dyn ProviderAdapter>, secondary: Arc<dyn ProviderAdapter>) -> Self {
        Self {
            primary,
            secondary,
            primary_timeout: DEFAULT_PRIMARY_TIMEOUT,
            secondary_timeout: DEFAULT_SECONDARY_TIMEOUT,
            fallback_delay: Duration::ZERO,
        }
    }

    pub fn with_timeouts(mut self, primary: Duration, secondary: Duration) -> Self {
        self.primary_timeout = primary;
        self.secondary_timeout = secondary;
        self
    }

    /// 切换到兜底服务前的等待
    pub fn with_fallback_delay(mut self, delay: Duration) -> Self {
        self.fallback_delay = delay;
        self
    }

    /// 处理一个批次
    pub async fn enrich_batch(
        &self,
        ctx: &BatchCtx,
        items: &[WorkItem],
        requirements: &TargetRequirements,
    ) -> BatchOutcome {
        let started = Instant::now();

        // ========== 主服务 ==========
        debug!("{} 主服务 {} 处理 {} 项", ctx, self.primary.name(), items.len());
        let primary_result = self
            .call(&self.primary, self.primary_timeout, items, requirements)
            .await;
        let slots = assemble(
            items,
            primary_result,
            requirements,
            ProviderRole::Primary,
            self.primary.name(),
        );

        if slots.iter().all(|slot| matches!(slot, Ok(_))) {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            return BatchOutcome {
                outcomes: finish(items, slots, elapsed_ms),
                fallback_invoked: false,
            };
        }

        // ========== 兜底服务 ==========
        let rejected = slots.iter().filter(|slot| slot.is_err()).count();
        let reason = slots
            .iter()
            .find_map(|slot| slot.as_ref().err())
            .map(|e| e.message.clone())
            .unwrap_or_default();
        warn!(
            "{} ⚠️ 主服务有 {}/{} 项未通过 ({})，整批切换到兜底服务 {}",
            ctx,
            rejected,
            items.len(),
            reason,
            self.secondary.name()
        );

        if !self.fallback_delay.is_zero() {
            tokio::time::sleep(self.fallback_delay).await;
        }

        let secondary_result = self
            .call(&self.secondary, self.secondary_timeout, items, requirements)
            .await;
        let slots = assemble(
            items,
            secondary_result,
            requirements,
            ProviderRole::Secondary,
            self.secondary.name(),
        );

        let failed = slots.iter().filter(|slot| slot.is_err()).count();
        if failed == 0 {
            info!("{} ✓ 兜底服务处理成功", ctx);
        } else {
            error!(
                "{} ❌ 兜底服务后仍有 {}/{} 项失败",
                ctx,
                failed,
                items.len()
            );
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        BatchOutcome {
            outcomes: finish(items, slots, elapsed_ms),
            fallback_invoked: true,
        }
    }

    /// 带超时的调用；超时等同于整批调用失败
    async fn call(
        &self,
        adapter: &Arc<dyn ProviderAdapter>,
        budget: Duration,
        items: &[WorkItem],
        requirements: &TargetRequirements,
    ) -> ProviderBatchResult {
        match tokio::time::timeout(budget, adapter.enrich_batch(items, requirements)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("[{}] ⏱️ 调用超时 ({:?})", adapter.name(), budget);
                ProviderBatchResult::all_failed(
                    items,
                    ProviderError::Timeout {
                        provider: adapter.name().to_string(),
                        budget_ms: budget.as_millis() as u64,
                    },
                )
            }
        }
    }
}

/// 把适配器结果按工作项标识放回原位置，并逐项做质量校验
fn assemble(
    items: &[WorkItem],
    result: ProviderBatchResult,
    requirements: &TargetRequirements,
    role: ProviderRole,
    provider: &str,
) -> Vec<Result<EnrichmentOutcome, OutcomeError>> {
    // 同一批次里可能出现标识相同的工作项，按出现顺序依次分配
    let mut positions: HashMap<String, VecDeque<usize>> = HashMap::new();
    for (idx, item) in items.iter().enumerate() {
        positions.entry(item.id()).or_default().push_back(idx);
    }
    let mut take = |id: &str| positions.get_mut(id).and_then(|queue| queue.pop_front());

    let mut slots: Vec<Slot> = vec![None; items.len()];

    for outcome in result.succeeded {
        let Some(idx) = take(&outcome.work_item_id) else {
            warn!("[{}] 返回了未提交的工作项: {}", provider, outcome.work_item_id);
            continue;
        };
        slots[idx] = Some(match validator::validate(&outcome, requirements) {
            Ok(()) => Ok(outcome.with_role(role)),
            Err(e) => {
                debug!("[{}] 质量校验未通过: {}", provider, e);
                Err(OutcomeError::from(&e))
            }
        });
    }

    for (item, err) in result.failed {
        if let Some(idx) = take(&item.id()) {
            slots[idx] = Some(Err(OutcomeError::from(&err)));
        }
    }

    slots
        .into_iter()
        .zip(items)
        .map(|(slot, item)| {
            slot.unwrap_or_else(|| {
                Err(OutcomeError::from(&ProviderError::MissingItem {
                    provider: provider.to_string(),
                    work_item_id: item.id(),
                }))
            })
        })
        .collect()
}

fn finish(
    items: &[WorkItem],
    slots: Vec<Result<EnrichmentOutcome, OutcomeError>>,
    elapsed_ms: u64,
) -> Vec<EnrichmentOutcome> {
    slots
        .into_iter()
        .zip(items)
        .map(|(slot, item)| match slot {
            Ok(outcome) => outcome,
            Err(err) => EnrichmentOutcome::failure(item.id(), err),
        })
        .map(|outcome| outcome.with_elapsed(elapsed_ms))
        .collect()
}
